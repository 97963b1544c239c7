use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, ParseMode};
use std::sync::Arc;

use crate::config::Config;
use crate::database::{DatabasePool, users};
use crate::handlers::admin::is_admin_id;
use crate::handlers::broadcast::{BroadcastStorage, arm_broadcast};
use crate::handlers::ui::{
    CB_BROADCAST, CB_CLEAN_DB, NOT_ALLOWED, SEND_BROADCAST_PROMPT, admin_panel_keyboard,
    admin_panel_text, cleaned_text,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelAction {
    Broadcast,
    CleanBlocked,
}

impl PanelAction {
    pub fn from_callback_data(data: &str) -> Option<Self> {
        match data {
            CB_BROADCAST => Some(PanelAction::Broadcast),
            CB_CLEAN_DB => Some(PanelAction::CleanBlocked),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelOutcome {
    Denied,
    AwaitingBroadcast,
    Cleaned(usize),
}

pub async fn show_admin_panel(bot: &Bot, chat_id: ChatId, db_pool: &DatabasePool) -> anyhow::Result<()> {
    let stats = match db_pool.execute_with_timeout(users::stats).await {
        Ok(stats) => stats,
        Err(e) => {
            log::error!("Stats DB error: {}", e);
            bot.send_message(chat_id, "Failed to retrieve statistics.").await?;
            return Ok(());
        }
    };

    bot.send_message(chat_id, admin_panel_text(&stats))
        .parse_mode(ParseMode::Html)
        .reply_markup(admin_panel_keyboard())
        .await?;
    Ok(())
}

/// Applies a panel button press. Anyone but the admin gets `Denied` and
/// nothing changes.
pub async fn apply_panel_action(
    action: PanelAction,
    sender: UserId,
    config: &Config,
    db_pool: &DatabasePool,
    storage: Arc<BroadcastStorage>,
) -> anyhow::Result<PanelOutcome> {
    if !is_admin_id(sender.0, config) {
        log::warn!("User {} tried admin action {:?}", sender, action);
        return Ok(PanelOutcome::Denied);
    }

    match action {
        PanelAction::Broadcast => {
            arm_broadcast(storage, sender).await?;
            Ok(PanelOutcome::AwaitingBroadcast)
        }
        PanelAction::CleanBlocked => {
            let deleted = db_pool.execute_with_timeout(users::purge_blocked).await?;
            log::info!("Admin {} cleaned {} blocked users", sender, deleted);
            Ok(PanelOutcome::Cleaned(deleted))
        }
    }
}

pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    db_pool: Arc<DatabasePool>,
    config: Arc<Config>,
    storage: Arc<BroadcastStorage>,
) -> anyhow::Result<()> {
    // Unknown buttons just stop the spinner
    let Some(action) = q.data.as_deref().and_then(PanelAction::from_callback_data) else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };

    let outcome = match apply_panel_action(action, q.from.id, &config, &db_pool, storage).await {
        Ok(outcome) => outcome,
        Err(e) => {
            log::error!("Admin action {:?} failed: {}", action, e);
            bot.answer_callback_query(q.id)
                .text("Database error.")
                .show_alert(true)
                .await?;
            return Ok(());
        }
    };

    // Non-admins get an alert and nothing else
    if outcome == PanelOutcome::Denied {
        bot.answer_callback_query(q.id)
            .text(NOT_ALLOWED)
            .show_alert(true)
            .await?;
        return Ok(());
    }

    bot.answer_callback_query(q.id).await?;

    // Edit the panel in place; inaccessible messages are left alone
    let Some(message) = q.message.as_ref().and_then(|m| m.regular_message()) else {
        return Ok(());
    };

    match outcome {
        PanelOutcome::AwaitingBroadcast => {
            bot.edit_message_text(message.chat.id, message.id, SEND_BROADCAST_PROMPT)
                .parse_mode(ParseMode::Html)
                .await?;
        }
        PanelOutcome::Cleaned(deleted) => {
            bot.edit_message_text(message.chat.id, message.id, cleaned_text(deleted))
                .await?;
        }
        PanelOutcome::Denied => {}
    }

    Ok(())
}
