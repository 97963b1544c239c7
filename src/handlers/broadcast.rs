use teloxide::prelude::*;
use teloxide::dispatching::dialogue::{InMemStorage, Dialogue};
use teloxide::types::FileId;
use std::sync::Arc;

use crate::config::Config;
use crate::database::{DatabasePool, users};
use crate::delivery::{BroadcastContent, DeliveryError, Outbound};
use crate::handlers::admin::is_admin_id;
use crate::handlers::ui::broadcast_summary;

pub type BroadcastStorage = InMemStorage<BroadcastState>;
type BroadcastDialogue = Dialogue<BroadcastState, BroadcastStorage>;

#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub enum BroadcastState {
    #[default]
    Idle,
    AwaitingContent,
}

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct BroadcastReport {
    pub succeeded: usize,
    pub failed: usize,
}

/// Broadcast state lives per admin, keyed by the admin's user id rather than
/// the chat the button was pressed in.
fn admin_dialogue(storage: Arc<BroadcastStorage>, admin: UserId) -> BroadcastDialogue {
    Dialogue::new(storage, ChatId::from(admin))
}

pub async fn arm_broadcast(storage: Arc<BroadcastStorage>, admin: UserId) -> anyhow::Result<()> {
    admin_dialogue(storage, admin)
        .update(BroadcastState::AwaitingContent)
        .await?;
    Ok(())
}

#[cfg(test)]
pub async fn broadcast_state(storage: Arc<BroadcastStorage>, user: UserId) -> anyhow::Result<BroadcastState> {
    Ok(admin_dialogue(storage, user).get().await?.unwrap_or_default())
}

/// Returns true if this message from `sender` is the awaited broadcast
/// payload. Consumes the armed state so only one message is captured.
pub async fn take_pending_broadcast(
    storage: Arc<BroadcastStorage>,
    config: &Config,
    sender: Option<UserId>,
) -> anyhow::Result<bool> {
    let Some(user_id) = sender.filter(|id| is_admin_id(id.0, config)) else {
        return Ok(false);
    };

    let dialogue = admin_dialogue(storage, user_id);
    match dialogue.get().await? {
        Some(BroadcastState::AwaitingContent) => {
            dialogue.exit().await?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Richest media wins: photo, then video, then document, then plain text.
pub fn pick_content(
    photo: Option<&FileId>,
    video: Option<&FileId>,
    document: Option<&FileId>,
    text: &str,
) -> BroadcastContent {
    let caption = (!text.is_empty()).then(|| text.to_string());
    match (photo, video, document) {
        (Some(file_id), _, _) => BroadcastContent::Photo { file_id: file_id.clone(), caption },
        (None, Some(file_id), _) => BroadcastContent::Video { file_id: file_id.clone(), caption },
        (None, None, Some(file_id)) => BroadcastContent::Document { file_id: file_id.clone(), caption },
        (None, None, None) => BroadcastContent::Text(text.to_string()),
    }
}

pub fn capture_content(msg: &Message) -> BroadcastContent {
    let text = msg.text().or(msg.caption()).unwrap_or("");
    pick_content(
        msg.photo().and_then(|sizes| sizes.last()).map(|photo| &photo.file.id),
        msg.video().map(|video| &video.file.id),
        msg.document().map(|document| &document.file.id),
        text,
    )
}

pub async fn run_broadcast<O>(
    outbound: &O,
    db_pool: &DatabasePool,
    content: &BroadcastContent,
) -> anyhow::Result<BroadcastReport>
where
    O: Outbound + Sync,
{
    // Get active users
    let recipients = db_pool.execute_with_timeout(users::list_active).await?;
    log::info!("Broadcasting {} to {} active users", content.kind(), recipients.len());

    let mut report = BroadcastReport::default();
    for user_id in recipients {
        match outbound.deliver(ChatId(user_id), content).await {
            Ok(()) => report.succeeded += 1,
            // Blocked or never started: remember it so later passes skip the user
            Err(DeliveryError::Unreachable(reason)) => {
                report.failed += 1;
                log::info!("User {} is unreachable ({}), marking blocked", user_id, reason);
                if let Err(e) = db_pool
                    .execute_with_timeout(move |conn| users::mark_blocked(conn, user_id))
                    .await
                {
                    log::error!("Failed to mark user {} as blocked: {}", user_id, e);
                }
            }
            // Anything else only counts as a failure, the store stays as is
            Err(e @ DeliveryError::Other(_)) => {
                report.failed += 1;
                log::warn!("Failed to send to {}: {}", user_id, e);
            }
        }
    }

    log::info!(
        "Broadcast completed: {} sent, {} failed",
        report.succeeded, report.failed
    );
    Ok(report)
}

/// Catch-all message endpoint. Everything except the admin's armed next
/// message falls straight through.
pub async fn message_handler(
    bot: Bot,
    msg: Message,
    db_pool: Arc<DatabasePool>,
    config: Arc<Config>,
    storage: Arc<BroadcastStorage>,
) -> anyhow::Result<()> {
    if !take_pending_broadcast(storage, &config, msg.from.as_ref().map(|user| user.id)).await? {
        return Ok(());
    }

    // State is already back to Idle here, whatever the outcome below
    let content = capture_content(&msg);
    match run_broadcast(&bot, &db_pool, &content).await {
        Ok(report) => {
            bot.send_message(msg.chat.id, broadcast_summary(&report)).await?;
        }
        Err(e) => {
            log::error!("Broadcast aborted: {}", e);
            bot.send_message(msg.chat.id, "❌ Database error, broadcast not sent.").await?;
        }
    }

    Ok(())
}
