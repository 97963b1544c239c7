use std::future::Future;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{ChatJoinRequest, InlineKeyboardButton, InlineKeyboardMarkup};

use crate::config::Config;
use crate::database::DatabasePool;
use crate::delivery::DeliveryError;
use crate::handlers::command::touch_user;
use crate::handlers::ui::{call_to_action_keyboard, join_welcome};

/// Transport calls made while handling a join request.
pub trait JoinGate {
    fn approve(&self, chat_id: ChatId, user_id: UserId) -> impl Future<Output = Result<(), DeliveryError>> + Send;

    fn welcome(
        &self,
        user_id: UserId,
        text: String,
        keyboard: InlineKeyboardMarkup,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

impl JoinGate for Bot {
    async fn approve(&self, chat_id: ChatId, user_id: UserId) -> Result<(), DeliveryError> {
        self.approve_chat_join_request(chat_id, user_id).await?;
        Ok(())
    }

    async fn welcome(&self, user_id: UserId, text: String, keyboard: InlineKeyboardMarkup) -> Result<(), DeliveryError> {
        self.send_message(user_id, text).reply_markup(keyboard).await?;
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct JoinRequester {
    pub user_id: UserId,
    pub username: Option<String>,
    pub first_name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinOutcome {
    ApprovalFailed,
    Welcomed,
    WelcomeUnreachable,
    WelcomeFailed,
}

/// Approves once, records the user, then tries a best-effort welcome. A
/// welcome failure never undoes the approval.
pub async fn process_join_request<G>(
    gate: &G,
    db_pool: &DatabasePool,
    config: &Config,
    chat_id: ChatId,
    chat_title: &str,
    requester: JoinRequester,
) -> JoinOutcome
where
    G: JoinGate + Sync,
{
    let user_id = requester.user_id;

    // Approval is attempted once; on failure nothing is recorded or sent
    if let Err(e) = gate.approve(chat_id, user_id).await {
        log::error!("Error approving join request of {} to {}: {}", user_id, chat_id, e);
        return JoinOutcome::ApprovalFailed;
    }
    log::info!("Approved join request of {} to {}", user_id, chat_id);

    let welcome = join_welcome(&requester.first_name, chat_title);
    if let Err(e) = touch_user(db_pool, user_id, requester.username, requester.first_name).await {
        log::error!("Failed to record user {}: {}", user_id, e);
    }

    let keyboard = match call_to_action_keyboard(config) {
        Ok(keyboard) => keyboard,
        Err(e) => {
            log::error!("Failed to build welcome keyboard: {}", e);
            InlineKeyboardMarkup::new(Vec::<Vec<InlineKeyboardButton>>::new())
        }
    };

    // Welcome is best effort, the approval above already stands
    match gate.welcome(user_id, welcome, keyboard).await {
        Ok(()) => JoinOutcome::Welcomed,
        Err(DeliveryError::Unreachable(_)) => {
            log::info!("User {} blocked bot or never started", user_id);
            JoinOutcome::WelcomeUnreachable
        }
        Err(e) => {
            log::warn!("Failed to send welcome to {}: {}", user_id, e);
            JoinOutcome::WelcomeFailed
        }
    }
}

pub async fn join_request_handler(
    bot: Bot,
    request: ChatJoinRequest,
    db_pool: Arc<DatabasePool>,
    config: Arc<Config>,
) -> anyhow::Result<()> {
    let chat_title = request.chat.title().unwrap_or("the chat").to_string();
    let requester = JoinRequester {
        user_id: request.from.id,
        username: request.from.username.clone(),
        first_name: request.from.first_name.clone(),
    };

    process_join_request(&bot, &db_pool, &config, request.chat.id, &chat_title, requester).await;
    Ok(())
}
