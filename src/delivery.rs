use std::fmt;
use std::future::Future;
use teloxide::prelude::*;
use teloxide::types::{FileId, InputFile};
use teloxide::{ApiError, RequestError};

/// A message captured from the admin, ready to be re-sent to every user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BroadcastContent {
    Photo { file_id: FileId, caption: Option<String> },
    Video { file_id: FileId, caption: Option<String> },
    Document { file_id: FileId, caption: Option<String> },
    Text(String),
}

impl BroadcastContent {
    pub fn kind(&self) -> &'static str {
        match self {
            BroadcastContent::Photo { .. } => "photo",
            BroadcastContent::Video { .. } => "video",
            BroadcastContent::Document { .. } => "document",
            BroadcastContent::Text(_) => "text",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryError {
    /// The user blocked the bot, deleted the account or never started a chat.
    Unreachable(String),
    Other(String),
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryError::Unreachable(reason) => write!(f, "recipient unreachable: {}", reason),
            DeliveryError::Other(reason) => write!(f, "delivery failed: {}", reason),
        }
    }
}

impl std::error::Error for DeliveryError {}

impl From<RequestError> for DeliveryError {
    fn from(err: RequestError) -> Self {
        let reason = err.to_string();
        match &err {
            RequestError::Api(api) if is_unreachable_api_error(api) => DeliveryError::Unreachable(reason),
            _ => DeliveryError::Other(reason),
        }
    }
}

fn is_unreachable_api_error(err: &ApiError) -> bool {
    match err {
        ApiError::BotBlocked
        | ApiError::BotKicked
        | ApiError::BotKickedFromSupergroup
        | ApiError::UserDeactivated
        | ApiError::CantInitiateConversation
        | ApiError::CantTalkWithBots => true,
        // "Bad Request: chat not found" is a stale id, not a block.
        ApiError::ChatNotFound => false,
        ApiError::Unknown(description) => description.starts_with("Forbidden"),
        _ => false,
    }
}

/// The outbound half of the bot protocol the broadcast needs.
pub trait Outbound {
    fn deliver(
        &self,
        chat_id: ChatId,
        content: &BroadcastContent,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

impl Outbound for Bot {
    async fn deliver(&self, chat_id: ChatId, content: &BroadcastContent) -> Result<(), DeliveryError> {
        match content {
            BroadcastContent::Photo { file_id, caption } => {
                let mut request = self.send_photo(chat_id, InputFile::file_id(file_id.clone()));
                if let Some(caption) = caption {
                    request = request.caption(caption.clone());
                }
                request.await?;
            }
            BroadcastContent::Video { file_id, caption } => {
                let mut request = self.send_video(chat_id, InputFile::file_id(file_id.clone()));
                if let Some(caption) = caption {
                    request = request.caption(caption.clone());
                }
                request.await?;
            }
            BroadcastContent::Document { file_id, caption } => {
                let mut request = self.send_document(chat_id, InputFile::file_id(file_id.clone()));
                if let Some(caption) = caption {
                    request = request.caption(caption.clone());
                }
                request.await?;
            }
            BroadcastContent::Text(text) => {
                self.send_message(chat_id, text.clone()).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_unreachable(err: &DeliveryError) -> bool {
        matches!(err, DeliveryError::Unreachable(_))
    }

    #[test]
    fn test_blocked_bot_is_unreachable() {
        let err = DeliveryError::from(RequestError::Api(ApiError::BotBlocked));
        assert!(is_unreachable(&err));
    }

    #[test]
    fn test_never_started_is_unreachable() {
        let err = DeliveryError::from(RequestError::Api(ApiError::CantInitiateConversation));
        assert!(is_unreachable(&err));
    }

    #[test]
    fn test_unknown_forbidden_is_unreachable() {
        let err = DeliveryError::from(RequestError::Api(ApiError::Unknown(
            "Forbidden: bot was kicked from the channel chat".to_string(),
        )));
        assert!(is_unreachable(&err));
    }

    #[test]
    fn test_other_api_errors_are_generic() {
        let err = DeliveryError::from(RequestError::Api(ApiError::MessageTextIsEmpty));
        assert!(!is_unreachable(&err));

        let err = DeliveryError::from(RequestError::Api(ApiError::Unknown(
            "Bad Request: something odd".to_string(),
        )));
        assert!(!is_unreachable(&err));
    }

    #[test]
    fn test_chat_not_found_is_generic() {
        let err = DeliveryError::from(RequestError::Api(ApiError::ChatNotFound));
        assert!(matches!(err, DeliveryError::Other(_)));
    }

    #[test]
    fn test_content_kind() {
        assert_eq!(BroadcastContent::Text("hi".into()).kind(), "text");
    }
}
