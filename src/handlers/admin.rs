use teloxide::types::{User, UserId};

use crate::config::Config;
use crate::database::users::user_key;

/// Only the configured administrator passes; anonymous senders never do.
pub fn is_admin(user: Option<&User>, config: &Config) -> bool {
    user.is_some_and(|user| is_admin_id(user.id.0, config))
}

pub fn is_admin_id(user_id: u64, config: &Config) -> bool {
    user_key(UserId(user_id)).is_some_and(|id| config.is_admin(id))
}
