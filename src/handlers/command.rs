use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::commands::Command;
use crate::config::Config;
use crate::database::{DatabasePool, users};
use crate::handlers::admin::is_admin;
use crate::handlers::admin_panel::show_admin_panel;
use crate::handlers::ui::{call_to_action_keyboard, start_greeting};
use std::sync::Arc;

/// Records an interaction. Any activity clears a previous blocked mark.
pub async fn touch_user(
    db_pool: &DatabasePool,
    user_id: UserId,
    username: Option<String>,
    first_name: String,
) -> anyhow::Result<()> {
    let user_id = users::user_key(user_id)
        .ok_or_else(|| anyhow::anyhow!("User id {} does not fit the users table", user_id))?;
    db_pool
        .execute_with_timeout(move |conn| {
            users::upsert_user(conn, user_id, username.as_deref(), &first_name)
        })
        .await
}

pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    db_pool: Arc<DatabasePool>,
    config: Arc<Config>,
) -> anyhow::Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    match cmd {
        Command::Start => {
            // Upsert first so a returning user is active again before anything else
            if let Err(e) = touch_user(
                &db_pool,
                user.id,
                user.username.clone(),
                user.first_name.clone(),
            )
            .await
            {
                log::error!("Failed to update user activity: {}", e);
            }

            if is_admin(Some(user), &config) {
                show_admin_panel(&bot, msg.chat.id, &db_pool).await?;
            } else {
                // Regular users get the greeting with the add-me links
                bot.send_message(msg.chat.id, start_greeting(&user.first_name))
                    .parse_mode(ParseMode::Html)
                    .reply_markup(call_to_action_keyboard(&config)?)
                    .await?;
            }
        }
    };
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::init_database;

    #[tokio::test]
    async fn test_start_creates_active_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.db");
        init_database(&path).unwrap();
        let pool = DatabasePool::new(path, 3);

        touch_user(&pool, UserId(1), Some("alice".into()), "Alice".into()).await.unwrap();

        let record = pool
            .execute_with_timeout(|conn| users::get_user(conn, 1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.username.as_deref(), Some("alice"));
        assert!(!record.is_blocked);
    }

    #[tokio::test]
    async fn test_start_unblocks_returning_user() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.db");
        init_database(&path).unwrap();
        let pool = DatabasePool::new(path, 3);

        touch_user(&pool, UserId(5), None, "Eve".into()).await.unwrap();
        pool.execute_with_timeout(|conn| users::mark_blocked(conn, 5)).await.unwrap();
        touch_user(&pool, UserId(5), None, "Eve".into()).await.unwrap();

        let stats = pool.execute_with_timeout(users::stats).await.unwrap();
        assert_eq!((stats.total, stats.active, stats.blocked), (1, 1, 0));
    }

    #[tokio::test]
    async fn test_out_of_range_user_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.db");
        init_database(&path).unwrap();
        let pool = DatabasePool::new(path, 3);

        assert!(touch_user(&pool, UserId(u64::MAX), None, "Ghost".into()).await.is_err());

        let stats = pool.execute_with_timeout(users::stats).await.unwrap();
        assert_eq!(stats.total, 0);
    }

    #[test]
    fn test_start_is_the_only_command() {
        use teloxide::utils::command::BotCommands;

        assert!(matches!(Command::parse("/start", "bot"), Ok(Command::Start)));
        assert!(Command::parse("/help", "bot").is_err());
    }
}
