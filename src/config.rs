use anyhow::{Context, anyhow};
use reqwest::Url;
use std::env;
use std::path::PathBuf;

const DEFAULT_MAIN_CHANNEL_LINK: &str = "https://t.me/YOUR_CHANNEL";
const DEFAULT_DB_FILE: &str = "bot_users.db";
const DEFAULT_BOT_USERNAME: &str = "Auto_request_bot";
const DEFAULT_START_PARAMETER: &str = "Bots4Sale";

/// Runtime settings read from the environment (and `.env`, if present).
#[derive(Clone, Debug)]
pub struct Config {
    pub bot_token: String,
    pub admin_id: i64,
    pub main_channel_link: Url,
    pub db_path: PathBuf,
    pub bot_username: String,
    pub start_parameter: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bot_token = non_empty("BOT_TOKEN")
            .or_else(|| non_empty("TELOXIDE_TOKEN"))
            .ok_or_else(|| anyhow!("BOT_TOKEN must be set"))?;

        let admin_id = non_empty("ADMIN_ID")
            .ok_or_else(|| anyhow!("ADMIN_ID must be set"))?
            .parse::<i64>()
            .context("ADMIN_ID must be a numeric Telegram user id")?;

        let main_channel_link = non_empty("MAIN_CHANNEL_LINK")
            .unwrap_or_else(|| DEFAULT_MAIN_CHANNEL_LINK.to_string());
        let main_channel_link = Url::parse(&main_channel_link)
            .with_context(|| format!("MAIN_CHANNEL_LINK is not a valid URL: {}", main_channel_link))?;

        let bot_username = non_empty("BOT_USERNAME")
            .map(|name| name.trim_start_matches('@').to_string())
            .unwrap_or_else(|| DEFAULT_BOT_USERNAME.to_string());

        let config = Config {
            bot_token,
            admin_id,
            main_channel_link,
            db_path: PathBuf::from(non_empty("DB_FILE").unwrap_or_else(|| DEFAULT_DB_FILE.to_string())),
            bot_username,
            start_parameter: non_empty("START_PARAMETER")
                .unwrap_or_else(|| DEFAULT_START_PARAMETER.to_string()),
        };

        // Fail at startup rather than on the first /start.
        config.add_to_channel_url()?;
        config.add_to_group_url()?;

        Ok(config)
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_id == user_id
    }

    pub fn add_to_channel_url(&self) -> anyhow::Result<Url> {
        self.deep_link("startchannel")
    }

    pub fn add_to_group_url(&self) -> anyhow::Result<Url> {
        self.deep_link("startgroup")
    }

    fn deep_link(&self, kind: &str) -> anyhow::Result<Url> {
        let link = format!(
            "https://t.me/{}?{}={}&admin=invite_users+manage_chat",
            self.bot_username, kind, self.start_parameter
        );
        Url::parse(&link).with_context(|| format!("Invalid deep link: {}", link))
    }
}

pub fn load_environment() -> anyhow::Result<Config> {
    if let Err(e) = dotenv::dotenv() {
        log::info!("No .env file loaded ({}), using process environment", e);
    }
    Config::from_env()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(lookup_from(&[("BOT_TOKEN", "123:abc"), ("ADMIN_ID", "42")])).unwrap();
        assert_eq!(config.bot_token, "123:abc");
        assert_eq!(config.admin_id, 42);
        assert_eq!(config.db_path, PathBuf::from("bot_users.db"));
        assert_eq!(config.main_channel_link.as_str(), "https://t.me/YOUR_CHANNEL");
        assert_eq!(config.bot_username, "Auto_request_bot");
    }

    #[test]
    fn test_teloxide_token_fallback() {
        let config = Config::from_lookup(lookup_from(&[("TELOXIDE_TOKEN", "t"), ("ADMIN_ID", "1")])).unwrap();
        assert_eq!(config.bot_token, "t");
    }

    #[test]
    fn test_missing_admin_id_is_error() {
        assert!(Config::from_lookup(lookup_from(&[("BOT_TOKEN", "t")])).is_err());
    }

    #[test]
    fn test_non_numeric_admin_id_is_error() {
        let result = Config::from_lookup(lookup_from(&[("BOT_TOKEN", "t"), ("ADMIN_ID", "admin")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_channel_link_is_error() {
        let result = Config::from_lookup(lookup_from(&[
            ("BOT_TOKEN", "t"),
            ("ADMIN_ID", "1"),
            ("MAIN_CHANNEL_LINK", "not a url"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_deep_links() {
        let config = Config::from_lookup(lookup_from(&[
            ("BOT_TOKEN", "t"),
            ("ADMIN_ID", "1"),
            ("BOT_USERNAME", "@my_bot"),
            ("START_PARAMETER", "promo"),
        ]))
        .unwrap();
        assert_eq!(
            config.add_to_channel_url().unwrap().as_str(),
            "https://t.me/my_bot?startchannel=promo&admin=invite_users+manage_chat"
        );
        assert_eq!(
            config.add_to_group_url().unwrap().as_str(),
            "https://t.me/my_bot?startgroup=promo&admin=invite_users+manage_chat"
        );
    }

    #[test]
    fn test_is_admin() {
        let config = Config::from_lookup(lookup_from(&[("BOT_TOKEN", "t"), ("ADMIN_ID", "123456")])).unwrap();
        assert!(config.is_admin(123456));
        assert!(!config.is_admin(555555));
    }

    #[test]
    #[serial]
    fn test_from_env_reads_process_environment() {
        // SAFETY: serialized with every other test touching the environment.
        unsafe {
            env::set_var("BOT_TOKEN", "env-token");
            env::set_var("ADMIN_ID", "777");
            env::set_var("DB_FILE", "/tmp/env_users.db");
        }
        let config = Config::from_env();
        unsafe {
            env::remove_var("BOT_TOKEN");
            env::remove_var("ADMIN_ID");
            env::remove_var("DB_FILE");
        }

        let config = config.unwrap();
        assert_eq!(config.bot_token, "env-token");
        assert_eq!(config.admin_id, 777);
        assert_eq!(config.db_path, PathBuf::from("/tmp/env_users.db"));
    }
}
