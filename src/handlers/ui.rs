use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use teloxide::utils::html;

use crate::config::Config;
use crate::database::UserStats;
use crate::handlers::broadcast::BroadcastReport;

pub const BTN_ADD_TO_CHANNEL: &str = "➕ Add Me To Channel";
pub const BTN_ADD_TO_GROUP: &str = "➕ Add Me To Group";
pub const BTN_MAIN_CHANNEL: &str = "📢 Main Channel";
pub const BTN_BROADCAST: &str = "📤 Broadcast";
pub const BTN_CLEAN_BLOCKED: &str = "🗑️ Clean Blocked";

pub const CB_BROADCAST: &str = "broadcast";
pub const CB_CLEAN_DB: &str = "clean_db";

pub const NOT_ALLOWED: &str = "❌ Not allowed!";
pub const SEND_BROADCAST_PROMPT: &str = "📢 <b>Send your broadcast message now...</b>";

pub fn call_to_action_keyboard(config: &Config) -> anyhow::Result<InlineKeyboardMarkup> {
    Ok(InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::url(BTN_ADD_TO_CHANNEL, config.add_to_channel_url()?)],
        vec![InlineKeyboardButton::url(BTN_ADD_TO_GROUP, config.add_to_group_url()?)],
        vec![InlineKeyboardButton::url(BTN_MAIN_CHANNEL, config.main_channel_link.clone())],
    ]))
}

pub fn admin_panel_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(BTN_BROADCAST, CB_BROADCAST)],
        vec![InlineKeyboardButton::callback(BTN_CLEAN_BLOCKED, CB_CLEAN_DB)],
    ])
}

pub fn start_greeting(first_name: &str) -> String {
    format!(
        "👋 <b>Hi {}</b>\n\n🤖 <i>Give Me Admin In Your Channel To Accept Join Requests Automatically!</i>",
        html::escape(first_name)
    )
}

pub fn join_welcome(first_name: &str, chat_title: &str) -> String {
    format!(
        "Hello {}, your request to join {} has been approved!\nSend /start to know more.",
        first_name, chat_title
    )
}

pub fn admin_panel_text(stats: &UserStats) -> String {
    format!(
        "🔧 <b>Admin Panel</b>\n\n\
         👥 <b>Total Users:</b> <code>{}</code>\n\
         ✅ <b>Active:</b> <code>{}</code>\n\
         🚫 <b>Blocked:</b> <code>{}</code>",
        stats.total, stats.active, stats.blocked
    )
}

pub fn cleaned_text(deleted: usize) -> String {
    format!("🧹 Cleaned {} blocked users.", deleted)
}

pub fn broadcast_summary(report: &BroadcastReport) -> String {
    format!(
        "✅ Broadcast done!\nSent: {}\nFailed: {}",
        report.succeeded, report.failed
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting_escapes_name() {
        let text = start_greeting("<Bob & Co>");
        assert!(text.contains("&lt;Bob &amp; Co&gt;"));
    }

    #[test]
    fn test_admin_panel_text_lists_counts() {
        let text = admin_panel_text(&UserStats { total: 5, active: 3, blocked: 2 });
        assert!(text.contains("<code>5</code>"));
        assert!(text.contains("<code>3</code>"));
        assert!(text.contains("<code>2</code>"));
    }

    #[test]
    fn test_broadcast_summary() {
        let report = BroadcastReport { succeeded: 1, failed: 1 };
        assert_eq!(broadcast_summary(&report), "✅ Broadcast done!\nSent: 1\nFailed: 1");
    }

    #[test]
    fn test_admin_panel_keyboard_has_both_actions() {
        let keyboard = admin_panel_keyboard();
        assert_eq!(keyboard.inline_keyboard.len(), 2);
    }
}
