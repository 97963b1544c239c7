pub mod admin;
pub mod admin_panel;
pub mod broadcast;
pub mod command;
pub mod join_request;
pub mod ui;

pub use admin_panel::callback_handler;
pub use broadcast::{BroadcastStorage, message_handler};
pub use command::command_handler;
pub use join_request::join_request_handler;
