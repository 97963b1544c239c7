use teloxide::prelude::*;
use std::sync::Arc;
use anyhow::Error;

use crate::commands::Command;
use crate::database::DatabasePool;
use crate::handlers::{
    BroadcastStorage, callback_handler, command_handler, join_request_handler, message_handler,
};
use teloxide::dptree;

mod commands;
mod config;
mod database;
mod delivery;
mod handlers;
mod utils;

#[tokio::main]
async fn main() -> Result<(), Error> {
    utils::logging::init_logging()?;

    log::info!("Starting join-request auto-approval bot...");
    let start_time = std::time::Instant::now();

    let config = match config::load_environment() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            log::error!("Failed to load environment: {}", e);
            return Err(e);
        }
    };
    log::info!("Admin id: {}, database: {:?}", config.admin_id, config.db_path);

    if let Err(e) = database::init_database(&config.db_path) {
        log::error!("Failed to initialize the database: {}", e);
        return Err(e);
    }
    log::info!("Database initialized successfully.");

    let db_pool = Arc::new(DatabasePool::new(
        config.db_path.clone(),
        3 // Maximum 3 simultaneous database connections
    ));
    let broadcast_storage = BroadcastStorage::new();

    let bot = Bot::new(config.bot_token.clone());

    let handler = dptree::entry()
        .branch(Update::filter_chat_join_request().endpoint(join_request_handler))
        .branch(Update::filter_message().filter_command::<Command>().endpoint(command_handler))
        .branch(Update::filter_callback_query().endpoint(callback_handler))
        .branch(Update::filter_message().endpoint(message_handler));

    log::info!("Bot initialization completed in {:.2?}", start_time.elapsed());
    log::info!("Starting to dispatch updates...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![db_pool, config, broadcast_storage])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    log::info!("Bot shutdown complete");
    Ok(())
}
