use log::LevelFilter;
use std::env;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::{Arc, Mutex};

const LOG_FILE: &str = "bot.log";

pub fn console_level(value: &str) -> LevelFilter {
    match value.to_uppercase().as_str() {
        "ERROR" => LevelFilter::Error,
        _ => LevelFilter::Info,
    }
}

/// `None` means file logging is off.
pub fn file_level(value: &str) -> Option<LevelFilter> {
    match value.to_uppercase().as_str() {
        "ERROR" => Some(LevelFilter::Error),
        "ALL" | "INFO" => Some(LevelFilter::Info),
        _ => None,
    }
}

/// Console gets `CONSOLE_LOG_LEVEL` (default INFO), `bot.log` gets
/// `FILE_LOG_LEVEL` (default OFF).
pub fn init_logging() -> std::io::Result<()> {
    let console_level = console_level(&env::var("CONSOLE_LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string()));
    let file_level_config = file_level(&env::var("FILE_LOG_LEVEL").unwrap_or_else(|_| "OFF".to_string()));

    let max_level = std::cmp::max(console_level, file_level_config.unwrap_or(LevelFilter::Off));

    let log_file = if file_level_config.is_some() {
        let file = OpenOptions::new().create(true).append(true).open(LOG_FILE)?;
        Some(Arc::new(Mutex::new(file)))
    } else {
        None
    };

    let mut builder = pretty_env_logger::formatted_builder();
    builder
        .filter(None, max_level)
        .format(move |buf, record| {
            let formatted_record = format!(
                "{} [{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            );

            if record.level() <= console_level {
                writeln!(buf, "{}", formatted_record)?;
            }

            if let (Some(file_level), Some(file_handle)) = (file_level_config, &log_file) {
                if record.level() <= file_level {
                    if let Ok(mut guard) = file_handle.lock() {
                        let _ = writeln!(guard, "{}", formatted_record);
                    }
                }
            }
            Ok(())
        })
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_level() {
        assert_eq!(console_level("error"), LevelFilter::Error);
        assert_eq!(console_level("INFO"), LevelFilter::Info);
        assert_eq!(console_level("debug"), LevelFilter::Info);
    }

    #[test]
    fn test_file_level() {
        assert_eq!(file_level("ERROR"), Some(LevelFilter::Error));
        assert_eq!(file_level("all"), Some(LevelFilter::Info));
        assert_eq!(file_level("OFF"), None);
        assert_eq!(file_level(""), None);
    }
}
