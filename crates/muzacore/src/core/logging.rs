//! Logging initialization and startup configuration report.

use anyhow::Result;
use simplelog::{ColorChoice, CombinedLogger, Config, LevelFilter, TermLogger, TerminalMode, WriteLogger};
use std::fs::File;

use crate::core::config;

/// Initialize logging to both the console and a file.
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the effective source configuration at startup.
///
/// YouTube works without a proxy only in some regions; without one the bot
/// still runs, just with the primary source likely degraded. Worth a loud
/// note in the log rather than a silent surprise later.
pub fn log_source_configuration() {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("🎛  Source Configuration");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    log::info!("yt-dlp binary: {}", &*config::YTDL_BIN);

    match &*config::PROXY {
        Some(proxy) => {
            log::info!("✅ PROXY: {}", proxy);
            log::info!("   yt-dlp traffic will be routed through the proxy");
        }
        None => {
            log::warn!("⚠️  PROXY: not set");
            log::warn!("   YouTube may be unreachable from this region; continuing with reduced capability");
        }
    }

    let admin_count = config::admin::ADMIN_IDS.len();
    if admin_count == 0 {
        log::warn!("⚠️  ADMIN_IDS: not set, /stats will be denied to everyone");
    } else {
        log::info!("✅ ADMIN_IDS: {} admin(s) configured", admin_count);
    }

    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}
