use colored::Colorize;
use log::{Level, LevelFilter};
use std::io::Write;

/// Installs the narration logger.
///
/// Chrome DevTools chatter from `headless_chrome` and its websocket stack is
/// capped at `warn` so the one-line-per-decision narration stays readable.
pub fn init_logger(level: LevelFilter) {
    let chrome_level = level.min(LevelFilter::Warn);
    env_logger::Builder::new()
        .filter(None, level)
        .filter(Some("headless_chrome"), chrome_level)
        .filter(Some("tungstenite"), chrome_level)
        .filter(Some("reqwest"), chrome_level)
        .format(|buf, record| {
            let level = match record.level() {
                Level::Error => "ERROR".red(),
                Level::Warn => "WARN".yellow(),
                Level::Info => "INFO".green(),
                Level::Debug => "DEBUG".blue(),
                Level::Trace => "TRACE".purple(),
            };
            let stamp = chrono::Local::now().format("%H:%M:%S");
            writeln!(buf, "{} [{}] - {}", stamp.to_string().dimmed(), level, record.args())
        })
        .init();
}
