use colored::Colorize;
use log::{Level, LevelFilter};
use std::io::Write;

fn builder(level: LevelFilter) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder.filter(None, level).format(|buf, record| {
        let level = match record.level() {
            Level::Error => "ERROR".red(),
            Level::Warn => "WARN".yellow(),
            Level::Info => "INFO".green(),
            Level::Debug => "DEBUG".blue(),
            Level::Trace => "TRACE".purple(),
        };
        writeln!(buf, "[{}] - {}", level, record.args())
    });
    builder
}

/// Installs the colored stderr logger as the global logger.
pub fn init_logger(level: LevelFilter) {
    builder(level).init();
}

/// Builds the colored stderr logger without installing it, so a front-end
/// can wrap it in its own `log::Log` implementation.
pub fn stderr_logger(level: LevelFilter) -> env_logger::Logger {
    builder(level).build()
}
