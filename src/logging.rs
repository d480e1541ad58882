//! Process-wide logging, installed once.
//!
//! Matches spec.md §9's "global logger... level from the first call
//! wins": whichever `Session::open` call runs first decides the level
//! for the whole process; later calls with a different level are
//! silently ignored, same as the original's process-global log sink.

use std::sync::OnceLock;

use crate::config::LogLevel;

static LOGGING: OnceLock<()> = OnceLock::new();

/// Installs the global `tracing` subscriber on first call. On unix this
/// also bridges `log`-based crates through to syslog via `tracing-log`;
/// elsewhere it falls back to a stderr `fmt` layer.
pub fn init_once(level: LogLevel) {
    LOGGING.get_or_init(|| {
        install(level);
    });
}

#[cfg(unix)]
fn install(level: LogLevel) {
    let formatter = syslog::Formatter3164 {
        facility: syslog::Facility::LOG_USER,
        hostname: None,
        process: "mimi-client".into(),
        pid: std::process::id(),
    };

    match syslog::unix(formatter) {
        Ok(logger) => {
            let basic = syslog::BasicLogger::new(logger);
            if log::set_boxed_logger(Box::new(basic)).is_ok() {
                log::set_max_level(level.to_log_filter());
            }
            let _ = tracing_log::LogTracer::init();
            install_stderr_fallback(level);
        }
        Err(_) => install_stderr_fallback(level),
    }
}

#[cfg(not(unix))]
fn install(level: LogLevel) {
    install_stderr_fallback(level);
}

fn install_stderr_fallback(level: LogLevel) {
    let filter = tracing_subscriber::filter::LevelFilter::from_level(level.to_tracing());
    let _ = tracing_subscriber::fmt().with_max_level(filter).try_init();
}
