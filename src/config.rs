//! Typed session configuration and its builder.

use std::time::Duration;

use crate::encoder::AudioFormat;
use crate::transport::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_RECV_TIMEOUT, DEFAULT_SEND_TIMEOUT};

/// The five numeric log levels from the C ABI, mapped to `tracing::Level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 3,
    Warning = 4,
    Info = 6,
    Debug = 7,
    Trace = 9,
}

impl LogLevel {
    pub fn from_numeric(value: i32) -> Option<LogLevel> {
        match value {
            3 => Some(LogLevel::Error),
            4 => Some(LogLevel::Warning),
            6 => Some(LogLevel::Info),
            7 => Some(LogLevel::Debug),
            9 => Some(LogLevel::Trace),
            _ => None,
        }
    }

    pub fn to_tracing(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warning => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }

    #[cfg(unix)]
    pub fn to_log_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warning => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Everything needed to open a session: connection target, audio shape,
/// auth, and timeouts. The non-FFI equivalent of the `mimi_open` argument
/// list.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    pub path: String,
    pub use_tls: bool,
    pub format: AudioFormat,
    pub sample_rate: u32,
    pub channels: u8,
    pub extra_headers: Vec<(String, String)>,
    pub bearer_token: Option<String>,
    pub log_level: LogLevel,
    pub connect_timeout: Duration,
    pub send_timeout: Duration,
    pub recv_timeout: Duration,
}

/// Builder for [`SessionConfig`], following the corpus-wide builder
/// convention (set up fields one call at a time, `build()` returns the
/// immutable value).
pub struct SessionConfigBuilder {
    host: String,
    port: u16,
    path: String,
    use_tls: bool,
    format: AudioFormat,
    sample_rate: u32,
    channels: u8,
    extra_headers: Vec<(String, String)>,
    bearer_token: Option<String>,
    log_level: LogLevel,
    connect_timeout: Duration,
    send_timeout: Duration,
    recv_timeout: Duration,
}

impl SessionConfigBuilder {
    pub fn new(host: impl Into<String>, port: u16) -> SessionConfigBuilder {
        SessionConfigBuilder {
            host: host.into(),
            port,
            path: "/".to_string(),
            use_tls: true,
            format: AudioFormat::Pcm,
            sample_rate: 16000,
            channels: 1,
            extra_headers: Vec::new(),
            bearer_token: None,
            log_level: LogLevel::Warning,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            recv_timeout: DEFAULT_RECV_TIMEOUT,
        }
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn use_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    pub fn format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }

    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn channels(mut self, channels: u8) -> Self {
        self.channels = channels;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    /// Sets the bearer token. Leaving this unset keeps
    /// [`SessionConfig::bearer_token`] at `None`, never an
    /// uninitialized-but-present empty string.
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    pub fn recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = timeout;
        self
    }

    pub fn build(self) -> SessionConfig {
        SessionConfig {
            host: self.host,
            port: self.port,
            path: self.path,
            use_tls: self.use_tls,
            format: self.format,
            sample_rate: self.sample_rate,
            channels: self.channels,
            extra_headers: self.extra_headers,
            bearer_token: self.bearer_token,
            log_level: self.log_level,
            connect_timeout: self.connect_timeout,
            send_timeout: self.send_timeout,
            recv_timeout: self.recv_timeout,
        }
    }
}
