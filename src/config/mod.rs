use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod settings;

pub use settings::ClientSettings;

const KNOWN_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
}

/// Logging setup, built once at startup and handed to [`init_logging`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            format: LogFormat::default(),
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Normalised level name; unknown names fall back to `error`
    pub fn effective_level(&self) -> &'static str {
        let wanted = self.level.trim().to_lowercase();
        KNOWN_LEVELS
            .into_iter()
            .find(|level| *level == wanted)
            .unwrap_or("error")
    }

    pub fn is_known_level(&self) -> bool {
        KNOWN_LEVELS.contains(&self.level.trim().to_lowercase().as_str())
    }

    fn default_directives(&self) -> String {
        format!(
            "bargain_client={level},zeromq=warn,tokio=warn",
            level = self.effective_level()
        )
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new("info")
    }
}

/// Initialize logging system with structured output and environment-based level filtering.
/// `RUST_LOG`, when set, takes precedence over the configured level.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    if !config.is_known_level() {
        eprintln!("Unknown logging level {}", config.level);
    }

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directives()));

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(false)
        .with_file(true)
        .with_line_number(true)
        .with_level(true);

    let registry = tracing_subscriber::registry().with(env_filter);
    match config.format {
        LogFormat::Compact => registry.with(fmt_layer.compact()).try_init()?,
        LogFormat::Full => registry.with(fmt_layer).try_init()?,
    }

    tracing::debug!(level = config.effective_level(), "Structured logging initialized");
    Ok(())
}

/// Initialize logging for testing with reduced verbosity
pub fn init_test_logging() -> anyhow::Result<()> {
    let env_filter = EnvFilter::new("bargain_client=debug");

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_test_writer().compact())
        .try_init()
        .or_else(|_| Ok(())) // Ignore if already initialized
}
