//! CLI utility functions.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::{init_logging, ClientSettings};
use crate::strategy::ConformanceReport;

/// Values given on the `run` command line; they win over file and environment
#[derive(Debug, Default, Clone)]
pub struct RunOverrides {
    pub strategy: Option<String>,
    pub server_url: Option<String>,
    pub server_port: Option<u16>,
    pub settle_delay_ms: Option<u64>,
    pub reply_to_ping: bool,
}

/// Load settings with precedence defaults < file < environment < `--log-level`
pub fn load_settings(config_path: Option<&Path>, log_level: Option<String>) -> Result<ClientSettings> {
    let mut settings = ClientSettings::load(config_path).context("Failed to load configuration")?;
    if let Some(level) = log_level {
        settings.log_level = level;
    }
    Ok(settings)
}

pub fn apply_run_overrides(settings: &mut ClientSettings, overrides: RunOverrides) {
    if let Some(strategy) = overrides.strategy {
        settings.strategy = Some(strategy);
    }
    if let Some(url) = overrides.server_url {
        settings.server_url = url;
    }
    if let Some(port) = overrides.server_port {
        settings.server_port = port;
    }
    if let Some(delay) = overrides.settle_delay_ms {
        settings.settle_delay_ms = delay;
    }
    if overrides.reply_to_ping {
        settings.reply_to_ping = true;
    }
}

/// Install the subscriber, then report which config file was applied
pub fn start_logging(settings: &ClientSettings, config_path: Option<&Path>) -> Result<()> {
    init_logging(&settings.logging_config()).context("Failed to initialize logging")?;
    log_config_source(config_path);
    Ok(())
}

pub fn log_config_source(config_path: Option<&Path>) {
    match ClientSettings::resolve_file(config_path) {
        Ok(Some(path)) => info!("Using config file: {}", path.display()),
        Ok(None) => debug!("No config file, using defaults and environment"),
        Err(e) => warn!("{}", e),
    }
}

/// Print a conformance report to stdout
pub fn print_report(report: &ConformanceReport) {
    if report.passed() {
        println!("✓ Strategy '{}' passed the conformance check", report.strategy_name);
    } else {
        println!("✗ Strategy '{}' failed the conformance check", report.strategy_name);
        for failure in &report.failures {
            println!("  - {}", failure);
        }
    }
    println!("  offer for 100: {:?}", report.offer);
    println!("  accepts offer of 1: {:?}", report.accepted);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tempfile::NamedTempFile;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[test]
    fn test_config_source_is_logged_to_installed_subscriber() {
        let file = NamedTempFile::new().unwrap();
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            load_settings(Some(file.path()), Some("debug".to_string())).unwrap();
            assert!(captured.text().is_empty());
            log_config_source(Some(file.path()));
        });

        let output = captured.text();
        assert!(output.contains("Using config file"), "{}", output);
        assert!(output.contains(&file.path().display().to_string()), "{}", output);
    }

    #[test]
    fn test_run_overrides_win() {
        let mut settings = ClientSettings {
            strategy: Some("fair".to_string()),
            ..ClientSettings::default()
        };

        apply_run_overrides(
            &mut settings,
            RunOverrides {
                strategy: Some("random".to_string()),
                server_port: Some(9000),
                reply_to_ping: true,
                ..RunOverrides::default()
            },
        );

        assert_eq!(settings.strategy.as_deref(), Some("random"));
        assert_eq!(settings.server_port, 9000);
        assert_eq!(settings.server_url, "127.0.0.1");
        assert!(settings.reply_to_ping);
    }

    #[test]
    fn test_absent_overrides_keep_settings() {
        let mut settings = ClientSettings {
            reply_to_ping: true,
            ..ClientSettings::default()
        };
        let before = settings.clone();
        apply_run_overrides(&mut settings, RunOverrides::default());
        assert_eq!(settings, before);
    }
}
