//! CLI command implementations.

use anyhow::{Context, Result};
use futures::future::join_all;
use tracing::{error, info};

use crate::config::ClientSettings;
use crate::session::{ClientSession, SessionStats};
use crate::strategy::{check_strategy, StrategyRegistry};
use crate::transport::ZmqTransport;
use crate::{BargainError, BargainResult};

use super::utils::print_report;

/// Play `sessions` independent sessions against the configured server
pub async fn run(settings: ClientSettings, sessions: usize) -> Result<()> {
    let registry = StrategyRegistry::with_builtins();
    settings.validate_with(&registry)?;

    let selector = settings
        .strategy
        .clone()
        .ok_or_else(|| BargainError::configuration("a strategy selector is required"))?;
    let endpoint = settings.endpoint()?;

    info!(
        strategy = %selector,
        endpoint = %endpoint,
        sessions,
        "Starting bargaining client"
    );

    let mut pending = Vec::with_capacity(sessions);
    for _ in 0..sessions {
        let strategy = registry.create(&selector)?;
        let transport = ZmqTransport::new(endpoint.clone());
        let session = ClientSession::new(transport, strategy, settings.session_options());
        pending.push(play(session));
    }

    let outcomes = join_all(pending).await;

    let mut first_failure = None;
    for (connection_uid, outcome) in outcomes {
        match outcome {
            Ok(stats) => info!(
                connection_uid = %connection_uid,
                rounds = stats.rounds_observed,
                won = stats.rounds_won,
                "Session finished"
            ),
            Err(e) => {
                error!(connection_uid = %connection_uid, "Session failed: {}", e);
                first_failure.get_or_insert(e);
            }
        }
    }

    match first_failure {
        Some(e) => Err::<(), _>(e).context("At least one session failed"),
        None => Ok(()),
    }
}

async fn play(
    mut session: ClientSession<ZmqTransport, Box<dyn crate::strategy::Strategy>>,
) -> (String, BargainResult<SessionStats>) {
    let connection_uid = session.connection_uid().to_string();
    let outcome = session.run().await.map(|()| session.stats().clone());
    (connection_uid, outcome)
}

/// Run the offline conformance check for one strategy
pub fn check(selector: &str) -> Result<()> {
    let registry = StrategyRegistry::with_builtins();
    let mut strategy = registry.create(selector)?;

    info!("Create agent from {}", selector);
    let report = check_strategy(strategy.as_mut());
    print_report(&report);

    if !report.passed() {
        return Err(BargainError::contract_violation(report.failures.join("; "), None).into());
    }
    Ok(())
}

/// List registered strategies
pub fn strategies() -> Result<()> {
    let registry = StrategyRegistry::with_builtins();
    for selector in registry.selectors() {
        let name = registry.create(selector)?.name();
        println!("{:<12} {}", selector, name);
    }
    println!();
    println!("Aliases:");
    for (alias, selector) in registry.aliases() {
        println!("  {} -> {}", alias, selector);
    }
    Ok(())
}

/// Show the resolved configuration
pub fn config(settings: &ClientSettings, show: bool) -> Result<()> {
    if show {
        println!("{}", settings.to_toml()?);
    } else {
        match ClientSettings::config_path() {
            Some(path) => println!("Config file: {}", path.display()),
            None => println!("No config directory available on this platform"),
        }
        println!("Endpoint: {}", settings.endpoint()?);
    }
    Ok(())
}
