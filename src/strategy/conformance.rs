//! Offline self-check for a strategy, run without a server.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::Strategy;
use crate::models::{DealRequest, DealResponse, OfferRequest, OfferResponse, OutboundPayload, RoundResult};

const CHECK_TOTAL_AMOUNT: i64 = 100;

/// Outcome of [`check_strategy`]
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ConformanceReport {
    pub strategy_name: String,
    pub offer: Option<i64>,
    pub accepted: Option<bool>,
    pub failures: Vec<String>,
}

impl ConformanceReport {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Exercise every decision point once with synthetic requests.
///
/// Observation errors count as failures here, even though a live session
/// only logs them.
pub fn check_strategy(strategy: &mut dyn Strategy) -> ConformanceReport {
    let self_uid = Uuid::new_v4().to_string();
    let other_uid = Uuid::new_v4().to_string();
    let mut report = ConformanceReport {
        strategy_name: strategy.name(),
        offer: None,
        accepted: None,
        failures: Vec::new(),
    };

    if let Some(reason) = crate::models::Hello::new(report.strategy_name.clone()).find_error() {
        report.failures.push(format!("name: {}", reason));
    }

    strategy.assign_identity(&self_uid);

    let offer = strategy.offer(&OfferRequest {
        round_id: 1,
        target_agent_uid: other_uid.clone(),
        total_amount: CHECK_TOTAL_AMOUNT,
    });
    report.offer = offer;
    debug!(?offer, "offer step");

    let response = OfferResponse { offer };
    if let Some(reason) = response.find_error() {
        report.failures.push(format!("offer: {}", reason));
    } else if offer.is_some_and(|o| o > CHECK_TOTAL_AMOUNT) {
        report
            .failures
            .push(format!("offer: {:?} exceeds total amount {}", offer, CHECK_TOTAL_AMOUNT));
    }

    let kept = offer.unwrap_or(0);
    let win = RoundResult {
        round_id: 1,
        win: true,
        agent_gain: HashMap::from([
            (self_uid.clone(), kept),
            (other_uid.clone(), CHECK_TOTAL_AMOUNT - kept),
        ]),
        disconnection_failure: false,
    };
    if let Err(e) = strategy.on_round_result(&win) {
        report.failures.push(format!("round result (win): {}", e));
    }

    let accepted = strategy.decide(&DealRequest {
        round_id: 2,
        from_agent_uid: other_uid.clone(),
        total_amount: CHECK_TOTAL_AMOUNT,
        offer: 1,
    });
    report.accepted = accepted;
    debug!(?accepted, "deal step");

    let response = DealResponse { accepted };
    if let Some(reason) = response.find_error() {
        report.failures.push(format!("deal: {}", reason));
    }

    let dropped = RoundResult {
        round_id: 2,
        win: false,
        agent_gain: HashMap::from([(self_uid, 0), (other_uid, 0)]),
        disconnection_failure: true,
    };
    if let Err(e) = strategy.on_round_result(&dropped) {
        report.failures.push(format!("round result (disconnection): {}", e));
    }

    info!(
        strategy = %report.strategy_name,
        passed = report.passed(),
        failures = report.failures.len(),
        "Strategy conformance check finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{MockStrategy, StrategyRegistry};

    #[test]
    fn test_builtins_pass() {
        let registry = StrategyRegistry::with_builtins();
        for selector in ["midpoint", "fair", "minimal", "random", "accept-all"] {
            let mut strategy = registry.create(selector).unwrap();
            let report = check_strategy(strategy.as_mut());
            assert!(report.passed(), "{} failed: {:?}", selector, report.failures);
        }
    }

    #[test]
    fn test_out_of_range_offer_fails() {
        let mut strategy = MockStrategy::new();
        strategy.expect_name().returning(|| "Greedy".to_string());
        strategy.expect_assign_identity().returning(|_| ());
        strategy.expect_offer().returning(|r| Some(r.total_amount + 1));
        strategy.expect_decide().returning(|_| Some(true));
        strategy.expect_on_round_result().returning(|_| Ok(()));

        let report = check_strategy(&mut strategy);
        assert!(!report.passed());
        assert_eq!(report.offer, Some(101));
        assert!(report.failures[0].contains("exceeds"));
    }

    #[test]
    fn test_missing_answers_and_observer_errors_are_reported() {
        let mut strategy = MockStrategy::new();
        strategy.expect_name().returning(|| String::new());
        strategy.expect_assign_identity().returning(|_| ());
        strategy.expect_offer().returning(|_| None);
        strategy.expect_decide().returning(|_| None);
        strategy
            .expect_on_round_result()
            .returning(|_| Err(anyhow::anyhow!("ledger unavailable")));

        let report = check_strategy(&mut strategy);
        assert_eq!(report.failures.len(), 5);
        assert!(report.failures.iter().any(|f| f.starts_with("name:")));
        assert!(report.failures.iter().any(|f| f.contains("ledger unavailable")));
    }

    #[test]
    fn test_missing_decision_is_the_only_failure() {
        let mut strategy = MockStrategy::new();
        strategy.expect_name().returning(|| "Undecided".to_string());
        strategy.expect_assign_identity().returning(|_| ());
        strategy.expect_offer().returning(|_| Some(50));
        strategy.expect_decide().returning(|_| None);
        strategy.expect_on_round_result().returning(|_| Ok(()));

        let report = check_strategy(&mut strategy);
        assert_eq!(report.accepted, None);
        assert_eq!(report.failures, vec!["deal: Non empty 'accepted' required".to_string()]);
    }

    #[test]
    fn test_zero_offer_is_flagged() {
        let mut strategy = MockStrategy::new();
        strategy.expect_name().returning(|| "Stingy".to_string());
        strategy.expect_assign_identity().returning(|_| ());
        strategy.expect_offer().returning(|_| Some(0));
        strategy.expect_decide().returning(|_| Some(false));
        strategy.expect_on_round_result().returning(|_| Ok(()));

        let report = check_strategy(&mut strategy);
        assert_eq!(report.failures, vec!["offer: Non empty 'offer' required".to_string()]);
    }
}
