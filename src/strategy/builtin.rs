//! Reference strategies shipped with the client.

use rand::Rng;

use super::Strategy;
use crate::models::{DealRequest, OfferRequest, RoundResult};

/// Proposes half of the pot and accepts any non-zero offer
#[derive(Debug, Default, Clone)]
pub struct MidpointStrategy;

impl Strategy for MidpointStrategy {
    fn name(&self) -> String {
        "Midpoint".to_string()
    }

    fn offer(&mut self, request: &OfferRequest) -> Option<i64> {
        Some(request.total_amount / 2)
    }

    fn decide(&mut self, request: &DealRequest) -> Option<bool> {
        Some(request.offer > 0)
    }

    fn on_round_result(&mut self, _result: &RoundResult) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Proposes half of the pot and only accepts at least half
#[derive(Debug, Default, Clone)]
pub struct FairStrategy;

impl Strategy for FairStrategy {
    fn name(&self) -> String {
        "Fair".to_string()
    }

    fn offer(&mut self, request: &OfferRequest) -> Option<i64> {
        Some(request.total_amount / 2)
    }

    fn decide(&mut self, request: &DealRequest) -> Option<bool> {
        Some(request.offer >= request.total_amount / 2)
    }

    fn on_round_result(&mut self, _result: &RoundResult) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Proposes the smallest non-zero amount and accepts any non-zero offer
#[derive(Debug, Default, Clone)]
pub struct MinimalStrategy;

impl Strategy for MinimalStrategy {
    fn name(&self) -> String {
        "Minimal".to_string()
    }

    fn offer(&mut self, request: &OfferRequest) -> Option<i64> {
        Some(request.total_amount.min(1))
    }

    fn decide(&mut self, request: &DealRequest) -> Option<bool> {
        Some(request.offer > 0)
    }

    fn on_round_result(&mut self, _result: &RoundResult) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Proposes a uniformly random amount and flips a coin on deals
#[derive(Debug, Default, Clone)]
pub struct RandomStrategy;

impl Strategy for RandomStrategy {
    fn name(&self) -> String {
        "Random".to_string()
    }

    fn offer(&mut self, request: &OfferRequest) -> Option<i64> {
        // Zero would be refused before sending, so draw from 1..=total.
        if request.total_amount < 1 {
            return Some(request.total_amount.max(0));
        }
        Some(rand::thread_rng().gen_range(1..=request.total_amount))
    }

    fn decide(&mut self, _request: &DealRequest) -> Option<bool> {
        Some(rand::thread_rng().gen_bool(0.5))
    }

    fn on_round_result(&mut self, _result: &RoundResult) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Template strategy: always asks for 1, always accepts, and keeps a running
/// tally of its own gains once it knows its identity
#[derive(Debug, Default, Clone)]
pub struct AcceptAllStrategy {
    agent_uid: Option<String>,
    total_gain: i64,
    rounds_seen: u64,
}

impl AcceptAllStrategy {
    pub fn total_gain(&self) -> i64 {
        self.total_gain
    }

    pub fn rounds_seen(&self) -> u64 {
        self.rounds_seen
    }
}

impl Strategy for AcceptAllStrategy {
    fn name(&self) -> String {
        "AcceptAll".to_string()
    }

    fn assign_identity(&mut self, agent_uid: &str) {
        self.agent_uid = Some(agent_uid.to_string());
    }

    fn offer(&mut self, _request: &OfferRequest) -> Option<i64> {
        Some(1)
    }

    fn decide(&mut self, _request: &DealRequest) -> Option<bool> {
        Some(true)
    }

    fn on_round_result(&mut self, result: &RoundResult) -> anyhow::Result<()> {
        self.rounds_seen += 1;
        if let Some(uid) = &self.agent_uid {
            let gain = result
                .gain_of(uid)
                .ok_or_else(|| anyhow::anyhow!("round {} has no entry for agent {}", result.round_id, uid))?;
            self.total_gain += gain;
        }
        Ok(())
    }
}
