//! Decision interface between protocol mechanics and bargaining policy.
//!
//! A [`Strategy`] is the only extension point of the client. The session
//! engine calls it synchronously from its dispatch loop, one message at a
//! time, so implementations may keep private state without locking but must
//! return promptly.

pub mod builtin;
pub mod conformance;
pub mod registry;

pub use builtin::{AcceptAllStrategy, FairStrategy, MidpointStrategy, MinimalStrategy, RandomStrategy};
pub use conformance::{check_strategy, ConformanceReport};
pub use registry::{StrategyFactory, StrategyRegistry};

use crate::models::{DealRequest, OfferRequest, RoundResult};

#[cfg_attr(test, mockall::automock)]
pub trait Strategy: Send {
    /// Display name sent in `HELLO`. Must be idempotent and side-effect free.
    fn name(&self) -> String;

    /// Called once when the server assigns this client its agent uid
    fn assign_identity(&mut self, _agent_uid: &str) {}

    /// Amount to propose out of `request.total_amount`.
    ///
    /// Must lie in `[0, total_amount]`. `None` means the strategy has no
    /// answer; either case outside the contract ends the session.
    fn offer(&mut self, request: &OfferRequest) -> Option<i64>;

    /// Accept (`true`) or reject (`false`) a counterpart's offer
    fn decide(&mut self, request: &DealRequest) -> Option<bool>;

    /// Observe the outcome of a round. Errors are logged, never fatal.
    fn on_round_result(&mut self, result: &RoundResult) -> anyhow::Result<()>;
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn name(&self) -> String {
        (**self).name()
    }

    fn assign_identity(&mut self, agent_uid: &str) {
        (**self).assign_identity(agent_uid)
    }

    fn offer(&mut self, request: &OfferRequest) -> Option<i64> {
        (**self).offer(request)
    }

    fn decide(&mut self, request: &DealRequest) -> Option<bool> {
        (**self).decide(request)
    }

    fn on_round_result(&mut self, result: &RoundResult) -> anyhow::Result<()> {
        (**self).on_round_result(result)
    }
}
