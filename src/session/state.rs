//! Session lifecycle states and counters.

use serde::Serialize;
use std::fmt;

/// `Disconnected → Connecting → AwaitingReady → InRound → Completed`, with
/// `Failed` reachable from any state. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Disconnected,
    Connecting,
    AwaitingReady,
    InRound,
    Completed,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::AwaitingReady => "awaiting_ready",
            SessionState::InRound => "in_round",
            SessionState::Completed => "completed",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub frames_received: u64,
    pub offers_sent: u64,
    pub deals_sent: u64,
    pub pongs_sent: u64,
    pub rounds_observed: u64,
    pub rounds_won: u64,
    pub disconnection_failures: u64,
    pub observation_errors: u64,
    pub ignored_messages: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(SessionState::Completed.is_terminal());
        assert!(SessionState::Failed.is_terminal());
        assert!(!SessionState::InRound.is_terminal());
        assert_eq!(SessionState::AwaitingReady.to_string(), "awaiting_ready");
    }
}
