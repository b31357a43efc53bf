//! Bargain Client
//!
//! One participant in a multi-round, two-party bargaining game driven by a
//! remote server. The crate owns the client-side protocol engine: handshake,
//! per-round message dispatch, outbound validation and the strategy seam.

pub mod cli;
pub mod config;
pub mod models;
pub mod session;
pub mod strategy;
pub mod transport;

/// Application-wide error types with context preservation
#[derive(Debug, thiserror::Error)]
pub enum BargainError {
    #[error("Malformed message: {message}")]
    MalformedMessage { message: String, frame: Option<String> },

    #[error("Strategy contract violation: {message}")]
    ContractViolation { message: String, msg_type: Option<String> },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Round result observation failed: {message}")]
    StrategyObservation { message: String, round_id: Option<i64> },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl BargainError {
    /// Create a malformed message error, keeping the offending frame if known
    pub fn malformed(message: impl Into<String>, frame: Option<String>) -> Self {
        Self::MalformedMessage {
            message: message.into(),
            frame,
        }
    }

    /// Create a contract violation attributed to the plugged strategy
    pub fn contract_violation(message: impl Into<String>, msg_type: Option<String>) -> Self {
        Self::ContractViolation {
            message: message.into(),
            msg_type,
        }
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a strategy observation error for the given round
    pub fn strategy_observation(message: impl Into<String>, round_id: Option<i64>) -> Self {
        Self::StrategyObservation {
            message: message.into(),
            round_id,
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether this error ends the session
    pub fn is_fatal(&self) -> bool {
        !matches!(self, BargainError::StrategyObservation { .. })
    }

    /// Process exit status used when this error terminates the binary
    pub fn exit_code(&self) -> i32 {
        match self {
            BargainError::Configuration { .. } => 2,
            BargainError::UnknownStrategy(_) => 2,
            BargainError::MalformedMessage { .. } => 3,
            BargainError::Serialization { .. } => 3,
            BargainError::ContractViolation { .. } => 4,
            BargainError::Transport { .. } => 5,
            BargainError::Io { .. } => 5,
            BargainError::StrategyObservation { .. } => 1,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            BargainError::MalformedMessage { message, frame } => {
                if let Some(raw) = frame {
                    format!("Server sent an unreadable message ({}): {}", message, raw)
                } else {
                    format!("Server sent an unreadable message: {}", message)
                }
            }
            BargainError::ContractViolation { message, msg_type } => {
                if let Some(kind) = msg_type {
                    format!("Strategy produced an invalid {}: {}", kind, message)
                } else {
                    format!("Strategy produced an invalid answer: {}", message)
                }
            }
            BargainError::Transport { message } => {
                format!("Communication error: {}", message)
            }
            BargainError::StrategyObservation { message, round_id } => {
                if let Some(id) = round_id {
                    format!("Strategy failed to observe round {}: {}", id, message)
                } else {
                    format!("Strategy failed to observe a round: {}", message)
                }
            }
            BargainError::Configuration { message } => {
                format!("Configuration issue: {}", message)
            }
            BargainError::UnknownStrategy(selector) => {
                format!("No strategy registered under '{}'", selector)
            }
            BargainError::Serialization { source } => {
                format!("Data format error: {}", source)
            }
            BargainError::Io { source } => {
                format!("I/O error: {}", source)
            }
        }
    }
}

/// Convenience type alias for Results
pub type BargainResult<T> = Result<T, BargainError>;
