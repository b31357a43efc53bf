//! Client session engine and its lifecycle types.

pub mod engine;
pub mod state;

pub use engine::{ClientSession, Flow, SessionOptions, DEFAULT_SETTLE_DELAY};
pub use state::{SessionState, SessionStats};
