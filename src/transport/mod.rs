//! Transport adapters.
//!
//! The session engine only sees the [`Transport`] trait: an asynchronous,
//! message-oriented duplex channel carrying one JSON text frame per message,
//! identified by a per-connection identity string.

pub mod channel;
pub mod zmq;

pub use channel::{ChannelPeer, ChannelTransport};
pub use zmq::ZmqTransport;

use async_trait::async_trait;

use crate::BargainResult;

/// Transport trait for different communication methods
#[async_trait]
pub trait Transport: Send {
    /// Open the connection under the given identity
    async fn connect(&mut self, identity: &str) -> BargainResult<()>;

    /// Send one frame
    async fn send(&mut self, frame: String) -> BargainResult<()>;

    /// Wait for the next frame. Suspends until one arrives.
    async fn recv(&mut self) -> BargainResult<String>;

    /// Release the connection. Safe to call on a transport that never connected.
    async fn close(&mut self) -> BargainResult<()>;

    /// Get transport description for logging
    fn description(&self) -> &'static str;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn connect(&mut self, identity: &str) -> BargainResult<()> {
        (**self).connect(identity).await
    }

    async fn send(&mut self, frame: String) -> BargainResult<()> {
        (**self).send(frame).await
    }

    async fn recv(&mut self) -> BargainResult<String> {
        (**self).recv().await
    }

    async fn close(&mut self) -> BargainResult<()> {
        (**self).close().await
    }

    fn description(&self) -> &'static str {
        (**self).description()
    }
}
