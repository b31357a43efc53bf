//! In-memory transport backed by tokio channels.
//!
//! [`ChannelTransport::pair`] returns the client end and a [`ChannelPeer`]
//! that plays the server: it pushes inbound frames, reads what the client
//! sent and can see how the connection was used.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use super::Transport;
use crate::models::{MessageIn, MessageOut};
use crate::{BargainError, BargainResult};

#[derive(Debug, Default)]
struct ConnectionLog {
    identity: Option<String>,
    connected: bool,
    close_calls: usize,
}

/// Client end of an in-memory connection
pub struct ChannelTransport {
    inbound: mpsc::UnboundedReceiver<String>,
    outbound: mpsc::UnboundedSender<String>,
    log: Arc<Mutex<ConnectionLog>>,
}

/// Server end of an in-memory connection
pub struct ChannelPeer {
    inbound: Option<mpsc::UnboundedSender<String>>,
    outbound: mpsc::UnboundedReceiver<String>,
    log: Arc<Mutex<ConnectionLog>>,
}

impl ChannelTransport {
    pub fn pair() -> (ChannelTransport, ChannelPeer) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let log = Arc::new(Mutex::new(ConnectionLog::default()));

        let transport = ChannelTransport {
            inbound: inbound_rx,
            outbound: outbound_tx,
            log: Arc::clone(&log),
        };
        let peer = ChannelPeer {
            inbound: Some(inbound_tx),
            outbound: outbound_rx,
            log,
        };
        (transport, peer)
    }

    fn with_log<R>(&self, f: impl FnOnce(&mut ConnectionLog) -> R) -> BargainResult<R> {
        let mut log = self
            .log
            .lock()
            .map_err(|_| BargainError::transport("connection log poisoned"))?;
        Ok(f(&mut log))
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn connect(&mut self, identity: &str) -> BargainResult<()> {
        self.with_log(|log| {
            log.identity = Some(identity.to_string());
            log.connected = true;
        })?;
        debug!(connection_uid = %identity, "In-memory transport connected");
        Ok(())
    }

    async fn send(&mut self, frame: String) -> BargainResult<()> {
        if !self.with_log(|log| log.connected)? {
            return Err(BargainError::transport("send on a transport that is not connected"));
        }
        self.outbound
            .send(frame)
            .map_err(|_| BargainError::transport("peer dropped the connection"))
    }

    async fn recv(&mut self) -> BargainResult<String> {
        if !self.with_log(|log| log.connected)? {
            return Err(BargainError::transport("receive on a transport that is not connected"));
        }
        self.inbound
            .recv()
            .await
            .ok_or_else(|| BargainError::transport("peer closed the connection"))
    }

    async fn close(&mut self) -> BargainResult<()> {
        self.with_log(|log| {
            log.connected = false;
            log.close_calls += 1;
        })?;
        self.inbound.close();
        Ok(())
    }

    fn description(&self) -> &'static str {
        "in-memory channel"
    }
}

impl ChannelPeer {
    /// Queue a typed message for the client
    pub fn send_message(&self, message: &MessageIn) -> BargainResult<()> {
        self.send_raw(message.encode()?)
    }

    /// Queue a raw frame for the client, valid or not
    pub fn send_raw(&self, frame: impl Into<String>) -> BargainResult<()> {
        let sender = self
            .inbound
            .as_ref()
            .ok_or_else(|| BargainError::transport("peer already hung up"))?;
        sender
            .send(frame.into())
            .map_err(|_| BargainError::transport("client end is closed"))
    }

    /// Stop sending; the client's next receive fails once the queue drains
    pub fn hang_up(&mut self) {
        self.inbound = None;
    }

    /// Wait for the next frame the client sent, `None` once the client end is gone
    pub async fn recv_raw(&mut self) -> Option<String> {
        self.outbound.recv().await
    }

    /// Wait for and parse the next message the client sent
    pub async fn recv_message(&mut self) -> BargainResult<Option<MessageOut>> {
        match self.outbound.recv().await {
            Some(frame) => Ok(Some(MessageOut::parse(&frame)?)),
            None => Ok(None),
        }
    }

    /// Every frame the client has sent so far without waiting
    pub fn drain_sent(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.outbound.try_recv() {
            frames.push(frame);
        }
        frames
    }

    /// Identity the client connected with
    pub fn identity(&self) -> Option<String> {
        self.log.lock().ok().and_then(|log| log.identity.clone())
    }

    /// How many times the client closed its end
    pub fn close_calls(&self) -> usize {
        self.log.lock().map(|log| log.close_calls).unwrap_or(0)
    }

    pub fn is_connected(&self) -> bool {
        self.log.lock().map(|log| log.connected).unwrap_or(false)
    }
}
