//! ZeroMQ DEALER adapter, the transport the game server speaks.

use async_trait::async_trait;
use tracing::{debug, info, trace, warn};
use zeromq::util::PeerIdentity;
use zeromq::{DealerSocket, Socket, SocketOptions, SocketRecv, SocketSend, ZmqMessage};

use super::Transport;
use crate::{BargainError, BargainResult};

/// DEALER socket connected to the server's ROUTER endpoint
pub struct ZmqTransport {
    endpoint: String,
    socket: Option<DealerSocket>,
}

impl ZmqTransport {
    /// Create an unconnected transport for `endpoint` (e.g. `tcp://127.0.0.1:4182`)
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            socket: None,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn socket(&mut self) -> BargainResult<&mut DealerSocket> {
        self.socket
            .as_mut()
            .ok_or_else(|| BargainError::transport("socket is not connected"))
    }
}

#[async_trait]
impl Transport for ZmqTransport {
    async fn connect(&mut self, identity: &str) -> BargainResult<()> {
        let peer_id = PeerIdentity::try_from(identity.as_bytes().to_vec())
            .map_err(|e| BargainError::transport(format!("invalid connection identity '{}': {}", identity, e)))?;

        let mut options = SocketOptions::default();
        options.peer_identity(peer_id);

        let mut socket = DealerSocket::with_options(options);
        socket
            .connect(&self.endpoint)
            .await
            .map_err(|e| BargainError::transport(format!("failed to connect to {}: {}", self.endpoint, e)))?;

        info!(endpoint = %self.endpoint, connection_uid = %identity, "MQ dealer socket initialized");
        self.socket = Some(socket);
        Ok(())
    }

    async fn send(&mut self, frame: String) -> BargainResult<()> {
        trace!("Sending frame: {}", frame);
        self.socket()?
            .send(ZmqMessage::from(frame))
            .await
            .map_err(|e| BargainError::transport(format!("send failed: {}", e)))
    }

    async fn recv(&mut self) -> BargainResult<String> {
        let message = self
            .socket()?
            .recv()
            .await
            .map_err(|e| BargainError::transport(format!("receive failed: {}", e)))?;

        // A ROUTER may prepend an empty delimiter; the JSON body is the last frame.
        let frames = message.into_vec();
        let body = frames
            .last()
            .ok_or_else(|| BargainError::transport("received an empty multipart message"))?;

        let frame = String::from_utf8(body.to_vec())
            .map_err(|e| BargainError::malformed(format!("frame is not UTF-8: {}", e), None))?;
        trace!("Received frame: {}", frame);
        Ok(frame)
    }

    async fn close(&mut self) -> BargainResult<()> {
        let Some(socket) = self.socket.take() else {
            debug!("Close requested on an unconnected socket");
            return Ok(());
        };

        let errors = socket.close().await;
        if errors.is_empty() {
            info!(endpoint = %self.endpoint, "Closed socket");
            Ok(())
        } else {
            for e in &errors {
                warn!("Error while closing socket: {}", e);
            }
            Err(BargainError::transport(format!(
                "{} error(s) while closing socket",
                errors.len()
            )))
        }
    }

    fn description(&self) -> &'static str {
        "ZeroMQ DEALER socket"
    }
}
