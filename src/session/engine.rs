//! Client session engine: one connection's lifecycle end to end.

use std::time::Duration;

use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::state::{SessionState, SessionStats};
use crate::models::{
    DealRequest, DealResponse, Envelope, Hello, MessageIn, MessageInType, MessageOut, OfferRequest,
    OfferResponse, OutboundPayload, PingMsg, Pong, RoundResult,
};
use crate::strategy::Strategy;
use crate::transport::Transport;
use crate::{BargainError, BargainResult};

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(300);

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Identity the transport connects with; the server addresses replies by it
    pub connection_uid: String,
    /// Pause between connecting and sending `HELLO`
    pub settle_delay: Duration,
    /// Answer `PING` with `PONG` instead of ignoring it
    pub reply_to_ping: bool,
}

impl SessionOptions {
    pub fn new() -> Self {
        Self {
            connection_uid: Uuid::new_v4().to_string(),
            settle_delay: DEFAULT_SETTLE_DELAY,
            reply_to_ping: false,
        }
    }

    pub fn with_connection_uid(mut self, connection_uid: impl Into<String>) -> Self {
        self.connection_uid = connection_uid.into();
        self
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    pub fn with_reply_to_ping(mut self, reply_to_ping: bool) -> Self {
        self.reply_to_ping = reply_to_ping;
        self
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// What the dispatch loop does after handling one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Complete,
}

/// Single-connection protocol engine.
///
/// Processes exactly one inbound message at a time, in arrival order. The
/// transport is closed exactly once when [`ClientSession::run`] returns,
/// whichever terminal state was reached.
pub struct ClientSession<T: Transport, S: Strategy> {
    transport: T,
    strategy: S,
    options: SessionOptions,
    state: SessionState,
    agent_id: Option<String>,
    stats: SessionStats,
}

impl<T: Transport, S: Strategy> ClientSession<T, S> {
    pub fn new(transport: T, strategy: S, options: SessionOptions) -> Self {
        Self {
            transport,
            strategy,
            options,
            state: SessionState::Disconnected,
            agent_id: None,
            stats: SessionStats::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Agent uid assigned by `READY`; unset before the handshake completes
    pub fn agent_id(&self) -> Option<&str> {
        self.agent_id.as_deref()
    }

    pub fn connection_uid(&self) -> &str {
        &self.options.connection_uid
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn into_parts(self) -> (T, S) {
        (self.transport, self.strategy)
    }

    /// Run the session until `COMPLETE` or the first fatal error.
    ///
    /// A session runs once; calling `run` again returns an error without
    /// touching the transport.
    pub async fn run(&mut self) -> BargainResult<()> {
        if self.state != SessionState::Disconnected {
            return Err(BargainError::configuration(format!(
                "session {} already ran (state: {})",
                self.options.connection_uid, self.state
            )));
        }

        let span = info_span!(
            "session",
            connection_uid = %self.options.connection_uid,
            transport = self.transport.description()
        );

        async {
            let outcome = self.drive().await;

            if let Err(e) = self.transport.close().await {
                warn!("Failed to close transport cleanly: {}", e);
            }

            match outcome {
                Ok(()) => {
                    self.state = SessionState::Completed;
                    info!(stats = ?self.stats, "Session completed");
                    Ok(())
                }
                Err(e) => {
                    let failed_in = self.state;
                    self.state = SessionState::Failed;
                    error!(state = %failed_in, "Session failed: {}", e.user_message());
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn drive(&mut self) -> BargainResult<()> {
        self.state = SessionState::Connecting;
        let connection_uid = self.options.connection_uid.clone();
        self.transport.connect(&connection_uid).await?;

        if !self.options.settle_delay.is_zero() {
            tokio::time::sleep(self.options.settle_delay).await;
        }

        info!("Send 'hello' to server");
        self.send(Hello::new(self.strategy.name())).await?;

        self.state = SessionState::AwaitingReady;
        let agent_id = self.await_ready().await?;
        self.strategy.assign_identity(&agent_id);
        self.agent_id = Some(agent_id);

        self.state = SessionState::InRound;
        loop {
            let message = match self.next_message().await? {
                Some(message) => message,
                None => continue,
            };
            if self.handle_message(message).await? == Flow::Complete {
                return Ok(());
            }
        }
    }

    async fn await_ready(&mut self) -> BargainResult<String> {
        info!("Wait 'ready' from server ...");
        loop {
            let received = self.transport.recv().await;
            self.stats.frames_received += 1;

            let raw = match received {
                Ok(raw) => raw,
                Err(e @ BargainError::MalformedMessage { .. }) => {
                    debug!("Discarding unreadable frame before 'ready': {}", e);
                    self.stats.ignored_messages += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let envelope = match Envelope::parse(&raw) {
                Ok(envelope) => envelope,
                Err(e) => {
                    debug!("Discarding frame before 'ready': {}", e);
                    self.stats.ignored_messages += 1;
                    continue;
                }
            };

            if envelope.kind() != Some(MessageInType::Ready) {
                debug!(msg_type = %envelope.msg_type, "Discarding message before 'ready'");
                self.stats.ignored_messages += 1;
                continue;
            }

            match MessageIn::from_envelope(MessageInType::Ready, envelope.payload) {
                Ok(MessageIn::Ready(ready)) => {
                    info!(agent_id = %ready.your_agent_uid, "Received 'ready' from server");
                    return Ok(ready.your_agent_uid);
                }
                Ok(other) => {
                    return Err(BargainError::malformed(
                        format!("expected READY, decoded {}", other.kind()),
                        Some(raw),
                    ))
                }
                Err(e) => return Err(with_frame(e, raw)),
            }
        }
    }

    /// Receive and type the next frame; `None` for a tag this version does not know
    async fn next_message(&mut self) -> BargainResult<Option<MessageIn>> {
        let raw = self.transport.recv().await?;
        self.stats.frames_received += 1;
        debug!("Received from server: {}", raw);

        let envelope = Envelope::parse(&raw)?;
        let Some(kind) = envelope.kind() else {
            warn!(msg_type = %envelope.msg_type, "Unexpected message type");
            self.stats.ignored_messages += 1;
            return Ok(None);
        };

        MessageIn::from_envelope(kind, envelope.payload)
            .map(Some)
            .map_err(|e| with_frame(e, raw))
    }

    /// Dispatch one typed message received while in a round
    pub(crate) async fn handle_message(&mut self, message: MessageIn) -> BargainResult<Flow> {
        match message {
            MessageIn::Complete => {
                info!("Received 'complete' from server");
                Ok(Flow::Complete)
            }
            MessageIn::OfferRequest(request) => {
                self.answer_offer(request).await?;
                Ok(Flow::Continue)
            }
            MessageIn::DealRequest(request) => {
                self.answer_deal(request).await?;
                Ok(Flow::Continue)
            }
            MessageIn::RoundResult(result) => {
                self.observe(result);
                Ok(Flow::Continue)
            }
            MessageIn::Ping(ping) if self.options.reply_to_ping => {
                self.answer_ping(ping).await?;
                Ok(Flow::Continue)
            }
            other => {
                warn!(msg_type = %other.kind(), "Unexpected message type");
                self.stats.ignored_messages += 1;
                Ok(Flow::Continue)
            }
        }
    }

    async fn answer_offer(&mut self, request: OfferRequest) -> BargainResult<()> {
        let offer = self.strategy.offer(&request);
        let response = OfferResponse { offer };

        if let Some(reason) = response.find_error() {
            return Err(BargainError::contract_violation(
                format!("round {}: {} (got {:?})", request.round_id, reason, offer),
                Some(OfferResponse::MSG_TYPE.to_string()),
            ));
        }
        if let Some(amount) = offer.filter(|amount| *amount > request.total_amount) {
            return Err(BargainError::contract_violation(
                format!(
                    "round {}: offer {} outside [0, {}]",
                    request.round_id, amount, request.total_amount
                ),
                Some(OfferResponse::MSG_TYPE.to_string()),
            ));
        }

        debug!(round_id = request.round_id, ?offer, "Send 'offer' to server");
        self.send(response).await?;
        self.stats.offers_sent += 1;
        Ok(())
    }

    async fn answer_deal(&mut self, request: DealRequest) -> BargainResult<()> {
        let accepted = self.strategy.decide(&request);
        let response = DealResponse { accepted };

        if let Some(reason) = response.find_error() {
            return Err(BargainError::contract_violation(
                format!("round {}: {}", request.round_id, reason),
                Some(DealResponse::MSG_TYPE.to_string()),
            ));
        }

        debug!(round_id = request.round_id, ?accepted, "Send 'deal' to server");
        self.send(response).await?;
        self.stats.deals_sent += 1;
        Ok(())
    }

    async fn answer_ping(&mut self, ping: PingMsg) -> BargainResult<()> {
        self.send(Pong::new(ping.timestamp)).await?;
        self.stats.pongs_sent += 1;
        Ok(())
    }

    fn observe(&mut self, result: RoundResult) {
        self.stats.rounds_observed += 1;
        if result.win {
            self.stats.rounds_won += 1;
        }
        if result.disconnection_failure {
            self.stats.disconnection_failures += 1;
        }

        debug!(
            round_id = result.round_id,
            win = result.win,
            disconnection_failure = result.disconnection_failure,
            gain = ?self.agent_id.as_deref().and_then(|id| result.gain_of(id)),
            "Round finished"
        );

        if let Err(e) = self.strategy.on_round_result(&result) {
            let err = BargainError::strategy_observation(format!("{:#}", e), Some(result.round_id));
            warn!("{}", err.user_message());
            self.stats.observation_errors += 1;
        }
    }

    async fn send(&mut self, payload: impl Into<MessageOut>) -> BargainResult<()> {
        let frame = payload.into().encode()?;
        self.transport.send(frame).await
    }
}

fn with_frame(err: BargainError, raw: String) -> BargainError {
    match err {
        BargainError::MalformedMessage { message, .. } => BargainError::malformed(message, Some(raw)),
        other => other,
    }
}
