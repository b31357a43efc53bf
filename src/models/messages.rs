//! Wire vocabulary of the bargaining protocol.
//!
//! Every frame is `{"msg_type": "<TYPE>", "payload": {...} | null}`. Inbound
//! and outbound types are disjoint enums; all data coming from the server goes
//! through [`decode`] (or [`Envelope::parse`] + [`MessageIn::from_envelope`])
//! before anything else looks at it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use crate::{BargainError, BargainResult};

// Inbound

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageInType {
    Ping,
    Ready,
    Complete,
    OfferRequest,
    DealRequest,
    RoundResult,
}

impl MessageInType {
    pub const ALL: [MessageInType; 6] = [
        MessageInType::Ping,
        MessageInType::Ready,
        MessageInType::Complete,
        MessageInType::OfferRequest,
        MessageInType::DealRequest,
        MessageInType::RoundResult,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageInType::Ping => "PING",
            MessageInType::Ready => "READY",
            MessageInType::Complete => "COMPLETE",
            MessageInType::OfferRequest => "OFFER_REQUEST",
            MessageInType::DealRequest => "DEAL_REQUEST",
            MessageInType::RoundResult => "ROUND_RESULT",
        }
    }

    /// Resolve a wire tag; `None` for tags this protocol version does not know
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }
}

impl fmt::Display for MessageInType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Liveness probe. Seconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingMsg {
    #[serde(default = "unix_now")]
    pub timestamp: f64,
}

impl PingMsg {
    pub fn now() -> Self {
        Self {
            timestamp: unix_now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyMsg {
    pub your_agent_uid: String,
}

/// Server asks this agent to propose a split of `total_amount`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferRequest {
    pub round_id: i64,
    pub target_agent_uid: String,
    pub total_amount: i64,
}

/// Server asks this agent to accept or reject a counterpart's offer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealRequest {
    pub round_id: i64,
    pub from_agent_uid: String,
    pub total_amount: i64,
    pub offer: i64,
}

/// Outcome of a completed round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundResult {
    pub round_id: i64,
    /// True if the offer was accepted
    pub win: bool,
    /// Amount received by each participant, keyed by agent uid
    pub agent_gain: HashMap<String, i64>,
    /// The counterpart dropped before the round finished
    #[serde(default)]
    pub disconnection_failure: bool,
}

impl RoundResult {
    /// Gain recorded for the given agent, if it took part
    pub fn gain_of(&self, agent_uid: &str) -> Option<i64> {
        self.agent_gain.get(agent_uid).copied()
    }
}

/// A fully typed inbound message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "msg_type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageIn {
    Ping(PingMsg),
    Ready(ReadyMsg),
    Complete,
    OfferRequest(OfferRequest),
    DealRequest(DealRequest),
    RoundResult(RoundResult),
}

impl MessageIn {
    pub fn kind(&self) -> MessageInType {
        match self {
            MessageIn::Ping(_) => MessageInType::Ping,
            MessageIn::Ready(_) => MessageInType::Ready,
            MessageIn::Complete => MessageInType::Complete,
            MessageIn::OfferRequest(_) => MessageInType::OfferRequest,
            MessageIn::DealRequest(_) => MessageInType::DealRequest,
            MessageIn::RoundResult(_) => MessageInType::RoundResult,
        }
    }

    /// Type the payload of a recognised envelope
    pub fn from_envelope(kind: MessageInType, payload: Option<Value>) -> BargainResult<Self> {
        let message = match kind {
            MessageInType::Ping => MessageIn::Ping(match payload {
                Some(value) => typed_payload(kind, value)?,
                None => PingMsg::now(),
            }),
            MessageInType::Complete => MessageIn::Complete,
            MessageInType::Ready => MessageIn::Ready(typed_payload(kind, required(kind, payload)?)?),
            MessageInType::OfferRequest => {
                MessageIn::OfferRequest(typed_payload(kind, required(kind, payload)?)?)
            }
            MessageInType::DealRequest => {
                MessageIn::DealRequest(typed_payload(kind, required(kind, payload)?)?)
            }
            MessageInType::RoundResult => {
                MessageIn::RoundResult(typed_payload(kind, required(kind, payload)?)?)
            }
        };
        Ok(message)
    }

    /// Serialize as a wire frame; used by server-side drivers and tests
    pub fn encode(&self) -> BargainResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn required(kind: MessageInType, payload: Option<Value>) -> BargainResult<Value> {
    payload.ok_or_else(|| BargainError::malformed(format!("{} requires a payload", kind), None))
}

fn typed_payload<T: DeserializeOwned>(kind: MessageInType, value: Value) -> BargainResult<T> {
    serde_json::from_value(value)
        .map_err(|e| BargainError::malformed(format!("invalid {} payload: {}", kind, e), None))
}

/// Untyped `(msg_type, payload)` pair, parsed but not yet typed
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub msg_type: String,
    pub payload: Option<Value>,
}

impl Envelope {
    /// Parse a raw frame into its tag and payload.
    ///
    /// Fails if the frame is not a JSON object or has no string `msg_type`.
    /// A `null` payload is treated as absent.
    pub fn parse(raw: &str) -> BargainResult<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| BargainError::malformed(format!("frame is not JSON: {}", e), Some(raw.to_string())))?;

        let Value::Object(mut fields) = value else {
            return Err(BargainError::malformed("frame is not a JSON object", Some(raw.to_string())));
        };

        let msg_type = match fields.remove("msg_type") {
            Some(Value::String(tag)) if !tag.is_empty() => tag,
            Some(_) => {
                return Err(BargainError::malformed("'msg_type' must be a non-empty string", Some(raw.to_string())))
            }
            None => return Err(BargainError::malformed("missing 'msg_type'", Some(raw.to_string()))),
        };

        let payload = match fields.remove("payload") {
            None | Some(Value::Null) => None,
            Some(payload) => Some(payload),
        };

        Ok(Self { msg_type, payload })
    }

    pub fn kind(&self) -> Option<MessageInType> {
        MessageInType::from_tag(&self.msg_type)
    }
}

/// Decode a raw frame into a typed inbound message.
///
/// Fails with `MalformedMessage` if the tag is missing or unrecognised, or if
/// the payload does not match the declared type.
pub fn decode(raw: &str) -> BargainResult<MessageIn> {
    let envelope = Envelope::parse(raw)?;
    let kind = envelope.kind().ok_or_else(|| {
        BargainError::malformed(
            format!("unrecognized msg_type '{}'", envelope.msg_type),
            Some(raw.to_string()),
        )
    })?;
    MessageIn::from_envelope(kind, envelope.payload).map_err(|e| match e {
        BargainError::MalformedMessage { message, .. } => {
            BargainError::malformed(message, Some(raw.to_string()))
        }
        other => other,
    })
}

// Outbound

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageOutType {
    Hello,
    Pong,
    OfferResponse,
    DealResponse,
}

impl MessageOutType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageOutType::Hello => "HELLO",
            MessageOutType::Pong => "PONG",
            MessageOutType::OfferResponse => "OFFER_RESPONSE",
            MessageOutType::DealResponse => "DEAL_RESPONSE",
        }
    }
}

impl fmt::Display for MessageOutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outbound payload that knows how to check itself before it is sent
pub trait OutboundPayload {
    const MSG_TYPE: MessageOutType;

    /// Human-readable reason the payload must not be sent, or `None`.
    /// Pure: repeated calls on the same value give the same answer.
    fn find_error(&self) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hello {
    pub my_name: String,
}

impl Hello {
    pub fn new(my_name: impl Into<String>) -> Self {
        Self {
            my_name: my_name.into(),
        }
    }
}

impl OutboundPayload for Hello {
    const MSG_TYPE: MessageOutType = MessageOutType::Hello;

    fn find_error(&self) -> Option<String> {
        if self.my_name.is_empty() {
            return Some("Non empty 'my_name' required".to_string());
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pong {
    pub timestamp: Option<f64>,
}

impl Pong {
    pub fn new(timestamp: f64) -> Self {
        Self {
            timestamp: Some(timestamp),
        }
    }

    pub fn now() -> Self {
        Self::new(unix_now())
    }
}

impl OutboundPayload for Pong {
    const MSG_TYPE: MessageOutType = MessageOutType::Pong;

    fn find_error(&self) -> Option<String> {
        match self.timestamp {
            None => Some("Non empty 'timestamp' required".to_string()),
            Some(ts) if ts.is_nan() || ts < 0.0 => {
                Some("Non negative 'timestamp' required".to_string())
            }
            Some(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferResponse {
    pub offer: Option<i64>,
}

impl OfferResponse {
    pub fn new(offer: i64) -> Self {
        Self { offer: Some(offer) }
    }
}

impl OutboundPayload for OfferResponse {
    const MSG_TYPE: MessageOutType = MessageOutType::OfferResponse;

    fn find_error(&self) -> Option<String> {
        match self.offer {
            // Zero counts as "empty" under the rule the server was built
            // against, even though a zero offer is a legal bargaining move.
            None | Some(0) => Some("Non empty 'offer' required".to_string()),
            Some(offer) if offer < 0 => Some("Non negative 'offer' required".to_string()),
            Some(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealResponse {
    pub accepted: Option<bool>,
}

impl DealResponse {
    pub fn new(accepted: bool) -> Self {
        Self {
            accepted: Some(accepted),
        }
    }
}

impl OutboundPayload for DealResponse {
    const MSG_TYPE: MessageOutType = MessageOutType::DealResponse;

    fn find_error(&self) -> Option<String> {
        if self.accepted.is_none() {
            return Some("Non empty 'accepted' required".to_string());
        }
        None
    }
}

/// Validate any outbound payload
pub fn validate<P: OutboundPayload>(payload: &P) -> Option<String> {
    payload.find_error()
}

/// A validated outbound message, ready to be encoded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msg_type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageOut {
    Hello(Hello),
    Pong(Pong),
    OfferResponse(OfferResponse),
    DealResponse(DealResponse),
}

impl MessageOut {
    pub fn kind(&self) -> MessageOutType {
        match self {
            MessageOut::Hello(_) => MessageOutType::Hello,
            MessageOut::Pong(_) => MessageOutType::Pong,
            MessageOut::OfferResponse(_) => MessageOutType::OfferResponse,
            MessageOut::DealResponse(_) => MessageOutType::DealResponse,
        }
    }

    /// Find the validation error of the wrapped payload, if any
    pub fn find_error(&self) -> Option<String> {
        match self {
            MessageOut::Hello(p) => p.find_error(),
            MessageOut::Pong(p) => p.find_error(),
            MessageOut::OfferResponse(p) => p.find_error(),
            MessageOut::DealResponse(p) => p.find_error(),
        }
    }

    /// Serialize as a wire frame. Refuses to encode an invalid payload.
    pub fn encode(&self) -> BargainResult<String> {
        if let Some(reason) = self.find_error() {
            return Err(BargainError::contract_violation(reason, Some(self.kind().to_string())));
        }
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a frame produced by [`MessageOut::encode`]; used on the server side of tests
    pub fn parse(raw: &str) -> BargainResult<Self> {
        serde_json::from_str(raw)
            .map_err(|e| BargainError::malformed(format!("invalid outbound frame: {}", e), Some(raw.to_string())))
    }
}

impl From<Hello> for MessageOut {
    fn from(payload: Hello) -> Self {
        MessageOut::Hello(payload)
    }
}

impl From<Pong> for MessageOut {
    fn from(payload: Pong) -> Self {
        MessageOut::Pong(payload)
    }
}

impl From<OfferResponse> for MessageOut {
    fn from(payload: OfferResponse) -> Self {
        MessageOut::OfferResponse(payload)
    }
}

impl From<DealResponse> for MessageOut {
    fn from(payload: DealResponse) -> Self {
        MessageOut::DealResponse(payload)
    }
}

fn unix_now() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
