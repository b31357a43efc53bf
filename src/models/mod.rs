// Public exports for data models

pub mod messages;

pub use messages::{
    decode, validate, DealRequest, DealResponse, Envelope, Hello, MessageIn, MessageInType,
    MessageOut, MessageOutType, OfferRequest, OfferResponse, OutboundPayload, PingMsg, Pong,
    ReadyMsg, RoundResult,
};
