//! Shared helpers for session-level tests: a strategy that records every
//! call it receives and a scripted server built on the in-memory transport.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bargain_client::models::{DealRequest, MessageIn, MessageOut, OfferRequest, ReadyMsg, RoundResult};
use bargain_client::session::{ClientSession, SessionOptions};
use bargain_client::strategy::Strategy;
use bargain_client::transport::{ChannelPeer, ChannelTransport};
use bargain_client::BargainResult;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    AssignIdentity(String),
    Offer(OfferRequest),
    Decide(DealRequest),
    RoundResult(RoundResult),
}

/// Handle on the calls a [`RecordingStrategy`] received
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn round_results(&self) -> Vec<RoundResult> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::RoundResult(result) => Some(result),
                _ => None,
            })
            .collect()
    }
}

pub struct RecordingStrategy {
    pub name: String,
    pub offer: fn(&OfferRequest) -> Option<i64>,
    pub decide: fn(&DealRequest) -> Option<bool>,
    pub fail_observation: bool,
    pub log: CallLog,
}

impl RecordingStrategy {
    /// Offers half, accepts anything non-zero
    pub fn halving(name: &str) -> Self {
        Self {
            name: name.to_string(),
            offer: |r| Some(r.total_amount / 2),
            decide: |r| Some(r.offer > 0),
            fail_observation: false,
            log: CallLog::default(),
        }
    }

    pub fn with_offer(mut self, offer: fn(&OfferRequest) -> Option<i64>) -> Self {
        self.offer = offer;
        self
    }

    pub fn with_decide(mut self, decide: fn(&DealRequest) -> Option<bool>) -> Self {
        self.decide = decide;
        self
    }

    pub fn failing_observation(mut self) -> Self {
        self.fail_observation = true;
        self
    }
}

impl Strategy for RecordingStrategy {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn assign_identity(&mut self, agent_uid: &str) {
        self.log.push(Call::AssignIdentity(agent_uid.to_string()));
    }

    fn offer(&mut self, request: &OfferRequest) -> Option<i64> {
        self.log.push(Call::Offer(request.clone()));
        (self.offer)(request)
    }

    fn decide(&mut self, request: &DealRequest) -> Option<bool> {
        self.log.push(Call::Decide(request.clone()));
        (self.decide)(request)
    }

    fn on_round_result(&mut self, result: &RoundResult) -> anyhow::Result<()> {
        self.log.push(Call::RoundResult(result.clone()));
        if self.fail_observation {
            anyhow::bail!("observer exploded on round {}", result.round_id);
        }
        Ok(())
    }
}

pub type RunningSession =
    JoinHandle<(ClientSession<ChannelTransport, RecordingStrategy>, BargainResult<()>)>;

pub fn test_options(connection_uid: &str) -> SessionOptions {
    SessionOptions::new()
        .with_connection_uid(connection_uid)
        .with_settle_delay(Duration::ZERO)
}

/// Start a session on its own task; the returned peer plays the server
pub fn spawn_session(strategy: RecordingStrategy, options: SessionOptions) -> (RunningSession, ChannelPeer) {
    let (transport, peer) = ChannelTransport::pair();
    let handle = tokio::spawn(async move {
        let mut session = ClientSession::new(transport, strategy, options);
        let outcome = session.run().await;
        (session, outcome)
    });
    (handle, peer)
}

/// Complete the handshake from the server side and return the HELLO received
pub async fn handshake(peer: &mut ChannelPeer, agent_uid: &str) -> MessageOut {
    let hello = recv(peer).await;
    peer.send_message(&ready(agent_uid)).unwrap();
    hello
}

/// Next message from the client, failing the test if none arrives in time
pub async fn recv(peer: &mut ChannelPeer) -> MessageOut {
    tokio::time::timeout(Duration::from_secs(5), peer.recv_message())
        .await
        .expect("client did not send in time")
        .unwrap()
        .expect("client end closed")
}

/// Wait for the session task to finish
pub async fn finish(
    handle: RunningSession,
) -> (ClientSession<ChannelTransport, RecordingStrategy>, BargainResult<()>) {
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("session did not finish in time")
        .expect("session task panicked")
}

pub fn ready(agent_uid: &str) -> MessageIn {
    MessageIn::Ready(ReadyMsg {
        your_agent_uid: agent_uid.to_string(),
    })
}

pub fn offer_request(round_id: i64, total_amount: i64) -> MessageIn {
    MessageIn::OfferRequest(OfferRequest {
        round_id,
        target_agent_uid: "counterpart".to_string(),
        total_amount,
    })
}

pub fn deal_request(round_id: i64, total_amount: i64, offer: i64) -> MessageIn {
    MessageIn::DealRequest(DealRequest {
        round_id,
        from_agent_uid: "counterpart".to_string(),
        total_amount,
        offer,
    })
}

pub fn round_result(round_id: i64, win: bool, gains: &[(&str, i64)], disconnection_failure: bool) -> RoundResult {
    RoundResult {
        round_id,
        win,
        agent_gain: gains
            .iter()
            .map(|(uid, gain)| (uid.to_string(), *gain))
            .collect::<HashMap<_, _>>(),
        disconnection_failure,
    }
}
