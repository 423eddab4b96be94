//! WebSocket log subscription.
//!
//! One `eth_subscribe("logs")` covers the vault and the position router.
//! Each notification becomes a [`RawEvent`] keyed by block number. A
//! periodic `eth_blockNumber` probe detects half-open connections that never
//! deliver a close frame.

use std::time::Duration;

use alloy_primitives::Address;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

use super::abi::watched_topics;
use super::decode::decode_log;
use super::dto::{request, RpcEnvelope};
use crate::domain::RawEvent;
use crate::error::{Error, Result, SourceError};
use crate::port::outbound::source::{EventStream, StreamEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const SUBSCRIBE_REQUEST_ID: u64 = 1;

/// Build the `eth_subscribe` request for the watched contracts.
#[must_use]
pub fn subscribe_request(vault: Address, router: Address) -> Value {
    request(
        SUBSCRIBE_REQUEST_ID,
        "eth_subscribe",
        json!(["logs", {
            "address": [vault, router],
            "topics": [watched_topics()],
        }]),
    )
}

/// Liveness probe schedule.
///
/// At most one probe is outstanding. The connection is considered dead when
/// a probe goes unanswered for longer than the timeout.
#[derive(Debug, Clone)]
pub struct LivenessProbe {
    interval: Duration,
    timeout: Duration,
    next_send: Instant,
    outstanding: Option<(u64, Instant)>,
}

/// What the stream must do when the probe deadline passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeAction {
    Send,
    Expired,
}

impl LivenessProbe {
    #[must_use]
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            next_send: Instant::now() + interval,
            outstanding: None,
        }
    }

    /// Instant at which [`LivenessProbe::on_deadline`] must be called.
    #[must_use]
    pub fn deadline(&self) -> Instant {
        match self.outstanding {
            Some((_, sent_at)) => sent_at + self.timeout,
            None => self.next_send,
        }
    }

    /// Decide what to do once the deadline has passed.
    #[must_use]
    pub fn on_deadline(&self) -> ProbeAction {
        if self.outstanding.is_some() {
            ProbeAction::Expired
        } else {
            ProbeAction::Send
        }
    }

    /// Record that probe `id` was sent now.
    pub fn sent(&mut self, id: u64) {
        let now = Instant::now();
        self.outstanding = Some((id, now));
        self.next_send = now + self.interval;
    }

    /// Record a response; returns true when it answered the outstanding probe.
    pub fn answered(&mut self, id: u64) -> bool {
        match self.outstanding {
            Some((expected, _)) if expected == id => {
                self.outstanding = None;
                true
            }
            _ => false,
        }
    }

    /// Restart the schedule on a fresh connection.
    pub fn reset(&mut self) {
        self.outstanding = None;
        self.next_send = Instant::now() + self.interval;
    }
}

/// Read frames until the `eth_subscribe` response arrives.
async fn await_subscription_id(ws: &mut WsStream) -> Result<String> {
    while let Some(frame) = ws.next().await {
        let Message::Text(text) = frame? else {
            continue;
        };
        let envelope: RpcEnvelope = serde_json::from_str(&text)?;
        if envelope.id != Some(SUBSCRIBE_REQUEST_ID) {
            continue;
        }
        if let Some(err) = envelope.error {
            return Err(SourceError::from(err).into());
        }
        return envelope
            .result
            .and_then(|v| v.as_str().map(str::to_string))
            .ok_or_else(|| {
                SourceError::Malformed("eth_subscribe returned no subscription id".into()).into()
            });
    }
    Err(Error::Connection("closed before subscription was confirmed".into()))
}

enum Wake {
    Frame(Option<std::result::Result<Message, tokio_tungstenite::tungstenite::Error>>),
    Probe,
}

/// Log subscription over a chain WebSocket endpoint.
pub struct ChainLogStream {
    url: String,
    vault: Address,
    router: Address,
    ws: Option<WsStream>,
    subscription_id: Option<String>,
    probe: LivenessProbe,
    next_request_id: u64,
}

impl ChainLogStream {
    #[must_use]
    pub fn new(
        url: impl Into<String>,
        vault: Address,
        router: Address,
        probe_interval: Duration,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            url: url.into(),
            vault,
            router,
            ws: None,
            subscription_id: None,
            probe: LivenessProbe::new(probe_interval, probe_timeout),
            next_request_id: SUBSCRIBE_REQUEST_ID + 1,
        }
    }

    fn take_request_id(&mut self) -> u64 {
        let id = self.next_request_id;
        self.next_request_id += 1;
        id
    }

    async fn send_probe(&mut self) -> Result<()> {
        let id = self.take_request_id();
        let body = request(id, "eth_blockNumber", json!([])).to_string();
        let ws = self
            .ws
            .as_mut()
            .ok_or_else(|| Error::Connection("Not connected".into()))?;
        ws.send(Message::Text(body)).await?;
        self.probe.sent(id);
        trace!(id, "Liveness probe sent");
        Ok(())
    }

    /// Handle one text frame; returns an event when it carried one.
    fn handle_text(&mut self, text: &str) -> Option<RawEvent> {
        let envelope: RpcEnvelope = match serde_json::from_str(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, bytes = text.len(), "Failed to parse frame");
                return None;
            }
        };

        if let Some(id) = envelope.id {
            if let Some(err) = envelope.error {
                warn!(id, error = %SourceError::from(err), "JSON-RPC error response");
            } else if self.probe.answered(id) {
                trace!(id, "Liveness probe answered");
            }
            return None;
        }

        let log = envelope.into_log()?;
        if log.removed {
            debug!(tx = ?log.transaction_hash, "Dropping removed log after reorg");
            return None;
        }
        match decode_log(&log) {
            Ok(Some(event)) => Some(event),
            Ok(None) => {
                trace!(address = %log.address, "Ignoring log with unknown topic");
                None
            }
            Err(e) => {
                warn!(error = %e, tx = ?log.transaction_hash, "Failed to decode log");
                None
            }
        }
    }
}

#[async_trait]
impl EventStream for ChainLogStream {
    async fn connect(&mut self) -> Result<()> {
        info!(url = %self.url, "Connecting to chain WebSocket");
        let (ws, response) = connect_async(&self.url).await?;
        info!(status = %response.status(), "Chain WebSocket connected");
        self.ws = Some(ws);
        self.subscription_id = None;
        self.probe.reset();
        Ok(())
    }

    async fn subscribe(&mut self) -> Result<()> {
        let body = subscribe_request(self.vault, self.router).to_string();
        let timeout = self.probe.timeout;
        let ws = self
            .ws
            .as_mut()
            .ok_or_else(|| Error::Connection("Not connected".into()))?;
        ws.send(Message::Text(body)).await?;

        let confirmation = tokio::time::timeout(timeout, await_subscription_id(ws))
            .await
            .map_err(|_| Error::Timeout(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)))??;

        info!(
            subscription = %confirmation,
            vault = %self.vault,
            router = %self.router,
            "Subscribed to position logs"
        );
        self.subscription_id = Some(confirmation);
        Ok(())
    }

    async fn next_event(&mut self) -> Option<StreamEvent> {
        loop {
            let deadline = self.probe.deadline();
            let ws = self.ws.as_mut()?;
            let wake = tokio::select! {
                frame = ws.next() => Wake::Frame(frame),
                () = tokio::time::sleep_until(deadline) => Wake::Probe,
            };

            match wake {
                Wake::Probe => match self.probe.on_deadline() {
                    ProbeAction::Expired => {
                        warn!("Liveness probe unanswered, connection presumed dead");
                        return Some(StreamEvent::Disconnected {
                            reason: "liveness probe timed out".into(),
                        });
                    }
                    ProbeAction::Send => {
                        if let Err(e) = self.send_probe().await {
                            return Some(StreamEvent::Disconnected {
                                reason: format!("failed to send probe: {e}"),
                            });
                        }
                    }
                },
                Wake::Frame(None) => return None,
                Wake::Frame(Some(Ok(Message::Text(text)))) => {
                    if let Some(event) = self.handle_text(&text) {
                        return Some(StreamEvent::Event(event));
                    }
                }
                Wake::Frame(Some(Ok(Message::Ping(data)))) => {
                    trace!("Received WebSocket ping");
                    let ws = self.ws.as_mut()?;
                    if ws.send(Message::Pong(data)).await.is_err() {
                        return Some(StreamEvent::Disconnected {
                            reason: "failed to send pong".into(),
                        });
                    }
                }
                Wake::Frame(Some(Ok(Message::Close(frame)))) => {
                    info!(frame = ?frame, "Chain WebSocket closed by server");
                    return Some(StreamEvent::Disconnected {
                        reason: frame.map(|f| f.reason.to_string()).unwrap_or_default(),
                    });
                }
                Wake::Frame(Some(Ok(_))) => {}
                Wake::Frame(Some(Err(e))) => {
                    warn!(error = %e, "Chain WebSocket error");
                    return Some(StreamEvent::Disconnected {
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    async fn disconnect(&mut self) {
        let Some(mut ws) = self.ws.take() else {
            return;
        };
        if let Some(subscription) = self.subscription_id.take() {
            let id = self.take_request_id();
            let body = request(id, "eth_unsubscribe", json!([subscription])).to_string();
            if let Err(e) = ws.send(Message::Text(body)).await {
                debug!(error = %e, "eth_unsubscribe not sent");
            }
        }
        if let Err(e) = ws.close(None).await {
            debug!(error = %e, "WebSocket close failed");
        }
        debug!("Chain WebSocket torn down");
    }

    fn stream_name(&self) -> &'static str {
        "chain"
    }
}
