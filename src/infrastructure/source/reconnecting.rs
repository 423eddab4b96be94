//! Reconnecting wrapper for [`EventStream`].
//!
//! Provides automatic reconnection with exponential backoff and circuit breaker
//! protection for any [`EventStream`] implementation. The wrapper tears down
//! the old connection, reconnects and re-registers the subscription.
//!
//! Events emitted while the connection was down are not replayed; the gap is
//! logged on every reconnect.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::infrastructure::config::reconnection::ReconnectionConfig;
use crate::port::outbound::source::{EventStream, StreamEvent};

/// Circuit breaker state for connection attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CircuitState {
    /// Normal operation; connections are allowed.
    Closed,
    /// Too many consecutive failures; connections blocked until cooldown expires.
    Open {
        /// Instant when the circuit breaker will transition back to Closed.
        until: Instant,
    },
}

/// Wrapper that adds automatic reconnection to any [`EventStream`].
///
/// Transparently handles disconnections by:
/// 1. Tearing down the old connection
/// 2. Waiting with exponential backoff
/// 3. Reconnecting and re-subscribing
///
/// A circuit breaker trips after too many consecutive failures to prevent
/// resource exhaustion.
pub struct ReconnectingStream<S: EventStream> {
    inner: S,
    config: ReconnectionConfig,
    /// Whether `subscribe` has been called and must be repeated on reconnect.
    subscribed: bool,
    consecutive_failures: u32,
    current_delay_ms: u64,
    circuit_state: CircuitState,
    connected: bool,
    /// When the current outage started.
    down_since: Option<Instant>,
}

impl<S: EventStream> ReconnectingStream<S> {
    /// Create a new reconnecting wrapper around a stream.
    ///
    /// The wrapper starts in a disconnected state; call [`connect`](EventStream::connect)
    /// before reading events. Connect and subscribe failures, including the
    /// first ones, go through the same backoff and circuit breaker.
    pub fn new(inner: S, config: ReconnectionConfig) -> Self {
        let initial_delay = config.initial_delay_ms;
        Self {
            inner,
            config,
            subscribed: false,
            consecutive_failures: 0,
            current_delay_ms: initial_delay,
            circuit_state: CircuitState::Closed,
            connected: false,
            down_since: None,
        }
    }

    /// Reset backoff state after a successful connection.
    fn reset_backoff(&mut self) {
        self.consecutive_failures = 0;
        self.current_delay_ms = self.config.initial_delay_ms;
        self.circuit_state = CircuitState::Closed;
    }

    /// Current delay plus jitter; advances the delay for the next call.
    fn next_delay(&mut self) -> Duration {
        let base_delay = Duration::from_millis(self.current_delay_ms);
        let delay = base_delay + Duration::from_millis(jitter_ms(base_delay));

        let next_delay = (self.current_delay_ms as f64 * self.config.backoff_multiplier) as u64;
        self.current_delay_ms = next_delay.min(self.config.max_delay_ms);

        delay
    }

    /// Returns true if the circuit is closed or has cooled down.
    fn circuit_allows_connection(&mut self) -> bool {
        match self.circuit_state {
            CircuitState::Closed => true,
            CircuitState::Open { until } => {
                if Instant::now() >= until {
                    info!("Circuit breaker cooldown expired, allowing reconnection");
                    self.reset_backoff();
                    true
                } else {
                    false
                }
            }
        }
    }

    fn record_failure(&mut self) {
        self.consecutive_failures += 1;
        self.connected = false;
        self.down_since.get_or_insert_with(Instant::now);

        if self.consecutive_failures >= self.config.max_consecutive_failures {
            let cooldown = Duration::from_millis(self.config.circuit_breaker_cooldown_ms);
            let until = Instant::now() + cooldown;
            self.circuit_state = CircuitState::Open { until };
            error!(
                stream = self.inner.stream_name(),
                failures = self.consecutive_failures,
                cooldown_secs = cooldown.as_secs(),
                "Circuit breaker tripped, pausing reconnection attempts"
            );
        }
    }

    /// Tear down, wait, reconnect and re-subscribe.
    ///
    /// # Errors
    ///
    /// Returns an error if connection or resubscription fails.
    async fn reconnect(&mut self) -> Result<(), Error> {
        if !self.circuit_allows_connection() {
            if let CircuitState::Open { until } = self.circuit_state {
                let remaining = until.saturating_duration_since(Instant::now());
                warn!(
                    remaining_secs = remaining.as_secs(),
                    "Circuit breaker open, waiting for cooldown"
                );
                sleep(remaining).await;
                self.reset_backoff();
            }
        }

        self.inner.disconnect().await;

        let delay = self.next_delay();
        info!(
            stream = self.inner.stream_name(),
            delay_ms = delay.as_millis() as u64,
            attempt = self.consecutive_failures + 1,
            "Reconnecting after delay"
        );
        sleep(delay).await;

        if let Err(e) = self.inner.connect().await {
            error!(error = %e, "Reconnection failed");
            self.record_failure();
            return Err(e);
        }

        if self.subscribed {
            if let Err(e) = self.inner.subscribe().await {
                error!(error = %e, "Resubscribe failed after reconnect");
                self.record_failure();
                return Err(e);
            }
        }

        self.connected = true;
        if let Some(since) = self.down_since.take() {
            warn!(
                stream = self.inner.stream_name(),
                gap_ms = since.elapsed().as_millis() as u64,
                "Reconnected; events emitted during the gap are not replayed"
            );
        }
        Ok(())
    }
}

/// Up to 20% random jitter on top of `base_delay`.
fn jitter_ms(base_delay: Duration) -> u64 {
    let jitter_range_ms = (base_delay.as_millis() as u64) / 5;
    if jitter_range_ms == 0 {
        return 0;
    }
    rand::thread_rng().gen_range(0..=jitter_range_ms)
}

#[async_trait]
impl<S: EventStream> EventStream for ReconnectingStream<S> {
    /// Connect once; a failure is recorded and left to the backoff loop in
    /// [`next_event`](EventStream::next_event), so this never returns an error.
    async fn connect(&mut self) -> Result<(), Error> {
        match self.inner.connect().await {
            Ok(()) => {
                self.connected = true;
                self.reset_backoff();
            }
            Err(e) => {
                warn!(
                    stream = self.inner.stream_name(),
                    error = %e,
                    "Initial connection failed, retrying with backoff"
                );
                self.record_failure();
            }
        }
        Ok(())
    }

    /// Register the subscription. While disconnected it is only remembered
    /// and sent after the next successful reconnect.
    async fn subscribe(&mut self) -> Result<(), Error> {
        self.subscribed = true;
        if !self.connected {
            return Ok(());
        }
        if let Err(e) = self.inner.subscribe().await {
            warn!(
                stream = self.inner.stream_name(),
                error = %e,
                "Subscribe failed, retrying after reconnect"
            );
            self.record_failure();
        }
        Ok(())
    }

    async fn next_event(&mut self) -> Option<StreamEvent> {
        loop {
            if !self.connected {
                if let Err(e) = self.reconnect().await {
                    warn!(error = %e, "Reconnection attempt failed, will retry");
                    continue;
                }
            }

            match self.inner.next_event().await {
                Some(StreamEvent::Disconnected { reason }) => {
                    warn!(reason = %reason, "Connection lost, will reconnect");
                    self.record_failure();
                    continue;
                }
                Some(event) => {
                    if self.consecutive_failures > 0 {
                        debug!("Received event after reconnection, resetting failure count");
                        self.reset_backoff();
                    }
                    return Some(event);
                }
                None => {
                    warn!("Event stream ended unexpectedly, will reconnect");
                    self.record_failure();
                    continue;
                }
            }
        }
    }

    async fn disconnect(&mut self) {
        self.inner.disconnect().await;
        self.connected = false;
        self.subscribed = false;
    }

    fn stream_name(&self) -> &'static str {
        self.inner.stream_name()
    }
}
