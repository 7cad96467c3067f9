use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vibecheck_core::CheckinError;

use crate::chat::ChatClient;
use crate::events::{
    DispatchError, Envelope, EventContext, EventDispatcher, EventHandlerError, HandlerResult,
    SocketEvent,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport ack failed: {0}")]
    Acknowledge(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Source of Socket Mode frames.
///
/// The production WebSocket client and the scripted test transports both sit
/// behind this trait; the runner only sees `SocketEvent` frames.
#[async_trait]
pub trait SocketTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    /// `Ok(None)` means the stream closed cleanly.
    async fn next_event(&self) -> Result<Option<SocketEvent>, TransportError>;
    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

/// Transport that connects successfully and immediately reports a closed
/// stream. Stands in wherever no live Slack connection is configured.
#[derive(Default)]
pub struct NoopSocketTransport;

#[async_trait]
impl SocketTransport for NoopSocketTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_event(&self) -> Result<Option<SocketEvent>, TransportError> {
        Ok(None)
    }

    async fn acknowledge(&self, _envelope_id: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Event loop over a Socket Mode transport.
///
/// Envelopes are acknowledged before dispatch; Slack redelivers anything left
/// unacknowledged, and the pipeline can outlive its three-second ack window.
/// Each envelope is then dispatched on its own task so one slow check-in never
/// blocks the pump.
pub struct SocketModeRunner {
    transport: Arc<dyn SocketTransport>,
    dispatcher: Arc<EventDispatcher>,
    chat: Arc<dyn ChatClient>,
    reconnect_policy: ReconnectPolicy,
}

impl SocketModeRunner {
    pub fn new(
        transport: Arc<dyn SocketTransport>,
        dispatcher: Arc<EventDispatcher>,
        chat: Arc<dyn ChatClient>,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, dispatcher, chat, reconnect_policy }
    }

    /// Pumps the transport until the stream closes, retries are exhausted, or
    /// `cancel` fires. Transport failures degrade to log lines; the process
    /// keeps running either way.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<()> {
        for attempt in 0..=self.reconnect_policy.max_retries {
            if cancel.is_cancelled() {
                info!("socket mode runner stopping before connect; shutdown requested");
                return Ok(());
            }

            match self.connect_and_pump(attempt, cancel).await {
                Ok(()) => return Ok(()),
                Err(transport_error) => {
                    warn!(
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "socket mode transport failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "socket mode retries exhausted; continuing process without crash"
                        );
                        return Ok(());
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => return Ok(()),
                            () = tokio::time::sleep(delay) => {}
                        }
                    }
                }
            }
        }

        Ok(())
    }

    async fn connect_and_pump(
        &self,
        attempt: u32,
        cancel: &CancellationToken,
    ) -> Result<(), TransportError> {
        info!(attempt, "opening socket mode transport connection");
        self.transport.connect().await?;
        info!(attempt, "socket mode transport connected");

        let mut dispatches = JoinSet::new();
        let outcome = self.pump(attempt, cancel, &mut dispatches).await;

        // Settle in-flight dispatches before reconnecting or returning.
        while let Some(finished) = dispatches.join_next().await {
            log_finished_dispatch(finished);
        }

        outcome
    }

    async fn pump(
        &self,
        attempt: u32,
        cancel: &CancellationToken,
        dispatches: &mut JoinSet<()>,
    ) -> Result<(), TransportError> {
        loop {
            while let Some(finished) = dispatches.try_join_next() {
                log_finished_dispatch(finished);
            }

            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("socket mode runner stopping; shutdown requested");
                    self.transport.disconnect().await?;
                    return Ok(());
                }
                next = self.transport.next_event() => next?,
            };

            let Some(event) = next else {
                info!(attempt, "socket mode transport stream closed");
                self.transport.disconnect().await?;
                return Ok(());
            };

            match event {
                SocketEvent::Connecting => debug!("socket mode transport connecting"),
                SocketEvent::Connected => info!("socket mode transport session established"),
                SocketEvent::Hello => debug!("socket mode hello received"),
                SocketEvent::ConnectionError { detail } => {
                    warn!(detail = %detail, "socket mode transport reported a connection problem");
                }
                SocketEvent::Envelope(envelope) => {
                    self.accept_envelope(envelope, cancel, dispatches).await;
                }
            }
        }
    }

    async fn accept_envelope(
        &self,
        envelope: Envelope,
        cancel: &CancellationToken,
        dispatches: &mut JoinSet<()>,
    ) {
        info!(
            event_name = "ingress.slack.envelope_received",
            envelope_id = %envelope.envelope_id,
            payload_kind = ?envelope.payload.kind(),
            "received slack envelope"
        );

        // Ack precedes dispatch; Slack redelivers unacknowledged envelopes.
        if let Err(error) = self.transport.acknowledge(&envelope.envelope_id).await {
            warn!(
                event_name = "ingress.slack.ack_failed",
                envelope_id = %envelope.envelope_id,
                error = %error,
                "failed to acknowledge slack envelope; dispatching anyway"
            );
        } else {
            debug!(
                event_name = "ingress.slack.ack_sent",
                envelope_id = %envelope.envelope_id,
                "acknowledged slack envelope"
            );
        }

        let dispatcher = Arc::clone(&self.dispatcher);
        let chat = Arc::clone(&self.chat);
        let context = EventContext {
            correlation_id: envelope.envelope_id.clone(),
            cancel: cancel.clone(),
        };
        dispatches.spawn(async move {
            dispatch_envelope(dispatcher, chat, envelope, context).await;
        });
    }
}

async fn dispatch_envelope(
    dispatcher: Arc<EventDispatcher>,
    chat: Arc<dyn ChatClient>,
    envelope: Envelope,
    context: EventContext,
) {
    match dispatcher.dispatch(&envelope, &context).await {
        Ok(HandlerResult::Reply { channel_id, text }) => {
            if let Err(error) = chat.post_message(&channel_id, &text).await {
                warn!(
                    event_name = "egress.slack.reply_failed",
                    correlation_id = %context.correlation_id,
                    channel_id = %channel_id,
                    error = %error,
                    "failed to post reply"
                );
            } else {
                info!(
                    event_name = "egress.slack.reply_sent",
                    correlation_id = %context.correlation_id,
                    channel_id = %channel_id,
                    "posted reply"
                );
            }
        }
        Ok(HandlerResult::Processed) => {
            debug!(correlation_id = %context.correlation_id, "envelope processed without a reply");
        }
        Ok(HandlerResult::Ignored) => {
            debug!(correlation_id = %context.correlation_id, "no handler claimed the envelope");
        }
        Err(DispatchError::Handler(EventHandlerError::Checkin(CheckinError::Cancelled))) => {
            debug!(correlation_id = %context.correlation_id, "dispatch cancelled during shutdown");
        }
        Err(error) => {
            warn!(
                correlation_id = %context.correlation_id,
                error = %error,
                "event dispatch failed; continuing socket loop"
            );
        }
    }
}

fn log_finished_dispatch(finished: Result<(), JoinError>) {
    if let Err(error) = finished {
        warn!(error = %error, "envelope dispatch task aborted");
    }
}
