use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use vibecheck_core::{CheckinError, CheckinService};

use crate::commands::{SlashCommandPayload, CHECKIN_COMMAND};

/// One frame read from a Socket Mode transport.
///
/// Connection lifecycle and workload envelopes share the stream, so they share
/// the type. Only `Envelope` frames carry work; the runner logs the rest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SocketEvent {
    Connecting,
    Connected,
    ConnectionError { detail: String },
    Hello,
    Envelope(Envelope),
}

/// A Socket Mode envelope that must be acknowledged by id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub envelope_id: String,
    pub payload: EnvelopePayload,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnvelopePayload {
    SlashCommand(SlashCommandPayload),
    EventsApi { event_type: String },
    Other { event_type: String },
}

impl EnvelopePayload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Self::SlashCommand(_) => PayloadKind::SlashCommand,
            Self::EventsApi { .. } => PayloadKind::EventsApi,
            Self::Other { .. } => PayloadKind::Other,
        }
    }
}

/// Dispatch key for handler registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    SlashCommand,
    EventsApi,
    Other,
}

/// Per-envelope context handed to handlers.
///
/// The cancellation token is the runner's shutdown token; handlers abort
/// in-flight work when it fires.
#[derive(Clone, Debug)]
pub struct EventContext {
    pub correlation_id: String,
    pub cancel: CancellationToken,
}

impl Default for EventContext {
    fn default() -> Self {
        Self {
            correlation_id: "unknown-correlation-id".to_owned(),
            cancel: CancellationToken::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    /// Post `text` back to `channel_id`.
    Reply { channel_id: String, text: String },
    /// Handled, nothing to say in-channel.
    Processed,
    /// No handler claimed the envelope.
    Ignored,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error("unsupported slash command: {0}")]
    UnknownCommand(String),
    #[error(transparent)]
    Checkin(#[from] CheckinError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn payload_kind(&self) -> PayloadKind;
    async fn handle(
        &self,
        envelope: &Envelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

/// Routes envelopes to the handler registered for their payload kind.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<PayloadKind, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.payload_kind(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &Envelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.payload.kind()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Feeds `/vibe` payloads into the check-in service and turns its outcome
/// into the in-channel reply.
///
/// Failures the user can act on become replies; the rest propagate so the
/// runner can log them without posting anything.
pub struct SlashCommandHandler<S> {
    service: S,
}

impl<S> SlashCommandHandler<S>
where
    S: CheckinService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for SlashCommandHandler<S>
where
    S: CheckinService + 'static,
{
    fn payload_kind(&self) -> PayloadKind {
        PayloadKind::SlashCommand
    }

    async fn handle(
        &self,
        envelope: &Envelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let EnvelopePayload::SlashCommand(payload) = &envelope.payload else {
            return Ok(HandlerResult::Ignored);
        };

        if payload.command != CHECKIN_COMMAND {
            return Err(EventHandlerError::UnknownCommand(payload.command.clone()));
        }

        match self.service.handle_checkin(&payload.user_id, &payload.text, &ctx.cancel).await {
            Ok(reply) => {
                Ok(HandlerResult::Reply { channel_id: payload.channel_id.clone(), text: reply })
            }
            Err(error) => match error.user_reply() {
                Some(reply) => Ok(HandlerResult::Reply {
                    channel_id: payload.channel_id.clone(),
                    text: reply.to_owned(),
                }),
                None => Err(EventHandlerError::Checkin(error)),
            },
        }
    }
}
