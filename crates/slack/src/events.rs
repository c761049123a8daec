use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use teamdraw_core::MemberId;
use thiserror::Error;
use tracing::debug;

use crate::{
    blocks::MessageTemplate,
    commands::{
        normalize_command, CommandParseError, CommandRouteError, CommandRouter,
        DrawCommandService, SlashCommandPayload,
    },
    roster::InMemoryRoster,
    service::{DrawSettings, RosterDrawService},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackEnvelope {
    pub envelope_id: String,
    pub event: SlackEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    SlashCommand(SlashCommandPayload),
    VoiceStateChanged(VoiceStateEvent),
    Unsupported { event_type: String },
}

impl SlackEvent {
    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::SlashCommand(_) => SlackEventType::SlashCommand,
            Self::VoiceStateChanged(_) => SlackEventType::VoiceStateChanged,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    SlashCommand,
    VoiceStateChanged,
    Unsupported,
}

/// A user joined, switched or left a voice room. `room_id` is `None` on leave.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoiceStateEvent {
    pub user_id: String,
    pub room_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded(MessageTemplate),
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Parse(#[from] CommandParseError),
    #[error(transparent)]
    Route(#[from] CommandRouteError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> SlackEventType;
    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<SlackEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Dispatcher over a fresh, empty roster with default draw settings.
pub fn default_dispatcher() -> EventDispatcher {
    dispatcher_with_roster(Arc::new(InMemoryRoster::new()), DrawSettings::default())
}

/// Wires slash commands and voice state tracking to one shared roster.
pub fn dispatcher_with_roster(
    roster: Arc<InMemoryRoster>,
    settings: DrawSettings,
) -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    let service = RosterDrawService::new(roster.clone(), settings);
    dispatcher.register(SlashCommandHandler::new(service));
    dispatcher.register(VoiceStateHandler::new(roster));
    dispatcher
}

pub struct SlashCommandHandler<S> {
    router: CommandRouter<S>,
}

impl<S> SlashCommandHandler<S>
where
    S: DrawCommandService,
{
    pub fn new(service: S) -> Self {
        Self { router: CommandRouter::new(service) }
    }
}

#[async_trait]
impl<S> EventHandler for SlashCommandHandler<S>
where
    S: DrawCommandService + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::SlashCommand
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::SlashCommand(payload) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let normalized = normalize_command(payload.clone())?;
        let message = self.router.route(normalized).await?;
        Ok(HandlerResult::Responded(message))
    }
}

pub struct VoiceStateHandler {
    roster: Arc<InMemoryRoster>,
}

impl VoiceStateHandler {
    pub fn new(roster: Arc<InMemoryRoster>) -> Self {
        Self { roster }
    }
}

#[async_trait]
impl EventHandler for VoiceStateHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::VoiceStateChanged
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::VoiceStateChanged(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        debug!(
            event_name = "roster.voice_state.recorded",
            correlation_id = %ctx.correlation_id,
            user_id = %event.user_id,
            room_id = event.room_id.as_deref().unwrap_or("none"),
            "voice state updated"
        );
        self.roster.record_voice_state(MemberId(event.user_id.clone()), event.room_id.clone());
        Ok(HandlerResult::Processed)
    }
}
