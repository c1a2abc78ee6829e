//! Event listener descriptors

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serenity::model::{
    application::Interaction,
    channel::{Message, Reaction},
    gateway::Ready,
    guild::Member,
};

use crate::{FerodError, Result, handlers::ListenerHandler};

/// Gateway events the client forwards to listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    Ready,
    InteractionCreate,
    MessageCreate,
    GuildMemberAdd,
    MessageReactionAdd,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        Self::Ready,
        Self::InteractionCreate,
        Self::MessageCreate,
        Self::GuildMemberAdd,
        Self::MessageReactionAdd,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::InteractionCreate => "interactionCreate",
            Self::MessageCreate => "messageCreate",
            Self::GuildMemberAdd => "guildMemberAdd",
            Self::MessageReactionAdd => "messageReactionAdd",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown event '{}', expected one of: {}", s, known.join(", "))
            })
    }
}

/// Payload handed to listeners
#[allow(clippy::large_enum_variant)]
#[derive(Debug, Clone)]
pub enum BotEvent {
    Ready(Ready),
    InteractionCreate(Interaction),
    MessageCreate(Message),
    GuildMemberAdd(Member),
    MessageReactionAdd(Reaction),
}

impl BotEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Ready(_) => EventKind::Ready,
            Self::InteractionCreate(_) => EventKind::InteractionCreate,
            Self::MessageCreate(_) => EventKind::MessageCreate,
            Self::GuildMemberAdd(_) => EventKind::GuildMemberAdd,
            Self::MessageReactionAdd(_) => EventKind::MessageReactionAdd,
        }
    }
}

/// A handler bound to one event for the lifetime of the process
#[derive(Clone)]
pub struct EventListener {
    event: EventKind,
    handler: Arc<dyn ListenerHandler>,
}

impl fmt::Debug for EventListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListener")
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}

impl EventListener {
    pub fn builder() -> ListenerBuilder {
        ListenerBuilder::default()
    }

    pub fn event(&self) -> EventKind {
        self.event
    }

    pub fn handler(&self) -> &Arc<dyn ListenerHandler> {
        &self.handler
    }
}

#[derive(Clone, Default)]
pub struct ListenerBuilder {
    event: Option<EventKind>,
    handler: Option<Arc<dyn ListenerHandler>>,
}

impl fmt::Debug for ListenerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerBuilder")
            .field("event", &self.event)
            .field("handler", &self.handler.as_ref().map(|_| "<handler>"))
            .finish()
    }
}

impl ListenerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event(mut self, event: EventKind) -> Self {
        self.event = Some(event);
        self
    }

    pub fn handler(mut self, handler: Arc<dyn ListenerHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn build(self) -> Result<EventListener> {
        let event = self
            .event
            .ok_or_else(|| FerodError::missing_field("event", "event listener"))?;
        let handler = self
            .handler
            .ok_or_else(|| FerodError::missing_field("handler", format!("{event} listener")))?;

        Ok(EventListener { event, handler })
    }
}
