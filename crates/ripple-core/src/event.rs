//! Event system for the Ripple framework.
//!
//! This module decodes raw long-poll updates into [`Event`] values:
//!
//! - [`EventType`] - the update's category (`message_new`, `group_join`, ...)
//! - [`Message`] - the message payload of message-category events
//! - [`Event`] - the decoded update, keeping the raw payload reachable
//!
//! Only the fields the dispatcher reads are validated; everything else is
//! carried through untouched in [`Event::object`].

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Value, json};

use crate::error::{DecodeError, DecodeResult};

/// Identifier of a conversation (user, chat or community dialog).
pub type PeerId = i64;

// ============================================================================
// Event Type Classification
// ============================================================================

/// Classification of update types.
///
/// Unknown types are preserved in [`EventType::Other`] so that new platform
/// events can still be routed by their wire name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    /// A new incoming message.
    MessageNew,
    /// An outgoing message sent by the community.
    MessageReply,
    /// A message was edited.
    MessageEdit,
    /// A callback button was pressed.
    MessageEvent,
    /// A user allowed messages from the community.
    MessageAllow,
    /// A user denied messages from the community.
    MessageDeny,
    /// A user joined the community.
    GroupJoin,
    /// A user left the community.
    GroupLeave,
    /// Any other update type.
    Other(String),
}

impl EventType {
    /// Returns the wire name of this event type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::MessageNew => "message_new",
            Self::MessageReply => "message_reply",
            Self::MessageEdit => "message_edit",
            Self::MessageEvent => "message_event",
            Self::MessageAllow => "message_allow",
            Self::MessageDeny => "message_deny",
            Self::GroupJoin => "group_join",
            Self::GroupLeave => "group_leave",
            Self::Other(name) => name,
        }
    }

    /// Returns `true` for the message category the dispatcher binds peers for.
    pub fn is_message(&self) -> bool {
        matches!(self, Self::MessageNew)
    }
}

impl FromStr for EventType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "message_new" => Self::MessageNew,
            "message_reply" => Self::MessageReply,
            "message_edit" => Self::MessageEdit,
            "message_event" => Self::MessageEvent,
            "message_allow" => Self::MessageAllow,
            "message_deny" => Self::MessageDeny,
            "group_join" => Self::GroupJoin,
            "group_leave" => Self::GroupLeave,
            other => Self::Other(other.to_string()),
        })
    }
}

impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(ty) => ty,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(EventType::from(name.as_str()))
    }
}

// ============================================================================
// Message payload
// ============================================================================

/// The message carried by a `message_new` update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub id: i64,
    /// The conversation the message belongs to.
    pub peer_id: PeerId,
    #[serde(default)]
    pub from_id: i64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub date: i64,
}

// ============================================================================
// Event
// ============================================================================

#[derive(Deserialize)]
struct RawUpdate {
    #[serde(rename = "type")]
    event_type: EventType,
    #[serde(default)]
    object: Value,
    #[serde(default)]
    group_id: Option<i64>,
    #[serde(default)]
    event_id: Option<String>,
}

/// A decoded long-poll update.
#[derive(Debug, Clone)]
pub struct Event {
    event_type: EventType,
    object: Value,
    group_id: Option<i64>,
    event_id: Option<String>,
    message: Option<Message>,
}

impl Event {
    /// Decodes a raw update (`{type, object, group_id?, event_id?}`).
    ///
    /// For message-category updates `object.message` must be present and carry
    /// a `peer_id`.
    pub fn from_value(raw: Value) -> DecodeResult<Self> {
        if !raw.is_object() {
            return Err(DecodeError::Invalid(format!("expected an object, got {raw}")));
        }
        if raw.get("type").is_none() {
            return Err(DecodeError::MissingField("type"));
        }

        let update = RawUpdate::deserialize(raw)?;
        Self::from_parts(update.event_type, update.object).map(|event| Self {
            group_id: update.group_id,
            event_id: update.event_id,
            ..event
        })
    }

    /// Builds an event from a type and its `object` payload.
    pub fn from_parts(event_type: EventType, object: Value) -> DecodeResult<Self> {
        let message = if event_type.is_message() {
            let raw = object
                .get("message")
                .ok_or(DecodeError::MissingField("object.message"))?;
            Some(Message::deserialize(raw)?)
        } else {
            None
        };

        Ok(Self {
            event_type,
            object,
            group_id: None,
            event_id: None,
            message,
        })
    }

    /// Builds a `message_new` event for `peer_id` with the given text.
    pub fn message_new(peer_id: PeerId, text: impl Into<String>) -> Self {
        let message = Message {
            id: 0,
            peer_id,
            from_id: peer_id,
            text: text.into(),
            date: 0,
        };
        Self {
            event_type: EventType::MessageNew,
            object: json!({ "message": &message }),
            group_id: None,
            event_id: None,
            message: Some(message),
        }
    }

    /// Returns the update's category.
    pub fn event_type(&self) -> &EventType {
        &self.event_type
    }

    /// Returns `true` if this is a message-category event.
    pub fn is_message(&self) -> bool {
        self.event_type.is_message()
    }

    /// Returns the decoded message, for message-category events.
    pub fn message(&self) -> Option<&Message> {
        self.message.as_ref()
    }

    /// Returns the peer the event belongs to, for message-category events.
    pub fn peer_id(&self) -> Option<PeerId> {
        self.message.as_ref().map(|m| m.peer_id)
    }

    /// Returns the message text, for message-category events.
    pub fn text(&self) -> Option<&str> {
        self.message.as_ref().map(|m| m.text.as_str())
    }

    /// Returns the raw `object` payload.
    pub fn object(&self) -> &Value {
        &self.object
    }

    pub fn group_id(&self) -> Option<i64> {
        self.group_id
    }

    pub fn event_id(&self) -> Option<&str> {
        self.event_id.as_deref()
    }
}
