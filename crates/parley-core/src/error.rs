//! Error types shared across the Parley crates.
//!
//! Message-level conditions (a missing command, a bad argument, a failing
//! handler, a denied restriction) are never errors here: they are reported as
//! [`Event`](crate::event::Event)s. The types below cover configuration
//! problems, which are raised to the caller instead.

use thiserror::Error;

use crate::event::EventKind;

/// Type-erased error returned by handlers and subscribers.
///
/// Identical to `tower::BoxError`, so values flow through tower services
/// without conversion.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A string did not name any member of a closed set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {what} name '{name}'")]
pub struct ParseNameError {
    /// What kind of name was being parsed (e.g. `"permission"`).
    pub what: &'static str,
    /// The offending input.
    pub name: String,
}

impl ParseNameError {
    pub fn new(what: &'static str, name: impl Into<String>) -> Self {
        Self {
            what,
            name: name.into(),
        }
    }
}

/// Configuration errors raised by the [`EventBus`](crate::event::EventBus).
#[derive(Debug, Error)]
pub enum EventError {
    /// The event name is not one of the fixed event kinds.
    #[error("unknown event name '{0}'")]
    UnknownEvent(String),

    /// The subscription to remove is not registered for this event.
    #[error("no such subscriber for {event}")]
    CallbackNotFound {
        /// Event the subscription was looked up under.
        event: EventKind,
    },

    /// An event fired while nobody was subscribed to it.
    #[error("unhandled {0} event: no subscribers registered")]
    Unhandled(EventKind),

    /// A named trigger carried a payload of a different kind.
    #[error("event name '{name}' does not match payload of kind {actual}")]
    KindMismatch {
        /// The requested event name.
        name: String,
        /// The kind of the payload that was supplied.
        actual: EventKind,
    },

    /// A subscriber returned an error; remaining subscribers were skipped.
    #[error("subscriber for {event} failed: {source}")]
    SubscriberFailed {
        /// The event being delivered.
        event: EventKind,
        /// The subscriber's error.
        #[source]
        source: BoxError,
    },
}

impl EventError {
    /// Returns the event kind this error concerns, if any.
    pub fn event(&self) -> Option<EventKind> {
        match self {
            Self::UnknownEvent(_) => None,
            Self::CallbackNotFound { event } | Self::SubscriberFailed { event, .. } => Some(*event),
            Self::Unhandled(event) => Some(*event),
            Self::KindMismatch { actual, .. } => Some(*actual),
        }
    }
}

/// Result type for event bus operations.
pub type EventResult<T> = Result<T, EventError>;
