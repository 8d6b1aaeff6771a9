//! Lifecycle and error events.
//!
//! The dispatch core reports everything that happens to a message through a
//! fixed set of five events:
//!
//! | Kind | Fired when |
//! |---|---|
//! | [`CommandNotFound`](EventKind::CommandNotFound) | a prefixed message matches no command |
//! | [`ArgumentCastingError`](EventKind::ArgumentCastingError) | an argument fails coercion |
//! | [`ExceptionDuringCommand`](EventKind::ExceptionDuringCommand) | a handler returns an error |
//! | [`CommandReceived`](EventKind::CommandReceived) | a handler completes |
//! | [`InvalidPermissions`](EventKind::InvalidPermissions) | a restriction rejects the author |
//!
//! Firing an event nobody subscribed to is a configuration error: the
//! [`EventBus`] returns [`EventError::Unhandled`] instead of dropping the event.
//!
//! ```rust,ignore
//! use parley_core::{EventBus, EventKind};
//!
//! let bus = EventBus::new();
//! bus.subscribe(EventKind::CommandNotFound, |event| async move {
//!     println!("unknown command: {}", event.ctx().content());
//!     Ok(())
//! });
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::trace;

use crate::access::Denial;
use crate::command::{CastFailure, CommandInfo};
use crate::context::DispatchContext;
use crate::error::{BoxError, EventError, EventResult};

// =============================================================================
// Event kinds and payloads
// =============================================================================

/// The closed set of event names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    CommandNotFound,
    ArgumentCastingError,
    ExceptionDuringCommand,
    CommandReceived,
    InvalidPermissions,
}

impl EventKind {
    /// All event kinds.
    pub const ALL: [EventKind; 5] = [
        Self::CommandNotFound,
        Self::ArgumentCastingError,
        Self::ExceptionDuringCommand,
        Self::CommandReceived,
        Self::InvalidPermissions,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CommandNotFound => "CommandNotFound",
            Self::ArgumentCastingError => "ArgumentCastingError",
            Self::ExceptionDuringCommand => "ExceptionDuringCommand",
            Self::CommandReceived => "CommandReceived",
            Self::InvalidPermissions => "InvalidPermissions",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| EventError::UnknownEvent(s.to_string()))
    }
}

/// Payload delivered to subscribers.
#[derive(Debug)]
pub enum Event {
    CommandNotFound {
        ctx: Arc<DispatchContext>,
    },
    ArgumentCastingError {
        ctx: Arc<DispatchContext>,
        command: Arc<CommandInfo>,
        failure: CastFailure,
    },
    ExceptionDuringCommand {
        ctx: Arc<DispatchContext>,
        command: Arc<CommandInfo>,
        error: BoxError,
    },
    CommandReceived {
        ctx: Arc<DispatchContext>,
        command: Arc<CommandInfo>,
    },
    InvalidPermissions {
        ctx: Arc<DispatchContext>,
        command: Arc<CommandInfo>,
        denial: Denial,
    },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::CommandNotFound { .. } => EventKind::CommandNotFound,
            Self::ArgumentCastingError { .. } => EventKind::ArgumentCastingError,
            Self::ExceptionDuringCommand { .. } => EventKind::ExceptionDuringCommand,
            Self::CommandReceived { .. } => EventKind::CommandReceived,
            Self::InvalidPermissions { .. } => EventKind::InvalidPermissions,
        }
    }

    /// The message the event is about.
    pub fn ctx(&self) -> &Arc<DispatchContext> {
        match self {
            Self::CommandNotFound { ctx }
            | Self::ArgumentCastingError { ctx, .. }
            | Self::ExceptionDuringCommand { ctx, .. }
            | Self::CommandReceived { ctx, .. }
            | Self::InvalidPermissions { ctx, .. } => ctx,
        }
    }

    /// The resolved command, or `None` for [`Event::CommandNotFound`].
    pub fn command(&self) -> Option<&Arc<CommandInfo>> {
        match self {
            Self::CommandNotFound { .. } => None,
            Self::ArgumentCastingError { command, .. }
            | Self::ExceptionDuringCommand { command, .. }
            | Self::CommandReceived { command, .. }
            | Self::InvalidPermissions { command, .. } => Some(command),
        }
    }
}

// =============================================================================
// Subscribers
// =============================================================================

/// A callback attached to one event kind.
///
/// Closures of the shape `Fn(Arc<Event>) -> impl Future<Output = Result<(),
/// BoxError>>` are accepted directly by [`EventBus::subscribe`]; implement this
/// trait for subscribers that carry their own state.
#[async_trait]
pub trait Subscriber: Send + Sync + 'static {
    async fn on_event(&self, event: Arc<Event>) -> Result<(), BoxError>;
}

struct FnSubscriber<F>(F);

#[async_trait]
impl<F, Fut> Subscriber for FnSubscriber<F>
where
    F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    async fn on_event(&self, event: Arc<Event>) -> Result<(), BoxError> {
        (self.0)(event).await
    }
}

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type SubscriberList = Vec<(SubscriptionId, Arc<dyn Subscriber>)>;

// =============================================================================
// EventBus
// =============================================================================

/// Ordered subscriber lists for the five event kinds.
///
/// Subscribers run in subscription order. The bus is meant to be filled
/// during setup and shared behind an `Arc` afterwards; the lists are
/// lock-protected, but a trigger only sees the subscribers present when it
/// started.
pub struct EventBus {
    next_id: AtomicU64,
    subscribers: RwLock<HashMap<EventKind, SubscriberList>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Creates a bus with an empty list for every event kind.
    pub fn new() -> Self {
        let subscribers = EventKind::ALL
            .into_iter()
            .map(|kind| (kind, Vec::new()))
            .collect();
        Self {
            next_id: AtomicU64::new(0),
            subscribers: RwLock::new(subscribers),
        }
    }

    /// Appends a closure subscriber to `kind`.
    pub fn subscribe<F, Fut>(&self, kind: EventKind, callback: F) -> SubscriptionId
    where
        F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.subscribe_with(kind, FnSubscriber(callback))
    }

    /// Appends a [`Subscriber`] implementation to `kind`.
    pub fn subscribe_with<S: Subscriber>(&self, kind: EventKind, subscriber: S) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .write()
            .entry(kind)
            .or_default()
            .push((id, Arc::new(subscriber)));
        trace!(event = %kind, "Subscriber added");
        id
    }

    /// Like [`subscribe`](Self::subscribe) but takes the event name as a
    /// string.
    pub fn subscribe_named<F, Fut>(&self, name: &str, callback: F) -> EventResult<SubscriptionId>
    where
        F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let kind = name.parse()?;
        Ok(self.subscribe(kind, callback))
    }

    /// Removes a subscription.
    pub fn unsubscribe(&self, kind: EventKind, id: SubscriptionId) -> EventResult<()> {
        let mut subscribers = self.subscribers.write();
        let list = subscribers.entry(kind).or_default();
        let position = list
            .iter()
            .position(|(sid, _)| *sid == id)
            .ok_or(EventError::CallbackNotFound { event: kind })?;
        list.remove(position);
        Ok(())
    }

    pub fn unsubscribe_named(&self, name: &str, id: SubscriptionId) -> EventResult<()> {
        self.unsubscribe(name.parse()?, id)
    }

    /// Number of subscribers currently attached to `kind`.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers.read().get(&kind).map_or(0, Vec::len)
    }

    /// Delivers `event` to every subscriber of its kind, in order.
    ///
    /// Returns [`EventError::Unhandled`] if the kind has no subscribers, and
    /// stops at the first subscriber error with
    /// [`EventError::SubscriberFailed`].
    pub async fn trigger(&self, event: Event) -> EventResult<()> {
        let kind = event.kind();
        let subscribers: Vec<Arc<dyn Subscriber>> = self
            .subscribers
            .read()
            .get(&kind)
            .map(|list| list.iter().map(|(_, s)| Arc::clone(s)).collect())
            .unwrap_or_default();

        if subscribers.is_empty() {
            return Err(EventError::Unhandled(kind));
        }

        trace!(event = %kind, subscribers = subscribers.len(), "Triggering event");
        let event = Arc::new(event);
        for subscriber in subscribers {
            subscriber
                .on_event(Arc::clone(&event))
                .await
                .map_err(|source| EventError::SubscriberFailed {
                    event: kind,
                    source,
                })?;
        }
        Ok(())
    }

    /// Triggers `event` after checking that `name` is a valid event name that
    /// matches the payload.
    pub async fn trigger_named(&self, name: &str, event: Event) -> EventResult<()> {
        let kind: EventKind = name.parse()?;
        if kind != event.kind() {
            return Err(EventError::KindMismatch {
                name: name.to_string(),
                actual: event.kind(),
            });
        }
        self.trigger(event).await
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subscribers = self.subscribers.read();
        let mut counts: Vec<_> = subscribers.iter().map(|(k, v)| (*k, v.len())).collect();
        counts.sort();
        f.debug_struct("EventBus")
            .field("subscribers", &counts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{Requirement, RestrictionKind};
    use crate::command::ParamType;
    use crate::permission::Permission;
    use parking_lot::Mutex;

    fn not_found() -> Event {
        Event::CommandNotFound {
            ctx: Arc::new(DispatchContext::new(1, 2, "!nope")),
        }
    }

    /// A representative event of each kind.
    fn payload(kind: EventKind) -> Event {
        let ctx = Arc::new(DispatchContext::new(1, 2, "!nick Bob"));
        let command = Arc::new(CommandInfo::new(
            "nick",
            "Changes the nickname",
            Vec::new(),
            vec![ParamType::String],
        ));
        match kind {
            EventKind::CommandNotFound => Event::CommandNotFound { ctx },
            EventKind::ArgumentCastingError => Event::ArgumentCastingError {
                ctx,
                command,
                failure: CastFailure::missing(0, ParamType::String),
            },
            EventKind::ExceptionDuringCommand => Event::ExceptionDuringCommand {
                ctx,
                command,
                error: "handler failed".into(),
            },
            EventKind::CommandReceived => Event::CommandReceived { ctx, command },
            EventKind::InvalidPermissions => Event::InvalidPermissions {
                ctx,
                command,
                denial: Denial {
                    kind: RestrictionKind::Permission,
                    requirement: Requirement::Permission(Permission::ChangeNickname),
                },
            },
        }
    }

    fn recorder(
        log: &Arc<Mutex<Vec<&'static str>>>,
        tag: &'static str,
    ) -> impl Fn(Arc<Event>) -> futures::future::Ready<Result<(), BoxError>> + Send + Sync + 'static
    {
        let log = Arc::clone(log);
        move |_event| {
            log.lock().push(tag);
            futures::future::ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_trigger_without_subscribers_is_unhandled() {
        let bus = EventBus::new();
        for kind in EventKind::ALL {
            assert_eq!(bus.subscriber_count(kind), 0);
            let event = payload(kind);
            assert_eq!(event.kind(), kind);

            let err = bus.trigger(event).await.unwrap_err();
            assert!(matches!(err, EventError::Unhandled(k) if k == kind));
            assert_eq!(
                err.to_string(),
                format!("unhandled {kind} event: no subscribers registered")
            );
        }
    }

    #[tokio::test]
    async fn test_subscribers_run_in_registration_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(EventKind::CommandNotFound, recorder(&log, "first"));
        bus.subscribe(EventKind::CommandNotFound, recorder(&log, "second"));
        bus.subscribe(EventKind::CommandReceived, recorder(&log, "other"));

        bus.trigger(not_found()).await.unwrap();
        assert_eq!(*log.lock(), ["first", "second"]);
    }

    #[tokio::test]
    async fn test_failing_subscriber_aborts_the_rest() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(EventKind::CommandNotFound, recorder(&log, "first"));
        bus.subscribe(EventKind::CommandNotFound, |_event| async {
            Err::<(), BoxError>("boom".into())
        });
        bus.subscribe(EventKind::CommandNotFound, recorder(&log, "third"));

        let err = bus.trigger(not_found()).await.unwrap_err();
        match err {
            EventError::SubscriberFailed { event, source } => {
                assert_eq!(event, EventKind::CommandNotFound);
                assert_eq!(source.to_string(), "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(*log.lock(), ["first"]);
    }

    #[test]
    fn test_unknown_event_names_are_rejected() {
        let bus = EventBus::new();
        let err = bus
            .subscribe_named("OnMessage", |_event| async { Ok(()) })
            .unwrap_err();
        assert!(matches!(err, EventError::UnknownEvent(ref name) if name == "OnMessage"));

        let id = bus
            .subscribe_named("CommandReceived", |_event| async { Ok(()) })
            .unwrap();
        assert_eq!(bus.subscriber_count(EventKind::CommandReceived), 1);
        assert!(matches!(
            bus.unsubscribe_named("Nope", id),
            Err(EventError::UnknownEvent(_))
        ));
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = bus.subscribe(EventKind::CommandNotFound, recorder(&log, "first"));
        bus.subscribe(EventKind::CommandNotFound, recorder(&log, "second"));

        bus.unsubscribe(EventKind::CommandNotFound, first).unwrap();
        assert_eq!(bus.subscriber_count(EventKind::CommandNotFound), 1);

        let err = bus.unsubscribe(EventKind::CommandNotFound, first).unwrap_err();
        assert!(matches!(
            err,
            EventError::CallbackNotFound {
                event: EventKind::CommandNotFound
            }
        ));
        // Registered under a different kind.
        assert!(bus.unsubscribe(EventKind::CommandReceived, first).is_err());

        tokio_test::block_on(bus.trigger(not_found())).unwrap();
        assert_eq!(*log.lock(), ["second"]);
    }

    #[tokio::test]
    async fn test_trigger_named_checks_name_and_payload() {
        let bus = EventBus::new();
        bus.subscribe(EventKind::CommandNotFound, |_event| async { Ok(()) });

        assert!(bus.trigger_named("CommandNotFound", not_found()).await.is_ok());
        assert!(matches!(
            bus.trigger_named("CommandReceived", not_found()).await,
            Err(EventError::KindMismatch { .. })
        ));
        assert!(matches!(
            bus.trigger_named("Whatever", not_found()).await,
            Err(EventError::UnknownEvent(_))
        ));
    }

    #[test]
    fn test_event_kind_names() {
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
        }
    }
}
