//! Access restriction middleware.
//!
//! [`RestrictLayer`] wraps a handler service with one [`Restriction`]. When
//! the restriction rejects the author, `InvalidPermissions` is triggered on
//! the [`EventBus`] and the call resolves to [`Outcome::Denied`] without
//! touching the inner service. Several restrictions compose by layering:
//!
//! ```rust,ignore
//! use parley_framework::{ServiceBuilderExt, restrict::RestrictLayer};
//! use tower::ServiceBuilder;
//!
//! let svc = ServiceBuilder::new()
//!     .restrict(&events, Restriction::Guilds(vec![GUILD]))
//!     .restrict(&events, Restriction::Permissions(vec![Permission::ChangeNickname]))
//!     .handler(change_nickname);
//! ```

use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use thiserror::Error;
use tower::{BoxError, Layer, Service, ServiceExt};
use tracing::warn;

use parley_core::{Event, EventBus, EventError, Restriction};

use crate::handler::{CommandHandler, Invocation, Outcome};

/// An event-bus failure raised while reporting a denial.
///
/// Kept distinct from handler errors so the dispatcher can propagate it
/// instead of reporting it as `ExceptionDuringCommand`.
#[derive(Debug, Error)]
#[error(transparent)]
pub(crate) struct RestrictError(pub(crate) EventError);

/// A tower [`Layer`] that guards the inner service with a [`Restriction`].
#[derive(Clone)]
pub struct RestrictLayer {
    restriction: Arc<Restriction>,
    events: Arc<EventBus>,
}

impl RestrictLayer {
    pub fn new(events: Arc<EventBus>, restriction: Restriction) -> Self {
        Self {
            restriction: Arc::new(restriction),
            events,
        }
    }

    pub fn restriction(&self) -> &Restriction {
        &self.restriction
    }
}

impl<S> Layer<S> for RestrictLayer {
    type Service = RestrictService<S>;

    fn layer(&self, inner: S) -> RestrictService<S> {
        RestrictService {
            restriction: Arc::clone(&self.restriction),
            events: Arc::clone(&self.events),
            inner,
        }
    }
}

/// The [`Service`] produced by [`RestrictLayer`].
pub struct RestrictService<S> {
    restriction: Arc<Restriction>,
    events: Arc<EventBus>,
    inner: S,
}

impl<S: Clone> Clone for RestrictService<S> {
    fn clone(&self) -> Self {
        RestrictService {
            restriction: Arc::clone(&self.restriction),
            events: Arc::clone(&self.events),
            inner: self.inner.clone(),
        }
    }
}

impl<S> Service<Invocation> for RestrictService<S>
where
    S: Service<Invocation, Response = Outcome, Error = BoxError> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Outcome;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Outcome, BoxError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, invocation: Invocation) -> Self::Future {
        let restriction = Arc::clone(&self.restriction);
        let events = Arc::clone(&self.events);
        let inner = self.inner.clone();

        async move {
            match restriction.check(&invocation.ctx) {
                Ok(()) => inner.oneshot(invocation).await,
                Err(denial) => {
                    warn!(
                        command = invocation.command.name(),
                        author_id = invocation.ctx.author_id(),
                        reason = %denial.kind,
                        requirement = %denial.requirement,
                        "Restriction denied command"
                    );
                    events
                        .trigger(Event::InvalidPermissions {
                            ctx: invocation.ctx,
                            command: invocation.command,
                            denial: denial.clone(),
                        })
                        .await
                        .map_err(|e| BoxError::from(RestrictError(e)))?;
                    Ok(Outcome::Denied(denial))
                }
            }
        }
        .boxed()
    }
}

/// Wraps a single handler with one restriction.
///
/// Calling this repeatedly nests wrappers: the most recent call becomes the
/// outermost check.
pub fn restrict(
    restriction: Restriction,
    events: &Arc<EventBus>,
    handler: CommandHandler,
) -> CommandHandler {
    CommandHandler::new(RestrictLayer::new(Arc::clone(events), restriction).layer(handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::ServiceBuilderExt;
    use parley_core::{
        Args, CommandInfo, DispatchContext, EventError, EventKind, Permission, Requirement,
        RestrictionKind,
    };
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceBuilder;

    fn invocation(ctx: DispatchContext) -> Invocation {
        Invocation {
            ctx: Arc::new(ctx),
            command: Arc::new(CommandInfo::new("nick", "", Vec::new(), Vec::new())),
            args: Args::default(),
        }
    }

    fn counting_handler(calls: &Arc<AtomicUsize>) -> CommandHandler {
        let calls = Arc::clone(calls);
        CommandHandler::from_fn(move |_ctx, _args| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
            }
        })
    }

    fn denial_log(events: &EventBus) -> Arc<Mutex<Vec<RestrictionKind>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        events.subscribe(EventKind::InvalidPermissions, move |event| {
            let sink = Arc::clone(&sink);
            async move {
                if let Event::InvalidPermissions { denial, .. } = event.as_ref() {
                    sink.lock().push(denial.kind);
                }
                Ok(())
            }
        });
        log
    }

    #[tokio::test]
    async fn test_passing_restriction_calls_inner() {
        let events = Arc::new(EventBus::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = restrict(Restriction::Users(vec![1]), &events, counting_handler(&calls));

        let outcome = handler
            .invoke(invocation(DispatchContext::new(1, 2, "!nick")))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_permission_denies_once() {
        let events = Arc::new(EventBus::new());
        let log = denial_log(&events);
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = restrict(
            Restriction::Permissions(vec![Permission::ChangeNickname]),
            &events,
            counting_handler(&calls),
        );

        let outcome = handler
            .invoke(invocation(DispatchContext::new(1, 2, "!nick")))
            .await
            .unwrap();

        match outcome {
            Outcome::Denied(denial) => assert_eq!(
                denial.requirement,
                Requirement::Permission(Permission::ChangeNickname)
            ),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(*log.lock(), [RestrictionKind::Permission]);
    }

    #[tokio::test]
    async fn test_outermost_restriction_short_circuits() {
        let events = Arc::new(EventBus::new());
        let log = denial_log(&events);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let svc = ServiceBuilder::new()
            .restrict(&events, Restriction::Channels(vec![99]))
            .restrict(&events, Restriction::Role(5))
            .handler(move |_ctx, _args| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            });
        let handler = CommandHandler::new(svc);

        // Fails both; only the outer (channel) restriction reports.
        handler
            .invoke(invocation(DispatchContext::new(1, 2, "!nick")))
            .await
            .unwrap();
        assert_eq!(*log.lock(), [RestrictionKind::Channel]);

        // Passes the channel check, fails the role check.
        handler
            .invoke(invocation(DispatchContext::new(1, 99, "!nick")))
            .await
            .unwrap();
        assert_eq!(
            *log.lock(),
            [RestrictionKind::Channel, RestrictionKind::Role]
        );

        handler
            .invoke(invocation(DispatchContext::new(1, 99, "!nick").with_role(5)))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_denial_without_subscriber_is_configuration_error() {
        let events = Arc::new(EventBus::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = restrict(Restriction::Role(5), &events, counting_handler(&calls));

        let err = handler
            .invoke(invocation(DispatchContext::new(1, 2, "!nick")))
            .await
            .unwrap_err();
        let err = err.downcast::<RestrictError>().unwrap();
        assert!(matches!(
            err.0,
            EventError::Unhandled(EventKind::InvalidPermissions)
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
