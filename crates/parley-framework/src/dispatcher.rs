//! Message dispatcher for the Parley framework.
//!
//! The [`Dispatcher`] runs one message through the whole pipeline:
//!
//! 1. Strip a configured prefix; messages without one are ignored silently
//! 2. Resolve the command (`CommandNotFound` on a miss)
//! 3. Coerce the raw tokens (`ArgumentCastingError` on the first bad token)
//! 4. Invoke the handler service, restrictions included
//! 5. Report `CommandReceived` whenever the handler service returns normally,
//!    including after a restriction denial, or `ExceptionDuringCommand` when
//!    it fails
//!
//! ```rust,ignore
//! let events = Arc::new(EventBus::new());
//! let mut registry = CommandRegistry::new();
//! registry.register(Command::builder("hello").handler_fn(hello))?;
//!
//! let dispatcher = Dispatcher::new(registry, events, Resolver::new(["!"]));
//! dispatcher.dispatch(DispatchContext::new(1, 2, "!hello")).await?;
//! ```

use std::sync::Arc;

use tracing::{Instrument, debug, debug_span, error, trace, warn};

use parley_core::{CastFailure, Denial, DispatchContext, Event, EventBus};

use crate::coerce::ArgumentCoercer;
use crate::error::DispatchResult;
use crate::handler::{Invocation, Outcome};
use crate::registry::CommandRegistry;
use crate::resolver::{Resolution, Resolver};
use crate::restrict::RestrictError;

/// What happened to one dispatched message.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// No prefix; nothing was reported.
    Ignored,
    /// `CommandNotFound` was reported.
    NotFound,
    /// `ArgumentCastingError` was reported.
    CastFailed(CastFailure),
    /// The handler ran and `CommandReceived` was reported.
    Completed,
    /// A restriction rejected the author; `InvalidPermissions` and then
    /// `CommandReceived` were reported.
    Denied(Denial),
    /// The handler failed and `ExceptionDuringCommand` was reported.
    Failed,
}

/// The central message dispatcher.
///
/// Holds no per-message state, so `dispatch` can run concurrently from many
/// tasks. Cloning shares the registry and event bus.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    events: Arc<EventBus>,
    resolver: Resolver,
    coercer: ArgumentCoercer,
}

impl Dispatcher {
    /// Freezes `registry` and pairs it with an event bus and resolver.
    ///
    /// Uses the default [`ArgumentCoercer`]; see [`with_coercer`](Self::with_coercer).
    pub fn new(
        registry: impl Into<Arc<CommandRegistry>>,
        events: Arc<EventBus>,
        resolver: Resolver,
    ) -> Self {
        Self {
            registry: registry.into(),
            events,
            resolver,
            coercer: ArgumentCoercer::default(),
        }
    }

    pub fn with_coercer(mut self, coercer: ArgumentCoercer) -> Self {
        self.coercer = coercer;
        self
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Dispatches one message.
    ///
    /// Problems with the message itself are reported through the event bus
    /// and reflected in the returned [`DispatchOutcome`]. An `Err` means the
    /// event bus is misconfigured: an event had no subscribers or a
    /// subscriber failed.
    pub async fn dispatch(
        &self,
        ctx: impl Into<Arc<DispatchContext>>,
    ) -> DispatchResult<DispatchOutcome> {
        let ctx = ctx.into();
        let span = debug_span!(
            "dispatch",
            author_id = ctx.author_id(),
            channel_id = ctx.channel_id()
        );
        self.run(ctx).instrument(span).await
    }

    async fn run(&self, ctx: Arc<DispatchContext>) -> DispatchResult<DispatchOutcome> {
        let found = match self.resolver.resolve(&self.registry, ctx.content()) {
            Resolution::NotACommand => {
                trace!("No prefix, ignoring message");
                return Ok(DispatchOutcome::Ignored);
            }
            Resolution::NotFound => {
                debug!(content = ctx.content(), "No command matched");
                self.events.trigger(Event::CommandNotFound { ctx }).await?;
                return Ok(DispatchOutcome::NotFound);
            }
            Resolution::Matched(found) => found,
        };

        let command = Arc::clone(found.command.info());
        let handler = found.command.handler().clone();
        debug!(command = command.name(), alias = found.alias, "Resolved command");

        let coerced = {
            let tokens = found.tokens();
            self.coercer.coerce(command.params(), &tokens)
        };
        let args = match coerced {
            Ok(args) => args,
            Err(failure) => {
                warn!(
                    command = command.name(),
                    index = failure.index,
                    token = %failure.token,
                    expected = %failure.expected,
                    "Argument casting failed"
                );
                self.events
                    .trigger(Event::ArgumentCastingError {
                        ctx,
                        command,
                        failure: failure.clone(),
                    })
                    .await?;
                return Ok(DispatchOutcome::CastFailed(failure));
            }
        };

        let invocation = Invocation {
            ctx: Arc::clone(&ctx),
            command: Arc::clone(&command),
            args,
        };
        match handler.invoke(invocation).await {
            Ok(Outcome::Completed) => {
                debug!(command = command.name(), "Command completed");
                self.events
                    .trigger(Event::CommandReceived { ctx, command })
                    .await?;
                Ok(DispatchOutcome::Completed)
            }
            Ok(Outcome::Denied(denial)) => {
                // The guarded handler returned normally after InvalidPermissions.
                self.events
                    .trigger(Event::CommandReceived { ctx, command })
                    .await?;
                Ok(DispatchOutcome::Denied(denial))
            }
            Err(err) => match err.downcast::<RestrictError>() {
                Ok(restrict_error) => Err(restrict_error.0.into()),
                Err(err) => {
                    error!(command = command.name(), error = %err, "Command handler failed");
                    self.events
                        .trigger(Event::ExceptionDuringCommand {
                            ctx,
                            command,
                            error: err,
                        })
                        .await?;
                    Ok(DispatchOutcome::Failed)
                }
            },
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("command_count", &self.registry.len())
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}
