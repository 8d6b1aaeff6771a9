//! Core handler service for the Parley framework.
//!
//! [`HandlerService<F>`] wraps a single async function and implements
//! `tower::Service<Invocation>`. [`CommandHandler`] is the boxed, cloneable
//! form a [`Command`](crate::registry::Command) owns.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use tower::util::{BoxCloneSyncService, Oneshot};
use tower::{BoxError, Service, ServiceExt};

use parley_core::{Args, CommandInfo, Denial, DispatchContext};

// ============================================================================
// Invocation / Outcome
// ============================================================================

/// The request a command handler service receives.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// The message being dispatched.
    pub ctx: Arc<DispatchContext>,
    /// The command that was resolved.
    pub command: Arc<CommandInfo>,
    /// Arguments coerced to the command's declared parameter types.
    pub args: Args,
}

/// How a handler service finished without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The handler ran to completion.
    Completed,
    /// A restriction rejected the author; the handler did not run and
    /// `InvalidPermissions` has already been reported.
    Denied(Denial),
}

// ============================================================================
// HandlerResponse
// ============================================================================

/// A trait for types that can be returned from handlers.
///
/// Every error a handler returns is reported as `ExceptionDuringCommand`,
/// including [`EventError`](parley_core::EventError)s from the handler's own
/// event bus calls.
pub trait HandlerResponse: Send + 'static {
    /// Converts the return value into the handler's result.
    fn into_result(self) -> Result<(), BoxError>;
}

/// Implementation for `()` - the handler cannot fail.
impl HandlerResponse for () {
    fn into_result(self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Implementation for `Result<(), E>` - errors become `ExceptionDuringCommand`.
impl<E> HandlerResponse for Result<(), E>
where
    E: Into<BoxError> + Send + 'static,
{
    fn into_result(self) -> Result<(), BoxError> {
        self.map_err(Into::into)
    }
}

// ============================================================================
// HandlerService
// ============================================================================

/// A tower [`Service`] that calls a single handler function.
///
/// # Example
///
/// ```rust,ignore
/// let svc = HandlerService::new(|ctx: Arc<DispatchContext>, args: Args| async move {
///     println!("{} said {}", ctx.author_id(), args.str(0).unwrap_or_default());
/// });
/// ```
pub struct HandlerService<F> {
    handler: F,
}

impl<F> HandlerService<F> {
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

impl<F: Clone> Clone for HandlerService<F> {
    fn clone(&self) -> Self {
        HandlerService {
            handler: self.handler.clone(),
        }
    }
}

impl<F, Fut> Service<Invocation> for HandlerService<F>
where
    F: Fn(Arc<DispatchContext>, Args) -> Fut + Clone + Send + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: HandlerResponse,
{
    type Response = Outcome;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Outcome, BoxError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, invocation: Invocation) -> Self::Future {
        let fut = (self.handler)(invocation.ctx, invocation.args);
        async move {
            fut.await.into_result()?;
            Ok(Outcome::Completed)
        }
        .boxed()
    }
}

// ============================================================================
// CommandHandler
// ============================================================================

/// A type-erased handler service owned by a command.
///
/// Cloning is cheap relative to a dispatch; each call runs on its own clone so
/// that concurrent dispatches never contend on `&mut self`.
#[derive(Clone)]
pub struct CommandHandler(BoxCloneSyncService<Invocation, Outcome, BoxError>);

impl CommandHandler {
    /// Boxes any cloneable handler service (including layered ones).
    pub fn new<S>(service: S) -> Self
    where
        S: Service<Invocation, Response = Outcome, Error = BoxError> + Clone + Send + Sync + 'static,
        S::Future: Send + 'static,
    {
        Self(BoxCloneSyncService::new(service))
    }

    /// Wraps a plain async function.
    pub fn from_fn<F, Fut>(handler: F) -> Self
    where
        F: Fn(Arc<DispatchContext>, Args) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: HandlerResponse,
    {
        Self::new(HandlerService::new(handler))
    }

    /// Invokes a fresh clone of the service, waiting for readiness first.
    pub fn invoke(
        &self,
        invocation: Invocation,
    ) -> Oneshot<BoxCloneSyncService<Invocation, Outcome, BoxError>, Invocation> {
        self.0.clone().oneshot(invocation)
    }
}

impl Service<Invocation> for CommandHandler {
    type Response = Outcome;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Outcome, BoxError>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.0.poll_ready(cx)
    }

    fn call(&mut self, invocation: Invocation) -> Self::Future {
        self.0.call(invocation)
    }
}

impl fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandHandler").finish_non_exhaustive()
    }
}
