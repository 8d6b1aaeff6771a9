//! Extension trait for tower service builder.
//!
//! Provides convenience methods for building command handler services with
//! access restrictions stacked on top.

use std::future::Future;
use std::sync::Arc;

use tower::{Layer, ServiceBuilder};
use tower_layer::Stack;

use parley_core::{Args, DispatchContext, EventBus, Restriction};

use super::service::{HandlerResponse, HandlerService};
use crate::restrict::RestrictLayer;

/// Extension trait for [`tower::ServiceBuilder`] that adds convenience methods
/// for building command handler services.
pub trait ServiceBuilderExt<L> {
    /// Wrap `handler` in a [`HandlerService`] and apply all stacked layers,
    /// returning the final composed service.
    ///
    /// Equivalent to `.service(HandlerService::new(handler))`.
    fn handler<F, Fut>(self, handler: F) -> L::Service
    where
        F: Fn(Arc<DispatchContext>, Args) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: HandlerResponse,
        L: Layer<HandlerService<F>>;

    /// Adds an access restriction.
    ///
    /// Restrictions added first wrap the ones added later, so they are
    /// evaluated first; the first failing restriction stops the chain.
    fn restrict(
        self,
        events: &Arc<EventBus>,
        restriction: Restriction,
    ) -> ServiceBuilder<Stack<RestrictLayer, L>>;
}

impl<L> ServiceBuilderExt<L> for ServiceBuilder<L> {
    fn handler<F, Fut>(self, handler: F) -> L::Service
    where
        F: Fn(Arc<DispatchContext>, Args) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: HandlerResponse,
        L: Layer<HandlerService<F>>,
    {
        self.service(HandlerService::new(handler))
    }

    fn restrict(
        self,
        events: &Arc<EventBus>,
        restriction: Restriction,
    ) -> ServiceBuilder<Stack<RestrictLayer, L>> {
        self.layer(RestrictLayer::new(Arc::clone(events), restriction))
    }
}
