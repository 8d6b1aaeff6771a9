//! # Parley Framework
//!
//! Command resolution, argument coercion, access restrictions and dispatch.
//!
//! This layer provides:
//! - [`CommandRegistry`] and the [`Command`] builder
//! - [`Resolver`] for prefix stripping and name/alias matching
//! - [`ArgumentCoercer`] with pluggable [`MentionResolver`]s
//! - Tower-based handler services and the [`RestrictLayer`] middleware
//! - The [`Dispatcher`] that ties them to the event bus
//!
//! The building blocks it works on (contexts, events, restrictions) live in
//! `parley-core`.

pub mod coerce;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod registry;
pub mod resolver;
pub mod restrict;

pub use coerce::{ArgumentCoercer, MentionResolver, PatternMentionResolver, bundle_overflow};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::{DispatchError, DispatchResult, RegistryError, RegistryResult};
pub use handler::{
    CommandHandler, HandlerResponse, HandlerService, Invocation, Outcome, ServiceBuilderExt,
};
pub use registry::{Command, CommandBuilder, CommandRegistry};
pub use resolver::{Match, Resolution, Resolver};
pub use restrict::{RestrictLayer, RestrictService, restrict};
