//! Handler services and their composition.
//!
//! Every command handler is a [`tower::Service`] from [`Invocation`] to
//! [`Outcome`]. Plain async functions are adapted by [`HandlerService`];
//! cross-cutting concerns such as access restrictions are ordinary tower
//! layers stacked on top with a [`ServiceBuilder`](tower::ServiceBuilder):
//!
//! ```text
//! ServiceBuilder::new()
//!     .restrict(&events, Restriction::Guilds(..))       ← outermost, checked first
//!     .restrict(&events, Restriction::Permissions(..))
//!     .handler(nick)                                    ← HandlerService
//! ```
//!
//! The finished service is type-erased into a [`CommandHandler`] when the
//! command is built.
//!
//! # Writing handlers
//!
//! A handler receives the shared message context and the coerced arguments.
//! It may return `()` or a `Result<(), E>` for any error convertible into
//! [`BoxError`](parley_core::BoxError):
//!
//! ```rust,ignore
//! async fn add(ctx: Arc<DispatchContext>, args: Args) -> Result<(), BoxError> {
//!     let sum = args.int(0)? + args.int(1)?;
//!     reply(ctx.channel_id(), sum.to_string()).await
//! }
//! ```

pub mod builder;
pub mod service;

pub use builder::ServiceBuilderExt;
pub use service::{CommandHandler, HandlerResponse, HandlerService, Invocation, Outcome};

pub use tower::Layer;
