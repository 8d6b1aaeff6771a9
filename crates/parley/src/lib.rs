//! # Parley
//!
//! A prefix-command dispatch framework for chat bots.
//!
//! ## Overview
//!
//! Parley turns chat messages into typed command invocations. A message that
//! starts with a configured prefix is matched against a registry of named
//! commands, its arguments are coerced to the command's declared parameter
//! types, and the handler runs. Everything notable along the way is reported
//! on an event bus the application subscribes to.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌────────────┐     ┌──────────┐     ┌─────────┐     ┌─────────┐
//! │   Runtime   │────▶│  Resolver  │────▶│ Coercer  │────▶│ Restrict│────▶│ Handler │
//! │  (stream)   │     │ (prefixes) │     │  (args)  │     │ (layer) │     │  (fn)   │
//! └─────────────┘     └────────────┘     └──────────┘     └─────────┘     └─────────┘
//!                           │                  │                │               │
//!                           └──────────────────┴───── EventBus ─┴───────────────┘
//! ```
//!
//! - **Runtime**: Loads configuration, sets up logging, serves messages
//! - **Resolver**: Strips the prefix and finds the command by name or alias
//! - **Coercer**: Converts tokens into integers, floats and mentions
//! - **Restrict**: Tower layer rejecting authors without a permission or role
//! - **EventBus**: Named notification channels for application callbacks
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use parley::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut runtime = ParleyRuntime::new();
//!
//!     runtime.register(
//!         Command::builder("add")
//!             .description("Adds two numbers")
//!             .params([ParamType::Integer, ParamType::Integer])
//!             .handler_fn(|ctx, args: Args| async move {
//!                 println!("{} -> {}", ctx.author_id(), args.int(0)? + args.int(1)?);
//!                 Ok::<_, BoxError>(())
//!             }),
//!     )?;
//!
//!     runtime.events().subscribe(EventKind::CommandNotFound, |_| async { Ok(()) });
//!
//!     runtime.run(messages).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: Load configuration from TOML files (default)
//! - `yaml-config`: Load configuration from YAML files
//! - `json-log`: JSON log output

pub use parley_core as core;
pub use parley_framework as framework;
pub use parley_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use parley::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use parley_runtime::{ParleyConfig, ParleyRuntime, ServeStats};

    // Commands and dispatch
    pub use parley_framework::{
        Command, CommandHandler, CommandRegistry, DispatchOutcome, Dispatcher, MentionResolver,
        Resolver, ServiceBuilderExt, restrict,
    };

    // Messages, arguments and events
    pub use parley_core::{
        Arg, Args, BoxError, DispatchContext, Event, EventBus, EventKind, ParamType, Permission,
        Restriction,
    };
}
