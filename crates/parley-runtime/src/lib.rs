//! Parley Runtime - Orchestration layer for the Parley command framework.
//!
//! This crate provides:
//! - Layered configuration (`ConfigLoader`, `ParleyConfig`)
//! - Logging setup driven by that configuration (`LoggingBuilder`)
//! - Runtime orchestration (`ParleyRuntime`) that freezes a command registry
//!   into a dispatcher and serves a stream of messages until shutdown
//!
//! ```ignore
//! use parley_runtime::ParleyRuntime;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut runtime = ParleyRuntime::new();
//!     runtime.register(Command::builder("ping").handler_fn(ping))?;
//!
//!     // Run until the stream ends or Ctrl+C
//!     runtime.run(messages).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{
    ConfigError, ConfigLoader, ConfigResult, DispatchConfig, LoggingConfig, ParleyConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{ParleyRuntime, RuntimeBuilder, ServeStats, serve};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
