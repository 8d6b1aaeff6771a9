//! Configuration for the Parley runtime.
//!
//! Configuration is layered with figment (see [`loader`]) and validated
//! before use. A minimal `parley.toml`:
//!
//! ```toml
//! [dispatch]
//! prefixes = ["!", "?"]
//! case_insensitive = true
//!
//! [logging]
//! level = "debug"
//! format = "pretty"
//!
//! [logging.filters]
//! parley_framework = "trace"
//! ```

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    DispatchConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, ParleyConfig,
    SpanEventConfig,
};
pub use validation::validate_config;
