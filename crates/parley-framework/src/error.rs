//! Error types for the Parley framework.

use thiserror::Error;

use parley_core::EventError;

/// Configuration errors raised while registering commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The command name is empty.
    #[error("command name must not be empty")]
    EmptyName,

    /// An alias of the command is empty.
    #[error("command '{command}' has an empty alias")]
    EmptyAlias {
        /// The command being registered.
        command: String,
    },

    /// A name or alias contains whitespace and could never be matched.
    #[error("command name or alias '{name}' contains whitespace")]
    WhitespaceInName {
        /// The offending name or alias.
        name: String,
    },

    /// A name or alias is already taken by another command.
    #[error("'{alias}' of command '{name}' is already registered by '{conflicts_with}'")]
    DuplicateCommand {
        /// The command being registered.
        name: String,
        /// The colliding name or alias.
        alias: String,
        /// The command that already owns `alias`.
        conflicts_with: String,
    },
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors that abort a dispatch call.
///
/// Message-level problems are reported as events and never show up here;
/// only configuration errors from the event bus propagate to the caller.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Event(#[from] EventError),
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
