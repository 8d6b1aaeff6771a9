//! Command registry.
//!
//! The registry is filled mutably during setup and then moved into an `Arc`
//! owned by the [`Dispatcher`](crate::dispatcher::Dispatcher), after which it
//! can no longer change.
//!
//! ```rust,ignore
//! let mut registry = CommandRegistry::new();
//!
//! registry.register(
//!     Command::builder("add")
//!         .description("Adds two numbers")
//!         .alias("plus")
//!         .params([ParamType::Integer, ParamType::Integer])
//!         .handler_fn(|_ctx, args: Args| async move {
//!             println!("{}", args.int(0)? + args.int(1)?);
//!             Ok::<(), BoxError>(())
//!         }),
//! )?;
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tower::{BoxError, Service};
use tracing::debug;

use parley_core::{Args, CommandInfo, DispatchContext, ParamType};

use crate::error::{RegistryError, RegistryResult};
use crate::handler::{CommandHandler, HandlerResponse, Invocation, Outcome};

// ============================================================================
// Command
// ============================================================================

/// A registered command: metadata plus the handler service that runs it.
#[derive(Debug, Clone)]
pub struct Command {
    info: Arc<CommandInfo>,
    handler: CommandHandler,
}

impl Command {
    /// Starts building a command called `name`.
    pub fn builder(name: impl Into<String>) -> CommandBuilder {
        CommandBuilder {
            name: name.into(),
            description: String::new(),
            aliases: Vec::new(),
            params: Vec::new(),
        }
    }

    pub fn new(info: CommandInfo, handler: CommandHandler) -> Self {
        Self {
            info: Arc::new(info),
            handler,
        }
    }

    pub fn info(&self) -> &Arc<CommandInfo> {
        &self.info
    }

    pub fn name(&self) -> &str {
        self.info.name()
    }

    pub fn handler(&self) -> &CommandHandler {
        &self.handler
    }
}

/// Builder returned by [`Command::builder`].
///
/// The terminal methods ([`handler`](Self::handler), [`service`](Self::service)
/// and [`handler_fn`](Self::handler_fn)) produce the finished [`Command`].
#[derive(Debug, Clone)]
#[must_use = "a command builder does nothing until a handler is attached"]
pub struct CommandBuilder {
    name: String,
    description: String,
    aliases: Vec<String>,
    params: Vec<ParamType>,
}

impl CommandBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn param(mut self, param: ParamType) -> Self {
        self.params.push(param);
        self
    }

    pub fn params(mut self, params: impl IntoIterator<Item = ParamType>) -> Self {
        self.params.extend(params);
        self
    }

    /// Finishes the command with an already boxed handler.
    pub fn handler(self, handler: CommandHandler) -> Command {
        Command::new(
            CommandInfo::new(self.name, self.description, self.aliases, self.params),
            handler,
        )
    }

    /// Finishes the command with any handler service, typically one built
    /// with [`ServiceBuilderExt`](crate::handler::ServiceBuilderExt).
    pub fn service<S>(self, service: S) -> Command
    where
        S: Service<Invocation, Response = Outcome, Error = BoxError> + Clone + Send + Sync + 'static,
        S::Future: Send + 'static,
    {
        self.handler(CommandHandler::new(service))
    }

    /// Finishes the command with a plain async function.
    pub fn handler_fn<F, Fut>(self, handler: F) -> Command
    where
        F: Fn(Arc<DispatchContext>, Args) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: HandlerResponse,
    {
        self.handler(CommandHandler::from_fn(handler))
    }
}

// ============================================================================
// CommandRegistry
// ============================================================================

/// Ordered collection of commands, indexed by every name and alias.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: Vec<Command>,
    index: HashMap<String, usize>,
    /// Lowercased names and aliases, for collision checks.
    folded: HashMap<String, usize>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a command after validating its name and aliases.
    ///
    /// Names and aliases share one namespace: registering a command whose
    /// name or alias is already used by another command fails with
    /// [`RegistryError::DuplicateCommand`]. Names differing only in case
    /// collide too, since a case-insensitive resolver could never tell them
    /// apart.
    pub fn register(&mut self, command: Command) -> RegistryResult<&Command> {
        self.validate(&command)?;

        let slot = self.commands.len();
        for alias in command.info.aliases() {
            self.index.insert(alias.clone(), slot);
            self.folded.insert(alias.to_lowercase(), slot);
        }
        debug!(
            command = command.name(),
            aliases = ?&command.info.aliases()[1..],
            params = command.info.params().len(),
            "Registered command"
        );
        self.commands.push(command);
        Ok(&self.commands[slot])
    }

    /// Builds and registers a command in one call.
    pub fn register_command<I, S>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        params: impl IntoIterator<Item = ParamType>,
        handler: CommandHandler,
        aliases: I,
    ) -> RegistryResult<&Command>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let command = Command::builder(name)
            .description(description)
            .aliases(aliases)
            .params(params)
            .handler(handler);
        self.register(command)
    }

    fn validate(&self, command: &Command) -> RegistryResult<()> {
        let name = command.name();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }

        for alias in command.info.aliases() {
            if alias.is_empty() {
                return Err(RegistryError::EmptyAlias {
                    command: name.to_owned(),
                });
            }
            if alias.chars().any(char::is_whitespace) {
                return Err(RegistryError::WhitespaceInName {
                    name: alias.clone(),
                });
            }
            if let Some(&existing) = self.folded.get(&alias.to_lowercase()) {
                return Err(RegistryError::DuplicateCommand {
                    name: name.to_owned(),
                    alias: alias.clone(),
                    conflicts_with: self.commands[existing].name().to_owned(),
                });
            }
        }
        Ok(())
    }

    /// Returns the command whose name or alias equals `token` exactly.
    pub fn lookup(&self, token: &str) -> Option<&Command> {
        self.index.get(token).map(|&slot| &self.commands[slot])
    }

    /// Iterates commands in registration order.
    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl<'a> IntoIterator for &'a CommandRegistry {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> CommandHandler {
        CommandHandler::from_fn(|_ctx, _args| async {})
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = CommandRegistry::new();
        registry
            .register_command("add", "Adds", [ParamType::Integer], noop(), ["plus"])
            .unwrap();

        let cmd = registry.lookup("plus").unwrap();
        assert_eq!(cmd.name(), "add");
        assert_eq!(cmd.info().aliases(), ["add", "plus"]);
        assert_eq!(cmd.info().description(), "Adds");
        assert!(registry.lookup("sum").is_none());
    }

    #[test]
    fn test_name_is_always_an_alias() {
        let mut registry = CommandRegistry::new();
        registry
            .register(Command::builder("hello").handler(noop()))
            .unwrap();
        registry
            .register(Command::builder("bye").aliases(["cya", "bye"]).handler(noop()))
            .unwrap();

        for cmd in &registry {
            assert!(cmd.info().aliases().iter().any(|a| a == cmd.name()));
        }
        assert_eq!(registry.lookup("bye").unwrap().info().aliases(), ["bye", "cya"]);
    }

    #[test]
    fn test_iteration_follows_registration_order() {
        let mut registry = CommandRegistry::new();
        for name in ["c", "a", "b"] {
            registry.register(Command::builder(name).handler(noop())).unwrap();
        }
        let names: Vec<_> = registry.iter().map(Command::name).collect();
        assert_eq!(names, ["c", "a", "b"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_invalid_names_rejected() {
        let mut registry = CommandRegistry::new();

        let err = registry.register(Command::builder("").handler(noop())).unwrap_err();
        assert_eq!(err, RegistryError::EmptyName);

        let err = registry
            .register(Command::builder("two words").handler(noop()))
            .unwrap_err();
        assert!(matches!(err, RegistryError::WhitespaceInName { name } if name == "two words"));

        let err = registry
            .register(Command::builder("ok").alias("").handler(noop()))
            .unwrap_err();
        assert!(matches!(err, RegistryError::EmptyAlias { command } if command == "ok"));

        assert!(registry.is_empty());
    }

    #[test]
    fn test_alias_collision_is_rejected() {
        let mut registry = CommandRegistry::new();
        registry
            .register(Command::builder("ban").alias("b").handler(noop()))
            .unwrap();

        let err = registry
            .register(Command::builder("b").handler(noop()))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateCommand {
                name: "b".into(),
                alias: "b".into(),
                conflicts_with: "ban".into(),
            }
        );

        let err = registry
            .register(Command::builder("block").alias("ban").handler(noop()))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateCommand { alias, .. } if alias == "ban"));

        // A rejected command leaves nothing behind.
        assert!(registry.lookup("block").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_case_only_collision_is_rejected() {
        let mut registry = CommandRegistry::new();
        registry
            .register(Command::builder("Hello").alias("HI").handler(noop()))
            .unwrap();

        let err = registry
            .register(Command::builder("hello").handler(noop()))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateCommand {
                name: "hello".into(),
                alias: "hello".into(),
                conflicts_with: "Hello".into(),
            }
        );

        let err = registry
            .register(Command::builder("greet").alias("hi").handler(noop()))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateCommand { alias, .. } if alias == "hi"));

        // Exact lookup still keeps the registered spelling.
        assert!(registry.lookup("hello").is_none());
        assert_eq!(registry.lookup("Hello").unwrap().name(), "Hello");
    }
}
