//! Runtime orchestration: configuration, registration and serving.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use parley_runtime::ParleyRuntime;
//!
//! let mut runtime = ParleyRuntime::builder()
//!     .config_file("config/parley.toml")
//!     .build()?;
//!
//! runtime.register(Command::builder("ping").handler_fn(ping))?;
//! runtime.events().subscribe(EventKind::CommandNotFound, |_| async { Ok(()) });
//!
//! // Any `Stream<Item = DispatchContext>` from the transport.
//! let stats = runtime.run(messages).await?;
//! ```

use std::path::Path;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::signal;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use parley_core::{DispatchContext, EventBus};
use parley_framework::{
    ArgumentCoercer, Command, CommandRegistry, DispatchOutcome, DispatchResult, Dispatcher,
    MentionResolver, RegistryResult,
};

use crate::config::{ConfigLoader, ConfigResult, ParleyConfig};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// Owns everything needed to build a [`Dispatcher`] and feed it messages.
///
/// Commands are registered on the runtime while it is being set up; calling
/// [`dispatcher`](Self::dispatcher), [`serve`](Self::serve) or
/// [`run`](Self::run) consumes it and freezes the registry.
pub struct ParleyRuntime {
    config: ParleyConfig,
    registry: CommandRegistry,
    events: Arc<EventBus>,
    coercer: ArgumentCoercer,
}

/// Counters reported by [`ParleyRuntime::serve`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeStats {
    /// Messages whose dispatch finished, successfully or not.
    pub dispatched: usize,
    /// Dispatches that returned a [`DispatchError`](parley_framework::DispatchError)
    /// or panicked.
    pub failed: usize,
}

impl ServeStats {
    fn record(&mut self, joined: Result<DispatchResult<DispatchOutcome>, JoinError>) {
        self.dispatched += 1;
        match joined {
            Ok(Ok(outcome)) => trace!(?outcome, "Message dispatched"),
            Ok(Err(e)) => {
                self.failed += 1;
                error!(error = %e, "Dispatch failed");
            }
            Err(e) => {
                self.failed += 1;
                error!(error = %e, "Dispatch task did not complete");
            }
        }
    }
}

impl ParleyRuntime {
    /// Loads configuration from the current directory, falling back to
    /// defaults when it cannot be loaded.
    pub fn new() -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .load()
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                ParleyConfig::default()
            });
        Self::from_config(&config)
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime and initializes logging from `config`.
    pub fn from_config(config: &ParleyConfig) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            prefixes = ?config.dispatch.prefixes,
            case_insensitive = config.dispatch.case_insensitive,
            log_level = %config.logging.level,
            "Runtime initialized from configuration"
        );

        Self {
            config: config.clone(),
            registry: CommandRegistry::new(),
            events: Arc::new(EventBus::new()),
            coercer: ArgumentCoercer::default(),
        }
    }

    pub fn config(&self) -> &ParleyConfig {
        &self.config
    }

    /// The shared event bus. Clone the `Arc` to subscribe from elsewhere or
    /// to build restriction layers.
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut CommandRegistry {
        &mut self.registry
    }

    /// Registers a command. Shorthand for `registry_mut().register(..)`.
    pub fn register(&mut self, command: Command) -> RegistryResult<&Command> {
        self.registry.register(command)
    }

    /// Replaces the mention resolver used for reference parameters.
    pub fn mention_resolver(&mut self, mentions: impl MentionResolver) -> &mut Self {
        self.coercer = ArgumentCoercer::new(mentions);
        self
    }

    /// Freezes the registry into a [`Dispatcher`].
    pub fn dispatcher(self) -> Dispatcher {
        let resolver = self.config.dispatch.resolver();
        info!(
            commands = self.registry.len(),
            prefixes = ?resolver.prefixes(),
            "Command registry frozen"
        );
        Dispatcher::new(self.registry, self.events, resolver).with_coercer(self.coercer)
    }

    /// Dispatches every message from `messages` until the stream ends or
    /// `shutdown` is cancelled.
    ///
    /// Each message runs on its own task; in-flight dispatches are awaited
    /// before returning.
    pub async fn serve<S>(self, messages: S, shutdown: CancellationToken) -> ServeStats
    where
        S: Stream<Item = DispatchContext>,
    {
        serve(self.dispatcher(), messages, shutdown).await
    }

    /// Serves `messages` until the stream ends, Ctrl+C or SIGTERM.
    pub async fn run<S>(self, messages: S) -> RuntimeResult<ServeStats>
    where
        S: Stream<Item = DispatchContext>,
    {
        let shutdown = CancellationToken::new();
        let signals = ShutdownSignal::install()?;
        let trigger = shutdown.clone();
        let watcher = tokio::spawn(async move {
            signals.recv().await;
            trigger.cancel();
        });

        info!("Parley runtime is now running. Press Ctrl+C to stop.");
        let stats = self.serve(messages, shutdown).await;
        watcher.abort();

        info!(
            dispatched = stats.dispatched,
            failed = stats.failed,
            "Runtime stopped"
        );
        Ok(stats)
    }
}

impl Default for ParleyRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ParleyRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParleyRuntime")
            .field("config", &self.config)
            .field("command_count", &self.registry.len())
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

/// Dispatches every message from `messages` on its own task.
///
/// Stops accepting messages when the stream ends or `shutdown` is cancelled,
/// then waits for in-flight dispatches.
pub async fn serve<S>(
    dispatcher: Dispatcher,
    messages: S,
    shutdown: CancellationToken,
) -> ServeStats
where
    S: Stream<Item = DispatchContext>,
{
    let mut messages = std::pin::pin!(messages);
    let mut tasks = JoinSet::new();
    let mut stats = ServeStats::default();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Shutdown requested, no longer accepting messages");
                break;
            }
            next = messages.next() => match next {
                Some(ctx) => {
                    let dispatcher = dispatcher.clone();
                    tasks.spawn(async move { dispatcher.dispatch(ctx).await });
                }
                None => {
                    debug!("Message stream ended");
                    break;
                }
            },
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => stats.record(joined),
        }
    }

    if !tasks.is_empty() {
        debug!(in_flight = tasks.len(), "Waiting for in-flight dispatches");
    }
    while let Some(joined) = tasks.join_next().await {
        stats.record(joined);
    }
    stats
}

/// Ctrl+C, plus SIGTERM on unix.
struct ShutdownSignal {
    #[cfg(unix)]
    terminate: signal::unix::Signal,
}

impl ShutdownSignal {
    fn install() -> RuntimeResult<Self> {
        Ok(Self {
            #[cfg(unix)]
            terminate: signal::unix::signal(signal::unix::SignalKind::terminate())
                .map_err(RuntimeError::Signal)?,
        })
    }

    #[cfg(unix)]
    async fn recv(mut self) {
        tokio::select! {
            result = signal::ctrl_c() => match result {
                Ok(()) => info!("Received Ctrl+C, shutting down"),
                Err(e) => error!(error = %e, "Failed to listen for Ctrl+C"),
            },
            _ = self.terminate.recv() => info!("Received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    async fn recv(self) {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => error!(error = %e, "Failed to listen for Ctrl+C"),
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a [`ParleyRuntime`] with custom configuration.
///
/// ```rust,ignore
/// let runtime = ParleyRuntime::builder()
///     .config_file("config/parley.toml")
///     .profile("production")
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
        }
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g. "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Supplies application defaults; files and environment still win.
    pub fn merge(mut self, config: ParleyConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    pub fn build(self) -> ConfigResult<ParleyRuntime> {
        let config = self.config_loader.load()?;
        Ok(ParleyRuntime::from_config(&config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::{BoxError, Event, EventKind, ParamType, ReferenceKind};
    use parley_framework::DispatchError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn runtime(prefixes: &[&str]) -> ParleyRuntime {
        let mut config = ParleyConfig::default();
        config.dispatch.prefixes = prefixes.iter().map(|p| p.to_string()).collect();
        ParleyRuntime::from_config(&config)
    }

    fn count_events(runtime: &ParleyRuntime, kind: EventKind) -> Arc<AtomicUsize> {
        let counter = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&counter);
        runtime.events().subscribe(kind, move |_event| {
            let sink = Arc::clone(&sink);
            async move {
                sink.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        counter
    }

    #[tokio::test]
    async fn test_dispatcher_uses_configured_prefixes() {
        let mut runtime = runtime(&["?"]);
        runtime
            .register(Command::builder("ping").handler_fn(|_ctx, _args| async {}))
            .unwrap();
        let received = count_events(&runtime, EventKind::CommandReceived);

        let dispatcher = runtime.dispatcher();
        assert_eq!(
            dispatcher
                .dispatch(DispatchContext::new(1, 1, "!ping"))
                .await
                .unwrap(),
            DispatchOutcome::Ignored
        );
        assert_eq!(
            dispatcher
                .dispatch(DispatchContext::new(1, 1, "?ping"))
                .await
                .unwrap(),
            DispatchOutcome::Completed
        );
        assert_eq!(received.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_serve_until_stream_ends() {
        let mut runtime = runtime(&["!"]);
        runtime
            .register(Command::builder("ping").handler_fn(|_ctx, _args| async {}))
            .unwrap();
        let received = count_events(&runtime, EventKind::CommandReceived);
        // No CommandNotFound subscriber: unknown commands fail to dispatch.

        let messages = futures::stream::iter(vec![
            DispatchContext::new(1, 1, "!ping"),
            DispatchContext::new(1, 1, "just chatting"),
            DispatchContext::new(1, 1, "!ping"),
            DispatchContext::new(1, 1, "!pong"),
        ]);
        let stats = runtime.serve(messages, CancellationToken::new()).await;

        assert_eq!(
            stats,
            ServeStats {
                dispatched: 4,
                failed: 1
            }
        );
        assert_eq!(received.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_serve_stops_on_cancel() {
        let runtime = runtime(&["!"]);
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let stats = runtime
            .serve(futures::stream::pending::<DispatchContext>(), shutdown)
            .await;
        assert_eq!(stats, ServeStats::default());
    }

    #[tokio::test]
    async fn test_serve_waits_for_in_flight() {
        let mut runtime = runtime(&["!"]);
        runtime
            .register(Command::builder("slow").handler_fn(|_ctx, _args| async {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            }))
            .unwrap();
        let received = count_events(&runtime, EventKind::CommandReceived);

        let shutdown = CancellationToken::new();
        let trigger = shutdown.clone();
        let messages = futures::stream::iter(vec![DispatchContext::new(1, 1, "!slow")])
            .chain(futures::stream::once(async move {
                trigger.cancel();
                futures::future::pending::<DispatchContext>().await
            }));

        let stats = runtime.serve(messages, shutdown).await;
        assert_eq!(stats.dispatched, 1);
        assert_eq!(received.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_custom_mention_resolver() {
        struct Fixed;
        impl MentionResolver for Fixed {
            fn resolve(&self, _kind: ReferenceKind, token: &str) -> Option<u64> {
                (token == "@me").then_some(7)
            }
        }

        let mut runtime = runtime(&["!"]);
        let seen = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&seen);
        runtime.mention_resolver(Fixed);
        runtime
            .register(
                Command::builder("whois")
                    .param(ParamType::UserRef)
                    .handler_fn(move |_ctx, args: parley_core::Args| {
                        let sink = Arc::clone(&sink);
                        async move {
                            sink.store(args.user(0)? as usize, Ordering::SeqCst);
                            Ok::<(), BoxError>(())
                        }
                    }),
            )
            .unwrap();
        let _received = count_events(&runtime, EventKind::CommandReceived);
        let failures = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&failures);
        runtime
            .events()
            .subscribe(EventKind::ArgumentCastingError, move |event| {
                let sink = Arc::clone(&sink);
                async move {
                    assert!(matches!(*event, Event::ArgumentCastingError { .. }));
                    sink.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            });

        let dispatcher = runtime.dispatcher();
        dispatcher
            .dispatch(DispatchContext::new(1, 1, "!whois @me"))
            .await
            .unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 7);

        // The default `<@id>` syntax is no longer understood.
        dispatcher
            .dispatch(DispatchContext::new(1, 1, "!whois <@9>"))
            .await
            .unwrap();
        assert_eq!(failures.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispatch_error_surfaces() {
        let runtime = runtime(&["!"]);
        let err = runtime
            .dispatcher()
            .dispatch(DispatchContext::new(1, 1, "!missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Event(_)));
    }
}
