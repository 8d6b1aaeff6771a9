//! Echo Bot Example
//!
//! Reads one message per line from stdin, dispatches it, and prints replies
//! to stdout. Logs go to stderr.
//!
//! A line is either plain text, sent as the `--author` in `--channel`, or a
//! JSON message:
//!
//! ```text
//! !add 2 3
//! {"author_id": 5, "channel_id": 1, "permissions": ["change_nickname"], "content": "!nick Bob"}
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package echo-bot -- --config demos/echo_bot/parley.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use futures::StreamExt;
use parley::prelude::*;
use parley::runtime::RuntimeBuilder;
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(version, about = "Echo bot reading messages from stdin")]
struct Cli {
    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile, e.g. "development"
    #[arg(short, long)]
    profile: Option<String>,

    /// Author id for plain-text lines
    #[arg(long, default_value_t = 1)]
    author: u64,

    /// Channel id for plain-text lines
    #[arg(long, default_value_t = 1)]
    channel: u64,
}

// ============================================================================
// Handler Functions
// ============================================================================

async fn hello(ctx: Arc<DispatchContext>, _args: Args) {
    println!("Hello, <@{}>!", ctx.author_id());
}

async fn add(_ctx: Arc<DispatchContext>, args: Args) -> Result<(), BoxError> {
    let (a, b) = (args.int(0)?, args.int(1)?);
    let sum = a.checked_add(b).ok_or("sum overflows")?;
    println!("{a} + {b} = {sum}");
    Ok(())
}

async fn echo(_ctx: Arc<DispatchContext>, args: Args) -> Result<(), BoxError> {
    println!("{}", args.str(0)?);
    Ok(())
}

async fn whois(_ctx: Arc<DispatchContext>, args: Args) -> Result<(), BoxError> {
    println!("That is user {}", args.user(0)?);
    Ok(())
}

async fn nick(ctx: Arc<DispatchContext>, args: Args) -> Result<(), BoxError> {
    println!("<@{}> is now known as {}", ctx.author_id(), args.str(0)?);
    Ok(())
}

// ============================================================================
// Event Subscribers
// ============================================================================

fn subscribe_replies(events: &Arc<EventBus>) {
    events.subscribe(EventKind::CommandReceived, |event| async move {
        if let Event::CommandReceived { ctx, command } = &*event {
            info!(author = ctx.author_id(), command = command.name(), "Command received");
        }
        Ok(())
    });

    events.subscribe(EventKind::CommandNotFound, |event| async move {
        println!("Unknown command: {}", event.ctx().content());
        Ok(())
    });

    events.subscribe(EventKind::ArgumentCastingError, |event| async move {
        if let Event::ArgumentCastingError { command, failure, .. } = &*event {
            println!("Usage error in {}: {failure}", command.name());
        }
        Ok(())
    });

    events.subscribe(EventKind::ExceptionDuringCommand, |event| async move {
        if let Event::ExceptionDuringCommand { command, error, .. } = &*event {
            println!("{} failed: {error}", command.name());
        }
        Ok(())
    });

    events.subscribe(EventKind::InvalidPermissions, |event| async move {
        if let Event::InvalidPermissions { command, denial, .. } = &*event {
            println!("You cannot use {} ({denial})", command.name());
        }
        Ok(())
    });
}

fn parse_line(line: &str, cli: &Cli) -> Option<DispatchContext> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if line.starts_with('{') {
        return match serde_json::from_str(line) {
            Ok(ctx) => Some(ctx),
            Err(e) => {
                warn!(error = %e, "Skipping malformed JSON message");
                None
            }
        };
    }
    Some(DispatchContext::new(cli.author, cli.channel, line))
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut builder = RuntimeBuilder::new();
    if let Some(path) = &cli.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &cli.profile {
        builder = builder.profile(profile);
    }
    let mut runtime = builder.build()?;

    subscribe_replies(runtime.events());
    let events = Arc::clone(runtime.events());

    runtime.register(
        Command::builder("hello")
            .description("Greets the author")
            .alias("hi")
            .handler_fn(hello),
    )?;
    runtime.register(
        Command::builder("add")
            .description("Adds two integers")
            .params([ParamType::Integer, ParamType::Integer])
            .handler_fn(add),
    )?;
    runtime.register(
        Command::builder("echo")
            .description("Repeats the rest of the message")
            .param(ParamType::String)
            .handler_fn(echo),
    )?;
    runtime.register(
        Command::builder("whois")
            .description("Shows the id of a mentioned user")
            .param(ParamType::UserRef)
            .handler_fn(whois),
    )?;
    runtime.register(
        Command::builder("nick")
            .description("Changes the author's nickname")
            .param(ParamType::String)
            .handler(restrict(
                Restriction::Permissions(vec![Permission::ChangeNickname]),
                &events,
                CommandHandler::from_fn(nick),
            )),
    )?;

    let lines = FramedRead::new(tokio::io::stdin(), LinesCodec::new());
    let messages = lines.filter_map(|line| {
        let ctx = match line {
            Ok(line) => parse_line(&line, &cli),
            Err(e) => {
                warn!(error = %e, "Failed to read line");
                None
            }
        };
        futures::future::ready(ctx)
    });

    let stats = runtime.run(messages).await?;
    info!(
        dispatched = stats.dispatched,
        failed = stats.failed,
        "Echo bot finished"
    );
    Ok(())
}
