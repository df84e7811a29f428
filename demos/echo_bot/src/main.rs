//! Echo Bot
//!
//! A small community bot showing the main Ripple features:
//!
//! - `/survey` starts a two-step conversation driven by per-peer state
//! - `/stop` stops polling from inside a handler
//! - any other message is echoed back
//! - `group_join` events are logged from the event registry
//!
//! # Usage
//!
//! ```bash
//! RIPPLE_BOT__ACCESS_TOKEN=... RIPPLE_BOT__GROUP_ID=123 cargo run --package echo-bot
//! cargo run --package echo-bot -- --config ripple.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use ripple::prelude::*;
use serde_json::{Value, json};
use tracing::info;

#[derive(Debug, Parser)]
#[command(about = "Echo and survey bot built on Ripple")]
struct Args {
    /// Path to a configuration file. Defaults to searching for ripple.toml.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

// ============================================================================
// Handlers
// ============================================================================

async fn start_survey(msg: Message, state: StateContext, bot: BoxedBot) -> Result<()> {
    state.set_state("ask_name").await?;
    bot.send_message(msg.peer_id, "What is your name?").await?;
    Ok(())
}

async fn ask_age(msg: Message, state: StateContext, bot: BoxedBot) -> Result<()> {
    let mut data = serde_json::Map::new();
    data.insert("name".into(), Value::String(msg.text.trim().to_string()));
    state.update_data(data).await?;
    state.set_state("ask_age").await?;
    bot.send_message(msg.peer_id, "How old are you?").await?;
    Ok(())
}

async fn finish_survey(msg: Message, state: StateContext, bot: BoxedBot) -> Result<()> {
    let Ok(age) = msg.text.trim().parse::<u32>() else {
        bot.send_message(msg.peer_id, "Please answer with a number.")
            .await?;
        return Ok(());
    };

    let data = state.get_data().await?;
    let name = data.get("name").and_then(Value::as_str).unwrap_or("stranger");
    state.finish().await?;

    info!(peer = msg.peer_id, name, age, "Survey completed");
    bot.send_message(msg.peer_id, &format!("Nice to meet you, {name} ({age})!"))
        .await?;
    Ok(())
}

async fn stop(msg: Message, control: PollControl, bot: BoxedBot) -> Result<()> {
    bot.send_message(msg.peer_id, "Bye!").await?;
    control.stop();
    Ok(())
}

async fn echo(msg: Message, bot: BoxedBot) -> Result<()> {
    if msg.text.is_empty() {
        return Ok(());
    }
    bot.send_message(msg.peer_id, &msg.text).await?;
    Ok(())
}

async fn welcome(event: Arc<Event>) {
    let user = event.object().get("user_id").cloned().unwrap_or(Value::Null);
    info!(%user, "New community member");
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = RippleRuntime::builder();
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    let mut runtime = builder.build().context("failed to start the runtime")?;

    let dispatcher = runtime.dispatcher_mut();
    dispatcher
        .on_message()
        .text("/survey")
        .ignore_case()
        .state("*")
        .handler(start_survey)?;
    dispatcher.on_message().state("ask_name").handler(ask_age)?;
    dispatcher
        .on_message()
        .state("ask_age")
        .handler(finish_survey)?;
    dispatcher
        .on_message()
        .text("/stop")
        .name("stop")
        .handler(stop)?;
    dispatcher
        .on_message()
        .arg(STATE_KEY, json!("*"))
        .handler(echo)?;
    dispatcher
        .on_event()
        .event_type("group_join")
        .handler(welcome)?;

    info!(handlers = ?runtime.dispatcher(), "Handlers registered");
    runtime.run().await?;
    Ok(())
}
