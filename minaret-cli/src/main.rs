//! CLI entry point for minaret

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use minaret_channels::{ChannelHandler, TelegramHandler};
use minaret_core::bus::{InboundMessage, MessageBus};
use minaret_core::config::{Config, ConfigLoader};
use minaret_core::logging::init_logging;
use minaret_core::session::SessionRegistry;
use minaret_providers::GeminiClient;
use minaret_relay::{AnswerService, RelayLoop};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "minaret")]
#[command(about = "A Telegram assistant for Islamic scholarship, backed by Gemini")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the Telegram gateway
    Gateway,
    /// Ask a single question from the terminal
    Ask {
        /// Question to ask
        message: String,
    },
    /// Show configuration status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up TELEGRAM_BOT_TOKEN / GEMINI_API_KEY from a local .env
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    match cli.command {
        Commands::Gateway => {
            let config = config_loader.load()?;
            let _guard = init_logging(&config.logging);
            run_gateway(config).await?;
        }
        Commands::Ask { message } => {
            let config = config_loader.load()?;
            let _guard = init_logging(&config.logging);
            run_ask(config, &message).await?;
        }
        Commands::Status => {
            run_status(&config_loader)?;
        }
    }

    Ok(())
}

fn build_answerer(config: &Config) -> AnswerService {
    let model = Arc::new(GeminiClient::new(
        config.gemini.api_key.clone(),
        config.gemini.api_base.clone(),
        config.gemini.model.clone(),
        config.assistant.temperature,
        config.assistant.max_output_tokens,
    ));

    AnswerService::new(
        model,
        Duration::from_secs(config.assistant.request_timeout_secs),
        config.assistant.max_retries,
    )
}

/// Run the Telegram gateway
async fn run_gateway(config: Config) -> Result<()> {
    if !config.telegram.enabled {
        anyhow::bail!("Telegram channel is disabled. Set telegram.enabled in config.json.");
    }

    println!("{}", style("Starting Minaret Gateway...").bold().cyan());
    println!("Model: {}", config.gemini.model);

    let bus = MessageBus::new();

    let registry = Arc::new(SessionRegistry::new(
        config.assistant.persona.clone(),
        config.assistant.persona_ack.clone(),
    ));
    let answerer = build_answerer(&config);

    // Bridge channel inbound queue -> message bus inbound queue
    let (inbound_tx, mut inbound_rx) = mpsc::channel::<InboundMessage>(1024);
    let bus_for_bridge = bus.clone();
    let inbound_bridge_handle = tokio::spawn(async move {
        while let Some(msg) = inbound_rx.recv().await {
            if let Err(e) = bus_for_bridge.publish_inbound(msg) {
                error!("Failed to publish inbound message to bus: {}", e);
            }
        }
    });

    let mut telegram = TelegramHandler::new(&config.telegram);
    telegram.set_inbound_sender(inbound_tx);
    telegram.start().await?;
    let telegram = Arc::new(RwLock::new(telegram));

    // Deliver relay replies back through the Telegram handler
    let telegram_for_send = telegram.clone();
    bus.subscribe_outbound("telegram", move |msg| {
        let telegram = telegram_for_send.clone();
        async move {
            if let Err(e) = telegram.read().await.send(msg).await {
                error!("Failed to send Telegram reply: {}", e);
            }
        }
    })
    .await;

    let bus_for_dispatch = bus.clone();
    let outbound_dispatch_handle = tokio::spawn(async move {
        bus_for_dispatch.dispatch_outbound_loop().await;
    });

    let mut relay = RelayLoop::new(bus.clone(), registry, answerer);
    let relay_handle = tokio::spawn(async move {
        if let Err(e) = relay.run().await {
            error!("Relay loop error: {}", e);
        }
    });

    println!(
        "\n{}",
        style("Gateway is running. Press Ctrl+C to stop.").green()
    );

    tokio::signal::ctrl_c().await?;
    println!("\n{}", style("Shutting down...").yellow());

    bus.stop().await;
    if let Err(e) = telegram.write().await.stop().await {
        error!("Failed to stop Telegram bot: {}", e);
    }

    inbound_bridge_handle.abort();
    let _ = inbound_bridge_handle.await;
    outbound_dispatch_handle.abort();
    let _ = outbound_dispatch_handle.await;
    relay_handle.abort();
    let _ = relay_handle.await;

    println!("{}", style("Gateway stopped.").green());
    Ok(())
}

/// Ask a single question without going through Telegram
async fn run_ask(config: Config, message: &str) -> Result<()> {
    let registry = SessionRegistry::new(
        config.assistant.persona.clone(),
        config.assistant.persona_ack.clone(),
    );
    let answerer = build_answerer(&config);

    info!("Processing question from the terminal");
    println!("{}", style("Thinking...").cyan());

    let session = registry.get_or_create("cli").await;
    let reply = answerer.ask(&session, message).await;

    println!("\n{}", style("Answer:").bold());
    println!("{}", reply);

    Ok(())
}

/// Show configuration status
fn run_status(loader: &ConfigLoader) -> Result<()> {
    println!("{}", style("Minaret Status").bold().cyan());
    println!("Config directory: {}\n", loader.config_dir().display());

    let config = match loader.load() {
        Ok(config) => config,
        Err(e) => {
            println!("{} {}", style("Configuration invalid:").red().bold(), e);
            return Ok(());
        }
    };

    println!("{}", style("Provider:").bold());
    println!("  Model: {}", config.gemini.model);
    let key_status = if config.gemini.api_key.is_empty() {
        style("not configured").red()
    } else {
        style("configured").green()
    };
    println!("  Gemini API key: {}", key_status);
    println!();

    println!("{}", style("Telegram:").bold());
    let enabled = if config.telegram.enabled {
        style("enabled").green()
    } else {
        style("disabled").dim()
    };
    println!("  Channel: {}", enabled);
    let token_status = if config.telegram.token.is_empty() {
        style("not configured").red()
    } else {
        style("configured").green()
    };
    println!("  Bot token: {}", token_status);
    if config.telegram.allow_from.is_empty() {
        println!("  Allow list: (everyone)");
    } else {
        println!("  Allow list: {}", config.telegram.allow_from.join(", "));
    }

    Ok(())
}
