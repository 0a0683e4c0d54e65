use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use chatwarden::{
    api::{data_api::DataApiClient, innertube::LiveChatClient, publisher::DryRunPublisher},
    bot::{resolve_stream, ModeratorBot},
    chat_management::{CommandRouter, WelcomeTracker},
    config::{AppConfig, ConfigManager},
    logging::init_logging,
    manager::BotManager,
    traits::{ChatPublisher, StreamResolver},
};

#[derive(Parser)]
#[command(name = "chatwarden")]
#[command(about = "YouTube live chat moderator bot", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,

    /// Video id or watch URL to monitor (overrides the config file)
    #[arg(long, value_name = "ID|URL")]
    video: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn print_banner() {
    println!();
    println!("  ╔══════════════════════════════════════╗");
    println!("  ║   🛡️  chatwarden v{:<19}║", env!("CARGO_PKG_VERSION"));
    println!("  ║   YouTube Live Chat Moderator Bot    ║");
    println!("  ╚══════════════════════════════════════╝");
    println!();
}

fn load_config(path: Option<PathBuf>) -> Result<AppConfig> {
    let manager = match path {
        Some(path) => ConfigManager::from_path(path),
        None => ConfigManager::new()?,
    };
    manager.load_config()
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config)?;
    let _log_guard = init_logging(&config.log, &config.log_file(), cli.verbose)?;
    print_banner();

    let data_api = DataApiClient::new(config.api_key.clone(), config.access_token.clone());
    let resolver: Option<&dyn StreamResolver> = if data_api.can_read() {
        Some(&data_api)
    } else {
        tracing::info!("ℹ️ No Data API credentials configured, auto-detection disabled");
        None
    };
    let publisher: Arc<dyn ChatPublisher> = if data_api.can_write() {
        tracing::info!("🔐 Access token configured, replies will be posted to chat");
        Arc::new(data_api.clone())
    } else {
        tracing::warn!("⚠️ No access token configured, running in dry-run mode");
        Arc::new(DryRunPublisher)
    };

    let explicit_video = cli.video.as_deref().or(config.video());
    let context = resolve_stream(explicit_video, config.channel(), resolver)
        .await
        .context("Could not resolve a live stream to moderate")?;

    let source = LiveChatClient::new(context.video_id.clone());
    let router = CommandRouter::new(&config.commands_file, &config.bot_prefix, config.cooldown());
    let welcome = WelcomeTracker::new(
        Some(&context.chat_handle),
        &config.data_dir,
        config.welcome_message.clone(),
    );

    let video_id = context.video_id.0.clone();
    let bot = ModeratorBot::new(context, source, publisher, router, welcome);

    let manager = BotManager::new();
    manager.start(video_id, |cancel| async move {
        bot.run(cancel).await?;
        Ok(())
    })?;
    tracing::info!("   Press Ctrl+C to stop.");

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl+C")?;
            tracing::info!("🛑 Ctrl+C received");
        }
        _ = manager.finished() => {}
    }

    match manager.stop().await {
        Some(result) => result,
        None => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("❌ Fatal error: {:#}", e);
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    }

    tracing::info!("Goodbye! 👋");
}
