use clap::{Parser, Subcommand};
use psyche::channels::TelegramChannel;
use psyche::config;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "psyche")]
#[command(about = "Psyche Telegram bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the webhook server. Registers telegram.webhookUrl with Telegram when it is set.
    Serve {
        /// Config file path (default: ./psyche.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// HTTP port (default from config or 8787)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Point the bot's webhook at URL.
    SetWebhook {
        /// Public HTTPS URL Telegram should POST updates to
        #[arg(long, value_name = "URL")]
        url: String,

        /// Config file path (default: ./psyche.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Remove the bot's webhook.
    DeleteWebhook {
        /// Config file path (default: ./psyche.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("psyche {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("serve failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::SetWebhook { url, config }) => {
            if let Err(e) = run_set_webhook(config, &url).await {
                log::error!("set-webhook failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::DeleteWebhook { config }) => {
            if let Err(e) = run_delete_webhook(config).await {
                log::error!("delete-webhook failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

async fn run_serve(config_path: Option<PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let (mut config, path) = config::load_config(config_path)?;
    if let Some(p) = port {
        config.server.port = p;
    }
    log::info!(
        "starting webhook server on {}:{} (config {})",
        config.server.bind,
        config.server.port,
        path.display()
    );
    psyche::gateway::run_gateway(config).await
}

fn telegram_client(config_path: Option<PathBuf>) -> anyhow::Result<(TelegramChannel, config::Config)> {
    let (config, _) = config::load_config(config_path)?;
    let token = config::resolve_telegram_token(&config)?;
    let channel = TelegramChannel::new(config::resolve_api_base(&config), token);
    Ok((channel, config))
}

async fn run_set_webhook(config_path: Option<PathBuf>, url: &str) -> anyhow::Result<()> {
    let (telegram, config) = telegram_client(config_path)?;
    let secret = config::resolve_webhook_secret(&config);
    telegram
        .set_webhook(url, secret.as_deref())
        .await
        .map_err(anyhow::Error::msg)?;
    println!("webhook set to {}", url);
    Ok(())
}

async fn run_delete_webhook(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let (telegram, _) = telegram_client(config_path)?;
    telegram
        .delete_webhook()
        .await
        .map_err(anyhow::Error::msg)?;
    println!("webhook deleted");
    Ok(())
}
