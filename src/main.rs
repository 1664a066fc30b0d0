use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use model_fallback::{FallbackClient, Message, RequestOptions};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "model-fallback", version, about = "Chat with the first available model")]
struct Cli {
    /// Config file layered over the built-in backend list
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send one prompt and print the reply
    Ask {
        prompt: String,

        /// System prompt sent before the user message
        #[arg(long)]
        system: Option<String>,

        #[arg(long)]
        temperature: Option<f32>,

        #[arg(long)]
        max_tokens: Option<u32>,
    },

    /// Print backend availability as JSON
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let client = match &cli.config {
        Some(path) => FallbackClient::with_config_path(path),
        None => FallbackClient::new(),
    }
    .context("failed to set up model router")?;

    match cli.command {
        Command::Ask {
            prompt,
            system,
            temperature,
            max_tokens,
        } => {
            let mut messages = Vec::new();
            if let Some(system) = system {
                messages.push(Message::system(system));
            }
            messages.push(Message::user(prompt));

            let options = RequestOptions {
                temperature,
                max_tokens,
                ..RequestOptions::default()
            };

            match client.chat(&messages, &options).await {
                Ok(reply) => println!("{}", reply),
                Err(err) if err.is_retryable() => {
                    let status = client.status();
                    let retry = status
                        .next_reset_minutes
                        .map(|m| format!(" Try again in about {} minute(s).", m))
                        .unwrap_or_default();
                    anyhow::bail!(
                        "{} ({}/{} models available).{}",
                        err,
                        status.available_backends,
                        status.total_backends,
                        retry
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
        Command::Status => {
            println!("{}", serde_json::to_string_pretty(&client.status())?);
        }
    }

    Ok(())
}
