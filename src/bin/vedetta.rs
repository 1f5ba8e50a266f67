//! vedetta - send one message through the gateway
//!
//! Reads the configuration, builds a gateway with the OpenAI-compatible
//! provider and prints the reply.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::Parser;
use vedetta::{GatewayConfig, RequestOptions, Vedetta};

/// Vedetta chat gateway driver
#[derive(Parser)]
#[command(name = "vedetta")]
#[command(version)]
#[command(about = "Send a message through the Vedetta chat gateway")]
struct Args {
    /// Config file (default: ~/.vedetta/config.toml, then /etc/vedetta/config.toml)
    #[arg(short, long, env = "VEDETTA_CONFIG")]
    config: Option<PathBuf>,

    /// Print the reply and classification as JSON
    #[arg(long)]
    json: bool,

    /// Model override for this message
    #[arg(short, long)]
    model: Option<String>,

    /// Message to send (or omit to read from stdin)
    message: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // default: info; override with RUST_LOG
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let message = resolve_text(args.message)?;

    let config = GatewayConfig::load_or_default(args.config.as_deref())?;
    let gateway = Vedetta::builder().config(config).build()?;
    gateway.start();

    let mut options = RequestOptions::default();
    if let Some(model) = args.model {
        options = options.model(model);
    }
    let reply = gateway.send_message(&message, options).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reply)?);
    } else {
        println!("{}", reply.response);
    }

    gateway.shutdown().await;
    Ok(())
}

/// Message from the argument, or from stdin when piped.
fn resolve_text(arg: Option<String>) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(text) = arg {
        return Ok(text);
    }
    if !io::stdin().is_terminal() {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        let trimmed = buf.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }
    Err("no message provided (pass text as argument or via stdin)".into())
}
