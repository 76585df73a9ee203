//! Vote Node
//!
//! Hosts a set of votes in the process-wide registry and exposes the
//! diagnostic surface as a console on stdin.

mod config;
mod console;
mod error;

use clap::Parser;
use config::NodeConfig;
use console::{Command, Console, HELP};
use std::io::{self, BufRead};
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Vote arbitration node
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON file describing the votes (built-in charger demo if omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Print dumps as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Setup logging
    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match &args.config {
        Some(path) => NodeConfig::load(path)?,
        None => NodeConfig::default(),
    };

    let registry = vote_core::global().clone();
    config.build(&registry)?;
    info!("Vote node started with {} votes", registry.len());

    let console = Console::new(registry, args.json);

    // Stdin is blocking; read it on its own thread
    let (line_tx, mut line_rx) = tokio::sync::mpsc::channel::<String>(16);
    std::thread::spawn(move || {
        println!("\n{}\n", HELP);
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            if line_tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            line = line_rx.recv() => {
                let Some(line) = line else { break };
                let command = match line.parse::<Command>() {
                    Ok(command) => command,
                    Err(e) => {
                        println!("{}", e);
                        continue;
                    }
                };
                if command == Command::Quit {
                    break;
                }
                match console.execute(command) {
                    Ok(out) => println!("{}", out),
                    Err(e) => {
                        error!("{}", e);
                        println!("error: {}", e);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    info!("Vote node shutting down");
    Ok(())
}
