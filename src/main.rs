//! CLI for chatcore
//!
//! Subcommands:
//! - `serve`: run the broker with a console relay on stdin/stdout
//! - `history`: print the stored message history

use std::sync::Arc;

use chatcore::broker::{Broker, Shutdown};
use chatcore::config::{Settings, load_config};
use chatcore::console::{render, serve};
use chatcore::persistence::History;
use clap::Parser;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "chatcore")]
enum Command {
    /// Run the broker and read commands from stdin
    Serve {
        /// Do not record messages in the history store
        #[arg(long)]
        no_history: bool,
    },
    /// Print stored messages, optionally for a single sender
    History {
        #[arg(long)]
        sender: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };
    chatcore::utils::logging::init(&config.log.level);

    let cmd = Command::parse();

    let result = match cmd {
        Command::Serve { no_history } => run_server(config, no_history).await,
        Command::History { sender } => print_history(&config, sender.as_deref()),
    };

    if let Err(e) = result {
        error!("chatcore failed: {}", e);
        std::process::exit(1);
    }
}

async fn run_server(config: Settings, no_history: bool) -> Result<(), Box<dyn std::error::Error>> {
    let history = if no_history {
        None
    } else {
        Some(History::from_settings(&config.history)?)
    };

    let shutdown = Arc::new(Shutdown::new());
    let broker = Arc::new(Broker::with_settings(shutdown.clone(), &config.broker));

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received. Exiting gracefully.");
            shutdown.cancel();
        }
    });

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    let printer = tokio::spawn(async move {
        while let Some(line) = out_rx.recv().await {
            println!("{line}");
        }
    });

    info!("chatcore relay ready; type /join <id> to begin");

    let served = serve(
        broker,
        history,
        config.broker.session_queue_capacity,
        BufReader::new(tokio::io::stdin()),
        out_tx,
    )
    .await;
    printer.await?;
    served?;

    Ok(())
}

fn print_history(config: &Settings, sender: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let history = History::from_settings(&config.history)?;
    for msg in history.load_messages(sender)? {
        println!("{}", render(&msg));
    }
    Ok(())
}
