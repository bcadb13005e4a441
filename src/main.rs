use clap::Parser;
use colored::*;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ai_to_ai_chat::cli::Args;
use ai_to_ai_chat::console::Console;
use ai_to_ai_chat::export::{export_transcript, write_transcript};
use ai_to_ai_chat::{AppConfig, Orchestrator, Session, StreamingClient};

fn init_logging(verbose: bool) {
    let default = if verbose {
        "ai_to_ai_chat=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // Logs go to stderr so the transcript on stdout stays clean.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = AppConfig::resolve(&args)?;
    let catalog = config.catalog()?;
    let session = Session::new(config.participants(&catalog))
        .with_mode(config.mode)
        .with_topic(config.topic.clone());
    let client = Arc::new(StreamingClient::new(&config.client_config())?);
    info!(endpoint = %config.endpoint, session = %session.id(), "session created");

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let orchestrator =
        Orchestrator::new(session, client, event_tx).with_auto_delay(config.auto_delay());

    if args.headless {
        // No console reads the events in headless mode.
        drop(event_rx);
        let mut orchestrator = orchestrator;
        let mut ok = orchestrator.start_session().await;
        for _ in 1..args.turns {
            if !ok {
                break;
            }
            ok = orchestrator.request_next_turn().await;
        }
        let session = orchestrator.into_session();
        println!("{}", export_transcript(session.transcript(), &catalog));
        if let Some(error) = session.last_error() {
            eprintln!("{}", error.red());
        }
        if let Some(path) = &args.output {
            write_transcript(path, session.transcript(), &catalog)?;
        }
        return Ok(());
    }

    let (command_tx, command_rx) = mpsc::channel(32);
    let driver = tokio::spawn(orchestrator.run(command_rx));
    Console::new(command_tx, event_rx, catalog.clone(), config.view)
        .run()
        .await?;
    let session = driver.await?;
    if let Some(path) = &args.output {
        write_transcript(path, session.transcript(), &catalog)?;
        eprintln!("Transcript written to {}", path.display());
    }
    Ok(())
}
