//! Application entry point: voice reader console.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (writes the defaults on first run).
//! 3. Create [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Build the espeak-ng, tesseract and story store backends from config.
//! 5. Spawn the pipeline orchestrator and the status announcer.
//! 6. Read commands from stdin until `quit` or end of input.

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use voice_reader::{
    app::{self, ConsoleInput},
    config::AppConfig,
    ocr::{ImageInput, TesseractEngine},
    pipeline::{PipelineCommand, PipelineOrchestrator, SessionState},
    speech::EspeakSynth,
    store::HttpStoryClient,
};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Voice reader starting up");

    let config = AppConfig::load_or_init().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(run(config))
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    let orchestrator = PipelineOrchestrator::new(
        &config,
        Arc::new(EspeakSynth::from_config(&config.speech)),
        Arc::new(TesseractEngine::from_config(&config.ocr)),
        Arc::new(HttpStoryClient::from_config(&config.store)),
    );
    let snapshots = orchestrator.subscribe();

    let (command_tx, command_rx) = mpsc::channel::<PipelineCommand>(32);
    let pipeline = tokio::spawn(orchestrator.run(command_rx));
    let announcer = tokio::spawn(announce(snapshots.clone()));

    println!("{}", app::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let input = match app::parse_command(&line) {
            Ok(Some(input)) => input,
            Ok(None) => continue,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        let command = match input {
            ConsoleInput::Pipeline(command) => command,
            ConsoleInput::Upload(path) => match ImageInput::from_path(&path).await {
                Ok(image) => PipelineCommand::UploadImage(image),
                Err(e) => {
                    println!("Cannot read {}: {e}", path.display());
                    continue;
                }
            },
            ConsoleInput::Voices => {
                println!("{}", app::render_voices(&snapshots.borrow()));
                continue;
            }
            ConsoleInput::Status => {
                println!("{}", app::render_status(&snapshots.borrow()));
                continue;
            }
            ConsoleInput::Help => {
                println!("{}", app::HELP);
                continue;
            }
            ConsoleInput::Quit => break,
        };

        if command_tx.send(command).await.is_err() {
            log::error!("pipeline stopped unexpectedly");
            break;
        }
    }

    drop(command_tx);
    pipeline.await.context("pipeline task failed")?;
    announcer.abort();

    log::info!("Voice reader shutting down");
    Ok(())
}

/// Print a line for every visible change in the session.
async fn announce(mut snapshots: watch::Receiver<SessionState>) {
    let mut prev = snapshots.borrow_and_update().clone();
    while snapshots.changed().await.is_ok() {
        let next = snapshots.borrow_and_update().clone();
        for line in app::describe_change(&prev, &next) {
            println!("{line}");
        }
        prev = next;
    }
}
