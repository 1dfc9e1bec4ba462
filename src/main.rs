use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use voice_interview::{
    Config, FileCaptureGateway, SessionOptions, TurnClient, TurnController, TurnOutcome,
};

/// Run one spoken interview from the command line: each WAV file is recorded
/// as one answer, exchanged with the interview service, and the spoken reply
/// is written next to its printed transcript.
#[derive(Debug, Parser)]
#[command(name = "voice-interview")]
struct Cli {
    /// Configuration file (defaults apply without one)
    #[arg(long)]
    config: Option<String>,

    /// Interview service endpoint (overrides the config file)
    #[arg(long)]
    endpoint: Option<String>,

    /// Session identifier (generated if omitted)
    #[arg(long)]
    session_id: Option<String>,

    /// Total number of questions, used for display only
    #[arg(long)]
    questions: Option<u32>,

    /// Directory where reply clips are written
    #[arg(long, default_value = "replies")]
    out_dir: PathBuf,

    /// One WAV file per spoken answer, in interview order
    #[arg(required = true)]
    answers: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path).context("Failed to load configuration")?,
        None => Config::default(),
    };

    let endpoint = cli
        .endpoint
        .unwrap_or_else(|| config.service.endpoint.clone());
    let session_id = cli
        .session_id
        .unwrap_or_else(|| format!("interview-{}", uuid::Uuid::new_v4()));

    info!("Interview session {} against {}", session_id, endpoint);

    let client = TurnClient::new(endpoint, Duration::from_secs(config.service.timeout_secs));
    let options = SessionOptions {
        session_id: Some(session_id),
        question_count: cli.questions,
    };

    let mut gateway = FileCaptureGateway::new(cli.answers.clone(), config.audio.clone());
    let mut controller = TurnController::new(options, client);

    controller
        .acquire(&mut gateway)
        .await
        .context("Capture acquisition failed")?;

    fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("Failed to create {}", cli.out_dir.display()))?;

    for (i, answer) in cli.answers.iter().enumerate() {
        info!("Answering turn {} from {}", i + 1, answer.display());

        controller.start_answer();

        match controller.finish_answer().await {
            Ok(TurnOutcome::Replied) => {
                if let Some(reply) = controller.last_reply() {
                    println!("[turn {}] {}", reply.turn_index, reply.transcript);

                    let path = cli.out_dir.join(format!(
                        "reply-{:03}.{}",
                        reply.turn_index,
                        extension_for(reply.audio.mime())
                    ));
                    fs::write(&path, reply.audio.bytes())
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("Reply clip written to {}", path.display());
                }
            }
            Ok(outcome) => warn!("Turn {} finished without a reply: {:?}", i + 1, outcome),
            // Per-turn failures are recoverable: move on to the next answer.
            Err(e) => error!("Turn {} failed: {}", i + 1, e),
        }
    }

    controller.mark_done();

    info!(
        "Interview complete: {} of {} turn(s) answered",
        controller.turns_completed(),
        cli.answers.len()
    );

    Ok(())
}

fn extension_for(mime: &str) -> &str {
    match mime {
        "audio/wav" | "audio/x-wav" => "wav",
        "audio/webm" => "webm",
        "audio/ogg" => "ogg",
        "audio/mpeg" => "mp3",
        _ => "bin",
    }
}
