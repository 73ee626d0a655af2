#![forbid(unsafe_code)]

//! `posture-coach` — run a coaching session against simulated
//! collaborators.
//!
//! Bootstraps configuration and tracing, wires the simulated pose source
//! and console cue player, starts the selected program, and logs session
//! events until completion or ctrl-c.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use posture_coach::collab::{CuePlayer, PoseSource};
use posture_coach::config::CoachConfig;
use posture_coach::models::session::ProgramId;
use posture_coach::orchestrator::{SessionEvent, SessionOrchestrator};
use posture_coach::sim::{ConsoleCuePlayer, SimulatedPoseSource};
use posture_coach::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum ProgramArg {
    LateralTurn,
    VerticalTilt,
    BreathingHold,
}

impl From<ProgramArg> for ProgramId {
    fn from(arg: ProgramArg) -> Self {
        match arg {
            ProgramArg::LateralTurn => Self::LateralTurn,
            ProgramArg::VerticalTilt => Self::VerticalTilt,
            ProgramArg::BreathingHold => Self::BreathingHold,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "posture-coach", about = "Pose-gated exercise coaching engine", version, long_about = None)]
struct Cli {
    /// Exercise program to run.
    #[arg(long, value_enum, default_value_t = ProgramArg::LateralTurn)]
    program: ProgramArg,

    /// Path to a TOML configuration file; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("posture-coach bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let config = match args.config {
        Some(ref path) => CoachConfig::load_from_path(path)?,
        None => CoachConfig::default(),
    };
    let config = Arc::new(config);
    info!("configuration loaded");

    // ── Wire simulated collaborators ────────────────────
    let pose: Arc<dyn PoseSource> = Arc::new(SimulatedPoseSource::new());
    let cues: Arc<dyn CuePlayer> = Arc::new(ConsoleCuePlayer::new());
    let (event_tx, mut event_rx) = mpsc::channel(64);

    let orchestrator = Arc::new(SessionOrchestrator::new(pose, cues, config, event_tx));

    // ── Stop the session on ctrl-c / SIGTERM ────────────
    let signal_orchestrator = Arc::clone(&orchestrator);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        signal_orchestrator.stop().await;
    });

    // ── Run the session ─────────────────────────────────
    orchestrator.start(args.program.into()).await?;

    while let Some(event) = event_rx.recv().await {
        match event {
            SessionEvent::StateChanged { from, to, .. } => {
                info!(%from, %to, "session state changed");
            }
            SessionEvent::Completed {
                program_id,
                result,
                message,
            } => {
                info!(%program_id, completed = result.completed, %message, "session finished");
                break;
            }
        }
    }

    info!("posture-coach shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
