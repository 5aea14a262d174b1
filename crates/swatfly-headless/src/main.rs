//! Headless driver for the swat-the-fly client core.
//!
//! Runs the frame loop without a display. Offline by default: the local
//! player swats the nearest autonomous fly at a fixed cadence. With
//! `--replay`, an online session is fed server messages from a JSON-lines
//! file, one message per frame, and outbound messages are logged.
//!
//! A JSON summary of the run is printed to stdout.

mod sinks;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use glam::Vec2;
use swatfly_core::{
    Appearance, ControlMode, FrameStatus, GameConfig, Mode, Session, Simulation, Transport,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::sinks::{CountingCanvas, LogPresenter, LogTransport};

/// Headless swat-the-fly client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON config file; missing fields take their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server messages to replay, one JSON object per line
    #[arg(short, long)]
    replay: Option<PathBuf>,

    /// Frames to run
    #[arg(short, long, default_value_t = 600)]
    frames: u32,

    /// Simulated frame duration in milliseconds
    #[arg(long, default_value_t = 16.0)]
    frame_ms: f64,

    /// Autonomous flies in offline mode (overrides the config)
    #[arg(long)]
    bots: Option<usize>,

    /// RNG seed (overrides the config)
    #[arg(long)]
    seed: Option<u64>,

    /// Offline: frames between swats, 0 to never swat
    #[arg(long, default_value_t = 45)]
    swat_every: u32,

    /// Display name of the local player
    #[arg(long, default_value = "Headless")]
    name: String,

    /// Glyph of the local player
    #[arg(long, default_value = "🪰")]
    glyph: String,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn load_config(args: &Args) -> Result<GameConfig> {
    let mut config = match &args.config {
        Some(path) => GameConfig::from_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => GameConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(bots) = args.bots {
        config.autonomous.count = bots;
    }
    config.validate().context("invalid config after overrides")?;
    Ok(config)
}

fn load_replay(path: &Path) -> Result<Vec<String>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading replay {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect())
}

/// Position of the closest live autonomous fly to the local player.
fn nearest_fly<T: Transport>(session: &Session<T>) -> Option<Vec2> {
    let registry = &session.world().registry;
    let from = registry.local_entity()?.position();
    registry
        .iter()
        .filter(|e| e.mode() == ControlMode::Autonomous && e.is_alive())
        .map(|e| e.position())
        .min_by(|a, b| a.distance_squared(from).total_cmp(&b.distance_squared(from)))
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let config = load_config(&args)?;
    let appearance = Appearance::named(args.name.clone(), args.glyph.clone());
    let replay = args.replay.as_deref().map(load_replay).transpose()?;

    let mut session = Session::new(config, appearance, LogTransport::default())?;
    match &replay {
        Some(lines) => {
            info!(messages = lines.len(), "replaying server messages");
            session.connection_opened();
        }
        None => session.start_offline(),
    }

    let mut sim = Simulation::new(session, LogPresenter::default());
    let mut canvas = CountingCanvas::default();
    let mut pending = replay.unwrap_or_default().into_iter();
    let mut swats = 0u32;

    for frame in 0..args.frames {
        let now = f64::from(frame) * args.frame_ms;

        if let Some(line) = pending.next() {
            sim.session_mut().handle_message(&line);
        }

        if sim.session().mode() == Mode::Offline
            && args.swat_every > 0
            && frame % args.swat_every == args.swat_every - 1
        {
            if let Some(target) = nearest_fly(sim.session()) {
                let session = sim.session_mut();
                session.pointer_moved(target, now);
                let outcome = session.clicked(target, now);
                debug!(frame, ?outcome, "swat");
                swats += 1;
            }
        }

        if sim.frame(now, &mut canvas) == FrameStatus::Stopped {
            break;
        }
    }

    let frames = sim.frames();
    let world = sim.session().world();
    let local_score = world.registry.local_entity().map_or(0, |e| e.score());
    let summary = serde_json::json!({
        "mode": format!("{:?}", sim.session().mode()),
        "frames": frames,
        "clock_ms": world.clock_ms(),
        "entities": world.registry.len(),
        "local_score": local_score,
        "swats": swats,
        "deaths": sim.presenter().deaths,
        "scoreboard": sim.presenter().scoreboard,
        "sprites_drawn": canvas.sprites,
        "peak_bursts": canvas.peak_bursts,
        "messages_sent": sim.session().outbound().transport().sent,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    sim.stop();
    info!(frames, local_score, "run finished");
    Ok(())
}
