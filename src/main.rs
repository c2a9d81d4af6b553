//! Application entry point: a headless host loop for the hand tracking core.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run) and
//!    validate it.
//! 3. Build the candidate engines in configured order.  The camera engine is
//!    backed by [`SimulatedGestureApi`]; the skeleton engine has no runtime on
//!    a desktop and is skipped by selection.
//! 4. Create a single-threaded tokio runtime and tick the provider at
//!    `runtime.tick_hz`, then every checker, in that order.
//! 5. Print checker notifications (and optional state snapshots) to stdout
//!    as JSON lines until Ctrl-C.

use std::time::{Duration, Instant};

use anyhow::Result;
use serde::Serialize;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::time::MissedTickBehavior;

use hand_tracking::{
    checker::{HandStateChecker, HandStateEvent},
    config::{AppConfig, EngineKind},
    engine::{CameraEngine, HandEngine, SimulatedGestureApi, SkeletonEngine, Tick},
    hand::{pose, DetectionMode, FailureReason, GestureResult, Quat, Vec3},
    provider::GestureProvider,
};

/// Viewer pose supplied to engines every tick (standing eye height).
const VIEWER_HEIGHT: f32 = 1.6;

// ---------------------------------------------------------------------------
// FrameSnapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct HandSnapshot {
    hand: &'static str,
    gesture: &'static str,
    confidence: f32,
    pinch: f32,
    position: Vec3,
}

/// Periodic view of the provider's state.
#[derive(Debug, Serialize)]
struct FrameSnapshot {
    tick: u64,
    engine: Option<&'static str>,
    status: &'static str,
    failure: FailureReason,
    mode: DetectionMode,
    frames: u64,
    left: Option<HandSnapshot>,
    right: Option<HandSnapshot>,
}

impl FrameSnapshot {
    fn capture(tick: u64, provider: &GestureProvider) -> Self {
        let hand = |h: &GestureResult| HandSnapshot {
            hand: h.handedness(),
            gesture: h.gesture.as_str(),
            confidence: h.confidence,
            pinch: h.pinch.level,
            position: h.position(),
        };
        Self {
            tick,
            engine: provider.engine_name(),
            status: provider.status().label(),
            failure: provider.failure(),
            mode: provider.mode(),
            frames: provider.frames(),
            left: provider.left_hand().map(hand),
            right: provider.right_hand().map(hand),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine construction
// ---------------------------------------------------------------------------

fn build_engines(config: &AppConfig) -> Vec<Box<dyn HandEngine>> {
    config
        .provider
        .engines
        .iter()
        .map(|kind| -> Box<dyn HandEngine> {
            match kind {
                EngineKind::Camera => Box::new(CameraEngine::from_config(
                    Box::new(SimulatedGestureApi::new(config.simulation.clone())),
                    &config.camera,
                )),
                EngineKind::Skeleton => Box::new(SkeletonEngine::unbound()),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Host loop
// ---------------------------------------------------------------------------

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(e) => log::warn!("failed to serialise output: {e}"),
    }
}

fn drain_events(receivers: &mut [broadcast::Receiver<HandStateEvent>]) {
    for rx in receivers.iter_mut() {
        loop {
            match rx.try_recv() {
                Ok(event) => print_json(&event),
                Err(TryRecvError::Lagged(n)) => log::warn!("dropped {n} checker event(s)"),
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }
}

async fn run(config: AppConfig) -> Result<()> {
    let mut provider = GestureProvider::new(build_engines(&config), &config.provider);
    let mut checkers: Vec<HandStateChecker> = config
        .checkers
        .iter()
        .cloned()
        .map(HandStateChecker::new)
        .collect();
    let mut receivers: Vec<_> = checkers.iter().map(HandStateChecker::subscribe).collect();

    let viewer = pose(Vec3::new(0.0, VIEWER_HEIGHT, 0.0), Quat::identity());
    let period = Duration::from_secs_f64(1.0 / f64::from(config.runtime.tick_hz));
    let snapshot_every = u64::from(config.runtime.snapshot_every_ticks);

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    log::info!(
        "ticking at {} Hz with {} checker(s)",
        config.runtime.tick_hz,
        checkers.len()
    );
    provider.start();

    let mut tick_count: u64 = 0;
    loop {
        tokio::select! {
            _ = interval.tick() => {
                tick_count += 1;
                provider.tick(&Tick::at(Instant::now()).with_viewer(viewer));
                for checker in checkers.iter_mut() {
                    checker.update(provider.state());
                }
                drain_events(&mut receivers);

                if snapshot_every > 0 && tick_count % snapshot_every == 0 {
                    print_json(&FrameSnapshot::capture(tick_count, &provider));
                }
            }
            result = &mut ctrl_c => {
                if let Err(e) = result {
                    log::error!("failed to listen for Ctrl-C: {e}");
                }
                break;
            }
        }
    }

    provider.shutdown();
    Ok(())
}

fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("hand tracking host starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    config.validate()?;
    if AppConfig::is_first_run() {
        if let Err(e) = config.save() {
            log::warn!("Failed to write default settings: {e}");
        }
    }

    // 3. Tokio runtime (the core is single-threaded per tick)
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    rt.block_on(run(config))
}
