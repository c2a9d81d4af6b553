//! Engine selector and lifecycle controller.
//!
//! [`GestureProvider`] owns the candidate engines and the [`DetectionState`],
//! and is ticked once per frame by the host.
//!
//! # Selection
//!
//! ```text
//! for each candidate, in order:
//!   is_supported? ──no──▶ next
//!   clear state, setup ──Error──▶ next
//!   start ──Error──▶ stop, next
//!   commit, done
//! none left ──▶ "no suitable engine" (permanent for this session)
//! ```
//!
//! # Runtime
//!
//! ```text
//! tick ─▶ (status NotStarted/Error? skip) ─▶ engine.update
//!           ├─ Error    ─▶ clear hands; frames > restart_min_frames? stop + start again
//!           └─ updated  ─▶ Starting → Running, frames += 1
//! ```
//!
//! Setup and start are multi-tick; a step that completes synchronously lets
//! selection continue to the next step within the same tick.  While a start
//! sequence is in flight no `update()` is issued.

use crate::config::ProviderConfig;
use crate::engine::{HandEngine, TaskState, Tick, TrackingError};
use crate::hand::{DetectionMode, DetectionStatus, FailureReason, GestureOption, GestureResult};

use super::state::DetectionState;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SelectStep {
    Probe,
    Setup,
    Start,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// No engine committed and no selection running.
    Idle,
    /// Walking the candidate list.
    Selecting { candidate: usize, step: SelectStep },
    /// A (re)start sequence on the committed engine is in flight.
    Restarting,
    /// The committed engine is updated every tick (unless stopped).
    Detecting,
    /// Every candidate failed.
    Exhausted,
    /// Shut down; further ticks are no-ops.
    Terminated,
}

// ---------------------------------------------------------------------------
// GestureProvider
// ---------------------------------------------------------------------------

/// Picks one engine and keeps it running.
pub struct GestureProvider {
    engines: Vec<Box<dyn HandEngine>>,
    active: Option<usize>,
    state: DetectionState,
    option: GestureOption,
    auto_restart: bool,
    restart_min_frames: u64,
    frames: u64,
    phase: Phase,
}

impl std::fmt::Debug for GestureProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GestureProvider")
            .field("engine", &self.engine_name())
            .field("phase", &self.phase)
            .field("status", &self.state.status)
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

impl GestureProvider {
    /// Create a provider over `engines`, in priority order.  Nothing happens
    /// until [`start`](Self::start) is called.
    pub fn new(engines: Vec<Box<dyn HandEngine>>, config: &ProviderConfig) -> Self {
        Self {
            engines,
            active: None,
            state: DetectionState::new(config.option.mode),
            option: config.option.clone(),
            auto_restart: config.auto_restart,
            restart_min_frames: config.restart_min_frames,
            frames: 0,
            phase: Phase::Idle,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn status(&self) -> DetectionStatus {
        self.state.status
    }

    pub fn failure(&self) -> FailureReason {
        self.state.failure
    }

    pub fn mode(&self) -> DetectionMode {
        self.state.mode
    }

    pub fn have_skeleton(&self) -> bool {
        self.state.mode.has_skeleton()
    }

    pub fn left_hand(&self) -> Option<&GestureResult> {
        self.state.left.as_ref()
    }

    pub fn right_hand(&self) -> Option<&GestureResult> {
        self.state.right.as_ref()
    }

    pub fn updated_this_frame(&self) -> bool {
        self.state.updated_this_frame
    }

    /// Name of the committed engine, `None` before selection succeeds.
    pub fn engine_name(&self) -> Option<&'static str> {
        self.active.map(|i| self.engines[i].name())
    }

    /// Accepted frames since the last (re)start.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// The start request, with the mode replaced by the last negotiated one.
    pub fn option(&self) -> &GestureOption {
        &self.option
    }

    pub fn state(&self) -> &DetectionState {
        &self.state
    }

    /// `true` once every candidate has failed.
    pub fn is_exhausted(&self) -> bool {
        self.phase == Phase::Exhausted
    }

    // -----------------------------------------------------------------------
    // Lifecycle hooks
    // -----------------------------------------------------------------------

    /// Begin detection: run selection the first time, restart the committed
    /// engine afterwards.
    pub fn start(&mut self) {
        match self.phase {
            Phase::Terminated => log::debug!("provider: start ignored after shutdown"),
            Phase::Exhausted => log::debug!("provider: no engine to start"),
            Phase::Selecting { .. } | Phase::Restarting => {}
            Phase::Idle if self.active.is_none() => {
                log::info!("provider: selecting from {} engine(s)", self.engines.len());
                self.phase = Phase::Selecting {
                    candidate: 0,
                    step: SelectStep::Probe,
                };
            }
            Phase::Idle | Phase::Detecting => self.begin_start(),
        }
    }

    pub fn enable(&mut self) {
        self.start();
    }

    pub fn disable(&mut self) {
        self.stop();
    }

    /// Host pause/resume.  Pausing stops the engine; resuming starts it again
    /// (or restarts selection if it was interrupted).
    pub fn pause(&mut self, paused: bool) {
        if paused {
            self.stop();
        } else {
            self.start();
        }
    }

    /// Stop everything.  Later ticks and hooks do nothing.
    pub fn shutdown(&mut self) {
        self.stop();
        self.phase = Phase::Terminated;
        log::info!("provider: shut down");
    }

    /// Stop the active or in-flight engine, clear the shared state and
    /// abandon any in-flight setup/start.
    pub fn stop(&mut self) {
        match self.phase {
            Phase::Terminated => return,
            Phase::Selecting { candidate, step } => {
                if step != SelectStep::Probe {
                    self.engines[candidate].stop();
                }
                self.phase = Phase::Idle;
            }
            Phase::Restarting | Phase::Detecting => {
                if let Some(i) = self.active {
                    self.engines[i].stop();
                }
                self.phase = Phase::Detecting;
            }
            Phase::Idle | Phase::Exhausted => {}
        }
        self.state.clear();
        self.frames = 0;
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Advance by one frame.
    pub fn tick(&mut self, tick: &Tick) {
        match self.phase {
            Phase::Selecting { .. } => self.step_selection(tick),
            Phase::Restarting => self.step_restart(tick),
            Phase::Detecting => self.step_update(tick),
            Phase::Idle | Phase::Exhausted | Phase::Terminated => {}
        }
    }

    fn step_selection(&mut self, tick: &Tick) {
        while let Phase::Selecting { candidate, step } = self.phase {
            let Some(engine) = self.engines.get_mut(candidate) else {
                log::error!("provider: {}", TrackingError::NoViableEngine);
                self.phase = Phase::Exhausted;
                return;
            };

            match step {
                SelectStep::Probe => {
                    if !engine.is_supported() {
                        log::info!("provider: {} not supported, skipping", engine.name());
                        self.phase = next_candidate(candidate);
                        continue;
                    }
                    self.state.clear();
                    self.phase = Phase::Selecting {
                        candidate,
                        step: SelectStep::Setup,
                    };
                }
                SelectStep::Setup => match engine.setup(&mut self.state, tick) {
                    TaskState::Pending => return,
                    TaskState::Failed => {
                        log::error!(
                            "provider: {} setup failed ({})",
                            engine.name(),
                            self.state.failure
                        );
                        self.phase = next_candidate(candidate);
                    }
                    TaskState::Done if self.state.is_error() => {
                        log::error!("provider: {} setup failed", engine.name());
                        self.phase = next_candidate(candidate);
                    }
                    TaskState::Done => {
                        self.frames = 0;
                        self.phase = Phase::Selecting {
                            candidate,
                            step: SelectStep::Start,
                        };
                    }
                },
                SelectStep::Start => match engine.start(&self.option, &mut self.state, tick) {
                    TaskState::Pending => return,
                    TaskState::Done if !self.state.is_error() => {
                        log::info!(
                            "provider: selected {} ({})",
                            engine.name(),
                            engine.description()
                        );
                        self.active = Some(candidate);
                        self.on_started();
                        self.phase = Phase::Detecting;
                        return;
                    }
                    TaskState::Done | TaskState::Failed => {
                        log::error!(
                            "provider: {} start failed ({})",
                            engine.name(),
                            self.state.failure
                        );
                        engine.stop();
                        self.phase = next_candidate(candidate);
                    }
                },
            }
        }
    }

    fn step_restart(&mut self, tick: &Tick) {
        let Some(i) = self.active else {
            self.phase = Phase::Idle;
            return;
        };
        let engine = &mut self.engines[i];
        match engine.start(&self.option, &mut self.state, tick) {
            TaskState::Pending => {}
            TaskState::Done if !self.state.is_error() => {
                log::info!("provider: {} started", engine.name());
                self.on_started();
                self.phase = Phase::Detecting;
            }
            TaskState::Done | TaskState::Failed => {
                log::error!(
                    "provider: {} start failed ({})",
                    engine.name(),
                    self.state.failure
                );
                engine.stop();
                self.phase = Phase::Detecting;
            }
        }
    }

    fn step_update(&mut self, tick: &Tick) {
        let Some(i) = self.active else {
            return;
        };
        if matches!(
            self.state.status,
            DetectionStatus::NotStarted | DetectionStatus::Error
        ) {
            return;
        }

        self.state.updated_this_frame = false;
        self.engines[i].update(&mut self.state, tick);

        if self.state.is_error() {
            log::error!(
                "provider: {} stopped ({}) after {} frames",
                self.engines[i].name(),
                self.state.failure,
                self.frames
            );
            self.state.left = None;
            self.state.right = None;
            if self.auto_restart && self.frames > self.restart_min_frames {
                log::info!("provider: restarting {}", self.engines[i].name());
                self.engines[i].stop();
                self.state.clear();
                self.frames = 0;
                self.begin_start();
            }
            return;
        }

        if self.state.updated_this_frame {
            if self.state.status == DetectionStatus::Starting {
                self.state.status = DetectionStatus::Running;
            }
            self.frames += 1;
        }
    }

    /// Start the committed engine again without setup.
    fn begin_start(&mut self) {
        if self.state.status.is_active() {
            log::debug!("provider: detection already {}", self.state.status.label());
            return;
        }
        self.frames = 0;
        self.phase = Phase::Restarting;
    }

    fn on_started(&mut self) {
        self.state.failure = FailureReason::None;
        self.option.mode = self.state.mode;
        self.frames = 0;
    }
}

fn next_candidate(candidate: usize) -> Phase {
    Phase::Selecting {
        candidate: candidate + 1,
        step: SelectStep::Probe,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    use super::*;
    use crate::engine::{CallLog, MockEngine, MockFrame};
    use crate::hand::GestureType;

    fn calls() -> CallLog {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn taken(log: &CallLog) -> Vec<String> {
        std::mem::take(&mut *log.lock().unwrap())
    }

    fn config(restart_min_frames: u64) -> ProviderConfig {
        ProviderConfig {
            restart_min_frames,
            ..ProviderConfig::default()
        }
    }

    fn provider(engines: Vec<MockEngine>, config: &ProviderConfig) -> GestureProvider {
        let boxed = engines
            .into_iter()
            .map(|e| Box::new(e) as Box<dyn HandEngine>)
            .collect();
        GestureProvider::new(boxed, config)
    }

    fn tick(p: &mut GestureProvider) {
        p.tick(&Tick::at(Instant::now()));
    }

    fn ticks(p: &mut GestureProvider, n: usize) {
        for _ in 0..n {
            tick(p);
        }
    }

    fn count(log: &[String], call: &str) -> usize {
        log.iter().filter(|c| *c == call).count()
    }

    // --- selection ---

    #[test]
    fn nothing_happens_before_start() {
        let log = calls();
        let mut p = provider(vec![MockEngine::new("a", &log)], &config(100));
        ticks(&mut p, 3);
        assert!(taken(&log).is_empty());
        assert_eq!(p.status(), DetectionStatus::NotStarted);
    }

    #[test]
    fn selects_first_viable_candidate_in_order() {
        let log = calls();
        let mut p = provider(
            vec![
                MockEngine::new("a", &log).unsupported(),
                MockEngine::new("b", &log).failing_setup(),
                MockEngine::new("c", &log),
                MockEngine::new("d", &log),
            ],
            &config(100),
        );

        p.start();
        tick(&mut p);

        assert_eq!(
            taken(&log),
            vec![
                "a.is_supported",
                "b.is_supported",
                "b.setup",
                "c.is_supported",
                "c.setup",
                "c.start",
            ]
        );
        assert_eq!(p.engine_name(), Some("c"));
        assert_eq!(p.status(), DetectionStatus::Starting);
    }

    #[test]
    fn start_failure_stops_candidate_and_moves_on() {
        let log = calls();
        let mut p = provider(
            vec![
                MockEngine::new("a", &log).failing_start(),
                MockEngine::new("b", &log),
            ],
            &config(100),
        );

        p.start();
        tick(&mut p);

        let log = taken(&log);
        assert_eq!(&log[..4], ["a.is_supported", "a.setup", "a.start", "a.stop"]);
        assert_eq!(p.engine_name(), Some("b"));
        assert_eq!(p.failure(), FailureReason::None);
    }

    #[test]
    fn no_viable_engine_is_permanent() {
        let log = calls();
        let mut p = provider(
            vec![
                MockEngine::new("a", &log).unsupported(),
                MockEngine::new("b", &log).failing_start(),
            ],
            &config(100),
        );

        p.start();
        ticks(&mut p, 5);
        p.start();
        ticks(&mut p, 5);

        assert!(p.is_exhausted());
        assert_eq!(p.engine_name(), None);
        assert_ne!(p.status(), DetectionStatus::Running);
        let log = taken(&log);
        assert_eq!(count(&log, "b.start"), 1);
        assert!(!log.iter().any(|c| c.ends_with(".update")));
    }

    #[test]
    fn pending_setup_spans_ticks() {
        let log = calls();
        let mut p = provider(vec![MockEngine::new("a", &log).setup_ticks(2)], &config(100));

        p.start();
        tick(&mut p);
        tick(&mut p);
        assert_eq!(p.engine_name(), None);

        tick(&mut p);
        assert_eq!(p.engine_name(), Some("a"));
        let log = taken(&log);
        assert_eq!(count(&log, "a.setup"), 3);
        assert_eq!(count(&log, "a.is_supported"), 1);
    }

    #[test]
    fn negotiated_mode_is_kept_for_restarts() {
        let log = calls();
        let mut p = provider(
            vec![MockEngine::new("a", &log).negotiates(DetectionMode::Point3D)],
            &config(100),
        );

        p.start();
        tick(&mut p);

        assert_eq!(p.mode(), DetectionMode::Point3D);
        assert_eq!(p.option().mode, DetectionMode::Point3D);
        assert!(!p.have_skeleton());
    }

    // --- update ---

    #[test]
    fn first_frame_promotes_to_running() {
        let log = calls();
        let mut p = provider(
            vec![MockEngine::new("a", &log).frames([
                MockFrame::left(0, GestureType::Fist),
                MockFrame::left(0, GestureType::Point),
                MockFrame::left(1, GestureType::Point),
            ])],
            &config(100),
        );

        p.start();
        tick(&mut p); // commit, no update yet
        assert_eq!(p.status(), DetectionStatus::Starting);

        tick(&mut p);
        assert_eq!(p.status(), DetectionStatus::Running);
        assert!(p.updated_this_frame());
        assert_eq!(p.frames(), 1);

        tick(&mut p); // duplicate index
        assert!(!p.updated_this_frame());
        assert_eq!(p.frames(), 1);
        assert_eq!(p.left_hand().map(|h| h.gesture), Some(GestureType::Fist));

        tick(&mut p);
        assert_eq!(p.frames(), 2);
        assert_eq!(p.left_hand().map(|h| h.gesture), Some(GestureType::Point));
    }

    #[test]
    fn frames_replace_hands_wholesale() {
        let log = calls();
        let mut p = provider(
            vec![MockEngine::new("a", &log).frames([
                MockFrame::both(0, GestureType::Fist, GestureType::Five),
                MockFrame::left(1, GestureType::Point),
            ])],
            &config(100),
        );

        p.start();
        ticks(&mut p, 2);
        assert!(p.right_hand().is_some());

        tick(&mut p);
        assert!(p.right_hand().is_none());
        assert_eq!(p.left_hand().map(|h| h.gesture), Some(GestureType::Point));
    }

    #[test]
    fn frame_without_news_keeps_starting() {
        let log = calls();
        let mut p = provider(vec![MockEngine::new("a", &log)], &config(100));

        p.start();
        ticks(&mut p, 4);

        assert_eq!(p.status(), DetectionStatus::Starting);
        assert_eq!(count(&taken(&log), "a.update"), 3);
    }

    // --- auto restart ---

    fn good_frames(n: i64) -> Vec<MockFrame> {
        (0..n).map(|i| MockFrame::left(i, GestureType::Five)).collect()
    }

    #[test]
    fn failure_under_threshold_does_not_restart() {
        let log = calls();
        let mut frames = good_frames(3);
        frames.push(MockFrame::Fail);
        let mut p = provider(vec![MockEngine::new("a", &log).frames(frames)], &config(3));

        p.start();
        ticks(&mut p, 5);

        assert_eq!(p.status(), DetectionStatus::Error);
        assert_eq!(p.failure(), FailureReason::Internal);
        assert!(p.left_hand().is_none());

        ticks(&mut p, 3);
        let log = taken(&log);
        assert_eq!(count(&log, "a.stop"), 0);
        assert_eq!(count(&log, "a.start"), 1);
        assert_eq!(count(&log, "a.update"), 4, "no updates once in error");
    }

    #[test]
    fn failure_over_threshold_restarts_without_setup() {
        let log = calls();
        let mut frames = good_frames(3);
        frames.push(MockFrame::Fail);
        frames.extend(good_frames(1));
        let mut p = provider(vec![MockEngine::new("a", &log).frames(frames)], &config(2));

        p.start();
        ticks(&mut p, 5); // commit + 3 frames + failure
        assert_eq!(p.status(), DetectionStatus::NotStarted);
        assert_eq!(p.frames(), 0);

        tick(&mut p); // restart
        assert_eq!(p.status(), DetectionStatus::Starting);

        tick(&mut p);
        assert_eq!(p.status(), DetectionStatus::Running);
        assert_eq!(p.frames(), 1);

        let log = taken(&log);
        assert_eq!(count(&log, "a.setup"), 1);
        assert_eq!(count(&log, "a.stop"), 1);
        assert_eq!(count(&log, "a.start"), 2);
    }

    #[test]
    fn auto_restart_can_be_disabled() {
        let log = calls();
        let mut frames = good_frames(5);
        frames.push(MockFrame::Fail);
        let mut p = provider(
            vec![MockEngine::new("a", &log).frames(frames)],
            &ProviderConfig {
                auto_restart: false,
                ..config(0)
            },
        );

        p.start();
        ticks(&mut p, 10);

        assert_eq!(p.status(), DetectionStatus::Error);
        assert_eq!(count(&taken(&log), "a.start"), 1);
    }

    #[test]
    fn failed_restart_stays_in_error() {
        let log = calls();
        let mut frames = good_frames(2);
        frames.push(MockFrame::Fail);
        let mut p = provider(
            vec![MockEngine::new("a", &log)
                .frames(frames)
                .start_results([true, false])],
            &config(1),
        );

        p.start();
        ticks(&mut p, 6);

        assert_eq!(p.status(), DetectionStatus::Error);
        assert_eq!(p.failure(), FailureReason::Camera);
        assert_eq!(p.engine_name(), Some("a"));
        let log = taken(&log);
        assert_eq!(count(&log, "a.start"), 2);
        // once before the restart, once after its failed start
        assert_eq!(count(&log, "a.stop"), 2);
        assert_eq!(log.last().map(String::as_str), Some("a.stop"));
    }

    // --- lifecycle hooks ---

    #[test]
    fn pause_stops_and_resume_restarts_committed_engine() {
        let log = calls();
        let mut p = provider(
            vec![MockEngine::new("a", &log).frames(good_frames(2))],
            &config(100),
        );
        p.start();
        ticks(&mut p, 2);
        assert_eq!(p.status(), DetectionStatus::Running);
        taken(&log);

        p.pause(true);
        assert_eq!(p.status(), DetectionStatus::NotStarted);
        assert!(p.left_hand().is_none());
        assert_eq!(p.frames(), 0);
        ticks(&mut p, 3);
        assert_eq!(taken(&log), vec!["a.stop"]);

        p.pause(false);
        tick(&mut p);
        assert_eq!(p.status(), DetectionStatus::Starting);
        assert_eq!(taken(&log), vec!["a.start"]);
    }

    #[test]
    fn pause_during_setup_abandons_selection() {
        let log = calls();
        let mut p = provider(vec![MockEngine::new("a", &log).setup_ticks(5)], &config(100));

        p.start();
        tick(&mut p);
        p.pause(true);
        ticks(&mut p, 3);
        assert_eq!(taken(&log), vec!["a.is_supported", "a.setup", "a.stop"]);
        assert_eq!(p.engine_name(), None);

        p.pause(false);
        tick(&mut p);
        assert_eq!(taken(&log), vec!["a.is_supported", "a.setup"]);
    }

    #[test]
    fn enable_while_running_is_noop() {
        let log = calls();
        let mut p = provider(vec![MockEngine::new("a", &log)], &config(100));
        p.start();
        tick(&mut p);
        taken(&log);

        p.enable();
        tick(&mut p);

        assert_eq!(taken(&log), vec!["a.update"]);
    }

    #[test]
    fn disable_then_enable_restarts() {
        let log = calls();
        let mut p = provider(vec![MockEngine::new("a", &log)], &config(100));
        p.start();
        tick(&mut p);
        taken(&log);

        p.disable();
        p.enable();
        tick(&mut p);

        assert_eq!(taken(&log), vec!["a.stop", "a.start"]);
        assert_eq!(p.status(), DetectionStatus::Starting);
    }

    #[test]
    fn shutdown_stops_and_ignores_later_hooks() {
        let log = calls();
        let mut p = provider(vec![MockEngine::new("a", &log)], &config(100));
        p.start();
        tick(&mut p);
        taken(&log);

        p.shutdown();
        p.enable();
        p.pause(false);
        ticks(&mut p, 3);
        p.shutdown();

        assert_eq!(taken(&log), vec!["a.stop"]);
        assert_eq!(p.status(), DetectionStatus::NotStarted);
    }
}
