//! Debounce state machine.
//!
//! ```text
//!            prepare matches (min+1 ticks)        trigger matches (min+1 ticks)
//!   Idle(0) ───────────────────────────▶ Prepare(1) ───────────────────────────▶ Trigger(2)
//!     ▲                                     │                                    │
//!     └──── reset, or misses > max_missing ─┴────────────────────────────────────┘
//! ```
//!
//! One [`HandStateChecker`] reads the shared [`DetectionState`] once per tick,
//! after the provider has updated it.  Both conditions count down from their
//! `min_match_frames`; a matching tick with the counter already at zero
//! commits the transition.  Once committed, up to `max_missing_frames`
//! non-matching ticks are tolerated before falling back to `Idle`.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::checker::flags::HandFlags;
use crate::config::{HandStateConfig, StateCondition};
use crate::provider::DetectionState;

/// Capacity of the notification channel.  Slow receivers lag rather than
/// block the tick.
const EVENT_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// HandState
// ---------------------------------------------------------------------------

/// Debounced application-level hand state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[repr(u8)]
pub enum HandState {
    #[default]
    Idle = 0,
    Prepare = 1,
    Trigger = 2,
}

impl HandState {
    pub fn level(self) -> u8 {
        self as u8
    }
}

/// Notification sent on every state change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandStateEvent {
    pub checker: String,
    pub state: HandState,
    pub level: u8,
}

// ---------------------------------------------------------------------------
// HandStateChecker
// ---------------------------------------------------------------------------

pub struct HandStateChecker {
    config: HandStateConfig,
    state: HandState,
    missing: u32,
    prepare_counter: u32,
    trigger_counter: u32,
    events: broadcast::Sender<HandStateEvent>,
}

impl std::fmt::Debug for HandStateChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandStateChecker")
            .field("name", &self.config.name)
            .field("state", &self.state)
            .field("missing", &self.missing)
            .field("prepare_counter", &self.prepare_counter)
            .field("trigger_counter", &self.trigger_counter)
            .finish()
    }
}

impl HandStateChecker {
    pub fn new(config: HandStateConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            prepare_counter: config.prepare.min_match_frames,
            trigger_counter: config.trigger.min_match_frames,
            state: HandState::Idle,
            missing: 0,
            config,
            events,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn state(&self) -> HandState {
        self.state
    }

    /// Receive a [`HandStateEvent`] for every state change from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<HandStateEvent> {
        self.events.subscribe()
    }

    /// Advance by one tick.  Returns the new state if it changed.
    pub fn update(&mut self, detection: &DetectionState) -> Option<HandState> {
        let left = HandFlags::for_hand(detection.left.as_ref());
        let right = HandFlags::for_hand(detection.right.as_ref());

        let reset = &self.config.reset;
        if (reset.left_missing && detection.left.is_none())
            || (reset.right_missing && detection.right.is_none())
        {
            self.missing = 0;
            self.prepare_counter = self.config.prepare.min_match_frames;
            return self.set_state(HandState::Idle);
        }

        if matches(&self.config.prepare, left, right) {
            if self.prepare_counter > 0 {
                self.prepare_counter -= 1;
                return None;
            }
            self.missing = self.config.prepare.max_missing_frames;
            self.prepare_counter = 0;
            self.trigger_counter = self.config.trigger.min_match_frames;
            return self.set_state(HandState::Prepare);
        }

        if (self.state != HandState::Idle || self.config.can_skip_prepare)
            && matches(&self.config.trigger, left, right)
        {
            if self.trigger_counter > 0 {
                self.trigger_counter -= 1;
                return None;
            }
            self.missing = self.config.trigger.max_missing_frames;
            self.trigger_counter = 0;
            self.prepare_counter = self.config.prepare.min_match_frames;
            return self.set_state(HandState::Trigger);
        }

        if self.missing > 0 {
            self.missing -= 1;
            log::trace!("checker: {} tolerating miss ({} left)", self.config.name, self.missing);
            return None;
        }

        self.prepare_counter = self.config.prepare.min_match_frames;
        self.set_state(HandState::Idle)
    }

    fn set_state(&mut self, state: HandState) -> Option<HandState> {
        if self.state == state {
            return None;
        }
        log::debug!("checker: {} {:?} -> {:?}", self.config.name, self.state, state);
        self.state = state;
        // No receivers is not an error.
        let _ = self.events.send(HandStateEvent {
            checker: self.config.name.clone(),
            state,
            level: state.level(),
        });
        Some(state)
    }
}

fn matches(condition: &StateCondition, left: HandFlags, right: HandFlags) -> bool {
    condition.left.intersects(left) && condition.right.intersects(right)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
