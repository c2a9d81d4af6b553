//! Synthetic gesture source.
//!
//! [`SimulatedGestureApi`] stands in for a vendor SDK when no hardware is
//! attached.  It cycles through a configured list of gestures and delivers a
//! new frame only every `detection_every_ticks` polls, so the polls in
//! between return the previous index again, exactly like a detector that
//! runs slower than the render loop.  Until the first delivery after a start
//! there is no frame at all.

use crate::config::SimulationConfig;
use crate::engine::camera::{GestureApi, RawFrame, RawHand};
use crate::engine::error::TrackingError;
use crate::hand::{
    transform_joint, DetectionMode, GestureOption, GestureType, Pose, Vec3, FINGER_BASES,
    JOINT_COUNT, WRIST,
};

/// Wrist offset of each hand from the viewer, in metres.
const HAND_OFFSET: [f32; 3] = [0.15, -0.2, 0.35];
/// Spacing between finger columns.
const FINGER_SPACING: f32 = 0.02;
/// Length of one finger segment.
const SEGMENT: f32 = 0.025;

/// A deterministic [`GestureApi`] driven by [`SimulationConfig`].
#[derive(Debug)]
pub struct SimulatedGestureApi {
    config: SimulationConfig,
    running: bool,
    external_transform: bool,
    viewer: Pose,
    busy_remaining: u32,
    polls: u64,
    delivered: u64,
}

impl SimulatedGestureApi {
    pub fn new(config: SimulationConfig) -> Self {
        let busy_remaining = config.busy_start_attempts;
        Self {
            config,
            running: false,
            external_transform: false,
            viewer: Pose::identity(),
            busy_remaining,
            polls: 0,
            delivered: 0,
        }
    }

    /// Frames delivered since the last start.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    fn gesture_for(&self, index: u64) -> GestureType {
        let gestures = &self.config.gestures;
        if gestures.is_empty() {
            return GestureType::Unknown;
        }
        let per = u64::from(self.config.frames_per_gesture.max(1));
        gestures[((index / per) % gestures.len() as u64) as usize]
    }

    fn make_hand(&self, is_left: bool, gesture: GestureType) -> RawHand {
        let side = if is_left { -1.0 } else { 1.0 };
        let [x, y, z] = HAND_OFFSET;
        let wrist = Vec3::new(x * side, y, z);

        let mut points = [Vec3::zeros(); JOINT_COUNT];
        points[WRIST] = wrist;
        for (finger, &base) in FINGER_BASES.iter().enumerate() {
            let column = wrist + Vec3::new(side * finger as f32 * FINGER_SPACING, 0.0, 0.0);
            for joint in 0..4 {
                points[base + joint] = column + Vec3::new(0.0, SEGMENT * (joint + 1) as f32, 0.0);
            }
        }

        let pinching = gesture == GestureType::Ok;
        if pinching {
            // bring the index tip onto the thumb tip
            points[FINGER_BASES[1] + 3] = points[FINGER_BASES[0] + 3];
        }

        if self.external_transform {
            for p in points.iter_mut() {
                *p = transform_joint(&self.viewer, *p);
            }
        }

        RawHand {
            is_left,
            gesture,
            confidence: 0.9,
            points,
            pinch_level: if pinching { 1.0 } else { 0.0 },
        }
    }
}

impl GestureApi for SimulatedGestureApi {
    fn start_detection(&mut self, option: &GestureOption) -> Result<DetectionMode, TrackingError> {
        if self.busy_remaining > 0 {
            self.busy_remaining -= 1;
            return Err(TrackingError::DeviceBusy);
        }
        self.running = true;
        self.polls = 0;
        self.delivered = 0;
        log::debug!("simulated: detection started in {:?}", option.mode);
        Ok(option.mode)
    }

    fn stop_detection(&mut self) {
        self.running = false;
    }

    fn use_external_transform(&mut self, enabled: bool) {
        self.external_transform = enabled;
    }

    fn set_camera_transform(&mut self, viewer: &Pose) {
        self.viewer = *viewer;
    }

    fn poll_result(&mut self) -> Option<RawFrame> {
        if !self.running {
            return Some(RawFrame { index: -1, hands: Vec::new() });
        }
        if self
            .config
            .fail_after_frames
            .is_some_and(|limit| self.delivered >= limit)
        {
            self.running = false;
            return Some(RawFrame { index: -1, hands: Vec::new() });
        }

        let every = u64::from(self.config.detection_every_ticks.max(1));
        self.polls += 1;
        if self.polls % every == 0 {
            self.delivered += 1;
        }

        let latest = self.delivered.checked_sub(1)?;
        let gesture = self.gesture_for(latest);
        Some(RawFrame {
            index: latest as i64,
            hands: vec![self.make_hand(true, gesture), self.make_hand(false, gesture)],
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::config::{CameraConfig, ProviderConfig};
    use crate::engine::{CameraEngine, HandEngine, Tick};
    use crate::hand::{distance, pose, DetectionStatus, PinchInfo, Quat, INDEX_TIP, THUMB_TIP};
    use crate::provider::GestureProvider;

    fn config() -> SimulationConfig {
        SimulationConfig {
            detection_every_ticks: 2,
            frames_per_gesture: 3,
            gestures: vec![GestureType::Point, GestureType::Ok],
            fail_after_frames: None,
            busy_start_attempts: 0,
        }
    }

    fn started(config: SimulationConfig) -> SimulatedGestureApi {
        let mut api = SimulatedGestureApi::new(config);
        api.start_detection(&GestureOption::default()).expect("start");
        api
    }

    fn poll(api: &mut SimulatedGestureApi) -> RawFrame {
        api.poll_result().expect("frame delivered")
    }

    // --- frames ---

    #[test]
    fn not_running_reports_negative_index() {
        let mut api = SimulatedGestureApi::new(config());
        assert_eq!(api.poll_result().map(|f| f.index), Some(-1));
    }

    #[test]
    fn new_frame_every_n_polls() {
        let mut api = started(config());
        let indices: Vec<Option<i64>> = (0..6).map(|_| api.poll_result().map(|f| f.index)).collect();
        assert_eq!(indices, vec![None, Some(0), Some(0), Some(1), Some(1), Some(2)]);
    }

    #[test]
    fn gestures_cycle_per_block_of_frames() {
        let mut api = started(SimulationConfig {
            detection_every_ticks: 1,
            ..config()
        });
        let gestures: Vec<GestureType> = (0..7).map(|_| poll(&mut api).hands[0].gesture).collect();
        assert_eq!(
            gestures,
            vec![
                GestureType::Point,
                GestureType::Point,
                GestureType::Point,
                GestureType::Ok,
                GestureType::Ok,
                GestureType::Ok,
                GestureType::Point,
            ]
        );
    }

    #[test]
    fn ok_gesture_is_pinching() {
        let mut api = started(SimulationConfig {
            detection_every_ticks: 1,
            frames_per_gesture: 1,
            gestures: vec![GestureType::Ok],
            ..config()
        });
        let frame = poll(&mut api);
        let hand = &frame.hands[0];
        assert_eq!(hand.pinch_level, 1.0);
        assert!(PinchInfo::from_distance(distance(hand.points[THUMB_TIP], hand.points[INDEX_TIP]))
            .is_pinching);
    }

    #[test]
    fn both_hands_are_reported() {
        let mut api = started(SimulationConfig {
            detection_every_ticks: 1,
            ..config()
        });
        let frame = poll(&mut api);
        assert_eq!(frame.hands.len(), 2);
        assert!(frame.hands[0].is_left);
        assert!(!frame.hands[1].is_left);
        assert!(frame.hands[0].points[WRIST].x < 0.0);
        assert!(frame.hands[1].points[WRIST].x > 0.0);
    }

    #[test]
    fn external_transform_follows_viewer() {
        let mut api = started(SimulationConfig {
            detection_every_ticks: 1,
            ..config()
        });
        api.use_external_transform(true);
        api.set_camera_transform(&pose(Vec3::new(0.0, 1.5, 0.0), Quat::identity()));

        let frame = poll(&mut api);
        let wrist = frame.hands[0].points[WRIST];
        assert!((wrist.y - (1.5 + HAND_OFFSET[1])).abs() < 1e-5);
    }

    // --- failures ---

    #[test]
    fn busy_start_attempts_fail_then_succeed() {
        let mut api = SimulatedGestureApi::new(SimulationConfig {
            busy_start_attempts: 2,
            ..config()
        });
        let option = GestureOption::default();
        assert_eq!(api.start_detection(&option), Err(TrackingError::DeviceBusy));
        assert_eq!(api.start_detection(&option), Err(TrackingError::DeviceBusy));
        assert_eq!(api.start_detection(&option), Ok(DetectionMode::Skeleton));
    }

    #[test]
    fn fails_after_configured_frames() {
        let mut api = started(SimulationConfig {
            detection_every_ticks: 1,
            fail_after_frames: Some(2),
            ..config()
        });
        assert_eq!(poll(&mut api).index, 0);
        assert_eq!(poll(&mut api).index, 1);
        assert_eq!(poll(&mut api).index, -1);
        assert_eq!(poll(&mut api).index, -1);
    }

    #[test]
    fn restart_resets_sequence() {
        let mut api = started(SimulationConfig {
            detection_every_ticks: 1,
            ..config()
        });
        api.poll_result();
        api.poll_result();
        api.stop_detection();
        api.start_detection(&GestureOption::default()).expect("restart");
        assert_eq!(poll(&mut api).index, 0);
        assert_eq!(api.delivered(), 1);
    }

    // --- through the provider ---

    #[test]
    fn provider_stays_starting_until_first_delivery() {
        let api = SimulatedGestureApi::new(SimulationConfig {
            detection_every_ticks: 3,
            ..config()
        });
        let engine = CameraEngine::from_config(Box::new(api), &CameraConfig::default());
        let engines: Vec<Box<dyn HandEngine>> = vec![Box::new(engine)];
        let mut provider = GestureProvider::new(engines, &ProviderConfig::default());
        let tick = Tick::at(Instant::now());

        provider.start();
        provider.tick(&tick); // commit
        assert_eq!(provider.status(), DetectionStatus::Starting);

        for _ in 0..2 {
            provider.tick(&tick);
            assert_eq!(provider.status(), DetectionStatus::Starting);
            assert_eq!(provider.frames(), 0);
            assert!(!provider.updated_this_frame());
        }

        provider.tick(&tick);
        assert_eq!(provider.status(), DetectionStatus::Running);
        assert_eq!(provider.frames(), 1);
        assert!(provider.left_hand().is_some());
    }
}
