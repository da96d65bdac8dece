// THEORY:
// The `classifier` module is the heart of the per-frame analysis layer. A
// `SlotClassifier` is a stateful entity owning one hand slot's short-term
// memory: a bounded rolling history of `{center, size, pose}` samples and a
// pinch hysteresis flag. Given one frame's pose it emits at most one gesture
// label with a confidence.
//
// Key architectural principles:
// 1.  **Ordered, First-Match-Wins Evaluation**: The five gesture checks are an
//     explicit priority list, evaluated in order, returning on the first hit.
//     Temporal checks (swipe, push) run before static checks because they
//     consume and clear the history; letting a static gesture shadow them
//     would leave stale motion in the window and re-trigger later.
// 2.  **History Clearing as Debounce**: An accepted swipe or push clears the
//     slot's history so a single physical sweep cannot fire twice as the
//     window keeps sliding over it.
// 3.  **Hysteresis over Thresholding**: Pinch uses an asymmetric enter/exit
//     band. A thumb-index distance oscillating inside the band never flips
//     the held state, so the boundary cannot chatter.
// 4.  **Mutual Exclusivity**: Exactly zero or one label per (frame, slot) —
//     a structural consequence of the first-match-wins list.

use crate::config::GestureConfig;
use crate::core_modules::hand::{HandPose, landmark};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::fmt;
use tracing::debug;

const SWIPE_CONFIDENCE: f64 = 0.80;
const PUSH_CONFIDENCE: f64 = 0.85;
const FIST_CONFIDENCE: f64 = 0.85;
const PINCH_CONFIDENCE: f64 = 0.90;
/// Distance at which fist tightness bottoms out; tightness is 1 - mean/scale.
const FIST_TIGHTNESS_SCALE: f64 = 0.15;

const FINGER_TIPS: [usize; 4] = [
    landmark::INDEX_FINGER_TIP,
    landmark::MIDDLE_FINGER_TIP,
    landmark::RING_FINGER_TIP,
    landmark::PINKY_TIP,
];
const FINGER_PIPS: [usize; 4] = [
    landmark::INDEX_FINGER_PIP,
    landmark::MIDDLE_FINGER_PIP,
    landmark::RING_FINGER_PIP,
    landmark::PINKY_PIP,
];
const ALL_TIPS: [usize; 5] = [
    landmark::THUMB_TIP,
    landmark::INDEX_FINGER_TIP,
    landmark::MIDDLE_FINGER_TIP,
    landmark::RING_FINGER_TIP,
    landmark::PINKY_TIP,
];

/// The fixed vocabulary of gestures this engine can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GestureLabel {
    OpenPalm,
    ClosedFist,
    PinchStart,
    PinchHold,
    PinchEnd,
    SwipeLeft,
    SwipeRight,
    PushForward,
}

impl fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GestureLabel::OpenPalm => "OPEN_PALM",
            GestureLabel::ClosedFist => "CLOSED_FIST",
            GestureLabel::PinchStart => "PINCH_START",
            GestureLabel::PinchHold => "PINCH_HOLD",
            GestureLabel::PinchEnd => "PINCH_END",
            GestureLabel::SwipeLeft => "SWIPE_LEFT",
            GestureLabel::SwipeRight => "SWIPE_RIGHT",
            GestureLabel::PushForward => "PUSH_FORWARD",
        };
        f.write_str(name)
    }
}

/// One frame's classification for one slot: the raw, un-debounced signal the
/// state machine consumes.
#[derive(Debug, Clone)]
pub struct Detection {
    pub label: GestureLabel,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// Slot this detection belongs to.
    pub hand_id: usize,
    /// Geometric hand center, normalized (x, y).
    pub hand_center: (f64, f64),
    /// Bounding-box area of the hand.
    pub hand_size: f64,
    /// Label-specific diagnostics (swipe direction, pinch distance, ...).
    pub metadata: Map<String, Value>,
}

/// One entry of a slot's rolling history.
#[derive(Debug, Clone)]
struct HistorySample {
    center: (f64, f64),
    size: f64,
    pose: HandPose,
}

/// Intermediate output of a single gesture check, before it is packaged with
/// the slot/center/size context into a `Detection`.
struct Candidate {
    label: GestureLabel,
    confidence: f64,
    metadata: Map<String, Value>,
}

type GestureCheck = fn(&mut SlotClassifier, &HandPose) -> Option<Candidate>;

/// Stateful per-slot frame classifier.
pub struct SlotClassifier {
    slot_id: usize,
    config: GestureConfig,
    history: VecDeque<HistorySample>,
    pinch_held: bool,
}

impl SlotClassifier {
    /// The five gesture checks in priority order. First match wins.
    const CHECKS: [GestureCheck; 5] = [
        Self::check_swipe,
        Self::check_push_forward,
        Self::check_open_palm,
        Self::check_closed_fist,
        Self::check_pinch,
    ];

    pub fn new(slot_id: usize, config: GestureConfig) -> Self {
        let capacity = config.history_capacity();
        Self {
            slot_id,
            config,
            history: VecDeque::with_capacity(capacity),
            pinch_held: false,
        }
    }

    /// Classifies one frame's pose for this slot. Appends the new sample to
    /// the rolling history first so the current frame participates in the
    /// temporal windows, then runs the ordered checks.
    pub fn classify(&mut self, pose: &HandPose) -> Option<Detection> {
        let center = pose.center();
        let size = pose.size();
        self.push_history(HistorySample {
            center,
            size,
            pose: pose.clone(),
        });

        for check in Self::CHECKS {
            if let Some(candidate) = check(self, pose) {
                debug!(
                    slot = self.slot_id,
                    label = %candidate.label,
                    confidence = candidate.confidence,
                    "frame classified"
                );
                return Some(Detection {
                    label: candidate.label,
                    confidence: candidate.confidence,
                    hand_id: self.slot_id,
                    hand_center: center,
                    hand_size: size,
                    metadata: candidate.metadata,
                });
            }
        }
        None
    }

    /// Drops all short-term memory for this slot. Called when a frame carries
    /// no hand for the slot; a re-appearing hand starts from a clean window.
    pub fn reset(&mut self) {
        self.history.clear();
        self.pinch_held = false;
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    fn push_history(&mut self, sample: HistorySample) {
        self.history.push_back(sample);
        if self.history.len() > self.config.history_capacity() {
            self.history.pop_front();
        }
    }

    /// Lateral sweep across the swipe window. Mostly-vertical motion is
    /// rejected; an accepted swipe clears the history.
    fn check_swipe(&mut self, _pose: &HandPose) -> Option<Candidate> {
        let window = self.config.swipe_window_size;
        if self.history.len() < window {
            return None;
        }
        let start = &self.history[self.history.len() - window];
        let end = self.history.back()?;
        let dx = end.center.0 - start.center.0;
        let dy = end.center.1 - start.center.1;

        if dy.abs() > dx.abs() * self.config.swipe_dy_ratio {
            return None;
        }
        if dx.abs() <= self.config.swipe_dx_threshold {
            return None;
        }

        let (label, direction) = if dx < 0.0 {
            (GestureLabel::SwipeLeft, "left")
        } else {
            (GestureLabel::SwipeRight, "right")
        };
        self.history.clear();

        let mut metadata = Map::new();
        metadata.insert("swipe_direction".into(), Value::from(direction));
        Some(Candidate {
            label,
            confidence: SWIPE_CONFIDENCE,
            metadata,
        })
    }

    /// Hand moving toward the camera: either the bounding box grew enough or
    /// the mean depth decreased enough across the push window.
    fn check_push_forward(&mut self, _pose: &HandPose) -> Option<Candidate> {
        let window = self.config.push_window_size;
        if self.history.len() < window {
            return None;
        }
        let start = &self.history[self.history.len() - window];
        let end = self.history.back()?;

        // Size growth is only meaningful with a nonzero starting size.
        let magnitude = if start.size > 0.0 {
            (end.size - start.size) / start.size
        } else {
            0.0
        };
        let grew = magnitude > self.config.push_size_increase_threshold;
        let approached =
            start.pose.mean_z() - end.pose.mean_z() > self.config.push_z_threshold;

        if !grew && !approached {
            return None;
        }
        self.history.clear();

        let mut metadata = Map::new();
        metadata.insert("push_magnitude".into(), Value::from(magnitude));
        Some(Candidate {
            label: GestureLabel::PushForward,
            confidence: PUSH_CONFIDENCE,
            metadata,
        })
    }

    /// All (or most) non-thumb fingers extended: each tip clearly above its
    /// PIP joint. Y grows downward in image space, so smaller y is higher.
    fn check_open_palm(&mut self, pose: &HandPose) -> Option<Candidate> {
        let extended = Self::count_extended_fingers(pose, self.config.open_palm_finger_threshold);
        if extended < self.config.open_palm_min_fingers {
            return None;
        }
        let mut metadata = Map::new();
        metadata.insert("fingers_extended".into(), Value::from(extended as u64));
        Some(Candidate {
            label: GestureLabel::OpenPalm,
            confidence: extended as f64 / FINGER_TIPS.len() as f64,
            metadata,
        })
    }

    /// Fingertips (thumb included) gathered around the palm center.
    fn check_closed_fist(&mut self, pose: &HandPose) -> Option<Candidate> {
        let palm = pose.palm_center();
        let keypoints = pose.keypoints();
        let distances: Vec<f64> = ALL_TIPS
            .iter()
            .map(|&i| keypoints[i].distance_to(&palm))
            .collect();
        let curled = distances
            .iter()
            .filter(|&&d| d < self.config.closed_fist_distance_threshold)
            .count();
        if curled < self.config.closed_fist_min_fingers {
            return None;
        }

        let mean_distance = distances.iter().sum::<f64>() / distances.len() as f64;
        let tightness = 1.0 - mean_distance / FIST_TIGHTNESS_SCALE;
        let mut metadata = Map::new();
        metadata.insert("fist_tightness".into(), Value::from(tightness));
        Some(Candidate {
            label: GestureLabel::ClosedFist,
            confidence: FIST_CONFIDENCE,
            metadata,
        })
    }

    /// Thumb-to-index pinch with per-slot hysteresis. The threshold is
    /// asymmetric: a held pinch only releases past the wider exit threshold.
    fn check_pinch(&mut self, pose: &HandPose) -> Option<Candidate> {
        let keypoints = pose.keypoints();
        let distance =
            keypoints[landmark::THUMB_TIP].distance_to(&keypoints[landmark::INDEX_FINGER_TIP]);
        let threshold = if self.pinch_held {
            self.config.pinch_exit_threshold
        } else {
            self.config.pinch_enter_threshold
        };

        let label = if distance < threshold {
            if self.pinch_held {
                GestureLabel::PinchHold
            } else {
                self.pinch_held = true;
                GestureLabel::PinchStart
            }
        } else if self.pinch_held {
            self.pinch_held = false;
            GestureLabel::PinchEnd
        } else {
            return None;
        };

        let mut metadata = Map::new();
        metadata.insert("pinch_distance".into(), Value::from(distance));
        Some(Candidate {
            label,
            confidence: PINCH_CONFIDENCE,
            metadata,
        })
    }

    fn count_extended_fingers(pose: &HandPose, threshold: f64) -> usize {
        let keypoints = pose.keypoints();
        FINGER_TIPS
            .iter()
            .zip(FINGER_PIPS.iter())
            .filter(|&(&tip, &pip)| keypoints[tip].y < keypoints[pip].y - threshold)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::hand::{Handedness, KEYPOINT_COUNT, Keypoint};

    fn pose_from(points: [Keypoint; KEYPOINT_COUNT]) -> HandPose {
        HandPose::from_keypoints(&points, Handedness::Right, 1.0).unwrap()
    }

    /// A relaxed hand: fingers half-curled, nothing pinched, nothing
    /// extended. Classifies as no gesture while static.
    fn neutral_pose(x_shift: f64, z: f64) -> HandPose {
        let mut p = [Keypoint::default(); KEYPOINT_COUNT];
        p[landmark::WRIST] = Keypoint::new(0.50, 0.90, z);
        // Thumb, swung out to the side.
        p[landmark::THUMB_CMC] = Keypoint::new(0.42, 0.80, z);
        p[landmark::THUMB_MCP] = Keypoint::new(0.36, 0.74, z);
        p[landmark::THUMB_IP] = Keypoint::new(0.30, 0.68, z);
        p[landmark::THUMB_TIP] = Keypoint::new(0.25, 0.62, z);
        // Four fingers: MCP row, PIP row, DIP row, tips level with PIPs.
        let finger_x = [0.40, 0.47, 0.54, 0.60];
        for (f, &fx) in finger_x.iter().enumerate() {
            let base = 5 + f * 4;
            p[base] = Keypoint::new(fx, 0.60, z); // MCP
            p[base + 1] = Keypoint::new(fx, 0.50, z); // PIP
            p[base + 2] = Keypoint::new(fx, 0.48, z); // DIP
            p[base + 3] = Keypoint::new(fx, 0.50, z); // TIP
        }
        for point in p.iter_mut() {
            point.x += x_shift;
        }
        pose_from(p)
    }

    fn open_palm_pose() -> HandPose {
        let mut p = [Keypoint::default(); KEYPOINT_COUNT];
        p[landmark::WRIST] = Keypoint::new(0.50, 0.85, 0.0);
        p[landmark::THUMB_CMC] = Keypoint::new(0.42, 0.78, 0.0);
        p[landmark::THUMB_MCP] = Keypoint::new(0.37, 0.72, 0.0);
        p[landmark::THUMB_IP] = Keypoint::new(0.33, 0.66, 0.0);
        p[landmark::THUMB_TIP] = Keypoint::new(0.30, 0.60, 0.0);
        let finger_x = [0.40, 0.47, 0.54, 0.60];
        for (f, &fx) in finger_x.iter().enumerate() {
            let base = 5 + f * 4;
            p[base] = Keypoint::new(fx, 0.60, 0.0);
            p[base + 1] = Keypoint::new(fx, 0.48, 0.0);
            p[base + 2] = Keypoint::new(fx, 0.42, 0.0);
            p[base + 3] = Keypoint::new(fx, 0.38, 0.0); // tip well above PIP
        }
        pose_from(p)
    }

    fn fist_pose() -> HandPose {
        let mut p = [Keypoint::default(); KEYPOINT_COUNT];
        p[landmark::WRIST] = Keypoint::new(0.50, 0.70, 0.0);
        let finger_x = [0.44, 0.49, 0.55, 0.60];
        for (f, &fx) in finger_x.iter().enumerate() {
            let base = 5 + f * 4;
            p[base] = Keypoint::new(fx, 0.55, 0.0); // MCP
            p[base + 1] = Keypoint::new(fx, 0.56, 0.0); // PIP (tips not above)
            p[base + 2] = Keypoint::new(fx, 0.57, 0.0);
            p[base + 3] = Keypoint::new(0.52, 0.58, 0.0); // TIP near palm center
        }
        p[landmark::THUMB_CMC] = Keypoint::new(0.46, 0.66, 0.0);
        p[landmark::THUMB_MCP] = Keypoint::new(0.47, 0.62, 0.0);
        p[landmark::THUMB_IP] = Keypoint::new(0.49, 0.60, 0.0);
        p[landmark::THUMB_TIP] = Keypoint::new(0.51, 0.58, 0.0);
        pose_from(p)
    }

    /// Neutral pose with the thumb tip placed `distance` away from the index
    /// tip along x, to exercise the pinch transition table.
    fn pinch_pose(distance: f64) -> HandPose {
        let neutral = neutral_pose(0.0, 0.0);
        let mut p = *neutral.keypoints();
        let index_tip = p[landmark::INDEX_FINGER_TIP];
        p[landmark::THUMB_TIP] = Keypoint::new(index_tip.x + distance, index_tip.y, index_tip.z);
        pose_from(p)
    }

    #[test]
    fn neutral_pose_yields_no_label() {
        let mut classifier = SlotClassifier::new(0, GestureConfig::default());
        assert!(classifier.classify(&neutral_pose(0.0, 0.0)).is_none());
    }

    #[test]
    fn open_palm_with_all_fingers_extended() {
        let mut classifier = SlotClassifier::new(0, GestureConfig::default());
        let detection = classifier.classify(&open_palm_pose()).unwrap();
        assert_eq!(detection.label, GestureLabel::OpenPalm);
        assert!((detection.confidence - 1.0).abs() < 1e-9);
        assert_eq!(detection.metadata["fingers_extended"], Value::from(4u64));
    }

    #[test]
    fn closed_fist_detected_with_fixed_confidence() {
        let mut classifier = SlotClassifier::new(0, GestureConfig::default());
        let detection = classifier.classify(&fist_pose()).unwrap();
        assert_eq!(detection.label, GestureLabel::ClosedFist);
        assert!((detection.confidence - FIST_CONFIDENCE).abs() < 1e-9);
        assert!(detection.metadata.contains_key("fist_tightness"));
    }

    #[test]
    fn pinch_transition_table() {
        let mut classifier = SlotClassifier::new(0, GestureConfig::default());
        // Far apart, not held: nothing.
        assert!(classifier.classify(&pinch_pose(0.20)).is_none());
        // Below enter threshold: PINCH_START.
        let start = classifier.classify(&pinch_pose(0.03)).unwrap();
        assert_eq!(start.label, GestureLabel::PinchStart);
        // Still below exit threshold: PINCH_HOLD.
        let hold = classifier.classify(&pinch_pose(0.04)).unwrap();
        assert_eq!(hold.label, GestureLabel::PinchHold);
        // Past exit threshold: PINCH_END.
        let end = classifier.classify(&pinch_pose(0.12)).unwrap();
        assert_eq!(end.label, GestureLabel::PinchEnd);
    }

    #[test]
    fn pinch_band_oscillation_never_flips_state() {
        // Distances strictly inside (enter, exit) = (0.05, 0.07).
        let mut classifier = SlotClassifier::new(0, GestureConfig::default());

        // Not held: in-band distances never start a pinch.
        for _ in 0..5 {
            assert!(classifier.classify(&pinch_pose(0.06)).is_none());
            assert!(classifier.classify(&pinch_pose(0.065)).is_none());
        }

        // Held: in-band distances never end it.
        assert_eq!(
            classifier.classify(&pinch_pose(0.03)).unwrap().label,
            GestureLabel::PinchStart
        );
        for _ in 0..5 {
            assert_eq!(
                classifier.classify(&pinch_pose(0.06)).unwrap().label,
                GestureLabel::PinchHold
            );
            assert_eq!(
                classifier.classify(&pinch_pose(0.069)).unwrap().label,
                GestureLabel::PinchHold
            );
        }
    }

    #[test]
    fn swipe_right_fires_on_tenth_frame_and_clears_history() {
        let mut classifier = SlotClassifier::new(0, GestureConfig::default());
        // Center travels 0.2 -> 0.5 in x over 10 frames, y constant.
        for i in 0..9 {
            let shift = i as f64 * (0.3 / 9.0);
            assert!(classifier.classify(&neutral_pose(shift, 0.0)).is_none());
        }
        let detection = classifier.classify(&neutral_pose(0.3, 0.0)).unwrap();
        assert_eq!(detection.label, GestureLabel::SwipeRight);
        assert!((detection.confidence - SWIPE_CONFIDENCE).abs() < 1e-9);
        assert_eq!(detection.metadata["swipe_direction"], Value::from("right"));
        // History was consumed: only the next frame's sample remains.
        assert!(classifier.classify(&neutral_pose(0.3, 0.0)).is_none());
        assert_eq!(classifier.history_len(), 1);
    }

    #[test]
    fn swipe_left_on_negative_travel() {
        let mut classifier = SlotClassifier::new(0, GestureConfig::default());
        for i in 0..10 {
            let shift = -(i as f64) * 0.04;
            if let Some(detection) = classifier.classify(&neutral_pose(shift, 0.0)) {
                assert_eq!(detection.label, GestureLabel::SwipeLeft);
                return;
            }
        }
        panic!("swipe left never fired");
    }

    #[test]
    fn mostly_vertical_motion_is_not_a_swipe() {
        let mut classifier = SlotClassifier::new(0, GestureConfig::default());
        for i in 0..10 {
            let mut p = *neutral_pose(i as f64 * 0.04, 0.0).keypoints();
            for point in p.iter_mut() {
                point.y += i as f64 * 0.05; // dy outgrows dx * ratio
            }
            let detection = classifier.classify(&pose_from(p));
            assert!(detection.is_none(), "frame {i} fired {detection:?}");
        }
    }

    /// Neutral pose scaled about its own center, so the bounding box grows
    /// while the hand center stays put.
    fn scaled_neutral_pose(scale: f64) -> HandPose {
        let neutral = neutral_pose(0.0, 0.0);
        let (cx, cy) = neutral.center();
        let mut p = *neutral.keypoints();
        for point in p.iter_mut() {
            point.x = cx + (point.x - cx) * scale;
            point.y = cy + (point.y - cy) * scale;
        }
        pose_from(p)
    }

    #[test]
    fn push_forward_via_size_growth() {
        let mut classifier = SlotClassifier::new(0, GestureConfig::default());
        // Bounding box edge grows 1.0 -> 1.15 across the window at constant
        // z, so the area grows ~32% > 20% while the depth branch stays cold.
        for i in 0..9 {
            let scale = 1.0 + i as f64 * (0.15 / 9.0);
            assert!(classifier.classify(&scaled_neutral_pose(scale)).is_none());
        }
        let detection = classifier.classify(&scaled_neutral_pose(1.15)).unwrap();
        assert_eq!(detection.label, GestureLabel::PushForward);
        assert!((detection.confidence - PUSH_CONFIDENCE).abs() < 1e-9);
        let magnitude = detection.metadata["push_magnitude"].as_f64().unwrap();
        assert!(magnitude > 0.2, "push_magnitude was {magnitude}");
        // The accepted push consumed the history.
        assert_eq!(classifier.history_len(), 0);
    }

    #[test]
    fn push_forward_via_depth_decrease() {
        let mut classifier = SlotClassifier::new(0, GestureConfig::default());
        for i in 0..9 {
            let z = -(i as f64) * 0.025;
            assert!(classifier.classify(&neutral_pose(0.0, z)).is_none());
        }
        // Mean z dropped by 0.225 > 0.15 across the window.
        let detection = classifier.classify(&neutral_pose(0.0, -0.225)).unwrap();
        assert_eq!(detection.label, GestureLabel::PushForward);
        assert!((detection.confidence - PUSH_CONFIDENCE).abs() < 1e-9);
    }

    #[test]
    fn degenerate_zero_size_hand_never_divides_by_zero() {
        // All keypoints on a vertical line: bounding box area is zero.
        let mut classifier = SlotClassifier::new(0, GestureConfig::default());
        for _ in 0..12 {
            let mut p = [Keypoint::default(); KEYPOINT_COUNT];
            for (i, point) in p.iter_mut().enumerate() {
                *point = Keypoint::new(0.5, 0.2 + i as f64 * 0.03, 0.0);
            }
            // Must neither panic nor emit a push from a 0/0 ratio.
            assert!(classifier.classify(&pose_from(p)).is_none());
        }
    }

    #[test]
    fn reset_clears_history_and_pinch_state() {
        let mut classifier = SlotClassifier::new(0, GestureConfig::default());
        classifier.classify(&pinch_pose(0.03));
        classifier.reset();
        assert_eq!(classifier.history_len(), 0);
        // After reset the pinch is no longer held: an in-band distance is
        // judged against the enter threshold again.
        assert!(classifier.classify(&pinch_pose(0.06)).is_none());
    }
}
