// THEORY:
// Configuration for the gesture engine. Every gesture check and every debounce
// rule is driven by a tunable numeric threshold, so the entire behavior surface
// lives in one place, loadable from a YAML file or constructed with defaults.
// Validation happens once at load time; the hot path trusts the config.

use crate::error::GestureError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Thresholds for the per-frame gesture checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// How far (in normalized y) a fingertip must sit above its PIP joint to
    /// count as extended.
    pub open_palm_finger_threshold: f64,
    /// Minimum extended fingers (out of 4) to emit an open palm.
    pub open_palm_min_fingers: usize,
    /// Maximum fingertip-to-palm-center distance for a curled finger.
    pub closed_fist_distance_threshold: f64,
    /// Minimum curled fingertips (out of 5, thumb included) for a fist.
    pub closed_fist_min_fingers: usize,
    /// Thumb-to-index distance below which a pinch engages.
    pub pinch_enter_threshold: f64,
    /// Thumb-to-index distance above which a held pinch releases. Must be
    /// wider than the enter threshold; the band between them is the hysteresis
    /// zone that prevents chatter at the boundary.
    pub pinch_exit_threshold: f64,
    /// Number of history frames a swipe is measured over.
    pub swipe_window_size: usize,
    /// Minimum horizontal travel (normalized x) across the swipe window.
    pub swipe_dx_threshold: f64,
    /// Reject a swipe when |dy| exceeds |dx| times this ratio.
    pub swipe_dy_ratio: f64,
    /// Number of history frames a push is measured over.
    pub push_window_size: usize,
    /// Minimum relative growth of hand size across the push window.
    pub push_size_increase_threshold: f64,
    /// Minimum decrease in mean depth across the push window (hand moving
    /// toward the camera).
    pub push_z_threshold: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            open_palm_finger_threshold: 0.02,
            open_palm_min_fingers: 3,
            closed_fist_distance_threshold: 0.10,
            closed_fist_min_fingers: 4,
            pinch_enter_threshold: 0.05,
            pinch_exit_threshold: 0.07,
            swipe_window_size: 10,
            swipe_dx_threshold: 0.15,
            swipe_dy_ratio: 0.5,
            push_window_size: 10,
            push_size_increase_threshold: 0.20,
            push_z_threshold: 0.15,
        }
    }
}

impl GestureConfig {
    /// Capacity of a slot's rolling history: large enough for whichever
    /// temporal window is longer.
    pub fn history_capacity(&self) -> usize {
        self.swipe_window_size.max(self.push_window_size)
    }
}

/// Tunables for the per-hand debounce state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateMachineConfig {
    /// Consecutive identically-labeled frames required before an event fires.
    pub stability_frames: usize,
    /// Minimum quiet period after a trigger, in milliseconds.
    pub cooldown_ms: u64,
    /// When false, a lingering identical pose cannot re-arm the machine until
    /// its cooldown deadline has passed.
    pub allow_same_gesture_repeat: bool,
}

impl Default for StateMachineConfig {
    fn default() -> Self {
        Self {
            stability_frames: 5,
            cooldown_ms: 1000,
            allow_same_gesture_repeat: false,
        }
    }
}

/// Top-level configuration for the whole pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of persistent hand slots.
    pub max_hands: usize,
    pub gestures: GestureConfig,
    pub state_machine: StateMachineConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_hands: 2,
            gestures: GestureConfig::default(),
            state_machine: StateMachineConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Loads and validates a configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GestureError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), GestureError> {
        if self.max_hands == 0 {
            return Err(GestureError::InvalidConfig {
                field: "max_hands",
                reason: "must be at least 1".into(),
            });
        }
        if self.gestures.pinch_exit_threshold <= self.gestures.pinch_enter_threshold {
            return Err(GestureError::InvalidConfig {
                field: "pinch_exit_threshold",
                reason: format!(
                    "hysteresis band is inverted: exit {} must exceed enter {}",
                    self.gestures.pinch_exit_threshold, self.gestures.pinch_enter_threshold
                ),
            });
        }
        if self.gestures.swipe_window_size < 2 || self.gestures.push_window_size < 2 {
            return Err(GestureError::InvalidConfig {
                field: "swipe_window_size / push_window_size",
                reason: "temporal windows need at least 2 frames".into(),
            });
        }
        if self.gestures.open_palm_min_fingers > 4 {
            return Err(GestureError::InvalidConfig {
                field: "open_palm_min_fingers",
                reason: "only 4 non-thumb fingers exist".into(),
            });
        }
        if self.gestures.closed_fist_min_fingers > 5 {
            return Err(GestureError::InvalidConfig {
                field: "closed_fist_min_fingers",
                reason: "only 5 fingertips exist".into(),
            });
        }
        if self.state_machine.stability_frames == 0 {
            return Err(GestureError::InvalidConfig {
                field: "stability_frames",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}
