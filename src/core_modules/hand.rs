// THEORY:
// The `hand` module is the geometric foundation of the gesture engine. It defines
// the data contract with the upstream perception oracle — a hand is exactly 21
// normalized 3-D keypoints in a fixed anatomical order — and the pure geometry
// every gesture check is built from (centers, distances, bounding-box size).
//
// Key architectural principles:
// 1.  **Contract Enforcement at the Boundary**: A `HandPose` can only be built
//     from exactly `KEYPOINT_COUNT` keypoints. Malformed detections are rejected
//     here, once, so no downstream module ever has to re-validate and a slot's
//     rolling history can never be corrupted by a short array.
// 2.  **Named Indices, Never Magic Numbers**: Every consumer addresses keypoints
//     through the `landmark` constants, which follow the MediaPipe hand landmark
//     convention (wrist, thumb x4, index x4, middle x4, ring x4, pinky x4).
// 3.  **Stateless Geometry**: All functions here are pure. Anything stateful
//     (rolling history, hysteresis) lives in the classifier, not here.

use crate::error::GestureError;
use serde::{Deserialize, Serialize};

/// Number of keypoints in one hand pose. Fixed by the upstream landmark model.
pub const KEYPOINT_COUNT: usize = 21;

/// Keypoint indices, following the MediaPipe hand landmark convention.
pub mod landmark {
    pub const WRIST: usize = 0;
    pub const THUMB_CMC: usize = 1;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_FINGER_MCP: usize = 5;
    pub const INDEX_FINGER_PIP: usize = 6;
    pub const INDEX_FINGER_DIP: usize = 7;
    pub const INDEX_FINGER_TIP: usize = 8;
    pub const MIDDLE_FINGER_MCP: usize = 9;
    pub const MIDDLE_FINGER_PIP: usize = 10;
    pub const MIDDLE_FINGER_DIP: usize = 11;
    pub const MIDDLE_FINGER_TIP: usize = 12;
    pub const RING_FINGER_MCP: usize = 13;
    pub const RING_FINGER_PIP: usize = 14;
    pub const RING_FINGER_DIP: usize = 15;
    pub const RING_FINGER_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_DIP: usize = 19;
    pub const PINKY_TIP: usize = 20;
}

/// A single landmark point with normalized coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    /// X coordinate, normalized to [0, 1] across the image width.
    pub x: f64,
    /// Y coordinate, normalized to [0, 1] across the image height. Grows downward.
    pub y: f64,
    /// Relative depth. More negative means closer to the camera.
    pub z: f64,
}

impl Keypoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// 3-D Euclidean distance to another keypoint. Z is already normalized
    /// relative to wrist scale upstream, so mixing it with x/y is acceptable.
    pub fn distance_to(&self, other: &Keypoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Which hand the perception oracle believes this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
    Unknown,
}

/// One detected hand in one frame: exactly 21 keypoints in anatomical order,
/// plus the oracle's handedness label and detection score.
#[derive(Debug, Clone)]
pub struct HandPose {
    keypoints: [Keypoint; KEYPOINT_COUNT],
    pub handedness: Handedness,
    /// Detection confidence reported by the oracle, in [0, 1].
    pub score: f64,
}

impl HandPose {
    /// Builds a pose from a keypoint slice, rejecting anything that is not
    /// exactly 21 points long.
    pub fn from_keypoints(
        keypoints: &[Keypoint],
        handedness: Handedness,
        score: f64,
    ) -> Result<Self, GestureError> {
        let keypoints: [Keypoint; KEYPOINT_COUNT] =
            keypoints
                .try_into()
                .map_err(|_| GestureError::InvalidKeypointCount {
                    expected: KEYPOINT_COUNT,
                    actual: keypoints.len(),
                })?;
        Ok(Self {
            keypoints,
            handedness,
            score,
        })
    }

    pub fn keypoints(&self) -> &[Keypoint; KEYPOINT_COUNT] {
        &self.keypoints
    }

    /// Geometric center of the hand: the mean of all 21 keypoints in (x, y).
    pub fn center(&self) -> (f64, f64) {
        let n = KEYPOINT_COUNT as f64;
        let sum_x: f64 = self.keypoints.iter().map(|k| k.x).sum();
        let sum_y: f64 = self.keypoints.iter().map(|k| k.y).sum();
        (sum_x / n, sum_y / n)
    }

    /// Approximate hand size: area of the (x, y) bounding box.
    pub fn size(&self) -> f64 {
        let mut min_x = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for k in &self.keypoints {
            min_x = min_x.min(k.x);
            max_x = max_x.max(k.x);
            min_y = min_y.min(k.y);
            max_y = max_y.max(k.y);
        }
        (max_x - min_x) * (max_y - min_y)
    }

    /// Center of the palm: the mean of the wrist and the four non-thumb MCP
    /// knuckles, in all three dimensions.
    pub fn palm_center(&self) -> Keypoint {
        const PALM_INDICES: [usize; 5] = [
            landmark::WRIST,
            landmark::INDEX_FINGER_MCP,
            landmark::MIDDLE_FINGER_MCP,
            landmark::RING_FINGER_MCP,
            landmark::PINKY_MCP,
        ];
        let n = PALM_INDICES.len() as f64;
        let mut center = Keypoint::default();
        for &i in &PALM_INDICES {
            center.x += self.keypoints[i].x;
            center.y += self.keypoints[i].y;
            center.z += self.keypoints[i].z;
        }
        center.x /= n;
        center.y /= n;
        center.z /= n;
        center
    }

    /// Mean depth across all 21 keypoints.
    pub fn mean_z(&self) -> f64 {
        self.keypoints.iter().map(|k| k.z).sum::<f64>() / KEYPOINT_COUNT as f64
    }
}
