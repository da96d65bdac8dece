// THEORY:
// This file is the main entry point for the `gesture_vision` library crate.
// It follows the standard Rust convention of using `lib.rs` to define the
// public API that will be exposed to external consumers (a camera/landmark
// front-end on one side, an event-publishing bridge on the other).
//
// The primary goal is to export the `GesturePipeline` and its associated data
// structures (`PipelineConfig`, `GestureEvent`, `HandPose`, ...) as the clean,
// high-level interface for the gesture engine. The internal modules
// (`core_modules`) stay encapsulated behind it.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod runner;

pub use config::{GestureConfig, PipelineConfig, StateMachineConfig};
pub use core_modules::classifier::{Detection, GestureLabel};
pub use core_modules::hand::{HandPose, Handedness, KEYPOINT_COUNT, Keypoint, landmark};
pub use core_modules::state_machine::{DebounceState, GestureEvent, SlotSnapshot};
pub use error::{GestureError, Result};
pub use pipeline::GesturePipeline;
pub use runner::{Frame, Runner};
