// THEORY:
// The `pipeline` module is the final, top-level API for the gesture engine.
// It owns a fixed set of hand slots — persistent tracking identities created
// once at startup — and coordinates a frame's journey: per-slot frame
// classification, per-slot debouncing, and aggregation of the emitted events
// in slot order.
//
// Hand-to-slot assignment uses the perception oracle's per-frame ordering
// directly (hand index = slot id). This is an acknowledged simplification: it
// does not re-identify hands across frames, so two crossing hands can swap
// slots. The slots themselves never share state, which keeps the fallout of a
// swap bounded to mixed histories.

use crate::config::PipelineConfig;
use crate::core_modules::classifier::SlotClassifier;
use crate::core_modules::hand::HandPose;
use crate::core_modules::state_machine::{DebounceMachine, GestureEvent, SlotSnapshot};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// One persistent hand slot: its frame classifier (rolling history + pinch
/// hysteresis) and its debounce machine.
struct HandSlot {
    classifier: SlotClassifier,
    machine: DebounceMachine,
}

/// The main, top-level struct for the gesture engine. Synchronous and
/// single-threaded: one frame is fully processed before the next is accepted.
pub struct GesturePipeline {
    slots: Vec<HandSlot>,
    max_hands: usize,
}

impl GesturePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let slots = (0..config.max_hands)
            .map(|slot_id| HandSlot {
                classifier: SlotClassifier::new(slot_id, config.gestures.clone()),
                machine: DebounceMachine::new(slot_id, config.state_machine.clone()),
            })
            .collect();
        Self {
            slots,
            max_hands: config.max_hands,
        }
    }

    /// Processes one frame's hand detections. The order of `hands` defines
    /// slot assignment; detections beyond `max_hands` are dropped. Returns
    /// the debounced events in slot-id order, usually empty.
    pub fn process_frame(&mut self, hands: &[HandPose]) -> Vec<GestureEvent> {
        self.process_frame_at(epoch_ms(), hands)
    }

    /// Like `process_frame` with an injected clock, for deterministic tests.
    pub fn process_frame_at(&mut self, now_ms: u64, hands: &[HandPose]) -> Vec<GestureEvent> {
        if hands.len() > self.max_hands {
            debug!(
                detected = hands.len(),
                max_hands = self.max_hands,
                "more hands than slots, extra detections dropped"
            );
        }

        let mut events = Vec::new();
        for (slot_id, slot) in self.slots.iter_mut().enumerate() {
            let detection = match hands.get(slot_id) {
                Some(pose) => slot.classifier.classify(pose),
                None => {
                    // The slot persists, but its short-term memory does not
                    // survive losing the hand.
                    slot.classifier.reset();
                    None
                }
            };
            if let Some(event) = slot.machine.update_at(now_ms, detection.as_ref()) {
                events.push(event);
            }
        }
        events
    }

    /// Reinitializes every slot: history, buffers and cooldowns are all
    /// forgotten.
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.classifier.reset();
            slot.machine.reset();
        }
    }

    /// Per-slot diagnostic snapshot. Purely observational.
    pub fn snapshot(&self) -> Vec<SlotSnapshot> {
        self.snapshot_at(epoch_ms())
    }

    /// Like `snapshot` with an injected clock, so cooldown remainders line up
    /// with frames driven through `process_frame_at`.
    pub fn snapshot_at(&self, now_ms: u64) -> Vec<SlotSnapshot> {
        self.slots
            .iter()
            .map(|slot| slot.machine.snapshot(now_ms))
            .collect()
    }

    pub fn max_hands(&self) -> usize {
        self.max_hands
    }
}

/// Current wall-clock time as epoch milliseconds.
pub fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::hand::{Handedness, KEYPOINT_COUNT, Keypoint, landmark};
    use crate::core_modules::state_machine::DebounceState;

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
            p[base + 3] = Keypoint::new(fx, 0.38, 0.0);
        }
        HandPose::from_keypoints(&p, Handedness::Right, 1.0).unwrap()
    }

    #[test]
    fn slots_start_idle_and_snapshot_matches_max_hands() {
        let pipeline = GesturePipeline::new(PipelineConfig::default());
        let snapshots = pipeline.snapshot();
        assert_eq!(snapshots.len(), 2);
        assert!(snapshots.iter().all(|s| s.state == DebounceState::Idle));
        assert!(snapshots.iter().all(|s| s.last_triggered.is_none()));
    }

    #[test]
    fn stable_palm_on_slot_zero_triggers_once() {
        let mut pipeline = GesturePipeline::new(PipelineConfig::default());
        let palm = open_palm_pose();
        let mut events = Vec::new();
        for t in 0..5 {
            events.extend(pipeline.process_frame_at(t, std::slice::from_ref(&palm)));
        }
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].hand_id, 0);
        // Slot 1 never saw a hand and stayed idle.
        assert_eq!(pipeline.snapshot()[1].state, DebounceState::Idle);
    }

    #[test]
    fn extra_hands_beyond_max_are_dropped() {
        let mut pipeline = GesturePipeline::new(PipelineConfig {
            max_hands: 1,
            ..PipelineConfig::default()
        });
        let palm = open_palm_pose();
        let hands = vec![palm.clone(), palm.clone(), palm];
        let mut events = Vec::new();
        for t in 0..5 {
            events.extend(pipeline.process_frame_at(t, &hands));
        }
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].hand_id, 0);
    }

    #[test]
    fn snapshot_at_reports_cooldown_against_the_injected_clock() {
        let mut pipeline = GesturePipeline::new(PipelineConfig::default());
        let palm = open_palm_pose();
        for t in 0..5 {
            pipeline.process_frame_at(t, std::slice::from_ref(&palm));
        }
        // Triggered at t=4 with a 1000ms cooldown.
        let snapshot = &pipeline.snapshot_at(504)[0];
        assert_eq!(snapshot.state, DebounceState::Cooldown);
        assert_eq!(snapshot.cooldown_remaining_ms, 500);
        assert_eq!(pipeline.snapshot_at(2000)[0].cooldown_remaining_ms, 0);
    }

    #[test]
    fn reset_returns_every_slot_to_idle() {
        let mut pipeline = GesturePipeline::new(PipelineConfig::default());
        let palm = open_palm_pose();
        for t in 0..5 {
            pipeline.process_frame_at(t, std::slice::from_ref(&palm));
        }
        assert_eq!(pipeline.snapshot()[0].state, DebounceState::Cooldown);
        pipeline.reset();
        let snapshots = pipeline.snapshot();
        assert!(snapshots.iter().all(|s| s.state == DebounceState::Idle));
        assert!(snapshots.iter().all(|s| s.cooldown_remaining_ms == 0));
    }
}
