// THEORY:
// The `state_machine` module is the debounce layer: it adds "patience" to the
// raw per-frame signal. A `DebounceMachine` owns one hand slot's stabilization
// buffer and cooldown clock, and turns a run of identically-labeled frames
// into exactly one discrete `GestureEvent`.
//
// Key architectural principles:
// 1.  **Stability Before Trigger**: An event fires only once `stability_frames`
//     consecutive detections agree. Single-frame misclassifications never get
//     through.
// 2.  **Cooldown After Trigger**: After firing, the machine ignores all input
//     until a wall-clock deadline passes. A held pose cannot re-trigger in a
//     rapid stream.
// 3.  **Two-Phase Update**: Each `update_at` call first resolves an expired
//     cooldown (falling back to idle) and then processes the same call's
//     input. The expiry tick never swallows a frame.
// 4.  **Injected Time**: The caller supplies `now_ms`, so cooldown behavior is
//     deterministic under test; the pipeline passes wall-clock epoch millis.
//
// TRIGGERED is a one-tick transition, not a resting state: every update lands
// in IDLE, DETECTING or COOLDOWN.

use crate::config::StateMachineConfig;
use crate::core_modules::classifier::{Detection, GestureLabel};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use tracing::{debug, info};

/// Resting states of the debounce machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DebounceState {
    Idle,
    Detecting,
    Cooldown,
}

/// A debounced, broadcast-ready gesture event. Immutable once constructed;
/// serializes to the wire payload consumed by UI clients.
#[derive(Debug, Clone, Serialize)]
pub struct GestureEvent {
    pub gesture: GestureLabel,
    /// Mean confidence over the stabilizing run, rounded to 3 decimals.
    pub confidence: f64,
    pub hand_id: usize,
    /// Epoch milliseconds at trigger time.
    pub timestamp: u64,
    /// Diagnostics from the last contributing detection, plus the hand's
    /// center and size.
    pub metadata: Map<String, Value>,
}

/// Diagnostic view of one machine, for observability. Reading it never
/// affects behavior.
#[derive(Debug, Clone, Serialize)]
pub struct SlotSnapshot {
    pub hand_id: usize,
    pub state: DebounceState,
    pub buffer_len: usize,
    pub buffer_capacity: usize,
    pub cooldown_remaining_ms: u64,
    pub last_triggered: Option<GestureLabel>,
}

/// Debounce state machine for a single hand slot.
pub struct DebounceMachine {
    hand_id: usize,
    config: StateMachineConfig,
    state: DebounceState,
    /// Sliding stabilization buffer, capacity `stability_frames`.
    buffer: VecDeque<Detection>,
    cooldown_end_ms: u64,
    last_triggered: Option<GestureLabel>,
}

impl DebounceMachine {
    pub fn new(hand_id: usize, config: StateMachineConfig) -> Self {
        let capacity = config.stability_frames;
        Self {
            hand_id,
            config,
            state: DebounceState::Idle,
            buffer: VecDeque::with_capacity(capacity),
            cooldown_end_ms: 0,
            last_triggered: None,
        }
    }

    pub fn state(&self) -> DebounceState {
        self.state
    }

    /// Feeds one frame's classification (or its absence) into the machine.
    /// Returns an event only on the tick the buffer first becomes uniform and
    /// full.
    pub fn update_at(
        &mut self,
        now_ms: u64,
        detection: Option<&Detection>,
    ) -> Option<GestureEvent> {
        // Phase 1: resolve the cooldown clock. An expired cooldown falls back
        // to idle and this call's input is still processed below. An active
        // one discards the input unconditionally.
        if self.state == DebounceState::Cooldown {
            if now_ms >= self.cooldown_end_ms {
                debug!(hand = self.hand_id, "cooldown expired, returning to idle");
                self.state = DebounceState::Idle;
                self.buffer.clear();
            } else {
                return None;
            }
        }

        // Phase 2: process the input.
        let Some(detection) = detection else {
            if self.state != DebounceState::Idle {
                debug!(hand = self.hand_id, "no detection, resetting to idle");
                self.state = DebounceState::Idle;
                self.buffer.clear();
            }
            return None;
        };

        // A lingering identical pose must not re-arm the instant its cooldown
        // ends on the same gesture.
        if !self.config.allow_same_gesture_repeat
            && self.last_triggered == Some(detection.label)
            && now_ms < self.cooldown_end_ms
        {
            return None;
        }

        self.buffer.push_back(detection.clone());
        if self.buffer.len() > self.config.stability_frames {
            self.buffer.pop_front();
        }

        if self.buffer.len() < self.config.stability_frames {
            if self.state != DebounceState::Detecting {
                debug!(
                    hand = self.hand_id,
                    label = %detection.label,
                    fill = self.buffer.len(),
                    capacity = self.config.stability_frames,
                    "started detecting"
                );
                self.state = DebounceState::Detecting;
            }
            return None;
        }

        let label = self.buffer[0].label;
        if self.buffer.iter().any(|d| d.label != label) {
            // Mixed buffer: keep sliding until a stable run fills it.
            self.state = DebounceState::Detecting;
            return None;
        }

        let event = self.build_event(now_ms, label);
        info!(
            hand = self.hand_id,
            gesture = %label,
            confidence = event.confidence,
            "gesture triggered"
        );
        self.state = DebounceState::Cooldown;
        self.cooldown_end_ms = now_ms + self.config.cooldown_ms;
        self.last_triggered = Some(label);
        self.buffer.clear();
        Some(event)
    }

    fn build_event(&self, now_ms: u64, label: GestureLabel) -> GestureEvent {
        let mean_confidence =
            self.buffer.iter().map(|d| d.confidence).sum::<f64>() / self.buffer.len() as f64;
        let last = self.buffer.back().expect("buffer is full when triggering");

        let mut metadata = last.metadata.clone();
        metadata.insert(
            "hand_center".into(),
            Value::from(vec![round3(last.hand_center.0), round3(last.hand_center.1)]),
        );
        metadata.insert("hand_size".into(), Value::from(round3(last.hand_size)));

        GestureEvent {
            gesture: label,
            confidence: round3(mean_confidence),
            hand_id: self.hand_id,
            timestamp: now_ms,
            metadata,
        }
    }

    /// Returns the machine to its initial state, forgetting the cooldown and
    /// the last-triggered label.
    pub fn reset(&mut self) {
        info!(hand = self.hand_id, "state machine reset");
        self.state = DebounceState::Idle;
        self.buffer.clear();
        self.cooldown_end_ms = 0;
        self.last_triggered = None;
    }

    pub fn snapshot(&self, now_ms: u64) -> SlotSnapshot {
        SlotSnapshot {
            hand_id: self.hand_id,
            state: self.state,
            buffer_len: self.buffer.len(),
            buffer_capacity: self.config.stability_frames,
            cooldown_remaining_ms: self.cooldown_end_ms.saturating_sub(now_ms),
            last_triggered: self.last_triggered,
        }
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
