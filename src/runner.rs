// THEORY:
// The `runner` module is the orchestration shell around the synchronous
// pipeline. The pipeline itself performs no I/O and knows nothing about
// channels; this loop owns it exclusively, pulling frames off an mpsc intake
// and fanning debounced events out on a broadcast channel — the boundary to
// whatever publish mechanism (websocket bridge, UI process) sits downstream.
//
// Processing stays strictly frame-at-a-time: the single ownership of the
// pipeline by this task is what guarantees at most one in-flight update per
// slot.

use crate::core_modules::hand::HandPose;
use crate::core_modules::state_machine::GestureEvent;
use crate::metrics::FpsCounter;
use crate::pipeline::GesturePipeline;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

/// Log a status line every this many frames (about every 10s at 30 fps).
const STATUS_LOG_INTERVAL: u64 = 300;

/// One frame's worth of input from the perception oracle. Hand order defines
/// slot assignment.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub hands: Vec<HandPose>,
}

/// Drives a `GesturePipeline` from a frame channel and broadcasts its events.
pub struct Runner {
    pipeline: GesturePipeline,
    frames: mpsc::Receiver<Frame>,
    events: broadcast::Sender<GestureEvent>,
    fps: FpsCounter,
}

impl Runner {
    pub fn new(
        pipeline: GesturePipeline,
        frames: mpsc::Receiver<Frame>,
        events: broadcast::Sender<GestureEvent>,
    ) -> Self {
        Self {
            pipeline,
            frames,
            events,
            fps: FpsCounter::new(),
        }
    }

    /// Runs until the frame channel closes.
    pub async fn run(mut self) {
        info!(
            max_hands = self.pipeline.max_hands(),
            "gesture runner started"
        );
        let mut frame_count: u64 = 0;

        while let Some(frame) = self.frames.recv().await {
            for event in self.pipeline.process_frame(&frame.hands) {
                info!(gesture = %event.gesture, hand = event.hand_id, "broadcasting event");
                // A send error only means nobody is subscribed right now.
                if self.events.send(event).is_err() {
                    debug!("no event subscribers");
                }
            }

            let fps = self.fps.tick();
            frame_count += 1;
            if frame_count % STATUS_LOG_INTERVAL == 0 {
                info!(frames = frame_count, fps = format!("{fps:.1}"), "status");
            }
        }
        info!(frames = frame_count, "frame channel closed, runner stopping");
    }
}
