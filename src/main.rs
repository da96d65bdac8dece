// Demo runner for the `gesture_vision` library. There is no camera or
// landmark model here: it feeds a synthetic hand through the pipeline — a
// held open palm, then a rightward sweep — and prints the debounced events a
// real front-end would receive over the broadcast channel.

use gesture_vision::{
    Frame, GesturePipeline, HandPose, Handedness, KEYPOINT_COUNT, Keypoint, PipelineConfig,
    Runner, landmark,
};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Duration, sleep};
use tracing_subscriber::EnvFilter;

/// A synthetic open palm, shifted `x_shift` to the right.
fn open_palm_pose(x_shift: f64) -> HandPose {
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
    for point in p.iter_mut() {
        point.x += x_shift;
    }
    HandPose::from_keypoints(&p, Handedness::Right, 0.97).expect("21 keypoints")
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = PipelineConfig::default();
    let (frame_tx, frame_rx) = mpsc::channel::<Frame>(32);
    let (event_tx, mut event_rx) = broadcast::channel(32);

    let runner = Runner::new(GesturePipeline::new(config), frame_rx, event_tx);
    let runner_handle = tokio::spawn(runner.run());

    let printer = tokio::spawn(async move {
        while let Ok(event) = event_rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => println!("event: {json}"),
                Err(err) => eprintln!("failed to serialize event: {err}"),
            }
        }
    });

    // Hold an open palm long enough to stabilize and trigger.
    for _ in 0..8 {
        let _ = frame_tx.send(Frame { hands: vec![open_palm_pose(0.0)] }).await;
        sleep(Duration::from_millis(33)).await;
    }

    // Lose the hand for a moment, then sweep it right past the cooldown.
    let _ = frame_tx.send(Frame::default()).await;
    sleep(Duration::from_millis(1100)).await;
    for i in 0..12 {
        let shift = i as f64 * 0.035;
        let _ = frame_tx.send(Frame { hands: vec![open_palm_pose(shift)] }).await;
        sleep(Duration::from_millis(33)).await;
    }

    drop(frame_tx);
    let _ = runner_handle.await;
    let _ = printer.await;
}
