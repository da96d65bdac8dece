//! Frame-rate accounting for the orchestration loop: a moving average over
//! the last N inter-frame deltas.

use std::collections::VecDeque;
use std::time::Instant;

const DEFAULT_WINDOW: usize = 30;

pub struct FpsCounter {
    window: usize,
    instant_rates: VecDeque<f64>,
    last_tick: Instant,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }

    pub fn with_window(window: usize) -> Self {
        Self {
            window,
            instant_rates: VecDeque::with_capacity(window),
            last_tick: Instant::now(),
        }
    }

    /// Records one frame and returns the windowed average FPS.
    pub fn tick(&mut self) -> f64 {
        let now = Instant::now();
        let delta = now.duration_since(self.last_tick).as_secs_f64();
        self.last_tick = now;

        if delta > 0.0 {
            self.instant_rates.push_back(1.0 / delta);
            if self.instant_rates.len() > self.window {
                self.instant_rates.pop_front();
            }
        }

        if self.instant_rates.is_empty() {
            return 0.0;
        }
        self.instant_rates.iter().sum::<f64>() / self.instant_rates.len() as f64
    }

    pub fn reset(&mut self) {
        self.instant_rates.clear();
        self.last_tick = Instant::now();
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn reports_a_plausible_rate() {
        let mut fps = FpsCounter::with_window(5);
        for _ in 0..5 {
            sleep(Duration::from_millis(10));
            fps.tick();
        }
        let rate = fps.tick();
        // 10ms sleeps bound the rate well under 100 fps; scheduling jitter
        // only slows it down.
        assert!(rate > 0.0 && rate <= 110.0, "rate was {rate}");
    }

    #[test]
    fn reset_empties_the_window() {
        let mut fps = FpsCounter::new();
        fps.tick();
        fps.reset();
        assert_eq!(fps.tick(), 0.0);
    }
}
