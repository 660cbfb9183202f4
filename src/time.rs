//! Wall-clock to tick conversion for external drivers.
//!
//! A frontend calls [`GameTime::update`] from its frame or timer callback with
//! whatever clock it has and runs [`crate::Engine::tick`] the returned number
//! of times. Leftover milliseconds carry into the next frame.

use crate::config::EngineConfig;

/// Largest frame gap honored, so a backgrounded tab does not replay minutes of ticks.
pub const MAX_FRAME_DELTA_MS: f64 = 500.0;

#[derive(Clone, Debug)]
pub struct GameTime {
    tick_ms: f64,
    /// Milliseconds not yet consumed as ticks.
    accumulator: f64,
    pub total_ticks: u64,
    /// `None` until the first frame.
    last_timestamp: Option<f64>,
}

impl GameTime {
    pub fn new(tick_ms: u64) -> Self {
        Self {
            tick_ms: tick_ms.max(1) as f64,
            accumulator: 0.0,
            total_ticks: 0,
            last_timestamp: None,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.tick_ms)
    }

    /// Feed a wall-clock timestamp in milliseconds; returns ticks due.
    pub fn update(&mut self, now_ms: f64) -> u32 {
        let delta = match self.last_timestamp {
            Some(prev) => (now_ms - prev).clamp(0.0, MAX_FRAME_DELTA_MS),
            None => 0.0,
        };
        self.last_timestamp = Some(now_ms);

        self.accumulator += delta;
        let ticks = (self.accumulator / self.tick_ms) as u32;
        self.accumulator -= ticks as f64 * self.tick_ms;
        self.total_ticks += ticks as u64;
        ticks
    }

    /// Forget the last timestamp, e.g. after a pause. The next frame yields no ticks.
    pub fn reset(&mut self) {
        self.last_timestamp = None;
        self.accumulator = 0.0;
    }
}
