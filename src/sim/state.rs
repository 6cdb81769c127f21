//! Session state and core simulation types
//!
//! All mutable state for one session lives here, owned by a single `Session`
//! object created at session start and consumed by `finalize`.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::decision::DecisionController;
use super::perturb::{self, Perturber};
use super::physics;
use super::sensors::RegionMemoryTracker;
use crate::config::SessionConfig;
use crate::consts::*;
use crate::stats::{SessionArtifacts, StatisticsRecorder};

/// Horizontal band of the play-field, used for sensor gating and
/// hit-rate bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Region {
    Top,
    Middle,
    Bottom,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::Top, Region::Middle, Region::Bottom];

    /// Classify a y coordinate. Total and disjoint: every y maps to
    /// exactly one region.
    pub fn classify(y: f32) -> Self {
        if y > REGION_SPLIT_Y {
            Region::Top
        } else if y > -REGION_SPLIT_Y {
            Region::Middle
        } else {
            Region::Bottom
        }
    }

    /// Sensor index: Top=0, Middle=1, Bottom=2 (current-log column order)
    pub fn index(self) -> usize {
        match self {
            Region::Top => 0,
            Region::Middle => 1,
            Region::Bottom => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Region::Top => "top",
            Region::Middle => "middle",
            Region::Bottom => "bottom",
        }
    }
}

/// The ball: position and per-tick velocity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    pub pos: Vec2,
    pub vel: Vec2,
}

impl Ball {
    /// Ball at the arena center with no velocity (serve sets velocity)
    pub fn new() -> Self {
        Self {
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
        }
    }

    pub fn speed(&self) -> f32 {
        self.vel.length()
    }
}

impl Default for Ball {
    fn default() -> Self {
        Self::new()
    }
}

/// The paddle: scalar y position on the left wall
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Paddle {
    y: f32,
}

impl Paddle {
    pub fn y(&self) -> f32 {
        self.y
    }

    /// Move the paddle, clamped to ±PADDLE_LIMIT
    pub fn set_y(&mut self, y: f32) {
        self.y = y.clamp(-PADDLE_LIMIT, PADDLE_LIMIT);
    }
}

/// One experiment session: all mutable state plus the seeded RNG.
///
/// Constructed from a config and a seed; the same pair reproduces the same
/// artifacts. Consumed by `run_until`/`finalize` so nothing outlives the
/// session except its artifacts.
pub struct Session {
    pub config: SessionConfig,
    pub seed: u64,
    /// Session-relative time in simulated seconds (ticks × TICK_DT)
    pub clock: f64,
    pub ticks: u64,
    pub ball: Ball,
    pub paddle: Paddle,
    pub tracker: RegionMemoryTracker,
    pub controller: DecisionController,
    pub perturber: Box<dyn Perturber>,
    pub recorder: StatisticsRecorder,
    pub rng: Pcg32,
}

impl Session {
    /// Create a session with a served ball and the mode's perturber injected
    pub fn new(config: SessionConfig, seed: u64) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let mut ball = Ball::new();
        physics::serve(&mut ball, config.slow_factor, &mut rng);

        let controller = DecisionController::new(&config);
        let perturber = perturb::for_mode(config.mode);

        log::info!(
            "Session start: mode={}, seed={}, run_time={}s",
            config.mode.as_str(),
            seed,
            config.run_time
        );

        Self {
            config,
            seed,
            clock: 0.0,
            ticks: 0,
            ball,
            paddle: Paddle::default(),
            tracker: RegionMemoryTracker::new(),
            controller,
            perturber,
            recorder: StatisticsRecorder::new(),
            rng,
        }
    }

    /// Tick until the duration budget elapses or `quit` fires, then finalize.
    ///
    /// Both exits share the same shutdown path: stop ticking, finalize the
    /// recorder, hand the artifacts back to the caller.
    pub fn run_until(mut self, mut quit: impl FnMut() -> bool) -> SessionArtifacts {
        while self.clock < self.config.run_time && !quit() {
            super::tick::tick(&mut self);
        }
        log::info!(
            "Session end: {} ticks, {} misses, score {}",
            self.ticks,
            self.recorder.rally_events().len(),
            self.recorder.score()
        );
        self.finalize()
    }

    /// Run the full duration budget
    pub fn run_to_completion(self) -> SessionArtifacts {
        self.run_until(|| false)
    }

    /// Stop the session and extract its artifacts
    pub fn finalize(self) -> SessionArtifacts {
        self.recorder.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_region_thresholds() {
        assert_eq!(Region::classify(151.0), Region::Top);
        assert_eq!(Region::classify(150.0), Region::Middle);
        assert_eq!(Region::classify(0.0), Region::Middle);
        assert_eq!(Region::classify(-150.0), Region::Bottom);
        assert_eq!(Region::classify(-151.0), Region::Bottom);
    }

    #[test]
    fn test_paddle_clamp() {
        let mut paddle = Paddle::default();
        paddle.set_y(450.0);
        assert_eq!(paddle.y(), 300.0);
        paddle.set_y(-450.0);
        assert_eq!(paddle.y(), -300.0);
        paddle.set_y(42.0);
        assert_eq!(paddle.y(), 42.0);
    }

    proptest! {
        /// Every y belongs to exactly one region
        #[test]
        fn prop_region_partition_total(y in -1000.0f32..1000.0) {
            let matches = Region::ALL
                .iter()
                .filter(|r| Region::classify(y) == **r)
                .count();
            prop_assert_eq!(matches, 1);
        }
    }
}
