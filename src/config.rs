//! Session configuration
//!
//! All experimenter-facing knobs for one session. Persisted as JSON next to
//! the session artifacts so a run can be reproduced later.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Experiment perturbation mode, fixed for the session's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Mode {
    /// Controller output applied unchanged (normal learning)
    #[default]
    Faithful,
    /// Paddle target replaced by a uniform draw from {-300, 0, 300}
    ScrambledPaddle,
    /// Sensor-path corruption hook; currently applies no corruption
    ScrambledSensor,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Faithful => "faithful",
            Mode::ScrambledPaddle => "scrambled-paddle",
            Mode::ScrambledSensor => "scrambled-sensor",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "faithful" | "correct" => Some(Mode::Faithful),
            "scrambled-paddle" | "scrambled_paddle" => Some(Mode::ScrambledPaddle),
            "scrambled-sensor" | "scrambled_sensor" => Some(Mode::ScrambledSensor),
            _ => None,
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session duration budget in simulated seconds
    pub run_time: f64,
    /// Global velocity scale: base speeds are divided by this
    pub slow_factor: f32,
    /// Sensor noise amplitude around the background baseline
    pub noise_factor: f32,
    /// Perturbation mode
    pub mode: Mode,

    // === Decision controller ===
    /// Lower bound of the affine current normalization
    pub norm_low: f32,
    /// Upper bound of the affine current normalization
    pub norm_high: f32,
    /// Minimum seconds between applied paddle updates
    pub paddle_update_interval: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            run_time: 100.0,
            slow_factor: 0.5,
            noise_factor: 0.2,
            mode: Mode::Faithful,
            norm_low: -7.0,
            norm_high: 7.6,
            paddle_update_interval: 0.1,
        }
    }
}

impl SessionConfig {
    /// Effective minimum ball speed (floored so renormalization never divides by zero)
    pub fn min_speed(&self) -> f32 {
        (crate::consts::BASE_MIN_SPEED / self.slow_factor).max(0.01)
    }

    /// Effective maximum ball speed
    pub fn max_speed(&self) -> f32 {
        crate::consts::BASE_MAX_SPEED / self.slow_factor
    }

    /// Speed restored when the ball leaves the [min, max] band
    pub fn target_speed(&self) -> f32 {
        crate::consts::BASE_TARGET_SPEED / self.slow_factor
    }

    /// Load a config from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Save the config as JSON next to the session artifacts
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        log::info!("Config saved to {}", path.display());
        Ok(())
    }
}
