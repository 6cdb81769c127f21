//! Mode-dependent perturbation of the control path
//!
//! One strategy per experiment mode, injected at session construction. The
//! perturber sees every sensor sample and every permitted paddle update, so
//! a mode can corrupt either side of the decision without the tick loop
//! branching on the mode itself.

use rand::Rng;
use rand_pcg::Pcg32;

use super::sensors::SensorSample;
use crate::config::Mode;

/// Paddle targets substituted by the scrambled-paddle mode
pub const SCRAMBLE_TARGETS: [f32; 3] = [-300.0, 0.0, 300.0];

/// Hook points for mode perturbation
pub trait Perturber {
    /// Override the controller's target at a permitted update
    fn perturb_target(&mut self, target: f32, rng: &mut Pcg32) -> f32 {
        let _ = rng;
        target
    }

    /// Corrupt a sensor sample upstream of the fit
    fn perturb_sample(&mut self, sample: SensorSample, rng: &mut Pcg32) -> SensorSample {
        let _ = rng;
        sample
    }
}

/// Faithful mode: controller output applied unchanged
pub struct Faithful;

impl Perturber for Faithful {}

/// Scrambled-paddle mode: ignores the computed target and substitutes a
/// uniform draw from {-300, 0, 300}, fully decorrelating paddle from sensors
pub struct ScrambledPaddle;

impl Perturber for ScrambledPaddle {
    fn perturb_target(&mut self, _target: f32, rng: &mut Pcg32) -> f32 {
        SCRAMBLE_TARGETS[rng.random_range(0..SCRAMBLE_TARGETS.len())]
    }
}

/// Scrambled-sensor mode: reserved hook for corrupting the sensor path.
///
/// No corruption scheme is currently specified, so the hook passes samples
/// through unchanged and the mode behaves like `Faithful`.
pub struct ScrambledSensor;

impl Perturber for ScrambledSensor {}

/// Build the strategy for a mode
pub fn for_mode(mode: Mode) -> Box<dyn Perturber> {
    match mode {
        Mode::Faithful => Box::new(Faithful),
        Mode::ScrambledPaddle => Box::new(ScrambledPaddle),
        Mode::ScrambledSensor => Box::new(ScrambledSensor),
    }
}
