//! Parabola-fit decision controller
//!
//! Decodes the three sensor currents into a paddle target: normalize into
//! [0,1], fit a quadratic through (Bottom, Middle, Top) at x = (-1, 0, +1),
//! take the grid argmax of the fitted curve as the vertex estimate, and map
//! it into screen space. Applications are rate-limited; the per-tick current
//! log runs on its own cadence in the tick loop.

use super::sensors::SensorSample;
use crate::config::SessionConfig;
use crate::consts::*;

/// Coefficient magnitude below which the fit is treated as flat
const FLAT_EPS: f32 = 1e-6;

/// Rate-limited controller turning sensor samples into paddle targets
pub struct DecisionController {
    norm_low: f32,
    norm_high: f32,
    update_interval: f64,
    last_update: f64,
}

impl DecisionController {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            norm_low: config.norm_low,
            norm_high: config.norm_high,
            update_interval: config.paddle_update_interval,
            last_update: 0.0,
        }
    }

    /// Propose a paddle target, or None while the rate limit holds.
    /// The limit compares wall-clock deltas; it never blocks the tick.
    pub fn propose(&mut self, now: f64, sample: &SensorSample) -> Option<f32> {
        if now - self.last_update < self.update_interval {
            return None;
        }
        self.last_update = now;
        Some(self.decide(sample))
    }

    /// Unconditional decision for the given sample
    pub fn decide(&self, sample: &SensorSample) -> f32 {
        // ordering encodes the spatial mapping: Bottom=-1, Middle=0, Top=+1
        let points = [
            self.normalize(sample.bottom),
            self.normalize(sample.middle),
            self.normalize(sample.top),
        ];
        let (a, b, c) = fit_parabola(points);
        let vertex = vertex_estimate(a, b, c);
        vertex_to_paddle_y(vertex)
    }

    /// Affine clip of a raw current into [0, 1]
    fn normalize(&self, current: f32) -> f32 {
        ((current - self.norm_low) / (self.norm_high - self.norm_low)).clamp(0.0, 1.0)
    }
}

/// Quadratic through (-1, y0), (0, y1), (1, y2); returns (a, b, c) of
/// a·x² + b·x + c. Three points determine the fit exactly.
pub fn fit_parabola(y: [f32; 3]) -> (f32, f32, f32) {
    let c = y[1];
    let b = (y[2] - y[0]) / 2.0;
    let a = (y[2] + y[0]) / 2.0 - y[1];
    (a, b, c)
}

/// Locate the maximum of the fitted curve on a dense grid over [-1, 1].
/// A flat fit (near-zero a and b) centers the vertex at 0 instead of
/// falling through to the grid's first point.
pub fn vertex_estimate(a: f32, b: f32, c: f32) -> f32 {
    if a.abs() < FLAT_EPS && b.abs() < FLAT_EPS {
        return 0.0;
    }

    let mut best_x = -1.0f32;
    let mut best_y = f32::NEG_INFINITY;
    for i in 0..VERTEX_GRID_POINTS {
        let x = -1.0 + 2.0 * i as f32 / (VERTEX_GRID_POINTS - 1) as f32;
        let y = a * x * x + b * x + c;
        if y > best_y {
            best_y = y;
            best_x = x;
        }
    }
    best_x
}

/// Decision-space to screen-space mapping.
///
/// The sign flip is deliberate: a vertex at +1 (Top sensor dominant) drives
/// the paddle to -300.
pub fn vertex_to_paddle_y(vertex: f32) -> f32 {
    let target = -vertex.clamp(-1.0, 1.0) * PADDLE_LIMIT;
    target.clamp(-PADDLE_LIMIT, PADDLE_LIMIT)
}
