//! Ball motion, wall/paddle collision, speed normalization
//!
//! Axis-aligned collision only: walls invert one velocity component and the
//! paddle inverts dx. Every inversion is followed by a renormalization that
//! keeps the speed inside the configured band without changing direction.

use rand::Rng;
use rand_pcg::Pcg32;

use super::state::{Ball, Paddle};
use crate::config::SessionConfig;
use crate::consts::*;

/// Allowed ball speed band, scaled by the session's slow factor
#[derive(Debug, Clone, Copy)]
pub struct SpeedBand {
    pub min: f32,
    pub max: f32,
    pub target: f32,
}

impl SpeedBand {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            min: config.min_speed(),
            max: config.max_speed(),
            target: config.target_speed(),
        }
    }
}

/// Advance the ball by one tick (velocity is units per tick)
pub fn advance(ball: &mut Ball) {
    ball.pos += ball.vel;
}

/// Rescale velocity to the target speed when it leaves the band.
/// Both components scale uniformly, preserving direction.
pub fn normalize_speed(ball: &mut Ball, band: &SpeedBand) {
    let speed = ball.speed();
    if speed <= f32::EPSILON {
        // no direction to preserve; leave the ball for the next serve
        return;
    }
    if speed < band.min || speed > band.max {
        let scale = band.target / speed;
        ball.vel *= scale;
    }
}

/// Reflect off the top/bottom walls and the right wall, clamping position to
/// the boundary before inverting the velocity component.
pub fn reflect_walls(ball: &mut Ball, band: &SpeedBand) {
    if ball.pos.y > FIELD_HALF_HEIGHT {
        ball.pos.y = FIELD_HALF_HEIGHT;
        ball.vel.y = -ball.vel.y;
        normalize_speed(ball, band);
    }
    if ball.pos.y < -FIELD_HALF_HEIGHT {
        ball.pos.y = -FIELD_HALF_HEIGHT;
        ball.vel.y = -ball.vel.y;
        normalize_speed(ball, band);
    }
    if ball.pos.x > RIGHT_WALL_X {
        ball.pos.x = RIGHT_WALL_X;
        ball.vel.x = -ball.vel.x;
        normalize_speed(ball, band);
    }
}

/// Check and resolve a paddle hit.
///
/// A hit requires the ball inside the narrow band just off the left wall and
/// within the paddle's half-height of its center. On hit the ball is snapped
/// to the band's inner edge, dx inverted, speed renormalized.
pub fn paddle_collision(ball: &mut Ball, paddle: &Paddle, band: &SpeedBand) -> bool {
    let in_band = MISS_X < ball.pos.x && ball.pos.x < PADDLE_BAND_INNER_X;
    let in_reach = (ball.pos.y - paddle.y()).abs() < PADDLE_HALF_HEIGHT;
    if in_band && in_reach {
        ball.pos.x = PADDLE_BAND_INNER_X;
        ball.vel.x = -ball.vel.x;
        normalize_speed(ball, band);
        true
    } else {
        false
    }
}

/// True when the ball passed the left wall outside the paddle band
pub fn miss_check(ball: &Ball) -> bool {
    ball.pos.x < MISS_X
}

/// Respawn the ball at center with a freshly randomized serve velocity:
/// dx drawn rightward, dy with randomized sign, both scaled by the slow factor.
pub fn serve(ball: &mut Ball, slow_factor: f32, rng: &mut Pcg32) {
    ball.pos = glam::Vec2::ZERO;
    ball.vel.x = rng.random_range(SERVE_DX_MIN..SERVE_DX_MAX) / slow_factor;
    let sign = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
    ball.vel.y = rng.random_range(SERVE_DY_MIN..SERVE_DY_MAX) * sign / slow_factor;
}
