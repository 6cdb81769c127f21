//! Deterministic simulation module
//!
//! All session logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - No I/O; persistence and analysis are separate modules
//!
//! One tick runs physics, sensing, decision, perturbation, and statistics
//! synchronously, then returns to the caller.

pub mod decision;
pub mod perturb;
pub mod physics;
pub mod sensors;
pub mod state;
pub mod tick;

pub use decision::DecisionController;
pub use perturb::{Faithful, Perturber, ScrambledPaddle, ScrambledSensor};
pub use physics::SpeedBand;
pub use sensors::{RegionMemory, RegionMemoryTracker, SensorSample};
pub use state::{Ball, Paddle, Region, Session};
pub use tick::tick;

pub use crate::stats::SessionArtifacts;
