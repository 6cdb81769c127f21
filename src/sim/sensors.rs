//! Sensor currents: background noise plus region-gated memory
//!
//! Each of the three sensors normally reads a deterministic-plus-jitter
//! background current. The sensor whose region contains the ball instead
//! reads that region's response function, driven by a per-region memory that
//! freezes while the region is inactive and resumes accumulating, without
//! reset, when it reactivates.

use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::state::Region;
use crate::consts::*;

/// Ordered instantaneous current readings (Top, Middle, Bottom)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    pub top: f32,
    pub middle: f32,
    pub bottom: f32,
}

impl SensorSample {
    pub fn get(&self, region: Region) -> f32 {
        match region {
            Region::Top => self.top,
            Region::Middle => self.middle,
            Region::Bottom => self.bottom,
        }
    }

    /// Column order of the currents log: (top, middle, bottom)
    pub fn as_array(&self) -> [f32; 3] {
        [self.top, self.middle, self.bottom]
    }
}

/// Background current for one sensor: three fixed sinusoids with
/// index-dependent phase, small uniform jitter, double-clipped around the
/// baseline. Stateless apart from the shared session RNG.
pub fn background_current(t: f64, sensor_idx: usize, noise_amplitude: f32, rng: &mut Pcg32) -> f32 {
    let t = t as f32;
    let i = sensor_idx as f32;
    let mut s = 0.5 * (0.15 * t + 1.3 * i).sin()
        + 0.3 * (0.90 * t + 0.7 * i).sin()
        + 0.2 * (2.40 * t + 0.9 * i).sin();
    s += rng.random_range(-0.05..0.05);
    s = s.clamp(-1.0, 1.0);
    let val = SENSOR_BASELINE + noise_amplitude * s;
    val.clamp(
        SENSOR_BASELINE - noise_amplitude,
        SENSOR_BASELINE + noise_amplitude,
    )
}

/// Per-region response function of accumulated active time
pub type ResponseFn = fn(f32) -> f32;

/// Constant response; the tracker is pluggable for non-constant ones
fn constant_response(_elapsed: f32) -> f32 {
    REGION_BASELINE
}

/// Activity phase of one region's memory
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MemoryPhase {
    Inactive,
    Active { last_update: f64 },
}

/// Memory state for one region.
///
/// `elapsed` accumulates active wall-clock time across activations: it is
/// frozen on deactivation and never reset, so reactivation resumes additively
/// from the frozen value. `cached` holds the last response value (stale-hold
/// while inactive).
#[derive(Debug, Clone)]
pub struct RegionMemory {
    phase: MemoryPhase,
    elapsed: f64,
    cached: Option<f32>,
}

impl RegionMemory {
    fn new() -> Self {
        Self {
            phase: MemoryPhase::Inactive,
            elapsed: 0.0,
            cached: None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, MemoryPhase::Active { .. })
    }

    /// Accumulated active time, frozen while inactive
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Last response value, held while inactive; None before first activation
    pub fn cached(&self) -> Option<f32> {
        self.cached
    }

    /// Inactive -> Active. The first-ever activation seeds the cached value
    /// at response(0); reactivation only restarts the update clock, leaving
    /// `elapsed` to resume from its frozen value.
    fn activate(&mut self, now: f64, response: ResponseFn) {
        if self.cached.is_none() {
            self.elapsed = 0.0;
            self.cached = Some(response(0.0));
        }
        self.phase = MemoryPhase::Active { last_update: now };
    }

    /// Advance an active memory by the wall-clock delta since the previous
    /// tick and recompute the cached response value.
    fn advance(&mut self, now: f64, response: ResponseFn) -> f32 {
        if let MemoryPhase::Active { last_update } = self.phase {
            self.elapsed += now - last_update;
            self.phase = MemoryPhase::Active { last_update: now };
        }
        let value = response(self.elapsed as f32);
        self.cached = Some(value);
        value
    }

    /// Active -> Inactive: freeze elapsed time and cached value
    fn deactivate(&mut self) {
        self.phase = MemoryPhase::Inactive;
    }
}

/// Per-region memory state machines plus the background generator,
/// producing one `SensorSample` per tick
pub struct RegionMemoryTracker {
    memories: [RegionMemory; 3],
    responses: [ResponseFn; 3],
}

impl RegionMemoryTracker {
    pub fn new() -> Self {
        Self::with_responses([constant_response; 3])
    }

    pub fn with_responses(responses: [ResponseFn; 3]) -> Self {
        Self {
            memories: [RegionMemory::new(), RegionMemory::new(), RegionMemory::new()],
            responses,
        }
    }

    pub fn memory(&self, region: Region) -> &RegionMemory {
        &self.memories[region.index()]
    }

    /// Advance all three memories for this tick and produce the sample:
    /// the active region's slot reads its tracked response, inactive slots
    /// read background noise.
    pub fn sample(
        &mut self,
        now: f64,
        active: Region,
        noise_amplitude: f32,
        rng: &mut Pcg32,
    ) -> SensorSample {
        let mut values = [0.0f32; 3];
        for (idx, value) in values.iter_mut().enumerate() {
            *value = background_current(now, idx, noise_amplitude, rng);
        }

        for region in Region::ALL {
            let idx = region.index();
            let response = self.responses[idx];
            let memory = &mut self.memories[idx];
            if region == active {
                if !memory.is_active() {
                    memory.activate(now, response);
                }
                values[idx] = memory.advance(now, response);
            } else {
                memory.deactivate();
            }
        }

        SensorSample {
            top: values[0],
            middle: values[1],
            bottom: values[2],
        }
    }
}

impl Default for RegionMemoryTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> Pcg32 {
        Pcg32::seed_from_u64(42)
    }

    #[test]
    fn test_background_current_bounded() {
        let mut rng = rng();
        for step in 0..1000 {
            let t = step as f64 * 0.05;
            for idx in 0..3 {
                let val = background_current(t, idx, 0.2, &mut rng);
                assert!(val >= SENSOR_BASELINE - 0.2);
                assert!(val <= SENSOR_BASELINE + 0.2);
            }
        }
    }

    #[test]
    fn test_active_slot_reads_response() {
        let mut tracker = RegionMemoryTracker::new();
        let sample = tracker.sample(0.1, Region::Top, 0.2, &mut rng());
        assert_eq!(sample.top, REGION_BASELINE);
        // inactive slots stay near the background baseline
        assert!((sample.middle - SENSOR_BASELINE).abs() <= 0.2);
        assert!((sample.bottom - SENSOR_BASELINE).abs() <= 0.2);
    }

    #[test]
    fn test_exactly_one_slot_active() {
        let mut tracker = RegionMemoryTracker::new();
        let mut rng = rng();
        for step in 0..200 {
            let region = Region::ALL[step % 3];
            tracker.sample(step as f64 * 0.01, region, 0.2, &mut rng);
            let active = Region::ALL
                .iter()
                .filter(|r| tracker.memory(**r).is_active())
                .count();
            assert_eq!(active, 1);
        }
    }

    #[test]
    fn test_elapsed_accumulates_while_active() {
        let mut tracker = RegionMemoryTracker::new();
        let mut rng = rng();
        for step in 1..=10 {
            tracker.sample(step as f64 * 0.1, Region::Middle, 0.2, &mut rng);
        }
        // first activation contributes 0, then nine 0.1s deltas
        let elapsed = tracker.memory(Region::Middle).elapsed();
        assert!((elapsed - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_freeze_and_resume_without_reset() {
        let mut tracker = RegionMemoryTracker::new();
        let mut rng = rng();

        // active for 1.0s of deltas
        for step in 0..=10 {
            tracker.sample(step as f64 * 0.1, Region::Top, 0.2, &mut rng);
        }
        let frozen = tracker.memory(Region::Top).elapsed();
        assert!((frozen - 1.0).abs() < 1e-9);

        // inactive for a while: elapsed frozen, cached held
        for step in 11..=20 {
            tracker.sample(step as f64 * 0.1, Region::Bottom, 0.2, &mut rng);
        }
        assert!(!tracker.memory(Region::Top).is_active());
        assert_eq!(tracker.memory(Region::Top).elapsed(), frozen);
        assert_eq!(tracker.memory(Region::Top).cached(), Some(REGION_BASELINE));

        // reactivation resumes additively, with no jump for the gap
        tracker.sample(2.1, Region::Top, 0.2, &mut rng);
        assert_eq!(tracker.memory(Region::Top).elapsed(), frozen);
        tracker.sample(2.2, Region::Top, 0.2, &mut rng);
        let resumed = tracker.memory(Region::Top).elapsed();
        assert!((resumed - (frozen + 0.1)).abs() < 1e-9);
    }

    #[test]
    fn test_non_constant_response_sees_accumulated_time() {
        fn ramp(elapsed: f32) -> f32 {
            REGION_BASELINE + elapsed
        }
        let mut tracker = RegionMemoryTracker::with_responses([ramp; 3]);
        let mut rng = rng();
        for step in 0..=10 {
            tracker.sample(step as f64 * 0.1, Region::Top, 0.2, &mut rng);
        }
        let sample = tracker.sample(1.1, Region::Top, 0.2, &mut rng);
        assert!((sample.top - (REGION_BASELINE + 1.1)).abs() < 1e-4);
    }
}
