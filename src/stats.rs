//! Session statistics: hit/trial counters, rally log, current log
//!
//! The recorder is the single owner of everything the session measures. Two
//! cadences feed it: the current log advances every tick, the rally/hit-rate
//! sequences advance only on paddle events. `finalize` hands all artifacts
//! to the persistence layer, valid even for a session with zero misses.

use serde::{Deserialize, Serialize};

use crate::sim::sensors::SensorSample;
use crate::sim::state::Region;

/// Lifetime-cumulative hit/trial counts for one region (never reset
/// mid-session)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialStats {
    pub hits: u32,
    pub trials: u32,
}

impl TrialStats {
    /// hits/trials, or None for a region that has no trials yet
    pub fn hit_rate(&self) -> Option<f64> {
        (self.trials > 0).then(|| f64::from(self.hits) / f64::from(self.trials))
    }
}

/// One rally that ended in a miss: length counts consecutive paddle hits
/// since the previous miss (or session start)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RallyEvent {
    pub time: f64,
    pub rally_length: u32,
}

/// Cumulative hit-rate for one region, sampled at a miss
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HitRateSample {
    pub time: f64,
    pub region: Region,
    pub hit_rate: f64,
}

/// One row of the per-tick current log
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentRow {
    pub time: f64,
    pub sample: SensorSample,
}

/// Everything a finished session hands to the persistence gateway
#[derive(Debug, Clone)]
pub struct SessionArtifacts {
    pub region_stats: [TrialStats; 3],
    pub rally_events: Vec<RallyEvent>,
    pub hit_rate_samples: Vec<HitRateSample>,
    pub current_log: Vec<CurrentRow>,
}

/// Accumulates all session statistics
#[derive(Debug, Default)]
pub struct StatisticsRecorder {
    score: u32,
    rally: u32,
    region_stats: [TrialStats; 3],
    rally_events: Vec<RallyEvent>,
    hit_rate_samples: Vec<HitRateSample>,
    current_log: Vec<CurrentRow>,
}

impl StatisticsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    /// Consecutive paddle hits since the last miss
    pub fn rally(&self) -> u32 {
        self.rally
    }

    pub fn stats(&self, region: Region) -> TrialStats {
        self.region_stats[region.index()]
    }

    pub fn rally_events(&self) -> &[RallyEvent] {
        &self.rally_events
    }

    pub fn current_log(&self) -> &[CurrentRow] {
        &self.current_log
    }

    /// Append one row to the per-tick current log (unconditional, every tick)
    pub fn log_sample(&mut self, time: f64, sample: SensorSample) {
        self.current_log.push(CurrentRow { time, sample });
    }

    /// Paddle hit in `region`: score, rally, and the region's counters advance
    pub fn record_hit(&mut self, region: Region) {
        self.score += 1;
        self.rally += 1;
        let stats = &mut self.region_stats[region.index()];
        stats.hits += 1;
        stats.trials += 1;
    }

    /// Miss while the ball was in `region`: the region's trial count advances,
    /// the ended rally is logged, cumulative hit-rates are sampled for every
    /// region that has trials, and score/rally reset.
    pub fn record_miss(&mut self, region: Region, time: f64) {
        self.region_stats[region.index()].trials += 1;

        self.rally_events.push(RallyEvent {
            time,
            rally_length: self.rally,
        });
        self.rally = 0;
        self.score = 0;

        for r in Region::ALL {
            // trial-less regions emit no sample: a rate of 0/0 never appears
            if let Some(rate) = self.region_stats[r.index()].hit_rate() {
                self.hit_rate_samples.push(HitRateSample {
                    time,
                    region: r,
                    hit_rate: rate,
                });
            }
        }
    }

    /// Hand over all artifacts; empty-but-valid when nothing happened
    pub fn finalize(self) -> SessionArtifacts {
        SessionArtifacts {
            region_stats: self.region_stats,
            rally_events: self.rally_events,
            hit_rate_samples: self.hit_rate_samples,
            current_log: self.current_log,
        }
    }
}
