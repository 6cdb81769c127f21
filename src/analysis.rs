//! Cross-run rally-length aggregation
//!
//! Consumes the rally artifacts of one session folder: each sparse
//! (time, rally_length) sequence is step-held onto a uniform one-second
//! grid, runs are averaged into mean and SEM curves, both are smoothed, and
//! a one-sided rank test asks whether rally length improved from the first
//! half of the session to the second.

use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::persistence;
use crate::stats::RallyEvent;

/// Aggregation parameters
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Length of the uniform grid in seconds (the session duration)
    pub total_time: usize,
    /// Moving-average window for the mean curve
    pub mean_smooth: usize,
    /// Moving-average window for the SEM curve
    pub sem_smooth: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            total_time: 100,
            mean_smooth: 5,
            sem_smooth: 10,
        }
    }
}

/// One-sided Mann-Whitney U result (alternative: first half < second half)
#[derive(Debug, Clone, Copy)]
pub struct RankTest {
    /// U statistic of the first sample
    pub u: f64,
    /// Normal-approximation z score (tie-corrected, continuity-corrected)
    pub z: f64,
    pub p_value: f64,
}

/// Aggregated curves plus the improvement test
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub runs: usize,
    pub mean: Vec<f64>,
    pub sem: Vec<f64>,
    pub smooth_mean: Vec<f64>,
    pub smooth_sem: Vec<f64>,
    pub test: RankTest,
}

/// Step-hold a sparse event sequence onto a one-second grid: 0 before the
/// first event, then carry the last known rally length forward.
pub fn step_hold_resample(events: &[RallyEvent], total_time: usize) -> Vec<f64> {
    let mut series = vec![0.0; total_time];
    let mut last = 0.0;
    let mut idx = 0;
    for (sec, slot) in series.iter_mut().enumerate() {
        while idx < events.len() && events[idx].time <= sec as f64 {
            last = f64::from(events[idx].rally_length);
            idx += 1;
        }
        *slot = last;
    }
    series
}

/// Per-second mean and standard error of the mean across runs
pub fn mean_sem(runs: &[Vec<f64>]) -> (Vec<f64>, Vec<f64>) {
    let n = runs.len();
    let len = runs.first().map_or(0, Vec::len);
    let mut mean = vec![0.0; len];
    let mut sem = vec![0.0; len];
    for sec in 0..len {
        let sum: f64 = runs.iter().map(|run| run[sec]).sum();
        let mu = sum / n as f64;
        let var: f64 = runs.iter().map(|run| (run[sec] - mu).powi(2)).sum::<f64>() / n as f64;
        mean[sec] = mu;
        sem[sec] = var.sqrt() / (n as f64).sqrt();
    }
    (mean, sem)
}

/// Centered moving average; the window is truncated at the edges
pub fn moving_average(xs: &[f64], window: usize) -> Vec<f64> {
    if window <= 1 || xs.is_empty() {
        return xs.to_vec();
    }
    let half = window / 2;
    let mut out = Vec::with_capacity(xs.len());
    for i in 0..xs.len() {
        let lo = i.saturating_sub(half);
        let hi = (i + half).min(xs.len() - 1);
        let sum: f64 = xs[lo..=hi].iter().sum();
        out.push(sum / (hi - lo + 1) as f64);
    }
    out
}

/// Average ranks (1-based) of the combined sample, ties shared
fn ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|a, b| values[*a].total_cmp(&values[*b]));

    let mut result = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // positions i..=j share the average of ranks i+1..=j+1
        let shared = (i + j + 2) as f64 / 2.0;
        for k in i..=j {
            result[order[k]] = shared;
        }
        i = j + 1;
    }
    result
}

/// Standard normal CDF via the Abramowitz-Stegun erf approximation
fn normal_cdf(z: f64) -> f64 {
    let x = z / std::f64::consts::SQRT_2;
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + 0.3275911 * x);
    let poly = t
        * (0.254829592
            + t * (-0.284496736 + t * (1.421413741 + t * (-1.453152027 + t * 1.061405429))));
    let erf = sign * (1.0 - poly * (-x * x).exp());
    0.5 * (1.0 + erf)
}

/// One-sided Mann-Whitney U test, alternative: `a` stochastically less
/// than `b`. Normal approximation with tie correction and continuity
/// correction; a fully tied sample degenerates to p = 0.5.
pub fn mann_whitney_u_less(a: &[f64], b: &[f64]) -> RankTest {
    let n1 = a.len() as f64;
    let n2 = b.len() as f64;
    let n = n1 + n2;

    let combined: Vec<f64> = a.iter().chain(b.iter()).copied().collect();
    let ranked = ranks(&combined);
    let r1: f64 = ranked[..a.len()].iter().sum();
    let u1 = r1 - n1 * (n1 + 1.0) / 2.0;

    // tie correction over rank groups
    let mut sorted = combined.clone();
    sorted.sort_by(f64::total_cmp);
    let mut tie_sum = 0.0;
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i;
        while j + 1 < sorted.len() && sorted[j + 1] == sorted[i] {
            j += 1;
        }
        let t = (j - i + 1) as f64;
        tie_sum += t * t * t - t;
        i = j + 1;
    }

    let mu = n1 * n2 / 2.0;
    let var = n1 * n2 / 12.0 * ((n + 1.0) - tie_sum / (n * (n - 1.0)));
    if var.is_nan() || var <= 0.0 {
        // every value tied (or an empty sample): no ordering information
        return RankTest {
            u: u1,
            z: 0.0,
            p_value: 0.5,
        };
    }
    let z = (u1 - mu + 0.5) / var.sqrt();
    RankTest {
        u: u1,
        z,
        p_value: normal_cdf(z),
    }
}

/// Load every rally artifact in `folder`, aggregate, and test for
/// improvement over the session. Zero artifacts is an error reported to the
/// operator before any aggregation starts.
pub fn aggregate_folder(folder: &Path, options: &AnalysisOptions) -> Result<AnalysisReport> {
    let paths = persistence::rally_artifacts(folder)?;
    if paths.is_empty() {
        bail!("no rally artifacts (ver*.csv) found in {}", folder.display());
    }

    let mut runs = Vec::with_capacity(paths.len());
    for path in &paths {
        let events = persistence::read_rally_csv(path)
            .with_context(|| format!("Failed to load run: {}", path.display()))?;
        runs.push(step_hold_resample(&events, options.total_time));
    }
    log::info!("Aggregating {} runs from {}", runs.len(), folder.display());

    let (mean, sem) = mean_sem(&runs);
    let smooth_mean = moving_average(&mean, options.mean_smooth);
    let smooth_sem = moving_average(&sem, options.sem_smooth);

    let mid = options.total_time / 2;
    let test = mann_whitney_u_less(&smooth_mean[..mid], &smooth_mean[mid..]);

    Ok(AnalysisReport {
        runs: runs.len(),
        mean,
        sem,
        smooth_mean,
        smooth_sem,
        test,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(time: f64, rally_length: u32) -> RallyEvent {
        RallyEvent { time, rally_length }
    }

    #[test]
    fn test_step_hold_carries_last_value() {
        let events = [event(2.0, 3), event(5.0, 1)];
        let series = step_hold_resample(&events, 8);
        assert_eq!(series, vec![0.0, 0.0, 3.0, 3.0, 3.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_step_hold_empty_events() {
        assert_eq!(step_hold_resample(&[], 4), vec![0.0; 4]);
    }

    #[test]
    fn test_step_hold_event_after_grid_is_ignored() {
        let events = [event(10.0, 5)];
        assert_eq!(step_hold_resample(&events, 4), vec![0.0; 4]);
    }

    #[test]
    fn test_mean_sem_known_values() {
        let runs = vec![vec![0.0, 2.0], vec![2.0, 2.0]];
        let (mean, sem) = mean_sem(&runs);
        assert_eq!(mean, vec![1.0, 2.0]);
        assert!((sem[0] - 1.0 / 2.0f64.sqrt()).abs() < 1e-12);
        assert_eq!(sem[1], 0.0);
    }

    #[test]
    fn test_moving_average_window() {
        let smoothed = moving_average(&[0.0, 0.0, 3.0, 0.0, 0.0], 3);
        assert_eq!(smoothed, vec![0.0, 1.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_moving_average_window_one_is_identity() {
        let xs = [1.0, 5.0, 2.0];
        assert_eq!(moving_average(&xs, 1), xs.to_vec());
    }

    #[test]
    fn test_ranks_with_ties() {
        let r = ranks(&[10.0, 20.0, 20.0, 30.0]);
        assert_eq!(r, vec![1.0, 2.5, 2.5, 4.0]);
    }

    #[test]
    fn test_mann_whitney_detects_improvement() {
        let first = [1.0, 2.0, 3.0, 2.0, 1.0];
        let second = [4.0, 5.0, 6.0, 5.0, 4.0];
        let test = mann_whitney_u_less(&first, &second);
        assert_eq!(test.u, 0.0);
        assert!(test.p_value < 0.05, "p = {}", test.p_value);
    }

    #[test]
    fn test_mann_whitney_reversed_is_near_one() {
        let first = [4.0, 5.0, 6.0];
        let second = [1.0, 2.0, 3.0];
        let test = mann_whitney_u_less(&first, &second);
        assert!(test.p_value > 0.9, "p = {}", test.p_value);
    }

    #[test]
    fn test_mann_whitney_all_tied_degenerates() {
        let test = mann_whitney_u_less(&[2.0, 2.0], &[2.0, 2.0]);
        assert_eq!(test.p_value, 0.5);
        assert_eq!(test.z, 0.0);
    }

    #[test]
    fn test_normal_cdf_reference_points() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-7);
        assert!((normal_cdf(1.96) - 0.975).abs() < 1e-3);
        assert!((normal_cdf(-1.96) - 0.025).abs() < 1e-3);
    }

    #[test]
    fn test_aggregate_empty_folder_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = aggregate_folder(dir.path(), &AnalysisOptions::default()).unwrap_err();
        assert!(err.to_string().contains("no rally artifacts"));
    }

    #[test]
    fn test_aggregate_two_runs() {
        let dir = tempfile::tempdir().unwrap();
        let folder = persistence::create_session_folder(dir.path()).unwrap();
        persistence::write_rally_csv(&folder, &[event(1.0, 1), event(6.0, 4)]).unwrap();
        persistence::write_rally_csv(&folder, &[event(2.0, 2), event(7.0, 6)]).unwrap();

        let options = AnalysisOptions {
            total_time: 10,
            mean_smooth: 1,
            sem_smooth: 1,
        };
        let report = aggregate_folder(&folder, &options).unwrap();
        assert_eq!(report.runs, 2);
        assert_eq!(report.mean.len(), 10);
        // rallies lengthen over the runs, so the one-sided test leans small
        assert!(report.test.p_value < 0.5);
        assert!((0.0..=1.0).contains(&report.test.p_value));
    }
}
