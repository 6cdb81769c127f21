//! Versioned CSV artifact writing
//!
//! Each experiment lives in a numbered session folder under a save root
//! (`folder1`, `folder2`, ...). Within a folder, every run appends a new
//! rally artifact `verN.csv`; the currents and hit-rate logs are written
//! alongside. Folder and version management is plain filesystem state, so
//! separate processes can keep appending runs to the same folder.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::stats::{CurrentRow, HitRateSample, RallyEvent, SessionArtifacts};

/// Highest numeric index among entries named `<prefix><N><suffix>`
fn max_index(dir: &Path, prefix: &str, suffix: &str) -> Result<u32> {
    let mut max = 0;
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to list directory: {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if let Some(stem) = name
            .strip_prefix(prefix)
            .and_then(|s| s.strip_suffix(suffix))
        {
            if let Ok(n) = stem.parse::<u32>() {
                max = max.max(n);
            }
        }
    }
    Ok(max)
}

/// Create the next numbered session folder under `root`
pub fn create_session_folder(root: &Path) -> Result<PathBuf> {
    fs::create_dir_all(root)
        .with_context(|| format!("Failed to create save root: {}", root.display()))?;
    let next = max_index(root, "folder", "")? + 1;
    let folder = root.join(format!("folder{next}"));
    fs::create_dir(&folder)
        .with_context(|| format!("Failed to create session folder: {}", folder.display()))?;
    log::info!("Created session folder: {}", folder.display());
    Ok(folder)
}

/// Reuse the newest session folder under `root`, creating `folder1` if none
pub fn latest_or_create_folder(root: &Path) -> Result<PathBuf> {
    fs::create_dir_all(root)
        .with_context(|| format!("Failed to create save root: {}", root.display()))?;
    let latest = max_index(root, "folder", "")?;
    if latest == 0 {
        return create_session_folder(root);
    }
    let folder = root.join(format!("folder{latest}"));
    log::info!("Using session folder: {}", folder.display());
    Ok(folder)
}

/// Path of the next rally artifact (`verN.csv`) within a session folder
pub fn next_version_path(folder: &Path) -> Result<PathBuf> {
    let next = max_index(folder, "ver", ".csv")? + 1;
    Ok(folder.join(format!("ver{next}.csv")))
}

/// All rally artifacts in a folder, ordered by version
pub fn rally_artifacts(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut versions = Vec::new();
    let entries = fs::read_dir(folder)
        .with_context(|| format!("Failed to list session folder: {}", folder.display()))?;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if let Some(stem) = name.strip_prefix("ver").and_then(|s| s.strip_suffix(".csv")) {
            if let Ok(n) = stem.parse::<u32>() {
                versions.push((n, entry.path()));
            }
        }
    }
    versions.sort_by_key(|(n, _)| *n);
    Ok(versions.into_iter().map(|(_, path)| path).collect())
}

/// Write the rally artifact as the folder's next version.
/// A session with zero misses still gets one placeholder row (0, 0).
pub fn write_rally_csv(folder: &Path, events: &[RallyEvent]) -> Result<PathBuf> {
    let path = next_version_path(folder)?;
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create rally artifact: {}", path.display()))?;
    if events.is_empty() {
        writer.serialize(RallyEvent {
            time: 0.0,
            rally_length: 0,
        })?;
    } else {
        for event in events {
            writer.serialize(event)?;
        }
    }
    writer.flush()?;
    log::info!("Rally data saved to {}", path.display());
    Ok(path)
}

/// Read a rally artifact back
pub fn read_rally_csv(path: &Path) -> Result<Vec<RallyEvent>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open rally artifact: {}", path.display()))?;
    let mut events = Vec::new();
    for record in reader.deserialize() {
        let event: RallyEvent =
            record.with_context(|| format!("Malformed row in {}", path.display()))?;
        events.push(event);
    }
    Ok(events)
}

#[derive(Serialize, Deserialize)]
struct CurrentCsvRow {
    time: f64,
    current1: f32,
    current2: f32,
    current3: f32,
}

/// Write the per-tick current log (`time, current1..3` = top, middle, bottom)
pub fn write_currents_csv(folder: &Path, log: &[CurrentRow]) -> Result<PathBuf> {
    let path = folder.join("currents_log.csv");
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create currents log: {}", path.display()))?;
    for row in log {
        let [current1, current2, current3] = row.sample.as_array();
        writer.serialize(CurrentCsvRow {
            time: row.time,
            current1,
            current2,
            current3,
        })?;
    }
    writer.flush()?;
    log::info!("Current data saved to {}", path.display());
    Ok(path)
}

#[derive(Serialize)]
struct HitRateCsvRow<'a> {
    time: f64,
    region: &'a str,
    hit_rate: f64,
}

/// Write the per-miss cumulative hit-rate samples
pub fn write_hit_rate_csv(folder: &Path, samples: &[HitRateSample]) -> Result<PathBuf> {
    let path = folder.join("hit_rates.csv");
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create hit-rate log: {}", path.display()))?;
    for sample in samples {
        writer.serialize(HitRateCsvRow {
            time: sample.time,
            region: sample.region.as_str(),
            hit_rate: sample.hit_rate,
        })?;
    }
    writer.flush()?;
    log::info!("Hit-rate data saved to {}", path.display());
    Ok(path)
}

/// Write every artifact of a finished session into its folder
pub fn write_session_artifacts(folder: &Path, artifacts: &SessionArtifacts) -> Result<PathBuf> {
    let rally_path = write_rally_csv(folder, &artifacts.rally_events)?;
    write_currents_csv(folder, &artifacts.current_log)?;
    write_hit_rate_csv(folder, &artifacts.hit_rate_samples)?;
    Ok(rally_path)
}
