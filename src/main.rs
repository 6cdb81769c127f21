//! Para Pong entry point
//!
//! `run` executes one session and writes its artifacts into a versioned
//! session folder; `analyze` aggregates the rally artifacts of a folder.

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};

use para_pong::analysis::{self, AnalysisOptions};
use para_pong::sim::Session;
use para_pong::{Mode, SessionConfig, persistence};

#[derive(Parser)]
#[command(name = "para-pong")]
#[command(about = "Headless Pong-like sensorimotor experiment", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one session and save its artifacts
    Run {
        /// Root directory holding the numbered session folders
        #[arg(long, default_value = "runs")]
        save_root: PathBuf,

        /// Start a new session folder instead of reusing the latest
        #[arg(long)]
        new_folder: bool,

        /// Experiment mode: faithful, scrambled-paddle, scrambled-sensor
        #[arg(long, default_value = "faithful")]
        mode: String,

        /// RNG seed; random when omitted
        #[arg(long)]
        seed: Option<u64>,

        /// Session duration budget in seconds
        #[arg(long, default_value_t = 100.0)]
        run_time: f64,

        /// Global velocity scale (base speeds are divided by this)
        #[arg(long, default_value_t = 0.5)]
        slow_factor: f32,

        /// Sensor noise amplitude
        #[arg(long, default_value_t = 0.2)]
        noise_factor: f32,
    },

    /// Aggregate the rally artifacts of a session folder
    Analyze {
        /// Session folder containing ver*.csv artifacts
        folder: PathBuf,

        /// Grid length in seconds (the runs' duration)
        #[arg(long, default_value_t = 100)]
        total_time: usize,

        /// Moving-average window for the mean curve
        #[arg(long, default_value_t = 5)]
        mean_smooth: usize,

        /// Moving-average window for the SEM curve
        #[arg(long, default_value_t = 10)]
        sem_smooth: usize,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            save_root,
            new_folder,
            mode,
            seed,
            run_time,
            slow_factor,
            noise_factor,
        } => {
            let mode = Mode::from_str(&mode).ok_or_else(|| anyhow!("unknown mode: {mode}"))?;
            let config = SessionConfig {
                run_time,
                slow_factor,
                noise_factor,
                mode,
                ..Default::default()
            };
            let seed = seed.unwrap_or_else(rand::random);
            run_session(config, seed, &save_root, new_folder)
        }

        Commands::Analyze {
            folder,
            total_time,
            mean_smooth,
            sem_smooth,
        } => {
            let options = AnalysisOptions {
                total_time,
                mean_smooth,
                sem_smooth,
            };
            analyze_folder(&folder, &options)
        }
    }
}

fn run_session(config: SessionConfig, seed: u64, save_root: &Path, new_folder: bool) -> Result<()> {
    let folder = if new_folder {
        persistence::create_session_folder(save_root)?
    } else {
        persistence::latest_or_create_folder(save_root)?
    };

    let session = Session::new(config.clone(), seed);
    let artifacts = session.run_to_completion();

    let rally_path = persistence::write_session_artifacts(&folder, &artifacts)?;
    config.save(&folder.join("config.json"))?;

    println!("Session complete (mode {}, seed {seed})", config.mode.as_str());
    println!("  rallies ended: {}", artifacts.rally_events.len());
    for region in para_pong::sim::Region::ALL {
        let stats = artifacts.region_stats[region.index()];
        match stats.hit_rate() {
            Some(rate) => println!(
                "  {:<6} {}/{} hits ({:.0}%)",
                region.as_str(),
                stats.hits,
                stats.trials,
                rate * 100.0
            ),
            None => println!("  {:<6} no trials", region.as_str()),
        }
    }
    println!("  rally artifact: {}", rally_path.display());
    Ok(())
}

fn analyze_folder(folder: &Path, options: &AnalysisOptions) -> Result<()> {
    let report = analysis::aggregate_folder(folder, options)?;

    let mid = options.total_time / 2;
    let first: f64 = report.smooth_mean[..mid].iter().sum::<f64>() / mid.max(1) as f64;
    let second: f64 =
        report.smooth_mean[mid..].iter().sum::<f64>() / (options.total_time - mid).max(1) as f64;

    println!("Aggregated {} runs over {}s", report.runs, options.total_time);
    println!("  mean rally length, first half:  {first:.3}");
    println!("  mean rally length, second half: {second:.3}");
    println!(
        "  Mann-Whitney U (first < second): U = {:.1}, z = {:.3}, p = {:.7}",
        report.test.u, report.test.z, report.test.p_value
    );
    Ok(())
}
