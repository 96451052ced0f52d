use std::error::Error;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use log::{error, info};

use boxout::bio_archive::PlayerBioArchive;
use boxout::progress::ConsoleProgress;
use boxout::retry::{with_retry, RetryPolicy};
use boxout::roster::{self, Season};
use boxout::runner::{self, RunnerConfig};
use boxout::stats::{FetchError, StatsClient, DEFAULT_BASE_URL};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Roster file; every non-header line is a player name
    roster_file: PathBuf,

    /// Output directory for the master CSV and raw JSON
    #[arg(long, default_value = "player_bios")]
    outdir: PathBuf,

    /// Concurrent worker threads
    #[arg(long = "max_workers", default_value_t = 8)]
    max_workers: usize,

    /// Seconds each worker sleeps after every one of its requests
    #[arg(long = "rate_limit", default_value_t = 1.0)]
    rate_limit: f64,

    /// Attempts per player before it is recorded as failed
    #[arg(long = "max_attempts", default_value_t = 3)]
    max_attempts: u32,

    /// Base backoff in seconds, doubled on every retry
    #[arg(long, default_value_t = 5.0)]
    backoff: f64,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 6.0)]
    timeout: f64,

    /// Also keep the raw CommonPlayerInfo JSON per player under raw/
    #[arg(long = "save_raw")]
    save_raw: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();
    dotenvy::dotenv().ok();

    if args.rate_limit < 0.0 || args.backoff < 0.0 || args.timeout <= 0.0 {
        return Err("rate_limit and backoff must be >= 0, timeout > 0".into());
    }

    std::fs::create_dir_all(&args.outdir)?;

    let players = roster::parse_names(&args.roster_file)?;
    info!("{} distinct players in {}", players.len(), args.roster_file.display());

    let base_url =
        std::env::var("STATS_API_BASE").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    let client = StatsClient::new(base_url, Duration::from_secs_f64(args.timeout))?;
    let retry = RetryPolicy {
        max_attempts: args.max_attempts,
        backoff: Duration::from_secs_f64(args.backoff),
    };

    // the index is the same whatever season is passed; use the newest one
    // mentioned in the file, if any
    let rosters = roster::parse_roster(&args.roster_file).unwrap_or_default();
    let index_season = rosters
        .iter()
        .map(|r| r.season)
        .max()
        .unwrap_or(Season(2024));
    info!("resolving player ids ...");
    let index = with_retry(&retry, "player index", || client.player_index(index_season))?;
    info!("loaded {} players from the stats index", index.len());

    let mut archive = PlayerBioArchive::new(args.outdir.clone(), args.save_raw);
    let config = RunnerConfig {
        max_workers: args.max_workers,
        rate_limit: Duration::from_secs_f64(args.rate_limit),
        retry,
    };
    let mut progress = ConsoleProgress::new();
    let summary = runner::run(
        &players,
        &config,
        |player| {
            let pid = index
                .find(player)
                .ok_or_else(|| FetchError::PlayerNotFound(player.clone()))?;
            client.common_player_info(pid)
        },
        |player, (info, raw)| archive.append(player, &info, &raw),
        &mut progress,
    );
    archive.finish()?;

    info!(
        "{} succeeded, {} failed",
        summary.succeeded,
        summary.failed.len()
    );
    if !summary.all_ok() {
        for f in &summary.failed {
            error!("{}: {}", f.item, f.reason);
        }
        let report = args.outdir.join("failed_bio.txt");
        summary.write_report(&report)?;
        info!("failure report written to {}", report.display());
        process::exit(1);
    }
    info!("bios saved to {}", archive.master_path().display());
    Ok(())
}
