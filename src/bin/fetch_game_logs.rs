use std::collections::HashSet;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use log::{error, info, warn};

use boxout::gamelog_archive::{ExistingFilePolicy, GameLogArchive, OutputLayout};
use boxout::progress::ConsoleProgress;
use boxout::retry::{with_retry, RetryPolicy};
use boxout::roster::{self, Season, SeasonRoster};
use boxout::runner::{self, RunnerConfig, WorkItem};
use boxout::stats::{FetchError, SeasonType, StatsClient, DEFAULT_BASE_URL};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Roster file: 'Season: YYYY-YY' headers followed by player names
    roster_file: PathBuf,

    /// Root output directory
    #[arg(long, default_value = "player_logs")]
    outdir: PathBuf,

    /// Concurrent worker threads
    #[arg(long = "max_workers", default_value_t = 6)]
    max_workers: usize,

    /// Seconds each worker sleeps after every one of its requests
    #[arg(long = "rate_limit", default_value_t = 0.75)]
    rate_limit: f64,

    /// Regular season or playoffs
    #[arg(long = "season_type", value_enum, default_value = "regular")]
    season_type: SeasonType,

    /// One CSV per player, or one aggregate CSV per season
    #[arg(long, value_enum, default_value = "per-player")]
    layout: OutputLayout,

    /// What to do with files left over from a previous run
    #[arg(long = "if_exists", value_enum, default_value = "overwrite")]
    if_exists: ExistingFilePolicy,

    /// Attempts per item before it is recorded as failed
    #[arg(long = "max_attempts", default_value_t = 3)]
    max_attempts: u32,

    /// Base backoff in seconds, doubled on every retry
    #[arg(long, default_value_t = 5.0)]
    backoff: f64,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 3.0)]
    timeout: f64,

    /// Only fetch these seasons, e.g. 2022-23,2021-22
    #[arg(long)]
    seasons: Option<String>,
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

    let mut rosters = roster::parse_roster(&args.roster_file)?;
    // A flat player list (no 'Season:' headers) works too, as long as the
    // seasons come from --seasons.
    if rosters.is_empty() {
        if let Some(filter) = &args.seasons {
            let players = roster::parse_names(&args.roster_file)?;
            rosters = filter
                .split(',')
                .map(|s| {
                    s.trim().parse::<Season>().map(|season| SeasonRoster {
                        season,
                        players: players.clone(),
                    })
                })
                .collect::<Result<_, _>>()?;
        }
    }
    roster::sort_newest_first(&mut rosters);
    if let Some(filter) = &args.seasons {
        let wanted: HashSet<Season> = filter
            .split(',')
            .map(|s| s.trim().parse())
            .collect::<Result<_, _>>()?;
        rosters.retain(|r| wanted.contains(&r.season));
    }
    if rosters.is_empty() {
        warn!("no seasons to fetch");
        return Ok(());
    }

    fs::create_dir_all(&args.outdir)?;

    let base_url =
        std::env::var("STATS_API_BASE").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    let client = StatsClient::new(base_url, Duration::from_secs_f64(args.timeout))?;
    let retry = RetryPolicy {
        max_attempts: args.max_attempts,
        backoff: Duration::from_secs_f64(args.backoff),
    };

    info!("resolving player ids ...");
    let index = with_retry(&retry, "player index", || {
        client.player_index(rosters[0].season)
    })?;
    info!("loaded {} players from the stats index", index.len());

    let mut archive = GameLogArchive::new(args.outdir.clone(), args.layout, args.if_exists);

    let mut items: Vec<WorkItem> = Vec::new();
    let mut skipped = 0;
    for r in &rosters {
        for player in &r.players {
            let item = WorkItem {
                player: player.clone(),
                season: r.season,
            };
            if archive.is_already_done(&item) {
                skipped += 1;
            } else {
                items.push(item);
            }
        }
    }
    if skipped > 0 {
        info!("skipping {} items with existing files", skipped);
    }
    info!(
        "{} game logs to fetch across {} seasons",
        items.len(),
        rosters.len()
    );

    let config = RunnerConfig {
        max_workers: args.max_workers,
        rate_limit: Duration::from_secs_f64(args.rate_limit),
        retry,
    };
    let mut progress = ConsoleProgress::new();
    let summary = runner::run(
        &items,
        &config,
        |item| {
            let pid = index
                .find(&item.player)
                .ok_or_else(|| FetchError::PlayerNotFound(item.player.clone()))?;
            client.player_game_log(pid, item.season, args.season_type)
        },
        |item, log| archive.append(item, &log),
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
        let report = args.outdir.join("failed_game_logs.txt");
        summary.write_report(&report)?;
        info!("failure report written to {}", report.display());
        process::exit(1);
    }
    info!(
        "game logs saved under {}",
        fs::canonicalize(&args.outdir)?.display()
    );
    Ok(())
}
