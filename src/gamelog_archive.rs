use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use log::warn;

use crate::roster::slugify;
use crate::runner::WorkItem;
use crate::stats::model::{cell_to_string, GameLog};

/// What to do with files left over from a previous run. Re-run behavior is
/// exactly this policy, never implicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExistingFilePolicy {
    /// Replace the file.
    Overwrite,
    /// Keep existing rows and add the new ones below them.
    Append,
    /// Leave the file alone and don't fetch the item(s) behind it.
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputLayout {
    /// `<outdir>/<season>/<player_slug>.csv`, one file per player.
    PerPlayer,
    /// `<outdir>/<season>/<season>.csv`, all players of the season appended
    /// into one file.
    Season,
}

/// CSV archive of downloaded game logs. Rows are passed through as returned
/// by the API; the only bookkeeping is the header line. Writers stay open
/// across appends and are flushed by `finish`.
///
/// All writes happen on the collector thread, one writer per file.
pub struct GameLogArchive {
    base_dir: PathBuf,
    layout: OutputLayout,
    if_exists: ExistingFilePolicy,
    files: HashMap<PathBuf, OpenFile>,
}

struct OpenFile {
    writer: csv::Writer<fs::File>,
    headers: Vec<String>,
    header_written: bool,
}

impl GameLogArchive {
    pub fn new(
        base_dir: PathBuf,
        layout: OutputLayout,
        if_exists: ExistingFilePolicy,
    ) -> GameLogArchive {
        GameLogArchive {
            base_dir,
            layout,
            if_exists,
            files: HashMap::new(),
        }
    }

    /// Target file for one work item. Does not check if the file exists.
    pub fn filename(&self, item: &WorkItem) -> PathBuf {
        let season_dir = self.base_dir.join(item.season.to_string());
        match self.layout {
            OutputLayout::PerPlayer => season_dir.join(format!("{}.csv", slugify(&item.player))),
            OutputLayout::Season => season_dir.join(format!("{}.csv", item.season)),
        }
    }

    /// Under the `skip` policy, items whose target file survives from an
    /// earlier run are not fetched again. With the season layout that skips
    /// the whole season once its aggregate file exists.
    pub fn is_already_done(&self, item: &WorkItem) -> bool {
        self.if_exists == ExistingFilePolicy::Skip && self.filename(item).exists()
    }

    /// Append one player's game log to its target file, creating the file
    /// (and the header line) on first use.
    pub fn append(&mut self, item: &WorkItem, log: &GameLog) -> Result<(), Box<dyn Error>> {
        let path = self.filename(item);
        let if_exists = self.if_exists;
        let file = match self.files.entry(path) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(v) => {
                let open = open_file(v.key(), if_exists)?;
                v.insert(open)
            }
        };
        if !file.header_written {
            file.writer.write_record(&log.headers)?;
            file.headers = log.headers.clone();
            file.header_written = true;
        } else if !file.headers.is_empty() && file.headers != log.headers {
            warn!("{}: column headers differ from the file's first player", item);
        }
        for row in &log.rows {
            file.writer.write_record(row.iter().map(cell_to_string))?;
        }
        Ok(())
    }

    /// Flush every open file. Call once after the run.
    pub fn finish(&mut self) -> Result<(), Box<dyn Error>> {
        for file in self.files.values_mut() {
            file.writer.flush()?;
        }
        Ok(())
    }
}

fn open_file(path: &Path, if_exists: ExistingFilePolicy) -> Result<OpenFile, Box<dyn Error>> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    // Resume a non-empty file only under the append policy; the header is
    // already there. Everything else truncates.
    let resume = if_exists == ExistingFilePolicy::Append
        && path.exists()
        && fs::metadata(path)?.len() > 0;
    let file = if resume {
        fs::OpenOptions::new().append(true).open(path)?
    } else {
        fs::File::create(path)?
    };
    Ok(OpenFile {
        writer: csv::Writer::from_writer(file),
        headers: Vec::new(),
        header_written: resume,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::Season;
    use serde_json::json;

    fn item(player: &str, season: i32) -> WorkItem {
        WorkItem {
            player: player.to_string(),
            season: Season(season),
        }
    }

    fn log(player_id: i64, games: usize) -> GameLog {
        let headers = vec![
            "Player_ID".to_string(),
            "GAME_DATE".to_string(),
            "MATCHUP".to_string(),
            "PTS".to_string(),
        ];
        let rows = (0..games)
            .map(|i| {
                vec![
                    json!(player_id),
                    json!(format!("OCT {}, 2022", i + 1)),
                    json!("GSW vs. LAL"),
                    json!(20 + i),
                ]
            })
            .collect();
        GameLog { headers, rows }
    }

    fn data_rows(path: &Path) -> usize {
        let mut rdr = csv::Reader::from_path(path).unwrap();
        rdr.records().count()
    }

    #[test]
    fn per_player_layout() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let mut archive = GameLogArchive::new(
            dir.path().to_path_buf(),
            OutputLayout::PerPlayer,
            ExistingFilePolicy::Overwrite,
        );
        archive.append(&item("Stephen Curry", 2022), &log(201939, 10))?;
        archive.append(&item("Klay Thompson", 2022), &log(202691, 5))?;
        archive.finish()?;

        let a = dir.path().join("2022-23").join("Stephen_Curry.csv");
        let b = dir.path().join("2022-23").join("Klay_Thompson.csv");
        assert_eq!(data_rows(&a), 10);
        assert_eq!(data_rows(&b), 5);
        Ok(())
    }

    #[test]
    fn season_layout_accumulates_players() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let mut archive = GameLogArchive::new(
            dir.path().to_path_buf(),
            OutputLayout::Season,
            ExistingFilePolicy::Overwrite,
        );
        archive.append(&item("A", 2022), &log(1, 10))?;
        archive.append(&item("B", 2022), &log(2, 5))?;
        archive.finish()?;

        let file = dir.path().join("2022-23").join("2022-23.csv");
        assert_eq!(data_rows(&file), 15);
        // header written exactly once
        let text = fs::read_to_string(&file)?;
        assert_eq!(text.matches("Player_ID").count(), 1);
        Ok(())
    }

    #[test]
    fn overwrite_rerun_is_idempotent() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        for _ in 0..2 {
            let mut archive = GameLogArchive::new(
                dir.path().to_path_buf(),
                OutputLayout::PerPlayer,
                ExistingFilePolicy::Overwrite,
            );
            archive.append(&item("A", 2021), &log(1, 7))?;
            archive.finish()?;
        }
        assert_eq!(data_rows(&dir.path().join("2021-22").join("A.csv")), 7);
        Ok(())
    }

    #[test]
    fn append_rerun_adds_rows_without_a_second_header() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        for _ in 0..2 {
            let mut archive = GameLogArchive::new(
                dir.path().to_path_buf(),
                OutputLayout::PerPlayer,
                ExistingFilePolicy::Append,
            );
            archive.append(&item("A", 2021), &log(1, 7))?;
            archive.finish()?;
        }
        let file = dir.path().join("2021-22").join("A.csv");
        assert_eq!(data_rows(&file), 14);
        let text = fs::read_to_string(&file)?;
        assert_eq!(text.matches("Player_ID").count(), 1);
        Ok(())
    }

    #[test]
    fn skip_policy_marks_existing_files_done() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let mut archive = GameLogArchive::new(
            dir.path().to_path_buf(),
            OutputLayout::PerPlayer,
            ExistingFilePolicy::Skip,
        );
        let it = item("A", 2020);
        assert!(!archive.is_already_done(&it));
        archive.append(&it, &log(1, 3))?;
        archive.finish()?;
        assert!(archive.is_already_done(&it));
        Ok(())
    }
}
