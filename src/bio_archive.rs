use std::error::Error;
use std::fs;
use std::path::PathBuf;

use log::warn;

use crate::roster::slugify;
use crate::stats::model::{cell_to_string, ResultSet};

/// Output of the bio job: one master CSV accumulating a CommonPlayerInfo
/// row per player, plus (optionally) the raw JSON body per player under
/// `raw/`. The master file is rewritten on every run.
pub struct PlayerBioArchive {
    base_dir: PathBuf,
    save_raw: bool,
    master: Option<Master>,
}

struct Master {
    writer: csv::Writer<fs::File>,
    headers: Vec<String>,
}

impl PlayerBioArchive {
    pub fn new(base_dir: PathBuf, save_raw: bool) -> PlayerBioArchive {
        PlayerBioArchive {
            base_dir,
            save_raw,
            master: None,
        }
    }

    pub fn master_path(&self) -> PathBuf {
        self.base_dir.join("player_bio_master.csv")
    }

    pub fn raw_path(&self, player: &str) -> PathBuf {
        self.base_dir
            .join("raw")
            .join(format!("{}.json", slugify(player)))
    }

    /// Add one player's bio to the master file (and the raw JSON next to it
    /// when enabled). Column headers come from the first player's result
    /// set, passthrough like everything else.
    pub fn append(
        &mut self,
        player: &str,
        info: &ResultSet,
        raw_body: &str,
    ) -> Result<(), Box<dyn Error>> {
        if self.save_raw {
            let path = self.raw_path(player);
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)?;
            }
            fs::write(path, raw_body)?;
        }
        if self.master.is_none() {
            fs::create_dir_all(&self.base_dir)?;
            let mut writer = csv::Writer::from_path(self.master_path())?;
            writer.write_record(&info.headers)?;
            self.master = Some(Master {
                writer,
                headers: info.headers.clone(),
            });
        }
        if let Some(master) = self.master.as_mut() {
            if master.headers != info.headers {
                warn!("{}: bio columns differ from the master file", player);
            }
            for row in &info.row_set {
                master.writer.write_record(row.iter().map(cell_to_string))?;
            }
        }
        Ok(())
    }

    pub fn finish(&mut self) -> Result<(), Box<dyn Error>> {
        if let Some(master) = self.master.as_mut() {
            master.writer.flush()?;
        }
        Ok(())
    }
}
