//! JSON Lines reading store
//!
//! Readings are appended to `raw-NNNNNN.jsonl` files in the data directory,
//! one JSON object per line. A new file is started after
//! `max_records_per_file` readings, and housekeeping keeps only the newest
//! `max_files_to_keep` files. `live.json` always holds the latest reading.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::Collaborators;
use crate::config::StorageConfig;
use crate::error::Result;
use crate::radio::protocol::SensorReading;

const FILE_PREFIX: &str = "raw-";
const FILE_SUFFIX: &str = ".jsonl";
const LIVE_FILE: &str = "live.json";

/// One stored line
#[derive(Debug, Serialize)]
struct StoredRecord<'a> {
    timestamp: DateTime<Utc>,
    #[serde(flatten)]
    record: &'a SensorReading,
}

/// Rotating JSONL file store
#[derive(Debug)]
pub struct JsonlStore {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    records_in_file: usize,
    next_index: u64,
}

impl JsonlStore {
    /// Open the store, creating the data directory if needed
    ///
    /// Numbering continues after the highest existing file, so restarts
    /// never append to an old file.
    pub fn open(config: &StorageConfig) -> Result<Self> {
        let dir = PathBuf::from(&config.data_dir);
        fs::create_dir_all(&dir)?;

        let next_index = list_files(&dir)?
            .last()
            .map(|(index, _)| index + 1)
            .unwrap_or(0);

        info!("Storing readings in {}", dir.display());

        Ok(Self {
            dir,
            max_records_per_file: config.max_records_per_file,
            max_files_to_keep: config.max_files_to_keep,
            writer: None,
            records_in_file: 0,
            next_index,
        })
    }

    /// Paths of the stored files, oldest first
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        Ok(list_files(&self.dir)?.into_iter().map(|(_, path)| path).collect())
    }

    fn rotate(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        let path = self.dir.join(format!("{}{:06}{}", FILE_PREFIX, self.next_index, FILE_SUFFIX));
        debug!("Starting {}", path.display());

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        self.writer = Some(BufWriter::new(file));
        self.records_in_file = 0;
        self.next_index += 1;
        Ok(())
    }

    fn prune(&self) -> Result<()> {
        let files = list_files(&self.dir)?;
        let excess = files.len().saturating_sub(self.max_files_to_keep);

        for (_, path) in files.into_iter().take(excess) {
            debug!("Removing {}", path.display());
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

impl Collaborators for JsonlStore {
    fn persist(&mut self, timestamp: DateTime<Utc>, record: &SensorReading) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        let line = serde_json::to_string(&StoredRecord { timestamp, record })?;
        if let Some(writer) = self.writer.as_mut() {
            writeln!(writer, "{}", line)?;
            writer.flush()?;
        }
        self.records_in_file += 1;
        Ok(())
    }

    fn run_scheduled_tasks(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        self.prune()
    }

    fn notify_live(&mut self, record: &SensorReading) -> Result<()> {
        let live = self.dir.join(LIVE_FILE);
        let staging = self.dir.join(format!("{}.tmp", LIVE_FILE));

        fs::write(&staging, serde_json::to_vec_pretty(record)?)?;
        fs::rename(&staging, &live)?;
        Ok(())
    }
}

/// Stored files with their index, oldest first
fn list_files(dir: &Path) -> Result<Vec<(u64, PathBuf)>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let index = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.strip_prefix(FILE_PREFIX))
            .and_then(|name| name.strip_suffix(FILE_SUFFIX))
            .and_then(|digits| digits.parse::<u64>().ok());

        if let Some(index) = index {
            files.push((index, path));
        }
    }

    files.sort();
    Ok(files)
}
