//! Persisted log of completed downloads.
//!
//! The whole list is kept in memory and rewritten to a JSON file after every
//! change. Storage problems are logged and otherwise ignored so they never get
//! in the way of a download.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryEntry {
    pub url: String,
    pub title: String,
    pub filename: String,
    pub quality: String,
    pub size_mb: f64,
    pub date: String,
}

impl HistoryEntry {
    /// Builds an entry stamped with the current local time.
    pub fn new(url: &str, title: &str, filename: &Path, quality: &str, size_bytes: u64) -> Self {
        Self {
            url: url.to_string(),
            title: title.to_string(),
            filename: filename.to_string_lossy().to_string(),
            quality: quality.to_string(),
            size_mb: size_in_mb(size_bytes),
            date: chrono::Local::now().format(DATE_FORMAT).to_string(),
        }
    }

    pub fn containing_folder(&self) -> Option<PathBuf> {
        Path::new(&self.filename).parent().map(Path::to_path_buf)
    }
}

/// Bytes to megabytes, rounded to two decimals.
pub fn size_in_mb(bytes: u64) -> f64 {
    let mb = bytes as f64 / (1024.0 * 1024.0);
    (mb * 100.0).round() / 100.0
}

pub struct HistoryStore {
    path: PathBuf,
    entries: Vec<HistoryEntry>,
}

impl HistoryStore {
    /// Reads the history file. A missing or unreadable file gives an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match read_entries(&path) {
            Ok(entries) => {
                info!("Loaded {} history entries from {}", entries.len(), path.display());
                entries
            }
            Err(e) => {
                warn!("Error loading history from {}: {}", path.display(), e);
                Vec::new()
            }
        };
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
        self.save();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.save();
    }

    pub fn list(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn save(&self) {
        if let Err(e) = write_entries(&self.path, &self.entries) {
            warn!("Error saving history to {}: {}", self.path.display(), e);
        }
    }
}

fn read_entries(path: &Path) -> Result<Vec<HistoryEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn write_entries(path: &Path, entries: &[HistoryEntry]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(entries)?;

    // Write beside the target and rename so a crash never leaves a half file.
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, json)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryColumn {
    #[default]
    Date,
    Title,
    Quality,
    Size,
    Location,
}

impl HistoryColumn {
    pub const ALL: [HistoryColumn; 5] = [
        Self::Date,
        Self::Title,
        Self::Quality,
        Self::Size,
        Self::Location,
    ];

    pub fn heading(self) -> &'static str {
        match self {
            Self::Date => "Date",
            Self::Title => "Title",
            Self::Quality => "Quality",
            Self::Size => "Size (MB)",
            Self::Location => "File Location",
        }
    }

    fn compare(self, a: &HistoryEntry, b: &HistoryEntry) -> Ordering {
        match self {
            Self::Date => a.date.cmp(&b.date),
            Self::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            Self::Quality => a.quality.cmp(&b.quality),
            Self::Size => a.size_mb.total_cmp(&b.size_mb),
            Self::Location => a.filename.cmp(&b.filename),
        }
    }
}

/// Indices into `entries` in display order. `None` keeps insertion order.
/// Ties keep insertion order.
pub fn sorted_indices(
    entries: &[HistoryEntry],
    sort: Option<(HistoryColumn, bool)>,
) -> Vec<usize> {
    let mut order: Vec<usize> = (0..entries.len()).collect();
    if let Some((column, descending)) = sort {
        order.sort_by(|&a, &b| {
            let ord = column.compare(&entries[a], &entries[b]);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        });
    }
    order
}
