//! Directory structure and file-name contracts for the store root.
//!
//! ```text
//! <workspace>/store/
//!   signals/     YYYY-MM-DD.jsonl
//!   emissions/   YYYY-MM-DD.jsonl
//!   snapshots/   <name>__YYYY-MM-DDTHHMMSSZ.json
//!                digest__YYYY-MM-DD.json
//!                calibration__YYYY-MM-DD.json
//!   checkpoints/ <name>.json
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use es_core::time::{partition_day, snapshot_token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeClass {
    Signal,
    Emission,
}

impl EnvelopeClass {
    fn dir_name(self) -> &'static str {
        match self {
            EnvelopeClass::Signal => "signals",
            EnvelopeClass::Emission => "emissions",
        }
    }
}

/// Resolved paths rooted at `<workspace>/store`.
#[derive(Debug, Clone)]
pub struct StoreLayout {
    store_root: PathBuf,
}

impl StoreLayout {
    /// `workspace` is the parent of the fixed `store/` directory.
    pub fn new(workspace: impl AsRef<Path>) -> Self {
        Self {
            store_root: workspace.as_ref().join("store"),
        }
    }

    pub fn store_root(&self) -> &Path {
        &self.store_root
    }

    pub fn class_dir(&self, class: EnvelopeClass) -> PathBuf {
        self.store_root.join(class.dir_name())
    }

    pub fn snapshots_dir(&self) -> PathBuf {
        self.store_root.join("snapshots")
    }

    pub fn checkpoints_dir(&self) -> PathBuf {
        self.store_root.join("checkpoints")
    }

    /// Partition file for a record's UTC-normalized timestamp.
    pub fn partition_path(&self, class: EnvelopeClass, timestamp: DateTime<Utc>) -> PathBuf {
        self.class_dir(class)
            .join(format!("{}.jsonl", partition_day(timestamp)))
    }

    /// Partition file for an already-computed ISO date (`YYYY-MM-DD`).
    pub fn partition_path_for_day(&self, class: EnvelopeClass, day: &str) -> PathBuf {
        self.class_dir(class).join(format!("{day}.jsonl"))
    }

    /// All partition paths under a class directory, in lexicographic
    /// (= chronological) order. Missing directory yields an empty list.
    pub fn list_partitions(&self, class: EnvelopeClass) -> std::io::Result<Vec<PathBuf>> {
        let dir = self.class_dir(class);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut paths: Vec<PathBuf> = std::fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|e| e == "jsonl").unwrap_or(false))
            .collect();
        paths.sort();
        Ok(paths)
    }

    pub fn named_snapshot_path(&self, name: &str, at: DateTime<Utc>) -> PathBuf {
        self.snapshots_dir()
            .join(format!("{name}__{}.json", snapshot_token(at)))
    }

    pub fn digest_snapshot_path(&self, day: &str) -> PathBuf {
        self.snapshots_dir().join(format!("digest__{day}.json"))
    }

    pub fn calibration_snapshot_path(&self, day: &str) -> PathBuf {
        self.snapshots_dir()
            .join(format!("calibration__{day}.json"))
    }

    pub fn checkpoint_path(&self, name: &str) -> PathBuf {
        self.checkpoints_dir().join(format!("{name}.json"))
    }

    /// Create the four fixed subdirectories if they don't already exist.
    /// Called eagerly on store construction; safe to call again any time.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.class_dir(EnvelopeClass::Signal))?;
        std::fs::create_dir_all(self.class_dir(EnvelopeClass::Emission))?;
        std::fs::create_dir_all(self.snapshots_dir())?;
        std::fs::create_dir_all(self.checkpoints_dir())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn partition_path_uses_utc_calendar_day() {
        let layout = StoreLayout::new("/ws");
        let t = Utc.with_ymd_and_hms(2024, 3, 7, 23, 59, 0).unwrap();
        let p = layout.partition_path(EnvelopeClass::Signal, t);
        assert_eq!(p, PathBuf::from("/ws/store/signals/2024-03-07.jsonl"));
    }

    #[test]
    fn named_snapshot_path_has_no_colons() {
        let layout = StoreLayout::new("/ws");
        let t = Utc.with_ymd_and_hms(2024, 3, 7, 1, 2, 3).unwrap();
        let p = layout.named_snapshot_path("digest", t);
        assert!(!p.to_string_lossy().contains(':'));
    }
}
