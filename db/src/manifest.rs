//! Checkpoint manifest for resumable pipeline runs.
//!
//! Every completed stage writes its artifact into the output directory and
//! records the file name, its SHA-256 checksum and a completion timestamp in
//! `manifest.json`. A later run may resume at stage N only when stage N-1 is
//! recorded and its artifact on disk still matches the recorded checksum.
//!
//! # Examples
//!
//! ```no_run
//! use modcat_db::{Manifest, Stage};
//!
//! let dir = std::path::Path::new("build/modcat");
//! let mut manifest = Manifest::load_or_default(dir).unwrap();
//!
//! // After the link stage wrote combined.json:
//! manifest.record(dir, Stage::Link).unwrap();
//! manifest.save(dir).unwrap();
//!
//! // A later run resuming at prune verifies the link checkpoint first.
//! let combined = manifest.verify(dir, Stage::Link).unwrap();
//! assert!(combined.ends_with("combined.json"));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Result, StoreError};

/// File name of the manifest inside the output directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Link,
    Prune,
    Compact,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Link, Stage::Prune, Stage::Compact];

    pub fn index(self) -> u8 {
        match self {
            Stage::Link => 0,
            Stage::Prune => 1,
            Stage::Compact => 2,
        }
    }

    /// Maps a numeric stage index (as given on the command line) to a stage.
    ///
    /// ```
    /// use modcat_db::Stage;
    ///
    /// assert_eq!(Stage::from_index(1), Some(Stage::Prune));
    /// assert_eq!(Stage::from_index(3), None);
    /// ```
    pub fn from_index(index: u8) -> Option<Stage> {
        Stage::ALL.get(usize::from(index)).copied()
    }

    /// Artifact file written by this stage.
    pub fn file_name(self) -> &'static str {
        match self {
            Stage::Link => "combined.json",
            Stage::Prune => "pruned.json",
            Stage::Compact => "compact.json.gz",
        }
    }

    /// The stage whose checkpoint this stage consumes.
    pub fn previous(self) -> Option<Stage> {
        self.index().checked_sub(1).and_then(Stage::from_index)
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Link => "link",
            Stage::Prune => "prune",
            Stage::Compact => "compact",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.index(), self.name())
    }
}

/// Record of one completed stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    /// Artifact file name relative to the output directory.
    pub file: String,
    /// SHA-256 hex digest of the artifact.
    pub sha256: String,
    /// RFC 3339 timestamp of stage completion.
    pub completed_at: String,
}

/// Persisted state of a pipeline output directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Runtime version of the artifacts in this directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_version: Option<String>,
    /// Completed stages.
    #[serde(default)]
    pub stages: BTreeMap<Stage, StageRecord>,
}

impl Manifest {
    pub fn path(dir: impl AsRef<Path>) -> PathBuf {
        dir.as_ref().join(MANIFEST_FILE)
    }

    /// Loads `manifest.json` from `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::StoreError::IoError) if the file cannot
    /// be read, or [`JsonError`](crate::StoreError::JsonError) if the
    /// content is not valid manifest JSON.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(Self::path(dir))?;
        let reader = BufReader::new(file);
        let manifest = serde_json::from_reader(reader)?;
        Ok(manifest)
    }

    /// Like [`Manifest::load`], but an absent manifest yields an empty one.
    pub fn load_or_default(dir: impl AsRef<Path>) -> Result<Self> {
        if Self::path(&dir).exists() {
            Self::load(dir)
        } else {
            Ok(Self::default())
        }
    }

    /// Saves the manifest as pretty-printed JSON into `dir`.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(Self::path(dir))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Checksums the stage's artifact in `dir` and records its completion.
    /// Records of later stages are dropped since they no longer derive from
    /// this checkpoint.
    pub fn record(&mut self, dir: impl AsRef<Path>, stage: Stage) -> Result<&StageRecord> {
        let sha256 = Self::calculate_checksum(dir.as_ref().join(stage.file_name()))?;
        self.clear_after(stage);
        tracing::debug!(stage = stage.name(), sha256 = %sha256, "checkpoint recorded");
        Ok(self.stages.entry(stage).or_insert(StageRecord {
            file: stage.file_name().to_string(),
            sha256,
            completed_at: chrono::Utc::now().to_rfc3339(),
        }))
    }

    /// Removes the records of every stage after `stage`.
    pub fn clear_after(&mut self, stage: Stage) {
        self.stages.retain(|s, _| *s < stage);
    }

    /// Confirms that the checkpoint of `stage` is recorded and intact, and
    /// returns its path.
    ///
    /// # Errors
    ///
    /// [`MissingCheckpoint`](crate::StoreError::MissingCheckpoint) if the
    /// stage is not recorded or its file is gone;
    /// [`InvalidChecksum`](crate::StoreError::InvalidChecksum) if the file
    /// changed since it was recorded.
    pub fn verify(&self, dir: impl AsRef<Path>, stage: Stage) -> Result<PathBuf> {
        let record = self
            .stages
            .get(&stage)
            .ok_or_else(|| StoreError::MissingCheckpoint(stage.to_string()))?;
        let path = dir.as_ref().join(&record.file);
        if !path.exists() {
            return Err(StoreError::MissingCheckpoint(format!(
                "{stage}: {} not found",
                path.display()
            )));
        }
        let actual = Self::calculate_checksum(&path)?;
        if actual != record.sha256 {
            return Err(StoreError::InvalidChecksum(format!(
                "{}: expected {}, found {actual}",
                path.display(),
                record.sha256
            )));
        }
        Ok(path)
    }

    pub fn get(&self, stage: Stage) -> Option<&StageRecord> {
        self.stages.get(&stage)
    }

    /// Computes the SHA-256 hex digest of a file.
    pub fn calculate_checksum(path: impl AsRef<Path>) -> Result<String> {
        let bytes = std::fs::read(path)?;
        let hash = Sha256::digest(&bytes);
        Ok(format!("{:x}", hash))
    }
}
