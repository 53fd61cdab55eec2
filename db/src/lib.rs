//! Run configuration, stage checkpoints and compact artifact storage.
//!
//! The pipeline persists each stage's output before the next begins:
//!
//! - [`RunConfig`] is the YAML run configuration.
//! - [`Manifest`] records completed [`Stage`]s with SHA-256 checksums so a
//!   run can resume from any stage boundary.
//! - [`write_artifact`] / [`read_artifact`] handle the verbose JSON
//!   checkpoints.
//! - [`compact`] reduces a pruned artifact, [`write_compact`] gzips it, and
//!   [`expand`] reinstates file paths from the index.
//!
//! # Quick start
//!
//! ```no_run
//! use modcat_db::{Manifest, RunConfig, Stage, compact, read_artifact, write_compact};
//!
//! let config = RunConfig::load("modcat.yml").unwrap();
//! let out = config.output_dir();
//! let manifest = Manifest::load(&out).unwrap();
//!
//! let pruned = read_artifact(manifest.verify(&out, Stage::Prune).unwrap()).unwrap();
//! write_compact(out.join(Stage::Compact.file_name()), &compact(&pruned).unwrap()).unwrap();
//! ```

mod checkpoint;
mod compact;
mod config;
mod error;
mod manifest;

pub use checkpoint::{read_artifact, write_artifact};
pub use compact::{
    CompactArtifact, GENERATED_FILE, STRIPPED_KEYS, compact, expand, read_compact, write_compact,
};
pub use config::{CatalogConfig, DEFAULT_GDB, RunConfig};
pub use error::{Result, StoreError};
pub use manifest::{MANIFEST_FILE, Manifest, Stage, StageRecord};
