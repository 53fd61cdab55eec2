//! Run configuration for the catalog pipeline.
//!
//! Defines the YAML-serializable configuration naming the inputs, the binary
//! images and sample directories consulted by the oracles, and the output
//! directory holding stage checkpoints.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! root: /src/bess
//! introspection: build/introspection.json
//! catalogs:
//!   - source_dir: protobuf
//!     doc: build/protobuf-doc.json
//!   - source_dir: plugins/sample/protobuf
//!     doc: build/sample-doc.json
//! images:
//!   - core/bessd
//!   - plugins/sample/sample.so
//! sample_dirs:
//!   - bessctl/conf
//! output_dir: build/modcat
//! resolve_locations: true
//! find_examples: true
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use modcat_core::DEFAULT_GENERIC_DISPATCH_FILE;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Default debugger executable.
pub const DEFAULT_GDB: &str = "gdb";

/// One protobuf catalog document and the directory its `.proto` files live in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub source_dir: PathBuf,
    pub doc: PathBuf,
}

/// Top-level run configuration.
///
/// # Examples
///
/// ```
/// use modcat_db::RunConfig;
///
/// let config: RunConfig = serde_yaml::from_str(r#"
/// version: "1.0"
/// root: /src/bess
/// introspection: build/introspection.json
/// catalogs:
///   - { source_dir: protobuf, doc: build/doc.json }
/// output_dir: build/modcat
/// "#).unwrap();
///
/// assert!(config.validate().is_ok());
/// assert!(config.resolve_locations);
/// assert_eq!(config.gdb, "gdb");
/// assert_eq!(config.path("core/bessd"), std::path::Path::new("/src/bess/core/bessd"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Configuration format version (e.g., `"1.0"`).
    pub version: String,
    /// Source root. Relative roots are resolved against the config file's
    /// directory by [`RunConfig::load`].
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Overrides the version string reported by introspection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_version: Option<String>,
    /// Introspection document path.
    pub introspection: PathBuf,
    /// Catalog documents, base catalog first.
    pub catalogs: Vec<CatalogConfig>,
    /// Executables and shared objects queried for symbol locations.
    #[serde(default)]
    pub images: Vec<PathBuf>,
    /// Directories searched for usage examples.
    #[serde(default)]
    pub sample_dirs: Vec<PathBuf>,
    /// Checkpoint directory.
    pub output_dir: PathBuf,
    /// Debugger executable.
    #[serde(default = "default_gdb")]
    pub gdb: String,
    /// Base module source treated as "no specialized constructor".
    #[serde(default = "default_generic_dispatch_file")]
    pub generic_dispatch_file: String,
    /// Attach constructor and command locations.
    #[serde(default = "default_true")]
    pub resolve_locations: bool,
    /// Attach usage-example locations.
    #[serde(default = "default_true")]
    pub find_examples: bool,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_gdb() -> String {
    DEFAULT_GDB.to_string()
}

fn default_generic_dispatch_file() -> String {
    DEFAULT_GENERIC_DISPATCH_FILE.to_string()
}

fn default_true() -> bool {
    true
}

impl RunConfig {
    /// Loads configuration from a YAML file and anchors a relative `root` at
    /// the file's directory.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::StoreError::IoError) if the file cannot be
    /// read, or [`YamlError`](crate::StoreError::YamlError) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let mut config: RunConfig = serde_yaml::from_reader(reader)?;
        if config.root.is_relative() {
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            config.root = base.join(&config.root);
        }
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Checks required settings.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfig`](crate::StoreError::InvalidConfig) naming the
    /// first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(StoreError::InvalidConfig("version cannot be empty".into()));
        }
        if self.catalogs.is_empty() {
            return Err(StoreError::InvalidConfig(
                "at least one catalog is required".into(),
            ));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(StoreError::InvalidConfig(
                "output_dir cannot be empty".into(),
            ));
        }
        Ok(())
    }

    /// Resolves `relative` against [`root`](Self::root); absolute paths are
    /// returned unchanged.
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.path(&self.output_dir)
    }

    pub fn image_paths(&self) -> Vec<PathBuf> {
        self.images.iter().map(|p| self.path(p)).collect()
    }

    pub fn sample_dir_paths(&self) -> Vec<PathBuf> {
        self.sample_dirs.iter().map(|p| self.path(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
version: "1.0"
root: /src/bess
runtime_version: "0.4.0"
introspection: build/introspection.json
catalogs:
  - source_dir: protobuf
    doc: build/protobuf-doc.json
  - source_dir: /opt/plugin/protobuf
    doc: /opt/plugin/doc.json
images:
  - core/bessd
sample_dirs:
  - bessctl/conf
output_dir: build/modcat
gdb: /usr/bin/gdb-multiarch
generic_dispatch_file: core/module.cc
resolve_locations: false
find_examples: false
"#
    }

    fn minimal_yaml() -> &'static str {
        r#"
version: "1.0"
introspection: introspection.json
catalogs:
  - source_dir: protobuf
    doc: doc.json
output_dir: out
"#
    }

    #[test]
    fn test_deserialize_complete() {
        let config: RunConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        assert_eq!(config.runtime_version.as_deref(), Some("0.4.0"));
        assert_eq!(config.catalogs.len(), 2);
        assert_eq!(config.gdb, "/usr/bin/gdb-multiarch");
        assert_eq!(config.generic_dispatch_file, "core/module.cc");
        assert!(!config.resolve_locations);
        assert!(!config.find_examples);
        assert_eq!(config.image_paths(), vec![PathBuf::from("/src/bess/core/bessd")]);
        assert_eq!(
            config.path(&config.catalogs[1].doc),
            PathBuf::from("/opt/plugin/doc.json")
        );
    }

    #[test]
    fn test_deserialize_minimal_defaults() {
        let config: RunConfig = serde_yaml::from_str(minimal_yaml()).unwrap();
        assert_eq!(config.root, PathBuf::from("."));
        assert!(config.images.is_empty());
        assert!(config.sample_dirs.is_empty());
        assert_eq!(config.gdb, DEFAULT_GDB);
        assert_eq!(config.generic_dispatch_file, DEFAULT_GENERIC_DISPATCH_FILE);
        assert!(config.resolve_locations);
        assert!(config.find_examples);
    }

    #[test]
    fn test_validate_rejects_missing_catalogs() {
        let mut config: RunConfig = serde_yaml::from_str(minimal_yaml()).unwrap();
        config.catalogs.clear();
        assert!(matches!(config.validate(), Err(StoreError::InvalidConfig(_))));

        let mut config: RunConfig = serde_yaml::from_str(minimal_yaml()).unwrap();
        config.version = " ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_anchors_relative_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modcat.yml");
        std::fs::write(&path, minimal_yaml()).unwrap();

        let config = RunConfig::load(&path).unwrap();
        assert_eq!(config.root, dir.path().join("."));
        assert_eq!(config.output_dir(), dir.path().join(".").join("out"));
    }

    #[test]
    fn test_load_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");

        let saved: RunConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        saved.save(&path).unwrap();
        let loaded = RunConfig::load(&path).unwrap();
        assert_eq!(loaded, saved);
    }
}
