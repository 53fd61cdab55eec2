//! Minimized, compressed form of a pruned artifact.
//!
//! Compaction strips keys that only intermediate stages need, replaces every
//! location record's file path with an integer key into a shared file index,
//! and gzips the result. Keys are emitted in sorted order so equal artifacts
//! always compress to identical bytes.
//!
//! ```text
//! {"db": {"modules": [... {"location": {"file": 3, "line": 88}} ...],
//!         "types": {...}, "version": "0.4.0"},
//!  "files": {"0": "<generated>", "1": "core/modules/drr.cc", ...}}
//! ```
//!
//! A location record is any object carrying a `file` string. An object with
//! a `line` but no usable file maps to key 0, the generated-file placeholder.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use modcat_core::CombinedArtifact;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, StoreError};

/// Keys removed from every type, module and command record.
pub const STRIPPED_KEYS: [&str; 4] = ["display_name", "summary", "dep", "has_extensions"];

/// Placeholder path behind file index 0.
pub const GENERATED_FILE: &str = "<generated>";

/// The compacted artifact before compression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactArtifact {
    /// Integer key to file path.
    pub files: BTreeMap<u64, String>,
    /// The reduced artifact with file keys in place of paths.
    pub db: Value,
}

/// Reduces `artifact` to its compact shape.
///
/// # Examples
///
/// ```
/// use modcat_core::{CombinedArtifact, SchemaType};
/// use modcat_db::compact;
///
/// let mut artifact = CombinedArtifact::new("0.4.0");
/// artifact.insert_type(SchemaType::new("bess.pb.EmptyArg", "protobuf/bess_msg.proto"));
///
/// let compacted = compact(&artifact).unwrap();
/// assert_eq!(compacted.files[&1], "protobuf/bess_msg.proto");
/// assert_eq!(compacted.db["types"]["bess.pb.EmptyArg"]["file"], 1);
/// ```
pub fn compact(artifact: &CombinedArtifact) -> Result<CompactArtifact> {
    let mut db = serde_json::to_value(artifact)?;

    let mut paths = BTreeSet::new();
    collect_files(&db, &mut paths);
    let mut keys: BTreeMap<String, u64> = BTreeMap::new();
    let mut files = BTreeMap::from([(0, GENERATED_FILE.to_string())]);
    for (idx, path) in paths.into_iter().enumerate() {
        let key = idx as u64 + 1;
        keys.insert(path.clone(), key);
        files.insert(key, path);
    }

    let Value::Object(root) = &mut db else {
        return Err(StoreError::MalformedArtifact("artifact is not an object".into()));
    };
    // Type map keys are names, not record fields, so descend per entry.
    if let Some(Value::Object(types)) = root.get_mut("types") {
        for ty in types.values_mut() {
            reduce(ty, &keys);
        }
    }
    if let Some(modules) = root.get_mut("modules") {
        reduce(modules, &keys);
    }

    tracing::info!(files = files.len() - 1, "artifact compacted");
    Ok(CompactArtifact { files, db })
}

fn collect_files(value: &Value, paths: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(file)) = map.get("file") {
                if !file.is_empty() {
                    paths.insert(file.clone());
                }
            }
            for child in map.values() {
                collect_files(child, paths);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_files(item, paths);
            }
        }
        _ => {}
    }
}

fn reduce(value: &mut Value, keys: &BTreeMap<String, u64>) {
    match value {
        Value::Object(map) => {
            for key in STRIPPED_KEYS {
                map.remove(key);
            }
            rewrite_location(map, keys);
            for child in map.values_mut() {
                reduce(child, keys);
            }
        }
        Value::Array(items) => {
            for item in items {
                reduce(item, keys);
            }
        }
        _ => {}
    }
}

fn rewrite_location(map: &mut Map<String, Value>, keys: &BTreeMap<String, u64>) {
    let key = match map.get("file") {
        Some(Value::String(file)) => keys.get(file).copied().unwrap_or(0),
        _ if map.contains_key("line") => 0,
        _ => return,
    };
    map.insert("file".into(), Value::from(key));
}

/// Writes the gzip-compressed compact JSON.
pub fn write_compact(path: impl AsRef<Path>, compacted: &CompactArtifact) -> Result<()> {
    let bytes = serde_json::to_vec(compacted)?;
    let file = std::fs::File::create(path)?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::best());
    encoder
        .write_all(&bytes)
        .map_err(|e| StoreError::CompressionError(e.to_string()))?;
    let mut writer = encoder
        .finish()
        .map_err(|e| StoreError::CompressionError(e.to_string()))?;
    writer.flush()?;
    Ok(())
}

/// Reads a compact artifact written by [`write_compact`].
pub fn read_compact(path: impl AsRef<Path>) -> Result<CompactArtifact> {
    let file = std::fs::File::open(path)?;
    let mut decoder = GzDecoder::new(file);
    let mut bytes = Vec::new();
    decoder
        .read_to_end(&mut bytes)
        .map_err(|e| StoreError::CompressionError(e.to_string()))?;
    let compacted = serde_json::from_slice(&bytes)?;
    Ok(compacted)
}

/// Reinstates file paths from the index, returning the reduced artifact.
///
/// # Errors
///
/// [`UnknownFileIndex`](crate::StoreError::UnknownFileIndex) when a record
/// points at a key missing from the index, and
/// [`MalformedArtifact`](crate::StoreError::MalformedArtifact) when a file
/// key is not an unsigned integer.
pub fn expand(compacted: &CompactArtifact) -> Result<Value> {
    let mut db = compacted.db.clone();
    reinstate(&mut db, &compacted.files)?;
    Ok(db)
}

fn reinstate(value: &mut Value, files: &BTreeMap<u64, String>) -> Result<()> {
    match value {
        Value::Object(map) => {
            if let Some(file) = map.get_mut("file") {
                let key = file.as_u64().ok_or_else(|| {
                    StoreError::MalformedArtifact(format!("file key {file} is not an index"))
                })?;
                let path = files.get(&key).ok_or(StoreError::UnknownFileIndex(key))?;
                *file = Value::String(path.clone());
            }
            for (name, child) in map.iter_mut() {
                // Skip the record's own file entry, already rewritten.
                if name != "file" {
                    reinstate(child, files)?;
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                reinstate(item, files)?;
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use modcat_core::{
        Command, Dependency, Field, ModuleEntry, ModuleKind, SchemaType, SourceLocation,
    };
    use serde_json::json;

    fn sample() -> CombinedArtifact {
        let mut artifact = CombinedArtifact::new("0.4.0");
        let mut drr = SchemaType::new("bess.pb.DRRArg", "protobuf/module_msg.proto")
            .with_description("The DRR module. Shares bandwidth fairly.")
            .with_field(Field::scalar("num_flows", "int64"));
        drr.line = Some(40);
        drr.display_name = Some("bess_pb_DRRArg".into());
        drr.dep = Some(Dependency::Top);
        drr.has_extensions = true;
        artifact.insert_type(drr);

        let mut entry = ModuleEntry::new("DRR", ModuleKind::Mclass);
        entry.arg = Some("bess.pb.DRRArg".into());
        entry.location = Some(SourceLocation::new("core/modules/drr.cc", 88));
        entry.examples = vec![
            SourceLocation::new("bessctl/conf/samples/drr.bess", 12),
            SourceLocation::new("", 3),
        ];
        let mut cmd = Command::new("set_quantum", "DRRQuantumArg");
        cmd.location = Some(SourceLocation::new("core/modules/drr.cc", 301));
        artifact.modules.push(entry.with_command(cmd));
        artifact
    }

    #[test]
    fn test_compact_strips_and_indexes() {
        let compacted = compact(&sample()).unwrap();

        assert_eq!(
            compacted.files,
            BTreeMap::from([
                (0, GENERATED_FILE.to_string()),
                (1, "bessctl/conf/samples/drr.bess".to_string()),
                (2, "core/modules/drr.cc".to_string()),
                (3, "protobuf/module_msg.proto".to_string()),
            ])
        );

        let drr = &compacted.db["types"]["bess.pb.DRRArg"];
        assert_eq!(drr["file"], 3);
        assert_eq!(drr["description"], "The DRR module. Shares bandwidth fairly.");
        for key in STRIPPED_KEYS {
            assert!(drr.get(key).is_none(), "{key} should be stripped");
        }

        let module = &compacted.db["modules"][0];
        assert_eq!(module["location"], json!({"file": 2, "line": 88}));
        assert_eq!(module["examples"][1], json!({"file": 0, "line": 3}));
        assert_eq!(module["cmds"][0]["location"]["file"], 2);
    }

    #[test]
    fn test_roundtrip_reinstates_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compact.json.gz");
        let artifact = sample();

        write_compact(&path, &compact(&artifact).unwrap()).unwrap();
        let expanded = expand(&read_compact(&path).unwrap()).unwrap();

        assert_eq!(expanded["types"]["bess.pb.DRRArg"]["file"], "protobuf/module_msg.proto");
        let module = &expanded["modules"][0];
        assert_eq!(module["location"]["file"], "core/modules/drr.cc");
        assert_eq!(module["cmds"][0]["location"]["file"], "core/modules/drr.cc");
        assert_eq!(module["examples"][0]["file"], "bessctl/conf/samples/drr.bess");
        assert_eq!(module["examples"][1]["file"], GENERATED_FILE);
    }

    #[test]
    fn test_output_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.gz");
        let b = dir.path().join("b.gz");
        write_compact(&a, &compact(&sample()).unwrap()).unwrap();
        write_compact(&b, &compact(&sample()).unwrap()).unwrap();
        assert_eq!(std::fs::read(a).unwrap(), std::fs::read(b).unwrap());
    }

    #[test]
    fn test_expand_unknown_index() {
        let compacted = CompactArtifact {
            files: BTreeMap::from([(0, GENERATED_FILE.to_string())]),
            db: json!({"modules": [{"location": {"file": 7, "line": 1}}]}),
        };
        assert!(matches!(expand(&compacted), Err(StoreError::UnknownFileIndex(7))));
    }

    #[test]
    fn test_read_rejects_plain_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.json");
        std::fs::write(&path, "{\"files\":{}}").unwrap();
        assert!(matches!(read_compact(&path), Err(StoreError::CompressionError(_))));
    }
}
