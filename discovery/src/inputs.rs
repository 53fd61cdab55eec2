//! Input documents: protobuf catalog descriptions and runtime introspection.
//!
//! The schema catalog comes from `protoc-gen-doc`'s JSON output, one document
//! per source directory. The introspection document lists the module
//! classes and drivers of a running instance with their commands.

use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use modcat_core::{Field, ModuleKind, SchemaCatalog, SchemaType, relative_path};
use serde::Deserialize;
use tracing::info;

use crate::error::{DiscoverError, Result};

/// Protobuf scalar type names; any other `fullType` is a message or enum.
const SCALAR_TYPES: &[&str] = &[
    "double", "float", "int32", "int64", "uint32", "uint64", "sint32", "sint64", "fixed32",
    "fixed64", "sfixed32", "sfixed64", "bool", "string", "bytes",
];

/// A `protoc-gen-doc` JSON document.
#[derive(Debug, Clone, Deserialize)]
pub struct ProtoDoc {
    #[serde(default)]
    pub files: Vec<ProtoFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProtoFile {
    /// Path of the `.proto` file relative to its source directory.
    pub name: String,
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub messages: Vec<ProtoMessage>,
    #[serde(default)]
    pub enums: Vec<ProtoEnum>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtoMessage {
    pub name: String,
    #[serde(default)]
    pub long_name: String,
    pub full_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub has_extensions: bool,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub fields: Vec<ProtoField>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtoField {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub long_type: String,
    #[serde(default)]
    pub full_type: String,
    #[serde(default)]
    pub ismap: bool,
    #[serde(default)]
    pub default_value: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtoEnum {
    #[serde(default)]
    pub name: String,
    pub full_name: String,
}

/// A catalog document together with the directory its `.proto` files live in.
#[derive(Debug, Clone)]
pub struct CatalogSource {
    pub source_dir: PathBuf,
    pub doc: ProtoDoc,
}

impl CatalogSource {
    /// Loads a catalog document from disk.
    pub fn load(source_dir: impl Into<PathBuf>, doc_path: impl AsRef<Path>) -> Result<Self> {
        let doc = read_json(doc_path.as_ref())?;
        Ok(Self {
            source_dir: source_dir.into(),
            doc,
        })
    }
}

/// The runtime introspection document.
#[derive(Debug, Clone, Deserialize)]
pub struct Introspection {
    #[serde(default)]
    pub globals: Vec<IntrospectedModule>,
    #[serde(rename = "bess-version", default)]
    pub version: String,
}

impl Introspection {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        read_json(path.as_ref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntrospectedModule {
    #[serde(rename = "type")]
    pub kind: ModuleKind,
    pub name: String,
    #[serde(default)]
    pub help: String,
    #[serde(default)]
    pub cmds: Vec<IntrospectedCommand>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntrospectedCommand {
    pub cmd: String,
    pub arg: String,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.is_file() {
        return Err(DiscoverError::InvalidInput(format!(
            "input document '{}' does not exist",
            path.display()
        )));
    }
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Merges catalog documents into one [`SchemaCatalog`].
///
/// Declaring files are made relative to `root`. Short-name collisions are
/// disambiguated before returning.
pub fn build_catalog(sources: &[CatalogSource], root: &Path) -> SchemaCatalog {
    let enums: HashSet<&str> = sources
        .iter()
        .flat_map(|s| &s.doc.files)
        .flat_map(|f| &f.enums)
        .map(|e| e.full_name.trim_start_matches('.'))
        .collect();

    let mut catalog = SchemaCatalog::new();
    for source in sources {
        for file in &source.doc.files {
            let declared = source.source_dir.join(&file.name);
            let declared = relative_path(&declared.to_string_lossy(), root);
            for message in &file.messages {
                catalog.insert(convert_message(message, &declared, &enums));
            }
        }
    }
    let collisions = catalog.disambiguate();
    info!(
        types = catalog.len(),
        catalogs = sources.len(),
        collisions = collisions.len(),
        "Merged schema catalogs"
    );
    catalog
}

fn convert_message(message: &ProtoMessage, file: &str, enums: &HashSet<&str>) -> SchemaType {
    let full_name = message.full_name.trim_start_matches('.');
    let mut ty = SchemaType::new(full_name, file).with_description(&message.description);
    ty.line = message.line;
    ty.has_extensions = message.has_extensions;
    ty.fields = message
        .fields
        .iter()
        .map(|f| convert_field(f, enums))
        .collect();
    ty
}

fn convert_field(field: &ProtoField, enums: &HashSet<&str>) -> Field {
    let full_type = field.full_type.trim_start_matches('.');
    let message_typed = !full_type.is_empty()
        && !SCALAR_TYPES.contains(&full_type)
        && !enums.contains(full_type);
    Field {
        name: field.name.clone(),
        ty: field.ty.clone(),
        full_type: message_typed.then(|| full_type.to_string()),
        repeated: field.label == "repeated",
        description: non_empty(&field.description),
        default: non_empty(&field.default_value),
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
