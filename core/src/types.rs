//! Catalog type definitions for the combined module artifact.
//!
//! This module defines the data model shared by every pipeline stage: the
//! schema types extracted from protobuf documentation, the module entries
//! reported by the runtime, and the [`CombinedArtifact`] that ties them
//! together. All types serialize with [`serde`] and round-trip through the
//! verbose JSON checkpoints.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Synthetic command name used when resolving a module's constructor.
pub const CONSTRUCTOR: &str = "__init__";

/// Short name of the schema that denotes "no arguments".
pub const EMPTY_ARG: &str = "EmptyArg";

/// Base module source holding the generic dispatch implementation.
pub const DEFAULT_GENERIC_DISPATCH_FILE: &str = "core/module.h";

/// Kind of extensible component reported by the runtime.
///
/// # Examples
///
/// ```
/// use modcat_core::ModuleKind;
///
/// let kind: ModuleKind = serde_json::from_str("\"driver\"").unwrap();
/// assert_eq!(kind, ModuleKind::Driver);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    /// Packet-processing module class.
    Mclass,
    /// Port (I/O) driver.
    Driver,
}

/// How a surviving schema type was reached during pruning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dependency {
    /// Referenced directly by a module or command.
    Top,
    /// Reached only through another type's fields.
    Arg,
}

/// A file/line pair pointing into the runtime sources.
///
/// Paths are relative to the source root when the file lives inside it and
/// absolute otherwise. Lines are 1-based.
///
/// # Examples
///
/// ```
/// use modcat_core::SourceLocation;
///
/// let loc = SourceLocation::new("/src/bess/core/modules/drr.cc", 42).relative_to("/src/bess");
/// assert_eq!(loc.file, "core/modules/drr.cc");
///
/// let outside = SourceLocation::new("/usr/include/stdio.h", 7).relative_to("/src/bess");
/// assert_eq!(outside.file, "/usr/include/stdio.h");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// Rewrites the file path relative to `root` when it lies inside it.
    pub fn relative_to(mut self, root: impl AsRef<Path>) -> Self {
        self.file = relative_path(&self.file, root.as_ref());
        self
    }
}

/// Returns `path` relative to `root` if it is inside `root`, unchanged otherwise.
pub fn relative_path(path: &str, root: &Path) -> String {
    match Path::new(path).strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel.to_string_lossy().into_owned(),
        _ => path.to_string(),
    }
}

/// A single field of a schema type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field name as declared in the `.proto` file.
    pub name: String,
    /// Declared type (scalar name or message short name).
    #[serde(rename = "type")]
    pub ty: String,
    /// Fully-qualified message type, present only for message-typed fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_type: Option<String>,
    /// `true` for `repeated` fields.
    #[serde(default)]
    pub repeated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Field {
    /// Creates a scalar field.
    pub fn scalar(name: &str, ty: &str) -> Self {
        Self {
            name: name.to_string(),
            ty: ty.to_string(),
            full_type: None,
            repeated: false,
            description: None,
            default: None,
        }
    }

    /// Creates a message-typed field referencing `full_type`.
    pub fn message(name: &str, full_type: &str) -> Self {
        let short = full_type.rsplit('.').next().unwrap_or(full_type);
        Self {
            full_type: Some(full_type.to_string()),
            ..Self::scalar(name, short)
        }
    }

    /// Marks the field as repeated.
    pub fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }
}

/// A message type from the static schema catalog.
///
/// # Examples
///
/// ```
/// use modcat_core::{Field, SchemaType};
///
/// let ty = SchemaType::new("bess.pb.RateArg", "bess/pb/module_msg.proto")
///     .with_field(Field::scalar("rate", "uint64"));
/// assert_eq!(ty.name, "RateArg");
/// assert!(!ty.is_trivial());
/// assert!(SchemaType::new("bess.pb.EmptyArg", "x.proto").is_trivial());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaType {
    /// Short (unqualified) name.
    pub name: String,
    /// Fully-qualified name; identity key in [`CombinedArtifact::types`].
    pub full_name: String,
    /// Disambiguated name, set only when the short name collides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Declaring `.proto` file.
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default)]
    pub description: String,
    /// First sentence of `description`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub has_extensions: bool,
    #[serde(default)]
    pub fields: Vec<Field>,
    /// Set by the pruner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dep: Option<Dependency>,
}

impl SchemaType {
    pub fn new(full_name: &str, file: &str) -> Self {
        let name = full_name.rsplit('.').next().unwrap_or(full_name);
        Self {
            name: name.to_string(),
            full_name: full_name.to_string(),
            display_name: None,
            file: file.to_string(),
            line: None,
            description: String::new(),
            summary: None,
            has_extensions: false,
            fields: Vec::new(),
            dep: None,
        }
    }

    /// Adds a field.
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Sets the description and derives the summary from it.
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self.summary = summarize(description);
        self
    }

    /// A type with no fields carries no information for a reader.
    pub fn is_trivial(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fully-qualified names of message types referenced by fields.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter_map(|f| f.full_type.as_deref())
    }
}

/// Returns the first sentence (or first line) of a description.
pub fn summarize(description: &str) -> Option<String> {
    let first_line = description.trim().lines().next()?.trim();
    if first_line.is_empty() {
        return None;
    }
    let sentence = match first_line.find(". ") {
        Some(idx) => &first_line[..=idx],
        None => first_line,
    };
    Some(sentence.to_string())
}

/// A command exposed by a module entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Command name (e.g. `set_quantum`).
    pub cmd: String,
    /// Argument schema short name as reported by the runtime.
    pub arg: String,
    /// Fully-qualified argument schema, when found in the catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arg_type: Option<String>,
    /// Inferred fully-qualified result schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ret: Option<String>,
    /// Schema that only documents an argument-less command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_arg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

impl Command {
    pub fn new(cmd: &str, arg: &str) -> Self {
        Self {
            cmd: cmd.to_string(),
            arg: arg.to_string(),
            arg_type: None,
            ret: None,
            doc_arg: None,
            location: None,
        }
    }

    /// Schema identifiers this command roots during pruning.
    pub fn schema_refs(&self) -> impl Iterator<Item = &str> {
        [&self.arg_type, &self.ret, &self.doc_arg]
            .into_iter()
            .filter_map(|r| r.as_deref())
    }
}

/// A module class or port driver reported by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleEntry {
    pub name: String,
    pub kind: ModuleKind,
    #[serde(default)]
    pub help: String,
    #[serde(default)]
    pub cmds: Vec<Command>,
    /// Fully-qualified constructor argument schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arg: Option<String>,
    /// Constructor location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    /// Places where the class is instantiated in sample scripts.
    #[serde(default)]
    pub examples: Vec<SourceLocation>,
}

impl ModuleEntry {
    pub fn new(name: &str, kind: ModuleKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            help: String::new(),
            cmds: Vec::new(),
            arg: None,
            location: None,
            examples: Vec::new(),
        }
    }

    /// Adds a command.
    pub fn with_command(mut self, cmd: Command) -> Self {
        self.cmds.push(cmd);
        self
    }

    /// Finds a command by name.
    pub fn find_command(&self, name: &str) -> Option<&Command> {
        self.cmds.iter().find(|c| c.cmd == name)
    }
}

/// Root object produced by linking and refined by pruning.
///
/// # Examples
///
/// ```
/// use modcat_core::{CombinedArtifact, ModuleEntry, ModuleKind, SchemaType};
///
/// let mut artifact = CombinedArtifact::new("0.4.0");
/// artifact.insert_type(SchemaType::new("bess.pb.DRRArg", "module_msg.proto"));
/// artifact.modules.push(ModuleEntry::new("DRR", ModuleKind::Mclass));
/// assert!(artifact.get_type("bess.pb.DRRArg").is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedArtifact {
    /// Runtime version reported by introspection.
    pub version: String,
    /// Schema types keyed by fully-qualified name.
    pub types: BTreeMap<String, SchemaType>,
    pub modules: Vec<ModuleEntry>,
}

impl CombinedArtifact {
    pub fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
            ..Self::default()
        }
    }

    /// Inserts a type keyed by its full name, replacing any previous one.
    pub fn insert_type(&mut self, ty: SchemaType) {
        self.types.insert(ty.full_name.clone(), ty);
    }

    pub fn get_type(&self, full_name: &str) -> Option<&SchemaType> {
        self.types.get(full_name)
    }

    /// Finds a module entry by name.
    pub fn find_module(&self, name: &str) -> Option<&ModuleEntry> {
        self.modules.iter().find(|m| m.name == name)
    }
}
