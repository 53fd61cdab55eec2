//! Linking runtime module introspection against protobuf schema catalogs.
//!
//! This crate produces the [`CombinedArtifact`] from its two inputs and two
//! external oracles:
//!
//! - [`inputs`]: `protoc-gen-doc` catalog documents and the runtime
//!   introspection document, merged into a [`SchemaCatalog`].
//! - [`oracle`]: symbol locations from long-lived `gdb` sessions, one per
//!   binary image, with per-run answer caching.
//! - [`search`]: usage examples found with `grep` in sample directories.
//! - [`resolve`]: the ordered symbol-candidate chain for constructors and
//!   commands.
//! - [`link`]: the [`Linker`](link::Linker) tying it all together.
//!
//! Oracle and search collaborators are traits, so the linker runs without
//! any external process when location metadata is switched off.
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use modcat_discovery::inputs::{CatalogSource, Introspection, build_catalog};
//! use modcat_discovery::link::Linker;
//!
//! let source = CatalogSource {
//!     source_dir: "protobuf".into(),
//!     doc: serde_json::from_str(r#"{"files": [{"name": "module_msg.proto",
//!         "messages": [{"name": "QueueArg", "fullName": "bess.pb.QueueArg",
//!                       "fields": [{"name": "size", "type": "uint64", "fullType": "uint64"}]}]}]}"#)
//!         .unwrap(),
//! };
//! let catalog = build_catalog(&[source], Path::new("."));
//!
//! let introspection: Introspection = serde_json::from_str(
//!     r#"{"globals": [{"type": "mclass", "name": "Queue", "cmds": []}], "bess-version": "dev"}"#,
//! )
//! .unwrap();
//!
//! let artifact = Linker::new(catalog).link(&introspection).unwrap();
//! assert_eq!(artifact.modules[0].arg.as_deref(), Some("bess.pb.QueueArg"));
//! ```
//!
//! [`CombinedArtifact`]: modcat_core::CombinedArtifact
//! [`SchemaCatalog`]: modcat_core::SchemaCatalog

mod error;
pub mod inputs;
pub mod link;
pub mod oracle;
pub mod resolve;
pub mod search;

pub use error::{DiscoverError, Result};
