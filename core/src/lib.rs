//! Core catalog types and pure reconciliation passes.
//!
//! This crate defines the model shared by every stage of the module catalog
//! pipeline:
//!
//! - [`SchemaType`] / [`Field`]: message definitions from the static
//!   protobuf catalog.
//! - [`ModuleEntry`] / [`Command`]: module classes and port drivers reported
//!   by the running runtime.
//! - [`CombinedArtifact`]: the cross-referenced artifact produced by linking.
//!
//! The passes here do no I/O:
//!
//! - [`names`] bridges the runtime's naming conventions and the catalog's.
//! - [`SchemaCatalog`] merges several catalogs and flags short-name
//!   collisions.
//! - [`prune`] removes types unreachable from any command.
//! - [`validate_artifact`] checks artifact invariants.
//!
//! # Example
//!
//! ```
//! use modcat_core::*;
//!
//! let mut artifact = CombinedArtifact::new("0.4.0");
//! artifact.insert_type(
//!     SchemaType::new("bess.pb.QueueArg", "module_msg.proto")
//!         .with_field(Field::scalar("size", "uint64")),
//! );
//! artifact.insert_type(SchemaType::new("bess.pb.Stray", "module_msg.proto"));
//!
//! let mut queue = ModuleEntry::new("Queue", ModuleKind::Mclass);
//! queue.arg = Some("bess.pb.QueueArg".into());
//! artifact.modules.push(queue);
//!
//! let report = prune(&mut artifact);
//! assert_eq!(report.removed, vec!["bess.pb.Stray".to_string()]);
//! assert!(validate_artifact(&artifact).is_empty());
//! ```

mod catalog;
pub mod names;
mod prune;
mod types;
mod validate;

pub use catalog::{Collision, SchemaCatalog};
pub use prune::{PruneReport, prune, reachable, root_set};
pub use types::*;
pub use validate::{ValidationError, validate_artifact};
