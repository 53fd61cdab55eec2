//! Reachability pruning over the schema type graph.
//!
//! Every module's constructor schema and every command's argument, result
//! and documentation-only schema is a root. Types reachable from the roots
//! through message-typed fields survive; all others are removed. Survivors
//! are tagged [`Dependency::Top`] (a root) or [`Dependency::Arg`] (reached
//! only through fields).
//!
//! # Example
//!
//! ```
//! use modcat_core::*;
//!
//! let mut artifact = CombinedArtifact::new("dev");
//! artifact.insert_type(
//!     SchemaType::new("bess.pb.ACLArg", "m.proto")
//!         .with_field(Field::message("rules", "bess.pb.ACLArg.Rule").repeated()),
//! );
//! artifact.insert_type(SchemaType::new("bess.pb.ACLArg.Rule", "m.proto"));
//! artifact.insert_type(SchemaType::new("bess.pb.Unused", "m.proto"));
//! let mut acl = ModuleEntry::new("ACL", ModuleKind::Mclass);
//! acl.arg = Some("bess.pb.ACLArg".into());
//! artifact.modules.push(acl);
//!
//! let report = prune(&mut artifact);
//! assert_eq!(report.removed, vec!["bess.pb.Unused".to_string()]);
//! assert_eq!(artifact.types["bess.pb.ACLArg.Rule"].dep, Some(Dependency::Arg));
//! ```

use std::collections::{BTreeSet, HashSet};

use tracing::{info, warn};

use crate::{CombinedArtifact, Dependency};

/// Outcome of a pruning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Types referenced directly by modules or commands.
    pub roots: usize,
    /// Types reached only through fields.
    pub reached: usize,
    /// Full names of removed types, sorted.
    pub removed: Vec<String>,
    /// Referenced identifiers absent from the catalog, sorted.
    pub unknown: Vec<String>,
}

/// Collects the root set of `artifact`, in a deterministic order.
pub fn root_set(artifact: &CombinedArtifact) -> BTreeSet<String> {
    let mut roots = BTreeSet::new();
    for module in &artifact.modules {
        if let Some(arg) = &module.arg {
            roots.insert(arg.clone());
        }
        for cmd in &module.cmds {
            roots.extend(cmd.schema_refs().map(String::from));
        }
    }
    roots
}

/// Full names reachable from the roots, including the roots themselves.
///
/// Unknown identifiers are returned separately instead of being walked.
pub fn reachable(
    artifact: &CombinedArtifact,
    roots: &BTreeSet<String>,
) -> (HashSet<String>, BTreeSet<String>) {
    let mut visited: HashSet<String> = HashSet::new();
    let mut unknown = BTreeSet::new();
    let mut stack: Vec<&str> = roots.iter().rev().map(String::as_str).collect();

    while let Some(name) = stack.pop() {
        if visited.contains(name) {
            continue;
        }
        let Some(ty) = artifact.types.get(name) else {
            unknown.insert(name.to_string());
            continue;
        };
        visited.insert(name.to_string());
        for reference in ty.references() {
            if !visited.contains(reference) {
                stack.push(reference);
            }
        }
    }

    (visited, unknown)
}

/// Removes unreachable types and tags survivors in place.
///
/// Running it again on its own output changes nothing.
pub fn prune(artifact: &mut CombinedArtifact) -> PruneReport {
    let roots = root_set(artifact);
    let (visited, unknown) = reachable(artifact, &roots);

    for name in &unknown {
        warn!(full_name = %name, "Referenced schema type not in catalog");
    }

    let removed: Vec<String> = artifact
        .types
        .keys()
        .filter(|name| !visited.contains(*name))
        .cloned()
        .collect();
    artifact.types.retain(|name, _| visited.contains(name));

    let mut report = PruneReport {
        removed,
        unknown: unknown.into_iter().collect(),
        ..PruneReport::default()
    };
    for (name, ty) in artifact.types.iter_mut() {
        if roots.contains(name) {
            ty.dep = Some(Dependency::Top);
            report.roots += 1;
        } else {
            ty.dep = Some(Dependency::Arg);
            report.reached += 1;
        }
    }

    info!(
        roots = report.roots,
        reached = report.reached,
        removed = report.removed.len(),
        "Pruned schema types"
    );
    report
}
