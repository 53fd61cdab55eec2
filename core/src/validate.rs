//! Artifact validation.
//!
//! Checks the structural invariants of a [`CombinedArtifact`]: module names
//! are unique, every schema reference made by a module or command resolves,
//! field references resolve, and locations use 1-based lines. Pruned
//! artifacts are additionally checked for untagged survivors.
//!
//! # Examples
//!
//! ```
//! use modcat_core::*;
//!
//! let mut artifact = CombinedArtifact::new("dev");
//! let mut m = ModuleEntry::new("Queue", ModuleKind::Mclass);
//! m.arg = Some("bess.pb.QueueArg".into());
//! artifact.modules.push(m);
//!
//! let errors = validate_artifact(&artifact);
//! assert_eq!(
//!     errors,
//!     vec![ValidationError::DanglingReference {
//!         owner: "Queue".into(),
//!         target: "bess.pb.QueueArg".into(),
//!     }],
//! );
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::{CombinedArtifact, SourceLocation};

/// Artifact validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Module name is empty or whitespace-only.
    #[error("module name cannot be empty")]
    EmptyModuleName,
    /// Two module entries share a name.
    #[error("duplicate module: {0}")]
    DuplicateModule(String),
    /// Two commands in one module share a name.
    #[error("duplicate command {command} in module {module}")]
    DuplicateCommand { module: String, command: String },
    /// A module or command references a schema type missing from the artifact.
    #[error("{owner} references unknown schema type {target}")]
    DanglingReference { owner: String, target: String },
    /// A field references a message type missing from the artifact.
    #[error("field {owner} references unknown schema type {target}")]
    DanglingField { owner: String, target: String },
    /// A location uses line 0.
    #[error("invalid line 0 in location for {0}")]
    InvalidLine(String),
    /// A type survived pruning without a dependency tag.
    #[error("schema type {0} has no dependency tag")]
    Untagged(String),
}

/// Validates a linked or pruned artifact. Returns every problem found.
pub fn validate_artifact(artifact: &CombinedArtifact) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut module_names = HashSet::new();

    for module in &artifact.modules {
        if module.name.trim().is_empty() {
            errors.push(ValidationError::EmptyModuleName);
        } else if !module_names.insert(module.name.as_str()) {
            errors.push(ValidationError::DuplicateModule(module.name.clone()));
        }

        if let Some(arg) = &module.arg {
            check_ref(artifact, &module.name, arg, &mut errors);
        }
        check_location(module.location.as_ref(), &module.name, &mut errors);
        for example in &module.examples {
            check_location(Some(example), &module.name, &mut errors);
        }

        let mut cmd_names = HashSet::new();
        for cmd in &module.cmds {
            let owner = format!("{}.{}", module.name, cmd.cmd);
            if !cmd_names.insert(cmd.cmd.as_str()) {
                errors.push(ValidationError::DuplicateCommand {
                    module: module.name.clone(),
                    command: cmd.cmd.clone(),
                });
            }
            for target in cmd.schema_refs() {
                check_ref(artifact, &owner, target, &mut errors);
            }
            check_location(cmd.location.as_ref(), &owner, &mut errors);
        }
    }

    let pruned = artifact.types.values().any(|ty| ty.dep.is_some());
    for ty in artifact.types.values() {
        for field in &ty.fields {
            if let Some(target) = &field.full_type {
                if !artifact.types.contains_key(target) {
                    errors.push(ValidationError::DanglingField {
                        owner: format!("{}.{}", ty.full_name, field.name),
                        target: target.clone(),
                    });
                }
            }
        }
        if ty.line == Some(0) {
            errors.push(ValidationError::InvalidLine(ty.full_name.clone()));
        }
        if pruned && ty.dep.is_none() {
            errors.push(ValidationError::Untagged(ty.full_name.clone()));
        }
    }

    errors
}

fn check_ref(
    artifact: &CombinedArtifact,
    owner: &str,
    target: &str,
    errors: &mut Vec<ValidationError>,
) {
    if !artifact.types.contains_key(target) {
        errors.push(ValidationError::DanglingReference {
            owner: owner.to_string(),
            target: target.to_string(),
        });
    }
}

fn check_location(location: Option<&SourceLocation>, owner: &str, errors: &mut Vec<ValidationError>) {
    if location.is_some_and(|loc| loc.line == 0) {
        errors.push(ValidationError::InvalidLine(owner.to_string()));
    }
}
