//! Schema catalog merging with short-name collision handling.
//!
//! Several protobuf catalogs (the runtime's own plus any number of plugin
//! catalogs) are merged into one [`SchemaCatalog`] keyed by fully-qualified
//! name. Short names are not unique across catalogs: colliding members are
//! kept side by side and each receives a disambiguated display name.
//!
//! # Example
//!
//! ```
//! use modcat_core::{SchemaCatalog, SchemaType};
//!
//! let mut catalog = SchemaCatalog::new();
//! catalog.insert(SchemaType::new("bess.pb.FooArg", "module_msg.proto"));
//! catalog.insert(SchemaType::new("sample.FooArg", "plugin_msg.proto"));
//!
//! let collisions = catalog.disambiguate();
//! assert_eq!(collisions.len(), 1);
//! assert_eq!(catalog.lookup_short("FooArg").unwrap().full_name, "bess.pb.FooArg");
//! ```

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::names::display_name;
use crate::SchemaType;

/// A short name shared by several fully-qualified names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    pub short_name: String,
    /// Colliding full names in insertion order.
    pub full_names: Vec<String>,
}

/// Merged schema catalog with full-name identity and short-name lookup.
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    types: BTreeMap<String, SchemaType>,
    by_short: BTreeMap<String, Vec<String>>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a type. Returns `false` and keeps the existing definition when
    /// the full name is already present.
    pub fn insert(&mut self, ty: SchemaType) -> bool {
        if let Some(existing) = self.types.get(&ty.full_name) {
            warn!(
                full_name = %ty.full_name,
                kept = %existing.file,
                dropped = %ty.file,
                "Duplicate schema type, keeping first definition"
            );
            return false;
        }
        self.by_short
            .entry(ty.name.clone())
            .or_default()
            .push(ty.full_name.clone());
        self.types.insert(ty.full_name.clone(), ty);
        true
    }

    /// Assigns display names to every member of a short-name collision and
    /// returns the collisions found.
    pub fn disambiguate(&mut self) -> Vec<Collision> {
        let mut collisions = Vec::new();
        for (short, full_names) in &self.by_short {
            if full_names.len() < 2 {
                continue;
            }
            warn!(short_name = %short, full_names = ?full_names, "Schema short name collision");
            for full in full_names {
                if let Some(ty) = self.types.get_mut(full) {
                    ty.display_name = Some(display_name(full));
                }
            }
            collisions.push(Collision {
                short_name: short.clone(),
                full_names: full_names.clone(),
            });
        }
        collisions
    }

    /// Looks up a type by fully-qualified name.
    pub fn get(&self, full_name: &str) -> Option<&SchemaType> {
        self.types.get(full_name)
    }

    /// Looks up a type by short name. On collision the first inserted member
    /// wins.
    pub fn lookup_short(&self, short: &str) -> Option<&SchemaType> {
        let full_names = self.by_short.get(short)?;
        if full_names.len() > 1 {
            debug!(short_name = %short, chosen = %full_names[0], "Ambiguous short name lookup");
        }
        self.types.get(full_names.first()?)
    }

    /// All full names sharing `short`, in insertion order.
    pub fn full_names_for(&self, short: &str) -> &[String] {
        self.by_short.get(short).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, full_name: &str) -> bool {
        self.types.contains_key(full_name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SchemaType> {
        self.types.values()
    }

    /// Consumes the catalog, returning the types keyed by full name.
    pub fn into_types(self) -> BTreeMap<String, SchemaType> {
        self.types
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Field;

    #[test]
    fn test_collision_gets_distinct_display_names() {
        let mut catalog = SchemaCatalog::new();
        catalog.insert(
            SchemaType::new("bess.pb.RateArg", "module_msg.proto")
                .with_field(Field::scalar("rate", "uint64")),
        );
        catalog.insert(
            SchemaType::new("sample.plugin.RateArg", "plugin_msg.proto")
                .with_field(Field::scalar("pps", "double")),
        );

        let collisions = catalog.disambiguate();
        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].short_name, "RateArg");
        assert_eq!(catalog.len(), 2);

        let a = catalog.get("bess.pb.RateArg").unwrap();
        let b = catalog.get("sample.plugin.RateArg").unwrap();
        assert_eq!(a.display_name.as_deref(), Some("bess_pb_RateArg"));
        assert_eq!(b.display_name.as_deref(), Some("sample_plugin_RateArg"));
        assert_ne!(a.display_name, b.display_name);
        assert_eq!(a.fields[0].name, "rate");
        assert_eq!(b.fields[0].name, "pps");

        assert_eq!(
            catalog.full_names_for("RateArg"),
            &["bess.pb.RateArg".to_string(), "sample.plugin.RateArg".to_string()]
        );
    }

    #[test]
    fn test_unique_short_name_has_no_display_name() {
        let mut catalog = SchemaCatalog::new();
        catalog.insert(SchemaType::new("bess.pb.DRRArg", "module_msg.proto"));
        assert!(catalog.disambiguate().is_empty());
        assert!(catalog.get("bess.pb.DRRArg").unwrap().display_name.is_none());
    }

    #[test]
    fn test_duplicate_full_name_keeps_first() {
        let mut catalog = SchemaCatalog::new();
        assert!(catalog.insert(SchemaType::new("bess.pb.DRRArg", "a.proto")));
        assert!(!catalog.insert(SchemaType::new("bess.pb.DRRArg", "b.proto")));
        assert_eq!(catalog.get("bess.pb.DRRArg").unwrap().file, "a.proto");
        assert_eq!(catalog.full_names_for("DRRArg").len(), 1);
    }

    #[test]
    fn test_lookup_short_missing() {
        let catalog = SchemaCatalog::new();
        assert!(catalog.lookup_short("Nope").is_none());
        assert!(catalog.full_names_for("Nope").is_empty());
    }
}
