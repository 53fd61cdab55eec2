//! Cross-referencing runtime modules against the schema catalog.
//!
//! [`Linker`] turns the introspection document into [`ModuleEntry`] values:
//! constructor schemas are matched by naming convention, command result
//! types are inferred, and (when collaborators are attached) definitions and
//! usage examples are located.
//!
//! # Example
//!
//! ```
//! use modcat_core::{Field, SchemaCatalog, SchemaType};
//! use modcat_discovery::inputs::Introspection;
//! use modcat_discovery::link::Linker;
//!
//! let mut catalog = SchemaCatalog::new();
//! catalog.insert(SchemaType::new("bess.pb.EmptyArg", "bess_msg.proto"));
//! catalog.insert(
//!     SchemaType::new("bess.pb.RateArg", "module_msg.proto")
//!         .with_field(Field::scalar("rate", "uint64")),
//! );
//!
//! let introspection: Introspection = serde_json::from_str(r#"{
//!     "globals": [{"type": "mclass", "name": "Limiter", "cmds": [
//!         {"cmd": "get_rate", "arg": "EmptyArg"},
//!         {"cmd": "set_rate", "arg": "RateArg"}
//!     ]}],
//!     "bess-version": "0.4.0"
//! }"#).unwrap();
//!
//! let artifact = Linker::new(catalog).link(&introspection).unwrap();
//! let limiter = artifact.find_module("Limiter").unwrap();
//! assert_eq!(
//!     limiter.find_command("get_rate").unwrap().ret.as_deref(),
//!     Some("bess.pb.RateArg"),
//! );
//! ```

use std::path::PathBuf;

use modcat_core::names::{
    constructor_arg_candidates, constructor_arg_name, doc_arg_candidates, response_name,
    setter_for,
};
use modcat_core::{
    CONSTRUCTOR, Command, CombinedArtifact, EMPTY_ARG, ModuleEntry, SchemaCatalog, SchemaType,
};
use tracing::{debug, info};

use crate::error::Result;
use crate::inputs::{IntrospectedCommand, IntrospectedModule, Introspection};
use crate::resolve::DefinitionResolver;
use crate::search::{UsageSearch, find_examples};

/// Builds a [`CombinedArtifact`] from a catalog and an introspection document.
pub struct Linker<'a> {
    catalog: SchemaCatalog,
    resolver: Option<DefinitionResolver<'a>>,
    search: Option<&'a mut dyn UsageSearch>,
    sample_dirs: Vec<PathBuf>,
}

impl<'a> Linker<'a> {
    /// Creates a linker that only matches names; no locations are attached.
    pub fn new(catalog: SchemaCatalog) -> Self {
        Self {
            catalog,
            resolver: None,
            search: None,
            sample_dirs: Vec::new(),
        }
    }

    /// Attaches a resolver for constructor and command locations.
    pub fn with_resolver(mut self, resolver: DefinitionResolver<'a>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Attaches a usage search over `sample_dirs`.
    pub fn with_search(mut self, search: &'a mut dyn UsageSearch, sample_dirs: Vec<PathBuf>) -> Self {
        self.search = Some(search);
        self.sample_dirs = sample_dirs;
        self
    }

    /// Links every introspected module and hands over the catalog's types.
    pub fn link(mut self, introspection: &Introspection) -> Result<CombinedArtifact> {
        let mut modules = Vec::with_capacity(introspection.globals.len());
        for module in &introspection.globals {
            modules.push(self.link_module(module)?);
        }

        let resolved_cmds = modules
            .iter()
            .flat_map(|m| &m.cmds)
            .filter(|c| c.location.is_some())
            .count();
        info!(
            modules = modules.len(),
            types = self.catalog.len(),
            resolved_cmds,
            "Linked runtime modules"
        );

        Ok(CombinedArtifact {
            version: introspection.version.clone(),
            types: self.catalog.into_types(),
            modules,
        })
    }

    /// Links one module entry.
    pub fn link_module(&mut self, module: &IntrospectedModule) -> Result<ModuleEntry> {
        let mut entry = ModuleEntry::new(&module.name, module.kind);
        entry.help = module.help.clone();

        let ctor = self.constructor_arg(&module.name);
        let ctor_short = ctor
            .map(|ty| ty.name.clone())
            .unwrap_or_else(|| constructor_arg_name(&module.name));
        entry.arg = ctor.map(|ty| ty.full_name.clone());

        if let Some(resolver) = self.resolver.as_mut() {
            entry.location = resolver.resolve(&module.name, CONSTRUCTOR, &ctor_short)?;
        }
        if let Some(search) = self.search.as_deref_mut() {
            entry.examples = find_examples(search, &module.name, &self.sample_dirs)?;
        }

        for cmd in &module.cmds {
            let mut linked = self.link_command(module, cmd, &ctor_short);
            if let Some(resolver) = self.resolver.as_mut() {
                linked.location = resolver.resolve(&module.name, &cmd.cmd, &cmd.arg)?;
            }
            entry.cmds.push(linked);
        }
        Ok(entry)
    }

    /// Finds the schema documenting `class`'s constructor.
    pub fn constructor_arg(&self, class: &str) -> Option<&SchemaType> {
        let found = constructor_arg_candidates(class)
            .iter()
            .find_map(|name| self.catalog.lookup_short(name));
        if found.is_none() {
            debug!(class, "No constructor argument schema");
        }
        found
    }

    fn link_command(
        &self,
        module: &IntrospectedModule,
        cmd: &IntrospectedCommand,
        ctor_short: &str,
    ) -> Command {
        let mut linked = Command::new(&cmd.cmd, &cmd.arg);
        let Some(arg_type) = self.catalog.lookup_short(&cmd.arg) else {
            debug!(module = %module.name, cmd = %cmd.cmd, arg = %cmd.arg, "Argument schema not in catalog");
            return linked;
        };
        linked.arg_type = Some(arg_type.full_name.clone());
        linked.ret = self.infer_result(module, cmd, arg_type);
        if arg_type.name == EMPTY_ARG {
            linked.doc_arg = self.doc_arg(ctor_short, &cmd.cmd);
        }
        linked
    }

    /// Infers a command's result schema.
    ///
    /// First the `Arg` → `Response` swap of the argument's full name, then the
    /// argument of the `set_` sibling of a `get_` command in the same module.
    /// Only non-trivial schemas qualify.
    pub fn infer_result(
        &self,
        module: &IntrospectedModule,
        cmd: &IntrospectedCommand,
        arg_type: &SchemaType,
    ) -> Option<String> {
        if let Some(response) = response_name(&arg_type.full_name) {
            if self.catalog.get(&response).is_some_and(|ty| !ty.is_trivial()) {
                return Some(response);
            }
        }

        let setter = setter_for(&cmd.cmd)?;
        let sibling = module.cmds.iter().find(|c| c.cmd == setter)?;
        let ty = self.catalog.lookup_short(&sibling.arg)?;
        (!ty.is_trivial()).then(|| ty.full_name.clone())
    }

    fn doc_arg(&self, ctor_short: &str, cmd: &str) -> Option<String> {
        doc_arg_candidates(ctor_short, cmd)
            .iter()
            .find_map(|name| self.catalog.lookup_short(name))
            .map(|ty| ty.full_name.clone())
    }
}
