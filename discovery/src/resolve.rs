//! Definition resolution for module constructors and commands.
//!
//! A command is resolved by querying the symbol oracle with the candidates
//! from [`symbol_candidates`], first hit wins. Constructors get one extra
//! rule: when the only definition the oracle finds is the generic
//! implementation in the base module source, the module's `ProcessBatch` is
//! reported instead, since that is where a reader learns what the module
//! does.

use std::path::Path;

use modcat_core::names::symbol_candidates;
use modcat_core::{CONSTRUCTOR, DEFAULT_GENERIC_DISPATCH_FILE, SourceLocation};
use tracing::{debug, warn};

use crate::error::Result;
use crate::oracle::SymbolLocator;

/// Per-class packet processing entry point.
const PROCESS_BATCH: &str = "ProcessBatch";

/// Resolves classes and commands to source locations.
pub struct DefinitionResolver<'a> {
    locator: &'a mut dyn SymbolLocator,
    generic_dispatch_file: String,
}

impl<'a> DefinitionResolver<'a> {
    pub fn new(locator: &'a mut dyn SymbolLocator) -> Self {
        Self {
            locator,
            generic_dispatch_file: DEFAULT_GENERIC_DISPATCH_FILE.to_string(),
        }
    }

    /// Overrides the generic dispatch source file.
    pub fn with_generic_dispatch_file(mut self, file: &str) -> Self {
        self.generic_dispatch_file = file.to_string();
        self
    }

    /// Resolves `class`/`cmd` with argument schema `arg` (short name).
    ///
    /// Use [`CONSTRUCTOR`] as `cmd` for constructors. Oracle failures are
    /// returned as errors; exhausting all candidates is `Ok(None)`.
    pub fn resolve(&mut self, class: &str, cmd: &str, arg: &str) -> Result<Option<SourceLocation>> {
        for symbol in symbol_candidates(class, cmd, arg) {
            let Some(loc) = self.locator.locate(&symbol)? else {
                continue;
            };
            if cmd == CONSTRUCTOR && self.is_generic_dispatch(&loc) {
                return self.process_batch(class, &symbol);
            }
            debug!(class, cmd, symbol = %symbol, file = %loc.file, line = loc.line, "Resolved definition");
            return Ok(Some(loc));
        }
        debug!(class, cmd, arg, "No definition found");
        Ok(None)
    }

    /// Matches whole trailing path components, so `plugins/mycore/module.h`
    /// is not mistaken for `core/module.h`.
    fn is_generic_dispatch(&self, loc: &SourceLocation) -> bool {
        !self.generic_dispatch_file.is_empty()
            && Path::new(&loc.file).ends_with(&self.generic_dispatch_file)
    }

    fn process_batch(&mut self, class: &str, generic_symbol: &str) -> Result<Option<SourceLocation>> {
        let symbol = format!("{class}::{PROCESS_BATCH}");
        let found = self.locator.locate(&symbol)?;
        if found.is_none() {
            warn!(
                class,
                generic = generic_symbol,
                "Constructor resolves to generic dispatch and no ProcessBatch was found"
            );
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Recording {
        defined: HashMap<String, SourceLocation>,
        queries: Vec<String>,
    }

    impl Recording {
        fn define(mut self, symbol: &str, file: &str, line: u32) -> Self {
            self.defined
                .insert(symbol.to_string(), SourceLocation::new(file, line));
            self
        }
    }

    impl SymbolLocator for Recording {
        fn locate(&mut self, symbol: &str) -> Result<Option<SourceLocation>> {
            self.queries.push(symbol.to_string());
            Ok(self.defined.get(symbol).cloned())
        }
    }

    #[test]
    fn test_constructor_in_generic_dispatch_falls_back_to_process_batch() {
        let mut oracle = Recording::default()
            .define("DRR::Init", "core/module.h", 301)
            .define("DRR::ProcessBatch", "core/modules/drr.cc", 214);

        let loc = DefinitionResolver::new(&mut oracle)
            .resolve("DRR", CONSTRUCTOR, "DRRArg")
            .unwrap();
        assert_eq!(loc, Some(SourceLocation::new("core/modules/drr.cc", 214)));
        assert_eq!(oracle.queries, vec!["DRR::Init", "DRR::ProcessBatch"]);
    }

    #[test]
    fn test_constructor_tries_init_candidates_in_order() {
        let mut oracle = Recording::default();
        let loc = DefinitionResolver::new(&mut oracle)
            .resolve("DRR", CONSTRUCTOR, "DRRArg")
            .unwrap();
        assert_eq!(loc, None);
        assert_eq!(oracle.queries, vec!["DRR::Init", "DRR::CommandInit"]);
    }

    #[test]
    fn test_specialized_constructor_is_kept() {
        let mut oracle = Recording::default()
            .define("DRR::CommandInit", "core/modules/drr.cc", 60);
        let loc = DefinitionResolver::new(&mut oracle)
            .resolve("DRR", CONSTRUCTOR, "DRRArg")
            .unwrap();
        assert_eq!(loc, Some(SourceLocation::new("core/modules/drr.cc", 60)));
    }

    #[test]
    fn test_generic_dispatch_without_process_batch_is_absent() {
        let mut oracle = Recording::default().define("PMDPort::Init", "/abs/core/module.h", 5);
        let loc = DefinitionResolver::new(&mut oracle)
            .resolve("PMDPort", CONSTRUCTOR, "PMDPortArg")
            .unwrap();
        assert_eq!(loc, None);
    }

    #[test]
    fn test_command_prefers_schema_noun() {
        let mut oracle = Recording::default()
            .define("DRR::CommandSetQuantum", "core/modules/drr.cc", 120)
            .define("DRR::CommandQuantumSize", "core/modules/drr.cc", 1);
        let loc = DefinitionResolver::new(&mut oracle)
            .resolve("DRR", "set_quantum", "DRRCommandSetQuantumArg")
            .unwrap();
        assert_eq!(loc.map(|l| l.line), Some(120));
        assert_eq!(oracle.queries, vec!["DRR::SetQuantum", "DRR::CommandSetQuantum"]);
    }

    #[test]
    fn test_constructor_in_lookalike_path_is_kept() {
        let mut oracle = Recording::default()
            .define("Foo::Init", "plugins/mycore/module.h", 12)
            .define("Foo::ProcessBatch", "plugins/foo.cc", 3);
        let loc = DefinitionResolver::new(&mut oracle)
            .resolve("Foo", CONSTRUCTOR, "FooArg")
            .unwrap();
        assert_eq!(loc, Some(SourceLocation::new("plugins/mycore/module.h", 12)));
        assert_eq!(oracle.queries, vec!["Foo::Init"]);
    }

    #[test]
    fn test_non_constructor_in_generic_file_is_kept() {
        let mut oracle = Recording::default().define("Port::GetStats", "core/module.h", 77);
        let loc = DefinitionResolver::new(&mut oracle)
            .resolve("Port", "get_stats", "EmptyArg")
            .unwrap();
        assert_eq!(loc, Some(SourceLocation::new("core/module.h", 77)));
    }

    #[test]
    fn test_custom_generic_dispatch_file() {
        let mut oracle = Recording::default()
            .define("Queue::Init", "core/module.cc", 10)
            .define("Queue::ProcessBatch", "core/modules/queue.cc", 99);
        let loc = DefinitionResolver::new(&mut oracle)
            .with_generic_dispatch_file("core/module.cc")
            .resolve("Queue", CONSTRUCTOR, "QueueArg")
            .unwrap();
        assert_eq!(loc.map(|l| l.line), Some(99));
    }
}
