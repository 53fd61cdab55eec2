//! Staged run: link, prune, compact, with checkpoints between stages.

use std::path::Path;

use modcat_core::{CombinedArtifact, prune, validate_artifact};
use modcat_db::{
    Manifest, RunConfig, Stage, StoreError, compact, read_artifact, write_artifact, write_compact,
};
use modcat_discovery::DiscoverError;
use modcat_discovery::inputs::{CatalogSource, Introspection, build_catalog};
use modcat_discovery::link::Linker;
use modcat_discovery::oracle::{GdbOpener, SymbolIndex};
use modcat_discovery::resolve::DefinitionResolver;
use modcat_discovery::search::GrepSearch;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Discover(#[from] DiscoverError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Run switches after combining the config file with command-line flags.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub from_stage: Stage,
    pub resolve_locations: bool,
    pub find_examples: bool,
}

impl RunOptions {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            from_stage: Stage::Link,
            resolve_locations: config.resolve_locations,
            find_examples: config.find_examples,
        }
    }
}

/// One line of run output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSummary {
    pub stage: Stage,
    pub detail: String,
}

impl std::fmt::Display for StageSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stage {}: {} -> {}", self.stage, self.detail, self.stage.file_name())
    }
}

/// Runs every stage from `options.from_stage` to the end.
///
/// Resuming past the first stage requires the previous stage's checkpoint to
/// be recorded in the manifest with a matching checksum.
pub fn run(config: &RunConfig, options: &RunOptions) -> Result<Vec<StageSummary>> {
    config.validate()?;
    let out = config.output_dir();
    std::fs::create_dir_all(&out)?;
    let mut manifest = Manifest::load_or_default(&out)?;

    let mut artifact = match options.from_stage.previous() {
        Some(previous) => Some(read_artifact(manifest.verify(&out, previous)?)?),
        None => None,
    };

    let mut summaries = Vec::new();
    for stage in Stage::ALL.into_iter().filter(|s| *s >= options.from_stage) {
        info!(stage = stage.name(), "Stage started");
        let detail = match stage {
            Stage::Link => {
                let linked = link_stage(config, options)?;
                write_artifact(out.join(stage.file_name()), &linked)?;
                manifest.runtime_version = Some(linked.version.clone());
                let detail = format!(
                    "{} modules, {} types",
                    linked.modules.len(),
                    linked.types.len()
                );
                artifact = Some(linked);
                detail
            }
            Stage::Prune => {
                let mut current = take_artifact(&mut artifact, &out, &manifest)?;
                let report = prune(&mut current);
                for problem in validate_artifact(&current) {
                    warn!(%problem, "Pruned artifact failed validation");
                }
                write_artifact(out.join(stage.file_name()), &current)?;
                let detail = format!(
                    "{} types kept ({} roots), {} removed",
                    current.types.len(),
                    report.roots,
                    report.removed.len()
                );
                artifact = Some(current);
                detail
            }
            Stage::Compact => {
                let current = take_artifact(&mut artifact, &out, &manifest)?;
                let compacted = compact(&current)?;
                write_compact(out.join(stage.file_name()), &compacted)?;
                format!("{} files indexed", compacted.files.len() - 1)
            }
        };
        manifest.record(&out, stage)?;
        manifest.save(&out)?;
        info!(stage = stage.name(), %detail, "Stage finished");
        summaries.push(StageSummary { stage, detail });
    }
    Ok(summaries)
}

fn take_artifact(
    artifact: &mut Option<CombinedArtifact>,
    out: &Path,
    manifest: &Manifest,
) -> Result<CombinedArtifact> {
    match artifact.take() {
        Some(artifact) => Ok(artifact),
        None => Err(StoreError::MissingCheckpoint(format!(
            "no input artifact in {} ({} stages recorded)",
            out.display(),
            manifest.stages.len()
        ))
        .into()),
    }
}

/// Loads the inputs and links them, consulting the oracles the switches
/// allow. Debugger sessions are closed before returning.
pub fn link_stage(config: &RunConfig, options: &RunOptions) -> Result<CombinedArtifact> {
    let sources = config
        .catalogs
        .iter()
        .map(|c| CatalogSource::load(config.path(&c.source_dir), config.path(&c.doc)))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let catalog = build_catalog(&sources, &config.root);
    let introspection = Introspection::load(config.path(&config.introspection))?;

    let mut index = options.resolve_locations.then(|| {
        SymbolIndex::new(
            GdbOpener::new(&config.gdb),
            config.image_paths(),
            config.root.clone(),
        )
        .retain_existing()
    });
    let mut grep = GrepSearch::new(config.root.clone());

    let mut linker = Linker::new(catalog);
    if let Some(index) = index.as_mut() {
        linker = linker.with_resolver(
            DefinitionResolver::new(index)
                .with_generic_dispatch_file(&config.generic_dispatch_file),
        );
    }
    if options.find_examples {
        linker = linker.with_search(&mut grep, config.sample_dir_paths());
    }
    let linked = linker.link(&introspection);

    if let Some(mut index) = index {
        index.close();
    }

    let mut linked = linked?;
    if let Some(version) = &config.runtime_version {
        linked.version = version.clone();
    }
    Ok(linked)
}
