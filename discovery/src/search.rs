//! Usage-example search over sample script directories.

use std::path::{Path, PathBuf};
use std::process::Command;

use modcat_core::SourceLocation;
use tracing::debug;

use crate::error::{DiscoverError, Result};

/// Finds call sites (`<ident>(`) of an identifier under a directory.
pub trait UsageSearch {
    /// Returns occurrences in no particular order; an empty list means no
    /// matches.
    fn search(&mut self, ident: &str, dir: &Path) -> Result<Vec<SourceLocation>>;
}

/// [`UsageSearch`] backed by `grep -rnE`.
#[derive(Debug, Clone)]
pub struct GrepSearch {
    root: PathBuf,
}

impl GrepSearch {
    /// Result paths are made relative to `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl UsageSearch for GrepSearch {
    fn search(&mut self, ident: &str, dir: &Path) -> Result<Vec<SourceLocation>> {
        let pattern = format!(r"(^|[^A-Za-z0-9_]){}\(", regex::escape(ident));
        let output = Command::new("grep")
            .arg("-rnE")
            .arg(&pattern)
            .arg(dir)
            .output()?;

        match output.status.code() {
            Some(0) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                Ok(parse_grep_output(&stdout)
                    .into_iter()
                    .map(|loc| loc.relative_to(&self.root))
                    .collect())
            }
            Some(1) => {
                debug!(ident, dir = %dir.display(), "No usage examples found");
                Ok(Vec::new())
            }
            code => Err(DiscoverError::SearchFailed {
                ident: ident.to_string(),
                dir: dir.to_path_buf(),
                code,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }
}

/// Parses `path:line:text` lines. Lines without a numeric line field are
/// skipped.
///
/// # Examples
///
/// ```
/// use modcat_discovery::search::parse_grep_output;
///
/// let hits = parse_grep_output("conf/drr.bess:12:d = DRR(num_flows=4)\nbinary file matches\n");
/// assert_eq!(hits.len(), 1);
/// assert_eq!((hits[0].file.as_str(), hits[0].line), ("conf/drr.bess", 12));
/// ```
pub fn parse_grep_output(stdout: &str) -> Vec<SourceLocation> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut parts = line.splitn(3, ':');
            let file = parts.next()?;
            let line_no = parts.next()?.parse::<u32>().ok()?;
            parts.next()?;
            Some(SourceLocation::new(file, line_no))
        })
        .collect()
}

/// Collects usage examples of `ident` under every directory, sorted by
/// (file, line) and deduplicated.
pub fn find_examples(
    search: &mut dyn UsageSearch,
    ident: &str,
    dirs: &[PathBuf],
) -> Result<Vec<SourceLocation>> {
    let mut examples = Vec::new();
    for dir in dirs {
        examples.extend(search.search(ident, dir)?);
    }
    examples.sort();
    examples.dedup();
    Ok(examples)
}
