//! Symbol-location oracle backed by long-lived debugger sessions.
//!
//! Each binary image (the daemon executable and every plugin shared object)
//! gets one `gdb` process, opened on first use and reused for the rest of the
//! run. Answers are cached per (image, symbol) pair in [`SymbolIndex`], so
//! commands sharing a constructor never cost a second round-trip.
//!
//! # Example
//!
//! ```no_run
//! use modcat_discovery::oracle::{GdbOpener, SymbolIndex, SymbolLocator};
//!
//! let mut index = SymbolIndex::new(
//!     GdbOpener::new("gdb"),
//!     vec!["/src/bess/core/bessd".into()],
//!     "/src/bess",
//! );
//! if let Some(loc) = index.locate("DRR::ProcessBatch").unwrap() {
//!     println!("{}:{}", loc.file, loc.line);
//! }
//! index.close();
//! ```

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::LazyLock;
use std::time::Duration;

use modcat_core::SourceLocation;
use regex::Regex;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

use crate::error::{DiscoverError, Result};

/// Marker echoed after every request to delimit the answer.
const SENTINEL: &str = "@@modcat-end@@";

/// Grace period for a debugger to exit after `quit`.
const QUIT_TIMEOUT_MS: u64 = 2000;

static FOUND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"Line (\d+) of "([^"]+)""#).expect("static regex must compile"));
static NOT_FOUND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"not defined|No symbol .* in current context|No line number information")
        .expect("static regex must compile")
});

/// Parses the text `gdb` prints for `info line <symbol>`.
///
/// Returns `Ok(None)` for a not-defined answer and
/// [`DiscoverError::MalformedResponse`] for anything unrecognised.
///
/// # Examples
///
/// ```
/// use modcat_discovery::oracle::parse_info_line;
///
/// let found = parse_info_line(
///     "DRR::ProcessBatch",
///     "Line 214 of \"modules/drr.cc\" starts at address 0x4f2a10 <DRR::ProcessBatch>",
/// )
/// .unwrap()
/// .unwrap();
/// assert_eq!((found.file.as_str(), found.line), ("modules/drr.cc", 214));
///
/// let missing = parse_info_line("DRR::Nope", "Function \"DRR::Nope\" not defined.").unwrap();
/// assert!(missing.is_none());
///
/// assert!(parse_info_line("DRR::Init", "Segmentation fault").is_err());
/// ```
pub fn parse_info_line(symbol: &str, response: &str) -> Result<Option<SourceLocation>> {
    if let Some(caps) = FOUND_RE.captures(response) {
        let line = caps[1]
            .parse::<u32>()
            .map_err(|_| DiscoverError::MalformedResponse {
                symbol: symbol.to_string(),
                response: response.to_string(),
            })?;
        return Ok(Some(SourceLocation::new(&caps[2], line)));
    }
    if NOT_FOUND_RE.is_match(response) {
        return Ok(None);
    }
    Err(DiscoverError::MalformedResponse {
        symbol: symbol.to_string(),
        response: response.to_string(),
    })
}

/// A symbol oracle bound to one binary image.
pub trait SymbolOracle {
    /// Locates `symbol`, returning the raw (unrelativized) location.
    fn query(&mut self, symbol: &str) -> Result<Option<SourceLocation>>;

    /// Ends the session.
    fn close(&mut self) {}
}

/// Opens a [`SymbolOracle`] for an image.
pub trait OracleOpener {
    fn open(&mut self, image: &Path) -> Result<Box<dyn SymbolOracle>>;
}

/// Resolves a symbol across every known image.
pub trait SymbolLocator {
    fn locate(&mut self, symbol: &str) -> Result<Option<SourceLocation>>;
}

/// An interactive `gdb` session over one image.
pub struct GdbSession {
    image: PathBuf,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl GdbSession {
    /// Starts `gdb` on `image` and waits until symbols are loaded.
    pub fn open(gdb: &Path, image: &Path) -> Result<Self> {
        // stderr carries "not defined" answers; merge it so answers stay in order.
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(r#"exec "$0" -q -nx "$1" 2>&1"#)
            .arg(gdb)
            .arg(image)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| DiscoverError::OracleSpawn {
                image: image.to_path_buf(),
                source,
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(DiscoverError::OracleClosed(image.to_path_buf()));
        };

        let mut session = Self {
            image: image.to_path_buf(),
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout),
        };
        session.send("set pagination off\nset confirm off\nset width 0")?;
        let banner = session.read_until_sentinel()?;
        debug!(image = %image.display(), lines = banner.lines().count(), "Symbol oracle ready");
        Ok(session)
    }

    fn send(&mut self, commands: &str) -> Result<()> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(DiscoverError::OracleClosed(self.image.clone()));
        };
        writeln!(stdin, "{commands}")
            .and_then(|_| writeln!(stdin, "echo {SENTINEL}\\n"))
            .and_then(|_| stdin.flush())
            .map_err(|_| DiscoverError::OracleClosed(self.image.clone()))
    }

    fn read_until_sentinel(&mut self) -> Result<String> {
        let mut answer = Vec::new();
        let mut line = String::new();
        loop {
            line.clear();
            let read = self.stdout.read_line(&mut line)?;
            if read == 0 {
                return Err(DiscoverError::OracleClosed(self.image.clone()));
            }
            let text = strip_prompts(line.trim_end());
            if text.ends_with(SENTINEL) {
                break;
            }
            if !text.is_empty() {
                answer.push(text.to_string());
            }
        }
        Ok(answer.join("\n"))
    }
}

fn strip_prompts(mut line: &str) -> &str {
    while let Some(rest) = line.strip_prefix("(gdb) ") {
        line = rest;
    }
    line.trim()
}

impl SymbolOracle for GdbSession {
    fn query(&mut self, symbol: &str) -> Result<Option<SourceLocation>> {
        self.send(&format!("info line {symbol}"))?;
        let response = self.read_until_sentinel()?;
        parse_info_line(symbol, &response)
    }

    fn close(&mut self) {
        if let Some(mut stdin) = self.stdin.take() {
            let _ = writeln!(stdin, "quit");
            let _ = stdin.flush();
        }
        match self
            .child
            .wait_timeout(Duration::from_millis(QUIT_TIMEOUT_MS))
        {
            Ok(Some(_)) => {}
            Ok(None) => {
                debug!(image = %self.image.display(), "Symbol oracle did not quit, killing process");
                let _ = self.child.kill();
                let _ = self.child.wait();
            }
            Err(e) => {
                debug!(image = %self.image.display(), error = %e, "Failed to wait on symbol oracle");
                let _ = self.child.kill();
            }
        }
    }
}

impl Drop for GdbSession {
    fn drop(&mut self) {
        if self.stdin.is_some() {
            self.close();
        }
    }
}

/// Opens [`GdbSession`]s with a configurable `gdb` executable.
#[derive(Debug, Clone)]
pub struct GdbOpener {
    gdb: PathBuf,
}

impl GdbOpener {
    pub fn new(gdb: impl Into<PathBuf>) -> Self {
        Self { gdb: gdb.into() }
    }
}

impl OracleOpener for GdbOpener {
    fn open(&mut self, image: &Path) -> Result<Box<dyn SymbolOracle>> {
        Ok(Box::new(GdbSession::open(&self.gdb, image)?))
    }
}

/// Per-run cache of oracle sessions and their answers.
///
/// Images are queried in order; the first image that defines a symbol wins.
pub struct SymbolIndex<O: OracleOpener> {
    opener: O,
    images: Vec<PathBuf>,
    root: PathBuf,
    sessions: HashMap<PathBuf, Box<dyn SymbolOracle>>,
    answers: HashMap<(PathBuf, String), Option<SourceLocation>>,
}

impl<O: OracleOpener> SymbolIndex<O> {
    /// Creates an index over `images`; returned paths are made relative to
    /// `root`.
    pub fn new(opener: O, images: Vec<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self {
            opener,
            images,
            root: root.into(),
            sessions: HashMap::new(),
            answers: HashMap::new(),
        }
    }

    /// Drops images that do not exist on disk, logging each one.
    pub fn retain_existing(mut self) -> Self {
        self.images.retain(|image| {
            let exists = image.is_file();
            if !exists {
                warn!(image = %image.display(), "Oracle image not found, skipping");
            }
            exists
        });
        self
    }

    pub fn images(&self) -> &[PathBuf] {
        &self.images
    }

    /// Number of sessions opened so far.
    pub fn open_sessions(&self) -> usize {
        self.sessions.len()
    }

    fn query_image(&mut self, image: &Path, symbol: &str) -> Result<Option<SourceLocation>> {
        let key = (image.to_path_buf(), symbol.to_string());
        if let Some(cached) = self.answers.get(&key) {
            return Ok(cached.clone());
        }
        if !self.sessions.contains_key(image) {
            let session = self.opener.open(image)?;
            self.sessions.insert(image.to_path_buf(), session);
        }
        let session = self
            .sessions
            .get_mut(image)
            .ok_or_else(|| DiscoverError::OracleClosed(image.to_path_buf()))?;
        let answer = session
            .query(symbol)?
            .map(|loc| loc.relative_to(&self.root));
        self.answers.insert(key, answer.clone());
        Ok(answer)
    }

    /// Closes every open session.
    pub fn close(&mut self) {
        for (image, mut session) in self.sessions.drain() {
            debug!(image = %image.display(), "Closing symbol oracle");
            session.close();
        }
    }
}

impl<O: OracleOpener> SymbolLocator for SymbolIndex<O> {
    fn locate(&mut self, symbol: &str) -> Result<Option<SourceLocation>> {
        for image in self.images.clone() {
            if let Some(loc) = self.query_image(&image, symbol)? {
                return Ok(Some(loc));
            }
        }
        debug!(symbol, "Symbol not defined in any image");
        Ok(None)
    }
}

impl<O: OracleOpener> Drop for SymbolIndex<O> {
    fn drop(&mut self) {
        self.close();
    }
}
