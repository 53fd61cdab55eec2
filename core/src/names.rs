//! Naming-convention helpers shared by the resolver and the linker.
//!
//! The runtime names classes and commands one way (`DRR`, `set_quantum`)
//! while the schema catalog and the C++ sources use another (`DRRArg`,
//! `DRR::CommandSetQuantum`). These functions bridge the conventions.

use std::sync::LazyLock;

use regex::Regex;

/// Suffix carried by argument schemas.
pub const ARG_SUFFIX: &str = "Arg";

/// Suffix carried by result schemas.
pub const RESPONSE_SUFFIX: &str = "Response";

static CAP_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.)([A-Z][a-z]+)").expect("static regex must compile"));
static LOWER_UPPER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("static regex must compile"));
static COMMAND_ARG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9_]+?)Command([A-Za-z0-9_]+)Arg$").expect("static regex must compile")
});

/// Joins underscore-separated words into TitleCase.
///
/// # Examples
///
/// ```
/// use modcat_core::names::title_case;
///
/// assert_eq!(title_case("get_rate"), "GetRate");
/// assert_eq!(title_case("__init__"), "Init");
/// assert_eq!(title_case("drr_arg"), "DrrArg");
/// ```
pub fn title_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Converts a CamelCase identifier to snake_case.
///
/// Capitalized words following any character get a separator, then a lower
/// case letter or digit followed by an upper case letter gets one.
///
/// # Examples
///
/// ```
/// use modcat_core::names::snake_case;
///
/// assert_eq!(snake_case("DRRArg"), "drr_arg");
/// assert_eq!(snake_case("IPLookupArg"), "ip_lookup_arg");
/// ```
pub fn snake_case(name: &str) -> String {
    let first = CAP_WORD_RE.replace_all(name, "${1}_${2}");
    LOWER_UPPER_RE
        .replace_all(&first, "${1}_${2}")
        .to_lowercase()
}

/// Schema name expected to document `class`'s constructor.
pub fn constructor_arg_name(class: &str) -> String {
    format!("{class}{ARG_SUFFIX}")
}

/// Ordered schema name candidates for `class`'s constructor.
///
/// The first candidate follows the runtime's own casing; the second rewrites
/// interior capital runs (`DRRArg` becomes `DrrArg`). Only one alternate is
/// produced, and none when the rewrite is a no-op.
///
/// # Examples
///
/// ```
/// use modcat_core::names::constructor_arg_candidates;
///
/// assert_eq!(constructor_arg_candidates("DRR"), vec!["DRRArg", "DrrArg"]);
/// assert_eq!(constructor_arg_candidates("Queue"), vec!["QueueArg"]);
/// ```
pub fn constructor_arg_candidates(class: &str) -> Vec<String> {
    let exact = constructor_arg_name(class);
    let alternate = title_case(&snake_case(&exact));
    if alternate == exact {
        vec![exact]
    } else {
        vec![exact, alternate]
    }
}

/// Strips a trailing `Arg` from a schema name.
pub fn strip_arg_suffix(name: &str) -> &str {
    name.strip_suffix(ARG_SUFFIX).unwrap_or(name)
}

/// Swaps the trailing `Arg` of a schema name for `Response`.
///
/// # Examples
///
/// ```
/// use modcat_core::names::response_name;
///
/// assert_eq!(
///     response_name("bess.pb.MeasureCommandGetSummaryArg").as_deref(),
///     Some("bess.pb.MeasureCommandGetSummaryResponse"),
/// );
/// assert_eq!(response_name("bess.pb.Rule"), None);
/// ```
pub fn response_name(full_name: &str) -> Option<String> {
    full_name
        .strip_suffix(ARG_SUFFIX)
        .map(|base| format!("{base}{RESPONSE_SUFFIX}"))
}

/// Maps a `get_` command to its `set_` sibling.
///
/// # Examples
///
/// ```
/// use modcat_core::names::setter_for;
///
/// assert_eq!(setter_for("get_rate").as_deref(), Some("set_rate"));
/// assert_eq!(setter_for("reset"), None);
/// ```
pub fn setter_for(cmd: &str) -> Option<String> {
    cmd.strip_prefix("get_")
        .filter(|rest| !rest.is_empty())
        .map(|rest| format!("set_{rest}"))
}

/// Candidate names for a schema that only documents an argument-less command.
///
/// `entry_arg` is the module's constructor schema short name.
///
/// # Examples
///
/// ```
/// use modcat_core::names::doc_arg_candidates;
///
/// assert_eq!(
///     doc_arg_candidates("QueueArg", "get_status"),
///     vec!["QueueGetStatusArg", "QueueCommandGetStatusArg"],
/// );
/// ```
pub fn doc_arg_candidates(entry_arg: &str, cmd: &str) -> Vec<String> {
    let base = strip_arg_suffix(entry_arg);
    let verb = title_case(cmd);
    vec![
        format!("{base}{verb}{ARG_SUFFIX}"),
        format!("{base}Command{verb}{ARG_SUFFIX}"),
    ]
}

/// Splits `<Noun>Command<Verb>Arg` into `(Noun, Verb)`.
///
/// # Examples
///
/// ```
/// use modcat_core::names::split_command_arg;
///
/// assert_eq!(split_command_arg("DRRCommandSetQuantumArg"), Some(("DRR", "SetQuantum")));
/// assert_eq!(split_command_arg("DRRArg"), None);
/// ```
pub fn split_command_arg(arg: &str) -> Option<(&str, &str)> {
    let caps = COMMAND_ARG_RE.captures(arg)?;
    let noun = caps.get(1)?.as_str();
    let verb = caps.get(2)?.as_str();
    Some((noun, verb))
}

/// Ordered symbol candidates for a class/command pair.
///
/// # Examples
///
/// ```
/// use modcat_core::names::symbol_candidates;
///
/// assert_eq!(
///     symbol_candidates("DRR", "set_quantum", "DRRCommandSetQuantumArg"),
///     vec![
///         "DRR::SetQuantum",
///         "DRR::CommandSetQuantum",
///     ],
/// );
/// assert_eq!(
///     symbol_candidates("DRR", "__init__", "DRRArg"),
///     vec!["DRR::Init", "DRR::CommandInit"],
/// );
/// ```
pub fn symbol_candidates(class: &str, cmd: &str, arg: &str) -> Vec<String> {
    let mut candidates = Vec::new();
    if let Some((noun, verb)) = split_command_arg(arg) {
        candidates.push(format!("{noun}::{verb}"));
        candidates.push(format!("{noun}::Command{verb}"));
    }
    let verb = title_case(cmd);
    candidates.push(format!("{class}::{verb}"));
    candidates.push(format!("{class}::Command{verb}"));

    let mut seen = std::collections::HashSet::new();
    candidates.retain(|c| seen.insert(c.clone()));
    candidates
}

/// Disambiguated display name derived from a fully-qualified name.
pub fn display_name(full_name: &str) -> String {
    full_name.replace('.', "_")
}
