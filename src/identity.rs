use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Structure name fragments as they appear once Criterion has lowercased a
/// benchmark id. Longest first so greedy matching never stops early.
const STRUCTURE_TOKENS: &[(&str, &str)] = &[
    ("cardinalityestimator", "CardinalityEstimator"),
    ("hyperloglog", "HyperLogLog"),
    ("atomic", "Atomic"),
    ("plus", "Plus"),
    ("pf", "PF"),
];

/// The single `library::Structure` name every artifact is keyed by.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CanonicalIdentity {
    library: String,
    structure: String,
}

impl CanonicalIdentity {
    pub fn library(&self) -> &str {
        &self.library
    }

    pub fn structure(&self) -> &str {
        &self.structure
    }

    /// The directory name Criterion gives a benchmark named after this
    /// identity: `::` flattened to `__` and everything lowercased.
    pub fn encode(&self) -> String {
        format!(
            "{}__{}",
            self.library,
            self.structure.to_ascii_lowercase()
        )
    }
}

impl fmt::Display for CanonicalIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.library, self.structure)
    }
}

impl FromStr for CanonicalIdentity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize(s).ok_or_else(|| format!("unrecognized implementation name {s:?}"))
    }
}

impl TryFrom<String> for CanonicalIdentity {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<CanonicalIdentity> for String {
    fn from(id: CanonicalIdentity) -> Self {
        id.to_string()
    }
}

/// Ways a library and a structure name get joined on disk, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Separator {
    /// `hyperloglogplus::HyperLogLogPF`
    Path,
    /// `hyperloglogplus__hyperloglogpf`
    DoubleUnderscore,
    /// `hyperloglogplus-hyperloglogpf`
    Hyphen,
    /// `hyperloglogplus_hyperloglogpf`
    Underscore,
}

impl Separator {
    const ALL: [Separator; 4] = [
        Separator::Path,
        Separator::DoubleUnderscore,
        Separator::Hyphen,
        Separator::Underscore,
    ];

    fn split<'a>(&self, raw: &'a str) -> Option<(&'a str, &'a str)> {
        match self {
            Separator::Path => raw.split_once("::"),
            Separator::DoubleUnderscore => raw.split_once("__"),
            // Library names may contain underscores, structure names never do.
            Separator::Hyphen => raw.rsplit_once('-'),
            Separator::Underscore => raw.rsplit_once('_'),
        }
    }
}

/// Map a raw identifier found on disk to its canonical identity.
///
/// Returns `None` when the identifier does not split into a valid library
/// name and a structure made entirely of known name fragments. Callers are
/// expected to skip such artifacts.
pub fn normalize(raw: &str) -> Option<CanonicalIdentity> {
    let raw = raw.trim();
    Separator::ALL.iter().find_map(|sep| {
        let (library, structure) = sep.split(raw)?;
        Some(CanonicalIdentity {
            library: normalize_library(library)?,
            structure: expand_structure(structure)?,
        })
    })
}

fn normalize_library(raw: &str) -> Option<String> {
    let library = raw.to_ascii_lowercase();
    let valid = !library.is_empty()
        && !library.starts_with('_')
        && !library.ends_with('_')
        && !library.contains("__")
        && library
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    valid.then_some(library)
}

fn expand_structure(raw: &str) -> Option<String> {
    let lower = raw.to_ascii_lowercase();
    let mut rest = lower.as_str();
    let mut expanded = String::with_capacity(raw.len());

    while !rest.is_empty() {
        let (token, display) = STRUCTURE_TOKENS
            .iter()
            .find(|(token, _)| rest.starts_with(token))?;
        expanded.push_str(display);
        rest = &rest[token.len()..];
    }

    (!expanded.is_empty()).then_some(expanded)
}
