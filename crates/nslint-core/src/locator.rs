//! Resolution of `Service-Component` entries to bundle resources.

use regex::Regex;
use tracing::debug;

use crate::glob::{glob_to_regex, has_wildcard};
use crate::reporter::Reporter;
use crate::types::{Diagnostic, DiagnosticKind};

/// Directory component descriptors live under.
pub const DESCRIPTOR_ROOT: &str = "OSGI-INF/";

/// A wildcard entry whose translated glob is not a valid regular expression.
#[derive(Debug, Clone, thiserror::Error, miette::Diagnostic)]
#[error("invalid descriptor pattern `{entry}` in Service-Component header: {reason}")]
#[diagnostic(
    code(nslint::invalid_descriptor_glob),
    help("check for unbalanced `[` or `]` in the Service-Component header")
)]
pub struct InvalidDescriptorGlob {
    /// The entry after prefixing with the descriptor root.
    pub entry: String,
    /// Regex compiler message.
    pub reason: String,
}

/// One entry of the `Service-Component` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorEntry {
    /// A concrete resource path.
    Exact(String),
    /// A glob over resource paths.
    Pattern(String),
}

impl DescriptorEntry {
    /// Returns the entry text, prefixed with [`DESCRIPTOR_ROOT`].
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Exact(s) | Self::Pattern(s) => s,
        }
    }
}

/// Splits a `Service-Component` header into entries.
///
/// Entries are trimmed, blank entries are dropped and entries not already
/// under [`DESCRIPTOR_ROOT`] are prefixed with it.
#[must_use]
pub fn parse_header(header: &str) -> Vec<DescriptorEntry> {
    header
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let path = if entry.starts_with(DESCRIPTOR_ROOT) {
                entry.to_string()
            } else {
                format!("{DESCRIPTOR_ROOT}{entry}")
            };
            if has_wildcard(&path) {
                DescriptorEntry::Pattern(path)
            } else {
                DescriptorEntry::Exact(path)
            }
        })
        .collect()
}

/// Resolves a `Service-Component` header against the bundle's resource paths.
///
/// Returns the matched paths in header order. See [`resolve_entry`] for how
/// each entry is handled.
///
/// # Errors
///
/// Returns an error if a wildcard entry does not translate into a valid
/// regular expression.
pub fn resolve(
    header: &str,
    resource_paths: &[String],
    reporter: &mut dyn Reporter,
) -> Result<Vec<String>, InvalidDescriptorGlob> {
    let mut resolved = Vec::new();
    for entry in parse_header(header) {
        resolved.extend(resolve_entry(&entry, resource_paths, reporter)?);
    }
    Ok(resolved)
}

/// Resolves one header entry against the bundle's resource paths.
///
/// A wildcard entry yields its matches in `resource_paths` order and reports
/// a trace when it matches nothing. An exact entry yields its path, or
/// reports a warning when the bundle lacks it.
///
/// # Errors
///
/// Returns an error if a wildcard entry does not translate into a valid
/// regular expression.
pub fn resolve_entry(
    entry: &DescriptorEntry,
    resource_paths: &[String],
    reporter: &mut dyn Reporter,
) -> Result<Vec<String>, InvalidDescriptorGlob> {
    match entry {
        DescriptorEntry::Pattern(glob) => {
            let regex = compile_glob(glob)?;
            let matched: Vec<String> = resource_paths
                .iter()
                .filter(|path| regex.is_match(path))
                .cloned()
                .collect();
            debug!("Descriptor pattern {glob} matched {} resource(s)", matched.len());
            if matched.is_empty() {
                reporter.report(Diagnostic::new(
                    DiagnosticKind::DescriptorPatternUnmatched,
                    [glob.as_str()],
                ));
            }
            Ok(matched)
        }
        DescriptorEntry::Exact(path) => {
            if resource_paths.iter().any(|p| p == path) {
                Ok(vec![path.clone()])
            } else {
                reporter.report(Diagnostic::new(
                    DiagnosticKind::DescriptorNotFound,
                    [path.as_str()],
                ));
                Ok(Vec::new())
            }
        }
    }
}

fn compile_glob(glob: &str) -> Result<Regex, InvalidDescriptorGlob> {
    Regex::new(&format!("^(?:{})$", glob_to_regex(glob))).map_err(|e| InvalidDescriptorGlob {
        entry: glob.to_string(),
        reason: e.to_string(),
    })
}
