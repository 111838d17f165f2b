//! # nslint-config
//!
//! Turns build settings into a typed [`PatternRuleSet`].
//!
//! Settings arrive either as raw key/value pairs from a build tool (every
//! value a comma-separated list of regular expressions) or as a TOML file
//! using the same option names:
//!
//! ```toml
//! allowedExportPackagePatterns = "com\\.mycompany\\..*"
//! allowedServiceClassPatterns = ["com\\.mycompany\\..*", "org\\.osgi\\..*"]
//! ```
//!
//! Unknown option names are not an error; they are kept and can be reported
//! as warnings with [`Settings::report_unknown_keys`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod dto;

use std::path::{Path, PathBuf};

use nslint_core::{
    Diagnostic, DiagnosticKind, PatternError, PatternList, PatternRuleSet, Reporter, RuleSlot,
};
use tracing::{debug, warn};

use crate::dto::{split_entries, SettingsDto};

/// Errors while loading settings.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("Failed to read settings file {path}: {source}")]
    #[diagnostic(code(nslint::settings::io))]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The settings file is not valid TOML or has the wrong shape.
    #[error("Failed to parse settings: {message}")]
    #[diagnostic(
        code(nslint::settings::parse),
        help("each option must be a string or an array of strings")
    )]
    Parse {
        /// Parse error message.
        message: String,
    },

    /// A configured pattern is not a valid regular expression.
    #[error("{key}: {source}")]
    #[diagnostic(code(nslint::settings::invalid_pattern))]
    InvalidPattern {
        /// Option the pattern belongs to.
        key: String,
        /// The compile failure.
        source: PatternError,
    },
}

/// Validated namespace settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    rules: PatternRuleSet,
    unknown_keys: Vec<String>,
}

impl Settings {
    /// Builds settings from raw key/value pairs.
    ///
    /// Each value is split on commas; entries are trimmed and blank entries
    /// dropped. A later pair for the same key replaces an earlier one.
    ///
    /// # Errors
    ///
    /// Returns an error if any pattern fails to compile.
    pub fn from_properties<I, K, V>(properties: I) -> Result<Self, SettingsError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self::build(
            properties
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_string(), split_entries(v.as_ref()))),
        )
    }

    /// Loads settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if a
    /// pattern fails to compile.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|e| SettingsError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Parses settings from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or a pattern fails to compile.
    pub fn parse(content: &str) -> Result<Self, SettingsError> {
        let dto: SettingsDto = toml::from_str(content).map_err(|e| SettingsError::Parse {
            message: e.to_string(),
        })?;
        Self::build(dto.iter().map(|(key, value)| (key.clone(), value.entries())))
    }

    fn build(entries: impl Iterator<Item = (String, Vec<String>)>) -> Result<Self, SettingsError> {
        let mut rules = PatternRuleSet::new();
        let mut unknown_keys = Vec::new();

        for (key, patterns) in entries {
            let Some(slot) = RuleSlot::from_key(&key) else {
                unknown_keys.push(key);
                continue;
            };
            let list = PatternList::compile(&patterns)
                .map_err(|source| SettingsError::InvalidPattern {
                    key: key.clone(),
                    source,
                })?;
            debug!("{slot}: {} pattern(s)", list.len());
            rules = rules.with(slot, list);
        }

        unknown_keys.sort();
        unknown_keys.dedup();
        Ok(Self {
            rules,
            unknown_keys,
        })
    }

    /// Returns the rule set.
    #[must_use]
    pub fn rules(&self) -> &PatternRuleSet {
        &self.rules
    }

    /// Consumes the settings, returning the rule set.
    #[must_use]
    pub fn into_rules(self) -> PatternRuleSet {
        self.rules
    }

    /// Option names that did not match any check, sorted.
    #[must_use]
    pub fn unknown_keys(&self) -> &[String] {
        &self.unknown_keys
    }

    /// Emits one warning per unknown option name.
    pub fn report_unknown_keys(&self, reporter: &mut dyn Reporter) {
        for key in &self.unknown_keys {
            warn!("Ignoring unknown option {key}");
            reporter.report(Diagnostic::new(DiagnosticKind::UnknownConfigKey, [key.as_str()]));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nslint_core::{Report, Severity};
    use std::io::Write;

    #[test]
    fn properties_are_split_and_compiled() {
        let settings = Settings::from_properties([(
            "allowedExportPackagePatterns",
            r" com\.mycompany\..* , , org\.allowed\..*",
        )])
        .unwrap();
        let patterns = settings.rules().patterns(RuleSlot::ExportPackage).unwrap();
        assert_eq!(patterns.len(), 2);
        assert_eq!(patterns.joined(), r"com\.mycompany\..*,org\.allowed\..*");
        assert!(settings.unknown_keys().is_empty());
    }

    #[test]
    fn blank_value_leaves_check_disabled() {
        let settings =
            Settings::from_properties([("allowedServiceClassPatterns", " , ")]).unwrap();
        assert!(!settings.rules().is_enabled(RuleSlot::ServiceInterface));
        assert!(settings.rules().is_empty());
    }

    #[test]
    fn unknown_keys_are_sorted_and_reported() {
        let settings = Settings::from_properties([
            ("zzz", "x"),
            ("allowedBundleSymbolicNamePatterns", "com\\..*"),
            ("aaa", "y"),
        ])
        .unwrap();
        assert_eq!(settings.unknown_keys(), ["aaa", "zzz"]);

        let mut report = Report::new();
        settings.report_unknown_keys(&mut report);
        assert_eq!(report.diagnostics.len(), 2);
        assert!(report
            .diagnostics
            .iter()
            .all(|d| d.kind == DiagnosticKind::UnknownConfigKey && d.severity() == Severity::Warning));
        assert_eq!(report.diagnostics[0].params, ["aaa"]);
    }

    #[test]
    fn invalid_pattern_names_the_option() {
        let err = Settings::from_properties([("allowedSlingServletPathsPatterns", "/bin/(")])
            .unwrap_err();
        match err {
            SettingsError::InvalidPattern { key, source } => {
                assert_eq!(key, "allowedSlingServletPathsPatterns");
                assert_eq!(source.pattern, "/bin/(");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn toml_accepts_strings_and_arrays() {
        let settings = Settings::parse(
            r#"
            allowedExportPackagePatterns = "com\\.mycompany\\..*"
            allowedSlingServletResourceTypesPatterns = ["mycompany/.{1,3}", "shared/.*"]
            "#,
        )
        .unwrap();
        let rules = settings.into_rules();
        assert!(rules.is_enabled(RuleSlot::ExportPackage));
        let types = rules.patterns(RuleSlot::ServletResourceType).unwrap();
        assert_eq!(types.len(), 2);
        assert!(types.matches("mycompany/abc"));
        assert!(!types.matches("mycompany/abcd"));
    }

    #[test]
    fn toml_rejects_non_string_values() {
        let err = Settings::parse("allowedExportPackagePatterns = 42").unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
    }

    #[test]
    fn from_file_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "allowedServiceClassPatterns = \"com\\\\.mycompany\\\\..*\"").unwrap();
        writeln!(file, "legacyOption = \"ignored\"").unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert!(settings.rules().is_enabled(RuleSlot::ServiceInterface));
        assert_eq!(settings.unknown_keys(), ["legacyOption"]);
    }

    #[test]
    fn from_file_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nslint.toml");
        let err = Settings::from_file(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Io { path: p, .. } if p == path));
    }
}
