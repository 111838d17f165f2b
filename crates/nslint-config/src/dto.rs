//! Raw TOML shape of the namespace settings.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Top-level document: option name to pattern value.
pub(crate) type SettingsDto = BTreeMap<String, PatternValue>;

/// A pattern option as written in TOML.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub(crate) enum PatternValue {
    /// `key = "a, b"`
    One(String),
    /// `key = ["a", "b"]`
    Many(Vec<String>),
}

impl PatternValue {
    /// Flattens the value into trimmed, non-blank entries.
    ///
    /// A string is split on commas; array elements are taken whole.
    pub(crate) fn entries(&self) -> Vec<String> {
        match self {
            Self::One(value) => split_entries(value),
            Self::Many(values) => values
                .iter()
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// Splits a comma-separated option value.
pub(crate) fn split_entries(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_value_is_comma_split() {
        let value = PatternValue::One(" a , ,b,".to_string());
        assert_eq!(value.entries(), ["a", "b"]);
    }

    #[test]
    fn array_elements_are_not_split() {
        let value = PatternValue::Many(vec![" a{1,2} ".into(), "  ".into()]);
        assert_eq!(value.entries(), ["a{1,2}"]);
    }

    #[test]
    fn document_accepts_both_shapes() {
        let dto: SettingsDto = toml::from_str(
            r#"
            allowedExportPackagePatterns = "com\\.a\\..*, com\\.b\\..*"
            allowedServiceClassPatterns = ["com\\.a\\..*"]
            "#,
        )
        .unwrap();
        assert_eq!(dto.len(), 2);
        assert!(matches!(
            dto["allowedServiceClassPatterns"],
            PatternValue::Many(_)
        ));
    }
}
