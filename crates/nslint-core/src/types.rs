//! Core types for namespace diagnostics and verification results.

use serde::{Deserialize, Serialize};

/// Severity level for diagnostics.
///
/// Only [`Severity::Error`] is expected to fail a build; that decision is
/// left to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message, never fails a build.
    Trace,
    /// Missing or unreadable data the operator should know about.
    Warning,
    /// A policy violation.
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Every kind of message the verifier can emit.
///
/// Each kind has a stable code, a fixed severity and a message template
/// whose `{}` placeholders are filled by the diagnostic parameters in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// An exported package matches none of the allowed patterns.
    ExportedPackage,
    /// The bundle symbolic name matches none of the allowed patterns.
    BundleSymbolicName,
    /// The `Bundle-SymbolicName` header is absent or blank.
    MissingBundleSymbolicName,
    /// An exact descriptor path from `Service-Component` is not in the bundle.
    DescriptorNotFound,
    /// A wildcard descriptor entry from `Service-Component` matched nothing.
    DescriptorPatternUnmatched,
    /// A descriptor could not be read or parsed.
    DescriptorParseFailure,
    /// A component provides a service interface outside the allowed patterns.
    ServiceInterface,
    /// A component property value matches none of the allowed patterns.
    ComponentProperty,
    /// A configuration key is not recognised.
    UnknownConfigKey,
}

impl DiagnosticKind {
    /// Returns the stable code (e.g., "NS001").
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::ExportedPackage => "NS001",
            Self::BundleSymbolicName => "NS002",
            Self::MissingBundleSymbolicName => "NS003",
            Self::DescriptorNotFound => "NS004",
            Self::DescriptorPatternUnmatched => "NS005",
            Self::DescriptorParseFailure => "NS006",
            Self::ServiceInterface => "NS007",
            Self::ComponentProperty => "NS008",
            Self::UnknownConfigKey => "NS009",
        }
    }

    /// Returns the severity every diagnostic of this kind carries.
    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            Self::ExportedPackage
            | Self::BundleSymbolicName
            | Self::ServiceInterface
            | Self::ComponentProperty => Severity::Error,
            Self::MissingBundleSymbolicName
            | Self::DescriptorNotFound
            | Self::DescriptorParseFailure
            | Self::UnknownConfigKey => Severity::Warning,
            Self::DescriptorPatternUnmatched => Severity::Trace,
        }
    }

    /// Returns the message template.
    #[must_use]
    pub fn template(self) -> &'static str {
        match self {
            Self::ExportedPackage => {
                "Exported package \"{}\" does not match any of the allowed patterns [{}]"
            }
            Self::BundleSymbolicName => {
                "Bundle-SymbolicName \"{}\" does not match any of the allowed patterns [{}]"
            }
            Self::MissingBundleSymbolicName => "Bundle-SymbolicName header is missing or empty",
            Self::DescriptorNotFound => {
                "DS component XML file \"{}\" referenced in Service-Component header but not found in bundle"
            }
            Self::DescriptorPatternUnmatched => {
                "DS component pattern \"{}\" referenced in Service-Component header but no matching files found in bundle"
            }
            Self::DescriptorParseFailure => "Failed to parse DS component XML file \"{}\": {}",
            Self::ServiceInterface => {
                "DS component \"{}\" provides service \"{}\" which does not match any of the allowed patterns [{}]"
            }
            Self::ComponentProperty => {
                "{} component \"{}\" has {} \"{}\" which does not match any of the allowed patterns [{}]"
            }
            Self::UnknownConfigKey => "Unknown configuration key for namespace validation: '{}'",
        }
    }
}

/// A single finding produced during verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// What was found; determines code, severity and template.
    pub kind: DiagnosticKind,
    /// Positional template parameters.
    pub params: Vec<String>,
}

impl Diagnostic {
    /// Creates a new diagnostic.
    #[must_use]
    pub fn new<I, S>(kind: DiagnosticKind, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the severity of this diagnostic.
    #[must_use]
    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    /// Returns the stable code of this diagnostic.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Returns the unrendered message template.
    #[must_use]
    pub fn template(&self) -> &'static str {
        self.kind.template()
    }

    /// Renders the message template with the parameters.
    ///
    /// Placeholders without a matching parameter are left as `{}`.
    #[must_use]
    pub fn message(&self) -> String {
        let template = self.template();
        let mut rendered = String::with_capacity(template.len());
        let mut params = self.params.iter();
        let mut rest = template;
        while let Some(idx) = rest.find("{}") {
            rendered.push_str(&rest[..idx]);
            match params.next() {
                Some(param) => rendered.push_str(param),
                None => rendered.push_str("{}"),
            }
            rest = &rest[idx + 2..];
        }
        rendered.push_str(rest);
        rendered
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}] {}", self.severity(), self.code(), self.message())
    }
}

/// Ordered collection of the diagnostics emitted by one verification run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Diagnostics in emission order.
    pub diagnostics: Vec<Diagnostic>,
}

impl Report {
    /// Creates a new empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the report holds no diagnostics.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Returns true if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity() == Severity::Error)
    }

    /// Checks if any diagnostic meets or exceeds the given severity threshold.
    #[must_use]
    pub fn has_diagnostics_at(&self, severity: Severity) -> bool {
        self.diagnostics.iter().any(|d| d.severity() >= severity)
    }

    /// Returns diagnostics filtered by severity.
    #[must_use]
    pub fn by_severity(&self, severity: Severity) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity() == severity)
            .collect()
    }

    /// Returns diagnostics filtered by kind.
    #[must_use]
    pub fn by_kind(&self, kind: DiagnosticKind) -> Vec<&Diagnostic> {
        self.diagnostics.iter().filter(|d| d.kind == kind).collect()
    }

    /// Counts diagnostics as `(errors, warnings, traces)`.
    #[must_use]
    pub fn count_by_severity(&self) -> (usize, usize, usize) {
        let count = |severity| {
            self.diagnostics
                .iter()
                .filter(|d| d.severity() == severity)
                .count()
        };
        (
            count(Severity::Error),
            count(Severity::Warning),
            count(Severity::Trace),
        )
    }

    /// Formats all diagnostics at or above `threshold` as a multi-line report.
    #[must_use]
    pub fn format_report(&self, threshold: Severity) -> String {
        use std::fmt::Write;

        let mut report = String::new();
        for diagnostic in self
            .diagnostics
            .iter()
            .filter(|d| d.severity() >= threshold)
        {
            let _ = writeln!(report, "{diagnostic}");
        }

        let (errors, warnings, traces) = self.count_by_severity();
        let _ = write!(
            report,
            "Found {errors} error(s), {warnings} warning(s), {traces} trace(s)"
        );
        report
    }

    /// Adds diagnostics from another report.
    pub fn extend(&mut self, other: Self) {
        self.diagnostics.extend(other.diagnostics);
    }
}
