//! Pattern rule sets.
//!
//! All patterns are compiled when the rule set is built. A slot that is
//! absent or holds no patterns disables its check entirely.

use regex::Regex;
use std::fmt;

/// Service interfaces that are accepted regardless of the configured
/// service patterns. Components providing them are governed by their
/// role-specific property rules instead.
pub const BUILTIN_SERVICE_EXEMPTIONS: &[&str] = &[
    "javax.servlet.Servlet",
    "jakarta.servlet.Servlet",
    "javax.servlet.Filter",
    "jakarta.servlet.Filter",
    "org.apache.sling.api.adapter.AdapterFactory",
    "org.apache.sling.rewriter.TransformerFactory",
    "com.adobe.granite.workflow.exec.WorkflowProcess",
    "com.day.cq.workflow.exec.WorkflowProcess",
    "org.apache.sling.auth.core.spi.AuthenticationHandler",
];

/// A configured regular expression failed to compile.
#[derive(Debug, Clone, thiserror::Error, miette::Diagnostic)]
#[error("invalid pattern `{pattern}`: {reason}")]
#[diagnostic(
    code(nslint::invalid_pattern),
    help("patterns use regular expression syntax and must match the whole value")
)]
pub struct PatternError {
    /// The pattern as configured.
    pub pattern: String,
    /// Compiler message.
    pub reason: String,
}

/// An allowed-value pattern, matched against the whole input.
///
/// The regex is compiled once at construction and reused for all match calls.
#[derive(Debug, Clone)]
pub struct AllowedPattern {
    raw: String,
    compiled: Regex,
}

impl AllowedPattern {
    /// Compiles a pattern.
    ///
    /// # Errors
    ///
    /// Returns error if the pattern is not a valid regular expression.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let compiled = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| PatternError {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            raw: pattern.to_string(),
            compiled,
        })
    }

    /// Creates a pattern matching exactly `value`.
    ///
    /// # Errors
    ///
    /// Returns error only if the escaped literal exceeds the regex size limit.
    pub fn literal(value: &str) -> Result<Self, PatternError> {
        Self::new(&regex::escape(value))
    }

    /// Tests whether the whole of `value` matches.
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        self.compiled.is_match(value)
    }

    /// Returns the pattern as configured.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl PartialEq for AllowedPattern {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for AllowedPattern {}

impl fmt::Display for AllowedPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// An ordered list of allowed patterns; a value passes if any one matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternList(Vec<AllowedPattern>);

impl PatternList {
    /// Compiles every pattern in order.
    ///
    /// # Errors
    ///
    /// Returns the first pattern that fails to compile.
    pub fn compile<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        patterns
            .into_iter()
            .map(|p| AllowedPattern::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Returns true if any pattern matches the whole of `value`.
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        self.0.iter().any(|p| p.matches(value))
    }

    /// Returns true if the list holds no patterns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates the patterns in configured order.
    pub fn iter(&self) -> std::slice::Iter<'_, AllowedPattern> {
        self.0.iter()
    }

    /// Joins the pattern sources with commas, in configured order.
    #[must_use]
    pub fn joined(&self) -> String {
        self.0
            .iter()
            .map(AllowedPattern::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl From<Vec<AllowedPattern>> for PatternList {
    fn from(patterns: Vec<AllowedPattern>) -> Self {
        Self(patterns)
    }
}

impl<'a> IntoIterator for &'a PatternList {
    type Item = &'a AllowedPattern;
    type IntoIter = std::slice::Iter<'a, AllowedPattern>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// The independently configurable checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleSlot {
    /// Exported package names.
    ExportPackage,
    /// The bundle symbolic name.
    BundleSymbolicName,
    /// Service interfaces provided by components.
    ServiceInterface,
    /// `sling.servlet.paths` on servlet components.
    ServletPath,
    /// `sling.servlet.resourceTypes` on servlet components.
    ServletResourceType,
    /// `sling.servlet.resourceSuperType` on servlet components.
    ServletResourceSuperType,
    /// `sling.filter.pattern` on filter components.
    FilterPattern,
    /// `sling.filter.resourceTypes` on filter components.
    FilterResourceType,
    /// `osgi.http.whiteboard.servlet.pattern` on servlet components.
    WhiteboardServletPattern,
    /// `osgi.http.whiteboard.filter.pattern` on filter components.
    WhiteboardFilterPattern,
    /// `path` on authentication handler components.
    AuthHandlerPath,
}

impl RuleSlot {
    /// Every slot, in declaration order.
    pub const ALL: [Self; 11] = [
        Self::ExportPackage,
        Self::BundleSymbolicName,
        Self::ServiceInterface,
        Self::ServletPath,
        Self::ServletResourceType,
        Self::ServletResourceSuperType,
        Self::FilterPattern,
        Self::FilterResourceType,
        Self::WhiteboardServletPattern,
        Self::WhiteboardFilterPattern,
        Self::AuthHandlerPath,
    ];

    /// Returns the configuration key naming this slot.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::ExportPackage => "allowedExportPackagePatterns",
            Self::BundleSymbolicName => "allowedBundleSymbolicNamePatterns",
            Self::ServiceInterface => "allowedServiceClassPatterns",
            Self::ServletPath => "allowedSlingServletPathsPatterns",
            Self::ServletResourceType => "allowedSlingServletResourceTypesPatterns",
            Self::ServletResourceSuperType => "allowedSlingServletResourceSuperTypePatterns",
            Self::FilterPattern => "allowedSlingFilterPatternPatterns",
            Self::FilterResourceType => "allowedSlingFilterResourceTypesPatterns",
            Self::WhiteboardServletPattern => "allowedHttpWhiteboardServletPatternPatterns",
            Self::WhiteboardFilterPattern => "allowedHttpWhiteboardFilterPatternPatterns",
            Self::AuthHandlerPath => "allowedSlingAuthenticationHandlerPathPatterns",
        }
    }

    /// Looks up a slot by its configuration key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.key() == key)
    }

    /// Returns true if the slot is checked per component descriptor.
    #[must_use]
    pub fn is_component_level(self) -> bool {
        !matches!(self, Self::ExportPackage | Self::BundleSymbolicName)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for RuleSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Allowed patterns for every checked namespace.
///
/// Immutable once handed to a verifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternRuleSet {
    slots: [Option<PatternList>; 11],
}

impl PatternRuleSet {
    /// Creates a rule set with every check disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the patterns of a slot, replacing any previous ones.
    #[must_use]
    pub fn with(mut self, slot: RuleSlot, patterns: PatternList) -> Self {
        self.slots[slot.index()] = Some(patterns);
        self
    }

    /// Compiles and sets the patterns of a slot.
    ///
    /// # Errors
    ///
    /// Returns the first pattern that fails to compile.
    pub fn with_patterns<I, S>(self, slot: RuleSlot, patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(self.with(slot, PatternList::compile(patterns)?))
    }

    /// Returns the patterns of an enabled slot.
    ///
    /// Returns `None` when the slot is absent or empty.
    #[must_use]
    pub fn patterns(&self, slot: RuleSlot) -> Option<&PatternList> {
        self.slots[slot.index()]
            .as_ref()
            .filter(|list| !list.is_empty())
    }

    /// Returns true if the slot's check runs.
    #[must_use]
    pub fn is_enabled(&self, slot: RuleSlot) -> bool {
        self.patterns(slot).is_some()
    }

    /// Returns true if any per-component check runs.
    #[must_use]
    pub fn has_component_rules(&self) -> bool {
        RuleSlot::ALL
            .into_iter()
            .any(|slot| slot.is_component_level() && self.is_enabled(slot))
    }

    /// Returns true if no check runs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        RuleSlot::ALL.into_iter().all(|slot| !self.is_enabled(slot))
    }

    /// Merges the configured service patterns with [`BUILTIN_SERVICE_EXEMPTIONS`].
    ///
    /// User patterns come first; the exemptions are appended. Returns `None`
    /// when the service-interface check is disabled.
    ///
    /// # Errors
    ///
    /// Returns error only if an exemption fails to compile as a literal.
    pub fn effective_service_patterns(&self) -> Result<Option<PatternList>, PatternError> {
        let Some(user) = self.patterns(RuleSlot::ServiceInterface) else {
            return Ok(None);
        };
        let mut merged: Vec<AllowedPattern> = user.iter().cloned().collect();
        for exemption in BUILTIN_SERVICE_EXEMPTIONS {
            merged.push(AllowedPattern::literal(exemption)?);
        }
        Ok(Some(PatternList::from(merged)))
    }
}
