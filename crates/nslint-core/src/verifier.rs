//! Top-level verification of a bundle.

use tracing::{debug, info};

use crate::bundle::{BundleView, BUNDLE_SYMBOLIC_NAME, SERVICE_COMPONENT};
use crate::config::{PatternError, PatternList, PatternRuleSet, RuleSlot};
use crate::descriptor::{ComponentDescriptor, DescriptorError, DescriptorParser};
use crate::evaluator::RuleEvaluator;
use crate::locator::{self, InvalidDescriptorGlob};
use crate::reporter::Reporter;
use crate::types::{Diagnostic, DiagnosticKind, Report};

/// Errors that stop a verification run.
///
/// Everything scoped to a single package, header value or descriptor is
/// reported as a diagnostic instead.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum VerifyError {
    /// The rule set could not be prepared.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Pattern(#[from] PatternError),

    /// A `Service-Component` wildcard entry is not a valid pattern.
    #[error(transparent)]
    #[diagnostic(transparent)]
    DescriptorGlob(#[from] InvalidDescriptorGlob),
}

/// Checks bundles against a fixed [`PatternRuleSet`].
///
/// The effective service patterns are derived once at construction; a
/// verifier holds no mutable state and can verify any number of bundles.
///
/// # Example
///
/// ```
/// use nslint_core::{MemoryBundle, PatternRuleSet, RuleSlot, Verifier};
///
/// let rules = PatternRuleSet::new()
///     .with_patterns(RuleSlot::BundleSymbolicName, [r"com\.mycompany\..*"])?;
/// let verifier = Verifier::new(rules)?;
///
/// let bundle = MemoryBundle::new().header("Bundle-SymbolicName", "org.apache.invalid.bundle");
/// let report = verifier.verify(&bundle)?;
/// assert!(report.has_errors());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct Verifier {
    rules: PatternRuleSet,
    service_patterns: Option<PatternList>,
    parser: DescriptorParser,
}

impl Verifier {
    /// Creates a verifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the built-in service exemptions fail to compile.
    pub fn new(rules: PatternRuleSet) -> Result<Self, VerifyError> {
        let service_patterns = rules.effective_service_patterns()?;
        Ok(Self {
            rules,
            service_patterns,
            parser: DescriptorParser::new(),
        })
    }

    /// Returns the rule set.
    #[must_use]
    pub fn rules(&self) -> &PatternRuleSet {
        &self.rules
    }

    /// Returns the effective service patterns, if the check is enabled.
    #[must_use]
    pub fn service_patterns(&self) -> Option<&PatternList> {
        self.service_patterns.as_ref()
    }

    /// Verifies a bundle and collects every diagnostic.
    ///
    /// # Errors
    ///
    /// See [`Verifier::verify_into`].
    pub fn verify(&self, bundle: &dyn BundleView) -> Result<Report, VerifyError> {
        let mut report = Report::new();
        self.verify_into(bundle, &mut report)?;
        Ok(report)
    }

    /// Verifies a bundle, sending diagnostics to `reporter` as they occur.
    ///
    /// Runs the exported package check, then the bundle symbolic name check,
    /// then the component descriptor checks.
    ///
    /// # Errors
    ///
    /// Returns an error if a `Service-Component` wildcard entry cannot be
    /// compiled. Entries before it have already been fully checked and
    /// their diagnostics reported.
    pub fn verify_into(
        &self,
        bundle: &dyn BundleView,
        reporter: &mut dyn Reporter,
    ) -> Result<(), VerifyError> {
        info!("Starting namespace verification");

        let mut counter = CountingReporter::new(reporter);
        self.check_exported_packages(&bundle.exported_packages(), &mut counter);
        self.check_bundle_symbolic_name(
            bundle.header(BUNDLE_SYMBOLIC_NAME).as_deref(),
            &mut counter,
        );
        self.check_components(bundle, &mut counter)?;

        info!(
            "Namespace verification complete: {} diagnostic(s)",
            counter.count
        );
        Ok(())
    }

    fn check_exported_packages(&self, packages: &[String], reporter: &mut dyn Reporter) {
        let Some(patterns) = self.rules.patterns(RuleSlot::ExportPackage) else {
            debug!("Skipping disabled check: {}", RuleSlot::ExportPackage);
            return;
        };

        for package in packages.iter().filter(|p| !patterns.matches(p)) {
            reporter.report(Diagnostic::new(
                DiagnosticKind::ExportedPackage,
                [package.clone(), patterns.joined()],
            ));
        }
    }

    fn check_bundle_symbolic_name(&self, header: Option<&str>, reporter: &mut dyn Reporter) {
        let Some(patterns) = self.rules.patterns(RuleSlot::BundleSymbolicName) else {
            debug!("Skipping disabled check: {}", RuleSlot::BundleSymbolicName);
            return;
        };

        let Some(header) = header.map(str::trim).filter(|h| !h.is_empty()) else {
            reporter.report(Diagnostic::new(
                DiagnosticKind::MissingBundleSymbolicName,
                Vec::<String>::new(),
            ));
            return;
        };

        // Directives and attributes such as `singleton:=true` are not part of the name.
        let name = header.split(';').next().unwrap_or_default().trim();
        if !patterns.matches(name) {
            reporter.report(Diagnostic::new(
                DiagnosticKind::BundleSymbolicName,
                [name.to_string(), patterns.joined()],
            ));
        }
    }

    fn check_components(
        &self,
        bundle: &dyn BundleView,
        reporter: &mut dyn Reporter,
    ) -> Result<(), VerifyError> {
        if !self.rules.has_component_rules() {
            debug!("Skipping component checks: no component rules configured");
            return Ok(());
        }
        let Some(header) = bundle
            .header(SERVICE_COMPONENT)
            .filter(|h| !h.trim().is_empty())
        else {
            debug!("No {SERVICE_COMPONENT} header, skipping component checks");
            return Ok(());
        };

        let resource_paths = bundle.resource_paths();
        let evaluator = RuleEvaluator::new(&self.rules, self.service_patterns.as_ref());

        // Each entry is fully checked before the next one is resolved.
        for entry in locator::parse_header(&header) {
            for path in locator::resolve_entry(&entry, &resource_paths, reporter)? {
                self.check_descriptor(bundle, &path, &evaluator, reporter);
            }
        }

        Ok(())
    }

    fn check_descriptor(
        &self,
        bundle: &dyn BundleView,
        path: &str,
        evaluator: &RuleEvaluator<'_>,
        reporter: &mut dyn Reporter,
    ) {
        debug!("Validating component descriptor {path}");
        match self.parse_descriptor(bundle, path) {
            Ok(Some(component)) => {
                for diagnostic in evaluator.evaluate(&component) {
                    reporter.report(diagnostic);
                }
            }
            Ok(None) => debug!("{path} is not a component descriptor, skipping"),
            Err(e) => reporter.report(Diagnostic::new(
                DiagnosticKind::DescriptorParseFailure,
                [path.to_string(), e.to_string()],
            )),
        }
    }

    /// Opens and parses one descriptor; the stream is dropped on every path.
    fn parse_descriptor(
        &self,
        bundle: &dyn BundleView,
        path: &str,
    ) -> Result<Option<ComponentDescriptor>, DescriptorError> {
        let content = bundle.open_resource(path)?.ok_or_else(|| {
            DescriptorError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "resource disappeared from bundle",
            ))
        })?;
        self.parser.parse(path, content)
    }
}

/// Counts diagnostics on their way to the wrapped reporter.
struct CountingReporter<'a> {
    inner: &'a mut dyn Reporter,
    count: usize,
}

impl<'a> CountingReporter<'a> {
    fn new(inner: &'a mut dyn Reporter) -> Self {
        Self { inner, count: 0 }
    }
}

impl Reporter for CountingReporter<'_> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.count += 1;
        self.inner.report(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::MemoryBundle;
    use crate::types::Severity;

    fn verifier(slot: RuleSlot, patterns: &[&str]) -> Verifier {
        Verifier::new(PatternRuleSet::new().with_patterns(slot, patterns).unwrap()).unwrap()
    }

    #[test]
    fn exported_packages_flagged_individually() {
        let v = verifier(RuleSlot::ExportPackage, &["com\\.mycompany\\..*"]);
        let bundle = MemoryBundle::new().exports(["com.mycompany.api", "org.invalid", "org.other"]);
        let report = v.verify(&bundle).unwrap();
        let params: Vec<_> = report
            .diagnostics
            .iter()
            .map(|d| d.params[0].as_str())
            .collect();
        assert_eq!(params, ["org.invalid", "org.other"]);
        assert!(report.diagnostics.iter().all(|d| d.severity() == Severity::Error));
    }

    #[test]
    fn any_configured_pattern_suffices() {
        let v = verifier(RuleSlot::ExportPackage, &["com\\..*", "org\\.allowed\\..*"]);
        let bundle = MemoryBundle::new().exports(["com.a", "org.allowed.b"]);
        assert!(v.verify(&bundle).unwrap().is_empty());
    }

    #[test]
    fn symbolic_name_parameters_are_stripped() {
        let v = verifier(RuleSlot::BundleSymbolicName, &["com\\.mycompany\\..*"]);
        let bundle = MemoryBundle::new().header(
            BUNDLE_SYMBOLIC_NAME,
            "com.mycompany.mybundle;singleton:=true;version=\"1.0.0\"",
        );
        assert!(v.verify(&bundle).unwrap().is_empty());
    }

    #[test]
    fn invalid_symbolic_name_is_one_error() {
        let v = verifier(RuleSlot::BundleSymbolicName, &["com\\.mycompany\\..*"]);
        let bundle = MemoryBundle::new().header(BUNDLE_SYMBOLIC_NAME, "org.apache.invalid.bundle");
        let report = v.verify(&bundle).unwrap();
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].kind, DiagnosticKind::BundleSymbolicName);
        assert_eq!(report.diagnostics[0].params[0], "org.apache.invalid.bundle");
    }

    #[test]
    fn missing_or_blank_symbolic_name_is_a_warning() {
        let v = verifier(RuleSlot::BundleSymbolicName, &["com\\.mycompany\\..*"]);
        for bundle in [
            MemoryBundle::new(),
            MemoryBundle::new().header(BUNDLE_SYMBOLIC_NAME, "   "),
        ] {
            let report = v.verify(&bundle).unwrap();
            assert_eq!(report.count_by_severity(), (0, 1, 0));
        }
    }

    #[test]
    fn no_component_rules_skips_descriptor_resolution() {
        let v = verifier(RuleSlot::ExportPackage, &[".*"]);
        let bundle = MemoryBundle::new().header(SERVICE_COMPONENT, "OSGI-INF/Missing.xml");
        assert!(v.verify(&bundle).unwrap().is_empty());
    }

    #[test]
    fn unreadable_descriptor_is_a_warning_and_run_continues() {
        let v = verifier(RuleSlot::ServiceInterface, &["com\\.mycompany\\..*"]);
        let bundle = MemoryBundle::new()
            .header(SERVICE_COMPONENT, "OSGI-INF/Broken.xml, OSGI-INF/Bad.xml")
            .resource("OSGI-INF/Broken.xml", "<component><service></component>")
            .resource(
                "OSGI-INF/Bad.xml",
                r#"<component name="Bad"><service><provide interface="org.x.Y"/></service></component>"#,
            );
        let report = v.verify(&bundle).unwrap();
        assert_eq!(report.diagnostics.len(), 2);
        assert_eq!(report.diagnostics[0].kind, DiagnosticKind::DescriptorParseFailure);
        assert_eq!(report.diagnostics[0].params[0], "OSGI-INF/Broken.xml");
        assert_eq!(report.diagnostics[1].kind, DiagnosticKind::ServiceInterface);
    }

    #[test]
    fn header_entries_are_checked_in_order() {
        let v = verifier(RuleSlot::ServiceInterface, &["com\\..*"]);
        let bundle = MemoryBundle::new()
            .header(SERVICE_COMPONENT, "OSGI-INF/Bad.xml, OSGI-INF/Missing.xml")
            .resource(
                "OSGI-INF/Bad.xml",
                r#"<component name="Bad"><service><provide interface="org.x.Y"/></service></component>"#,
            );
        let kinds: Vec<_> = v
            .verify(&bundle)
            .unwrap()
            .diagnostics
            .iter()
            .map(|d| d.kind)
            .collect();
        assert_eq!(
            kinds,
            [DiagnosticKind::ServiceInterface, DiagnosticKind::DescriptorNotFound]
        );
    }

    #[test]
    fn entries_before_invalid_glob_are_reported() {
        let v = verifier(RuleSlot::ServiceInterface, &["com\\..*"]);
        let bundle = MemoryBundle::new()
            .header(SERVICE_COMPONENT, "OSGI-INF/Bad.xml, OSGI-INF/[*.xml")
            .resource(
                "OSGI-INF/Bad.xml",
                r#"<component name="Bad"><service><provide interface="org.x.Y"/></service></component>"#,
            );
        let mut collected: Vec<Diagnostic> = Vec::new();
        let result = v.verify_into(&bundle, &mut collected);
        assert!(matches!(result, Err(VerifyError::DescriptorGlob(_))));
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].kind, DiagnosticKind::ServiceInterface);
        assert_eq!(collected[0].params[0], "Bad");
    }

    #[test]
    fn malformed_non_descriptor_is_a_warning() {
        let v = verifier(RuleSlot::ServiceInterface, &[".*"]);
        let bundle = MemoryBundle::new()
            .header(SERVICE_COMPONENT, "OSGI-INF/*.xml")
            .resource("OSGI-INF/metatype.xml", "<metatype><a></metatype>");
        let report = v.verify(&bundle).unwrap();
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].kind, DiagnosticKind::DescriptorParseFailure);
        assert_eq!(report.diagnostics[0].params[0], "OSGI-INF/metatype.xml");
    }

    #[test]
    fn invalid_descriptor_glob_aborts() {
        let v = verifier(RuleSlot::ServiceInterface, &[".*"]);
        let bundle = MemoryBundle::new().header(SERVICE_COMPONENT, "OSGI-INF/[*.xml");
        assert!(matches!(
            v.verify(&bundle),
            Err(VerifyError::DescriptorGlob(_))
        ));
    }
}
