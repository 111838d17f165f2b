//! # nslint-core
//!
//! Build-time namespace compliance checks for OSGi bundles.
//!
//! Given a built bundle's exported packages, its symbolic name and its
//! Declarative Services component descriptors, the verifier checks every
//! name against organisation-supplied allowed patterns and reports each
//! violation without stopping. It includes:
//!
//! - [`PatternRuleSet`] holding the allowed patterns per [`RuleSlot`]
//! - [`glob`] translating `Service-Component` wildcards to regexes
//! - [`DescriptorParser`] extracting services and properties from descriptors
//! - [`RuleEvaluator`] applying the service and property rules to a component
//! - [`Verifier`] orchestrating a run and emitting [`Diagnostic`]s to a [`Reporter`]
//!
//! ## Example
//!
//! ```
//! use nslint_core::{MemoryBundle, PatternRuleSet, RuleSlot, Verifier};
//!
//! let rules = PatternRuleSet::new()
//!     .with_patterns(RuleSlot::ServiceInterface, [r"com\.mycompany\..*"])?;
//! let verifier = Verifier::new(rules)?;
//!
//! let bundle = MemoryBundle::new()
//!     .header("Service-Component", "OSGI-INF/*.xml")
//!     .resource(
//!         "OSGI-INF/MyComponent.xml",
//!         r#"<component name="MyComponent">
//!              <service><provide interface="org.apache.sling.api.SlingService"/></service>
//!            </component>"#,
//!     );
//!
//! let report = verifier.verify(&bundle)?;
//! assert_eq!(report.diagnostics.len(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod bundle;
mod config;
mod descriptor;
mod evaluator;
mod locator;
mod reporter;
mod types;
mod verifier;

/// Glob translation used for `Service-Component` wildcard entries.
pub mod glob;

pub use bundle::{BundleView, MemoryBundle, BUNDLE_SYMBOLIC_NAME, SERVICE_COMPONENT};
pub use config::{
    AllowedPattern, PatternError, PatternList, PatternRuleSet, RuleSlot,
    BUILTIN_SERVICE_EXEMPTIONS,
};
pub use descriptor::{
    ComponentDescriptor, ComponentRole, DescriptorError, DescriptorParser, Properties,
    AUTHENTICATION_HANDLER_INTERFACE, FILTER_INTERFACES, SERVLET_INTERFACES,
};
pub use evaluator::{PropertyRule, RuleEvaluator, PROPERTY_RULES};
pub use locator::{
    parse_header, resolve, resolve_entry, DescriptorEntry, InvalidDescriptorGlob, DESCRIPTOR_ROOT,
};
pub use reporter::{Reporter, TracingReporter};
pub use types::{Diagnostic, DiagnosticKind, Report, Severity};
pub use verifier::{VerifyError, Verifier};
