//! Per-component rule evaluation.
//!
//! Evaluates the service interface rule and the role-specific property rules
//! against a [`ComponentDescriptor`], producing [`Diagnostic`]s.

use tracing::debug;

use crate::config::{PatternList, PatternRuleSet, RuleSlot};
use crate::descriptor::{ComponentDescriptor, ComponentRole};
use crate::types::{Diagnostic, DiagnosticKind};

/// A property rule that applies to components of one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyRule {
    /// Slot holding the allowed patterns.
    pub slot: RuleSlot,
    /// Role a component must have for the rule to apply.
    pub role: ComponentRole,
    /// Name of the checked property.
    pub property: &'static str,
    /// How the component is described in messages (e.g., "Sling servlet").
    pub component_label: &'static str,
    /// How the property is described in messages (e.g., "servlet path").
    pub value_label: &'static str,
}

/// Every property rule, in evaluation order.
pub const PROPERTY_RULES: &[PropertyRule] = &[
    PropertyRule {
        slot: RuleSlot::ServletPath,
        role: ComponentRole::Servlet,
        property: "sling.servlet.paths",
        component_label: "Sling servlet",
        value_label: "servlet path",
    },
    PropertyRule {
        slot: RuleSlot::ServletResourceType,
        role: ComponentRole::Servlet,
        property: "sling.servlet.resourceTypes",
        component_label: "Sling servlet",
        value_label: "resource type",
    },
    PropertyRule {
        slot: RuleSlot::ServletResourceSuperType,
        role: ComponentRole::Servlet,
        property: "sling.servlet.resourceSuperType",
        component_label: "Sling servlet",
        value_label: "resource super type",
    },
    PropertyRule {
        slot: RuleSlot::WhiteboardServletPattern,
        role: ComponentRole::Servlet,
        property: "osgi.http.whiteboard.servlet.pattern",
        component_label: "Servlet",
        value_label: "OSGi HTTP/Servlet whiteboard servlet pattern",
    },
    PropertyRule {
        slot: RuleSlot::FilterPattern,
        role: ComponentRole::Filter,
        property: "sling.filter.pattern",
        component_label: "Sling filter",
        value_label: "filter pattern",
    },
    PropertyRule {
        slot: RuleSlot::FilterResourceType,
        role: ComponentRole::Filter,
        property: "sling.filter.resourceTypes",
        component_label: "Sling filter",
        value_label: "resource type",
    },
    PropertyRule {
        slot: RuleSlot::WhiteboardFilterPattern,
        role: ComponentRole::Filter,
        property: "osgi.http.whiteboard.filter.pattern",
        component_label: "HTTP Whiteboard filter",
        value_label: "filter pattern",
    },
    PropertyRule {
        slot: RuleSlot::AuthHandlerPath,
        role: ComponentRole::AuthenticationHandler,
        property: "path",
        component_label: "AuthenticationHandler",
        value_label: "path",
    },
];

/// Evaluates the component-level rules of a [`PatternRuleSet`].
#[derive(Debug, Clone, Copy)]
pub struct RuleEvaluator<'a> {
    rules: &'a PatternRuleSet,
    service_patterns: Option<&'a PatternList>,
}

impl<'a> RuleEvaluator<'a> {
    /// Creates an evaluator.
    ///
    /// `service_patterns` are the effective service patterns (see
    /// [`PatternRuleSet::effective_service_patterns`]); `None` disables the
    /// service interface check.
    #[must_use]
    pub fn new(rules: &'a PatternRuleSet, service_patterns: Option<&'a PatternList>) -> Self {
        Self {
            rules,
            service_patterns,
        }
    }

    /// Checks one component and returns every finding.
    #[must_use]
    pub fn evaluate(&self, component: &ComponentDescriptor) -> Vec<Diagnostic> {
        let mut diagnostics = self.check_service_interfaces(component);
        for rule in PROPERTY_RULES {
            diagnostics.extend(self.check_property(component, rule));
        }
        diagnostics
    }

    fn check_service_interfaces(&self, component: &ComponentDescriptor) -> Vec<Diagnostic> {
        let Some(patterns) = self.service_patterns.filter(|p| !p.is_empty()) else {
            return Vec::new();
        };

        component
            .interfaces
            .iter()
            .filter(|interface| !patterns.matches(interface))
            .map(|interface| {
                Diagnostic::new(
                    DiagnosticKind::ServiceInterface,
                    [
                        component.name.clone(),
                        interface.clone(),
                        patterns.joined(),
                    ],
                )
            })
            .collect()
    }

    fn check_property(
        &self,
        component: &ComponentDescriptor,
        rule: &PropertyRule,
    ) -> Vec<Diagnostic> {
        if !component.has_role(rule.role) {
            return Vec::new();
        }
        let Some(patterns) = self.rules.patterns(rule.slot) else {
            return Vec::new();
        };
        let Some(values) = component.properties.get(rule.property) else {
            return Vec::new();
        };
        debug!(
            "Checking {} on component {} against {}",
            rule.property,
            component.name,
            rule.slot
        );

        values
            .iter()
            .map(|value| value.trim())
            .filter(|value| !patterns.matches(value))
            .map(|value| {
                Diagnostic::new(
                    DiagnosticKind::ComponentProperty,
                    [
                        rule.component_label.to_string(),
                        component.name.clone(),
                        rule.value_label.to_string(),
                        value.to_string(),
                        patterns.joined(),
                    ],
                )
            })
            .collect()
    }
}
