//! Assertion matchers generated from resource capabilities.
//!
//! For every action a stepped-into resource type declares, the harness
//! generates one [`MatcherAccessor`]. Accessors live in an explicit,
//! insertion-ordered lookup table instead of dynamically defined methods,
//! but the deterministic camel-case naming (`run` on `widget` yields
//! `runWidget`) is preserved for textual exposure.

use dokimi_core::RunReport;
use serde::{Deserialize, Serialize};

/// A matcher asserting that a resource instance resolved a given action.
///
/// Matchers are pure values: they only describe the expectation and never
/// execute anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionMatcher {
    resource_type: String,
    action: String,
    identifier: String,
}

impl ExecutionMatcher {
    /// Creates a matcher for `action` on the given resource instance.
    #[must_use]
    pub fn new(
        resource_type: impl Into<String>,
        action: impl Into<String>,
        identifier: impl Into<String>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            action: action.into(),
            identifier: identifier.into(),
        }
    }

    /// Returns the resource type name this matcher is bound to.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Returns the action this matcher is bound to.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Returns the instance identifier this matcher is bound to.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Returns true if the run resolved this action for this instance,
    /// whether it was stepped into or stubbed.
    #[must_use]
    pub fn matches(&self, report: &RunReport) -> bool {
        report.resolved(&self.resource_type, &self.identifier, &self.action)
    }

    /// Returns true only if the action actually ran (the resource was
    /// stepped into).
    #[must_use]
    pub fn executed(&self, report: &RunReport) -> bool {
        report.executed(&self.resource_type, &self.identifier, &self.action)
    }

    /// Human-readable description of the expectation.
    #[must_use]
    pub fn description(&self) -> String {
        format!(
            "expected `{}[{}]` to run action `{}`",
            self.resource_type, self.identifier, self.action
        )
    }
}

/// A generated accessor producing matchers for one (type, action) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatcherAccessor {
    accessor_name: String,
    resource_type: String,
    action: String,
}

impl MatcherAccessor {
    /// Creates an accessor for `action` on `resource_type`, named after
    /// `resource_name`.
    #[must_use]
    pub fn new(
        resource_type: impl Into<String>,
        action: impl Into<String>,
        resource_name: &str,
    ) -> Self {
        let action = action.into();
        Self {
            accessor_name: accessor_name(&action, resource_name),
            resource_type: resource_type.into(),
            action,
        }
    }

    /// Returns the generated accessor name, e.g. `runWidget`.
    #[must_use]
    pub fn accessor_name(&self) -> &str {
        &self.accessor_name
    }

    /// Returns the resource type name the accessor is bound to.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Returns the action the accessor is bound to.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Builds a matcher for one instance identifier.
    #[must_use]
    pub fn call(&self, identifier: impl Into<String>) -> ExecutionMatcher {
        ExecutionMatcher::new(&self.resource_type, &self.action, identifier)
    }
}

/// Insertion-ordered lookup table of generated accessors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatcherTable {
    accessors: Vec<MatcherAccessor>,
}

impl MatcherTable {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            accessors: Vec::new(),
        }
    }

    /// Inserts an accessor. An accessor with the same name replaces the
    /// existing one in place, so descendant scopes override ancestors
    /// without reordering.
    pub fn insert(&mut self, accessor: MatcherAccessor) {
        if let Some(existing) = self
            .accessors
            .iter_mut()
            .find(|a| a.accessor_name == accessor.accessor_name)
        {
            *existing = accessor;
        } else {
            self.accessors.push(accessor);
        }
    }

    /// Returns the accessor with the given name, if any.
    #[must_use]
    pub fn get(&self, accessor_name: &str) -> Option<&MatcherAccessor> {
        self.accessors
            .iter()
            .find(|a| a.accessor_name == accessor_name)
    }

    /// Returns all accessor names in insertion order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.accessors
            .iter()
            .map(MatcherAccessor::accessor_name)
            .collect()
    }

    /// Iterates over the accessors in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &MatcherAccessor> {
        self.accessors.iter()
    }

    /// Returns the number of accessors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accessors.len()
    }

    /// Returns true if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accessors.is_empty()
    }

    /// Merges `other` into `self`; same-named accessors from `other` win.
    pub fn merge_from(&mut self, other: &Self) {
        for accessor in &other.accessors {
            self.insert(accessor.clone());
        }
    }
}

/// Derives the deterministic camel-case accessor name for an action on a
/// resource: `run` + `widget` -> `runWidget`, `load_state` + `my_widget` ->
/// `loadStateMyWidget`.
#[must_use]
pub fn accessor_name(action: &str, resource_name: &str) -> String {
    let mut out = String::new();
    for (i, segment) in action.split('_').filter(|s| !s.is_empty()).enumerate() {
        if i == 0 {
            out.push_str(&segment.to_ascii_lowercase());
        } else {
            push_capitalized(&mut out, segment);
        }
    }
    for segment in resource_name.split('_').filter(|s| !s.is_empty()) {
        push_capitalized(&mut out, segment);
    }
    out
}

fn push_capitalized(out: &mut String, segment: &str) {
    let mut chars = segment.chars();
    if let Some(first) = chars.next() {
        out.extend(first.to_uppercase());
        out.push_str(&chars.as_str().to_ascii_lowercase());
    }
}
