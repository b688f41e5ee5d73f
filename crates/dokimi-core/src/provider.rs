//! Provider types: the executable logic that realizes resource actions.
//!
//! A [`ProviderType`] maps action identifiers to action bodies. Bodies run
//! during convergence with a [`ProviderContext`] that exposes the declared
//! resource, lets the body record lower-level primitive actions, and (when
//! enabled) offers in-body assertions.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::resource::Resource;
use crate::runner::{ActionEvent, RunReport};

/// Shared handle to an immutable provider type record.
pub type ProviderTypeHandle = Arc<ProviderType>;

/// Name of the base provider type.
pub const BASE_PROVIDER: &str = "provider";

/// Signature of a provider action body.
pub type ActionFn = Arc<dyn Fn(&mut ProviderContext<'_>) -> Result<()> + Send + Sync>;

/// Execution context handed to provider action bodies.
pub struct ProviderContext<'a> {
    provider_name: &'a str,
    resource: &'a Resource,
    report: &'a mut RunReport,
    assertions: bool,
}

impl<'a> ProviderContext<'a> {
    /// Creates a context for one action execution.
    pub(crate) fn new(
        provider_name: &'a str,
        resource: &'a Resource,
        report: &'a mut RunReport,
        assertions: bool,
    ) -> Self {
        Self {
            provider_name,
            resource,
            report,
            assertions,
        }
    }

    /// Returns the resource declaration being converged.
    #[must_use]
    pub const fn resource(&self) -> &Resource {
        self.resource
    }

    /// Records a lower-level primitive action performed by this provider on
    /// behalf of its resource.
    pub fn perform(&mut self, action: impl Into<String>) {
        self.report.record(ActionEvent {
            resource_type: self.resource.type_name().to_string(),
            identifier: self.resource.identifier().to_string(),
            action: action.into(),
            executed: true,
        });
    }

    /// Asserts a condition from inside the provider body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AssertionsUnavailable`] if the provider type was
    /// built without assertion support, or [`Error::AssertionFailed`] when
    /// the condition does not hold.
    pub fn assert_that(&self, condition: bool, message: impl Into<String>) -> Result<()> {
        if !self.assertions {
            return Err(Error::AssertionsUnavailable {
                provider: self.provider_name.to_string(),
            });
        }
        if condition {
            Ok(())
        } else {
            Err(Error::AssertionFailed {
                message: message.into(),
            })
        }
    }
}

/// Metadata-plus-behavior record describing a provider type.
///
/// Action bodies are opaque closures; equality therefore compares the
/// metadata only (name, parent, declared action names, capability flags).
#[derive(Clone)]
pub struct ProviderType {
    name: String,
    parent: Option<String>,
    load_current_state: Option<ActionFn>,
    actions: BTreeMap<String, ActionFn>,
    assertions: bool,
}

impl ProviderType {
    /// Creates an empty provider type with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            load_current_state: None,
            actions: BTreeMap::new(),
            assertions: false,
        }
    }

    /// Returns the base provider type: no parent, no actions.
    #[must_use]
    pub fn base() -> Self {
        Self::new(BASE_PROVIDER)
    }

    /// Derives a new provider type from `parent`, sharing its action bodies.
    #[must_use]
    pub fn derive(name: impl Into<String>, parent: &Self) -> Self {
        Self {
            name: name.into(),
            parent: Some(parent.name.clone()),
            load_current_state: parent.load_current_state.clone(),
            actions: parent.actions.clone(),
            assertions: parent.assertions,
        }
    }

    /// Returns the provider type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the name of the parent type, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Returns the declared action names in sorted order.
    #[must_use]
    pub fn action_names(&self) -> Vec<String> {
        self.actions.keys().cloned().collect()
    }

    /// Returns true if an action body is declared for `action`.
    #[must_use]
    pub fn has_action(&self, action: &str) -> bool {
        self.actions.contains_key(action)
    }

    /// Returns the body for `action`, if declared.
    #[must_use]
    pub fn action(&self, action: &str) -> Option<ActionFn> {
        self.actions.get(action).cloned()
    }

    /// Declares an action body.
    pub fn set_action(
        &mut self,
        action: impl Into<String>,
        body: impl Fn(&mut ProviderContext<'_>) -> Result<()> + Send + Sync + 'static,
    ) {
        self.actions.insert(action.into(), Arc::new(body));
    }

    /// Returns true if a load-current-state hook is declared.
    #[must_use]
    pub const fn has_load_current_state(&self) -> bool {
        self.load_current_state.is_some()
    }

    /// Returns the load-current-state hook, if declared.
    #[must_use]
    pub fn load_current_state(&self) -> Option<ActionFn> {
        self.load_current_state.clone()
    }

    /// Declares the load-current-state hook.
    pub fn set_load_current_state(
        &mut self,
        body: impl Fn(&mut ProviderContext<'_>) -> Result<()> + Send + Sync + 'static,
    ) {
        self.load_current_state = Some(Arc::new(body));
    }

    /// Returns true if in-body assertions are enabled.
    #[must_use]
    pub const fn assertions(&self) -> bool {
        self.assertions
    }

    /// Enables or disables in-body assertions.
    pub fn set_assertions(&mut self, enabled: bool) {
        self.assertions = enabled;
    }
}

impl fmt::Debug for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderType")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("actions", &self.action_names())
            .field("load_current_state", &self.load_current_state.is_some())
            .field("assertions", &self.assertions)
            .finish()
    }
}

impl PartialEq for ProviderType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.parent == other.parent
            && self.action_names() == other.action_names()
            && self.load_current_state.is_some() == other.load_current_state.is_some()
            && self.assertions == other.assertions
    }
}
