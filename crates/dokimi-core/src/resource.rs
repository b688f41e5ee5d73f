//! Resource types and declared resource instances.
//!
//! A [`ResourceType`] is an explicit metadata record describing one
//! declarative unit of desired state: its self-reported name, the parent type
//! it derives from, the actions its instances may run, and the action used
//! when a declaration names none. A [`Resource`] is one declared instance of
//! such a type inside a recipe.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::action::{ActionSet, ACTION_NOTHING};

/// Shared handle to an immutable resource type record.
pub type ResourceTypeHandle = Arc<ResourceType>;

/// Name of the base resource type every other resource type derives from.
pub const BASE_RESOURCE: &str = "resource";

/// Metadata record describing a resource type.
///
/// # Examples
///
/// ```rust
/// use dokimi_core::ResourceType;
///
/// let base = ResourceType::base();
/// let mut widget = ResourceType::derive("widget", &base);
/// widget.allow_action("install");
///
/// assert_eq!(widget.name(), "widget");
/// assert_eq!(widget.parent(), Some("resource"));
/// assert!(widget.actions().contains("install"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceType {
    name: String,
    parent: Option<String>,
    actions: ActionSet,
    default_action: String,
}

impl ResourceType {
    /// Returns the base resource type: no parent, a single declared `nothing`
    /// action, and `nothing` as the default.
    #[must_use]
    pub fn base() -> Self {
        Self {
            name: BASE_RESOURCE.to_string(),
            parent: None,
            actions: [ACTION_NOTHING].into_iter().collect(),
            default_action: ACTION_NOTHING.to_string(),
        }
    }

    /// Derives a new type from `parent`, inheriting its action set and
    /// default action.
    #[must_use]
    pub fn derive(name: impl Into<String>, parent: &Self) -> Self {
        Self {
            name: name.into(),
            parent: Some(parent.name.clone()),
            actions: parent.actions.clone(),
            default_action: parent.default_action.clone(),
        }
    }

    /// Returns the type's self-reported name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the name of the parent type, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Returns the set of actions instances of this type may run.
    #[must_use]
    pub const fn actions(&self) -> &ActionSet {
        &self.actions
    }

    /// Returns the action used when a declaration names none.
    #[must_use]
    pub fn default_action(&self) -> &str {
        &self.default_action
    }

    /// Fixes the type's self-reported name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Adds an action to the allowed set.
    pub fn allow_action(&mut self, action: impl Into<String>) {
        self.actions.insert(action);
    }

    /// Removes an action from the allowed set.
    pub fn disallow_action(&mut self, action: &str) {
        self.actions.remove(action);
    }

    /// Sets the default action, adding it to the allowed set if absent.
    pub fn set_default_action(&mut self, action: impl Into<String>) {
        let action = action.into();
        self.actions.insert(action.clone());
        self.default_action = action;
    }

    /// Constructs a throwaway instance of this type.
    ///
    /// The instance carries a copy of the type's allowed-actions set, which
    /// is how capability introspection reads the declared actions.
    #[must_use]
    pub fn instantiate(&self, identifier: impl Into<String>) -> Resource {
        Resource {
            type_name: self.name.clone(),
            identifier: identifier.into(),
            action: None,
            allowed_actions: self.actions.clone(),
            attributes: BTreeMap::new(),
        }
    }
}

/// One declared instance of a resource inside a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    type_name: String,
    identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    action: Option<String>,
    #[serde(default, skip_serializing_if = "ActionSet::is_empty")]
    allowed_actions: ActionSet,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    attributes: BTreeMap<String, serde_json::Value>,
}

impl Resource {
    /// Declares a resource of type `type_name` with the given instance
    /// identifier, using the type's default action.
    #[must_use]
    pub fn new(type_name: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            identifier: identifier.into(),
            action: None,
            allowed_actions: ActionSet::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// Sets an explicit action for this declaration.
    #[must_use]
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Sets an attribute on this declaration.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Returns the resource type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the instance identifier.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Returns the explicitly declared action, if any.
    #[must_use]
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    /// Returns the allowed-actions set this instance reports.
    ///
    /// Only populated on instances built via [`ResourceType::instantiate`];
    /// plain recipe declarations leave it empty and defer to the type.
    #[must_use]
    pub const fn allowed_actions(&self) -> &ActionSet {
        &self.allowed_actions
    }

    /// Returns the declaration's attributes.
    #[must_use]
    pub const fn attributes(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.attributes
    }

    /// Returns an attribute value by key.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }
}
