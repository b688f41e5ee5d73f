//! Dynamic type builders.
//!
//! Tests declare throwaway resource and provider types inline. The builders
//! derive a new type from a chosen parent, apply the caller-supplied body,
//! normalize the result for testability, and record the definition in the
//! current scope so it gets patched into the host namespace around each
//! example.

use std::sync::Arc;

use dokimi_core::{
    ProviderType, ProviderTypeHandle, ResourceType, ResourceTypeHandle, ACTION_NOTHING, ACTION_RUN,
};
use tracing::debug;

use crate::error::{HarnessError, Result};
use crate::patch::validate_identifier;
use crate::scope::{Scope, TypeDefinition};
use crate::stepper;

/// Reference to a parent type: a concrete handle, or the name of a sibling
/// type previously registered in the scope tree.
#[derive(Debug, Clone)]
pub enum ParentRef<T> {
    /// A concrete parent type handle.
    Handle(T),
    /// A symbolic reference resolved through the scope chain.
    Named(String),
}

impl<T> ParentRef<T> {
    /// References a concrete parent type.
    pub fn handle(handle: T) -> Self {
        Self::Handle(handle)
    }

    /// References a sibling type by name.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

/// Options for [`define_resource`].
#[derive(Debug, Clone)]
pub struct ResourceOptions {
    /// Parent type; defaults to the base resource type.
    pub parent: Option<ParentRef<ResourceTypeHandle>>,
    /// Apply testability normalization (name pinning, runnable default).
    pub auto: bool,
}

impl Default for ResourceOptions {
    fn default() -> Self {
        Self {
            parent: None,
            auto: true,
        }
    }
}

impl ResourceOptions {
    /// Creates the default option set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a concrete parent type.
    #[must_use]
    pub fn with_parent(mut self, parent: ResourceTypeHandle) -> Self {
        self.parent = Some(ParentRef::Handle(parent));
        self
    }

    /// Sets a symbolic parent reference.
    #[must_use]
    pub fn with_parent_named(mut self, name: impl Into<String>) -> Self {
        self.parent = Some(ParentRef::Named(name.into()));
        self
    }

    /// Enables or disables normalization.
    #[must_use]
    pub const fn with_auto(mut self, auto: bool) -> Self {
        self.auto = auto;
        self
    }
}

/// Options for [`define_provider`].
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    /// Parent type; defaults to the base provider type.
    pub parent: Option<ParentRef<ProviderTypeHandle>>,
    /// Inject no-op state-load and run hooks when the body supplies none.
    pub auto: bool,
    /// Make assertion capability available inside action bodies.
    pub assertions: bool,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            parent: None,
            auto: true,
            assertions: true,
        }
    }
}

impl ProviderOptions {
    /// Creates the default option set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a concrete parent type.
    #[must_use]
    pub fn with_parent(mut self, parent: ProviderTypeHandle) -> Self {
        self.parent = Some(ParentRef::Handle(parent));
        self
    }

    /// Sets a symbolic parent reference.
    #[must_use]
    pub fn with_parent_named(mut self, name: impl Into<String>) -> Self {
        self.parent = Some(ParentRef::Named(name.into()));
        self
    }

    /// Enables or disables no-op hook injection.
    #[must_use]
    pub const fn with_auto(mut self, auto: bool) -> Self {
        self.auto = auto;
        self
    }

    /// Enables or disables in-body assertions.
    #[must_use]
    pub const fn with_assertions(mut self, assertions: bool) -> Self {
        self.assertions = assertions;
        self
    }
}

fn resolve_resource_parent(
    scope: &Arc<Scope>,
    declared: &str,
    parent: Option<ParentRef<ResourceTypeHandle>>,
) -> Result<ResourceTypeHandle> {
    match parent {
        None => Ok(Arc::new(ResourceType::base())),
        Some(ParentRef::Handle(handle)) => Ok(handle),
        Some(ParentRef::Named(name)) => scope
            .resolve_resource(&name)
            .map(|def| def.built().clone())
            .map_err(|_| HarnessError::Configuration {
                name: declared.to_string(),
                reason: format!("parent `{name}` does not resolve to a resource type in the current scope tree"),
            }),
    }
}

fn resolve_provider_parent(
    scope: &Arc<Scope>,
    declared: &str,
    parent: Option<ParentRef<ProviderTypeHandle>>,
) -> Result<ProviderTypeHandle> {
    match parent {
        None => Ok(Arc::new(ProviderType::base())),
        Some(ParentRef::Handle(handle)) => Ok(handle),
        Some(ParentRef::Named(name)) => scope
            .resolve_provider(&name)
            .map(|def| def.built().clone())
            .map_err(|_| HarnessError::Configuration {
                name: declared.to_string(),
                reason: format!("parent `{name}` does not resolve to a provider type in the current scope tree"),
            }),
    }
}

/// Synthesizes a resource type, registers it in the scope, and generates
/// capability matchers for it.
///
/// With `auto` enabled (the default), the built type's self-reported name is
/// pinned to `name` regardless of what the body did, and a `nothing` default
/// action is rewritten to a runnable `run` default. The downstream runner
/// cannot observe the effects of a no-op action, so a resource left with the
/// `nothing` default would be untestable.
///
/// # Errors
///
/// Returns [`HarnessError::Configuration`] when `name` is not a valid
/// identifier or the parent reference does not resolve to a usable type.
pub fn define_resource(
    scope: &Arc<Scope>,
    name: &str,
    options: ResourceOptions,
    body: impl FnOnce(&mut ResourceType),
) -> Result<ResourceTypeHandle> {
    validate_identifier(name)?;
    let parent = resolve_resource_parent(scope, name, options.parent)?;

    let mut ty = ResourceType::derive(name, &parent);
    body(&mut ty);

    if options.auto {
        ty.set_name(name);
        if ty.default_action() == ACTION_NOTHING {
            ty.set_default_action(ACTION_RUN);
        }
    }

    let handle = Arc::new(ty);
    debug!(
        scope = %scope.name(),
        resource = name,
        parent = parent.name(),
        default_action = handle.default_action(),
        "Built resource type"
    );

    scope.register_resource(TypeDefinition::new(name, handle.clone(), parent));
    stepper::step_into(scope, handle.clone(), None)?;
    Ok(handle)
}

/// Synthesizes a provider type and registers it in the scope.
///
/// With `auto` enabled (the default), a no-op load-current-state hook and a
/// no-op `run` action are injected when the body supplied none, so a minimal
/// provider works without boilerplate.
///
/// # Errors
///
/// Returns [`HarnessError::Configuration`] when `name` is not a valid
/// identifier or the parent reference does not resolve to a usable type.
pub fn define_provider(
    scope: &Arc<Scope>,
    name: &str,
    options: ProviderOptions,
    body: impl FnOnce(&mut ProviderType),
) -> Result<ProviderTypeHandle> {
    validate_identifier(name)?;
    let parent = resolve_provider_parent(scope, name, options.parent)?;

    let mut ty = ProviderType::derive(name, &parent);
    ty.set_assertions(options.assertions);
    body(&mut ty);

    if options.auto {
        if !ty.has_load_current_state() {
            ty.set_load_current_state(|_ctx| Ok(()));
        }
        if !ty.has_action(ACTION_RUN) {
            ty.set_action(ACTION_RUN, |_ctx| Ok(()));
        }
    }

    let handle = Arc::new(ty);
    debug!(
        scope = %scope.name(),
        provider = name,
        parent = parent.name(),
        actions = ?handle.action_names(),
        "Built provider type"
    );

    scope.register_provider(TypeDefinition::new(name, handle.clone(), parent));
    Ok(handle)
}
