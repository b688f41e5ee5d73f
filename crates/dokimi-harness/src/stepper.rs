//! Capability stepping.
//!
//! Stepping into a resource type marks it for real interpretation by the
//! runner and generates one matcher accessor per declared action, read off a
//! throwaway instance of the resolved type.

use std::sync::Arc;

use dokimi_core::ResourceTypeHandle;
use tracing::debug;

use crate::error::{HarnessError, Result};
use crate::matchers::MatcherAccessor;
use crate::scope::Scope;

/// Target of a step-into request.
#[derive(Debug, Clone)]
pub enum StepTarget {
    /// A bare type name, resolved harness-first then against the host.
    Named(String),
    /// A concrete resource type handle.
    Handle(ResourceTypeHandle),
}

impl From<&str> for StepTarget {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<String> for StepTarget {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

impl From<ResourceTypeHandle> for StepTarget {
    fn from(handle: ResourceTypeHandle) -> Self {
        Self::Handle(handle)
    }
}

/// Marks a resource type for real execution and generates its matchers.
///
/// A bare name resolves to a harness-defined type when the scope chain has
/// one (that is the type the patcher will install); otherwise it falls back
/// to the host framework's own lookup. One accessor is generated per action
/// in the resolved type's allowed set, named by combining the action with
/// `resource_name` (which defaults to the type's name).
///
/// # Errors
///
/// Returns [`HarnessError::Lookup`] when a bare name resolves neither in the
/// scope chain nor in the host namespace.
pub fn step_into(
    scope: &Arc<Scope>,
    target: impl Into<StepTarget>,
    resource_name: Option<&str>,
) -> Result<ResourceTypeHandle> {
    let handle = match target.into() {
        StepTarget::Handle(handle) => handle,
        StepTarget::Named(name) => match scope.resolve_resource(&name) {
            Ok(definition) => definition.built().clone(),
            Err(HarnessError::Lookup { .. }) => {
                scope
                    .host()
                    .resources()
                    .get(&name)
                    .ok_or(HarnessError::Lookup { name })?
            }
            Err(other) => return Err(other),
        },
    };

    let resource_name = resource_name.unwrap_or_else(|| handle.name());

    // A throwaway instance reports the declared allowed actions.
    let probe = handle.instantiate("capability_probe");
    for action in probe.allowed_actions().iter() {
        scope.add_matcher(MatcherAccessor::new(handle.name(), action, resource_name));
    }

    scope.add_step_into(handle.name());
    debug!(
        scope = %scope.name(),
        resource = handle.name(),
        actions = probe.allowed_actions().len(),
        "Stepping into resource type"
    );

    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dokimi_core::{Host, ResourceType};

    fn isolated_root(name: &str) -> Arc<Scope> {
        Scope::root_with_host(name, Host::isolated())
    }

    /// A type whose allowed set is exactly `{install, remove}`.
    fn thing_type() -> ResourceTypeHandle {
        let mut ty = ResourceType::derive("thing", &ResourceType::base());
        ty.set_default_action("install");
        ty.allow_action("remove");
        ty.disallow_action("nothing");
        Arc::new(ty)
    }

    #[test]
    fn test_one_accessor_per_action() {
        let scope = isolated_root("suite");
        step_into(&scope, thing_type(), Some("thing")).unwrap();

        let matchers = scope.effective_matchers();
        assert_eq!(matchers.len(), 2);
        assert_eq!(matchers.names(), vec!["installThing", "removeThing"]);
    }

    #[test]
    fn test_bare_name_prefers_harness_definition() {
        let scope = isolated_root("suite");
        crate::builder::define_resource(
            &scope,
            "widget",
            crate::builder::ResourceOptions::default(),
            |_| {},
        )
        .unwrap();

        // Host also has a `widget`, but the harness definition wins.
        let mut host_type = ResourceType::derive("widget", &ResourceType::base());
        host_type.set_default_action("install");
        scope
            .host()
            .resources()
            .bind("widget", Arc::new(host_type), false);

        let resolved = step_into(&scope, "widget", None).unwrap();
        assert_eq!(resolved.default_action(), "run");
    }

    #[test]
    fn test_bare_name_falls_back_to_host_lookup() {
        let scope = isolated_root("suite");
        let mut host_type = ResourceType::derive("package", &ResourceType::base());
        host_type.set_default_action("install");
        scope
            .host()
            .resources()
            .bind("package", Arc::new(host_type), false);

        let resolved = step_into(&scope, "package", None).unwrap();
        assert_eq!(resolved.name(), "package");
        assert_eq!(scope.effective_step_into(), vec!["package"]);
    }

    #[test]
    fn test_unresolvable_name_is_lookup_error() {
        let scope = isolated_root("suite");
        assert!(matches!(
            step_into(&scope, "missing", None),
            Err(HarnessError::Lookup { .. })
        ));
    }

    #[test]
    fn test_resource_name_controls_accessor_naming() {
        let scope = isolated_root("suite");
        step_into(&scope, thing_type(), Some("gizmo")).unwrap();

        let matchers = scope.effective_matchers();
        assert!(matchers.get("installGizmo").is_some());
        // Matchers stay bound to the type name, not the accessor alias.
        assert_eq!(
            matchers.get("installGizmo").unwrap().resource_type(),
            "thing"
        );
    }
}
