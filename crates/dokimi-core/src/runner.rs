//! In-memory convergence runner.
//!
//! The runner resolves each recipe declaration against the host's type
//! tables, executes stepped-into resources for real through their providers,
//! and records every resolved action into a [`RunReport`] that assertion
//! matchers can inspect afterwards.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::attributes::{NodeAttributes, RunnerOptions};
use crate::error::{Error, Result};
use crate::namespace::Host;
use crate::provider::ProviderContext;
use crate::recipe::Recipe;

/// Records one action resolution during convergence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEvent {
    /// Name of the resource type.
    pub resource_type: String,
    /// Instance identifier of the declaration.
    pub identifier: String,
    /// The action that was resolved.
    pub action: String,
    /// True when the resource was stepped into and the action actually ran;
    /// false when the resource was stubbed.
    pub executed: bool,
}

/// Outcome of converging one or more recipes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Recorded events, in execution order.
    events: Vec<ActionEvent>,
    /// Wall-clock duration of the run.
    duration: Duration,
}

impl RunReport {
    /// Creates an empty report.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            events: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    /// Appends an event.
    pub fn record(&mut self, event: ActionEvent) {
        self.events.push(event);
    }

    /// Returns all recorded events in execution order.
    #[must_use]
    pub fn events(&self) -> &[ActionEvent] {
        &self.events
    }

    /// Returns events recorded for one resource instance.
    pub fn events_for<'a>(
        &'a self,
        resource_type: &'a str,
        identifier: &'a str,
    ) -> impl Iterator<Item = &'a ActionEvent> {
        self.events
            .iter()
            .filter(move |e| e.resource_type == resource_type && e.identifier == identifier)
    }

    /// Returns true if `action` was resolved for the given instance,
    /// stubbed or not.
    #[must_use]
    pub fn resolved(&self, resource_type: &str, identifier: &str, action: &str) -> bool {
        self.events
            .iter()
            .any(|e| e.resource_type == resource_type && e.identifier == identifier && e.action == action)
    }

    /// Returns true if `action` actually ran (stepped into) for the given
    /// instance.
    #[must_use]
    pub fn executed(&self, resource_type: &str, identifier: &str, action: &str) -> bool {
        self.events.iter().any(|e| {
            e.resource_type == resource_type
                && e.identifier == identifier
                && e.action == action
                && e.executed
        })
    }

    /// Returns the wall-clock duration of the run.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }
}

/// Convergence runner configured for one test example.
///
/// # Examples
///
/// ```rust
/// use dokimi_core::{Host, Recipe, Resource, ResourceType, Runner};
/// use std::sync::Arc;
///
/// let host = Host::isolated();
/// let mut widget = ResourceType::derive("widget", &ResourceType::base());
/// widget.set_default_action("run");
/// host.resources().bind("widget", Arc::new(widget), false);
///
/// let runner = Runner::new(host).with_step_into(["widget"]);
/// let recipe = Recipe::build(|r| {
///     r.declare(Resource::new("widget", "x"));
/// });
///
/// let report = runner.converge(&recipe)?;
/// assert!(report.executed("widget", "x", "run"));
/// # Ok::<(), dokimi_core::Error>(())
/// ```
#[derive(Debug)]
pub struct Runner {
    host: Host,
    step_into: Vec<String>,
    attributes: NodeAttributes,
    options: RunnerOptions,
}

impl Runner {
    /// Creates a runner resolving types against `host`.
    #[must_use]
    pub const fn new(host: Host) -> Self {
        Self {
            host,
            step_into: Vec::new(),
            attributes: NodeAttributes::new(),
            options: RunnerOptions::new(),
        }
    }

    /// Sets the resource type names to interpret for real.
    #[must_use]
    pub fn with_step_into<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.step_into = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the node attributes for the run.
    #[must_use]
    pub fn with_attributes(mut self, attributes: NodeAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Sets arbitrary runner options.
    #[must_use]
    pub fn with_options(mut self, options: RunnerOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the configured step-into list.
    #[must_use]
    pub fn step_into(&self) -> &[String] {
        &self.step_into
    }

    /// Returns the configured node attributes.
    #[must_use]
    pub const fn attributes(&self) -> &NodeAttributes {
        &self.attributes
    }

    /// Returns the configured runner options.
    #[must_use]
    pub const fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// Converges a single recipe.
    ///
    /// # Errors
    ///
    /// Returns an error when a declaration references an unknown type, an
    /// action outside the allowed set, a provider without the resolved
    /// action, or when a provider action body fails.
    pub fn converge(&self, recipe: &Recipe) -> Result<RunReport> {
        self.converge_all(std::slice::from_ref(recipe))
    }

    /// Converges several recipes into one report, in order.
    ///
    /// # Errors
    ///
    /// See [`Runner::converge`]. The first failure aborts the run.
    pub fn converge_all(&self, recipes: &[Recipe]) -> Result<RunReport> {
        let start = Instant::now();
        let mut report = RunReport::new();

        for recipe in recipes {
            info!(recipe = recipe.name().unwrap_or("<inline>"), "Converging recipe");
            self.converge_into(recipe, &mut report)?;
        }

        report.duration = start.elapsed();
        info!(
            events = report.events().len(),
            duration = ?report.duration(),
            "Convergence complete"
        );
        Ok(report)
    }

    fn converge_into(&self, recipe: &Recipe, report: &mut RunReport) -> Result<()> {
        for declaration in recipe.declarations() {
            let type_name = declaration.type_name();
            let ty = self.host.resources().get(type_name).ok_or_else(|| {
                Error::UnknownType {
                    namespace: self.host.resources().label().to_string(),
                    name: type_name.to_string(),
                }
            })?;

            let action = declaration
                .action()
                .unwrap_or_else(|| ty.default_action())
                .to_string();
            if !ty.actions().contains(&action) {
                return Err(Error::ActionNotAllowed {
                    resource: type_name.to_string(),
                    action,
                });
            }

            let stepped = self.step_into.iter().any(|n| n == type_name);
            debug!(
                resource = type_name,
                identifier = declaration.identifier(),
                action = %action,
                stepped,
                "Resolving declaration"
            );

            report.record(ActionEvent {
                resource_type: type_name.to_string(),
                identifier: declaration.identifier().to_string(),
                action: action.clone(),
                executed: stepped,
            });

            if !stepped {
                continue;
            }

            // A stepped-into resource without a registered provider runs the
            // action as the type's intrinsic runnable no-op.
            if let Some(provider) = self.host.providers().get(type_name) {
                let body = provider.action(&action).ok_or_else(|| Error::MissingAction {
                    provider: provider.name().to_string(),
                    action: action.clone(),
                })?;

                let mut ctx = ProviderContext::new(
                    provider.name(),
                    declaration,
                    report,
                    provider.assertions(),
                );
                if let Some(load) = provider.load_current_state() {
                    load(&mut ctx)?;
                }
                body(&mut ctx)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderType;
    use crate::resource::{Resource, ResourceType};
    use std::sync::Arc;

    fn host_with_widget() -> Host {
        let host = Host::isolated();
        let mut widget = ResourceType::derive("widget", &ResourceType::base());
        widget.set_default_action("run");
        widget.allow_action("remove");
        host.resources().bind("widget", Arc::new(widget), false);
        host
    }

    #[test]
    fn test_unknown_type_fails() {
        let runner = Runner::new(Host::isolated());
        let recipe = Recipe::build(|r| {
            r.declare(Resource::new("missing", "x"));
        });

        assert!(matches!(
            runner.converge(&recipe),
            Err(Error::UnknownType { .. })
        ));
    }

    #[test]
    fn test_disallowed_action_fails() {
        let runner = Runner::new(host_with_widget());
        let recipe = Recipe::build(|r| {
            r.declare(Resource::new("widget", "x").with_action("explode"));
        });

        assert!(matches!(
            runner.converge(&recipe),
            Err(Error::ActionNotAllowed { .. })
        ));
    }

    #[test]
    fn test_stubbed_resource_records_unexecuted_event() {
        let runner = Runner::new(host_with_widget());
        let recipe = Recipe::build(|r| {
            r.declare(Resource::new("widget", "x"));
        });

        let report = runner.converge(&recipe).unwrap();
        assert!(report.resolved("widget", "x", "run"));
        assert!(!report.executed("widget", "x", "run"));
    }

    #[test]
    fn test_step_into_without_provider_runs_intrinsic_default() {
        let runner = Runner::new(host_with_widget()).with_step_into(["widget"]);
        let recipe = Recipe::build(|r| {
            r.declare(Resource::new("widget", "x"));
        });

        let report = runner.converge(&recipe).unwrap();
        assert!(report.executed("widget", "x", "run"));
    }

    #[test]
    fn test_step_into_runs_provider_body() {
        let host = host_with_widget();
        let mut provider = ProviderType::new("widget");
        provider.set_action("run", |ctx| {
            ctx.perform("y");
            Ok(())
        });
        host.providers().bind("widget", Arc::new(provider), false);

        let runner = Runner::new(host).with_step_into(["widget"]);
        let recipe = Recipe::build(|r| {
            r.declare(Resource::new("widget", "x"));
        });

        let report = runner.converge(&recipe).unwrap();
        assert!(report.executed("widget", "x", "run"));
        assert!(report.executed("widget", "x", "y"));
    }

    #[test]
    fn test_provider_missing_action_fails() {
        let host = host_with_widget();
        let provider = ProviderType::new("widget");
        host.providers().bind("widget", Arc::new(provider), false);

        let runner = Runner::new(host).with_step_into(["widget"]);
        let recipe = Recipe::build(|r| {
            r.declare(Resource::new("widget", "x"));
        });

        assert!(matches!(
            runner.converge(&recipe),
            Err(Error::MissingAction { .. })
        ));
    }

    #[test]
    fn test_converge_all_merges_reports() {
        let runner = Runner::new(host_with_widget()).with_step_into(["widget"]);
        let first = Recipe::named("first").with_resource(Resource::new("widget", "a"));
        let second = Recipe::named("second").with_resource(Resource::new("widget", "b"));

        let report = runner.converge_all(&[first, second]).unwrap();
        assert!(report.executed("widget", "a", "run"));
        assert!(report.executed("widget", "b", "run"));
        assert_eq!(report.events().len(), 2);
    }

    #[test]
    fn test_failing_action_propagates() {
        let host = host_with_widget();
        let mut provider = ProviderType::new("widget");
        provider.set_action("run", |ctx| {
            Err(Error::ActionFailed {
                action: "run".to_string(),
                resource: ctx.resource().type_name().to_string(),
                identifier: ctx.resource().identifier().to_string(),
                reason: "backend unavailable".to_string(),
            })
        });
        host.providers().bind("widget", Arc::new(provider), false);

        let runner = Runner::new(host).with_step_into(["widget"]);
        let recipe = Recipe::build(|r| {
            r.declare(Resource::new("widget", "x"));
        });

        assert!(matches!(
            runner.converge(&recipe),
            Err(Error::ActionFailed { .. })
        ));
    }
}
