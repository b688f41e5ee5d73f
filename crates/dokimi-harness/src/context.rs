//! Per-example run context.
//!
//! A [`TestRunContext`] orchestrates one example: it resolves the subject
//! recipes, installs every harness-declared type into the host namespaces,
//! converges through a runner configured from the scope chain, restores the
//! namespaces, and memoizes the outcome as the subject under test.

use std::sync::Arc;

use dokimi_core::{Recipe, RunReport, Runner};
use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::error::{HarnessError, Result};
use crate::matchers::MatcherAccessor;
use crate::patch;
use crate::scope::Scope;

/// Subject under test for one example.
///
/// # Examples
///
/// ```rust
/// use dokimi_core::{Host, Recipe, Resource};
/// use dokimi_harness::{define_resource, ResourceOptions, Scope, TestRunContext};
///
/// let scope = Scope::root_with_host("suite", Host::isolated());
/// define_resource(&scope, "widget", ResourceOptions::default(), |_| {})?;
///
/// let mut ctx = TestRunContext::new(scope);
/// ctx.define_inline_recipe(Recipe::build(|r| {
///     r.declare(Resource::new("widget", "x"));
/// }));
///
/// let report = ctx.run()?;
/// assert!(ctx.matcher("runWidget")?.call("x").matches(&report));
/// # Ok::<(), dokimi_harness::HarnessError>(())
/// ```
#[derive(Debug)]
pub struct TestRunContext {
    scope: Arc<Scope>,
    recipe_names: Vec<String>,
    inline: Option<Recipe>,
    outcome: OnceCell<Arc<RunReport>>,
}

impl TestRunContext {
    /// Creates a context for an example running in `scope`.
    #[must_use]
    pub fn new(scope: Arc<Scope>) -> Self {
        Self {
            scope,
            recipe_names: Vec::new(),
            inline: None,
            outcome: OnceCell::new(),
        }
    }

    /// Registers the example's subject: named recipes from the scope chain's
    /// recipe library, plus an optional inline recipe converged after them.
    pub fn define_recipe<I, S>(&mut self, names: I, inline: Option<Recipe>) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recipe_names = names.into_iter().map(Into::into).collect();
        self.inline = inline;
        self
    }

    /// Registers an inline recipe as the example's whole subject.
    pub fn define_inline_recipe(&mut self, recipe: Recipe) -> &mut Self {
        self.define_recipe(Vec::<String>::new(), Some(recipe))
    }

    /// Returns the scope this context runs in.
    #[must_use]
    pub const fn scope(&self) -> &Arc<Scope> {
        &self.scope
    }

    /// Lazily converges the subject, exactly once per context.
    ///
    /// Subsequent calls return the memoized report without re-executing.
    ///
    /// # Errors
    ///
    /// Propagates setup errors (unknown recipe names, namespace conflicts)
    /// and convergence failures. Namespace restoration runs in every case.
    pub fn run(&self) -> Result<Arc<RunReport>> {
        self.outcome
            .get_or_try_init(|| self.converge().map(Arc::new))
            .cloned()
    }

    /// Forces the lazily-built subject to materialize.
    ///
    /// # Errors
    ///
    /// See [`TestRunContext::run`].
    pub fn force_evaluation(&self) -> Result<()> {
        self.run().map(|_| ())
    }

    /// Returns a generated matcher accessor by its deterministic name.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Lookup`] when no stepped-into type generated
    /// an accessor with that name.
    pub fn matcher(&self, accessor_name: &str) -> Result<MatcherAccessor> {
        self.scope
            .effective_matchers()
            .get(accessor_name)
            .cloned()
            .ok_or_else(|| HarnessError::Lookup {
                name: accessor_name.to_string(),
            })
    }

    fn converge(&self) -> Result<RunReport> {
        // Resolve the subject before touching the namespaces.
        let mut recipes = Vec::new();
        for name in &self.recipe_names {
            recipes.push(self.scope.resolve_recipe(name)?);
        }
        if let Some(inline) = &self.inline {
            recipes.push(inline.clone());
        }

        let host = self.scope.host();
        let resources = self.scope.effective_resources();
        let providers = self.scope.effective_providers();
        info!(
            scope = %self.scope.name(),
            resources = resources.len(),
            providers = providers.len(),
            recipes = recipes.len(),
            "Converging example subject"
        );

        // Install the resolved definitions for the extent of this example.
        // A failure mid-install drops the earlier guards, which restores
        // whatever was already patched.
        let mut resource_guards = Vec::new();
        for definition in resources.iter() {
            resource_guards.push(patch::install(
                host.resources(),
                definition.name(),
                definition.built().clone(),
            )?);
        }
        let mut provider_guards = Vec::new();
        for definition in providers.iter() {
            provider_guards.push(patch::install(
                host.providers(),
                definition.name(),
                definition.built().clone(),
            )?);
        }

        let runner = Runner::new(host.clone())
            .with_step_into(self.scope.effective_step_into())
            .with_attributes(self.scope.effective_attributes())
            .with_options(self.scope.effective_options());
        let outcome = runner.converge_all(&recipes);

        // Restore in reverse installation order before propagating the
        // outcome; cleanup must not suppress a convergence failure.
        while let Some(guard) = provider_guards.pop() {
            drop(guard);
        }
        while let Some(guard) = resource_guards.pop() {
            drop(guard);
        }
        debug!(scope = %self.scope.name(), "Host namespaces restored");

        Ok(outcome?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{define_provider, define_resource, ProviderOptions, ResourceOptions};
    use dokimi_core::{Host, ProviderType, Resource, ResourceType};

    fn isolated_root(name: &str) -> Arc<Scope> {
        Scope::root_with_host(name, Host::isolated())
    }

    fn widget_recipe(identifier: &str) -> Recipe {
        Recipe::build(|r| {
            r.declare(Resource::new("widget", identifier));
        })
    }

    #[test]
    fn test_run_memoizes_outcome() {
        let scope = isolated_root("suite");
        define_resource(&scope, "widget", ResourceOptions::default(), |_| {}).unwrap();

        let mut ctx = TestRunContext::new(scope.clone());
        ctx.define_inline_recipe(widget_recipe("x"));

        let first = ctx.run().unwrap();
        // New declarations after the first run must not change the subject.
        scope.register_recipe("late", widget_recipe("y"));
        let second = ctx.run().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_force_evaluation_materializes_subject() {
        let scope = isolated_root("suite");
        define_resource(&scope, "widget", ResourceOptions::default(), |_| {}).unwrap();

        let mut ctx = TestRunContext::new(scope);
        ctx.define_inline_recipe(widget_recipe("x"));

        ctx.force_evaluation().unwrap();
        assert!(ctx.run().unwrap().executed("widget", "x", "run"));
    }

    #[test]
    fn test_named_recipes_resolve_through_scope_chain() {
        let scope = isolated_root("suite");
        define_resource(&scope, "widget", ResourceOptions::default(), |_| {}).unwrap();
        scope.register_recipe("default", widget_recipe("from_library"));

        let group = scope.child("group");
        let mut ctx = TestRunContext::new(group);
        ctx.define_recipe(["default"], None);

        let report = ctx.run().unwrap();
        assert!(report.executed("widget", "from_library", "run"));
    }

    #[test]
    fn test_unknown_recipe_name_is_lookup_error() {
        let scope = isolated_root("suite");
        let mut ctx = TestRunContext::new(scope);
        ctx.define_recipe(["missing"], None);

        assert!(matches!(ctx.run(), Err(HarnessError::Lookup { .. })));
    }

    #[test]
    fn test_namespaces_restored_after_run() {
        let scope = isolated_root("suite");
        define_resource(&scope, "widget", ResourceOptions::default(), |_| {}).unwrap();
        define_provider(&scope, "widget", ProviderOptions::default(), |_| {}).unwrap();

        let resources_before = scope.host().resources().snapshot();
        let providers_before = scope.host().providers().snapshot();

        let mut ctx = TestRunContext::new(scope.clone());
        ctx.define_inline_recipe(widget_recipe("x"));
        ctx.run().unwrap();

        assert_eq!(scope.host().resources().snapshot(), resources_before);
        assert_eq!(scope.host().providers().snapshot(), providers_before);
    }

    #[test]
    fn test_namespaces_restored_after_failed_run() {
        let scope = isolated_root("suite");
        define_resource(&scope, "widget", ResourceOptions::default(), |_| {}).unwrap();

        let before = scope.host().resources().snapshot();

        let mut ctx = TestRunContext::new(scope.clone());
        // The recipe references a type nothing registered.
        ctx.define_inline_recipe(Recipe::build(|r| {
            r.declare(Resource::new("unregistered", "x"));
        }));

        assert!(ctx.run().is_err());
        assert_eq!(scope.host().resources().snapshot(), before);
    }

    #[test]
    fn test_conflict_with_host_binding_aborts_setup() {
        let scope = isolated_root("suite");
        define_resource(&scope, "widget", ResourceOptions::default(), |_| {}).unwrap();

        // The host already owns `widget`; the patch must refuse to clobber it.
        scope.host().resources().bind(
            "widget",
            Arc::new(ResourceType::derive("widget", &ResourceType::base())),
            false,
        );
        let before = scope.host().resources().snapshot();

        let mut ctx = TestRunContext::new(scope.clone());
        ctx.define_inline_recipe(widget_recipe("x"));

        assert!(matches!(ctx.run(), Err(HarnessError::Conflict { .. })));
        assert_eq!(scope.host().resources().snapshot(), before);
    }

    #[test]
    fn test_provider_conflict_restores_installed_resource_guards() {
        let scope = isolated_root("suite");
        define_resource(&scope, "widget", ResourceOptions::default(), |_| {}).unwrap();
        define_provider(&scope, "widget", ProviderOptions::default(), |_| {}).unwrap();

        // Resource guards go in before the provider install hits the
        // host-owned binding; they must come back out with the error.
        let mut host_provider = ProviderType::new("widget");
        host_provider.set_action("run", |_ctx| Ok(()));
        scope
            .host()
            .providers()
            .bind("widget", Arc::new(host_provider), false);

        let resources_before = scope.host().resources().snapshot();
        let providers_before = scope.host().providers().snapshot();

        let mut ctx = TestRunContext::new(scope.clone());
        ctx.define_inline_recipe(widget_recipe("x"));

        assert!(matches!(ctx.run(), Err(HarnessError::Conflict { .. })));
        assert_eq!(scope.host().resources().snapshot(), resources_before);
        assert_eq!(scope.host().providers().snapshot(), providers_before);
    }

    #[test]
    fn test_descendant_definition_wins_during_run() {
        let root = isolated_root("suite");
        define_resource(&root, "widget", ResourceOptions::default(), |ty| {
            ty.allow_action("install");
        })
        .unwrap();

        let group = root.child("group");
        define_resource(&group, "widget", ResourceOptions::default(), |ty| {
            ty.allow_action("remove");
        })
        .unwrap();

        let mut ctx = TestRunContext::new(group);
        ctx.define_inline_recipe(Recipe::build(|r| {
            r.declare(Resource::new("widget", "x").with_action("remove"));
        }));

        // `remove` only exists on the descendant's definition.
        assert!(ctx.run().unwrap().executed("widget", "x", "remove"));
    }
}
