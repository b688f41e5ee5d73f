//! Test scopes and hierarchical resolution.
//!
//! A [`Scope`] is a node in the tree of test groups. Each scope owns the
//! type definitions, step-into list, matcher table, attribute buckets, and
//! recipe library declared inside it. Resolution walks the ancestor chain
//! root-first and folds each scope's state in order, so the definition
//! closest to the leaf wins. The fold depends only on the static tree, not
//! on declaration order across scopes.

use std::collections::BTreeMap;
use std::sync::Arc;

use dokimi_core::{
    Host, NodeAttributes, ProviderTypeHandle, Recipe, ResourceTypeHandle, RunnerOptions,
};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{HarnessError, Result};
use crate::matchers::{MatcherAccessor, MatcherTable};

/// Immutable record of one harness-declared type.
#[derive(Debug, Clone)]
pub struct TypeDefinition<T> {
    name: String,
    built: T,
    parent: T,
}

impl<T: Clone> TypeDefinition<T> {
    /// Creates a definition record.
    #[must_use]
    pub fn new(name: impl Into<String>, built: T, parent: T) -> Self {
        Self {
            name: name.into(),
            built,
            parent,
        }
    }

    /// Returns the declared name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the synthesized type handle.
    #[must_use]
    pub const fn built(&self) -> &T {
        &self.built
    }

    /// Returns the parent type handle the definition derived from.
    #[must_use]
    pub const fn parent(&self) -> &T {
        &self.parent
    }
}

/// Per-scope mapping from declared name to type definition.
#[derive(Debug, Clone)]
pub struct ScopeRegistry<T> {
    entries: BTreeMap<String, TypeDefinition<T>>,
}

impl<T> Default for ScopeRegistry<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T: Clone> ScopeRegistry<T> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a definition, replacing any previous definition of the name.
    pub fn insert(&mut self, definition: TypeDefinition<T>) {
        self.entries.insert(definition.name.clone(), definition);
    }

    /// Returns the definition for `name`, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TypeDefinition<T>> {
        self.entries.get(name)
    }

    /// Returns all declared names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Iterates over the definitions.
    pub fn iter(&self) -> impl Iterator<Item = &TypeDefinition<T>> {
        self.entries.values()
    }

    /// Returns the number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no definitions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Folds `other` into `self`; definitions from `other` win.
    pub fn merge_from(&mut self, other: &Self) {
        for definition in other.entries.values() {
            self.insert(definition.clone());
        }
    }
}

#[derive(Debug, Default)]
struct ScopeState {
    resources: ScopeRegistry<ResourceTypeHandle>,
    providers: ScopeRegistry<ProviderTypeHandle>,
    step_into: Vec<String>,
    matchers: MatcherTable,
    attributes: NodeAttributes,
    options: RunnerOptions,
    recipes: BTreeMap<String, Recipe>,
}

/// A node in the tree of test groups.
///
/// # Examples
///
/// ```rust
/// use dokimi_harness::Scope;
/// use dokimi_core::Host;
///
/// let root = Scope::root_with_host("suite", Host::isolated());
/// let group = root.child("when the widget exists");
///
/// assert_eq!(group.lineage().len(), 2);
/// ```
#[derive(Debug)]
pub struct Scope {
    name: String,
    host: Host,
    parent: Option<Arc<Scope>>,
    state: RwLock<ScopeState>,
}

impl Scope {
    /// Creates a root scope bound to the process-wide host tables.
    #[must_use]
    pub fn root(name: impl Into<String>) -> Arc<Self> {
        Self::root_with_host(name, Host::global())
    }

    /// Creates a root scope bound to the given host tables.
    ///
    /// Use with [`Host::isolated`] to keep suites from sharing global state.
    #[must_use]
    pub fn root_with_host(name: impl Into<String>, host: Host) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            host,
            parent: None,
            state: RwLock::new(ScopeState::default()),
        })
    }

    /// Creates a child scope sharing this scope's host.
    #[must_use]
    pub fn child(self: &Arc<Self>, name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            host: self.host.clone(),
            parent: Some(self.clone()),
            state: RwLock::new(ScopeState::default()),
        })
    }

    /// Returns the scope name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the host tables this scope patches.
    #[must_use]
    pub const fn host(&self) -> &Host {
        &self.host
    }

    /// Returns the parent scope, if any.
    #[must_use]
    pub const fn parent(&self) -> Option<&Arc<Self>> {
        self.parent.as_ref()
    }

    /// Returns the ancestor chain from the root down to this scope.
    #[must_use]
    pub fn lineage(self: &Arc<Self>) -> Vec<Arc<Self>> {
        let mut chain = Vec::new();
        let mut current = Some(self.clone());
        while let Some(scope) = current {
            current = scope.parent.clone();
            chain.push(scope);
        }
        chain.reverse();
        chain
    }

    /// Registers a resource definition in this scope.
    pub fn register_resource(&self, definition: TypeDefinition<ResourceTypeHandle>) {
        debug!(scope = %self.name, name = %definition.name(), "Registering resource definition");
        self.state.write().resources.insert(definition);
    }

    /// Registers a provider definition in this scope.
    pub fn register_provider(&self, definition: TypeDefinition<ProviderTypeHandle>) {
        debug!(scope = %self.name, name = %definition.name(), "Registering provider definition");
        self.state.write().providers.insert(definition);
    }

    /// Appends a resource type name to this scope's step-into list.
    pub fn add_step_into(&self, name: impl Into<String>) {
        let name = name.into();
        let mut state = self.state.write();
        if !state.step_into.contains(&name) {
            state.step_into.push(name);
        }
    }

    /// Adds a generated matcher accessor to this scope.
    pub fn add_matcher(&self, accessor: MatcherAccessor) {
        self.state.write().matchers.insert(accessor);
    }

    /// Replaces this scope's attribute buckets.
    pub fn set_attributes(&self, attributes: NodeAttributes) {
        self.state.write().attributes = attributes;
    }

    /// Replaces this scope's runner options.
    pub fn set_options(&self, options: RunnerOptions) {
        self.state.write().options = options;
    }

    /// Registers a named recipe in this scope's recipe library.
    pub fn register_recipe(&self, name: impl Into<String>, recipe: Recipe) {
        self.state.write().recipes.insert(name.into(), recipe);
    }

    fn chain(&self) -> Vec<&Self> {
        let mut chain = Vec::new();
        let mut current = self;
        loop {
            chain.push(current);
            match &current.parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        chain.reverse();
        chain
    }

    /// Folds the resource registries of the ancestor chain, root first;
    /// definitions closer to this scope win.
    #[must_use]
    pub fn effective_resources(&self) -> ScopeRegistry<ResourceTypeHandle> {
        let mut merged = ScopeRegistry::new();
        for scope in self.chain() {
            merged.merge_from(&scope.state.read().resources);
        }
        merged
    }

    /// Folds the provider registries of the ancestor chain, root first.
    #[must_use]
    pub fn effective_providers(&self) -> ScopeRegistry<ProviderTypeHandle> {
        let mut merged = ScopeRegistry::new();
        for scope in self.chain() {
            merged.merge_from(&scope.state.read().providers);
        }
        merged
    }

    /// Resolves a resource definition through the scope chain.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Lookup`] when no ancestor declares `name`.
    pub fn resolve_resource(&self, name: &str) -> Result<TypeDefinition<ResourceTypeHandle>> {
        self.effective_resources()
            .get(name)
            .cloned()
            .ok_or_else(|| HarnessError::Lookup {
                name: name.to_string(),
            })
    }

    /// Resolves a provider definition through the scope chain.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Lookup`] when no ancestor declares `name`.
    pub fn resolve_provider(&self, name: &str) -> Result<TypeDefinition<ProviderTypeHandle>> {
        self.effective_providers()
            .get(name)
            .cloned()
            .ok_or_else(|| HarnessError::Lookup {
                name: name.to_string(),
            })
    }

    /// Returns the accumulated step-into list, root first, deduplicated.
    #[must_use]
    pub fn effective_step_into(&self) -> Vec<String> {
        let mut merged: Vec<String> = Vec::new();
        for scope in self.chain() {
            for name in &scope.state.read().step_into {
                if !merged.contains(name) {
                    merged.push(name.clone());
                }
            }
        }
        merged
    }

    /// Returns the folded matcher table for this scope.
    #[must_use]
    pub fn effective_matchers(&self) -> MatcherTable {
        let mut merged = MatcherTable::new();
        for scope in self.chain() {
            merged.merge_from(&scope.state.read().matchers);
        }
        merged
    }

    /// Returns the folded attribute buckets; closer scopes win per key.
    #[must_use]
    pub fn effective_attributes(&self) -> NodeAttributes {
        let mut merged = NodeAttributes::new();
        for scope in self.chain() {
            merged.merge_from(&scope.state.read().attributes);
        }
        merged
    }

    /// Returns the folded runner options; closer scopes win per key.
    #[must_use]
    pub fn effective_options(&self) -> RunnerOptions {
        let mut merged = RunnerOptions::new();
        for scope in self.chain() {
            merged.merge_from(&scope.state.read().options);
        }
        merged
    }

    /// Resolves a named recipe through the scope chain.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Lookup`] when no ancestor registers `name`.
    pub fn resolve_recipe(&self, name: &str) -> Result<Recipe> {
        for scope in self.chain().into_iter().rev() {
            if let Some(recipe) = scope.state.read().recipes.get(name) {
                return Ok(recipe.clone());
            }
        }
        Err(HarnessError::Lookup {
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dokimi_core::{Resource, ResourceType};
    use serde_json::json;

    fn handle(name: &str) -> ResourceTypeHandle {
        Arc::new(ResourceType::derive(name, &ResourceType::base()))
    }

    fn definition(name: &str, marker: &str) -> TypeDefinition<ResourceTypeHandle> {
        TypeDefinition::new(name, handle(marker), Arc::new(ResourceType::base()))
    }

    fn isolated_root(name: &str) -> Arc<Scope> {
        Scope::root_with_host(name, Host::isolated())
    }

    #[test]
    fn test_lineage_is_root_first() {
        let root = isolated_root("root");
        let mid = root.child("mid");
        let leaf = mid.child("leaf");

        let names: Vec<_> = leaf.lineage().iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec!["root", "mid", "leaf"]);
    }

    #[test]
    fn test_root_scope_uses_global_host_tables() {
        let root = Scope::root("suite");
        assert!(std::ptr::eq(
            root.host().resources(),
            Host::global().resources()
        ));
        assert!(std::ptr::eq(
            root.host().providers(),
            Host::global().providers()
        ));
    }

    #[test]
    fn test_descendant_overrides_ancestor() {
        let root = isolated_root("root");
        let leaf = root.child("leaf");

        root.register_resource(definition("widget", "from_root"));
        leaf.register_resource(definition("widget", "from_leaf"));

        assert_eq!(
            leaf.resolve_resource("widget").unwrap().built().name(),
            "from_leaf"
        );
        assert_eq!(
            root.resolve_resource("widget").unwrap().built().name(),
            "from_root"
        );
    }

    #[test]
    fn test_resolution_inherits_from_ancestors() {
        let root = isolated_root("root");
        let leaf = root.child("leaf");

        root.register_resource(definition("widget", "from_root"));

        assert_eq!(
            leaf.resolve_resource("widget").unwrap().built().name(),
            "from_root"
        );
    }

    #[test]
    fn test_lookup_error_when_absent_everywhere() {
        let root = isolated_root("root");
        let leaf = root.child("leaf");

        assert!(matches!(
            leaf.resolve_resource("missing"),
            Err(HarnessError::Lookup { .. })
        ));
    }

    #[test]
    fn test_resolution_ignores_declaration_order() {
        let root = isolated_root("root");
        let leaf = root.child("leaf");

        // The leaf declares before the root; the fold still prefers the leaf.
        leaf.register_resource(definition("widget", "from_leaf"));
        root.register_resource(definition("widget", "from_root"));

        assert_eq!(
            leaf.resolve_resource("widget").unwrap().built().name(),
            "from_leaf"
        );
    }

    #[test]
    fn test_step_into_accumulates_root_first() {
        let root = isolated_root("root");
        let leaf = root.child("leaf");

        root.add_step_into("widget");
        leaf.add_step_into("gadget");
        leaf.add_step_into("widget"); // duplicate, ignored

        assert_eq!(leaf.effective_step_into(), vec!["widget", "gadget"]);
        assert_eq!(root.effective_step_into(), vec!["widget"]);
    }

    #[test]
    fn test_attributes_closest_scope_wins() {
        let root = isolated_root("root");
        let leaf = root.child("leaf");

        let mut base = NodeAttributes::new();
        base.default.insert("port".to_string(), json!(80));
        base.default.insert("host".to_string(), json!("localhost"));
        root.set_attributes(base);

        let mut overlay = NodeAttributes::new();
        overlay.default.insert("port".to_string(), json!(8080));
        leaf.set_attributes(overlay);

        let effective = leaf.effective_attributes();
        assert_eq!(effective.default["port"], json!(8080));
        assert_eq!(effective.default["host"], json!("localhost"));
    }

    #[test]
    fn test_recipe_library_resolution() {
        let root = isolated_root("root");
        let leaf = root.child("leaf");

        root.register_recipe(
            "default",
            Recipe::named("default").with_resource(Resource::new("widget", "root_copy")),
        );
        leaf.register_recipe(
            "default",
            Recipe::named("default").with_resource(Resource::new("widget", "leaf_copy")),
        );

        let resolved = leaf.resolve_recipe("default").unwrap();
        assert_eq!(resolved.declarations()[0].identifier(), "leaf_copy");
        assert!(matches!(
            leaf.resolve_recipe("missing"),
            Err(HarnessError::Lookup { .. })
        ));
    }
}
