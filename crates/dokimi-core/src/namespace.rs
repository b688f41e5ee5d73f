//! Shared type namespaces with harness-ownership tags.
//!
//! The host framework resolves resource and provider types through
//! process-wide tables. Each binding carries an ownership tag so the harness
//! can tell entries it installed apart from pre-existing host entries; the
//! harness must never overwrite or remove an entry it does not own.

use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::debug;

use crate::provider::ProviderTypeHandle;
use crate::resource::ResourceTypeHandle;

/// A single binding in a namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding<T> {
    /// The bound value.
    pub value: T,
    /// True if the binding was installed by the harness.
    pub harness_owned: bool,
}

/// A labelled table mapping names to tagged bindings.
///
/// Mutation is guarded by a lock for memory safety, but the harness relies on
/// strictly sequential example execution for logical safety (see the patcher
/// in `dokimi-harness`).
#[derive(Debug)]
pub struct Namespace<T> {
    label: String,
    entries: RwLock<BTreeMap<String, Binding<T>>>,
}

impl<T: Clone> Namespace<T> {
    /// Creates an empty namespace with the given label.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Returns the namespace label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the bound value for `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<T> {
        self.entries.read().get(name).map(|b| b.value.clone())
    }

    /// Returns the full binding for `name`, including its ownership tag.
    #[must_use]
    pub fn binding(&self, name: &str) -> Option<Binding<T>> {
        self.entries.read().get(name).cloned()
    }

    /// Returns true if `name` is bound.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// Installs a binding, replacing any existing one.
    pub fn bind(&self, name: impl Into<String>, value: T, harness_owned: bool) {
        let name = name.into();
        debug!(namespace = %self.label, name = %name, harness_owned, "Binding name");
        self.entries.write().insert(
            name,
            Binding {
                value,
                harness_owned,
            },
        );
    }

    /// Removes and returns the binding for `name`.
    pub fn remove(&self, name: &str) -> Option<Binding<T>> {
        let removed = self.entries.write().remove(name);
        if removed.is_some() {
            debug!(namespace = %self.label, name = %name, "Removed binding");
        }
        removed
    }

    /// Returns all bound names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Returns the number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the namespace has no bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns a point-in-time copy of every binding.
    ///
    /// Used to assert that a sequence of scoped patches left the namespace
    /// observably identical to its prior state.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, Binding<T>> {
        self.entries.read().clone()
    }
}

/// The host framework's shared type tables.
///
/// `Host` is cheap to clone: both tables are shared behind [`Arc`]. Use
/// [`Host::global`] to address the process-wide tables the host framework
/// itself resolves against, or [`Host::isolated`] for fresh tables that a
/// test suite can mutate without affecting anything else.
#[derive(Debug, Clone)]
pub struct Host {
    resources: Arc<Namespace<ResourceTypeHandle>>,
    providers: Arc<Namespace<ProviderTypeHandle>>,
}

static GLOBAL_HOST: Lazy<Host> = Lazy::new(Host::isolated);

impl Host {
    /// Returns a handle to the process-wide host tables.
    #[must_use]
    pub fn global() -> Self {
        GLOBAL_HOST.clone()
    }

    /// Creates a fresh, empty pair of type tables.
    #[must_use]
    pub fn isolated() -> Self {
        Self {
            resources: Arc::new(Namespace::new("resources")),
            providers: Arc::new(Namespace::new("providers")),
        }
    }

    /// Returns the resource type namespace.
    #[must_use]
    pub fn resources(&self) -> &Namespace<ResourceTypeHandle> {
        &self.resources
    }

    /// Returns the provider type namespace.
    #[must_use]
    pub fn providers(&self) -> &Namespace<ProviderTypeHandle> {
        &self.providers
    }
}
