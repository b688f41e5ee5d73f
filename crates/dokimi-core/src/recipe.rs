//! Recipes: declarative scripts that invoke resources.

use serde::{Deserialize, Serialize};

use crate::resource::Resource;

/// An ordered list of resource declarations.
///
/// # Examples
///
/// ```rust
/// use dokimi_core::{Recipe, Resource};
///
/// let recipe = Recipe::build(|r| {
///     r.declare(Resource::new("widget", "x"));
///     r.declare(Resource::new("widget", "y").with_action("remove"));
/// });
///
/// assert_eq!(recipe.declarations().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Optional recipe name.
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    declarations: Vec<Resource>,
}

impl Recipe {
    /// Creates an empty, anonymous recipe.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            name: None,
            declarations: Vec::new(),
        }
    }

    /// Creates an empty recipe with a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            declarations: Vec::new(),
        }
    }

    /// Builds an inline recipe through a closure.
    #[must_use]
    pub fn build(f: impl FnOnce(&mut Self)) -> Self {
        let mut recipe = Self::new();
        f(&mut recipe);
        recipe
    }

    /// Returns the recipe name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Appends a resource declaration.
    pub fn declare(&mut self, resource: Resource) -> &mut Self {
        self.declarations.push(resource);
        self
    }

    /// Appends a resource declaration, builder style.
    #[must_use]
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.declarations.push(resource);
        self
    }

    /// Returns the declarations in declaration order.
    #[must_use]
    pub fn declarations(&self) -> &[Resource] {
        &self.declarations
    }

    /// Returns true if the recipe declares nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}
