//! Action identifiers and ordered action sets.
//!
//! Every resource type declares the set of actions its instances may run.
//! The set preserves declaration order, which downstream accessor generation
//! relies on for deterministic output.

use serde::{Deserialize, Serialize};

/// The declared "do nothing" default action carried by the base resource type.
pub const ACTION_NOTHING: &str = "nothing";

/// The runnable default action substituted for [`ACTION_NOTHING`] when a
/// resource type is normalized for testing.
pub const ACTION_RUN: &str = "run";

/// An ordered, duplicate-free set of action identifiers.
///
/// # Examples
///
/// ```rust
/// use dokimi_core::ActionSet;
///
/// let mut actions = ActionSet::new();
/// actions.insert("install");
/// actions.insert("remove");
/// actions.insert("install"); // duplicate, ignored
///
/// assert_eq!(actions.len(), 2);
/// assert!(actions.contains("remove"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionSet {
    actions: Vec<String>,
}

impl ActionSet {
    /// Creates an empty action set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            actions: Vec::new(),
        }
    }

    /// Inserts an action, keeping the first occurrence's position.
    ///
    /// Returns `true` if the action was newly inserted.
    pub fn insert(&mut self, action: impl Into<String>) -> bool {
        let action = action.into();
        if self.actions.iter().any(|a| *a == action) {
            return false;
        }
        self.actions.push(action);
        true
    }

    /// Removes an action if present.
    ///
    /// Returns `true` if the action was removed.
    pub fn remove(&mut self, action: &str) -> bool {
        let before = self.actions.len();
        self.actions.retain(|a| a != action);
        self.actions.len() != before
    }

    /// Returns true if the set contains `action`.
    #[must_use]
    pub fn contains(&self, action: &str) -> bool {
        self.actions.iter().any(|a| a == action)
    }

    /// Returns the number of actions in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Iterates over the actions in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(String::as_str)
    }

    /// Returns the actions as an owned vector, in declaration order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.actions.clone()
    }
}

impl<S: Into<String>> FromIterator<S> for ActionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for action in iter {
            set.insert(action);
        }
        set
    }
}
