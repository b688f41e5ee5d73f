//! Node attributes and runner options.
//!
//! Attributes come in three precedence buckets (`default`, `normal`,
//! `override`). Scopes override them independently with a shallow merge at
//! the bucket level; the closest scope wins per key.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A flat attribute bucket.
pub type AttributeMap = BTreeMap<String, serde_json::Value>;

/// The three precedence buckets of node attributes.
///
/// # Examples
///
/// ```rust
/// use dokimi_core::NodeAttributes;
/// use serde_json::json;
///
/// let mut attrs = NodeAttributes::new();
/// attrs.default.insert("port".to_string(), json!(80));
/// attrs.override_.insert("port".to_string(), json!(8080));
///
/// assert_eq!(attrs.effective()["port"], json!(8080));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeAttributes {
    /// Lowest-precedence attributes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub default: AttributeMap,

    /// Normal-precedence attributes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub normal: AttributeMap,

    /// Highest-precedence attributes.
    #[serde(default, rename = "override", skip_serializing_if = "BTreeMap::is_empty")]
    pub override_: AttributeMap,
}

impl NodeAttributes {
    /// Creates an empty attribute set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            default: BTreeMap::new(),
            normal: BTreeMap::new(),
            override_: BTreeMap::new(),
        }
    }

    /// Shallow-merges `other` into `self`, bucket by bucket; keys from
    /// `other` win.
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.default {
            self.default.insert(key.clone(), value.clone());
        }
        for (key, value) in &other.normal {
            self.normal.insert(key.clone(), value.clone());
        }
        for (key, value) in &other.override_ {
            self.override_.insert(key.clone(), value.clone());
        }
    }

    /// Flattens the buckets into a single map: `default` < `normal` <
    /// `override`.
    #[must_use]
    pub fn effective(&self) -> AttributeMap {
        let mut merged = self.default.clone();
        for (key, value) in &self.normal {
            merged.insert(key.clone(), value.clone());
        }
        for (key, value) in &self.override_ {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }

    /// Returns true if all three buckets are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.default.is_empty() && self.normal.is_empty() && self.override_.is_empty()
    }

    /// Loads attributes from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::AttributeFileError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let attrs: Self = serde_json::from_str(&content)?;
        Ok(attrs)
    }

    /// Loads attributes from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::AttributeFileError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let attrs: Self = serde_yaml::from_str(&content)?;
        Ok(attrs)
    }
}

/// Arbitrary options forwarded to the runner.
///
/// Merging follows the same shallow, closest-scope-wins rule as attribute
/// buckets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunnerOptions {
    options: BTreeMap<String, serde_json::Value>,
}

impl RunnerOptions {
    /// Creates an empty option set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            options: BTreeMap::new(),
        }
    }

    /// Sets an option.
    pub fn set(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.options.insert(key.into(), value);
    }

    /// Returns an option value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.options.get(key)
    }

    /// Shallow-merges `other` into `self`; keys from `other` win.
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.options {
            self.options.insert(key.clone(), value.clone());
        }
    }

    /// Returns true if no options are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}
