//! # Dokimi Core
//!
//! Host framework type model for the Dokimi test harness.
//!
//! This crate models the configuration-management host as far as the harness
//! needs it:
//!
//! - [`Namespace`] / [`Host`] - Shared type tables with harness-ownership tags
//! - [`ResourceType`] / [`Resource`] - Declarative resource types and instances
//! - [`ProviderType`] - Executable action bodies realizing resource actions
//! - [`Recipe`] - Ordered resource declarations
//! - [`Runner`] / [`RunReport`] - In-memory convergence recording every action
//! - [`NodeAttributes`] / [`RunnerOptions`] - Per-run configuration buckets
//!
//! Real convergence against system state is out of scope; the runner exists
//! so that tests can observe which actions a recipe resolved and executed.
//!
//! ## Example
//!
//! ```rust
//! use dokimi_core::{Host, Recipe, Resource, ResourceType, Runner};
//! use std::sync::Arc;
//!
//! let host = Host::isolated();
//! let mut widget = ResourceType::derive("widget", &ResourceType::base());
//! widget.set_default_action("run");
//! host.resources().bind("widget", Arc::new(widget), false);
//!
//! let recipe = Recipe::build(|r| {
//!     r.declare(Resource::new("widget", "x"));
//! });
//!
//! let runner = Runner::new(host).with_step_into(["widget"]);
//! let report = runner.converge(&recipe)?;
//! assert!(report.executed("widget", "x", "run"));
//! # Ok::<(), dokimi_core::Error>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod action;
pub mod attributes;
pub mod error;
pub mod namespace;
pub mod provider;
pub mod recipe;
pub mod resource;
pub mod runner;


// Re-export main types at crate root
pub use action::{ActionSet, ACTION_NOTHING, ACTION_RUN};
pub use attributes::{AttributeMap, NodeAttributes, RunnerOptions};
pub use error::{Error, Result};
pub use namespace::{Binding, Host, Namespace};
pub use provider::{ActionFn, ProviderContext, ProviderType, ProviderTypeHandle, BASE_PROVIDER};
pub use recipe::Recipe;
pub use resource::{Resource, ResourceType, ResourceTypeHandle, BASE_RESOURCE};
pub use runner::{ActionEvent, RunReport, Runner};
