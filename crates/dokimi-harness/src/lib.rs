//! # Dokimi Harness
//!
//! Test-authoring harness for the Dokimi configuration-management host.
//!
//! Tests define throwaway resource and provider types inline, run a recipe
//! against them, and assert on the recorded outcome. The harness patches the
//! synthetic types into the host's shared namespaces for the duration of one
//! example and restores the namespaces on every exit path, so unrelated
//! tests never observe them.
//!
//! This crate provides functionality for:
//!
//! - Scoped namespace patching with guaranteed restoration ([`patch`])
//! - Hierarchical test scopes with override resolution ([`Scope`])
//! - Dynamic resource/provider type builders ([`define_resource`],
//!   [`define_provider`])
//! - Capability stepping and generated matchers ([`step_into`],
//!   [`MatcherTable`])
//! - Per-example orchestration with a memoized subject ([`TestRunContext`])
//!
//! ## Example
//!
//! ```rust
//! use dokimi_core::{Host, Recipe, Resource};
//! use dokimi_harness::{define_resource, ResourceOptions, Scope, TestRunContext};
//!
//! let scope = Scope::root_with_host("widget suite", Host::isolated());
//!
//! // Declare a throwaway resource type; the `nothing` default becomes a
//! // runnable `run` default so the example can observe it.
//! define_resource(&scope, "widget", ResourceOptions::default(), |_| {})?;
//!
//! let mut ctx = TestRunContext::new(scope);
//! ctx.define_inline_recipe(Recipe::build(|r| {
//!     r.declare(Resource::new("widget", "x"));
//! }));
//!
//! let report = ctx.run()?;
//! assert!(ctx.matcher("runWidget")?.call("x").matches(&report));
//! # Ok::<(), dokimi_harness::HarnessError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod builder;
pub mod context;
pub mod error;
pub mod matchers;
pub mod patch;
pub mod scope;
pub mod stepper;


// Re-export main types at crate root
pub use builder::{define_provider, define_resource, ParentRef, ProviderOptions, ResourceOptions};
pub use context::TestRunContext;
pub use error::{HarnessError, Result};
pub use matchers::{accessor_name, ExecutionMatcher, MatcherAccessor, MatcherTable};
pub use patch::{install, with_patch, PatchGuard, PatchRecord};
pub use scope::{Scope, ScopeRegistry, TypeDefinition};
pub use stepper::{step_into, StepTarget};
