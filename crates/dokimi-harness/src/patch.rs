//! Scoped namespace patching with guaranteed restoration.
//!
//! The harness installs synthetic types into the host's shared namespaces
//! only for the dynamic extent of one scoped operation. [`PatchGuard`]
//! restores the prior binding (or its absence) on drop, so cleanup runs on
//! normal return, on error propagation, and on panic alike. Patches for the
//! same name are strictly nested, never overlapping.

use dokimi_core::{Binding, Namespace};
use tracing::debug;

use crate::error::{HarnessError, Result};

/// Checks that `name` is an identifier derivable from a snake-case key.
pub(crate) fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(HarnessError::Configuration {
            name: name.to_string(),
            reason: "not a valid snake_case identifier".to_string(),
        })
    }
}

/// Undo record for one installed binding.
#[derive(Debug)]
pub struct PatchRecord<T> {
    name: String,
    previous: Option<Binding<T>>,
}

impl<T> PatchRecord<T> {
    /// Returns the patched name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if the patch shadowed a prior binding.
    #[must_use]
    pub const fn shadowed(&self) -> bool {
        self.previous.is_some()
    }
}

/// Guard that removes the installed binding and reinstalls the prior one
/// when dropped.
#[derive(Debug)]
pub struct PatchGuard<'a, T: Clone> {
    namespace: &'a Namespace<T>,
    record: Option<PatchRecord<T>>,
}

impl<T: Clone> PatchGuard<'_, T> {
    /// Returns the undo record for this patch.
    #[must_use]
    pub fn record(&self) -> Option<&PatchRecord<T>> {
        self.record.as_ref()
    }
}

impl<T: Clone> Drop for PatchGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(record) = self.record.take() {
            self.namespace.remove(&record.name);
            if let Some(previous) = record.previous {
                self.namespace
                    .bind(record.name.clone(), previous.value, previous.harness_owned);
            }
            debug!(
                namespace = %self.namespace.label(),
                name = %record.name,
                "Restored namespace binding"
            );
        }
    }
}

/// Installs `value` under `name`, tagged harness-owned, returning a guard
/// that restores the prior state on drop.
///
/// An existing binding is only shadowed when the harness owns it; the
/// existing value is removed before the new one is bound so the host never
/// observes two definitions of the same name.
///
/// # Errors
///
/// Returns [`HarnessError::Conflict`] (before any mutation) when `name` is
/// already bound to a value the harness does not own, or
/// [`HarnessError::Configuration`] when `name` is not a valid identifier.
pub fn install<'a, T: Clone>(
    namespace: &'a Namespace<T>,
    name: &str,
    value: T,
) -> Result<PatchGuard<'a, T>> {
    validate_identifier(name)?;

    if let Some(existing) = namespace.binding(name) {
        if !existing.harness_owned {
            return Err(HarnessError::Conflict {
                namespace: namespace.label().to_string(),
                name: name.to_string(),
            });
        }
    }

    let previous = namespace.remove(name);
    namespace.bind(name, value, true);
    debug!(
        namespace = %namespace.label(),
        name,
        shadowed = previous.is_some(),
        "Installed harness binding"
    );

    Ok(PatchGuard {
        namespace,
        record: Some(PatchRecord {
            name: name.to_string(),
            previous,
        }),
    })
}

/// Installs `value` under `name` for the dynamic extent of `op`.
///
/// The namespace is restored to its prior state before the operation's
/// result is propagated, whether `op` succeeded or failed.
///
/// # Errors
///
/// Fails as [`install`] does, or with whatever error `op` returns.
pub fn with_patch<T: Clone, R>(
    namespace: &Namespace<T>,
    name: &str,
    value: T,
    op: impl FnOnce() -> Result<R>,
) -> Result<R> {
    let guard = install(namespace, name, value)?;
    let outcome = op();
    // Restore before propagating the operation's outcome; cleanup must not
    // suppress the original failure.
    drop(guard);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use dokimi_core::{ResourceType, ResourceTypeHandle};
    use std::sync::Arc;

    fn handle(name: &str) -> ResourceTypeHandle {
        Arc::new(ResourceType::derive(name, &ResourceType::base()))
    }

    fn namespace() -> Namespace<ResourceTypeHandle> {
        Namespace::new("resources")
    }

    #[test]
    fn test_patch_installs_and_restores_absent_binding() {
        let ns = namespace();
        let before = ns.snapshot();

        let result = with_patch(&ns, "widget", handle("widget"), || {
            assert!(ns.binding("widget").unwrap().harness_owned);
            Ok(())
        });

        assert!(result.is_ok());
        assert_eq!(ns.snapshot(), before);
    }

    #[test]
    fn test_patch_restores_on_failure() {
        let ns = namespace();
        ns.bind("widget", handle("old"), true);
        let before = ns.snapshot();

        let result: Result<()> = with_patch(&ns, "widget", handle("new"), || {
            Err(HarnessError::Lookup {
                name: "boom".to_string(),
            })
        });

        assert!(matches!(result, Err(HarnessError::Lookup { .. })));
        assert_eq!(ns.snapshot(), before);
    }

    #[test]
    fn test_patch_restores_on_panic() {
        let ns = namespace();
        ns.bind("widget", handle("old"), true);
        let before = ns.snapshot();

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = install(&ns, "widget", handle("new")).unwrap();
            panic!("example body panicked");
        }));

        assert!(outcome.is_err());
        assert_eq!(ns.snapshot(), before);
    }

    #[test]
    fn test_conflict_on_non_harness_binding() {
        let ns = namespace();
        ns.bind("widget", handle("host"), false);
        let before = ns.snapshot();

        let err = install(&ns, "widget", handle("mine")).unwrap_err();
        assert!(matches!(err, HarnessError::Conflict { .. }));
        // The failed patch must not have mutated anything.
        assert_eq!(ns.snapshot(), before);
    }

    #[test]
    fn test_nested_patches_unwind_in_order() {
        let ns = namespace();
        let outer = handle("outer");
        let inner = handle("inner");
        let before = ns.snapshot();

        with_patch(&ns, "widget", outer.clone(), || {
            with_patch(&ns, "widget", inner.clone(), || {
                assert!(Arc::ptr_eq(&ns.get("widget").unwrap(), &inner));
                Ok(())
            })?;
            // Inner patch gone, outer visible again.
            assert!(Arc::ptr_eq(&ns.get("widget").unwrap(), &outer));
            Ok(())
        })
        .unwrap();

        assert_eq!(ns.snapshot(), before);
    }

    #[test]
    fn test_invalid_identifier_rejected() {
        let ns = namespace();
        assert!(matches!(
            install(&ns, "not a name", handle("x")),
            Err(HarnessError::Configuration { .. })
        ));
        assert!(matches!(
            install(&ns, "", handle("x")),
            Err(HarnessError::Configuration { .. })
        ));
        assert!(install(&ns, "snake_case_2", handle("x")).is_ok());
    }

    #[test]
    fn test_record_reports_shadowing() {
        let ns = namespace();
        let guard = install(&ns, "widget", handle("first")).unwrap();
        assert!(!guard.record().unwrap().shadowed());

        let nested = install(&ns, "widget", handle("second")).unwrap();
        assert!(nested.record().unwrap().shadowed());
        assert_eq!(nested.record().unwrap().name(), "widget");
    }
}
