//! Runner names whose instance may not be listed yet.
//!
//! A name is tracked from the moment its registration token is requested. When
//! the provisioning call returns, the name moves to a settled set that survives
//! until the collector opens its next pass with [`PendingNames::mark`].
//!
//! A collector pass that calls `mark` before listing and [`PendingNames::spared`]
//! after listing sees every name whose registration may be listed while its
//! instance is not.
use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard},
};

#[derive(Debug, Default)]
struct Names {
    active: HashSet<String>,
    settled: HashSet<String>,
}

#[derive(Debug, Default)]
pub struct PendingNames {
    names: Mutex<Names>,
}

impl PendingNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `name` until the returned guard is dropped.
    pub fn track(self: &Arc<Self>, name: &str) -> PendingGuard {
        self.lock().active.insert(name.to_string());
        PendingGuard {
            names: Arc::clone(self),
            name: name.to_string(),
        }
    }

    /// Forget names settled before this point.
    pub fn mark(&self) {
        self.lock().settled.clear();
    }

    /// Names in flight, or settled since the last [`mark`](Self::mark).
    pub fn spared(&self) -> HashSet<String> {
        let names = self.lock();
        names.active.union(&names.settled).cloned().collect()
    }

    pub fn in_flight(&self) -> usize {
        self.lock().active.len()
    }

    fn lock(&self) -> MutexGuard<'_, Names> {
        self.names.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Moves its name to the settled set on drop.
#[derive(Debug)]
pub struct PendingGuard {
    names: Arc<PendingNames>,
    name: String,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let mut names = self.names.lock();
        names.active.remove(&self.name);
        names.settled.insert(std::mem::take(&mut self.name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracked_name_is_spared_until_marked_after_release() {
        let pending = Arc::new(PendingNames::new());

        let guard = pending.track("gha-aaaa");
        assert_eq!(pending.in_flight(), 1);
        pending.mark();
        assert!(pending.spared().contains("gha-aaaa"));

        drop(guard);
        assert_eq!(pending.in_flight(), 0);
        assert!(pending.spared().contains("gha-aaaa"));

        pending.mark();
        assert!(pending.spared().is_empty());
    }

    #[test]
    fn unrelated_names_are_not_spared() {
        let pending = Arc::new(PendingNames::new());
        let _a = pending.track("gha-aaaa");

        assert!(!pending.spared().contains("gha-bbbb"));
    }
}
