// src/lock/ledger.rs

use std::collections::HashMap;

use crate::task::ResourceName;

/// Resources currently held by tasks of this process, keyed to the holding
/// task id.
///
/// A resource present here means exactly one running task holds it. Only
/// the runner's control loop touches the ledger, so there is no interior
/// locking.
#[derive(Debug, Default)]
pub struct LockLedger {
    held: HashMap<ResourceName, String>,
}

impl LockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn holder_of(&self, resource: &ResourceName) -> Option<&str> {
        self.held.get(resource).map(String::as_str)
    }

    /// First resource in `resources` that is already held, if any.
    pub fn first_held<'r>(&self, resources: &'r [ResourceName]) -> Option<&'r ResourceName> {
        resources.iter().find(|r| self.held.contains_key(*r))
    }

    /// Record `holder` as owning every resource in `resources`.
    ///
    /// Panics if any of them is already held: callers must check
    /// [`first_held`](Self::first_held) first.
    pub fn insert_all(&mut self, holder: &str, resources: &[ResourceName]) {
        if let Some(taken) = self.first_held(resources) {
            panic!(
                "lock ledger: task '{holder}' inserting resource '{taken}' already held by '{}'",
                self.held[taken]
            );
        }
        for resource in resources {
            self.held.insert(resource.clone(), holder.to_string());
        }
    }

    /// Drop `holder`'s claim on every resource in `resources`.
    ///
    /// Panics if a resource is not held, or is held by someone else.
    pub fn remove_all(&mut self, holder: &str, resources: &[ResourceName]) {
        for resource in resources {
            match self.held.remove(resource) {
                Some(owner) if owner == holder => {}
                Some(owner) => panic!(
                    "lock ledger: task '{holder}' released resource '{resource}' held by '{owner}'"
                ),
                None => panic!(
                    "lock ledger: task '{holder}' released resource '{resource}' it does not hold"
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<ResourceName> {
        list.iter().map(|s| s.parse().unwrap()).collect()
    }

    #[test]
    fn insert_then_remove_leaves_ledger_empty() {
        let mut ledger = LockLedger::new();
        let res = names(&["db", "queue"]);
        ledger.insert_all("t1", &res);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.holder_of(&res[0]), Some("t1"));

        ledger.remove_all("t1", &res);
        assert!(ledger.is_empty());
    }

    #[test]
    fn first_held_reports_overlap_in_request_order() {
        let mut ledger = LockLedger::new();
        ledger.insert_all("t1", &names(&["b"]));
        let request = names(&["a", "b", "c"]);
        assert_eq!(ledger.first_held(&request).map(|r| r.as_str()), Some("b"));
    }

    #[test]
    #[should_panic(expected = "does not hold")]
    fn releasing_unheld_resource_panics() {
        let mut ledger = LockLedger::new();
        ledger.remove_all("t1", &names(&["db"]));
    }

    #[test]
    #[should_panic(expected = "held by 't1'")]
    fn releasing_someone_elses_resource_panics() {
        let mut ledger = LockLedger::new();
        ledger.insert_all("t1", &names(&["db"]));
        ledger.remove_all("t2", &names(&["db"]));
    }
}
