// src/lockservice/table.rs

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::lock::protocol::{ConflictBody, LeaseRecord, millis};

#[derive(Debug, Clone)]
struct Lease {
    client: String,
    expires_at: Instant,
}

/// In-memory lease state of the lock service.
///
/// Expired leases are dropped lazily on every operation; `now` is passed in
/// so the rules can be exercised without sleeping.
#[derive(Debug, Default)]
pub struct LeaseTable {
    leases: HashMap<String, Lease>,
}

impl LeaseTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant or extend `client`'s lease on every resource, or report the
    /// first one held by a different client and change nothing.
    pub fn acquire(
        &mut self,
        client: &str,
        resources: &[String],
        lease: Duration,
        now: Instant,
    ) -> Result<(), ConflictBody> {
        self.purge_expired(now);
        self.check_conflict(client, resources, now)?;

        let expires_at = now + lease;
        for resource in resources {
            self.leases.insert(
                resource.clone(),
                Lease {
                    client: client.to_string(),
                    expires_at,
                },
            );
        }
        Ok(())
    }

    /// Drop `client`'s leases on `resources`. Resources nobody holds are
    /// ignored; any held by another client abort the whole release.
    pub fn release(
        &mut self,
        client: &str,
        resources: &[String],
        now: Instant,
    ) -> Result<(), ConflictBody> {
        self.purge_expired(now);
        self.check_conflict(client, resources, now)?;

        for resource in resources {
            self.leases.remove(resource);
        }
        Ok(())
    }

    /// All live leases, sorted by resource name.
    pub fn list(&mut self, now: Instant) -> Vec<LeaseRecord> {
        self.purge_expired(now);
        let mut records: Vec<LeaseRecord> = self
            .leases
            .iter()
            .map(|(resource, lease)| LeaseRecord {
                resource: resource.clone(),
                client: lease.client.clone(),
                expire_in: millis(lease.expires_at.saturating_duration_since(now)),
            })
            .collect();
        records.sort_by(|a, b| a.resource.cmp(&b.resource));
        records
    }

    fn check_conflict(
        &self,
        client: &str,
        resources: &[String],
        now: Instant,
    ) -> Result<(), ConflictBody> {
        for resource in resources {
            if let Some(lease) = self.leases.get(resource) {
                if lease.client != client {
                    return Err(ConflictBody {
                        first_resource: resource.clone(),
                        client: lease.client.clone(),
                        expire_in: millis(lease.expires_at.saturating_duration_since(now)),
                    });
                }
            }
        }
        Ok(())
    }

    fn purge_expired(&mut self, now: Instant) {
        self.leases.retain(|_, lease| lease.expires_at > now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn res(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn conflict_names_first_held_resource_and_changes_nothing() {
        let mut table = LeaseTable::new();
        let t0 = Instant::now();
        let lease = Duration::from_secs(10);

        table.acquire("alice", &res(&["b"]), lease, t0).unwrap();
        let conflict = table
            .acquire("bob", &res(&["a", "b", "c"]), lease, t0)
            .unwrap_err();

        assert_eq!(conflict.first_resource, "b");
        assert_eq!(conflict.client, "alice");
        assert_eq!(conflict.expire_in, 10_000);
        assert_eq!(table.list(t0).len(), 1, "partial grant must not happen");
    }

    #[test]
    fn same_client_extends_its_lease() {
        let mut table = LeaseTable::new();
        let t0 = Instant::now();

        table.acquire("alice", &res(&["db"]), Duration::from_secs(1), t0).unwrap();
        let later = t0 + Duration::from_millis(500);
        table.acquire("alice", &res(&["db"]), Duration::from_secs(5), later).unwrap();

        assert_eq!(table.list(later)[0].expire_in, 5_000);
    }

    #[test]
    fn expired_lease_is_free_for_others() {
        let mut table = LeaseTable::new();
        let t0 = Instant::now();

        table.acquire("crashed", &res(&["db"]), Duration::from_millis(100), t0).unwrap();
        let after = t0 + Duration::from_millis(101);

        assert!(table.acquire("bob", &res(&["db"]), Duration::from_secs(1), after).is_ok());
        assert_eq!(table.list(after)[0].client, "bob");
    }

    #[test]
    fn cannot_release_someone_elses_lease() {
        let mut table = LeaseTable::new();
        let t0 = Instant::now();

        table.acquire("alice", &res(&["db"]), Duration::from_secs(1), t0).unwrap();
        let conflict = table.release("bob", &res(&["db"]), t0).unwrap_err();
        assert_eq!(conflict.client, "alice");

        table.release("alice", &res(&["db", "never-held"]), t0).unwrap();
        assert!(table.list(t0).is_empty());
    }
}
