use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::database::count_entries;
use crate::store::partitions::encode_user_key;
use crate::store::{Database, Result};

/// Presence marker for a user who has interacted at least once
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: i64,
    pub first_interaction_at: DateTime<Utc>,
}

/// Registry of every user ever seen
#[derive(Clone)]
pub struct UserRegistry {
    db: Database,
}

impl UserRegistry {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Record the user's first interaction; later calls change nothing
    ///
    /// Returns `true` when this call inserted the record.
    pub fn register_if_absent(&self, user_id: i64) -> Result<bool> {
        let key = encode_user_key(user_id);
        let _guard = self.db.lock_users();
        if self.db.users().contains_key(&key)? {
            return Ok(false);
        }

        let record = UserRecord {
            user_id,
            first_interaction_at: self.db.clock().now(),
        };
        self.db.users().insert(key, serde_json::to_vec(&record)?)?;
        info!(user_id, "Registered new user");
        Ok(true)
    }

    pub fn get(&self, user_id: i64) -> Result<Option<UserRecord>> {
        match self.db.users().get(encode_user_key(user_id))? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// Number of distinct registered users
    pub fn count(&self) -> Result<usize> {
        count_entries(self.db.users(), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn create_test_registry() -> (UserRegistry, ManualClock, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());
        let db = Database::open_with_clock(temp_dir.path(), "test", Arc::new(clock.clone())).unwrap();
        (UserRegistry::new(db), clock, temp_dir)
    }

    #[test]
    fn test_register_is_idempotent() {
        let (registry, clock, _temp) = create_test_registry();
        let first_seen = clock.now();

        assert!(registry.register_if_absent(77).unwrap());
        clock.advance(Duration::hours(5));
        assert!(!registry.register_if_absent(77).unwrap());

        let record = registry.get(77).unwrap().unwrap();
        assert_eq!(record.first_interaction_at, first_seen);
        assert_eq!(registry.count().unwrap(), 1);
    }

    #[test]
    fn test_count_distinct_users() {
        let (registry, _clock, _temp) = create_test_registry();
        for user_id in [1, 2, 3, 2, 1] {
            registry.register_if_absent(user_id).unwrap();
        }
        assert_eq!(registry.count().unwrap(), 3);
        assert!(registry.get(4).unwrap().is_none());
    }

    #[test]
    fn test_concurrent_registration_inserts_once() {
        let (registry, _clock, _temp) = create_test_registry();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.register_if_absent(500).unwrap())
            })
            .collect();
        let inserted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|inserted| *inserted)
            .count();

        assert_eq!(inserted, 1);
    }
}
