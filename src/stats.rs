//! Usage counters computed from the stores on demand

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::jobs::JobStore;
use crate::ledger::Ledger;
use crate::store::{Database, Result};
use crate::users::UserRegistry;

/// Read-only aggregate over users, jobs and the ledger
///
/// Nothing is cached; every snapshot scans the partitions. `total_forwarded`
/// counts records currently retained, so it drops after purges and expiry.
#[derive(Clone)]
pub struct Stats {
    db: Database,
    jobs: JobStore,
    ledger: Ledger,
    users: UserRegistry,
}

impl Stats {
    pub fn new(db: Database) -> Self {
        Self {
            jobs: JobStore::new(db.clone()),
            ledger: Ledger::new(db.clone()),
            users: UserRegistry::new(db.clone()),
            db,
        }
    }

    pub fn total_users(&self) -> Result<usize> {
        self.users.count()
    }

    pub fn total_jobs(&self) -> Result<usize> {
        self.jobs.count()
    }

    pub fn total_forwarded(&self) -> Result<usize> {
        self.ledger.count()
    }

    /// Jobs created since 00:00 UTC today
    pub fn jobs_today(&self) -> Result<usize> {
        self.jobs.count_created_since(self.db.clock().start_of_day())
    }

    /// Ledger records created since 00:00 UTC today
    pub fn forwarded_today(&self) -> Result<usize> {
        self.ledger.count_since(self.db.clock().start_of_day())
    }

    pub fn snapshot(&self) -> Result<UsageStats> {
        let snapshot = UsageStats {
            total_users: self.total_users()?,
            total_jobs: self.total_jobs()?,
            total_forwarded: self.total_forwarded()?,
            jobs_today: self.jobs_today()?,
            forwarded_today: self.forwarded_today()?,
        };
        debug!(?snapshot, "Computed usage stats");
        Ok(snapshot)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    pub total_users: usize,
    pub total_jobs: usize,
    pub total_forwarded: usize,
    pub jobs_today: usize,
    pub forwarded_today: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::jobs::{FilterKind, JobSpec};
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn spec() -> JobSpec {
        JobSpec {
            name: Some("mirror".to_string()),
            source: Some(1),
            target: Some(2),
            start_id: Some(1),
            end_id: Some(10),
            batch_size: Some(1),
            recurring_time: Some(5),
            delete_time: Some(0),
            filter_type: Some(FilterKind::All),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_store_is_all_zero() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open(temp_dir.path(), "test").unwrap();
        assert_eq!(Stats::new(db).snapshot().unwrap(), UsageStats::default());
    }

    #[test]
    fn test_snapshot_splits_today_from_total() {
        let temp_dir = TempDir::new().unwrap();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 22, 0, 0).unwrap());
        let db = Database::open_with_clock(temp_dir.path(), "test", Arc::new(clock.clone())).unwrap();

        let jobs = JobStore::new(db.clone());
        let ledger = Ledger::new(db.clone());
        let users = UserRegistry::new(db.clone());
        let stats = Stats::new(db);

        users.register_if_absent(1).unwrap();
        let old = jobs.create_job(1, &spec()).unwrap().to_string();
        ledger.record(&old, 1, 101).unwrap();
        ledger.record(&old, 2, 102).unwrap();

        // past midnight UTC
        clock.advance(Duration::hours(3));
        users.register_if_absent(2).unwrap();
        users.register_if_absent(1).unwrap();
        let new = jobs.create_job(2, &spec()).unwrap().to_string();
        ledger.record(&new, 1, 201).unwrap();

        let snapshot = stats.snapshot().unwrap();
        assert_eq!(
            snapshot,
            UsageStats {
                total_users: 2,
                total_jobs: 2,
                total_forwarded: 3,
                jobs_today: 1,
                forwarded_today: 1,
            }
        );
    }

    #[test]
    fn test_total_forwarded_counts_retained_records() {
        let temp_dir = TempDir::new().unwrap();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());
        let db = Database::open_with_clock(temp_dir.path(), "test", Arc::new(clock.clone())).unwrap();
        let jobs = JobStore::new(db.clone());
        let ledger = Ledger::new(db.clone());
        let stats = Stats::new(db);

        let id = jobs.create_job(1, &spec()).unwrap().to_string();
        ledger.record(&id, 1, 101).unwrap();
        ledger.record(&id, 2, 102).unwrap();
        assert_eq!(stats.total_forwarded().unwrap(), 2);

        clock.advance(Duration::minutes(10));
        ledger.collect_and_purge_older_than(&id, 5).unwrap();
        assert_eq!(stats.total_forwarded().unwrap(), 0);
    }
}
