//! Backstop expiry for the forwarded-message ledger
//!
//! Per-job purges only run for jobs with a positive delete window. This pass
//! removes every record older than a fixed retention ceiling regardless of
//! job configuration, which also reclaims records orphaned by an interrupted
//! job delete.
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::observability::Metrics;
use crate::store::Result;
use crate::store::partitions::{EXPIRY_PREFIX, encode_expiry_upper_bound, encode_meta_key};

use super::store::{ForwardedMessage, Ledger};

/// Default retention ceiling for ledger records (days)
pub const RETENTION_LEDGER_DAYS: i64 = 7;

const META_LAST_EXPIRY: &str = "last_expiry";

/// Pruning statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PruneStats {
    pub records_expired: usize,
    /// Index entries whose ledger record was already gone
    pub dangling_index_entries: usize,
}

impl Ledger {
    /// Expire records older than the default 7-day ceiling
    pub fn expire_backstop(&self) -> Result<PruneStats> {
        self.expire_older_than(TimeDelta::days(RETENTION_LEDGER_DAYS))
    }

    /// Expire every record, across all jobs, older than `max_age`
    pub fn expire_older_than(&self, max_age: TimeDelta) -> Result<PruneStats> {
        let db = self.database();
        let now = db.clock().now();
        let cutoff = now.checked_sub_signed(max_age).unwrap_or(DateTime::<Utc>::MIN_UTC);

        let _guard = db.lock_purge();
        let mut stats = PruneStats::default();
        let mut expired = Vec::new();
        let mut dangling = Vec::new();

        let end = encode_expiry_upper_bound(cutoff);
        for item in db.forwarded_by_time().range(EXPIRY_PREFIX.to_vec()..end) {
            let (index_key, ledger_key) = item?;
            match db.forwarded().get(&ledger_key)? {
                Some(value) => {
                    let entry: ForwardedMessage = serde_json::from_slice(&value)?;
                    expired.push(entry);
                }
                None => dangling.push(index_key.to_vec()),
            }
        }

        if !expired.is_empty() {
            self.remove_all(&expired)?;
        }
        if !dangling.is_empty() {
            let mut batch = db.keyspace().batch();
            for key in &dangling {
                batch.remove(db.forwarded_by_time(), key.clone());
            }
            batch.commit()?;
        }

        stats.records_expired = expired.len();
        stats.dangling_index_entries = dangling.len();

        db.metadata()
            .insert(encode_meta_key(META_LAST_EXPIRY), now.to_rfc3339().into_bytes())?;

        info!(
            cutoff = %cutoff,
            expired = stats.records_expired,
            dangling = stats.dangling_index_entries,
            "Ledger expiry pass complete"
        );
        Ok(stats)
    }

    /// When the last expiry pass ran, if ever
    pub fn last_expiry(&self) -> Result<Option<DateTime<Utc>>> {
        let Some(raw) = self.database().metadata().get(encode_meta_key(META_LAST_EXPIRY))? else {
            return Ok(None);
        };
        let parsed = std::str::from_utf8(&raw)
            .ok()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|ts| ts.with_timezone(&Utc));
        Ok(parsed)
    }
}

/// Run the backstop expiry every `interval` until `shutdown` flips to true
pub fn spawn_expiry_task(
    ledger: Ledger,
    max_age: TimeDelta,
    interval: StdDuration,
    metrics: Arc<Metrics>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(?interval, max_age_secs = max_age.num_seconds(), "Ledger expiry task started");
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let ledger = ledger.clone();
                    match tokio::task::spawn_blocking(move || ledger.expire_older_than(max_age)).await {
                        Ok(Ok(stats)) => {
                            metrics.sweep_completed(stats.records_expired);
                            debug!(?stats, "Scheduled expiry finished");
                        }
                        Ok(Err(err)) => {
                            metrics.sweep_failed();
                            warn!(%err, "Scheduled expiry failed");
                        }
                        Err(err) => {
                            metrics.sweep_failed();
                            warn!(%err, "Expiry worker panicked");
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Ledger expiry task stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::store::{Database, JobId};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn create_test_ledger() -> (Ledger, ManualClock, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());
        let db = Database::open_with_clock(temp_dir.path(), "test", Arc::new(clock.clone())).unwrap();
        (Ledger::new(db), clock, temp_dir)
    }

    #[test]
    fn test_backstop_expires_across_jobs() {
        let (ledger, clock, _temp) = create_test_ledger();
        let job_a = JobId::new(clock.now()).to_string();
        let job_b = JobId::new(clock.now()).to_string();

        ledger.record(&job_a, 1, 11).unwrap();
        ledger.record(&job_b, 2, 22).unwrap();
        clock.advance(TimeDelta::days(6));
        ledger.record(&job_a, 3, 33).unwrap();
        clock.advance(TimeDelta::days(1) + TimeDelta::seconds(1));

        let stats = ledger.expire_backstop().unwrap();
        assert_eq!(stats.records_expired, 2);
        assert_eq!(ledger.count().unwrap(), 1);
        assert_eq!(ledger.records_for_job(&job_a).unwrap()[0].forwarded_message_id, 33);
        assert!(ledger.records_for_job(&job_b).unwrap().is_empty());
    }

    #[test]
    fn test_backstop_keeps_young_records() {
        let (ledger, clock, _temp) = create_test_ledger();
        let job = JobId::new(clock.now()).to_string();

        ledger.record(&job, 1, 11).unwrap();
        clock.advance(TimeDelta::days(6));

        assert_eq!(ledger.expire_backstop().unwrap(), PruneStats::default());
        assert_eq!(ledger.count().unwrap(), 1);
    }

    #[test]
    fn test_last_expiry_recorded() {
        let (ledger, clock, _temp) = create_test_ledger();
        assert_eq!(ledger.last_expiry().unwrap(), None);

        ledger.expire_backstop().unwrap();
        assert_eq!(ledger.last_expiry().unwrap(), Some(clock.now()));
    }

    #[tokio::test]
    async fn test_expiry_task_stops_on_shutdown() {
        let (ledger, clock, _temp) = create_test_ledger();
        let job = JobId::new(clock.now()).to_string();
        ledger.record(&job, 1, 11).unwrap();
        clock.advance(TimeDelta::days(8));

        let metrics = Arc::new(Metrics::new());
        let (tx, rx) = watch::channel(false);
        let handle = spawn_expiry_task(
            ledger.clone(),
            TimeDelta::days(RETENTION_LEDGER_DAYS),
            StdDuration::from_millis(10),
            metrics.clone(),
            rx,
        );

        // The first tick fires immediately
        tokio::time::sleep(StdDuration::from_millis(100)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(ledger.count().unwrap(), 0);
        let snapshot = metrics.snapshot();
        assert!(snapshot.sweeps_completed >= 1);
        assert_eq!(snapshot.records_expired, 1);
        assert_eq!(snapshot.sweeps_failed, 0);
    }
}
