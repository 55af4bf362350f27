use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::store::database::count_entries;
use crate::store::partitions::{
    encode_expiry_key, encode_expiry_lower_bound, encode_forwarded_key, encode_forwarded_prefix,
    encode_forwarded_upper_bound,
};
use crate::store::{Database, JobId, Result};

/// One message a job forwarded and may later delete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardedMessage {
    pub seq: u64,
    pub job_id: JobId,
    pub original_message_id: i64,
    pub forwarded_message_id: i64,
    pub forwarded_at: DateTime<Utc>,
}

impl ForwardedMessage {
    pub(crate) fn ledger_key(&self) -> Vec<u8> {
        encode_forwarded_key(&self.job_id, self.forwarded_at, self.seq)
    }

    pub(crate) fn expiry_key(&self) -> Vec<u8> {
        encode_expiry_key(self.forwarded_at, &self.job_id, self.seq)
    }
}

/// Append-only log of forwarded messages, keyed by job and time
#[derive(Clone)]
pub struct Ledger {
    db: Database,
}

impl Ledger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub(crate) fn database(&self) -> &Database {
        &self.db
    }

    /// Append a record for a forward that just happened
    ///
    /// The job is not looked up: records for a job deleted in the meantime
    /// are left for the backstop expiry.
    pub fn record(&self, job_id: &str, original_id: i64, forwarded_id: i64) -> Result<u64> {
        let job_id: JobId = job_id.parse()?;
        self.record_for(&job_id, original_id, forwarded_id)
    }

    pub fn record_for(&self, job_id: &JobId, original_id: i64, forwarded_id: i64) -> Result<u64> {
        let entry = ForwardedMessage {
            seq: self.db.next_seq()?,
            job_id: *job_id,
            original_message_id: original_id,
            forwarded_message_id: forwarded_id,
            forwarded_at: self.db.clock().now(),
        };

        let ledger_key = entry.ledger_key();
        let mut batch = self.db.keyspace().batch();
        batch.insert(self.db.forwarded(), ledger_key.clone(), serde_json::to_vec(&entry)?);
        batch.insert(self.db.forwarded_by_time(), entry.expiry_key(), ledger_key);
        batch.commit()?;

        debug!(
            seq = entry.seq,
            job_id = %job_id,
            original_id,
            forwarded_id,
            "Recorded forwarded message"
        );
        Ok(entry.seq)
    }

    /// Return and delete the forwarded ids of every record of `job_id` older
    /// than `age_minutes`
    ///
    /// `age_minutes <= 0` disables deletion by age: nothing is returned or
    /// removed. Ids come back oldest first. The read and the delete run under
    /// one purge lock, so concurrent calls never hand out the same id twice.
    pub fn collect_and_purge_older_than(&self, job_id: &str, age_minutes: i64) -> Result<Vec<i64>> {
        if age_minutes <= 0 {
            return Ok(Vec::new());
        }
        let Some(job_id) = JobId::parse_lenient(job_id) else {
            return Ok(Vec::new());
        };

        let now = self.db.clock().now();
        let Some(cutoff) = TimeDelta::try_minutes(age_minutes)
            .and_then(|age| now.checked_sub_signed(age))
        else {
            return Ok(Vec::new());
        };

        let _guard = self.db.lock_purge();
        let expired = self.scan_job(&job_id, Some(cutoff))?;
        if expired.is_empty() {
            return Ok(Vec::new());
        }

        self.remove_all(&expired)?;

        let ids: Vec<i64> = expired.iter().map(|e| e.forwarded_message_id).collect();
        info!(job_id = %job_id, age_minutes, purged = ids.len(), "Collected expired forwards");
        Ok(ids)
    }

    /// Delete every record of a job (cascade for job delete and reset)
    pub fn purge_job(&self, job_id: &JobId) -> Result<usize> {
        let _guard = self.db.lock_purge();
        let entries = self.scan_job(job_id, None)?;
        if entries.is_empty() {
            return Ok(0);
        }

        self.remove_all(&entries)?;
        debug!(job_id = %job_id, purged = entries.len(), "Purged job ledger");
        Ok(entries.len())
    }

    /// All retained records of a job, oldest first
    pub fn records_for_job(&self, job_id: &str) -> Result<Vec<ForwardedMessage>> {
        match JobId::parse_lenient(job_id) {
            Some(job_id) => self.scan_job(&job_id, None),
            None => Ok(Vec::new()),
        }
    }

    /// Number of records currently retained
    pub fn count(&self) -> Result<usize> {
        count_entries(self.db.forwarded(), None)
    }

    /// Number of retained records forwarded at or after `since`
    pub fn count_since(&self, since: DateTime<Utc>) -> Result<usize> {
        let mut count = 0;
        for item in self.db.forwarded_by_time().range(encode_expiry_lower_bound(since)..) {
            item?;
            count += 1;
        }
        Ok(count)
    }

    /// Records of `job_id`, restricted to those strictly before `cutoff` when given
    fn scan_job(&self, job_id: &JobId, cutoff: Option<DateTime<Utc>>) -> Result<Vec<ForwardedMessage>> {
        let start = encode_forwarded_prefix(job_id);
        let mut entries = Vec::new();

        let mut collect = |value: &[u8]| -> Result<()> {
            let entry: ForwardedMessage = serde_json::from_slice(value)?;
            if cutoff.is_none_or(|cutoff| entry.forwarded_at < cutoff) {
                entries.push(entry);
            }
            Ok(())
        };

        match cutoff {
            Some(cutoff) => {
                let end = encode_forwarded_upper_bound(job_id, cutoff);
                for item in self.db.forwarded().range(start..end) {
                    let (_, value) = item?;
                    collect(&value)?;
                }
            }
            None => {
                for item in self.db.forwarded().prefix(start) {
                    let (_, value) = item?;
                    collect(&value)?;
                }
            }
        }

        Ok(entries)
    }

    /// Remove records and their expiry index entries in one batch
    pub(crate) fn remove_all(&self, entries: &[ForwardedMessage]) -> Result<()> {
        let mut batch = self.db.keyspace().batch();
        for entry in entries {
            batch.remove(self.db.forwarded(), entry.ledger_key());
            batch.remove(self.db.forwarded_by_time(), entry.expiry_key());
        }
        batch.commit()?;
        Ok(())
    }
}
