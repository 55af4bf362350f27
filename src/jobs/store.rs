use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::ledger::Ledger;
use crate::store::database::count_entries;
use crate::store::partitions::{
    decode_index_key, encode_active_key, encode_active_prefix, encode_job_key, encode_owner_key,
    encode_owner_prefix, millis,
};
use crate::store::{Database, JobId, Result};

use super::models::{Job, JobSpec, JobUpdate};
use super::validation::validate_spec;

/// Fjall-backed store of forwarding jobs
///
/// Besides the job documents it maintains two secondary indexes in the
/// `job_index` partition: jobs by owner and jobs by `is_active`. A job and its
/// index entries are always written in one batch.
#[derive(Clone)]
pub struct JobStore {
    db: Database,
    ledger: Ledger,
}

impl JobStore {
    pub fn new(db: Database) -> Self {
        let ledger = Ledger::new(db.clone());
        Self { db, ledger }
    }

    /// Validate and persist a new, inactive job
    pub fn create_job(&self, owner_id: i64, spec: &JobSpec) -> Result<JobId> {
        let fields = validate_spec(spec)?;
        let now = self.db.clock().now();
        let id = JobId::new(now);

        let job = Job {
            id,
            owner_id,
            name: fields.name,
            source_channel_id: fields.source,
            target_channel_id: fields.target,
            start_post_id: fields.start_id,
            end_post_id: fields.end_id,
            batch_size: fields.batch_size,
            recurring_minutes: fields.recurring_time,
            delete_after_minutes: fields.delete_time,
            filter: fields.filter_type,
            caption: spec.caption.clone().unwrap_or_default(),
            button_text: spec.button_text.clone().unwrap_or_default(),
            button_url: spec.button_url.clone().unwrap_or_default(),
            is_active: false,
            last_forwarded_id: 0,
            created_at: now,
            updated_at: now,
        };

        let stamp = millis(job.created_at).to_be_bytes();
        let mut batch = self.db.keyspace().batch();
        batch.insert(self.db.jobs(), encode_job_key(&id), serde_json::to_vec(&job)?);
        batch.insert(self.db.job_index(), encode_owner_key(owner_id, &id), stamp);
        batch.insert(self.db.job_index(), encode_active_key(false, &id), stamp);
        batch.commit()?;

        info!(job_id = %id, owner_id, name = %job.name, "Created job");
        Ok(id)
    }

    /// Jobs of one owner, newest first
    ///
    /// Ties on `created_at` are ordered by descending id.
    pub fn jobs_for_user(&self, owner_id: i64) -> Result<Vec<Job>> {
        let mut jobs = self.load_indexed(&encode_owner_prefix(owner_id))?;
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(jobs)
    }

    /// Every job with `is_active = true`, oldest first
    pub fn active_jobs(&self) -> Result<Vec<Job>> {
        let mut jobs = self.load_indexed(&encode_active_prefix(true))?;
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(jobs)
    }

    /// Look up a job; unknown and malformed ids are both `None`
    pub fn get_job(&self, job_id: &str) -> Result<Option<Job>> {
        match JobId::parse_lenient(job_id) {
            Some(id) => self.load(&id),
            None => Ok(None),
        }
    }

    pub fn set_active(&self, job_id: &str, is_active: bool) -> Result<bool> {
        self.modify(job_id, "set_active", |job| job.is_active = is_active)
    }

    /// Move the progress cursor forward to `message_id`
    ///
    /// The cursor never moves backwards here; use [`JobStore::reset_progress`]
    /// to rewind.
    pub fn advance_progress(&self, job_id: &str, message_id: i64) -> Result<bool> {
        self.modify(job_id, "advance_progress", |job| {
            if message_id < job.last_forwarded_id {
                warn!(
                    job_id = %job.id,
                    current = job.last_forwarded_id,
                    requested = message_id,
                    "Ignoring backwards progress"
                );
                return;
            }
            job.last_forwarded_id = message_id;
        })
    }

    /// Rewind the cursor to just before `start_id` and drop the job's ledger
    ///
    /// The cursor saturates at `i64::MIN`.
    pub fn reset_progress(&self, job_id: &str, start_id: i64) -> Result<bool> {
        let Some(id) = JobId::parse_lenient(job_id) else {
            return Ok(false);
        };

        let found = self.modify_by_id(&id, "reset_progress", |job| {
            job.last_forwarded_id = start_id.saturating_sub(1);
        })?;
        let purged = self.ledger.purge_job(&id)?;

        info!(job_id = %id, start_id, purged, "Reset job progress");
        Ok(found)
    }

    pub fn apply_update(&self, job_id: &str, update: &JobUpdate) -> Result<bool> {
        self.modify(job_id, "apply_update", |job| update.apply_to(job))
    }

    /// Delete a job, then cascade to its ledger records
    ///
    /// The two steps are not atomic. Records left behind by a crash in
    /// between are never read through a job filter again and fall to the
    /// backstop expiry.
    pub fn delete_job(&self, job_id: &str) -> Result<bool> {
        let Some(id) = JobId::parse_lenient(job_id) else {
            return Ok(false);
        };

        let found = {
            let _guard = self.db.lock_jobs();
            match self.load(&id)? {
                Some(job) => {
                    let mut batch = self.db.keyspace().batch();
                    batch.remove(self.db.jobs(), encode_job_key(&id));
                    batch.remove(self.db.job_index(), encode_owner_key(job.owner_id, &id));
                    batch.remove(self.db.job_index(), encode_active_key(job.is_active, &id));
                    batch.commit()?;
                    true
                }
                None => false,
            }
        };

        let purged = self.ledger.purge_job(&id)?;
        info!(job_id = %id, found, purged, "Deleted job");
        Ok(found)
    }

    /// Number of stored jobs
    pub fn count(&self) -> Result<usize> {
        count_entries(self.db.jobs(), None)
    }

    /// Number of jobs created at or after `since`
    pub fn count_created_since(&self, since: DateTime<Utc>) -> Result<usize> {
        let start = encode_job_key(&JobId::min_at(since));
        let mut count = 0;
        for item in self.db.jobs().range(start..) {
            let (_, value) = item?;
            let job: Job = serde_json::from_slice(&value)?;
            if job.created_at >= since {
                count += 1;
            }
        }
        Ok(count)
    }

    fn load(&self, id: &JobId) -> Result<Option<Job>> {
        match self.db.jobs().get(encode_job_key(id))? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// Load every job referenced under an index prefix
    fn load_indexed(&self, prefix: &[u8]) -> Result<Vec<Job>> {
        let mut jobs = Vec::new();
        for item in self.db.job_index().prefix(prefix) {
            let (key, _) = item?;
            let Some(id) = decode_index_key(&key) else {
                warn!(key = %String::from_utf8_lossy(&key), "Skipping undecodable index key");
                continue;
            };
            match self.load(&id)? {
                Some(job) => jobs.push(job),
                None => debug!(job_id = %id, "Index entry without job"),
            }
        }
        Ok(jobs)
    }

    fn modify<F>(&self, job_id: &str, op: &'static str, f: F) -> Result<bool>
    where
        F: FnOnce(&mut Job),
    {
        match JobId::parse_lenient(job_id) {
            Some(id) => self.modify_by_id(&id, op, f),
            None => Ok(false),
        }
    }

    /// Read-modify-write one job document, keeping the active index in step
    fn modify_by_id<F>(&self, id: &JobId, op: &'static str, f: F) -> Result<bool>
    where
        F: FnOnce(&mut Job),
    {
        let _guard = self.db.lock_jobs();
        let Some(mut job) = self.load(id)? else {
            debug!(job_id = %id, op, "Job not found, nothing to update");
            return Ok(false);
        };

        let was_active = job.is_active;
        f(&mut job);
        job.updated_at = self.db.clock().now();

        let mut batch = self.db.keyspace().batch();
        batch.insert(self.db.jobs(), encode_job_key(id), serde_json::to_vec(&job)?);
        if was_active != job.is_active {
            let stamp = millis(job.created_at).to_be_bytes();
            batch.remove(self.db.job_index(), encode_active_key(was_active, id));
            batch.insert(self.db.job_index(), encode_active_key(job.is_active, id), stamp);
        }
        batch.commit()?;

        debug!(job_id = %id, op, "Updated job");
        Ok(true)
    }
}
