use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::sync::atomic::{AtomicU64, Ordering};

use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use tracing::{debug, info};

use crate::clock::{SharedClock, SystemClock};

use super::error::Result;
use super::partitions::{self, encode_meta_key};

const META_NEXT_SEQ: &str = "next_seq";

/// Shared handle to the keyspace and every partition the core uses
///
/// This is the explicit store context: each component receives a clone at
/// construction instead of reaching for a process-wide connection. Clones are
/// cheap and share the same underlying keyspace.
#[derive(Clone)]
pub struct Database {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    keyspace: Keyspace,
    jobs: PartitionHandle,
    job_index: PartitionHandle,
    forwarded: PartitionHandle,
    forwarded_by_time: PartitionHandle,
    user_states: PartitionHandle,
    users: PartitionHandle,
    metadata: PartitionHandle,
    seq_counter: AtomicU64,
    seq_lock: Mutex<()>,
    clock: SharedClock,
    job_lock: Mutex<()>,
    purge_lock: Mutex<()>,
    user_lock: Mutex<()>,
}

impl Database {
    /// Open or create the database `name` under `root`, using the wall clock
    pub fn open<P: AsRef<Path>>(root: P, name: &str) -> Result<Self> {
        Self::open_with_clock(root, name, Arc::new(SystemClock))
    }

    /// Open or create the database with an explicit time source
    pub fn open_with_clock<P: AsRef<Path>>(root: P, name: &str, clock: SharedClock) -> Result<Self> {
        let path = root.as_ref().join(name);
        info!("Opening relaybox store at: {}", path.display());

        std::fs::create_dir_all(&path)?;

        let keyspace = Config::new(&path).open()?;

        let open = |partition: &str| {
            keyspace.open_partition(partition, PartitionCreateOptions::default())
        };
        let jobs = open(partitions::JOBS)?;
        let job_index = open(partitions::JOB_INDEX)?;
        let forwarded = open(partitions::FORWARDED)?;
        let forwarded_by_time = open(partitions::FORWARDED_BY_TIME)?;
        let user_states = open(partitions::USER_STATES)?;
        let users = open(partitions::USERS)?;
        let metadata = open(partitions::METADATA)?;

        // Resume the ledger sequence where the last process stopped
        let current_seq = metadata
            .get(encode_meta_key(META_NEXT_SEQ))?
            .map(|bytes| u64::from_be_bytes(bytes.as_ref().try_into().unwrap_or([0u8; 8])))
            .unwrap_or(0);

        info!(name, current_seq, "relaybox store opened");

        Ok(Self {
            inner: Arc::new(Inner {
                name: name.to_string(),
                keyspace,
                jobs,
                job_index,
                forwarded,
                forwarded_by_time,
                user_states,
                users,
                metadata,
                seq_counter: AtomicU64::new(current_seq),
                seq_lock: Mutex::new(()),
                clock,
                job_lock: Mutex::new(()),
                purge_lock: Mutex::new(()),
                user_lock: Mutex::new(()),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn keyspace(&self) -> &Keyspace {
        &self.inner.keyspace
    }

    pub fn jobs(&self) -> &PartitionHandle {
        &self.inner.jobs
    }

    pub fn job_index(&self) -> &PartitionHandle {
        &self.inner.job_index
    }

    pub fn forwarded(&self) -> &PartitionHandle {
        &self.inner.forwarded
    }

    pub fn forwarded_by_time(&self) -> &PartitionHandle {
        &self.inner.forwarded_by_time
    }

    pub fn user_states(&self) -> &PartitionHandle {
        &self.inner.user_states
    }

    pub fn users(&self) -> &PartitionHandle {
        &self.inner.users
    }

    pub fn metadata(&self) -> &PartitionHandle {
        &self.inner.metadata
    }

    pub fn clock(&self) -> &SharedClock {
        &self.inner.clock
    }

    /// Reserve the next ledger sequence number and persist the counter
    pub fn next_seq(&self) -> Result<u64> {
        // Reserve and persist together so a later write never stores a lower counter
        let _guard = self.inner.seq_lock.lock().unwrap_or_else(|e| e.into_inner());
        let seq = self.inner.seq_counter.fetch_add(1, Ordering::SeqCst);
        self.inner
            .metadata
            .insert(encode_meta_key(META_NEXT_SEQ), (seq + 1).to_be_bytes())?;
        debug!(seq, "Reserved ledger sequence");
        Ok(seq)
    }

    pub fn current_seq(&self) -> u64 {
        self.inner.seq_counter.load(Ordering::SeqCst)
    }

    /// Serializes read-modify-write cycles on job documents
    pub(crate) fn lock_jobs(&self) -> MutexGuard<'_, ()> {
        self.inner.job_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Serializes ledger read-then-delete passes
    pub(crate) fn lock_purge(&self) -> MutexGuard<'_, ()> {
        self.inner.purge_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Serializes check-then-insert on the user registry
    pub(crate) fn lock_users(&self) -> MutexGuard<'_, ()> {
        self.inner.user_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Persist all pending writes to disk
    pub fn persist(&self) -> Result<()> {
        self.inner.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }

    /// Health check - verify the keyspace is readable
    pub fn health_check(&self) -> Result<()> {
        let _ = self.inner.metadata.get(encode_meta_key(META_NEXT_SEQ))?;
        Ok(())
    }
}

/// Count entries of a partition, or of one prefix within it
pub(crate) fn count_entries(partition: &PartitionHandle, prefix: Option<&[u8]>) -> Result<usize> {
    let mut count = 0;
    match prefix {
        Some(prefix) => {
            for item in partition.prefix(prefix) {
                item?;
                count += 1;
            }
        }
        None => {
            for item in partition.iter() {
                item?;
                count += 1;
            }
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_store() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open(temp_dir.path(), "relaybox").unwrap();
        assert_eq!(db.name(), "relaybox");
        assert!(db.health_check().is_ok());
    }

    #[test]
    fn test_sequence_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();

        {
            let db = Database::open(temp_dir.path(), "relaybox").unwrap();
            assert_eq!(db.next_seq().unwrap(), 0);
            assert_eq!(db.next_seq().unwrap(), 1);
            db.persist().unwrap();
        }

        let db = Database::open(temp_dir.path(), "relaybox").unwrap();
        assert_eq!(db.current_seq(), 2);
        assert_eq!(db.next_seq().unwrap(), 2);
    }

    #[test]
    fn test_concurrent_sequence_persists_highest_counter() {
        let temp_dir = TempDir::new().unwrap();

        {
            let db = Database::open(temp_dir.path(), "relaybox").unwrap();
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let db = db.clone();
                    std::thread::spawn(move || {
                        (0..50).map(|_| db.next_seq().unwrap()).collect::<Vec<_>>()
                    })
                })
                .collect();

            let mut seqs: Vec<u64> = handles
                .into_iter()
                .flat_map(|handle| handle.join().unwrap())
                .collect();
            seqs.sort_unstable();
            seqs.dedup();
            assert_eq!(seqs.len(), 400);
            db.persist().unwrap();
        }

        let db = Database::open(temp_dir.path(), "relaybox").unwrap();
        assert_eq!(db.current_seq(), 400);
    }

    #[test]
    fn test_count_entries_with_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open(temp_dir.path(), "relaybox").unwrap();

        db.metadata().insert("a:1", b"").unwrap();
        db.metadata().insert("a:2", b"").unwrap();
        db.metadata().insert("b:1", b"").unwrap();

        assert_eq!(count_entries(db.metadata(), Some(b"a:")).unwrap(), 2);
        assert_eq!(count_entries(db.metadata(), None).unwrap(), 3);
    }
}
