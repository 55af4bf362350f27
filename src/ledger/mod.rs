//! Forwarded-message ledger
//!
//! Every successful forward appends one immutable [`ForwardedMessage`]. The
//! scheduler later asks for the records of a job that have outlived its
//! delete window ([`Ledger::collect_and_purge_older_than`]), deletes those
//! messages on the platform, and the records are gone from the ledger.
//!
//! ## Retention
//!
//! - Per job: `delete_after_minutes`, applied on demand by the scheduler
//! - Backstop: 7 days for every record, applied by [`spawn_expiry_task`]
//! - Cascade: all of a job's records go when the job is deleted or reset
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relaybox::ledger::Ledger;
//!
//! let ledger = Ledger::new(db.clone());
//! ledger.record(&job_id, 120, 9001)?;
//! let to_delete = ledger.collect_and_purge_older_than(&job_id, 60)?;
//! ```

pub mod pruning;
pub mod store;

pub use pruning::{PruneStats, RETENTION_LEDGER_DAYS, spawn_expiry_task};
pub use store::{ForwardedMessage, Ledger};
