//! Fjall-based persistence context shared by every relaybox component
//!
//! One embedded LSM keyspace holds all collections as partitions:
//!
//! - jobs and their owner / active-flag index
//! - the forwarded-message ledger and its expiry-by-time index
//! - per-user workflow state
//! - the user registry
//! - metadata (ledger sequence counter, last expiry pass)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relaybox::store::Database;
//! use relaybox::jobs::JobStore;
//!
//! let db = Database::open("data", "relaybox")?;
//! let jobs = JobStore::new(db.clone());
//! ```

pub mod database;
pub mod error;
pub mod ids;
pub mod partitions;

pub use database::Database;
pub use error::{Result, StoreError};
pub use ids::{IdError, JobId};
