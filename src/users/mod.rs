//! Per-user workflow state and the user registry
//!
//! Both are keyed by the platform user id and are independent of jobs.

pub mod registry;
pub mod state;

pub use registry::{UserRecord, UserRegistry};
pub use state::{StateStore, UserState};
