//! Forwarding job definitions and their store

pub mod models;
pub mod store;
pub mod validation;

pub use models::{FilterKind, Job, JobSpec, JobUpdate};
pub use store::JobStore;
pub use validation::{RequiredFields, ValidationError, validate_spec};
