pub mod clock;
pub mod config;
pub mod humanize;
pub mod jobs;
pub mod ledger;
pub mod observability;
pub mod server;
pub mod state;
pub mod stats;
pub mod store;
pub mod users;
