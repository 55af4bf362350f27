use std::sync::Arc;

use crate::config::Config;
use crate::jobs::JobStore;
use crate::ledger::Ledger;
use crate::observability::Metrics;
use crate::stats::Stats;
use crate::store::Database;
use crate::users::{StateStore, UserRegistry};

/// Every store handle, built over one shared [`Database`]
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Database,
    pub jobs: JobStore,
    pub ledger: Ledger,
    pub states: StateStore,
    pub users: UserRegistry,
    pub stats: Stats,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(config: Config, db: Database) -> Self {
        Self {
            config: Arc::new(config),
            jobs: JobStore::new(db.clone()),
            ledger: Ledger::new(db.clone()),
            states: StateStore::new(db.clone()),
            users: UserRegistry::new(db.clone()),
            stats: Stats::new(db.clone()),
            metrics: Arc::new(Metrics::new()),
            db,
        }
    }

    /// Open the store named in `config.store` with the system clock
    pub fn open(config: Config) -> crate::store::Result<Self> {
        let db = Database::open(&config.store.path, &config.store.name)?;
        Ok(Self::new(config, db))
    }
}
