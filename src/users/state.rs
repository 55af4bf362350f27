use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::store::partitions::encode_state_key;
use crate::store::{Database, Result};

/// Opaque workflow state of one user; the caller owns its schema
pub type UserState = Map<String, Value>;

/// On-disk form: the state is kept as an encoded blob, never interpreted
#[derive(Debug, Serialize, Deserialize)]
struct StoredState {
    user_id: i64,
    state_data: String,
    updated_at: DateTime<Utc>,
}

/// Last-write-wins store of user workflow state
#[derive(Clone)]
pub struct StateStore {
    db: Database,
}

impl StateStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Replace the user's state
    pub fn save(&self, user_id: i64, state: &UserState) -> Result<()> {
        let stored = StoredState {
            user_id,
            state_data: serde_json::to_string(state)?,
            updated_at: self.db.clock().now(),
        };
        self.db
            .user_states()
            .insert(encode_state_key(user_id), serde_json::to_vec(&stored)?)?;
        debug!(user_id, keys = state.len(), "Saved user state");
        Ok(())
    }

    pub fn load(&self, user_id: i64) -> Result<Option<UserState>> {
        match self.db.user_states().get(encode_state_key(user_id))? {
            Some(value) => {
                let stored: StoredState = serde_json::from_slice(&value)?;
                Ok(Some(serde_json::from_str(&stored.state_data)?))
            }
            None => Ok(None),
        }
    }

    /// When the user's state was last written
    pub fn updated_at(&self, user_id: i64) -> Result<Option<DateTime<Utc>>> {
        match self.db.user_states().get(encode_state_key(user_id))? {
            Some(value) => {
                let stored: StoredState = serde_json::from_slice(&value)?;
                Ok(Some(stored.updated_at))
            }
            None => Ok(None),
        }
    }

    pub fn clear(&self, user_id: i64) -> Result<()> {
        self.db.user_states().remove(encode_state_key(user_id))?;
        debug!(user_id, "Cleared user state");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use chrono::{Duration, TimeZone};
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn create_test_store() -> (StateStore, ManualClock, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());
        let db = Database::open_with_clock(temp_dir.path(), "test", Arc::new(clock.clone())).unwrap();
        (StateStore::new(db), clock, temp_dir)
    }

    fn state(value: Value) -> UserState {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_last_write_wins() {
        let (store, _clock, _temp) = create_test_store();

        store.save(5, &state(json!({ "step": 1, "name": "draft" }))).unwrap();
        store.save(5, &state(json!({ "step": 2 }))).unwrap();

        // no merge with the previous document
        assert_eq!(store.load(5).unwrap(), Some(state(json!({ "step": 2 }))));
    }

    #[test]
    fn test_nested_payload_stored_verbatim() {
        let (store, _clock, _temp) = create_test_store();
        let payload = state(json!({
            "step": "await_source",
            "draft": { "batch_size": 10, "ids": [1, 2, 3], "caption": null }
        }));

        store.save(9, &payload).unwrap();
        assert_eq!(store.load(9).unwrap(), Some(payload));
    }

    #[test]
    fn test_clear_and_missing() {
        let (store, _clock, _temp) = create_test_store();
        assert_eq!(store.load(1).unwrap(), None);

        store.clear(1).unwrap();
        store.save(1, &state(json!({ "step": 1 }))).unwrap();
        store.clear(1).unwrap();
        assert_eq!(store.load(1).unwrap(), None);
        assert_eq!(store.updated_at(1).unwrap(), None);
    }

    #[test]
    fn test_updated_at_tracks_last_save() {
        let (store, clock, _temp) = create_test_store();
        store.save(3, &UserState::new()).unwrap();
        clock.advance(Duration::minutes(4));
        store.save(3, &UserState::new()).unwrap();

        assert_eq!(store.updated_at(3).unwrap(), Some(clock.now()));
    }

    #[test]
    fn test_users_are_isolated() {
        let (store, _clock, _temp) = create_test_store();
        store.save(1, &state(json!({ "step": 1 }))).unwrap();
        store.save(2, &state(json!({ "step": 7 }))).unwrap();
        store.clear(1).unwrap();

        assert_eq!(store.load(2).unwrap(), Some(state(json!({ "step": 7 }))));
    }
}
