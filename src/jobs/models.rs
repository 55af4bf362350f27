//! Forwarding job documents and their creation / update payloads.
//!
//! A [`Job`] copies posts `start_post_id..=end_post_id` from a source channel
//! to a target channel, `batch_size` posts every `recurring_minutes`, and may
//! delete what it forwarded after `delete_after_minutes`.
//!
//! The bot layer collects job fields step by step into the user's workflow
//! state, so [`JobSpec`] deserializes from the same flat key names:
//!
//! ```json
//! {
//!   "name": "nightly mirror",
//!   "source": -1001111111111,
//!   "target": -1002222222222,
//!   "start_id": 100,
//!   "end_id": 250,
//!   "batch_size": 10,
//!   "recurring_time": 60,
//!   "delete_time": 1440,
//!   "filter_type": "media",
//!   "caption": "via @mirror"
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::JobId;
use crate::users::UserState;

/// Which posts of the source range a job forwards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    #[default]
    All,
    Text,
    Media,
    Photo,
    Video,
    Document,
    Audio,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub owner_id: i64,
    pub name: String,
    pub source_channel_id: i64,
    pub target_channel_id: i64,
    pub start_post_id: i64,
    pub end_post_id: i64,
    pub batch_size: u32,
    pub recurring_minutes: u32,
    /// Minutes after which forwarded copies are deleted; `<= 0` disables
    pub delete_after_minutes: i64,
    pub filter: FilterKind,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub button_text: String,
    #[serde(default)]
    pub button_url: String,
    pub is_active: bool,
    /// Progress cursor: the last source post id forwarded
    pub last_forwarded_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Whether the cursor has passed the end of the range
    pub fn is_finished(&self) -> bool {
        self.last_forwarded_id >= self.end_post_id
    }

    pub fn has_button(&self) -> bool {
        !self.button_text.is_empty() && !self.button_url.is_empty()
    }
}

/// Job creation input; required fields are optional here so that missing
/// ones can be reported instead of failing deserialization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub name: Option<String>,
    pub source: Option<i64>,
    pub target: Option<i64>,
    pub start_id: Option<i64>,
    pub end_id: Option<i64>,
    pub batch_size: Option<u32>,
    pub recurring_time: Option<u32>,
    pub delete_time: Option<i64>,
    pub filter_type: Option<FilterKind>,
    pub caption: Option<String>,
    pub button_text: Option<String>,
    pub button_url: Option<String>,
}

impl JobSpec {
    /// Build a `JobSpec` from the fields gathered in a user's workflow state
    ///
    /// Unknown keys are ignored; absent keys stay `None` and
    /// are caught by validation.
    pub fn from_state(state: &UserState) -> serde_json::Result<Self> {
        serde_json::from_value(serde_json::Value::Object(state.clone()))
    }
}

/// Partial job edit. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobUpdate {
    pub name: Option<String>,
    pub source_channel_id: Option<i64>,
    pub target_channel_id: Option<i64>,
    pub start_post_id: Option<i64>,
    pub end_post_id: Option<i64>,
    pub batch_size: Option<u32>,
    pub recurring_minutes: Option<u32>,
    pub delete_after_minutes: Option<i64>,
    pub filter: Option<FilterKind>,
    pub caption: Option<String>,
    pub button_text: Option<String>,
    pub button_url: Option<String>,
}

impl JobUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Copy every present field onto `job`
    pub fn apply_to(&self, job: &mut Job) {
        if let Some(name) = &self.name {
            job.name = name.clone();
        }
        if let Some(source) = self.source_channel_id {
            job.source_channel_id = source;
        }
        if let Some(target) = self.target_channel_id {
            job.target_channel_id = target;
        }
        if let Some(start) = self.start_post_id {
            job.start_post_id = start;
        }
        if let Some(end) = self.end_post_id {
            job.end_post_id = end;
        }
        if let Some(batch_size) = self.batch_size {
            job.batch_size = batch_size;
        }
        if let Some(recurring) = self.recurring_minutes {
            job.recurring_minutes = recurring;
        }
        if let Some(delete_after) = self.delete_after_minutes {
            job.delete_after_minutes = delete_after;
        }
        if let Some(filter) = self.filter {
            job.filter = filter;
        }
        if let Some(caption) = &self.caption {
            job.caption = caption.clone();
        }
        if let Some(button_text) = &self.button_text {
            job.button_text = button_text.clone();
        }
        if let Some(button_url) = &self.button_url {
            job.button_url = button_url.clone();
        }
    }
}
