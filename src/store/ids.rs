//! Job identifier codec
//!
//! Callers only ever see job ids as opaque strings. Internally a job id is a
//! UUIDv7 minted from the creation instant, which keeps keys time-sortable
//! inside a partition.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::{Builder, NoContext, Timestamp, Uuid};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("'{0}' is not a valid job id")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Mint a fresh id stamped with `now`
    pub fn new(now: DateTime<Utc>) -> Self {
        let secs = now.timestamp().max(0) as u64;
        let ts = Timestamp::from_unix(NoContext, secs, now.timestamp_subsec_nanos());
        Self(Uuid::new_v7(ts))
    }

    /// The smallest id that can be minted at `at`; lower bound for time scans
    pub fn min_at(at: DateTime<Utc>) -> Self {
        let millis = at.timestamp_millis().max(0) as u64;
        Self(Builder::from_unix_timestamp_millis(millis, &[0u8; 10]).into_uuid())
    }

    /// Decode an externally supplied id, treating bad input as "no such job"
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        match raw.parse() {
            Ok(id) => Some(id),
            Err(err) => {
                tracing::debug!(raw, %err, "Ignoring malformed job id");
                None
            }
        }
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl FromStr for JobId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::try_parse(s.trim())
            .map(Self)
            .map_err(|_| IdError::Malformed(s.to_string()))
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_round_trip_through_string() {
        let id = JobId::new(Utc::now());
        let parsed: JobId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_malformed_ids_rejected() {
        for raw in ["", "job_123", "65f1c0ffee", "not-a-uuid-at-all-zzzz"] {
            let err = raw.parse::<JobId>().unwrap_err();
            assert_eq!(err, IdError::Malformed(raw.to_string()));
            assert!(JobId::parse_lenient(raw).is_none());
        }
    }

    #[test]
    fn test_ids_sort_by_creation_time() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let earlier = JobId::new(t0);
        let later = JobId::new(t0 + Duration::seconds(1));
        assert!(earlier < later);
        assert_ne!(JobId::new(t0), JobId::new(t0));
    }

    #[test]
    fn test_min_at_bounds_ids_of_same_instant() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        assert!(JobId::min_at(t0) <= JobId::new(t0));
        assert!(JobId::min_at(t0) > JobId::new(t0 - Duration::milliseconds(1)));
    }
}
