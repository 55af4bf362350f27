/// Key layout and encoding utilities for Fjall partitions
///
/// Partition structure:
/// - `jobs`: job:{job_id} -> Job (JSON)
/// - `job_index`: owner:{owner_id}:{job_id} -> () and active:{0|1}:{job_id} -> ()
/// - `forwarded`: fwd:{job_id}:{millis:020}:{seq:020} -> ForwardedMessage (JSON)
/// - `forwarded_by_time`: exp:{millis:020}:{job_id}:{seq:020} -> fwd key
/// - `user_states`: state:{user_id} -> StoredState (JSON)
/// - `users`: user:{user_id} -> UserRecord (JSON)
/// - `metadata`: meta:{key} -> value
///
/// Timestamps inside keys are zero-padded unix milliseconds so that byte
/// order equals time order.
use chrono::{DateTime, Utc};

use super::ids::JobId;

pub const JOBS: &str = "jobs";
pub const JOB_INDEX: &str = "job_index";
pub const FORWARDED: &str = "forwarded";
pub const FORWARDED_BY_TIME: &str = "forwarded_by_time";
pub const USER_STATES: &str = "user_states";
pub const USERS: &str = "users";
pub const METADATA: &str = "metadata";

/// Unix milliseconds, clamped at the epoch
pub fn millis(ts: DateTime<Utc>) -> u64 {
    ts.timestamp_millis().max(0) as u64
}

/// Encode a job key: job:{job_id}
pub fn encode_job_key(job_id: &JobId) -> Vec<u8> {
    format!("job:{}", job_id).into_bytes()
}

/// Decode a job key: job:{job_id} -> job_id
pub fn decode_job_key(key: &[u8]) -> Option<JobId> {
    let key_str = std::str::from_utf8(key).ok()?;
    key_str.strip_prefix("job:")?.parse().ok()
}

/// Encode an owner index key: owner:{owner_id}:{job_id}
pub fn encode_owner_key(owner_id: i64, job_id: &JobId) -> Vec<u8> {
    format!("owner:{}:{}", owner_id, job_id).into_bytes()
}

/// Encode an owner prefix for range scan: owner:{owner_id}:
pub fn encode_owner_prefix(owner_id: i64) -> Vec<u8> {
    format!("owner:{}:", owner_id).into_bytes()
}

/// Encode an active-flag index key: active:{0|1}:{job_id}
pub fn encode_active_key(is_active: bool, job_id: &JobId) -> Vec<u8> {
    format!("active:{}:{}", u8::from(is_active), job_id).into_bytes()
}

/// Encode an active-flag prefix for range scan: active:{0|1}:
pub fn encode_active_prefix(is_active: bool) -> Vec<u8> {
    format!("active:{}:", u8::from(is_active)).into_bytes()
}

/// Decode the trailing job id of any `job_index` key
pub fn decode_index_key(key: &[u8]) -> Option<JobId> {
    let key_str = std::str::from_utf8(key).ok()?;
    let (_, job_id) = key_str.rsplit_once(':')?;
    job_id.parse().ok()
}

/// Encode a ledger key: fwd:{job_id}:{millis:020}:{seq:020}
pub fn encode_forwarded_key(job_id: &JobId, at: DateTime<Utc>, seq: u64) -> Vec<u8> {
    format!("fwd:{}:{:020}:{:020}", job_id, millis(at), seq).into_bytes()
}

/// Encode a ledger prefix for range scan: fwd:{job_id}:
pub fn encode_forwarded_prefix(job_id: &JobId) -> Vec<u8> {
    format!("fwd:{}:", job_id).into_bytes()
}

/// Exclusive upper bound covering every record of `job_id` stamped at or
/// before `at` (millisecond resolution)
pub fn encode_forwarded_upper_bound(job_id: &JobId, at: DateTime<Utc>) -> Vec<u8> {
    format!("fwd:{}:{:020}", job_id, millis(at) + 1).into_bytes()
}

/// Encode an expiry index key: exp:{millis:020}:{job_id}:{seq:020}
pub fn encode_expiry_key(at: DateTime<Utc>, job_id: &JobId, seq: u64) -> Vec<u8> {
    format!("exp:{:020}:{}:{:020}", millis(at), job_id, seq).into_bytes()
}

/// Exclusive upper bound of expiry keys strictly older than `at`
pub fn encode_expiry_upper_bound(at: DateTime<Utc>) -> Vec<u8> {
    format!("exp:{:020}", millis(at)).into_bytes()
}

/// Lower bound of expiry keys stamped at or after `at`
pub fn encode_expiry_lower_bound(at: DateTime<Utc>) -> Vec<u8> {
    encode_expiry_upper_bound(at)
}

pub const EXPIRY_PREFIX: &[u8] = b"exp:";

/// Encode a user-state key: state:{user_id}
pub fn encode_state_key(user_id: i64) -> Vec<u8> {
    format!("state:{}", user_id).into_bytes()
}

/// Encode a user registry key: user:{user_id}
pub fn encode_user_key(user_id: i64) -> Vec<u8> {
    format!("user:{}", user_id).into_bytes()
}

/// Encode a metadata key: meta:{key}
pub fn encode_meta_key(key: &str) -> Vec<u8> {
    format!("meta:{}", key).into_bytes()
}
