use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;

pub static START_TIME: Lazy<DateTime<Utc>> = Lazy::new(Utc::now);

/// How often staged blob handles are checked for expiry.
pub const BLOB_SWEEP_INTERVAL_SECS: u64 = 60;
