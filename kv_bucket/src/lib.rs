use std::time::{SystemTime, UNIX_EPOCH};

pub mod bucket;
pub mod clock;
pub mod hash_table;
pub mod item;
pub mod stored_value;
pub mod vbucket;
pub mod vbucket_map;

pub use bucket::{Bucket, BucketPtr};

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct BucketConfig {
    pub name: String,
    /// Must be a power of two
    pub max_vbuckets: u16,
    pub num_replicas: u8,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            max_vbuckets: 1024,
            num_replicas: 0,
        }
    }
}

/// Seconds since the unix epoch, the resolution documents expire at
pub(crate) fn now_secs() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or_default()
}
