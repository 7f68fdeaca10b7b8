use std::time::Instant;

use kv_common::{Cas, Content};

/// Value that is stored in the hash table
#[derive(Debug, Clone)]
pub struct StoredValue {
    pub value: Content,
    pub cas: Cas,
    pub by_seqno: u64,
    /// Seconds since the unix epoch, 0 for no expiry
    pub expiry_time: u32,
    /// Number of times the document has been mutated
    pub rev_seqno: u64,
    /// Set while a pessimistic lock is held
    pub(crate) locked_until: Option<Instant>,
}

impl StoredValue {
    pub fn is_expired(&self, now_secs: u32) -> bool {
        self.expiry_time != 0 && self.expiry_time <= now_secs
    }

    pub fn is_locked(&self, now: Instant) -> bool {
        matches!(self.locked_until, Some(until) if until > now)
    }

    /// The cas readers are allowed to see. While locked it matches nothing.
    pub fn visible_cas(&self, now: Instant) -> Cas {
        if self.is_locked(now) {
            Cas::LOCKED
        } else {
            self.cas
        }
    }

    pub fn unlock(&mut self) {
        self.locked_until = None;
    }
}
