use crate::{
    vbucket::{State, VBucket, VBucketPtr, Vbid},
    BucketConfig,
};
use std::sync::atomic::{AtomicU16, Ordering};
use tracing::debug;

pub struct VBucketMap {
    vbuckets: Vec<VBucketPtr>,
    vb_state_count: [AtomicU16; 4],
}

impl VBucketMap {
    /// Every vbucket starts out active, this node owns the whole keyspace
    pub fn new(config: &BucketConfig) -> VBucketMap {
        let map = VBucketMap {
            vbuckets: Vec::with_capacity(config.max_vbuckets as usize),
            vb_state_count: [
                AtomicU16::new(0),
                AtomicU16::new(0),
                AtomicU16::new(0),
                AtomicU16::new(0),
            ],
        };
        (0..config.max_vbuckets).fold(map, |mut map, id| {
            map.add_bucket(VBucketPtr::new(VBucket::new(Vbid::new(id), State::Active)));
            map
        })
    }

    fn add_bucket(&mut self, vb: VBucketPtr) {
        assert_eq!(usize::from(vb.id), self.vbuckets.len());
        self.inc_vb_state_count(vb.state());
        self.vbuckets.push(vb);
    }

    pub fn get_bucket(&self, id: Vbid) -> Option<VBucketPtr> {
        self.vbuckets.get(usize::from(id)).cloned()
    }

    /// Move a vbucket to a new state, keeping the per state counts in step
    pub fn set_state(&self, id: Vbid, state: State) -> Option<State> {
        let vb = self.vbuckets.get(usize::from(id))?;
        let _guard = vb.get_state_lock();
        let old = vb.state();
        if old != state {
            vb.set_state_unlocked(state);
            self.dec_vb_state_count(old);
            self.inc_vb_state_count(state);
            debug!(
                "Mapped {} from {:?} to {:?}, {} of {} vbuckets active",
                id,
                old,
                state,
                self.get_vb_state_count(State::Active),
                self.size()
            );
        }
        Some(old)
    }

    fn inc_vb_state_count(&self, state: State) {
        self.vb_state_count[vb_state_to_index(state)].fetch_add(1, Ordering::Relaxed);
    }

    fn dec_vb_state_count(&self, state: State) {
        self.vb_state_count[vb_state_to_index(state)].fetch_sub(1, Ordering::Relaxed);
    }

    pub fn get_vb_state_count(&self, state: State) -> u16 {
        self.vb_state_count[vb_state_to_index(state)].load(Ordering::Relaxed)
    }

    pub fn get_buckets(&self) -> impl Iterator<Item = &VBucketPtr> {
        self.vbuckets.iter()
    }

    pub fn size(&self) -> usize {
        self.vbuckets.len()
    }
}

/// Convert a vbucket state to an index in the vb_state_count array
fn vb_state_to_index(state: State) -> usize {
    match state {
        State::Active => 0,
        State::Replica => 1,
        State::Pending => 2,
        State::Dead => 3,
    }
}
