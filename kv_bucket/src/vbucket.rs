use crate::{
    clock::HlcClock, hash_table::HashTable, item::Item, now_secs, stored_value::StoredValue,
};
use crossbeam_utils::atomic::AtomicCell;
use kv_common::{Cas, Status};
use parking_lot::{Mutex, MutexGuard};
use std::{
    fmt::{self, Display},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};
use tracing::debug;

/// Lock time used when the caller asks for none
pub const DEFAULT_LOCK_TIME: Duration = Duration::from_secs(15);
/// Locks are never held longer than this
pub const MAX_LOCK_TIME: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub struct VBucket {
    pub id: Vbid,
    pub hash_table: Mutex<HashTable>,
    uuid: u64,
    high_seqno: AtomicU64,
    hlc: HlcClock,
    state: AtomicCell<State>,
    state_lock: Mutex<()>,
}

/// How a set treats an existing document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetMode {
    /// Only create, fail if present
    Add,
    /// Create or overwrite
    Set,
    /// Only overwrite, fail if absent
    Replace,
}

#[derive(Debug, Clone, Copy)]
pub struct SetOptions {
    pub mode: SetMode,
    /// Empty for an unconditional mutation
    pub cas: Cas,
    pub preserve_expiry: bool,
}

/// Cas and seqno assigned to an accepted mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mutation {
    pub cas: Cas,
    pub seqno: u64,
}

impl VBucket {
    pub fn new(id: Vbid, state: State) -> Self {
        Self {
            id,
            hash_table: Mutex::new(Default::default()),
            uuid: rand::random(),
            high_seqno: AtomicU64::new(0),
            hlc: HlcClock::new(),
            state: AtomicCell::new(state),
            state_lock: Mutex::new(()),
        }
    }

    pub fn uuid(&self) -> u64 {
        self.uuid
    }

    pub fn state(&self) -> State {
        self.state.load()
    }

    pub fn get_state_lock(&self) -> MutexGuard<'_, ()> {
        self.state_lock.lock()
    }

    pub fn set_state(&self, state: State) {
        let _guard = self.get_state_lock();
        self.set_state_unlocked(state);
    }

    pub(crate) fn set_state_unlocked(&self, state: State) {
        debug!("vb:{} state {:?} -> {:?}", self.id, self.state(), state);
        self.state.store(state);
    }

    fn check_active(&self) -> Result<(), Status> {
        if self.state() == State::Active {
            Ok(())
        } else {
            Err(Status::NotMyVBucket)
        }
    }

    /// Only called with the hash table lock held, so seqnos follow mutation order
    fn next_seqno(&self) -> u64 {
        self.high_seqno.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn get(&self, key: &str) -> Result<StoredValue, Status> {
        self.check_active()?;
        let now = Instant::now();
        let mut hash_table = self.hash_table.lock();
        let value = hash_table
            .find(key, now_secs())
            .ok_or(Status::KeyNotFound)?;
        let mut value = value.clone();
        value.cas = value.visible_cas(now);
        Ok(value)
    }

    pub fn set(&self, item: Item, options: SetOptions) -> Result<Mutation, Status> {
        self.check_active()?;
        let now = Instant::now();
        let mut hash_table = self.hash_table.lock();
        match hash_table.find(&item.key, now_secs()) {
            Some(existing) => {
                if options.mode == SetMode::Add {
                    return Err(Status::KeyExists);
                }
                check_lock_and_cas(existing, options.cas, now)?;
                let mutation = Mutation {
                    cas: self.hlc.next_cas(),
                    seqno: self.next_seqno(),
                };
                existing.value = item.value;
                existing.cas = mutation.cas;
                existing.by_seqno = mutation.seqno;
                existing.rev_seqno += 1;
                if !options.preserve_expiry {
                    existing.expiry_time = item.expiry_time;
                }
                existing.unlock();
                Ok(mutation)
            }
            None => {
                if options.mode == SetMode::Replace || !options.cas.is_empty() {
                    return Err(Status::KeyNotFound);
                }
                let mutation = Mutation {
                    cas: self.hlc.next_cas(),
                    seqno: self.next_seqno(),
                };
                hash_table.add_new_stored_value(item, mutation.cas, mutation.seqno);
                Ok(mutation)
            }
        }
    }

    pub fn delete(&self, key: &str, cas: Cas) -> Result<Mutation, Status> {
        self.check_active()?;
        let now = Instant::now();
        let mut hash_table = self.hash_table.lock();
        let existing = hash_table
            .find(key, now_secs())
            .ok_or(Status::KeyNotFound)?;
        check_lock_and_cas(existing, cas, now)?;
        hash_table.remove(key);
        Ok(Mutation {
            cas: self.hlc.next_cas(),
            seqno: self.next_seqno(),
        })
    }

    /// Set a new expiry, returning the updated value
    pub fn touch(&self, key: &str, expiry_time: u32) -> Result<(StoredValue, Mutation), Status> {
        self.check_active()?;
        let now = Instant::now();
        let mut hash_table = self.hash_table.lock();
        let existing = hash_table
            .find(key, now_secs())
            .ok_or(Status::KeyNotFound)?;
        if existing.is_locked(now) {
            return Err(Status::Locked);
        }
        let mutation = Mutation {
            cas: self.hlc.next_cas(),
            seqno: self.next_seqno(),
        };
        existing.expiry_time = expiry_time;
        existing.cas = mutation.cas;
        existing.by_seqno = mutation.seqno;
        existing.rev_seqno += 1;
        Ok((existing.clone(), mutation))
    }

    /// Lock the value, handing out a fresh cas that is the only key to it
    pub fn get_locked(&self, key: &str, lock_time: Duration) -> Result<StoredValue, Status> {
        self.check_active()?;
        let now = Instant::now();
        let mut hash_table = self.hash_table.lock();
        let existing = hash_table
            .find(key, now_secs())
            .ok_or(Status::KeyNotFound)?;
        if existing.is_locked(now) {
            return Err(Status::Locked);
        }
        let lock_time = if lock_time.is_zero() {
            DEFAULT_LOCK_TIME
        } else {
            lock_time.min(MAX_LOCK_TIME)
        };
        existing.cas = self.hlc.next_cas();
        existing.locked_until = Some(now + lock_time);
        Ok(existing.clone())
    }

    pub fn unlock(&self, key: &str, cas: Cas) -> Result<(), Status> {
        self.check_active()?;
        let now = Instant::now();
        let mut hash_table = self.hash_table.lock();
        let existing = hash_table
            .find(key, now_secs())
            .ok_or(Status::KeyNotFound)?;
        if !existing.is_locked(now) {
            return Err(Status::NotLocked);
        }
        if existing.cas != cas {
            return Err(Status::KeyExists);
        }
        existing.unlock();
        Ok(())
    }

    /// Snapshot of the live values whose key passes `filter`
    pub fn collect<F>(&self, filter: F) -> Result<Vec<(String, StoredValue)>, Status>
    where
        F: Fn(&str) -> bool,
    {
        self.check_active()?;
        let now = Instant::now();
        let hash_table = self.hash_table.lock();
        Ok(hash_table
            .iter_live(now_secs())
            .filter(|(key, _)| filter(key))
            .map(|(key, value)| {
                let mut value = value.clone();
                value.cas = value.visible_cas(now);
                (key.clone(), value)
            })
            .collect())
    }
}

/// A locked value only accepts its lock cas, an unlocked one any matching or empty cas
fn check_lock_and_cas(value: &StoredValue, cas: Cas, now: Instant) -> Result<(), Status> {
    if value.is_locked(now) {
        if cas == value.cas {
            Ok(())
        } else {
            Err(Status::Locked)
        }
    } else if !cas.is_empty() && cas != value.cas {
        Err(Status::KeyExists)
    } else {
        Ok(())
    }
}

pub type VBucketPtr = Arc<VBucket>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Vbid(u16);

impl Vbid {
    pub fn new(id: u16) -> Self {
        Self(id)
    }
}

impl From<Vbid> for usize {
    fn from(vbid: Vbid) -> Self {
        vbid.0 as usize
    }
}

impl From<Vbid> for u16 {
    fn from(vbid: Vbid) -> Self {
        vbid.0
    }
}

impl From<u16> for Vbid {
    fn from(id: u16) -> Self {
        Self(id)
    }
}

impl Display for Vbid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Active,
    Replica,
    Pending,
    Dead,
}
