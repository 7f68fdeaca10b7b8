//! Store wrappers used to provoke conflicts and count calls in tests

use std::{
    sync::atomic::{AtomicU32, Ordering},
    time::Duration,
};

use kv_bucket::{Bucket, BucketConfig, BucketPtr};
use kv_common::{
    Cas, Content, DocumentStore, Expiry, GetOptions, GetResult, InsertOptions, KvError,
    MutationResult, RemoveOptions, ReplaceOptions, ScanType, UpsertOptions,
};
use parking_lot::Mutex;

pub fn bucket() -> BucketPtr {
    Bucket::new(BucketConfig {
        max_vbuckets: 16,
        ..Default::default()
    })
    .unwrap()
}

/// Delegates to a real bucket. Before each of the next `conflicts` replaces
/// it sneaks in a write of its own, so the caller's cas is stale and the
/// replace fails with a genuine cas mismatch.
///
/// Every replace records the options it was called with.
pub struct ConflictingStore {
    pub inner: BucketPtr,
    conflicts: AtomicU32,
    pub gets: AtomicU32,
    pub replaces: AtomicU32,
    replace_options: Mutex<Vec<ReplaceOptions>>,
    report_expiry: bool,
}

impl ConflictingStore {
    pub fn new(inner: BucketPtr, conflicts: u32) -> Self {
        Self {
            inner,
            conflicts: AtomicU32::new(conflicts),
            gets: AtomicU32::new(0),
            replaces: AtomicU32::new(0),
            replace_options: Mutex::new(Vec::new()),
            report_expiry: true,
        }
    }

    /// Answer every get without an expiry, even when one was asked for
    pub fn without_expiry(mut self) -> Self {
        self.report_expiry = false;
        self
    }

    pub fn replace_options(&self) -> Vec<ReplaceOptions> {
        self.replace_options.lock().clone()
    }

    pub fn gets(&self) -> u32 {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn replaces(&self) -> u32 {
        self.replaces.load(Ordering::SeqCst)
    }

    fn take_conflict(&self) -> bool {
        self.conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl DocumentStore for ConflictingStore {
    fn get(&self, id: &str, options: &GetOptions) -> Result<GetResult, KvError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let mut result = self.inner.get(id, options)?;
        if !self.report_expiry {
            result.expiry = None;
        }
        Ok(result)
    }

    fn insert(
        &self,
        id: &str,
        content: Content,
        options: &InsertOptions,
    ) -> Result<MutationResult, KvError> {
        self.inner.insert(id, content, options)
    }

    fn upsert(
        &self,
        id: &str,
        content: Content,
        options: &UpsertOptions,
    ) -> Result<MutationResult, KvError> {
        self.inner.upsert(id, content, options)
    }

    fn replace(
        &self,
        id: &str,
        content: Content,
        options: &ReplaceOptions,
    ) -> Result<MutationResult, KvError> {
        self.replaces.fetch_add(1, Ordering::SeqCst);
        self.replace_options.lock().push(options.clone());
        if self.take_conflict() {
            let current = self.inner.get(id, &GetOptions::default().with_expiry(true))?;
            let options = ReplaceOptions::default().expiry(current.expiry.unwrap_or_default());
            self.inner.replace(id, current.content, &options)?;
        }
        self.inner.replace(id, content, options)
    }

    fn remove(&self, id: &str, options: &RemoveOptions) -> Result<MutationResult, KvError> {
        self.inner.remove(id, options)
    }

    fn touch(&self, id: &str, expiry: Expiry) -> Result<MutationResult, KvError> {
        self.inner.touch(id, expiry)
    }

    fn get_and_touch(&self, id: &str, expiry: Expiry) -> Result<GetResult, KvError> {
        self.inner.get_and_touch(id, expiry)
    }

    fn get_and_lock(&self, id: &str, lock_time: Duration) -> Result<GetResult, KvError> {
        self.inner.get_and_lock(id, lock_time)
    }

    fn unlock(&self, id: &str, cas: Cas) -> Result<(), KvError> {
        self.inner.unlock(id, cas)
    }

    fn scan(&self, scan_type: &ScanType) -> Result<Vec<GetResult>, KvError> {
        self.inner.scan(scan_type)
    }
}
