use std::time::Duration;

use crate::{
    Cas, Content, Expiry, GetOptions, GetResult, InsertOptions, KvError, MutationResult,
    RemoveOptions, ReplaceOptions, ScanType, UpsertOptions,
};

/// The key-value operations of a document store.
///
/// Every mutation issues a fresh [Cas] and invalidates the previous one, so a
/// `replace` carrying a cas obtained from an earlier `get` only succeeds if
/// nobody else mutated the document in between.
pub trait DocumentStore: Send + Sync {
    /// Fails with [KvError::DocumentNotFound] if the document is absent or expired.
    fn get(&self, id: &str, options: &GetOptions) -> Result<GetResult, KvError>;

    /// Fails with [KvError::DocumentExists] if the document is already present.
    fn insert(
        &self,
        id: &str,
        content: Content,
        options: &InsertOptions,
    ) -> Result<MutationResult, KvError>;

    fn upsert(
        &self,
        id: &str,
        content: Content,
        options: &UpsertOptions,
    ) -> Result<MutationResult, KvError>;

    /// Fails with [KvError::CasMismatch] if `options.cas` is set and no longer
    /// matches, or [KvError::DocumentNotFound] if the document was removed.
    fn replace(
        &self,
        id: &str,
        content: Content,
        options: &ReplaceOptions,
    ) -> Result<MutationResult, KvError>;

    fn remove(&self, id: &str, options: &RemoveOptions) -> Result<MutationResult, KvError>;

    /// Update the expiry without touching the content
    fn touch(&self, id: &str, expiry: Expiry) -> Result<MutationResult, KvError>;

    fn get_and_touch(&self, id: &str, expiry: Expiry) -> Result<GetResult, KvError>;

    /// Lock the document for up to `lock_time`. The returned cas is the only
    /// one that can mutate or unlock it until the lock expires.
    fn get_and_lock(&self, id: &str, lock_time: Duration) -> Result<GetResult, KvError>;

    fn unlock(&self, id: &str, cas: Cas) -> Result<(), KvError>;

    fn scan(&self, scan_type: &ScanType) -> Result<Vec<GetResult>, KvError>;
}
