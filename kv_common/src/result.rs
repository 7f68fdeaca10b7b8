use serde::de::DeserializeOwned;

use crate::{Cas, Content, Expiry, KvError};

/// A document read from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetResult {
    pub id: String,
    pub content: Content,
    pub cas: Cas,
    /// Only populated when the read asked for it. `None` means unknown,
    /// not "never expires" (that is `Some(Expiry::None)`).
    pub expiry: Option<Expiry>,
}

impl GetResult {
    pub fn content_as<T: DeserializeOwned>(&self) -> Result<T, KvError> {
        self.content.decode()
    }
}

/// Identifies a mutation by the vbucket it landed in and its sequence number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationToken {
    pub vbucket: u16,
    pub vbucket_uuid: u64,
    pub seqno: u64,
    pub bucket: String,
}

/// Outcome of an accepted mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationResult {
    pub cas: Cas,
    pub token: MutationToken,
}
