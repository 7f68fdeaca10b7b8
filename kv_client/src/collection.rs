use std::{collections::HashMap, sync::Arc, time::Duration};

use kv_common::{
    Cas, Content, DocumentStore, Expiry, GetOptions, GetResult, InsertOptions, KvError,
    MutationResult, RemoveOptions, ReplaceOptions, ScanType, UpsertOptions,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::{
    bulk,
    mutate::{self, MutateOptions},
};

/// Typed access to the documents of a store. Content is encoded as JSON
/// unless it is already a [Content].
pub struct Collection<S: DocumentStore> {
    store: Arc<S>,
}

impl<S: DocumentStore> Clone for Collection<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: DocumentStore> Collection<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn get(&self, id: &str) -> Result<GetResult, KvError> {
        self.store.get(id, &GetOptions::default())
    }

    pub fn get_with_options(&self, id: &str, options: &GetOptions) -> Result<GetResult, KvError> {
        self.store.get(id, options)
    }

    /// A locked document exists too, its get succeeds with [Cas::LOCKED]
    pub fn exists(&self, id: &str) -> Result<bool, KvError> {
        match self.get(id) {
            Ok(_) => Ok(true),
            Err(KvError::DocumentNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn insert<T: Serialize + ?Sized>(
        &self,
        id: &str,
        content: &T,
        options: &InsertOptions,
    ) -> Result<MutationResult, KvError> {
        self.store.insert(id, Content::json(content)?, options)
    }

    pub fn upsert<T: Serialize + ?Sized>(
        &self,
        id: &str,
        content: &T,
        options: &UpsertOptions,
    ) -> Result<MutationResult, KvError> {
        self.upsert_content(id, Content::json(content)?, options)
    }

    /// Store content that is already encoded
    pub fn upsert_content(
        &self,
        id: &str,
        content: Content,
        options: &UpsertOptions,
    ) -> Result<MutationResult, KvError> {
        self.store.upsert(id, content, options)
    }

    pub fn replace<T: Serialize + ?Sized>(
        &self,
        id: &str,
        content: &T,
        options: &ReplaceOptions,
    ) -> Result<MutationResult, KvError> {
        self.store.replace(id, Content::json(content)?, options)
    }

    pub fn remove(&self, id: &str, options: &RemoveOptions) -> Result<MutationResult, KvError> {
        self.store.remove(id, options)
    }

    pub fn touch(&self, id: &str, expiry: Expiry) -> Result<MutationResult, KvError> {
        self.store.touch(id, expiry)
    }

    pub fn get_and_touch(&self, id: &str, expiry: Expiry) -> Result<GetResult, KvError> {
        self.store.get_and_touch(id, expiry)
    }

    pub fn get_and_lock(&self, id: &str, lock_time: Duration) -> Result<GetResult, KvError> {
        self.store.get_and_lock(id, lock_time)
    }

    pub fn unlock(&self, id: &str, cas: Cas) -> Result<(), KvError> {
        self.store.unlock(id, cas)
    }

    pub fn scan_documents(&self, scan_type: &ScanType) -> Result<Vec<GetResult>, KvError> {
        let results = self.store.scan(scan_type)?;
        debug!("Scan {:?} returned {} documents", scan_type, results.len());
        Ok(results)
    }

    pub fn scan_ids(&self, scan_type: &ScanType) -> Result<Vec<String>, KvError> {
        Ok(self
            .scan_documents(scan_type)?
            .into_iter()
            .map(|result| result.id)
            .collect())
    }

    /// See [bulk::bulk_get]
    pub fn bulk_get<I>(
        &self,
        ids: I,
        max_concurrency: usize,
    ) -> HashMap<String, Result<GetResult, KvError>>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        bulk::bulk_get(&*self.store, ids, max_concurrency)
    }

    /// See [mutate::mutate]
    pub fn mutate<T, F>(
        &self,
        id: &str,
        options: &MutateOptions,
        transform: F,
    ) -> Result<MutationResult, KvError>
    where
        T: Serialize,
        F: FnMut(&GetResult) -> Result<T, KvError>,
    {
        mutate::mutate(&*self.store, id, options, transform)
    }

    /// See [mutate::mutate_as]
    pub fn mutate_as<D, T, F>(
        &self,
        id: &str,
        options: &MutateOptions,
        transform: F,
    ) -> Result<MutationResult, KvError>
    where
        D: DeserializeOwned,
        T: Serialize,
        F: FnMut(D) -> T,
    {
        mutate::mutate_as(&*self.store, id, options, transform)
    }
}
