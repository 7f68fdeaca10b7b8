use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use kv_common::{
    Cas, Content, DocumentStore, Durability, Expiry, GetOptions, GetResult, InsertOptions,
    KvError, MutationResult, MutationToken, Operation, RemoveOptions, ReplaceOptions, ScanType,
    Status, UpsertOptions,
};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use tracing::{debug, info};

use crate::{
    item::Item,
    stored_value::StoredValue,
    vbucket::{Mutation, SetMode, SetOptions, VBucketPtr, Vbid},
    vbucket_map::VBucketMap,
    BucketConfig,
};

/// Longest id the engine accepts, in bytes
pub const MAX_KEY_LEN: usize = 250;

/// A single node, in-memory bucket. Documents are spread over vbuckets by
/// hashing their id, each vbucket serialises its own mutations.
pub struct Bucket {
    config: BucketConfig,
    vbucket_map: VBucketMap,
}

pub type BucketPtr = Arc<Bucket>;

impl Bucket {
    pub fn new(config: BucketConfig) -> Result<BucketPtr, KvError> {
        if config.max_vbuckets == 0 || !config.max_vbuckets.is_power_of_two() {
            return Err(KvError::InvalidArgument(format!(
                "max_vbuckets must be a power of two, got {}",
                config.max_vbuckets
            )));
        }
        let vbucket_map = VBucketMap::new(&config);
        info!(
            "Created bucket {} with {} vbuckets",
            config.name, config.max_vbuckets
        );
        Ok(BucketPtr::new(Bucket {
            config,
            vbucket_map,
        }))
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn get_vbuckets(&self) -> &VBucketMap {
        &self.vbucket_map
    }

    pub fn vbucket_for(&self, id: &str) -> Vbid {
        Vbid::from(v_bucket_hash(id.as_bytes(), u32::from(self.config.max_vbuckets)))
    }

    /// Number of live documents across all vbuckets
    pub fn item_count(&self) -> usize {
        self.vbucket_map
            .get_buckets()
            .map(|vb| vb.hash_table.lock().len())
            .sum()
    }

    fn get_vbucket(&self, id: &str) -> Result<VBucketPtr, KvError> {
        validate_id(id)?;
        let vbid = self.vbucket_for(id);
        self.vbucket_map
            .get_bucket(vbid)
            .ok_or(KvError::NotMyVbucket(u16::from(vbid)))
    }

    fn mutation_result(&self, vb: &VBucketPtr, mutation: Mutation) -> MutationResult {
        MutationResult {
            cas: mutation.cas,
            token: MutationToken {
                vbucket: u16::from(vb.id),
                vbucket_uuid: vb.uuid(),
                seqno: mutation.seqno,
                bucket: self.config.name.clone(),
            },
        }
    }

    /// Every level is satisfied by a single node, replicas are only counted for the log
    fn observe_durability(&self, id: &str, durability: Durability) {
        if durability.is_synchronous() {
            debug!(
                "{} requested durability {:?} with {} replicas",
                id, durability, self.config.num_replicas
            );
        }
    }

    fn set(
        &self,
        id: &str,
        content: Content,
        expiry: Expiry,
        options: SetOptions,
        durability: Durability,
        operation: Operation,
    ) -> Result<MutationResult, KvError> {
        let vb = self.get_vbucket(id)?;
        let expiry_time = expiry.to_epoch_secs(SystemTime::now())?;
        self.observe_durability(id, durability);
        let item = Item {
            key: id.to_string(),
            value: content,
            expiry_time,
        };
        let mutation = vb
            .set(item, options)
            .map_err(|status| to_error(status, operation, id, &vb))?;
        debug!("{:?} {} in vb:{} cas {}", operation, id, vb.id, mutation.cas);
        Ok(self.mutation_result(&vb, mutation))
    }
}

impl DocumentStore for Bucket {
    fn get(&self, id: &str, options: &GetOptions) -> Result<GetResult, KvError> {
        let vb = self.get_vbucket(id)?;
        let value = vb
            .get(id)
            .map_err(|status| to_error(status, Operation::Get, id, &vb))?;
        Ok(get_result(id.to_string(), value, options.with_expiry))
    }

    fn insert(
        &self,
        id: &str,
        content: Content,
        options: &InsertOptions,
    ) -> Result<MutationResult, KvError> {
        let set_options = SetOptions {
            mode: SetMode::Add,
            cas: Cas::default(),
            preserve_expiry: false,
        };
        self.set(
            id,
            content,
            options.expiry,
            set_options,
            options.durability,
            Operation::Insert,
        )
    }

    fn upsert(
        &self,
        id: &str,
        content: Content,
        options: &UpsertOptions,
    ) -> Result<MutationResult, KvError> {
        let set_options = SetOptions {
            mode: SetMode::Set,
            cas: Cas::default(),
            preserve_expiry: options.preserve_expiry,
        };
        self.set(
            id,
            content,
            options.expiry,
            set_options,
            options.durability,
            Operation::Upsert,
        )
    }

    fn replace(
        &self,
        id: &str,
        content: Content,
        options: &ReplaceOptions,
    ) -> Result<MutationResult, KvError> {
        let set_options = SetOptions {
            mode: SetMode::Replace,
            cas: options.cas,
            preserve_expiry: options.preserve_expiry,
        };
        self.set(
            id,
            content,
            options.expiry,
            set_options,
            options.durability,
            Operation::Replace,
        )
    }

    fn remove(&self, id: &str, options: &RemoveOptions) -> Result<MutationResult, KvError> {
        let vb = self.get_vbucket(id)?;
        self.observe_durability(id, options.durability);
        let mutation = vb
            .delete(id, options.cas)
            .map_err(|status| to_error(status, Operation::Remove, id, &vb))?;
        debug!("Removed {} from vb:{}", id, vb.id);
        Ok(self.mutation_result(&vb, mutation))
    }

    fn touch(&self, id: &str, expiry: Expiry) -> Result<MutationResult, KvError> {
        let vb = self.get_vbucket(id)?;
        let expiry_time = expiry.to_epoch_secs(SystemTime::now())?;
        let (_, mutation) = vb
            .touch(id, expiry_time)
            .map_err(|status| to_error(status, Operation::Touch, id, &vb))?;
        Ok(self.mutation_result(&vb, mutation))
    }

    fn get_and_touch(&self, id: &str, expiry: Expiry) -> Result<GetResult, KvError> {
        let vb = self.get_vbucket(id)?;
        let expiry_time = expiry.to_epoch_secs(SystemTime::now())?;
        let (value, _) = vb
            .touch(id, expiry_time)
            .map_err(|status| to_error(status, Operation::Touch, id, &vb))?;
        Ok(get_result(id.to_string(), value, false))
    }

    fn get_and_lock(&self, id: &str, lock_time: Duration) -> Result<GetResult, KvError> {
        let vb = self.get_vbucket(id)?;
        let value = vb
            .get_locked(id, lock_time)
            .map_err(|status| to_error(status, Operation::Get, id, &vb))?;
        debug!("Locked {} in vb:{}", id, vb.id);
        Ok(get_result(id.to_string(), value, false))
    }

    fn unlock(&self, id: &str, cas: Cas) -> Result<(), KvError> {
        let vb = self.get_vbucket(id)?;
        vb.unlock(id, cas)
            .map_err(|status| to_error(status, Operation::Unlock, id, &vb))
    }

    fn scan(&self, scan_type: &ScanType) -> Result<Vec<GetResult>, KvError> {
        if let ScanType::Sample { limit: 0, .. } = scan_type {
            return Err(KvError::InvalidArgument(
                "sample scan limit must be positive".to_string(),
            ));
        }

        let mut values = Vec::new();
        for vb in self.vbucket_map.get_buckets() {
            let matching = vb
                .collect(|key| scan_type.matches(key))
                .map_err(|_| KvError::NotMyVbucket(u16::from(vb.id)))?;
            values.extend(matching);
        }
        values.sort_by(|(a, _), (b, _)| a.cmp(b));

        if let ScanType::Sample { limit, seed } = *scan_type {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            values.shuffle(&mut rng);
            values.truncate(limit);
        }

        Ok(values
            .into_iter()
            .map(|(id, value)| get_result(id, value, false))
            .collect())
    }
}

fn get_result(id: String, value: StoredValue, with_expiry: bool) -> GetResult {
    GetResult {
        id,
        cas: value.cas,
        expiry: with_expiry.then(|| Expiry::from_epoch_secs(value.expiry_time)),
        content: value.value,
    }
}

fn to_error(status: Status, operation: Operation, id: &str, vb: &VBucketPtr) -> KvError {
    KvError::from_status(status, operation, id, u16::from(vb.id))
}

fn validate_id(id: &str) -> Result<(), KvError> {
    if id.is_empty() {
        return Err(KvError::InvalidArgument("document id is empty".to_string()));
    }
    if id.len() > MAX_KEY_LEN {
        return Err(KvError::InvalidArgument(format!(
            "document id is longer than {MAX_KEY_LEN} bytes"
        )));
    }
    Ok(())
}

pub fn v_bucket_hash(key: &[u8], num_vbuckets: u32) -> u16 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(key);
    let crc = hasher.finalize();
    let hash = (((crc) >> 16) & 0x7fff) & (num_vbuckets - 1);
    hash as u16
}
