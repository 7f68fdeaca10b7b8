use std::collections::HashMap;

use kv_common::Cas;

use crate::{item::Item, stored_value::StoredValue};

#[derive(Debug, Default)]
pub struct HashTable {
    map: HashMap<String, StoredValue>,
}

impl HashTable {
    /// Look up a live value. Expired values are dropped on the way.
    pub fn find(&mut self, key: &str, now_secs: u32) -> Option<&mut StoredValue> {
        if self
            .map
            .get(key)
            .map_or(false, |value| value.is_expired(now_secs))
        {
            self.map.remove(key);
            return None;
        }
        self.map.get_mut(key)
    }

    pub fn add_new_stored_value(&mut self, item: Item, cas: Cas, by_seqno: u64) -> &StoredValue {
        let value = StoredValue {
            value: item.value,
            cas,
            by_seqno,
            expiry_time: item.expiry_time,
            rev_seqno: 1,
            locked_until: None,
        };
        self.map.insert(item.key.clone(), value);
        &self.map[&item.key]
    }

    pub fn remove(&mut self, key: &str) -> Option<StoredValue> {
        self.map.remove(key)
    }

    /// Live values in no particular order
    pub fn iter_live(&self, now_secs: u32) -> impl Iterator<Item = (&String, &StoredValue)> {
        self.map
            .iter()
            .filter(move |(_, value)| !value.is_expired(now_secs))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
