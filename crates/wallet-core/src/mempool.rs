//! Batched mempool queries.
//!
//! Address names are split into batches, each identified by a SHA-256 over
//! its names. The server answers with an opaque remote hash per batch which
//! is echoed on the next query so unchanged batches can be skipped. Batches
//! that disappear from one round to the next are evicted.

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use tracing::debug;

pub type LocalHash = [u8; 32];

/// One batch of address names to query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MempoolAddressList {
    pub local_hash: LocalHash,
    pub remote_hash: Option<String>,
    pub addresses: Vec<String>,
}

#[derive(Debug, Clone, Default)]
struct CacheItem {
    remote_hash: Option<String>,
    access_count: u64,
}

#[derive(Debug, Clone, Default)]
pub struct MempoolCache {
    items: HashMap<LocalHash, CacheItem>,
    access_counter: u64,
}

impl MempoolCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn remote_hash(&self, local_hash: &LocalHash) -> Option<&str> {
        self.items.get(local_hash)?.remote_hash.as_deref()
    }

    /// Split `names` into batches of at most `count_per_list` entries.
    /// A zero batch size is treated as one.
    pub fn create_address_lists<'a>(
        &mut self,
        names: impl IntoIterator<Item = &'a str>,
        count_per_list: usize,
    ) -> Vec<MempoolAddressList> {
        let count_per_list = count_per_list.max(1);
        self.access_counter += 1;

        let mut result = Vec::new();
        let mut addresses = Vec::new();
        let mut hasher = Sha256::new();

        for name in names {
            addresses.push(name.to_string());
            hasher.update(name.as_bytes());
            hasher.update([0u8]);

            if addresses.len() >= count_per_list {
                let hasher = std::mem::take(&mut hasher);
                result.push(self.finish_list(hasher, std::mem::take(&mut addresses)));
            }
        }
        if !addresses.is_empty() {
            result.push(self.finish_list(hasher, addresses));
        }

        let counter = self.access_counter;
        let before = self.items.len();
        self.items.retain(|_, item| item.access_count >= counter);
        debug!(
            lists = result.len(),
            evicted = before - self.items.len(),
            "mempool address lists"
        );
        result
    }

    /// Record the server's hash for a batch. Returns `false` when the batch
    /// is not (or no longer) known.
    pub fn set_result(&mut self, local_hash: &LocalHash, remote_hash: impl Into<String>) -> bool {
        match self.items.get_mut(local_hash) {
            Some(item) => {
                item.remote_hash = Some(remote_hash.into());
                true
            }
            None => false,
        }
    }

    fn finish_list(&mut self, mut hasher: Sha256, addresses: Vec<String>) -> MempoolAddressList {
        hasher.update([0u8]);
        let local_hash: LocalHash = hasher.finalize().into();
        let item = self.items.entry(local_hash).or_default();
        item.access_count = self.access_counter;
        MempoolAddressList {
            local_hash,
            remote_hash: item.remote_hash.clone(),
            addresses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("addr{i}")).collect()
    }

    #[test]
    fn batches_and_hash() {
        let names = names(5);
        let mut cache = MempoolCache::new();
        let lists = cache.create_address_lists(names.iter().map(String::as_str), 2);
        assert_eq!(lists.len(), 3);
        assert_eq!(lists[0].addresses, ["addr0", "addr1"]);
        assert_eq!(lists[2].addresses, ["addr4"]);
        assert!(lists.iter().all(|l| l.remote_hash.is_none()));
        assert_eq!(cache.len(), 3);

        let mut expected = Sha256::new();
        expected.update(b"addr4\0\0");
        let expected: LocalHash = expected.finalize().into();
        assert_eq!(lists[2].local_hash, expected);
    }

    #[test]
    fn remote_hash_is_echoed() {
        let names = names(3);
        let mut cache = MempoolCache::new();
        let lists = cache.create_address_lists(names.iter().map(String::as_str), 10);
        assert!(cache.set_result(&lists[0].local_hash, "remote"));
        assert!(!cache.set_result(&[0u8; 32], "remote"));

        let again = cache.create_address_lists(names.iter().map(String::as_str), 10);
        assert_eq!(again[0].local_hash, lists[0].local_hash);
        assert_eq!(again[0].remote_hash.as_deref(), Some("remote"));
    }

    #[test]
    fn stale_lists_are_evicted() {
        let names = names(3);
        let mut cache = MempoolCache::new();
        let first = cache.create_address_lists(names.iter().map(String::as_str), 10);
        cache.set_result(&first[0].local_hash, "remote");

        let second = cache.create_address_lists(names[..2].iter().map(String::as_str), 10);
        assert_eq!(cache.len(), 1);
        assert!(cache.remote_hash(&first[0].local_hash).is_none());
        assert!(!cache.set_result(&first[0].local_hash, "late"));
        assert!(cache.set_result(&second[0].local_hash, "fresh"));
    }

    #[test]
    fn no_addresses_no_lists() {
        let mut cache = MempoolCache::new();
        assert!(cache.create_address_lists(std::iter::empty(), 50).is_empty());
        assert!(cache.is_empty());
    }
}
