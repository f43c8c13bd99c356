//! Bounded store of per-group buckets.
//!
//! Buckets live in a vector threaded by an intrusive doubly-linked list that
//! keeps them in touch order, indexed by an ahash map. The least recently
//! touched bucket is always at the head, so both "peek oldest" and "move to
//! back on touch" are O(1).
//!
//! Memory for inactive groups is reclaimed lazily: [`BucketStore::evict_stale`]
//! inspects only the head and removes it once it has expired. An entry is
//! therefore evicted only after it has become the globally least recently
//! touched one.

use crate::domain::bucket::Bucket;
use crate::domain::quota::QuotaDescriptor;
use crate::domain::record::GroupKey;
use ahash::AHashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::SystemTime;

/// Identity of a bucket: the group and the name of the quota it enforces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketKey {
    pub group: GroupKey,
    pub quota: Arc<str>,
}

impl BucketKey {
    pub fn new(group: GroupKey, quota: Arc<str>) -> Self {
        Self { group, quota }
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.quota, self.group)
    }
}

#[derive(Debug)]
struct Entry {
    key: BucketKey,
    bucket: Bucket,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Keyed buckets in least-recently-touched order.
#[derive(Debug)]
pub struct BucketStore {
    entries: Vec<Entry>,
    index: AHashMap<BucketKey, usize>,
    /// Least recently touched.
    head: Option<usize>,
    /// Most recently touched.
    tail: Option<usize>,
    hysteresis: bool,
    max_buckets: Option<NonZeroUsize>,
}

impl BucketStore {
    /// Create an empty store whose buckets use approximate-rate hysteresis.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: AHashMap::new(),
            head: None,
            tail: None,
            hysteresis: true,
            max_buckets: None,
        }
    }

    /// Set whether buckets created from now on use hysteresis.
    pub fn with_hysteresis(mut self, enabled: bool) -> Self {
        self.hysteresis = enabled;
        self
    }

    /// Cap the number of buckets; see [`make_room`](Self::make_room).
    pub fn with_max_buckets(mut self, max: NonZeroUsize) -> Self {
        self.max_buckets = Some(max);
        self
    }

    /// Return the bucket for `(group, quota.name)`, creating it on first
    /// access, and mark it most recently touched.
    pub fn get(&mut self, group: GroupKey, quota: &QuotaDescriptor, now: SystemTime) -> &mut Bucket {
        let key = BucketKey::new(group, Arc::clone(quota.name_arc()));
        let idx = match self.index.get(&key) {
            Some(&idx) => {
                self.touch(idx);
                idx
            }
            None => {
                let idx = self.entries.len();
                self.entries.push(Entry {
                    key: key.clone(),
                    bucket: Bucket::new(quota.capacity(), quota.duration(), self.hysteresis, now),
                    prev: None,
                    next: None,
                });
                self.index.insert(key, idx);
                self.push_back(idx);
                idx
            }
        };
        &mut self.entries[idx].bucket
    }

    /// Remove the least recently touched bucket if it has expired.
    ///
    /// Looks at the head only; an O(1) check meant to run once per decision.
    pub fn evict_stale(&mut self, now: SystemTime) -> Option<BucketKey> {
        let head = self.head?;
        if self.entries[head].bucket.expired(now) {
            Some(self.remove_at(head).0)
        } else {
            None
        }
    }

    /// With a bucket cap configured, evict the least recently touched bucket
    /// if `(group, quota)` is not stored yet and the store is full.
    pub fn make_room(&mut self, group: &GroupKey, quota: &QuotaDescriptor) -> Option<BucketKey> {
        let max = self.max_buckets?;
        if self.entries.len() < max.get() {
            return None;
        }
        let key = BucketKey::new(group.clone(), Arc::clone(quota.name_arc()));
        if self.index.contains_key(&key) {
            return None;
        }
        let head = self.head?;
        Some(self.remove_at(head).0)
    }

    /// The least recently touched entry.
    pub fn peek_oldest(&self) -> Option<(&BucketKey, &Bucket)> {
        self.head.map(|idx| {
            let entry = &self.entries[idx];
            (&entry.key, &entry.bucket)
        })
    }

    /// Look up a bucket without touching it.
    pub fn peek(&self, key: &BucketKey) -> Option<&Bucket> {
        self.index.get(key).map(|&idx| &self.entries[idx].bucket)
    }

    pub fn contains(&self, key: &BucketKey) -> bool {
        self.index.contains_key(key)
    }

    /// Remove a bucket regardless of its age.
    pub fn remove(&mut self, key: &BucketKey) -> Option<Bucket> {
        let idx = *self.index.get(key)?;
        Some(self.remove_at(idx).1)
    }

    /// Keys from least to most recently touched.
    pub fn keys(&self) -> Keys<'_> {
        Keys {
            store: self,
            next: self.head,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
        self.head = None;
        self.tail = None;
    }

    fn touch(&mut self, idx: usize) {
        if self.tail != Some(idx) {
            self.unlink(idx);
            self.push_back(idx);
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.entries[idx].prev, self.entries[idx].next);
        match prev {
            Some(p) => self.entries[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.entries[n].prev = prev,
            None => self.tail = prev,
        }
        self.entries[idx].prev = None;
        self.entries[idx].next = None;
    }

    fn push_back(&mut self, idx: usize) {
        self.entries[idx].prev = self.tail;
        self.entries[idx].next = None;
        match self.tail {
            Some(t) => self.entries[t].next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
    }

    fn remove_at(&mut self, idx: usize) -> (BucketKey, Bucket) {
        self.unlink(idx);
        let removed = self.entries.swap_remove(idx);
        self.index.remove(&removed.key);

        // The former last entry now sits at `idx`; repoint its neighbours.
        if idx < self.entries.len() {
            let (prev, next) = (self.entries[idx].prev, self.entries[idx].next);
            match prev {
                Some(p) => self.entries[p].next = Some(idx),
                None => self.head = Some(idx),
            }
            match next {
                Some(n) => self.entries[n].prev = Some(idx),
                None => self.tail = Some(idx),
            }
            if let Some(slot) = self.index.get_mut(&self.entries[idx].key) {
                *slot = idx;
            }
        }

        (removed.key, removed.bucket)
    }
}

impl Default for BucketStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over store keys in touch order, oldest first.
pub struct Keys<'a> {
    store: &'a BucketStore,
    next: Option<usize>,
}

impl<'a> Iterator for Keys<'a> {
    type Item = &'a BucketKey;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.next?;
        let entry = &self.store.entries[idx];
        self.next = entry.next;
        Some(&entry.key)
    }
}
