use parking_lot::Mutex;
use schemagraph_core::SourceError;
use std::collections::BTreeMap;

/// Append-only landing area for concurrently fetched batches
///
/// Partitioned per scope key; draining yields partitions in key order
/// regardless of the order in which fetches completed.
pub(crate) struct StagingBuffer<K, T> {
    partitions: Mutex<BTreeMap<K, Vec<T>>>,
    failures: Mutex<BTreeMap<K, SourceError>>,
}

impl<K: Ord, T> StagingBuffer<K, T> {
    pub fn new() -> Self {
        Self {
            partitions: Mutex::new(BTreeMap::new()),
            failures: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn append(&self, scope: K, records: Vec<T>) {
        self.partitions.lock().entry(scope).or_default().extend(records);
    }

    pub fn fail(&self, scope: K, error: SourceError) {
        self.failures.lock().insert(scope, error);
    }

    /// Take all partitions and failures, each in scope key order
    pub fn drain(&self) -> (Vec<(K, Vec<T>)>, Vec<(K, SourceError)>) {
        let partitions = std::mem::take(&mut *self.partitions.lock());
        let failures = std::mem::take(&mut *self.failures.lock());
        (
            partitions.into_iter().collect(),
            failures.into_iter().collect(),
        )
    }
}
