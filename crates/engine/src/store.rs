//! Concurrent, deduplicating registry of service records
//!
//! The correctness core of the engine: at most one record is ever created
//! per flow identifier, no matter how many workers race on the same flow.
//! The store's shard lock is held only across the check-and-insert; the
//! slower matching work happens outside it so unrelated flows never
//! serialize on the matcher.

use dashmap::DashMap;
use flowprint_common::ServiceRecord;
use parking_lot::Mutex;
use std::sync::Arc;

/// Shared handle to one record; all reads and mutations go through the
/// record-scoped lock so a record is never observed half-written.
#[derive(Debug, Clone, Default)]
pub struct ServiceHandle {
    inner: Arc<Mutex<ServiceRecord>>,
}

impl ServiceHandle {
    #[inline]
    #[must_use]
    pub fn new(record: ServiceRecord) -> Self {
        Self {
            inner: Arc::new(Mutex::new(record)),
        }
    }

    /// Run `f` with the record lock held.
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut ServiceRecord) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }

    /// Identity comparison: true when both handles name the same record.
    #[inline]
    #[must_use]
    pub fn same_record(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Map from flow identifier to service record handle.
#[derive(Debug, Default)]
pub struct ServiceStore {
    items: DashMap<String, ServiceHandle>,
}

impl ServiceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Cheap existence probe; lets the feed path skip repeat banners for a
    /// flow without allocating a key.
    #[inline]
    #[must_use]
    pub fn contains(&self, ident: &str) -> bool {
        self.items.contains_key(ident)
    }

    #[must_use]
    pub fn get(&self, ident: &str) -> Option<ServiceHandle> {
        self.items.get(ident).map(|entry| entry.value().clone())
    }

    /// Atomic lookup-or-create. Exactly one caller among concurrent callers
    /// with the same identifier runs `factory` and inserts; everyone else
    /// receives the existing handle with `false`. The shard lock covers
    /// only this check-and-insert.
    pub fn get_or_create(
        &self,
        ident: &str,
        factory: impl FnOnce() -> ServiceRecord,
    ) -> (ServiceHandle, bool) {
        let mut created = false;
        let handle = self
            .items
            .entry(ident.to_string())
            .or_insert_with(|| {
                created = true;
                ServiceHandle::new(factory())
            })
            .value()
            .clone();
        (handle, created)
    }

    /// Visit every record handle. Iteration order is unspecified; used by
    /// the batch sink at teardown.
    pub fn for_each(&self, mut visitor: impl FnMut(&str, &ServiceHandle)) {
        for entry in self.items.iter() {
            visitor(entry.key(), entry.value());
        }
    }
}
