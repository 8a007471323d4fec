use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;

use crate::BackendError;

use super::{Fields, LogicalBackend, PolicyBackend, Reply};

/// A [MeasuredBackend] acts as a proxy over a backend that counts every call
/// made through it.
#[derive(Clone, Debug)]
pub struct MeasuredBackend<Inner> {
    reads: Arc<AtomicUsize>,
    lists: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
    deletes: Arc<AtomicUsize>,
    policy_changes: Arc<AtomicUsize>,
    backend: Inner,
}

impl<Inner> MeasuredBackend<Inner> {
    /// Wrap the provided backend so that calls to it may be measured.
    pub fn new(backend: Inner) -> Self {
        Self {
            reads: Arc::new(AtomicUsize::default()),
            lists: Arc::new(AtomicUsize::default()),
            writes: Arc::new(AtomicUsize::default()),
            deletes: Arc::new(AtomicUsize::default()),
            policy_changes: Arc::new(AtomicUsize::default()),
            backend,
        }
    }

    /// The wrapped backend
    pub fn inner(&self) -> &Inner {
        &self.backend
    }

    /// The aggregate number of reads
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// The aggregate number of listings
    pub fn lists(&self) -> usize {
        self.lists.load(Ordering::Relaxed)
    }

    /// The aggregate number of writes
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    /// The aggregate number of deletes
    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::Relaxed)
    }

    /// The aggregate number of policy puts and deletes
    pub fn policy_changes(&self) -> usize {
        self.policy_changes.load(Ordering::Relaxed)
    }

    /// The aggregate number of calls of any kind
    pub fn calls(&self) -> usize {
        self.reads() + self.lists() + self.writes() + self.deletes() + self.policy_changes()
    }
}

#[async_trait]
impl<Inner> LogicalBackend for MeasuredBackend<Inner>
where
    Inner: LogicalBackend,
{
    async fn read(&self, path: &str) -> Result<Option<Fields>, BackendError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.backend.read(path).await
    }

    async fn list(&self, path: &str) -> Result<Option<Fields>, BackendError> {
        self.lists.fetch_add(1, Ordering::Relaxed);
        self.backend.list(path).await
    }

    async fn write(&self, path: &str, fields: Fields) -> Result<Option<Reply>, BackendError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.backend.write(path, fields).await
    }

    async fn delete(&self, path: &str) -> Result<(), BackendError> {
        self.deletes.fetch_add(1, Ordering::Relaxed);
        self.backend.delete(path).await
    }
}

#[async_trait]
impl<Inner> PolicyBackend for MeasuredBackend<Inner>
where
    Inner: PolicyBackend,
{
    async fn put_policy(&self, name: &str, rules: &str) -> Result<(), BackendError> {
        self.policy_changes.fetch_add(1, Ordering::Relaxed);
        self.backend.put_policy(name, rules).await
    }

    async fn delete_policy(&self, name: &str) -> Result<(), BackendError> {
        self.policy_changes.fetch_add(1, Ordering::Relaxed);
        self.backend.delete_policy(name).await
    }
}
