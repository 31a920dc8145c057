use std::sync::Arc;

use crate::accel::AccelerationProvider;
use crate::error::IndexError;
use crate::ranker::{QueryResult, Ranker};
use crate::store::{EntityRecord, MemoryStore};
use crate::vector::BinaryVector;

/// A record store paired with the ranker that searches it.
///
/// Constructed explicitly and shared by handle (`Arc<BitIndex>`); there is
/// no global instance.
pub struct BitIndex {
    store: MemoryStore,
    ranker: Ranker,
}

impl BitIndex {
    pub fn new(bits: usize, accel: Arc<AccelerationProvider>) -> Result<Self, IndexError> {
        Ok(Self {
            store: MemoryStore::new(bits)?,
            ranker: Ranker::new(accel),
        })
    }

    /// Index using the best native kernel available.
    pub fn native(bits: usize) -> Result<Self, IndexError> {
        Self::new(bits, Arc::new(AccelerationProvider::native()))
    }

    /// Index that always ranks on the scalar path.
    pub fn scalar(bits: usize) -> Result<Self, IndexError> {
        Self::new(bits, Arc::new(AccelerationProvider::disabled()))
    }

    pub fn upsert(&self, record: EntityRecord) -> Result<(), IndexError> {
        self.store.upsert(record)
    }

    pub fn remove(&self, id: &str) -> bool {
        self.store.remove(id)
    }

    pub fn clear(&self) {
        self.store.clear()
    }

    pub fn get(&self, id: &str) -> Option<EntityRecord> {
        self.store.get(id)
    }

    pub fn all(&self) -> Vec<EntityRecord> {
        self.store.all()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn bits(&self) -> usize {
        self.store.bits()
    }

    /// See [`Ranker::query`].
    pub fn query(&self, probe: &BinaryVector, top_k: usize) -> Result<Vec<QueryResult>, IndexError> {
        self.ranker.query(&self.store, probe, top_k)
    }

    pub fn kernel_name(&self) -> &'static str {
        self.ranker.kernel_name()
    }
}
