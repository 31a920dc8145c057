use std::collections::{BTreeMap, HashMap};

use parking_lot::{RwLock, RwLockReadGuard};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::IndexError;
use crate::vector::{words_for, BinaryVector};

/// Opaque metadata attached to an enrolled identity.
pub type Metadata = BTreeMap<String, String>;

/// One enrolled identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Unique identity id.
    pub id: String,

    /// Packed signature.
    pub vector: BinaryVector,

    /// Display data owned by the caller (name, department, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,
}

impl EntityRecord {
    pub fn new(id: impl Into<String>, vector: BinaryVector) -> Self {
        Self {
            id: id.into(),
            vector,
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// In-memory record store with a fixed vector width.
///
/// Mutations take the write lock and are applied whole or not at all;
/// reads take the read lock and never see a half-applied mutation.
pub struct MemoryStore {
    bits: usize,
    records: RwLock<HashMap<String, EntityRecord>>,
}

impl MemoryStore {
    /// Creates an empty store for `bits`-wide vectors.
    pub fn new(bits: usize) -> Result<Self, IndexError> {
        if bits == 0 {
            return Err(IndexError::InvalidInput("store width must be positive".into()));
        }
        Ok(Self {
            bits,
            records: RwLock::new(HashMap::new()),
        })
    }

    /// Inserts the record, replacing any existing record with the same id.
    pub fn upsert(&self, record: EntityRecord) -> Result<(), IndexError> {
        if record.id.is_empty() {
            return Err(IndexError::InvalidInput("empty id".into()));
        }
        if record.vector.bits() != self.bits {
            return Err(IndexError::LengthMismatch {
                got: record.vector.bits(),
                want: self.bits,
            });
        }

        let mut records = self.records.write();
        let replaced = records.insert(record.id.clone(), record).is_some();
        debug!(total = records.len(), replaced, "bitindex: upsert");
        Ok(())
    }

    /// Removes the record. Returns false if it was absent.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.records.write().remove(id).is_some();
        if removed {
            debug!(id, "bitindex: removed");
        }
        removed
    }

    /// Removes every record.
    pub fn clear(&self) {
        let mut records = self.records.write();
        debug!(dropped = records.len(), "bitindex: clear");
        records.clear();
    }

    pub fn get(&self, id: &str) -> Option<EntityRecord> {
        self.records.read().get(id).cloned()
    }

    /// Returns a copy of every record, ordered by id.
    pub fn all(&self) -> Vec<EntityRecord> {
        let mut out: Vec<EntityRecord> = self.records.read().values().cloned().collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Vector width in bits.
    pub fn bits(&self) -> usize {
        self.bits
    }

    /// Vector width in words.
    pub fn words(&self) -> usize {
        words_for(self.bits)
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, HashMap<String, EntityRecord>> {
        self.records.read()
    }
}
