use std::cmp::Ordering;
use std::sync::Arc;

use serde::Serialize;

use crate::accel::AccelerationProvider;
use crate::error::IndexError;
use crate::kernel::scalar_distance;
use crate::store::{EntityRecord, MemoryStore};
use crate::vector::BinaryVector;

/// A ranked query hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryResult {
    pub record: EntityRecord,

    /// Hamming distance to the probe, in `[0, bits]`.
    pub distance: u32,
}

/// Hamming distance between two vectors of the same width.
pub fn hamming(a: &BinaryVector, b: &BinaryVector) -> Result<u32, IndexError> {
    if a.bits() != b.bits() {
        return Err(IndexError::LengthMismatch {
            got: b.bits(),
            want: a.bits(),
        });
    }
    Ok(scalar_distance(a.words(), b.words()))
}

/// Exhaustive Hamming ranker over a [`MemoryStore`].
///
/// Distances go through the accelerated kernel when the provider has one
/// and through the scalar path otherwise. Both paths yield identical
/// results: distances are exact integers and ordering is fully determined
/// by `(distance, id)`.
pub struct Ranker {
    accel: Arc<AccelerationProvider>,
}

impl Ranker {
    pub fn new(accel: Arc<AccelerationProvider>) -> Self {
        Self { accel }
    }

    /// Ranker that never loads an accelerated kernel.
    pub fn scalar() -> Self {
        Self::new(Arc::new(AccelerationProvider::disabled()))
    }

    /// Name of the kernel in use.
    pub fn kernel_name(&self) -> &'static str {
        self.accel.kernel_name()
    }

    /// Returns up to `top_k` records closest to `probe`, ordered by
    /// ascending distance and then ascending id.
    ///
    /// Fails with [`IndexError::LengthMismatch`] if the probe width differs
    /// from the store width, and with [`IndexError::EmptyStore`] if the
    /// store has no records. `top_k == 0` yields an empty result.
    pub fn query(
        &self,
        store: &MemoryStore,
        probe: &BinaryVector,
        top_k: usize,
    ) -> Result<Vec<QueryResult>, IndexError> {
        if probe.bits() != store.bits() {
            return Err(IndexError::LengthMismatch {
                got: probe.bits(),
                want: store.bits(),
            });
        }

        let records = store.read();
        if records.is_empty() {
            return Err(IndexError::EmptyStore);
        }
        if top_k == 0 {
            return Ok(vec![]);
        }

        let p = probe.words();
        let mut scored: Vec<(u32, &EntityRecord)> = match self.accel.maybe_accelerate() {
            Some(kernel) => records
                .values()
                .map(|r| (kernel.distance(p, r.vector.words()), r))
                .collect(),
            None => records
                .values()
                .map(|r| (scalar_distance(p, r.vector.words()), r))
                .collect(),
        };

        select_top_k(&mut scored, top_k);

        Ok(scored
            .into_iter()
            .map(|(distance, r)| QueryResult {
                record: r.clone(),
                distance,
            })
            .collect())
    }
}

fn by_rank(a: &(u32, &EntityRecord), b: &(u32, &EntityRecord)) -> Ordering {
    a.0.cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id))
}

/// Keeps the `k` best entries in rank order. Ids are unique, so the order
/// is total and the output does not depend on map iteration order.
fn select_top_k(scored: &mut Vec<(u32, &EntityRecord)>, k: usize) {
    if scored.len() > k {
        scored.select_nth_unstable_by(k - 1, by_rank);
        scored.truncate(k);
    }
    scored.sort_unstable_by(by_rank);
}
