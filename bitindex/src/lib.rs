//! In-memory similarity index over fixed-width binary signatures.
//!
//! # Pipeline
//!
//! 1. [`binarize`] / [`Projector::project`]: float signature -> [`BinaryVector`]
//! 2. [`BitIndex::upsert`]: enroll an identity under its vector
//! 3. [`BitIndex::query`]: rank every enrolled vector by Hamming distance
//!
//! # Kernels
//!
//! Ranking runs on a [`DistanceKernel`]. An [`AccelerationProvider`] loads a
//! native kernel (x86_64 `popcnt`, aarch64 unrolled) the first time it is
//! needed and falls back to the scalar kernel when that fails. The choice
//! never changes a result.
//!
//! # Scale
//!
//! Every query is an exhaustive scan. This is intended for a few thousand
//! identities at most.

mod accel;
mod binarize;
mod error;
mod index;
pub mod kernel;
mod ranker;
mod store;
mod vector;

pub use accel::AccelerationProvider;
pub use binarize::{binarize, Projector};
pub use error::{IndexError, KernelError};
pub use index::BitIndex;
pub use kernel::{DistanceKernel, KernelLoader};
pub use ranker::{hamming, QueryResult, Ranker};
pub use store::{EntityRecord, MemoryStore, Metadata};
pub use vector::{words_for, BinaryVector, WORD_BITS};
