//! Hamming distance kernels.
//!
//! Every kernel computes the same function: the popcount of `a XOR b`
//! summed over all words. They differ only in how the work is scheduled,
//! so any kernel can replace another without changing a single distance.

use std::sync::Arc;

use crate::error::KernelError;

/// Computes Hamming distance between two packed word slices.
///
/// Callers guarantee both slices have the same length.
pub trait DistanceKernel: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn distance(&self, a: &[u64], b: &[u64]) -> u32;
}

/// Portable word-at-a-time kernel. Always available.
pub struct ScalarKernel;

impl DistanceKernel for ScalarKernel {
    fn name(&self) -> &'static str {
        "scalar"
    }

    fn distance(&self, a: &[u64], b: &[u64]) -> u32 {
        scalar_distance(a, b)
    }
}

/// Word-at-a-time Hamming distance.
pub fn scalar_distance(a: &[u64], b: &[u64]) -> u32 {
    a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum()
}

/// Processes four words per step with independent accumulators, which lets
/// the CPU overlap popcounts. Used where `count_ones` already lowers to a
/// native instruction (aarch64 `cnt`).
pub struct UnrolledKernel;

impl DistanceKernel for UnrolledKernel {
    fn name(&self) -> &'static str {
        "unrolled"
    }

    fn distance(&self, a: &[u64], b: &[u64]) -> u32 {
        unrolled_distance(a, b)
    }
}

#[inline(always)]
fn unrolled_distance(a: &[u64], b: &[u64]) -> u32 {
    let n = a.len().min(b.len());
    let (a, b) = (&a[..n], &b[..n]);

    let mut acc = [0u32; 4];
    let mut ca = a.chunks_exact(4);
    let mut cb = b.chunks_exact(4);
    for (x, y) in ca.by_ref().zip(cb.by_ref()) {
        acc[0] += (x[0] ^ y[0]).count_ones();
        acc[1] += (x[1] ^ y[1]).count_ones();
        acc[2] += (x[2] ^ y[2]).count_ones();
        acc[3] += (x[3] ^ y[3]).count_ones();
    }
    let tail = scalar_distance(ca.remainder(), cb.remainder());
    acc.iter().sum::<u32>() + tail
}

/// x86_64 kernel compiled with the `popcnt` target feature.
///
/// Only constructible through [`PopcntKernel::detect`], so the feature is
/// known to be present whenever the kernel exists.
#[cfg(target_arch = "x86_64")]
pub struct PopcntKernel {
    _detected: (),
}

#[cfg(target_arch = "x86_64")]
impl PopcntKernel {
    /// Returns the kernel if the running CPU supports `popcnt`.
    pub fn detect() -> Option<Self> {
        if std::arch::is_x86_feature_detected!("popcnt") {
            Some(Self { _detected: () })
        } else {
            None
        }
    }
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "popcnt")]
unsafe fn popcnt_distance(a: &[u64], b: &[u64]) -> u32 {
    unrolled_distance(a, b)
}

#[cfg(target_arch = "x86_64")]
impl DistanceKernel for PopcntKernel {
    fn name(&self) -> &'static str {
        "x86_64-popcnt"
    }

    fn distance(&self, a: &[u64], b: &[u64]) -> u32 {
        // SAFETY: `detect` verified popcnt support before construction.
        unsafe { popcnt_distance(a, b) }
    }
}

/// Loads an accelerated kernel.
///
/// Implementations report every failure as a [`KernelError`]; the
/// provider turns it into "no acceleration".
pub trait KernelLoader: Send + Sync {
    fn load(&self) -> Result<Arc<dyn DistanceKernel>, KernelError>;
}

/// Picks the best kernel for the running CPU.
pub struct NativeLoader;

impl KernelLoader for NativeLoader {
    fn load(&self) -> Result<Arc<dyn DistanceKernel>, KernelError> {
        load_native()
    }
}

#[cfg(target_arch = "x86_64")]
fn load_native() -> Result<Arc<dyn DistanceKernel>, KernelError> {
    match PopcntKernel::detect() {
        Some(k) => Ok(Arc::new(k)),
        None => Err(KernelError::Unsupported("x86_64 cpu without popcnt".into())),
    }
}

#[cfg(target_arch = "aarch64")]
fn load_native() -> Result<Arc<dyn DistanceKernel>, KernelError> {
    Ok(Arc::new(UnrolledKernel))
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
fn load_native() -> Result<Arc<dyn DistanceKernel>, KernelError> {
    Err(KernelError::Unsupported(std::env::consts::ARCH.into()))
}

/// Never loads anything. Used when acceleration is turned off in config.
pub struct DisabledLoader;

impl KernelLoader for DisabledLoader {
    fn load(&self) -> Result<Arc<dyn DistanceKernel>, KernelError> {
        Err(KernelError::Disabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(seed: u64, n: usize) -> Vec<u64> {
        let mut s = seed;
        (0..n)
            .map(|_| {
                s ^= s << 13;
                s ^= s >> 7;
                s ^= s << 17;
                s
            })
            .collect()
    }

    #[test]
    fn scalar_counts_differing_bits() {
        assert_eq!(scalar_distance(&[0], &[0]), 0);
        assert_eq!(scalar_distance(&[0b1011], &[0b0001]), 2);
        assert_eq!(scalar_distance(&[u64::MAX, 0], &[0, u64::MAX]), 128);
    }

    #[test]
    fn unrolled_matches_scalar_for_all_lengths() {
        for n in 0..19 {
            let a = words(n as u64 + 1, n);
            let b = words(n as u64 + 100, n);
            assert_eq!(
                UnrolledKernel.distance(&a, &b),
                ScalarKernel.distance(&a, &b),
                "length {n}"
            );
        }
    }

    #[test]
    fn native_matches_scalar_when_available() {
        let Ok(k) = NativeLoader.load() else {
            return;
        };
        for n in [1, 2, 3, 4, 5, 16, 33] {
            let a = words(7, n);
            let b = words(9, n);
            assert_eq!(k.distance(&a, &b), scalar_distance(&a, &b), "{} len {n}", k.name());
        }
    }

    #[test]
    fn disabled_loader_fails() {
        assert_eq!(DisabledLoader.load().err(), Some(KernelError::Disabled));
    }
}
