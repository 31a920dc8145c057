//! Turns raw float signatures into packed bit vectors.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::IndexError;
use crate::vector::BinaryVector;

/// Thresholds each value into one bit: bit `i` is set iff
/// `values[i] > threshold`.
///
/// The output is `values.len()` bits wide. NaN values are rejected since
/// they carry no usable signal and would binarize silently to zero.
pub fn binarize(values: &[f32], threshold: f32) -> Result<BinaryVector, IndexError> {
    if values.is_empty() {
        return Err(IndexError::InvalidInput("empty signature".into()));
    }
    if let Some(i) = values.iter().position(|v| v.is_nan()) {
        return Err(IndexError::InvalidInput(format!("NaN at index {i}")));
    }

    let mut out = BinaryVector::zeros(values.len());
    for (i, v) in values.iter().enumerate() {
        if *v > threshold {
            out.set(i);
        }
    }
    Ok(out)
}

/// Projects float embeddings of any dimension into a fixed number of bits
/// using random hyperplane LSH.
///
/// # Algorithm
///
/// The projector stores `bits` unit-length hyperplanes of dimension `dim`.
/// Bit `i` of the output is set iff the dot product of plane `i` with the
/// embedding is positive. Nearby embeddings (small angle) land on the same
/// side of most planes, so angular distance becomes Hamming distance.
///
/// Planes drawn by [`Projector::new`] depend only on the seed within one
/// build. Deployments that enroll and probe from different binaries should
/// persist the planes with [`Projector::to_json`] and load them with
/// [`Projector::from_json`].
#[derive(Debug, Clone)]
pub struct Projector {
    dim: usize,
    bits: usize,
    planes: Vec<Vec<f32>>, // bits x dim
}

/// Persisted hyperplane matrix.
#[derive(Serialize, Deserialize)]
struct PlanesFile {
    dim: usize,
    bits: usize,
    planes: Vec<Vec<f32>>,
}

impl Projector {
    /// Draws `bits` random unit hyperplanes from a seeded generator.
    pub fn new(dim: usize, bits: usize, seed: u64) -> Result<Self, IndexError> {
        check_shape(dim, bits)?;

        let mut rng = StdRng::seed_from_u64(seed);
        let planes = (0..bits)
            .map(|_| {
                let mut plane: Vec<f32> = (0..dim).map(|_| normal(&mut rng) as f32).collect();
                let norm = plane.iter().map(|v| (*v as f64) * (*v as f64)).sum::<f64>().sqrt();
                if norm > 0.0 {
                    let scale = (1.0 / norm) as f32;
                    plane.iter_mut().for_each(|v| *v *= scale);
                }
                plane
            })
            .collect();
        Ok(Self { dim, bits, planes })
    }

    /// Creates a projector from pre-computed planes.
    pub fn from_planes(dim: usize, bits: usize, planes: Vec<Vec<f32>>) -> Result<Self, IndexError> {
        check_shape(dim, bits)?;
        if planes.len() != bits {
            return Err(IndexError::InvalidInput(format!(
                "{} planes for {bits} bits",
                planes.len()
            )));
        }
        if let Some(i) = planes.iter().position(|p| p.len() != dim) {
            return Err(IndexError::InvalidInput(format!(
                "plane {i} has dimension {}, want {dim}",
                planes[i].len()
            )));
        }
        Ok(Self { dim, bits, planes })
    }

    /// Loads planes from JSON `{"dim": .., "bits": .., "planes": [[..], ..]}`.
    pub fn from_json(data: &[u8]) -> Result<Self, IndexError> {
        let pf: PlanesFile = serde_json::from_slice(data)
            .map_err(|e| IndexError::InvalidInput(format!("parse planes JSON: {e}")))?;
        Self::from_planes(pf.dim, pf.bits, pf.planes)
    }

    /// Serializes the planes in the format read by [`Projector::from_json`].
    pub fn to_json(&self) -> Result<Vec<u8>, IndexError> {
        let pf = PlanesFile {
            dim: self.dim,
            bits: self.bits,
            planes: self.planes.clone(),
        };
        serde_json::to_vec(&pf).map_err(|e| IndexError::InvalidInput(e.to_string()))
    }

    /// Projects an embedding into a `bits`-wide vector.
    pub fn project(&self, embedding: &[f32]) -> Result<BinaryVector, IndexError> {
        if embedding.is_empty() {
            return Err(IndexError::InvalidInput("empty embedding".into()));
        }
        if embedding.len() != self.dim {
            return Err(IndexError::InvalidInput(format!(
                "embedding dimension {}, want {}",
                embedding.len(),
                self.dim
            )));
        }

        let mut out = BinaryVector::zeros(self.bits);
        for (i, plane) in self.planes.iter().enumerate() {
            let dot: f32 = plane.iter().zip(embedding).map(|(p, e)| p * e).sum();
            if dot > 0.0 {
                out.set(i);
            }
        }
        Ok(out)
    }

    /// Returns the expected embedding dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Returns the output width in bits.
    pub fn bits(&self) -> usize {
        self.bits
    }
}

fn check_shape(dim: usize, bits: usize) -> Result<(), IndexError> {
    if dim == 0 || bits == 0 {
        return Err(IndexError::InvalidInput(format!(
            "projector shape {dim}x{bits} must be positive"
        )));
    }
    Ok(())
}

// Box-Muller; u1 is kept away from zero so ln() stays finite.
fn normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = 1.0 - rng.gen_range(0.0..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binarize_thresholds_each_value() {
        let v = binarize(&[0.5, -0.1, 0.0, 2.0], 0.0).unwrap();
        assert_eq!(v.bits(), 4);
        assert_eq!(v.words(), &[0b1001]);
    }

    #[test]
    fn binarize_custom_threshold() {
        let v = binarize(&[0.5, 0.6, 0.7], 0.55).unwrap();
        assert_eq!(v.words(), &[0b110]);
    }

    #[test]
    fn binarize_packs_across_words() {
        let values: Vec<f32> = (0..130).map(|i| if i % 64 == 0 { 1.0 } else { -1.0 }).collect();
        let v = binarize(&values, 0.0).unwrap();
        assert_eq!(v.word_count(), 3);
        assert_eq!(v.words(), &[1, 1, 0]);
        assert!(v.get(128));
    }

    #[test]
    fn binarize_is_deterministic() {
        let values: Vec<f32> = (0..128).map(|i| ((i * 37) % 11) as f32 - 5.0).collect();
        for t in [-1.0, 0.0, 0.5, 3.0] {
            assert_eq!(binarize(&values, t).unwrap(), binarize(&values, t).unwrap());
        }
    }

    #[test]
    fn binarize_rejects_empty() {
        assert!(matches!(binarize(&[], 0.0), Err(IndexError::InvalidInput(_))));
    }

    #[test]
    fn binarize_rejects_nan() {
        let err = binarize(&[1.0, f32::NAN], 0.0).unwrap_err();
        assert_eq!(err, IndexError::InvalidInput("NaN at index 1".into()));
    }

    #[test]
    fn projector_from_planes() {
        let planes = vec![
            vec![1.0f32, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
            vec![-1.0, 0.0, 0.0],
        ];
        let p = Projector::from_planes(3, 4, planes).unwrap();

        // Dot products 1, 1, 1, -1.
        let v = p.project(&[1.0, 1.0, 1.0]).unwrap();
        assert_eq!(v.words(), &[0b0111]);

        let v = p.project(&[-1.0, -1.0, -1.0]).unwrap();
        assert_eq!(v.words(), &[0b1000]);
    }

    #[test]
    fn projector_same_seed_same_output() {
        let p1 = Projector::new(32, 128, 7).unwrap();
        let p2 = Projector::new(32, 128, 7).unwrap();
        let emb: Vec<f32> = (0..32).map(|i| (i as f32 * 0.3).sin()).collect();
        assert_eq!(p1.project(&emb).unwrap(), p2.project(&emb).unwrap());
    }

    #[test]
    fn projector_planes_are_unit_length() {
        let p = Projector::new(16, 8, 1).unwrap();
        for plane in &p.planes {
            let norm: f32 = plane.iter().map(|v| v * v).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-4, "norm {norm}");
        }
    }

    #[test]
    fn projector_nearby_embeddings_stay_close() {
        let p = Projector::new(64, 128, 42).unwrap();
        let a: Vec<f32> = (0..64).map(|i| if i == 0 { 1.0 } else { 0.0 }).collect();
        let mut b = a.clone();
        b[1] = 0.01;
        let far: Vec<f32> = a.iter().map(|v| -v).collect();

        let va = p.project(&a).unwrap();
        let near = crate::ranker::hamming(&va, &p.project(&b).unwrap()).unwrap();
        let opposite = crate::ranker::hamming(&va, &p.project(&far).unwrap()).unwrap();
        assert!(near <= 4, "near distance {near}");
        assert!(opposite >= 120, "opposite distance {opposite}");
    }

    #[test]
    fn projector_json_round_trip() {
        let p = Projector::new(8, 16, 3).unwrap();
        let q = Projector::from_json(&p.to_json().unwrap()).unwrap();
        let emb = [0.3f32, -0.2, 0.9, 0.1, -0.7, 0.4, 0.0, 0.5];
        assert_eq!(p.project(&emb).unwrap(), q.project(&emb).unwrap());
    }

    #[test]
    fn projector_rejects_bad_shapes() {
        assert!(Projector::new(0, 16, 1).is_err());
        assert!(Projector::from_planes(3, 2, vec![vec![1.0, 0.0, 0.0]]).is_err());
        assert!(Projector::from_planes(3, 1, vec![vec![1.0, 0.0]]).is_err());

        let p = Projector::new(4, 8, 1).unwrap();
        assert!(p.project(&[1.0, 2.0]).is_err());
        assert!(p.project(&[]).is_err());
    }
}
