use serde::{Deserialize, Serialize};

use crate::error::SignatureError;

/// Output of a signature generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signature {
    /// Dense float vector, e.g. a learned face embedding.
    Embedding(Vec<f32>),

    /// Hex-encoded hash, e.g. a perceptual or content hash.
    Hash(String),
}

impl Signature {
    /// Short kind name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Signature::Embedding(_) => "embedding",
            Signature::Hash(_) => "hash",
        }
    }
}

/// SignatureGenerator reduces a captured image to a signature.
///
/// Implementations must be safe for concurrent use (Send + Sync).
#[async_trait::async_trait]
pub trait SignatureGenerator: Send + Sync {
    /// Returns the signature for one encoded image.
    /// Fails with [`SignatureError::NoSignal`] when no face is found.
    async fn generate(&self, image: &[u8]) -> Result<Signature, SignatureError>;
}
