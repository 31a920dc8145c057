use std::sync::Arc;

use kiosk_bitindex::{BitIndex, Metadata};
use serde::Serialize;

use crate::error::KioskError;

/// Metadata key holding an identity's display name.
pub const NAME_KEY: &str = "name";

/// An enrolled identity as shown in a manual-selection list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: String,
    pub display_name: String,
    pub metadata: Metadata,
}

/// Lists enrolled identities, for manual fallback when recognition fails.
#[async_trait::async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn list(&self) -> Result<Vec<Identity>, KioskError>;
}

/// Directory read straight from the index snapshot.
pub struct StoreDirectory {
    index: Arc<BitIndex>,
}

impl StoreDirectory {
    pub fn new(index: Arc<BitIndex>) -> Self {
        Self { index }
    }
}

#[async_trait::async_trait]
impl IdentityDirectory for StoreDirectory {
    async fn list(&self) -> Result<Vec<Identity>, KioskError> {
        Ok(self
            .index
            .all()
            .into_iter()
            .map(|r| Identity {
                display_name: r
                    .metadata
                    .get(NAME_KEY)
                    .cloned()
                    .unwrap_or_else(|| r.id.clone()),
                id: r.id,
                metadata: r.metadata,
            })
            .collect())
    }
}
