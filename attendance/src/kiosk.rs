use std::collections::HashMap;
use std::sync::Arc;

use kiosk_bitindex::{
    binarize, AccelerationProvider, BinaryVector, BitIndex, EntityRecord, IndexError, Metadata,
    Projector, QueryResult,
};
use kiosk_signature::{HttpGenerator, Signature, SignatureGenerator};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{Config, MatchConfig};
use crate::decision::Decision;
use crate::directory::StoreDirectory;
use crate::error::KioskError;
use crate::ledger::{AttendanceLedger, LedgerEntry};
use crate::retry::RetryPolicy;
use crate::state::{next_action, Action};
use crate::strategy::MatchStrategy;

/// Ranked candidates and the decision taken on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recognition {
    pub decision: Decision,
    pub candidates: Vec<QueryResult>,
}

/// Result of one check-in. `action` and `entry` are set iff matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckIn {
    pub decision: Decision,
    pub action: Option<Action>,
    pub entry: Option<LedgerEntry>,
}

/// The attendance kiosk: enrollment, recognition and check-in over a shared
/// [`BitIndex`].
///
/// Every collaborator call (generator, ledger) goes through the
/// [`RetryPolicy`]. Index access is synchronous and never retried.
///
/// Check-ins for the same identity are serialized within one kiosk, so the
/// ledger read and the append that follows it see no interleaving. Kiosks
/// sharing a ledger need the ledger itself to serialize per identity.
pub struct Kiosk {
    index: Arc<BitIndex>,
    strategy: Arc<dyn MatchStrategy>,
    generator: Option<Arc<dyn SignatureGenerator>>,
    ledger: Arc<dyn AttendanceLedger>,
    projector: Option<Projector>,
    retry: RetryPolicy,
    cfg: MatchConfig,
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Kiosk {
    /// Creates a kiosk without a generator; only the `*_signature`
    /// operations work until one is set.
    pub fn new(
        index: Arc<BitIndex>,
        ledger: Arc<dyn AttendanceLedger>,
        cfg: MatchConfig,
    ) -> Result<Self, KioskError> {
        if index.bits() != cfg.bits {
            return Err(KioskError::Config(format!(
                "index is {} bits wide, match config says {}",
                index.bits(),
                cfg.bits
            )));
        }
        if cfg.top_k == 0 {
            return Err(KioskError::Config("top_k must be at least 1".into()));
        }
        Ok(Self {
            index,
            strategy: cfg.strategy.build(),
            generator: None,
            ledger,
            projector: None,
            retry: RetryPolicy::default(),
            cfg,
            in_flight: Mutex::new(HashMap::new()),
        })
    }

    /// Builds the index, generator and projector described by `cfg`.
    pub fn from_config(cfg: &Config, ledger: Arc<dyn AttendanceLedger>) -> Result<Self, KioskError> {
        let matching = cfg.matching.clone().with_defaults();
        let accel = Arc::new(AccelerationProvider::from_enabled(cfg.acceleration));
        let index = Arc::new(BitIndex::new(matching.bits, accel)?);
        let retry = cfg.retry.policy();

        let projector = cfg
            .projector
            .as_ref()
            .map(|pc| pc.build(matching.bits))
            .transpose()?;

        let mut kiosk = Self::new(index, ledger, matching)?.with_retry(retry);
        if let Some(section) = &cfg.generator {
            let generator = HttpGenerator::with_config(section.client_config(retry.timeout))?;
            kiosk = kiosk.with_generator(Arc::new(generator));
        }
        if let Some(p) = projector {
            kiosk = kiosk.with_projector(p)?;
        }
        Ok(kiosk)
    }

    pub fn with_generator(mut self, generator: Arc<dyn SignatureGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Sets the projector used for embeddings that are not `bits` long.
    pub fn with_projector(mut self, projector: Projector) -> Result<Self, KioskError> {
        if projector.bits() != self.cfg.bits {
            return Err(KioskError::Config(format!(
                "projector yields {} bits, want {}",
                projector.bits(),
                self.cfg.bits
            )));
        }
        self.projector = Some(projector);
        Ok(self)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replaces the strategy picked from the match config.
    pub fn with_strategy(mut self, strategy: Arc<dyn MatchStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn index(&self) -> &Arc<BitIndex> {
        &self.index
    }

    pub fn config(&self) -> &MatchConfig {
        &self.cfg
    }

    /// Manual-selection directory over this kiosk's index.
    pub fn directory(&self) -> StoreDirectory {
        StoreDirectory::new(self.index.clone())
    }

    /// Enrolls (or re-enrolls) `id` from a captured image.
    pub async fn enroll(
        &self,
        id: &str,
        image: &[u8],
        metadata: Metadata,
    ) -> Result<EntityRecord, KioskError> {
        let signature = self.generate(image).await?;
        self.enroll_signature(id, &signature, metadata)
    }

    /// Enrolls (or re-enrolls) `id` under an existing signature.
    pub fn enroll_signature(
        &self,
        id: &str,
        signature: &Signature,
        metadata: Metadata,
    ) -> Result<EntityRecord, KioskError> {
        let vector = self.to_vector(signature)?;
        let record = EntityRecord {
            id: id.to_string(),
            vector,
            metadata,
        };
        self.index.upsert(record.clone())?;
        info!(id, kind = signature.kind(), total = self.index.len(), "kiosk: enrolled");
        Ok(record)
    }

    pub fn remove(&self, id: &str) -> bool {
        let removed = self.index.remove(id);
        if removed {
            info!(id, "kiosk: removed");
        }
        removed
    }

    pub async fn recognize(&self, image: &[u8]) -> Result<Recognition, KioskError> {
        let signature = self.generate(image).await?;
        self.recognize_signature(&signature)
    }

    /// Ranks the enrolled identities against `signature` through the
    /// configured strategy and applies `max_distance` to the best one.
    pub fn recognize_signature(&self, signature: &Signature) -> Result<Recognition, KioskError> {
        let probe = self.to_vector(signature)?;
        let r = self
            .strategy
            .query(&probe, &self.index, self.cfg.max_distance, self.cfg.top_k)?;
        debug!(
            strategy = self.strategy.name(),
            matched = r.decision.matched,
            distance = ?r.decision.distance,
            candidates = r.candidates.len(),
            "kiosk: recognized"
        );
        Ok(r)
    }

    pub async fn check_in(&self, image: &[u8]) -> Result<CheckIn, KioskError> {
        let signature = self.generate(image).await?;
        self.check_in_signature(&signature).await
    }

    /// Recognizes `signature` and, on a match, toggles the identity's
    /// attendance in the ledger.
    pub async fn check_in_signature(&self, signature: &Signature) -> Result<CheckIn, KioskError> {
        let decision = self.recognize_signature(signature)?.decision;
        let Some(id) = decision.id.clone() else {
            info!(distance = ?decision.distance, threshold = decision.threshold, "kiosk: no match");
            return Ok(CheckIn {
                decision,
                action: None,
                entry: None,
            });
        };

        let lock = self.identity_lock(&id);
        let (action, entry) = {
            let _guard = lock.lock().await;
            let last = self
                .retry
                .run("ledger", || self.ledger.last_status(&id))
                .await?;
            let action = next_action(last);
            let entry = self
                .retry
                .run("ledger", || self.ledger.append(&id, action))
                .await?;
            (action, entry)
        };

        info!(
            id = %id,
            %action,
            distance = ?decision.distance,
            record = %entry.record_id,
            "kiosk: checked in"
        );
        Ok(CheckIn {
            decision,
            action: Some(action),
            entry: Some(entry),
        })
    }

    fn identity_lock(&self, id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.in_flight
            .lock()
            .entry(id.to_string())
            .or_default()
            .clone()
    }

    async fn generate(&self, image: &[u8]) -> Result<Signature, KioskError> {
        let generator = self
            .generator
            .as_ref()
            .ok_or_else(|| KioskError::Config("no signature generator configured".into()))?;
        self.retry
            .run("signature generator", || generator.generate(image))
            .await
    }

    /// Embeddings of exactly `bits` values are thresholded; other lengths
    /// need a projector. Hashes are parsed as hex at `bits`.
    fn to_vector(&self, signature: &Signature) -> Result<BinaryVector, KioskError> {
        let bits = self.cfg.bits;
        let vector = match signature {
            Signature::Embedding(values) if values.len() == bits => {
                binarize(values, self.cfg.binarize_threshold)?
            }
            Signature::Embedding(values) => match &self.projector {
                Some(p) => p.project(values)?,
                None => {
                    return Err(IndexError::LengthMismatch {
                        got: values.len(),
                        want: bits,
                    }
                    .into());
                }
            },
            Signature::Hash(hex) => BinaryVector::from_hex(bits, hex)?,
        };
        Ok(vector)
    }
}
