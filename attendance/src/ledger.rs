use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;

use crate::retry::Transient;
use crate::state::{Action, AttendanceStatus};

/// One appended attendance event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub record_id: String,
    pub identity: String,
    pub action: Action,
    pub timestamp: DateTime<Utc>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("ledger: timeout: {0}")]
    Timeout(String),

    #[error("ledger: {0}")]
    Backend(String),
}

impl Transient for LedgerError {
    fn is_timeout(&self) -> bool {
        matches!(self, LedgerError::Timeout(_))
    }
}

/// Attendance history, owned outside the kiosk core.
///
/// Implementations must be safe for concurrent use (Send + Sync).
#[async_trait::async_trait]
pub trait AttendanceLedger: Send + Sync {
    /// Status left by the identity's most recent entry, if any.
    async fn last_status(&self, identity: &str) -> Result<Option<AttendanceStatus>, LedgerError>;

    /// Records an action and returns the stored entry.
    async fn append(&self, identity: &str, action: Action) -> Result<LedgerEntry, LedgerError>;
}

/// In-memory [`AttendanceLedger`]. Data is lost on restart.
pub struct MemoryLedger {
    entries: Mutex<Vec<LedgerEntry>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Entries for one identity, oldest first.
    pub fn history(&self, identity: &str) -> Vec<LedgerEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.identity == identity)
            .cloned()
            .collect()
    }

    /// Every entry, oldest first.
    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AttendanceLedger for MemoryLedger {
    async fn last_status(&self, identity: &str) -> Result<Option<AttendanceStatus>, LedgerError> {
        Ok(self
            .entries
            .lock()
            .iter()
            .rev()
            .find(|e| e.identity == identity)
            .map(|e| e.action.resulting_status()))
    }

    async fn append(&self, identity: &str, action: Action) -> Result<LedgerEntry, LedgerError> {
        if identity.is_empty() {
            return Err(LedgerError::Backend("empty identity".into()));
        }
        let entry = LedgerEntry {
            record_id: uuid::Uuid::new_v4().to_string(),
            identity: identity.to_string(),
            action,
            timestamp: Utc::now(),
        };
        self.entries.lock().push(entry.clone());
        Ok(entry)
    }
}
