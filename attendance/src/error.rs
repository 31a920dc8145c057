use kiosk_bitindex::IndexError;
use kiosk_signature::SignatureError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ledger::LedgerError;

#[derive(Error, Debug)]
pub enum KioskError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    /// Every attempt timed out.
    #[error("kiosk: {collaborator} timed out after {attempts} attempt(s): {message}")]
    CollaboratorTimeout {
        collaborator: &'static str,
        attempts: u32,
        message: String,
    },

    #[error("kiosk: {collaborator} failed: {message}")]
    Collaborator {
        collaborator: &'static str,
        message: String,
    },

    #[error("kiosk: config: {0}")]
    Config(String),
}

impl From<LedgerError> for KioskError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Timeout(message) => KioskError::CollaboratorTimeout {
                collaborator: "ledger",
                attempts: 1,
                message,
            },
            LedgerError::Backend(message) => KioskError::Collaborator {
                collaborator: "ledger",
                message,
            },
        }
    }
}

/// Structured failure shown to the person at the kiosk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: String,
    pub message: String,
}

impl KioskError {
    /// Stable snake_case error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            KioskError::Index(IndexError::InvalidInput(_)) => "invalid_input",
            KioskError::Index(IndexError::LengthMismatch { .. }) => "length_mismatch",
            KioskError::Index(IndexError::EmptyStore) => "empty_store",
            KioskError::Signature(SignatureError::EmptyInput) => "invalid_input",
            KioskError::Signature(SignatureError::NoSignal(_)) => "no_signal",
            KioskError::Signature(SignatureError::Timeout(_)) => "collaborator_timeout",
            KioskError::Signature(_) => "collaborator_error",
            KioskError::CollaboratorTimeout { .. } => "collaborator_timeout",
            KioskError::Collaborator { .. } => "collaborator_error",
            KioskError::Config(_) => "config",
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind() == "collaborator_timeout"
    }

    pub fn to_failure(&self) -> Failure {
        Failure {
            kind: self.kind().to_string(),
            message: self.to_string(),
        }
    }
}
