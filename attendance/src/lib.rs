//! Attendance kiosk core.
//!
//! A [`Kiosk`] turns a captured image into a signature, ranks it against a
//! shared [`kiosk_bitindex::BitIndex`], applies the distance threshold and,
//! on a match, toggles the identity between clocked in and clocked out.
//!
//! # Collaborators
//!
//! - [`kiosk_signature::SignatureGenerator`]: image to signature
//! - [`AttendanceLedger`]: attendance history
//! - [`IdentityDirectory`]: enrolled identities for manual fallback
//!
//! Generator and ledger calls run under a bounded [`RetryPolicy`]; only
//! timeouts are retried.
//!
//! # Conventions
//!
//! Probes are ranked through a [`MatchStrategy`]; the one shipped is
//! [`HammingStrategy`]. Similarity is Hamming distance, lower is better. A
//! candidate matches when its distance is at most `max_distance`. The
//! default of 40 bits out of 128 must be calibrated against real
//! enrollment/probe pairs.

mod config;
mod decision;
mod directory;
mod error;
mod kiosk;
mod ledger;
mod retry;
mod state;
mod strategy;

pub use config::{
    Config, GeneratorSection, MatchConfig, ProjectorConfig, RetryConfig, DEFAULT_BASE_DIR,
    DEFAULT_CONFIG_FILE,
};
pub use decision::{decide, decide_results, Decision};
pub use directory::{Identity, IdentityDirectory, StoreDirectory, NAME_KEY};
pub use error::{Failure, KioskError};
pub use kiosk::{CheckIn, Kiosk, Recognition};
pub use ledger::{AttendanceLedger, LedgerEntry, LedgerError, MemoryLedger};
pub use retry::{RetryPolicy, Transient};
pub use state::{next_action, Action, AttendanceStatus};
pub use strategy::{HammingStrategy, MatchStrategy, StrategyKind};
