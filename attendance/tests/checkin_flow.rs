//! End-to-end kiosk flows against in-memory collaborators.
//! Run with: cargo test -p kiosk-attendance --test checkin_flow

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use kiosk_attendance::{
    Action, AttendanceLedger, AttendanceStatus, IdentityDirectory, Kiosk, LedgerEntry,
    LedgerError, MatchConfig, MemoryLedger, RetryPolicy,
};
use kiosk_bitindex::{BinaryVector, BitIndex, Metadata};
use kiosk_signature::{Signature, SignatureError, SignatureGenerator};

/// 128-bit vector with the lowest `n` bits set, as a hash signature.
fn ones(n: usize) -> Signature {
    let mut words = vec![0u64; 2];
    for i in 0..n {
        words[i / 64] |= 1 << (i % 64);
    }
    Signature::Hash(BinaryVector::from_words(128, words).unwrap().to_hex())
}

fn match_config(top_k: usize) -> MatchConfig {
    MatchConfig {
        bits: 128,
        binarize_threshold: 0.0,
        max_distance: 40,
        top_k,
        ..MatchConfig::default()
    }
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        timeout: Duration::from_secs(2),
        max_retries: 2,
        backoff: Duration::from_millis(5),
    }
}

fn new_kiosk(ledger: Arc<MemoryLedger>, top_k: usize) -> Kiosk {
    let index = Arc::new(BitIndex::native(128).unwrap());
    Kiosk::new(index, ledger, match_config(top_k))
        .unwrap()
        .with_retry(fast_retry())
}

/// Maps known images to fixed signatures. Unknown images have no face.
struct FakeGenerator {
    known: HashMap<Vec<u8>, Signature>,
    calls: AtomicU32,
    timeouts_first: u32,
}

impl FakeGenerator {
    fn new(known: &[(&[u8], Signature)]) -> Self {
        Self {
            known: known.iter().map(|(k, v)| (k.to_vec(), v.clone())).collect(),
            calls: AtomicU32::new(0),
            timeouts_first: 0,
        }
    }

    fn timing_out(mut self, n: u32) -> Self {
        self.timeouts_first = n;
        self
    }
}

#[async_trait::async_trait]
impl SignatureGenerator for FakeGenerator {
    async fn generate(&self, image: &[u8]) -> Result<Signature, SignatureError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.timeouts_first {
            return Err(SignatureError::Timeout("gateway timeout".into()));
        }
        self.known
            .get(image)
            .cloned()
            .ok_or_else(|| SignatureError::NoSignal("no face detected".into()))
    }
}

#[tokio::test]
async fn nearest_within_threshold_matches() {
    let kiosk = new_kiosk(Arc::new(MemoryLedger::new()), 1);
    kiosk.enroll_signature("A", &ones(5), Metadata::new()).unwrap();
    kiosk.enroll_signature("B", &ones(38), Metadata::new()).unwrap();

    let r = kiosk.recognize_signature(&ones(0)).unwrap();
    assert_eq!(r.candidates.len(), 1);
    assert!(r.decision.matched);
    assert_eq!(r.decision.id.as_deref(), Some("A"));
    assert_eq!(r.decision.distance, Some(5));
}

#[tokio::test]
async fn beyond_threshold_does_not_match() {
    let kiosk = new_kiosk(Arc::new(MemoryLedger::new()), 1);
    kiosk.enroll_signature("A", &ones(45), Metadata::new()).unwrap();

    let r = kiosk.recognize_signature(&ones(0)).unwrap();
    assert!(!r.decision.matched);
    assert_eq!(r.decision.id, None);
    assert_eq!(r.decision.distance, Some(45));
}

#[tokio::test]
async fn empty_index_does_not_match() {
    let ledger = Arc::new(MemoryLedger::new());
    let kiosk = new_kiosk(ledger.clone(), 1);

    let c = kiosk.check_in_signature(&ones(0)).await.unwrap();
    assert!(!c.decision.matched);
    assert_eq!(c.decision.distance, None);
    assert!(c.action.is_none());
    assert!(ledger.is_empty());
}

#[tokio::test]
async fn check_in_toggles() {
    let ledger = Arc::new(MemoryLedger::new());
    let kiosk = new_kiosk(ledger.clone(), 3);
    kiosk.enroll_signature("A", &ones(2), Metadata::new()).unwrap();
    kiosk.enroll_signature("B", &ones(90), Metadata::new()).unwrap();

    let mut actions = vec![];
    for _ in 0..3 {
        let c = kiosk.check_in_signature(&ones(0)).await.unwrap();
        assert_eq!(c.decision.id.as_deref(), Some("A"));
        let entry = c.entry.unwrap();
        assert_eq!(entry.identity, "A");
        actions.push(c.action.unwrap());
    }
    assert_eq!(actions, [Action::ClockIn, Action::ClockOut, Action::ClockIn]);
    assert_eq!(
        ledger.last_status("A").await.unwrap(),
        Some(AttendanceStatus::ClockedIn)
    );
    assert!(ledger.history("B").is_empty());
}

#[tokio::test]
async fn re_enrollment_replaces_vector() {
    let kiosk = new_kiosk(Arc::new(MemoryLedger::new()), 1);
    kiosk.enroll_signature("A", &ones(100), Metadata::new()).unwrap();
    assert!(!kiosk.recognize_signature(&ones(0)).unwrap().decision.matched);

    kiosk.enroll_signature("A", &ones(1), Metadata::new()).unwrap();
    assert_eq!(kiosk.index().len(), 1);
    assert!(kiosk.recognize_signature(&ones(0)).unwrap().decision.matched);

    assert!(kiosk.remove("A"));
    assert!(!kiosk.recognize_signature(&ones(0)).unwrap().decision.matched);
}

#[tokio::test]
async fn image_flow_through_generator() {
    let ledger = Arc::new(MemoryLedger::new());
    let generator = Arc::new(FakeGenerator::new(&[
        (&b"enroll-a"[..], ones(3)),
        (&b"probe-a"[..], ones(6)),
    ]));
    let kiosk = new_kiosk(ledger.clone(), 1).with_generator(generator);

    let mut meta = Metadata::new();
    meta.insert("name".into(), "Ada".into());
    kiosk.enroll("A", b"enroll-a", meta).await.unwrap();

    let c = kiosk.check_in(b"probe-a").await.unwrap();
    assert_eq!(c.decision.distance, Some(3));
    assert_eq!(c.action, Some(Action::ClockIn));

    let listed = kiosk.directory().list().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].display_name, "Ada");
}

#[tokio::test]
async fn no_face_is_reported_not_retried() {
    let generator = Arc::new(FakeGenerator::new(&[]));
    let kiosk = new_kiosk(Arc::new(MemoryLedger::new()), 1).with_generator(generator.clone());

    let err = kiosk.check_in(b"blank wall").await.unwrap_err();
    assert_eq!(err.kind(), "no_signal");
    assert_eq!(err.to_failure().kind, "no_signal");
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn generator_timeouts_are_retried() {
    let generator = Arc::new(FakeGenerator::new(&[(&b"probe"[..], ones(0))]).timing_out(2));
    let kiosk = new_kiosk(Arc::new(MemoryLedger::new()), 1).with_generator(generator.clone());
    kiosk.enroll_signature("A", &ones(1), Metadata::new()).unwrap();

    let r = kiosk.recognize(b"probe").await.unwrap();
    assert!(r.decision.matched);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn generator_timeouts_exhaust_retries() {
    let generator = Arc::new(FakeGenerator::new(&[(&b"probe"[..], ones(0))]).timing_out(10));
    let kiosk = new_kiosk(Arc::new(MemoryLedger::new()), 1).with_generator(generator.clone());

    let err = kiosk.recognize(b"probe").await.unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(err.kind(), "collaborator_timeout");
    assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn concurrent_check_ins_share_the_index() {
    let ledger = Arc::new(MemoryLedger::new());
    let kiosk = Arc::new(new_kiosk(ledger.clone(), 1));
    for i in 0..8 {
        kiosk
            .enroll_signature(&format!("e{i}"), &ones(i * 10), Metadata::new())
            .unwrap();
    }

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let kiosk = kiosk.clone();
            tokio::spawn(async move { kiosk.check_in_signature(&ones(i * 10)).await })
        })
        .collect();
    for (i, h) in handles.into_iter().enumerate() {
        let c = h.await.unwrap().unwrap();
        assert_eq!(c.decision.id, Some(format!("e{i}")));
        assert_eq!(c.action, Some(Action::ClockIn));
    }
    assert_eq!(ledger.len(), 8);
}

/// A ledger whose reads take a while, so unserialized check-ins would both
/// see the same last status.
struct SlowLedger(MemoryLedger);

#[async_trait::async_trait]
impl AttendanceLedger for SlowLedger {
    async fn last_status(&self, identity: &str) -> Result<Option<AttendanceStatus>, LedgerError> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        self.0.last_status(identity).await
    }

    async fn append(&self, identity: &str, action: Action) -> Result<LedgerEntry, LedgerError> {
        self.0.append(identity, action).await
    }
}

#[tokio::test(start_paused = true)]
async fn same_identity_check_ins_are_serialized() {
    let ledger = Arc::new(SlowLedger(MemoryLedger::new()));
    let index = Arc::new(BitIndex::scalar(128).unwrap());
    let kiosk = Kiosk::new(index, ledger.clone(), match_config(1))
        .unwrap()
        .with_retry(fast_retry());
    kiosk.enroll_signature("A", &ones(1), Metadata::new()).unwrap();

    let (sig_a, sig_b) = (ones(0), ones(2));
    let (a, b) = tokio::join!(
        kiosk.check_in_signature(&sig_a),
        kiosk.check_in_signature(&sig_b),
    );
    let mut actions = vec![a.unwrap().action.unwrap(), b.unwrap().action.unwrap()];
    actions.sort_by_key(|a| a.to_string());
    assert_eq!(actions, [Action::ClockIn, Action::ClockOut]);
    assert_eq!(ledger.0.len(), 2);
}
