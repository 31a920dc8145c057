use kiosk_bitindex::QueryResult;
use serde::Serialize;

/// Outcome of applying the distance threshold to the best candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub matched: bool,

    /// Matched identity; `None` unless `matched`.
    pub id: Option<String>,

    /// Distance of the best candidate, if there was one.
    pub distance: Option<u32>,

    /// The `max_distance` that was applied.
    pub threshold: u32,
}

/// Matches iff a best candidate exists and its distance is at most
/// `max_distance`.
pub fn decide(best: Option<&QueryResult>, max_distance: u32) -> Decision {
    match best {
        Some(r) if r.distance <= max_distance => Decision {
            matched: true,
            id: Some(r.record.id.clone()),
            distance: Some(r.distance),
            threshold: max_distance,
        },
        Some(r) => Decision {
            matched: false,
            id: None,
            distance: Some(r.distance),
            threshold: max_distance,
        },
        None => Decision {
            matched: false,
            id: None,
            distance: None,
            threshold: max_distance,
        },
    }
}

/// [`decide`] on the first entry of a ranked result list.
pub fn decide_results(results: &[QueryResult], max_distance: u32) -> Decision {
    decide(results.first(), max_distance)
}

#[cfg(test)]
mod tests {
    use kiosk_bitindex::{BinaryVector, EntityRecord};

    use super::*;

    fn hit(id: &str, distance: u32) -> QueryResult {
        QueryResult {
            record: EntityRecord::new(id, BinaryVector::zeros(128)),
            distance,
        }
    }

    #[test]
    fn within_threshold_matches() {
        let d = decide(Some(&hit("a", 5)), 40);
        assert!(d.matched);
        assert_eq!(d.id.as_deref(), Some("a"));
        assert_eq!(d.distance, Some(5));
        assert_eq!(d.threshold, 40);
    }

    #[test]
    fn threshold_is_inclusive() {
        assert!(decide(Some(&hit("a", 40)), 40).matched);
        assert!(!decide(Some(&hit("a", 41)), 40).matched);
    }

    #[test]
    fn best_over_threshold_does_not_match() {
        let d = decide(Some(&hit("a", 45)), 40);
        assert!(!d.matched);
        assert_eq!(d.id, None);
        assert_eq!(d.distance, Some(45));
    }

    #[test]
    fn no_candidate_does_not_match() {
        let d = decide(None, 128);
        assert!(!d.matched);
        assert_eq!(d.distance, None);
        assert!(!decide_results(&[], 40).matched);
    }

    #[test]
    fn decide_results_uses_first() {
        let d = decide_results(&[hit("a", 5), hit("b", 38)], 40);
        assert_eq!(d.id.as_deref(), Some("a"));
    }
}
