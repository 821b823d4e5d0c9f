use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::models::{AssignmentId, AssignmentSummary, DateRange, ExpertId};
use crate::store::{AssignmentQuery, Store};

use super::{EngineError, EngineResult};

/// Outcome of an availability check.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Availability {
    pub available: bool,
    pub conflicts: Vec<AssignmentSummary>,
}

impl Availability {
    fn from_conflicts(conflicts: Vec<AssignmentSummary>) -> Self {
        Self {
            available: conflicts.is_empty(),
            conflicts,
        }
    }

    /// Turn an unavailable result into a `Conflict` error.
    pub fn into_result(self) -> EngineResult<()> {
        if self.available {
            Ok(())
        } else {
            Err(EngineError::Conflict {
                conflicts: self.conflicts,
            })
        }
    }
}

pub(crate) fn ensure_well_formed(range: &DateRange) -> EngineResult<()> {
    if range.is_well_formed() {
        Ok(())
    } else {
        Err(EngineError::InvalidRange {
            start: range.start,
            end: range.end,
        })
    }
}

/// Read-only conflict detection over one expert's bookings.
pub struct AvailabilityChecker<S: Store> {
    store: Arc<S>,
}

impl<S: Store> Clone for AvailabilityChecker<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store> AvailabilityChecker<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Check a proposed `YYYY-MM-DD` range for `expert_id`.
    ///
    /// Malformed dates are rejected before the store is queried. `exclude`
    /// skips the assignment being edited so it never conflicts with itself.
    pub async fn check(
        &self,
        expert_id: ExpertId,
        start_date: &str,
        end_date: &str,
        exclude: Option<AssignmentId>,
    ) -> EngineResult<Availability> {
        let range = DateRange::parse(start_date, end_date)?;
        ensure_well_formed(&range)?;
        self.check_range(expert_id, range, exclude).await
    }

    /// Conflicts are every non-cancelled booking of the expert whose inclusive
    /// interval overlaps `range`, ordered by start date then id.
    pub async fn check_range(
        &self,
        expert_id: ExpertId,
        range: DateRange,
        exclude: Option<AssignmentId>,
    ) -> EngineResult<Availability> {
        let query = AssignmentQuery::holding_slots(expert_id).excluding(exclude);
        let mut overlapping: Vec<_> = self
            .store
            .assignments(&query)
            .await?
            .into_iter()
            .filter(|a| a.range().overlaps(&range))
            .collect();
        overlapping.sort_by_key(|a| (a.start_date, a.id));

        debug!(
            "Availability for expert {} on {}: {} conflict(s)",
            expert_id,
            range,
            overlapping.len()
        );

        Ok(Availability::from_conflicts(
            overlapping.iter().map(|a| a.summary()).collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        parse_date, Assignment, AssignmentDetails, AssignmentDraft, AssignmentStatus,
    };
    use crate::store::MemoryStore;

    async fn book(store: &MemoryStore, expert_id: ExpertId, start: &str, end: &str) -> Assignment {
        store
            .insert_assignment(AssignmentDraft {
                expert_id,
                range: DateRange::parse(start, end).unwrap(),
                details: AssignmentDetails {
                    case_file: format!("EXP-{}-{}", expert_id, start),
                    ..Default::default()
                },
            })
            .await
            .unwrap()
    }

    async fn create_test_checker(
    ) -> (AvailabilityChecker<MemoryStore>, Arc<MemoryStore>, Assignment) {
        let store = Arc::new(MemoryStore::new());
        let existing = book(&store, 1, "2025-03-01", "2025-03-05").await;
        (AvailabilityChecker::new(Arc::clone(&store)), store, existing)
    }

    #[tokio::test]
    async fn overlapping_request_reports_conflict() {
        let (checker, _store, existing) = create_test_checker().await;

        let result = checker.check(1, "2025-03-04", "2025-03-10", None).await.unwrap();

        assert!(!result.available);
        assert_eq!(result.conflicts, vec![existing.summary()]);
    }

    #[tokio::test]
    async fn adjacent_request_is_available() {
        let (checker, _store, _existing) = create_test_checker().await;

        let result = checker.check(1, "2025-03-06", "2025-03-10", None).await.unwrap();

        assert!(result.available);
        assert!(result.conflicts.is_empty());
    }

    #[tokio::test]
    async fn excluded_assignment_does_not_conflict_with_itself() {
        let (checker, _store, existing) = create_test_checker().await;

        let result = checker
            .check(1, "2025-03-02", "2025-03-06", Some(existing.id))
            .await
            .unwrap();

        assert!(result.available);
    }

    #[tokio::test]
    async fn other_experts_and_cancelled_bookings_are_ignored() {
        let (checker, store, existing) = create_test_checker().await;
        book(&store, 2, "2025-03-01", "2025-03-31").await;

        let mut cancelled = existing.clone();
        cancelled.status = AssignmentStatus::Cancelled;
        store.replace_assignment(&cancelled).await.unwrap();

        let result = checker.check(1, "2025-03-01", "2025-03-05", None).await.unwrap();
        assert!(result.available);
    }

    #[tokio::test]
    async fn conflicts_are_ordered_by_start_date() {
        let (checker, store, first) = create_test_checker().await;
        let earlier = book(&store, 1, "2025-02-20", "2025-02-28").await;
        let later = book(&store, 1, "2025-03-10", "2025-03-12").await;

        let result = checker.check(1, "2025-02-25", "2025-03-11", None).await.unwrap();

        let ids: Vec<_> = result.conflicts.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![earlier.id, first.id, later.id]);
    }

    #[tokio::test]
    async fn malformed_date_is_rejected() {
        let (checker, _store, _existing) = create_test_checker().await;

        let err = checker.check(1, "2025-03-04", "10/03/2025", None).await.unwrap_err();
        assert!(matches!(err, EngineError::DateFormat { ref value } if value == "10/03/2025"));
    }

    #[tokio::test]
    async fn inverted_range_is_rejected() {
        let (checker, _store, _existing) = create_test_checker().await;

        let err = checker.check(1, "2025-03-10", "2025-03-04", None).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidRange { .. }));
    }

    #[test]
    fn into_result_maps_conflicts() {
        let summary = AssignmentSummary {
            id: 1,
            case_file: String::new(),
            start_date: parse_date("2025-03-01").unwrap(),
            end_date: parse_date("2025-03-02").unwrap(),
            notes: String::new(),
        };
        assert!(Availability::from_conflicts(Vec::new()).into_result().is_ok());
        assert!(matches!(
            Availability::from_conflicts(vec![summary]).into_result(),
            Err(EngineError::Conflict { conflicts }) if conflicts.len() == 1
        ));
    }
}
