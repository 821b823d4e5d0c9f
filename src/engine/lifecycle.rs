use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::models::{
    Assignment, AssignmentDraft, AssignmentField, AssignmentId, AssignmentPatch,
    AssignmentStatus, AssignmentView, DateRange, ExpertId, HistoryAction, HistoryEntry,
    NewAssignment,
};
use crate::store::{AssignmentQuery, Store, StoreLease};

use super::availability::{ensure_well_formed, Availability, AvailabilityChecker};
use super::audit::AuditLog;
use super::locks::{ExpertGuard, ExpertLocks};
use super::{EngineError, EngineResult};

/// How updates are screened for double bookings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvailabilityPolicy {
    /// When false, an update is only re-checked if it names expert, start and
    /// end together. When true, any change to one of them is merged with the
    /// stored values and re-checked.
    #[serde(default)]
    pub recheck_partial_updates: bool,
}

/// Optional conjunction of list filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub status: Option<AssignmentStatus>,
    pub expert_id: Option<ExpertId>,
    pub starts_from: Option<NaiveDate>,
    pub ends_until: Option<NaiveDate>,
}

impl ListFilter {
    fn to_query(&self) -> AssignmentQuery {
        AssignmentQuery {
            expert_id: self.expert_id,
            status: self.status,
            starts_on_or_after: self.starts_from,
            ends_on_or_before: self.ends_until,
            ..Default::default()
        }
    }
}

/// Expert locks and store lease held for one mutation. Dropped in field
/// order, so the lease goes first.
struct Held {
    _lease: StoreLease,
    _guard: ExpertGuard,
}

/// Create, edit, cancel and advance assignments without double-booking
/// an expert.
pub struct AssignmentManager<S: Store> {
    store: Arc<S>,
    checker: AvailabilityChecker<S>,
    audit: AuditLog<S>,
    locks: ExpertLocks,
    policy: AvailabilityPolicy,
}

impl<S: Store> AssignmentManager<S> {
    pub fn new(store: Arc<S>, policy: AvailabilityPolicy) -> Self {
        Self {
            checker: AvailabilityChecker::new(Arc::clone(&store)),
            audit: AuditLog::new(Arc::clone(&store)),
            store,
            locks: ExpertLocks::new(),
            policy,
        }
    }

    pub fn policy(&self) -> &AvailabilityPolicy {
        &self.policy
    }

    pub async fn check_availability(
        &self,
        expert_id: ExpertId,
        start_date: &str,
        end_date: &str,
        exclude: Option<AssignmentId>,
    ) -> EngineResult<Availability> {
        self.checker
            .check(expert_id, start_date, end_date, exclude)
            .await
    }

    /// Book an expert. Nothing is written if the range conflicts.
    pub async fn create(&self, request: NewAssignment) -> EngineResult<AssignmentId> {
        let range = DateRange::parse(&request.start_date, &request.end_date)?;
        ensure_well_formed(&range)?;
        self.require_bookable(request.expert_id).await?;

        let _guard = self.locks.lock(request.expert_id).await;
        let _lease = self.store.lease().await?;

        self.checker
            .check_range(request.expert_id, range, None)
            .await?
            .into_result()
            .map_err(|e| {
                warn!(
                    "Rejected booking for expert {} on {}: conflicts",
                    request.expert_id, range
                );
                e
            })?;

        let draft = AssignmentDraft {
            expert_id: request.expert_id,
            range,
            details: request.details,
        };
        let stored = self
            .audit
            .insert_recorded(draft, "Assignment created")
            .await?;

        info!(
            "Created assignment {} for expert {} on {}",
            stored.id, stored.expert_id, range
        );
        Ok(stored.id)
    }

    /// Apply a partial update and return the fields written.
    pub async fn update(
        &self,
        id: AssignmentId,
        patch: &AssignmentPatch,
    ) -> EngineResult<Vec<AssignmentField>> {
        if patch.is_empty() {
            return Err(EngineError::NoFields);
        }
        let dates = patch.parse_dates()?;
        if let Some(target) = patch.expert_id {
            self.require_known(target).await?;
        }

        let (current, _held) = self.lock_assignment(id, patch.expert_id).await?;

        let mut updated = current.clone();
        let applied = patch.apply(&mut updated, &dates);

        if dates.start.is_some() || dates.end.is_some() {
            ensure_well_formed(&updated.range())?;
        }

        if let Some(next) = patch.status {
            if next != current.status && !current.status.can_transition_to(next) {
                return Err(EngineError::InvalidTransition {
                    from: current.status,
                    to: next,
                });
            }
        }

        if updated.expert_id != current.expert_id {
            self.require_bookable(updated.expert_id).await?;
        }

        if self.needs_recheck(patch) && updated.holds_slot() {
            self.checker
                .check_range(updated.expert_id, updated.range(), Some(id))
                .await?
                .into_result()
                .map_err(|e| {
                    warn!(
                        "Rejected update of assignment {}: expert {} busy on {}",
                        id,
                        updated.expert_id,
                        updated.range()
                    );
                    e
                })?;
        } else if patch.touches_schedule() {
            debug!(
                "Assignment {}: partial schedule change applied without availability check",
                id
            );
        }

        let names: Vec<&str> = applied.iter().map(|f| f.as_str()).collect();
        let detail = format!("Fields updated: {}", names.join(", "));
        if !self
            .audit
            .replace_recorded(&updated, HistoryAction::Modified, &detail)
            .await?
        {
            return Err(EngineError::AssignmentNotFound(id));
        }

        info!("Updated assignment {}: {}", id, names.join(", "));
        Ok(applied)
    }

    /// Soft-delete. Returns false when nothing changed: the id is unknown or
    /// the assignment is already cancelled. No history is written then.
    pub async fn cancel(&self, id: AssignmentId) -> EngineResult<bool> {
        let (current, _held) = match self.lock_assignment(id, None).await {
            Ok(found) => found,
            Err(EngineError::AssignmentNotFound(_)) => {
                debug!("Cancel of unknown assignment {} ignored", id);
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        self.cancel_locked(current).await
    }

    async fn cancel_locked(&self, current: Assignment) -> EngineResult<bool> {
        let id = current.id;
        if current.status == AssignmentStatus::Cancelled {
            debug!("Assignment {} already cancelled", id);
            return Ok(false);
        }

        let mut updated = current;
        updated.status = AssignmentStatus::Cancelled;
        if !self
            .audit
            .replace_recorded(&updated, HistoryAction::Cancelled, "Assignment cancelled")
            .await?
        {
            return Ok(false);
        }

        info!("Cancelled assignment {}", id);
        Ok(true)
    }

    /// Move an assignment along its lifecycle. Cancellation is routed through
    /// [`cancel`](Self::cancel).
    pub async fn advance(&self, id: AssignmentId, next: AssignmentStatus) -> EngineResult<()> {
        let (current, _held) = self.lock_assignment(id, None).await?;
        if !current.status.can_transition_to(next) {
            return Err(EngineError::InvalidTransition {
                from: current.status,
                to: next,
            });
        }

        if next == AssignmentStatus::Cancelled {
            self.cancel_locked(current).await?;
            return Ok(());
        }

        let from = current.status;
        let mut updated = current;
        updated.status = next;
        let detail = format!("Status changed from {} to {}", from, next);
        if !self
            .audit
            .replace_recorded(&updated, HistoryAction::for_status(next), &detail)
            .await?
        {
            return Err(EngineError::AssignmentNotFound(id));
        }

        info!("Assignment {} moved from {} to {}", id, from, next);
        Ok(())
    }

    pub async fn get(&self, id: AssignmentId) -> EngineResult<AssignmentView> {
        let assignment = self.load(id).await?;
        let expert_name = self
            .store
            .expert(assignment.expert_id)
            .await?
            .map(|e| e.name);
        Ok(AssignmentView {
            assignment,
            expert_name,
        })
    }

    /// Matching assignments, latest start first; equal starts keep id order.
    pub async fn list(&self, filter: &ListFilter) -> EngineResult<Vec<AssignmentView>> {
        let mut assignments = self.store.assignments(&filter.to_query()).await?;
        assignments.sort_by(|a, b| b.start_date.cmp(&a.start_date).then(a.id.cmp(&b.id)));

        let names: HashMap<ExpertId, String> = self
            .store
            .experts()
            .await?
            .into_iter()
            .map(|e| (e.id, e.name))
            .collect();

        Ok(assignments
            .into_iter()
            .map(|assignment| AssignmentView {
                expert_name: names.get(&assignment.expert_id).cloned(),
                assignment,
            })
            .collect())
    }

    pub async fn history(&self, id: AssignmentId) -> EngineResult<Vec<HistoryEntry>> {
        self.audit.history_for(id).await
    }

    fn needs_recheck(&self, patch: &AssignmentPatch) -> bool {
        patch.sets_full_schedule()
            || (self.policy.recheck_partial_updates && patch.touches_schedule())
    }

    async fn load(&self, id: AssignmentId) -> EngineResult<Assignment> {
        self.store
            .assignment(id)
            .await?
            .ok_or(EngineError::AssignmentNotFound(id))
    }

    async fn require_known(&self, expert_id: ExpertId) -> EngineResult<()> {
        match self.store.expert(expert_id).await? {
            Some(_) => Ok(()),
            None => Err(EngineError::ExpertNotFound(expert_id)),
        }
    }

    async fn require_bookable(&self, expert_id: ExpertId) -> EngineResult<()> {
        let expert = self
            .store
            .expert(expert_id)
            .await?
            .ok_or(EngineError::ExpertNotFound(expert_id))?;
        if !expert.is_active() {
            return Err(EngineError::ExpertInactive(expert_id));
        }
        Ok(())
    }

    /// Load an assignment while holding the locks of its current expert and
    /// of `target`, plus the store lease, retrying if it changes hands
    /// between read and lock.
    async fn lock_assignment(
        &self,
        id: AssignmentId,
        target: Option<ExpertId>,
    ) -> EngineResult<(Assignment, Held)> {
        loop {
            let seen = self.load(id).await?;
            let mut experts = vec![seen.expert_id];
            experts.extend(target);

            let guard = self.locks.lock_all(&experts).await;
            let lease = self.store.lease().await?;
            let current = self.load(id).await?;
            if guard.covers(current.expert_id) {
                let held = Held {
                    _lease: lease,
                    _guard: guard,
                };
                return Ok((current, held));
            }

            debug!(
                "Assignment {} moved to expert {} while locking; retrying",
                id, current.expert_id
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::audit::failing_store::FailingHistoryStore;
    use crate::models::{parse_date, AssignmentDetails, Category, ExpertStatus, NewExpert};
    use crate::store::MemoryStore;

    type TestManager = (AssignmentManager<MemoryStore>, Arc<MemoryStore>, ExpertId, ExpertId);

    async fn create_test_manager_with(policy: AvailabilityPolicy) -> TestManager {
        let store = Arc::new(MemoryStore::new());
        let e1 = store
            .insert_expert(NewExpert::new("Ana Ruiz", Category::Computing))
            .await
            .unwrap();
        let e2 = store
            .insert_expert(NewExpert::new("Luis Vega", Category::Acoustic))
            .await
            .unwrap();
        let manager = AssignmentManager::new(Arc::clone(&store), policy);
        (manager, store, e1.id, e2.id)
    }

    async fn create_test_manager() -> TestManager {
        create_test_manager_with(AvailabilityPolicy::default()).await
    }

    fn booking(expert_id: ExpertId, start: &str, end: &str) -> NewAssignment {
        NewAssignment::new(expert_id, start, end)
    }

    #[tokio::test]
    async fn create_stores_pending_assignment_with_history() {
        let (manager, _store, e1, _) = create_test_manager().await;
        let request = booking(e1, "2025-03-01", "2025-03-05").with_details(AssignmentDetails {
            case_file: "EXP-001".to_string(),
            location: "Huancayo".to_string(),
            ..Default::default()
        });

        let id = manager.create(request).await.unwrap();

        let view = manager.get(id).await.unwrap();
        assert_eq!(view.assignment.status, AssignmentStatus::Pending);
        assert_eq!(view.assignment.details.case_file, "EXP-001");
        assert_eq!(view.assignment.details.agency, "");
        assert_eq!(view.expert_name.as_deref(), Some("Ana Ruiz"));

        let history = manager.history(id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, HistoryAction::Created);
    }

    #[tokio::test]
    async fn overlapping_create_fails_with_conflicts_and_writes_nothing() {
        let (manager, store, e1, _) = create_test_manager().await;
        let existing = manager.create(booking(e1, "2025-03-01", "2025-03-05")).await.unwrap();

        let err = manager
            .create(booking(e1, "2025-03-04", "2025-03-10"))
            .await
            .unwrap_err();

        let conflicts = err.conflicts().unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].id, existing);
        assert_eq!(
            store.assignments(&AssignmentQuery::default()).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn adjacent_create_succeeds() {
        let (manager, _store, e1, _) = create_test_manager().await;
        manager.create(booking(e1, "2025-03-01", "2025-03-05")).await.unwrap();

        let availability = manager
            .check_availability(e1, "2025-03-06", "2025-03-10", None)
            .await
            .unwrap();
        assert!(availability.available);
        assert!(manager.create(booking(e1, "2025-03-06", "2025-03-10")).await.is_ok());
    }

    #[tokio::test]
    async fn same_dates_for_different_experts_do_not_conflict() {
        let (manager, _store, e1, e2) = create_test_manager().await;
        manager.create(booking(e1, "2025-03-01", "2025-03-05")).await.unwrap();
        assert!(manager.create(booking(e2, "2025-03-01", "2025-03-05")).await.is_ok());
    }

    #[tokio::test]
    async fn create_rejects_unknown_and_inactive_experts() {
        let (manager, store, e1, _) = create_test_manager().await;

        let err = manager.create(booking(99, "2025-03-01", "2025-03-02")).await.unwrap_err();
        assert!(matches!(err, EngineError::ExpertNotFound(99)));

        store.set_expert_status(e1, ExpertStatus::Inactive).await.unwrap();
        let err = manager.create(booking(e1, "2025-03-01", "2025-03-02")).await.unwrap_err();
        assert!(matches!(err, EngineError::ExpertInactive(id) if id == e1));
    }

    #[tokio::test]
    async fn create_rejects_bad_dates_before_anything_else() {
        let (manager, _store, _, _) = create_test_manager().await;

        let err = manager.create(booking(99, "2025-3-1", "2025-03-02")).await.unwrap_err();
        assert!(matches!(err, EngineError::DateFormat { .. }));

        let err = manager.create(booking(99, "2025-03-09", "2025-03-02")).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidRange { .. }));
    }

    #[tokio::test]
    async fn update_own_dates_does_not_self_conflict() {
        let (manager, _store, e1, _) = create_test_manager().await;
        let id = manager.create(booking(e1, "2025-03-01", "2025-03-05")).await.unwrap();

        let patch = AssignmentPatch::default()
            .with_dates("2025-03-02", "2025-03-06")
            .with_expert(e1);
        let applied = manager.update(id, &patch).await.unwrap();

        assert_eq!(
            applied,
            vec![AssignmentField::StartDate, AssignmentField::EndDate, AssignmentField::ExpertId]
        );
        let view = manager.get(id).await.unwrap();
        assert_eq!(view.assignment.start_date, parse_date("2025-03-02").unwrap());
        assert_eq!(view.assignment.end_date, parse_date("2025-03-06").unwrap());
    }

    #[tokio::test]
    async fn full_schedule_update_into_conflict_is_rejected() {
        let (manager, _store, e1, e2) = create_test_manager().await;
        manager.create(booking(e1, "2025-03-01", "2025-03-05")).await.unwrap();
        let moving = manager.create(booking(e2, "2025-03-01", "2025-03-05")).await.unwrap();

        let patch = AssignmentPatch::default()
            .with_dates("2025-03-03", "2025-03-04")
            .with_expert(e1);
        let err = manager.update(moving, &patch).await.unwrap_err();

        assert!(matches!(err, EngineError::Conflict { .. }));
        assert_eq!(manager.get(moving).await.unwrap().assignment.expert_id, e2);
        assert_eq!(manager.history(moving).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn partial_update_skips_recheck_by_default() {
        let (manager, store, e1, _) = create_test_manager().await;
        manager.create(booking(e1, "2025-03-10", "2025-03-15")).await.unwrap();
        let id = manager.create(booking(e1, "2025-03-01", "2025-03-05")).await.unwrap();

        let patch = AssignmentPatch {
            end_date: Some("2025-03-12".to_string()),
            ..Default::default()
        };
        manager.update(id, &patch).await.unwrap();

        // The end-date-only edit now overlaps the later booking.
        let held = store
            .assignments(&AssignmentQuery::holding_slots(e1))
            .await
            .unwrap();
        assert!(held[0].range().overlaps(&held[1].range()));
    }

    #[tokio::test]
    async fn partial_update_is_rechecked_when_enabled() {
        let policy = AvailabilityPolicy {
            recheck_partial_updates: true,
        };
        let (manager, _store, e1, _) = create_test_manager_with(policy).await;
        manager.create(booking(e1, "2025-03-10", "2025-03-15")).await.unwrap();
        let id = manager.create(booking(e1, "2025-03-01", "2025-03-05")).await.unwrap();

        let patch = AssignmentPatch {
            end_date: Some("2025-03-12".to_string()),
            ..Default::default()
        };
        let err = manager.update(id, &patch).await.unwrap_err();
        assert!(matches!(err, EngineError::Conflict { .. }));

        let patch = AssignmentPatch {
            end_date: Some("2025-03-09".to_string()),
            ..Default::default()
        };
        assert!(manager.update(id, &patch).await.is_ok());
    }

    #[tokio::test]
    async fn partial_update_cannot_invert_range() {
        let (manager, _store, e1, _) = create_test_manager().await;
        let id = manager.create(booking(e1, "2025-03-05", "2025-03-10")).await.unwrap();

        let patch = AssignmentPatch {
            end_date: Some("2025-03-01".to_string()),
            ..Default::default()
        };
        let err = manager.update(id, &patch).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidRange { .. }));
    }

    #[tokio::test]
    async fn update_records_changed_field_names() {
        let (manager, _store, e1, _) = create_test_manager().await;
        let id = manager.create(booking(e1, "2025-03-01", "2025-03-05")).await.unwrap();

        let patch = AssignmentPatch {
            notes: Some("bring equipment".to_string()),
            agency: Some("Fiscalia".to_string()),
            ..Default::default()
        };
        manager.update(id, &patch).await.unwrap();

        let view = manager.get(id).await.unwrap();
        assert_eq!(view.assignment.details.notes, "bring equipment");
        assert_eq!(view.assignment.start_date, parse_date("2025-03-01").unwrap());

        let history = manager.history(id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].action, HistoryAction::Modified);
        assert_eq!(history[1].detail, "Fields updated: agency, notes");
    }

    #[tokio::test]
    async fn update_errors() {
        let (manager, _store, e1, _) = create_test_manager().await;
        let id = manager.create(booking(e1, "2025-03-01", "2025-03-05")).await.unwrap();

        let err = manager.update(id, &AssignmentPatch::default()).await.unwrap_err();
        assert!(matches!(err, EngineError::NoFields));

        let patch = AssignmentPatch {
            notes: Some("x".to_string()),
            ..Default::default()
        };
        let err = manager.update(404, &patch).await.unwrap_err();
        assert!(matches!(err, EngineError::AssignmentNotFound(404)));

        let patch = AssignmentPatch {
            start_date: Some("next week".to_string()),
            ..Default::default()
        };
        let err = manager.update(id, &patch).await.unwrap_err();
        assert!(matches!(err, EngineError::DateFormat { .. }));
    }

    #[tokio::test]
    async fn move_to_unknown_expert_fails_before_locking() {
        let (manager, store, e1, _) = create_test_manager().await;
        let id = manager.create(booking(e1, "2025-03-01", "2025-03-05")).await.unwrap();

        for unknown in 900..950 {
            let patch = AssignmentPatch::default().with_expert(unknown);
            let err = manager.update(id, &patch).await.unwrap_err();
            assert!(matches!(err, EngineError::ExpertNotFound(e) if e == unknown));
        }

        assert!(manager.locks.tracked() <= 1);
        let stored = store.assignment(id).await.unwrap().unwrap();
        assert_eq!(stored.expert_id, e1);
        assert_eq!(manager.history(id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_status_follows_state_machine() {
        let (manager, _store, e1, _) = create_test_manager().await;
        let id = manager.create(booking(e1, "2025-03-01", "2025-03-05")).await.unwrap();

        let completed = AssignmentPatch {
            status: Some(AssignmentStatus::Completed),
            ..Default::default()
        };
        let err = manager.update(id, &completed).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidTransition {
                from: AssignmentStatus::Pending,
                to: AssignmentStatus::Completed
            }
        ));

        let started = AssignmentPatch {
            status: Some(AssignmentStatus::InProcess),
            ..Default::default()
        };
        manager.update(id, &started).await.unwrap();
        manager.update(id, &completed).await.unwrap();
        assert_eq!(
            manager.get(id).await.unwrap().assignment.status,
            AssignmentStatus::Completed
        );
    }

    #[tokio::test]
    async fn cancelled_assignment_accepts_field_edits_but_not_reopening() {
        let (manager, _store, e1, _) = create_test_manager().await;
        let id = manager.create(booking(e1, "2025-03-01", "2025-03-05")).await.unwrap();
        manager.cancel(id).await.unwrap();

        let notes = AssignmentPatch {
            notes: Some("archived".to_string()),
            ..Default::default()
        };
        assert!(manager.update(id, &notes).await.is_ok());

        let reopen = AssignmentPatch {
            status: Some(AssignmentStatus::Pending),
            ..Default::default()
        };
        assert!(matches!(
            manager.update(id, &reopen).await,
            Err(EngineError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn cancellation_frees_capacity() {
        let (manager, _store, e1, _) = create_test_manager().await;
        let id = manager.create(booking(e1, "2025-03-01", "2025-03-05")).await.unwrap();

        assert!(manager.create(booking(e1, "2025-03-01", "2025-03-05")).await.is_err());
        assert!(manager.cancel(id).await.unwrap());
        assert!(manager.create(booking(e1, "2025-03-01", "2025-03-05")).await.is_ok());

        let view = manager.get(id).await.unwrap();
        assert_eq!(view.assignment.status, AssignmentStatus::Cancelled);
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let (manager, _store, e1, _) = create_test_manager().await;
        let id = manager.create(booking(e1, "2025-03-01", "2025-03-05")).await.unwrap();

        assert!(manager.cancel(id).await.unwrap());
        assert!(!manager.cancel(id).await.unwrap());

        let actions: Vec<_> = manager
            .history(id)
            .await
            .unwrap()
            .into_iter()
            .map(|h| h.action)
            .collect();
        assert_eq!(actions, vec![HistoryAction::Created, HistoryAction::Cancelled]);
    }

    #[tokio::test]
    async fn cancel_unknown_id_is_noop() {
        let (manager, _store, _, _) = create_test_manager().await;
        assert!(!manager.cancel(77).await.unwrap());
        assert!(manager.history(77).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn advance_walks_lifecycle_with_history() {
        let (manager, _store, e1, _) = create_test_manager().await;
        let id = manager.create(booking(e1, "2025-03-01", "2025-03-05")).await.unwrap();

        manager.advance(id, AssignmentStatus::InProcess).await.unwrap();
        manager.advance(id, AssignmentStatus::Completed).await.unwrap();

        let err = manager.advance(id, AssignmentStatus::Cancelled).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));

        let history = manager.history(id).await.unwrap();
        let actions: Vec<_> = history.iter().map(|h| h.action).collect();
        assert_eq!(
            actions,
            vec![HistoryAction::Created, HistoryAction::Started, HistoryAction::Completed]
        );
        assert_eq!(history[2].detail, "Status changed from In Process to Completed");
    }

    #[tokio::test]
    async fn advance_to_cancelled_uses_cancel_path() {
        let (manager, _store, e1, _) = create_test_manager().await;
        let id = manager.create(booking(e1, "2025-03-01", "2025-03-05")).await.unwrap();

        manager.advance(id, AssignmentStatus::Cancelled).await.unwrap();

        let history = manager.history(id).await.unwrap();
        assert_eq!(history.last().unwrap().action, HistoryAction::Cancelled);
        assert!(manager.advance(id, AssignmentStatus::InProcess).await.is_err());
    }

    #[tokio::test]
    async fn audit_completeness_one_entry_per_mutation() {
        let (manager, _store, e1, _) = create_test_manager().await;
        let id = manager.create(booking(e1, "2025-03-01", "2025-03-05")).await.unwrap();

        let notes = AssignmentPatch {
            notes: Some("a".to_string()),
            ..Default::default()
        };
        manager.update(id, &notes).await.unwrap();
        manager.update(id, &notes).await.unwrap();
        manager.cancel(id).await.unwrap();

        let history = manager.history(id).await.unwrap();
        assert_eq!(history.len(), 4);
        assert!(history.windows(2).all(|w| w[0].recorded_at <= w[1].recorded_at));
        assert!(history.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn audit_failure_does_not_fail_mutation() {
        let store = Arc::new(FailingHistoryStore::default());
        let expert = store
            .insert_expert(NewExpert::new("Ana", Category::Accounting))
            .await
            .unwrap();
        let manager = AssignmentManager::new(Arc::clone(&store), AvailabilityPolicy::default());

        let id = manager
            .create(booking(expert.id, "2025-03-01", "2025-03-05"))
            .await
            .unwrap();
        assert!(manager.cancel(id).await.unwrap());

        assert_eq!(
            manager.get(id).await.unwrap().assignment.status,
            AssignmentStatus::Cancelled
        );
        assert!(manager.history(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_orders_by_start_descending_then_id() {
        let (manager, _store, e1, e2) = create_test_manager().await;
        let a = manager.create(booking(e1, "2025-03-01", "2025-03-02")).await.unwrap();
        let b = manager.create(booking(e2, "2025-03-10", "2025-03-12")).await.unwrap();
        let c = manager.create(booking(e1, "2025-03-10", "2025-03-11")).await.unwrap();

        let ids: Vec<_> = manager
            .list(&ListFilter::default())
            .await
            .unwrap()
            .iter()
            .map(|v| v.assignment.id)
            .collect();
        assert_eq!(ids, vec![b, c, a]);
    }

    #[tokio::test]
    async fn list_applies_filter_conjunction() {
        let (manager, _store, e1, e2) = create_test_manager().await;
        let early = manager.create(booking(e1, "2025-02-01", "2025-02-03")).await.unwrap();
        let mid = manager.create(booking(e1, "2025-03-01", "2025-03-05")).await.unwrap();
        manager.create(booking(e2, "2025-03-01", "2025-03-05")).await.unwrap();
        manager.cancel(early).await.unwrap();

        let by_expert = ListFilter {
            expert_id: Some(e1),
            ..Default::default()
        };
        assert_eq!(manager.list(&by_expert).await.unwrap().len(), 2);

        let pending_from_march = ListFilter {
            expert_id: Some(e1),
            status: Some(AssignmentStatus::Pending),
            starts_from: Some(parse_date("2025-03-01").unwrap()),
            ends_until: Some(parse_date("2025-03-05").unwrap()),
        };
        let views = manager.list(&pending_from_march).await.unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].assignment.id, mid);
        assert_eq!(views[0].expert_name.as_deref(), Some("Ana Ruiz"));

        let cancelled = ListFilter {
            status: Some(AssignmentStatus::Cancelled),
            ..Default::default()
        };
        assert_eq!(manager.list(&cancelled).await.unwrap()[0].assignment.id, early);
    }

    #[tokio::test]
    async fn get_unknown_assignment_is_not_found() {
        let (manager, _store, _, _) = create_test_manager().await;
        assert!(matches!(
            manager.get(5).await,
            Err(EngineError::AssignmentNotFound(5))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_identical_bookings_admit_exactly_one() {
        let (manager, _store, e1, _) = create_test_manager().await;
        let manager = Arc::new(manager);

        let attempts: Vec<_> = (0..2)
            .map(|_| {
                let manager = Arc::clone(&manager);
                tokio::spawn(async move {
                    manager.create(booking(e1, "2025-03-01", "2025-03-05")).await
                })
            })
            .collect();

        let results: Vec<_> = futures::future::join_all(attempts)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(r, Err(EngineError::Conflict { .. })))
                .count(),
            1
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_bookings_never_double_book() {
        let (manager, store, e1, _) = create_test_manager().await;
        let manager = Arc::new(manager);

        let attempts: Vec<_> = (0..32u32)
            .map(|i| {
                let manager = Arc::clone(&manager);
                let start = format!("2025-03-{:02}", 1 + i % 10);
                let end = format!("2025-03-{:02}", 3 + i % 10);
                tokio::spawn(async move { manager.create(booking(e1, &start, &end)).await })
            })
            .collect();
        let successes = futures::future::join_all(attempts)
            .await
            .into_iter()
            .filter(|r| matches!(r, Ok(Ok(_))))
            .count();

        let held = store
            .assignments(&AssignmentQuery::holding_slots(e1))
            .await
            .unwrap();
        assert_eq!(held.len(), successes);
        for (i, a) in held.iter().enumerate() {
            for b in &held[i + 1..] {
                assert!(!a.range().overlaps(&b.range()), "{} overlaps {}", a.id, b.id);
            }
        }
    }
}
