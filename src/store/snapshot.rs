use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::{
    Assignment, AssignmentDraft, AssignmentId, AssignmentStatus, Expert, ExpertId, ExpertStatus,
    HistoryAction, HistoryEntry, NewExpert, NewHistoryEntry,
};

use super::{AssignmentQuery, StoreError, StoreResult};

/// Complete store contents. Both store back ends keep one of these in memory;
/// `YamlStore` also mirrors it to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct Snapshot {
    next_expert_id: ExpertId,
    next_assignment_id: AssignmentId,
    next_history_id: u64,
    #[serde(default)]
    experts: Vec<Expert>,
    #[serde(default)]
    assignments: Vec<Assignment>,
    #[serde(default)]
    history: Vec<HistoryEntry>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            next_expert_id: 1,
            next_assignment_id: 1,
            next_history_id: 1,
            experts: Vec::new(),
            assignments: Vec::new(),
            history: Vec::new(),
        }
    }
}

impl Snapshot {
    /// Reject documents whose ids collide or whose counters lag behind.
    pub fn validate(&self) -> StoreResult<()> {
        fn check_ids<T>(
            kind: &str,
            ids: impl Iterator<Item = T>,
            next: T,
        ) -> StoreResult<()>
        where
            T: Copy + Ord + std::hash::Hash + std::fmt::Display,
        {
            let mut seen = HashSet::new();
            for id in ids {
                if !seen.insert(id) {
                    return Err(StoreError::Corrupt(format!("duplicate {} id {}", kind, id)));
                }
                if id >= next {
                    return Err(StoreError::Corrupt(format!(
                        "{} id {} is not below the next id {}",
                        kind, id, next
                    )));
                }
            }
            Ok(())
        }

        check_ids("expert", self.experts.iter().map(|e| e.id), self.next_expert_id)?;
        check_ids(
            "assignment",
            self.assignments.iter().map(|a| a.id),
            self.next_assignment_id,
        )?;
        check_ids("history", self.history.iter().map(|h| h.id), self.next_history_id)?;
        Ok(())
    }

    pub fn expert(&self, id: ExpertId) -> Option<Expert> {
        self.experts.iter().find(|e| e.id == id).cloned()
    }

    pub fn experts(&self) -> Vec<Expert> {
        self.experts.clone()
    }

    pub fn insert_expert(&mut self, expert: NewExpert) -> Expert {
        let expert = Expert::new(self.next_expert_id, expert.name, expert.category);
        self.next_expert_id += 1;
        self.experts.push(expert.clone());
        expert
    }

    pub fn set_expert_status(&mut self, id: ExpertId, status: ExpertStatus) -> bool {
        match self.experts.iter_mut().find(|e| e.id == id) {
            Some(expert) => {
                expert.status = status;
                true
            }
            None => false,
        }
    }

    pub fn assignment(&self, id: AssignmentId) -> Option<Assignment> {
        self.assignments.iter().find(|a| a.id == id).cloned()
    }

    pub fn assignments(&self, query: &AssignmentQuery) -> Vec<Assignment> {
        let mut matched: Vec<Assignment> = self
            .assignments
            .iter()
            .filter(|a| query.matches(a))
            .cloned()
            .collect();
        matched.sort_by_key(|a| a.id);
        matched
    }

    pub fn insert_assignment(&mut self, draft: AssignmentDraft) -> Assignment {
        let assignment = Assignment {
            id: self.next_assignment_id,
            expert_id: draft.expert_id,
            start_date: draft.range.start,
            end_date: draft.range.end,
            status: AssignmentStatus::Pending,
            details: draft.details,
            registered_at: Utc::now(),
        };
        self.next_assignment_id += 1;
        self.assignments.push(assignment.clone());
        assignment
    }

    pub fn replace_assignment(&mut self, assignment: &Assignment) -> bool {
        match self.assignments.iter_mut().find(|a| a.id == assignment.id) {
            Some(slot) => {
                *slot = assignment.clone();
                true
            }
            None => false,
        }
    }

    pub fn append_history(&mut self, entry: NewHistoryEntry) -> HistoryEntry {
        let previous = self.history.last().map(|h| h.recorded_at);
        let entry = HistoryEntry {
            id: self.next_history_id,
            assignment_id: entry.assignment_id,
            action: entry.action,
            detail: entry.detail,
            recorded_at: HistoryEntry::next_timestamp(previous),
        };
        self.next_history_id += 1;
        self.history.push(entry.clone());
        entry
    }

    pub fn insert_assignment_recorded(
        &mut self,
        draft: AssignmentDraft,
        action: HistoryAction,
        detail: String,
    ) -> (Assignment, HistoryEntry) {
        let assignment = self.insert_assignment(draft);
        let entry = self.append_history(NewHistoryEntry::new(assignment.id, action, detail));
        (assignment, entry)
    }

    /// `None` if the assignment does not exist; nothing is written then.
    pub fn replace_assignment_recorded(
        &mut self,
        assignment: &Assignment,
        action: HistoryAction,
        detail: String,
    ) -> Option<HistoryEntry> {
        if !self.replace_assignment(assignment) {
            return None;
        }
        Some(self.append_history(NewHistoryEntry::new(assignment.id, action, detail)))
    }

    pub fn history(&self, assignment_id: AssignmentId) -> Vec<HistoryEntry> {
        self.history
            .iter()
            .filter(|h| h.assignment_id == assignment_id)
            .cloned()
            .collect()
    }
}
