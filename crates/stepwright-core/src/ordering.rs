//! Ordering engine for a single workflow's steps.
//!
//! `StepSequence` is the only place where `step_order` values are assigned.
//! The vector position of a step *is* its order: every operation first builds
//! the desired final arrangement of the vector and then calls [`renumber`],
//! which writes `index + 1` into each step. Because renumbering always runs
//! over the whole collection, the sequence holds orders `1..=N` after every
//! successful operation, and failed operations leave it untouched.
//!
//! [`renumber`]: StepSequence::renumber

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use stepwright_types::error::WorkflowError;
use stepwright_types::workflow::{
    MAX_NAME_LEN, StepDraft, StepId, Workflow, WorkflowId, WorkflowStep,
};

/// Suffix appended to the name of a duplicated step.
const COPY_SUFFIX: &str = " (Copy)";

/// In-memory ordered steps of one workflow.
#[derive(Debug, Clone)]
pub struct StepSequence {
    workflow_id: WorkflowId,
    steps: Vec<WorkflowStep>,
}

impl StepSequence {
    /// Build a sequence from steps in any order.
    ///
    /// Steps are sorted by their stored order (ties keep input order) and
    /// renumbered, so a sequence is contiguous from the moment it exists.
    pub fn new(workflow_id: WorkflowId, mut steps: Vec<WorkflowStep>) -> Self {
        steps.sort_by_key(|s| s.step_order);
        let mut seq = Self { workflow_id, steps };
        seq.renumber();
        seq
    }

    /// Sequence over a copy of the workflow's steps.
    pub fn from_workflow(workflow: &Workflow) -> Self {
        Self::new(workflow.id, workflow.steps.clone())
    }

    pub fn workflow_id(&self) -> WorkflowId {
        self.workflow_id
    }

    pub fn steps(&self) -> &[WorkflowStep] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<WorkflowStep> {
        self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, step_id: &StepId) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| &s.id == step_id)
    }

    /// Order the next appended step would receive.
    pub fn next_order(&self) -> u32 {
        self.steps.len() as u32 + 1
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Append a step at `max + 1` (1 for an empty workflow).
    pub fn append(&mut self, draft: StepDraft) -> WorkflowStep {
        let step = WorkflowStep::from_draft(self.workflow_id, draft, self.next_order());
        self.steps.push(step.clone());
        self.renumber();
        step
    }

    /// Insert a step directly after `source_id`.
    ///
    /// Every step previously at or above `source.order + 1` moves up by one.
    pub fn insert_after(
        &mut self,
        source_id: &StepId,
        draft: StepDraft,
    ) -> Result<WorkflowStep, WorkflowError> {
        let index = self.position(source_id)? + 1;
        let step = WorkflowStep::from_draft(self.workflow_id, draft, index as u32 + 1);
        self.steps.insert(index, step);
        self.renumber();
        Ok(self.steps[index].clone())
    }

    /// Copy a step (fields only, name suffixed) and insert it after the source.
    pub fn duplicate(&mut self, source_id: &StepId) -> Result<WorkflowStep, WorkflowError> {
        let index = self.position(source_id)?;
        let mut draft = self.steps[index].to_draft();
        draft.name = copy_name(&draft.name);
        self.insert_after(source_id, draft)
    }

    /// Remove a step and close the gap it leaves.
    pub fn remove(&mut self, step_id: &StepId) -> Result<WorkflowStep, WorkflowError> {
        let index = self.position(step_id)?;
        let removed = self.steps.remove(index);
        self.renumber();
        Ok(removed)
    }

    /// Replace the descriptive fields of a step.
    ///
    /// Identity, ownership, order and creation time are kept from the stored
    /// step whatever `updated` carries.
    pub fn update_fields(
        &mut self,
        step_id: &StepId,
        updated: WorkflowStep,
    ) -> Result<WorkflowStep, WorkflowError> {
        let index = self.position(step_id)?;
        let current = &mut self.steps[index];
        *current = WorkflowStep {
            id: current.id,
            workflow_id: current.workflow_id,
            step_order: current.step_order,
            created_at: current.created_at,
            updated_at: Utc::now(),
            ..updated
        };
        Ok(current.clone())
    }

    /// Reorder all steps to match `ordered_ids`.
    ///
    /// The list must be an exact permutation of the owned ids. Checks run in
    /// this order and the first offending id is reported: an id not owned by
    /// the workflow, a repeated id, then an owned id missing from the list.
    /// On any failure nothing changes.
    pub fn reorder(&mut self, ordered_ids: &[StepId]) -> Result<(), WorkflowError> {
        let owned: HashSet<StepId> = self.steps.iter().map(|s| s.id).collect();
        let mut seen: HashSet<StepId> = HashSet::with_capacity(ordered_ids.len());

        for id in ordered_ids {
            if !owned.contains(id) {
                return Err(WorkflowError::InvalidReorder(format!("Invalid step ID: {id}")));
            }
            if !seen.insert(*id) {
                return Err(WorkflowError::InvalidReorder(format!("Duplicate step ID: {id}")));
            }
        }

        if let Some(missing) = self.steps.iter().find(|s| !seen.contains(&s.id)) {
            return Err(WorkflowError::InvalidReorder(format!(
                "Missing step ID: {}",
                missing.id
            )));
        }

        let rank: HashMap<StepId, usize> = ordered_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, i))
            .collect();
        self.steps
            .sort_by_key(|s| rank.get(&s.id).copied().unwrap_or(usize::MAX));
        self.renumber();
        Ok(())
    }

    /// Append drafts in order at `len + 1, len + 2, ...`. Returns the count.
    pub fn bulk_append(&mut self, drafts: impl IntoIterator<Item = StepDraft>) -> usize {
        let before = self.steps.len();
        for draft in drafts {
            let order = self.next_order();
            self.steps
                .push(WorkflowStep::from_draft(self.workflow_id, draft, order));
        }
        self.renumber();
        self.steps.len() - before
    }

    /// Remove every step. The next append lands at order 1.
    pub fn clear_all(&mut self) -> Vec<WorkflowStep> {
        std::mem::take(&mut self.steps)
    }

    /// Check that orders are exactly `1..=N` in vector order.
    pub fn verify_contiguous(&self) -> Result<(), WorkflowError> {
        if is_contiguous(&self.steps) {
            Ok(())
        } else {
            Err(WorkflowError::StorageError(format!(
                "step orders of workflow {} are not contiguous",
                self.workflow_id
            )))
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Assign `order = index + 1` to every step.
    fn renumber(&mut self) {
        let now = Utc::now();
        for (index, step) in self.steps.iter_mut().enumerate() {
            let order = index as u32 + 1;
            if step.step_order != order {
                step.step_order = order;
                step.updated_at = now;
            }
        }
    }

    fn position(&self, step_id: &StepId) -> Result<usize, WorkflowError> {
        self.steps
            .iter()
            .position(|s| &s.id == step_id)
            .ok_or(WorkflowError::OwnershipMismatch {
                step_id: *step_id,
                workflow_id: self.workflow_id,
            })
    }
}

/// True when the steps carry orders `1, 2, ..., N` in slice order.
pub fn is_contiguous(steps: &[WorkflowStep]) -> bool {
    steps
        .iter()
        .enumerate()
        .all(|(i, s)| s.step_order as usize == i + 1)
}

/// Name for a duplicated step, kept within the name length limit.
fn copy_name(name: &str) -> String {
    let budget = MAX_NAME_LEN - COPY_SUFFIX.chars().count();
    let base: String = name.chars().take(budget).collect();
    format!("{base}{COPY_SUFFIX}")
}
