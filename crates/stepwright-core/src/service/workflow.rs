//! Workflow step management service.
//!
//! Every mutating use case follows the same shape: load the workflow
//! aggregate, validate the input, run exactly one ordering-engine or
//! template operation on an in-memory `StepSequence`, then hand the complete
//! step set to the repository, which persists it in one transaction guarded
//! by the version that was loaded.

use chrono::Utc;
use tracing::{debug, info, warn};

use stepwright_types::error::WorkflowError;
use stepwright_types::template::WorkflowTemplate;
use stepwright_types::workflow::{
    NewWorkflowRequest, StepId, StepPayload, Workflow, WorkflowId, WorkflowStep,
};

use crate::ordering::StepSequence;
use crate::repository::workflow::WorkflowRepository;
use crate::template;
use crate::validation;

/// Service owning the workflow/step use cases.
///
/// Generic over the repository trait so stepwright-core never depends on
/// stepwright-infra.
pub struct WorkflowService<R: WorkflowRepository> {
    repo: R,
}

impl<R: WorkflowRepository> WorkflowService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Access the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    // -----------------------------------------------------------------------
    // Workflows
    // -----------------------------------------------------------------------

    /// Create an empty workflow.
    pub async fn create_workflow(
        &self,
        request: NewWorkflowRequest,
    ) -> Result<Workflow, WorkflowError> {
        validation::validate_new_workflow(&request).map_err(WorkflowError::Validation)?;

        let now = Utc::now();
        let workflow = Workflow {
            id: WorkflowId::new(),
            name: request.name.trim().to_string(),
            description: request.description.filter(|d| !d.trim().is_empty()),
            entity_type: request.entity_type.trim().to_string(),
            is_active: request.is_active.unwrap_or(true),
            version: 0,
            created_at: now,
            updated_at: now,
            steps: Vec::new(),
        };

        let workflow = self.repo.create_workflow(&workflow).await?;
        info!(workflow_id = %workflow.id, entity_type = %workflow.entity_type, "workflow created");
        Ok(workflow)
    }

    pub async fn get_workflow(&self, id: &WorkflowId) -> Result<Workflow, WorkflowError> {
        self.load(id).await
    }

    pub async fn list_workflows(&self) -> Result<Vec<Workflow>, WorkflowError> {
        Ok(self.repo.list_workflows().await?)
    }

    /// Delete a workflow together with its steps.
    pub async fn delete_workflow(&self, id: &WorkflowId) -> Result<(), WorkflowError> {
        if !self.repo.delete_workflow(id).await? {
            return Err(WorkflowError::NotFound);
        }
        info!(workflow_id = %id, "workflow deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Steps
    // -----------------------------------------------------------------------

    /// Steps of a workflow in order.
    pub async fn list_steps(&self, workflow_id: &WorkflowId) -> Result<Vec<WorkflowStep>, WorkflowError> {
        let workflow = self.load(workflow_id).await?;
        Ok(StepSequence::from_workflow(&workflow).into_steps())
    }

    /// Append a new step at the end of the workflow.
    pub async fn add_step(
        &self,
        workflow_id: &WorkflowId,
        payload: &StepPayload,
    ) -> Result<WorkflowStep, WorkflowError> {
        let workflow = self.load(workflow_id).await?;
        let draft = validation::validate_new_step(payload).map_err(WorkflowError::Validation)?;

        let mut sequence = StepSequence::from_workflow(&workflow);
        let step = sequence.append(draft);
        let version = self.commit(&workflow, &sequence).await?;

        info!(
            workflow_id = %workflow.id,
            step_id = %step.id,
            step_order = step.step_order,
            version,
            "step added"
        );
        Ok(step)
    }

    /// Update the descriptive fields of a step. Its order never changes.
    pub async fn update_step(
        &self,
        step_id: &StepId,
        payload: &StepPayload,
    ) -> Result<WorkflowStep, WorkflowError> {
        let workflow = self.load_for_step(step_id).await?;
        let mut sequence = StepSequence::from_workflow(&workflow);
        let current = sequence
            .get(step_id)
            .ok_or(WorkflowError::OwnershipMismatch {
                step_id: *step_id,
                workflow_id: workflow.id,
            })?;

        let merged = validation::apply_patch(current, payload).map_err(WorkflowError::Validation)?;
        let step = sequence.update_fields(step_id, merged)?;
        let version = self.commit(&workflow, &sequence).await?;

        info!(workflow_id = %workflow.id, step_id = %step.id, version, "step updated");
        Ok(step)
    }

    /// Delete a step; later steps move down to close the gap.
    pub async fn delete_step(&self, step_id: &StepId) -> Result<WorkflowStep, WorkflowError> {
        let workflow = self.load_for_step(step_id).await?;
        let mut sequence = StepSequence::from_workflow(&workflow);
        let removed = sequence.remove(step_id)?;
        let version = self.commit(&workflow, &sequence).await?;

        info!(
            workflow_id = %workflow.id,
            step_id = %removed.id,
            deleted_order = removed.step_order,
            remaining = sequence.len(),
            version,
            "step deleted"
        );
        Ok(removed)
    }

    /// Replace the order of all steps.
    ///
    /// `raw_ids` must name every step of the workflow exactly once. Ids that
    /// fail to parse are reported the same way as ids the workflow does not
    /// own, in list order.
    pub async fn reorder_steps(
        &self,
        workflow_id: &WorkflowId,
        raw_ids: &[String],
    ) -> Result<Vec<WorkflowStep>, WorkflowError> {
        let workflow = self.load(workflow_id).await?;
        let mut sequence = StepSequence::from_workflow(&workflow);

        let mut ids = Vec::with_capacity(raw_ids.len());
        for raw in raw_ids {
            match raw.parse::<StepId>() {
                Ok(id) if sequence.get(&id).is_some() => ids.push(id),
                _ => {
                    warn!(workflow_id = %workflow.id, step_id = %raw, "reorder rejected: foreign step id");
                    return Err(WorkflowError::InvalidReorder(format!("Invalid step ID: {raw}")));
                }
            }
        }

        if let Err(e) = sequence.reorder(&ids) {
            warn!(workflow_id = %workflow.id, error = %e, "reorder rejected");
            return Err(e);
        }

        let version = self.commit(&workflow, &sequence).await?;
        info!(workflow_id = %workflow.id, steps = sequence.len(), version, "steps reordered");
        Ok(sequence.into_steps())
    }

    /// Copy a step and insert the copy directly after it.
    pub async fn duplicate_step(&self, step_id: &StepId) -> Result<WorkflowStep, WorkflowError> {
        let workflow = self.load_for_step(step_id).await?;
        let mut sequence = StepSequence::from_workflow(&workflow);
        let copy = sequence.duplicate(step_id)?;
        let version = self.commit(&workflow, &sequence).await?;

        info!(
            workflow_id = %workflow.id,
            source_step_id = %step_id,
            step_id = %copy.id,
            step_order = copy.step_order,
            version,
            "step duplicated"
        );
        Ok(copy)
    }

    // -----------------------------------------------------------------------
    // Templates
    // -----------------------------------------------------------------------

    pub fn list_templates(&self) -> &'static [WorkflowTemplate] {
        template::templates()
    }

    /// Materialize a template into the workflow. Returns the steps added.
    pub async fn apply_template(
        &self,
        workflow_id: &WorkflowId,
        key: &str,
        clear_existing: bool,
    ) -> Result<usize, WorkflowError> {
        let workflow = self.load(workflow_id).await?;
        let mut sequence = StepSequence::from_workflow(&workflow);
        let added = template::apply_template(&mut sequence, key, clear_existing)?;
        let version = self.commit(&workflow, &sequence).await?;

        info!(
            workflow_id = %workflow.id,
            template = key,
            clear_existing,
            added,
            total = sequence.len(),
            version,
            "template applied"
        );
        Ok(added)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn load(&self, id: &WorkflowId) -> Result<Workflow, WorkflowError> {
        debug!(workflow_id = %id, "loading workflow");
        self.repo.get_workflow(id).await?.ok_or(WorkflowError::NotFound)
    }

    async fn load_for_step(&self, step_id: &StepId) -> Result<Workflow, WorkflowError> {
        let workflow_id = self
            .repo
            .find_workflow_id_for_step(step_id)
            .await?
            .ok_or(WorkflowError::StepNotFound)?;
        self.load(&workflow_id).await
    }

    /// Persist the sequence against the version the workflow was loaded at.
    async fn commit(&self, workflow: &Workflow, sequence: &StepSequence) -> Result<i64, WorkflowError> {
        sequence.verify_contiguous()?;
        self.repo
            .save_steps(&workflow.id, sequence.steps(), workflow.version)
            .await
            .map_err(|e| {
                warn!(workflow_id = %workflow.id, expected_version = workflow.version, error = %e, "step save failed");
                WorkflowError::from(e)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use stepwright_types::error::RepositoryError;

    // --- In-memory repository for testing ---

    #[derive(Default)]
    struct InMemoryWorkflowRepository {
        workflows: Mutex<HashMap<WorkflowId, Workflow>>,
        /// Fail the next save with a query error.
        fail_next_save: AtomicBool,
        /// Simulate another writer committing between load and save.
        interleave_next_save: AtomicBool,
    }

    impl WorkflowRepository for InMemoryWorkflowRepository {
        async fn create_workflow(&self, workflow: &Workflow) -> Result<Workflow, RepositoryError> {
            self.workflows
                .lock()
                .unwrap()
                .insert(workflow.id, workflow.clone());
            Ok(workflow.clone())
        }

        async fn get_workflow(&self, id: &WorkflowId) -> Result<Option<Workflow>, RepositoryError> {
            Ok(self.workflows.lock().unwrap().get(id).cloned())
        }

        async fn list_workflows(&self) -> Result<Vec<Workflow>, RepositoryError> {
            Ok(self.workflows.lock().unwrap().values().cloned().collect())
        }

        async fn delete_workflow(&self, id: &WorkflowId) -> Result<bool, RepositoryError> {
            Ok(self.workflows.lock().unwrap().remove(id).is_some())
        }

        async fn find_workflow_id_for_step(
            &self,
            step_id: &StepId,
        ) -> Result<Option<WorkflowId>, RepositoryError> {
            Ok(self
                .workflows
                .lock()
                .unwrap()
                .values()
                .find(|w| w.steps.iter().any(|s| &s.id == step_id))
                .map(|w| w.id))
        }

        async fn save_steps(
            &self,
            workflow_id: &WorkflowId,
            steps: &[WorkflowStep],
            expected_version: i64,
        ) -> Result<i64, RepositoryError> {
            if self.fail_next_save.swap(false, Ordering::SeqCst) {
                return Err(RepositoryError::Query("disk I/O error".to_string()));
            }
            let mut workflows = self.workflows.lock().unwrap();
            let workflow = workflows.get_mut(workflow_id).ok_or(RepositoryError::NotFound)?;
            if self.interleave_next_save.swap(false, Ordering::SeqCst) {
                workflow.version += 1;
            }
            if workflow.version != expected_version {
                return Err(RepositoryError::Conflict(format!(
                    "workflow {workflow_id} is at version {}, expected {expected_version}",
                    workflow.version
                )));
            }
            workflow.steps = steps.to_vec();
            workflow.version += 1;
            Ok(workflow.version)
        }
    }

    fn service() -> WorkflowService<InMemoryWorkflowRepository> {
        WorkflowService::new(InMemoryWorkflowRepository::default())
    }

    async fn new_workflow(svc: &WorkflowService<InMemoryWorkflowRepository>) -> Workflow {
        svc.create_workflow(NewWorkflowRequest {
            name: "Risk review".to_string(),
            description: None,
            entity_type: "Risk".to_string(),
            is_active: None,
        })
        .await
        .unwrap()
    }

    fn step_payload(name: &str) -> StepPayload {
        serde_json::from_value(serde_json::json!({"name": name, "stepType": "approval"})).unwrap()
    }

    async fn add_steps(
        svc: &WorkflowService<InMemoryWorkflowRepository>,
        wf: &WorkflowId,
        names: &[&str],
    ) -> Vec<WorkflowStep> {
        let mut out = Vec::new();
        for name in names {
            out.push(svc.add_step(wf, &step_payload(name)).await.unwrap());
        }
        out
    }

    async fn snapshot(svc: &WorkflowService<InMemoryWorkflowRepository>, wf: &WorkflowId) -> Vec<(StepId, String, u32)> {
        svc.list_steps(wf)
            .await
            .unwrap()
            .into_iter()
            .map(|s| (s.id, s.name, s.step_order))
            .collect()
    }

    #[tokio::test]
    async fn add_step_assigns_next_order_and_bumps_version() {
        let svc = service();
        let wf = new_workflow(&svc).await;
        let steps = add_steps(&svc, &wf.id, &["A", "B"]).await;
        assert_eq!(steps[0].step_order, 1);
        assert_eq!(steps[1].step_order, 2);
        assert_eq!(svc.get_workflow(&wf.id).await.unwrap().version, 2);
    }

    #[tokio::test]
    async fn add_step_to_missing_workflow_is_not_found() {
        let svc = service();
        let err = svc
            .add_step(&WorkflowId::new(), &step_payload("A"))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound));
    }

    #[tokio::test]
    async fn add_step_validation_persists_nothing() {
        let svc = service();
        let wf = new_workflow(&svc).await;
        let bad: StepPayload =
            serde_json::from_value(serde_json::json!({"name": "", "stepType": "nope"})).unwrap();
        let err = svc.add_step(&wf.id, &bad).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(ref e) if e.len() == 2));
        assert!(svc.list_steps(&wf.id).await.unwrap().is_empty());
        assert_eq!(svc.get_workflow(&wf.id).await.unwrap().version, 0);
    }

    #[tokio::test]
    async fn update_step_keeps_order() {
        let svc = service();
        let wf = new_workflow(&svc).await;
        let steps = add_steps(&svc, &wf.id, &["A", "B", "C"]).await;
        let patch: StepPayload =
            serde_json::from_value(serde_json::json!({"name": "B2", "daysToComplete": 7})).unwrap();

        let updated = svc.update_step(&steps[1].id, &patch).await.unwrap();
        assert_eq!(updated.name, "B2");
        assert_eq!(updated.step_order, 2);
        assert_eq!(updated.days_to_complete, Some(7));
    }

    #[tokio::test]
    async fn update_unknown_step_is_step_not_found() {
        let svc = service();
        let err = svc
            .update_step(&StepId::new(), &step_payload("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::StepNotFound));
    }

    #[tokio::test]
    async fn delete_step_renumbers_remaining() {
        let svc = service();
        let wf = new_workflow(&svc).await;
        let steps = add_steps(&svc, &wf.id, &["A", "B", "C", "D"]).await;

        let removed = svc.delete_step(&steps[1].id).await.unwrap();
        assert_eq!(removed.name, "B");

        let after = snapshot(&svc, &wf.id).await;
        let names: Vec<&str> = after.iter().map(|(_, n, _)| n.as_str()).collect();
        let orders: Vec<u32> = after.iter().map(|(_, _, o)| *o).collect();
        assert_eq!(names, vec!["A", "C", "D"]);
        assert_eq!(orders, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn reorder_applies_permutation() {
        let svc = service();
        let wf = new_workflow(&svc).await;
        let steps = add_steps(&svc, &wf.id, &["A", "B", "C"]).await;
        let ids = vec![
            steps[2].id.to_string(),
            steps[0].id.to_string(),
            steps[1].id.to_string(),
        ];

        let reordered = svc.reorder_steps(&wf.id, &ids).await.unwrap();
        let names: Vec<&str> = reordered.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["C", "A", "B"]);
        assert_eq!(
            reordered.iter().map(|s| s.step_order).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[tokio::test]
    async fn reorder_with_foreign_id_is_rejected_and_changes_nothing() {
        let svc = service();
        let wf = new_workflow(&svc).await;
        let other = new_workflow(&svc).await;
        let steps = add_steps(&svc, &wf.id, &["A", "B"]).await;
        let foreign = add_steps(&svc, &other.id, &["X"]).await;
        let before = snapshot(&svc, &wf.id).await;
        let version_before = svc.get_workflow(&wf.id).await.unwrap().version;

        let ids = vec![steps[0].id.to_string(), foreign[0].id.to_string()];
        let err = svc.reorder_steps(&wf.id, &ids).await.unwrap_err();
        assert!(
            matches!(err, WorkflowError::InvalidReorder(ref m) if m == &format!("Invalid step ID: {}", foreign[0].id))
        );
        assert_eq!(snapshot(&svc, &wf.id).await, before);
        assert_eq!(svc.get_workflow(&wf.id).await.unwrap().version, version_before);
    }

    #[tokio::test]
    async fn reorder_with_garbage_id_names_it() {
        let svc = service();
        let wf = new_workflow(&svc).await;
        add_steps(&svc, &wf.id, &["A"]).await;
        let err = svc
            .reorder_steps(&wf.id, &["not-a-uuid".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidReorder(ref m) if m == "Invalid step ID: not-a-uuid"));
    }

    #[tokio::test]
    async fn duplicate_inserts_after_source() {
        let svc = service();
        let wf = new_workflow(&svc).await;
        let steps = add_steps(&svc, &wf.id, &["A", "B", "C"]).await;

        let copy = svc.duplicate_step(&steps[1].id).await.unwrap();
        assert_eq!(copy.step_order, 3);

        let after = snapshot(&svc, &wf.id).await;
        assert_eq!(after.len(), 4);
        assert_eq!(after[3].0, steps[2].id);
        assert_eq!(after[3].2, 4);
    }

    #[tokio::test]
    async fn apply_template_with_clear_replaces_steps() {
        let svc = service();
        let wf = new_workflow(&svc).await;
        let old = add_steps(&svc, &wf.id, &["old-1", "old-2"]).await;

        let added = svc.apply_template(&wf.id, "risk_assessment", true).await.unwrap();
        assert_eq!(added, 4);

        let after = svc.list_steps(&wf.id).await.unwrap();
        assert_eq!(after.len(), 4);
        assert!(after.iter().all(|s| old.iter().all(|o| o.id != s.id)));
        assert_eq!(after[0].name, "Risk Identification");
        assert_eq!(after[3].name, "Final Approval");
        assert_eq!(after.iter().map(|s| s.step_order).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn apply_template_without_clear_appends() {
        let svc = service();
        let wf = new_workflow(&svc).await;
        add_steps(&svc, &wf.id, &["keep"]).await;

        let added = svc.apply_template(&wf.id, "change_request", false).await.unwrap();
        assert_eq!(added, 4);
        let after = svc.list_steps(&wf.id).await.unwrap();
        assert_eq!(after[0].name, "keep");
        assert_eq!(after[0].step_order, 1);
        assert_eq!(after[1].name, "Impact Assessment");
        assert_eq!(after[1].step_order, 2);
    }

    #[tokio::test]
    async fn apply_unknown_template_is_not_found() {
        let svc = service();
        let wf = new_workflow(&svc).await;
        let err = svc.apply_template(&wf.id, "nope", true).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn failed_save_leaves_steps_untouched() {
        let svc = service();
        let wf = new_workflow(&svc).await;
        let steps = add_steps(&svc, &wf.id, &["A", "B"]).await;
        let before = snapshot(&svc, &wf.id).await;

        svc.repo().fail_next_save.store(true, Ordering::SeqCst);
        let err = svc.delete_step(&steps[0].id).await.unwrap_err();
        assert!(matches!(err, WorkflowError::StorageError(_)));
        assert_eq!(snapshot(&svc, &wf.id).await, before);
    }

    #[tokio::test]
    async fn concurrent_writer_causes_conflict() {
        let svc = service();
        let wf = new_workflow(&svc).await;
        let steps = add_steps(&svc, &wf.id, &["A", "B"]).await;
        let before = snapshot(&svc, &wf.id).await;

        svc.repo().interleave_next_save.store(true, Ordering::SeqCst);
        let err = svc.duplicate_step(&steps[0].id).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict(_)));
        assert_eq!(snapshot(&svc, &wf.id).await, before);
    }

    #[tokio::test]
    async fn delete_workflow_twice_is_not_found() {
        let svc = service();
        let wf = new_workflow(&svc).await;
        svc.delete_workflow(&wf.id).await.unwrap();
        assert!(matches!(
            svc.delete_workflow(&wf.id).await.unwrap_err(),
            WorkflowError::NotFound
        ));
    }
}
