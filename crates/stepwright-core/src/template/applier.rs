//! Materializes a catalog template into a workflow's step sequence.

use stepwright_types::error::WorkflowError;

use super::catalog::find_template;
use crate::ordering::StepSequence;

/// Apply the template `key` to `sequence`.
///
/// With `clear_existing` every current step is removed first and the
/// template lands at orders `1..=count`; otherwise its steps are appended
/// after the existing ones. Returns the number of steps added. An unknown
/// key fails before anything is touched.
pub fn apply_template(
    sequence: &mut StepSequence,
    key: &str,
    clear_existing: bool,
) -> Result<usize, WorkflowError> {
    let template =
        find_template(key).ok_or_else(|| WorkflowError::TemplateNotFound(key.to_string()))?;

    if clear_existing {
        let removed = sequence.clear_all();
        tracing::debug!(
            workflow_id = %sequence.workflow_id(),
            removed = removed.len(),
            "cleared steps before applying template"
        );
    }

    let added = sequence.bulk_append(template.steps.iter().map(|bp| bp.to_draft()));
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwright_types::workflow::{StepDraft, StepType, WorkflowId};

    fn seeded(names: &[&str]) -> StepSequence {
        let mut seq = StepSequence::new(WorkflowId::new(), Vec::new());
        for name in names {
            seq.append(StepDraft {
                name: name.to_string(),
                description: None,
                step_type: StepType::AutoAction,
                approver_role: None,
                approver_users: Vec::new(),
                is_required: false,
                days_to_complete: None,
            });
        }
        seq
    }

    #[test]
    fn clear_existing_replaces_all_steps() {
        let mut seq = seeded(&["old-1", "old-2"]);
        let added = apply_template(&mut seq, "risk_assessment", true).unwrap();

        assert_eq!(added, 4);
        assert_eq!(seq.len(), 4);
        let names: Vec<&str> = seq.steps().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Risk Identification",
                "Risk Analysis",
                "Treatment Plan Review",
                "Final Approval"
            ]
        );
        let orders: Vec<u32> = seq.steps().iter().map(|s| s.step_order).collect();
        assert_eq!(orders, vec![1, 2, 3, 4]);
        assert!(seq.steps().iter().all(|s| s.is_required));
    }

    #[test]
    fn append_keeps_prior_orders() {
        let mut seq = seeded(&["old-1", "old-2"]);
        let prior: Vec<_> = seq.steps().to_vec();
        let added = apply_template(&mut seq, "document_review", false).unwrap();

        assert_eq!(added, 3);
        assert_eq!(&seq.steps()[..2], &prior[..]);
        let orders: Vec<u32> = seq.steps().iter().map(|s| s.step_order).collect();
        assert_eq!(orders, vec![1, 2, 3, 4, 5]);
        assert_eq!(seq.steps()[2].name, "Initial Review");
        assert_eq!(seq.steps()[2].approver_role.as_deref(), Some("ROLE_USER"));
    }

    #[test]
    fn unknown_key_leaves_sequence_untouched() {
        let mut seq = seeded(&["keep"]);
        let err = apply_template(&mut seq, "does_not_exist", true).unwrap_err();
        assert!(matches!(err, WorkflowError::TemplateNotFound(ref k) if k == "does_not_exist"));
        assert_eq!(seq.len(), 1);
        assert_eq!(seq.steps()[0].name, "keep");
    }
}
