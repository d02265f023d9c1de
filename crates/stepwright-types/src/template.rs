//! Static workflow blueprint types.
//!
//! Templates are compiled into the binary; nothing here is persisted.

use serde::Serialize;

use crate::workflow::{StepDraft, StepType};

/// A named blueprint that can be materialized into real steps.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowTemplate {
    /// Catalog key (e.g. "risk_assessment"). Serialized as the map key.
    #[serde(skip)]
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Entity type the template is intended for.
    pub entity_type: &'static str,
    /// Steps in declared order.
    pub steps: &'static [StepBlueprint],
}

/// One step descriptor inside a template.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepBlueprint {
    pub name: &'static str,
    pub step_type: StepType,
    pub approver_role: &'static str,
    pub days_to_complete: u32,
}

impl StepBlueprint {
    /// Templated steps are always required and carry no description or
    /// named approvers.
    pub fn to_draft(&self) -> StepDraft {
        StepDraft {
            name: self.name.to_string(),
            description: None,
            step_type: self.step_type,
            approver_role: Some(self.approver_role.to_string()),
            approver_users: Vec::new(),
            is_required: true,
            days_to_complete: Some(self.days_to_complete),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blueprint_draft_is_required() {
        let bp = StepBlueprint {
            name: "Investigation",
            step_type: StepType::Approval,
            approver_role: "ROLE_ISO_OFFICER",
            days_to_complete: 3,
        };
        let draft = bp.to_draft();
        assert!(draft.is_required);
        assert_eq!(draft.approver_role.as_deref(), Some("ROLE_ISO_OFFICER"));
        assert_eq!(draft.days_to_complete, Some(3));
        assert!(draft.approver_users.is_empty());
    }
}
