//! Built-in workflow blueprints, in declaration order.

use stepwright_types::template::{StepBlueprint, WorkflowTemplate};
use stepwright_types::workflow::StepType;

const fn approval(name: &'static str, approver_role: &'static str, days: u32) -> StepBlueprint {
    StepBlueprint {
        name,
        step_type: StepType::Approval,
        approver_role,
        days_to_complete: days,
    }
}

const fn notification(name: &'static str, approver_role: &'static str, days: u32) -> StepBlueprint {
    StepBlueprint {
        name,
        step_type: StepType::Notification,
        approver_role,
        days_to_complete: days,
    }
}

static CATALOG: [WorkflowTemplate; 5] = [
    WorkflowTemplate {
        key: "risk_assessment",
        name: "Risk Assessment Workflow",
        description: "Standard workflow for risk assessment and approval",
        entity_type: "Risk",
        steps: &[
            approval("Risk Identification", "ROLE_USER", 3),
            approval("Risk Analysis", "ROLE_RISK_MANAGER", 5),
            approval("Treatment Plan Review", "ROLE_MANAGER", 5),
            approval("Final Approval", "ROLE_ISO_OFFICER", 3),
        ],
    },
    WorkflowTemplate {
        key: "control_implementation",
        name: "Control Implementation Workflow",
        description: "Approval workflow for implementing security controls",
        entity_type: "Control",
        steps: &[
            approval("Implementation Planning", "ROLE_USER", 5),
            approval("Technical Review", "ROLE_ADMIN", 3),
            approval("Security Assessment", "ROLE_ISO_OFFICER", 5),
            approval("Management Approval", "ROLE_MANAGER", 3),
        ],
    },
    WorkflowTemplate {
        key: "incident_response",
        name: "Incident Response Workflow",
        description: "Workflow for security incident handling",
        entity_type: "Incident",
        steps: &[
            approval("Initial Classification", "ROLE_USER", 1),
            approval("Investigation", "ROLE_ISO_OFFICER", 3),
            approval("Containment Approval", "ROLE_ADMIN", 1),
            approval("Resolution Review", "ROLE_MANAGER", 5),
            notification("Lessons Learned", "ROLE_USER", 10),
        ],
    },
    WorkflowTemplate {
        key: "document_review",
        name: "Document Review Workflow",
        description: "Standard document review and approval process",
        entity_type: "Document",
        steps: &[
            approval("Initial Review", "ROLE_USER", 3),
            approval("Technical Review", "ROLE_AUDITOR", 5),
            approval("Final Approval", "ROLE_MANAGER", 3),
        ],
    },
    WorkflowTemplate {
        key: "change_request",
        name: "Change Request Workflow",
        description: "Approval process for system changes",
        entity_type: "ChangeRequest",
        steps: &[
            approval("Impact Assessment", "ROLE_USER", 3),
            approval("Security Review", "ROLE_ISO_OFFICER", 5),
            approval("CAB Approval", "ROLE_MANAGER", 7),
            approval("Implementation Sign-off", "ROLE_ADMIN", 3),
        ],
    },
];

/// All templates in declaration order.
pub fn templates() -> &'static [WorkflowTemplate] {
    &CATALOG
}

/// Look up a template by key.
pub fn find_template(key: &str) -> Option<&'static WorkflowTemplate> {
    CATALOG.iter().find(|t| t.key == key)
}
