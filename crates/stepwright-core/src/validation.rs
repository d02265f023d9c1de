//! Field validation for step and workflow payloads.
//!
//! Every check runs and every failure is collected, so a client can fix all
//! problems in one round trip. Nothing here touches step orders.

use serde_json::Value;
use stepwright_types::workflow::{
    Loose, MAX_DAYS_TO_COMPLETE, MAX_NAME_LEN, MIN_DAYS_TO_COMPLETE, NewWorkflowRequest,
    StepDraft, StepPayload, StepType, WorkflowStep,
};

pub const NAME_REQUIRED: &str = "Step name is required";
pub const NAME_NOT_TEXT: &str = "Step name must be a string";
pub const NAME_TOO_LONG: &str = "Step name must be 255 characters or less";
pub const INVALID_STEP_TYPE: &str = "Invalid step type";
pub const DESCRIPTION_NOT_TEXT: &str = "Description must be a string";
pub const APPROVER_ROLE_NOT_TEXT: &str = "Approver role must be a string";
pub const REQUIRED_NOT_BOOLEAN: &str = "Required flag must be a boolean";
pub const DAYS_NOT_INTEGER: &str = "Days to complete must be an integer";
pub const DAYS_NOT_POSITIVE: &str = "Days to complete must be positive";
pub const DAYS_TOO_LARGE: &str = "Days to complete cannot exceed 365";
pub const APPROVER_USERS_INVALID: &str = "Approver users must be positive user ids";

/// Validate a payload for a brand-new step.
pub fn validate_new_step(payload: &StepPayload) -> Result<StepDraft, Vec<String>> {
    let mut errors = Vec::new();

    let name = check_name(payload.name.as_ref(), &mut errors);
    let step_type = check_step_type(payload.step_type.as_ref(), &mut errors);
    let days_to_complete = check_days(present(&payload.days_to_complete), &mut errors);
    let approver_users = check_approver_users(present(&payload.approver_users), &mut errors);
    let description = check_text(present(&payload.description), DESCRIPTION_NOT_TEXT, &mut errors);
    let approver_role =
        check_text(present(&payload.approver_role), APPROVER_ROLE_NOT_TEXT, &mut errors);
    let is_required = check_required(payload.is_required.as_ref(), &mut errors).unwrap_or(true);

    match (name, step_type) {
        (Some(name), Some(step_type)) if errors.is_empty() => Ok(StepDraft {
            name,
            description,
            step_type,
            approver_role,
            approver_users,
            is_required,
            days_to_complete,
        }),
        _ => Err(errors),
    }
}

/// Merge a partial payload into a copy of `step` and validate the result.
///
/// `name`, `stepType` and `isRequired` apply when given; the nullable fields
/// apply whenever their key is present, so an explicit `null` clears them.
/// The returned step keeps the original order.
pub fn apply_patch(step: &WorkflowStep, payload: &StepPayload) -> Result<WorkflowStep, Vec<String>> {
    let mut errors = Vec::new();
    let mut merged = step.clone();

    if let Some(name) = &payload.name {
        if let Some(name) = check_name(Some(name), &mut errors) {
            merged.name = name;
        }
    }

    if let Some(step_type) = &payload.step_type {
        if let Some(step_type) = check_step_type(Some(step_type), &mut errors) {
            merged.step_type = step_type;
        }
    }

    if let Some(description) = &payload.description {
        merged.description = check_text(description.as_ref(), DESCRIPTION_NOT_TEXT, &mut errors);
    }

    if let Some(role) = &payload.approver_role {
        merged.approver_role = check_text(role.as_ref(), APPROVER_ROLE_NOT_TEXT, &mut errors);
    }

    if let Some(users) = &payload.approver_users {
        merged.approver_users = check_approver_users(users.as_ref(), &mut errors);
    }

    if let Some(required) = check_required(payload.is_required.as_ref(), &mut errors) {
        merged.is_required = required;
    }

    if let Some(days) = &payload.days_to_complete {
        merged.days_to_complete = check_days(days.as_ref(), &mut errors);
    }

    if errors.is_empty() { Ok(merged) } else { Err(errors) }
}

/// Validate a workflow creation request.
pub fn validate_new_workflow(request: &NewWorkflowRequest) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    let name = request.name.trim();
    if name.is_empty() {
        errors.push("Workflow name is required".to_string());
    } else if name.chars().count() > MAX_NAME_LEN {
        errors.push("Workflow name must be 255 characters or less".to_string());
    }

    if request.entity_type.trim().is_empty() {
        errors.push("Entity type is required".to_string());
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

// ---------------------------------------------------------------------------
// Individual checks
// ---------------------------------------------------------------------------

/// Flatten a nullable field: absent and `null` both read as no value.
fn present<T>(field: &Option<Option<Loose<T>>>) -> Option<&Loose<T>> {
    field.as_ref().and_then(Option::as_ref)
}

fn check_name(name: Option<&Loose<String>>, errors: &mut Vec<String>) -> Option<String> {
    let name = match name {
        Some(Loose::Typed(name)) => name.trim(),
        Some(Loose::Mistyped(_)) => {
            errors.push(NAME_NOT_TEXT.to_string());
            return None;
        }
        None => "",
    };
    if name.is_empty() {
        errors.push(NAME_REQUIRED.to_string());
        return None;
    }
    if name.chars().count() > MAX_NAME_LEN {
        errors.push(NAME_TOO_LONG.to_string());
        return None;
    }
    Some(name.to_string())
}

fn check_step_type(raw: Option<&Loose<String>>, errors: &mut Vec<String>) -> Option<StepType> {
    match raw.and_then(Loose::typed).map(|s| s.parse::<StepType>()) {
        Some(Ok(step_type)) => Some(step_type),
        _ => {
            errors.push(INVALID_STEP_TYPE.to_string());
            None
        }
    }
}

/// Blank strings are stored as absent.
fn check_text(value: Option<&Loose<String>>, message: &str, errors: &mut Vec<String>) -> Option<String> {
    match value {
        Some(Loose::Typed(text)) if !text.trim().is_empty() => Some(text.clone()),
        Some(Loose::Mistyped(_)) => {
            errors.push(message.to_string());
            None
        }
        _ => None,
    }
}

fn check_required(value: Option<&Loose<bool>>, errors: &mut Vec<String>) -> Option<bool> {
    match value {
        Some(Loose::Typed(flag)) => Some(*flag),
        Some(Loose::Mistyped(_)) => {
            errors.push(REQUIRED_NOT_BOOLEAN.to_string());
            None
        }
        None => None,
    }
}

/// An empty string clears the value; a string holding an integer counts as
/// that integer.
fn check_days(days: Option<&Loose<i64>>, errors: &mut Vec<String>) -> Option<u32> {
    let days = match days? {
        Loose::Typed(days) => *days,
        Loose::Mistyped(Value::String(raw)) if raw.trim().is_empty() => return None,
        Loose::Mistyped(Value::String(raw)) => match raw.trim().parse::<i64>() {
            Ok(days) => days,
            Err(_) => {
                errors.push(DAYS_NOT_INTEGER.to_string());
                return None;
            }
        },
        Loose::Mistyped(_) => {
            errors.push(DAYS_NOT_INTEGER.to_string());
            return None;
        }
    };
    if days < MIN_DAYS_TO_COMPLETE {
        errors.push(DAYS_NOT_POSITIVE.to_string());
        None
    } else if days > MAX_DAYS_TO_COMPLETE {
        errors.push(DAYS_TOO_LARGE.to_string());
        None
    } else {
        Some(days as u32)
    }
}

/// Approver users form a set: duplicates collapse, first occurrence wins.
fn check_approver_users(users: Option<&Loose<Vec<i64>>>, errors: &mut Vec<String>) -> Vec<i64> {
    let users: &[i64] = match users {
        Some(Loose::Typed(users)) => users.as_slice(),
        Some(Loose::Mistyped(_)) => {
            errors.push(APPROVER_USERS_INVALID.to_string());
            return Vec::new();
        }
        None => &[],
    };
    if users.iter().any(|&u| u <= 0) {
        errors.push(APPROVER_USERS_INVALID.to_string());
        return Vec::new();
    }
    let mut unique = Vec::with_capacity(users.len());
    for &user in users {
        if !unique.contains(&user) {
            unique.push(user);
        }
    }
    unique
}
