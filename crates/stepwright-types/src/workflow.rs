//! Workflow domain types for Stepwright.
//!
//! A `Workflow` is the aggregate root: it exclusively owns an ordered list of
//! `WorkflowStep`s. The request payload types used by the REST API and CLI
//! also live here so every layer agrees on the wire format (camelCase).

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Maximum length of workflow and step names, in characters.
pub const MAX_NAME_LEN: usize = 255;

/// Inclusive bounds for a step's completion SLA.
pub const MIN_DAYS_TO_COMPLETE: i64 = 1;
pub const MAX_DAYS_TO_COMPLETE: i64 = 365;

/// Unique identifier for a workflow, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowId(pub Uuid);

impl WorkflowId {
    /// Create a new WorkflowId using UUID v7.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for WorkflowId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WorkflowId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Unique identifier for a workflow step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepId(pub Uuid);

impl StepId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for StepId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StepId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}

// ---------------------------------------------------------------------------
// Step type
// ---------------------------------------------------------------------------

/// What a step does when a workflow instance reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    /// Blocks until the assigned approver signs off.
    Approval,
    /// Informs the approver; does not block.
    Notification,
    /// Performed by the system without a human.
    AutoAction,
}

impl StepType {
    pub const ALL: [StepType; 3] = [
        StepType::Approval,
        StepType::Notification,
        StepType::AutoAction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::Approval => "approval",
            StepType::Notification => "notification",
            StepType::AutoAction => "auto_action",
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approval" => Ok(StepType::Approval),
            "notification" => Ok(StepType::Notification),
            "auto_action" => Ok(StepType::AutoAction),
            other => Err(format!("invalid step type: '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregate
// ---------------------------------------------------------------------------

/// A workflow definition and the steps it owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: WorkflowId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Classification of the entity this workflow is attached to
    /// ("Risk", "Control", "Incident", ...). Open set.
    pub entity_type: String,
    pub is_active: bool,
    /// Incremented on every committed step mutation; used to detect
    /// conflicting concurrent writers.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Steps sorted by `step_order`.
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
}

/// One element of a workflow's ordered sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    pub id: StepId,
    pub workflow_id: WorkflowId,
    pub name: String,
    pub description: Option<String>,
    /// 1-based position within the owning workflow.
    pub step_order: u32,
    pub step_type: StepType,
    pub approver_role: Option<String>,
    #[serde(default)]
    pub approver_users: Vec<i64>,
    pub is_required: bool,
    pub days_to_complete: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowStep {
    /// Materialize a validated draft. The order is provisional; the ordering
    /// engine renumbers before anything is persisted.
    pub fn from_draft(workflow_id: WorkflowId, draft: StepDraft, step_order: u32) -> Self {
        let now = Utc::now();
        Self {
            id: StepId::new(),
            workflow_id,
            name: draft.name,
            description: draft.description,
            step_order,
            step_type: draft.step_type,
            approver_role: draft.approver_role,
            approver_users: draft.approver_users,
            is_required: draft.is_required,
            days_to_complete: draft.days_to_complete,
            created_at: now,
            updated_at: now,
        }
    }

    /// Copy every descriptive field into a new draft.
    pub fn to_draft(&self) -> StepDraft {
        StepDraft {
            name: self.name.clone(),
            description: self.description.clone(),
            step_type: self.step_type,
            approver_role: self.approver_role.clone(),
            approver_users: self.approver_users.clone(),
            is_required: self.is_required,
            days_to_complete: self.days_to_complete,
        }
    }
}

/// A validated step without identity or position.
#[derive(Debug, Clone, PartialEq)]
pub struct StepDraft {
    pub name: String,
    pub description: Option<String>,
    pub step_type: StepType,
    pub approver_role: Option<String>,
    pub approver_users: Vec<i64>,
    pub is_required: bool,
    pub days_to_complete: Option<u32>,
}

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// A submitted JSON value that either decoded as `T` or did not.
///
/// Keeping the mismatch around lets validation report it alongside every
/// other problem in the payload instead of failing the whole decode.
#[derive(Debug, Clone, PartialEq)]
pub enum Loose<T> {
    Typed(T),
    Mistyped(serde_json::Value),
}

impl<T> Loose<T> {
    pub fn typed(&self) -> Option<&T> {
        match self {
            Loose::Typed(value) => Some(value),
            Loose::Mistyped(_) => None,
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Loose<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(match serde_json::from_value::<T>(raw.clone()) {
            Ok(value) => Loose::Typed(value),
            Err(_) => Loose::Mistyped(raw),
        })
    }
}

/// Raw step fields as submitted by a client, used for both create and update.
///
/// Everything is optional and loosely typed so that bad values surface as
/// validation messages rather than decode failures. For the nullable fields
/// the outer `Option` records whether the key was present at all; an inner
/// `None` means an explicit `null`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepPayload {
    #[serde(default)]
    pub name: Option<Loose<String>>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<Loose<String>>>,
    #[serde(default)]
    pub step_type: Option<Loose<String>>,
    #[serde(default, deserialize_with = "present")]
    pub approver_role: Option<Option<Loose<String>>>,
    #[serde(default, deserialize_with = "present")]
    pub approver_users: Option<Option<Loose<Vec<i64>>>>,
    #[serde(default)]
    pub is_required: Option<Loose<bool>>,
    #[serde(default, deserialize_with = "present")]
    pub days_to_complete: Option<Option<Loose<i64>>>,
}

/// Wraps any present value (including `null`) in `Some`, so a missing key
/// stays `None` via `#[serde(default)]`.
fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Request to create a workflow.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkflowRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub entity_type: String,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Full replacement ordering for a workflow's steps.
///
/// Ids are kept as strings so an unparseable id can be reported by value.
#[derive(Debug, Clone)]
pub struct ReorderRequest {
    pub step_ids: Vec<String>,
}

/// Request to materialize a template into a workflow.
#[derive(Debug, Clone)]
pub struct ApplyTemplateRequest {
    pub template_key: String,
    pub clear_existing: bool,
}
