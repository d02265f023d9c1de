//! Shared domain types for Stepwright.
//!
//! This crate contains the core domain types used across the workspace:
//! Workflow, WorkflowStep, step templates, request payloads, configuration,
//! and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod template;
pub mod workflow;
