//! Workflow templates: a static catalog of blueprints and the applier that
//! materializes them into a workflow's steps.

pub mod applier;
pub mod catalog;

pub use applier::apply_template;
pub use catalog::{find_template, templates};
