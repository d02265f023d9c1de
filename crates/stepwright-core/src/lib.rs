//! Business logic and repository trait definitions for Stepwright.
//!
//! This crate defines the ordering engine, field validation, the template
//! catalog, and the "ports" (repository traits) that the infrastructure
//! layer implements. It depends only on `stepwright-types` -- never on
//! `stepwright-infra` or any database/IO crate.

pub mod ordering;
pub mod repository;
pub mod service;
pub mod template;
pub mod validation;
