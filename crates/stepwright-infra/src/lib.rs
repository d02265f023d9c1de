//! Infrastructure layer for Stepwright.
//!
//! Contains the SQLite implementation of the repository trait defined in
//! `stepwright-core`, the `config.toml` loader and anti-forgery token handling.

pub mod config;
pub mod csrf;
pub mod sqlite;
