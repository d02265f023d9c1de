//! Request extractors shared by the mutating handlers.

pub mod body;
pub mod csrf;
