//! CLI command implementations.

pub mod candidates;
pub mod resolve;
pub mod version;
