//! CLI command implementations

pub mod push;
pub mod list;
pub mod get;
pub mod config;
