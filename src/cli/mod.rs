//! CLI commands for qgate.

pub mod config;
pub mod hook;
pub mod install;
pub mod session;
