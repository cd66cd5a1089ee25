//! qgate library.
//!
//! Policy gate for AI coding agent tool calls: decodes a hook event, routes it
//! to the applicable validators and reduces their findings to one verdict.

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod metrics;
pub mod router;
pub mod runner;
pub mod validators;
pub mod verdict;

pub use error::Error;
