//! Multi-agent feature-delivery pipeline.
//!
//! An orchestrator decomposes a feature request into tasks for a fixed set of
//! agent roles, dispatches them through an at-least-once queue, and mediates
//! human decisions. Everything persists in a SQLite store; see `database` for
//! the schema.

pub mod agent;
pub mod claude;
pub mod config;
pub mod database;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod queue;
pub mod worker;
