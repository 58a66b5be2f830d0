//! ringsync library - on-call schedule to PBX ring-group reconciliation
//!
//! This module exports internal components for integration testing.

pub mod cli;
pub mod config;
pub mod error;
pub mod notify;
pub mod pbx;
pub mod reconciler;
pub mod redact;
pub mod schedule;
pub mod scheduler;
pub mod token;
