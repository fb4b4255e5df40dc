//! Domain types shared by the PSGC import workspace.
//!
//! This crate has no I/O and no async code: entity schemas, job snapshots,
//! status transitions, intake checks and the error taxonomy live here so the
//! pipeline, database and HTTP layers agree on them.

pub mod entity;
pub mod error;
pub mod intake;
pub mod job;
pub mod roles;
pub mod types;
