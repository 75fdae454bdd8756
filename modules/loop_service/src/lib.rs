//! Loop Service Module
//!
//! Real-estate transaction loops: filtered listings, closing-soon and overdue
//! views, the compliance review workflow, checklists, documents, organizations
//! and the people directory.

// Public exports
pub mod contract;
pub use contract::{
    client::LoopsApi, error::LoopError, Actor, ComplianceStatus, Document, Loop, LoopPatch,
    LoopStats, LoopStatus, NewLoop, Organization, Person, Task,
};

pub mod module;
pub use module::LoopServiceModule;

pub mod config;
pub use config::Config;

// Internal modules (hidden from public API)
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;
