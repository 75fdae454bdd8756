//! Contract layer - public API for inter-module communication
//!
//! This layer contains transport-agnostic models and the native client trait.
//! NO serde derives on models - these are pure domain types.

pub mod client;
pub mod error;
pub mod model;

pub use client::LoopsApi;
pub use error::LoopError;
pub use model::{
    Actor, ComplianceRecord, ComplianceStatus, DetailValue, Document, Loop, LoopDetails,
    LoopImage, LoopPatch, LoopStats, LoopStatus, NewDocument, NewLoop, OrgMember, OrgRef,
    Organization, OrganizationDetails, OrganizationInput, Participant, Person, RecordId, Task,
    TaskPatch, UnknownValue, UpdateOutcome,
};
