//! Native client trait for inter-module communication
//!
//! This trait defines the API that other modules use to interact with the loop service.
//! NO HTTP - direct function calls for performance.

use super::error::LoopError;
use super::model::{
    Actor, Loop, LoopPatch, LoopStats, NewLoop, OrganizationDetails, Organization, Person,
    RecordId, Task, UpdateOutcome,
};
use async_trait::async_trait;

/// Loop service API for inter-module communication
#[async_trait]
pub trait LoopsApi: Send + Sync {
    // ===== Loop Operations =====

    /// Get a loop the actor may access
    async fn get_loop(&self, actor: &Actor, id: RecordId) -> Result<Loop, LoopError>;

    /// Create a loop owned by the actor
    async fn create_loop(&self, actor: &Actor, new_loop: NewLoop) -> Result<RecordId, LoopError>;

    /// Partially update a loop
    async fn update_loop(
        &self,
        actor: &Actor,
        id: RecordId,
        patch: LoopPatch,
    ) -> Result<UpdateOutcome, LoopError>;

    /// Open loops ending soon, scoped to the actor
    async fn closing_soon(&self, actor: &Actor) -> Result<Vec<Loop>, LoopError>;

    /// Open loops past their end date, scoped to the actor
    async fn overdue(&self, actor: &Actor) -> Result<Vec<Loop>, LoopError>;

    /// Dashboard figures
    async fn stats(&self, actor: &Actor) -> Result<LoopStats, LoopError>;

    // ===== Compliance =====

    async fn request_compliance(&self, actor: &Actor, id: RecordId) -> Result<(), LoopError>;

    async fn approve_compliance(&self, actor: &Actor, id: RecordId) -> Result<(), LoopError>;

    async fn deny_compliance(&self, actor: &Actor, id: RecordId) -> Result<(), LoopError>;

    // ===== Checklist =====

    /// Checklist of a loop in display order
    async fn list_tasks(&self, actor: &Actor, loop_id: RecordId) -> Result<Vec<Task>, LoopError>;

    // ===== Directory =====

    async fn list_organizations(&self) -> Result<Vec<Organization>, LoopError>;

    async fn get_organization(&self, id: RecordId) -> Result<OrganizationDetails, LoopError>;

    async fn get_person(&self, id: RecordId) -> Result<Person, LoopError>;
}
