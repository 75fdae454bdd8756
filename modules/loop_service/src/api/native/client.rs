//! Native client implementation - wraps domain service for in-process calls

use crate::contract::{
    Actor, Loop, LoopError, LoopPatch, LoopStats, LoopsApi, NewLoop, Organization,
    OrganizationDetails, Person, RecordId, Task, UpdateOutcome,
};
use crate::domain::Service;
use async_trait::async_trait;
use std::sync::Arc;

/// Native client implementation that directly calls the domain service
///
/// This client is used for in-process communication without HTTP overhead.
#[derive(Clone)]
pub struct NativeClient {
    service: Arc<Service>,
}

impl NativeClient {
    /// Create a new native client
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl LoopsApi for NativeClient {
    async fn get_loop(&self, actor: &Actor, id: RecordId) -> Result<Loop, LoopError> {
        self.service.get_loop(actor, id).await
    }

    async fn create_loop(&self, actor: &Actor, new_loop: NewLoop) -> Result<RecordId, LoopError> {
        self.service.create_loop(actor, new_loop).await
    }

    async fn update_loop(
        &self,
        actor: &Actor,
        id: RecordId,
        patch: LoopPatch,
    ) -> Result<UpdateOutcome, LoopError> {
        self.service.update_loop(actor, id, patch).await
    }

    async fn closing_soon(&self, actor: &Actor) -> Result<Vec<Loop>, LoopError> {
        self.service.closing_soon(actor).await
    }

    async fn overdue(&self, actor: &Actor) -> Result<Vec<Loop>, LoopError> {
        self.service.overdue(actor).await
    }

    async fn stats(&self, actor: &Actor) -> Result<LoopStats, LoopError> {
        self.service.stats(actor).await
    }

    async fn request_compliance(&self, actor: &Actor, id: RecordId) -> Result<(), LoopError> {
        self.service.request_compliance(actor, id).await
    }

    async fn approve_compliance(&self, actor: &Actor, id: RecordId) -> Result<(), LoopError> {
        self.service.approve_compliance(actor, id).await
    }

    async fn deny_compliance(&self, actor: &Actor, id: RecordId) -> Result<(), LoopError> {
        self.service.deny_compliance(actor, id).await
    }

    async fn list_tasks(&self, actor: &Actor, loop_id: RecordId) -> Result<Vec<Task>, LoopError> {
        self.service.list_tasks(actor, loop_id).await
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>, LoopError> {
        self.service.list_organizations().await
    }

    async fn get_organization(&self, id: RecordId) -> Result<OrganizationDetails, LoopError> {
        self.service.get_organization(id).await
    }

    async fn get_person(&self, id: RecordId) -> Result<Person, LoopError> {
        self.service.get_person(id).await
    }
}
