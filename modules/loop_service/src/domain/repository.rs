//! Repository traits for data access
//!
//! These traits define the interface for data access operations.
//! Implementations are in infra/storage/repositories.rs

use super::compliance::ComplianceChange;
use super::query::LoopQuery;
use crate::contract::{
    Document, Loop, LoopStats, NewDocument, NewLoop, OrgMember, Organization, OrganizationInput,
    Person, RecordId, Task, TaskPatch,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

/// Unique-key violation reported by a repository
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("duplicate {entity}: {key}")]
pub struct DuplicateKey {
    pub entity: &'static str,
    pub key: String,
}

/// Repository for loops
#[async_trait]
pub trait LoopRepository: Send + Sync {
    /// Insert a loop owned by `creator_id`, returning its id
    async fn create(&self, creator_id: RecordId, new_loop: &NewLoop, now: DateTime<Utc>)
        -> Result<RecordId>;

    /// Find a loop (joined with its creator's name)
    async fn find_by_id(&self, id: RecordId) -> Result<Option<Loop>>;

    /// Run a filtered, ordered, optionally limited query
    async fn list(&self, query: &LoopQuery) -> Result<Vec<Loop>>;

    /// Write every mutable column of `lp`; false when the row is gone
    async fn update(&self, lp: &Loop) -> Result<bool>;

    /// Hard delete; false when the row is gone
    async fn delete(&self, id: RecordId) -> Result<bool>;

    async fn set_archived(&self, id: RecordId, archived: bool, now: DateTime<Utc>) -> Result<bool>;

    /// Write the compliance columns touched by `change`
    async fn set_compliance(&self, id: RecordId, change: &ComplianceChange) -> Result<bool>;

    /// Open, non-archived loops ending within `[from, to]`, ascending by end date
    async fn find_closing(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        creator_id: Option<RecordId>,
    ) -> Result<Vec<Loop>>;

    /// Open, non-archived loops that ended before `today`, ascending by end date
    async fn find_overdue(&self, today: NaiveDate, creator_id: Option<RecordId>)
        -> Result<Vec<Loop>>;

    /// Status counts and sale total over non-archived loops (`closing_soon` left at 0)
    async fn stats(&self) -> Result<LoopStats>;
}

/// Repository for loop checklist items
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn list_by_loop(&self, loop_id: RecordId) -> Result<Vec<Task>>;

    async fn create(
        &self,
        loop_id: RecordId,
        title: &str,
        due_date: Option<NaiveDate>,
        created_by: RecordId,
        now: DateTime<Utc>,
    ) -> Result<RecordId>;

    async fn find_by_id(&self, id: RecordId) -> Result<Option<Task>>;

    /// Apply a partial update; `completed = Some(true)` stamps `completed_at = now`
    async fn update(&self, id: RecordId, patch: &TaskPatch, now: DateTime<Utc>) -> Result<bool>;

    async fn delete(&self, id: RecordId) -> Result<bool>;
}

/// Repository for uploaded document metadata
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Newest first
    async fn list_by_loop(&self, loop_id: RecordId) -> Result<Vec<Document>>;

    async fn create(
        &self,
        loop_id: RecordId,
        stored_name: &str,
        meta: &NewDocument,
        uploaded_by: RecordId,
        now: DateTime<Utc>,
    ) -> Result<RecordId>;

    async fn find_by_id(&self, id: RecordId) -> Result<Option<Document>>;

    async fn delete(&self, id: RecordId) -> Result<bool>;
}

/// Repository for organizations and their user assignments
#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    /// All organizations with creator name and member count, ordered by name
    async fn list_all(&self) -> Result<Vec<Organization>>;

    async fn find_by_id(&self, id: RecordId) -> Result<Option<Organization>>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Organization>>;

    /// Fails with [`DuplicateKey`] when the name is taken
    async fn create(
        &self,
        input: &OrganizationInput,
        created_by: RecordId,
        now: DateTime<Utc>,
    ) -> Result<RecordId>;

    /// Fails with [`DuplicateKey`] when the name is taken
    async fn update(
        &self,
        id: RecordId,
        input: &OrganizationInput,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    /// Delete the organization and its assignments atomically
    async fn delete(&self, id: RecordId) -> Result<bool>;

    /// Insert or replace the (user, organization) assignment
    async fn upsert_member(
        &self,
        org_id: RecordId,
        user_id: RecordId,
        assigned_by: RecordId,
        at: DateTime<Utc>,
    ) -> Result<()>;

    async fn remove_member(&self, org_id: RecordId, user_id: RecordId) -> Result<bool>;

    /// Members ordered by user name
    async fn list_members(&self, org_id: RecordId) -> Result<Vec<OrgMember>>;

    /// Non-suspended users not assigned to the organization, ordered by name
    async fn list_available_users(&self, org_id: RecordId) -> Result<Vec<Person>>;
}

/// Read access to the user directory
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: RecordId) -> Result<Option<Person>>;

    /// Users with their organizations, most recently active first (never active
    /// last), then by name; `search` matches name or email case-insensitively
    async fn search(&self, search: Option<&str>) -> Result<Vec<Person>>;
}

/// Storage of uploaded loop image files
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn remove(&self, filename: &str) -> Result<()>;
}

/// Repositories consumed by the domain service
#[derive(Clone)]
pub struct Repositories {
    pub loops: Arc<dyn LoopRepository>,
    pub tasks: Arc<dyn TaskRepository>,
    pub documents: Arc<dyn DocumentRepository>,
    pub organizations: Arc<dyn OrganizationRepository>,
    pub users: Arc<dyn UserDirectory>,
}
