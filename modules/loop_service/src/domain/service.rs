//! Domain service - business logic orchestration
//!
//! Every operation takes the calling [`Actor`]. Role and ownership checks run
//! before any mutation; activity events and notifications are published after
//! the write succeeds and never fail the operation.

use super::compliance::ComplianceAction;
use super::events::{ChangeKind, EventPublisher, LoopEvent};
use super::listing::BrowseRequest;
use super::ordering::sort_tasks;
use super::query::{closing_window, LoopFilter};
use super::repository::{AttachmentStore, DuplicateKey, Repositories};
use super::validation;
use crate::config::Config;
use crate::contract::{
    Actor, Document, Loop, LoopError, LoopImage, LoopPatch, LoopStats, NewDocument, NewLoop,
    OrgMember, Organization, OrganizationDetails, OrganizationInput, Person, RecordId, Task,
    TaskPatch, UpdateOutcome,
};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

/// Domain service for loops, checklists, documents and organizations
pub struct Service {
    repos: Repositories,
    attachments: Arc<dyn AttachmentStore>,
    event_publisher: Arc<dyn EventPublisher>,
    config: Config,
}

impl Service {
    /// Create a new service instance
    pub fn new(
        repos: Repositories,
        attachments: Arc<dyn AttachmentStore>,
        event_publisher: Arc<dyn EventPublisher>,
        config: Config,
    ) -> Self {
        Self {
            repos,
            attachments,
            event_publisher,
            config,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    // ===== Loop Operations =====

    /// List loops visible to the actor
    pub async fn list_loops(&self, actor: &Actor, filter: LoopFilter) -> Result<Vec<Loop>, LoopError> {
        let filter = scoped(actor, filter);
        let query = filter.resolve(Self::today());
        self.repos
            .loops
            .list(&query)
            .await
            .map_err(store_error("list loops"))
    }

    /// List loops with archived-mode merging, fallback sort and review filtering
    pub async fn browse_loops(
        &self,
        actor: &Actor,
        mut request: BrowseRequest,
    ) -> Result<Vec<Loop>, LoopError> {
        request.filter = scoped(actor, request.filter);
        let today = Self::today();
        let queries: Vec<_> = request
            .store_filters()
            .iter()
            .map(|filter| filter.resolve(today))
            .collect();

        let sets = futures::future::try_join_all(
            queries.iter().map(|query| self.repos.loops.list(query)),
        )
        .await
        .map_err(store_error("browse loops"))?;

        Ok(request.finalize(sets))
    }

    /// Get a loop the actor may access
    pub async fn get_loop(&self, actor: &Actor, id: RecordId) -> Result<Loop, LoopError> {
        let lp = self.find_loop(id).await?;
        if !actor.can_access(&lp) {
            return Err(LoopError::forbidden("Access denied"));
        }
        Ok(lp)
    }

    /// Create a loop owned by the actor
    pub async fn create_loop(&self, actor: &Actor, new_loop: NewLoop) -> Result<RecordId, LoopError> {
        validation::validate_new_loop(&new_loop)?;

        let now = Self::now();
        let id = self
            .repos
            .loops
            .create(actor.user_id, &new_loop, now)
            .await
            .map_err(store_error("create loop"))?;

        tracing::info!(loop_id = id, actor_id = actor.user_id, "loop created");
        self.emit(LoopEvent::LoopCreated {
            loop_id: id,
            actor_id: actor.user_id,
            property_address: new_loop.property_address.clone(),
            timestamp: now,
        })
        .await;
        Ok(id)
    }

    /// Partially update a loop; absent fields keep their stored values
    pub async fn update_loop(
        &self,
        actor: &Actor,
        id: RecordId,
        patch: LoopPatch,
    ) -> Result<UpdateOutcome, LoopError> {
        validation::validate_patch(&patch)?;
        let current = self.get_loop(actor, id).await?;

        if patch.is_empty() {
            return Ok(UpdateOutcome { changed: false });
        }

        let now = Self::now();
        let fields = patch_fields(&patch);
        let (updated, replaced) = apply_patch(&current, patch, now);

        let found = self
            .repos
            .loops
            .update(&updated)
            .await
            .map_err(store_error("update loop"))?;
        if !found {
            return Err(LoopError::not_found("loop", id));
        }

        if self.config.remove_images_on_delete {
            self.remove_images(id, &replaced).await;
        }

        tracing::info!(loop_id = id, actor_id = actor.user_id, ?fields, "loop updated");
        self.emit(LoopEvent::LoopUpdated {
            loop_id: id,
            actor_id: actor.user_id,
            fields: fields.into_iter().map(str::to_string).collect(),
            timestamp: now,
        })
        .await;
        Ok(UpdateOutcome { changed: true })
    }

    /// Hard delete a loop (admin only); image files are removed best-effort
    pub async fn delete_loop(&self, actor: &Actor, id: RecordId) -> Result<(), LoopError> {
        require_admin(actor, "Only admins can delete loops")?;
        let lp = self.find_loop(id).await?;

        let deleted = self
            .repos
            .loops
            .delete(id)
            .await
            .map_err(store_error("delete loop"))?;
        if !deleted {
            return Err(LoopError::not_found("loop", id));
        }

        if self.config.remove_images_on_delete {
            self.remove_images(id, &lp.images).await;
        }

        tracing::info!(loop_id = id, actor_id = actor.user_id, "loop deleted");
        self.emit(LoopEvent::LoopDeleted {
            loop_id: id,
            actor_id: actor.user_id,
            timestamp: Self::now(),
        })
        .await;
        Ok(())
    }

    /// Hide a loop from default views (admin only)
    pub async fn archive_loop(&self, actor: &Actor, id: RecordId) -> Result<(), LoopError> {
        self.set_archived(actor, id, true).await
    }

    /// Restore an archived loop (admin only)
    pub async fn unarchive_loop(&self, actor: &Actor, id: RecordId) -> Result<(), LoopError> {
        self.set_archived(actor, id, false).await
    }

    async fn set_archived(&self, actor: &Actor, id: RecordId, archived: bool) -> Result<(), LoopError> {
        let verb = if archived { "archive" } else { "unarchive" };
        require_admin(actor, format!("Only admins can {verb} loops"))?;

        let now = Self::now();
        let found = self
            .repos
            .loops
            .set_archived(id, archived, now)
            .await
            .map_err(store_error("set archived"))?;
        if !found {
            return Err(LoopError::not_found("loop", id));
        }

        self.emit(LoopEvent::LoopArchived {
            loop_id: id,
            actor_id: actor.user_id,
            archived,
            timestamp: now,
        })
        .await;
        Ok(())
    }

    /// Remove one image from a loop
    pub async fn delete_loop_image(
        &self,
        actor: &Actor,
        id: RecordId,
        filename: &str,
    ) -> Result<(), LoopError> {
        let mut lp = self.get_loop(actor, id).await?;
        let Some(pos) = lp.images.iter().position(|img| img.filename == filename) else {
            return Err(LoopError::not_found("image", filename));
        };
        let removed = lp.images.remove(pos);
        lp.updated_at = Self::now();

        let found = self
            .repos
            .loops
            .update(&lp)
            .await
            .map_err(store_error("delete loop image"))?;
        if !found {
            return Err(LoopError::not_found("loop", id));
        }

        self.remove_images(id, std::slice::from_ref(&removed)).await;
        self.emit(LoopEvent::ImageDeleted {
            loop_id: id,
            actor_id: actor.user_id,
            filename: removed.filename,
            timestamp: lp.updated_at,
        })
        .await;
        Ok(())
    }

    // ===== Compliance =====

    /// Submit a loop for compliance review (owner or admin)
    pub async fn request_compliance(&self, actor: &Actor, id: RecordId) -> Result<(), LoopError> {
        self.get_loop(actor, id).await?;
        self.apply_compliance(actor, id, ComplianceAction::Request).await
    }

    /// Approve a loop's paperwork (admin only)
    pub async fn approve_compliance(&self, actor: &Actor, id: RecordId) -> Result<(), LoopError> {
        ComplianceAction::Approve.authorize(actor)?;
        self.apply_compliance(actor, id, ComplianceAction::Approve).await
    }

    /// Return a loop's paperwork to the agent (admin only)
    pub async fn deny_compliance(&self, actor: &Actor, id: RecordId) -> Result<(), LoopError> {
        ComplianceAction::Deny.authorize(actor)?;
        self.apply_compliance(actor, id, ComplianceAction::Deny).await
    }

    async fn apply_compliance(
        &self,
        actor: &Actor,
        id: RecordId,
        action: ComplianceAction,
    ) -> Result<(), LoopError> {
        let now = Self::now();
        let change = action.change(actor, now);
        let found = self
            .repos
            .loops
            .set_compliance(id, &change)
            .await
            .map_err(store_error("set compliance"))?;
        if !found {
            return Err(LoopError::not_found("loop", id));
        }

        tracing::info!(
            loop_id = id,
            actor_id = actor.user_id,
            status = %change.status(),
            "compliance {}",
            action.as_str()
        );
        self.emit(LoopEvent::ComplianceChanged {
            loop_id: id,
            actor_id: actor.user_id,
            status: change.status().to_string(),
            timestamp: now,
        })
        .await;
        Ok(())
    }

    // ===== Derived Views =====

    /// Open loops ending within the closing-soon window
    pub async fn closing_soon(&self, actor: &Actor) -> Result<Vec<Loop>, LoopError> {
        let (from, to) = closing_window(Self::today(), self.config.closing_soon_days);
        self.repos
            .loops
            .find_closing(from, to, actor.scope())
            .await
            .map_err(store_error("find closing loops"))
    }

    /// Open loops whose end date has passed
    pub async fn overdue(&self, actor: &Actor) -> Result<Vec<Loop>, LoopError> {
        self.repos
            .loops
            .find_overdue(Self::today(), actor.scope())
            .await
            .map_err(store_error("find overdue loops"))
    }

    /// Global status counts plus the actor's closing-soon count
    pub async fn stats(&self, actor: &Actor) -> Result<LoopStats, LoopError> {
        let mut stats = self
            .repos
            .loops
            .stats()
            .await
            .map_err(store_error("loop stats"))?;
        stats.closing_soon = self.closing_soon(actor).await?.len() as i64;
        Ok(stats)
    }

    // ===== Task Operations =====

    /// Checklist of a loop: incomplete first, by due date, newest first
    pub async fn list_tasks(&self, actor: &Actor, loop_id: RecordId) -> Result<Vec<Task>, LoopError> {
        self.get_loop(actor, loop_id).await?;
        let mut tasks = self
            .repos
            .tasks
            .list_by_loop(loop_id)
            .await
            .map_err(store_error("list tasks"))?;
        sort_tasks(&mut tasks);
        Ok(tasks)
    }

    pub async fn add_task(
        &self,
        actor: &Actor,
        loop_id: RecordId,
        title: &str,
        due_date: Option<NaiveDate>,
    ) -> Result<RecordId, LoopError> {
        let title = validation::normalize_task_title(title)?;
        self.get_loop(actor, loop_id).await?;

        let now = Self::now();
        let task_id = self
            .repos
            .tasks
            .create(loop_id, &title, due_date, actor.user_id, now)
            .await
            .map_err(store_error("create task"))?;

        self.emit(LoopEvent::TaskChanged {
            loop_id,
            task_id,
            actor_id: actor.user_id,
            change: ChangeKind::Created,
            timestamp: now,
        })
        .await;
        Ok(task_id)
    }

    pub async fn update_task(
        &self,
        actor: &Actor,
        loop_id: RecordId,
        task_id: RecordId,
        mut patch: TaskPatch,
    ) -> Result<(), LoopError> {
        if let Some(title) = patch.title.as_deref() {
            patch.title = Some(validation::normalize_task_title(title)?);
        }
        self.get_loop(actor, loop_id).await?;
        self.find_task(loop_id, task_id).await?;

        let now = Self::now();
        let found = self
            .repos
            .tasks
            .update(task_id, &patch, now)
            .await
            .map_err(store_error("update task"))?;
        if !found {
            return Err(LoopError::not_found("task", task_id));
        }

        self.emit(LoopEvent::TaskChanged {
            loop_id,
            task_id,
            actor_id: actor.user_id,
            change: ChangeKind::Updated,
            timestamp: now,
        })
        .await;
        Ok(())
    }

    pub async fn delete_task(
        &self,
        actor: &Actor,
        loop_id: RecordId,
        task_id: RecordId,
    ) -> Result<(), LoopError> {
        self.get_loop(actor, loop_id).await?;
        self.find_task(loop_id, task_id).await?;

        let deleted = self
            .repos
            .tasks
            .delete(task_id)
            .await
            .map_err(store_error("delete task"))?;
        if !deleted {
            return Err(LoopError::not_found("task", task_id));
        }

        self.emit(LoopEvent::TaskChanged {
            loop_id,
            task_id,
            actor_id: actor.user_id,
            change: ChangeKind::Deleted,
            timestamp: Self::now(),
        })
        .await;
        Ok(())
    }

    async fn find_task(&self, loop_id: RecordId, task_id: RecordId) -> Result<Task, LoopError> {
        self.repos
            .tasks
            .find_by_id(task_id)
            .await
            .map_err(store_error("find task"))?
            .filter(|task| task.loop_id == loop_id)
            .ok_or_else(|| LoopError::not_found("task", task_id))
    }

    // ===== Document Operations =====

    /// Documents of a loop, newest first
    pub async fn list_documents(
        &self,
        actor: &Actor,
        loop_id: RecordId,
    ) -> Result<Vec<Document>, LoopError> {
        self.get_loop(actor, loop_id).await?;
        self.repos
            .documents
            .list_by_loop(loop_id)
            .await
            .map_err(store_error("list documents"))
    }

    /// Record metadata of an uploaded document under a generated stored name
    pub async fn add_document(
        &self,
        actor: &Actor,
        loop_id: RecordId,
        meta: NewDocument,
    ) -> Result<Document, LoopError> {
        if meta.original_name.trim().is_empty() {
            return Err(LoopError::validation("Document file name is required"));
        }
        self.get_loop(actor, loop_id).await?;

        let now = Self::now();
        let filename = validation::stored_file_name(&meta.original_name);
        let id = self
            .repos
            .documents
            .create(loop_id, &filename, &meta, actor.user_id, now)
            .await
            .map_err(store_error("create document"))?;

        self.emit(LoopEvent::DocumentChanged {
            loop_id,
            document_id: id,
            actor_id: actor.user_id,
            change: ChangeKind::Created,
            timestamp: now,
        })
        .await;
        Ok(Document {
            id,
            loop_id,
            filename,
            original_name: meta.original_name,
            size: meta.size,
            mime_type: meta.mime_type,
            uploaded_by: Some(actor.user_id),
            created_at: now,
        })
    }

    pub async fn delete_document(
        &self,
        actor: &Actor,
        loop_id: RecordId,
        document_id: RecordId,
    ) -> Result<(), LoopError> {
        self.get_loop(actor, loop_id).await?;
        let belongs = self
            .repos
            .documents
            .find_by_id(document_id)
            .await
            .map_err(store_error("find document"))?
            .is_some_and(|doc| doc.loop_id == loop_id);
        if !belongs {
            return Err(LoopError::not_found("document", document_id));
        }

        let deleted = self
            .repos
            .documents
            .delete(document_id)
            .await
            .map_err(store_error("delete document"))?;
        if !deleted {
            return Err(LoopError::not_found("document", document_id));
        }

        self.emit(LoopEvent::DocumentChanged {
            loop_id,
            document_id,
            actor_id: actor.user_id,
            change: ChangeKind::Deleted,
            timestamp: Self::now(),
        })
        .await;
        Ok(())
    }

    // ===== Organization Operations =====

    /// All organizations ordered by name
    pub async fn list_organizations(&self) -> Result<Vec<Organization>, LoopError> {
        self.repos
            .organizations
            .list_all()
            .await
            .map_err(store_error("list organizations"))
    }

    /// Organization together with its members
    pub async fn get_organization(&self, id: RecordId) -> Result<OrganizationDetails, LoopError> {
        let organization = self.find_organization(id).await?;
        let members = self.org_members(id).await?;
        Ok(OrganizationDetails {
            organization,
            members,
        })
    }

    /// Create an organization (admin only), assigning `user_ids` right away.
    ///
    /// Individual assignment failures are logged and skipped.
    pub async fn create_organization(
        &self,
        actor: &Actor,
        input: OrganizationInput,
        user_ids: &[RecordId],
    ) -> Result<OrganizationDetails, LoopError> {
        require_admin(actor, "Only admins can create organizations")?;
        let input = normalized_org_input(input)?;
        self.ensure_name_free(&input.name, None).await?;

        let now = Self::now();
        let id = self
            .repos
            .organizations
            .create(&input, actor.user_id, now)
            .await
            .map_err(store_error("create organization"))?;

        for &user_id in user_ids {
            if let Err(e) = self
                .repos
                .organizations
                .upsert_member(id, user_id, actor.user_id, now)
                .await
            {
                tracing::warn!(organization_id = id, user_id, error = %e, "failed to assign user");
            }
        }

        self.emit(LoopEvent::OrganizationChanged {
            organization_id: id,
            actor_id: actor.user_id,
            change: ChangeKind::Created,
            timestamp: now,
        })
        .await;
        self.get_organization(id).await
    }

    /// Rename or re-describe an organization (admin only)
    pub async fn update_organization(
        &self,
        actor: &Actor,
        id: RecordId,
        input: OrganizationInput,
    ) -> Result<OrganizationDetails, LoopError> {
        require_admin(actor, "Only admins can update organizations")?;
        let input = normalized_org_input(input)?;
        self.find_organization(id).await?;
        self.ensure_name_free(&input.name, Some(id)).await?;

        let now = Self::now();
        let found = self
            .repos
            .organizations
            .update(id, &input, now)
            .await
            .map_err(store_error("update organization"))?;
        if !found {
            return Err(LoopError::not_found("organization", id));
        }

        self.emit(LoopEvent::OrganizationChanged {
            organization_id: id,
            actor_id: actor.user_id,
            change: ChangeKind::Updated,
            timestamp: now,
        })
        .await;
        self.get_organization(id).await
    }

    /// Delete an organization and its assignments (admin only)
    pub async fn delete_organization(&self, actor: &Actor, id: RecordId) -> Result<(), LoopError> {
        require_admin(actor, "Only admins can delete organizations")?;
        self.find_organization(id).await?;

        let deleted = self
            .repos
            .organizations
            .delete(id)
            .await
            .map_err(store_error("delete organization"))?;
        if !deleted {
            return Err(LoopError::not_found("organization", id));
        }

        self.emit(LoopEvent::OrganizationChanged {
            organization_id: id,
            actor_id: actor.user_id,
            change: ChangeKind::Deleted,
            timestamp: Self::now(),
        })
        .await;
        Ok(())
    }

    /// Assign a user; re-adding replaces `assigned_by`/`assigned_at` (admin only)
    pub async fn add_user_to_org(
        &self,
        actor: &Actor,
        org_id: RecordId,
        user_id: RecordId,
    ) -> Result<Vec<OrgMember>, LoopError> {
        require_admin(actor, "Only admins can assign users")?;
        self.find_organization(org_id).await?;
        self.get_person(user_id).await?;

        let now = Self::now();
        self.repos
            .organizations
            .upsert_member(org_id, user_id, actor.user_id, now)
            .await
            .map_err(store_error("assign user"))?;

        self.emit(LoopEvent::MembershipChanged {
            organization_id: org_id,
            user_id,
            actor_id: actor.user_id,
            assigned: true,
            timestamp: now,
        })
        .await;
        self.org_members(org_id).await
    }

    /// Remove a user's assignment; removing a non-member is a no-op (admin only)
    pub async fn remove_user_from_org(
        &self,
        actor: &Actor,
        org_id: RecordId,
        user_id: RecordId,
    ) -> Result<Vec<OrgMember>, LoopError> {
        require_admin(actor, "Only admins can unassign users")?;
        self.find_organization(org_id).await?;

        let removed = self
            .repos
            .organizations
            .remove_member(org_id, user_id)
            .await
            .map_err(store_error("unassign user"))?;

        if removed {
            self.emit(LoopEvent::MembershipChanged {
                organization_id: org_id,
                user_id,
                actor_id: actor.user_id,
                assigned: false,
                timestamp: Self::now(),
            })
            .await;
        }
        self.org_members(org_id).await
    }

    /// Members of an organization ordered by name
    pub async fn list_org_users(&self, org_id: RecordId) -> Result<Vec<OrgMember>, LoopError> {
        self.find_organization(org_id).await?;
        self.org_members(org_id).await
    }

    /// Non-suspended users not yet in the organization (admin only)
    pub async fn list_available_users(
        &self,
        actor: &Actor,
        org_id: RecordId,
    ) -> Result<Vec<Person>, LoopError> {
        require_admin(actor, "Only admins can list available users")?;
        self.find_organization(org_id).await?;
        self.repos
            .organizations
            .list_available_users(org_id)
            .await
            .map_err(store_error("list available users"))
    }

    async fn find_organization(&self, id: RecordId) -> Result<Organization, LoopError> {
        self.repos
            .organizations
            .find_by_id(id)
            .await
            .map_err(store_error("find organization"))?
            .ok_or_else(|| LoopError::not_found("organization", id))
    }

    async fn org_members(&self, org_id: RecordId) -> Result<Vec<OrgMember>, LoopError> {
        self.repos
            .organizations
            .list_members(org_id)
            .await
            .map_err(store_error("list organization members"))
    }

    async fn ensure_name_free(&self, name: &str, except: Option<RecordId>) -> Result<(), LoopError> {
        let existing = self
            .repos
            .organizations
            .find_by_name(name)
            .await
            .map_err(store_error("find organization by name"))?;
        match existing {
            Some(org) if Some(org.id) != except => Err(LoopError::conflict(format!(
                "Organization name already exists: {name}"
            ))),
            _ => Ok(()),
        }
    }

    // ===== People Directory =====

    /// Users with their organizations, most recently active first
    pub async fn list_people(&self, search: Option<&str>) -> Result<Vec<Person>, LoopError> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        self.repos
            .users
            .search(search)
            .await
            .map_err(store_error("list people"))
    }

    pub async fn get_person(&self, id: RecordId) -> Result<Person, LoopError> {
        self.repos
            .users
            .find_by_id(id)
            .await
            .map_err(store_error("find person"))?
            .ok_or_else(|| LoopError::not_found("user", id))
    }

    // ===== Helpers =====

    async fn find_loop(&self, id: RecordId) -> Result<Loop, LoopError> {
        self.repos
            .loops
            .find_by_id(id)
            .await
            .map_err(store_error("find loop"))?
            .ok_or_else(|| LoopError::not_found("loop", id))
    }

    async fn remove_images(&self, loop_id: RecordId, images: &[LoopImage]) {
        for image in images {
            if let Err(e) = self.attachments.remove(&image.filename).await {
                tracing::warn!(loop_id, filename = %image.filename, error = %e, "failed to remove image file");
            }
        }
    }

    async fn emit(&self, event: LoopEvent) {
        if let Err(e) = self.event_publisher.publish_activity(&event).await {
            tracing::warn!(action = %event.action(), error = %e, "failed to publish activity event");
        }
        if self.config.notify_on_loop_change && event.is_notifiable() {
            if let Err(e) = self.event_publisher.publish_notification(&event).await {
                tracing::warn!(action = %event.action(), error = %e, "failed to publish notification");
            }
        }
    }
}

/// Non-admin actors only ever see their own loops
fn scoped(actor: &Actor, mut filter: LoopFilter) -> LoopFilter {
    if let Some(own) = actor.scope() {
        filter.creator_id = Some(own);
    }
    filter
}

fn require_admin(actor: &Actor, reason: impl Into<String>) -> Result<(), LoopError> {
    if actor.is_admin {
        Ok(())
    } else {
        Err(LoopError::forbidden(reason))
    }
}

fn normalized_org_input(input: OrganizationInput) -> Result<OrganizationInput, LoopError> {
    Ok(OrganizationInput {
        name: validation::normalize_org_name(&input.name)?,
        description: input.description,
    })
}

/// Map a repository failure onto the contract error, logging the cause
fn store_error(operation: &'static str) -> impl FnOnce(anyhow::Error) -> LoopError {
    move |error| {
        if let Some(dup) = error.downcast_ref::<DuplicateKey>() {
            return LoopError::conflict(dup.to_string());
        }
        tracing::error!(operation, error = ?error, "store failure");
        LoopError::Internal
    }
}

/// Names of the fields a patch touches
fn patch_fields(patch: &LoopPatch) -> Vec<&'static str> {
    let present = [
        ("type", patch.r#type.is_some()),
        ("sale", patch.sale.is_some()),
        ("start_date", patch.start_date.is_some()),
        ("end_date", patch.end_date.is_some()),
        ("tags", patch.tags.is_some()),
        ("status", patch.status.is_some()),
        ("property_address", patch.property_address.is_some()),
        ("client_name", patch.client_name.is_some()),
        ("client_email", patch.client_email.is_some()),
        ("client_phone", patch.client_phone.is_some()),
        ("notes", patch.notes.is_some()),
        ("participants", patch.participants.is_some()),
        ("details", patch.details.is_some()),
        ("images", !patch.new_images.is_empty()),
    ];
    present
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
}

/// Merge a patch into the current row; also returns images dropped by a replace
fn apply_patch(current: &Loop, patch: LoopPatch, now: DateTime<Utc>) -> (Loop, Vec<LoopImage>) {
    let mut lp = current.clone();
    if let Some(v) = patch.r#type {
        lp.r#type = v;
    }
    if let Some(v) = patch.sale {
        lp.sale = v;
    }
    if let Some(v) = patch.start_date {
        lp.start_date = v;
    }
    if let Some(v) = patch.end_date {
        lp.end_date = v;
    }
    if let Some(v) = patch.tags {
        lp.tags = v;
    }
    if let Some(v) = patch.status {
        lp.status = v;
    }
    if let Some(v) = patch.property_address {
        lp.property_address = v;
    }
    if let Some(v) = patch.client_name {
        lp.client_name = v;
    }
    if let Some(v) = patch.client_email {
        lp.client_email = v;
    }
    if let Some(v) = patch.client_phone {
        lp.client_phone = v;
    }
    if let Some(v) = patch.notes {
        lp.notes = v;
    }
    if let Some(v) = patch.participants {
        lp.participants = v;
    }
    if let Some(v) = patch.details {
        lp.details = v;
    }

    let mut replaced = Vec::new();
    if !patch.new_images.is_empty() {
        if patch.replace_images {
            replaced = std::mem::replace(&mut lp.images, patch.new_images);
        } else {
            lp.images.extend(patch.new_images);
        }
    }
    lp.updated_at = now;
    (lp, replaced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{ComplianceRecord, LoopStatus};

    fn image(name: &str) -> LoopImage {
        LoopImage {
            filename: name.to_string(),
            original_name: None,
            size: None,
            mime_type: None,
        }
    }

    fn sample() -> Loop {
        let now = Utc::now();
        Loop {
            id: 1,
            r#type: "Purchase".to_string(),
            sale: Some(250_000.0),
            creator_id: 4,
            creator_name: Some("Dana".to_string()),
            created_at: now,
            updated_at: now,
            start_date: None,
            end_date: None,
            tags: Some("condo".to_string()),
            status: LoopStatus::Active,
            property_address: "1 Main St".to_string(),
            client_name: Some("Lee".to_string()),
            client_email: None,
            client_phone: None,
            notes: None,
            images: vec![image("a.jpg")],
            participants: Vec::new(),
            archived: false,
            details: Default::default(),
            compliance: ComplianceRecord::default(),
        }
    }

    #[test]
    fn patch_preserves_unspecified_fields_and_can_null() {
        let current = sample();
        let patch = LoopPatch {
            client_name: Some(None),
            status: Some(LoopStatus::Closing),
            ..Default::default()
        };
        let (updated, replaced) = apply_patch(&current, patch, Utc::now());
        assert_eq!(updated.client_name, None);
        assert_eq!(updated.status, LoopStatus::Closing);
        assert_eq!(updated.sale, current.sale);
        assert_eq!(updated.tags, current.tags);
        assert_eq!(updated.images, current.images);
        assert!(replaced.is_empty());
    }

    #[test]
    fn images_append_or_replace() {
        let current = sample();
        let append = LoopPatch {
            new_images: vec![image("b.jpg")],
            ..Default::default()
        };
        let (updated, replaced) = apply_patch(&current, append, Utc::now());
        assert_eq!(updated.images.len(), 2);
        assert!(replaced.is_empty());

        let replace = LoopPatch {
            new_images: vec![image("c.jpg")],
            replace_images: true,
            ..Default::default()
        };
        let (updated, replaced) = apply_patch(&current, replace, Utc::now());
        assert_eq!(updated.images, vec![image("c.jpg")]);
        assert_eq!(replaced, vec![image("a.jpg")]);
    }

    #[test]
    fn patch_field_names_follow_presence() {
        let patch = LoopPatch {
            notes: Some(None),
            new_images: vec![image("x.png")],
            ..Default::default()
        };
        assert_eq!(patch_fields(&patch), vec!["notes", "images"]);
    }

    #[test]
    fn duplicate_keys_become_conflicts() {
        let err = anyhow::Error::new(DuplicateKey {
            entity: "organization",
            key: "West".to_string(),
        });
        assert!(matches!(
            store_error("create")(err),
            LoopError::Conflict { .. }
        ));
        assert_eq!(
            store_error("read")(anyhow::anyhow!("disk on fire")),
            LoopError::Internal
        );
    }

    #[test]
    fn agents_are_scoped_to_their_own_loops() {
        let filter = LoopFilter {
            creator_id: Some(99),
            ..Default::default()
        };
        assert_eq!(scoped(&Actor::agent(4, "A"), filter.clone()).creator_id, Some(4));
        assert_eq!(scoped(&Actor::admin(1, "B"), filter).creator_id, Some(99));
    }
}
