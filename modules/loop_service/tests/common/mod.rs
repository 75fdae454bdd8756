//! Shared fixtures: in-memory repositories, recording collaborators and a
//! small user directory (one admin, two agents, one suspended user)
#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, Utc};
use loop_service::contract::{
    Actor, ComplianceRecord, Document, Loop, LoopImage, LoopStats, LoopStatus, NewDocument,
    NewLoop, OrgMember, OrgRef, Organization, OrganizationInput, Person, RecordId, Task, TaskPatch,
};
use loop_service::domain::ordering::{sort_loops, SortKey};
use loop_service::domain::query::{is_closing_within, is_overdue};
use loop_service::domain::{
    AttachmentStore, ComplianceChange, DocumentRepository, DuplicateKey, EventPublisher,
    LoopEvent, LoopQuery, LoopRepository, OrganizationRepository, Repositories, Service,
    TaskRepository, UserDirectory,
};
use loop_service::Config;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

pub const ADMIN_ID: RecordId = 1;
pub const AGENT_ID: RecordId = 2;
pub const OTHER_AGENT_ID: RecordId = 3;
pub const SUSPENDED_ID: RecordId = 4;

pub fn admin() -> Actor {
    Actor::admin(ADMIN_ID, "Avery Admin")
}

pub fn agent() -> Actor {
    Actor::agent(AGENT_ID, "Blake Agent")
}

pub fn other_agent() -> Actor {
    Actor::agent(OTHER_AGENT_ID, "Casey Agent")
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// `today` shifted by a signed number of days
pub fn days_from_today(offset: i64) -> NaiveDate {
    let magnitude = Days::new(offset.unsigned_abs());
    if offset >= 0 {
        today().checked_add_days(magnitude).unwrap()
    } else {
        today().checked_sub_days(magnitude).unwrap()
    }
}

pub fn new_loop(address: &str) -> NewLoop {
    NewLoop {
        r#type: "Purchase".to_string(),
        property_address: address.to_string(),
        ..Default::default()
    }
}

pub fn image(filename: &str) -> LoopImage {
    LoopImage {
        filename: filename.to_string(),
        original_name: Some(format!("original-{filename}")),
        size: Some(1024),
        mime_type: Some("image/jpeg".to_string()),
    }
}

fn next(counter: &AtomicI64) -> RecordId {
    counter.fetch_add(1, Ordering::SeqCst) + 1
}

// ===== User directory =====

#[derive(Clone, Default)]
pub struct InMemoryUsers {
    people: Arc<RwLock<HashMap<RecordId, Person>>>,
    memberships: Arc<RwLock<Vec<Membership>>>,
    org_names: Arc<RwLock<HashMap<RecordId, String>>>,
}

impl InMemoryUsers {
    pub fn insert(&self, person: Person) {
        self.people.write().insert(person.id, person);
    }

    pub fn name_of(&self, id: RecordId) -> Option<String> {
        self.people.read().get(&id).map(|p| p.name.clone())
    }

    fn with_orgs(&self, mut person: Person) -> Person {
        let names = self.org_names.read();
        let mut orgs: Vec<OrgRef> = self
            .memberships
            .read()
            .iter()
            .filter(|m| m.user_id == person.id)
            .filter_map(|m| {
                names.get(&m.org_id).map(|name| OrgRef {
                    id: m.org_id,
                    name: name.clone(),
                })
            })
            .collect();
        orgs.sort_by(|a, b| a.name.cmp(&b.name));
        person.organizations = orgs;
        person
    }
}

#[async_trait]
impl UserDirectory for InMemoryUsers {
    async fn find_by_id(&self, id: RecordId) -> Result<Option<Person>> {
        let person = self.people.read().get(&id).cloned();
        Ok(person.map(|p| self.with_orgs(p)))
    }

    async fn search(&self, search: Option<&str>) -> Result<Vec<Person>> {
        let needle = search.map(str::to_lowercase);
        let mut people: Vec<Person> = self
            .people
            .read()
            .values()
            .filter(|p| match needle.as_deref() {
                Some(n) => p.name.to_lowercase().contains(n) || p.email.to_lowercase().contains(n),
                None => true,
            })
            .cloned()
            .collect();
        people.sort_by(|a, b| {
            b.last_active
                .is_some()
                .cmp(&a.last_active.is_some())
                .then_with(|| b.last_active.cmp(&a.last_active))
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(people.into_iter().map(|p| self.with_orgs(p)).collect())
    }
}

// ===== Loops =====

#[derive(Clone)]
pub struct InMemoryLoops {
    rows: Arc<RwLock<HashMap<RecordId, Loop>>>,
    ids: Arc<AtomicI64>,
    users: InMemoryUsers,
}

impl InMemoryLoops {
    pub fn new(users: InMemoryUsers) -> Self {
        Self {
            rows: Arc::new(RwLock::new(HashMap::new())),
            ids: Arc::new(AtomicI64::new(0)),
            users,
        }
    }

    pub fn count(&self) -> usize {
        self.rows.read().len()
    }

    pub fn get(&self, id: RecordId) -> Option<Loop> {
        self.rows.read().get(&id).cloned()
    }

    /// Adjust a stored row directly (timestamps, archival state, ...)
    pub fn modify(&self, id: RecordId, f: impl FnOnce(&mut Loop)) {
        if let Some(lp) = self.rows.write().get_mut(&id) {
            f(lp);
        }
    }

    fn joined(&self, mut lp: Loop) -> Loop {
        lp.creator_name = self.users.name_of(lp.creator_id);
        lp
    }

    fn open_rows(&self, creator_id: Option<RecordId>, keep: impl Fn(&Loop) -> bool) -> Vec<Loop> {
        let mut rows: Vec<Loop> = self
            .rows
            .read()
            .values()
            .filter(|lp| creator_id.map_or(true, |c| c == lp.creator_id))
            .filter(|lp| keep(lp))
            .cloned()
            .map(|lp| self.joined(lp))
            .collect();
        rows.sort_by(|a, b| a.end_date.cmp(&b.end_date).then(a.id.cmp(&b.id)));
        rows
    }
}

#[async_trait]
impl LoopRepository for InMemoryLoops {
    async fn create(
        &self,
        creator_id: RecordId,
        new_loop: &NewLoop,
        now: DateTime<Utc>,
    ) -> Result<RecordId> {
        let id = next(&self.ids);
        let lp = Loop {
            id,
            r#type: new_loop.r#type.clone(),
            sale: new_loop.sale,
            creator_id,
            creator_name: None,
            created_at: now,
            updated_at: now,
            start_date: new_loop.start_date,
            end_date: new_loop.end_date,
            tags: new_loop.tags.clone(),
            status: new_loop.status.unwrap_or_default(),
            property_address: new_loop.property_address.clone(),
            client_name: new_loop.client_name.clone(),
            client_email: new_loop.client_email.clone(),
            client_phone: new_loop.client_phone.clone(),
            notes: new_loop.notes.clone(),
            images: new_loop.images.clone(),
            participants: new_loop.participants.clone(),
            archived: false,
            details: new_loop.details.clone(),
            compliance: ComplianceRecord::default(),
        };
        self.rows.write().insert(id, lp);
        Ok(id)
    }

    async fn find_by_id(&self, id: RecordId) -> Result<Option<Loop>> {
        Ok(self.get(id).map(|lp| self.joined(lp)))
    }

    async fn list(&self, query: &LoopQuery) -> Result<Vec<Loop>> {
        let mut rows: Vec<Loop> = self
            .rows
            .read()
            .values()
            .filter(|lp| query.matches(lp))
            .cloned()
            .map(|lp| self.joined(lp))
            .collect();
        rows.sort_by(|a, b| b.id.cmp(&a.id));
        sort_loops(&mut rows, &SortKey::Store(query.sort), query.order);
        if let Some(limit) = query.limit {
            rows.truncate(limit as usize);
        }
        Ok(rows)
    }

    async fn update(&self, lp: &Loop) -> Result<bool> {
        let mut rows = self.rows.write();
        match rows.get_mut(&lp.id) {
            Some(stored) => {
                let creator_id = stored.creator_id;
                let created_at = stored.created_at;
                *stored = lp.clone();
                stored.creator_id = creator_id;
                stored.created_at = created_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: RecordId) -> Result<bool> {
        Ok(self.rows.write().remove(&id).is_some())
    }

    async fn set_archived(&self, id: RecordId, archived: bool, now: DateTime<Utc>) -> Result<bool> {
        let mut rows = self.rows.write();
        let Some(lp) = rows.get_mut(&id) else {
            return Ok(false);
        };
        lp.archived = archived;
        lp.updated_at = now;
        Ok(true)
    }

    async fn set_compliance(&self, id: RecordId, change: &ComplianceChange) -> Result<bool> {
        let mut rows = self.rows.write();
        let Some(lp) = rows.get_mut(&id) else {
            return Ok(false);
        };
        change.apply(&mut lp.compliance);
        Ok(true)
    }

    async fn find_closing(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        creator_id: Option<RecordId>,
    ) -> Result<Vec<Loop>> {
        Ok(self.open_rows(creator_id, |lp| is_closing_within(lp, (from, to))))
    }

    async fn find_overdue(&self, today: NaiveDate, creator_id: Option<RecordId>) -> Result<Vec<Loop>> {
        Ok(self.open_rows(creator_id, |lp| is_overdue(lp, today)))
    }

    async fn stats(&self) -> Result<LoopStats> {
        let rows = self.rows.read();
        let live: Vec<&Loop> = rows.values().filter(|lp| !lp.archived).collect();
        let count = |status: LoopStatus| live.iter().filter(|lp| lp.status == status).count() as i64;
        let sales: Vec<f64> = live.iter().filter_map(|lp| lp.sale).collect();
        Ok(LoopStats {
            total: live.len() as i64,
            active: count(LoopStatus::Active),
            closing: count(LoopStatus::Closing),
            closed: count(LoopStatus::Closed),
            total_sales: (!sales.is_empty()).then(|| sales.iter().sum()),
            closing_soon: 0,
        })
    }
}

// ===== Tasks =====

#[derive(Clone, Default)]
pub struct InMemoryTasks {
    rows: Arc<RwLock<HashMap<RecordId, Task>>>,
    ids: Arc<AtomicI64>,
}

impl InMemoryTasks {
    pub fn count(&self) -> usize {
        self.rows.read().len()
    }

    pub fn modify(&self, id: RecordId, f: impl FnOnce(&mut Task)) {
        if let Some(task) = self.rows.write().get_mut(&id) {
            f(task);
        }
    }
}

#[async_trait]
impl TaskRepository for InMemoryTasks {
    async fn list_by_loop(&self, loop_id: RecordId) -> Result<Vec<Task>> {
        Ok(self
            .rows
            .read()
            .values()
            .filter(|t| t.loop_id == loop_id)
            .cloned()
            .collect())
    }

    async fn create(
        &self,
        loop_id: RecordId,
        title: &str,
        due_date: Option<NaiveDate>,
        created_by: RecordId,
        now: DateTime<Utc>,
    ) -> Result<RecordId> {
        let id = next(&self.ids);
        self.rows.write().insert(
            id,
            Task {
                id,
                loop_id,
                title: title.to_string(),
                due_date,
                completed: false,
                completed_at: None,
                created_by: Some(created_by),
                created_at: now,
            },
        );
        Ok(id)
    }

    async fn find_by_id(&self, id: RecordId) -> Result<Option<Task>> {
        Ok(self.rows.read().get(&id).cloned())
    }

    async fn update(&self, id: RecordId, patch: &TaskPatch, now: DateTime<Utc>) -> Result<bool> {
        let mut rows = self.rows.write();
        let Some(task) = rows.get_mut(&id) else {
            return Ok(false);
        };
        if let Some(title) = &patch.title {
            task.title = title.clone();
        }
        if let Some(due) = patch.due_date {
            task.due_date = Some(due);
        }
        if let Some(completed) = patch.completed {
            task.completed = completed;
            if completed {
                task.completed_at = Some(now);
            }
        }
        Ok(true)
    }

    async fn delete(&self, id: RecordId) -> Result<bool> {
        Ok(self.rows.write().remove(&id).is_some())
    }
}

// ===== Documents =====

#[derive(Clone, Default)]
pub struct InMemoryDocuments {
    rows: Arc<RwLock<HashMap<RecordId, Document>>>,
    ids: Arc<AtomicI64>,
}

impl InMemoryDocuments {
    pub fn count(&self) -> usize {
        self.rows.read().len()
    }
}

#[async_trait]
impl DocumentRepository for InMemoryDocuments {
    async fn list_by_loop(&self, loop_id: RecordId) -> Result<Vec<Document>> {
        let mut docs: Vec<Document> = self
            .rows
            .read()
            .values()
            .filter(|d| d.loop_id == loop_id)
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(docs)
    }

    async fn create(
        &self,
        loop_id: RecordId,
        stored_name: &str,
        meta: &NewDocument,
        uploaded_by: RecordId,
        now: DateTime<Utc>,
    ) -> Result<RecordId> {
        let mut rows = self.rows.write();
        if rows.values().any(|d| d.filename == stored_name) {
            return Err(DuplicateKey {
                entity: "document",
                key: stored_name.to_string(),
            }
            .into());
        }
        let id = next(&self.ids);
        rows.insert(
            id,
            Document {
                id,
                loop_id,
                filename: stored_name.to_string(),
                original_name: meta.original_name.clone(),
                size: meta.size,
                mime_type: meta.mime_type.clone(),
                uploaded_by: Some(uploaded_by),
                created_at: now,
            },
        );
        Ok(id)
    }

    async fn find_by_id(&self, id: RecordId) -> Result<Option<Document>> {
        Ok(self.rows.read().get(&id).cloned())
    }

    async fn delete(&self, id: RecordId) -> Result<bool> {
        Ok(self.rows.write().remove(&id).is_some())
    }
}

// ===== Organizations =====

#[derive(Debug, Clone)]
struct Membership {
    org_id: RecordId,
    user_id: RecordId,
    assigned_by: RecordId,
    assigned_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct InMemoryOrganizations {
    rows: Arc<RwLock<HashMap<RecordId, Organization>>>,
    ids: Arc<AtomicI64>,
    users: InMemoryUsers,
}

impl InMemoryOrganizations {
    pub fn new(users: InMemoryUsers) -> Self {
        Self {
            rows: Arc::new(RwLock::new(HashMap::new())),
            ids: Arc::new(AtomicI64::new(0)),
            users,
        }
    }

    pub fn membership_count(&self) -> usize {
        self.users.memberships.read().len()
    }

    fn joined(&self, mut org: Organization) -> Organization {
        org.creator_name = self.users.name_of(org.created_by);
        org.member_count = self
            .users
            .memberships
            .read()
            .iter()
            .filter(|m| m.org_id == org.id)
            .count() as i64;
        org
    }

    fn name_taken(&self, name: &str, except: Option<RecordId>) -> bool {
        self.rows
            .read()
            .values()
            .any(|o| o.name == name && Some(o.id) != except)
    }
}

#[async_trait]
impl OrganizationRepository for InMemoryOrganizations {
    async fn list_all(&self) -> Result<Vec<Organization>> {
        let mut orgs: Vec<Organization> = self
            .rows
            .read()
            .values()
            .cloned()
            .map(|o| self.joined(o))
            .collect();
        orgs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(orgs)
    }

    async fn find_by_id(&self, id: RecordId) -> Result<Option<Organization>> {
        let org = self.rows.read().get(&id).cloned();
        Ok(org.map(|o| self.joined(o)))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Organization>> {
        let org = self.rows.read().values().find(|o| o.name == name).cloned();
        Ok(org.map(|o| self.joined(o)))
    }

    async fn create(
        &self,
        input: &OrganizationInput,
        created_by: RecordId,
        now: DateTime<Utc>,
    ) -> Result<RecordId> {
        if self.name_taken(&input.name, None) {
            return Err(DuplicateKey {
                entity: "organization",
                key: input.name.clone(),
            }
            .into());
        }
        let id = next(&self.ids);
        self.rows.write().insert(
            id,
            Organization {
                id,
                name: input.name.clone(),
                description: input.description.clone().unwrap_or_default(),
                created_by,
                creator_name: None,
                member_count: 0,
                created_at: now,
                updated_at: now,
            },
        );
        self.users.org_names.write().insert(id, input.name.clone());
        Ok(id)
    }

    async fn update(
        &self,
        id: RecordId,
        input: &OrganizationInput,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        if self.name_taken(&input.name, Some(id)) {
            return Err(DuplicateKey {
                entity: "organization",
                key: input.name.clone(),
            }
            .into());
        }
        let mut rows = self.rows.write();
        let Some(org) = rows.get_mut(&id) else {
            return Ok(false);
        };
        org.name = input.name.clone();
        if let Some(description) = &input.description {
            org.description = description.clone();
        }
        org.updated_at = now;
        self.users.org_names.write().insert(id, input.name.clone());
        Ok(true)
    }

    async fn delete(&self, id: RecordId) -> Result<bool> {
        let removed = self.rows.write().remove(&id).is_some();
        if removed {
            self.users.memberships.write().retain(|m| m.org_id != id);
            self.users.org_names.write().remove(&id);
        }
        Ok(removed)
    }

    async fn upsert_member(
        &self,
        org_id: RecordId,
        user_id: RecordId,
        assigned_by: RecordId,
        at: DateTime<Utc>,
    ) -> Result<()> {
        if self.users.name_of(user_id).is_none() {
            anyhow::bail!("foreign key violation: user {user_id}");
        }
        let mut memberships = self.users.memberships.write();
        match memberships
            .iter_mut()
            .find(|m| m.org_id == org_id && m.user_id == user_id)
        {
            Some(existing) => {
                existing.assigned_by = assigned_by;
                existing.assigned_at = at;
            }
            None => memberships.push(Membership {
                org_id,
                user_id,
                assigned_by,
                assigned_at: at,
            }),
        }
        Ok(())
    }

    async fn remove_member(&self, org_id: RecordId, user_id: RecordId) -> Result<bool> {
        let mut memberships = self.users.memberships.write();
        let before = memberships.len();
        memberships.retain(|m| !(m.org_id == org_id && m.user_id == user_id));
        Ok(memberships.len() != before)
    }

    async fn list_members(&self, org_id: RecordId) -> Result<Vec<OrgMember>> {
        let people = self.users.people.read();
        let mut members: Vec<OrgMember> = self
            .users
            .memberships
            .read()
            .iter()
            .filter(|m| m.org_id == org_id)
            .filter_map(|m| {
                people.get(&m.user_id).map(|p| OrgMember {
                    user_id: p.id,
                    name: p.name.clone(),
                    email: p.email.clone(),
                    role: p.role.clone(),
                    assigned_by: m.assigned_by,
                    assigned_by_name: people.get(&m.assigned_by).map(|a| a.name.clone()),
                    assigned_at: m.assigned_at,
                })
            })
            .collect();
        members.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(members)
    }

    async fn list_available_users(&self, org_id: RecordId) -> Result<Vec<Person>> {
        let taken: Vec<RecordId> = self
            .users
            .memberships
            .read()
            .iter()
            .filter(|m| m.org_id == org_id)
            .map(|m| m.user_id)
            .collect();
        let mut people: Vec<Person> = self
            .users
            .people
            .read()
            .values()
            .filter(|p| !p.suspended && !taken.contains(&p.id))
            .cloned()
            .collect();
        people.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(people)
    }
}

// ===== Collaborators =====

/// Attachment store that remembers which files were removed
#[derive(Default)]
pub struct RecordingAttachments {
    removed: RwLock<Vec<String>>,
}

impl RecordingAttachments {
    pub fn removed(&self) -> Vec<String> {
        self.removed.read().clone()
    }
}

#[async_trait]
impl AttachmentStore for RecordingAttachments {
    async fn remove(&self, filename: &str) -> Result<()> {
        self.removed.write().push(filename.to_string());
        Ok(())
    }
}

/// Publisher that keeps every activity and notification in memory
#[derive(Default)]
pub struct RecordingPublisher {
    activity: RwLock<Vec<LoopEvent>>,
    notifications: RwLock<Vec<LoopEvent>>,
    fail: bool,
}

impl RecordingPublisher {
    /// Publisher whose every call fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn activity(&self) -> Vec<LoopEvent> {
        self.activity.read().clone()
    }

    pub fn notifications(&self) -> Vec<LoopEvent> {
        self.notifications.read().clone()
    }

    pub fn actions(&self) -> Vec<String> {
        self.activity.read().iter().map(LoopEvent::action).collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish_activity(&self, event: &LoopEvent) -> Result<()> {
        if self.fail {
            anyhow::bail!("activity log unavailable");
        }
        self.activity.write().push(event.clone());
        Ok(())
    }

    async fn publish_notification(&self, event: &LoopEvent) -> Result<()> {
        if self.fail {
            anyhow::bail!("mailer unavailable");
        }
        self.notifications.write().push(event.clone());
        Ok(())
    }
}

// ===== Fixture =====

pub struct Fixture {
    pub service: Arc<Service>,
    pub users: InMemoryUsers,
    pub loops: InMemoryLoops,
    pub tasks: InMemoryTasks,
    pub documents: InMemoryDocuments,
    pub organizations: InMemoryOrganizations,
    pub attachments: Arc<RecordingAttachments>,
    pub events: Arc<RecordingPublisher>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::build(Config::default(), RecordingPublisher::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self::build(config, RecordingPublisher::default())
    }

    pub fn with_failing_publisher() -> Self {
        Self::build(Config::default(), RecordingPublisher::failing())
    }

    fn build(config: Config, publisher: RecordingPublisher) -> Self {
        let users = InMemoryUsers::default();
        seed_people(&users);

        let loops = InMemoryLoops::new(users.clone());
        let tasks = InMemoryTasks::default();
        let documents = InMemoryDocuments::default();
        let organizations = InMemoryOrganizations::new(users.clone());
        let attachments = Arc::new(RecordingAttachments::default());
        let events = Arc::new(publisher);

        let repos = Repositories {
            loops: Arc::new(loops.clone()),
            tasks: Arc::new(tasks.clone()),
            documents: Arc::new(documents.clone()),
            organizations: Arc::new(organizations.clone()),
            users: Arc::new(users.clone()),
        };
        let service = Arc::new(Service::new(
            repos,
            attachments.clone(),
            events.clone(),
            config,
        ));

        Self {
            service,
            users,
            loops,
            tasks,
            documents,
            organizations,
            attachments,
            events,
        }
    }

    /// Create a loop through the service as `actor`
    pub async fn loop_for(&self, actor: &Actor, new_loop: NewLoop) -> RecordId {
        self.service.create_loop(actor, new_loop).await.unwrap()
    }
}

pub fn person(id: RecordId, name: &str, role: &str) -> Person {
    Person {
        id,
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
        role: role.to_string(),
        suspended: false,
        last_active: None,
        created_at: None,
        organizations: Vec::new(),
    }
}

fn seed_people(users: &InMemoryUsers) {
    let now = Utc::now();
    users.insert(Person {
        last_active: Some(now),
        ..person(ADMIN_ID, "Avery Admin", "admin")
    });
    users.insert(Person {
        last_active: Some(now - chrono::Duration::days(2)),
        ..person(AGENT_ID, "Blake Agent", "agent")
    });
    users.insert(person(OTHER_AGENT_ID, "Casey Agent", "agent"));
    users.insert(Person {
        suspended: true,
        ..person(SUSPENDED_ID, "Drew Suspended", "agent")
    });
}
