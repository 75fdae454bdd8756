//! SeaORM repository implementations

use crate::contract::{
    Document, Loop, LoopStats, LoopStatus, NewDocument, NewLoop, OrgMember, OrgRef, Organization,
    OrganizationInput, Person, RecordId, Task, TaskPatch,
};
use crate::domain::compliance::ComplianceChange;
use crate::domain::query::{LoopQuery, SortField, SortOrder};
use crate::domain::repository::{
    DocumentRepository, DuplicateKey, LoopRepository, OrganizationRepository, TaskRepository,
    UserDirectory,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::sea_query::{Func, LikeExpr, NullOrdering, OnConflict, Order};
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{
    prelude::Expr, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, SqlErr, TransactionTrait,
};
use std::collections::HashMap;
use std::sync::Arc;

use super::entity::{documents, loops, memberships, organizations, tasks, users};
use super::mapper;

// ===== Loop Repository =====

pub struct SeaOrmLoopRepository {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmLoopRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn fetch(
        &self,
        condition: Condition,
        order: &[(loops::Column, Order)],
        limit: Option<u64>,
    ) -> Result<Vec<Loop>> {
        let mut select = loops::Entity::find()
            .find_also_related(users::Entity)
            .filter(condition);
        for (column, direction) in order {
            select = select.order_by_with_nulls(*column, direction.clone(), NullOrdering::Last);
        }
        select = select.order_by_desc(loops::Column::Id);
        if let Some(limit) = limit {
            select = select.limit(limit);
        }
        let rows = select.all(&*self.db).await?;

        rows.into_iter().map(Loop::try_from).collect()
    }
}

fn sort_column(field: SortField) -> loops::Column {
    match field {
        SortField::CreatedAt => loops::Column::CreatedAt,
        SortField::UpdatedAt => loops::Column::UpdatedAt,
        SortField::EndDate => loops::Column::EndDate,
        SortField::Sale => loops::Column::Sale,
        SortField::Status => loops::Column::Status,
        SortField::Type => loops::Column::Type,
    }
}

fn sort_direction(order: SortOrder) -> Order {
    match order {
        SortOrder::Asc => Order::Asc,
        SortOrder::Desc => Order::Desc,
    }
}

/// Lowercased `%term%` with `%`, `_` and `\` in `term` matched literally
fn contains_pattern(term: &str) -> LikeExpr {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    LikeExpr::new(pattern).escape('\\')
}

/// Case-insensitive substring match over the searchable text columns
fn search_condition(term: &str) -> Condition {
    let pattern = contains_pattern(term);
    [
        loops::Column::PropertyAddress,
        loops::Column::ClientName,
        loops::Column::Tags,
    ]
    .into_iter()
    .fold(Condition::any(), |cond, column| {
        cond.add(Expr::expr(Func::lower(Expr::col((loops::Entity, column)))).like(pattern.clone()))
    })
}

fn query_condition(query: &LoopQuery) -> Condition {
    let mut cond = Condition::all().add(loops::Column::Archived.eq(query.archived));
    if let Some(status) = query.status {
        cond = cond.add(loops::Column::Status.eq(status.as_str()));
    }
    if let Some(kind) = &query.r#type {
        cond = cond.add(loops::Column::Type.eq(kind.as_str()));
    }
    if let Some(creator) = query.creator_id {
        cond = cond.add(loops::Column::CreatorId.eq(creator));
    }
    if let Some((from, to)) = query.end_date_between {
        cond = cond.add(loops::Column::EndDate.between(from, to));
    }
    if let Some(term) = &query.search {
        cond = cond.add(search_condition(term));
    }
    cond
}

/// Non-archived loops whose status is still in flight
fn open_loops(creator_id: Option<RecordId>) -> Condition {
    let open: Vec<&str> = LoopStatus::ALL
        .into_iter()
        .filter(|s| s.is_open())
        .map(LoopStatus::as_str)
        .collect();
    let mut cond = Condition::all()
        .add(loops::Column::Archived.eq(false))
        .add(loops::Column::Status.is_in(open))
        .add(loops::Column::EndDate.is_not_null());
    if let Some(creator) = creator_id {
        cond = cond.add(loops::Column::CreatorId.eq(creator));
    }
    cond
}

#[async_trait]
impl LoopRepository for SeaOrmLoopRepository {
    async fn create(&self, creator_id: RecordId, new_loop: &NewLoop, now: DateTime<Utc>) -> Result<RecordId> {
        let active = mapper::new_loop_active_model(creator_id, new_loop, now)?;
        let result = loops::Entity::insert(active).exec(&*self.db).await?;
        Ok(result.last_insert_id)
    }

    async fn find_by_id(&self, id: RecordId) -> Result<Option<Loop>> {
        let row = loops::Entity::find_by_id(id)
            .find_also_related(users::Entity)
            .one(&*self.db)
            .await?;

        row.map(Loop::try_from).transpose()
    }

    async fn list(&self, query: &LoopQuery) -> Result<Vec<Loop>> {
        self.fetch(
            query_condition(query),
            &[(sort_column(query.sort), sort_direction(query.order))],
            query.limit,
        )
        .await
    }

    async fn update(&self, lp: &Loop) -> Result<bool> {
        let result = loops::Entity::update_many()
            .set(mapper::loop_update_active_model(lp)?)
            .filter(loops::Column::Id.eq(lp.id))
            .exec(&*self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn delete(&self, id: RecordId) -> Result<bool> {
        let result = loops::Entity::delete_by_id(id).exec(&*self.db).await?;
        Ok(result.rows_affected > 0)
    }

    async fn set_archived(&self, id: RecordId, archived: bool, now: DateTime<Utc>) -> Result<bool> {
        let result = loops::Entity::update_many()
            .col_expr(loops::Column::Archived, Expr::value(archived))
            .col_expr(loops::Column::UpdatedAt, Expr::value(now))
            .filter(loops::Column::Id.eq(id))
            .exec(&*self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn set_compliance(&self, id: RecordId, change: &ComplianceChange) -> Result<bool> {
        let update = loops::Entity::update_many()
            .col_expr(
                loops::Column::ComplianceStatus,
                Expr::value(change.status().as_str()),
            )
            .filter(loops::Column::Id.eq(id));

        let update = match *change {
            ComplianceChange::Requested { at } => {
                update.col_expr(loops::Column::ComplianceRequestedAt, Expr::value(at))
            }
            ComplianceChange::Reviewed {
                at, reviewer_id, ..
            } => update
                .col_expr(loops::Column::ComplianceReviewedAt, Expr::value(at))
                .col_expr(loops::Column::ComplianceReviewerId, Expr::value(reviewer_id)),
        };

        let result = update.exec(&*self.db).await?;
        Ok(result.rows_affected > 0)
    }

    async fn find_closing(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        creator_id: Option<RecordId>,
    ) -> Result<Vec<Loop>> {
        let cond = open_loops(creator_id).add(loops::Column::EndDate.between(from, to));
        self.fetch(cond, &[(loops::Column::EndDate, Order::Asc)], None)
            .await
    }

    async fn find_overdue(&self, today: NaiveDate, creator_id: Option<RecordId>) -> Result<Vec<Loop>> {
        let cond = open_loops(creator_id).add(loops::Column::EndDate.lt(today));
        self.fetch(cond, &[(loops::Column::EndDate, Order::Asc)], None)
            .await
    }

    async fn stats(&self) -> Result<LoopStats> {
        let rows: Vec<(String, i64, Option<f64>)> = loops::Entity::find()
            .select_only()
            .column(loops::Column::Status)
            .column_as(Expr::col(loops::Column::Id).count(), "loop_count")
            .column_as(Expr::col(loops::Column::Sale).sum(), "sale_total")
            .filter(loops::Column::Archived.eq(false))
            .group_by(loops::Column::Status)
            .into_tuple()
            .all(&*self.db)
            .await?;

        let mut stats = LoopStats::default();
        for (status, count, sales) in rows {
            stats.total += count;
            match status.parse::<LoopStatus>() {
                Ok(LoopStatus::Active) => stats.active += count,
                Ok(LoopStatus::Closing) => stats.closing += count,
                Ok(LoopStatus::Closed) => stats.closed += count,
                _ => {}
            }
            if let Some(sales) = sales {
                stats.total_sales = Some(stats.total_sales.unwrap_or(0.0) + sales);
            }
        }
        Ok(stats)
    }
}

// ===== Task Repository =====

pub struct SeaOrmTaskRepository {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmTaskRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TaskRepository for SeaOrmTaskRepository {
    async fn list_by_loop(&self, loop_id: RecordId) -> Result<Vec<Task>> {
        let rows = tasks::Entity::find()
            .filter(tasks::Column::LoopId.eq(loop_id))
            .order_by_asc(tasks::Column::Id)
            .all(&*self.db)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create(
        &self,
        loop_id: RecordId,
        title: &str,
        due_date: Option<NaiveDate>,
        created_by: RecordId,
        now: DateTime<Utc>,
    ) -> Result<RecordId> {
        let active = tasks::ActiveModel {
            id: NotSet,
            loop_id: Set(loop_id),
            title: Set(title.to_string()),
            due_date: Set(due_date),
            completed: Set(false),
            completed_at: Set(None),
            created_by: Set(Some(created_by)),
            created_at: Set(now),
        };
        let result = tasks::Entity::insert(active).exec(&*self.db).await?;
        Ok(result.last_insert_id)
    }

    async fn find_by_id(&self, id: RecordId) -> Result<Option<Task>> {
        let row = tasks::Entity::find_by_id(id).one(&*self.db).await?;
        Ok(row.map(Into::into))
    }

    async fn update(&self, id: RecordId, patch: &TaskPatch, now: DateTime<Utc>) -> Result<bool> {
        let mut update = tasks::Entity::update_many().filter(tasks::Column::Id.eq(id));
        let mut touched = false;

        if let Some(title) = &patch.title {
            update = update.col_expr(tasks::Column::Title, Expr::value(title.clone()));
            touched = true;
        }
        if let Some(due) = patch.due_date {
            update = update.col_expr(tasks::Column::DueDate, Expr::value(due));
            touched = true;
        }
        if let Some(completed) = patch.completed {
            update = update.col_expr(tasks::Column::Completed, Expr::value(completed));
            // Un-completing keeps the previous stamp
            if completed {
                update = update.col_expr(tasks::Column::CompletedAt, Expr::value(now));
            }
            touched = true;
        }

        if !touched {
            return Ok(self.find_by_id(id).await?.is_some());
        }

        let result = update.exec(&*self.db).await?;
        Ok(result.rows_affected > 0)
    }

    async fn delete(&self, id: RecordId) -> Result<bool> {
        let result = tasks::Entity::delete_by_id(id).exec(&*self.db).await?;
        Ok(result.rows_affected > 0)
    }
}

// ===== Document Repository =====

pub struct SeaOrmDocumentRepository {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmDocumentRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DocumentRepository for SeaOrmDocumentRepository {
    async fn list_by_loop(&self, loop_id: RecordId) -> Result<Vec<Document>> {
        let rows = documents::Entity::find()
            .filter(documents::Column::LoopId.eq(loop_id))
            .order_by_desc(documents::Column::CreatedAt)
            .order_by_desc(documents::Column::Id)
            .all(&*self.db)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create(
        &self,
        loop_id: RecordId,
        stored_name: &str,
        meta: &NewDocument,
        uploaded_by: RecordId,
        now: DateTime<Utc>,
    ) -> Result<RecordId> {
        let active = documents::ActiveModel {
            id: NotSet,
            loop_id: Set(loop_id),
            filename: Set(stored_name.to_string()),
            original_name: Set(meta.original_name.clone()),
            size: Set(meta.size),
            mime_type: Set(meta.mime_type.clone()),
            uploaded_by: Set(Some(uploaded_by)),
            created_at: Set(now),
        };
        let result = documents::Entity::insert(active)
            .exec(&*self.db)
            .await
            .map_err(|e| duplicate_or(e, "document", stored_name))?;
        Ok(result.last_insert_id)
    }

    async fn find_by_id(&self, id: RecordId) -> Result<Option<Document>> {
        let row = documents::Entity::find_by_id(id).one(&*self.db).await?;
        Ok(row.map(Into::into))
    }

    async fn delete(&self, id: RecordId) -> Result<bool> {
        let result = documents::Entity::delete_by_id(id).exec(&*self.db).await?;
        Ok(result.rows_affected > 0)
    }
}

// ===== Organization Repository =====

pub struct SeaOrmOrganizationRepository {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmOrganizationRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn member_counts(&self, org_id: Option<RecordId>) -> Result<HashMap<RecordId, i64>> {
        let mut select = memberships::Entity::find()
            .select_only()
            .column(memberships::Column::OrganizationId)
            .column_as(Expr::col(memberships::Column::Id).count(), "member_count")
            .group_by(memberships::Column::OrganizationId);
        if let Some(id) = org_id {
            select = select.filter(memberships::Column::OrganizationId.eq(id));
        }
        let rows: Vec<(RecordId, i64)> = select.into_tuple().all(&*self.db).await?;
        Ok(rows.into_iter().collect())
    }

    async fn find_one(&self, condition: Condition) -> Result<Option<Organization>> {
        let Some((org, creator)) = organizations::Entity::find()
            .find_also_related(users::Entity)
            .filter(condition)
            .one(&*self.db)
            .await?
        else {
            return Ok(None);
        };
        let count = self
            .member_counts(Some(org.id))
            .await?
            .get(&org.id)
            .copied()
            .unwrap_or(0);
        Ok(Some(mapper::organization_from_entity(org, creator, count)))
    }
}

/// Turn a unique-constraint violation into [`DuplicateKey`]
fn duplicate_or(err: DbErr, entity: &'static str, key: &str) -> anyhow::Error {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => DuplicateKey {
            entity,
            key: key.to_string(),
        }
        .into(),
        _ => err.into(),
    }
}

#[async_trait]
impl OrganizationRepository for SeaOrmOrganizationRepository {
    async fn list_all(&self) -> Result<Vec<Organization>> {
        let rows = organizations::Entity::find()
            .find_also_related(users::Entity)
            .order_by_asc(organizations::Column::Name)
            .all(&*self.db)
            .await?;
        let counts = self.member_counts(None).await?;

        Ok(rows
            .into_iter()
            .map(|(org, creator)| {
                let count = counts.get(&org.id).copied().unwrap_or(0);
                mapper::organization_from_entity(org, creator, count)
            })
            .collect())
    }

    async fn find_by_id(&self, id: RecordId) -> Result<Option<Organization>> {
        self.find_one(Condition::all().add(organizations::Column::Id.eq(id)))
            .await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Organization>> {
        self.find_one(Condition::all().add(organizations::Column::Name.eq(name)))
            .await
    }

    async fn create(
        &self,
        input: &OrganizationInput,
        created_by: RecordId,
        now: DateTime<Utc>,
    ) -> Result<RecordId> {
        let active = organizations::ActiveModel {
            id: NotSet,
            name: Set(input.name.clone()),
            description: Set(input.description.clone().unwrap_or_default()),
            created_by: Set(created_by),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let result = organizations::Entity::insert(active)
            .exec(&*self.db)
            .await
            .map_err(|e| duplicate_or(e, "organization", &input.name))?;
        Ok(result.last_insert_id)
    }

    async fn update(&self, id: RecordId, input: &OrganizationInput, now: DateTime<Utc>) -> Result<bool> {
        let mut update = organizations::Entity::update_many()
            .col_expr(organizations::Column::Name, Expr::value(input.name.clone()))
            .col_expr(organizations::Column::UpdatedAt, Expr::value(now))
            .filter(organizations::Column::Id.eq(id));
        if let Some(description) = &input.description {
            update = update.col_expr(
                organizations::Column::Description,
                Expr::value(description.clone()),
            );
        }

        let result = update
            .exec(&*self.db)
            .await
            .map_err(|e| duplicate_or(e, "organization", &input.name))?;
        Ok(result.rows_affected > 0)
    }

    async fn delete(&self, id: RecordId) -> Result<bool> {
        let txn = self.db.begin().await?;
        memberships::Entity::delete_many()
            .filter(memberships::Column::OrganizationId.eq(id))
            .exec(&txn)
            .await?;
        let result = organizations::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        Ok(result.rows_affected > 0)
    }

    async fn upsert_member(
        &self,
        org_id: RecordId,
        user_id: RecordId,
        assigned_by: RecordId,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let active = memberships::ActiveModel {
            id: NotSet,
            user_id: Set(user_id),
            organization_id: Set(org_id),
            assigned_by: Set(assigned_by),
            assigned_at: Set(at),
        };
        memberships::Entity::insert(active)
            .on_conflict(
                OnConflict::columns([
                    memberships::Column::UserId,
                    memberships::Column::OrganizationId,
                ])
                .update_columns([
                    memberships::Column::AssignedBy,
                    memberships::Column::AssignedAt,
                ])
                .to_owned(),
            )
            .exec(&*self.db)
            .await?;

        Ok(())
    }

    async fn remove_member(&self, org_id: RecordId, user_id: RecordId) -> Result<bool> {
        let result = memberships::Entity::delete_many()
            .filter(memberships::Column::OrganizationId.eq(org_id))
            .filter(memberships::Column::UserId.eq(user_id))
            .exec(&*self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn list_members(&self, org_id: RecordId) -> Result<Vec<OrgMember>> {
        let rows = memberships::Entity::find()
            .filter(memberships::Column::OrganizationId.eq(org_id))
            .find_also_related(users::Entity)
            .all(&*self.db)
            .await?;

        let assigner_ids: Vec<RecordId> = rows.iter().map(|(m, _)| m.assigned_by).collect();
        let assigners: HashMap<RecordId, String> = users::Entity::find()
            .filter(users::Column::Id.is_in(assigner_ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect();

        let mut members: Vec<OrgMember> = rows
            .into_iter()
            .filter_map(|(membership, user)| {
                let user = user?;
                let assigned_by_name = assigners.get(&membership.assigned_by).cloned();
                Some(mapper::member_from_entity(membership, user, assigned_by_name))
            })
            .collect();
        members.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(members)
    }

    async fn list_available_users(&self, org_id: RecordId) -> Result<Vec<Person>> {
        let member_ids: Vec<RecordId> = memberships::Entity::find()
            .select_only()
            .column(memberships::Column::UserId)
            .filter(memberships::Column::OrganizationId.eq(org_id))
            .into_tuple()
            .all(&*self.db)
            .await?;

        let users = users::Entity::find()
            .filter(users::Column::Suspended.eq(false))
            .filter(users::Column::Id.is_not_in(member_ids))
            .order_by_asc(users::Column::Name)
            .all(&*self.db)
            .await?;

        Ok(users
            .into_iter()
            .map(|u| mapper::person_from_entity(u, Vec::new()))
            .collect())
    }
}

// ===== User Directory =====

pub struct SeaOrmUserDirectory {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmUserDirectory {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Organizations of each given user, ordered by organization name
    async fn organizations_of(&self, user_ids: Vec<RecordId>) -> Result<HashMap<RecordId, Vec<OrgRef>>> {
        let rows = memberships::Entity::find()
            .filter(memberships::Column::UserId.is_in(user_ids))
            .find_also_related(organizations::Entity)
            .all(&*self.db)
            .await?;

        let mut by_user: HashMap<RecordId, Vec<OrgRef>> = HashMap::new();
        for (membership, org) in rows {
            if let Some(org) = org {
                by_user.entry(membership.user_id).or_default().push(OrgRef {
                    id: org.id,
                    name: org.name,
                });
            }
        }
        for orgs in by_user.values_mut() {
            orgs.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Ok(by_user)
    }
}

#[async_trait]
impl UserDirectory for SeaOrmUserDirectory {
    async fn find_by_id(&self, id: RecordId) -> Result<Option<Person>> {
        let Some(user) = users::Entity::find_by_id(id).one(&*self.db).await? else {
            return Ok(None);
        };
        let orgs = self
            .organizations_of(vec![id])
            .await?
            .remove(&id)
            .unwrap_or_default();
        Ok(Some(mapper::person_from_entity(user, orgs)))
    }

    async fn search(&self, search: Option<&str>) -> Result<Vec<Person>> {
        let mut select = users::Entity::find();
        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = contains_pattern(term);
            select = select.filter(
                Condition::any()
                    .add(Expr::expr(Func::lower(Expr::col(users::Column::Name))).like(pattern.clone()))
                    .add(Expr::expr(Func::lower(Expr::col(users::Column::Email))).like(pattern)),
            );
        }
        let users = select.all(&*self.db).await?;

        let mut orgs = self
            .organizations_of(users.iter().map(|u| u.id).collect())
            .await?;
        let mut people: Vec<Person> = users
            .into_iter()
            .map(|u| {
                let id = u.id;
                mapper::person_from_entity(u, orgs.remove(&id).unwrap_or_default())
            })
            .collect();

        people.sort_by(|a, b| {
            b.last_active
                .is_some()
                .cmp(&a.last_active.is_some())
                .then_with(|| b.last_active.cmp(&a.last_active))
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(people)
    }
}
