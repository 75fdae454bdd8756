//! HTTP request handlers - thin layer that delegates to domain service

use super::{
    dto::*,
    error::{map_domain_error, Problem},
    mapper::{loop_dto, loop_list},
};
use crate::contract::{Actor, LoopPatch, LoopStatus, NewLoop, RecordId};
use crate::domain::listing::{ArchivedMode, BrowseRequest};
use crate::domain::ordering::SortKey;
use crate::domain::query::{parse_limit, EndMonth, LoopFilter, SortField, SortOrder};
use crate::domain::review::{parse_tags, ReviewFilter};
use crate::domain::Service;
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Extension, Json,
};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;

type Svc = Extension<Arc<Service>>;

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Predicates shared by both listing endpoints; unknown sort/order/limit fall back silently
fn base_filter(
    status: Option<&str>,
    r#type: Option<String>,
    search: Option<String>,
    end_month: Option<&str>,
    sort: Option<&str>,
    order: Option<&str>,
    limit: Option<&str>,
) -> Result<LoopFilter, Problem> {
    let status = match status {
        Some(raw) => LoopStatus::from_ui_label(raw.trim())
            .map_err(|e| Problem::bad_request(e.to_string()))?,
        None => None,
    };
    Ok(LoopFilter {
        status,
        r#type,
        search,
        end_month: EndMonth::parse(end_month),
        creator_id: None,
        archived: false,
        sort: SortField::parse_or_default(sort),
        order: SortOrder::parse_or_default(order),
        limit: parse_limit(limit),
    })
}

// ===== Loop Handlers =====

/// List loops with the store-side filter
pub async fn list_loops(
    Extension(service): Svc,
    actor: Actor,
    Query(query): Query<ListLoopsQuery>,
) -> Result<Json<LoopListResponse>, Problem> {
    let mut filter = base_filter(
        query.status.as_deref(),
        query.r#type,
        query.search,
        query.end_month.as_deref(),
        query.sort.as_deref(),
        query.order.as_deref(),
        query.limit.as_deref(),
    )?;
    filter.archived = matches!(query.archived.as_deref(), Some("true" | "1"));

    let loops = service
        .list_loops(&actor, filter)
        .await
        .map_err(map_domain_error)?;

    Ok(Json(loop_list(loops, today())))
}

/// List loops across archival states with any sort key and review tags
pub async fn browse_loops(
    Extension(service): Svc,
    actor: Actor,
    Query(query): Query<BrowseLoopsQuery>,
) -> Result<Json<LoopListResponse>, Problem> {
    let filter = base_filter(
        query.status.as_deref(),
        query.r#type,
        query.search,
        query.end_month.as_deref(),
        None,
        None,
        None,
    )?;
    let invalid = |e: crate::contract::UnknownValue| Problem::bad_request(e.to_string());

    let request = BrowseRequest {
        filter,
        archived: query
            .archived
            .as_deref()
            .unwrap_or_default()
            .parse::<ArchivedMode>()
            .map_err(invalid)?,
        sort: Some(SortKey::parse(query.sort.as_deref())),
        order: SortOrder::parse_or_default(query.order.as_deref()),
        limit: parse_limit(query.limit.as_deref()),
        review: ReviewFilter {
            listing: parse_tags(query.listing_tags.as_deref()).map_err(invalid)?,
            buying: parse_tags(query.buying_tags.as_deref()).map_err(invalid)?,
            stage: query
                .review_stage
                .as_deref()
                .unwrap_or_default()
                .parse()
                .map_err(invalid)?,
        },
    };

    let loops = service
        .browse_loops(&actor, request)
        .await
        .map_err(map_domain_error)?;

    Ok(Json(loop_list(loops, today())))
}

pub async fn get_loop(
    Extension(service): Svc,
    actor: Actor,
    Path(id): Path<RecordId>,
) -> Result<Json<LoopDto>, Problem> {
    let lp = service.get_loop(&actor, id).await.map_err(map_domain_error)?;
    Ok(Json(loop_dto(lp, today())))
}

pub async fn create_loop(
    Extension(service): Svc,
    actor: Actor,
    Json(req): Json<CreateLoopRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), Problem> {
    let new_loop = NewLoop::try_from(req).map_err(map_domain_error)?;
    let id = service
        .create_loop(&actor, new_loop)
        .await
        .map_err(map_domain_error)?;

    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

pub async fn update_loop(
    Extension(service): Svc,
    actor: Actor,
    Path(id): Path<RecordId>,
    Json(req): Json<UpdateLoopRequest>,
) -> Result<Json<UpdateLoopResponse>, Problem> {
    let patch = LoopPatch::try_from(req).map_err(map_domain_error)?;
    let outcome = service
        .update_loop(&actor, id, patch)
        .await
        .map_err(map_domain_error)?;

    Ok(Json(UpdateLoopResponse {
        changed: outcome.changed,
    }))
}

pub async fn delete_loop(
    Extension(service): Svc,
    actor: Actor,
    Path(id): Path<RecordId>,
) -> Result<StatusCode, Problem> {
    service.delete_loop(&actor, id).await.map_err(map_domain_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn archive_loop(
    Extension(service): Svc,
    actor: Actor,
    Path(id): Path<RecordId>,
) -> Result<StatusCode, Problem> {
    service.archive_loop(&actor, id).await.map_err(map_domain_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unarchive_loop(
    Extension(service): Svc,
    actor: Actor,
    Path(id): Path<RecordId>,
) -> Result<StatusCode, Problem> {
    service
        .unarchive_loop(&actor, id)
        .await
        .map_err(map_domain_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_loop_image(
    Extension(service): Svc,
    actor: Actor,
    Path((id, filename)): Path<(RecordId, String)>,
) -> Result<StatusCode, Problem> {
    service
        .delete_loop_image(&actor, id, &filename)
        .await
        .map_err(map_domain_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// ===== Compliance Handlers =====

pub async fn request_compliance(
    Extension(service): Svc,
    actor: Actor,
    Path(id): Path<RecordId>,
) -> Result<StatusCode, Problem> {
    service
        .request_compliance(&actor, id)
        .await
        .map_err(map_domain_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn approve_compliance(
    Extension(service): Svc,
    actor: Actor,
    Path(id): Path<RecordId>,
) -> Result<StatusCode, Problem> {
    service
        .approve_compliance(&actor, id)
        .await
        .map_err(map_domain_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn deny_compliance(
    Extension(service): Svc,
    actor: Actor,
    Path(id): Path<RecordId>,
) -> Result<StatusCode, Problem> {
    service
        .deny_compliance(&actor, id)
        .await
        .map_err(map_domain_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// ===== Dashboard Handlers =====

pub async fn closing_soon(
    Extension(service): Svc,
    actor: Actor,
) -> Result<Json<LoopListResponse>, Problem> {
    let loops = service.closing_soon(&actor).await.map_err(map_domain_error)?;
    Ok(Json(loop_list(loops, today())))
}

pub async fn overdue(
    Extension(service): Svc,
    actor: Actor,
) -> Result<Json<LoopListResponse>, Problem> {
    let loops = service.overdue(&actor).await.map_err(map_domain_error)?;
    Ok(Json(loop_list(loops, today())))
}

pub async fn stats(Extension(service): Svc, actor: Actor) -> Result<Json<LoopStatsDto>, Problem> {
    let stats = service.stats(&actor).await.map_err(map_domain_error)?;
    Ok(Json(stats.into()))
}

// ===== Task Handlers =====

pub async fn list_tasks(
    Extension(service): Svc,
    actor: Actor,
    Path(loop_id): Path<RecordId>,
) -> Result<Json<Vec<TaskDto>>, Problem> {
    let tasks = service
        .list_tasks(&actor, loop_id)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(tasks.into_iter().map(Into::into).collect()))
}

pub async fn add_task(
    Extension(service): Svc,
    actor: Actor,
    Path(loop_id): Path<RecordId>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), Problem> {
    let id = service
        .add_task(&actor, loop_id, &req.title, req.due_date)
        .await
        .map_err(map_domain_error)?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

pub async fn update_task(
    Extension(service): Svc,
    actor: Actor,
    Path((loop_id, task_id)): Path<(RecordId, RecordId)>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<StatusCode, Problem> {
    service
        .update_task(&actor, loop_id, task_id, req.into())
        .await
        .map_err(map_domain_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_task(
    Extension(service): Svc,
    actor: Actor,
    Path((loop_id, task_id)): Path<(RecordId, RecordId)>,
) -> Result<StatusCode, Problem> {
    service
        .delete_task(&actor, loop_id, task_id)
        .await
        .map_err(map_domain_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// ===== Document Handlers =====

pub async fn list_documents(
    Extension(service): Svc,
    actor: Actor,
    Path(loop_id): Path<RecordId>,
) -> Result<Json<Vec<DocumentDto>>, Problem> {
    let docs = service
        .list_documents(&actor, loop_id)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(docs.into_iter().map(Into::into).collect()))
}

pub async fn add_document(
    Extension(service): Svc,
    actor: Actor,
    Path(loop_id): Path<RecordId>,
    Json(req): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<DocumentDto>), Problem> {
    let doc = service
        .add_document(&actor, loop_id, req.into())
        .await
        .map_err(map_domain_error)?;
    Ok((StatusCode::CREATED, Json(doc.into())))
}

pub async fn delete_document(
    Extension(service): Svc,
    actor: Actor,
    Path((loop_id, document_id)): Path<(RecordId, RecordId)>,
) -> Result<StatusCode, Problem> {
    service
        .delete_document(&actor, loop_id, document_id)
        .await
        .map_err(map_domain_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// ===== Organization Handlers =====

pub async fn list_organizations(
    Extension(service): Svc,
    _actor: Actor,
) -> Result<Json<Vec<OrganizationDto>>, Problem> {
    let orgs = service
        .list_organizations()
        .await
        .map_err(map_domain_error)?;
    Ok(Json(orgs.into_iter().map(Into::into).collect()))
}

pub async fn get_organization(
    Extension(service): Svc,
    _actor: Actor,
    Path(id): Path<RecordId>,
) -> Result<Json<OrganizationDetailsDto>, Problem> {
    let details = service
        .get_organization(id)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(details.into()))
}

pub async fn create_organization(
    Extension(service): Svc,
    actor: Actor,
    Json(req): Json<CreateOrganizationRequest>,
) -> Result<(StatusCode, Json<OrganizationDetailsDto>), Problem> {
    let user_ids = req.user_ids.clone();
    let details = service
        .create_organization(&actor, req.into(), &user_ids)
        .await
        .map_err(map_domain_error)?;
    Ok((StatusCode::CREATED, Json(details.into())))
}

pub async fn update_organization(
    Extension(service): Svc,
    actor: Actor,
    Path(id): Path<RecordId>,
    Json(req): Json<UpdateOrganizationRequest>,
) -> Result<Json<OrganizationDetailsDto>, Problem> {
    let details = service
        .update_organization(&actor, id, req.into())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(details.into()))
}

pub async fn delete_organization(
    Extension(service): Svc,
    actor: Actor,
    Path(id): Path<RecordId>,
) -> Result<StatusCode, Problem> {
    service
        .delete_organization(&actor, id)
        .await
        .map_err(map_domain_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_org_users(
    Extension(service): Svc,
    _actor: Actor,
    Path(org_id): Path<RecordId>,
) -> Result<Json<Vec<OrgMemberDto>>, Problem> {
    let members = service
        .list_org_users(org_id)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(members.into_iter().map(Into::into).collect()))
}

pub async fn add_user_to_org(
    Extension(service): Svc,
    actor: Actor,
    Path(org_id): Path<RecordId>,
    Json(req): Json<AddMemberRequest>,
) -> Result<Json<Vec<OrgMemberDto>>, Problem> {
    let members = service
        .add_user_to_org(&actor, org_id, req.user_id)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(members.into_iter().map(Into::into).collect()))
}

pub async fn remove_user_from_org(
    Extension(service): Svc,
    actor: Actor,
    Path((org_id, user_id)): Path<(RecordId, RecordId)>,
) -> Result<Json<Vec<OrgMemberDto>>, Problem> {
    let members = service
        .remove_user_from_org(&actor, org_id, user_id)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(members.into_iter().map(Into::into).collect()))
}

pub async fn list_available_users(
    Extension(service): Svc,
    actor: Actor,
    Path(org_id): Path<RecordId>,
) -> Result<Json<Vec<PersonDto>>, Problem> {
    let people = service
        .list_available_users(&actor, org_id)
        .await
        .map_err(map_domain_error)?;
    Ok(Json(people.into_iter().map(Into::into).collect()))
}

// ===== People Handlers =====

pub async fn list_people(
    Extension(service): Svc,
    _actor: Actor,
    Query(query): Query<PeopleQuery>,
) -> Result<Json<Vec<PersonDto>>, Problem> {
    let people = service
        .list_people(query.search.as_deref())
        .await
        .map_err(map_domain_error)?;
    Ok(Json(people.into_iter().map(Into::into).collect()))
}

pub async fn get_person(
    Extension(service): Svc,
    _actor: Actor,
    Path(id): Path<RecordId>,
) -> Result<Json<PersonDto>, Problem> {
    let person = service.get_person(id).await.map_err(map_domain_error)?;
    Ok(Json(person.into()))
}
