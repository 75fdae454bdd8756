//! Route registration and OpenAPI schema document

use super::{dto::*, handlers};
use crate::domain::Service;
use axum::{
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use std::sync::Arc;
use utoipa::OpenApi;

/// Component schemas of the loop service REST surface
#[derive(OpenApi)]
#[openapi(
    info(title = "Loop Service", description = "Transaction loops, checklists, documents and organizations"),
    components(schemas(
        LoopDto,
        UrgencyDto,
        LoopImageDto,
        ParticipantDto,
        LoopListResponse,
        CreateLoopRequest,
        UpdateLoopRequest,
        CreatedResponse,
        UpdateLoopResponse,
        LoopStatsDto,
        TaskDto,
        CreateTaskRequest,
        UpdateTaskRequest,
        DocumentDto,
        CreateDocumentRequest,
        OrganizationDto,
        OrganizationDetailsDto,
        OrgMemberDto,
        CreateOrganizationRequest,
        UpdateOrganizationRequest,
        AddMemberRequest,
        PersonDto,
        OrgRefDto,
    ))
)]
pub struct ApiDoc;

/// Register all REST routes on `router`
pub fn register_routes(router: Router, service: Arc<Service>) -> anyhow::Result<Router> {
    let router = router
        // Loop endpoints
        .route("/loops", get(handlers::list_loops).post(handlers::create_loop))
        .route("/loops/browse", get(handlers::browse_loops))
        .route("/loops/stats", get(handlers::stats))
        .route("/loops/closing", get(handlers::closing_soon))
        .route("/loops/overdue", get(handlers::overdue))
        .route(
            "/loops/{id}",
            get(handlers::get_loop)
                .put(handlers::update_loop)
                .delete(handlers::delete_loop),
        )
        .route("/loops/{id}/archive", post(handlers::archive_loop))
        .route("/loops/{id}/unarchive", post(handlers::unarchive_loop))
        .route("/loops/{id}/images/{filename}", delete(handlers::delete_loop_image))
        // Compliance endpoints
        .route("/loops/{id}/compliance/request", post(handlers::request_compliance))
        .route("/loops/{id}/compliance/approve", post(handlers::approve_compliance))
        .route("/loops/{id}/compliance/deny", post(handlers::deny_compliance))
        // Checklist endpoints
        .route(
            "/loops/{id}/tasks",
            get(handlers::list_tasks).post(handlers::add_task),
        )
        .route(
            "/loops/{id}/tasks/{task_id}",
            put(handlers::update_task).delete(handlers::delete_task),
        )
        // Document endpoints
        .route(
            "/loops/{id}/documents",
            get(handlers::list_documents).post(handlers::add_document),
        )
        .route(
            "/loops/{id}/documents/{document_id}",
            delete(handlers::delete_document),
        )
        // Organization endpoints
        .route(
            "/organizations",
            get(handlers::list_organizations).post(handlers::create_organization),
        )
        .route(
            "/organizations/{id}",
            get(handlers::get_organization)
                .put(handlers::update_organization)
                .delete(handlers::delete_organization),
        )
        .route(
            "/organizations/{id}/users",
            get(handlers::list_org_users).post(handlers::add_user_to_org),
        )
        .route(
            "/organizations/{id}/users/{user_id}",
            delete(handlers::remove_user_from_org),
        )
        .route(
            "/organizations/{id}/available-users",
            get(handlers::list_available_users),
        )
        // People directory
        .route("/people", get(handlers::list_people))
        .route("/people/{id}", get(handlers::get_person))
        .route("/openapi.json", get(openapi_document))
        .layer(Extension(service));

    Ok(router)
}

async fn openapi_document() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
