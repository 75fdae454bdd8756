//! REST DTOs with serde derives for HTTP API

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`)
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

// ===== Loop DTOs =====

/// Loop response DTO
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoopDto {
    pub id: i64,

    /// Transaction category
    #[schema(example = "Listing for Sale")]
    pub r#type: String,

    pub sale: Option<f64>,
    pub creator_id: i64,
    pub creator_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub tags: Option<String>,

    #[schema(example = "active")]
    pub status: String,

    pub property_address: String,
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub notes: Option<String>,
    pub images: Vec<LoopImageDto>,
    pub participants: Vec<ParticipantDto>,
    pub archived: bool,

    /// Open-ended field map
    #[schema(value_type = Object)]
    pub details: serde_json::Value,

    #[schema(example = "none")]
    pub compliance_status: String,
    pub compliance_requested_at: Option<DateTime<Utc>>,
    pub compliance_reviewed_at: Option<DateTime<Utc>>,
    pub compliance_reviewer_id: Option<i64>,

    /// Derived from `end_date` and `status`
    pub urgency: UrgencyDto,
}

/// Due-date urgency of a loop
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UrgencyDto {
    #[schema(example = "due-soon")]
    pub level: String,

    /// Days overdue or days left
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "CLOSING SOON: 2 DAYS LEFT")]
    pub badge: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "2 days left")]
    pub countdown: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoopImageDto {
    pub filename: String,
    #[serde(default)]
    pub original_name: Option<String>,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParticipantDto {
    /// User id from the people directory
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Loop list response
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoopListResponse {
    pub rows: Vec<LoopDto>,
    pub count: usize,
}

/// Query parameters for the plain loop listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListLoopsQuery {
    /// API status value or UI label
    pub status: Option<String>,
    pub r#type: Option<String>,
    pub search: Option<String>,
    /// Only `current` is recognised
    pub end_month: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub limit: Option<String>,
    /// `true` lists archived loops
    pub archived: Option<String>,
}

/// Query parameters for the merged listing (archival mode, any sort key, review tags)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrowseLoopsQuery {
    pub status: Option<String>,
    pub r#type: Option<String>,
    pub search: Option<String>,
    pub end_month: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub limit: Option<String>,
    /// `hide` (default), `only` or `all`
    pub archived: Option<String>,
    /// Comma-separated listing-side review tags
    pub listing_tags: Option<String>,
    /// Comma-separated buying-side review tags
    pub buying_tags: Option<String>,
    /// `any` (default) or `unsubmitted`
    pub review_stage: Option<String>,
}

/// Loop creation request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateLoopRequest {
    #[schema(example = "Listing for Sale")]
    pub r#type: String,
    #[serde(default)]
    pub sale: Option<f64>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub tags: Option<String>,
    /// API status value or UI label; defaults to `active`
    #[serde(default)]
    pub status: Option<String>,
    pub property_address: String,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default)]
    pub client_phone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub images: Vec<LoopImageDto>,
    #[serde(default)]
    pub participants: Vec<ParticipantDto>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

/// Partial loop update; absent fields are preserved, `null` clears nullable ones
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateLoopRequest {
    #[serde(default)]
    pub r#type: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<f64>)]
    pub sale: Option<Option<f64>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>, format = Date)]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>, format = Date)]
    pub end_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub tags: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub property_address: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub client_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub client_email: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub client_phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
    #[serde(default)]
    pub participants: Option<Vec<ParticipantDto>>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    /// Images uploaded with this update
    #[serde(default)]
    pub new_images: Vec<LoopImageDto>,
    /// Replace the current images instead of appending
    #[serde(default)]
    pub replace_images: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreatedResponse {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UpdateLoopResponse {
    pub changed: bool,
}

/// Dashboard figures
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoopStatsDto {
    pub total: i64,
    pub active: i64,
    pub closing: i64,
    pub closed: i64,
    pub total_sales: f64,
    pub closing_soon: i64,
}

// ===== Task DTOs =====

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TaskDto {
    pub id: i64,
    pub loop_id: i64,
    pub title: String,
    pub due_date: Option<NaiveDate>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateTaskRequest {
    #[schema(example = "Order inspection")]
    pub title: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub completed: Option<bool>,
}

// ===== Document DTOs =====

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DocumentDto {
    pub id: i64,
    pub loop_id: i64,
    /// Stored file name
    pub filename: String,
    pub original_name: String,
    pub size: Option<i64>,
    pub mime_type: Option<String>,
    pub uploaded_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Metadata of an uploaded file
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateDocumentRequest {
    #[schema(example = "purchase-agreement.pdf")]
    pub original_name: String,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

// ===== Organization DTOs =====

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrganizationDto {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_by: i64,
    pub creator_name: Option<String>,
    pub member_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Organization together with its members
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrganizationDetailsDto {
    #[serde(flatten)]
    pub organization: OrganizationDto,
    pub members: Vec<OrgMemberDto>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrgMemberDto {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub assigned_by: i64,
    pub assigned_by_name: Option<String>,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateOrganizationRequest {
    #[schema(example = "Downtown Team")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Users to assign right away
    #[serde(default)]
    pub user_ids: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateOrganizationRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AddMemberRequest {
    pub user_id: i64,
}

// ===== People DTOs =====

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PersonDto {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub suspended: bool,
    pub last_active: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub organizations: Vec<OrgRefDto>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrgRefDto {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PeopleQuery {
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_request_tells_null_from_absent() {
        let req: UpdateLoopRequest =
            serde_json::from_str(r#"{"sale": null, "notes": "call back"}"#).unwrap();
        assert_eq!(req.sale, Some(None));
        assert_eq!(req.notes, Some(Some("call back".to_string())));
        assert_eq!(req.end_date, None);
        assert!(!req.replace_images);
    }
}
