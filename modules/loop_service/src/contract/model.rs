//! Contract models for the loop service
//!
//! These models are transport-agnostic and used for inter-module communication.
//! NO serde derives - these are pure domain models.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Identity of a row in the record store (auto-incrementing)
pub type RecordId = i64;

/// A transaction record ("loop")
#[derive(Debug, Clone, PartialEq)]
pub struct Loop {
    pub id: RecordId,
    /// Transaction category (e.g. "Listing for Sale", "Purchase")
    pub r#type: String,
    pub sale: Option<f64>,
    /// Owning actor; immutable after creation
    pub creator_id: RecordId,
    /// Creator display name, joined from the user directory
    pub creator_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub tags: Option<String>,
    pub status: LoopStatus,
    pub property_address: String,
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub notes: Option<String>,
    pub images: Vec<LoopImage>,
    pub participants: Vec<Participant>,
    pub archived: bool,
    pub details: LoopDetails,
    pub compliance: ComplianceRecord,
}

/// Uploaded image attached to a loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopImage {
    /// Stored (system-generated) file name
    pub filename: String,
    pub original_name: Option<String>,
    pub size: Option<i64>,
    pub mime_type: Option<String>,
}

/// Person taking part in a loop (buyer, seller, co-agent, ...)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Directory user this entry refers to
    pub id: Option<RecordId>,
    pub name: String,
    pub email: Option<String>,
}

/// Open-ended per-loop field map (financials, contract dates, ...)
pub type LoopDetails = BTreeMap<String, DetailValue>;

/// Value kinds accepted in [`LoopDetails`]
#[derive(Debug, Clone, PartialEq)]
pub enum DetailValue {
    Text(String),
    Number(f64),
    Null,
}

/// Loop status as stored by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoopStatus {
    #[default]
    Active,
    Closing,
    Closed,
    Cancelled,
    UnderContract,
    Withdrawn,
    Sold,
    Terminated,
    PreOffer,
}

impl LoopStatus {
    pub const ALL: [LoopStatus; 9] = [
        LoopStatus::Active,
        LoopStatus::Closing,
        LoopStatus::Closed,
        LoopStatus::Cancelled,
        LoopStatus::UnderContract,
        LoopStatus::Withdrawn,
        LoopStatus::Sold,
        LoopStatus::Terminated,
        LoopStatus::PreOffer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LoopStatus::Active => "active",
            LoopStatus::Closing => "closing",
            LoopStatus::Closed => "closed",
            LoopStatus::Cancelled => "cancelled",
            LoopStatus::UnderContract => "under-contract",
            LoopStatus::Withdrawn => "withdrawn",
            LoopStatus::Sold => "sold",
            LoopStatus::Terminated => "terminated",
            LoopStatus::PreOffer => "pre-offer",
        }
    }

    /// Statuses that count as "still in flight" for closing-soon and overdue views
    pub fn is_open(self) -> bool {
        matches!(self, LoopStatus::Active | LoopStatus::Closing)
    }

    /// Map a UI status label onto the stored API value.
    ///
    /// Returns `Ok(None)` for the empty label ("No Status").
    pub fn from_ui_label(label: &str) -> Result<Option<Self>, UnknownValue> {
        let status = match label {
            "" => return Ok(None),
            "pre-listing" | "private-listing" | "active-listing" | "new" => LoopStatus::Active,
            "in-progress" => LoopStatus::Closing,
            "leased" | "done" => LoopStatus::Closed,
            other => other.parse()?,
        };
        Ok(Some(status))
    }
}

impl fmt::Display for LoopStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoopStatus {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LoopStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownValue::new("status", s))
    }
}

/// Approval state of a loop's paperwork
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ComplianceStatus {
    #[default]
    None,
    Pending,
    Approved,
    Denied,
}

impl ComplianceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ComplianceStatus::None => "none",
            ComplianceStatus::Pending => "pending",
            ComplianceStatus::Approved => "approved",
            ComplianceStatus::Denied => "denied",
        }
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplianceStatus {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(ComplianceStatus::None),
            "pending" => Ok(ComplianceStatus::Pending),
            "approved" => Ok(ComplianceStatus::Approved),
            "denied" => Ok(ComplianceStatus::Denied),
            other => Err(UnknownValue::new("compliance_status", other)),
        }
    }
}

/// Compliance workflow columns of a loop
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComplianceRecord {
    pub status: ComplianceStatus,
    pub requested_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewer_id: Option<RecordId>,
}

/// Fields accepted when creating a loop
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewLoop {
    pub r#type: String,
    pub sale: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub tags: Option<String>,
    pub status: Option<LoopStatus>,
    pub property_address: String,
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub notes: Option<String>,
    pub images: Vec<LoopImage>,
    pub participants: Vec<Participant>,
    pub details: LoopDetails,
}

/// Partial update of a loop.
///
/// `None` leaves the stored value untouched. For nullable columns the inner
/// `Option` distinguishes "set to null" from "set to value".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoopPatch {
    pub r#type: Option<String>,
    pub sale: Option<Option<f64>>,
    pub start_date: Option<Option<NaiveDate>>,
    pub end_date: Option<Option<NaiveDate>>,
    pub tags: Option<Option<String>>,
    pub status: Option<LoopStatus>,
    pub property_address: Option<String>,
    pub client_name: Option<Option<String>>,
    pub client_email: Option<Option<String>>,
    pub client_phone: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub participants: Option<Vec<Participant>>,
    pub details: Option<LoopDetails>,
    /// Newly uploaded images
    pub new_images: Vec<LoopImage>,
    /// Replace the existing images instead of appending
    pub replace_images: bool,
}

impl LoopPatch {
    pub fn is_empty(&self) -> bool {
        self.r#type.is_none()
            && self.sale.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.tags.is_none()
            && self.status.is_none()
            && self.property_address.is_none()
            && self.client_name.is_none()
            && self.client_email.is_none()
            && self.client_phone.is_none()
            && self.notes.is_none()
            && self.participants.is_none()
            && self.details.is_none()
            && self.new_images.is_empty()
    }
}

/// Result of a partial update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub changed: bool,
}

/// Aggregate dashboard figures over non-archived loops
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoopStats {
    pub total: i64,
    pub active: i64,
    pub closing: i64,
    pub closed: i64,
    pub total_sales: Option<f64>,
    /// Actor-scoped closing-soon count
    pub closing_soon: i64,
}

/// Checklist item owned by a loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: RecordId,
    pub loop_id: RecordId,
    pub title: String,
    pub due_date: Option<NaiveDate>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_by: Option<RecordId>,
    pub created_at: DateTime<Utc>,
}

/// Partial update of a task; absent fields keep their values
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub completed: Option<bool>,
}

/// Uploaded file metadata owned by a loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: RecordId,
    pub loop_id: RecordId,
    /// Stored (system-generated, unique) file name
    pub filename: String,
    pub original_name: String,
    pub size: Option<i64>,
    pub mime_type: Option<String>,
    pub uploaded_by: Option<RecordId>,
    pub created_at: DateTime<Utc>,
}

/// Metadata of a freshly uploaded document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub original_name: String,
    pub size: Option<i64>,
    pub mime_type: Option<String>,
}

/// Named group of users
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organization {
    pub id: RecordId,
    pub name: String,
    pub description: String,
    pub created_by: RecordId,
    pub creator_name: Option<String>,
    pub member_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Organization together with its members
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationDetails {
    pub organization: Organization,
    pub members: Vec<OrgMember>,
}

/// Fields accepted when creating or updating an organization
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrganizationInput {
    pub name: String,
    pub description: Option<String>,
}

/// A user assigned to an organization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgMember {
    pub user_id: RecordId,
    pub name: String,
    pub email: String,
    pub role: String,
    pub assigned_by: RecordId,
    pub assigned_by_name: Option<String>,
    pub assigned_at: DateTime<Utc>,
}

/// Directory entry for a user (referenced, not owned, by this service)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    pub role: String,
    pub suspended: bool,
    pub last_active: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub organizations: Vec<OrgRef>,
}

/// Short organization reference used in the people directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgRef {
    pub id: RecordId,
    pub name: String,
}

/// Authenticated caller of a service operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: RecordId,
    pub name: String,
    pub is_admin: bool,
}

impl Actor {
    /// Create an admin actor
    pub fn admin(user_id: RecordId, name: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
            is_admin: true,
        }
    }

    /// Create a non-admin (agent) actor
    pub fn agent(user_id: RecordId, name: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
            is_admin: false,
        }
    }

    /// Whether this actor may read or modify the given loop
    pub fn can_access(&self, lp: &Loop) -> bool {
        self.is_admin || lp.creator_id == self.user_id
    }

    /// Creator restriction applied to loop reads for this actor
    pub fn scope(&self) -> Option<RecordId> {
        (!self.is_admin).then_some(self.user_id)
    }
}

/// A string that is not part of a closed vocabulary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {field} value '{value}'")]
pub struct UnknownValue {
    pub field: &'static str,
    pub value: String,
}

impl UnknownValue {
    pub fn new(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}
