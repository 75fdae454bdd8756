//! Entity to model mappers
//!
//! Conversions between SeaORM entities and contract models

use super::entity::{documents, loops, memberships, organizations, tasks, users};
use crate::contract::{
    ComplianceRecord, Document, Loop, LoopImage, NewLoop, OrgMember, OrgRef, Organization,
    Participant, Person, RecordId, Task,
};
use crate::domain::validation::{details_from_json, details_to_json};
use sea_orm::ActiveValue::{NotSet, Set};
use serde::{Deserialize, Serialize};

// ===== Loop Conversions =====

impl TryFrom<(loops::Model, Option<users::Model>)> for Loop {
    type Error = anyhow::Error;

    fn try_from((entity, creator): (loops::Model, Option<users::Model>)) -> Result<Self, Self::Error> {
        let details = match &entity.details {
            Some(value) => details_from_json(value)?,
            None => Default::default(),
        };

        Ok(Self {
            id: entity.id,
            r#type: entity.r#type,
            sale: entity.sale,
            creator_id: entity.creator_id,
            creator_name: creator.map(|u| u.name),
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            start_date: entity.start_date,
            end_date: entity.end_date,
            tags: entity.tags,
            status: entity.status.parse()?,
            property_address: entity.property_address,
            client_name: entity.client_name,
            client_email: entity.client_email,
            client_phone: entity.client_phone,
            notes: entity.notes,
            images: decode_list::<ImageJson>(entity.images)?
                .into_iter()
                .map(Into::into)
                .collect(),
            participants: decode_list::<ParticipantJson>(entity.participants)?
                .into_iter()
                .map(Into::into)
                .collect(),
            archived: entity.archived,
            details,
            compliance: ComplianceRecord {
                status: entity.compliance_status.parse()?,
                requested_at: entity.compliance_requested_at,
                reviewed_at: entity.compliance_reviewed_at,
                reviewer_id: entity.compliance_reviewer_id,
            },
        })
    }
}

/// Insert model for a new loop; compliance starts at `none`
pub fn new_loop_active_model(
    creator_id: i64,
    new_loop: &NewLoop,
    now: chrono::DateTime<chrono::Utc>,
) -> anyhow::Result<loops::ActiveModel> {
    Ok(loops::ActiveModel {
        id: NotSet,
        r#type: Set(new_loop.r#type.clone()),
        sale: Set(new_loop.sale),
        creator_id: Set(creator_id),
        created_at: Set(now),
        updated_at: Set(now),
        start_date: Set(new_loop.start_date),
        end_date: Set(new_loop.end_date),
        tags: Set(new_loop.tags.clone()),
        status: Set(new_loop.status.unwrap_or_default().as_str().to_string()),
        property_address: Set(new_loop.property_address.clone()),
        client_name: Set(new_loop.client_name.clone()),
        client_email: Set(new_loop.client_email.clone()),
        client_phone: Set(new_loop.client_phone.clone()),
        notes: Set(new_loop.notes.clone()),
        images: Set(encode_images(&new_loop.images)?),
        participants: Set(encode_participants(&new_loop.participants)?),
        archived: Set(false),
        details: Set(encode_details(&new_loop.details)),
        compliance_status: Set(ComplianceRecord::default().status.as_str().to_string()),
        compliance_requested_at: Set(None),
        compliance_reviewed_at: Set(None),
        compliance_reviewer_id: Set(None),
    })
}

/// Update model carrying every mutable column; identity, owner, creation time,
/// archive flag and compliance columns are left untouched
pub fn loop_update_active_model(lp: &Loop) -> anyhow::Result<loops::ActiveModel> {
    Ok(loops::ActiveModel {
        id: NotSet,
        r#type: Set(lp.r#type.clone()),
        sale: Set(lp.sale),
        creator_id: NotSet,
        created_at: NotSet,
        updated_at: Set(lp.updated_at),
        start_date: Set(lp.start_date),
        end_date: Set(lp.end_date),
        tags: Set(lp.tags.clone()),
        status: Set(lp.status.as_str().to_string()),
        property_address: Set(lp.property_address.clone()),
        client_name: Set(lp.client_name.clone()),
        client_email: Set(lp.client_email.clone()),
        client_phone: Set(lp.client_phone.clone()),
        notes: Set(lp.notes.clone()),
        images: Set(encode_images(&lp.images)?),
        participants: Set(encode_participants(&lp.participants)?),
        archived: NotSet,
        details: Set(encode_details(&lp.details)),
        compliance_status: NotSet,
        compliance_requested_at: NotSet,
        compliance_reviewed_at: NotSet,
        compliance_reviewer_id: NotSet,
    })
}

fn encode_images(images: &[LoopImage]) -> anyhow::Result<Option<serde_json::Value>> {
    if images.is_empty() {
        return Ok(None);
    }
    let rows: Vec<ImageJson> = images.iter().map(Into::into).collect();
    Ok(Some(serde_json::to_value(rows)?))
}

fn encode_participants(participants: &[Participant]) -> anyhow::Result<Option<serde_json::Value>> {
    if participants.is_empty() {
        return Ok(None);
    }
    let rows: Vec<ParticipantJson> = participants.iter().map(Into::into).collect();
    Ok(Some(serde_json::to_value(rows)?))
}

fn encode_details(details: &crate::contract::LoopDetails) -> Option<serde_json::Value> {
    (!details.is_empty()).then(|| details_to_json(details))
}

fn decode_list<T: for<'de> Deserialize<'de>>(
    value: Option<serde_json::Value>,
) -> anyhow::Result<Vec<T>> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(Vec::new()),
        Some(value) => Ok(serde_json::from_value(value)?),
    }
}

// ===== JSON Serialization Helpers =====

/// JSON representation of an image entry for database storage
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ImageJson {
    filename: String,
    #[serde(default, alias = "originalname")]
    original_name: Option<String>,
    #[serde(default)]
    size: Option<i64>,
    #[serde(default, alias = "mimetype")]
    mime_type: Option<String>,
}

impl From<ImageJson> for LoopImage {
    fn from(json: ImageJson) -> Self {
        Self {
            filename: json.filename,
            original_name: json.original_name,
            size: json.size,
            mime_type: json.mime_type,
        }
    }
}

impl From<&LoopImage> for ImageJson {
    fn from(image: &LoopImage) -> Self {
        Self {
            filename: image.filename.clone(),
            original_name: image.original_name.clone(),
            size: image.size,
            mime_type: image.mime_type.clone(),
        }
    }
}

/// JSON representation of a participant entry for database storage
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ParticipantJson {
    #[serde(default, deserialize_with = "lenient_user_id")]
    id: Option<RecordId>,
    name: String,
    #[serde(default)]
    email: Option<String>,
}

/// User ids appear both as numbers and as numeric strings in stored blobs
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredUserId {
    Number(RecordId),
    Text(String),
}

fn lenient_user_id<'de, D>(deserializer: D) -> Result<Option<RecordId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let id = Option::<StoredUserId>::deserialize(deserializer)?;
    Ok(id.and_then(|id| match id {
        StoredUserId::Number(id) => Some(id),
        StoredUserId::Text(text) => text.trim().parse().ok(),
    }))
}

impl From<ParticipantJson> for Participant {
    fn from(json: ParticipantJson) -> Self {
        Self {
            id: json.id,
            name: json.name,
            email: json.email,
        }
    }
}

impl From<&Participant> for ParticipantJson {
    fn from(participant: &Participant) -> Self {
        Self {
            id: participant.id,
            name: participant.name.clone(),
            email: participant.email.clone(),
        }
    }
}

// ===== Task / Document Conversions =====

impl From<tasks::Model> for Task {
    fn from(entity: tasks::Model) -> Self {
        Self {
            id: entity.id,
            loop_id: entity.loop_id,
            title: entity.title,
            due_date: entity.due_date,
            completed: entity.completed,
            completed_at: entity.completed_at,
            created_by: entity.created_by,
            created_at: entity.created_at,
        }
    }
}

impl From<documents::Model> for Document {
    fn from(entity: documents::Model) -> Self {
        Self {
            id: entity.id,
            loop_id: entity.loop_id,
            filename: entity.filename,
            original_name: entity.original_name,
            size: entity.size,
            mime_type: entity.mime_type,
            uploaded_by: entity.uploaded_by,
            created_at: entity.created_at,
        }
    }
}

// ===== Organization / People Conversions =====

/// Organization row with its joined creator and member count
pub fn organization_from_entity(
    entity: organizations::Model,
    creator: Option<users::Model>,
    member_count: i64,
) -> Organization {
    Organization {
        id: entity.id,
        name: entity.name,
        description: entity.description,
        created_by: entity.created_by,
        creator_name: creator.map(|u| u.name),
        member_count,
        created_at: entity.created_at,
        updated_at: entity.updated_at,
    }
}

/// Membership row with the member and the assigner's name
pub fn member_from_entity(
    membership: memberships::Model,
    user: users::Model,
    assigned_by_name: Option<String>,
) -> OrgMember {
    OrgMember {
        user_id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
        assigned_by: membership.assigned_by,
        assigned_by_name,
        assigned_at: membership.assigned_at,
    }
}

/// Directory entry with the user's organizations
pub fn person_from_entity(user: users::Model, organizations: Vec<OrgRef>) -> Person {
    Person {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
        suspended: user.suspended,
        last_active: user.last_active,
        created_at: user.created_at,
        organizations,
    }
}
