//! Mapper implementations for converting between DTOs and contract models
//!
//! Outbound conversions are infallible `From` impls. Inbound request bodies
//! are converted with `TryFrom`, since UI status labels and detail maps can
//! be rejected.

use super::dto::*;
use crate::contract::{
    self, LoopError, LoopStatus, NewDocument, NewLoop, OrganizationInput, TaskPatch,
};
use crate::domain::urgency::{self, Urgency};
use crate::domain::validation::{details_from_json, details_to_json};
use chrono::NaiveDate;

// ===== Loop conversions =====

/// Loop DTO with urgency derived relative to `today`
pub fn loop_dto(lp: contract::Loop, today: NaiveDate) -> LoopDto {
    let urgency = urgency::classify(lp.end_date, lp.status, today).into();
    LoopDto {
        id: lp.id,
        r#type: lp.r#type,
        sale: lp.sale,
        creator_id: lp.creator_id,
        creator_name: lp.creator_name,
        created_at: lp.created_at,
        updated_at: lp.updated_at,
        start_date: lp.start_date,
        end_date: lp.end_date,
        tags: lp.tags,
        status: lp.status.as_str().to_string(),
        property_address: lp.property_address,
        client_name: lp.client_name,
        client_email: lp.client_email,
        client_phone: lp.client_phone,
        notes: lp.notes,
        images: lp.images.into_iter().map(Into::into).collect(),
        participants: lp.participants.into_iter().map(Into::into).collect(),
        archived: lp.archived,
        details: details_to_json(&lp.details),
        compliance_status: lp.compliance.status.as_str().to_string(),
        compliance_requested_at: lp.compliance.requested_at,
        compliance_reviewed_at: lp.compliance.reviewed_at,
        compliance_reviewer_id: lp.compliance.reviewer_id,
        urgency,
    }
}

pub fn loop_list(loops: Vec<contract::Loop>, today: NaiveDate) -> LoopListResponse {
    let rows: Vec<LoopDto> = loops.into_iter().map(|lp| loop_dto(lp, today)).collect();
    LoopListResponse {
        count: rows.len(),
        rows,
    }
}

impl From<Urgency> for UrgencyDto {
    fn from(urgency: Urgency) -> Self {
        Self {
            level: urgency.as_str().to_string(),
            days: urgency.magnitude(),
            badge: urgency.badge_label(),
            countdown: urgency.countdown_text(),
        }
    }
}

impl From<contract::LoopImage> for LoopImageDto {
    fn from(image: contract::LoopImage) -> Self {
        Self {
            filename: image.filename,
            original_name: image.original_name,
            size: image.size,
            mime_type: image.mime_type,
        }
    }
}

impl From<LoopImageDto> for contract::LoopImage {
    fn from(dto: LoopImageDto) -> Self {
        Self {
            filename: dto.filename,
            original_name: dto.original_name,
            size: dto.size,
            mime_type: dto.mime_type,
        }
    }
}

impl From<contract::Participant> for ParticipantDto {
    fn from(p: contract::Participant) -> Self {
        Self {
            id: p.id,
            name: p.name,
            email: p.email,
        }
    }
}

impl From<ParticipantDto> for contract::Participant {
    fn from(dto: ParticipantDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
            email: dto.email,
        }
    }
}

/// Status from an API value or UI label; the empty label means "unset"
fn parse_status(raw: Option<&str>) -> Result<Option<LoopStatus>, LoopError> {
    match raw {
        None => Ok(None),
        Some(label) => {
            LoopStatus::from_ui_label(label.trim()).map_err(|e| LoopError::validation(e.to_string()))
        }
    }
}

impl TryFrom<CreateLoopRequest> for NewLoop {
    type Error = LoopError;

    fn try_from(req: CreateLoopRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            r#type: req.r#type,
            sale: req.sale,
            start_date: req.start_date,
            end_date: req.end_date,
            tags: req.tags,
            status: parse_status(req.status.as_deref())?,
            property_address: req.property_address,
            client_name: req.client_name,
            client_email: req.client_email,
            client_phone: req.client_phone,
            notes: req.notes,
            images: req.images.into_iter().map(Into::into).collect(),
            participants: req.participants.into_iter().map(Into::into).collect(),
            details: match &req.details {
                Some(value) => details_from_json(value)?,
                None => Default::default(),
            },
        })
    }
}

impl TryFrom<UpdateLoopRequest> for contract::LoopPatch {
    type Error = LoopError;

    fn try_from(req: UpdateLoopRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            r#type: req.r#type,
            sale: req.sale,
            start_date: req.start_date,
            end_date: req.end_date,
            tags: req.tags,
            status: parse_status(req.status.as_deref())?,
            property_address: req.property_address,
            client_name: req.client_name,
            client_email: req.client_email,
            client_phone: req.client_phone,
            notes: req.notes,
            participants: req
                .participants
                .map(|ps| ps.into_iter().map(Into::into).collect()),
            details: req.details.as_ref().map(details_from_json).transpose()?,
            new_images: req.new_images.into_iter().map(Into::into).collect(),
            replace_images: req.replace_images,
        })
    }
}

impl From<contract::LoopStats> for LoopStatsDto {
    fn from(stats: contract::LoopStats) -> Self {
        Self {
            total: stats.total,
            active: stats.active,
            closing: stats.closing,
            closed: stats.closed,
            total_sales: stats.total_sales.unwrap_or(0.0),
            closing_soon: stats.closing_soon,
        }
    }
}

// ===== Task / Document conversions =====

impl From<contract::Task> for TaskDto {
    fn from(task: contract::Task) -> Self {
        Self {
            id: task.id,
            loop_id: task.loop_id,
            title: task.title,
            due_date: task.due_date,
            completed: task.completed,
            completed_at: task.completed_at,
            created_by: task.created_by,
            created_at: task.created_at,
        }
    }
}

impl From<UpdateTaskRequest> for TaskPatch {
    fn from(req: UpdateTaskRequest) -> Self {
        Self {
            title: req.title,
            due_date: req.due_date,
            completed: req.completed,
        }
    }
}

impl From<contract::Document> for DocumentDto {
    fn from(doc: contract::Document) -> Self {
        Self {
            id: doc.id,
            loop_id: doc.loop_id,
            filename: doc.filename,
            original_name: doc.original_name,
            size: doc.size,
            mime_type: doc.mime_type,
            uploaded_by: doc.uploaded_by,
            created_at: doc.created_at,
        }
    }
}

impl From<CreateDocumentRequest> for NewDocument {
    fn from(req: CreateDocumentRequest) -> Self {
        Self {
            original_name: req.original_name,
            size: req.size,
            mime_type: req.mime_type,
        }
    }
}

// ===== Organization / People conversions =====

impl From<contract::Organization> for OrganizationDto {
    fn from(org: contract::Organization) -> Self {
        Self {
            id: org.id,
            name: org.name,
            description: org.description,
            created_by: org.created_by,
            creator_name: org.creator_name,
            member_count: org.member_count,
            created_at: org.created_at,
            updated_at: org.updated_at,
        }
    }
}

impl From<contract::OrganizationDetails> for OrganizationDetailsDto {
    fn from(details: contract::OrganizationDetails) -> Self {
        Self {
            organization: details.organization.into(),
            members: details.members.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<contract::OrgMember> for OrgMemberDto {
    fn from(m: contract::OrgMember) -> Self {
        Self {
            user_id: m.user_id,
            name: m.name,
            email: m.email,
            role: m.role,
            assigned_by: m.assigned_by,
            assigned_by_name: m.assigned_by_name,
            assigned_at: m.assigned_at,
        }
    }
}

impl From<CreateOrganizationRequest> for OrganizationInput {
    fn from(req: CreateOrganizationRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
        }
    }
}

impl From<UpdateOrganizationRequest> for OrganizationInput {
    fn from(req: UpdateOrganizationRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
        }
    }
}

impl From<contract::Person> for PersonDto {
    fn from(p: contract::Person) -> Self {
        Self {
            id: p.id,
            name: p.name,
            email: p.email,
            role: p.role,
            suspended: p.suspended,
            last_active: p.last_active,
            created_at: p.created_at,
            organizations: p
                .organizations
                .into_iter()
                .map(|o| OrgRefDto { id: o.id, name: o.name })
                .collect(),
        }
    }
}
