//! Compliance review workflow
//!
//! `none -> pending -> approved | denied`, re-enterable through a fresh
//! request from any state. Every transition is an unconditional write.

use crate::contract::{Actor, ComplianceRecord, ComplianceStatus, LoopError, RecordId};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplianceAction {
    Request,
    Approve,
    Deny,
}

impl ComplianceAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ComplianceAction::Request => "request",
            ComplianceAction::Approve => "approve",
            ComplianceAction::Deny => "deny",
        }
    }

    /// Role check; loop ownership for `Request` is checked by the caller
    pub fn authorize(self, actor: &Actor) -> Result<(), LoopError> {
        match self {
            ComplianceAction::Request => Ok(()),
            ComplianceAction::Approve | ComplianceAction::Deny if actor.is_admin => Ok(()),
            ComplianceAction::Approve | ComplianceAction::Deny => Err(LoopError::forbidden(
                format!("only admins may {} compliance", self.as_str()),
            )),
        }
    }

    /// Column writes produced by this action
    pub fn change(self, actor: &Actor, at: DateTime<Utc>) -> ComplianceChange {
        match self {
            ComplianceAction::Request => ComplianceChange::Requested { at },
            ComplianceAction::Approve => ComplianceChange::Reviewed {
                status: ComplianceStatus::Approved,
                at,
                reviewer_id: actor.user_id,
            },
            ComplianceAction::Deny => ComplianceChange::Reviewed {
                status: ComplianceStatus::Denied,
                at,
                reviewer_id: actor.user_id,
            },
        }
    }
}

/// Column writes of a single transition; untouched columns keep their values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplianceChange {
    /// `status = pending`, `requested_at = at`
    Requested { at: DateTime<Utc> },
    /// `status`, `reviewed_at = at`, `reviewer_id`
    Reviewed {
        status: ComplianceStatus,
        at: DateTime<Utc>,
        reviewer_id: RecordId,
    },
}

impl ComplianceChange {
    pub fn status(&self) -> ComplianceStatus {
        match self {
            ComplianceChange::Requested { .. } => ComplianceStatus::Pending,
            ComplianceChange::Reviewed { status, .. } => *status,
        }
    }

    pub fn apply(&self, record: &mut ComplianceRecord) {
        match *self {
            ComplianceChange::Requested { at } => {
                record.status = ComplianceStatus::Pending;
                record.requested_at = Some(at);
            }
            ComplianceChange::Reviewed {
                status,
                at,
                reviewer_id,
            } => {
                record.status = status;
                record.reviewed_at = Some(at);
                record.reviewer_id = Some(reviewer_id);
            }
        }
    }
}
