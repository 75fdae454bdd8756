/// Domain events for the loop service
///
/// Every successful mutation produces a [`LoopEvent`]:
/// - Activity entries: the audit trail of who changed what
/// - Notifications: loop changes worth telling the loop owner about (email, ...)
///
/// Publishing is best-effort; the service logs publisher failures and carries on.
use crate::contract::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Kind of change applied to a child record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

impl ChangeKind {
    fn as_upper(self) -> &'static str {
        match self {
            ChangeKind::Created => "CREATED",
            ChangeKind::Updated => "UPDATED",
            ChangeKind::Deleted => "DELETED",
        }
    }
}

/// Domain event types for loops and organizations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum LoopEvent {
    LoopCreated {
        loop_id: RecordId,
        actor_id: RecordId,
        property_address: String,
        timestamp: DateTime<Utc>,
    },
    LoopUpdated {
        loop_id: RecordId,
        actor_id: RecordId,
        /// Names of the fields present in the patch
        fields: Vec<String>,
        timestamp: DateTime<Utc>,
    },
    LoopDeleted {
        loop_id: RecordId,
        actor_id: RecordId,
        timestamp: DateTime<Utc>,
    },
    LoopArchived {
        loop_id: RecordId,
        actor_id: RecordId,
        archived: bool,
        timestamp: DateTime<Utc>,
    },
    ImageDeleted {
        loop_id: RecordId,
        actor_id: RecordId,
        filename: String,
        timestamp: DateTime<Utc>,
    },
    ComplianceChanged {
        loop_id: RecordId,
        actor_id: RecordId,
        status: String,
        timestamp: DateTime<Utc>,
    },
    TaskChanged {
        loop_id: RecordId,
        task_id: RecordId,
        actor_id: RecordId,
        change: ChangeKind,
        timestamp: DateTime<Utc>,
    },
    DocumentChanged {
        loop_id: RecordId,
        document_id: RecordId,
        actor_id: RecordId,
        change: ChangeKind,
        timestamp: DateTime<Utc>,
    },
    OrganizationChanged {
        organization_id: RecordId,
        actor_id: RecordId,
        change: ChangeKind,
        timestamp: DateTime<Utc>,
    },
    MembershipChanged {
        organization_id: RecordId,
        user_id: RecordId,
        actor_id: RecordId,
        assigned: bool,
        timestamp: DateTime<Utc>,
    },
}

impl LoopEvent {
    /// Activity-log action name, e.g. `TASK_CREATED`
    pub fn action(&self) -> String {
        match self {
            LoopEvent::LoopCreated { .. } => "LOOP_CREATED".to_string(),
            LoopEvent::LoopUpdated { .. } => "LOOP_UPDATED".to_string(),
            LoopEvent::LoopDeleted { .. } => "LOOP_DELETED".to_string(),
            LoopEvent::LoopArchived { archived: true, .. } => "LOOP_ARCHIVED".to_string(),
            LoopEvent::LoopArchived { archived: false, .. } => "LOOP_UNARCHIVED".to_string(),
            LoopEvent::ImageDeleted { .. } => "LOOP_IMAGE_DELETED".to_string(),
            LoopEvent::ComplianceChanged { status, .. } => {
                format!("COMPLIANCE_{}", status.to_uppercase())
            }
            LoopEvent::TaskChanged { change, .. } => format!("TASK_{}", change.as_upper()),
            LoopEvent::DocumentChanged { change, .. } => format!("DOCUMENT_{}", change.as_upper()),
            LoopEvent::OrganizationChanged { change, .. } => {
                format!("ORGANIZATION_{}", change.as_upper())
            }
            LoopEvent::MembershipChanged { assigned: true, .. } => "USER_ASSIGNED".to_string(),
            LoopEvent::MembershipChanged { assigned: false, .. } => "USER_UNASSIGNED".to_string(),
        }
    }

    /// Acting user
    pub fn actor_id(&self) -> RecordId {
        match self {
            LoopEvent::LoopCreated { actor_id, .. }
            | LoopEvent::LoopUpdated { actor_id, .. }
            | LoopEvent::LoopDeleted { actor_id, .. }
            | LoopEvent::LoopArchived { actor_id, .. }
            | LoopEvent::ImageDeleted { actor_id, .. }
            | LoopEvent::ComplianceChanged { actor_id, .. }
            | LoopEvent::TaskChanged { actor_id, .. }
            | LoopEvent::DocumentChanged { actor_id, .. }
            | LoopEvent::OrganizationChanged { actor_id, .. }
            | LoopEvent::MembershipChanged { actor_id, .. } => *actor_id,
        }
    }

    /// Loop the event belongs to, if any
    pub fn loop_id(&self) -> Option<RecordId> {
        match self {
            LoopEvent::LoopCreated { loop_id, .. }
            | LoopEvent::LoopUpdated { loop_id, .. }
            | LoopEvent::LoopDeleted { loop_id, .. }
            | LoopEvent::LoopArchived { loop_id, .. }
            | LoopEvent::ImageDeleted { loop_id, .. }
            | LoopEvent::ComplianceChanged { loop_id, .. }
            | LoopEvent::TaskChanged { loop_id, .. }
            | LoopEvent::DocumentChanged { loop_id, .. } => Some(*loop_id),
            LoopEvent::OrganizationChanged { .. } | LoopEvent::MembershipChanged { .. } => None,
        }
    }

    /// Whether the loop owner should be notified about this event
    pub fn is_notifiable(&self) -> bool {
        matches!(
            self,
            LoopEvent::LoopCreated { .. }
                | LoopEvent::LoopUpdated { .. }
                | LoopEvent::ComplianceChanged { .. }
        )
    }
}

/// Event publisher trait for publishing domain events
#[async_trait::async_trait]
pub trait EventPublisher: Send + Sync {
    /// Record an activity-log entry
    async fn publish_activity(&self, event: &LoopEvent) -> anyhow::Result<()>;

    /// Dispatch a change notification
    async fn publish_notification(&self, event: &LoopEvent) -> anyhow::Result<()>;
}

/// No-op event publisher for testing or when events are disabled
pub struct NoOpEventPublisher;

#[async_trait::async_trait]
impl EventPublisher for NoOpEventPublisher {
    async fn publish_activity(&self, _event: &LoopEvent) -> anyhow::Result<()> {
        Ok(())
    }

    async fn publish_notification(&self, _event: &LoopEvent) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Publisher that records events as structured `tracing` events
pub struct TracingEventPublisher;

#[async_trait::async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish_activity(&self, event: &LoopEvent) -> anyhow::Result<()> {
        let payload = serde_json::to_string(event)?;
        info!(
            target: "loop_activity",
            action = %event.action(),
            actor_id = event.actor_id(),
            loop_id = ?event.loop_id(),
            payload = %payload,
            "activity"
        );
        Ok(())
    }

    async fn publish_notification(&self, event: &LoopEvent) -> anyhow::Result<()> {
        info!(
            target: "loop_notification",
            action = %event.action(),
            loop_id = ?event.loop_id(),
            "notification queued"
        );
        Ok(())
    }
}
