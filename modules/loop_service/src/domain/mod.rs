//! Domain layer - business logic and services

pub mod compliance;
pub mod events;
pub mod listing;
pub mod ordering;
pub mod query;
pub mod repository;
pub mod review;
pub mod service;
pub mod urgency;
pub mod validation;

pub use compliance::{ComplianceAction, ComplianceChange};
pub use events::{ChangeKind, EventPublisher, LoopEvent, NoOpEventPublisher, TracingEventPublisher};
pub use listing::{merge_archival_sets, ArchivedMode, BrowseRequest};
pub use ordering::{SortKey, SortValue};
pub use query::{EndMonth, LoopFilter, LoopQuery, SortField, SortOrder};
pub use repository::{
    AttachmentStore, DocumentRepository, DuplicateKey, LoopRepository,
    OrganizationRepository, Repositories, TaskRepository, UserDirectory,
};
pub use review::{ReviewFilter, ReviewStage, ReviewTag};
pub use service::Service;
pub use urgency::Urgency;
