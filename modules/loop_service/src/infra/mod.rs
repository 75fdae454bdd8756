//! Infrastructure layer - database storage and attachment files

pub mod attachments;
pub mod storage;

pub use attachments::FsAttachmentStore;
