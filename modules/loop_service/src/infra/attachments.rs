//! Filesystem-backed storage of uploaded loop images

use crate::domain::repository::AttachmentStore;
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Image files kept as flat entries under a single directory
pub struct FsAttachmentStore {
    root: PathBuf,
}

impl FsAttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a stored file name; anything but a single plain path segment is rejected
    fn resolve(&self, filename: &str) -> Result<PathBuf> {
        let mut components = Path::new(filename).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => Ok(self.root.join(name)),
            _ => bail!("invalid attachment file name: {filename:?}"),
        }
    }
}

#[async_trait]
impl AttachmentStore for FsAttachmentStore {
    async fn remove(&self, filename: &str) -> Result<()> {
        let path = self.resolve(filename)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "removed attachment");
                Ok(())
            }
            // Already gone
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
