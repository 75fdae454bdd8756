//! Configuration for the loop service module

use serde::Deserialize;
use std::path::PathBuf;

/// Loop service configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Width of the closing-soon window in days (inclusive of today)
    #[serde(default = "default_closing_soon_days")]
    pub closing_soon_days: u32,

    /// Directory holding uploaded loop images
    #[serde(default = "default_attachments_dir")]
    pub attachments_dir: PathBuf,

    /// Remove image files when their loop is deleted or the images are replaced
    #[serde(default = "default_true")]
    pub remove_images_on_delete: bool,

    /// Dispatch change notifications for loop create/update/compliance events
    #[serde(default = "default_true")]
    pub notify_on_loop_change: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            closing_soon_days: default_closing_soon_days(),
            attachments_dir: default_attachments_dir(),
            remove_images_on_delete: true,
            notify_on_loop_change: true,
        }
    }
}

fn default_closing_soon_days() -> u32 {
    3
}

fn default_attachments_dir() -> PathBuf {
    PathBuf::from("uploads/loops")
}

fn default_true() -> bool {
    true
}
