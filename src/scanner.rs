//! Scanner module - folder listing and eligibility filtering
//!
//! Reads the session folder and reports which images are still in play.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::file_ops::StorageError;
use crate::scheduler::ImageId;

/// Name of the subdirectory receiving discarded images.
pub const DISCARD_DIR_NAME: &str = "discarded";

/// Per-session settings shared by the listing and discard operations.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub folder: PathBuf,
    /// Supported file extensions, lowercase without the dot.
    pub extensions: Vec<String>,
}

impl SessionConfig {
    pub fn new(folder: PathBuf) -> Self {
        Self {
            folder,
            extensions: vec!["png".into(), "jpg".into(), "jpeg".into()],
        }
    }

    /// Where discarded images end up.
    pub fn discard_dir(&self) -> PathBuf {
        self.folder.join(DISCARD_DIR_NAME)
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                self.extensions.iter().any(|supported| *supported == ext)
            })
            .unwrap_or(false)
    }
}

/// List the images currently eligible for comparison, sorted by name.
///
/// Only direct children of the session folder count, so the discard
/// subdirectory is never traversed.
pub fn list_eligible_images(config: &SessionConfig) -> Result<Vec<ImageId>, StorageError> {
    let mut images = Vec::new();

    let walker = WalkDir::new(&config.folder)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false);

    for entry in walker {
        let entry = entry.map_err(|e| StorageError::ListFolder {
            path: config.folder.clone(),
            source: e.into(),
        })?;

        if !entry.file_type().is_file() {
            continue;
        }
        if !config.matches_extension(entry.path()) {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        images.push(ImageId::new(name));
    }

    images.sort();
    Ok(images)
}
