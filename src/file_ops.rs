//! File operations module - discard moves and conflict handling
//!
//! Moving an image into the discard folder is the only way an image
//! leaves a session, so every failure here ends the session.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::scanner::{self, SessionConfig};
use crate::scheduler::{ImageId, ImageStore};

/// Errors surfaced by the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("conflicting file in discard folder: {name} ({existing} bytes there, {incoming} bytes here)")]
    Conflict {
        name: String,
        existing: u64,
        incoming: u64,
    },

    #[error("failed to list folder {path}: {source}")]
    ListFolder {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create discard folder {path}: {source}")]
    CreateDiscardDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to inspect {path}: {source}")]
    Inspect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to move {name} to the discard folder: {source}")]
    Move {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// How a discard resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardOutcome {
    /// Fresh move into the discard folder.
    Moved,
    /// Same name and size were already there; the old copy was replaced.
    Replaced,
}

/// Move an image into the session's discard folder.
///
/// An existing target with the same byte size is treated as the same
/// content from an earlier session and replaced. An existing target with
/// a different size is a conflict and neither file is touched.
pub fn discard_image(config: &SessionConfig, id: &ImageId) -> Result<DiscardOutcome, StorageError> {
    let discard_dir = config.discard_dir();
    fs::create_dir_all(&discard_dir).map_err(|e| StorageError::CreateDiscardDir {
        path: discard_dir.clone(),
        source: e,
    })?;

    let source = config.folder.join(id.as_str());
    let target = discard_dir.join(id.as_str());

    if target.exists() {
        let incoming = file_size(&source)?;
        let existing = file_size(&target)?;
        if incoming != existing {
            return Err(StorageError::Conflict {
                name: id.to_string(),
                existing,
                incoming,
            });
        }
        move_file(id, &source, &target)?;
        return Ok(DiscardOutcome::Replaced);
    }

    move_file(id, &source, &target)?;
    Ok(DiscardOutcome::Moved)
}

fn file_size(path: &Path) -> Result<u64, StorageError> {
    fs::metadata(path)
        .map(|meta| meta.len())
        .map_err(|e| StorageError::Inspect {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Rename, falling back to copy + delete for cross-drive moves. Both
/// paths replace an existing target.
fn move_file(id: &ImageId, source: &Path, target: &Path) -> Result<(), StorageError> {
    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(rename_err) => match fs::copy(source, target) {
            Ok(_) => fs::remove_file(source).map_err(|e| {
                // Copy landed but the source lingers; drop the copy again.
                let _ = fs::remove_file(target);
                StorageError::Move {
                    name: id.to_string(),
                    source: e,
                }
            }),
            Err(_) => Err(StorageError::Move {
                name: id.to_string(),
                source: rename_err,
            }),
        },
    }
}

/// File-system backed store driving a GUI session.
pub struct FolderStore {
    config: SessionConfig,
}

impl FolderStore {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

impl ImageStore for FolderStore {
    fn list_eligible(&self) -> Result<Vec<ImageId>, StorageError> {
        scanner::list_eligible_images(&self.config)
    }

    fn discard(&mut self, id: &ImageId) -> Result<(), StorageError> {
        match discard_image(&self.config, id)? {
            DiscardOutcome::Moved => log::info!("{} moved to discard folder", id),
            DiscardOutcome::Replaced => log::info!("{} replaced in discard folder", id),
        }
        Ok(())
    }
}
