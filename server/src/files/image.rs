//! Image upload validation, storage and metadata.
//!
//! # Pre-conditions
//! - The upload directory exists and is writable.
//!
//! # Post-conditions
//! - Every recorded `ImageMetadata` refers to a file that was fully written.
//!
//! # Invariants
//! - Stored files never exceed `MAX_IMAGE_SIZE` bytes.
//! - Stored file names never contain path separators from the client.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use rand::Rng;
use rand::distr::Alphanumeric;
use serde::Serialize;

/// Largest accepted upload, in bytes.
pub const MAX_IMAGE_SIZE: usize = 8_000_000;

/// Length of the random prefix that keeps stored names unique.
const STORED_NAME_PREFIX_LENGTH: usize = 12;

/// Metadata recorded for each stored image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageMetadata {
    pub username: String,
    /// File name as sent by the client, without directories.
    pub name: String,
    pub content_type: String,
    pub size: u64,
    #[serde(skip)]
    pub stored_path: PathBuf,
}

/// Errors that can occur when accepting an upload.
#[derive(Debug)]
pub enum ImageError {
    /// The payload exceeds `MAX_IMAGE_SIZE`.
    TooLarge(usize),
    /// The content type is not `image/*`.
    NotAnImage(String),
    /// The client sent no usable file name.
    MissingFileName,
    /// Writing the file or recording its metadata failed.
    Storage(String),
}

impl std::fmt::Display for ImageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooLarge(size) => {
                write!(f, "file larger than 8 MB ({size} bytes)")
            }
            Self::NotAnImage(content_type) => write!(f, "not an image: '{content_type}'"),
            Self::MissingFileName => write!(f, "missing file name"),
            Self::Storage(reason) => write!(f, "failed to store image: {reason}"),
        }
    }
}

impl std::error::Error for ImageError {}

/// Stores uploaded images on disk and keeps their metadata in memory.
///
/// The metadata list is unbounded and only grows for the life of the
/// process; `list_for` scans all of it.
pub struct ImageService {
    directory: PathBuf,
    records: RwLock<Vec<ImageMetadata>>,
}

impl ImageService {
    #[must_use]
    pub fn new(directory: PathBuf) -> Self {
        Self {
            directory,
            records: RwLock::new(Vec::new()),
        }
    }

    /// Directory uploads are written to.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Validate and store an uploaded image for `username`.
    ///
    /// # Errors
    /// Returns `ImageError` if the upload is too large, not an image, has no
    /// file name, or cannot be written.
    pub async fn save(
        &self,
        username: &str,
        file_name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<ImageMetadata, ImageError> {
        if bytes.len() > MAX_IMAGE_SIZE {
            return Err(ImageError::TooLarge(bytes.len()));
        }
        if !is_image(content_type) {
            return Err(ImageError::NotAnImage(content_type.to_string()));
        }
        let name = Path::new(file_name)
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| !name.is_empty())
            .ok_or(ImageError::MissingFileName)?;

        let stored_path = self.directory.join(format!("{}-{name}", random_prefix()));
        tokio::fs::write(&stored_path, bytes)
            .await
            .map_err(|e| ImageError::Storage(e.to_string()))?;

        let metadata = ImageMetadata {
            username: username.to_string(),
            name: name.to_string(),
            content_type: content_type.to_string(),
            size: bytes.len() as u64,
            stored_path,
        };

        self.records
            .write()
            .map_err(|_| ImageError::Storage("image records lock poisoned".to_string()))?
            .push(metadata.clone());

        tracing::info!(
            "stored image '{}' ({} bytes) for '{username}'",
            metadata.name,
            metadata.size
        );
        Ok(metadata)
    }

    /// All images uploaded by `username`, oldest first.
    #[must_use]
    pub fn list_for(&self, username: &str) -> Vec<ImageMetadata> {
        self.records.read().map_or_else(
            |_| Vec::new(),
            |records| {
                records
                    .iter()
                    .filter(|record| record.username == username)
                    .cloned()
                    .collect()
            },
        )
    }
}

fn is_image(content_type: &str) -> bool {
    content_type
        .split_once('/')
        .is_some_and(|(top, sub)| top.trim().eq_ignore_ascii_case("image") && !sub.is_empty())
}

fn random_prefix() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(STORED_NAME_PREFIX_LENGTH)
        .map(char::from)
        .collect()
}
