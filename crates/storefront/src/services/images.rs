//! On-disk storage for uploaded product images.
//!
//! Files live in `<uploads_dir>/products/product-<uuid>.<ext>` and are
//! referenced from products as `/uploads/products/<file>`.

use std::path::{Path, PathBuf};

use axum::body::Bytes;
use thiserror::Error;
use uuid::Uuid;

/// Maximum size of a single uploaded image.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Maximum number of images accepted in one request.
pub const MAX_IMAGES: usize = 10;

/// Public URL prefix of stored product images.
pub const PUBLIC_PREFIX: &str = "/uploads/products/";

/// Errors from image validation and storage.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Invalid file type {0}. Only JPEG, PNG, GIF, and WebP are allowed.")]
    UnsupportedType(String),

    #[error("Image exceeds the {max} byte limit")]
    TooLarge { max: usize },

    #[error("At most {max} images may be uploaded")]
    TooMany { max: usize },

    #[error("image storage failed: {0}")]
    Io(#[from] std::io::Error),
}

/// An uploaded image awaiting storage.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub content_type: String,
    pub bytes: Bytes,
}

/// File extension for an accepted image MIME type.
#[must_use]
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Check a batch of uploads before anything touches the disk.
///
/// # Errors
///
/// Returns the first [`ImageError`] found.
pub fn validate(uploads: &[ImageUpload]) -> Result<(), ImageError> {
    if uploads.len() > MAX_IMAGES {
        return Err(ImageError::TooMany { max: MAX_IMAGES });
    }
    for upload in uploads {
        if extension_for(&upload.content_type).is_none() {
            return Err(ImageError::UnsupportedType(upload.content_type.clone()));
        }
        if upload.bytes.len() > MAX_IMAGE_BYTES {
            return Err(ImageError::TooLarge {
                max: MAX_IMAGE_BYTES,
            });
        }
    }
    Ok(())
}

/// Writes and deletes product image files.
#[derive(Debug, Clone)]
pub struct ImageStorage {
    dir: PathBuf,
}

impl ImageStorage {
    /// Storage rooted at `<uploads_dir>/products`.
    #[must_use]
    pub fn new(uploads_dir: &Path) -> Self {
        Self {
            dir: uploads_dir.join("products"),
        }
    }

    /// Store every upload, returning public references in upload order.
    ///
    /// Files written before a failure are removed again.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError`] if validation or a write fails.
    pub async fn store_all(&self, uploads: &[ImageUpload]) -> Result<Vec<String>, ImageError> {
        validate(uploads)?;
        if uploads.is_empty() {
            return Ok(Vec::new());
        }
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut stored = Vec::with_capacity(uploads.len());
        for upload in uploads {
            match self.store(upload).await {
                Ok(reference) => stored.push(reference),
                Err(e) => {
                    self.remove_all(&stored).await;
                    return Err(e);
                }
            }
        }
        Ok(stored)
    }

    async fn store(&self, upload: &ImageUpload) -> Result<String, ImageError> {
        let extension = extension_for(&upload.content_type)
            .ok_or_else(|| ImageError::UnsupportedType(upload.content_type.clone()))?;
        let file_name = format!("product-{}.{extension}", Uuid::new_v4());

        tokio::fs::write(self.dir.join(&file_name), &upload.bytes).await?;
        tracing::debug!(file = %file_name, bytes = upload.bytes.len(), "Stored product image");

        Ok(format!("{PUBLIC_PREFIX}{file_name}"))
    }

    /// Delete the files behind image references.
    ///
    /// References outside the upload directory are ignored. Failures are
    /// logged; a missing file is not an error.
    pub async fn remove_all<S: AsRef<str>>(&self, references: &[S]) {
        for reference in references {
            let reference = reference.as_ref();
            let Some(path) = self.resolve(reference) else {
                continue;
            };
            match tokio::fs::remove_file(&path).await {
                Ok(()) => tracing::debug!(image = %reference, "Removed product image"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(image = %reference, error = %e, "Failed to remove image"),
            }
        }
    }

    /// Map a public reference to a file path, rejecting anything that is not
    /// a plain file name under the products directory.
    fn resolve(&self, reference: &str) -> Option<PathBuf> {
        let file_name = reference.strip_prefix(PUBLIC_PREFIX)?;
        let valid = !file_name.is_empty()
            && file_name != "."
            && file_name != ".."
            && !file_name.contains(['/', '\\']);
        valid.then(|| self.dir.join(file_name))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn upload(content_type: &str, len: usize) -> ImageUpload {
        ImageUpload {
            content_type: content_type.to_string(),
            bytes: Bytes::from(vec![0_u8; len]),
        }
    }

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("sillage-images-{}", Uuid::new_v4()))
    }

    #[test]
    fn test_extension_for_accepted_types() {
        assert_eq!(extension_for("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for("IMAGE/PNG"), Some("png"));
        assert_eq!(extension_for("image/webp"), Some("webp"));
        assert_eq!(extension_for("image/svg+xml"), None);
    }

    #[test]
    fn test_validate_rejects_bad_batches() {
        assert!(matches!(
            validate(&[upload("application/pdf", 10)]),
            Err(ImageError::UnsupportedType(_))
        ));
        assert!(matches!(
            validate(&[upload("image/png", MAX_IMAGE_BYTES + 1)]),
            Err(ImageError::TooLarge { .. })
        ));
        let many: Vec<_> = (0..=MAX_IMAGES).map(|_| upload("image/png", 1)).collect();
        assert!(matches!(validate(&many), Err(ImageError::TooMany { .. })));
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let storage = ImageStorage::new(Path::new("/srv/uploads"));
        assert!(storage.resolve("/uploads/products/product-1.jpg").is_some());
        assert!(storage.resolve("/uploads/products/../secret").is_none());
        assert!(storage.resolve("/uploads/products/..").is_none());
        assert!(storage.resolve("/etc/passwd").is_none());
    }

    #[tokio::test]
    async fn test_store_and_remove() {
        let root = scratch_dir();
        let storage = ImageStorage::new(&root);

        let refs = storage
            .store_all(&[upload("image/png", 16), upload("image/jpeg", 8)])
            .await
            .unwrap();

        assert_eq!(refs.len(), 2);
        assert!(refs[0].starts_with("/uploads/products/product-"));
        assert!(refs[0].ends_with(".png"));
        let path = storage.resolve(&refs[0]).unwrap();
        assert!(path.exists());

        storage.remove_all(&refs).await;
        assert!(!path.exists());

        let _ = tokio::fs::remove_dir_all(&root).await;
    }
}
