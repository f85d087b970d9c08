use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Please upload a valid image file")]
    InvalidFileType,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Image types accepted for upload, keyed by MIME subtype. The stored file's
/// extension always comes from this table, never from the client's filename.
const ALLOWED_IMAGE_TYPES: &[(&str, &str)] = &[
    ("png", "png"),
    ("jpeg", "jpg"),
    ("jpg", "jpg"),
    ("pjpeg", "jpg"),
    ("gif", "gif"),
    ("webp", "webp"),
];

fn image_extension(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next()?.trim().to_ascii_lowercase();
    let subtype = essence.strip_prefix("image/")?;
    ALLOWED_IMAGE_TYPES
        .iter()
        .find(|(allowed, _)| *allowed == subtype)
        .map(|(_, extension)| *extension)
}

/// An image received in a multipart form, held in memory until stored.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
    extension: &'static str,
}

impl ImageUpload {
    pub fn new(
        file_name: Option<String>,
        content_type: Option<String>,
        bytes: Vec<u8>,
    ) -> Result<Self, UploadError> {
        let content_type = content_type.unwrap_or_default();
        let extension = image_extension(&content_type).ok_or(UploadError::InvalidFileType)?;
        if bytes.is_empty() {
            return Err(UploadError::InvalidFileType);
        }
        Ok(Self {
            file_name,
            content_type,
            bytes,
            extension,
        })
    }

    fn extension(&self) -> &'static str {
        self.extension
    }
}

/// Profile images on local disk, served back under `/uploads/<filename>`.
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes the image under a generated name and returns that name.
    pub async fn save(&self, image: &ImageUpload) -> Result<String, UploadError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let filename = format!(
            "{}-{}.{}",
            chrono::Utc::now().timestamp_millis(),
            uuid::Uuid::new_v4().simple(),
            image.extension()
        );
        tokio::fs::write(self.dir.join(&filename), &image.bytes).await?;

        tracing::debug!("Stored upload {} ({} bytes)", filename, image.bytes.len());
        Ok(filename)
    }

    /// Best-effort removal; a missing file is not an error.
    pub async fn remove(&self, filename: &str) {
        // Stored names never contain separators; anything else is not ours
        if filename.is_empty() || filename.contains(['/', '\\']) || filename.starts_with('.') {
            tracing::warn!("Refusing to remove suspicious upload name {:?}", filename);
            return;
        }

        match tokio::fs::remove_file(self.dir.join(filename)).await {
            Ok(()) => tracing::debug!("Removed upload {}", filename),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove upload {}: {}", filename, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_image_content() {
        let result = ImageUpload::new(
            Some("notes.pdf".to_string()),
            Some("application/pdf".to_string()),
            vec![1, 2, 3],
        );
        assert!(matches!(result, Err(UploadError::InvalidFileType)));

        let missing_type = ImageUpload::new(Some("a.png".to_string()), None, vec![1]);
        assert!(matches!(missing_type, Err(UploadError::InvalidFileType)));
    }

    #[test]
    fn extension_comes_from_content_type() {
        let named = ImageUpload::new(
            Some("Photo.JPG".to_string()),
            Some("image/jpeg".to_string()),
            vec![1],
        )
        .unwrap();
        assert_eq!(named.extension(), "jpg");

        let unnamed =
            ImageUpload::new(None, Some("IMAGE/WebP; charset=binary".to_string()), vec![1])
                .unwrap();
        assert_eq!(unnamed.extension(), "webp");
    }

    #[test]
    fn rejects_scriptable_image_types() {
        for content_type in ["image/svg+xml", "image/x-icon", "image/"] {
            let result = ImageUpload::new(
                Some("logo.svg".to_string()),
                Some(content_type.to_string()),
                vec![1],
            );
            assert!(
                matches!(result, Err(UploadError::InvalidFileType)),
                "{} should be rejected",
                content_type
            );
        }
    }

    #[tokio::test]
    async fn client_file_name_does_not_choose_extension() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());
        let image = ImageUpload::new(
            Some("evil.html".to_string()),
            Some("image/png".to_string()),
            b"<script>alert(1)</script>".to_vec(),
        )
        .unwrap();

        let name = store.save(&image).await.unwrap();
        assert!(name.ends_with(".png"), "stored as {}", name);
        assert!(!name.contains("html"));
    }

    #[tokio::test]
    async fn save_and_remove_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());
        let image = ImageUpload::new(
            Some("avatar.png".to_string()),
            Some("image/png".to_string()),
            vec![137, 80, 78, 71],
        )
        .unwrap();

        let name = store.save(&image).await.unwrap();
        assert!(name.ends_with(".png"));
        let path = dir.path().join(&name);
        assert_eq!(std::fs::read(&path).unwrap(), vec![137, 80, 78, 71]);

        store.remove(&name).await;
        assert!(!path.exists());

        // Removing again is silent
        store.remove(&name).await;
    }
}
