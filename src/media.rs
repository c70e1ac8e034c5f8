//! Request-scoped staging of uploaded photos.

use crate::error::{AppError, AppResult};
use base64::Engine;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A decoded photo staged on disk for the duration of one request.
///
/// The file is removed when the guard drops, whichever way the request
/// terminates.
pub struct TempImage {
    path: PathBuf,
    mime_type: &'static str,
}

impl TempImage {
    /// Decode a base64 payload (with or without a data-URL prefix), sniff
    /// the image format, and write the bytes under `tmp_dir`.
    pub async fn stage(tmp_dir: &Path, image_base64: &str) -> AppResult<TempImage> {
        let encoded = image_base64
            .split_once(";base64,")
            .map(|(_, rest)| rest)
            .unwrap_or(image_base64);
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| AppError::Validation(format!("imageBase64 is not valid base64: {}", e)))?;
        if bytes.is_empty() {
            return Err(AppError::Validation(
                "imageBase64 decoded to an empty payload".to_string(),
            ));
        }

        let format = image::guess_format(&bytes).map_err(|e| {
            AppError::Validation(format!("imageBase64 is not a recognized image: {}", e))
        })?;
        let (mime_type, extension) = match format {
            image::ImageFormat::Jpeg => ("image/jpeg", "jpg"),
            image::ImageFormat::Png => ("image/png", "png"),
            image::ImageFormat::Gif => ("image/gif", "gif"),
            image::ImageFormat::WebP => ("image/webp", "webp"),
            other => {
                return Err(AppError::Validation(format!(
                    "unsupported image format: {:?}",
                    other
                )))
            }
        };

        tokio::fs::create_dir_all(tmp_dir).await?;
        let path = tmp_dir.join(format!("{}.{}", Uuid::new_v4(), extension));
        tokio::fs::write(&path, &bytes).await?;

        Ok(TempImage { path, mime_type })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }
}

impl Drop for TempImage {
    fn drop(&mut self) {
        // Drop runs on every exit path; a removal failure only leaks a file.
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove temp image {:?}: {}", self.path, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    fn png_base64() -> String {
        base64::engine::general_purpose::STANDARD.encode(PNG_MAGIC)
    }

    #[tokio::test]
    async fn test_stage_writes_and_drop_removes() {
        let dir = tempdir().unwrap();
        let path;
        {
            let image = TempImage::stage(dir.path(), &png_base64()).await.unwrap();
            assert_eq!(image.mime_type(), "image/png");
            path = image.path().to_path_buf();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_stage_accepts_data_url_prefix() {
        let dir = tempdir().unwrap();
        let payload = format!("data:image/png;base64,{}", png_base64());
        let image = TempImage::stage(dir.path(), &payload).await.unwrap();
        assert_eq!(image.mime_type(), "image/png");
    }

    #[tokio::test]
    async fn test_stage_rejects_invalid_base64() {
        let dir = tempdir().unwrap();
        let result = TempImage::stage(dir.path(), "not-base-64!!!").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_stage_rejects_non_image_payload() {
        let dir = tempdir().unwrap();
        let payload = base64::engine::general_purpose::STANDARD.encode(b"plain text");
        let result = TempImage::stage(dir.path(), &payload).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
