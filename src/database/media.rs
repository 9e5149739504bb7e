use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::error::{ApiResult, HtmlError};
use crate::constants::{IMAGE_DIRECTORY, IMAGE_TYPES};

/// Image decoded from a `data:image/<type>;base64,<payload>` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub bytes: Vec<u8>,
    pub extension: &'static str,
}

pub fn decode_image(data: &str) -> ApiResult<DecodedImage> {
    let invalid = |info: &str| HtmlError::InvalidRequest.field("image", info);

    let (header, payload) = data
        .trim()
        .split_once(',')
        .ok_or_else(|| invalid("Expected a base64 encoded data URI."))?;
    let mime = header
        .strip_prefix("data:")
        .and_then(|header| header.strip_suffix(";base64"))
        .ok_or_else(|| invalid("Expected a base64 encoded data URI."))?;

    let extension = IMAGE_TYPES
        .iter()
        .find(|(kind, _)| kind.eq_ignore_ascii_case(mime))
        .map(|(_, extension)| *extension)
        .ok_or_else(|| invalid("Unsupported image type."))?;

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|_e| invalid("Image data is not valid base64."))?;
    if bytes.is_empty() {
        return Err(invalid("The submitted file is empty."));
    }

    Ok(DecodedImage { bytes, extension })
}

/// Where uploaded files live on disk and the URL prefix they are served under.
#[derive(Debug, Clone)]
pub struct Media {
    root: PathBuf,
    url: String,
}

impl Media {
    pub fn new(root: impl Into<PathBuf>, url: &str) -> Self {
        Self {
            root: root.into(),
            url: url.trim_end_matches('/').to_owned(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.url, path.trim_start_matches('/'))
    }

    /// Writes the image under a fresh name and returns its path relative to the media root.
    pub async fn save_image(&self, image: &DecodedImage) -> ApiResult<String> {
        let relative = format!(
            "{IMAGE_DIRECTORY}/{}.{}",
            uuid::Uuid::new_v4().simple(),
            image.extension
        );
        let target = self.root.join(&relative);

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                log::error!("Failed to create media directory {}: {e}", parent.display());
                HtmlError::InternalServerError.default()
            })?;
        }
        tokio::fs::write(&target, &image.bytes).await.map_err(|e| {
            log::error!("Failed to write image {}: {e}", target.display());
            HtmlError::InternalServerError.default()
        })?;

        Ok(relative)
    }

    /// Best effort; a missing file is not an error for the caller.
    pub async fn remove(&self, path: &str) {
        if path.is_empty() {
            return;
        }
        let target = self.root.join(path);
        if let Err(e) = tokio::fs::remove_file(&target).await {
            log::warn!("Failed to remove image {}: {e}", target.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    // 1x1 transparent PNG
    const PIXEL: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[test]
    fn decodes_png_data_uri() {
        let image = decode_image(&format!("data:image/png;base64,{PIXEL}")).unwrap();
        assert_eq!(image.extension, "png");
        assert_eq!(&image.bytes[1..4], b"PNG");
    }

    #[test]
    fn jpeg_maps_to_jpg_extension() {
        let image = decode_image(&format!("data:image/jpeg;base64,{PIXEL}")).unwrap();
        assert_eq!(image.extension, "jpg");
    }

    #[rstest]
    #[case("not a data uri")]
    #[case("data:image/png,plain")]
    #[case("data:text/plain;base64,aGVsbG8=")]
    #[case("data:image/png;base64,@@@")]
    #[case("data:image/png;base64,")]
    fn rejects_malformed_images(#[case] data: &str) {
        let error = decode_image(data).unwrap_err();
        assert_eq!(error.field(), Some("image"));
    }

    #[test]
    fn urls_join_prefix_and_relative_path() {
        let media = Media::new("media", "/media/");
        assert_eq!(
            media.url("recipes/images/a.png"),
            "/media/recipes/images/a.png"
        );
    }

    #[tokio::test]
    async fn saved_images_can_be_removed() {
        let root = std::env::temp_dir().join(format!("foodgram-media-{}", uuid::Uuid::new_v4()));
        let media = Media::new(&root, "/media");
        let image = decode_image(&format!("data:image/png;base64,{PIXEL}")).unwrap();

        let path = media.save_image(&image).await.unwrap();
        assert!(path.starts_with(IMAGE_DIRECTORY));
        assert!(path.ends_with(".png"));
        assert_eq!(tokio::fs::read(root.join(&path)).await.unwrap(), image.bytes);

        media.remove(&path).await;
        assert!(!root.join(&path).exists());

        let _ = tokio::fs::remove_dir_all(&root).await;
    }
}
