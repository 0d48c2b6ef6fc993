//! On-disk storage for uploaded images.
//!
//! Files land in a single flat directory under a generated name
//! `<field>-<unix millis>-<random>.<ext>` and are referenced by clients as
//! `/uploads/<name>`.

use pinboard_common::model::image::{ImageUrl, InvalidImageUrlError};
use std::{
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

pub const MAX_RANDOM_SUFFIX: u32 = 1_000_000_000;

pub type Result<T, E = UploadError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Upload directory {} could not be created: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("Uploaded file {} could not be written: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("Upload has an unusable file name: {0}")]
    FileName(#[from] InvalidImageUrlError),
}

/// A file part received from a form submission.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct FilePart {
    pub field_name: String,
    pub file_name: String,
    pub data: Vec<u8>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct UploadDir {
    root: PathBuf,
}

impl UploadDir {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn path_of(&self, url: &ImageUrl) -> PathBuf {
        self.root.join(url.file_name())
    }

    /// Stores the file if there is one. No file means no reference.
    pub async fn save_optional(&self, file: Option<&FilePart>) -> Result<Option<ImageUrl>> {
        match file {
            Some(file) => self.save(file).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn save(&self, file: &FilePart) -> Result<ImageUrl> {
        let file_name = generate_file_name(
            &file.field_name,
            &file.file_name,
            unix_millis(),
            rand::random_range(0..=MAX_RANDOM_SUFFIX),
        );
        let url = ImageUrl::for_file(&file_name)?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| UploadError::CreateDir {
                path: self.root.clone(),
                source,
            })?;

        let path = self.path_of(&url);
        tokio::fs::write(&path, &file.data)
            .await
            .map_err(|source| UploadError::Write {
                path: path.clone(),
                source,
            })?;

        info!(path = %path.display(), bytes = file.data.len(), "Stored upload");
        Ok(url)
    }

    /// Removes a file stored for a request that did not go through. Failures
    /// only get logged.
    pub async fn discard(&self, url: &ImageUrl) {
        let path = self.path_of(url);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(path = %path.display(), "Discarded upload"),
            Err(err) => warn!(path = %path.display(), error = %err, "Could not discard upload"),
        }
    }
}

/// Builds `<field>-<timestamp>-<random><ext>`, where `<ext>` is the original
/// file's extension including its dot. Extensions that are not plain ASCII
/// alphanumerics are dropped so the name stays usable in a URL path.
#[must_use]
pub fn generate_file_name(
    field_name: &str,
    original_file_name: &str,
    timestamp_millis: i128,
    random: u32,
) -> String {
    let extension = Path::new(original_file_name)
        .extension()
        .and_then(|extension| extension.to_str())
        .filter(|extension| {
            !extension.is_empty() && extension.bytes().all(|byte| byte.is_ascii_alphanumeric())
        })
        .map(|extension| format!(".{extension}"))
        .unwrap_or_default();

    format!("{field_name}-{timestamp_millis}-{random}{extension}")
}

fn unix_millis() -> i128 {
    OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000
}

#[cfg(test)]
mod tests {
    use crate::upload::{FilePart, UploadDir, UploadError, generate_file_name};
    use pinboard_common::model::image::ImageUrl;

    fn image(file_name: &str, data: &[u8]) -> FilePart {
        FilePart {
            field_name: "image".to_owned(),
            file_name: file_name.to_owned(),
            data: data.to_vec(),
        }
    }

    #[test]
    fn file_names_keep_the_extension() {
        assert_eq!(
            generate_file_name("image", "cat.png", 1_700_000_000_000, 42),
            "image-1700000000000-42.png"
        );
        assert_eq!(
            generate_file_name("image", "archive.tar.gz", 1, 2),
            "image-1-2.gz"
        );
        assert_eq!(generate_file_name("image", "README", 1, 2), "image-1-2");
        assert_eq!(generate_file_name("image", ".hidden", 1, 2), "image-1-2");
        assert_eq!(
            generate_file_name("image", "../../etc/evil.sh", 1, 2),
            "image-1-2.sh"
        );
    }

    #[test]
    fn unsafe_extensions_are_dropped() {
        for original in ["a.p%41ng", "a.png?x=1", "a.png#top", "a.", "a.p ng", "a.pñg"] {
            assert_eq!(
                generate_file_name("image", original, 1, 2),
                "image-1-2",
                "{original}"
            );
        }
    }

    #[tokio::test]
    async fn save_creates_directory_and_writes_payload() {
        let temp = tempfile::tempdir().unwrap();
        let uploads = UploadDir::new(temp.path().join("nested").join("uploads"));
        let payload = b"\x89PNG\r\n\x1a\nnot really a png";

        let url = uploads.save(&image("cat.png", payload)).await.unwrap();

        assert!(url.get().starts_with("/uploads/image-"));
        assert!(url.get().ends_with(".png"));
        assert_eq!(std::fs::read(uploads.path_of(&url)).unwrap(), payload);
    }

    #[tokio::test]
    async fn saves_never_overwrite_each_other() {
        let temp = tempfile::tempdir().unwrap();
        let uploads = UploadDir::new(temp.path());

        let first = uploads.save(&image("a.png", b"first")).await.unwrap();
        let second = uploads.save(&image("a.png", b"second")).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(std::fs::read(uploads.path_of(&first)).unwrap(), b"first");
        assert_eq!(std::fs::read(uploads.path_of(&second)).unwrap(), b"second");
    }

    #[tokio::test]
    async fn absent_file_yields_no_reference() {
        let temp = tempfile::tempdir().unwrap();
        let uploads = UploadDir::new(temp.path().join("uploads"));

        assert_eq!(uploads.save_optional(None).await.unwrap(), None);
        assert!(!uploads.root().exists());
    }

    #[tokio::test]
    async fn unwritable_directory_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, b"a file, not a directory").unwrap();
        let uploads = UploadDir::new(blocker.join("uploads"));

        let result = uploads.save(&image("cat.png", b"data")).await;

        assert!(matches!(result, Err(UploadError::CreateDir { .. })));
    }

    #[tokio::test]
    async fn unusable_field_names_are_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let uploads = UploadDir::new(temp.path());
        let file = FilePart {
            field_name: "../escape".to_owned(),
            ..image("cat.png", b"data")
        };

        let result = uploads.save(&file).await;

        assert!(matches!(result, Err(UploadError::FileName(_))));
    }

    #[tokio::test]
    async fn discard_removes_the_file() {
        let temp = tempfile::tempdir().unwrap();
        let uploads = UploadDir::new(temp.path());
        let url = uploads.save(&image("cat.png", b"data")).await.unwrap();

        uploads.discard(&url).await;
        assert!(!uploads.path_of(&url).exists());

        // Discarding twice only logs.
        uploads.discard(&url).await;
        uploads
            .discard(&ImageUrl::for_file("never-written.png").unwrap())
            .await;
    }
}
