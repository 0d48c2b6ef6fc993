use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;

/// Route under which uploaded images are served.
pub const UPLOADS_ROUTE: &str = "/uploads";

/// Reference path to an uploaded image, always of the form `/uploads/<file>`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct ImageUrl(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The image url is invalid: {0}")]
pub struct InvalidImageUrlError(String);

impl ImageUrl {
    pub fn new(url: String) -> Result<Self, InvalidImageUrlError> {
        let valid = url
            .strip_prefix(UPLOADS_ROUTE)
            .and_then(|rest| rest.strip_prefix('/'))
            .is_some_and(is_valid_file_name);

        if valid {
            Ok(Self(url))
        } else {
            Err(InvalidImageUrlError(url))
        }
    }

    pub fn for_file(file_name: &str) -> Result<Self, InvalidImageUrlError> {
        Self::new(format!("{UPLOADS_ROUTE}/{file_name}"))
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    /// The stored file's name, without the route prefix.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.0[UPLOADS_ROUTE.len() + 1..]
    }
}

fn is_valid_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0', '%', '?', '#'])
}

impl<'de> Deserialize<'de> for ImageUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        ImageUrl::new(inner).map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"ImageUrl"))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::image::ImageUrl;

    #[test]
    fn accepts_upload_paths() {
        let url = ImageUrl::for_file("image-1700000000000-42.png").unwrap();

        assert_eq!(url.get(), "/uploads/image-1700000000000-42.png");
        assert_eq!(url.file_name(), "image-1700000000000-42.png");
    }

    #[test]
    fn rejects_paths_outside_uploads() {
        for url in [
            "",
            "/uploads",
            "/uploads/",
            "/uploads/..",
            "/uploads/a/b.png",
            "/uploads/a\\b.png",
            "/uploads/a.p%41ng",
            "/uploads/a.png?x=1",
            "/uploads/a.png#top",
            "/static/a.png",
            "uploads/a.png",
            "/uploadsa.png",
        ] {
            assert!(ImageUrl::new(url.to_owned()).is_err(), "{url} was accepted");
        }
    }

    #[test]
    fn deserialization_validates() {
        let url: ImageUrl = serde_json::from_str("\"/uploads/a.png\"").unwrap();
        assert_eq!(url.file_name(), "a.png");

        assert!(serde_json::from_str::<ImageUrl>("\"/etc/passwd\"").is_err());
    }
}
