use crate::{id, model::image::ImageUrl};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Opaque post identifier. Generated ids follow [`id::generate`], but any
/// string is accepted when parsing so unknown ids surface as "not found".
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(String);

impl PostId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn generate() -> Self {
        Self(id::generate())
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl Display for PostId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl From<String> for PostId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PostId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct Post {
    pub id: PostId,
    #[serde(flatten)]
    pub content: PostContent,
}

/// Everything about a post except its id. Updates replace this wholesale.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostContent {
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub image_url: Option<ImageUrl>,
}

impl PostContent {
    #[must_use]
    pub fn new(comment: impl Into<String>, image_url: Option<ImageUrl>) -> Self {
        Self {
            comment: comment.into(),
            image_url,
        }
    }

    #[must_use]
    pub fn comment(comment: impl Into<String>) -> Self {
        Self::new(comment, None)
    }
}
