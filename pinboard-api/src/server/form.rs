use crate::server::ServerError;
use axum::extract::{FromRequest, Multipart, Request, multipart::Field};
use pinboard_store::upload::FilePart;
use tracing::debug;

pub const COMMENT_FIELD: &str = "comment";
pub const IMAGE_FIELD: &str = "image";

/// A post as submitted through a `multipart/form-data` form.
///
/// An `image` part without a file name counts as no image. Browsers send that
/// when the file input was left empty.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct PostForm {
    pub comment: String,
    pub image: Option<FilePart>,
}

impl<S> FromRequest<S> for PostForm
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(request, state).await?;
        let mut form = PostForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(str::to_owned);
            match name.as_deref() {
                Some(COMMENT_FIELD) => form.comment = field.text().await?,
                Some(IMAGE_FIELD) => form.image = read_file(field).await?,
                other => debug!(field = ?other, "Ignoring unknown form field"),
            }
        }

        Ok(form)
    }
}

async fn read_file(field: Field<'_>) -> Result<Option<FilePart>, ServerError> {
    let Some(file_name) = field
        .file_name()
        .filter(|file_name| !file_name.is_empty())
        .map(str::to_owned)
    else {
        return Ok(None);
    };
    let field_name = field.name().unwrap_or(IMAGE_FIELD).to_owned();
    let data = field.bytes().await?;

    Ok(Some(FilePart {
        field_name,
        file_name,
        data: data.to_vec(),
    }))
}
