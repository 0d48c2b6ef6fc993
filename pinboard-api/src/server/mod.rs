use crate::server::{events::EventHub, json::Json};
use axum::{
    Router,
    extract::{
        DefaultBodyLimit, FromRef, Request,
        multipart::{MultipartError, MultipartRejection},
        rejection::PathRejection,
    },
    handler::HandlerWithoutStateExt,
    http::{Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use pinboard_common::model::{image::UPLOADS_ROUTE, post::PostId};
use pinboard_store::{
    posts::{PostNotFoundError, PostStore},
    upload::{UploadDir, UploadError},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::Arc};
use thiserror::Error;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{debug, error};

pub mod events;
mod form;
mod json;
mod routes;


pub type ServerRouter = axum::Router<ServerState>;

#[derive(Clone, Debug, FromRef)]
pub struct ServerState {
    pub posts: Arc<PostStore>,
    pub uploads: Arc<UploadDir>,
    pub events: EventHub,
}

impl ServerState {
    #[must_use]
    pub fn new(posts: PostStore, uploads: UploadDir, events: EventHub) -> Self {
        Self {
            posts: Arc::new(posts),
            uploads: Arc::new(uploads),
            events,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct AssetConfig {
    /// Directory holding the browser client, served at `/`.
    pub public_dir: PathBuf,
    pub max_upload_bytes: usize,
}

/// The complete application: API routes, uploaded images, the client bundle
/// and the permissive CORS policy.
pub fn app(state: ServerState, assets: &AssetConfig) -> Router {
    let uploads = ServeDir::new(state.uploads.root());
    let client = ServeDir::new(&assets.public_dir).not_found_service(fallback.into_service());

    routes::routes()
        .nest_service(UPLOADS_ROUTE, uploads)
        .fallback_service(client)
        .layer(DefaultBodyLimit::max(assets.max_upload_bytes))
        .layer(cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::OPTIONS,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Incoming form rejected: {0}")]
    MultipartRejection(#[from] MultipartRejection),
    #[error("Incoming form could not be read: {0}")]
    Multipart(#[from] MultipartError),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(PostId),
}

impl From<PostNotFoundError> for ServerError {
    fn from(PostNotFoundError(id): PostNotFoundError) -> Self {
        ServerError::PostByIdNotFound(id)
    }
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostByIdNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::MultipartRejection(rejection) => rejection.status(),
            ServerError::Multipart(err) => err.status(),
            ServerError::Upload(UploadError::FileName(_)) => StatusCode::BAD_REQUEST,
            ServerError::JsonResponse(_) | ServerError::Upload(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// What the client gets to see. Server-side causes stay in the logs.
    fn public_message(&self) -> String {
        match self {
            ServerError::PostByIdNotFound(_) => "Post not found".to_owned(),
            _ if self.status().is_server_error() => "Internal server error".to_owned(),
            _ => self.to_string(),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!(error = %self, %status, "Replying with error");
        } else {
            debug!(error = %self, %status, "Replying with error");
        }

        let error_response = ErrorResponse {
            error: self.public_message(),
        };
        (status, Json(error_response)).into_response()
    }
}
