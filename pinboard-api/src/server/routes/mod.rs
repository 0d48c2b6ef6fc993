use crate::server::ServerRouter;
use axum::Router;

mod events;
mod posts;

pub fn routes() -> ServerRouter {
    Router::new().merge(posts::routes()).merge(events::routes())
}
