use crate::server::{ServerError, ServerRouter, events::EventHub};
use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::Response,
};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;

pub fn routes() -> ServerRouter {
    Router::new().typed_get(subscribe)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/events", rejection(ServerError))]
struct EventsPath();

async fn subscribe(
    EventsPath(): EventsPath,
    State(events): State<EventHub>,
    upgrade: WebSocketUpgrade,
) -> Response {
    upgrade.on_upgrade(move |socket| events.serve(socket))
}
