mod list;
mod unsubscribe;

pub mod graph;
pub mod subscribe;

use axum::{
    routing::{delete, get},
    Router,
};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list::subscriptions).post(subscribe::post_subscription))
        .route("/following/{id}", delete(unsubscribe::unfollow))
        .route("/blocked/{id}", delete(unsubscribe::unblock))
}
