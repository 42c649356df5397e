use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{viewer::Viewer, AppResult};

use super::graph;

#[debug_handler]
pub(crate) async fn unfollow(
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    graph::unfollow(&db_pool, viewer.0, id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[debug_handler]
pub(crate) async fn unblock(
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    graph::unblock(&db_pool, viewer.0, id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
