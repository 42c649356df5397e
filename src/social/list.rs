use axum::{
    debug_handler,
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sqlx::{SqliteExecutor, SqlitePool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{users::User, viewer::Viewer, AppResult};

/// The subscriptions overview, each list newest edge first.
#[derive(Debug, Serialize)]
pub struct Subscriptions {
    pub following: Vec<User>,
    pub followers: Vec<User>,
    pub blocked: Vec<User>,
}

pub async fn overview(pool: &SqlitePool, viewer: Uuid) -> AppResult<Subscriptions> {
    let following = named_edges(
        pool,
        "SELECT u.id,u.username,f.created_at FROM follows f \
         JOIN users u ON u.id=f.followed_id WHERE f.follower_id=?",
        viewer,
    )
    .await?;
    let followers = named_edges(
        pool,
        "SELECT u.id,u.username,f.created_at FROM follows f \
         JOIN users u ON u.id=f.follower_id WHERE f.followed_id=?",
        viewer,
    )
    .await?;
    let blocked = named_edges(
        pool,
        "SELECT u.id,u.username,b.created_at FROM blocks b \
         JOIN users u ON u.id=b.blocked_id WHERE b.blocker_id=?",
        viewer,
    )
    .await?;

    Ok(Subscriptions {
        following,
        followers,
        blocked,
    })
}

async fn named_edges(
    db: impl SqliteExecutor<'_>,
    sql: &str,
    anchor: Uuid,
) -> AppResult<Vec<User>> {
    let mut rows: Vec<(String, String, OffsetDateTime)> = sqlx::query_as(sql)
        .bind(anchor.to_string())
        .fetch_all(db)
        .await?;

    rows.sort_by(|a, b| b.2.cmp(&a.2));
    rows.into_iter()
        .map(|(id, username, _)| {
            Ok(User {
                id: Uuid::parse_str(&id)?,
                username,
            })
        })
        .collect()
}

#[debug_handler]
pub(crate) async fn subscriptions(
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
) -> AppResult<Response> {
    Ok(Json(overview(&db_pool, viewer.0).await?).into_response())
}
