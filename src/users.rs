//! Mirror of the external auth system's user table. Auth owns account
//! creation and deletion; it syncs rows here so usernames can be resolved
//! for the subscription interface.

use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::put,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteExecutor, SqlitePool};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::{invalid, AppResult, AppState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Synced,
    UsernameTaken,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/{id}", put(sync_user).delete(retire_user))
}

/// Case-insensitive lookup; the column's NOCASE collation does the folding.
pub async fn find_by_username(
    db: impl SqliteExecutor<'_>,
    username: &str,
) -> AppResult<Option<User>> {
    let row: Option<(String, String)> =
        sqlx::query_as("SELECT id,username FROM users WHERE username=?")
            .bind(username)
            .fetch_optional(db)
            .await?;

    Ok(match row {
        Some((id, username)) => Some(User {
            id: Uuid::parse_str(&id)?,
            username,
        }),
        None => None,
    })
}

pub async fn upsert(pool: &SqlitePool, id: Uuid, username: &str) -> AppResult<SyncOutcome> {
    let res = sqlx::query(
        "INSERT INTO users (id,username,created_at) VALUES (?,?,?) \
         ON CONFLICT(id) DO UPDATE SET username=excluded.username",
    )
    .bind(id.to_string())
    .bind(username)
    .bind(OffsetDateTime::now_utc())
    .execute(pool)
    .await;

    match res {
        Ok(_) => Ok(SyncOutcome::Synced),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(SyncOutcome::UsernameTaken),
        Err(e) => Err(e.into()),
    }
}

/// Account retirement. One transaction, children before parents: reviews
/// sitting on the user's tickets, then everything the user authored, then
/// their edges, then the mirror row.
pub async fn purge(pool: &SqlitePool, id: Uuid) -> AppResult<()> {
    let uid = id.to_string();
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM reviews WHERE ticket_id IN (SELECT id FROM tickets WHERE author_id=?)")
        .bind(&uid)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM reviews WHERE author_id=?")
        .bind(&uid)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM tickets WHERE author_id=?")
        .bind(&uid)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM follows WHERE follower_id=? OR followed_id=?")
        .bind(&uid)
        .bind(&uid)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM blocks WHERE blocker_id=? OR blocked_id=?")
        .bind(&uid)
        .bind(&uid)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM users WHERE id=?")
        .bind(&uid)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

#[derive(Deserialize)]
pub(crate) struct SyncBody {
    username: String,
}

#[debug_handler]
pub(crate) async fn sync_user(
    State(db_pool): State<SqlitePool>,
    Path(id): Path<Uuid>,
    Json(SyncBody { username }): Json<SyncBody>,
) -> AppResult<Response> {
    let username = username.trim();
    if username.is_empty() {
        return Ok(invalid("username must not be empty"));
    }

    match upsert(&db_pool, id, username).await? {
        SyncOutcome::Synced => {
            info!("mirrored identity {username}#{id}");
            Ok(StatusCode::NO_CONTENT.into_response())
        }
        SyncOutcome::UsernameTaken => Ok((
            StatusCode::CONFLICT,
            Json(serde_json::json!({ "error": "username taken" })),
        )
            .into_response()),
    }
}

#[debug_handler]
pub(crate) async fn retire_user(
    State(db_pool): State<SqlitePool>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    purge(&db_pool, id).await?;
    info!("retired account {id}");
    Ok(StatusCode::NO_CONTENT)
}
