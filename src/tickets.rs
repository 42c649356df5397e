use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteExecutor, SqlitePool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{invalid, not_found, reviews, viewer::Viewer, AppResult, AppState};

/// A request for a review of a book or article.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ticket {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub author_id: Uuid,
    /// Reference into the external upload store, never bytes.
    pub image: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl NewTicket {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.title.trim().is_empty() {
            return Err("title must not be empty");
        }
        if self.title.chars().count() > 128 {
            return Err("title must be at most 128 characters");
        }
        if self.description.trim().is_empty() {
            return Err("description must not be empty");
        }
        if self.description.chars().count() > 2048 {
            return Err("description must be at most 2048 characters");
        }
        Ok(())
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_ticket))
        .route("/{id}", put(edit_ticket).delete(delete_ticket))
        .route("/{id}/reviews", post(reviews::respond_to_ticket))
}

type TicketRow = (String, String, String, String, Option<String>, OffsetDateTime);

impl Ticket {
    fn from_row(
        (id, title, description, author_id, image, created_at): TicketRow,
    ) -> AppResult<Ticket> {
        Ok(Ticket {
            id: Uuid::parse_str(&id)?,
            title,
            description,
            author_id: Uuid::parse_str(&author_id)?,
            image,
            created_at,
        })
    }
}

/// Insert a fresh ticket. Generic over the executor so the combined
/// ticket+review flow can run it inside its transaction.
pub async fn create(db: impl SqliteExecutor<'_>, author: Uuid, new: &NewTicket) -> AppResult<Ticket> {
    let ticket = Ticket {
        id: Uuid::now_v7(),
        title: new.title.trim().to_owned(),
        description: new.description.trim().to_owned(),
        author_id: author,
        image: new.image.clone(),
        created_at: OffsetDateTime::now_utc(),
    };

    sqlx::query(
        "INSERT INTO tickets (id,title,description,author_id,image,created_at) \
         VALUES (?,?,?,?,?,?)",
    )
    .bind(ticket.id.to_string())
    .bind(&ticket.title)
    .bind(&ticket.description)
    .bind(ticket.author_id.to_string())
    .bind(&ticket.image)
    .bind(ticket.created_at)
    .execute(db)
    .await?;

    Ok(ticket)
}

/// Owner-gated update; `false` means absent or not the caller's ticket.
pub async fn update(pool: &SqlitePool, author: Uuid, id: Uuid, new: &NewTicket) -> AppResult<bool> {
    let done = sqlx::query("UPDATE tickets SET title=?,description=?,image=? WHERE id=? AND author_id=?")
        .bind(new.title.trim())
        .bind(new.description.trim())
        .bind(&new.image)
        .bind(id.to_string())
        .bind(author.to_string())
        .execute(pool)
        .await?;

    Ok(done.rows_affected() > 0)
}

/// Owner-gated delete with the review fan-out in the same transaction.
pub async fn delete(pool: &SqlitePool, author: Uuid, id: Uuid) -> AppResult<bool> {
    let tid = id.to_string();
    let mut tx = pool.begin().await?;

    if sqlx::query_as::<_, ()>("SELECT 1 FROM tickets WHERE id=? AND author_id=?")
        .bind(&tid)
        .bind(author.to_string())
        .fetch_optional(&mut *tx)
        .await?
        .is_none()
    {
        return Ok(false);
    }

    sqlx::query("DELETE FROM reviews WHERE ticket_id=?")
        .bind(&tid)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM tickets WHERE id=?")
        .bind(&tid)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(true)
}

pub(crate) async fn fetch_all(db: impl SqliteExecutor<'_>) -> AppResult<Vec<Ticket>> {
    let rows: Vec<TicketRow> =
        sqlx::query_as("SELECT id,title,description,author_id,image,created_at FROM tickets")
            .fetch_all(db)
            .await?;

    rows.into_iter().map(Ticket::from_row).collect()
}

pub(crate) async fn by_author(db: impl SqliteExecutor<'_>, author: Uuid) -> AppResult<Vec<Ticket>> {
    let rows: Vec<TicketRow> = sqlx::query_as(
        "SELECT id,title,description,author_id,image,created_at FROM tickets WHERE author_id=?",
    )
    .bind(author.to_string())
    .fetch_all(db)
    .await?;

    rows.into_iter().map(Ticket::from_row).collect()
}

#[debug_handler]
pub(crate) async fn create_ticket(
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
    Json(body): Json<NewTicket>,
) -> AppResult<Response> {
    if let Err(why) = body.validate() {
        return Ok(invalid(why));
    }

    let ticket = create(&db_pool, viewer.0, &body).await?;
    Ok((StatusCode::CREATED, Json(ticket)).into_response())
}

#[debug_handler]
pub(crate) async fn edit_ticket(
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
    Path(id): Path<Uuid>,
    Json(body): Json<NewTicket>,
) -> AppResult<Response> {
    if let Err(why) = body.validate() {
        return Ok(invalid(why));
    }

    if update(&db_pool, viewer.0, id, &body).await? {
        Ok(StatusCode::NO_CONTENT.into_response())
    } else {
        Ok(not_found())
    }
}

#[debug_handler]
pub(crate) async fn delete_ticket(
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    if delete(&db_pool, viewer.0, id).await? {
        Ok(StatusCode::NO_CONTENT.into_response())
    } else {
        Ok(not_found())
    }
}
