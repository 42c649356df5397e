use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{SqliteExecutor, SqlitePool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::tickets::{self, NewTicket, Ticket};
use crate::{invalid, not_found, viewer::Viewer, AppResult, AppState};

/// A rated response to a ticket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Review {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub author_id: Uuid,
    pub rating: u8,
    pub headline: String,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub rating: i64,
    pub headline: String,
    pub body: String,
}

impl NewReview {
    pub fn validate(&self) -> Result<(), &'static str> {
        if !(0..=5).contains(&self.rating) {
            return Err("rating must be between 0 and 5");
        }
        if self.headline.trim().is_empty() {
            return Err("headline must not be empty");
        }
        if self.headline.chars().count() > 128 {
            return Err("headline must be at most 128 characters");
        }
        if self.body.trim().is_empty() {
            return Err("body must not be empty");
        }
        if self.body.chars().count() > 8192 {
            return Err("body must be at most 8192 characters");
        }
        Ok(())
    }
}

/// What came of a "respond to this ticket" attempt.
#[derive(Debug)]
pub enum RespondOutcome {
    Created(Review),
    /// The author already has a review on this ticket; nothing was written.
    AlreadyReviewed,
    UnknownTicket,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_with_ticket_handler))
        .route("/{id}", put(edit_review).delete(delete_review))
}

type ReviewRow = (String, String, String, u8, String, String, OffsetDateTime);

impl Review {
    fn from_row(
        (id, ticket_id, author_id, rating, headline, body, created_at): ReviewRow,
    ) -> AppResult<Review> {
        Ok(Review {
            id: Uuid::parse_str(&id)?,
            ticket_id: Uuid::parse_str(&ticket_id)?,
            author_id: Uuid::parse_str(&author_id)?,
            rating,
            headline,
            body,
            created_at,
        })
    }
}

async fn insert_on(
    db: impl SqliteExecutor<'_>,
    author: Uuid,
    ticket_id: Uuid,
    new: &NewReview,
) -> AppResult<Review> {
    let review = Review {
        id: Uuid::now_v7(),
        ticket_id,
        author_id: author,
        rating: new.rating as u8,
        headline: new.headline.trim().to_owned(),
        body: new.body.trim().to_owned(),
        created_at: OffsetDateTime::now_utc(),
    };

    sqlx::query(
        "INSERT INTO reviews (id,ticket_id,author_id,rating,headline,body,created_at) \
         VALUES (?,?,?,?,?,?,?)",
    )
    .bind(review.id.to_string())
    .bind(review.ticket_id.to_string())
    .bind(review.author_id.to_string())
    .bind(review.rating)
    .bind(&review.headline)
    .bind(&review.body)
    .bind(review.created_at)
    .execute(db)
    .await?;

    Ok(review)
}

/// Respond to an existing ticket. One review per author per ticket; the rule
/// lives here, not in the schema, so the check and the insert share a
/// transaction.
pub async fn respond(
    pool: &SqlitePool,
    author: Uuid,
    ticket_id: Uuid,
    new: &NewReview,
) -> AppResult<RespondOutcome> {
    let mut tx = pool.begin().await?;
    let tid = ticket_id.to_string();

    if sqlx::query_as::<_, ()>("SELECT 1 FROM tickets WHERE id=?")
        .bind(&tid)
        .fetch_optional(&mut *tx)
        .await?
        .is_none()
    {
        return Ok(RespondOutcome::UnknownTicket);
    }

    if sqlx::query_as::<_, ()>("SELECT 1 FROM reviews WHERE ticket_id=? AND author_id=?")
        .bind(&tid)
        .bind(author.to_string())
        .fetch_optional(&mut *tx)
        .await?
        .is_some()
    {
        return Ok(RespondOutcome::AlreadyReviewed);
    }

    let review = insert_on(&mut *tx, author, ticket_id, new).await?;
    tx.commit().await?;
    Ok(RespondOutcome::Created(review))
}

/// The "review from scratch" flow: author posts a ticket and their own review
/// of it in one shot.
pub async fn create_with_ticket(
    pool: &SqlitePool,
    author: Uuid,
    new_ticket: &NewTicket,
    new_review: &NewReview,
) -> AppResult<(Ticket, Review)> {
    let mut tx = pool.begin().await?;
    let ticket = tickets::create(&mut *tx, author, new_ticket).await?;
    let review = insert_on(&mut *tx, author, ticket.id, new_review).await?;
    tx.commit().await?;
    Ok((ticket, review))
}

/// Owner-gated update; `false` means absent or not the caller's review.
pub async fn update(pool: &SqlitePool, author: Uuid, id: Uuid, new: &NewReview) -> AppResult<bool> {
    let done = sqlx::query("UPDATE reviews SET rating=?,headline=?,body=? WHERE id=? AND author_id=?")
        .bind(new.rating)
        .bind(new.headline.trim())
        .bind(new.body.trim())
        .bind(id.to_string())
        .bind(author.to_string())
        .execute(pool)
        .await?;

    Ok(done.rows_affected() > 0)
}

pub async fn delete(pool: &SqlitePool, author: Uuid, id: Uuid) -> AppResult<bool> {
    let done = sqlx::query("DELETE FROM reviews WHERE id=? AND author_id=?")
        .bind(id.to_string())
        .bind(author.to_string())
        .execute(pool)
        .await?;

    Ok(done.rows_affected() > 0)
}

pub(crate) async fn fetch_all(db: impl SqliteExecutor<'_>) -> AppResult<Vec<Review>> {
    let rows: Vec<ReviewRow> = sqlx::query_as(
        "SELECT id,ticket_id,author_id,rating,headline,body,created_at FROM reviews",
    )
    .fetch_all(db)
    .await?;

    rows.into_iter().map(Review::from_row).collect()
}

pub(crate) async fn by_author(db: impl SqliteExecutor<'_>, author: Uuid) -> AppResult<Vec<Review>> {
    let rows: Vec<ReviewRow> = sqlx::query_as(
        "SELECT id,ticket_id,author_id,rating,headline,body,created_at FROM reviews WHERE author_id=?",
    )
    .bind(author.to_string())
    .fetch_all(db)
    .await?;

    rows.into_iter().map(Review::from_row).collect()
}

#[debug_handler]
pub(crate) async fn respond_to_ticket(
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
    Path(id): Path<Uuid>,
    Json(body): Json<NewReview>,
) -> AppResult<Response> {
    if let Err(why) = body.validate() {
        return Ok(invalid(why));
    }

    Ok(match respond(&db_pool, viewer.0, id, &body).await? {
        RespondOutcome::Created(review) => (StatusCode::CREATED, Json(review)).into_response(),
        RespondOutcome::AlreadyReviewed => (
            StatusCode::CONFLICT,
            Json(json!({ "error": "you have already reviewed this ticket" })),
        )
            .into_response(),
        RespondOutcome::UnknownTicket => not_found(),
    })
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewTicketWithReview {
    ticket: NewTicket,
    review: NewReview,
}

#[debug_handler]
pub(crate) async fn create_with_ticket_handler(
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
    Json(body): Json<NewTicketWithReview>,
) -> AppResult<Response> {
    if let Err(why) = body.ticket.validate() {
        return Ok(invalid(why));
    }
    if let Err(why) = body.review.validate() {
        return Ok(invalid(why));
    }

    let (ticket, review) = create_with_ticket(&db_pool, viewer.0, &body.ticket, &body.review).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "ticket": ticket, "review": review })),
    )
        .into_response())
}

#[debug_handler]
pub(crate) async fn edit_review(
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
    Path(id): Path<Uuid>,
    Json(body): Json<NewReview>,
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
pub(crate) async fn delete_review(
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
