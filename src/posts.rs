use axum::{
    debug_handler,
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{reviews, reviews::Review, tickets, tickets::Ticket, viewer::Viewer, AppResult, AppState};

/// One of the viewer's own publications, ticket or review.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PostItem {
    Ticket { ticket: Ticket },
    Review { review: Review },
}

impl PostItem {
    fn timestamp(&self) -> OffsetDateTime {
        match self {
            PostItem::Ticket { ticket } => ticket.created_at,
            PostItem::Review { review } => review.created_at,
        }
    }
}

/// Everything the author has published, newest first.
pub async fn posts(pool: &SqlitePool, author: Uuid) -> AppResult<Vec<PostItem>> {
    let mut tx = pool.begin().await?;
    let tickets = tickets::by_author(&mut *tx, author).await?;
    let reviews = reviews::by_author(&mut *tx, author).await?;
    tx.commit().await?;

    let mut items: Vec<PostItem> = tickets
        .into_iter()
        .map(|ticket| PostItem::Ticket { ticket })
        .chain(reviews.into_iter().map(|review| PostItem::Review { review }))
        .collect();
    items.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));

    Ok(items)
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(my_posts))
}

#[debug_handler]
pub(crate) async fn my_posts(
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
) -> AppResult<Response> {
    let items = posts(&db_pool, viewer.0).await?;
    Ok(Json(items).into_response())
}
