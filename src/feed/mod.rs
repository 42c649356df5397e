pub mod compose;

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

use crate::{reviews::Review, tickets::Ticket, viewer::Viewer, AppResult, AppState};

/// One entry of a composed feed. Either a visible ticket carrying its
/// visible reviews, or a lone review whose parent ticket the viewer cannot
/// see.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedItem {
    TicketBlock {
        ticket: Ticket,
        reviews: Vec<Review>,
        viewer_has_reviewed: bool,
    },
    OrphanReview {
        review: Review,
    },
}

impl FeedItem {
    /// The instant the item sorts by. A ticket block sits at its ticket's
    /// creation time even when its reviews are newer.
    pub fn timestamp(&self) -> OffsetDateTime {
        match self {
            FeedItem::TicketBlock { ticket, .. } => ticket.created_at,
            FeedItem::OrphanReview { review } => review.created_at,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(feed))
}

#[debug_handler]
pub(crate) async fn feed(
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
) -> AppResult<Response> {
    let items = compose::compose_feed(&db_pool, viewer.0).await?;
    Ok(Json(items).into_response())
}
