//! The feed pipeline: fetch everything in one transaction, then compose in
//! memory. There is no pagination and no incremental update, the visible set
//! is recomputed in full on every request, so the honest shape is a pure
//! function over the loaded rows.

use std::collections::{HashMap, HashSet};

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::social::graph;
use crate::{reviews, reviews::Review, tickets, tickets::Ticket, AppResult};

use super::FeedItem;

pub async fn compose_feed(pool: &SqlitePool, viewer: Uuid) -> AppResult<Vec<FeedItem>> {
    let mut tx = pool.begin().await?;
    let followed = graph::followed_ids(&mut *tx, viewer).await?;
    let blocked = graph::blocked_ids(&mut *tx, viewer).await?;
    let tickets = tickets::fetch_all(&mut *tx).await?;
    let reviews = reviews::fetch_all(&mut *tx).await?;
    tx.commit().await?;

    Ok(compose(viewer, &followed, &blocked, tickets, reviews))
}

/// Compose the viewer's timeline from raw rows.
///
/// A ticket is visible when its author is the viewer or someone they follow,
/// and never when its author is blocked, even if a stale follow edge
/// coexists with the block. A review lands in three places:
///
/// - under its ticket's block, when the ticket is visible and the review's
///   author is not blocked (the reviewer does not have to be followed);
/// - as an orphan, when its author is a visible author but the parent ticket
///   is not visible (typically a followed user reviewing a stranger's or a
///   blocked user's ticket);
/// - nowhere, otherwise.
///
/// `viewer_has_reviewed` is decided on the full review set of the ticket,
/// before any visibility filtering.
pub fn compose(
    viewer: Uuid,
    followed: &HashSet<Uuid>,
    blocked: &HashSet<Uuid>,
    tickets: Vec<Ticket>,
    reviews: Vec<Review>,
) -> Vec<FeedItem> {
    let visible = graph::visible_authors(viewer, followed, blocked);

    let mut visible_tickets = Vec::new();
    let mut visible_ticket_ids = HashSet::new();
    for ticket in tickets {
        if visible.contains(&ticket.author_id) {
            visible_ticket_ids.insert(ticket.id);
            visible_tickets.push(ticket);
        }
    }

    let mut on_ticket: HashMap<Uuid, Vec<Review>> = HashMap::new();
    let mut reviewed_by_viewer: HashSet<Uuid> = HashSet::new();
    let mut orphans: Vec<Review> = Vec::new();

    for review in reviews {
        if review.author_id == viewer {
            reviewed_by_viewer.insert(review.ticket_id);
        }

        if visible_ticket_ids.contains(&review.ticket_id) {
            if !blocked.contains(&review.author_id) {
                on_ticket.entry(review.ticket_id).or_default().push(review);
            }
        } else if visible.contains(&review.author_id) {
            orphans.push(review);
        }
    }

    let mut items = Vec::with_capacity(visible_tickets.len() + orphans.len());
    for ticket in visible_tickets {
        let mut ticket_reviews = on_ticket.remove(&ticket.id).unwrap_or_default();
        ticket_reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let viewer_has_reviewed = reviewed_by_viewer.contains(&ticket.id);
        items.push(FeedItem::TicketBlock {
            ticket,
            reviews: ticket_reviews,
            viewer_has_reviewed,
        });
    }
    items.extend(orphans.into_iter().map(|review| FeedItem::OrphanReview { review }));

    items.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
    items
}
