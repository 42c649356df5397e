use axum::{
    debug_handler,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{users, viewer::Viewer, AppResult};

use super::graph;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscribeAction {
    Follow,
    Block,
}

/// Classified result of a subscription attempt. Rejections live here, in the
/// `Ok` position; `AppError` stays reserved for infrastructure failures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscribeOutcome {
    Followed,
    Blocked,
    AlreadyFollowing,
    AlreadyBlocked,
    SelfTarget,
    BlockedRelationship,
    UnknownUser,
}

impl SubscribeOutcome {
    pub fn message(self) -> &'static str {
        match self {
            SubscribeOutcome::Followed => "you are now following this user",
            SubscribeOutcome::Blocked => "this user is now blocked",
            SubscribeOutcome::AlreadyFollowing => "you already follow this user",
            SubscribeOutcome::AlreadyBlocked => "this user is already blocked",
            SubscribeOutcome::SelfTarget => "you cannot follow or block yourself",
            SubscribeOutcome::BlockedRelationship => "a block prevents following this user",
            SubscribeOutcome::UnknownUser => "no such user",
        }
    }
}

/// Resolve the target by username (case-insensitive) and apply the action.
pub async fn subscribe(
    pool: &SqlitePool,
    viewer: Uuid,
    username: &str,
    action: SubscribeAction,
) -> AppResult<SubscribeOutcome> {
    let Some(target) = users::find_by_username(pool, username).await? else {
        return Ok(SubscribeOutcome::UnknownUser);
    };

    if target.id == viewer {
        return Ok(SubscribeOutcome::SelfTarget);
    }

    match action {
        SubscribeAction::Follow => follow(pool, viewer, target.id).await,
        SubscribeAction::Block => block(pool, viewer, target.id).await,
    }
}

/// A follow is refused while a block exists in either direction. The insert
/// can still lose a race to a concurrent duplicate, in which case the unique
/// index fires and the result folds back into `AlreadyFollowing`.
pub async fn follow(pool: &SqlitePool, follower: Uuid, target: Uuid) -> AppResult<SubscribeOutcome> {
    if graph::is_following(pool, follower, target).await? {
        return Ok(SubscribeOutcome::AlreadyFollowing);
    }
    if graph::block_between(pool, follower, target).await? {
        return Ok(SubscribeOutcome::BlockedRelationship);
    }

    let insert = sqlx::query("INSERT INTO follows (follower_id,followed_id,created_at) VALUES (?,?,?)")
        .bind(follower.to_string())
        .bind(target.to_string())
        .bind(OffsetDateTime::now_utc())
        .execute(pool)
        .await;

    match insert {
        Ok(_) => Ok(SubscribeOutcome::Followed),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Ok(SubscribeOutcome::AlreadyFollowing)
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn block(pool: &SqlitePool, blocker: Uuid, target: Uuid) -> AppResult<SubscribeOutcome> {
    if graph::is_blocking(pool, blocker, target).await? {
        return Ok(SubscribeOutcome::AlreadyBlocked);
    }

    block_user(pool, blocker, target).await?;
    Ok(SubscribeOutcome::Blocked)
}

/// The block transition: retract follows in both directions and record the
/// block edge, as one transaction. Safe to replay; `INSERT OR IGNORE` keeps
/// the edge unique.
pub async fn block_user(pool: &SqlitePool, blocker: Uuid, target: Uuid) -> AppResult<()> {
    let (a, b) = (blocker.to_string(), target.to_string());
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM follows WHERE follower_id=? AND followed_id=?")
        .bind(&a)
        .bind(&b)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM follows WHERE follower_id=? AND followed_id=?")
        .bind(&b)
        .bind(&a)
        .execute(&mut *tx)
        .await?;
    sqlx::query("INSERT OR IGNORE INTO blocks (blocker_id,blocked_id,created_at) VALUES (?,?,?)")
        .bind(&a)
        .bind(&b)
        .bind(OffsetDateTime::now_utc())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubscriptionQuery {
    username: String,
    action: SubscribeAction,
}

#[debug_handler]
pub(crate) async fn post_subscription(
    State(db_pool): State<SqlitePool>,
    viewer: Viewer,
    Json(SubscriptionQuery { username, action }): Json<SubscriptionQuery>,
) -> AppResult<Response> {
    let outcome = subscribe(&db_pool, viewer.0, username.trim(), action).await?;

    let status = match outcome {
        SubscribeOutcome::Followed | SubscribeOutcome::Blocked => StatusCode::CREATED,
        SubscribeOutcome::AlreadyFollowing | SubscribeOutcome::AlreadyBlocked => StatusCode::OK,
        SubscribeOutcome::UnknownUser => StatusCode::NOT_FOUND,
        SubscribeOutcome::BlockedRelationship => StatusCode::CONFLICT,
        SubscribeOutcome::SelfTarget => StatusCode::UNPROCESSABLE_ENTITY,
    };

    Ok((
        status,
        Json(json!({ "outcome": outcome, "message": outcome.message() })),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use crate::social::graph;
    use crate::testutil;

    use super::*;

    #[tokio::test]
    async fn follow_by_username_folds_case() {
        let pool = testutil::pool().await;
        let alice = testutil::seed_user(&pool, "alice").await;
        let bob = testutil::seed_user(&pool, "BoB").await;

        let outcome = subscribe(&pool, alice, "bob", SubscribeAction::Follow)
            .await
            .unwrap();
        assert_eq!(outcome, SubscribeOutcome::Followed);
        assert!(graph::followed_ids(&pool, alice).await.unwrap().contains(&bob));
    }

    #[tokio::test]
    async fn self_and_unknown_targets_are_rejected() {
        let pool = testutil::pool().await;
        let alice = testutil::seed_user(&pool, "alice").await;

        assert_eq!(
            subscribe(&pool, alice, "alice", SubscribeAction::Follow)
                .await
                .unwrap(),
            SubscribeOutcome::SelfTarget
        );
        assert_eq!(
            subscribe(&pool, alice, "alice", SubscribeAction::Block)
                .await
                .unwrap(),
            SubscribeOutcome::SelfTarget
        );
        assert_eq!(
            subscribe(&pool, alice, "nobody", SubscribeAction::Follow)
                .await
                .unwrap(),
            SubscribeOutcome::UnknownUser
        );
        assert_eq!(testutil::count(&pool, "SELECT COUNT(*) FROM follows").await, 0);
        assert_eq!(testutil::count(&pool, "SELECT COUNT(*) FROM blocks").await, 0);
    }

    #[tokio::test]
    async fn duplicate_follow_reports_already_following() {
        let pool = testutil::pool().await;
        let alice = testutil::seed_user(&pool, "alice").await;
        let bob = testutil::seed_user(&pool, "bob").await;

        assert_eq!(
            follow(&pool, alice, bob).await.unwrap(),
            SubscribeOutcome::Followed
        );
        assert_eq!(
            follow(&pool, alice, bob).await.unwrap(),
            SubscribeOutcome::AlreadyFollowing
        );
        assert_eq!(testutil::count(&pool, "SELECT COUNT(*) FROM follows").await, 1);
    }

    #[tokio::test]
    async fn a_block_in_either_direction_stops_a_follow() {
        let pool = testutil::pool().await;
        let alice = testutil::seed_user(&pool, "alice").await;
        let zoe = testutil::seed_user(&pool, "zoe").await;

        block(&pool, alice, zoe).await.unwrap();

        assert_eq!(
            follow(&pool, alice, zoe).await.unwrap(),
            SubscribeOutcome::BlockedRelationship
        );
        // and the other way round: zoe cannot follow the user who blocked her
        assert_eq!(
            follow(&pool, zoe, alice).await.unwrap(),
            SubscribeOutcome::BlockedRelationship
        );
        assert_eq!(testutil::count(&pool, "SELECT COUNT(*) FROM follows").await, 0);
    }

    #[tokio::test]
    async fn blocking_retracts_mutual_follows_and_replays_cleanly() {
        let pool = testutil::pool().await;
        let alice = testutil::seed_user(&pool, "alice").await;
        let zoe = testutil::seed_user(&pool, "zoe").await;

        follow(&pool, alice, zoe).await.unwrap();
        follow(&pool, zoe, alice).await.unwrap();
        assert_eq!(testutil::count(&pool, "SELECT COUNT(*) FROM follows").await, 2);

        block_user(&pool, alice, zoe).await.unwrap();
        block_user(&pool, alice, zoe).await.unwrap();

        assert_eq!(testutil::count(&pool, "SELECT COUNT(*) FROM follows").await, 0);
        assert_eq!(testutil::count(&pool, "SELECT COUNT(*) FROM blocks").await, 1);
    }

    #[tokio::test]
    async fn second_block_is_reported_not_errored() {
        let pool = testutil::pool().await;
        let alice = testutil::seed_user(&pool, "alice").await;
        let zoe = testutil::seed_user(&pool, "zoe").await;

        assert_eq!(
            block(&pool, alice, zoe).await.unwrap(),
            SubscribeOutcome::Blocked
        );
        assert_eq!(
            block(&pool, alice, zoe).await.unwrap(),
            SubscribeOutcome::AlreadyBlocked
        );
        assert_eq!(testutil::count(&pool, "SELECT COUNT(*) FROM blocks").await, 1);
    }

    #[tokio::test]
    async fn reverse_blocks_are_independent_edges() {
        let pool = testutil::pool().await;
        let alice = testutil::seed_user(&pool, "alice").await;
        let zoe = testutil::seed_user(&pool, "zoe").await;

        block(&pool, zoe, alice).await.unwrap();
        block(&pool, alice, zoe).await.unwrap();

        assert_eq!(testutil::count(&pool, "SELECT COUNT(*) FROM blocks").await, 2);
        assert!(graph::blocked_ids(&pool, alice).await.unwrap().contains(&zoe));
        assert!(graph::blocked_ids(&pool, zoe).await.unwrap().contains(&alice));
    }
}
