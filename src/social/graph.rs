//! Follow and block edges, and the set algebra over them.

use std::collections::HashSet;

use sqlx::{SqliteExecutor, SqlitePool};
use uuid::Uuid;

use crate::AppResult;

pub async fn followed_ids(db: impl SqliteExecutor<'_>, viewer: Uuid) -> AppResult<HashSet<Uuid>> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT followed_id FROM follows WHERE follower_id=?")
        .bind(viewer.to_string())
        .fetch_all(db)
        .await?;

    rows.iter().map(|(id,)| Ok(Uuid::parse_str(id)?)).collect()
}

pub async fn follower_ids(db: impl SqliteExecutor<'_>, viewer: Uuid) -> AppResult<HashSet<Uuid>> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT follower_id FROM follows WHERE followed_id=?")
        .bind(viewer.to_string())
        .fetch_all(db)
        .await?;

    rows.iter().map(|(id,)| Ok(Uuid::parse_str(id)?)).collect()
}

pub async fn blocked_ids(db: impl SqliteExecutor<'_>, viewer: Uuid) -> AppResult<HashSet<Uuid>> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT blocked_id FROM blocks WHERE blocker_id=?")
        .bind(viewer.to_string())
        .fetch_all(db)
        .await?;

    rows.iter().map(|(id,)| Ok(Uuid::parse_str(id)?)).collect()
}

/// Whose content the viewer sees: themselves plus everyone they follow,
/// minus everyone they block.
pub fn visible_authors(
    viewer: Uuid,
    followed: &HashSet<Uuid>,
    blocked: &HashSet<Uuid>,
) -> HashSet<Uuid> {
    let mut authors = followed.clone();
    authors.insert(viewer);
    authors.difference(blocked).copied().collect()
}

pub(crate) async fn is_following(
    db: impl SqliteExecutor<'_>,
    follower: Uuid,
    followed: Uuid,
) -> AppResult<bool> {
    Ok(
        sqlx::query_as::<_, ()>("SELECT 1 FROM follows WHERE follower_id=? AND followed_id=?")
            .bind(follower.to_string())
            .bind(followed.to_string())
            .fetch_optional(db)
            .await?
            .is_some(),
    )
}

pub(crate) async fn is_blocking(
    db: impl SqliteExecutor<'_>,
    blocker: Uuid,
    blocked: Uuid,
) -> AppResult<bool> {
    Ok(
        sqlx::query_as::<_, ()>("SELECT 1 FROM blocks WHERE blocker_id=? AND blocked_id=?")
            .bind(blocker.to_string())
            .bind(blocked.to_string())
            .fetch_optional(db)
            .await?
            .is_some(),
    )
}

/// A block in either direction between the pair.
pub(crate) async fn block_between(
    db: impl SqliteExecutor<'_>,
    a: Uuid,
    b: Uuid,
) -> AppResult<bool> {
    Ok(sqlx::query_as::<_, ()>(
        "SELECT 1 FROM blocks WHERE (blocker_id=? AND blocked_id=?) OR (blocker_id=? AND blocked_id=?)",
    )
    .bind(a.to_string())
    .bind(b.to_string())
    .bind(b.to_string())
    .bind(a.to_string())
    .fetch_optional(db)
    .await?
    .is_some())
}

/// Idempotent; removing an absent edge is a no-op.
pub async fn unfollow(pool: &SqlitePool, follower: Uuid, followed: Uuid) -> AppResult<()> {
    sqlx::query("DELETE FROM follows WHERE follower_id=? AND followed_id=?")
        .bind(follower.to_string())
        .bind(followed.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

/// Idempotent; removing an absent edge is a no-op.
pub async fn unblock(pool: &SqlitePool, blocker: Uuid, blocked: Uuid) -> AppResult<()> {
    sqlx::query("DELETE FROM blocks WHERE blocker_id=? AND blocked_id=?")
        .bind(blocker.to_string())
        .bind(blocked.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::social::subscribe;
    use crate::testutil;

    use super::*;

    #[test]
    fn visible_authors_is_self_plus_followed_minus_blocked() {
        let me = Uuid::from_u128(1);
        let friend = Uuid::from_u128(2);
        let foe = Uuid::from_u128(3);

        let followed: HashSet<Uuid> = [friend, foe].into_iter().collect();
        let blocked: HashSet<Uuid> = [foe].into_iter().collect();

        let visible = visible_authors(me, &followed, &blocked);
        assert_eq!(visible, [me, friend].into_iter().collect());
    }

    #[tokio::test]
    async fn edge_sets_read_back_what_the_ops_wrote() {
        let pool = testutil::pool().await;
        let alice = testutil::seed_user(&pool, "alice").await;
        let bob = testutil::seed_user(&pool, "bob").await;
        let carol = testutil::seed_user(&pool, "carol").await;
        let zoe = testutil::seed_user(&pool, "zoe").await;

        subscribe::follow(&pool, alice, bob).await.unwrap();
        subscribe::follow(&pool, alice, carol).await.unwrap();
        subscribe::follow(&pool, carol, alice).await.unwrap();
        subscribe::block_user(&pool, alice, zoe).await.unwrap();

        assert_eq!(
            followed_ids(&pool, alice).await.unwrap(),
            [bob, carol].into_iter().collect()
        );
        assert_eq!(
            follower_ids(&pool, alice).await.unwrap(),
            [carol].into_iter().collect()
        );
        assert_eq!(
            blocked_ids(&pool, alice).await.unwrap(),
            [zoe].into_iter().collect()
        );
        assert!(blocked_ids(&pool, zoe).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn removing_absent_edges_is_a_quiet_no_op() {
        let pool = testutil::pool().await;
        let alice = testutil::seed_user(&pool, "alice").await;
        let bob = testutil::seed_user(&pool, "bob").await;

        subscribe::follow(&pool, alice, bob).await.unwrap();
        unfollow(&pool, alice, bob).await.unwrap();
        unfollow(&pool, alice, bob).await.unwrap();
        assert!(followed_ids(&pool, alice).await.unwrap().is_empty());

        subscribe::block_user(&pool, alice, bob).await.unwrap();
        unblock(&pool, alice, bob).await.unwrap();
        unblock(&pool, alice, bob).await.unwrap();
        assert!(blocked_ids(&pool, alice).await.unwrap().is_empty());
    }
}
