//! Shared plumbing for the database-backed tests.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{db, users};

/// Fresh in-memory database. One connection only: every extra connection of
/// a larger pool would get its own empty `:memory:` database.
pub async fn pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::migrate(&pool).await.unwrap();
    pool
}

pub async fn seed_user(pool: &SqlitePool, username: &str) -> Uuid {
    let id = Uuid::now_v7();
    users::upsert(pool, id, username).await.unwrap();
    id
}

pub async fn seed_ticket(
    pool: &SqlitePool,
    author: Uuid,
    title: &str,
    at: OffsetDateTime,
) -> Uuid {
    let id = Uuid::now_v7();
    sqlx::query(
        "INSERT INTO tickets (id,title,description,author_id,image,created_at) \
         VALUES (?,?,?,?,NULL,?)",
    )
    .bind(id.to_string())
    .bind(title)
    .bind("seeded for a test")
    .bind(author.to_string())
    .bind(at)
    .execute(pool)
    .await
    .unwrap();
    id
}

pub async fn seed_review(
    pool: &SqlitePool,
    ticket: Uuid,
    author: Uuid,
    at: OffsetDateTime,
) -> Uuid {
    let id = Uuid::now_v7();
    sqlx::query(
        "INSERT INTO reviews (id,ticket_id,author_id,rating,headline,body,created_at) \
         VALUES (?,?,?,3,'seeded','seeded for a test',?)",
    )
    .bind(id.to_string())
    .bind(ticket.to_string())
    .bind(author.to_string())
    .bind(at)
    .execute(pool)
    .await
    .unwrap();
    id
}

pub async fn count(pool: &SqlitePool, sql: &str) -> i64 {
    let (n,): (i64,) = sqlx::query_as(sql).fetch_one(pool).await.unwrap();
    n
}
