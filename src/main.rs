use std::str::FromStr;

use anyhow::Result;
use axum::Router;
use dogeared::{db, feed, posts, reviews, social, tickets, users, AppState};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let db_url = dotenv::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:dogeared.db".to_string());
    let db_pool = SqlitePoolOptions::new()
        .max_connections(16)
        .connect_with(SqliteConnectOptions::from_str(&db_url)?.create_if_missing(true))
        .await?;
    db::migrate(&db_pool).await?;

    let app_state = AppState { db_pool };

    let app = Router::new()
        .nest("/feed", feed::router())
        .nest("/subscriptions", social::router())
        .nest("/tickets", tickets::router())
        .nest("/reviews", reviews::router())
        .nest("/posts", posts::router())
        .nest("/users", users::router())
        .with_state(app_state)
        .layer(CorsLayer::permissive());

    let addr = dotenv::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    tracing::info!("listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
