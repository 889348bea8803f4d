use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use supchat_api::{AppState, AppStateInner, routes};
use supchat_core::ChatService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "supchat=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("SUPCHAT_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("SUPCHAT_DB_PATH").unwrap_or_else(|_| "supchat.db".into());
    let host = std::env::var("SUPCHAT_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("SUPCHAT_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database and wire the chat service to its artifact stores
    let db = Arc::new(supchat_db::Database::open(&PathBuf::from(&db_path))?);
    let service = ChatService::with_sqlite_stores(db);

    let state: AppState = Arc::new(AppStateInner {
        service,
        jwt_secret,
    });

    let app = routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("supchat server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
