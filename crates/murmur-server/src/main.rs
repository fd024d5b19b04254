use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use murmur_api::{AppState, AppStateInner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "murmur=debug,murmur_api=debug,murmur_db=info,tower_http=debug".into()),
        )
        .init();

    // Config
    let db_path = std::env::var("MURMUR_DB_PATH").unwrap_or_else(|_| "murmur.db".into());
    let host = std::env::var("MURMUR_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("MURMUR_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let permissive_cors = std::env::var("MURMUR_CORS_PERMISSIVE")
        .map(|v| !matches!(v.as_str(), "0" | "false" | "off"))
        .unwrap_or(true);

    // Init database
    let db = murmur_db::Database::open(&PathBuf::from(&db_path))?;
    let state: AppState = Arc::new(AppStateInner { db });

    let mut app = murmur_api::router(state).layer(TraceLayer::new_for_http());
    if permissive_cors {
        app = app.layer(CorsLayer::permissive());
    }

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Murmur server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
