use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feedhub::config::Config;
use feedhub::db::Database;
use feedhub::graphql::build_schema;
use feedhub::services::{AuthConfig, AuthService, EventChannel, FeedService, UploadService};
use feedhub::{AppState, build_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(Config::from_env()?);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "feedhub=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Feedhub backend");

    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;
    tracing::info!("Database connected and migrated");

    let uploads = Arc::new(UploadService::new(&config.uploads_path));
    uploads.ensure_root().await?;
    tracing::info!(path = %config.uploads_path, "Upload directory ready");

    // The event channel is passed explicitly to everything that publishes
    // or subscribes; there is no global handle.
    let events = EventChannel::default();
    let auth = AuthService::new(db.clone(), AuthConfig::from(config.as_ref()));
    let feed = Arc::new(FeedService::new(db.clone(), uploads.clone(), events.clone()));

    let schema = build_schema(auth.clone(), feed.clone(), events);
    tracing::info!("GraphQL schema built");

    let app = build_router(AppState {
        config: config.clone(),
        db,
        schema,
        auth,
        feed,
        uploads,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);
    tracing::info!("GraphQL playground: http://localhost:{}/graphql", config.port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
