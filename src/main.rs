use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slotly_backend_core::{
    booking_routes, handlers::docs, health_check, initialize_app_state, services,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slotly_backend_core=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    info!("Starting Slotly booking engine");

    let state = initialize_app_state()
        .await
        .map_err(|e| anyhow::anyhow!("Startup failed: {}", e))?;

    // Background hygiene tasks (expired-hold sweeper when enabled)
    services::initialize_background_tasks(state.clone()).await;

    let cors = build_cors_layer(&state.config.cors_allowed_origins)?;

    let app = Router::new()
        .route("/api/v1/health", get(health_check))
        .route("/api/v1/docs/openapi.json", get(docs::openapi_json))
        .nest("/api/v1/booking", booking_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state.clone());

    let bind_address = format!("{}:{}", state.config.bind_address, state.config.port);
    info!("Listening on {}", bind_address);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_cors_layer(allowed_origins: &[String]) -> anyhow::Result<CorsLayer> {
    use axum::http::HeaderValue;
    use tower_http::cors::{AllowOrigin, Any};

    if allowed_origins.iter().any(|o| o == "*") {
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any));
    }

    let origins: Result<Vec<HeaderValue>, _> = allowed_origins
        .iter()
        .map(|o| o.parse::<HeaderValue>())
        .collect();

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins?))
        .allow_methods(Any)
        .allow_headers(Any))
}
