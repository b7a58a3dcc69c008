use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod ai;
mod error;
mod middleware;
mod routes;
mod state;
mod store;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "QMS Audit Management API",
        version = "1.0.0",
        description = "REST backend for quality-management audit tracking, with AI-assisted analysis tools."
    ),
    paths(
        routes::health::health_check,
        routes::audits::create_audit,
        routes::audits::list_audits,
        routes::audits::get_audit,
        routes::audits::update_audit,
        routes::audits::delete_audit,
        routes::audits::audits_summary,
        routes::ai::list_tools,
        routes::ai::execute_query,
        routes::ai::chat,
    ),
    components(schemas(
        HealthResponse,
        qms_core::audit::Audit,
        qms_core::audit::AuditSummary,
        qms_core::audit::AuditType,
        qms_core::audit::AuditStatus,
        qms_core::audit::CreateAuditRequest,
        qms_core::audit::UpdateAuditRequest,
        qms_core::ai::ToolInfo,
        qms_core::ai::ToolListResponse,
        qms_core::ai::AiQueryRequest,
        qms_core::ai::AiResponse,
        qms_core::ai::ChatRequest,
        qms_core::ai::ChatResponse,
        qms_core::error::ApiError,
        routes::audits::AuditsSummaryResponse,
        routes::audits::AuditDeletedResponse,
    ))
)]
struct ApiDoc;

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qms_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    // Database connection
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    sqlx::migrate!("../migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // First-run seeding: an empty store gets a few example audits
    let count = store::count_audits(&pool)
        .await
        .expect("Failed to count audits");
    if count == 0 {
        store::seed_sample_audits(&pool)
            .await
            .expect("Failed to seed sample audits");
        tracing::info!("audit store seeded with sample records");
    }

    // One shared model gateway, passed in explicitly so tests can swap it
    let api_key = std::env::var("GEMINI_API_KEY").expect("GEMINI_API_KEY must be set");
    let model = std::env::var("QMS_GEMINI_MODEL")
        .unwrap_or_else(|_| ai::DEFAULT_GEMINI_MODEL.to_string());
    let gateway = Arc::new(ai::GeminiGateway::new(api_key, model));

    let app_state = state::AppState {
        db: pool,
        ai: Arc::new(ai::AiService::new(gateway)),
    };

    // CORS
    let cors_layer = middleware::cors::build_cors_layer();

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::health::router())
        .merge(routes::audits::router())
        .merge(routes::ai::router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer),
        )
        .with_state(app_state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("QMS audit API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
