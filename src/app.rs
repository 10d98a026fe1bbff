use axum::{middleware::from_fn, routing::get, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::middleware::jwt_auth_middleware;

/// Builds the full application router. Public root/health plus the protected
/// grading and results APIs.
pub fn app() -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        // Protected APIs
        .merge(grading_routes())
        .merge(results_routes())
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn grading_routes() -> Router {
    use axum::routing::post;
    use handlers::{batches, schemes, scores};

    Router::new()
        // Scheme definition management
        .route("/api/grading/schemes", get(schemes::get).post(schemes::post))
        .route(
            "/api/grading/schemes/:id",
            axum::routing::put(schemes::put).delete(schemes::delete),
        )
        .route(
            "/api/grading/schemes/class/:class_id",
            get(schemes::list_for_class),
        )
        // Single-score ledger operations
        .route(
            "/api/grading/scores",
            post(scores::post).put(scores::put),
        )
        .route("/api/grading/scores/:scheme_id", get(scores::get_class_sheet))
        // Atomic multi-student batches
        .route(
            "/api/grading/score-batch",
            post(batches::post).patch(batches::patch),
        )
        .route_layer(from_fn(jwt_auth_middleware))
}

fn results_routes() -> Router {
    use handlers::results;

    Router::new()
        .route(
            "/api/results/own/:class_id/:student_id",
            get(results::own_scores),
        )
        .route("/api/results/class/:class_id", get(results::class_results))
        .route(
            "/api/results/transcript/:student_id",
            get(results::transcript),
        )
        .route_layer(from_fn(jwt_auth_middleware))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Registrar API",
            "version": version,
            "description": "School administration backend - grading and results engine",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "schemes": "/api/grading/schemes[/:id] (protected)",
                "scores": "/api/grading/scores[/:scheme_id] (protected)",
                "score_batch": "/api/grading/score-batch (protected)",
                "results": "/api/results/own|class|transcript (protected)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match crate::database::manager::DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
