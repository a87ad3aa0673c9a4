use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::content::{Entry, Lookup};
use crate::context::SiteContext;

#[derive(Clone)]
pub struct AppState {
    ctx: SiteContext,
}

/// JSON surface over the aggregated content, with the public directory as
/// a static fallback.
pub fn create_router(ctx: SiteContext) -> Router {
    let public_dir = ctx.config.content.public_dir.clone();
    let state = AppState { ctx };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/blogs", get(list_blogs))
        .route("/api/blogs/{slug}", get(show_blog))
        .route("/api/slugs", get(list_slugs))
        .route("/api/works", get(list_works))
        .fallback_service(ServeDir::new(public_dir))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn list_blogs(State(state): State<AppState>) -> Json<Vec<Entry>> {
    Json(state.ctx.aggregator().list_entries().await)
}

async fn show_blog(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    let lookup: Lookup<Entry> = state.ctx.aggregator().find_by_slug(&slug).await;
    if !lookup.is_found() {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "not found", "slug": slug })),
        )
            .into_response();
    }
    Json(lookup).into_response()
}

async fn list_slugs(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.ctx.aggregator().detail_slugs().await)
}

async fn list_works(State(state): State<AppState>) -> Response {
    match state.ctx.works().await {
        Ok(works) => Json(works).into_response(),
        Err(e) => {
            tracing::error!(target: "api", error = ?e, "works unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": "works unavailable" })),
            )
                .into_response()
        }
    }
}
