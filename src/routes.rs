use crate::engine::{Category, Record};
use crate::types::*;
use crate::{auth, mcp, AppState};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/search", get(quick_search))
        .route("/search/text", post(search_text))
        .route("/search/images", post(search_images))
        .route("/search/videos", post(search_videos))
        .route("/search/news", post(search_news))
        .route("/search/books", post(search_books))
        .route("/mcp/tools", get(mcp::list_tools))
        .route("/mcp/call", post(mcp::call_tool))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    let app = if state.api_prefix.is_empty() {
        api
    } else {
        Router::new().nest(&state.api_prefix, api)
    };

    app.route("/healthz", get(health_check))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> Json<&'static str> {
    Json("Search API is running")
}

fn invalid(message: String) -> ApiError {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ErrorResponse { error: message }),
    )
}

/// Quick text search. Unlike the category endpoints, backend failures are
/// reported to the caller.
async fn quick_search(
    State(state): State<Arc<AppState>>,
    Query(request): Query<TextSearchRequest>,
) -> Result<Json<Vec<Record>>, ApiError> {
    request.validate().map_err(invalid)?;
    let options = request.to_options(&state.defaults);
    match state.search.text(&request.query, options).await {
        Ok(results) => Ok(Json(results)),
        Err(e) => {
            error!("Search error: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
    }
}

/// Best-effort search: a backend failure is logged and answered with `[]`.
async fn search_or_empty(
    state: &AppState,
    category: Category,
    query: &str,
    options: SearchOptions,
) -> Json<Vec<Record>> {
    match state.search.search(category, query, options.clone()).await {
        Ok(results) => Json(results),
        Err(e) => {
            error!(
                "Error searching {}: {}, query: {}, options: {:?}",
                category, e, query, options
            );
            Json(Vec::new())
        }
    }
}

async fn search_text(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TextSearchRequest>,
) -> Result<Json<Vec<Record>>, ApiError> {
    request.validate().map_err(invalid)?;
    let options = request.to_options(&state.defaults);
    Ok(search_or_empty(&state, Category::Text, &request.query, options).await)
}

async fn search_images(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ImagesSearchRequest>,
) -> Result<Json<Vec<Record>>, ApiError> {
    request.base.validate().map_err(invalid)?;
    let options = request.to_options(&state.defaults);
    Ok(search_or_empty(&state, Category::Images, &request.base.query, options).await)
}

async fn search_videos(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VideosSearchRequest>,
) -> Result<Json<Vec<Record>>, ApiError> {
    request.base.validate().map_err(invalid)?;
    let options = request.to_options(&state.defaults);
    Ok(search_or_empty(&state, Category::Videos, &request.base.query, options).await)
}

async fn search_news(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewsSearchRequest>,
) -> Result<Json<Vec<Record>>, ApiError> {
    request.validate().map_err(invalid)?;
    let options = request.to_options(&state.defaults);
    Ok(search_or_empty(&state, Category::News, &request.query, options).await)
}

async fn search_books(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BooksSearchRequest>,
) -> Result<Json<Vec<Record>>, ApiError> {
    request.validate().map_err(invalid)?;
    let options = request.to_options(&state.defaults);
    Ok(search_or_empty(&state, Category::Books, &request.query, options).await)
}
