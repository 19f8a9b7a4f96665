use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::state::AppContext;
use crate::ml::CategoryPrediction;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    categories: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GoParams {
    #[serde(default)]
    query: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ClassifyRequest {
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClassificationResponse {
    pub query: String,
    pub predictions: Vec<CategoryPrediction>,
    /// Categories predicted as 1, in canonical order.
    pub matched: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub(crate) async fn health(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        categories: ctx.categories().len(),
    })
}

pub(crate) async fn go(
    State(ctx): State<Arc<AppContext>>,
    Query(params): Query<GoParams>,
) -> impl IntoResponse {
    Json(classify_text(&ctx, params.query))
}

pub(crate) async fn classify(
    State(ctx): State<Arc<AppContext>>,
    Json(request): Json<ClassifyRequest>,
) -> impl IntoResponse {
    Json(classify_text(&ctx, request.text))
}

pub(crate) async fn overview(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    match ctx.overview() {
        Some(overview) => Json(overview.clone()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "no message store configured".into(),
            }),
        )
            .into_response(),
    }
}

fn classify_text(ctx: &AppContext, query: String) -> ClassificationResponse {
    let predictions = ctx.classify(&query);
    let matched = predictions
        .iter()
        .filter(|p| p.label == 1)
        .map(|p| p.category.clone())
        .collect();
    tracing::debug!(query_len = query.len(), "classified message");

    ClassificationResponse {
        query,
        predictions,
        matched,
    }
}
