use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, HeaderValue},
};
use serde::Deserialize;
use std::collections::HashMap;

use crate::api::error::AppError;
use crate::api::state::AppState;
use crate::providers::yahoo::{QuoteRecord, SearchResult};

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
pub struct QuotesParams {
    #[serde(default)]
    pub symbols: String,
}

/// Free-text asset search backed by the cache-aside layer. Cache
/// diagnostics travel back as `X-Cache`, `X-Cache-TTL` and `X-Cache-Key`
/// response headers.
pub async fn available(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<(HeaderMap, Json<Vec<SearchResult>>), AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {MAX_LIMIT}"
        )));
    }
    // A blank query is an empty-but-valid result, not a client error;
    // the lookup short-circuits without touching cache or upstream.
    let (results, diag) = state.search.lookup(&params.q, limit).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        "x-cache",
        HeaderValue::from_static(if diag.hit { "HIT" } else { "MISS" }),
    );
    if let Some(ttl) = diag.ttl {
        headers.insert("x-cache-ttl", HeaderValue::from(ttl.as_secs()));
    }
    if let Ok(key) = HeaderValue::from_str(&diag.key) {
        headers.insert("x-cache-key", key);
    }

    Ok((headers, Json(results)))
}

/// Batch quotes for a comma-separated symbol list; always fetched fresh,
/// keyed by normalized symbol.
pub async fn quotes(
    State(state): State<AppState>,
    Query(params): Query<QuotesParams>,
) -> Result<Json<HashMap<String, QuoteRecord>>, AppError> {
    let symbols: Vec<String> = params.symbols.split(',').map(str::to_string).collect();
    let out = state.market.quotes(&symbols).await?;
    Ok(Json(out))
}
