//! HTTP route handlers for the search API.

use crate::cluster::ClusterStats;
use crate::error::TntError;
use crate::search::{Hit, QueryResult};
use crate::server::AppState;
use crate::storage::StoredIndex;
use crate::text::{TextIndex, Weighting};
use crate::vector::Vector;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

// --- Request/Response types ---

/// A vector on the wire: a bare array is dense, an object is sparse.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum VectorPayload {
    Dense(Vec<f32>),
    Sparse {
        dimension: usize,
        indices: Vec<u32>,
        values: Vec<f32>,
    },
}

impl TryFrom<VectorPayload> for Vector {
    type Error = TntError;

    fn try_from(payload: VectorPayload) -> Result<Self, TntError> {
        match payload {
            VectorPayload::Dense(data) => Ok(Vector::dense(data)),
            VectorPayload::Sparse {
                dimension,
                indices,
                values,
            } => Vector::sparse(dimension, indices, values),
        }
    }
}

#[derive(Deserialize)]
pub struct SearchRequest {
    pub vector: VectorPayload,
    pub k: Option<usize>,
    pub probe_count: Option<usize>,
}

#[derive(Deserialize)]
pub struct TextSearchRequest {
    pub query: String,
    pub k: Option<usize>,
    pub probe_count: Option<usize>,
}

#[derive(Deserialize)]
pub struct RebuildRequest {
    pub vectors: Option<Vec<VectorPayload>>,
    pub documents: Option<Vec<String>>,
    #[serde(default)]
    pub weighting: Weighting,
    pub leader_count: Option<usize>,
    pub seed: Option<u64>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub hits: Vec<Hit>,
    pub candidates: usize,
    pub generation: u64,
}

#[derive(Serialize)]
pub struct TextHitResponse {
    pub id: usize,
    pub score: f32,
    pub document: String,
}

#[derive(Serialize)]
pub struct TextSearchResponse {
    pub hits: Vec<TextHitResponse>,
    pub candidates: usize,
    pub generation: u64,
}

#[derive(Serialize)]
pub struct RebuildResponse {
    pub generation: u64,
    pub kind: String,
    pub vector_count: usize,
    pub leader_count: usize,
    pub elapsed_ms: u64,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub kind: String,
    pub vector_count: usize,
    pub generation: u64,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub kind: String,
    pub dimension: usize,
    pub representation: String,
    pub generation: u64,
    #[serde(flatten)]
    pub clusters: ClusterStats,
}

#[derive(Serialize)]
pub struct MetricsResponse {
    pub total_queries: u64,
    pub failed_queries: u64,
    pub total_rebuilds: u64,
    pub last_rebuild_ms: Option<u64>,
    pub avg_candidates: f64,
    pub avg_query_latency_us: f64,
    pub p50_query_latency_us: f64,
    pub p95_query_latency_us: f64,
    pub p99_query_latency_us: f64,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(e: TntError) -> ApiError {
    let status = match &e {
        TntError::EmptyCorpus
        | TntError::DegenerateVector { .. }
        | TntError::InvalidConfiguration { .. }
        | TntError::DimensionMismatch { .. }
        | TntError::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
        TntError::EmptyIndex | TntError::Cancelled => StatusCode::CONFLICT,
        TntError::CorruptIndex { .. }
        | TntError::IoError(_)
        | TntError::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!(status = status.as_u16(), error = %e, "request rejected");
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

// --- Router ---

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/search", post(search_vector))
        .route("/search/text", post(search_text))
        .route("/rebuild", post(rebuild))
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(get_metrics))
        .with_state(state)
}

// --- Handlers ---

fn record_query(state: &AppState, elapsed: Duration, result: &Result<QueryResult, TntError>) {
    if let Ok(mut metrics) = state.metrics.write() {
        match result {
            Ok(r) => metrics.record_query(elapsed, r.candidates()),
            Err(_) => metrics.record_failure(),
        }
    }
}

async fn search_vector(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = Vector::try_from(req.vector).map_err(api_error)?;
    let k = req.k.unwrap_or(state.config.search.k);
    let probe_count = req.probe_count.unwrap_or(state.config.search.probe_count);

    let start = Instant::now();
    let (index, generation) = state.index.load_tagged();
    let result = index.search(&query, k, probe_count);
    record_query(&state, start.elapsed(), &result);
    let result = result.map_err(api_error)?;

    Ok(Json(SearchResponse {
        candidates: result.candidates(),
        hits: result.hits().to_vec(),
        generation,
    }))
}

async fn search_text(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TextSearchRequest>,
) -> Result<Json<TextSearchResponse>, ApiError> {
    let k = req.k.unwrap_or(state.config.search.k);
    let probe_count = req.probe_count.unwrap_or(state.config.search.probe_count);

    let start = Instant::now();
    let (index, generation) = state.index.load_tagged();
    let text = match index.text() {
        Some(text) => text,
        None if index.is_empty() => return Err(api_error(TntError::EmptyIndex)),
        None => {
            return Err(api_error(TntError::argument(
                "text search needs an index built from documents",
            )))
        }
    };
    let result = text.query(&req.query, k, probe_count);
    record_query(&state, start.elapsed(), &result);
    let result = result.map_err(api_error)?;

    let hits = result
        .iter()
        .map(|hit| TextHitResponse {
            id: hit.id,
            score: hit.score,
            document: text.document(hit.id).unwrap_or_default().to_string(),
        })
        .collect();

    Ok(Json(TextSearchResponse {
        hits,
        candidates: result.candidates(),
        generation,
    }))
}

async fn rebuild(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RebuildRequest>,
) -> Result<Json<RebuildResponse>, ApiError> {
    let mut config = state.config.build.clone();
    if req.leader_count.is_some() {
        config.leader_count = req.leader_count;
    }
    if req.seed.is_some() {
        config.seed = req.seed;
    }

    let start = Instant::now();
    let task = match (req.vectors, req.documents) {
        (Some(vectors), None) => {
            let vectors = vectors
                .into_iter()
                .map(Vector::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map_err(api_error)?;
            tokio::task::spawn_blocking(move || {
                crate::build(vectors, &config).map(StoredIndex::from)
            })
        }
        (None, Some(documents)) => {
            let weighting = req.weighting;
            tokio::task::spawn_blocking(move || {
                TextIndex::fit(documents, weighting, &config).map(StoredIndex::from)
            })
        }
        _ => {
            return Err(api_error(TntError::argument(
                "provide exactly one of `vectors` or `documents`",
            )))
        }
    };

    let stored = task
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("rebuild task failed: {}", e),
                }),
            )
        })?
        .map_err(api_error)?;
    let elapsed = start.elapsed();

    let kind = stored.kind().to_string();
    let vector_count = stored.len();
    let leader_count = stored.cluster_index().leaders().len();
    let generation = state.index.swap(stored);

    if let Ok(mut metrics) = state.metrics.write() {
        metrics.record_rebuild(elapsed);
    }
    info!(generation, kind = %kind, vector_count, leader_count, "rebuild complete");

    Ok(Json(RebuildResponse {
        generation,
        kind,
        vector_count,
        leader_count,
        elapsed_ms: elapsed.as_millis() as u64,
    }))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let (index, generation) = state.index.load_tagged();
    Json(HealthResponse {
        status: "ok".to_string(),
        kind: index.kind().to_string(),
        vector_count: index.len(),
        generation,
    })
}

async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let (index, generation) = state.index.load_tagged();
    let cluster_index = index.cluster_index();
    Json(StatsResponse {
        kind: index.kind().to_string(),
        dimension: cluster_index.dimension(),
        representation: cluster_index.space().representation().to_string(),
        generation,
        clusters: cluster_index.stats(),
    })
}

async fn get_metrics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MetricsResponse>, ApiError> {
    let metrics = state.metrics.read().map_err(|_| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Lock poisoned".to_string(),
            }),
        )
    })?;

    Ok(Json(MetricsResponse {
        total_queries: metrics.total_queries(),
        failed_queries: metrics.failed_queries(),
        total_rebuilds: metrics.total_rebuilds(),
        last_rebuild_ms: metrics.last_rebuild_ms(),
        avg_candidates: metrics.avg_candidates(),
        avg_query_latency_us: metrics.avg_query_latency_us(),
        p50_query_latency_us: metrics.percentile_query_latency_us(50.0),
        p95_query_latency_us: metrics.percentile_query_latency_us(95.0),
        p99_query_latency_us: metrics.percentile_query_latency_us(99.0),
    }))
}
