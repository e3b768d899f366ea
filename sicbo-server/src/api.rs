use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::info;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use sicbo_db::models::{Prediction, Round, format_round_id};
use sicbo_db::stats::Statistics;
use sicbo_db::store::Store;
use sicbo_ensemble::analysis::detect_pattern;
use sicbo_ensemble::ensemble::{EnsembleStrategy, VoteDetail};
use sicbo_ensemble::models::weighted_strategies;

use crate::error::ApiError;
use crate::state::AppState;

pub const DEFAULT_PER_PAGE: usize = 20;
pub const MAX_PER_PAGE: usize = 100;

// ── Réponses ──

#[derive(Debug, Serialize)]
pub struct EndpointInfo {
    pub method: &'static str,
    pub path: &'static str,
    pub desc: &'static str,
}

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub message: String,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSummary {
    pub so_phien_du_doan: u32,
    pub so_dung: u32,
    pub so_sai: u32,
    pub ti_le_dung: String,
    pub chuoi_dung: u32,
    pub chuoi_dung_max: u32,
}

impl From<&Statistics> for StatsSummary {
    fn from(stats: &Statistics) -> Self {
        Self {
            so_phien_du_doan: stats.total_resolved,
            so_dung: stats.correct_count,
            so_sai: stats.wrong_count,
            ti_le_dung: stats.accuracy.clone(),
            chuoi_dung: stats.current_streak,
            chuoi_dung_max: stats.max_streak,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LatestResponse {
    pub phien: String,
    pub xuc_xac: Vec<u8>,
    pub tong_diem: i32,
    pub ket_qua: String,
    pub phien_tiep_theo: String,
    pub du_doan: Option<String>,
    pub do_tin_cay: Option<String>,
    pub chien_luoc: Option<String>,
    pub loai_cau: String,
    pub thong_ke: StatsSummary,
    pub ensemble_details: Vec<VoteDetail>,
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
    pub items: Vec<T>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub thong_ke: StatsSummary,
    #[serde(flatten)]
    pub page: Page<Round>,
}

#[derive(Debug, Serialize)]
pub struct AlgorithmInfo {
    pub name: String,
    pub weight: Option<f64>,
    pub min_window: usize,
    pub params: HashMap<String, f64>,
    pub tested: u32,
    pub correct: u32,
    pub laplace_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct AlgorithmsResponse {
    pub policy: String,
    pub window: usize,
    pub algorithms: Vec<AlgorithmInfo>,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub reset: bool,
    pub clear_history: bool,
    pub history_len: usize,
}

// ── Requêtes ──

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    Pending,
    Resolved,
}

#[derive(Debug, Default, Deserialize)]
pub struct PredictionQuery {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
    pub status: Option<StatusFilter>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub confirm: bool,
    #[serde(default)]
    pub clear_history: bool,
}

fn page_params(page: Option<usize>, per_page: Option<usize>) -> Result<(usize, usize), ApiError> {
    let page = page.unwrap_or(1);
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE);
    if page == 0 {
        return Err(ApiError::BadRequest("page doit être ≥ 1".into()));
    }
    if !(1..=MAX_PER_PAGE).contains(&per_page) {
        return Err(ApiError::BadRequest(format!("per_page doit être entre 1 et {}", MAX_PER_PAGE)));
    }
    Ok((page, per_page))
}

fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Page<T> {
    let total = items.len();
    let start = page.saturating_sub(1).saturating_mul(per_page).min(total);
    let end = start.saturating_add(per_page).min(total);
    Page {
        page,
        per_page,
        total,
        total_pages: total.div_ceil(per_page),
        items: items[start..end].to_vec(),
    }
}

/// Vote détaillé de l'ensemble sur les `window` phiên les plus récentes.
pub fn vote_details(store: &Store, window: usize) -> Vec<VoteDetail> {
    EnsembleStrategy::default().vote_details(store.history.window(window))
}

// ── Handlers ──

pub async fn index() -> Json<IndexResponse> {
    let endpoints = vec![
        EndpointInfo { method: "GET", path: "/sicbosun/latest", desc: "Phiên mới nhất + dự đoán" },
        EndpointInfo { method: "GET", path: "/api/sunwin/history", desc: "Lịch sử + thống kê (page, per_page)" },
        EndpointInfo { method: "GET", path: "/api/predictions", desc: "Dự đoán (page, per_page, status)" },
        EndpointInfo { method: "GET", path: "/api/stats", desc: "Thống kê" },
        EndpointInfo { method: "GET", path: "/algorithms", desc: "Danh sách thuật toán và weights" },
        EndpointInfo { method: "POST", path: "/api/reset", desc: "Xóa dự đoán và thống kê" },
    ];
    Json(IndexResponse {
        message: format!("Sicbo tracker v{}", env!("CARGO_PKG_VERSION")),
        endpoints,
    })
}

pub async fn latest(State(state): State<Arc<AppState>>) -> Result<Json<LatestResponse>, ApiError> {
    let store = state.snapshot().await;
    let latest = store.history.latest().ok_or(ApiError::NotReady)?;
    let next = latest.id + 1;
    let pending = store.predictions.pending_for(next);

    let details = vote_details(&store, state.tracker.engine().window());

    Ok(Json(LatestResponse {
        phien: latest.display_id(),
        xuc_xac: latest.dice.map(|d| d.to_vec()).unwrap_or_default(),
        tong_diem: latest.score,
        ket_qua: latest.category.label().to_string(),
        phien_tiep_theo: format_round_id(next),
        du_doan: pending.map(|p| p.category.label().to_string()),
        do_tin_cay: pending.map(|p| format!("{:.2}%", p.confidence)),
        chien_luoc: pending.map(|p| p.strategy_id.clone()),
        loai_cau: detect_pattern(store.history.rounds()).to_string(),
        thong_ke: StatsSummary::from(&store.stats),
        ensemble_details: details,
    }))
}

pub async fn history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let (page, per_page) = page_params(query.page, query.per_page)?;
    let store = state.store.read().await;
    Ok(Json(HistoryResponse {
        thong_ke: StatsSummary::from(&store.stats),
        page: paginate(store.history.rounds(), page, per_page),
    }))
}

pub async fn predictions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PredictionQuery>,
) -> Result<Json<Page<Prediction>>, ApiError> {
    let (page, per_page) = page_params(query.page, query.per_page)?;
    let store = state.store.read().await;
    let selected: Vec<Prediction> = store
        .predictions
        .newest_first()
        .into_iter()
        .filter(|p| match query.status {
            Some(StatusFilter::Pending) => p.is_pending(),
            Some(StatusFilter::Resolved) => !p.is_pending(),
            None => true,
        })
        .cloned()
        .collect();
    Ok(Json(paginate(&selected, page, per_page)))
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Json<Statistics> {
    Json(state.store.read().await.stats.clone())
}

pub async fn algorithms(State(state): State<Arc<AppState>>) -> Json<AlgorithmsResponse> {
    let weights: HashMap<String, f64> = weighted_strategies()
        .into_iter()
        .map(|(s, w)| (s.name().to_string(), w))
        .collect();
    let stats = state.store.read().await.stats.clone();
    let engine = state.tracker.engine();

    let algorithms = engine
        .strategies()
        .iter()
        .map(|s| {
            let record = stats.strategy(s.name());
            AlgorithmInfo {
                name: s.name().to_string(),
                weight: weights.get(s.name()).copied(),
                min_window: s.min_window(),
                params: s.params(),
                tested: record.tested,
                correct: record.correct,
                laplace_rate: record.laplace_rate(),
            }
        })
        .collect();

    Json(AlgorithmsResponse {
        policy: engine.policy().to_string(),
        window: engine.window(),
        algorithms,
    })
}

pub async fn reset(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ResetRequest>,
) -> Result<Json<ResetResponse>, ApiError> {
    if !request.confirm {
        return Err(ApiError::BadRequest("confirm: true requis".into()));
    }
    state.reset(request.clear_history).await;
    let history_len = state.store.read().await.history.len();
    Ok(Json(ResetResponse {
        reset: true,
        clear_history: request.clear_history,
        history_len,
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/sicbosun/latest", get(latest))
        .route("/api/sunwin/history", get(history))
        .route("/api/predictions", get(predictions))
        .route("/api/stats", get(stats))
        .route("/algorithms", get(algorithms))
        .route("/api/reset", post(reset))
        .with_state(state)
}

pub async fn serve(state: Arc<AppState>, mut shutdown: watch::Receiver<bool>) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Impossible d'écouter sur {}", addr))?;
    info!("Serveur démarré sur http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await
        .context("Erreur du serveur HTTP")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::source::testing::round;
    use sicbo_db::models::{Category, Draft};
    use sicbo_ensemble::models::make_test_rounds;

    fn empty_state() -> Arc<AppState> {
        Arc::new(AppState::new(Config::default(), Store::new(50)))
    }

    async fn loaded_state() -> Arc<AppState> {
        let state = empty_state();
        {
            let mut store = state.store.write().await;
            state.tracker.ingest(&mut store, &make_test_rounds(&[4, 5, 6, 7, 8, 9, 5, 6]));
        }
        state
    }

    #[tokio::test]
    async fn test_latest_not_ready_when_empty() {
        let result = latest(State(empty_state())).await;
        assert_eq!(result.unwrap_err(), ApiError::NotReady);
    }

    #[tokio::test]
    async fn test_latest_shows_pending_prediction() {
        let state = loaded_state().await;
        let Json(body) = latest(State(state)).await.unwrap();
        assert_eq!(body.phien, "#1000");
        assert_eq!(body.tong_diem, 4);
        assert_eq!(body.ket_qua, "Xỉu");
        assert_eq!(body.phien_tiep_theo, "#1001");
        assert_eq!(body.du_doan.as_deref(), Some("Xỉu"));
        assert_eq!(body.chien_luoc.as_deref(), Some("Ensemble"));
        assert_eq!(body.loai_cau, "Cầu Xỉu liên tục");
        assert_eq!(body.thong_ke.ti_le_dung, "0%");
        assert_eq!(body.ensemble_details.len(), 7);
    }

    #[tokio::test]
    async fn test_history_pagination() {
        let state = loaded_state().await;
        let query = PageQuery { page: Some(2), per_page: Some(3) };
        let Json(body) = history(State(state.clone()), Query(query)).await.unwrap();
        assert_eq!(body.page.total, 8);
        assert_eq!(body.page.total_pages, 3);
        let ids: Vec<u64> = body.page.items.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![997, 996, 995]);

        let beyond = PageQuery { page: Some(9), per_page: Some(3) };
        let Json(body) = history(State(state.clone()), Query(beyond)).await.unwrap();
        assert!(body.page.items.is_empty());

        let Json(body) = history(State(state), Query(PageQuery::default())).await.unwrap();
        assert_eq!(body.page.per_page, DEFAULT_PER_PAGE);
        assert_eq!(body.page.items.len(), 8);
    }

    #[tokio::test]
    async fn test_invalid_pagination_rejected() {
        let state = loaded_state().await;
        for (page, per_page) in [(Some(0), None), (None, Some(0)), (None, Some(101))] {
            let result = history(State(state.clone()), Query(PageQuery { page, per_page })).await;
            assert!(matches!(result, Err(ApiError::BadRequest(_))));
        }
    }

    #[tokio::test]
    async fn test_predictions_newest_first_and_filtered() {
        let state = empty_state();
        {
            let mut store = state.store.write().await;
            store.history.merge(&[round(103, 16), round(102, 8), round(101, 14)]);
            store.predictions.create_if_absent(103, 102, &Draft::new(Category::High, 60.0, "A"), vec![]);
            let resolved = store.history.latest().cloned().unwrap();
            let p = store.predictions.resolve(&resolved).unwrap();
            store.stats.record(&p);
            store.predictions.create_if_absent(104, 103, &Draft::new(Category::Low, 60.0, "A"), vec![]);
        }

        let Json(all) = predictions(State(state.clone()), Query(PredictionQuery::default())).await.unwrap();
        let targets: Vec<u64> = all.items.iter().map(|p| p.target_round_id).collect();
        assert_eq!(targets, vec![104, 103]);

        let pending_only = PredictionQuery { status: Some(StatusFilter::Pending), ..Default::default() };
        let Json(pending) = predictions(State(state.clone()), Query(pending_only)).await.unwrap();
        assert_eq!(pending.total, 1);
        assert_eq!(pending.items[0].target_round_id, 104);

        let resolved_only = PredictionQuery { status: Some(StatusFilter::Resolved), ..Default::default() };
        let Json(resolved) = predictions(State(state.clone()), Query(resolved_only)).await.unwrap();
        assert_eq!(resolved.items[0].is_correct(), Some(true));

        let Json(s) = stats(State(state)).await;
        assert_eq!(s.total_resolved, 1);
        assert_eq!(s.accuracy, "100.00%");
    }

    #[tokio::test]
    async fn test_algorithms_listing() {
        let state = empty_state();
        let Json(body) = algorithms(State(state)).await;
        assert_eq!(body.algorithms.len(), 8);
        assert_eq!(body.policy, "fixed:Ensemble");
        let markov = body.algorithms.iter().find(|a| a.name == "Markov").unwrap();
        assert_eq!(markov.weight, Some(1.3));
        assert!((markov.laplace_rate - 0.5).abs() < 1e-12);
        let ensemble = body.algorithms.iter().find(|a| a.name == "Ensemble").unwrap();
        assert_eq!(ensemble.weight, None);
    }

    #[tokio::test]
    async fn test_reset_requires_confirmation() {
        let state = loaded_state().await;
        let refused = reset(State(state.clone()), Json(ResetRequest::default())).await;
        assert!(matches!(refused, Err(ApiError::BadRequest(_))));
        assert_eq!(state.snapshot().await.predictions.len(), 1);

        let request = ResetRequest { confirm: true, clear_history: false };
        let Json(body) = reset(State(state.clone()), Json(request)).await.unwrap();
        assert!(body.reset);
        assert_eq!(body.history_len, 8);
        assert!(state.snapshot().await.predictions.is_empty());
        assert!(state.persister.is_dirty());
    }

    #[tokio::test]
    async fn test_vote_details_follow_configured_window() {
        let state = loaded_state().await;
        let store = state.snapshot().await;
        let majority = |details: &[VoteDetail]| {
            details.iter().find(|d| d.strategy_id == "SimpleMajority").unwrap().category
        };
        assert_eq!(majority(&vote_details(&store, 50)), Some(Category::Low));
        // SimpleMajority exige 5 phiên : muette sur une fenêtre de 3
        assert_eq!(majority(&vote_details(&store, 3)), None);
    }

    #[test]
    fn test_paginate_page_zero_does_not_underflow() {
        let items: Vec<u32> = (0..5).collect();
        let page = paginate(&items, 0, 2);
        assert_eq!(page.items, vec![0, 1]);
    }

    #[test]
    fn test_paginate_bounds() {
        let items: Vec<u32> = (0..45).collect();
        let page = paginate(&items, 3, 20);
        assert_eq!(page.items, (40..45).collect::<Vec<_>>());
        assert_eq!(page.total_pages, 3);
        assert_eq!(paginate::<u32>(&[], 1, 20).total_pages, 0);
    }
}
