use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::modules::dashboard::DashboardController;

/// 共享状态。一个 Mutex 罩住整个 Controller：
/// 渲染过程持锁到结束，保证同一实体绝不会有重叠的刷新周期
#[derive(Clone)]
pub struct AppState {
    controller: Arc<Mutex<DashboardController>>,
}

impl AppState {
    pub fn new(controller: DashboardController) -> Self {
        Self { controller: Arc::new(Mutex::new(controller)) }
    }
}

#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    fn err(message: String) -> Self {
        Self { success: false, data: None, error: Some(message) }
    }
}

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/dashboard", get(get_dashboard))
        .route("/refresh-all", post(refresh_all))
        .route("/clear-all", post(clear_all))
        .route("/entities/:ticker/refresh", post(refresh_entity))
        .route("/entities/:ticker/clear", post(clear_entity))
        .route("/entities/:ticker/detail", post(open_detail).delete(close_detail))
        .with_state(state);

    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

/// GET / - 内嵌的单页面板
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../../web/index.html"))
}

/// GET /api/health
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/dashboard - 执行一次渲染：先跑完所有 pending 周期，再返回完整视图
/// fail-soft 模式下永远 200；propagate 模式下外部调用失败映射为 502
async fn get_dashboard(State(state): State<AppState>) -> impl IntoResponse {
    let mut controller = state.controller.lock().await;

    match controller.render_pass().await {
        Ok(view) => (StatusCode::OK, Json(ApiResponse::ok(view))).into_response(),
        Err(e) => {
            error!("Render pass failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(ApiResponse::<()>::err(e.to_string())),
            )
                .into_response()
        }
    }
}

/// POST /api/refresh-all - 给 roster 里每个实体置刷新标记
async fn refresh_all(State(state): State<AppState>) -> impl IntoResponse {
    let mut controller = state.controller.lock().await;
    controller.trigger_all();
    Json(ApiResponse::ok("queued"))
}

/// POST /api/clear-all - 清空整个缓存（顺带关闭所有 Deep Dive）
async fn clear_all(State(state): State<AppState>) -> impl IntoResponse {
    let mut controller = state.controller.lock().await;
    controller.clear_all();
    Json(ApiResponse::ok("cleared"))
}

/// POST /api/entities/:ticker/refresh - 单实体刷新标记
async fn refresh_entity(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> impl IntoResponse {
    let mut controller = state.controller.lock().await;
    respond_flag_change(controller.trigger(&ticker))
}

/// POST /api/entities/:ticker/clear
async fn clear_entity(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> impl IntoResponse {
    let mut controller = state.controller.lock().await;
    respond_flag_change(controller.clear(&ticker))
}

/// POST /api/entities/:ticker/detail - 打开 Deep Dive
async fn open_detail(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> impl IntoResponse {
    let mut controller = state.controller.lock().await;
    respond_flag_change(controller.open_detail(&ticker))
}

/// DELETE /api/entities/:ticker/detail - 关闭 Deep Dive
async fn close_detail(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> impl IntoResponse {
    let mut controller = state.controller.lock().await;
    respond_flag_change(controller.close_detail(&ticker))
}

fn respond_flag_change(result: anyhow::Result<()>) -> axum::response::Response {
    match result {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::ok("ok"))).into_response(),
        Err(e) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<()>::err(e.to_string())),
        )
            .into_response(),
    }
}
