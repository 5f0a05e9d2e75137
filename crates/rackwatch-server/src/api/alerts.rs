use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use rackwatch_common::types::AlertRecord;
use rackwatch_notify::{EVENT_ACKNOWLEDGED, EVENT_RESOLVED};
use rackwatch_storage::{ActiveAlertFilter, AlertHistoryFilter};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::api::pagination::PaginationParams;
use crate::api::{error_response, success_paginated_response, success_response, ApiError};
use crate::logging::TraceId;
use crate::state::AppState;

/// 活跃告警查询条件
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActiveAlertQuery {
    /// 目标类型（equipment / rack / server_room / data_center）
    pub target_type: Option<String>,
    /// 目标 ID
    pub target_id: Option<String>,
    /// 告警级别（warning / critical）
    pub level: Option<String>,
    /// 指标类型
    pub metric_type: Option<String>,
}

/// 历史告警查询条件
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AlertHistoryQuery {
    /// 目标类型
    pub target_type: Option<String>,
    /// 目标 ID
    pub target_id: Option<String>,
    /// 告警级别
    pub level: Option<String>,
    /// 告警状态（triggered / acknowledged / resolved）
    pub status: Option<String>,
    /// 触发时间下限（RFC 3339）
    pub from: Option<DateTime<Utc>>,
    /// 触发时间上限（RFC 3339）
    pub to: Option<DateTime<Utc>>,
}

fn active_filter(query: &ActiveAlertQuery) -> Result<ActiveAlertFilter, String> {
    let mut filter = ActiveAlertFilter {
        target_id_eq: query.target_id.clone(),
        metric_type_eq: query.metric_type.clone(),
        ..Default::default()
    };
    if let Some(ref raw) = query.target_type {
        filter.target_type_eq = Some(raw.parse()?);
    }
    if let Some(ref raw) = query.level {
        filter.level_eq = Some(raw.parse()?);
    }
    Ok(filter)
}

fn history_filter(query: &AlertHistoryQuery) -> Result<AlertHistoryFilter, String> {
    let mut filter = AlertHistoryFilter {
        target_id_eq: query.target_id.clone(),
        triggered_gte: query.from,
        triggered_lte: query.to,
        ..Default::default()
    };
    if let Some(ref raw) = query.target_type {
        filter.target_type_eq = Some(raw.parse()?);
    }
    if let Some(ref raw) = query.level {
        filter.level_eq = Some(raw.parse()?);
    }
    if let Some(ref raw) = query.status {
        filter.status_eq = Some(raw.parse()?);
    }
    Ok(filter)
}

/// 分页查询活跃告警（状态非 resolved）。
/// 默认排序：`triggered_at` 倒序。
#[utoipa::path(
    get,
    path = "/v1/alerts/active",
    tag = "Alerts",
    params(ActiveAlertQuery, PaginationParams),
    responses(
        (status = 200, description = "活跃告警分页列表", body = Vec<AlertRecord>),
        (status = 400, description = "查询条件非法", body = ApiError)
    )
)]
async fn list_active_alerts(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(query): Query<ActiveAlertQuery>,
    Query(pagination): Query<PaginationParams>,
) -> impl IntoResponse {
    let filter = match active_filter(&query) {
        Ok(f) => f,
        Err(msg) => {
            return error_response(StatusCode::BAD_REQUEST, &trace_id, "bad_request", &msg)
        }
    };
    let limit = pagination.limit();
    let offset = pagination.offset();

    let total = match state.store.count_active_alerts(&filter).await {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(error = %e, "Failed to count active alerts");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            );
        }
    };
    match state.store.list_active_alerts(&filter, limit, offset).await {
        Ok(items) => success_paginated_response(StatusCode::OK, &trace_id, items, total, limit, offset),
        Err(e) => {
            tracing::error!(error = %e, "Failed to list active alerts");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// 分页查询历史告警。
#[utoipa::path(
    get,
    path = "/v1/alerts/history",
    tag = "Alerts",
    params(AlertHistoryQuery, PaginationParams),
    responses(
        (status = 200, description = "历史告警分页列表", body = Vec<AlertRecord>),
        (status = 400, description = "查询条件非法", body = ApiError)
    )
)]
async fn list_alert_history(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(query): Query<AlertHistoryQuery>,
    Query(pagination): Query<PaginationParams>,
) -> impl IntoResponse {
    let filter = match history_filter(&query) {
        Ok(f) => f,
        Err(msg) => {
            return error_response(StatusCode::BAD_REQUEST, &trace_id, "bad_request", &msg)
        }
    };
    let limit = pagination.limit();
    let offset = pagination.offset();

    let total = match state.store.count_alert_history(&filter).await {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(error = %e, "Failed to count alert history");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            );
        }
    };
    match state.store.list_alert_history(&filter, limit, offset).await {
        Ok(items) => success_paginated_response(StatusCode::OK, &trace_id, items, total, limit, offset),
        Err(e) => {
            tracing::error!(error = %e, "Failed to list alert history");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// 确认告警。仅 triggered 状态可确认；确认后仍计入活跃告警。
#[utoipa::path(
    post,
    path = "/v1/alerts/{id}/acknowledge",
    tag = "Alerts",
    params(("id" = String, Path, description = "告警 ID")),
    responses(
        (status = 200, description = "确认后的告警", body = AlertRecord),
        (status = 404, description = "告警不存在或状态不允许确认", body = ApiError)
    )
)]
async fn acknowledge_alert(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.acknowledge_alert(&id).await {
        Ok(Some(record)) => {
            state.broadcaster.publish_alert(EVENT_ACKNOWLEDGED, &record);
            success_response(StatusCode::OK, &trace_id, record)
        }
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            &format!("Alert '{id}' not found in triggered state"),
        ),
        Err(e) => {
            tracing::error!(error = %e, alert_id = %id, "Failed to acknowledge alert");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// 手动关闭告警。已 resolved 的告警返回 404。
#[utoipa::path(
    post,
    path = "/v1/alerts/{id}/resolve",
    tag = "Alerts",
    params(("id" = String, Path, description = "告警 ID")),
    responses(
        (status = 200, description = "关闭后的告警", body = AlertRecord),
        (status = 404, description = "告警不存在或已关闭", body = ApiError)
    )
)]
async fn resolve_alert(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.resolve_alert(&id, Utc::now()).await {
        Ok(Some(record)) => {
            state.broadcaster.publish_alert(EVENT_RESOLVED, &record);
            success_response(StatusCode::OK, &trace_id, record)
        }
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            &format!("Alert '{id}' not found or already resolved"),
        ),
        Err(e) => {
            tracing::error!(error = %e, alert_id = %id, "Failed to resolve alert");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// 告警引擎参数
#[derive(Serialize, Deserialize, ToSchema)]
pub struct SettingsBody {
    /// 连续违规次数阈值（>= 1）
    pub consecutive_count_threshold: i32,
    /// 冷却时间（分钟，>= 0）
    pub cooldown_minutes: i64,
}

/// 查询告警引擎参数（无配置时返回默认值）。
#[utoipa::path(
    get,
    path = "/v1/alerts/settings",
    tag = "Alerts",
    responses(
        (status = 200, description = "当前生效的引擎参数", body = SettingsBody)
    )
)]
async fn get_settings(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let settings = state.settings.current().await;
    success_response(
        StatusCode::OK,
        &trace_id,
        SettingsBody {
            consecutive_count_threshold: settings.consecutive_count_threshold,
            cooldown_minutes: settings.cooldown_minutes,
        },
    )
}

/// 更新告警引擎参数并立即生效。
#[utoipa::path(
    put,
    path = "/v1/alerts/settings",
    tag = "Alerts",
    request_body = SettingsBody,
    responses(
        (status = 200, description = "更新后的引擎参数", body = SettingsBody),
        (status = 400, description = "参数非法", body = ApiError)
    )
)]
async fn update_settings(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(body): Json<SettingsBody>,
) -> Response {
    if body.consecutive_count_threshold < 1 {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "invalid_settings",
            "consecutive_count_threshold must be >= 1",
        );
    }
    if body.cooldown_minutes < 0 {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "invalid_settings",
            "cooldown_minutes must be >= 0",
        );
    }

    if let Err(e) = state
        .store
        .upsert_alert_settings(body.consecutive_count_threshold, body.cooldown_minutes)
        .await
    {
        tracing::error!(error = %e, "Failed to persist alert settings");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &trace_id,
            "storage_error",
            "Database error",
        );
    }
    match state.settings.reload().await {
        Ok(settings) => success_response(
            StatusCode::OK,
            &trace_id,
            SettingsBody {
                consecutive_count_threshold: settings.consecutive_count_threshold,
                cooldown_minutes: settings.cooldown_minutes,
            },
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to reload alert settings");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "internal_error",
                "Settings saved but reload failed",
            )
        }
    }
}

pub fn alert_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_active_alerts))
        .routes(routes!(list_alert_history))
        .routes(routes!(acknowledge_alert))
        .routes(routes!(resolve_alert))
        .routes(routes!(get_settings, update_settings))
}
