use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use rackwatch_common::types::{Bound, TargetRef, TargetType};
use rackwatch_storage::{MetricThresholdRow, MonitoredTargetRow, ThresholdSpec};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::api::pagination::PaginationParams;
use crate::api::{error_response, success_paginated_response, success_response, ApiError};
use crate::logging::TraceId;
use crate::state::AppState;

/// 监控目标信息
#[derive(Serialize, ToSchema)]
struct TargetResponse {
    /// 数据库 ID
    id: String,
    /// 目标类型
    target_type: TargetType,
    /// 目标 ID
    target_id: String,
    /// 目标名称
    name: String,
    /// 是否启用监控
    monitoring_enabled: bool,
    /// 创建时间
    created_at: DateTime<Utc>,
    /// 更新时间
    updated_at: DateTime<Utc>,
}

impl From<MonitoredTargetRow> for TargetResponse {
    fn from(row: MonitoredTargetRow) -> Self {
        Self {
            id: row.id,
            target_type: row.target_type,
            target_id: row.target_id,
            name: row.name,
            monitoring_enabled: row.monitoring_enabled,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// 注册/更新监控目标请求
#[derive(Deserialize, ToSchema)]
pub struct UpsertTargetRequest {
    /// 目标类型（equipment / rack / server_room / data_center）
    pub target_type: String,
    /// 目标 ID
    pub target_id: String,
    /// 目标名称
    pub name: String,
    /// 是否启用监控（默认 true）
    #[serde(default = "default_enabled")]
    pub monitoring_enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// 阈值配置
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ThresholdBody {
    /// 指标类型（如 cpu / temperature / humidity）
    pub metric_type: String,
    /// 指标名称（如 cpu_usage / humidity_min）
    pub metric_name: String,
    /// 阈值方向（upper 为上限，lower 为下限）
    pub bound: String,
    /// 警告阈值
    pub warning_value: Option<f64>,
    /// 严重阈值
    pub critical_value: Option<f64>,
}

impl From<MetricThresholdRow> for ThresholdBody {
    fn from(row: MetricThresholdRow) -> Self {
        Self {
            metric_type: row.metric_type,
            metric_name: row.metric_name,
            bound: row.bound.to_string(),
            warning_value: row.warning_value,
            critical_value: row.critical_value,
        }
    }
}

fn parse_target(raw_type: &str, target_id: &str) -> Result<TargetRef, String> {
    let target_type: TargetType = raw_type.parse()?;
    Ok(TargetRef::new(target_type, target_id))
}

/// 分页查询监控目标列表。
#[utoipa::path(
    get,
    path = "/v1/targets",
    tag = "Targets",
    params(PaginationParams),
    responses(
        (status = 200, description = "监控目标分页列表", body = Vec<TargetResponse>)
    )
)]
async fn list_targets(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> impl IntoResponse {
    let limit = pagination.limit();
    let offset = pagination.offset();

    let total = match state.store.count_targets().await {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(error = %e, "Failed to count targets");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            );
        }
    };
    match state.store.list_targets(limit, offset).await {
        Ok(rows) => {
            let items: Vec<TargetResponse> = rows.into_iter().map(Into::into).collect();
            success_paginated_response(StatusCode::OK, &trace_id, items, total, limit, offset)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to list targets");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// 注册或更新一个监控目标（按 target_type + target_id 幂等）。
#[utoipa::path(
    post,
    path = "/v1/targets",
    tag = "Targets",
    request_body = UpsertTargetRequest,
    responses(
        (status = 200, description = "注册后的监控目标", body = TargetResponse),
        (status = 400, description = "目标类型非法", body = ApiError)
    )
)]
async fn upsert_target(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(body): Json<UpsertTargetRequest>,
) -> Response {
    let target = match parse_target(&body.target_type, &body.target_id) {
        Ok(t) => t,
        Err(msg) => {
            return error_response(StatusCode::BAD_REQUEST, &trace_id, "invalid_target_type", &msg)
        }
    };
    if body.name.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            "name must not be empty",
        );
    }
    match state
        .store
        .upsert_target(&target, body.name.trim(), body.monitoring_enabled)
        .await
    {
        Ok(row) => success_response(StatusCode::OK, &trace_id, TargetResponse::from(row)),
        Err(e) => {
            tracing::error!(error = %e, target = %target, "Failed to upsert target");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// 查询目标的阈值配置。
#[utoipa::path(
    get,
    path = "/v1/targets/{target_type}/{target_id}/thresholds",
    tag = "Targets",
    params(
        ("target_type" = String, Path, description = "目标类型"),
        ("target_id" = String, Path, description = "目标 ID")
    ),
    responses(
        (status = 200, description = "阈值配置列表", body = Vec<ThresholdBody>),
        (status = 400, description = "目标类型非法", body = ApiError)
    )
)]
async fn list_thresholds(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path((raw_type, target_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let target = match parse_target(&raw_type, &target_id) {
        Ok(t) => t,
        Err(msg) => {
            return error_response(StatusCode::BAD_REQUEST, &trace_id, "invalid_target_type", &msg)
        }
    };
    match state.store.list_thresholds(&target).await {
        Ok(rows) => {
            let items: Vec<ThresholdBody> = rows.into_iter().map(Into::into).collect();
            success_response(StatusCode::OK, &trace_id, items)
        }
        Err(e) => {
            tracing::error!(error = %e, target = %target, "Failed to list thresholds");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// 整体替换目标的阈值配置。
#[utoipa::path(
    put,
    path = "/v1/targets/{target_type}/{target_id}/thresholds",
    tag = "Targets",
    params(
        ("target_type" = String, Path, description = "目标类型"),
        ("target_id" = String, Path, description = "目标 ID")
    ),
    request_body = Vec<ThresholdBody>,
    responses(
        (status = 200, description = "替换后的阈值配置列表", body = Vec<ThresholdBody>),
        (status = 400, description = "目标类型或阈值方向非法", body = ApiError),
        (status = 404, description = "目标不存在", body = ApiError)
    )
)]
async fn replace_thresholds(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path((raw_type, target_id)): Path<(String, String)>,
    Json(body): Json<Vec<ThresholdBody>>,
) -> Response {
    let target = match parse_target(&raw_type, &target_id) {
        Ok(t) => t,
        Err(msg) => {
            return error_response(StatusCode::BAD_REQUEST, &trace_id, "invalid_target_type", &msg)
        }
    };

    match state.store.get_target(&target).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                &trace_id,
                "not_found",
                &format!("Target '{target}' not found"),
            )
        }
        Err(e) => {
            tracing::error!(error = %e, target = %target, "Failed to look up target");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            );
        }
    }

    let mut specs = Vec::with_capacity(body.len());
    for item in &body {
        let bound: Bound = match item.bound.parse() {
            Ok(b) => b,
            Err(msg) => {
                return error_response(StatusCode::BAD_REQUEST, &trace_id, "invalid_bound", &msg)
            }
        };
        specs.push(ThresholdSpec {
            metric_type: item.metric_type.clone(),
            metric_name: item.metric_name.clone(),
            bound,
            warning_value: item.warning_value,
            critical_value: item.critical_value,
        });
    }

    match state.store.replace_thresholds(&target, &specs).await {
        Ok(rows) => {
            let items: Vec<ThresholdBody> = rows.into_iter().map(Into::into).collect();
            success_response(StatusCode::OK, &trace_id, items)
        }
        Err(e) => {
            tracing::error!(error = %e, target = %target, "Failed to replace thresholds");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

pub fn target_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_targets, upsert_target))
        .routes(routes!(list_thresholds, replace_thresholds))
}
