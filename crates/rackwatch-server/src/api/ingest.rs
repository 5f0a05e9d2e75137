use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use rackwatch_common::types::{MetricSample, TargetType};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::api::success_response;
use crate::api::ApiError;
use crate::logging::TraceId;
use crate::state::AppState;

/// 指标样本
#[derive(Deserialize, ToSchema)]
pub struct SampleBody {
    /// 目标类型
    pub target_type: String,
    /// 目标 ID
    pub target_id: String,
    /// 指标类型
    pub metric_type: String,
    /// 测量值（缺失时跳过评估）
    pub value: Option<f64>,
    /// 采样时间（缺省为服务端当前时间）
    pub sample_time: Option<DateTime<Utc>>,
}

/// 批量上报结果
#[derive(Serialize, ToSchema)]
pub struct IngestSummary {
    /// 完成阈值评估的样本数
    pub accepted: usize,
    /// 因缺值/目标未知/监控关闭/无阈值而跳过的样本数
    pub skipped: usize,
    /// 评估出错的样本数
    pub failed: usize,
    /// 本批样本触发的告警数
    pub alerts_created: usize,
}

/// 批量上报指标样本并触发阈值评估。
/// 单个样本的跳过或失败不影响批内其他样本。
#[utoipa::path(
    post,
    path = "/v1/metrics/samples",
    tag = "Ingest",
    request_body = Vec<SampleBody>,
    responses(
        (status = 202, description = "批量评估结果", body = IngestSummary),
        (status = 400, description = "请求体非法", body = ApiError)
    )
)]
async fn ingest_samples(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(body): Json<Vec<SampleBody>>,
) -> impl IntoResponse {
    let mut summary = IngestSummary {
        accepted: 0,
        skipped: 0,
        failed: 0,
        alerts_created: 0,
    };

    for item in body {
        let target_type: TargetType = match item.target_type.parse() {
            Ok(t) => t,
            Err(_) => {
                tracing::warn!(
                    target_type = %item.target_type,
                    target_id = %item.target_id,
                    "Sample with unknown target type skipped"
                );
                summary.skipped += 1;
                continue;
            }
        };
        let sample = MetricSample {
            target_type,
            target_id: item.target_id,
            metric_type: item.metric_type,
            value: item.value,
            sample_time: item.sample_time,
        };
        match state.evaluator.evaluate_sample(&sample).await {
            rackwatch_alert::SampleOutcome::Evaluated { alerts, .. } => {
                summary.accepted += 1;
                summary.alerts_created += alerts.len();
            }
            rackwatch_alert::SampleOutcome::Skipped(_) => summary.skipped += 1,
            rackwatch_alert::SampleOutcome::Failed => summary.failed += 1,
        }
    }

    success_response(StatusCode::ACCEPTED, &trace_id, summary)
}

pub fn ingest_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(ingest_samples))
}
