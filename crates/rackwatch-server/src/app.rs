use crate::state::AppState;
use crate::{api, logging};
use axum::http::HeaderValue;
use axum::middleware;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "rackwatch API",
        description = "rackwatch 数据中心监控 REST API",
    ),
    tags(
        (name = "Health", description = "服务健康检查"),
        (name = "Targets", description = "监控目标与阈值配置"),
        (name = "Ingest", description = "指标样本上报"),
        (name = "Alerts", description = "告警查询与生命周期管理")
    )
)]
struct ApiDoc;

fn cors_layer(state: &AppState) -> CorsLayer {
    let origins = &state.config.cors_allowed_origins;
    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn build_http_app(state: AppState) -> Router {
    let (api_router, api_spec) = api::api_routes().split_for_parts();

    let mut spec = ApiDoc::openapi();
    spec.merge(api_spec);

    let cors = cors_layer(&state);

    api_router
        .merge(api::stream::stream_routes())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/v1/openapi.json", spec))
        .layer(cors)
        .layer(middleware::from_fn(logging::request_logging))
}
