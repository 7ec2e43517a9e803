use axum::Router;
use axum::extract::DefaultBodyLimit;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::cors::build_cors_layer;
use crate::features::{health, image_host, media};
use crate::openapi::ApiDoc;
use crate::request_id::request_id_middleware;
use crate::state::AppState;

/// 组装完整路由：业务接口挂在 `api.prefix` 下，`/health` 与文档挂在根路径。
pub fn build_router(state: AppState, config: &AppConfig) -> Router {
    // base64 负载比原文件大约 4/3，JSON 接口同样需要放宽默认 2MB 的限制
    let body_limit = config.media.max_upload_bytes.saturating_mul(4) / 3 + 1024;

    let api_router = Router::<AppState>::new()
        .merge(image_host::create_image_router())
        .merge(media::create_media_router())
        .layer(DefaultBodyLimit::max(body_limit));

    let mut app = Router::<AppState>::new()
        .merge(health::create_health_router())
        .nest(&config.api.prefix, api_router)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state);

    if let Some(cors) = build_cors_layer(&config.cors) {
        app = app.layer(cors);
    }
    app.layer(axum::middleware::from_fn(request_id_middleware))
}
