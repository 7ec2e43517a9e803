use utoipa::openapi::server::{ServerBuilder, ServerVariableBuilder};
use utoipa::{Modify, OpenApi};

/// 为 Swagger UI 提供正确的业务接口前缀。
///
/// `/health` 不带前缀，因此额外提供 `/` 作为备用 server。
struct ApiServers;

impl Modify for ApiServers {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let api = ServerBuilder::new()
            .url("{api_prefix}")
            .description(Some("业务接口（默认 /api/v1）"))
            .parameter(
                "api_prefix",
                ServerVariableBuilder::new()
                    .default_value("/api/v1")
                    .description(Some(
                        "业务接口前缀：对应 config.api.prefix（可通过 APP_API__PREFIX 覆盖）",
                    )),
            )
            .build();

        let root = ServerBuilder::new()
            .url("/")
            .description(Some("根路径（/health）"))
            .build();

        openapi.servers = Some(vec![api, root]);
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::features::health::handler::health_check,
        crate::features::image_host::handler::upload_image,
        crate::features::image_host::handler::upload_image_file,
        crate::features::media::handler::update_slot,
    ),
    components(
        schemas(
            crate::error::ProblemDetails,
            crate::features::image_host::ImageFormat,
            crate::features::image_host::UploadResult,
            crate::features::media::ImageSlot,
        )
    ),
    modifiers(&ApiServers),
    tags(
        (
            name = "Image",
            description = "图片上传：URL 透传、base64 / 文件归一化后转存至图床。"
        ),
        (
            name = "Media",
            description = "记录图片槽位：头像、背景、封面的更新判定。"
        ),
        (name = "Health", description = "健康检查：服务探活。"),
    ),
    info(
        title = "Bookshelf Backend API",
        version = env!("CARGO_PKG_VERSION"),
        description = "图片接入服务 API（Axum + utoipa）。除 /health 外，业务接口挂载在 `config.api.prefix`（默认 /api/v1）下，OpenAPI 的 paths 不包含该前缀。"
    )
)]
pub struct ApiDoc;
