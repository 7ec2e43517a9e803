//! 图片上传 API（features/image_host）
use axum::{
    Json, Router,
    extract::{Multipart, State},
    routing::post,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, ImageError};
use crate::state::AppState;

use super::types::{ImageFormat, ImageInput};

/// 字符串形式的图片上传请求
#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadImageRequest {
    /// 绝对 URL（直接透传）、纯 base64 或 data URI
    #[schema(example = "data:image/png;base64,iVBORw0KGgo...")]
    pub image: String,
}

/// 上传结果
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadImageResponse {
    /// 图床地址
    #[schema(example = "https://i.imgur.com/abc123.png")]
    pub url: String,
}

/// multipart 上传表单（仅用于文档）
#[derive(Debug, utoipa::ToSchema)]
#[allow(dead_code)]
pub struct UploadImageForm {
    /// 图片文件
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

#[utoipa::path(
    post,
    path = "/images",
    summary = "上传图片（URL / base64）",
    description = "以 http(s) 开头的字符串按已托管地址原样返回；其余按 base64（可带 data URI 前缀）解码、归一化后上传至图床。",
    request_body = UploadImageRequest,
    responses(
        (status = 200, description = "上传成功或地址透传", body = UploadImageResponse),
        (status = 422, description = "图片数据无效", body = crate::error::ProblemDetails),
        (status = 502, description = "图床拒绝或不可达", body = crate::error::ProblemDetails),
        (status = 504, description = "图床超时", body = crate::error::ProblemDetails)
    ),
    tag = "Image"
)]
pub async fn upload_image(
    State(state): State<AppState>,
    Json(payload): Json<UploadImageRequest>,
) -> Result<Json<UploadImageResponse>, AppError> {
    if payload.image.trim().is_empty() {
        return Err(AppError::Validation("image 不能为空".to_string()));
    }
    let input = ImageInput::from_client_string(payload.image);
    run_upload(&state, input, "images").await
}

#[utoipa::path(
    post,
    path = "/images/file",
    summary = "上传图片文件（multipart）",
    description = "multipart 字段 `image` 为原始图片字节；字段的 Content-Type 仅在无法嗅探格式时作为兜底。",
    request_body(content = UploadImageForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "上传成功", body = UploadImageResponse),
        (status = 400, description = "multipart 解析失败", body = crate::error::ProblemDetails),
        (status = 422, description = "缺少 image 字段或图片数据无效", body = crate::error::ProblemDetails),
        (status = 502, description = "图床拒绝或不可达", body = crate::error::ProblemDetails)
    ),
    tag = "Image"
)]
pub async fn upload_image_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadImageResponse>, AppError> {
    let mut input = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("multipart 解析失败: {e}")))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let declared_format = field.content_type().and_then(ImageFormat::from_mime);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("读取上传文件失败: {e}")))?;
        input = Some(ImageInput::RawBinary {
            bytes: bytes.to_vec(),
            declared_format,
        });
        break;
    }

    let input = input.ok_or_else(|| AppError::Validation("缺少 image 字段".to_string()))?;
    run_upload(&state, input, "images/file").await
}

async fn run_upload(
    state: &AppState,
    input: ImageInput,
    route: &'static str,
) -> Result<Json<UploadImageResponse>, AppError> {
    let kind = input.kind();
    match state.uploader.upload_image(input).await {
        Ok(res) => {
            tracing::info!(route, kind, url = %res.hosted_url, "图片上传完成");
            Ok(Json(UploadImageResponse {
                url: res.hosted_url,
            }))
        }
        Err(e) => Err(report_failure(route, kind, e)),
    }
}

/// 记录诊断信息后转换为对外错误（响应体只含通用描述）。
pub(crate) fn report_failure(route: &'static str, kind: &'static str, err: ImageError) -> AppError {
    match &err {
        ImageError::InvalidImageData(reason) => {
            tracing::info!(route, kind, %reason, "拒绝无效图片输入");
        }
        ImageError::UploadRejected { status, message } => {
            tracing::warn!(route, kind, status, %message, retryable = err.is_retryable(), "图床拒绝上传");
        }
        ImageError::TransportFailure { cause, timed_out } => {
            tracing::warn!(route, kind, %cause, timed_out, "图床网络错误");
        }
    }
    AppError::Image(err)
}

pub fn create_image_router() -> Router<AppState> {
    Router::<AppState>::new()
        .route("/images", post(upload_image))
        .route("/images/file", post(upload_image_file))
}
