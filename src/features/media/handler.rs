use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::features::image_host::{ImageInput, handler::report_failure};
use crate::state::AppState;

use super::slot::ImageSlot;

/// 槽位更新请求
#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlotUpdateRequest {
    /// 记录上当前存储的值（用于判断是否需要重新上传）
    #[serde(default)]
    pub current: Option<String>,
    /// 新图片：绝对 URL、base64 或 data URI；null/空字符串表示清空
    #[serde(default)]
    pub image: Option<String>,
}

/// 槽位更新响应
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlotUpdateResponse {
    /// 应写回记录的新值
    pub url: Option<String>,
    /// 是否发生了图床上传
    pub uploaded: bool,
    /// 新值是否位于已配置的图床域名下
    pub hosted: bool,
}

#[utoipa::path(
    post,
    path = "/media/{slot}",
    summary = "计算记录图片槽位的新值",
    description = "供头像/背景/封面等记录更新流程调用：未变化的 URL 不会重复上传，清空时回落到槽位缺省值。",
    params(("slot" = String, Path, description = "avatar | background | cover")),
    request_body = SlotUpdateRequest,
    responses(
        (status = 200, description = "槽位新值", body = SlotUpdateResponse),
        (status = 404, description = "未知槽位", body = crate::error::ProblemDetails),
        (status = 422, description = "图片数据无效", body = crate::error::ProblemDetails),
        (status = 502, description = "图床拒绝或不可达", body = crate::error::ProblemDetails)
    ),
    tag = "Media"
)]
pub async fn update_slot(
    State(state): State<AppState>,
    Path(slot): Path<String>,
    Json(payload): Json<SlotUpdateRequest>,
) -> Result<Json<SlotUpdateResponse>, AppError> {
    let slot: ImageSlot = slot.parse().map_err(AppError::NotFound)?;
    let incoming = payload.image.map(ImageInput::from_client_string);
    let kind = incoming.as_ref().map(ImageInput::kind).unwrap_or("none");

    let update = slot
        .resolve_update(
            payload.current.as_deref(),
            incoming,
            &state.uploader,
            &state.media,
        )
        .await
        .map_err(|e| report_failure("media", kind, e))?;

    tracing::info!(
        slot = slot.as_str(),
        kind,
        uploaded = update.uploaded,
        "槽位图片已更新"
    );

    let hosted = update
        .url
        .as_deref()
        .is_some_and(|u| state.uploader.is_hosted_url(u));
    Ok(Json(SlotUpdateResponse {
        url: update.url,
        uploaded: update.uploaded,
        hosted,
    }))
}

pub fn create_media_router() -> Router<AppState> {
    Router::<AppState>::new().route("/media/:slot", post(update_slot))
}
