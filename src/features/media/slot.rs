use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::MediaConfig;
use crate::error::ImageError;
use crate::features::image_host::{ImageInput, ImageUploader};

/// 记录上的图片槽位
#[derive(Debug, Clone, Copy, Serialize, Deserialize, utoipa::ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageSlot {
    /// 用户头像
    Avatar,
    /// 用户主页背景
    Background,
    /// 书籍封面
    Cover,
}

impl ImageSlot {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageSlot::Avatar => "avatar",
            ImageSlot::Background => "background",
            ImageSlot::Cover => "cover",
        }
    }

    /// 清空后的缺省值：只有头像有缺省图
    pub fn default_url(self, media: &MediaConfig) -> Option<String> {
        match self {
            ImageSlot::Avatar => Some(media.default_avatar_url.clone()),
            ImageSlot::Background | ImageSlot::Cover => None,
        }
    }

    /// 计算槽位的新值。
    ///
    /// 只有真正的新图片才会上传：与已存值相同的 URL、任意绝对 URL 都不会触发出站请求。
    pub async fn resolve_update(
        self,
        stored: Option<&str>,
        incoming: Option<ImageInput>,
        uploader: &ImageUploader,
        media: &MediaConfig,
    ) -> Result<SlotUpdate, ImageError> {
        let incoming = incoming.filter(|input| !is_blank(input));
        let Some(input) = incoming else {
            return Ok(SlotUpdate {
                url: self.default_url(media),
                uploaded: false,
            });
        };

        if let ImageInput::RemoteUrl(url) = &input
            && stored.map(str::trim) == Some(url.as_str())
        {
            tracing::debug!(slot = self.as_str(), "图片未变化，跳过上传");
            return Ok(SlotUpdate {
                url: Some(url.clone()),
                uploaded: false,
            });
        }

        let uploaded = !matches!(input, ImageInput::RemoteUrl(_));
        let result = uploader.upload_image(input).await?;
        Ok(SlotUpdate {
            url: Some(result.hosted_url),
            uploaded,
        })
    }
}

impl FromStr for ImageSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "avatar" => Ok(ImageSlot::Avatar),
            "background" => Ok(ImageSlot::Background),
            "cover" | "img" => Ok(ImageSlot::Cover),
            other => Err(format!("未知的图片槽位: {other}")),
        }
    }
}

/// 槽位更新结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotUpdate {
    /// 槽位的新值（None 表示清空且无缺省图）
    pub url: Option<String>,
    /// 本次是否真的上传到了图床
    pub uploaded: bool,
}

fn is_blank(input: &ImageInput) -> bool {
    match input {
        ImageInput::RemoteUrl(s) | ImageInput::Base64Payload(s) => s.trim().is_empty(),
        ImageInput::RawBinary { bytes, .. } => bytes.is_empty(),
    }
}
