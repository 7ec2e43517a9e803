use std::fmt;

use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};

use crate::error::InvalidCredential;

/// 一次上传调用的图片输入（每次调用恰好一种形态）
#[derive(Clone, PartialEq, Eq)]
pub enum ImageInput {
    /// 已托管（或任意绝对）URL，直接透传
    RemoteUrl(String),
    /// base64 负载，可带 `data:...;base64,` 前缀
    Base64Payload(String),
    /// 原始上传字节；`declared_format` 仅在嗅探失败时兜底
    RawBinary {
        bytes: Vec<u8>,
        declared_format: Option<ImageFormat>,
    },
}

impl ImageInput {
    /// 在 API 边界把客户端字符串解析为输入形态：http(s) 开头视为 URL，其余按 base64 处理。
    pub fn from_client_string(value: impl Into<String>) -> Self {
        let value = value.into();
        if is_absolute_http_url(&value) {
            ImageInput::RemoteUrl(value.trim().to_string())
        } else {
            ImageInput::Base64Payload(value)
        }
    }

    /// 日志友好的形态名称
    pub fn kind(&self) -> &'static str {
        match self {
            ImageInput::RemoteUrl(_) => "remote_url",
            ImageInput::Base64Payload(_) => "base64",
            ImageInput::RawBinary { .. } => "raw_binary",
        }
    }
}

// 负载可能有数 MB，Debug 只输出长度。
impl fmt::Debug for ImageInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageInput::RemoteUrl(url) => f.debug_tuple("RemoteUrl").field(url).finish(),
            ImageInput::Base64Payload(s) => f
                .debug_struct("Base64Payload")
                .field("len", &s.len())
                .finish(),
            ImageInput::RawBinary {
                bytes,
                declared_format,
            } => f
                .debug_struct("RawBinary")
                .field("len", &bytes.len())
                .field("declared_format", declared_format)
                .finish(),
        }
    }
}

/// 允许转发给图床的图片格式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, utoipa::ToSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
}

impl ImageFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Bmp => "image/bmp",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
        }
    }

    /// 解析 multipart 的 Content-Type（忽略参数与大小写）；非受支持格式返回 None。
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "image/png" => Some(ImageFormat::Png),
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(ImageFormat::Jpeg),
            "image/gif" => Some(ImageFormat::Gif),
            "image/bmp" | "image/x-bmp" | "image/x-ms-bmp" => Some(ImageFormat::Bmp),
            _ => None,
        }
    }

    /// 格式策略：受支持格式保持不变，其余一律落到 PNG。
    pub fn for_source(source: image::ImageFormat) -> Self {
        match source {
            image::ImageFormat::Png => ImageFormat::Png,
            image::ImageFormat::Jpeg => ImageFormat::Jpeg,
            image::ImageFormat::Gif => ImageFormat::Gif,
            image::ImageFormat::Bmp => ImageFormat::Bmp,
            _ => ImageFormat::Png,
        }
    }

    pub(crate) fn codec(self) -> image::ImageFormat {
        match self {
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Gif => image::ImageFormat::Gif,
            ImageFormat::Bmp => image::ImageFormat::Bmp,
        }
    }
}

/// 归一化后的图片：字节 + 受支持格式
#[derive(Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

impl NormalizedImage {
    /// 上传时使用的合成文件名
    pub fn file_name(&self) -> String {
        format!("upload.{}", self.format.extension())
    }
}

impl fmt::Debug for NormalizedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NormalizedImage")
            .field("len", &self.bytes.len())
            .field("format", &self.format)
            .finish()
    }
}

/// 上传成功结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    /// 图床返回的稳定访问地址
    #[schema(example = "https://i.imgur.com/abc123.png")]
    pub hosted_url: String,
}

/// 图床凭据（Client ID），Debug 输出已脱敏。
///
/// 构造时即生成 `Authorization` 头，非法取值在启动期就会被拒绝。
#[derive(Clone, PartialEq, Eq)]
pub struct HostCredential {
    client_id: String,
    authorization: HeaderValue,
}

impl HostCredential {
    pub fn new(client_id: impl Into<String>) -> Result<Self, InvalidCredential> {
        let client_id: String = client_id.into();
        let client_id = client_id.trim().to_string();
        if client_id.is_empty() {
            return Err(InvalidCredential::Empty);
        }
        let mut authorization = HeaderValue::from_str(&format!("Client-ID {client_id}"))
            .map_err(|_| InvalidCredential::NotAHeaderValue)?;
        authorization.set_sensitive(true);
        Ok(Self {
            client_id,
            authorization,
        })
    }

    pub fn expose(&self) -> &str {
        &self.client_id
    }

    /// `Authorization` 头的值
    pub(crate) fn authorization(&self) -> &HeaderValue {
        &self.authorization
    }
}

impl fmt::Debug for HostCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HostCredential(***)")
    }
}

/// 是否为绝对 http(s) URL（scheme 大小写不敏感，且必须带主机名）
pub fn is_absolute_http_url(value: &str) -> bool {
    match reqwest::Url::parse(value.trim()) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}
