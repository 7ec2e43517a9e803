//! 图片接入与上传适配器：把 URL / base64 / 原始字节归一化后转发到外部图床。
pub mod client;
pub mod handler;
pub mod normalize;
mod types;
mod uploader;

pub use client::ImageHostClient;
pub use handler::create_image_router;
pub use types::{
    HostCredential, ImageFormat, ImageInput, NormalizedImage, UploadResult, is_absolute_http_url,
};
pub use uploader::ImageUploader;
