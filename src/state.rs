use std::sync::Arc;

use crate::config::MediaConfig;
use crate::features::image_host::ImageUploader;

/// 聚合的应用共享状态
#[derive(Clone)]
pub struct AppState {
    /// 图片上传适配器（凭据已在启动期注入）
    pub uploader: Arc<ImageUploader>,
    /// 图片槽位配置
    pub media: Arc<MediaConfig>,
}

impl AppState {
    pub fn new(uploader: ImageUploader, media: MediaConfig) -> Self {
        Self {
            uploader: Arc::new(uploader),
            media: Arc::new(media),
        }
    }
}
