/// 健康检查
pub mod health;
/// 图片接入与上传适配器
pub mod image_host;
/// 记录图片槽位
pub mod media;
