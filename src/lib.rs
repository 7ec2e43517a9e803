/// 统一错误处理模块
pub mod error;

/// 配置模块
pub mod config;

/// 功能聚合模块
pub mod features;

/// 应用状态聚合模块
pub mod state;

/// 路由组装
pub mod app;

/// CORS 中间件构建
pub mod cors;

/// OpenAPI 文档
pub mod openapi;

/// request_id 中间件
pub mod request_id;

/// 优雅退出信号
pub mod shutdown;

// 导出常用类型供外部使用
pub use config::AppConfig;
pub use error::{AppError, ImageError};
pub use features::image_host::{ImageInput, ImageUploader, UploadResult};
pub use state::AppState;
