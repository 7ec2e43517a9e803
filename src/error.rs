use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// 应用统一错误类型
#[derive(Error, Debug, utoipa::ToSchema)]
pub enum AppError {
    /// 参数校验错误
    #[error("参数校验错误: {0}")]
    Validation(String),

    /// 请求体解析错误
    #[error("请求体解析错误: {0}")]
    BadRequest(String),

    /// 资源不存在
    #[error("资源不存在: {0}")]
    NotFound(String),

    /// 内部服务器错误
    #[error("内部错误: {0}")]
    Internal(String),

    /// 图片上传链路错误（诊断信息只进日志，不直接返回给用户）
    #[error("图片处理失败: {0}")]
    Image(#[from] ImageError),
}

/// 图片接入与上传适配器的错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq, utoipa::ToSchema)]
pub enum ImageError {
    /// 输入无法解码为图片（base64 非法、字节损坏、容器不支持）
    #[error("图片数据无效: {0}")]
    InvalidImageData(String),

    /// 图床返回非成功状态
    #[error("图床拒绝上传 (HTTP {status}): {message}")]
    UploadRejected {
        /// 图床返回的 HTTP 状态码
        status: u16,
        /// 图床给出的错误信息（缺失时为通用描述）
        message: String,
    },

    /// 无法到达图床（超时、DNS、连接重置等）
    #[error("图床网络错误: {cause}")]
    TransportFailure {
        /// 底层错误描述
        cause: String,
        /// 是否为超时
        timed_out: bool,
    },
}

/// 图床凭据不可用（启动期配置错误，不会在上传时才暴露）
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidCredential {
    #[error("图床 Client ID 为空")]
    Empty,
    #[error("图床 Client ID 含有无法放入 HTTP 头部的字符")]
    NotAHeaderValue,
}

impl ImageError {
    /// 面向终端用户的通用描述；诊断细节保留在错误值本身。
    pub fn user_message(&self) -> &'static str {
        match self {
            ImageError::InvalidImageData(_) => "图片数据无效，请重新选择图片",
            ImageError::UploadRejected { .. } => "图床暂时拒绝了上传，请稍后重试",
            ImageError::TransportFailure { .. } => "图床暂时不可用，请稍后重试",
        }
    }

    /// 调用方据此决定是否退避重试（适配器本身从不重试）。
    pub fn is_retryable(&self) -> bool {
        match self {
            ImageError::InvalidImageData(_) => false,
            ImageError::UploadRejected { status, .. } => *status == 429 || *status >= 500,
            ImageError::TransportFailure { .. } => true,
        }
    }
}

/// RFC7807 风格的错误响应（Problem Details）。
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    /// 问题类型（URI）。若无更细分的类型，可使用 about:blank。
    #[serde(rename = "type")]
    #[schema(example = "about:blank")]
    pub type_url: String,

    /// 简短标题，用于概括错误。
    #[schema(example = "Validation Failed")]
    pub title: String,

    /// HTTP 状态码（与响应 status 一致）。
    #[schema(example = 422)]
    pub status: u16,

    /// 人类可读的详细信息。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// 稳定的错误码，用于程序化处理。
    #[schema(example = "IMAGE_INVALID")]
    pub code: String,

    /// 请求追踪 ID（由 request-id 中间件注入）。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    /// 是否建议调用方稍后重试。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Image(e) => match e {
                ImageError::InvalidImageData(_) => StatusCode::UNPROCESSABLE_ENTITY,
                ImageError::UploadRejected { .. } => StatusCode::BAD_GATEWAY,
                ImageError::TransportFailure { timed_out: true, .. } => {
                    StatusCode::GATEWAY_TIMEOUT
                }
                ImageError::TransportFailure { .. } => StatusCode::BAD_GATEWAY,
            },
        }
    }

    fn stable_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_FAILED",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Internal(_) => "INTERNAL_ERROR",
            AppError::Image(ImageError::InvalidImageData(_)) => "IMAGE_INVALID",
            AppError::Image(ImageError::UploadRejected { .. }) => "IMAGE_HOST_REJECTED",
            AppError::Image(ImageError::TransportFailure { .. }) => "IMAGE_HOST_UNREACHABLE",
        }
    }

    fn title(&self) -> &'static str {
        match self.status_code() {
            StatusCode::BAD_REQUEST => "Bad Request",
            StatusCode::NOT_FOUND => "Not Found",
            StatusCode::UNPROCESSABLE_ENTITY => "Validation Failed",
            StatusCode::BAD_GATEWAY => "Bad Gateway",
            StatusCode::GATEWAY_TIMEOUT => "Gateway Timeout",
            StatusCode::INTERNAL_SERVER_ERROR => "Internal Server Error",
            _ => "Error",
        }
    }

    /// 对外可见的 detail：图片链路与内部错误只给通用描述。
    fn public_detail(&self) -> String {
        match self {
            AppError::Image(e) => e.user_message().to_string(),
            AppError::Internal(_) => "服务器内部错误".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retryable = match &self {
            AppError::Image(e) => Some(e.is_retryable()),
            _ => None,
        };

        let problem = ProblemDetails {
            type_url: "about:blank".to_string(),
            title: self.title().to_string(),
            status: status.as_u16(),
            detail: Some(self.public_detail()),
            code: self.stable_code().to_string(),
            request_id: crate::request_id::current_request_id(),
            retryable,
        };

        let mut res = Json(problem).into_response();
        *res.status_mut() = status;
        res.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        res
    }
}

// =============== Error conversions for common external errors ===============

impl From<reqwest::Error> for ImageError {
    fn from(err: reqwest::Error) -> Self {
        ImageError::TransportFailure {
            timed_out: err.is_timeout(),
            cause: err.to_string(),
        }
    }
}

impl From<image::ImageError> for ImageError {
    fn from(err: image::ImageError) -> Self {
        ImageError::InvalidImageData(err.to_string())
    }
}

impl From<base64::DecodeError> for ImageError {
    fn from(err: base64::DecodeError) -> Self {
        ImageError::InvalidImageData(format!("base64 解码失败: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::ImageError;
    use std::time::Duration;

    async fn start_hanging_http_server() -> std::net::SocketAddr {
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind tcp listener");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    // 不返回任何 HTTP 响应，触发客户端 read timeout。
                    tokio::time::sleep(Duration::from_secs(3)).await;
                    drop(socket);
                });
            }
        });

        addr
    }

    #[tokio::test]
    async fn image_error_from_reqwest_timeout_is_timed_out_transport_failure() {
        let addr = start_hanging_http_server().await;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("build reqwest client");

        let err = client
            .post(format!("http://{addr}/3/image"))
            .send()
            .await
            .expect_err("expected timeout");
        assert!(err.is_timeout(), "expected reqwest timeout, got: {err}");

        let ie: ImageError = err.into();
        assert!(
            matches!(ie, ImageError::TransportFailure { timed_out: true, .. }),
            "expected timed out TransportFailure, got: {ie:?}"
        );
    }

    #[test]
    fn retryable_only_for_throttling_server_errors_and_transport() {
        assert!(!ImageError::InvalidImageData("x".into()).is_retryable());
        let rejected = |status| ImageError::UploadRejected {
            status,
            message: String::new(),
        };
        assert!(!rejected(400).is_retryable());
        assert!(rejected(429).is_retryable());
        assert!(rejected(503).is_retryable());
        assert!(
            ImageError::TransportFailure {
                cause: "reset".into(),
                timed_out: false
            }
            .is_retryable()
        );
    }

    #[test]
    fn user_message_never_leaks_diagnostics() {
        let e = ImageError::UploadRejected {
            status: 403,
            message: "Invalid client_id abc123".into(),
        };
        assert!(!e.user_message().contains("abc123"));
        assert!(e.to_string().contains("abc123"));
    }
}
