use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::Value;

use crate::config::ImageHostConfig;
use crate::error::ImageError;

use super::types::{HostCredential, NormalizedImage, UploadResult};

/// 图床响应包络：成功与失败都放在 `data` 下
#[derive(Debug, Deserialize)]
struct HostEnvelope {
    #[serde(default)]
    data: Option<Value>,
}

/// 外部图床 HTTP 客户端（凭据在构造时注入）
#[derive(Clone)]
pub struct ImageHostClient {
    client: reqwest::Client,
    endpoint: String,
    credential: HostCredential,
}

impl ImageHostClient {
    pub fn new(config: &ImageHostConfig, credential: HostCredential) -> Result<Self, ImageError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout_duration())
            .user_agent(concat!("bookshelf-backend/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, config.endpoint.clone(), credential))
    }

    /// 复用外部构造的 reqwest Client（测试中用于缩短超时）
    pub fn with_client(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        credential: HostCredential,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            credential,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// 上传一张已归一化的图片。仅发起一次请求，不做重试。
    pub async fn upload(&self, image: &NormalizedImage) -> Result<UploadResult, ImageError> {
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name())
            .mime_str(image.format.mime_type())?;
        let form = Form::new().part("image", part);

        let resp = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, self.credential.authorization().clone())
            .multipart(form)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.bytes().await?;
        interpret_response(status, &body)
    }
}

/// 解析图床响应：200 且带 `data.link` 视为成功，其余均为拒绝。
fn interpret_response(status: StatusCode, body: &[u8]) -> Result<UploadResult, ImageError> {
    let data = serde_json::from_slice::<HostEnvelope>(body)
        .ok()
        .and_then(|env| env.data);

    if status == StatusCode::OK {
        let link = data
            .as_ref()
            .and_then(|d| d.get("link"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty());
        return match link {
            Some(link) => Ok(UploadResult {
                hosted_url: link.to_string(),
            }),
            None => Err(ImageError::UploadRejected {
                status: status.as_u16(),
                message: "图床响应缺少 data.link".to_string(),
            }),
        };
    }

    let message = data
        .as_ref()
        .and_then(extract_error_message)
        .unwrap_or_else(|| format!("图床返回 HTTP {}", status.as_u16()));
    Err(ImageError::UploadRejected {
        status: status.as_u16(),
        message,
    })
}

/// `data.error` 可能是字符串，也可能是带 `message` 的对象。
fn extract_error_message(data: &Value) -> Option<String> {
    let err = data.get("error")?;
    let text = match err {
        Value::String(s) => s.clone(),
        Value::Object(obj) => obj.get("message")?.as_str()?.to_string(),
        _ => return None,
    };
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
