use crate::config::ImageHostConfig;
use crate::error::ImageError;

use super::client::ImageHostClient;
use super::normalize;
use super::types::{ImageInput, NormalizedImage, UploadResult, is_absolute_http_url};

/// 图片接入与上传适配器。
///
/// 无内部可变状态，可被多个请求并发共享；每次调用至多一次出站请求，不重试。
#[derive(Clone)]
pub struct ImageUploader {
    client: ImageHostClient,
    hosted_domains: Vec<String>,
}

impl ImageUploader {
    pub fn new(client: ImageHostClient, hosted_domains: Vec<String>) -> Self {
        let hosted_domains = hosted_domains
            .into_iter()
            .map(|d| d.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self {
            client,
            hosted_domains,
        }
    }

    /// 按配置构造（凭据由调用方在启动期解析后传入）
    pub fn from_config(
        config: &ImageHostConfig,
        credential: super::HostCredential,
    ) -> Result<Self, ImageError> {
        let client = ImageHostClient::new(config, credential)?;
        Ok(Self::new(client, config.hosted_domains.clone()))
    }

    pub fn endpoint(&self) -> &str {
        self.client.endpoint()
    }

    /// URL 是否属于已配置的图床域名（含子域名）
    pub fn is_hosted_url(&self, url: &str) -> bool {
        let Ok(parsed) = reqwest::Url::parse(url.trim()) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        self.hosted_domains
            .iter()
            .any(|d| host == *d || host.ends_with(&format!(".{d}")))
    }

    /// 归一化并上传图片；绝对 URL 直接透传，不发起任何网络请求。
    pub async fn upload_image(&self, input: ImageInput) -> Result<UploadResult, ImageError> {
        let normalized = match input {
            ImageInput::RemoteUrl(url) => return pass_through(url),
            other => normalize_off_thread(other).await?,
        };
        self.client.upload(&normalized).await
    }
}

fn pass_through(url: String) -> Result<UploadResult, ImageError> {
    if is_absolute_http_url(&url) {
        Ok(UploadResult { hosted_url: url })
    } else {
        Err(ImageError::InvalidImageData(
            "图片地址必须是绝对的 http(s) URL".to_string(),
        ))
    }
}

/// 解码与重编码属于 CPU 密集任务，放到 blocking 线程池执行。
async fn normalize_off_thread(input: ImageInput) -> Result<NormalizedImage, ImageError> {
    tokio::task::spawn_blocking(move || match input {
        ImageInput::Base64Payload(payload) => normalize::normalize_base64(&payload),
        ImageInput::RawBinary {
            bytes,
            declared_format,
        } => normalize::normalize_bytes(&bytes, declared_format),
        ImageInput::RemoteUrl(_) => Err(ImageError::InvalidImageData(
            "URL 输入不需要归一化".to_string(),
        )),
    })
    .await
    .map_err(normalize_task_failed)?
}

// 解码器在畸形输入上 panic 时按无效图片处理：触发它的只能是客户端数据。
fn normalize_task_failed(err: tokio::task::JoinError) -> ImageError {
    if err.is_panic() {
        ImageError::InvalidImageData("图片解码器在该输入上异常终止".to_string())
    } else {
        ImageError::InvalidImageData(format!("图片归一化任务被取消: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::image_host::HostCredential;

    fn uploader(domains: &[&str]) -> ImageUploader {
        let client = ImageHostClient::with_client(
            reqwest::Client::new(),
            "http://127.0.0.1:9/3/image",
            HostCredential::new("test").expect("credential"),
        );
        ImageUploader::new(client, domains.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn hosted_url_matches_domain_and_subdomains() {
        let up = uploader(&["imgur.com", " .Example.org "]);
        assert!(up.is_hosted_url("https://i.imgur.com/abc.png"));
        assert!(up.is_hosted_url("https://imgur.com/abc"));
        assert!(up.is_hosted_url("https://cdn.example.org/a.jpg"));
        assert!(!up.is_hosted_url("https://notimgur.com/abc.png"));
        assert!(!up.is_hosted_url("not a url"));
    }

    #[tokio::test]
    async fn any_absolute_url_passes_through_unchanged() {
        // 端点不可达：若发起网络请求必然失败
        let up = uploader(&["imgur.com"]);
        for url in ["https://i.imgur.com/abc.png", "https://elsewhere.net/cover.jpg"] {
            let res = up
                .upload_image(ImageInput::RemoteUrl(url.to_string()))
                .await
                .expect("pass through");
            assert_eq!(res.hosted_url, url);
        }
    }

    #[tokio::test]
    async fn decoder_panic_is_reported_as_invalid_image_data() {
        let join_err = tokio::task::spawn_blocking(|| -> Result<NormalizedImage, ImageError> {
            panic!("decoder blew up")
        })
        .await
        .unwrap_err();
        let err = normalize_task_failed(join_err);
        assert!(matches!(err, ImageError::InvalidImageData(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn relative_url_is_invalid() {
        let up = uploader(&["imgur.com"]);
        let err = up
            .upload_image(ImageInput::RemoteUrl("/static/a.png".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, ImageError::InvalidImageData(_)));
    }
}
