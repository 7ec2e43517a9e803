use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::features::image_host::HostCredential;

/// 兼容旧部署方式的图床 Client ID 环境变量
pub const LEGACY_CLIENT_ID_ENV: &str = "IMGUR_CLIENT_ID";

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别（RUST_LOG 未设置时生效）
    pub level: String,
    /// 日志格式：full | json
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "full".to_string(),
        }
    }
}

/// API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API 路由前缀
    pub prefix: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            prefix: "/api/v1".to_string(),
        }
    }
}

/// CORS 配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    /// 是否启用 CORS
    #[serde(default)]
    pub enabled: bool,
    /// 允许的 Origin 列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// 允许的方法列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_methods: Vec<String>,
    /// 允许的请求头列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_headers: Vec<String>,
    /// 是否允许携带凭证（Cookie/Authorization）
    #[serde(default)]
    pub allow_credentials: bool,
    /// 预检缓存时间（秒）
    #[serde(default)]
    pub max_age_secs: Option<u64>,
}

/// 外部图床配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageHostConfig {
    /// 上传端点
    #[serde(default = "ImageHostConfig::default_endpoint")]
    pub endpoint: String,
    /// Client ID（缺失时回退到 IMGUR_CLIENT_ID 环境变量）
    #[serde(default)]
    pub client_id: Option<String>,
    /// 单次上传请求超时（秒）
    #[serde(default = "ImageHostConfig::default_timeout")]
    pub timeout_secs: u64,
    /// 视为“已托管”的域名（含子域名）
    #[serde(default = "ImageHostConfig::default_hosted_domains")]
    pub hosted_domains: Vec<String>,
}

impl ImageHostConfig {
    fn default_endpoint() -> String {
        "https://api.imgur.com/3/image".to_string()
    }
    fn default_timeout() -> u64 {
        30
    }
    fn default_hosted_domains() -> Vec<String> {
        vec!["imgur.com".to_string()]
    }

    /// 获取单次上传超时
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// 解析图床凭据；缺失或取值非法都属于启动期配置错误。
    pub fn credential(&self) -> Result<HostCredential, ConfigError> {
        self.resolve_credential(std::env::var(LEGACY_CLIENT_ID_ENV).ok())
    }

    fn resolve_credential(&self, legacy: Option<String>) -> Result<HostCredential, ConfigError> {
        let raw = [self.client_id.as_deref(), legacy.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .ok_or_else(|| {
                ConfigError::Message(format!(
                    "缺少图床 Client ID：请设置 image_host.client_id、APP_IMAGE_HOST__CLIENT_ID 或 {LEGACY_CLIENT_ID_ENV}"
                ))
            })?;
        HostCredential::new(raw).map_err(|e| ConfigError::Message(e.to_string()))
    }
}

impl Default for ImageHostConfig {
    fn default() -> Self {
        Self {
            endpoint: Self::default_endpoint(),
            client_id: None,
            timeout_secs: Self::default_timeout(),
            hosted_domains: Self::default_hosted_domains(),
        }
    }
}

/// 记录图片槽位配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// 头像缺省图（清空头像时回落到该值）
    #[serde(default = "MediaConfig::default_avatar")]
    pub default_avatar_url: String,
    /// multipart 上传的请求体上限（字节）
    #[serde(default = "MediaConfig::default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl MediaConfig {
    fn default_avatar() -> String {
        "https://i.imgur.com/default-avatar.jpg".to_string()
    }
    fn default_max_upload_bytes() -> usize {
        10 * 1024 * 1024
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            default_avatar_url: Self::default_avatar(),
            max_upload_bytes: Self::default_max_upload_bytes(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub api: ApiConfig,
    /// CORS 配置
    #[serde(default)]
    pub cors: CorsConfig,
    /// 外部图床配置
    #[serde(default)]
    pub image_host: ImageHostConfig,
    /// 图片槽位配置
    #[serde(default)]
    pub media: MediaConfig,
}

impl AppConfig {
    /// 从配置文件加载配置（文件可缺省），支持环境变量覆盖
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_sources(Self::config_path(), Self::env_source())
    }

    fn from_sources(config_path: PathBuf, env: Environment) -> Result<Self, ConfigError> {
        ConfigBuilder::builder()
            .add_source(File::from(config_path).required(false))
            .add_source(env)
            .build()?
            .try_deserialize()
    }

    /// 环境变量覆盖，例如：APP_SERVER__PORT、APP_IMAGE_HOST__CLIENT_ID。
    ///
    /// 字符串取值原样保留（"0123" 不会变成 123），数值字段在反序列化时再转换。
    fn env_source() -> Environment {
        Environment::with_prefix("APP")
            .prefix_separator("_")
            .separator("__")
    }

    /// 配置文件路径（APP_CONFIG 可覆盖）
    pub fn config_path() -> PathBuf {
        std::env::var("APP_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"))
    }

    /// 获取服务器监听地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_imgur() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.image_host.endpoint, "https://api.imgur.com/3/image");
        assert_eq!(cfg.image_host.hosted_domains, vec!["imgur.com".to_string()]);
        assert_eq!(cfg.api.prefix, "/api/v1");
        assert_eq!(cfg.server_addr(), "0.0.0.0:8000");
    }

    #[test]
    fn credential_prefers_configured_client_id() {
        let host = ImageHostConfig {
            client_id: Some("  abc123  ".to_string()),
            ..ImageHostConfig::default()
        };
        let cred = host.credential().expect("credential");
        assert_eq!(cred.expose(), "abc123");
    }

    #[test]
    fn missing_client_id_is_a_startup_error() {
        let host = ImageHostConfig::default();
        let err = host.resolve_credential(None).unwrap_err();
        match err {
            ConfigError::Message(msg) => assert!(msg.contains("APP_IMAGE_HOST__CLIENT_ID")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn blank_client_id_is_rejected_unless_legacy_env_is_set() {
        let host = ImageHostConfig {
            client_id: Some("   ".to_string()),
            ..ImageHostConfig::default()
        };
        assert!(matches!(
            host.resolve_credential(None),
            Err(ConfigError::Message(_))
        ));
        assert!(matches!(
            host.resolve_credential(Some(" \t ".to_string())),
            Err(ConfigError::Message(_))
        ));
        let cred = host
            .resolve_credential(Some("legacy-id".to_string()))
            .expect("legacy fallback");
        assert_eq!(cred.expose(), "legacy-id");
    }

    #[test]
    fn client_id_with_control_characters_is_rejected() {
        let host = ImageHostConfig {
            client_id: Some("ab\ncd".to_string()),
            ..ImageHostConfig::default()
        };
        assert!(matches!(
            host.resolve_credential(None),
            Err(ConfigError::Message(_))
        ));
    }

    #[test]
    fn env_override_keeps_numeric_looking_client_id_verbatim() {
        let vars = config::Map::from([
            (
                "APP_IMAGE_HOST__CLIENT_ID".to_string(),
                "0123456789".to_string(),
            ),
            ("APP_SERVER__PORT".to_string(), "9100".to_string()),
            ("APP_IMAGE_HOST__TIMEOUT_SECS".to_string(), "5".to_string()),
        ]);
        let cfg = AppConfig::from_sources(
            PathBuf::from("does-not-exist.toml"),
            AppConfig::env_source().source(Some(vars)),
        )
        .expect("load");
        assert_eq!(cfg.image_host.client_id.as_deref(), Some("0123456789"));
        assert_eq!(
            cfg.image_host.credential().expect("credential").expose(),
            "0123456789"
        );
        assert_eq!(cfg.server.port, 9100);
        assert_eq!(cfg.image_host.timeout_secs, 5);
    }

    #[test]
    fn timeout_never_zero() {
        let host = ImageHostConfig {
            timeout_secs: 0,
            ..ImageHostConfig::default()
        };
        assert_eq!(host.timeout_duration(), Duration::from_secs(1));
    }

    #[test]
    fn partial_toml_keeps_section_defaults() {
        let cfg: AppConfig = ConfigBuilder::builder()
            .add_source(File::from_str(
                "[image_host]\nclient_id = \"cid\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .and_then(|c| c.try_deserialize())
            .expect("deserialize");
        assert_eq!(cfg.image_host.client_id.as_deref(), Some("cid"));
        assert_eq!(cfg.image_host.timeout_secs, 30);
        assert_eq!(cfg.media.default_avatar_url, "https://i.imgur.com/default-avatar.jpg");
    }
}
