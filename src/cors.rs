use axum::http::{HeaderName, HeaderValue, Method};
use std::time::Duration;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::config::CorsConfig;

/// 解析后的配置项：`*` 或一组合法值（非法值记日志后丢弃）
#[derive(Debug, PartialEq, Eq)]
enum Allowed<T> {
    Any,
    List(Vec<T>),
}

impl<T> Allowed<T> {
    fn is_any(&self) -> bool {
        matches!(self, Allowed::Any)
    }
}

fn parse_list<T>(
    label: &str,
    values: &[String],
    parse: impl Fn(&str) -> Option<T>,
) -> Allowed<T> {
    let mut out = Vec::new();
    for value in values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
        if value == "*" {
            return Allowed::Any;
        }
        match parse(value) {
            Some(v) => out.push(v),
            None => tracing::warn!("CORS {} 含无效值: {}", label, value),
        }
    }
    Allowed::List(out)
}

/// 根据配置构建 CORS 中间件；未启用或配置无效时返回 None。
pub fn build_cors_layer(cors: &CorsConfig) -> Option<CorsLayer> {
    if !cors.enabled {
        return None;
    }

    let origins = parse_list("allowed_origins", &cors.allowed_origins, |v| {
        HeaderValue::from_str(v).ok()
    });
    let methods = parse_list("allowed_methods", &cors.allowed_methods, |v| {
        Method::from_bytes(v.to_ascii_uppercase().as_bytes()).ok()
    });
    let headers = parse_list("allowed_headers", &cors.allowed_headers, |v| {
        HeaderName::from_bytes(v.to_ascii_lowercase().as_bytes()).ok()
    });

    if origins == Allowed::List(Vec::new()) {
        tracing::warn!("CORS 已启用但 allowed_origins 为空，已跳过启用");
        return None;
    }
    if cors.allow_credentials && (origins.is_any() || methods.is_any() || headers.is_any()) {
        tracing::error!("CORS 配置无效：allow_credentials=true 不能与 \"*\" 同时使用，已跳过启用");
        return None;
    }

    let mut layer = CorsLayer::new()
        .allow_origin(match origins {
            Allowed::Any => AllowOrigin::any(),
            Allowed::List(list) => AllowOrigin::list(list),
        })
        .allow_methods(match methods {
            Allowed::Any => AllowMethods::any(),
            // 前端上传走 POST，未配置时给出最小集合
            Allowed::List(list) if list.is_empty() => {
                AllowMethods::list([Method::GET, Method::POST])
            }
            Allowed::List(list) => AllowMethods::list(list),
        })
        .allow_headers(match headers {
            Allowed::Any => AllowHeaders::any(),
            Allowed::List(list) => AllowHeaders::list(list),
        });

    if cors.allow_credentials {
        layer = layer.allow_credentials(true);
    }
    if let Some(secs) = cors.max_age_secs.filter(|s| *s > 0) {
        layer = layer.max_age(Duration::from_secs(secs));
    }
    Some(layer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_or_empty_origins_yield_no_layer() {
        assert!(build_cors_layer(&CorsConfig::default()).is_none());
        let cors = CorsConfig {
            enabled: true,
            ..CorsConfig::default()
        };
        assert!(build_cors_layer(&cors).is_none());
    }

    #[test]
    fn credentials_with_wildcard_are_rejected() {
        let cors = CorsConfig {
            enabled: true,
            allow_credentials: true,
            allowed_origins: vec!["*".to_string()],
            ..CorsConfig::default()
        };
        assert!(build_cors_layer(&cors).is_none());
    }

    #[test]
    fn method_list_is_normalized_and_invalid_entries_dropped() {
        let input = vec!["get".to_string(), " POST ".to_string(), "bad method".to_string()];
        let parsed = parse_list("allowed_methods", &input, |v| {
            Method::from_bytes(v.to_ascii_uppercase().as_bytes()).ok()
        });
        assert_eq!(parsed, Allowed::List(vec![Method::GET, Method::POST]));
    }

    #[test]
    fn explicit_origin_builds_layer() {
        let cors = CorsConfig {
            enabled: true,
            allowed_origins: vec!["http://localhost:5173".to_string()],
            max_age_secs: Some(600),
            ..CorsConfig::default()
        };
        assert!(build_cors_layer(&cors).is_some());
    }
}
