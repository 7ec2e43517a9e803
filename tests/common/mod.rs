//! 集成测试共用：进程内的模拟图床与图片样本。
#![allow(dead_code)]

use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::post,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bookshelf_backend::features::image_host::{HostCredential, ImageHostClient, ImageUploader};
use image::{DynamicImage, Rgb, RgbImage};
use serde_json::json;

pub const CLIENT_ID: &str = "test-client";

/// 模拟图床的行为
#[derive(Clone)]
pub enum HostBehavior {
    /// 200 + data.link
    Link(String),
    /// 指定状态码 + data.error
    Reject(u16, String),
    /// 读取请求后迟迟不响应
    Hang(Duration),
}

/// 图床收到的一次上传
#[derive(Debug, Clone, Default)]
pub struct SeenUpload {
    pub authorization: Option<String>,
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub len: usize,
}

#[derive(Clone)]
struct MockState {
    behavior: HostBehavior,
    hits: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<SeenUpload>>>,
}

pub struct MockHost {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<SeenUpload>>>,
}

async fn handle_upload(
    State(state): State<MockState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let mut seen = SeenUpload {
        authorization: headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        ..SeenUpload::default()
    };
    while let Ok(Some(field)) = multipart.next_field().await {
        seen.field = field.name().unwrap_or_default().to_string();
        seen.file_name = field.file_name().map(str::to_string);
        seen.content_type = field.content_type().map(str::to_string);
        seen.len = field.bytes().await.map(|b| b.len()).unwrap_or(0);
    }
    state.seen.lock().expect("seen lock").push(seen);

    match state.behavior {
        HostBehavior::Link(link) => (
            StatusCode::OK,
            Json(json!({ "data": { "link": link }, "success": true, "status": 200 })),
        )
            .into_response(),
        HostBehavior::Reject(status, message) => (
            StatusCode::from_u16(status).expect("valid status"),
            Json(json!({ "data": { "error": message }, "success": false, "status": status })),
        )
            .into_response(),
        HostBehavior::Hang(delay) => {
            tokio::time::sleep(delay).await;
            StatusCode::OK.into_response()
        }
    }
}

impl MockHost {
    pub async fn start(behavior: HostBehavior) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/3/image", post(handle_upload))
            .with_state(MockState {
                behavior,
                hits: hits.clone(),
                seen: seen.clone(),
            });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock host");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, hits, seen }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}/3/image", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<SeenUpload> {
        self.seen.lock().expect("seen lock").clone()
    }

    pub fn uploader(&self) -> ImageUploader {
        self.uploader_with_timeout(Duration::from_secs(5))
    }

    pub fn uploader_with_timeout(&self, timeout: Duration) -> ImageUploader {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("build reqwest client");
        let credential = HostCredential::new(CLIENT_ID).expect("credential");
        ImageUploader::new(
            ImageHostClient::with_client(client, self.endpoint(), credential),
            vec!["imgur.com".to_string()],
        )
    }
}

fn fixture() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(16, 12, |x, y| {
        Rgb([(x * 15) as u8, (y * 20) as u8, 90])
    }))
}

pub fn encoded(format: image::ImageFormat) -> Vec<u8> {
    let img = match format {
        image::ImageFormat::Gif => DynamicImage::ImageRgba8(fixture().to_rgba8()),
        _ => fixture(),
    };
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).expect("encode fixture");
    out.into_inner()
}

pub fn data_uri(format: image::ImageFormat, mime: &str) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(encoded(format)))
}
