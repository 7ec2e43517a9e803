use bookshelf_backend::app::build_router;
use bookshelf_backend::config::{AppConfig, LoggingConfig};
use bookshelf_backend::features::image_host::ImageUploader;
use bookshelf_backend::shutdown::wait_for_signal;
use bookshelf_backend::state::AppState;

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "bookshelf_backend={},tower_http={}",
            logging.level, logging.level
        )
        .into()
    });
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() {
    // 配置加载早于日志初始化，失败时只能写 stderr
    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config init failed: {e}");
            std::process::exit(1);
        }
    };
    init_tracing(&config.logging);
    tracing::info!("配置已加载: {:?}", AppConfig::config_path());
    tracing::debug!(
        "image_host.endpoint = {}, client_id 已配置 = {}",
        config.image_host.endpoint,
        config.image_host.client_id.is_some()
    );

    // 图床凭据缺失或非法属于启动期错误，不推迟到首次上传
    let credential = match config.image_host.credential() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("图床凭据不可用: {}", e);
            std::process::exit(1);
        }
    };
    let uploader = match ImageUploader::from_config(&config.image_host, credential) {
        Ok(u) => u,
        Err(e) => {
            tracing::error!("图床客户端初始化失败: {}", e);
            std::process::exit(1);
        }
    };

    let state = AppState::new(uploader, config.media.clone());
    let app = build_router(state, &config);

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Bind address failed {}: {}", addr, e);
            std::process::exit(1);
        });

    tracing::info!("Server: http://{}", addr);
    tracing::info!("Docs: http://{}/docs", addr);
    tracing::info!("Health: http://{}/health", addr);
    tracing::info!("Image API: http://{}{}/images", addr, config.api.prefix);
    tracing::info!("Image host endpoint: {}", config.image_host.endpoint);

    let graceful = axum::serve(listener, app).with_graceful_shutdown(async {
        wait_for_signal().await;
        tracing::info!("开始优雅关闭HTTP服务器...");
    });

    if let Err(e) = graceful.await {
        tracing::error!("服务器运行错误: {}", e);
        std::process::exit(1);
    }

    tracing::info!("服务器已优雅关闭");
}
