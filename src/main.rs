use convert_backend::startup::run_startup_checks;
use convert_backend::{AppConfig, AppState, ShutdownManager, build_router};
use tracing_subscriber::EnvFilter;

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_log_filter()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.logging.format.eq_ignore_ascii_case("compact") {
        builder.compact().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() {
    // 日志尚未初始化，配置错误直接打到 stderr
    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config init failed: {e}");
            std::process::exit(1);
        }
    };
    init_tracing(&config);

    let shutdown_manager = ShutdownManager::new();
    if let Err(e) = shutdown_manager.start_signal_handler() {
        tracing::error!("信号处理器启动失败: {}", e);
        std::process::exit(1);
    }

    let app_state = AppState::from_config(&config);

    if let Err(e) = run_startup_checks(&config, app_state.converter.store()).await {
        tracing::error!("Startup checks failed: {}", e);
        std::process::exit(1);
    }

    let app = build_router(&config, app_state);

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Bind address failed {}: {}", addr, e);
            std::process::exit(1);
        });

    let prefix = config.api.prefix.trim_end_matches('/');
    tracing::info!("Server: http://{}", addr);
    tracing::info!("Convert API: http://{}{}/convert", addr, prefix);
    tracing::info!("Docs: http://{}/docs", addr);
    tracing::info!("Health: http://{}/health", addr);
    tracing::info!("Uploads: {:?} ({:?})", config.upload_path(), config.storage.mode);
    if config.server.debug {
        tracing::info!("debug 模式已开启");
    }

    let shutdown_timeout = config.shutdown.timeout_duration();
    let waiter = shutdown_manager.clone();
    let graceful = axum::serve(listener, app).with_graceful_shutdown(async move {
        let reason = waiter.wait_for_shutdown().await;
        tracing::info!("接收到退出信号: {:?}，开始优雅关闭HTTP服务器...", reason);
    });

    // 进行中的请求在超时时间内未完成则直接退出
    let serve = async {
        if let Err(e) = graceful.await {
            tracing::error!("服务器运行错误: {}", e);
            std::process::exit(1);
        }
    };
    let deadline = async {
        shutdown_manager.wait_for_shutdown().await;
        tokio::time::sleep(shutdown_timeout).await;
    };

    tokio::select! {
        _ = serve => tracing::info!("服务器已优雅关闭"),
        _ = deadline => tracing::warn!(
            "优雅退出超时（{}秒），强制退出",
            config.shutdown.timeout_secs
        ),
    }
}
