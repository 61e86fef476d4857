//! HTTP 服务
//!
//! 路由表：
//! - `/ping` `/hello` `/bmi` `/exercises`：计算器
//! - `/api/diagnoses`、`/api/patients`：患者登记
//! - `/api/diaries`：飞行日记

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::config::Config;
use crate::seed::SeedData;
use crate::storage::Storage;

/// 所有请求共享的状态
pub struct AppState {
    pub storage: Storage,
    pub config: Config,
}

impl AppState {
    /// 连接数据库，按配置写入种子数据
    pub async fn new(config: Config) -> Result<Arc<Self>> {
        info!("正在初始化状态...");
        let storage = Storage::connect(&config.database).await?;

        if config.data.seed {
            let data = SeedData::embedded()?;
            storage.seed(&data).await?;
        }

        Ok(Arc::new(Self { storage, config }))
    }
}

/// 构建路由
pub fn router(state: Arc<AppState>) -> Router {
    let cors_enabled = state.config.server.cors;

    let app = Router::new()
        .route("/ping", get(routes::ping))
        .route("/hello", get(routes::hello))
        .route("/bmi", get(routes::bmi))
        .route("/exercises", post(routes::exercises))
        .route("/api/ping", get(routes::ping))
        .route("/api/diagnoses", get(routes::list_diagnoses))
        .route("/api/diagnoses/:code", get(routes::get_diagnosis))
        .route(
            "/api/patients",
            get(routes::list_patients).post(routes::add_patient),
        )
        .route("/api/patients/:id", get(routes::get_patient))
        .route("/api/patients/:id/entries", post(routes::add_entry))
        .route(
            "/api/diaries",
            get(routes::list_diaries).post(routes::add_diary),
        )
        .route("/api/diaries/:id", get(routes::get_diary))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if cors_enabled {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE])
            .max_age(Duration::from_secs(60 * 60));
        app.layer(cors)
    } else {
        app
    }
}

/// 启动服务，直到收到关闭信号
pub async fn serve(config: Config) -> Result<()> {
    let state = AppState::new(config).await?;
    let address = state.config.bind_address();
    let app = router(state.clone());

    info!("正在绑定 {address}");
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("无法绑定地址 {address}"))?;
    info!("服务运行于 {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP 服务异常退出")?;

    state.storage.close().await;
    info!("服务已关闭");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("无法监听 Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("收到 Ctrl+C，正在关闭");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("收到终止信号，正在关闭");
            }
            Err(e) => {
                tracing::error!("无法监听终止信号: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
