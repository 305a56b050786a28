// ==========================================
// 库存对账引擎 - 服务主入口
// ==========================================
// 启动顺序: 日志 → 进程配置 → 数据库 → 外部服务客户端 → HTTP
// ==========================================

use anyhow::Context;
use inventory_import::api::ImportApi;
use inventory_import::app::{router, AppState};
use inventory_import::config::AppConfig;
use inventory_import::db::{init_schema, open_sqlite_connection};
use inventory_import::logging;
use inventory_import::services::{HttpIdentityClient, HttpNotificationClient};
use std::sync::{Arc, Mutex};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志系统
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} - 商品库存/仓库导入服务", inventory_import::APP_NAME);
    tracing::info!("系统版本: {}", inventory_import::VERSION);
    tracing::info!("==================================================");

    let config = AppConfig::from_env().context("加载进程配置失败")?;

    // 数据库
    tracing::info!("使用数据库: {}", config.db_path);
    let conn = open_sqlite_connection(&config.db_path)
        .with_context(|| format!("打开数据库失败: {}", config.db_path))?;
    init_schema(&conn).context("初始化数据库 schema 失败")?;

    // 外部服务
    let identity = HttpIdentityClient::new(&config.identity_service_url, &config.service_token)
        .context("构建身份服务客户端失败")?;
    let notifier =
        HttpNotificationClient::new(&config.notification_service_url, &config.service_token)
            .context("构建通知服务客户端失败")?;

    let import_api = ImportApi::from_connection(
        Arc::new(Mutex::new(conn)),
        Arc::new(identity),
        Arc::new(notifier),
        Some(config.log_dir.clone()),
    );
    let state = AppState::new(import_api, config.max_concurrent_imports);
    tracing::info!(
        log_dir = %config.log_dir.display(),
        max_concurrent_imports = config.max_concurrent_imports,
        "导入服务初始化完成"
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("绑定地址失败: {}", config.bind_addr))?;
    tracing::info!("监听 http://{}", config.bind_addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP 服务异常退出")?;

    tracing::info!("服务已停止");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("监听退出信号失败: {}", e);
    }
}
