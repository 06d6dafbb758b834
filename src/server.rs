//! Server initialization and startup.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use browsermux_api::{create_router, AppState};
use browsermux_config::{Config, RuntimeEnv};
use browsermux_pool::{PortPool, ProcessPool, DEFAULT_BASE_PORT};
use browsermux_session::SessionManager;

/// Initialize tracing with console and file output.
///
/// Log files land in `~/.browsermux/logs/` with daily rotation. The console
/// layer is human-readable text in development and JSON when
/// `ENV=production`.
pub(crate) fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    let production = std::env::var("ENV").as_deref() == Ok("production");

    let log_dir = dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".browsermux")
        .join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("browsermux")
        .filename_suffix("log")
        .max_log_files(14)
        .build(&log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Keep the writer guard alive for the life of the process.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let default_level = if production { "info" } else { "debug" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if production {
        let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .with(file_layer)
            .init();
    } else {
        let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(true).with_ansi(true))
            .with(file_layer)
            .init();
    }

    Ok(())
}

/// Run the service until interrupted, then shut down in reverse dependency
/// order: HTTP server, session manager, process pool.
pub(crate) async fn run_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    info!("starting browsermux v{}", env!("CARGO_PKG_VERSION"));
    info!(
        binary = %config.browser_binary.display(),
        server_port = config.server_port,
        max_browsers = config.max_browsers,
        production = config.env == RuntimeEnv::Production,
        "configuration loaded"
    );

    let ports = Arc::new(PortPool::new(DEFAULT_BASE_PORT, config.max_browsers as u16));
    let pool = ProcessPool::launch(
        config.browser_binary.clone(),
        config.max_browsers,
        ports.clone(),
    )
    .await?;

    let manager = Arc::new(SessionManager::new(pool.clone()));
    let state = Arc::new(AppState::new(manager.clone(), pool.clone()));
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutdown initiated");
    manager.close().await;
    pool.shutdown().await;

    let stats = ports.stats();
    info!(
        ports_total = stats.total,
        ports_available = stats.available,
        "shutdown complete"
    );
    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
