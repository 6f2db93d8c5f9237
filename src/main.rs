use std::net::SocketAddr;

use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Sqlite};
use tokio::time::{self, Duration as TokioDuration};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use book_exchange::{config, db, mailer, routes, services::sessions, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging: stdout + daily rotating file under ./logs
    std::fs::create_dir_all("logs").ok();
    let (stdout_nb, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let file_appender = tracing_appender::rolling::daily("logs", "book-exchange.log");
    let (file_nb, file_guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(stdout_nb))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file_nb))
        .init();
    // Keep the guards alive so the non-blocking writers flush on exit
    let _log_guards = (stdout_guard, file_guard);

    // Load configuration (embedded defaults -> book-exchange.toml -> env/.env)
    let app_cfg = config::load()?;

    let db_url = &app_cfg.database.url;
    config::ensure_sqlite_parent_dir(db_url)?;
    if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
        info!("Creating SQLite database at {}", db_url);
        Sqlite::create_database(db_url).await?;
    }
    let pool = SqlitePoolOptions::new()
        .max_connections(app_cfg.database.max_connections)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                // foreign_keys is per connection
                sqlx::query("PRAGMA foreign_keys=ON;").execute(&mut *conn).await?;
                let _ = sqlx::query("PRAGMA busy_timeout=10000;").execute(&mut *conn).await;
                Ok(())
            })
        })
        .connect(db_url)
        .await?;

    db::init_db(&pool).await?;

    let mailer = mailer::from_config(&app_cfg.mail)?;
    let state = AppState::new(pool.clone(), app_cfg.clone(), mailer);

    // Periodic housekeeping: rate-limiter maps and expired sessions
    {
        let global = state.global_limiter.clone();
        let endpoints = state.rate_limiter.clone();
        let pool = pool.clone();
        tokio::spawn(async move {
            let mut ticker = time::interval(TokioDuration::from_secs(300));
            loop {
                ticker.tick().await;
                global.cleanup_old_entries().await;
                endpoints.cleanup_all().await;
                let now = chrono::Utc::now().timestamp();
                match pool.acquire().await {
                    Ok(mut conn) => match sessions::purge_expired(&mut conn, now).await {
                        Ok(n) if n > 0 => tracing::debug!("purged {} expired sessions", n),
                        Ok(_) => {}
                        Err(e) => tracing::warn!("session purge failed: {}", e),
                    },
                    Err(e) => tracing::warn!("session purge could not get a connection: {}", e),
                }
            }
        });
    }

    let app = routes::build_router(state);

    let port: u16 = app_cfg.server.port;
    let host: String = app_cfg.server.host.clone();
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid listen addr {}:{} - {}", host, port, e))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Book Exchange listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("Shutdown signal received. Stopping server...");
}
