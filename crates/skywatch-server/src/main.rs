//! Skywatch Server - Always-on backend for airspace monitoring

mod api;
mod bus;
mod config;
mod dedup;
mod error;
mod loops;
mod persistence;
mod pipeline;
mod state;

use anyhow::{bail, Result};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::{extract::State, routing::get, Json};
use serde::Serialize;
use skywatch_core::models::Role;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::persistence::operators as operators_db;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct LoopStatus {
    name: &'static str,
    ok: bool,
    age_secs: u64,
    max_age_secs: u64,
    last_tick_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
struct ReadyResponse {
    ok: bool,
    db_ok: bool,
    loops_ok: bool,
    db_latency_ms: Option<u128>,
    subscribers: usize,
    open_alerts: usize,
    loops: Vec<LoopStatus>,
    error: Option<String>,
}

async fn ready_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let now_secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let loop_limits: [(&'static str, u64); 2] = [("retention", 180), ("idle-close", 30)];

    let mut loops = Vec::with_capacity(loop_limits.len());
    let mut loops_ok = true;
    for (name, max_age_secs) in loop_limits {
        let last_tick_secs = state.loop_last_tick_secs(name);
        let (ok, age_secs) = match last_tick_secs {
            Some(last) => {
                let age = now_secs.saturating_sub(last);
                (age <= max_age_secs, age)
            }
            None => (false, u64::MAX),
        };
        if !ok {
            loops_ok = false;
        }
        loops.push(LoopStatus {
            name,
            ok,
            age_secs,
            max_age_secs,
            last_tick_secs,
        });
    }

    let started_at = Instant::now();
    let ping = tokio::time::timeout(
        Duration::from_millis(750),
        sqlx::query("SELECT 1").execute(state.database().pool()),
    )
    .await;
    let (db_ok, db_error) = match ping {
        Ok(Ok(_)) => (true, None),
        Ok(Err(err)) => (false, Some(err.to_string())),
        Err(_) => (false, Some("database ping timed out".to_string())),
    };
    let db_latency_ms = Some(started_at.elapsed().as_millis());

    let ok = db_ok && loops_ok;
    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let error = if let Some(err) = db_error {
        Some(err)
    } else if !loops_ok {
        let stale = loops
            .iter()
            .filter(|entry| !entry.ok)
            .map(|entry| entry.name)
            .collect::<Vec<_>>()
            .join(",");
        Some(format!("stale loops: {}", stale))
    } else {
        None
    };

    (
        status,
        Json(ReadyResponse {
            ok,
            db_ok,
            loops_ok,
            db_latency_ms,
            subscribers: state.bus.subscriber_count(),
            open_alerts: state.deduper.open_count(),
            loops,
            error,
        }),
    )
}

/// Seed the configured admin account when it does not exist yet.
async fn bootstrap_admin(state: &AppState) -> Result<()> {
    let config = state.config();
    let (Some(email), Some(credential)) = (
        config.bootstrap_admin_email.as_deref(),
        config.bootstrap_admin_credential.as_deref(),
    ) else {
        return Ok(());
    };

    let email = email.trim().to_ascii_lowercase();
    let pool = state.database().pool();
    if operators_db::find_by_email(pool, &email).await?.is_some() {
        return Ok(());
    }

    match operators_db::insert_operator(pool, &email, Role::Admin, credential).await? {
        operators_db::InsertOutcome::Created(operator) => {
            tracing::info!("Bootstrapped admin operator {}", operator.email);
        }
        operators_db::InsertOutcome::DuplicateEmail => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("skywatch_server=debug".parse()?);
    let log_format = std::env::var("SKYWATCH_LOG_FORMAT").unwrap_or_default();
    if log_format.trim().eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    tracing::info!("Starting Skywatch Server...");

    let config = Config::from_env();
    let port = config.server_port;

    if !config.is_development() && config.uses_default_jwt_secret() {
        bail!("SKYWATCH_JWT_SECRET must be set when SKYWATCH_ENV is not development");
    }

    tracing::info!("Initializing database: {}", config.database_path);
    let db =
        persistence::init_database(&config.database_path, config.database_max_connections).await?;
    tracing::info!("Database initialized successfully");

    let state = Arc::new(AppState::new(db, config.clone()));
    state.load_from_database().await?;
    bootstrap_admin(&state).await?;

    tracing::info!("Open registration: {}", config.open_registration);
    tracing::info!("CORS origins: {:?}", config.allowed_origins);

    let (shutdown_tx, _) = broadcast::channel(1);

    {
        let state = state.clone();
        spawn_supervised_loop("retention", shutdown_tx.clone(), move |shutdown| {
            loops::retention_loop::run_retention_loop(state.clone(), shutdown)
        });
    }
    {
        let state = state.clone();
        spawn_supervised_loop("idle-close", shutdown_tx.clone(), move |shutdown| {
            loops::idle_close_loop::run_idle_close_loop(state.clone(), shutdown)
        });
    }

    // Build the app
    let app = api::routes(state.clone())
        .route("/health", get(|| async { "OK" }))
        .route("/ready", get(ready_handler).with_state(state));

    let app = if config.allowed_origins.is_empty() {
        tracing::warn!("No CORS origins configured - CORS disabled (same-origin only)");
        app
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        app.layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([Method::GET, Method::POST, Method::DELETE])
                .allow_headers(Any),
        )
    };

    // Run server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown_tx.clone()))
    .await?;

    Ok(())
}

/// Resolve on ctrl-c (or SIGTERM where available) and fan the shutdown
/// out to the background loops.
async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!("No SIGTERM handler, ctrl-c only: {}", err);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    let _ = tokio::signal::ctrl_c().await;

    tracing::info!("Shutdown signal received");
    let _ = shutdown_tx.send(());
}

const LOOP_RESTART_DELAY_MAX: Duration = Duration::from_secs(30);

/// Keep a background loop alive until shutdown, restarting it whenever it
/// exits or panics. The restart delay doubles up to a cap so a crash loop
/// cannot spin hot.
fn spawn_supervised_loop<F, Fut>(
    name: &'static str,
    shutdown_tx: broadcast::Sender<()>,
    make_future: F,
) where
    F: Fn(broadcast::Receiver<()>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut shutdown_rx = shutdown_tx.subscribe();
        let mut restart_delay = Duration::from_secs(1);
        loop {
            let mut handle = tokio::spawn(make_future(shutdown_tx.subscribe()));
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    handle.abort();
                    return;
                }
                // JoinHandle is Unpin, so it can be polled in place.
                joined = &mut handle => {
                    match joined {
                        Ok(_) => tracing::warn!(
                            "{} loop exited; restarting in {}s",
                            name,
                            restart_delay.as_secs()
                        ),
                        Err(err) => tracing::error!(
                            "{} loop panicked ({}); restarting in {}s",
                            name,
                            err,
                            restart_delay.as_secs()
                        ),
                    }
                }
            }

            tokio::time::sleep(restart_delay).await;
            restart_delay = (restart_delay * 2).min(LOOP_RESTART_DELAY_MAX);
            if shutdown_rx.try_recv().is_ok() {
                return;
            }
        }
    });
}
