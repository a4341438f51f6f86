//! Server configuration from environment.

use std::env;

use skywatch_core::{ThreatWeights, TrajectoryConfig};

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub database_path: String,
    pub database_max_connections: u32,
    /// HS256 secret for bearer tokens.
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    /// When false, only an admin bearer may register new operators.
    pub open_registration: bool,
    pub bootstrap_admin_email: Option<String>,
    pub bootstrap_admin_credential: Option<String>,
    pub high_speed_threshold_kt: f64,
    pub trajectory_horizon_s: u32,
    pub trajectory_stride_s: u32,
    pub flight_retention_hours: i64,
    pub alert_retention_days: i64,
    /// Open alerts with no telemetry for this long auto-close.
    pub alert_idle_close_secs: i64,
    pub retention_sweep_secs: u64,
    pub retention_batch_size: i64,
    pub subscriber_queue_depth: usize,
    /// Dropped events tolerated before a subscriber is disconnected.
    pub subscriber_drop_grace: u64,
    pub ingest_deadline_ms: u64,
    pub allowed_origins: Vec<String>,
}

const DEV_JWT_SECRET: &str = "change-me-jwt-secret";

impl Config {
    pub fn from_env() -> Self {
        Self {
            server_port: env_parse("SKYWATCH_PORT", 3000),
            environment: env::var("SKYWATCH_ENV").unwrap_or_else(|_| "development".to_string()),
            database_path: env::var("SKYWATCH_DB_PATH")
                .unwrap_or_else(|_| "data/skywatch.db".to_string()),
            database_max_connections: env_parse("SKYWATCH_DB_MAX_CONNECTIONS", 5),
            jwt_secret: env::var("SKYWATCH_JWT_SECRET")
                .unwrap_or_else(|_| DEV_JWT_SECRET.to_string()),
            jwt_ttl_hours: env_parse("SKYWATCH_JWT_TTL_HOURS", 12),
            open_registration: env_parse("SKYWATCH_OPEN_REGISTRATION", true),
            bootstrap_admin_email: env::var("SKYWATCH_ADMIN_EMAIL").ok(),
            bootstrap_admin_credential: env::var("SKYWATCH_ADMIN_CREDENTIAL").ok(),
            high_speed_threshold_kt: env_parse("SKYWATCH_HIGH_SPEED_KT", 400.0),
            trajectory_horizon_s: env_parse("SKYWATCH_TRAJECTORY_HORIZON_S", 180),
            trajectory_stride_s: env_parse("SKYWATCH_TRAJECTORY_STRIDE_S", 30),
            flight_retention_hours: env_parse("SKYWATCH_FLIGHT_RETENTION_HOURS", 24),
            alert_retention_days: env_parse("SKYWATCH_ALERT_RETENTION_DAYS", 30),
            alert_idle_close_secs: env_parse("SKYWATCH_ALERT_IDLE_CLOSE_SECS", 120),
            retention_sweep_secs: env_parse("SKYWATCH_RETENTION_SWEEP_SECS", 60),
            retention_batch_size: env_parse("SKYWATCH_RETENTION_BATCH", 512),
            subscriber_queue_depth: env_parse("SKYWATCH_SUBSCRIBER_QUEUE", 64),
            subscriber_drop_grace: env_parse("SKYWATCH_SUBSCRIBER_DROP_GRACE", 256),
            ingest_deadline_ms: env_parse("SKYWATCH_INGEST_DEADLINE_MS", 2000),
            allowed_origins: env::var("SKYWATCH_ALLOWED_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(|origin| origin.trim().to_string())
                        .filter(|origin| !origin.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn uses_default_jwt_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    pub fn threat_weights(&self) -> ThreatWeights {
        ThreatWeights {
            high_speed_threshold_kt: self.high_speed_threshold_kt,
        }
    }

    pub fn trajectory_config(&self) -> TrajectoryConfig {
        TrajectoryConfig {
            horizon_s: self.trajectory_horizon_s,
            stride_s: self.trajectory_stride_s,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}
