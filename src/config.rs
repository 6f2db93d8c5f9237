use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Take the client address from proxy headers instead of the socket.
    #[serde(default)]
    pub trust_proxy: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_ttl_minutes: i64,
    pub verification_token_ttl_hours: i64,
    pub reset_token_ttl_minutes: i64,
    pub bcrypt_cost: u32,
    pub require_verified_email: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub from: String,
    /// Frontend base URL used to build verification and reset links.
    pub app_base_url: String,
    /// When unset, emails are written to the log instead of being sent.
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub global_max_requests: usize,
    pub global_window_seconds: u64,
    /// Applies to each of the credential endpoints (login, signup, resets).
    pub auth_max_requests: usize,
    pub auth_window_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SecurityConfig {
    pub enable_hsts: Option<bool>,
    pub hsts_max_age: Option<u64>,
    pub hsts_include_subdomains: Option<bool>,
    pub csp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub mail: MailConfig,
    pub rate_limit: RateLimitConfig,
    pub security: Option<SecurityConfig>,
}

const DEFAULTS: &str = include_str!("../config/default.toml");

impl Default for AppConfig {
    fn default() -> Self {
        // The embedded defaults are part of the binary; failing here is a build defect.
        match ::config::Config::builder()
            .add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
            .build()
            .and_then(|cfg| cfg.try_deserialize())
        {
            Ok(app_cfg) => app_cfg,
            Err(e) => panic!("embedded default config is invalid: {}", e),
        }
    }
}

pub fn load() -> anyhow::Result<AppConfig> {
    // Load .env first (optional)
    let _ = dotenvy::dotenv();

    let mut builder = ::config::Config::builder()
        .add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
        // Optional local file: book-exchange.toml (in CWD)
        .add_source(::config::File::with_name("book-exchange").required(false));

    if let Ok(custom_path) = std::env::var("BOOK_EXCHANGE_CONFIG") {
        builder = builder.add_source(::config::File::with_name(&custom_path).required(false));
    }
    // Environment variables last to have highest precedence
    builder = builder.add_source(::config::Environment::with_prefix("BOOK_EXCHANGE").separator("__"));

    let cfg = builder.build()?;
    let app_cfg: AppConfig = cfg.try_deserialize()?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

/// Longest accepted token lifetime (one year).
const MAX_TTL_MINUTES: i64 = 365 * 24 * 60;

/// The `jwt_secret` shipped in `config/default.toml`.
pub const DEV_JWT_SECRET: &str = "dev-only-secret-change-me-please";

/// Release builds refuse the shipped development secret; debug builds warn.
pub fn check_jwt_secret(secret: &str, release: bool) -> anyhow::Result<()> {
    if secret != DEV_JWT_SECRET {
        return Ok(());
    }
    if release {
        return Err(anyhow::anyhow!("auth.jwt_secret is the development default; set BOOK_EXCHANGE__AUTH__JWT_SECRET"));
    }
    tracing::warn!("auth.jwt_secret is the development default; do not use this build in production");
    Ok(())
}

pub fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    // Server
    if cfg.server.port == 0 {
        return Err(anyhow::anyhow!("invalid server.port: {}", cfg.server.port));
    }
    #[cfg(unix)]
    if cfg.server.port < 1024 {
        tracing::warn!("Using privileged port {} - may require elevated permissions", cfg.server.port);
    }

    // Database
    if cfg.database.max_connections == 0 {
        return Err(anyhow::anyhow!("database.max_connections must be > 0"));
    }

    // Auth
    if cfg.auth.jwt_secret.len() < 16 {
        return Err(anyhow::anyhow!("auth.jwt_secret must be at least 16 bytes"));
    }
    if !(4..=31).contains(&cfg.auth.bcrypt_cost) {
        return Err(anyhow::anyhow!("auth.bcrypt_cost must be in 4..=31"));
    }
    if cfg.auth.access_token_ttl_minutes <= 0 {
        return Err(anyhow::anyhow!("auth.access_token_ttl_minutes must be > 0"));
    }
    if cfg.auth.verification_token_ttl_hours <= 0 {
        return Err(anyhow::anyhow!("auth.verification_token_ttl_hours must be > 0"));
    }
    if cfg.auth.reset_token_ttl_minutes <= 0 {
        return Err(anyhow::anyhow!("auth.reset_token_ttl_minutes must be > 0"));
    }
    if cfg.auth.access_token_ttl_minutes > MAX_TTL_MINUTES
        || cfg.auth.reset_token_ttl_minutes > MAX_TTL_MINUTES
        || cfg.auth.verification_token_ttl_hours > MAX_TTL_MINUTES / 60
    {
        return Err(anyhow::anyhow!("auth token lifetimes must not exceed one year"));
    }
    check_jwt_secret(&cfg.auth.jwt_secret, !cfg!(debug_assertions))?;

    // Rate limits
    if cfg.rate_limit.global_max_requests == 0 || cfg.rate_limit.global_window_seconds == 0 {
        return Err(anyhow::anyhow!("rate_limit.global_* must be > 0"));
    }
    if cfg.rate_limit.auth_max_requests == 0 || cfg.rate_limit.auth_window_seconds == 0 {
        return Err(anyhow::anyhow!("rate_limit.auth_* must be > 0"));
    }

    Ok(())
}

pub fn ensure_sqlite_parent_dir(url: &str) -> anyhow::Result<()> {
    if let Some(path) = url.strip_prefix("sqlite://") {
        let path = path.split('?').next().unwrap_or(path);
        if path.is_empty() || path == ":memory:" {
            return Ok(());
        }
        let p = Path::new(path);
        if let Some(parent) = p.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }
    Ok(())
}
