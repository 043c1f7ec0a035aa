use std::str::FromStr;
use std::time::Duration;

use service_core::config as core_config;
use service_core::error::AppError;
use service_core::pagination::PageBounds;
use std::env;

#[derive(Debug, Clone)]
pub struct PuzzleConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
    pub pagination: PageBounds,
    pub token: TokenConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Dev,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Prod => "prod",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub idle_timeout_seconds: u64,
    /// Upper bound on a single store round trip.
    pub query_timeout_seconds: u64,
}

impl DatabaseConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_seconds)
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_second: f64,
    pub burst: u32,
}

#[derive(Debug, Clone, Default)]
pub struct CorsConfig {
    pub trusted_origins: Vec<String>,
}

/// Longest accepted token lifetime: one year.
pub const MAX_TOKEN_TTL_HOURS: i64 = 8760;

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub ttl_hours: i64,
}

impl TokenConfig {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.ttl_hours)
    }
}

impl PuzzleConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::Config(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = PuzzleConfig {
            common: common_config,
            environment,
            service_name: get_env("SERVICE_NAME", Some("puzzle-service"), false)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), false)?,
            log_level: get_env("LOG_LEVEL", Some("info"), false)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", None, is_prod)?,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", "25")?,
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", "4")?,
                idle_timeout_seconds: parse_env("DATABASE_IDLE_TIMEOUT_SECONDS", "900")?,
                query_timeout_seconds: parse_env("STORE_TIMEOUT_SECONDS", "3")?,
            },
            rate_limit: RateLimitConfig {
                enabled: parse_env("RATE_LIMIT_ENABLED", "false")?,
                requests_per_second: parse_env("RATE_LIMIT_RPS", "2")?,
                burst: parse_env("RATE_LIMIT_BURST", "4")?,
            },
            cors: CorsConfig {
                trusted_origins: get_env("CORS_TRUSTED_ORIGINS", Some(""), false)?
                    .split_whitespace()
                    .map(str::to_string)
                    .collect(),
            },
            pagination: PageBounds {
                default_page_size: parse_env("DEFAULT_PAGE_SIZE", "20")?,
                max_page_size: parse_env("MAX_PAGE_SIZE", "100")?,
            },
            token: TokenConfig {
                ttl_hours: parse_env("TOKEN_TTL_HOURS", "24")?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject combinations that would only fail later, at request time.
    pub fn validate(&self) -> Result<(), AppError> {
        let fail = |msg: String| Err(AppError::Config(anyhow::anyhow!(msg)));

        if self.database.url.is_empty() {
            return fail("DATABASE_URL must not be empty".to_string());
        }
        if self.database.min_connections > self.database.max_connections {
            return fail(format!(
                "DATABASE_MIN_CONNECTIONS ({}) exceeds DATABASE_MAX_CONNECTIONS ({})",
                self.database.min_connections, self.database.max_connections
            ));
        }
        if self.database.query_timeout_seconds == 0 {
            return fail("STORE_TIMEOUT_SECONDS must be greater than zero".to_string());
        }
        if self.pagination.default_page_size == 0
            || self.pagination.default_page_size > self.pagination.max_page_size
        {
            return fail(format!(
                "DEFAULT_PAGE_SIZE must be between 1 and MAX_PAGE_SIZE ({})",
                self.pagination.max_page_size
            ));
        }
        if self.rate_limit.enabled
            && !(self.rate_limit.requests_per_second > 0.0 && self.rate_limit.burst > 0)
        {
            return fail("RATE_LIMIT_RPS and RATE_LIMIT_BURST must be positive".to_string());
        }
        if self.token.ttl_hours <= 0 || self.token.ttl_hours > MAX_TOKEN_TTL_HOURS {
            return fail(format!(
                "TOKEN_TTL_HOURS must be between 1 and {}",
                MAX_TOKEN_TTL_HOURS
            ));
        }
        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::Config(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::Config(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_env(key, Some(default), false)?;
    raw.trim().parse().map_err(|e: T::Err| {
        AppError::Config(anyhow::anyhow!("{} has an invalid value {:?}: {}", key, raw, e))
    })
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Dev),
            "prod" | "production" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}
