use std::path::PathBuf;

use chrono_tz::Tz;

use crate::auth::JwtConfig;

/// Default business timezone
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Asuncion;

/// Server configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | ./data | database and logs root |
/// | HTTP_PORT | 3000 | HTTP port |
/// | ENVIRONMENT | development | development / production |
/// | TIMEZONE | America/Asuncion | timezone used for "today" |
/// | CRON_SECRET | unset | bearer secret for `/api/cron/*` |
/// | SWEEP_INTERVAL_SECS | 300 | periodic reservation expiry sweep |
/// | CHARGE_DUE_DAY | 10 | due day of generated monthly charges |
/// | REQUEST_TIMEOUT_MS | 30000 | request timeout |
/// | ADMIN_USERNAME / ADMIN_PASSWORD | admin / admin | seeded when no user exists |
///
/// JWT settings are read by [`JwtConfig::default`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory, holds `database/` and `logs/`
    pub work_dir: String,
    pub http_port: u16,
    pub jwt: JwtConfig,
    /// development | production
    pub environment: String,
    pub timezone: Tz,
    /// Unset disables the cron routes
    pub cron_secret: Option<String>,
    pub sweep_interval_secs: u64,
    pub charge_due_day: u32,
    pub request_timeout_ms: u64,
    pub admin_username: String,
    pub admin_password: String,
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_timezone(value: Option<String>) -> Tz {
    match value {
        Some(name) => name.parse().unwrap_or_else(|_| {
            tracing::warn!(timezone = %name, "Unknown TIMEZONE, using {}", DEFAULT_TIMEZONE);
            DEFAULT_TIMEZONE
        }),
        None => DEFAULT_TIMEZONE,
    }
}

impl Config {
    /// Load configuration from the environment, defaulting unset values
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            http_port: env_parse("HTTP_PORT", 3000),
            jwt: JwtConfig::default(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            timezone: parse_timezone(std::env::var("TIMEZONE").ok()),
            cron_secret: std::env::var("CRON_SECRET")
                .ok()
                .filter(|secret| !secret.trim().is_empty()),
            sweep_interval_secs: env_parse("SWEEP_INTERVAL_SECS", 300),
            charge_due_day: env_parse("CHARGE_DUE_DAY", 10u32).clamp(1, 31),
            request_timeout_ms: env_parse("REQUEST_TIMEOUT_MS", 30000),
            admin_username: std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".into()),
            admin_password: std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin".into()),
        }
    }

    /// Override the work directory and port, mostly for tests
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    pub fn database_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("database")
    }

    /// `WORK_DIR/database/club.redb`
    pub fn database_path(&self) -> PathBuf {
        self.database_dir().join("club.redb")
    }

    pub fn logs_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timezone() {
        assert_eq!(parse_timezone(None), DEFAULT_TIMEZONE);
        assert_eq!(
            parse_timezone(Some("America/Argentina/Buenos_Aires".to_string())),
            chrono_tz::America::Argentina::Buenos_Aires
        );
        assert_eq!(parse_timezone(Some("Mars/Olympus".to_string())), DEFAULT_TIMEZONE);
    }

    #[test]
    fn test_paths_under_work_dir() {
        let config = Config::with_overrides("/srv/club", 8080);
        assert_eq!(config.http_port, 8080);
        assert_eq!(
            config.database_path(),
            PathBuf::from("/srv/club/database/club.redb")
        );
        assert_eq!(config.logs_dir(), PathBuf::from("/srv/club/logs"));
    }
}
