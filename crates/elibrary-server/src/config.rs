//! Server configuration from environment variables.

use std::env;
use std::str::FromStr;

use elibrary_core::LendingPolicy;
use elibrary_core::policy::MAX_LOAN_DAYS;

/// Minimum length of the HS256 signing secret in bytes.
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Where the server keeps its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// PostgreSQL via `DATABASE_URL`.
    Postgres,
    /// Process-local tables, lost on restart.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("expected 'postgres' or 'memory', got '{other}'")),
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Storage backend selected by `STORAGE_BACKEND`.
    pub storage: StorageBackend,
    /// Server port to listen on.
    pub port: u16,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Plain text or JSON log lines.
    pub log_format: LogFormat,
    /// CORS allowed origins (comma-separated or "*" for all).
    pub cors_allowed_origins: String,
    /// HS256 signing secret for access tokens.
    pub jwt_secret: String,
    /// Token lifetime in hours.
    pub jwt_expiry_hours: u64,
    /// Loan period, borrow limit and renewal cap.
    pub lending: LendingPolicy,
    /// Administrator created on first start when no account exists.
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    /// Insert a couple of sample books when the catalog is empty.
    pub seed_sample_books: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `JWT_SECRET`: Token signing secret, at least 32 bytes
    ///
    /// Optional:
    /// - `STORAGE_BACKEND`: `postgres` (default) or `memory`
    /// - `PORT`: Server port (default: 3000)
    /// - `LOG_LEVEL`: Logging level (default: "info")
    /// - `LOG_FORMAT`: `text` (default) or `json`
    /// - `CORS_ALLOWED_ORIGINS`: Allowed CORS origins (default: "*")
    /// - `JWT_EXPIRY_HOURS`: Token lifetime (default: 6)
    /// - `BORROW_MAX_ACTIVE`, `BORROW_LOAN_DAYS`, `BORROW_MAX_RENEWALS`: lending policy
    /// - `ADMIN_USERNAME`, `ADMIN_PASSWORD`: bootstrap administrator
    /// - `SEED_SAMPLE_BOOKS`: seed sample catalog (default: false)
    ///
    /// `DATABASE_URL` is read by the store configuration when the backend is
    /// postgres.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage = parse_or(&lookup, "STORAGE_BACKEND", StorageBackend::Postgres)?;
        let port = parse_or(&lookup, "PORT", 3000u16)?;
        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string());
        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("") | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    name: "LOG_FORMAT".to_string(),
                    reason: format!("expected 'text' or 'json', got '{other}'"),
                });
            }
        };
        let cors_allowed_origins =
            lookup("CORS_ALLOWED_ORIGINS").unwrap_or_else(|| "*".to_string());

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("JWT_SECRET".to_string()))?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::InvalidValue {
                name: "JWT_SECRET".to_string(),
                reason: format!("must be at least {MIN_JWT_SECRET_LEN} bytes"),
            });
        }
        let jwt_expiry_hours = parse_or(&lookup, "JWT_EXPIRY_HOURS", 6u64)?;

        let defaults = LendingPolicy::default();
        let lending = LendingPolicy {
            max_active_borrows: parse_or(
                &lookup,
                "BORROW_MAX_ACTIVE",
                defaults.max_active_borrows,
            )?,
            loan_days: parse_or(&lookup, "BORROW_LOAN_DAYS", defaults.loan_days)?,
            max_renewals: parse_or(&lookup, "BORROW_MAX_RENEWALS", defaults.max_renewals)?,
        };
        if lending.loan_days == 0 || lending.loan_days > MAX_LOAN_DAYS {
            return Err(ConfigError::InvalidValue {
                name: "BORROW_LOAN_DAYS".to_string(),
                reason: format!("must be between 1 and {MAX_LOAN_DAYS}"),
            });
        }

        let admin_username = lookup("ADMIN_USERNAME").filter(|s| !s.trim().is_empty());
        let admin_password = lookup("ADMIN_PASSWORD").filter(|s| !s.is_empty());
        let seed_sample_books = parse_or(&lookup, "SEED_SAMPLE_BOOKS", false)?;

        Ok(Self {
            storage,
            port,
            log_level,
            log_format,
            cors_allowed_origins,
            jwt_secret,
            jwt_expiry_hours,
            lending,
            admin_username,
            admin_password,
            seed_sample_books,
        })
    }

    /// Get the socket address for the server.
    pub fn socket_addr(&self) -> std::net::SocketAddr {
        std::net::SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                name: name.to_string(),
                reason: e.to_string(),
            }),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Invalid environment variable value.
    #[error("invalid value for environment variable {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = load(&[("JWT_SECRET", SECRET)]).unwrap();

        assert_eq!(config.storage, StorageBackend::Postgres);
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.cors_allowed_origins, "*");
        assert_eq!(config.jwt_expiry_hours, 6);
        assert_eq!(config.lending, LendingPolicy::default());
        assert!(config.admin_username.is_none());
        assert!(!config.seed_sample_books);
    }

    #[test]
    fn test_missing_secret() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref v) if v == "JWT_SECRET"));
    }

    #[test]
    fn test_short_secret_rejected() {
        let err = load(&[("JWT_SECRET", "short")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref name, .. } if name == "JWT_SECRET"));
    }

    #[test]
    fn test_lending_policy_overrides() {
        let config = load(&[
            ("JWT_SECRET", SECRET),
            ("BORROW_MAX_ACTIVE", "3"),
            ("BORROW_LOAN_DAYS", "7"),
            ("BORROW_MAX_RENEWALS", "0"),
        ])
        .unwrap();
        assert_eq!(config.lending.max_active_borrows, 3);
        assert_eq!(config.lending.loan_days, 7);
        assert_eq!(config.lending.max_renewals, 0);
    }

    #[test]
    fn test_invalid_number() {
        let err = load(&[("JWT_SECRET", SECRET), ("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref name, .. } if name == "PORT"));
    }

    #[test]
    fn test_zero_loan_days_rejected() {
        assert!(load(&[("JWT_SECRET", SECRET), ("BORROW_LOAN_DAYS", "0")]).is_err());
    }

    #[test]
    fn test_oversized_loan_days_rejected() {
        let err = load(&[("JWT_SECRET", SECRET), ("BORROW_LOAN_DAYS", "200000000")]).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref name, .. } if name == "BORROW_LOAN_DAYS")
        );

        let config = load(&[("JWT_SECRET", SECRET), ("BORROW_LOAN_DAYS", "3650")]).unwrap();
        assert_eq!(config.lending.loan_days, 3650);
    }

    #[test]
    fn test_memory_backend_and_json_logs() {
        let config = load(&[
            ("JWT_SECRET", SECRET),
            ("STORAGE_BACKEND", "Memory"),
            ("LOG_FORMAT", "json"),
            ("SEED_SAMPLE_BOOKS", "true"),
            ("ADMIN_USERNAME", "admin"),
            ("ADMIN_PASSWORD", "admin123"),
        ])
        .unwrap();
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.seed_sample_books);
        assert_eq!(config.admin_username.as_deref(), Some("admin"));
    }

    #[test]
    fn test_socket_addr() {
        let config = load(&[("JWT_SECRET", SECRET), ("PORT", "8080")]).unwrap();
        assert_eq!(config.socket_addr().port(), 8080);
    }
}
