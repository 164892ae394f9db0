//! Application configuration loaded from environment variables.
//!
//! Values come from an optional `.env` override file followed by the process
//! environment. Loading never fails: anything missing, empty or unparseable
//! falls back to its default and is reported as a [`ConfigWarning`] for the
//! caller to log once logging is up.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::error::DurationError;

const DEFAULT_PORT: &str = "8080";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_API_READ_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_API_WRITE_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_API_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

const DEFAULT_DB_HOST: &str = "localhost";
const DEFAULT_DB_PORT: &str = "5432";
const DEFAULT_DB_USER: &str = "postgres";
const DEFAULT_DB_PASSWORD: &str = "postgres";
const DEFAULT_DB_NAME: &str = "orbit";
const DEFAULT_DB_SSL_MODE: &str = "disable";

const DEFAULT_REDIS_HOST: &str = "localhost";
const DEFAULT_REDIS_PORT: &str = "6379";
const DEFAULT_REDIS_PASSWORD: &str = "";
const DEFAULT_REDIS_DB: &str = "0";

const DEFAULT_JWT_SECRET: &str = "your_jwt_secret_key_here";
const DEFAULT_ACCESS_TOKEN_EXPIRY: Duration = Duration::from_secs(15 * 60);
const DEFAULT_REFRESH_TOKEN_EXPIRY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Application configuration snapshot.
///
/// Database, cache and token settings are carried as plain data; nothing in
/// the service connects to those backends.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    // === Server ===
    /// Listen port. Not range-checked; an invalid value fails at bind time.
    pub port: String,
    /// Log level directive (trace, debug, info, warn, error).
    pub log_level: String,
    /// Environment name, e.g. development or production.
    pub env: String,
    /// Overall per-request timeout.
    pub api_timeout: Duration,
    /// Socket read timeout.
    pub api_read_timeout: Duration,
    /// Socket write timeout.
    pub api_write_timeout: Duration,
    /// Keep-alive idle timeout.
    pub api_idle_timeout: Duration,

    // === Database ===
    /// Database host.
    pub db_host: String,
    /// Database port.
    pub db_port: String,
    /// Database user.
    pub db_user: String,
    /// Database password.
    pub db_password: String,
    /// Database name.
    pub db_name: String,
    /// Database SSL mode.
    pub db_ssl_mode: String,

    // === Cache ===
    /// Redis host.
    pub redis_host: String,
    /// Redis port.
    pub redis_port: String,
    /// Redis password.
    pub redis_password: String,
    /// Redis database index.
    pub redis_db: String,

    // === Auth ===
    /// Token signing secret.
    pub jwt_secret: String,
    /// Access token lifetime.
    pub access_token_expiry: Duration,
    /// Refresh token lifetime.
    pub refresh_token_expiry: Duration,
}

/// A recoverable problem encountered while loading configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// No override file was found; only the process environment is used.
    #[error(".env file not found, using environment variables")]
    OverrideFileMissing,

    /// The override file exists but could not be read.
    #[error("could not load .env file: {0}")]
    OverrideFileInvalid(String),

    /// The process environment could not be read; all defaults apply.
    #[error("could not read environment: {0}")]
    EnvironmentUnreadable(String),

    /// A duration variable did not parse; its default applies.
    #[error("invalid duration for {key} ({value:?}): {reason}, using default")]
    InvalidDuration {
        /// Environment variable name.
        key: &'static str,
        /// The rejected value.
        value: String,
        /// Why parsing failed.
        reason: DurationError,
    },
}

/// Raw environment values, keyed by upper-cased field name.
#[derive(Debug, Default, Deserialize)]
struct EnvVars {
    port: Option<String>,
    log_level: Option<String>,
    env: Option<String>,
    api_timeout: Option<String>,
    api_read_timeout: Option<String>,
    api_write_timeout: Option<String>,
    api_idle_timeout: Option<String>,
    db_host: Option<String>,
    db_port: Option<String>,
    db_user: Option<String>,
    db_password: Option<String>,
    db_name: Option<String>,
    db_ssl_mode: Option<String>,
    redis_host: Option<String>,
    redis_port: Option<String>,
    redis_password: Option<String>,
    redis_db: Option<String>,
    jwt_secret: Option<String>,
    access_token_expiry: Option<String>,
    refresh_token_expiry: Option<String>,
}

impl Config {
    /// Load configuration from environment, reading `.env` first.
    pub fn load() -> (Self, Vec<ConfigWarning>) {
        Self::load_from(None)
    }

    /// Load configuration, reading overrides from `env_file` instead of
    /// `.env` when given. Variables already set in the process win.
    pub fn load_from(env_file: Option<&Path>) -> (Self, Vec<ConfigWarning>) {
        let mut warnings = Vec::new();

        let loaded = match env_file {
            Some(path) => dotenvy::from_path(path),
            None => dotenvy::dotenv().map(|_| ()),
        };
        if let Err(err) = loaded {
            if err.not_found() {
                warnings.push(ConfigWarning::OverrideFileMissing);
            } else {
                warnings.push(ConfigWarning::OverrideFileInvalid(err.to_string()));
            }
        }

        let vars = envy::from_env::<EnvVars>().unwrap_or_else(|err| {
            warnings.push(ConfigWarning::EnvironmentUnreadable(err.to_string()));
            EnvVars::default()
        });

        let config = Self::resolve(vars, &mut warnings);
        (config, warnings)
    }

    /// Resolve configuration from explicit key/value pairs only.
    pub fn from_vars<I>(vars: I) -> (Self, Vec<ConfigWarning>)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut warnings = Vec::new();
        let vars = envy::from_iter::<_, EnvVars>(vars).unwrap_or_else(|err| {
            warnings.push(ConfigWarning::EnvironmentUnreadable(err.to_string()));
            EnvVars::default()
        });
        let config = Self::resolve(vars, &mut warnings);
        (config, warnings)
    }

    fn resolve(vars: EnvVars, warnings: &mut Vec<ConfigWarning>) -> Self {
        Self {
            port: string_or(vars.port, DEFAULT_PORT),
            log_level: string_or(vars.log_level, DEFAULT_LOG_LEVEL),
            env: string_or(vars.env, DEFAULT_ENV),
            api_timeout: duration_or("API_TIMEOUT", vars.api_timeout, DEFAULT_API_TIMEOUT, warnings),
            api_read_timeout: duration_or(
                "API_READ_TIMEOUT",
                vars.api_read_timeout,
                DEFAULT_API_READ_TIMEOUT,
                warnings,
            ),
            api_write_timeout: duration_or(
                "API_WRITE_TIMEOUT",
                vars.api_write_timeout,
                DEFAULT_API_WRITE_TIMEOUT,
                warnings,
            ),
            api_idle_timeout: duration_or(
                "API_IDLE_TIMEOUT",
                vars.api_idle_timeout,
                DEFAULT_API_IDLE_TIMEOUT,
                warnings,
            ),

            db_host: string_or(vars.db_host, DEFAULT_DB_HOST),
            db_port: string_or(vars.db_port, DEFAULT_DB_PORT),
            db_user: string_or(vars.db_user, DEFAULT_DB_USER),
            db_password: string_or(vars.db_password, DEFAULT_DB_PASSWORD),
            db_name: string_or(vars.db_name, DEFAULT_DB_NAME),
            db_ssl_mode: string_or(vars.db_ssl_mode, DEFAULT_DB_SSL_MODE),

            redis_host: string_or(vars.redis_host, DEFAULT_REDIS_HOST),
            redis_port: string_or(vars.redis_port, DEFAULT_REDIS_PORT),
            redis_password: string_or(vars.redis_password, DEFAULT_REDIS_PASSWORD),
            redis_db: string_or(vars.redis_db, DEFAULT_REDIS_DB),

            jwt_secret: string_or(vars.jwt_secret, DEFAULT_JWT_SECRET),
            access_token_expiry: duration_or(
                "ACCESS_TOKEN_EXPIRY",
                vars.access_token_expiry,
                DEFAULT_ACCESS_TOKEN_EXPIRY,
                warnings,
            ),
            refresh_token_expiry: duration_or(
                "REFRESH_TOKEN_EXPIRY",
                vars.refresh_token_expiry,
                DEFAULT_REFRESH_TOKEN_EXPIRY,
                warnings,
            ),
        }
    }

    /// Returns the `"0.0.0.0:port"` bind address string.
    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    /// Whether structured JSON logs should be emitted.
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::resolve(EnvVars::default(), &mut Vec::new())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const REDACTED: &str = "<redacted>";
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("env", &self.env)
            .field("api_timeout", &self.api_timeout)
            .field("api_read_timeout", &self.api_read_timeout)
            .field("api_write_timeout", &self.api_write_timeout)
            .field("api_idle_timeout", &self.api_idle_timeout)
            .field("db_host", &self.db_host)
            .field("db_port", &self.db_port)
            .field("db_user", &self.db_user)
            .field("db_password", &REDACTED)
            .field("db_name", &self.db_name)
            .field("db_ssl_mode", &self.db_ssl_mode)
            .field("redis_host", &self.redis_host)
            .field("redis_port", &self.redis_port)
            .field("redis_password", &REDACTED)
            .field("redis_db", &self.redis_db)
            .field("jwt_secret", &REDACTED)
            .field("access_token_expiry", &self.access_token_expiry)
            .field("refresh_token_expiry", &self.refresh_token_expiry)
            .finish()
    }
}

fn string_or(value: Option<String>, default: &str) -> String {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => default.to_string(),
    }
}

fn duration_or(
    key: &'static str,
    value: Option<String>,
    default: Duration,
    warnings: &mut Vec<ConfigWarning>,
) -> Duration {
    let value = match value {
        Some(v) if !v.is_empty() => v,
        _ => return default,
    };

    match parse_duration(&value) {
        Ok(d) => d,
        Err(reason) => {
            warnings.push(ConfigWarning::InvalidDuration { key, value, reason });
            default
        }
    }
}

/// Parse a duration in Go syntax: a sequence of decimal numbers, each with
/// an optional fraction and a unit, e.g. `300ms`, `1.5h` or `2h45m`.
///
/// Valid units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`. A bare `0`
/// is accepted. Negative values are rejected since [`Duration`] is unsigned.
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    const NANOS_PER_SEC: u128 = 1_000_000_000;

    if input.is_empty() {
        return Err(DurationError::Empty);
    }

    let (negative, mut rest) = match input.as_bytes()[0] {
        b'-' => (true, &input[1..]),
        b'+' => (false, &input[1..]),
        _ => (false, input),
    };

    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(DurationError::Invalid(input.to_string()));
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (int_digits, after_int) = rest.split_at(int_len);

        let (frac_digits, after_number) = match after_int.strip_prefix('.') {
            Some(after_dot) => {
                let frac_len = after_dot.bytes().take_while(u8::is_ascii_digit).count();
                after_dot.split_at(frac_len)
            }
            None => ("", after_int),
        };

        if int_digits.is_empty() && frac_digits.is_empty() {
            return Err(DurationError::Invalid(input.to_string()));
        }

        let unit_len = after_number
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(after_number.len());
        let (unit, remainder) = after_number.split_at(unit_len);
        rest = remainder;

        let scale: u128 = match unit {
            "" => return Err(DurationError::MissingUnit(input.to_string())),
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => NANOS_PER_SEC,
            "m" => 60 * NANOS_PER_SEC,
            "h" => 60 * 60 * NANOS_PER_SEC,
            other => {
                return Err(DurationError::UnknownUnit {
                    unit: other.to_string(),
                    input: input.to_string(),
                })
            }
        };

        let overflow = || DurationError::Overflow(input.to_string());

        let whole: u128 = if int_digits.is_empty() {
            0
        } else {
            int_digits.parse().map_err(|_| overflow())?
        };
        let mut nanos = whole.checked_mul(scale).ok_or_else(overflow)?;

        if !frac_digits.is_empty() {
            // Digits past nanosecond-of-an-hour precision cannot change the result.
            let digits = &frac_digits[..frac_digits.len().min(18)];
            let frac: u128 = digits.parse().map_err(|_| overflow())?;
            let denom = 10u128.pow(digits.len() as u32);
            nanos = nanos.checked_add(frac * scale / denom).ok_or_else(overflow)?;
        }

        total = total.checked_add(nanos).ok_or_else(overflow)?;
    }

    if negative && total != 0 {
        return Err(DurationError::Negative(input.to_string()));
    }

    let secs = u64::try_from(total / NANOS_PER_SEC)
        .map_err(|_| DurationError::Overflow(input.to_string()))?;
    Ok(Duration::new(secs, (total % NANOS_PER_SEC) as u32))
}
