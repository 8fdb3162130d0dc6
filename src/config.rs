// src/config.rs
use chrono::Duration;
use dotenv::dotenv;
use std::env;
use std::fmt;

pub const MIN_JWT_SECRET_LENGTH: usize = 32;

const DEFAULT_DATABASE_URL: &str = "sqlite:campaigns.db?mode=rwc";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// Lifetimes for both halves of a token pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTtls {
    pub access_default: Duration,
    pub access_remember: Duration,
    pub refresh_default: Duration,
    pub refresh_remember: Duration,
}

impl Default for TokenTtls {
    fn default() -> Self {
        Self {
            access_default: Duration::hours(1),
            access_remember: Duration::days(7),
            refresh_default: Duration::days(7),
            refresh_remember: Duration::days(30),
        }
    }
}

impl TokenTtls {
    pub fn access(&self, remember_me: bool) -> Duration {
        if remember_me {
            self.access_remember
        } else {
            self.access_default
        }
    }

    pub fn refresh(&self, remember_me: bool) -> Duration {
        if remember_me {
            self.refresh_remember
        } else {
            self.refresh_default
        }
    }
}

/// Process-wide configuration, loaded once by `main`.
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub jwt_secret: Vec<u8>,
    pub secure_cookies: bool,
    pub ttls: TokenTtls,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &self.database_url)
            .field("bind_addr", &self.bind_addr)
            .field("jwt_secret", &"<redacted>")
            .field("secure_cookies", &self.secure_cookies)
            .field("ttls", &self.ttls)
            .finish()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    MissingSecret,
    SecretTooShort(usize),
    InvalidValue { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingSecret => write!(f, "JWT_SECRET must be set"),
            ConfigError::SecretTooShort(len) => write!(
                f,
                "JWT_SECRET is {} bytes, at least {} are required",
                len, MIN_JWT_SECRET_LENGTH
            ),
            ConfigError::InvalidValue { key, value } => {
                write!(f, "invalid value for {}: {:?}", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET").ok_or(ConfigError::MissingSecret)?;
        let jwt_secret = jwt_secret.trim().as_bytes().to_vec();
        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::SecretTooShort(jwt_secret.len()));
        }

        let secure_cookies = match lookup("SECURE_COOKIES") {
            None => true,
            Some(value) => parse_bool("SECURE_COOKIES", &value)?,
        };

        let defaults = TokenTtls::default();
        let ttls = TokenTtls {
            access_default: ttl_from(&lookup, "ACCESS_TTL_SECS", defaults.access_default)?,
            access_remember: ttl_from(
                &lookup,
                "ACCESS_TTL_REMEMBER_SECS",
                defaults.access_remember,
            )?,
            refresh_default: ttl_from(&lookup, "REFRESH_TTL_SECS", defaults.refresh_default)?,
            refresh_remember: ttl_from(
                &lookup,
                "REFRESH_TTL_REMEMBER_SECS",
                defaults.refresh_remember,
            )?,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            jwt_secret,
            secure_cookies,
            ttls,
        })
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}

fn ttl_from<F>(lookup: &F, key: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(key) else {
        return Ok(default);
    };

    match value.trim().parse::<i64>() {
        Ok(secs) if secs > 0 => Ok(Duration::seconds(secs)),
        _ => Err(ConfigError::InvalidValue { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[("JWT_SECRET", SECRET)])).unwrap();

        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert!(config.secure_cookies);
        assert_eq!(config.ttls, TokenTtls::default());
        assert_eq!(config.ttls.access(false).num_seconds(), 3600);
        assert_eq!(config.ttls.access(true).num_seconds(), 7 * 86400);
        assert_eq!(config.ttls.refresh(false).num_seconds(), 7 * 86400);
        assert_eq!(config.ttls.refresh(true).num_seconds(), 30 * 86400);
    }

    #[test]
    fn test_missing_secret() {
        let result = Config::from_lookup(lookup_from(&[]));
        assert_eq!(result.unwrap_err(), ConfigError::MissingSecret);
    }

    #[test]
    fn test_short_secret() {
        let result = Config::from_lookup(lookup_from(&[("JWT_SECRET", "too-short")]));
        assert_eq!(result.unwrap_err(), ConfigError::SecretTooShort(9));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("JWT_SECRET", SECRET),
            ("SECURE_COOKIES", "false"),
            ("ACCESS_TTL_SECS", "900"),
            ("BIND_ADDR", "0.0.0.0:8080"),
        ]))
        .unwrap();

        assert!(!config.secure_cookies);
        assert_eq!(config.ttls.access_default.num_seconds(), 900);
        assert_eq!(config.ttls.refresh_default, TokenTtls::default().refresh_default);
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
    }

    #[test]
    fn test_invalid_ttl() {
        let result = Config::from_lookup(lookup_from(&[
            ("JWT_SECRET", SECRET),
            ("REFRESH_TTL_SECS", "-5"),
        ]));
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue { key: "REFRESH_TTL_SECS", .. }
        ));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = Config::from_lookup(lookup_from(&[("JWT_SECRET", SECRET)])).unwrap();
        assert!(!format!("{:?}", config).contains(SECRET));
    }
}
