use std::env;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const DEFAULT_ACCESS_TTL_SECS: i64 = 2 * 60 * 60;
const DEFAULT_REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;
/// Upper bound for token lifetimes: ten years.
const MAX_TTL_SECS: i64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} must be {expected}, got {value:?}")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Token signing parameters. Built once at startup and handed to `TokenEngine::new`.
#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    /// Access token lifetime in seconds.
    pub access_ttl_secs: i64,
    /// Refresh token lifetime in seconds.
    pub refresh_ttl_secs: i64,
    pub issuer: String,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("issuer", &self.issuer)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
    pub environment: String,
}

impl Default for AppInfo {
    fn default() -> Self {
        Self {
            name: "todo-api".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub server_port: u16,
    pub server_host: String,
    /// `debug` or `release`; only affects the default log level.
    pub server_mode: String,
    pub jwt: JwtConfig,
    pub bcrypt_cost: u32,
    pub app: AppInfo,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup, so tests do not have
    /// to mutate the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let bcrypt_cost = parse_or(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST, "an integer")?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                key: "BCRYPT_COST",
                expected: "between 4 and 31",
                value: bcrypt_cost.to_string(),
            });
        }

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10, "an integer")?,
            server_port: parse_or(&lookup, "SERVER_PORT", 8080, "a port number")?,
            server_host: or_default("SERVER_HOST", "127.0.0.1"),
            server_mode: or_default("SERVER_MODE", "debug"),
            jwt: JwtConfig {
                secret: required("JWT_SECRET")?,
                access_ttl_secs: parse_ttl(&lookup, "JWT_ACCESS_EXPIRE", DEFAULT_ACCESS_TTL_SECS)?,
                refresh_ttl_secs: parse_ttl(&lookup, "JWT_REFRESH_EXPIRE", DEFAULT_REFRESH_TTL_SECS)?,
                issuer: or_default("JWT_ISSUER", "todo-api"),
            },
            bcrypt_cost,
            app: AppInfo {
                name: or_default("APP_NAME", "todo-api"),
                version: or_default("APP_VERSION", env!("CARGO_PKG_VERSION")),
                environment: or_default("APP_ENV", "development"),
            },
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }

    pub fn is_release(&self) -> bool {
        self.server_mode == "release"
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T, expected: &'static str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, expected, value }),
    }
}

fn parse_ttl<F>(lookup: &F, key: &'static str, default: i64) -> Result<i64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    const EXPECTED: &str = "a number of seconds between 1 and ten years";
    let value = parse_or(lookup, key, default, EXPECTED)?;
    if !(1..=MAX_TTL_SECS).contains(&value) {
        return Err(ConfigError::Invalid {
            key,
            expected: EXPECTED,
            value: value.to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://test"),
            ("JWT_SECRET", "s3cret"),
        ]))
        .unwrap();

        assert_eq!(config.database_url, "postgres://test");
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.server_host, "127.0.0.1");
        assert_eq!(config.jwt.access_ttl_secs, 7200);
        assert_eq!(config.jwt.refresh_ttl_secs, 604800);
        assert_eq!(config.jwt.issuer, "todo-api");
        assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert!(!config.is_release());
    }

    #[test]
    fn test_config_custom_values() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://test"),
            ("JWT_SECRET", "s3cret"),
            ("SERVER_PORT", "3000"),
            ("SERVER_HOST", "0.0.0.0"),
            ("SERVER_MODE", "release"),
            ("JWT_ACCESS_EXPIRE", "60"),
            ("JWT_ISSUER", "todo-tests"),
        ]))
        .unwrap();

        assert_eq!(config.server_url(), "http://0.0.0.0:3000");
        assert_eq!(config.jwt.access_ttl_secs, 60);
        assert_eq!(config.jwt.issuer, "todo-tests");
        assert!(config.is_release());
    }

    #[test]
    fn test_config_errors() {
        let err = Config::from_lookup(lookup_from(&[("JWT_SECRET", "s3cret")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));

        let err = Config::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://test")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("JWT_SECRET"));

        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://test"),
            ("JWT_SECRET", "s3cret"),
            ("SERVER_PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "SERVER_PORT", .. }));

        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://test"),
            ("JWT_SECRET", "s3cret"),
            ("JWT_REFRESH_EXPIRE", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "JWT_REFRESH_EXPIRE", .. }));
    }

    #[test]
    fn test_oversized_ttl_is_rejected() {
        let max = i64::MAX.to_string();
        let eleven_years = (11 * 365 * 24 * 60 * 60_i64).to_string();
        for value in [max.as_str(), eleven_years.as_str()] {
            let err = Config::from_lookup(lookup_from(&[
                ("DATABASE_URL", "postgres://test"),
                ("JWT_SECRET", "s3cret"),
                ("JWT_ACCESS_EXPIRE", value),
            ]))
            .unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { key: "JWT_ACCESS_EXPIRE", .. }));
        }

        let ten_years = (10 * 365 * 24 * 60 * 60_i64).to_string();
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://test"),
            ("JWT_SECRET", "s3cret"),
            ("JWT_REFRESH_EXPIRE", ten_years.as_str()),
        ]))
        .unwrap();
        assert_eq!(config.jwt.refresh_ttl_secs, 10 * 365 * 24 * 60 * 60);
    }

    #[test]
    fn test_jwt_config_debug_redacts_secret() {
        let jwt = JwtConfig {
            secret: "do-not-print".into(),
            access_ttl_secs: 1,
            refresh_ttl_secs: 2,
            issuer: "x".into(),
        };
        assert!(!format!("{:?}", jwt).contains("do-not-print"));
    }
}
