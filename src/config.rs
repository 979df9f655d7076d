use std::env;
use std::net::SocketAddr;
use anyhow::{Context, Result};
use rand::RngCore;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

/// The minimum accepted length of `JWT_SECRET`, in bytes.
pub const MIN_SECRET_BYTES: usize = 32;
/// The longest accepted session token lifetime, in days.
pub const MAX_TOKEN_TTL_DAYS: i64 = 365;

/// The deployment environment the service runs in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => anyhow::bail!("APP_ENV must be 'development' or 'production', got '{}'", other),
        }
    }
}

/// An administrator account ensured at startup.
#[derive(Clone)]
pub struct AdminSeed {
    pub name: String,
    pub email: String,
    pub password: Zeroizing<String>,
}

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The environment the service runs in.
    pub environment: Environment,
    /// The URL of the PostgreSQL database. `None` selects the in-memory store.
    pub database_url: Option<String>,
    /// The address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// The lifetime of a session token in days.
    pub token_ttl_days: i64,
    /// The symmetric secret used to sign and verify session tokens.
    pub jwt_secret: Zeroizing<Vec<u8>>,
    /// The administrator to create or promote on startup, if any.
    pub admin_seed: Option<AdminSeed>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("environment", &self.environment)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("bind_addr", &self.bind_addr)
            .field("token_ttl_days", &self.token_ttl_days)
            .field("jwt_secret", &"<redacted>")
            .field("admin_seed", &self.admin_seed.as_ref().map(|seed| &seed.email))
            .finish()
    }
}

impl Config {
    /// Creates a new `Config` from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Creates a new `Config` from an arbitrary key lookup.
    ///
    /// Fails fast when a required value is missing or malformed. In production
    /// both `JWT_SECRET` and `DATABASE_URL` are mandatory; in development a
    /// missing secret is replaced by an ephemeral random one, which means
    /// tokens do not survive a restart.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV") {
            Some(value) => Environment::parse(&value)?,
            None => Environment::Development,
        };

        let jwt_secret = match lookup("JWT_SECRET").map(Zeroizing::new) {
            Some(secret) => {
                if secret.len() < MIN_SECRET_BYTES {
                    anyhow::bail!("JWT_SECRET must be at least {} bytes", MIN_SECRET_BYTES);
                }
                Zeroizing::new(secret.as_bytes().to_vec())
            }
            None if environment == Environment::Development => {
                tracing::warn!("⚠️ JWT_SECRET not set, using an ephemeral development secret");
                let mut bytes = vec![0u8; MIN_SECRET_BYTES];
                OsRng.fill_bytes(&mut bytes);
                Zeroizing::new(bytes)
            }
            None => anyhow::bail!("JWT_SECRET must be set in production"),
        };

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        if database_url.is_none() && environment == Environment::Production {
            anyhow::bail!("DATABASE_URL must be set in production");
        }

        let token_ttl_days: i64 = lookup("TOKEN_TTL_DAYS")
            .unwrap_or_else(|| "7".to_string())
            .parse()
            .context("Invalid TOKEN_TTL_DAYS")?;
        if !(1..=MAX_TOKEN_TTL_DAYS).contains(&token_ttl_days) {
            anyhow::bail!("TOKEN_TTL_DAYS must be between 1 and {}", MAX_TOKEN_TTL_DAYS);
        }

        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| "127.0.0.1:3000".to_string())
            .parse()
            .context("Invalid BIND_ADDR")?;

        let admin_seed = match (lookup("ADMIN_EMAIL"), lookup("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed {
                name: lookup("ADMIN_NAME").unwrap_or_else(|| "Administrator".to_string()),
                email,
                password: Zeroizing::new(password),
            }),
            (None, None) => None,
            _ => anyhow::bail!("ADMIN_EMAIL and ADMIN_PASSWORD must be set together"),
        };

        Ok(Self {
            environment,
            database_url,
            bind_addr,
            token_ttl_days,
            jwt_secret,
            admin_seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn development_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.token_ttl_days, 7);
        assert_eq!(config.jwt_secret.len(), MIN_SECRET_BYTES);
        assert!(config.database_url.is_none());
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:3000");
    }

    #[test]
    fn production_requires_secret() {
        let err = Config::from_lookup(lookup(&[
            ("APP_ENV", "production"),
            ("DATABASE_URL", "postgres://localhost/staff"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn production_requires_database() {
        let err = Config::from_lookup(lookup(&[
            ("APP_ENV", "production"),
            ("JWT_SECRET", "0123456789abcdef0123456789abcdef"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn short_secret_is_rejected() {
        assert!(Config::from_lookup(lookup(&[("JWT_SECRET", "short")])).is_err());
    }

    #[test]
    fn explicit_values_are_used() {
        let config = Config::from_lookup(lookup(&[
            ("APP_ENV", "production"),
            ("JWT_SECRET", "0123456789abcdef0123456789abcdef"),
            ("DATABASE_URL", "postgres://localhost/staff"),
            ("TOKEN_TTL_DAYS", "2"),
            ("BIND_ADDR", "0.0.0.0:8080"),
        ]))
        .unwrap();
        assert_eq!(config.token_ttl_days, 2);
        assert_eq!(config.jwt_secret.as_slice(), b"0123456789abcdef0123456789abcdef");
        assert_eq!(config.bind_addr.port(), 8080);
    }

    #[test]
    fn invalid_ttl_fails() {
        assert!(Config::from_lookup(lookup(&[("TOKEN_TTL_DAYS", "0")])).is_err());
        assert!(Config::from_lookup(lookup(&[("TOKEN_TTL_DAYS", "seven")])).is_err());
    }

    #[test]
    fn oversized_ttl_fails() {
        assert!(Config::from_lookup(lookup(&[("TOKEN_TTL_DAYS", "366")])).is_err());
        assert!(Config::from_lookup(lookup(&[("TOKEN_TTL_DAYS", "1000000000")])).is_err());
        let config = Config::from_lookup(lookup(&[("TOKEN_TTL_DAYS", "365")])).unwrap();
        assert_eq!(config.token_ttl_days, MAX_TOKEN_TTL_DAYS);
    }

    #[test]
    fn admin_seed_needs_email_and_password() {
        assert!(Config::from_lookup(lookup(&[])).unwrap().admin_seed.is_none());
        assert!(Config::from_lookup(lookup(&[("ADMIN_EMAIL", "root@x.com")])).is_err());

        let config = Config::from_lookup(lookup(&[
            ("ADMIN_EMAIL", "root@x.com"),
            ("ADMIN_PASSWORD", "rootpass99"),
        ]))
        .unwrap();
        let seed = config.admin_seed.unwrap();
        assert_eq!(seed.email, "root@x.com");
        assert_eq!(seed.name, "Administrator");
        assert_eq!(seed.password.as_str(), "rootpass99");
    }

    #[test]
    fn unknown_environment_fails() {
        assert!(Config::from_lookup(lookup(&[("APP_ENV", "staging")])).is_err());
    }
}
