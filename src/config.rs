//! Startup configuration from the environment (and `.env`, if present).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::orm::DbConfig;

/// Everything the binary needs to start.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub addr: SocketAddr,
    pub db: DbConfig,
    pub session_secret: String,
    pub session_cookie: String,
    pub template_dir: PathBuf,
    pub static_dir: PathBuf,
}

impl AppConfig {
    /// Loads `.env` into the environment, then reads the settings.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the settings through `lookup`, applying defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());
        let defaults = DbConfig::default();

        Ok(Self {
            addr: parse(&lookup, "WEBLOG_ADDR", "127.0.0.1:9000")?,
            db: DbConfig {
                url: lookup("DATABASE_URL"),
                host: text("DB_HOST", &defaults.host),
                port: parse(&lookup, "DB_PORT", "3306")?,
                user: lookup("DB_USER"),
                password: lookup("DB_PASSWORD"),
                database: lookup("DB_NAME"),
                charset: text("DB_CHARSET", &defaults.charset),
                autocommit: parse(&lookup, "DB_AUTOCOMMIT", "true")?,
                min_size: parse(&lookup, "DB_POOL_MIN", "1")?,
                max_size: parse(&lookup, "DB_POOL_MAX", "10")?,
            },
            session_secret: text("SESSION_SECRET", "weblog"),
            session_cookie: text("SESSION_COOKIE", "awesession"),
            template_dir: text("TEMPLATE_DIR", "templates").into(),
            static_dir: text("STATIC_DIR", "static").into(),
        })
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError> {
    let value = lookup(key).unwrap_or_else(|| default.to_owned());
    value.trim().parse().map_err(|_| ConfigError::Invalid { key, value })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let env: HashMap<String, String> =
            pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        AppConfig::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn defaults_match_a_local_mysql() {
        let c = load(&[]).unwrap();
        assert_eq!(c.addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(c.db.host, "localhost");
        assert_eq!(c.db.port, 3306);
        assert_eq!(c.db.charset, "utf8");
        assert!(c.db.autocommit);
        assert_eq!((c.db.min_size, c.db.max_size), (1, 10));
        assert_eq!(c.db.user, None);
        assert_eq!(c.session_cookie, "awesession");
    }

    #[test]
    fn overrides_are_parsed() {
        let c = load(&[("DB_PORT", "3307"), ("DB_AUTOCOMMIT", "false"), ("DB_USER", "www")]).unwrap();
        assert_eq!(c.db.port, 3307);
        assert!(!c.db.autocommit);
        assert_eq!(c.db.user.as_deref(), Some("www"));
    }

    #[test]
    fn bad_values_are_reported() {
        let err = load(&[("DB_POOL_MAX", "lots")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "DB_POOL_MAX", .. }));
    }
}
