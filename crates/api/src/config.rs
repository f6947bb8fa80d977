//! Server configuration loaded from environment variables.

use std::time::Duration;

use domain::ShardResolver;
use saga::RebookSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Collaborator base URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUrls {
    pub order: String,
    pub order_other: String,
    pub travel: String,
    pub price: String,
    pub seat: String,
    pub ledger: String,
}

impl Default for ServiceUrls {
    fn default() -> Self {
        Self {
            order: "http://localhost:12031".to_string(),
            order_other: "http://localhost:12032".to_string(),
            travel: "http://localhost:12346".to_string(),
            price: "http://localhost:16579".to_string(),
            seat: "http://localhost:18898".to_string(),
            ledger: "http://localhost:18673".to_string(),
        }
    }
}

/// Server configuration with defaults for local development.
///
/// | Variable | Default |
/// |---|---|
/// | `HOST` / `PORT` | `0.0.0.0` / `3000` |
/// | `RUST_LOG` | `info` |
/// | `LOG_FORMAT` | `pretty` (`json` accepted) |
/// | `DATABASE_URL` | unset, in-memory journal |
/// | `ORDER_SERVICE_URL`, `ORDER_OTHER_SERVICE_URL`, `TRAVEL_SERVICE_URL`, `PRICE_SERVICE_URL`, `SEAT_SERVICE_URL`, `LEDGER_SERVICE_URL` | see [`ServiceUrls`] |
/// | `UPSTREAM_TIMEOUT_MS` | `5000` |
/// | `CHANGE_GRACE_MINUTES` | `120` |
/// | `PRIMARY_TRIP_PREFIXES` | `GD` |
/// | `RECONCILE_INTERVAL_SECS` | `60`, `0` disables |
/// | `REBOOK_LOCK_WAIT_MS` | `10000` |
///
/// Unparseable numbers fall back to the default with a warning.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub services: ServiceUrls,
    pub upstream_timeout: Duration,
    pub change_grace_minutes: i64,
    pub primary_trip_prefixes: String,
    /// `None` turns the background sweep off.
    pub reconcile_interval: Option<Duration>,
    pub lock_wait: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let string = |key: &str, default: String| lookup(key).unwrap_or(default);

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };
        let reconcile_secs: u64 = number(&lookup, "RECONCILE_INTERVAL_SECS", 60);

        Self {
            host: string("HOST", defaults.host),
            port: number(&lookup, "PORT", defaults.port),
            log_level: string("RUST_LOG", defaults.log_level),
            log_format,
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            services: ServiceUrls {
                order: string("ORDER_SERVICE_URL", defaults.services.order),
                order_other: string("ORDER_OTHER_SERVICE_URL", defaults.services.order_other),
                travel: string("TRAVEL_SERVICE_URL", defaults.services.travel),
                price: string("PRICE_SERVICE_URL", defaults.services.price),
                seat: string("SEAT_SERVICE_URL", defaults.services.seat),
                ledger: string("LEDGER_SERVICE_URL", defaults.services.ledger),
            },
            upstream_timeout: Duration::from_millis(number(&lookup, "UPSTREAM_TIMEOUT_MS", 5000)),
            change_grace_minutes: number(&lookup, "CHANGE_GRACE_MINUTES", 120),
            primary_trip_prefixes: string("PRIMARY_TRIP_PREFIXES", defaults.primary_trip_prefixes),
            reconcile_interval: (reconcile_secs > 0).then(|| Duration::from_secs(reconcile_secs)),
            lock_wait: Duration::from_millis(number(&lookup, "REBOOK_LOCK_WAIT_MS", 10_000)),
        }
    }

    /// Returns the `"host:port"` bind address.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn rebook_settings(&self) -> RebookSettings {
        RebookSettings {
            grace: chrono::Duration::minutes(self.change_grace_minutes),
            upstream_timeout: self.upstream_timeout,
            resolver: ShardResolver::from_prefixes(&self.primary_trip_prefixes),
            lock_wait: self.lock_wait,
        }
    }
}

fn number<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, %default, "unparseable setting, using default");
            default
        }),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: None,
            services: ServiceUrls::default(),
            upstream_timeout: Duration::from_secs(5),
            change_grace_minutes: 120,
            primary_trip_prefixes: "GD".to_string(),
            reconcile_interval: Some(Duration::from_secs(60)),
            lock_wait: Duration::from_secs(10),
        }
    }
}
