//! Application configuration loaded from environment variables.

use std::time::Duration;

use message_bus::{RetryPolicy, RouterConfig};

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `8080`)
/// - `BASE_PATH`: prefix of the REST resources (default: `"/api/v1"`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `ORDERS_TOPIC`: topic order events go to (default: `"orders"`)
/// - `BUS_MAX_RETRIES`: handler retries after the first attempt (default: `3`)
/// - `BUS_RETRY_INTERVAL_MS`: pause between retries (default: `100`)
/// - `BUS_CLOSE_TIMEOUT_MS`: bound on draining the bus at shutdown (default: `3600000`, one hour)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub base_path: String,
    pub log_level: String,
    pub orders_topic: String,
    pub bus_max_retries: usize,
    pub bus_retry_interval: Duration,
    pub bus_close_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    ///
    /// Values that fail to parse fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|v| v.parse::<u64>().ok());

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            base_path: lookup("BASE_PATH").unwrap_or(defaults.base_path),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            orders_topic: lookup("ORDERS_TOPIC").unwrap_or(defaults.orders_topic),
            bus_max_retries: lookup("BUS_MAX_RETRIES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.bus_max_retries),
            bus_retry_interval: parsed("BUS_RETRY_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.bus_retry_interval),
            bus_close_timeout: parsed("BUS_CLOSE_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.bus_close_timeout),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Retry middleware policy: fixed interval.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.bus_max_retries, self.bus_retry_interval)
    }

    /// Router settings for the binary, which also stops on process signals.
    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            close_timeout: self.bus_close_timeout,
            handle_signals: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            base_path: "/api/v1".to_string(),
            log_level: "info".to_string(),
            orders_topic: reconciliation::DEFAULT_ORDERS_TOPIC.to_string(),
            bus_max_retries: 3,
            bus_retry_interval: Duration::from_millis(100),
            bus_close_timeout: Duration::from_secs(60 * 60),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.base_path, "/api/v1");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.orders_topic, "orders");
        assert_eq!(config.bus_max_retries, 3);
        assert_eq!(config.bus_retry_interval, Duration::from_millis(100));
        assert_eq!(config.bus_close_timeout, Duration::from_secs(3600));
    }

    #[test]
    fn test_values_from_lookup() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "9000"),
            ("BASE_PATH", "/v2"),
            ("ORDERS_TOPIC", "order-events"),
            ("BUS_MAX_RETRIES", "5"),
            ("BUS_RETRY_INTERVAL_MS", "250"),
            ("BUS_CLOSE_TIMEOUT_MS", "1000"),
        ]));

        assert_eq!(config.port, 9000);
        assert_eq!(config.base_path, "/v2");
        assert_eq!(config.orders_topic, "order-events");
        assert_eq!(config.retry_policy().max_retries, 5);
        assert_eq!(config.retry_policy().initial_interval, Duration::from_millis(250));
        assert_eq!(config.router_config().close_timeout, Duration::from_secs(1));
        assert!(config.router_config().handle_signals);
    }

    #[test]
    fn test_unparsable_values_fall_back() {
        let config = Config::from_lookup(lookup(&[("PORT", "http"), ("BUS_MAX_RETRIES", "-1")]));
        assert_eq!(config.port, 8080);
        assert_eq!(config.bus_max_retries, 3);
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 3000,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:3000");
    }
}
