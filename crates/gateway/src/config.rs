//! Process configuration, loaded once at startup from environment variables.
//!
//! Every knob has the default documented in the design; absence or a
//! malformed value falls back to that default rather than failing startup,
//! matching the upstream services' own `os.getenv(default)` style.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub cars_service_url: String,
    pub rental_service_url: String,
    pub payment_service_url: String,
    pub listen_port: u16,

    pub failure_threshold: u32,
    pub open_timeout: Duration,
    pub upstream_timeout: Duration,

    pub retry_interval: Duration,
    pub retry_max_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cars_service_url: "http://cars:8070".to_string(),
            rental_service_url: "http://rental:8060".to_string(),
            payment_service_url: "http://payment:8050".to_string(),
            listen_port: 8080,
            failure_threshold: 5,
            open_timeout: Duration::from_secs(60),
            upstream_timeout: Duration::from_secs(5),
            retry_interval: Duration::from_secs(30),
            retry_max_attempts: 5,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cars_service_url: env_string("CARS_SERVICE_URL", defaults.cars_service_url),
            rental_service_url: env_string("RENTAL_SERVICE_URL", defaults.rental_service_url),
            payment_service_url: env_string("PAYMENT_SERVICE_URL", defaults.payment_service_url),
            listen_port: env_parsed("GATEWAY_LISTEN_PORT", defaults.listen_port),
            failure_threshold: env_parsed("BREAKER_FAILURE_THRESHOLD", defaults.failure_threshold),
            open_timeout: Duration::from_secs(env_parsed(
                "BREAKER_OPEN_TIMEOUT_SECS",
                defaults.open_timeout.as_secs(),
            )),
            upstream_timeout: Duration::from_secs(env_parsed(
                "UPSTREAM_TIMEOUT_SECS",
                defaults.upstream_timeout.as_secs(),
            )),
            retry_interval: Duration::from_secs(env_parsed(
                "RETRY_INTERVAL_SECS",
                defaults.retry_interval.as_secs(),
            )),
            retry_max_attempts: env_parsed("RETRY_MAX_ATTEMPTS", defaults.retry_max_attempts),
        }
    }
}

fn env_string(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
