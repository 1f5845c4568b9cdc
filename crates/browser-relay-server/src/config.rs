//! Environment-driven configuration.

use std::time::Duration;

/// Default port for the client-facing HTTP API.
pub const DEFAULT_HTTP_PORT: u16 = 3000;
/// Default port for the executor WebSocket listener.
pub const DEFAULT_WS_PORT: u16 = 8081;
/// Default per-call timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Relay server configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayConfig {
    pub http_port: u16,
    pub ws_port: u16,
    pub request_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            ws_port: DEFAULT_WS_PORT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl RelayConfig {
    /// Read configuration from the process environment.
    ///
    /// Unset or unparseable variables fall back to their defaults with a
    /// warning rather than aborting startup.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            http_port: env_port("BROWSER_RELAY_HTTP_PORT", DEFAULT_HTTP_PORT),
            ws_port: env_port("BROWSER_RELAY_WS_PORT", DEFAULT_WS_PORT),
            request_timeout: env_timeout_ms(
                "BROWSER_RELAY_REQUEST_TIMEOUT_MS",
                DEFAULT_REQUEST_TIMEOUT,
            ),
        }
    }
}

fn env_port(var: &str, default: u16) -> u16 {
    match std::env::var(var) {
        Ok(raw) => parse_port(&raw).unwrap_or_else(|| {
            tracing::warn!(var, raw, "invalid port, using default {default}");
            default
        }),
        Err(_) => default,
    }
}

fn env_timeout_ms(var: &str, default: Duration) -> Duration {
    match std::env::var(var) {
        Ok(raw) => parse_timeout_ms(&raw).unwrap_or_else(|| {
            tracing::warn!(var, raw, "invalid timeout, using default");
            default
        }),
        Err(_) => default,
    }
}

fn parse_port(raw: &str) -> Option<u16> {
    raw.trim().parse::<u16>().ok().filter(|port| *port != 0)
}

fn parse_timeout_ms(raw: &str) -> Option<Duration> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ports_parse_and_reject_zero() {
        assert_eq!(parse_port("8081"), Some(8081));
        assert_eq!(parse_port(" 3000 "), Some(3000));
        assert_eq!(parse_port("0"), None);
        assert_eq!(parse_port("not-a-port"), None);
    }

    #[test]
    fn timeouts_parse_from_milliseconds() {
        assert_eq!(parse_timeout_ms("30000"), Some(Duration::from_secs(30)));
        assert_eq!(parse_timeout_ms("0"), None);
        assert_eq!(parse_timeout_ms("soon"), None);
    }

    #[test]
    fn defaults_match_the_documented_topology() {
        let config = RelayConfig::default();
        assert_eq!(config.http_port, 3000);
        assert_eq!(config.ws_port, 8081);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }
}
