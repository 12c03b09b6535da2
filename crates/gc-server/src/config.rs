//! Process-wide configuration, loaded from the environment with
//! documented defaults (`spec.md` §4.1, §6).

use std::net::SocketAddr;
use std::time::Duration;

use tracing::warn;

/// Development-only JWT signing secret used when `GOCONNECT_JWT_SECRET`
/// is unset. Production deployments MUST override it (`spec.md` §4.1:
/// "a development fallback that a production deployment must override").
const DEV_JWT_SECRET: &str = "goconnect-development-secret-do-not-use-in-production";

/// Token issuance settings for [`gc_auth::JwtManager`].
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// HMAC signing secret.
    pub secret: Vec<u8>,
    /// Access token lifetime.
    pub access_ttl: Duration,
    /// Refresh token lifetime.
    pub refresh_ttl: Duration,
}

impl TokenConfig {
    /// Load from `GOCONNECT_JWT_SECRET`, falling back to a fixed
    /// development secret with a loud warning.
    #[must_use]
    pub fn from_env() -> Self {
        let secret = match std::env::var("GOCONNECT_JWT_SECRET") {
            Ok(value) if !value.is_empty() => value.into_bytes(),
            _ => {
                warn!(
                    "GOCONNECT_JWT_SECRET is unset; using the built-in development secret. \
                     This MUST be overridden before production use."
                );
                DEV_JWT_SECRET.as_bytes().to_vec()
            }
        };
        Self { secret, access_ttl: Duration::from_secs(15 * 60), refresh_ttl: Duration::from_secs(7 * 24 * 60 * 60) }
    }

    /// Override the access token TTL.
    #[must_use]
    pub const fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    /// Override the refresh token TTL.
    #[must_use]
    pub const fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// OIDC provider settings (`spec.md` §6: "Absence of any of these
/// disables OIDC entirely").
#[derive(Debug, Clone)]
pub struct OidcConfig {
    /// Provider issuer URL.
    pub issuer: String,
    /// Registered client id.
    pub client_id: String,
    /// Registered client secret.
    pub client_secret: String,
    /// Redirect URL registered with the provider.
    pub redirect_url: String,
}

impl OidcConfig {
    /// Load every field from the environment. Returns `None` (OIDC
    /// disabled) unless all four variables are present and non-empty.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let issuer = non_empty_env("GOCONNECT_OIDC_ISSUER")?;
        let client_id = non_empty_env("GOCONNECT_OIDC_CLIENT_ID")?;
        let client_secret = non_empty_env("GOCONNECT_OIDC_CLIENT_SECRET")?;
        let redirect_url = non_empty_env("GOCONNECT_OIDC_REDIRECT_URL")?;
        Some(Self { issuer, client_id, client_secret, redirect_url })
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// WebSocket gateway settings (`spec.md` §4.10).
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Address the gateway listens on.
    pub bind_addr: SocketAddr,
    /// Maximum number of concurrent live connections.
    pub max_connections: usize,
}

impl WebSocketConfig {
    /// Load the bind address from `GOCONNECT_BIND_ADDR`
    /// (default `0.0.0.0:8080`) and the connection cap from
    /// `GOCONNECT_MAX_CONNECTIONS` (default 10000).
    #[must_use]
    pub fn from_env() -> Self {
        let bind_addr = std::env::var("GOCONNECT_BIND_ADDR")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080)));
        let max_connections =
            std::env::var("GOCONNECT_MAX_CONNECTIONS").ok().and_then(|v| v.parse().ok()).unwrap_or(10_000);
        Self { bind_addr, max_connections }
    }

    /// Set the bind address.
    #[must_use]
    pub const fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the maximum connection count.
    #[must_use]
    pub const fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// WireGuard reconciler ticker settings (`spec.md` §4.8, §5).
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// How often the reconciler ticks over every network's desired peer
    /// set.
    pub tick_interval: Duration,
    /// `persistent_keepalive` advertised to newly provisioned peers that
    /// do not specify one explicitly.
    pub default_keepalive_secs: u16,
    /// How often the device-offline sweep runs.
    pub offline_sweep_interval: Duration,
    /// A device missing this many consecutive heartbeats is considered
    /// offline.
    pub offline_threshold: Duration,
}

impl ReconcilerConfig {
    /// Load from the environment with the documented defaults: 30s tick,
    /// 25s keepalive, 60s offline sweep, 90s offline threshold.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            tick_interval: env_secs("GOCONNECT_RECONCILER_TICK_SECS", 30),
            default_keepalive_secs: env_u16("GOCONNECT_DEFAULT_KEEPALIVE_SECS", 25),
            offline_sweep_interval: env_secs("GOCONNECT_OFFLINE_SWEEP_SECS", 60),
            offline_threshold: env_secs("GOCONNECT_OFFLINE_THRESHOLD_SECS", 90),
        }
    }

    /// Set the reconciler tick interval.
    #[must_use]
    pub const fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the offline sweep interval.
    #[must_use]
    pub const fn with_offline_sweep_interval(mut self, interval: Duration) -> Self {
        self.offline_sweep_interval = interval;
        self
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_secs(key: &str, default_secs: u64) -> Duration {
    Duration::from_secs(std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default_secs))
}

fn env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Top-level process configuration, composed of the sub-configs above
/// (`SPEC_FULL.md` §2.3).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Token issuance settings.
    pub tokens: TokenConfig,
    /// OIDC provider settings, `None` when disabled.
    pub oidc: Option<OidcConfig>,
    /// WebSocket gateway settings.
    pub websocket: WebSocketConfig,
    /// Reconciler and offline-sweep ticker settings.
    pub reconciler: ReconcilerConfig,
}

impl ServerConfig {
    /// Load every sub-config from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            tokens: TokenConfig::from_env(),
            oidc: OidcConfig::from_env(),
            websocket: WebSocketConfig::from_env(),
            reconciler: ReconcilerConfig::from_env(),
        }
    }

    /// Override the WebSocket config.
    #[must_use]
    pub fn with_websocket(mut self, websocket: WebSocketConfig) -> Self {
        self.websocket = websocket;
        self
    }

    /// Override the reconciler config.
    #[must_use]
    pub fn with_reconciler(mut self, reconciler: ReconcilerConfig) -> Self {
        self.reconciler = reconciler;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_config_falls_back_to_dev_secret() {
        std::env::remove_var("GOCONNECT_JWT_SECRET");
        let config = TokenConfig::from_env();
        assert_eq!(config.secret, DEV_JWT_SECRET.as_bytes());
    }

    #[test]
    fn oidc_config_disabled_when_any_field_missing() {
        std::env::remove_var("GOCONNECT_OIDC_ISSUER");
        std::env::remove_var("GOCONNECT_OIDC_CLIENT_ID");
        std::env::remove_var("GOCONNECT_OIDC_CLIENT_SECRET");
        std::env::remove_var("GOCONNECT_OIDC_REDIRECT_URL");
        assert!(OidcConfig::from_env().is_none());
    }

    #[test]
    fn websocket_config_defaults() {
        std::env::remove_var("GOCONNECT_BIND_ADDR");
        std::env::remove_var("GOCONNECT_MAX_CONNECTIONS");
        let config = WebSocketConfig::from_env();
        assert_eq!(config.bind_addr, SocketAddr::from(([0, 0, 0, 0], 8080)));
        assert_eq!(config.max_connections, 10_000);
    }

    #[test]
    fn websocket_config_builder_overrides() {
        let addr = SocketAddr::from(([127, 0, 0, 1], 9100));
        let config = WebSocketConfig::from_env().with_bind_addr(addr).with_max_connections(5);
        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn reconciler_config_defaults() {
        std::env::remove_var("GOCONNECT_RECONCILER_TICK_SECS");
        let config = ReconcilerConfig::from_env();
        assert_eq!(config.tick_interval, Duration::from_secs(30));
        assert_eq!(config.default_keepalive_secs, 25);
    }

    #[test]
    fn server_config_builder_chaining() {
        let config = ServerConfig::from_env()
            .with_websocket(WebSocketConfig::from_env().with_max_connections(1))
            .with_reconciler(ReconcilerConfig::from_env().with_tick_interval(Duration::from_secs(5)));
        assert_eq!(config.websocket.max_connections, 1);
        assert_eq!(config.reconciler.tick_interval, Duration::from_secs(5));
    }
}
