// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the portfolio gate.
//!
//! Values are layered: built-in defaults, an optional config file, `PORTFOLIO_*`
//! environment variables (nested keys separated by `__`), and finally the
//! legacy `PORT`, `EMAIL_USER` and `EMAIL_PASSWORD` variables.

use config::ConfigError;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

/// Environment variable naming an alternative config file.
pub const CONFIG_FILE_VAR: &str = "PORTFOLIO_CONFIG";

const DEFAULT_CONFIG_FILE: &str = "portfolio-gate";

/// Paths the router always mounts.
pub const RESERVED_PATHS: &[&str] = &[
    "/",
    "/access",
    "/access-denied",
    "/api/check-status",
    "/api/contact",
    "/mobile",
    "/health",
    "/ping",
    "/favicon.ico",
];

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:3000)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Deployment environment; controls cookie `Secure` and error detail
    #[serde(default)]
    pub environment: Environment,

    /// Public base URL used when printing access links
    #[serde(default)]
    pub public_url: Option<String>,

    #[serde(default)]
    pub access: AccessConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub mail: MailConfig,

    #[serde(default)]
    pub static_files: StaticFilesConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// Access gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Tokens valid from startup, never evicted
    #[serde(default)]
    pub seed_tokens: Vec<String>,

    /// Paths reachable without a token
    #[serde(default = "default_exempt_paths")]
    pub exempt_paths: Vec<String>,

    /// Name of the access cookie (default: access_token)
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Cookie lifetime in days, renewed on every granted request (default: 30)
    #[serde(default = "default_cookie_max_age_days")]
    pub cookie_max_age_days: i64,

    /// Upper bound on issued tokens; least recently used non-seed tokens are
    /// evicted beyond it. Unbounded when unset.
    #[serde(default)]
    pub max_tokens: Option<usize>,

    /// Whether `/mobile` hands out fresh tokens (default: true)
    #[serde(default = "default_true")]
    pub mobile_enabled: bool,

    /// User-Agent fragments identifying in-app browsers that drop cookies
    #[serde(default = "default_embedded_browser_markers")]
    pub embedded_browser_markers: Vec<String>,
}

/// Contact form cooldown configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Server-side cooldown between accepted submissions (default: 12h)
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Client-mirror cooldown keyed by browser fingerprint (default: 1h)
    #[serde(default = "default_advisory_window_ms")]
    pub advisory_window_ms: u64,

    /// Key clients by the first X-Forwarded-For hop instead of the peer address
    #[serde(default)]
    pub trust_forwarded_for: bool,

    /// Interval between sweeps of expired entries in seconds (default: 300)
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

/// SMTP relay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default = "default_smtp_host")]
    pub host: String,

    #[serde(default = "default_smtp_port")]
    pub port: u16,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Recipient of contact messages; falls back to `username`
    #[serde(default)]
    pub recipient: Option<String>,

    /// Display name on the From header
    #[serde(default = "default_from_name")]
    pub from_name: String,
}

/// Static site configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticFilesConfig {
    /// Directory holding index.html and assets (default: public)
    #[serde(default = "default_static_root")]
    pub root: String,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_exempt_paths() -> Vec<String> {
    [
        "/access",
        "/access-denied",
        "/api/contact",
        "/api/check-status",
        "/mobile",
        "/health",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

fn default_cookie_name() -> String {
    "access_token".to_string()
}

fn default_cookie_max_age_days() -> i64 {
    30
}

fn default_embedded_browser_markers() -> Vec<String> {
    vec!["FB_IAB".to_string(), "FBAN".to_string()]
}

fn default_window_ms() -> u64 {
    12 * 60 * 60 * 1000
}

fn default_advisory_window_ms() -> u64 {
    60 * 60 * 1000
}

fn default_cleanup_interval_secs() -> u64 {
    300
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    465
}

fn default_from_name() -> String {
    "Portfolio Contact".to_string()
}

fn default_static_root() -> String {
    "public".to_string()
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            environment: Environment::default(),
            public_url: None,
            access: AccessConfig::default(),
            rate_limit: RateLimitConfig::default(),
            mail: MailConfig::default(),
            static_files: StaticFilesConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            seed_tokens: Vec::new(),
            exempt_paths: default_exempt_paths(),
            cookie_name: default_cookie_name(),
            cookie_max_age_days: default_cookie_max_age_days(),
            max_tokens: None,
            mobile_enabled: default_true(),
            embedded_browser_markers: default_embedded_browser_markers(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            advisory_window_ms: default_advisory_window_ms(),
            trust_forwarded_for: false,
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            recipient: None,
            from_name: default_from_name(),
        }
    }
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            root: default_static_root(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl Config {
    /// Load configuration from `.env`, the optional config file and the
    /// process environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let file = std::env::var(CONFIG_FILE_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let port = std::env::var("PORT").ok().map(|p| format!("0.0.0.0:{p}"));

        let config = config::Config::builder()
            .add_source(config::File::with_name(&file).required(false))
            .add_source(
                config::Environment::with_prefix("PORTFOLIO")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("access.seed_tokens")
                    .with_list_parse_key("access.exempt_paths")
                    .with_list_parse_key("access.embedded_browser_markers"),
            )
            .set_override_option("bind_addr", port)?
            .set_override_option("mail.username", std::env::var("EMAIL_USER").ok())?
            .set_override_option("mail.password", std::env::var("EMAIL_PASSWORD").ok())?
            .build()?
            .try_deserialize::<Self>()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the router cannot mount.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metrics.enabled {
            self.metrics.check_path()?;
        }
        Ok(())
    }

    /// Base URL for printed access links: `public_url`, else the LAN
    /// address, else localhost.
    pub fn access_base_url(&self, lan: Option<IpAddr>, port: u16) -> String {
        if let Some(url) = &self.public_url {
            return url.trim_end_matches('/').to_string();
        }
        match lan {
            Some(IpAddr::V6(ip)) => format!("http://[{ip}]:{port}"),
            Some(ip) => format!("http://{ip}:{port}"),
            None => format!("http://localhost:{port}"),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Whether internal error messages may be returned to clients.
    pub fn expose_errors(&self) -> bool {
        !self.is_production()
    }

    /// Port component of the bind address, if it parses.
    pub fn port(&self) -> Option<u16> {
        self.bind_addr
            .rsplit_once(':')
            .and_then(|(_, port)| port.parse().ok())
    }

    pub fn is_exempt(&self, path: &str) -> bool {
        self.access.exempt_paths.iter().any(|p| p == path)
    }
}

impl AccessConfig {
    pub fn cookie_max_age(&self) -> time::Duration {
        time::Duration::days(self.cookie_max_age_days)
    }

    pub fn is_embedded_browser(&self, user_agent: &str) -> bool {
        self.embedded_browser_markers
            .iter()
            .any(|marker| user_agent.contains(marker.as_str()))
    }
}

impl RateLimitConfig {
    /// Authoritative server-side cooldown window.
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Advisory client-mirror cooldown window.
    pub fn advisory_window(&self) -> Duration {
        Duration::from_millis(self.advisory_window_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }
}

impl MetricsConfig {
    /// The path must be absolute, literal and not shadow another route.
    pub fn check_path(&self) -> Result<(), ConfigError> {
        let path = self.path.as_str();
        if !path.starts_with('/') {
            return Err(ConfigError::Message(format!(
                "metrics.path must start with '/': {path:?}"
            )));
        }
        if path.contains([':', '*', '{', '}']) {
            return Err(ConfigError::Message(format!(
                "metrics.path must not contain route parameters: {path:?}"
            )));
        }
        if RESERVED_PATHS.contains(&path) {
            return Err(ConfigError::Message(format!(
                "metrics.path collides with an existing route: {path:?}"
            )));
        }
        Ok(())
    }
}

impl MailConfig {
    pub fn recipient(&self) -> &str {
        self.recipient.as_deref().unwrap_or(&self.username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_windows_are_separate() {
        let config = RateLimitConfig::default();
        assert_eq!(config.window(), Duration::from_secs(12 * 3600));
        assert_eq!(config.advisory_window(), Duration::from_secs(3600));
    }

    #[test]
    fn test_default_exemptions() {
        let config = Config::default();
        assert!(config.is_exempt("/access"));
        assert!(config.is_exempt("/access-denied"));
        assert!(config.is_exempt("/api/contact"));
        assert!(config.is_exempt("/api/check-status"));
        assert!(config.is_exempt("/health"));
        assert!(!config.is_exempt("/"));
        assert!(!config.is_exempt("/projects.html"));
    }

    #[test]
    fn test_embedded_browser_markers() {
        let access = AccessConfig::default();
        assert!(access.is_embedded_browser("Mozilla/5.0 [FBAN/FBIOS;FBAV/400.0]"));
        assert!(access.is_embedded_browser("Mozilla/5.0 FB_IAB/FB4A"));
        assert!(!access.is_embedded_browser("Mozilla/5.0 (X11; Linux x86_64) Firefox/128.0"));
    }

    #[test]
    fn test_port_and_environment() {
        let config = Config {
            bind_addr: "127.0.0.1:4100".to_string(),
            environment: Environment::Production,
            ..Default::default()
        };
        assert_eq!(config.port(), Some(4100));
        assert!(config.is_production());
        assert!(!config.expose_errors());
    }

    #[test]
    fn test_recipient_falls_back_to_username() {
        let mail = MailConfig {
            username: "owner@example.com".to_string(),
            ..Default::default()
        };
        assert_eq!(mail.recipient(), "owner@example.com");
    }

    #[test]
    fn test_metrics_path_checks() {
        assert!(Config::default().validate().is_ok());

        for bad in ["metrics", "/health", "/", "/api/contact", "/:name", "/stats/*rest"] {
            let mut config = Config::default();
            config.metrics.path = bad.to_string();
            assert!(
                matches!(config.validate(), Err(ConfigError::Message(_))),
                "{bad} accepted"
            );
        }

        let mut config = Config::default();
        config.metrics.path = "/health".to_string();
        config.metrics.enabled = false;
        assert!(config.validate().is_ok());

        config.metrics.enabled = true;
        config.metrics.path = "/internal/metrics".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_access_base_url() {
        let mut config = Config::default();
        let lan: IpAddr = "192.168.1.20".parse().unwrap();
        assert_eq!(config.access_base_url(Some(lan), 3000), "http://192.168.1.20:3000");
        assert_eq!(config.access_base_url(None, 3000), "http://localhost:3000");

        config.public_url = Some("https://portfolio.example.com/".to_string());
        assert_eq!(
            config.access_base_url(Some(lan), 3000),
            "https://portfolio.example.com"
        );
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"rate_limit": {"window_ms": 1000}}"#).unwrap();
        assert_eq!(config.rate_limit.window_ms, 1000);
        assert_eq!(config.rate_limit.advisory_window_ms, 3_600_000);
        assert_eq!(config.access.cookie_name, "access_token");
        assert_eq!(config.access.cookie_max_age_days, 30);
    }
}
