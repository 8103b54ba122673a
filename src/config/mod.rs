//! Configuration module
//!
//! Loaded from `config/default.*` (optional) and `RUTX__*` environment
//! variables, e.g. `RUTX__ROUTER__HOST=192.168.1.1`.

use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::RouterError;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub router: RouterConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub poller: PollerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_modem_id")]
    pub modem_id: String,
    /// A list in files, or a comma-separated string from the environment
    #[serde(default = "default_modem_fallbacks", deserialize_with = "string_list")]
    pub modem_fallbacks: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollerConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

/// Validated, immutable settings for one router client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
    pub modem_id: String,
    /// Modem ids tried in order when reading `/api/network/mobile`
    pub modem_priority: Vec<String>,
}

impl ClientConfig {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let modem_id = default_modem_id();
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            timeout: Duration::from_millis(default_timeout_ms()),
            modem_priority: modem_priority(&modem_id, &default_modem_fallbacks()),
            modem_id,
        }
    }

    pub fn with_modem(mut self, modem_id: impl Into<String>, fallbacks: &[String]) -> Self {
        self.modem_id = modem_id.into().trim().to_string();
        self.modem_priority = modem_priority(&self.modem_id, fallbacks);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Configured id first, then fallbacks; first occurrence wins
pub fn modem_priority(modem_id: &str, fallbacks: &[String]) -> Vec<String> {
    let mut ids: Vec<String> = Vec::with_capacity(fallbacks.len() + 1);
    for id in std::iter::once(modem_id).chain(fallbacks.iter().map(String::as_str)) {
        let id = id.trim();
        if !id.is_empty() && !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
    }
    ids
}

fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringList {
        List(Vec<String>),
        Joined(String),
    }

    Ok(match StringList::deserialize(deserializer)? {
        StringList::List(ids) => ids,
        StringList::Joined(joined) => joined
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(String::from)
            .collect(),
    })
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_modem_id() -> String {
    "2-1".to_string()
}

fn default_modem_fallbacks() -> Vec<String> {
    vec!["2-1".to_string(), "1-1".to_string()]
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8082
}

fn default_interval_secs() -> u64 {
    60
}

impl Config {
    /// Environment values stay strings so credentials like `0123` survive;
    /// numeric fields are converted during deserialization.
    pub fn load() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("RUTX").separator("__"))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        Ok(config)
    }

    /// Validate router settings into a client configuration
    pub fn client_config(&self) -> Result<ClientConfig, RouterError> {
        let r = &self.router;

        if r.host.trim().is_empty() || r.username.is_empty() || r.password.is_empty() {
            return Err(RouterError::Config(
                "Router host, username and password must be configured".to_string(),
            ));
        }
        if r.modem_id.trim().is_empty() {
            return Err(RouterError::Config("modem_id must not be empty".to_string()));
        }
        if r.timeout_ms == 0 {
            return Err(RouterError::Config(
                "timeout_ms must be greater than zero".to_string(),
            ));
        }

        Ok(ClientConfig::new(r.host.trim(), r.username.clone(), r.password.clone())
            .with_timeout(Duration::from_millis(r.timeout_ms))
            .with_modem(r.modem_id.trim(), &r.modem_fallbacks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router_config(host: &str, username: &str, password: &str) -> Config {
        Config {
            router: RouterConfig {
                host: host.to_string(),
                username: username.to_string(),
                password: password.to_string(),
                timeout_ms: default_timeout_ms(),
                modem_id: default_modem_id(),
                modem_fallbacks: default_modem_fallbacks(),
            },
            server: ServerConfig::default(),
            poller: PollerConfig::default(),
        }
    }

    #[test]
    fn test_default_modem_priority() {
        let cfg = ClientConfig::new("192.168.1.1", "admin", "secret");
        assert_eq!(cfg.modem_id, "2-1");
        assert_eq!(cfg.modem_priority, vec!["2-1", "1-1"]);
    }

    #[test]
    fn test_configured_modem_goes_first() {
        let fallbacks = default_modem_fallbacks();
        assert_eq!(modem_priority("3-1", &fallbacks), vec!["3-1", "2-1", "1-1"]);
        assert_eq!(modem_priority("1-1", &fallbacks), vec!["1-1", "2-1"]);
        assert_eq!(modem_priority("", &fallbacks), vec!["2-1", "1-1"]);
    }

    #[test]
    fn test_client_config_requires_credentials() {
        assert!(router_config("192.168.1.1", "admin", "").client_config().is_err());
        assert!(router_config("", "admin", "pw").client_config().is_err());
        assert!(router_config("  ", "admin", "pw").client_config().is_err());

        let cfg = router_config(" 192.168.1.1 ", "admin", "pw")
            .client_config()
            .unwrap();
        assert_eq!(cfg.host, "192.168.1.1");
        assert_eq!(cfg.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_client_config_rejects_zero_timeout() {
        let mut config = router_config("192.168.1.1", "admin", "pw");
        config.router.timeout_ms = 0;
        let err = config.client_config().unwrap_err();
        assert!(matches!(err, RouterError::Config(_)));
    }

    #[test]
    fn test_client_config_trims_modem_id() {
        let mut config = router_config("192.168.1.1", "admin", "pw");
        config.router.modem_id = " 1-1 ".to_string();
        let cfg = config.client_config().unwrap();
        assert_eq!(cfg.modem_id, "1-1");
        assert_eq!(cfg.modem_priority, vec!["1-1", "2-1"]);

        config.router.modem_id = "  ".to_string();
        let err = config.client_config().unwrap_err();
        assert!(matches!(err, RouterError::Config(_)));
    }

    #[test]
    fn test_load_from_env_keeps_credentials_verbatim() {
        let vars = [
            ("RUTX__ROUTER__HOST", "192.168.1.1"),
            ("RUTX__ROUTER__USERNAME", "007"),
            ("RUTX__ROUTER__PASSWORD", "0123"),
            ("RUTX__ROUTER__TIMEOUT_MS", "5000"),
            ("RUTX__ROUTER__MODEM_FALLBACKS", "1-1, 3-1"),
            ("RUTX__POLLER__INTERVAL_SECS", "15"),
        ];
        for (key, val) in vars {
            std::env::set_var(key, val);
        }

        let loaded = Config::load();
        for (key, _) in vars {
            std::env::remove_var(key);
        }

        let config = loaded.unwrap();
        assert_eq!(config.router.username, "007");
        assert_eq!(config.router.password, "0123");
        assert_eq!(config.router.timeout_ms, 5000);
        assert_eq!(config.router.modem_fallbacks, vec!["1-1", "3-1"]);
        assert_eq!(config.poller.interval_secs, 15);
        assert_eq!(config.client_config().unwrap().password, "0123");
    }

    #[test]
    fn test_modem_fallbacks_from_file_list() {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(
                "[router]\nhost = \"192.168.1.1\"\nmodem_fallbacks = [\"1-1\"]\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let config: Config = settings.try_deserialize().unwrap();
        assert_eq!(config.router.modem_fallbacks, vec!["1-1"]);
    }
}
