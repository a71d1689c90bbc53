use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub line: LineConfig,

    #[serde(default)]
    pub gemini: GeminiConfig,

    #[serde(default)]
    pub http: HTTPConfig,

    #[cfg(feature = "sentry")]
    #[serde(default)]
    pub sentry: Option<SentryConfig>,
}
impl AppConfig {
    /// Loads the TOML config file, applies environment overrides and validates.
    /// An explicitly passed path must exist; the default `config.toml` is optional
    /// so that pure-environment deployments work without any file.
    pub fn load(config_filepath: Option<PathBuf>) -> Result<Self> {
        let mut config = match config_filepath {
            Some(path) => Self::parse_file(&path)?,
            None => {
                let default_path = PathBuf::from("config.toml");
                if default_path.exists() {
                    Self::parse_file(&default_path)?
                } else {
                    Self::empty()
                }
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn parse_file(config_path: &PathBuf) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {config_path:?}"))?;

        toml::from_str(&config_content)
            .with_context(|| format!("Failed to parse TOML config file: {config_path:?}"))
    }

    fn empty() -> Self {
        Self {
            line: LineConfig::default(),
            gemini: GeminiConfig::default(),
            http: HTTPConfig::default(),

            #[cfg(feature = "sentry")]
            sentry: None,
        }
    }

    /// Secrets can always be supplied from the environment, which wins over
    /// any file value.
    fn apply_env_overrides(&mut self) {
        if let Some(value) = read_env("FOODBOT_LINE_CHANNEL_SECRET") {
            self.line.channel_secret = value;
        }
        if let Some(value) = read_env("FOODBOT_LINE_CHANNEL_ACCESS_TOKEN") {
            self.line.channel_access_token = value;
        }
        if let Some(value) = read_env("FOODBOT_GEMINI_API_KEY") {
            self.gemini.api_key = Some(value);
        }
        if let Some(value) = read_env("FOODBOT_GEMINI_MODEL") {
            self.gemini.model = value;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.line.channel_secret.trim().is_empty() {
            bail!("line.channel_secret is required (or set FOODBOT_LINE_CHANNEL_SECRET). Get it from the LINE Developers console > Basic settings.");
        }
        if self.line.channel_access_token.trim().is_empty() {
            bail!("line.channel_access_token is required (or set FOODBOT_LINE_CHANNEL_ACCESS_TOKEN). Issue one from the LINE Developers console > Messaging API.");
        }
        if self.line.timeout_secs == 0 || self.line.timeout_secs > 300 {
            bail!("line.timeout_secs must be in range 1..=300");
        }
        if self.gemini.timeout_secs == 0 || self.gemini.timeout_secs > 300 {
            bail!("gemini.timeout_secs must be in range 1..=300");
        }

        // A missing Gemini key is valid: the recommendation path is disabled
        // fail-closed and queries get a service-unavailable reply instead.
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineConfig {
    #[serde(default)]
    pub channel_secret: String,

    #[serde(default)]
    pub channel_access_token: String,

    #[serde(default = "default_line_api_base")]
    pub api_base: String,

    #[serde(default = "default_line_timeout")]
    pub timeout_secs: u64,
}
impl Default for LineConfig {
    fn default() -> Self {
        Self {
            channel_secret: String::new(),
            channel_access_token: String::new(),
            api_base: default_line_api_base(),
            timeout_secs: default_line_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_gemini_model")]
    pub model: String,

    #[serde(default = "default_gemini_api_base")]
    pub api_base: String,

    #[serde(default = "default_gemini_timeout")]
    pub timeout_secs: u64,
}
impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_gemini_model(),
            api_base: default_gemini_api_base(),
            timeout_secs: default_gemini_timeout(),
        }
    }
}

#[cfg(feature = "sentry")]
#[derive(Debug, Deserialize)]
pub struct SentryConfig {
    pub dsn: String,

    #[serde(default)]
    pub environment: Option<String>,

    #[serde(default)]
    pub server_name: Option<String>,

    #[serde(default)]
    pub debug: bool,

    #[serde(default = "default_true")]
    pub send_default_pii: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HTTPConfig {
    #[serde(default = "default_http_address")]
    pub address: SocketAddr,

    #[serde(default = "default_true")]
    pub require_authentication: bool,

    #[serde(default)]
    pub tls: Option<TLSConfig>,
}
impl Default for HTTPConfig {
    fn default() -> Self {
        Self {
            address: default_http_address(),
            require_authentication: default_true(),
            tls: None,
        }
    }
}

#[cfg_attr(
    not(any(feature = "tls-rustls", feature = "tls-native")),
    allow(dead_code)
)]
#[derive(Debug, Clone, Deserialize)]
pub struct TLSConfig {
    #[serde(deserialize_with = "deserialize_existing_file")]
    pub certificate_path: PathBuf,

    #[serde(deserialize_with = "deserialize_existing_file")]
    pub key_path: PathBuf,
}

fn default_line_api_base() -> String {
    "https://api.line.me".to_string()
}
fn default_line_timeout() -> u64 {
    10
}
fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}
fn default_gemini_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_gemini_timeout() -> u64 {
    30
}
fn default_true() -> bool {
    true
}
fn default_http_address() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 3000)
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn deserialize_existing_file<'de, D>(deserializer: D) -> Result<PathBuf, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let path = PathBuf::deserialize(deserializer)?;
    if !path.exists() {
        return Err(serde::de::Error::custom(format!(
            "File does not exist: {}",
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(serde::de::Error::custom(format!(
            "Path is not a file: {}",
            path.display()
        )));
    }
    Ok(path)
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: AppConfig = toml::from_str("").expect("empty config should parse");

        assert_eq!(config.line.api_base, "https://api.line.me");
        assert_eq!(config.line.timeout_secs, 10);
        assert_eq!(config.gemini.model, "gemini-1.5-flash");
        assert_eq!(config.gemini.timeout_secs, 30);
        assert!(config.gemini.api_key.is_none());
        assert_eq!(config.http.address.port(), 3000);
        assert!(config.http.require_authentication);
        assert!(config.http.tls.is_none());
    }

    #[test]
    fn test_validation_requires_line_secrets() {
        let config: AppConfig = toml::from_str("").expect("empty config should parse");
        let error = config.validate().expect_err("missing secrets must fail");
        assert!(error.to_string().contains("line.channel_secret"));

        let config: AppConfig = toml::from_str(
            r#"
            [line]
            channel_secret = "secret"
            "#,
        )
        .expect("config should parse");
        let error = config.validate().expect_err("missing token must fail");
        assert!(error.to_string().contains("line.channel_access_token"));
    }

    #[test]
    fn test_missing_gemini_key_is_valid() {
        let config: AppConfig = toml::from_str(
            r#"
            [line]
            channel_secret = "secret"
            channel_access_token = "token"
            "#,
        )
        .expect("config should parse");

        // Fail-closed: valid config, recommendations disabled.
        config.validate().expect("missing gemini key is allowed");
        assert!(config.gemini.api_key.is_none());
    }

    #[test]
    fn test_timeout_bounds() {
        let config: AppConfig = toml::from_str(
            r#"
            [line]
            channel_secret = "secret"
            channel_access_token = "token"

            [gemini]
            timeout_secs = 0
            "#,
        )
        .expect("config should parse");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides_win_over_file() {
        env::set_var("FOODBOT_LINE_CHANNEL_SECRET", "env-secret");
        env::set_var("FOODBOT_LINE_CHANNEL_ACCESS_TOKEN", "env-token");
        env::set_var("FOODBOT_GEMINI_API_KEY", "env-key");

        let mut config: AppConfig = toml::from_str(
            r#"
            [line]
            channel_secret = "file-secret"
            channel_access_token = "file-token"
            "#,
        )
        .expect("config should parse");
        config.apply_env_overrides();

        assert_eq!(config.line.channel_secret, "env-secret");
        assert_eq!(config.line.channel_access_token, "env-token");
        assert_eq!(config.gemini.api_key.as_deref(), Some("env-key"));

        env::remove_var("FOODBOT_LINE_CHANNEL_SECRET");
        env::remove_var("FOODBOT_LINE_CHANNEL_ACCESS_TOKEN");
        env::remove_var("FOODBOT_GEMINI_API_KEY");
    }
}
