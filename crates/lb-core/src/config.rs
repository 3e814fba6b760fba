//! Configuration management
//!
//! 設定は以下の優先順位で読み込まれます:
//! 1. 環境変数
//! 2. line-bridge.toml 設定ファイル
//! 3. デフォルト値
//!
//! 設定ファイル内では `${VAR_NAME}` 形式で環境変数を展開できます。

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default configuration file name
pub const DEFAULT_CONFIG_PATH: &str = "line-bridge.toml";

/// Per-bot configuration of a channel module
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Enable or disable this channel for the bot
    #[serde(default)]
    pub enabled: bool,

    /// Channel access token used for the messaging API
    #[serde(default)]
    pub channel_access_token: String,

    /// Channel secret used to sign webhook requests
    #[serde(default)]
    pub channel_secret: String,
}

impl ChannelConfig {
    /// Both credentials are present
    pub fn has_credentials(&self) -> bool {
        !self.channel_access_token.is_empty() && !self.channel_secret.is_empty()
    }
}

/// Source of per-bot module configuration
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Load the configuration of `module` for `bot_id`
    ///
    /// Bots without an entry get the default (disabled) configuration.
    async fn channel_config(&self, module: &str, bot_id: &str) -> Result<ChannelConfig>;
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port the webhook server listens on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Externally reachable base URL, used to print webhook URLs
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            public_url: default_public_url(),
        }
    }
}

/// LINE Messaging API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineApiConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

impl Default for LineApiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
        }
    }
}

/// In-process host behaviour
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostConfig {
    /// Answer every incoming text event with the same text
    #[serde(default)]
    pub echo: bool,
}

/// Main configuration for line-bridge
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub line: LineApiConfig,

    #[serde(default)]
    pub host: HostConfig,

    /// bot id -> module name -> module configuration
    #[serde(default)]
    pub bots: BTreeMap<String, HashMap<String, ChannelConfig>>,
}

fn default_port() -> u16 {
    3000
}

fn default_public_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_api_base_url() -> String {
    "https://api.line.me/v2".to_string()
}

impl GatewayConfig {
    /// 文字列中の `${VAR_NAME}` を環境変数の値に置換する
    ///
    /// 環境変数が存在しない場合は空文字列になります。
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::with_capacity(value.len());
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next(); // '{' を消費

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// パース済みの値に含まれる文字列を再帰的に展開する
    fn expand_string_values(value: &mut toml::Value) {
        match value {
            toml::Value::String(s) => *s = Self::expand_env_vars(s),
            toml::Value::Array(items) => items.iter_mut().for_each(Self::expand_string_values),
            toml::Value::Table(table) => {
                for (_, item) in table.iter_mut() {
                    Self::expand_string_values(item);
                }
            }
            _ => {}
        }
    }

    /// TOML 文字列から設定を読み込む (環境変数展開あり)
    ///
    /// 展開はパース後の文字列値に対して行うため、値に `"` や `\` が
    /// 含まれていても TOML の構文は壊れません。
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut value: toml::Value = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        Self::expand_string_values(&mut value);
        value
            .try_into::<Self>()
            .map_err(|e| Error::Config(format!("Invalid configuration: {}", e)))
    }

    /// TOML 設定ファイルから設定を読み込む
    ///
    /// 環境変数による上書きも適用されます。
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// 設定を読み込む
    ///
    /// `path` が指定されていればそのファイルを必須とし、指定がなければ
    /// `./line-bridge.toml` を探します。見つからない場合は環境変数のみ。
    pub fn load(path: Option<&str>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_toml_file(path);
        }

        if Path::new(DEFAULT_CONFIG_PATH).exists() {
            return Self::from_toml_file(DEFAULT_CONFIG_PATH);
        }

        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    /// 環境変数で設定を上書きする
    fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("LB_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(url) = std::env::var("LB_PUBLIC_URL") {
            if !url.is_empty() {
                self.server.public_url = url;
            }
        }
        if let Ok(url) = std::env::var("LINE_API_BASE_URL") {
            if !url.is_empty() {
                self.line.api_base_url = url;
            }
        }
    }

    /// Ids of every bot that has a configuration section, sorted
    pub fn bot_ids(&self) -> Vec<String> {
        self.bots.keys().cloned().collect()
    }
}

#[async_trait]
impl ConfigStore for GatewayConfig {
    async fn channel_config(&self, module: &str, bot_id: &str) -> Result<ChannelConfig> {
        Ok(self
            .bots
            .get(bot_id)
            .and_then(|modules| modules.get(module))
            .cloned()
            .unwrap_or_default())
    }
}
