use std::{fs, net::SocketAddr, path::Path};

use hr_bot_commons::parse_recipient;
use serde::Deserialize;
use teloxide::types::{Recipient, UserId};
use url::Url;

const DEFAULT_CONFIG_PATH: &str = "hr_bot.toml";
const DEFAULT_DATABASE_URL: &str = "sqlite:hr_bot.sqlite";
const DEFAULT_DAILY_LIMIT: u32 = 3;
const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
const DEFAULT_LLM_TEMPERATURE: f32 = 0.2;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("can't read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("config file is not valid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("`{0}` is not set in the config file or environment")]
    Missing(&'static str),
    #[error("`{key}` has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("`webhook_url` and `webhook_addr` must be set together")]
    HalfConfiguredWebhook,
}

/// Shape of `hr_bot.toml`. Every field is optional here; [`Config`] is what
/// you get after environment overrides and validation.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    bot_token: Option<String>,
    admin_id: Option<u64>,
    channel: Option<String>,
    channel_url: Option<Url>,
    database_url: Option<String>,
    daily_limit: Option<u32>,
    require_subscription: Option<bool>,
    dashboard_addr: Option<SocketAddr>,
    webhook_url: Option<Url>,
    webhook_addr: Option<SocketAddr>,
    llm: FileLlmConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileLlmConfig {
    api_key: Option<String>,
    base_url: Option<Url>,
    model: Option<String>,
    temperature: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Public URL Telegram will post updates to.
    pub url: Url,
    /// Local address to listen on.
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Without a key the interview feature is off.
    pub api_key: Option<String>,
    pub base_url: Url,
    pub model: String,
    pub temperature: f32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    /// The one user allowed into the admin panel.
    pub admin_id: UserId,
    /// Channel vacancies get posted to.
    pub channel: Recipient,
    /// Link to the channel for "subscribe" buttons, if one is known.
    pub channel_url: Option<Url>,
    pub database_url: String,
    /// Most vacancy notifications a single user gets per day.
    pub daily_limit: u32,
    /// Only let channel members past `/start`.
    pub require_subscription: bool,
    pub dashboard_addr: Option<SocketAddr>,
    /// Long polling is used if this is [`None`].
    pub webhook: Option<WebhookConfig>,
    pub llm: LlmConfig,
}

impl Config {
    /// Load config from `hr_bot.toml` (or whatever `HR_BOT_CONFIG` points at),
    /// then apply environment overrides. If the token isn't set anywhere,
    /// it's read from the `key` file (`key_debug` in debug builds).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|name| std::env::var(name).ok())
    }

    /// [`Self::load`] with a custom environment lookup.
    fn load_with(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let path = env("HR_BOT_CONFIG").unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        let file = if Path::new(&path).exists() {
            Some(fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?)
        } else {
            log::info!("No config file at {path}, using environment only.");
            None
        };

        let key_file = fs::read_to_string(match cfg!(debug_assertions) {
            true => "key_debug",
            false => "key",
        })
        .ok();

        Self::from_sources(file.as_deref(), &env, key_file)
    }

    /// Build a config from TOML text, an environment lookup and key file contents.
    /// Environment wins over the file, the file wins over the key file.
    pub fn from_sources(
        file: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
        key_file: Option<String>,
    ) -> Result<Self, ConfigError> {
        let file: FileConfig = match file {
            Some(text) => toml::from_str(text)?,
            None => FileConfig::default(),
        };

        let env = |name: &str| env(name).filter(|x| !x.trim().is_empty());

        let bot_token = env("BOT_TOKEN")
            .or(file.bot_token)
            .or(key_file)
            .map(|x| x.trim().to_string())
            .filter(|x| !x.is_empty())
            .ok_or(ConfigError::Missing("bot_token"))?;

        let admin_id = match env("ADMIN_ID") {
            Some(value) => parse_env("ADMIN_ID", &value)?,
            None => file.admin_id.ok_or(ConfigError::Missing("admin_id"))?,
        };

        let channel_raw = env("CHANNEL_ID")
            .or(file.channel)
            .ok_or(ConfigError::Missing("channel"))?;
        let channel = parse_recipient(&channel_raw).ok_or_else(|| ConfigError::Invalid {
            key: "channel",
            value: channel_raw.clone(),
        })?;

        let channel_url = match env("CHANNEL_URL") {
            Some(value) => Some(parse_env("CHANNEL_URL", &value)?),
            None => file.channel_url,
        }
        .or_else(|| channel_link(&channel));

        let daily_limit = match env("DAILY_LIMIT") {
            Some(value) => parse_env("DAILY_LIMIT", &value)?,
            None => file.daily_limit.unwrap_or(DEFAULT_DAILY_LIMIT),
        };

        let require_subscription = match env("REQUIRE_SUBSCRIPTION") {
            Some(value) => parse_bool("REQUIRE_SUBSCRIPTION", &value)?,
            None => file.require_subscription.unwrap_or(false),
        };

        let dashboard_addr = match env("DASHBOARD_ADDR") {
            Some(value) => Some(parse_env("DASHBOARD_ADDR", &value)?),
            None => file.dashboard_addr,
        };

        let webhook_url = match env("WEBHOOK_URL") {
            Some(value) => Some(parse_env("WEBHOOK_URL", &value)?),
            None => file.webhook_url,
        };
        let webhook_addr = match env("WEBHOOK_ADDR") {
            Some(value) => Some(parse_env("WEBHOOK_ADDR", &value)?),
            None => file.webhook_addr,
        };
        let webhook = match (webhook_url, webhook_addr) {
            (Some(url), Some(addr)) => Some(WebhookConfig { url, addr }),
            (None, None) => None,
            _ => return Err(ConfigError::HalfConfiguredWebhook),
        };

        let llm = LlmConfig {
            api_key: env("OPENAI_API_KEY").or(file.llm.api_key),
            base_url: match env("OPENAI_BASE_URL") {
                Some(value) => parse_env("OPENAI_BASE_URL", &value)?,
                None => match file.llm.base_url {
                    Some(url) => url,
                    None => parse_env("llm.base_url", DEFAULT_LLM_BASE_URL)?,
                },
            },
            model: env("OPENAI_MODEL")
                .or(file.llm.model)
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            temperature: file
                .llm
                .temperature
                .unwrap_or(DEFAULT_LLM_TEMPERATURE)
                .clamp(0.0, 2.0),
        };

        Ok(Config {
            bot_token,
            admin_id: UserId(admin_id),
            channel,
            channel_url,
            database_url: env("DATABASE_URL")
                .or(file.database_url)
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            daily_limit,
            require_subscription,
            dashboard_addr,
            webhook,
            llm,
        })
    }

    pub fn is_admin(&self, user: UserId) -> bool {
        user == self.admin_id
    }
}

fn parse_env<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        }),
    }
}

/// `@channel` is reachable at `https://t.me/channel`. Numeric IDs aren't linkable.
fn channel_link(channel: &Recipient) -> Option<Url> {
    match channel {
        Recipient::ChannelUsername(name) => {
            Url::parse(&format!("https://t.me/{}", name.trim_start_matches('@'))).ok()
        }
        Recipient::Id(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, io::Write};

    use teloxide::types::ChatId;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn file_with_defaults() {
        let config = Config::from_sources(
            Some(
                r#"
bot_token = "123:abc"
admin_id = 5108587018
channel = "@HR_JOB_s"
"#,
            ),
            env_of(&[]),
            None,
        )
        .unwrap();

        assert_eq!(config.bot_token, "123:abc");
        assert_eq!(config.admin_id, UserId(5108587018));
        assert_eq!(
            config.channel,
            Recipient::ChannelUsername("@HR_JOB_s".to_string())
        );
        assert_eq!(
            config.channel_url.as_ref().map(Url::as_str),
            Some("https://t.me/HR_JOB_s")
        );
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.daily_limit, 3);
        assert!(!config.require_subscription);
        assert!(config.webhook.is_none());
        assert!(config.llm.api_key.is_none());
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert!(config.is_admin(UserId(5108587018)));
        assert!(!config.is_admin(UserId(1)));
    }

    #[test]
    fn environment_overrides_file() {
        let config = Config::from_sources(
            Some("bot_token = \"from_file\"\nadmin_id = 1\nchannel = \"@a\"\n[llm]\nmodel = \"m\"\n"),
            env_of(&[
                ("BOT_TOKEN", "from_env"),
                ("ADMIN_ID", "42"),
                ("CHANNEL_ID", "-1001652876751"),
                ("DAILY_LIMIT", "5"),
                ("REQUIRE_SUBSCRIPTION", "yes"),
                ("OPENAI_API_KEY", "sk-test"),
            ]),
            Some("from_key_file\n".to_string()),
        )
        .unwrap();

        assert_eq!(config.bot_token, "from_env");
        assert_eq!(config.admin_id, UserId(42));
        assert_eq!(config.channel, Recipient::Id(ChatId(-1001652876751)));
        assert!(config.channel_url.is_none());
        assert_eq!(config.daily_limit, 5);
        assert!(config.require_subscription);
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.llm.model, "m");
    }

    #[test]
    fn key_file_is_the_last_resort() {
        let config = Config::from_sources(
            None,
            env_of(&[("ADMIN_ID", "1"), ("CHANNEL_ID", "@c")]),
            Some("  token_from_file \n".to_string()),
        )
        .unwrap();
        assert_eq!(config.bot_token, "token_from_file");
    }

    #[test]
    fn validation_errors() {
        let missing = Config::from_sources(None, env_of(&[("ADMIN_ID", "1")]), None);
        assert!(matches!(missing, Err(ConfigError::Missing("bot_token"))));

        let bad_admin = Config::from_sources(
            None,
            env_of(&[("BOT_TOKEN", "t"), ("ADMIN_ID", "me"), ("CHANNEL_ID", "@c")]),
            None,
        );
        assert!(matches!(
            bad_admin,
            Err(ConfigError::Invalid { key: "ADMIN_ID", .. })
        ));

        let half_webhook = Config::from_sources(
            None,
            env_of(&[
                ("BOT_TOKEN", "t"),
                ("ADMIN_ID", "1"),
                ("CHANNEL_ID", "@c"),
                ("WEBHOOK_URL", "https://example.com/hook"),
            ]),
            None,
        );
        assert!(matches!(
            half_webhook,
            Err(ConfigError::HalfConfiguredWebhook)
        ));

        let unknown_key = Config::from_sources(Some("bogus = 1"), env_of(&[]), None);
        assert!(matches!(unknown_key, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn loads_the_file_named_in_the_environment() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "bot_token = \"t\"\nadmin_id = 7\nchannel = \"@jobs\"\nwebhook_url = \"https://example.com/hook\"\nwebhook_addr = \"127.0.0.1:8443\""
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = Config::load_with(env_of(&[
            ("HR_BOT_CONFIG", path.as_str()),
            ("DAILY_LIMIT", "9"),
        ]))
        .unwrap();
        assert_eq!(config.bot_token, "t");
        assert_eq!(config.admin_id, UserId(7));
        assert_eq!(config.daily_limit, 9);
        let webhook = config.webhook.unwrap();
        assert_eq!(webhook.url.as_str(), "https://example.com/hook");
        assert_eq!(webhook.addr, "127.0.0.1:8443".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap().to_string();
        // A directory exists but can't be read as a file.
        let result = Config::load_with(env_of(&[("HR_BOT_CONFIG", path.as_str())]));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn example_file_is_valid() {
        let config = Config::from_sources(
            Some(include_str!("../hr_bot.example.toml")),
            env_of(&[]),
            None,
        )
        .unwrap();
        assert_eq!(config.admin_id, UserId(5108587018));
        assert!(config.dashboard_addr.is_none());
        assert!(config.llm.api_key.is_none());
    }
}
