use crate::error::ConfigError;
use crate::google::credentials::{ConfigSource, ProcessEnv};
use chrono::FixedOffset;
use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, str::FromStr, sync::LazyLock};
use url::Url;

pub static VISION_ANNOTATE_URL: LazyLock<Url> = LazyLock::new(|| {
    Url::parse("https://vision.googleapis.com/v1/images:annotate")
        .expect("valid Vision annotate URL")
});

pub static STORAGE_UPLOAD_URL: LazyLock<Url> = LazyLock::new(|| {
    Url::parse("https://storage.googleapis.com/upload/storage/v1").expect("valid GCS upload URL")
});

pub static STORAGE_PUBLIC_URL: LazyLock<Url> = LazyLock::new(|| {
    Url::parse("https://storage.googleapis.com/").expect("valid GCS public URL")
});

pub static FCM_SEND_URL: LazyLock<Url> =
    LazyLock::new(|| Url::parse("https://fcm.googleapis.com/fcm/send").expect("valid FCM URL"));

pub const API_KEY_ENV: &str = "BUDGETLYTIC_KEY";
pub const FCM_SERVER_KEY_ENV: &str = "FCM_SERVER_KEY";

/// Environment variables read into [`Config`] through figment. Secrets are
/// not among them: figment parses env values as typed data, which would
/// turn `007` into `7`.
const ENV_KEYS: &[&str] = &[
    "LISTEN_ADDR",
    "LOGLEVEL",
    "DATABASE_URL",
    "PROXY",
    "UTC_OFFSET",
    "REMINDER_INTERVAL_SECS",
    "PUSH_CONCURRENCY",
    "CATEGORIES_FILE",
    "ENV_FILE",
];

/// Service tunables. The two cloud credential values are not part of this;
/// they go through `google::credentials::CredentialLoader`.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    pub listen_addr: String,
    pub loglevel: String,
    pub database_url: String,
    pub proxy: Option<Url>,
    /// Shared key guarding the HTTP API. Unset disables the check.
    #[serde(skip)]
    pub budgetlytic_key: Option<String>,
    #[serde(skip)]
    pub fcm_server_key: Option<String>,
    pub utc_offset: String,
    pub reminder_interval_secs: u64,
    pub push_concurrency: usize,
    pub categories_file: PathBuf,
    pub env_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            loglevel: "info".to_string(),
            database_url: "sqlite:budgetlytic.db".to_string(),
            proxy: None,
            budgetlytic_key: None,
            fcm_server_key: None,
            utc_offset: "+05:30".to_string(),
            reminder_interval_secs: 60,
            push_concurrency: 4,
            categories_file: PathBuf::from("categories.json"),
            env_file: PathBuf::from(".env"),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("listen_addr", &self.listen_addr)
            .field("loglevel", &self.loglevel)
            .field("database_url", &self.database_url)
            .field("proxy", &self.proxy.as_ref().map(Url::as_str))
            .field("budgetlytic_key", &redacted(&self.budgetlytic_key))
            .field("fcm_server_key", &redacted(&self.fcm_server_key))
            .field("utc_offset", &self.utc_offset)
            .field("reminder_interval_secs", &self.reminder_interval_secs)
            .field("push_concurrency", &self.push_concurrency)
            .field("categories_file", &self.categories_file)
            .field("env_file", &self.env_file)
            .finish()
    }
}

fn redacted(secret: &Option<String>) -> &'static str {
    match secret {
        Some(_) => "<redacted>",
        None => "<none>",
    }
}

impl Config {
    /// Defaults overlaid with the raw process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Figment::from(Serialized::defaults(Config::default())).merge(
            Env::raw().only(ENV_KEYS),
        ))?
        .with_secrets_from(&ProcessEnv)
    }

    /// Typed tunables only; secrets stay unset.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let cfg: Config = figment.extract().map_err(Box::new)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Fill the secret fields verbatim from `source`. Empty values leave
    /// the secret unset.
    pub fn with_secrets_from(mut self, source: &dyn ConfigSource) -> Result<Self, ConfigError> {
        self.budgetlytic_key = raw_secret(source, API_KEY_ENV)?;
        self.fcm_server_key = raw_secret(source, FCM_SERVER_KEY_ENV)?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.offset()?;
        if self.reminder_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "REMINDER_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }
        if self.push_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "PUSH_CONCURRENCY must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Local time offset used for timestamps and reminder parsing.
    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        FixedOffset::from_str(self.utc_offset.trim()).map_err(|e| {
            ConfigError::Invalid(format!("UTC_OFFSET `{}`: {e}", self.utc_offset))
        })
    }
}

fn raw_secret(source: &dyn ConfigSource, key: &str) -> Result<Option<String>, ConfigError> {
    let Some(raw) = source.lookup(key) else {
        return Ok(None);
    };
    let value = raw
        .into_string()
        .map_err(|_| ConfigError::Invalid(format!("{key} is not valid UTF-8")))?;
    Ok((!value.trim().is_empty()).then_some(value))
}
