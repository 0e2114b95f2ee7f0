//! Environment-backed configuration.
//!
//! Most settings have defaults. Override with `RATER_*` environment variables.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_COMPLETIONS_URL, DEFAULT_MAX_RETRIES, DEFAULT_MIN_REQUEST_INTERVAL, DEFAULT_MODEL_ID,
    DEFAULT_MODELS_URL, DEFAULT_PERSIST_INTERVAL, DEFAULT_PROVIDER_SORT, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_SCHEDULE_DEBOUNCE, DEFAULT_STREAM_IDLE_TIMEOUT, DEFAULT_SYSTEM_PROMPT,
};

/// Pipeline configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `RATER_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bearer token for the completions endpoint. Rating fails fast without it.
    pub api_key: Option<String>,

    /// Chat completions endpoint.
    pub completions_url: String,

    /// Model list endpoint, used to decide whether images can be attached.
    pub models_url: String,

    /// Model slug sent with every request.
    pub model_id: String,

    pub system_prompt: String,

    /// Sampling temperature. Default: `0.5`.
    pub temperature: f32,

    /// Nucleus sampling cutoff. Default: `0.9`.
    pub top_p: f32,

    pub max_tokens: u32,

    /// Provider routing hint (`provider.sort`). Default: `throughput`.
    pub provider_sort: String,

    /// Consume responses incrementally. Default: `true`.
    pub streaming: bool,

    /// Attempts per item before falling back. Default: `3`.
    pub max_retries: u32,

    /// Minimum spacing between outbound requests. Default: `250ms`.
    pub min_request_interval: Duration,

    /// Timeout for a non-streaming request, or for opening a stream. Default: `30s`.
    pub request_timeout: Duration,

    /// Inactivity window after which a stream completes with what it has. Default: `10s`.
    pub stream_idle_timeout: Duration,

    /// Delay between scheduling an item and starting its pipeline. Default: `500ms`.
    pub schedule_debounce: Duration,

    /// Minimum spacing between cache writes during streaming. Default: `1s`.
    pub persist_interval: Duration,

    /// Author handles that skip rating and receive the maximum score.
    pub allow_list: Vec<String>,

    /// Attach media URLs as image parts when the model accepts images. Default: `true`.
    pub enable_images: bool,

    /// File backing the key-value store. Default: `./.data/ratings.json`.
    pub store_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            completions_url: DEFAULT_COMPLETIONS_URL.to_string(),
            models_url: DEFAULT_MODELS_URL.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: 0.5,
            top_p: 0.9,
            max_tokens: 1000,
            provider_sort: DEFAULT_PROVIDER_SORT.to_string(),
            streaming: true,
            max_retries: DEFAULT_MAX_RETRIES,
            min_request_interval: DEFAULT_MIN_REQUEST_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            stream_idle_timeout: DEFAULT_STREAM_IDLE_TIMEOUT,
            schedule_debounce: DEFAULT_SCHEDULE_DEBOUNCE,
            persist_interval: DEFAULT_PERSIST_INTERVAL,
            allow_list: Vec::new(),
            enable_images: true,
            store_path: PathBuf::from("./.data/ratings.json"),
        }
    }
}

impl Config {
    const ENV_API_KEY: &'static str = "RATER_API_KEY";
    const ENV_API_URL: &'static str = "RATER_API_URL";
    const ENV_MODELS_URL: &'static str = "RATER_MODELS_URL";
    const ENV_MODEL: &'static str = "RATER_MODEL";
    const ENV_SYSTEM_PROMPT: &'static str = "RATER_SYSTEM_PROMPT";
    const ENV_TEMPERATURE: &'static str = "RATER_TEMPERATURE";
    const ENV_TOP_P: &'static str = "RATER_TOP_P";
    const ENV_MAX_TOKENS: &'static str = "RATER_MAX_TOKENS";
    const ENV_PROVIDER_SORT: &'static str = "RATER_PROVIDER_SORT";
    const ENV_STREAMING: &'static str = "RATER_STREAMING";
    const ENV_MAX_RETRIES: &'static str = "RATER_MAX_RETRIES";
    const ENV_MIN_INTERVAL_MS: &'static str = "RATER_MIN_INTERVAL_MS";
    const ENV_REQUEST_TIMEOUT_SECS: &'static str = "RATER_REQUEST_TIMEOUT_SECS";
    const ENV_STREAM_IDLE_SECS: &'static str = "RATER_STREAM_IDLE_SECS";
    const ENV_SCHEDULE_DEBOUNCE_MS: &'static str = "RATER_SCHEDULE_DEBOUNCE_MS";
    const ENV_PERSIST_INTERVAL_MS: &'static str = "RATER_PERSIST_INTERVAL_MS";
    const ENV_ALLOW_LIST: &'static str = "RATER_ALLOW_LIST";
    const ENV_IMAGES: &'static str = "RATER_IMAGES";
    const ENV_STORE_PATH: &'static str = "RATER_STORE_PATH";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let api_key = Self::parse_optional_string_from_env(Self::ENV_API_KEY);
        let completions_url =
            Self::parse_string_from_env(Self::ENV_API_URL, defaults.completions_url);
        let models_url = Self::parse_string_from_env(Self::ENV_MODELS_URL, defaults.models_url);
        let model_id = Self::parse_string_from_env(Self::ENV_MODEL, defaults.model_id);
        let system_prompt =
            Self::parse_string_from_env(Self::ENV_SYSTEM_PROMPT, defaults.system_prompt);
        let temperature = Self::parse_f32_from_env(Self::ENV_TEMPERATURE, defaults.temperature)?;
        let top_p = Self::parse_f32_from_env(Self::ENV_TOP_P, defaults.top_p)?;
        let max_tokens =
            Self::parse_u64_from_env(Self::ENV_MAX_TOKENS, defaults.max_tokens as u64) as u32;
        let provider_sort =
            Self::parse_string_from_env(Self::ENV_PROVIDER_SORT, defaults.provider_sort);
        let streaming = Self::parse_bool_from_env(Self::ENV_STREAMING, defaults.streaming);
        let max_retries =
            Self::parse_u64_from_env(Self::ENV_MAX_RETRIES, defaults.max_retries as u64) as u32;
        let min_request_interval =
            Self::parse_millis_from_env(Self::ENV_MIN_INTERVAL_MS, defaults.min_request_interval);
        let request_timeout =
            Self::parse_secs_from_env(Self::ENV_REQUEST_TIMEOUT_SECS, defaults.request_timeout);
        let stream_idle_timeout =
            Self::parse_secs_from_env(Self::ENV_STREAM_IDLE_SECS, defaults.stream_idle_timeout);
        let schedule_debounce =
            Self::parse_millis_from_env(Self::ENV_SCHEDULE_DEBOUNCE_MS, defaults.schedule_debounce);
        let persist_interval =
            Self::parse_millis_from_env(Self::ENV_PERSIST_INTERVAL_MS, defaults.persist_interval);
        let allow_list = env::var(Self::ENV_ALLOW_LIST)
            .map(|v| parse_allow_list(&v))
            .unwrap_or(defaults.allow_list);
        let enable_images = Self::parse_bool_from_env(Self::ENV_IMAGES, defaults.enable_images);
        let store_path = env::var(Self::ENV_STORE_PATH)
            .map(PathBuf::from)
            .unwrap_or(defaults.store_path);

        Ok(Self {
            api_key,
            completions_url,
            models_url,
            model_id,
            system_prompt,
            temperature,
            top_p,
            max_tokens,
            provider_sort,
            streaming,
            max_retries,
            min_request_interval,
            request_timeout,
            stream_idle_timeout,
            schedule_debounce,
            persist_interval,
            allow_list,
            enable_images,
            store_path,
        })
    }

    /// Validates ranges and paths (does not create directories).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries == 0 {
            return Err(ConfigError::OutOfRange {
                name: Self::ENV_MAX_RETRIES,
                value: self.max_retries.to_string(),
                expected: "at least 1",
            });
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::OutOfRange {
                name: Self::ENV_TEMPERATURE,
                value: self.temperature.to_string(),
                expected: "between 0.0 and 2.0",
            });
        }

        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(ConfigError::OutOfRange {
                name: Self::ENV_TOP_P,
                value: self.top_p.to_string(),
                expected: "between 0.0 and 1.0",
            });
        }

        if self.model_id.trim().is_empty() {
            return Err(ConfigError::Empty {
                name: Self::ENV_MODEL,
            });
        }

        if self.store_path.is_dir() {
            return Err(ConfigError::NotAFile {
                path: self.store_path.clone(),
            });
        }

        Ok(())
    }

    /// Returns the API key if one is configured and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    /// Returns `true` if `handle` is on the allow-list (case-insensitive, `@` optional).
    pub fn is_allow_listed(&self, handle: &str) -> bool {
        let handle = normalize_handle(handle);
        !handle.is_empty() && self.allow_list.iter().any(|h| normalize_handle(h) == handle)
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        env::var(var_name).unwrap_or(default)
    }

    fn parse_u64_from_env(var_name: &str, default: u64) -> u64 {
        env::var(var_name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn parse_f32_from_env(var_name: &'static str, default: f32) -> Result<f32, ConfigError> {
        match env::var(var_name) {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|e| ConfigError::InvalidFloat {
                    name: var_name,
                    value,
                    source: e,
                }),
            Err(_) => Ok(default),
        }
    }

    fn parse_bool_from_env(var_name: &str, default: bool) -> bool {
        env::var(var_name)
            .map(|s| s != "false" && s != "0")
            .unwrap_or(default)
    }

    fn parse_millis_from_env(var_name: &str, default: Duration) -> Duration {
        env::var(var_name)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(default)
    }

    fn parse_secs_from_env(var_name: &str, default: Duration) -> Duration {
        env::var(var_name)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(default)
    }
}

/// Lower-cases a handle and strips a leading `@`.
pub fn normalize_handle(handle: &str) -> String {
    handle.trim().trim_start_matches('@').to_lowercase()
}

fn parse_allow_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(normalize_handle)
        .filter(|h| !h.is_empty())
        .collect()
}
