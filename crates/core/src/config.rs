//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services. Nothing
//! in this crate reads process environment variables during request handling; the binaries read
//! them and hand the raw values to the `*_from_env_value` parsers below.

use crate::constants::{
    DEFAULT_MODEL, DEFAULT_OPENAI_BASE_URL, FLASHCARDS_DIR_NAME, MAX_FLASHCARDS, USERS_DIR_NAME,
};
use crate::error::{ConfigError, ConfigResult};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// What to do with a generated card whose category is unknown or whose question/answer is blank.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CategoryPolicy {
    /// Remove the card from the set and log a warning.
    #[default]
    Drop,
    /// Fail the whole generation.
    Reject,
}

impl FromStr for CategoryPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(CategoryPolicy::Drop),
            "reject" => Ok(CategoryPolicy::Reject),
            other => Err(ConfigError::InvalidInput(format!(
                "unknown category policy '{other}' (expected 'drop' or 'reject')"
            ))),
        }
    }
}

/// Settings for the completion provider and the generation contract.
#[derive(Clone)]
pub struct GenerationConfig {
    api_key: String,
    model: String,
    base_url: String,
    json_mode: bool,
    request_timeout: Option<Duration>,
    max_flashcards: usize,
    category_policy: CategoryPolicy,
}

impl GenerationConfig {
    /// Create a new `GenerationConfig` with JSON mode on, no timeout override, the default card
    /// cap and the default category policy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidInput`] if the API key or model is blank, or if `base_url` is
    /// not an absolute http(s) URL.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl AsRef<str>,
    ) -> ConfigResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ConfigError::InvalidInput(
                "completion API key cannot be empty".into(),
            ));
        }

        let model = model.into();
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidInput("model cannot be empty".into()));
        }

        Ok(Self {
            api_key,
            model: model.trim().to_owned(),
            base_url: normalise_base_url(base_url.as_ref())?,
            json_mode: true,
            request_timeout: None,
            max_flashcards: MAX_FLASHCARDS,
            category_policy: CategoryPolicy::default(),
        })
    }

    pub fn with_json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_category_policy(mut self, policy: CategoryPolicy) -> Self {
        self.category_policy = policy;
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn json_mode(&self) -> bool {
        self.json_mode
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    pub fn max_flashcards(&self) -> usize {
        self.max_flashcards
    }

    pub fn category_policy(&self) -> CategoryPolicy {
        self.category_policy
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("json_mode", &self.json_mode)
            .field("request_timeout", &self.request_timeout)
            .field("max_flashcards", &self.max_flashcards)
            .field("category_policy", &self.category_policy)
            .finish()
    }
}

/// Settings for the Identity Toolkit REST API.
#[derive(Clone)]
pub struct IdentityConfig {
    api_key: String,
    base_url: String,
}

impl IdentityConfig {
    pub fn new(api_key: impl Into<String>, base_url: impl AsRef<str>) -> ConfigResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ConfigError::InvalidInput(
                "identity API key cannot be empty".into(),
            ));
        }

        Ok(Self {
            api_key,
            base_url: normalise_base_url(base_url.as_ref())?,
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    generation: GenerationConfig,
    billing_portal_url: Option<String>,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidInput`] if `billing_portal_url` is present but not an
    /// absolute http(s) URL.
    pub fn new(
        data_dir: PathBuf,
        generation: GenerationConfig,
        billing_portal_url: Option<String>,
    ) -> ConfigResult<Self> {
        let billing_portal_url = billing_portal_url
            .map(|url| url.trim().to_owned())
            .filter(|url| !url.is_empty())
            .map(|url| parse_http_url(&url).map(|_| url))
            .transpose()?;

        Ok(Self {
            data_dir,
            generation,
            billing_portal_url,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn flashcards_dir(&self) -> PathBuf {
        self.data_dir.join(FLASHCARDS_DIR_NAME)
    }

    pub fn users_dir(&self) -> PathBuf {
        self.data_dir.join(USERS_DIR_NAME)
    }

    pub fn generation(&self) -> &GenerationConfig {
        &self.generation
    }

    pub fn billing_portal_url(&self) -> Option<&str> {
        self.billing_portal_url.as_deref()
    }
}

fn parse_http_url(value: &str) -> ConfigResult<reqwest::Url> {
    let url = reqwest::Url::parse(value)
        .map_err(|e| ConfigError::InvalidInput(format!("invalid URL '{value}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidInput(format!(
            "URL '{value}' must use http or https"
        )));
    }
    Ok(url)
}

/// Validates a base URL and strips any trailing slash so paths can be appended with `/`.
fn normalise_base_url(value: &str) -> ConfigResult<String> {
    let value = value.trim();
    parse_http_url(value)?;
    Ok(value.trim_end_matches('/').to_owned())
}

/// Raw generation settings as read from the process environment.
///
/// Every field is optional here; [`generation_config_from_env_values`] applies defaults and
/// validates.
#[derive(Debug, Default, Clone)]
pub struct GenerationEnvValues {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub json_mode: Option<String>,
    pub timeout_secs: Option<String>,
    pub category_policy: Option<String>,
}

/// Resolve a [`GenerationConfig`] from raw environment values.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidInput`] if the API key is missing or any value is invalid.
pub fn generation_config_from_env_values(
    values: GenerationEnvValues,
) -> ConfigResult<GenerationConfig> {
    let api_key = values
        .api_key
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::InvalidInput("OPENAI_API_KEY is not set".into()))?;
    let model = non_blank_or(values.model, DEFAULT_MODEL);
    let base_url = non_blank_or(values.base_url, DEFAULT_OPENAI_BASE_URL);

    Ok(GenerationConfig::new(api_key, model, base_url)?
        .with_json_mode(flag_from_env_value(
            "OPENAI_JSON_MODE",
            values.json_mode,
            true,
        )?)
        .with_request_timeout(timeout_from_env_value(values.timeout_secs)?)
        .with_category_policy(category_policy_from_env_value(values.category_policy)?))
}

fn non_blank_or(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_owned())
}

/// Parse the category policy from an optional string value.
///
/// If `value` is `None` or blank, returns [`CategoryPolicy::Drop`].
pub fn category_policy_from_env_value(value: Option<String>) -> ConfigResult<CategoryPolicy> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.parse::<CategoryPolicy>())
        .transpose()
        .map(Option::unwrap_or_default)
}

/// Parse a boolean flag from an optional string value, falling back to `default`.
///
/// Accepts `true/false`, `1/0`, `yes/no`, `on/off` (case-insensitive).
pub fn flag_from_env_value(name: &str, value: Option<String>, default: bool) -> ConfigResult<bool> {
    let Some(value) = value.map(|v| v.trim().to_ascii_lowercase()) else {
        return Ok(default);
    };

    match value.as_str() {
        "" => Ok(default),
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidInput(format!(
            "{name} must be a boolean, got '{other}'"
        ))),
    }
}

/// Parse an optional request timeout in whole seconds.
///
/// `None`, blank and `0` all mean "no timeout override".
pub fn timeout_from_env_value(value: Option<String>) -> ConfigResult<Option<Duration>> {
    let Some(value) = value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    let secs: u64 = value.parse().map_err(|_| {
        ConfigError::InvalidInput(format!(
            "timeout must be a whole number of seconds, got '{value}'"
        ))
    })?;

    Ok((secs > 0).then(|| Duration::from_secs(secs)))
}
