use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::affiliate::AffiliateConfig;
use crate::{Error, Result};

pub const DEFAULT_ASSOCIATE_TAG: &str = "trendtiers-20";
pub const DEFAULT_CONTENT_DIR: &str = "src/content/tierlists";
pub const DEFAULT_CREDENTIALS_FILE: &str = "credentials.json";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Runtime configuration, built once at startup and passed by reference.
#[derive(Clone)]
pub struct Config {
    pub serpapi_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub article_model: String,
    pub review_model: String,
    pub associate_tag: String,
    pub content_dir: PathBuf,
    pub git_autocommit: bool,
    pub git_push: bool,
    pub cycle_interval: Duration,
    pub request_delay: Duration,
    pub file_delay: Duration,
    /// Raw key/value pairs from the credentials file, also used by the ads config.
    pub credentials: HashMap<String, String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("serpapi_key", &self.serpapi_key.as_deref().map(|_| "<redacted>"))
            .field("openai_api_key", &self.openai_api_key.as_deref().map(|_| "<redacted>"))
            .field("openai_base_url", &self.openai_base_url)
            .field("article_model", &self.article_model)
            .field("review_model", &self.review_model)
            .field("associate_tag", &self.associate_tag)
            .field("content_dir", &self.content_dir)
            .field("git_autocommit", &self.git_autocommit)
            .field("git_push", &self.git_push)
            .field("cycle_interval", &self.cycle_interval)
            .field("request_delay", &self.request_delay)
            .field("file_delay", &self.file_delay)
            .field("credentials", &self.credentials.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serpapi_key: None,
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            article_model: "gpt-4".to_string(),
            review_model: "gpt-4o-mini".to_string(),
            associate_tag: DEFAULT_ASSOCIATE_TAG.to_string(),
            content_dir: PathBuf::from(DEFAULT_CONTENT_DIR),
            git_autocommit: false,
            git_push: false,
            cycle_interval: Duration::from_secs(60 * 60),
            request_delay: Duration::from_millis(1000),
            file_delay: Duration::from_millis(3000),
            credentials: HashMap::new(),
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Reads the process environment, falling back to the credentials file for unset keys.
    ///
    /// Without an explicit file, `credentials.json` in the working directory is
    /// used when it exists.
    pub fn from_env(credentials_file: Option<&Path>) -> Result<Self> {
        let credentials = load_credentials(credentials_path(credentials_file))?;
        Self::from_lookup(|key| env::var(key).ok(), credentials)
    }

    /// Builds the config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F, credentials: HashMap<String, String>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_empty(lookup(key).or_else(|| credentials.get(key).cloned()));
        let defaults = Self::default();

        let cycle_minutes = match get("CYCLE_MINUTES") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| Error::Config(format!("CYCLE_MINUTES is not a number: {}", raw)))?,
            None => 60,
        };
        let cycle_interval = cycle_minutes
            .checked_mul(60)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .ok_or_else(|| Error::Config(format!("CYCLE_MINUTES must be a positive number of minutes: {}", cycle_minutes)))?;
        let request_delay = match get("TT_REQUEST_DELAY_MS") {
            Some(raw) => Duration::from_millis(
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| Error::Config(format!("TT_REQUEST_DELAY_MS is not a number: {}", raw)))?,
            ),
            None => defaults.request_delay,
        };

        Ok(Self {
            serpapi_key: get("SERPAPI_KEY"),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            article_model: get("OPENAI_MODEL").unwrap_or(defaults.article_model),
            review_model: get("OPENAI_REVIEW_MODEL").unwrap_or(defaults.review_model),
            associate_tag: get("AMAZON_ASSOCIATE_TAG").unwrap_or(defaults.associate_tag),
            content_dir: get("TT_CONTENT_DIR").map(PathBuf::from).unwrap_or(defaults.content_dir),
            git_autocommit: get("GIT_AUTOCOMMIT").map(|v| parse_bool(&v)).unwrap_or(false),
            git_push: get("GIT_PUSH").map(|v| parse_bool(&v)).unwrap_or(false),
            cycle_interval,
            request_delay,
            file_delay: defaults.file_delay,
            credentials,
        })
    }

    pub fn affiliate(&self) -> AffiliateConfig {
        AffiliateConfig::new(self.associate_tag.clone())
    }

    pub fn require_serpapi_key(&self) -> Result<&str> {
        self.serpapi_key
            .as_deref()
            .ok_or_else(|| Error::Config("SERPAPI_KEY environment variable is required".to_string()))
    }

    pub fn require_openai_key(&self) -> Result<&str> {
        self.openai_api_key
            .as_deref()
            .ok_or_else(|| Error::Config("OPENAI_API_KEY environment variable is required".to_string()))
    }
}

/// The credentials file to read: the explicit one, else [`DEFAULT_CREDENTIALS_FILE`].
pub fn credentials_path(explicit: Option<&Path>) -> &Path {
    explicit.unwrap_or_else(|| Path::new(DEFAULT_CREDENTIALS_FILE))
}

/// Loads a flat JSON object of string values. A missing file yields an empty map.
pub fn load_credentials(path: &Path) -> Result<HashMap<String, String>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(e) => return Err(e.into()),
    };
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    let object = value
        .as_object()
        .ok_or_else(|| Error::Config(format!("{} must contain a JSON object", path.display())))?;

    let credentials: HashMap<String, String> = object
        .iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
        .collect();
    tracing::info!("🔑 Loaded {} credentials from {}", credentials.len(), path.display());
    Ok(credentials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[]), HashMap::new()).unwrap();
        assert_eq!(config.associate_tag, DEFAULT_ASSOCIATE_TAG);
        assert_eq!(config.content_dir, PathBuf::from(DEFAULT_CONTENT_DIR));
        assert_eq!(config.cycle_interval, Duration::from_secs(3600));
        assert!(config.serpapi_key.is_none());
        assert!(!config.git_autocommit);
        assert!(config.require_openai_key().is_err());
    }

    #[test]
    fn test_env_wins_over_credentials() {
        let mut credentials = HashMap::new();
        credentials.insert("SERPAPI_KEY".to_string(), "from-file".to_string());
        credentials.insert("OPENAI_API_KEY".to_string(), "file-openai".to_string());
        let config = Config::from_lookup(
            lookup_from(&[("SERPAPI_KEY", "from-env"), ("GIT_AUTOCOMMIT", "TRUE"), ("CYCLE_MINUTES", "15")]),
            credentials,
        )
        .unwrap();
        assert_eq!(config.serpapi_key.as_deref(), Some("from-env"));
        assert_eq!(config.openai_api_key.as_deref(), Some("file-openai"));
        assert!(config.git_autocommit);
        assert_eq!(config.cycle_interval, Duration::from_secs(15 * 60));
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = Config::from_lookup(lookup_from(&[("SERPAPI_KEY", "  ")]), HashMap::new()).unwrap();
        assert!(config.serpapi_key.is_none());
    }

    #[test]
    fn test_bad_cycle_minutes() {
        let result = Config::from_lookup(lookup_from(&[("CYCLE_MINUTES", "soon")]), HashMap::new());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_cycle_minutes_must_be_positive() {
        for raw in ["0", "18446744073709551615"] {
            let result = Config::from_lookup(lookup_from(&[("CYCLE_MINUTES", raw)]), HashMap::new());
            assert!(matches!(result, Err(Error::Config(_))), "accepted CYCLE_MINUTES={}", raw);
        }
    }

    #[test]
    fn test_default_credentials_file() {
        assert_eq!(credentials_path(None), Path::new("credentials.json"));
        assert_eq!(credentials_path(Some(Path::new("ci/creds.json"))), Path::new("ci/creds.json"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CREDENTIALS_FILE);
        std::fs::write(&path, r#"{"BOOKING_AFF_ID": "123"}"#).unwrap();
        let config = Config::from_env(Some(&path)).unwrap();
        assert_eq!(config.credentials.get("BOOKING_AFF_ID").map(String::as_str), Some("123"));
    }

    #[test]
    fn test_debug_redacts_keys() {
        let config = Config::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk-secret")]), HashMap::new()).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_load_credentials() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"BOOKING_AFF_ID": "123", "NESTED": {{"a": 1}}}}"#).unwrap();
        let credentials = load_credentials(file.path()).unwrap();
        assert_eq!(credentials.get("BOOKING_AFF_ID").map(String::as_str), Some("123"));
        assert!(!credentials.contains_key("NESTED"));

        let missing = load_credentials(Path::new("/definitely/not/here.json")).unwrap();
        assert!(missing.is_empty());
    }
}
