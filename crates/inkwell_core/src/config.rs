//! Runtime configuration for embedding applications and the CLI.
//!
//! # Responsibility
//! - Describe database location, logging setup and paging limits.
//! - Load overrides from `INKWELL_*` environment variables.
//!
//! # Invariants
//! - `PageLimits::max_limit >= PageLimits::default_limit >= 1`.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "INKWELL_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "INKWELL_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "INKWELL_LOG_DIR";
pub const ENV_PAGE_DEFAULT_LIMIT: &str = "INKWELL_PAGE_DEFAULT_LIMIT";
pub const ENV_PAGE_MAX_LIMIT: &str = "INKWELL_PAGE_MAX_LIMIT";

const DEFAULT_PAGE_LIMIT: u32 = 20;
const MAX_PAGE_LIMIT: u32 = 100;

/// Configuration loading failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Variable is set but not a positive integer.
    InvalidNumber { key: &'static str, value: String },
    /// Default page size is zero.
    ZeroDefaultLimit,
    /// Default page size exceeds the configured maximum.
    InconsistentPageLimits { default_limit: u32, max_limit: u32 },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidNumber { key, value } => {
                write!(f, "`{key}` must be a positive integer, got `{value}`")
            }
            Self::ZeroDefaultLimit => write!(f, "default page limit must be at least 1"),
            Self::InconsistentPageLimits {
                default_limit,
                max_limit,
            } => write!(
                f,
                "default page limit {default_limit} exceeds max page limit {max_limit}"
            ),
        }
    }
}

impl Error for ConfigError {}

/// Paging bounds for article listing and feeds.
///
/// Only constructible through [`PageLimits::new`], `Default` or
/// deserialization, all of which enforce `max_limit >= default_limit >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawPageLimits")]
pub struct PageLimits {
    default_limit: u32,
    max_limit: u32,
}

/// Unchecked wire shape of [`PageLimits`].
#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawPageLimits {
    default_limit: u32,
    max_limit: u32,
}

impl Default for RawPageLimits {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_PAGE_LIMIT,
            max_limit: MAX_PAGE_LIMIT,
        }
    }
}

impl TryFrom<RawPageLimits> for PageLimits {
    type Error = ConfigError;

    fn try_from(raw: RawPageLimits) -> Result<Self, Self::Error> {
        Self::new(raw.default_limit, raw.max_limit)
    }
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_PAGE_LIMIT,
            max_limit: MAX_PAGE_LIMIT,
        }
    }
}

impl PageLimits {
    /// Builds paging bounds, rejecting a zero default or a default above
    /// the maximum.
    pub fn new(default_limit: u32, max_limit: u32) -> Result<Self, ConfigError> {
        if default_limit == 0 {
            return Err(ConfigError::ZeroDefaultLimit);
        }
        if default_limit > max_limit {
            return Err(ConfigError::InconsistentPageLimits {
                default_limit,
                max_limit,
            });
        }
        Ok(Self {
            default_limit,
            max_limit,
        })
    }

    /// Used when a request has no limit or a zero limit.
    pub fn default_limit(&self) -> u32 {
        self.default_limit
    }

    /// Upper clamp for requested limits.
    pub fn max_limit(&self) -> u32 {
        self.max_limit
    }

    /// Normalizes a requested page size against these bounds.
    pub fn normalize(&self, limit: Option<u32>) -> u32 {
        match limit {
            None | Some(0) => self.default_limit,
            Some(value) if value > self.max_limit => self.max_limit,
            Some(value) => value,
        }
    }
}

/// Top-level core configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// SQLite file path. `None` means an in-memory database.
    pub db_path: Option<PathBuf>,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files. `None` disables file logs.
    pub log_dir: Option<PathBuf>,
    pub page: PageLimits,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: crate::logging::default_log_level().to_string(),
            log_dir: None,
            page: PageLimits::default(),
        }
    }
}

impl CoreConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup, starting from
    /// defaults. Blank values are treated as unset.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(path) = get(ENV_DB_PATH) {
            config.db_path = Some(PathBuf::from(path));
        }
        if let Some(level) = get(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        if let Some(dir) = get(ENV_LOG_DIR) {
            config.log_dir = Some(PathBuf::from(dir));
        }
        let mut default_limit = config.page.default_limit;
        let mut max_limit = config.page.max_limit;
        if let Some(value) = get(ENV_PAGE_DEFAULT_LIMIT) {
            default_limit = parse_positive(ENV_PAGE_DEFAULT_LIMIT, &value)?;
        }
        if let Some(value) = get(ENV_PAGE_MAX_LIMIT) {
            max_limit = parse_positive(ENV_PAGE_MAX_LIMIT, &value)?;
        }

        config.page = PageLimits::new(default_limit, max_limit)?;
        Ok(config)
    }
}

fn parse_positive(key: &'static str, value: &str) -> Result<u32, ConfigError> {
    match value.trim().parse::<u32>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(ConfigError::InvalidNumber {
            key,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ConfigError, CoreConfig, PageLimits, ENV_DB_PATH, ENV_PAGE_DEFAULT_LIMIT,
        ENV_PAGE_MAX_LIMIT,
    };
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn page_limits_default_and_clamp() {
        let limits = PageLimits::default();
        assert_eq!(limits.normalize(None), 20);
        assert_eq!(limits.normalize(Some(0)), 20);
        assert_eq!(limits.normalize(Some(5)), 5);
        assert_eq!(limits.normalize(Some(500)), 100);
    }

    #[test]
    fn empty_lookup_yields_defaults() {
        let config = CoreConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, CoreConfig::default());
    }

    #[test]
    fn lookup_overrides_path_and_limits() {
        let config = CoreConfig::from_lookup(lookup_from(&[
            (ENV_DB_PATH, "/tmp/inkwell.db"),
            (ENV_PAGE_DEFAULT_LIMIT, "10"),
            (ENV_PAGE_MAX_LIMIT, " 50 "),
        ]))
        .unwrap();
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/inkwell.db")));
        assert_eq!(config.page.default_limit(), 10);
        assert_eq!(config.page.max_limit(), 50);
    }

    #[test]
    fn non_numeric_limit_is_rejected() {
        let err = CoreConfig::from_lookup(lookup_from(&[(ENV_PAGE_MAX_LIMIT, "lots")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { .. }));
    }

    #[test]
    fn default_above_max_is_rejected() {
        let err = CoreConfig::from_lookup(lookup_from(&[
            (ENV_PAGE_DEFAULT_LIMIT, "80"),
            (ENV_PAGE_MAX_LIMIT, "40"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InconsistentPageLimits {
                default_limit: 80,
                max_limit: 40
            }
        );
    }

    #[test]
    fn page_limits_new_rejects_zero_and_inverted_bounds() {
        assert_eq!(PageLimits::new(0, 100), Err(ConfigError::ZeroDefaultLimit));
        assert_eq!(
            PageLimits::new(500, 10),
            Err(ConfigError::InconsistentPageLimits {
                default_limit: 500,
                max_limit: 10
            })
        );
        let limits = PageLimits::new(5, 5).unwrap();
        assert_eq!(limits.normalize(None), 5);
        assert_eq!(limits.normalize(Some(9)), 5);
    }

    #[test]
    fn deserialized_config_validates_page_limits() {
        let config: CoreConfig =
            serde_json::from_str(r#"{"page":{"default_limit":10,"max_limit":30}}"#).unwrap();
        assert_eq!(config.page.default_limit(), 10);
        assert_eq!(config.page.max_limit(), 30);

        let partial: CoreConfig = serde_json::from_str(r#"{"page":{"max_limit":40}}"#).unwrap();
        assert_eq!(partial.page.default_limit(), 20);
        assert_eq!(partial.page.max_limit(), 40);

        let defaults: CoreConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(defaults.page, PageLimits::default());

        assert!(serde_json::from_str::<CoreConfig>(
            r#"{"page":{"default_limit":0,"max_limit":100}}"#
        )
        .is_err());
        assert!(serde_json::from_str::<PageLimits>(
            r#"{"default_limit":500,"max_limit":10}"#
        )
        .is_err());
    }
}
