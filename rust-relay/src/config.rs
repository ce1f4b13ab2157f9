//! Configuration module for environment variable parsing.
//!
//! Everything the relay needs is read once at startup into [`Config`] and
//! passed down; nothing else reads the environment.

use std::env;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::content::{DynamicContentSettings, ResolutionStrategy};
use crate::index::AlgoliaSettings;
use crate::process::{DuplicateEntry, ProcessorSettings, Whitelist, WhitelistConfig};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DC_AUTH_URL: &str = "https://auth.amplience.net";
const DEFAULT_DC_API_URL: &str = "https://api.amplience.net/v2/content";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 8000;

/// Separator used by both whitelist variables.
const LIST_DELIMITER: char = ';';

/// Configuration errors. Any of these aborts startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("\"{0}\" is required")]
    Missing(&'static str),
    #[error("\"{0}\" is not allowed to be empty")]
    Empty(&'static str),
    #[error("\"{name}\" must be a valid URL: {source}")]
    InvalidUrl {
        name: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("\"{name}\" is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
    #[error("\"{name}\" contains a {source}")]
    Duplicate {
        name: &'static str,
        #[source]
        source: DuplicateEntry,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Shared secret for webhook signature verification
    pub webhook_secret: String,

    /// Dynamic Content API connection
    pub content: DynamicContentSettings,

    /// Algolia connection
    pub algolia: AlgoliaSettings,

    /// Index every document is written to
    pub index_name: String,

    pub whitelists: WhitelistConfig,

    /// Stamp epoch-second `_...Date` fields onto documents
    pub add_timestamps: bool,

    /// Check both sets of credentials before accepting traffic
    pub validate_credentials: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let request_timeout =
            Duration::from_millis(vars.parsed("REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT_MS));

        let strategy = match vars.optional("DC_CONTENT_RESOLUTION") {
            Some(raw) => raw
                .parse::<ResolutionStrategy>()
                .map_err(|reason| ConfigError::Invalid {
                    name: "DC_CONTENT_RESOLUTION",
                    reason,
                })?,
            None => ResolutionStrategy::default(),
        };

        let content = DynamicContentSettings {
            client_id: vars.required("DC_CLIENT_ID")?,
            client_secret: vars.required("DC_CLIENT_SECRET")?,
            auth_url: vars.url("DC_AUTH_URL", DEFAULT_DC_AUTH_URL)?,
            api_url: vars.url("DC_API_URL", DEFAULT_DC_API_URL)?,
            strategy,
            request_timeout,
        };

        let application_id = vars.required("ALGOLIA_APPLICATION_ID")?;
        let host = match vars.optional("ALGOLIA_HOST") {
            Some(raw) => Url::parse(&raw),
            None => AlgoliaSettings::default_host(&application_id),
        }
        .map_err(|source| ConfigError::InvalidUrl {
            name: "ALGOLIA_HOST",
            source,
        })?;

        let algolia = AlgoliaSettings {
            application_id,
            api_key: vars.required("ALGOLIA_API_KEY")?,
            host,
            request_timeout,
        };

        Ok(Config {
            port: vars.parsed("PORT", DEFAULT_PORT),
            webhook_secret: vars.required("WEBHOOK_SECRET")?,
            content,
            algolia,
            index_name: vars.required("ALGOLIA_INDEX_NAME")?,
            whitelists: WhitelistConfig {
                content_types: vars.list("CONTENT_TYPE_WHITELIST")?,
                properties: vars.list("CONTENT_TYPE_PROPERTY_WHITELIST")?,
            },
            add_timestamps: vars.flag("ADD_TIMESTAMPS", true),
            validate_credentials: vars.flag("VALIDATE_CREDENTIALS", true),
        })
    }

    /// Settings handed to the webhook processor.
    pub fn processor_settings(&self) -> ProcessorSettings {
        ProcessorSettings {
            index_name: self.index_name.clone(),
            whitelists: self.whitelists.clone(),
            stamp_timestamps: self.add_timestamps,
        }
    }
}

// =============================================================================
// Variable Parsing
// =============================================================================

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Value of an optional variable; blank counts as unset.
    fn optional(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        match (self.0)(name) {
            None => Err(ConfigError::Missing(name)),
            Some(v) if v.trim().is_empty() => Err(ConfigError::Empty(name)),
            Some(v) => Ok(v.trim().to_string()),
        }
    }

    fn url(&self, name: &'static str, default: &str) -> Result<Url, ConfigError> {
        let raw = self.optional(name).unwrap_or_else(|| default.to_string());
        Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl { name, source })
    }

    /// Parse a value, falling back to `default` with a warning when invalid.
    fn parsed<T>(&self, name: &str, default: T) -> T
    where
        T: std::str::FromStr,
    {
        match self.optional(name) {
            None => default,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(env_var = name, value = %raw, "Invalid value, using default");
                default
            }),
        }
    }

    fn flag(&self, name: &str, default: bool) -> bool {
        match self.optional(name).map(|v| v.to_ascii_lowercase()) {
            None => default,
            Some(v) => match v.as_str() {
                "true" | "1" | "yes" | "on" => true,
                "false" | "0" | "no" | "off" => false,
                _ => {
                    warn!(env_var = name, value = %v, "Invalid boolean, using default");
                    default
                }
            },
        }
    }

    /// Parse a `;`-delimited whitelist.
    fn list(&self, name: &'static str) -> Result<Whitelist, ConfigError> {
        let raw = self.optional(name).unwrap_or_default();
        parse_list(&raw).map_err(|source| ConfigError::Duplicate { name, source })
    }
}

/// Split a delimited list, trimming entries and dropping blanks.
fn parse_list(raw: &str) -> Result<Whitelist, DuplicateEntry> {
    Whitelist::new(
        raw.split(LIST_DELIMITER)
            .map(str::trim)
            .filter(|s| !s.is_empty()),
    )
}
