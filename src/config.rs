//! Site configuration.
//!
//! Built once at startup from the environment and passed down explicitly.
//! Production deployments must provide CMS credentials; other environments
//! start without them and log a warning for each missing value.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Default CMS API base URL.
pub const DEFAULT_CMS_BASE_URL: &str = "https://www.wixapis.com";

/// Default canonical site URL used by SEO assets.
pub const DEFAULT_SITE_URL: &str = "https://www.example-agritrade.com";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable required in production is unset or blank.
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
    /// A variable is set but cannot be parsed.
    #[error("invalid value for {var}: {value}")]
    InvalidValue {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
    },
    /// A URL setting is malformed.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Deployment environment.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Live site; CMS credentials are mandatory.
    Production,
    /// Anything else.
    #[default]
    Development,
}

impl Environment {
    /// Parse the environment name; anything but `production` is development.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("production") {
            Self::Production
        } else {
            Self::Development
        }
    }
}

/// CMS connection settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CmsConfig {
    /// API token sent as `Authorization`.
    pub api_token: Option<String>,
    /// CMS site identifier.
    pub site_id: Option<String>,
    /// CMS client identifier.
    pub client_id: Option<String>,
    /// API base URL.
    pub api_base_url: String,
    /// Outbound request timeout.
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            site_id: None,
            client_id: None,
            api_base_url: DEFAULT_CMS_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl CmsConfig {
    /// Set the API token.
    #[must_use]
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Set the site identifier.
    #[must_use]
    pub fn with_site_id(mut self, site_id: impl Into<String>) -> Self {
        self.site_id = Some(site_id.into());
        self
    }

    /// Set the client identifier.
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Top-level configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Deployment environment.
    pub environment: Environment,
    /// CMS connection settings.
    pub cms: CmsConfig,
    /// Canonical public URL, without trailing slash.
    pub site_url: String,
    /// Listen port.
    pub port: u16,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            cms: CmsConfig::default(),
            site_url: DEFAULT_SITE_URL.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl SiteConfig {
    /// Load configuration from process environment variables.
    ///
    /// # Errors
    /// See [`SiteConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Blank values are treated as unset.
    ///
    /// # Errors
    /// Returns an error when a production credential is missing or a value
    /// cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let environment = get("AGRITRADE_ENV")
            .map(|value| Environment::parse(&value))
            .unwrap_or_default();

        let mut cms = CmsConfig {
            api_token: get("WIX_API_TOKEN"),
            site_id: get("WIX_SITE_ID"),
            client_id: get("WIX_CLIENT_ID"),
            ..CmsConfig::default()
        };
        if let Some(base) = get("WIX_API_BASE_URL") {
            cms.api_base_url = base;
        }
        if let Some(raw) = get("AGRITRADE_REQUEST_TIMEOUT_SECS") {
            let secs = raw.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                var: "AGRITRADE_REQUEST_TIMEOUT_SECS",
                value: raw.clone(),
            })?;
            cms.request_timeout = Duration::from_secs(secs);
        }

        let port = match get("AGRITRADE_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                var: "AGRITRADE_PORT",
                value: raw.clone(),
            })?,
            None => DEFAULT_PORT,
        };

        let site_url = get("AGRITRADE_SITE_URL").unwrap_or_else(|| DEFAULT_SITE_URL.to_string());

        let config = Self {
            environment,
            cms,
            site_url: site_url.trim_end_matches('/').to_string(),
            port,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if a URL is malformed, or if a CMS credential is
    /// missing in production.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.cms.api_base_url)?;
        Url::parse(&self.site_url)?;

        if self.cms.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                var: "AGRITRADE_REQUEST_TIMEOUT_SECS",
                value: "0".to_string(),
            });
        }

        let credentials = [
            ("WIX_API_TOKEN", &self.cms.api_token),
            ("WIX_SITE_ID", &self.cms.site_id),
            ("WIX_CLIENT_ID", &self.cms.client_id),
        ];
        for (var, value) in credentials {
            if value.is_some() {
                continue;
            }
            match self.environment {
                Environment::Production => return Err(ConfigError::MissingVar(var)),
                Environment::Development => {
                    tracing::warn!("{var} is not set; CMS requests will likely be rejected");
                }
            }
        }

        Ok(())
    }
}

/// Serde module for Duration serialization.
pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
