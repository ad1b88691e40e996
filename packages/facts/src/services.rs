//! Compile-time registry of upstream service configurations.
//!
//! Each upstream service is defined in a TOML file under `services/`. The
//! registry embeds these at compile time. Endpoints can be overridden at
//! runtime through the environment variable each service names in
//! `url_env`; secrets are always read from the environment.

use serde::Deserialize;

use crate::FactsError;

/// An upstream service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Unique identifier (e.g., `"geoclient"`, `"pluto"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Whether the service may be used.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Environment variable that overrides the endpoint URL.
    pub url_env: Option<String>,
    /// Provider-specific configuration.
    pub provider: ProviderConfig,
}

/// Provider-specific configuration, tagged by `type` in TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// NYC Geoclient address geocoder.
    Geoclient {
        /// API base URL (e.g., `"https://api.nyc.gov/geo/geoclient/v2"`).
        base_url: String,
        /// Environment variable holding the subscription key.
        key_env: String,
    },
    /// Socrata SODA dataset endpoint.
    Socrata {
        /// Dataset resource URL.
        base_url: String,
        /// Environment variable holding an optional app token.
        app_token_env: Option<String>,
    },
    /// `ArcGIS` `FeatureServer` layer query endpoint.
    ArcGis {
        /// Layer query URL.
        query_url: String,
        /// Attribute holding the zone label.
        label_field: String,
    },
}

const fn default_true() -> bool {
    true
}

impl ServiceConfig {
    /// Returns the configured endpoint regardless of provider.
    #[must_use]
    pub fn base_url(&self) -> &str {
        match &self.provider {
            ProviderConfig::Geoclient { base_url, .. } | ProviderConfig::Socrata { base_url, .. } => {
                base_url
            }
            ProviderConfig::ArcGis { query_url, .. } => query_url,
        }
    }

    /// Returns the endpoint, preferring a non-empty value of the
    /// service's `url_env` variable.
    #[must_use]
    pub fn resolved_url(&self) -> String {
        self.url_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| self.base_url().to_string())
    }
}

// ── Compile-time embedded TOML files ────────────────────────────────

const SERVICE_TOMLS: &[(&str, &str)] = &[
    ("geoclient", include_str!("../services/geoclient.toml")),
    ("pluto", include_str!("../services/pluto.toml")),
    ("transit_zones", include_str!("../services/transit_zones.toml")),
];

#[cfg(test)]
const EXPECTED_SERVICE_COUNT: usize = 3;

/// Returns all service configurations (enabled and disabled).
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_services() -> Vec<ServiceConfig> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse service '{name}': {e}"))
        })
        .collect()
}

/// Returns the enabled service with the given id.
///
/// # Errors
///
/// Returns [`FactsError::Config`] if no enabled service has that id.
pub fn service(id: &str) -> Result<ServiceConfig, FactsError> {
    all_services()
        .into_iter()
        .find(|s| s.id == id && s.enabled)
        .ok_or_else(|| FactsError::Config {
            message: format!("No enabled service with id '{id}'"),
        })
}

/// Reads a required secret from the environment.
///
/// # Errors
///
/// Returns [`FactsError::Config`] if the variable is unset or empty.
pub fn required_env(var: &str) -> Result<String, FactsError> {
    std::env::var(var)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| FactsError::Config {
            message: format!("{var} environment variable is not set"),
        })
}

/// Reads an optional setting from the environment, treating an empty
/// value as unset.
#[must_use]
pub fn optional_env(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .filter(|value| !value.trim().is_empty())
}
