//! Environment-backed runtime configuration for `bondly-cli`.

use std::{env, path::PathBuf};

use client_core::NetworkFailurePolicy;
use client_http::parse_base_url;
use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:7777";
const DEFAULT_DATA_DIR: &str = "./.bondly-cli-store";
const SESSION_FILENAME: &str = "session.json";

/// Runtime configuration used by the terminal client.
#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    /// Base URL of the Bondly API.
    pub api_url: Url,
    /// Directory holding the persisted session.
    pub data_dir: PathBuf,
    /// Optional email prefill for `login`.
    pub prefill_email: Option<String>,
    /// Optional password prefill for `login`.
    pub prefill_password: Option<String>,
    /// Startup verification behavior when the API is unreachable.
    pub network_policy: NetworkFailurePolicy,
}

impl CliConfig {
    /// Parse configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(mut lookup: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let raw_api_url = optional_trimmed_env("BONDLY_API_URL", &mut lookup)
            .unwrap_or_else(|| DEFAULT_API_URL.to_owned());
        let api_url = parse_base_url(&raw_api_url).map_err(|err| ConfigError::InvalidValue {
            key: "BONDLY_API_URL",
            value: raw_api_url.clone(),
            reason: err.message,
        })?;

        let data_dir = optional_trimmed_env("BONDLY_DATA_DIR", &mut lookup)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let prefill_email = optional_trimmed_env("BONDLY_EMAIL", &mut lookup);
        let prefill_password = optional_trimmed_env("BONDLY_PASSWORD", &mut lookup);

        let network_policy = match optional_trimmed_env("BONDLY_VERIFY_NETWORK_POLICY", &mut lookup)
        {
            Some(value) => value
                .parse::<NetworkFailurePolicy>()
                .map_err(|reason| ConfigError::InvalidValue {
                    key: "BONDLY_VERIFY_NETWORK_POLICY",
                    value,
                    reason,
                })?,
            None => NetworkFailurePolicy::default(),
        };

        Ok(Self {
            api_url,
            data_dir,
            prefill_email,
            prefill_password,
            network_policy,
        })
    }

    /// Location of the persisted session file.
    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join(SESSION_FILENAME)
    }
}

/// Errors produced while parsing runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("invalid {key}='{value}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

fn optional_trimmed_env<F>(key: &'static str, lookup: &mut F) -> Option<String>
where
    F: FnMut(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}
