// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client and dispatcher configuration.
//!
//! Supports both programmatic and file-based configuration:
//!
//! ```toml
//! [client]
//! namespace = "prod"
//! default_timeout_ms = 2500
//!
//! [dispatcher]
//! namespace = "prod"
//! routing_key = "node-7"
//! max_in_flight = 64
//! ```

use crate::subject::{validate_token, NameKind, DEFAULT_NAMESPACE, DELIMITER};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Namespace prefixed to every subject.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Timeout applied when a call sets neither a timeout nor a deadline (ms).
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,

    /// Prefix of the per-call reply subjects.
    #[serde(default = "default_inbox_prefix")]
    pub inbox_prefix: String,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_inbox_prefix() -> String {
    "_INBOX".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            default_timeout_ms: default_timeout_ms(),
            inbox_prefix: default_inbox_prefix(),
        }
    }
}

impl ClientConfig {
    /// Set the namespace.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the default call timeout.
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the inbox prefix.
    pub fn inbox_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.inbox_prefix = prefix.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_token(NameKind::Namespace, &self.namespace)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.default_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "default_timeout_ms must be greater than zero".into(),
            ));
        }

        // The prefix may span several tokens, but none may be a wildcard.
        let bad_prefix = self.inbox_prefix.is_empty()
            || self
                .inbox_prefix
                .split(DELIMITER)
                .any(|t| validate_token(NameKind::Namespace, t).is_err());
        if bad_prefix {
            return Err(ConfigError::Invalid(format!(
                "invalid inbox prefix {:?}",
                self.inbox_prefix
            )));
        }

        Ok(())
    }
}

/// Dispatcher configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Namespace the dispatcher subscribes under.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Queue group shared by the instances of a service.
    /// Defaults to the service name.
    #[serde(default)]
    pub queue_group: Option<String>,

    /// Per-instance routing key. When set, the dispatcher also consumes
    /// subjects addressed to this key, outside the queue group.
    #[serde(default)]
    pub routing_key: Option<String>,

    /// Upper bound on concurrently running invocations (unbounded if unset).
    #[serde(default)]
    pub max_in_flight: Option<usize>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            queue_group: None,
            routing_key: None,
            max_in_flight: None,
        }
    }
}

impl DispatcherConfig {
    /// Set the namespace.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Override the queue group.
    pub fn queue_group(mut self, group: impl Into<String>) -> Self {
        self.queue_group = Some(group.into());
        self
    }

    /// Set the per-instance routing key.
    pub fn routing_key(mut self, key: impl Into<String>) -> Self {
        self.routing_key = Some(key.into());
        self
    }

    /// Bound the number of concurrent invocations.
    pub fn max_in_flight(mut self, limit: usize) -> Self {
        self.max_in_flight = Some(limit);
        self
    }

    /// Queue group used for `service`.
    pub fn queue_group_for(&self, service: &str) -> String {
        self.queue_group
            .clone()
            .unwrap_or_else(|| service.to_string())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_token(NameKind::Namespace, &self.namespace)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if let Some(key) = &self.routing_key {
            validate_token(NameKind::RoutingKey, key)
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }

        if let Some(group) = &self.queue_group {
            if group.is_empty() || group.chars().any(|c| c.is_whitespace()) {
                return Err(ConfigError::Invalid(format!(
                    "invalid queue group {:?}",
                    group
                )));
            }
        }

        if self.max_in_flight == Some(0) {
            return Err(ConfigError::Invalid(
                "max_in_flight must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}

/// Combined configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcConfig {
    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub dispatcher: DispatcherConfig,
}

impl RpcConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.client.validate()?;
        self.dispatcher.validate()
    }
}
