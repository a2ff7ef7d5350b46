//! Purpose: Initialization options and service tunables.
//! Exports: `InitOptions`, `ConsentDebugGeography`, `ServiceConfig`.
//! Role: Configuration inputs; parsed from JSON by hosts and the CLI.
//! Invariants: Unset options resolve to the documented defaults, never to errors.
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsentDebugGeography {
    Eea,
    #[default]
    NotEea,
    Disabled,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitOptions {
    pub testing_devices: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initialize_for_testing: Option<bool>,
    pub consent_debug_geography: ConsentDebugGeography,
    pub consent_test_devices: Vec<String>,
    /// Global test-mode override, applied when a call site passes none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_testing: Option<bool>,
}

impl InitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> Result<Self, Error> {
        serde_json::from_str(text).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("invalid init options: {err}"))
                .with_source(err)
        })
    }

    /// Defaults to `true` exactly when testing devices are listed.
    pub fn initialize_for_testing(&self) -> bool {
        self.initialize_for_testing
            .unwrap_or(!self.testing_devices.is_empty())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Delay before pre-loading the next interstitial after one was shown.
    pub preload_delay: Duration,
}

impl ServiceConfig {
    pub fn new() -> Self {
        Self {
            preload_delay: Duration::from_secs(1),
        }
    }

    pub fn with_preload_delay(mut self, delay: Duration) -> Self {
        self.preload_delay = delay;
        self
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new()
    }
}
