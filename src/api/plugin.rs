//! Purpose: Describe the external ad plugin and host detection as injectable traits.
//! Exports: `AdPlugin`, `HostPlatform`, `PluginProvider`, request/response types.
//! Role: Seam between the service and whatever actually renders ads.
//! Invariants: Every plugin call may suspend; rejections surface as `Error` values.
//! Invariants: Implementations must be `Send + Sync`; the service shares them via `Arc`.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::options::ConsentDebugGeography;
use crate::core::error::Error;
use crate::core::slot::{BannerPosition, BannerSize};

pub type PluginResult<T> = Result<T, Error>;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeRequest {
    pub testing_devices: Vec<String>,
    pub initialize_for_testing: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentRequest {
    pub debug_geography: ConsentDebugGeography,
    pub test_device_identifiers: Vec<String>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsentStatus {
    Required,
    NotRequired,
    Obtained,
    Unknown,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentInfo {
    pub form_available: bool,
    pub status: ConsentStatus,
}

impl ConsentInfo {
    /// The form is shown only when it exists and consent is still open.
    pub fn needs_form(&self) -> bool {
        self.form_available
            && matches!(self.status, ConsentStatus::Required | ConsentStatus::Unknown)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerRequest {
    pub ad_id: String,
    pub size: BannerSize,
    pub position: BannerPosition,
    pub margin: f64,
    pub is_testing: bool,
}

/// Interstitial and rewarded units are prepared from the same request shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdUnitRequest {
    pub ad_id: String,
    pub is_testing: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub amount: f64,
    pub reward_type: String,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadFailureKind {
    Banner,
    Interstitial,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoadFailure {
    pub code: i32,
    pub message: String,
}

pub type LoadFailureListener = Arc<dyn Fn(LoadFailure) + Send + Sync>;

#[async_trait]
pub trait AdPlugin: Send + Sync + 'static {
    async fn initialize(&self, request: InitializeRequest) -> PluginResult<()>;

    async fn request_consent_info(&self, request: ConsentRequest) -> PluginResult<ConsentInfo>;

    async fn show_consent_form(&self) -> PluginResult<ConsentStatus>;

    async fn add_load_failure_listener(
        &self,
        kind: LoadFailureKind,
        listener: LoadFailureListener,
    ) -> PluginResult<()>;

    async fn show_banner(&self, request: BannerRequest) -> PluginResult<()>;

    async fn hide_banner(&self) -> PluginResult<()>;

    async fn remove_banner(&self) -> PluginResult<()>;

    async fn prepare_interstitial(&self, request: AdUnitRequest) -> PluginResult<()>;

    async fn show_interstitial(&self) -> PluginResult<()>;

    async fn prepare_rewarded(&self, request: AdUnitRequest) -> PluginResult<()>;

    async fn show_rewarded(&self) -> PluginResult<Reward>;
}

/// Reports whether ads can run at all in the current process.
pub trait HostPlatform: Send + Sync + 'static {
    fn is_native(&self) -> bool;
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Host {
    Native,
    Web,
}

impl HostPlatform for Host {
    fn is_native(&self) -> bool {
        matches!(self, Host::Native)
    }
}

/// Deferred binding to the plugin so web builds never load native code.
///
/// The service calls `load` at most once successfully and caches the result.
#[async_trait]
pub trait PluginProvider: Send + Sync + 'static {
    async fn load(&self) -> PluginResult<Arc<dyn AdPlugin>>;
}

#[async_trait]
impl<P: AdPlugin> PluginProvider for Arc<P> {
    async fn load(&self) -> PluginResult<Arc<dyn AdPlugin>> {
        let plugin: Arc<dyn AdPlugin> = self.clone();
        Ok(plugin)
    }
}
