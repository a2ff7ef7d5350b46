//! Purpose: In-process `AdPlugin` that records calls and injects failures on demand.
//! Exports: `SimulatedPlugin`, `PluginCall`, `CallKind`.
//! Role: Stand-in for the native ad SDK in tests and `adslot simulate`.
//! Invariants: Every call is recorded before its injected failure (if any) is returned.
//! Invariants: Recorded order equals the order in which the service issued requests.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::plugin::{
    AdPlugin, AdUnitRequest, BannerRequest, ConsentInfo, ConsentRequest, ConsentStatus,
    InitializeRequest, LoadFailure, LoadFailureKind, LoadFailureListener, PluginResult, Reward,
};
use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    Initialize,
    RequestConsentInfo,
    ShowConsentForm,
    AddLoadFailureListener,
    ShowBanner,
    HideBanner,
    RemoveBanner,
    PrepareInterstitial,
    ShowInterstitial,
    PrepareRewarded,
    ShowRewarded,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum PluginCall {
    Initialize(InitializeRequest),
    RequestConsentInfo(ConsentRequest),
    ShowConsentForm,
    AddLoadFailureListener { kind: LoadFailureKind },
    ShowBanner(BannerRequest),
    HideBanner,
    RemoveBanner,
    PrepareInterstitial(AdUnitRequest),
    ShowInterstitial,
    PrepareRewarded(AdUnitRequest),
    ShowRewarded,
}

impl PluginCall {
    pub fn kind(&self) -> CallKind {
        match self {
            PluginCall::Initialize(_) => CallKind::Initialize,
            PluginCall::RequestConsentInfo(_) => CallKind::RequestConsentInfo,
            PluginCall::ShowConsentForm => CallKind::ShowConsentForm,
            PluginCall::AddLoadFailureListener { .. } => CallKind::AddLoadFailureListener,
            PluginCall::ShowBanner(_) => CallKind::ShowBanner,
            PluginCall::HideBanner => CallKind::HideBanner,
            PluginCall::RemoveBanner => CallKind::RemoveBanner,
            PluginCall::PrepareInterstitial(_) => CallKind::PrepareInterstitial,
            PluginCall::ShowInterstitial => CallKind::ShowInterstitial,
            PluginCall::PrepareRewarded(_) => CallKind::PrepareRewarded,
            PluginCall::ShowRewarded => CallKind::ShowRewarded,
        }
    }
}

struct Inner {
    calls: Vec<PluginCall>,
    failures: HashMap<CallKind, String>,
    consent: ConsentInfo,
    consent_form_status: ConsentStatus,
    reward: Reward,
    listeners: Vec<(LoadFailureKind, LoadFailureListener)>,
}

pub struct SimulatedPlugin {
    inner: Mutex<Inner>,
}

impl SimulatedPlugin {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                calls: Vec::new(),
                failures: HashMap::new(),
                consent: ConsentInfo {
                    form_available: false,
                    status: ConsentStatus::NotRequired,
                },
                consent_form_status: ConsentStatus::Obtained,
                reward: Reward {
                    amount: 1.0,
                    reward_type: "coins".to_string(),
                },
                listeners: Vec::new(),
            }),
        }
    }

    /// Makes every later call of `kind` reject with `message`.
    pub fn fail(&self, kind: CallKind, message: impl Into<String>) {
        self.lock().failures.insert(kind, message.into());
    }

    pub fn recover(&self, kind: CallKind) {
        self.lock().failures.remove(&kind);
    }

    pub fn set_consent(&self, consent: ConsentInfo) {
        self.lock().consent = consent;
    }

    pub fn set_reward(&self, reward: Reward) {
        self.lock().reward = reward;
    }

    pub fn calls(&self) -> Vec<PluginCall> {
        self.lock().calls.clone()
    }

    pub fn call_kinds(&self) -> Vec<CallKind> {
        self.lock().calls.iter().map(PluginCall::kind).collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    /// Delivers a load failure to matching listeners; returns how many were notified.
    pub fn emit_load_failure(&self, kind: LoadFailureKind, failure: LoadFailure) -> usize {
        let listeners: Vec<LoadFailureListener> = self
            .lock()
            .listeners
            .iter()
            .filter(|(listener_kind, _)| *listener_kind == kind)
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in &listeners {
            listener(failure.clone());
        }
        listeners.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: PluginCall) -> PluginResult<()> {
        let kind = call.kind();
        let mut inner = self.lock();
        inner.calls.push(call);
        match inner.failures.get(&kind) {
            Some(message) => {
                let error_kind = match kind {
                    CallKind::RequestConsentInfo | CallKind::ShowConsentForm => ErrorKind::Consent,
                    _ => ErrorKind::Plugin,
                };
                Err(Error::new(error_kind).with_message(message.clone()))
            }
            None => Ok(()),
        }
    }
}

impl Default for SimulatedPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AdPlugin for SimulatedPlugin {
    async fn initialize(&self, request: InitializeRequest) -> PluginResult<()> {
        self.record(PluginCall::Initialize(request))
    }

    async fn request_consent_info(&self, request: ConsentRequest) -> PluginResult<ConsentInfo> {
        self.record(PluginCall::RequestConsentInfo(request))?;
        Ok(self.lock().consent)
    }

    async fn show_consent_form(&self) -> PluginResult<ConsentStatus> {
        self.record(PluginCall::ShowConsentForm)?;
        Ok(self.lock().consent_form_status)
    }

    async fn add_load_failure_listener(
        &self,
        kind: LoadFailureKind,
        listener: LoadFailureListener,
    ) -> PluginResult<()> {
        self.record(PluginCall::AddLoadFailureListener { kind })?;
        self.lock().listeners.push((kind, listener));
        Ok(())
    }

    async fn show_banner(&self, request: BannerRequest) -> PluginResult<()> {
        self.record(PluginCall::ShowBanner(request))
    }

    async fn hide_banner(&self) -> PluginResult<()> {
        self.record(PluginCall::HideBanner)
    }

    async fn remove_banner(&self) -> PluginResult<()> {
        self.record(PluginCall::RemoveBanner)
    }

    async fn prepare_interstitial(&self, request: AdUnitRequest) -> PluginResult<()> {
        self.record(PluginCall::PrepareInterstitial(request))
    }

    async fn show_interstitial(&self) -> PluginResult<()> {
        self.record(PluginCall::ShowInterstitial)
    }

    async fn prepare_rewarded(&self, request: AdUnitRequest) -> PluginResult<()> {
        self.record(PluginCall::PrepareRewarded(request))
    }

    async fn show_rewarded(&self) -> PluginResult<Reward> {
        self.record(PluginCall::ShowRewarded)?;
        Ok(self.lock().reward.clone())
    }
}
