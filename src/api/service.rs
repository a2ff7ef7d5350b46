//! Purpose: Turn slot-level intents into calls against the wrapped ad plugin.
//! Exports: `AdService`.
//! Role: Stateful coordinator; owns gating, test-mode resolution and banner bookkeeping.
//! Invariants: No public operation returns an error; failures are logged and swallowed.
//! Invariants: State is committed only after the plugin call it depends on succeeded.
//! Invariants: Showing a banner awaits hiding any other visible banner first.
//! Notes: Interstitial pre-loads run on the ambient tokio runtime, detached from callers.
use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use super::options::{InitOptions, ServiceConfig};
use super::plugin::{
    AdPlugin, AdUnitRequest, BannerRequest, ConsentRequest, HostPlatform, InitializeRequest,
    LoadFailure, LoadFailureKind, PluginProvider, PluginResult, Reward,
};
use super::state::{AdState, AdStateSnapshot};
use crate::core::error::{Error, ErrorKind, is_benign_consent_error};
use crate::core::registry::SlotRegistry;
use crate::core::slot::{AdUnitSlot, BannerSlot, SlotConfig, SlotKind, resolve_testing};

#[derive(Clone, Copy, Debug)]
enum Teardown {
    Hide,
    Remove,
}

pub struct AdService {
    registry: Arc<SlotRegistry>,
    state: Arc<AdState>,
    host: Arc<dyn HostPlatform>,
    provider: Arc<dyn PluginProvider>,
    plugin: OnceCell<Arc<dyn AdPlugin>>,
    config: ServiceConfig,
    global_testing: Mutex<Option<bool>>,
}

impl AdService {
    pub fn new(host: impl HostPlatform, provider: impl PluginProvider) -> Self {
        Self {
            registry: Arc::new(SlotRegistry::new()),
            state: Arc::new(AdState::new()),
            host: Arc::new(host),
            provider: Arc::new(provider),
            plugin: OnceCell::new(),
            config: ServiceConfig::default(),
            global_testing: Mutex::new(None),
        }
    }

    pub fn with_registry(mut self, registry: Arc<SlotRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_state(mut self, state: Arc<AdState>) -> Self {
        self.state = state;
        self
    }

    pub fn with_config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &Arc<SlotRegistry> {
        &self.registry
    }

    pub fn state(&self) -> &Arc<AdState> {
        &self.state
    }

    pub fn snapshot(&self) -> AdStateSnapshot {
        self.state.snapshot()
    }

    pub fn define_slots<I, K>(&self, slots: I)
    where
        I: IntoIterator<Item = (K, SlotConfig)>,
        K: Into<String>,
    {
        self.registry.define_slots(slots);
    }

    pub fn define_slot(&self, id: impl Into<String>, config: SlotConfig) {
        self.registry.define_slot(id, config);
    }

    pub fn get_slot(&self, id: &str) -> Option<SlotConfig> {
        self.registry.get_slot(id)
    }

    pub fn slot_ids(&self) -> Vec<String> {
        self.registry.slot_ids()
    }

    pub fn has_slot(&self, id: &str) -> bool {
        self.registry.has_slot(id)
    }

    pub fn should_show_ads(&self) -> bool {
        self.state.initialized() && !self.state.ads_removed()
    }

    /// Runs the plugin setup sequence and consent flow.
    ///
    /// Calling this again re-runs the whole sequence. On failure the
    /// `initialized` flag keeps its previous value.
    pub async fn initialize(&self, options: InitOptions) {
        if !self.host.is_native() {
            debug!("not running on a native host; ads stay disabled");
            return;
        }
        let Some(plugin) = self.plugin().await else {
            return;
        };
        match self.run_setup(plugin.as_ref(), &options).await {
            Ok(()) => {
                *self.global_testing.lock().unwrap_or_else(PoisonError::into_inner) =
                    options.is_testing;
                self.state.set_initialized(true);
                info!("ads initialized");
            }
            Err(err) => error!(error = %err, "ad initialization failed"),
        }
    }

    pub async fn set_ads_removed(&self, removed: bool) {
        self.state.set_ads_removed(removed);
        if !removed {
            return;
        }
        if let Some(current) = self.state.current_banner() {
            self.hide(&current).await;
        }
    }

    pub async fn show(&self, slot_id: &str, testing: Option<bool>) {
        if !self.can_serve("show", slot_id) {
            return;
        }
        let Some(slot) = self.lookup(slot_id) else {
            return;
        };
        match slot {
            SlotConfig::Banner(banner) => self.show_banner(slot_id, &banner, testing).await,
            SlotConfig::Interstitial(_) | SlotConfig::Rewarded(_) => {
                self.trigger(slot_id, testing).await
            }
        }
    }

    pub async fn hide(&self, slot_id: &str) {
        self.take_down(slot_id, Teardown::Hide).await;
    }

    /// Like `hide`, but detaches the banner view instead of hiding it.
    pub async fn remove(&self, slot_id: &str) {
        self.take_down(slot_id, Teardown::Remove).await;
    }

    pub async fn trigger(&self, slot_id: &str, testing: Option<bool>) {
        if !self.can_serve("trigger", slot_id) {
            return;
        }
        let Some(slot) = self.lookup(slot_id) else {
            return;
        };
        match slot {
            SlotConfig::Banner(_) => {
                let err = wrong_slot_type(slot_id, SlotKind::Banner, "interstitial or rewarded");
                warn!(error = %err, "banner slots are displayed with show/hide, not trigger")
            }
            SlotConfig::Interstitial(unit) => {
                self.trigger_interstitial(slot_id, &unit, testing).await
            }
            SlotConfig::Rewarded(unit) => {
                self.run_rewarded(slot_id, &unit, testing).await;
            }
        }
    }

    /// Shows a rewarded slot and returns the granted reward, if any.
    pub async fn trigger_rewarded(&self, slot_id: &str, testing: Option<bool>) -> Option<Reward> {
        if !self.can_serve("trigger_rewarded", slot_id) {
            return None;
        }
        match self.lookup(slot_id)? {
            SlotConfig::Rewarded(unit) => self.run_rewarded(slot_id, &unit, testing).await,
            other => {
                let err = wrong_slot_type(slot_id, other.kind(), "rewarded");
                warn!(error = %err, "skipped rewarded trigger");
                None
            }
        }
    }

    /// Loads an interstitial ahead of its trigger. Failures are ignored; the
    /// trigger prepares again anyway.
    pub async fn prepare_interstitial_slot(&self, slot_id: &str, testing: Option<bool>) {
        if !self.can_serve("prepare_interstitial", slot_id) {
            return;
        }
        let Some(slot) = self.lookup(slot_id) else {
            return;
        };
        let unit = match slot {
            SlotConfig::Interstitial(unit) => unit,
            other => {
                let err = wrong_slot_type(slot_id, other.kind(), "interstitial");
                warn!(error = %err, "skipped interstitial preparation");
                return;
            }
        };
        let Some(plugin) = self.plugin().await else {
            return;
        };
        let request = self.unit_request(&unit, testing);
        if let Err(err) = plugin.prepare_interstitial(request).await {
            debug!(slot_id, error = %err, "interstitial preparation failed");
        }
    }

    async fn plugin(&self) -> Option<Arc<dyn AdPlugin>> {
        match self.load_plugin().await {
            Ok(plugin) => Some(plugin),
            Err(err) => {
                error!(error = %err, "failed to load ad plugin");
                None
            }
        }
    }

    async fn load_plugin(&self) -> Result<Arc<dyn AdPlugin>, Error> {
        let plugin = self
            .plugin
            .get_or_try_init(|| self.provider.load())
            .await
            .map_err(|err| {
                Error::new(ErrorKind::Unavailable)
                    .with_message("ad plugin is not available on this host")
                    .with_source(err)
            })?;
        Ok(plugin.clone())
    }

    async fn run_setup(&self, plugin: &dyn AdPlugin, options: &InitOptions) -> PluginResult<()> {
        plugin
            .initialize(InitializeRequest {
                testing_devices: options.testing_devices.clone(),
                initialize_for_testing: options.initialize_for_testing(),
            })
            .await?;

        self.run_consent(plugin, options).await;

        for kind in [LoadFailureKind::Banner, LoadFailureKind::Interstitial] {
            plugin
                .add_load_failure_listener(
                    kind,
                    Arc::new(move |failure: LoadFailure| {
                        warn!(
                            kind = ?kind,
                            code = failure.code,
                            message = %failure.message,
                            "ad failed to load"
                        );
                    }),
                )
                .await?;
        }
        Ok(())
    }

    async fn run_consent(&self, plugin: &dyn AdPlugin, options: &InitOptions) {
        let request = ConsentRequest {
            debug_geography: options.consent_debug_geography,
            test_device_identifiers: options.consent_test_devices.clone(),
        };
        let result = async {
            let info = plugin.request_consent_info(request).await?;
            if info.needs_form() {
                let status = plugin.show_consent_form().await?;
                debug!(?status, "consent form completed");
            }
            PluginResult::Ok(())
        }
        .await;

        match result {
            Ok(()) => {}
            Err(err) if is_benign_consent_error(&err) => {
                debug!(error = %err, "no consent form to present")
            }
            Err(err) => warn!(error = %err, "consent flow failed"),
        }
    }

    fn can_serve(&self, op: &'static str, slot_id: &str) -> bool {
        if !self.host.is_native() {
            debug!(op, slot_id, "skipped: not running on a native host");
            return false;
        }
        if !self.state.initialized() {
            debug!(op, slot_id, "skipped: ads are not initialized");
            return false;
        }
        if self.state.ads_removed() {
            debug!(op, slot_id, "skipped: ads are removed");
            return false;
        }
        true
    }

    fn lookup(&self, slot_id: &str) -> Option<SlotConfig> {
        match self.find_slot(slot_id) {
            Ok(slot) => Some(slot),
            Err(err) => {
                warn!(error = %err, "skipped ad slot");
                None
            }
        }
    }

    fn find_slot(&self, slot_id: &str) -> Result<SlotConfig, Error> {
        let slot = self.registry.get_slot(slot_id).ok_or_else(|| {
            Error::new(ErrorKind::NotFound)
                .with_message("unknown ad slot")
                .with_slot(slot_id)
        })?;
        slot.validate().map_err(|err| err.with_slot(slot_id))?;
        Ok(slot)
    }

    fn effective_testing(&self, call_site: Option<bool>, slot: Option<bool>) -> bool {
        let global = *self.global_testing.lock().unwrap_or_else(PoisonError::into_inner);
        resolve_testing(call_site.or(global), slot)
    }

    fn unit_request(&self, unit: &AdUnitSlot, testing: Option<bool>) -> AdUnitRequest {
        AdUnitRequest {
            ad_id: unit.ad_id.clone(),
            is_testing: self.effective_testing(testing, unit.is_testing),
        }
    }

    async fn show_banner(&self, slot_id: &str, banner: &BannerSlot, testing: Option<bool>) {
        let Some(plugin) = self.plugin().await else {
            return;
        };
        let placement = banner.resolve();
        let request = BannerRequest {
            ad_id: banner.ad_id.clone(),
            size: placement.size,
            position: placement.position,
            margin: placement.margin,
            is_testing: self.effective_testing(testing, banner.is_testing),
        };

        if let Some(previous) = self.state.current_banner() {
            if previous != slot_id {
                self.hide(&previous).await;
            }
        }

        match plugin.show_banner(request).await {
            Ok(()) => {
                self.state.set_current_banner(Some(slot_id.to_string()));
                debug!(slot_id, "banner shown");
            }
            Err(err) => error!(slot_id, error = %err, "failed to show banner"),
        }
    }

    async fn take_down(&self, slot_id: &str, teardown: Teardown) {
        if !self.host.is_native() || !self.state.is_current_banner(slot_id) {
            debug!(slot_id, ?teardown, "skipped: banner is not visible");
            return;
        }
        let Some(plugin) = self.plugin().await else {
            return;
        };
        let result = match teardown {
            Teardown::Hide => plugin.hide_banner().await,
            Teardown::Remove => plugin.remove_banner().await,
        };
        match result {
            Ok(()) => {
                self.state.set_current_banner(None);
                debug!(slot_id, ?teardown, "banner taken down");
            }
            // TODO: reconcile with the plugin; it may already have torn the view down.
            Err(err) => error!(slot_id, ?teardown, error = %err, "failed to take down banner"),
        }
    }

    async fn trigger_interstitial(&self, slot_id: &str, unit: &AdUnitSlot, testing: Option<bool>) {
        let Some(plugin) = self.plugin().await else {
            return;
        };
        let request = self.unit_request(unit, testing);
        let shown = async {
            plugin.prepare_interstitial(request.clone()).await?;
            plugin.show_interstitial().await
        }
        .await;

        match shown {
            Ok(()) => {
                debug!(slot_id, "interstitial shown");
                self.schedule_preload(slot_id, plugin, request);
            }
            Err(err) => error!(slot_id, error = %err, "failed to show interstitial"),
        }
    }

    fn schedule_preload(&self, slot_id: &str, plugin: Arc<dyn AdPlugin>, request: AdUnitRequest) {
        let Ok(runtime) = Handle::try_current() else {
            debug!(slot_id, "no async runtime; skipping interstitial pre-load");
            return;
        };
        let delay = self.config.preload_delay;
        let slot_id = slot_id.to_string();
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(err) = plugin.prepare_interstitial(request).await {
                debug!(slot_id = %slot_id, error = %err, "interstitial pre-load failed");
            }
        });
    }

    async fn run_rewarded(
        &self,
        slot_id: &str,
        unit: &AdUnitSlot,
        testing: Option<bool>,
    ) -> Option<Reward> {
        let plugin = self.plugin().await?;
        let request = self.unit_request(unit, testing);
        let shown = async {
            plugin.prepare_rewarded(request).await?;
            plugin.show_rewarded().await
        }
        .await;

        match shown {
            Ok(reward) => {
                info!(
                    slot_id,
                    amount = reward.amount,
                    reward_type = %reward.reward_type,
                    "reward granted"
                );
                Some(reward)
            }
            Err(err) => {
                error!(slot_id, error = %err, "failed to show rewarded ad");
                None
            }
        }
    }
}

fn wrong_slot_type(slot_id: &str, found: SlotKind, expected: &str) -> Error {
    Error::new(ErrorKind::WrongSlotType)
        .with_message(format!("expected a {expected} slot, found {found}"))
        .with_slot(slot_id)
}

#[cfg(test)]
mod tests {
    use super::{AdService, wrong_slot_type};
    use crate::api::options::{InitOptions, ServiceConfig};
    use crate::api::plugin::{
        AdPlugin, BannerRequest, ConsentInfo, ConsentStatus, Host, LoadFailure, LoadFailureKind,
        PluginProvider, PluginResult, Reward,
    };
    use crate::api::simulated::{CallKind, PluginCall, SimulatedPlugin};
    use crate::core::error::{Error, ErrorKind};
    use crate::core::slot::{BannerPosition, BannerSize, BannerSlot, SlotConfig, SlotKind};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    struct MissingModule;

    #[async_trait]
    impl PluginProvider for MissingModule {
        async fn load(&self) -> PluginResult<Arc<dyn AdPlugin>> {
            Err(Error::plugin("native module missing"))
        }
    }

    fn native_service() -> (AdService, Arc<SimulatedPlugin>) {
        let plugin = Arc::new(SimulatedPlugin::new());
        let service = AdService::new(Host::Native, plugin.clone());
        (service, plugin)
    }

    async fn ready_service() -> (AdService, Arc<SimulatedPlugin>) {
        let (service, plugin) = native_service();
        service.initialize(InitOptions::default()).await;
        assert!(service.state().initialized());
        plugin.clear_calls();
        (service, plugin)
    }

    fn shown_banner(calls: &[PluginCall]) -> Option<&BannerRequest> {
        calls.iter().find_map(|call| match call {
            PluginCall::ShowBanner(request) => Some(request),
            _ => None,
        })
    }

    #[tokio::test]
    async fn initialize_on_web_host_makes_no_calls() {
        let plugin = Arc::new(SimulatedPlugin::new());
        let service = AdService::new(Host::Web, plugin.clone());
        service.initialize(InitOptions::default()).await;

        assert!(!service.state().initialized());
        assert!(plugin.calls().is_empty());
    }

    #[tokio::test]
    async fn initialize_runs_setup_sequence() {
        let (service, plugin) = native_service();
        let options = InitOptions {
            testing_devices: vec!["dev-1".to_string()],
            ..InitOptions::default()
        };
        service.initialize(options).await;

        assert!(service.state().initialized());
        assert_eq!(
            plugin.call_kinds(),
            vec![
                CallKind::Initialize,
                CallKind::RequestConsentInfo,
                CallKind::AddLoadFailureListener,
                CallKind::AddLoadFailureListener,
            ]
        );
        let PluginCall::Initialize(request) = &plugin.calls()[0] else {
            panic!("expected initialize first");
        };
        assert!(request.initialize_for_testing);
        assert_eq!(request.testing_devices, vec!["dev-1"]);
    }

    #[tokio::test]
    async fn consent_form_presented_when_required() {
        let (service, plugin) = native_service();
        plugin.set_consent(ConsentInfo {
            form_available: true,
            status: ConsentStatus::Required,
        });
        service.initialize(InitOptions::default()).await;

        assert!(plugin.call_kinds().contains(&CallKind::ShowConsentForm));
        assert!(service.state().initialized());
    }

    #[tokio::test]
    async fn consent_failures_never_block_initialization() {
        for message in ["No forms configured", "network down"] {
            let (service, plugin) = native_service();
            plugin.fail(CallKind::RequestConsentInfo, message);
            service.initialize(InitOptions::default()).await;
            assert!(service.state().initialized(), "{message}");
        }
    }

    #[tokio::test]
    async fn consent_form_rejection_never_blocks_initialization() {
        for message in ["No forms configured", "user dismissed the form"] {
            let (service, plugin) = native_service();
            plugin.set_consent(ConsentInfo {
                form_available: true,
                status: ConsentStatus::Required,
            });
            plugin.fail(CallKind::ShowConsentForm, message);
            service.initialize(InitOptions::default()).await;

            assert!(service.state().initialized(), "{message}");
            assert_eq!(
                plugin.call_kinds(),
                vec![
                    CallKind::Initialize,
                    CallKind::RequestConsentInfo,
                    CallKind::ShowConsentForm,
                    CallKind::AddLoadFailureListener,
                    CallKind::AddLoadFailureListener,
                ],
                "{message}"
            );
        }
    }

    #[tokio::test]
    async fn base_initialize_failure_leaves_flag_false() {
        let (service, plugin) = native_service();
        plugin.fail(CallKind::Initialize, "sdk init failed");
        service.initialize(InitOptions::default()).await;

        assert!(!service.state().initialized());
        assert_eq!(plugin.call_kinds(), vec![CallKind::Initialize]);
    }

    #[tokio::test]
    async fn listener_registration_failure_leaves_flag_false() {
        let (service, plugin) = native_service();
        plugin.fail(CallKind::AddLoadFailureListener, "bridge unavailable");
        service.initialize(InitOptions::default()).await;
        assert!(!service.state().initialized());
    }

    #[tokio::test]
    async fn reinitialize_reruns_setup() {
        let (service, plugin) = native_service();
        service.initialize(InitOptions::default()).await;
        service.initialize(InitOptions::default()).await;

        let inits = plugin
            .call_kinds()
            .into_iter()
            .filter(|kind| *kind == CallKind::Initialize)
            .count();
        assert_eq!(inits, 2);
        assert_eq!(plugin.listener_count(), 4);
    }

    #[tokio::test]
    async fn load_failure_listeners_only_log() {
        let (_service, plugin) = ready_service().await;
        let delivered = plugin.emit_load_failure(
            LoadFailureKind::Banner,
            LoadFailure {
                code: 3,
                message: "no fill".to_string(),
            },
        );
        assert_eq!(delivered, 1);
    }

    #[tokio::test]
    async fn should_show_ads_truth_table() {
        let (service, _plugin) = native_service();
        assert!(!service.should_show_ads());
        service.set_ads_removed(true).await;
        assert!(!service.should_show_ads());

        service.initialize(InitOptions::default()).await;
        assert!(!service.should_show_ads());
        service.set_ads_removed(false).await;
        assert!(service.should_show_ads());
    }

    #[tokio::test]
    async fn show_banner_applies_defaults_and_records_slot() {
        let (service, plugin) = ready_service().await;
        service.define_slot("footer", SlotConfig::banner("ca-banner"));
        service.show("footer", None).await;

        assert_eq!(service.state().current_banner().as_deref(), Some("footer"));
        let calls = plugin.calls();
        let request = shown_banner(&calls).expect("show_banner call");
        assert_eq!(request.ad_id, "ca-banner");
        assert_eq!(request.position, BannerPosition::Bottom);
        assert_eq!(request.size, BannerSize::Adaptive);
        assert_eq!(request.margin, 0.0);
        assert!(!request.is_testing);
    }

    #[tokio::test]
    async fn show_passes_configured_placement() {
        let (service, plugin) = ready_service().await;
        service.define_slot(
            "header",
            SlotConfig::Banner(BannerSlot {
                ad_id: "ca-top".to_string(),
                position: Some(BannerPosition::Top),
                size: Some(BannerSize::Leaderboard),
                margin: Some(16.0),
                is_testing: Some(true),
            }),
        );
        service.show("header", None).await;

        let calls = plugin.calls();
        let request = shown_banner(&calls).expect("show_banner call");
        assert_eq!(request.position, BannerPosition::Top);
        assert_eq!(request.size, BannerSize::Leaderboard);
        assert_eq!(request.margin, 16.0);
        assert!(request.is_testing);
    }

    #[tokio::test]
    async fn call_site_testing_overrides_slot() {
        let (service, plugin) = ready_service().await;
        service.define_slot("footer", SlotConfig::banner("b").with_testing(true));
        service.show("footer", Some(false)).await;

        let calls = plugin.calls();
        assert!(!shown_banner(&calls).expect("show_banner call").is_testing);
    }

    #[tokio::test]
    async fn init_level_testing_applies_when_call_site_is_silent() {
        let (service, plugin) = native_service();
        let options = InitOptions {
            is_testing: Some(true),
            ..InitOptions::default()
        };
        service.initialize(options).await;
        service.define_slot("footer", SlotConfig::banner("b").with_testing(false));

        service.show("footer", None).await;
        let calls = plugin.calls();
        assert!(shown_banner(&calls).expect("show_banner call").is_testing);
    }

    #[tokio::test]
    async fn failed_initialize_keeps_previous_testing_mode() {
        let (service, plugin) = ready_service().await;
        service.define_slot("footer", SlotConfig::banner("b"));

        plugin.fail(CallKind::Initialize, "sdk init failed");
        let options = InitOptions {
            is_testing: Some(true),
            ..InitOptions::default()
        };
        service.initialize(options).await;
        plugin.recover(CallKind::Initialize);
        assert!(service.state().initialized());

        plugin.clear_calls();
        service.show("footer", None).await;
        let calls = plugin.calls();
        assert!(!shown_banner(&calls).expect("show_banner call").is_testing);
    }

    #[tokio::test]
    async fn showing_second_banner_hides_first_before_showing() {
        let (service, plugin) = ready_service().await;
        service.define_slot("b1", SlotConfig::banner("x"));
        service.define_slot("b2", SlotConfig::banner("x"));

        service.show("b1", None).await;
        service.show("b2", None).await;

        assert_eq!(
            plugin.call_kinds(),
            vec![CallKind::ShowBanner, CallKind::HideBanner, CallKind::ShowBanner]
        );
        assert_eq!(service.state().current_banner().as_deref(), Some("b2"));
    }

    #[tokio::test]
    async fn reshowing_same_banner_does_not_hide() {
        let (service, plugin) = ready_service().await;
        service.define_slot("b1", SlotConfig::banner("x"));
        service.show("b1", None).await;
        service.show("b1", None).await;
        assert_eq!(plugin.call_kinds(), vec![CallKind::ShowBanner, CallKind::ShowBanner]);
    }

    #[tokio::test]
    async fn failed_banner_show_keeps_previous_state() {
        let (service, plugin) = ready_service().await;
        service.define_slot("footer", SlotConfig::banner("b"));
        plugin.fail(CallKind::ShowBanner, "no fill");
        service.show("footer", None).await;
        assert_eq!(service.state().current_banner(), None);
    }

    #[tokio::test]
    async fn show_is_gated() {
        let (service, plugin) = native_service();
        service.define_slot("footer", SlotConfig::banner("b"));
        service.show("footer", None).await;
        assert!(plugin.calls().is_empty());

        service.initialize(InitOptions::default()).await;
        plugin.clear_calls();
        service.set_ads_removed(true).await;
        service.show("footer", None).await;
        service.show("missing", None).await;
        assert!(plugin.calls().is_empty());

        service.set_ads_removed(false).await;
        service.show("missing", None).await;
        assert!(plugin.calls().is_empty());
    }

    #[tokio::test]
    async fn unit_operations_are_gated() {
        let (service, plugin) = native_service();
        service.define_slot("level-end", SlotConfig::interstitial("ca-inter"));
        service.define_slot("bonus", SlotConfig::rewarded("ca-reward"));

        service.trigger("level-end", None).await;
        service.prepare_interstitial_slot("level-end", None).await;
        assert_eq!(service.trigger_rewarded("bonus", None).await, None);
        assert!(plugin.calls().is_empty());

        service.initialize(InitOptions::default()).await;
        service.set_ads_removed(true).await;
        plugin.clear_calls();

        service.trigger("level-end", None).await;
        service.trigger("bonus", None).await;
        service.prepare_interstitial_slot("level-end", None).await;
        assert_eq!(service.trigger_rewarded("bonus", None).await, None);
        assert!(plugin.calls().is_empty());
    }

    #[tokio::test]
    async fn web_host_never_reaches_the_plugin() {
        let plugin = Arc::new(SimulatedPlugin::new());
        let service = AdService::new(Host::Web, plugin.clone());
        service.define_slot("level-end", SlotConfig::interstitial("ca-inter"));
        service.define_slot("bonus", SlotConfig::rewarded("ca-reward"));
        service.initialize(InitOptions::default()).await;

        service.trigger("level-end", None).await;
        service.prepare_interstitial_slot("level-end", None).await;
        assert_eq!(service.trigger_rewarded("bonus", None).await, None);
        assert!(plugin.calls().is_empty());
    }

    #[test]
    fn slot_lookup_errors_carry_slot_id() {
        let (service, _plugin) = native_service();
        service.define_slot("empty", SlotConfig::banner(""));

        let err = service.find_slot("missing").expect_err("unknown slot");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.slot_id(), Some("missing"));

        let err = service.find_slot("empty").expect_err("invalid slot");
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert_eq!(err.slot_id(), Some("empty"));
    }

    #[test]
    fn wrong_slot_type_names_both_kinds() {
        let err = wrong_slot_type("footer", SlotKind::Banner, "rewarded");
        assert_eq!(err.kind(), ErrorKind::WrongSlotType);
        assert_eq!(err.slot_id(), Some("footer"));
        assert_eq!(err.message(), Some("expected a rewarded slot, found banner"));
    }

    #[tokio::test]
    async fn provider_failure_is_reported_as_unavailable() {
        let service = AdService::new(Host::Native, MissingModule);
        let err = service.load_plugin().await.err().expect("load failure");
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert!(std::error::Error::source(&err).is_some());

        service.initialize(InitOptions::default()).await;
        assert!(!service.state().initialized());
    }

    #[tokio::test]
    async fn invalid_slot_is_skipped() {
        let (service, plugin) = ready_service().await;
        service.define_slot("empty", SlotConfig::banner(""));
        service.show("empty", None).await;
        assert!(plugin.calls().is_empty());
    }

    #[tokio::test]
    async fn hide_only_affects_current_banner() {
        let (service, plugin) = ready_service().await;
        service.define_slot("footer", SlotConfig::banner("b"));
        service.hide("footer").await;
        assert!(plugin.calls().is_empty());

        service.show("footer", None).await;
        service.hide("other").await;
        service.hide("footer").await;
        assert_eq!(plugin.call_kinds(), vec![CallKind::ShowBanner, CallKind::HideBanner]);
        assert_eq!(service.state().current_banner(), None);
    }

    #[tokio::test]
    async fn failed_hide_keeps_banner_current() {
        let (service, plugin) = ready_service().await;
        service.define_slot("footer", SlotConfig::banner("b"));
        service.show("footer", None).await;
        plugin.fail(CallKind::HideBanner, "not attached");
        service.hide("footer").await;
        assert_eq!(service.state().current_banner().as_deref(), Some("footer"));
    }

    #[tokio::test]
    async fn remove_detaches_banner() {
        let (service, plugin) = ready_service().await;
        service.define_slot("footer", SlotConfig::banner("b"));
        service.show("footer", None).await;
        service.remove("footer").await;
        assert_eq!(plugin.call_kinds(), vec![CallKind::ShowBanner, CallKind::RemoveBanner]);
        assert_eq!(service.state().current_banner(), None);

        service.show("footer", None).await;
        plugin.fail(CallKind::RemoveBanner, "busy");
        service.remove("footer").await;
        assert_eq!(service.state().current_banner().as_deref(), Some("footer"));
    }

    #[tokio::test]
    async fn removing_ads_hides_visible_banner() {
        let (service, plugin) = ready_service().await;
        service.define_slot("footer", SlotConfig::banner("b"));
        service.show("footer", None).await;

        service.set_ads_removed(true).await;
        assert_eq!(plugin.call_kinds(), vec![CallKind::ShowBanner, CallKind::HideBanner]);
        assert_eq!(service.state().current_banner(), None);
        assert!(!service.should_show_ads());
    }

    #[tokio::test]
    async fn trigger_on_banner_is_a_no_op() {
        let (service, plugin) = ready_service().await;
        service.define_slot("footer", SlotConfig::banner("b"));
        let before = service.snapshot();
        service.trigger("footer", None).await;
        assert!(plugin.calls().is_empty());
        assert_eq!(service.snapshot(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn interstitial_trigger_preloads_next_after_delay() {
        let (service, plugin) = ready_service().await;
        service.define_slot("level-end", SlotConfig::interstitial("ca-inter"));
        service.trigger("level-end", Some(true)).await;

        assert_eq!(
            plugin.call_kinds(),
            vec![CallKind::PrepareInterstitial, CallKind::ShowInterstitial]
        );

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(plugin.calls().len(), 2);

        tokio::time::sleep(Duration::from_millis(600)).await;
        let calls = plugin.calls();
        assert_eq!(calls.len(), 3);
        let PluginCall::PrepareInterstitial(request) = &calls[2] else {
            panic!("expected pre-load");
        };
        assert_eq!(request.ad_id, "ca-inter");
        assert!(request.is_testing);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_interstitial_skips_preload() {
        let (service, plugin) = ready_service().await;
        service.define_slot("level-end", SlotConfig::interstitial("ca-inter"));
        plugin.fail(CallKind::ShowInterstitial, "not ready");
        service.trigger("level-end", None).await;

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(
            plugin.call_kinds(),
            vec![CallKind::PrepareInterstitial, CallKind::ShowInterstitial]
        );
    }

    #[tokio::test]
    async fn show_delegates_interstitial_to_trigger() {
        let plugin = Arc::new(SimulatedPlugin::new());
        let service = AdService::new(Host::Native, plugin.clone())
            .with_config(ServiceConfig::new().with_preload_delay(Duration::from_secs(3600)));
        service.initialize(InitOptions::default()).await;
        plugin.clear_calls();

        service.define_slot("level-end", SlotConfig::interstitial("ca-inter"));
        service.show("level-end", None).await;
        assert_eq!(
            plugin.call_kinds(),
            vec![CallKind::PrepareInterstitial, CallKind::ShowInterstitial]
        );
    }

    #[tokio::test]
    async fn prepare_interstitial_slot_swallows_failure() {
        let (service, plugin) = ready_service().await;
        service.define_slot("level-end", SlotConfig::interstitial("ca-inter"));
        service.define_slot("bonus", SlotConfig::rewarded("ca-reward"));
        plugin.fail(CallKind::PrepareInterstitial, "no fill");

        service.prepare_interstitial_slot("level-end", None).await;
        service.prepare_interstitial_slot("bonus", None).await;
        assert_eq!(plugin.call_kinds(), vec![CallKind::PrepareInterstitial]);
    }

    #[tokio::test]
    async fn rewarded_returns_reward() {
        let (service, plugin) = ready_service().await;
        plugin.set_reward(Reward {
            amount: 50.0,
            reward_type: "gems".to_string(),
        });
        service.define_slot("bonus", SlotConfig::rewarded("ca-reward"));

        let reward = service.trigger_rewarded("bonus", None).await.expect("reward");
        assert_eq!(reward.amount, 50.0);
        assert_eq!(reward.reward_type, "gems");
        assert_eq!(
            plugin.call_kinds(),
            vec![CallKind::PrepareRewarded, CallKind::ShowRewarded]
        );
    }

    #[tokio::test]
    async fn rewarded_failure_and_misuse_return_none() {
        let (service, plugin) = ready_service().await;
        service.define_slot("bonus", SlotConfig::rewarded("ca-reward"));
        service.define_slot("level-end", SlotConfig::interstitial("ca-inter"));

        assert_eq!(service.trigger_rewarded("missing-id", None).await, None);
        assert_eq!(service.trigger_rewarded("level-end", None).await, None);
        assert!(plugin.calls().is_empty());

        plugin.fail(CallKind::ShowRewarded, "user closed early");
        assert_eq!(service.trigger_rewarded("bonus", None).await, None);
    }

    #[tokio::test]
    async fn trigger_runs_rewarded_flow() {
        let (service, plugin) = ready_service().await;
        service.define_slot("bonus", SlotConfig::rewarded("ca-reward"));
        service.trigger("bonus", None).await;
        assert_eq!(
            plugin.call_kinds(),
            vec![CallKind::PrepareRewarded, CallKind::ShowRewarded]
        );
    }

    #[tokio::test]
    async fn registry_delegation() {
        let (service, _plugin) = native_service();
        service.define_slots([("a", SlotConfig::banner("1")), ("b", SlotConfig::rewarded("2"))]);
        assert!(service.has_slot("a"));
        assert_eq!(service.get_slot("b"), Some(SlotConfig::rewarded("2")));
        assert_eq!(service.slot_ids().len(), 2);
    }
}
