//! Purpose: Expose the service's flags as observable cells for UI layers.
//! Exports: `ReactiveAds`.
//! Role: Presentation convenience; re-exports service operations unchanged.
//! Invariants: Holds no state of its own; every view derives from `AdState`.
use std::sync::Arc;

use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::{Stream, StreamExt};

use super::options::InitOptions;
use super::plugin::Reward;
use super::service::AdService;
use super::state::AdStateSnapshot;
use crate::core::slot::SlotConfig;

#[derive(Clone)]
pub struct ReactiveAds {
    service: Arc<AdService>,
}

impl ReactiveAds {
    pub fn new(service: Arc<AdService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<AdService> {
        &self.service
    }

    pub fn initialized(&self) -> watch::Receiver<bool> {
        self.service.state().subscribe_initialized()
    }

    pub fn ads_removed(&self) -> watch::Receiver<bool> {
        self.service.state().subscribe_ads_removed()
    }

    pub fn current_banner_slot(&self) -> watch::Receiver<Option<String>> {
        self.service.state().subscribe_current_banner()
    }

    pub fn banner_visible(&self) -> bool {
        self.service.state().current_banner().is_some()
    }

    pub fn is_slot_visible(&self, slot_id: &str) -> bool {
        self.service.state().is_current_banner(slot_id)
    }

    /// Yields the current visibility, then every change to it.
    pub fn banner_visible_stream(&self) -> impl Stream<Item = bool> + Send + 'static {
        WatchStream::new(self.current_banner_slot()).map(|slot| slot.is_some())
    }

    pub fn snapshot(&self) -> AdStateSnapshot {
        self.service.snapshot()
    }

    pub fn define_slots<I, K>(&self, slots: I)
    where
        I: IntoIterator<Item = (K, SlotConfig)>,
        K: Into<String>,
    {
        self.service.define_slots(slots);
    }

    pub fn define_slot(&self, id: impl Into<String>, config: SlotConfig) {
        self.service.define_slot(id, config);
    }

    pub fn get_slot(&self, id: &str) -> Option<SlotConfig> {
        self.service.get_slot(id)
    }

    pub fn slot_ids(&self) -> Vec<String> {
        self.service.slot_ids()
    }

    pub fn has_slot(&self, id: &str) -> bool {
        self.service.has_slot(id)
    }

    pub fn should_show_ads(&self) -> bool {
        self.service.should_show_ads()
    }

    pub async fn initialize(&self, options: InitOptions) {
        self.service.initialize(options).await;
    }

    pub async fn set_ads_removed(&self, removed: bool) {
        self.service.set_ads_removed(removed).await;
    }

    pub async fn show(&self, slot_id: &str, testing: Option<bool>) {
        self.service.show(slot_id, testing).await;
    }

    pub async fn hide(&self, slot_id: &str) {
        self.service.hide(slot_id).await;
    }

    pub async fn remove(&self, slot_id: &str) {
        self.service.remove(slot_id).await;
    }

    pub async fn trigger(&self, slot_id: &str, testing: Option<bool>) {
        self.service.trigger(slot_id, testing).await;
    }

    pub async fn trigger_rewarded(&self, slot_id: &str, testing: Option<bool>) -> Option<Reward> {
        self.service.trigger_rewarded(slot_id, testing).await
    }

    pub async fn prepare_interstitial_slot(&self, slot_id: &str, testing: Option<bool>) {
        self.service.prepare_interstitial_slot(slot_id, testing).await;
    }
}

impl From<Arc<AdService>> for ReactiveAds {
    fn from(service: Arc<AdService>) -> Self {
        Self::new(service)
    }
}
