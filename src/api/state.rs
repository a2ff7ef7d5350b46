//! Purpose: Injectable container for the service's mutable ad flags.
//! Exports: `AdState`, `AdStateSnapshot`.
//! Role: Single source of truth for `initialized`, `adsRemoved` and the visible banner.
//! Invariants: Only `AdService` mutates these cells; observers get read-only receivers.
//! Invariants: At most one banner slot id is recorded as visible.
use serde::Serialize;
use tokio::sync::watch;

#[derive(Debug)]
pub struct AdState {
    initialized: watch::Sender<bool>,
    ads_removed: watch::Sender<bool>,
    current_banner: watch::Sender<Option<String>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdStateSnapshot {
    pub initialized: bool,
    pub ads_removed: bool,
    pub current_banner_slot: Option<String>,
}

impl AdState {
    pub fn new() -> Self {
        Self {
            initialized: watch::channel(false).0,
            ads_removed: watch::channel(false).0,
            current_banner: watch::channel(None).0,
        }
    }

    pub fn initialized(&self) -> bool {
        *self.initialized.borrow()
    }

    pub fn ads_removed(&self) -> bool {
        *self.ads_removed.borrow()
    }

    pub fn current_banner(&self) -> Option<String> {
        self.current_banner.borrow().clone()
    }

    pub fn is_current_banner(&self, slot_id: &str) -> bool {
        self.current_banner.borrow().as_deref() == Some(slot_id)
    }

    pub fn snapshot(&self) -> AdStateSnapshot {
        AdStateSnapshot {
            initialized: self.initialized(),
            ads_removed: self.ads_removed(),
            current_banner_slot: self.current_banner(),
        }
    }

    pub fn subscribe_initialized(&self) -> watch::Receiver<bool> {
        self.initialized.subscribe()
    }

    pub fn subscribe_ads_removed(&self) -> watch::Receiver<bool> {
        self.ads_removed.subscribe()
    }

    pub fn subscribe_current_banner(&self) -> watch::Receiver<Option<String>> {
        self.current_banner.subscribe()
    }

    pub(crate) fn set_initialized(&self, value: bool) {
        self.initialized.send_if_modified(|current| replace_if_changed(current, value));
    }

    pub(crate) fn set_ads_removed(&self, value: bool) {
        self.ads_removed.send_if_modified(|current| replace_if_changed(current, value));
    }

    pub(crate) fn set_current_banner(&self, slot_id: Option<String>) {
        self.current_banner
            .send_if_modified(|current| replace_if_changed(current, slot_id));
    }
}

impl Default for AdState {
    fn default() -> Self {
        Self::new()
    }
}

fn replace_if_changed<T: PartialEq>(current: &mut T, value: T) -> bool {
    if *current == value {
        return false;
    }
    *current = value;
    true
}
