//! Purpose: Define the stable public Rust API boundary for ad slots.
//! Exports: Service, reactive adapter, plugin seam, options and core re-exports.
//! Role: Public, additive-only surface used by host applications and the CLI.
//! Invariants: This module is the only public path applications need.

mod options;
mod plugin;
mod reactive;
mod service;
mod simulated;
mod state;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::registry::SlotRegistry;
pub use crate::core::slot::{
    AdUnitSlot, BannerPosition, BannerSize, BannerSlot, ResolvedBanner, SlotConfig, SlotKind,
};
pub use options::{ConsentDebugGeography, InitOptions, ServiceConfig};
pub use plugin::{
    AdPlugin, AdUnitRequest, BannerRequest, ConsentInfo, ConsentRequest, ConsentStatus, Host,
    HostPlatform, InitializeRequest, LoadFailure, LoadFailureKind, LoadFailureListener,
    PluginProvider, PluginResult, Reward,
};
pub use reactive::ReactiveAds;
pub use service::AdService;
pub use simulated::{CallKind, PluginCall, SimulatedPlugin};
pub use state::{AdState, AdStateSnapshot};
