//! Purpose: Side-effect-free building blocks for ad slot dispatch.
//! Exports: `error`, `registry`, `slot`.
//! Role: Data model and lookup; nothing here talks to the ad plugin.
pub mod error;
pub mod registry;
pub mod slot;
