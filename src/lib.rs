//! Purpose: Library crate behind the `adslot` binary and host applications.
//! Exports: `core` (slot model, registry, errors) and `api` (service surface).
//! Role: Declare ad slots once, trigger them by id from anywhere in the app.
//! Invariants: Public ad operations never return errors; failures are logged.
//! Invariants: All mutable ad state lives in an injectable `api::AdState`.
pub mod api;
pub mod core;
