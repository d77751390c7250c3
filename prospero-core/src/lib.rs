//! Core types and service wiring for the prospero theater schedule watcher.

/// Year inference and date parsing helpers for venue markup.
pub mod calendar;
/// Process configuration.
pub mod config;
/// HTML extraction helpers shared by venue adapters.
pub mod html;
/// Domain models and identifiers shared by all venues.
pub mod model;
/// Registry for plugging venue adapters into the service.
pub mod plugin;
/// Traits describing venue and notifier interfaces.
pub mod ports;
/// Poll cycle orchestration.
pub mod service;
/// Persistent deduplicating schedule store.
pub mod store;

#[cfg(test)]
mod testing;

pub use config::*;
pub use model::*;
pub use plugin::*;
pub use ports::*;
pub use service::*;
pub use store::*;
