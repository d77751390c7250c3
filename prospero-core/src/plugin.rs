//! Registry for all venue plugins.

use std::sync::Arc;

use crate::model::{VenueId, VenueMeta};
use crate::ports::SourceAdapter;

#[derive(thiserror::Error, Debug)]
/// Errors raised when resolving venues.
pub enum RegistryError {
    /// The venue has no registered plugin.
    #[error("Unknown venue: {0}")]
    UnknownVenue(VenueId),
}

/// Adapter bundle for a single venue.
pub struct VenuePlugin {
    /// Static metadata describing the venue.
    pub meta: VenueMeta,
    /// Implementation for fetching and extracting the schedule.
    pub adapter: Arc<dyn SourceAdapter>,
}

/// Registry of venue plugins, kept in registration order.
pub struct VenueRegistry {
    plugins: Vec<VenuePlugin>,
}

impl VenueRegistry {
    /// Build a registry from the provided plugin list.
    ///
    /// A later plugin with an already registered id replaces the earlier one.
    #[must_use]
    pub fn new(plugins: Vec<VenuePlugin>) -> Self {
        let mut deduped: Vec<VenuePlugin> = Vec::with_capacity(plugins.len());
        for plugin in plugins {
            if let Some(existing) = deduped
                .iter_mut()
                .find(|known| known.meta.id == plugin.meta.id)
            {
                tracing::warn!(venue = %plugin.meta.id, "replacing duplicate venue plugin");
                *existing = plugin;
            } else {
                deduped.push(plugin);
            }
        }
        Self { plugins: deduped }
    }

    /// Return metadata for all registered venues.
    #[must_use]
    pub fn venues(&self) -> Vec<VenueMeta> {
        self.plugins
            .iter()
            .map(|plugin| plugin.meta.clone())
            .collect()
    }

    /// Iterator over the registered adapters.
    pub fn adapters(&self) -> impl Iterator<Item = &Arc<dyn SourceAdapter>> {
        self.plugins.iter().map(|plugin| &plugin.adapter)
    }

    /// Number of registered venues.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether no venue is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Look up the plugin for the given venue.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownVenue`] when no plugin is registered.
    pub fn plugin(&self, venue: &VenueId) -> Result<&VenuePlugin, RegistryError> {
        self.plugins
            .iter()
            .find(|plugin| &plugin.meta.id == venue)
            .ok_or_else(|| RegistryError::UnknownVenue(venue.clone()))
    }
}
