//! Adapter resolution — pick the one descriptor for the current page.
//!
//! Resolution consumes the [`Registry`], so it can happen only once per
//! page and the chosen [`ActiveAdapter`] can never be swapped afterwards.
//! An unmatched hostname yields `None` and the page stays dormant.

use std::ops::Deref;

use super::{AdapterDescriptor, Registry};

/// The descriptor selected for this page. Read-only once resolved.
#[derive(Debug, Clone)]
pub struct ActiveAdapter(AdapterDescriptor);

impl Deref for ActiveAdapter {
    type Target = AdapterDescriptor;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Registry {
    /// First descriptor in table order whose matcher accepts `hostname`.
    pub fn find(&self, hostname: &str) -> Option<&AdapterDescriptor> {
        self.iter().find(|a| a.matches_hostname(hostname))
    }

    /// Resolve the active adapter for `hostname`, consuming the registry.
    ///
    /// First match wins. If further descriptors also match, the overlap
    /// is logged so an ambiguous table shows up in the page log instead
    /// of silently shadowing the later adapter.
    pub fn resolve(self, hostname: &str) -> Option<ActiveAdapter> {
        let mut matching = self
            .into_descriptors()
            .into_iter()
            .filter(|a| a.matches_hostname(hostname));

        let Some(active) = matching.next() else {
            tracing::debug!(hostname, "no adapter matches, staying dormant");
            return None;
        };

        let shadowed: Vec<String> = matching.map(|a| a.id).collect();
        if !shadowed.is_empty() {
            tracing::warn!(
                hostname,
                active = %active.id,
                shadowed = ?shadowed,
                "hostname matches several adapters; first in table order wins"
            );
        }

        tracing::info!(hostname, adapter = %active.id, "adapter resolved");
        Some(ActiveAdapter(active))
    }
}
