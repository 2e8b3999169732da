//! Engine context — the resolved adapter plus per-page engine state.
//!
//! Constructed once, right after resolution, and passed by reference to
//! the engine and the lifecycle installer. Nothing here is global.

use crate::adapter::ActiveAdapter;
use crate::dom::Selector;
use crate::page::ListenerId;

/// Default base URI icons are resolved against.
pub const DEFAULT_ASSET_BASE: &str = "safari-extension://piptool/";

/// Reserved class carried by every injected control.
pub const MARKER_CLASS: &str = "pip-button";

/// Engine configuration supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Base URI for bundled assets, always ending in `/`.
    asset_base: String,
}

impl EngineConfig {
    pub fn new(asset_base: &str) -> Self {
        let mut asset_base = asset_base.to_string();
        if !asset_base.ends_with('/') {
            asset_base.push('/');
        }
        Self { asset_base }
    }

    pub fn asset_base(&self) -> &str {
        &self.asset_base
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ASSET_BASE)
    }
}

/// Per-page engine state for the active adapter.
#[derive(Debug)]
pub struct Context {
    adapter: ActiveAdapter,
    config: EngineConfig,
    marker: Selector,
    hooks_installed: bool,
    observer: Option<ListenerId>,
}

impl Context {
    pub fn new(adapter: ActiveAdapter, config: EngineConfig) -> Self {
        Self {
            adapter,
            config,
            marker: Selector::class(MARKER_CLASS),
            hooks_installed: false,
            observer: None,
        }
    }

    pub fn adapter(&self) -> &ActiveAdapter {
        &self.adapter
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Selector for the injection marker class.
    pub fn marker(&self) -> &Selector {
        &self.marker
    }

    pub fn hooks_installed(&self) -> bool {
        self.hooks_installed
    }

    pub(crate) fn mark_hooks_installed(&mut self) {
        self.hooks_installed = true;
    }

    pub fn observer(&self) -> Option<ListenerId> {
        self.observer
    }

    pub(crate) fn set_observer(&mut self, id: ListenerId) {
        self.observer = Some(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_base_gets_trailing_slash() {
        assert_eq!(EngineConfig::new("file:///ext").asset_base(), "file:///ext/");
        assert_eq!(EngineConfig::new("file:///ext/").asset_base(), "file:///ext/");
    }

    #[test]
    fn default_asset_base() {
        assert_eq!(EngineConfig::default().asset_base(), DEFAULT_ASSET_BASE);
    }
}
