//! Site adapters — per-platform descriptors of a video player's DOM.
//!
//! Each supported site is described by one immutable
//! [`AdapterDescriptor`]: how to recognise the site from its hostname,
//! where its player wrappers and playable elements live, where the PiP
//! control goes, and what re-triggers discovery on that site.

pub mod registry;
pub mod resolver;

use std::fmt;

use regex::Regex;

use crate::dom::{Selector, SelectorError};

pub use registry::Registry;
pub use resolver::ActiveAdapter;

/// Errors raised while building adapter descriptors.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("adapter {id}: invalid hostname pattern: {source}")]
    Pattern { id: String, source: regex::Error },
    #[error("adapter {id}: invalid selector: {source}")]
    Selector { id: String, source: SelectorError },
    #[error("duplicate adapter id: {0}")]
    DuplicateId(String),
}

/// Tag synthesized for the injected control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// Clickable `<button>`, for sites whose control bar is buttons.
    Button,
    /// Inline `<span>` marker, for sites styling spans as controls.
    Span,
}

impl ElementKind {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::Span => "span",
        }
    }
}

/// What a lifecycle hook does when its trigger fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookAction {
    /// Re-run discovery over all player wrappers.
    Discover,
    /// Install the adapter's mutation observer.
    ObserveMutations,
}

/// Extra window event that re-drives discovery on a site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleHook {
    /// Window event name: `load`, `DOMContentLoaded`, or a site event.
    pub trigger: String,
    pub action: HookAction,
}

/// Mutation-driven re-scan settings for single-page apps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserverConfig {
    /// Subtree root to observe.
    pub root: Selector,
    /// Class whose appearance on an added node signals a new player view.
    pub marker_class: String,
}

/// Where an injected control is placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Append to the controls container found inside each wrapper,
    /// unless that container already holds a control.
    ContainerAppend { container: Selector },
    /// Append to a single document-wide destination, unless a control
    /// already exists anywhere in the document.
    SharedDestination { destination: Selector },
}

/// Immutable description of one supported site.
#[derive(Debug, Clone)]
pub struct AdapterDescriptor {
    pub id: String,
    pub hostname_matcher: Regex,
    pub lifecycle_hook: Option<LifecycleHook>,
    pub element_kind: ElementKind,
    pub button_classes: Vec<String>,
    pub video_selector: Selector,
    pub player_wrapper_selector: Selector,
    pub placement: Placement,
    pub observer: Option<ObserverConfig>,
}

impl AdapterDescriptor {
    pub fn matches_hostname(&self, hostname: &str) -> bool {
        self.hostname_matcher.is_match(hostname)
    }
}

impl fmt::Display for HookAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discover => f.write_str("discover"),
            Self::ObserveMutations => f.write_str("observe"),
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContainerAppend { container } => write!(f, "append {container}"),
            Self::SharedDestination { destination } => write!(f, "shared {destination}"),
        }
    }
}
