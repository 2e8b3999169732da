//! Built-in adapter table.
//!
//! Order matters: the resolver takes the first descriptor whose hostname
//! matcher accepts the page. Patterns are anchored on a domain boundary
//! so `notyoutube.com` does not resolve to `youtube`.

use std::collections::HashSet;

use regex::Regex;

use crate::dom::Selector;

use super::{
    AdapterDescriptor, AdapterError, ElementKind, HookAction, LifecycleHook, ObserverConfig,
    Placement,
};

/// Raw, uncompiled table row.
struct Entry {
    id: &'static str,
    hostname: &'static str,
    hook: Option<(&'static str, HookAction)>,
    kind: ElementKind,
    classes: &'static str,
    video: &'static str,
    wrapper: &'static str,
    placement: RawPlacement,
    observer: Option<(&'static str, &'static str)>,
}

enum RawPlacement {
    Container(&'static str),
    Shared(&'static str),
}

const ENTRIES: &[Entry] = &[
    Entry {
        id: "dailymotion",
        hostname: r"(?:^|\.)dailymotion\.com$",
        hook: None,
        kind: ElementKind::Button,
        classes: "dmp_ControlBarButton pip-button",
        video: "video#dmp_Video",
        wrapper: ".dmp_Player",
        placement: RawPlacement::Container(".dmp_ControlBar"),
        observer: None,
    },
    Entry {
        id: "plex",
        hostname: r"(?:^|\.)plex\.tv$",
        hook: Some(("DOMContentLoaded", HookAction::ObserveMutations)),
        kind: ElementKind::Button,
        classes: "btn-link pip-button",
        video: "video.html-video",
        wrapper: ".video-container",
        placement: RawPlacement::Container(".video-controls-overlay-bottom .video-controls-right"),
        observer: Some(("#plex", "video-player")),
    },
    Entry {
        id: "youtube",
        hostname: r"(?:^|\.)(?:youtube\.com|youtu\.be)$",
        hook: Some(("spfdone", HookAction::Discover)),
        kind: ElementKind::Button,
        classes: "ytp-button pip-button",
        video: "video.html5-main-video",
        wrapper: ".html5-video-player",
        placement: RawPlacement::Container(".ytp-right-controls"),
        observer: None,
    },
    Entry {
        id: "netflix",
        hostname: r"(?:^|\.)netflix\.com$",
        hook: Some(("load", HookAction::ObserveMutations)),
        kind: ElementKind::Span,
        classes: "netflix-pip",
        video: "video",
        wrapper: ".player-video-wrapper",
        placement: RawPlacement::Shared(".player-status"),
        observer: Some(("#appMountPoint", "player-menu")),
    },
];

/// Ordered, immutable collection of adapter descriptors.
#[derive(Debug, Clone)]
pub struct Registry {
    adapters: Vec<AdapterDescriptor>,
}

impl Registry {
    /// Compile the built-in table.
    pub fn builtin() -> Result<Self, AdapterError> {
        let adapters = ENTRIES
            .iter()
            .map(compile)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_descriptors(adapters)
    }

    /// Wrap descriptors in table order, rejecting duplicate ids.
    pub fn from_descriptors(adapters: Vec<AdapterDescriptor>) -> Result<Self, AdapterError> {
        let mut seen = HashSet::new();
        for adapter in &adapters {
            if !seen.insert(adapter.id.as_str()) {
                return Err(AdapterError::DuplicateId(adapter.id.clone()));
            }
        }
        Ok(Self { adapters })
    }

    pub fn iter(&self) -> impl Iterator<Item = &AdapterDescriptor> {
        self.adapters.iter()
    }

    pub fn get(&self, id: &str) -> Option<&AdapterDescriptor> {
        self.adapters.iter().find(|a| a.id == id)
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub(super) fn into_descriptors(self) -> Vec<AdapterDescriptor> {
        self.adapters
    }
}

fn compile(entry: &Entry) -> Result<AdapterDescriptor, AdapterError> {
    let selector = |s: &str| {
        Selector::parse(s).map_err(|source| AdapterError::Selector {
            id: entry.id.to_string(),
            source,
        })
    };

    let hostname_matcher = Regex::new(entry.hostname).map_err(|source| AdapterError::Pattern {
        id: entry.id.to_string(),
        source,
    })?;

    let placement = match entry.placement {
        RawPlacement::Container(s) => Placement::ContainerAppend {
            container: selector(s)?,
        },
        RawPlacement::Shared(s) => Placement::SharedDestination {
            destination: selector(s)?,
        },
    };

    let observer = match entry.observer {
        Some((root, marker)) => Some(ObserverConfig {
            root: selector(root)?,
            marker_class: marker.to_string(),
        }),
        None => None,
    };

    Ok(AdapterDescriptor {
        id: entry.id.to_string(),
        hostname_matcher,
        lifecycle_hook: entry.hook.map(|(trigger, action)| LifecycleHook {
            trigger: trigger.to_string(),
            action,
        }),
        element_kind: entry.kind,
        button_classes: entry.classes.split_whitespace().map(str::to_string).collect(),
        video_selector: selector(entry.video)?,
        player_wrapper_selector: selector(entry.wrapper)?,
        placement,
        observer,
    })
}
