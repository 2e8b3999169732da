//! Page runtime — runs handlers for window events, clicks, commands and
//! mutation batches, one at a time.
//!
//! Dispatch follows the browser's ordering where the engine depends on
//! it: document capture-phase click listeners run before listeners on
//! the target and its ancestors, and mutation records produced while
//! handling an event are delivered as batches after it, repeatedly,
//! until no observer has anything left to see.

use crate::adapter::Registry;
use crate::context::{Context, EngineConfig};
use crate::dom::{Document, NodeId};
use crate::engine;
use crate::lifecycle;
use crate::page::{ClickEvent, Handler, Page};
use crate::toggle::{PipState, PipToggle};

/// Engine state for one page load.
#[derive(Debug)]
pub struct Runtime<D> {
    hostname: String,
    page: Page<D>,
    toggle: PipToggle,
    /// `None` when no adapter matched: the page stays dormant.
    context: Option<Context>,
}

impl<D: Document> Runtime<D> {
    /// Resolve the adapter for `hostname` and install its hooks.
    ///
    /// The toggle command works regardless of whether an adapter matched.
    pub fn start(document: D, registry: Registry, hostname: &str, config: EngineConfig) -> Self {
        let mut page = Page::new(document);
        let context = registry.resolve(hostname).map(|adapter| {
            let mut ctx = Context::new(adapter, config);
            lifecycle::install(&mut ctx, &mut page);
            ctx
        });

        Self {
            hostname: hostname.to_string(),
            page,
            toggle: PipToggle::new(),
            context,
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    #[cfg(test)]
    pub fn page(&self) -> &Page<D> {
        &self.page
    }

    pub fn document(&self) -> &D {
        self.page.document()
    }

    pub fn document_mut(&mut self) -> &mut D {
        self.page.document_mut()
    }

    #[cfg(test)]
    pub fn context(&self) -> Option<&Context> {
        self.context.as_ref()
    }

    pub fn adapter_id(&self) -> Option<&str> {
        self.context.as_ref().map(|ctx| ctx.adapter().id.as_str())
    }

    pub fn is_armed(&self) -> bool {
        self.toggle.is_armed()
    }

    /// Inbound "toggle PiP" command.
    pub fn toggle_command(&mut self) -> PipState {
        let state = self.toggle.on_command(&mut self.page);
        self.flush_mutations();
        state
    }

    /// Fire a window event. Returns how many listeners ran.
    pub fn fire(&mut self, event: &str) -> usize {
        let mut ran = 0;
        for (id, handler) in self.page.window_listeners(event) {
            if self.page.is_registered(id) {
                self.run(handler, None);
                ran += 1;
            }
        }
        tracing::debug!(event, listeners = ran, "window event dispatched");
        self.flush_mutations();
        ran
    }

    /// Dispatch a click on `target`: capture phase on the document
    /// first, then the target and its ancestors.
    pub fn click(&mut self, target: NodeId) -> ClickEvent {
        let mut event = ClickEvent::new(target);

        let capture = self.page.capture_click_listeners();
        let bubble = self.page.bubble_click_listeners(target);
        for (id, handler) in capture.into_iter().chain(bubble) {
            // A listener removed earlier in this dispatch does not fire.
            if self.page.is_registered(id) {
                self.run(handler, Some(&mut event));
            }
        }

        self.flush_mutations();
        event
    }

    /// Append `child` under `parent` as page script would, then deliver
    /// the resulting mutations.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.page.document_mut().append_child(parent, child);
        self.flush_mutations();
    }

    fn run(&mut self, handler: Handler, event: Option<&mut ClickEvent>) {
        match handler {
            Handler::Discover => {
                if let Some(ctx) = &self.context {
                    engine::discover(ctx, &mut self.page);
                }
            }
            Handler::ObserveMutations => {
                if let Some(ctx) = &mut self.context {
                    lifecycle::observe(ctx, &mut self.page);
                }
            }
            Handler::ControlClick { video } => {
                if let Some(event) = event {
                    engine::on_control_click(&mut self.page, &mut self.toggle, video, event);
                }
            }
            Handler::PipInterceptor => {
                if let Some(event) = event {
                    self.toggle.on_click(&mut self.page, event);
                }
            }
        }
    }

    /// Deliver queued mutation batches in order until quiescent.
    ///
    /// Terminates because discovery only adds controls once per wrapper
    /// and controls never carry an observer's marker class.
    fn flush_mutations(&mut self) {
        loop {
            let batches = self.page.take_mutation_batches();
            if batches.is_empty() {
                break;
            }
            let Some(ctx) = &self.context else {
                continue;
            };
            for batch in &batches {
                lifecycle::on_mutations(ctx, &mut self.page, batch);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::MARKER_CLASS;
    use crate::dom::{MemoryDocument, NodeSpec, PresentationMode, Selector};

    fn start(host: &str) -> Runtime<MemoryDocument> {
        Runtime::start(
            MemoryDocument::new(),
            Registry::builtin().unwrap(),
            host,
            EngineConfig::default(),
        )
    }

    fn mount(rt: &mut Runtime<MemoryDocument>, parent: NodeId, spec: &NodeSpec) -> NodeId {
        let node = rt.document_mut().build(spec);
        rt.append(parent, node);
        node
    }

    fn body(rt: &Runtime<MemoryDocument>) -> NodeId {
        rt.document().body()
    }

    fn find(rt: &Runtime<MemoryDocument>, selector: &str) -> Option<NodeId> {
        rt.document()
            .query(None, &Selector::parse(selector).unwrap())
    }

    fn control_count(rt: &Runtime<MemoryDocument>) -> usize {
        rt.document()
            .query_all(None, &Selector::class(MARKER_CLASS))
            .len()
    }

    fn youtube_player() -> NodeSpec {
        NodeSpec::new("div")
            .class("html5-video-player")
            .child(NodeSpec::new("video").class("html5-main-video"))
            .child(NodeSpec::new("div").class("ytp-right-controls"))
    }

    #[test]
    fn youtube_custom_event_injects_one_control() {
        let mut rt = start("www.youtube.com");
        assert_eq!(rt.adapter_id(), Some("youtube"));

        let b = body(&rt);
        mount(&mut rt, b, &youtube_player());
        assert_eq!(control_count(&rt), 0);

        assert_eq!(rt.fire("spfdone"), 1);
        let container = find(&rt, ".ytp-right-controls").unwrap();
        let children = rt.document().children(container).to_vec();
        assert_eq!(children.len(), 1);
        assert!(rt.document().has_class(children[0], "pip-button"));

        rt.fire("spfdone");
        rt.fire("load");
        assert_eq!(rt.document().children(container).len(), 1);
    }

    #[test]
    fn resolution_installs_only_the_matching_adapter_hooks() {
        let rt = start("www.youtube.com");
        let page = rt.page();
        assert_eq!(page.window_listeners("load").len(), 1);
        assert_eq!(page.window_listeners("spfdone").len(), 1);
        assert!(page.window_listeners("DOMContentLoaded").is_empty());
        assert_eq!(page.observer_count(), 0);
    }

    #[test]
    fn unmatched_host_stays_dormant() {
        let mut rt = start("example.org");
        assert!(rt.context().is_none());
        assert!(rt.page().window_listeners("load").is_empty());

        let b = body(&rt);
        mount(&mut rt, b, &youtube_player());
        assert_eq!(rt.fire("load"), 0);
        assert_eq!(control_count(&rt), 0);
        assert_eq!(rt.hostname(), "example.org");
    }

    #[test]
    fn dailymotion_discovers_on_load_only() {
        let mut rt = start("www.dailymotion.com");
        let b = body(&rt);
        let player = NodeSpec::new("div")
            .class("dmp_Player")
            .child(NodeSpec::new("video").id("dmp_Video"))
            .child(NodeSpec::new("div").class("dmp_ControlBar"));
        mount(&mut rt, b, &player);

        assert_eq!(rt.fire("load"), 1);
        assert_eq!(control_count(&rt), 1);
        let control = find(&rt, ".pip-button").unwrap();
        assert!(rt.document().has_class(control, "dmp_ControlBarButton"));
    }

    #[test]
    fn plex_injects_only_after_player_view_mounts() {
        let mut rt = start("app.plex.tv");
        let b = body(&rt);
        let root = mount(&mut rt, b, &NodeSpec::new("div").id("plex"));

        rt.fire("DOMContentLoaded");
        rt.fire("load");
        assert_eq!(rt.page().observer_count(), 1);
        assert_eq!(control_count(&rt), 0);

        // Unrelated insertions do not trigger discovery.
        mount(&mut rt, root, &NodeSpec::new("div").class("sidebar"));
        assert_eq!(control_count(&rt), 0);

        let view = NodeSpec::new("div").class("video-player").child(
            NodeSpec::new("div")
                .class("video-container")
                .child(NodeSpec::new("video").class("html-video"))
                .child(
                    NodeSpec::new("div")
                        .class("video-controls-overlay-bottom")
                        .child(NodeSpec::new("div").class("video-controls-right")),
                ),
        );
        mount(&mut rt, root, &view);
        assert_eq!(control_count(&rt), 1);

        // Another marker sighting re-scans without duplicating.
        mount(&mut rt, root, &NodeSpec::new("div").class("video-player"));
        assert_eq!(control_count(&rt), 1);
    }

    #[test]
    fn plex_wrapper_added_later_is_picked_up_by_next_marker() {
        let mut rt = start("app.plex.tv");
        let b = body(&rt);
        let root = mount(&mut rt, b, &NodeSpec::new("div").id("plex"));
        rt.fire("DOMContentLoaded");

        // Marker arrives before the wrapper is rendered: nothing to inject.
        let view = mount(&mut rt, root, &NodeSpec::new("div").class("video-player"));
        assert_eq!(control_count(&rt), 0);

        // Wrapper renders inside the view, then the menu marker shows up.
        let wrapper = NodeSpec::new("div")
            .class("video-container")
            .child(NodeSpec::new("video").class("html-video"))
            .child(
                NodeSpec::new("div")
                    .class("video-controls-overlay-bottom")
                    .child(NodeSpec::new("div").class("video-controls-right")),
            );
        mount(&mut rt, view, &wrapper);
        assert_eq!(control_count(&rt), 0);
        mount(&mut rt, view, &NodeSpec::new("div").class("video-player"));
        assert_eq!(control_count(&rt), 1);
    }

    #[test]
    fn netflix_shared_status_bar_gets_single_control() {
        let mut rt = start("www.netflix.com");
        let b = body(&rt);
        let root = mount(&mut rt, b, &NodeSpec::new("div").id("appMountPoint"));
        rt.fire("load");
        assert_eq!(rt.page().observer_count(), 1);

        let view = NodeSpec::new("div")
            .class("player-menu")
            .child(NodeSpec::new("div").class("player-status"))
            .child(
                NodeSpec::new("div")
                    .class("player-video-wrapper")
                    .child(NodeSpec::new("video")),
            )
            .child(
                NodeSpec::new("div")
                    .class("player-video-wrapper")
                    .child(NodeSpec::new("video")),
            );
        mount(&mut rt, root, &view);
        assert_eq!(control_count(&rt), 1);

        mount(&mut rt, root, &NodeSpec::new("div").class("player-menu"));
        assert_eq!(control_count(&rt), 1);
    }

    #[test]
    fn toggle_twice_leaves_no_listener() {
        let mut rt = start("www.youtube.com");
        assert!(matches!(rt.toggle_command(), PipState::Armed { .. }));
        assert_eq!(rt.toggle_command(), PipState::Idle);
        assert_eq!(rt.page().capture_listener_count(), 0);
        assert!(!rt.is_armed());
    }

    #[test]
    fn armed_click_passes_through_link_then_switches_video() {
        let mut rt = start("example.org");
        let b = body(&rt);
        let link = mount(&mut rt, b, &NodeSpec::new("a"));
        let video = mount(&mut rt, b, &NodeSpec::new("video"));

        rt.toggle_command();
        let event = rt.click(link);
        assert!(!event.default_prevented());
        assert!(rt.is_armed());

        let event = rt.click(video);
        assert!(event.default_prevented());
        assert_eq!(
            rt.document().presentation_mode(video),
            Some(PresentationMode::PictureInPicture)
        );
        assert!(!rt.is_armed());
        assert_eq!(rt.page().capture_listener_count(), 0);

        // Idle again: clicks are not intercepted.
        rt.click(video);
        assert_eq!(
            rt.document().presentation_mode(video),
            Some(PresentationMode::PictureInPicture)
        );
    }

    #[test]
    fn control_click_disarms_pending_toggle() {
        let mut rt = start("www.youtube.com");
        let b = body(&rt);
        mount(&mut rt, b, &youtube_player());
        rt.fire("load");
        let control = find(&rt, ".pip-button").unwrap();
        let video = find(&rt, "video").unwrap();

        rt.toggle_command();
        // Clicking the icon bubbles up to the control.
        let icon = rt.document().children(control)[0];
        let event = rt.click(icon);
        assert!(event.default_prevented());
        assert_eq!(
            rt.document().presentation_mode(video),
            Some(PresentationMode::PictureInPicture)
        );
        assert!(!rt.is_armed());
        assert_eq!(rt.page().capture_listener_count(), 0);

        rt.click(control);
        assert_eq!(
            rt.document().presentation_mode(video),
            Some(PresentationMode::Inline)
        );
    }
}
