//! Page runtime surface — listener tables over a live document.
//!
//! Listeners are plain data: a [`Handler`] names what should run, the
//! [`crate::runtime::Runtime`] decides how to run it. This keeps every
//! registration inspectable, so tests can assert "exactly one capture
//! listener" instead of trusting a boolean flag.

use crate::dom::{Document, NodeId};

/// Handle returned by every registration; used for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// What runs when a listener fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// Scan all player wrappers and inject missing controls.
    Discover,
    /// Install the active adapter's mutation observer.
    ObserveMutations,
    /// Injected control was clicked; toggle its video.
    ControlClick { video: NodeId },
    /// Armed-state capture-phase click interceptor.
    PipInterceptor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Window(String),
    Element(NodeId),
    /// Capture-phase click listener on the document.
    DocumentCapture,
}

#[derive(Debug)]
struct Registration {
    id: ListenerId,
    target: Target,
    handler: Handler,
}

#[derive(Debug)]
struct Observer {
    id: ListenerId,
    root: NodeId,
    marker_class: String,
    /// First mutation sequence number this observer may see.
    since: u64,
}

/// Added nodes delivered to one observer in one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationBatch {
    pub observer: ListenerId,
    pub marker_class: String,
    pub added: Vec<NodeId>,
}

/// A click travelling through capture and bubble phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickEvent {
    target: NodeId,
    default_prevented: bool,
}

impl ClickEvent {
    pub fn new(target: NodeId) -> Self {
        Self {
            target,
            default_prevented: false,
        }
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// A document plus everything registered against it.
#[derive(Debug)]
pub struct Page<D> {
    document: D,
    next_id: u64,
    listeners: Vec<Registration>,
    observers: Vec<Observer>,
}

impl<D: Document> Page<D> {
    pub fn new(document: D) -> Self {
        Self {
            document,
            next_id: 1,
            listeners: Vec::new(),
            observers: Vec::new(),
        }
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.document
    }

    fn allocate_id(&mut self) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        id
    }

    fn register(&mut self, target: Target, handler: Handler) -> ListenerId {
        let id = self.allocate_id();
        self.listeners.push(Registration {
            id,
            target,
            handler,
        });
        id
    }

    pub fn add_window_listener(&mut self, event: &str, handler: Handler) -> ListenerId {
        self.register(Target::Window(event.to_string()), handler)
    }

    pub fn add_click_listener(&mut self, node: NodeId, handler: Handler) -> ListenerId {
        self.register(Target::Element(node), handler)
    }

    pub fn add_capture_click_listener(&mut self, handler: Handler) -> ListenerId {
        self.register(Target::DocumentCapture, handler)
    }

    /// Remove a listener or observer. Returns whether it was registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len() + self.observers.len();
        self.listeners.retain(|r| r.id != id);
        self.observers.retain(|o| o.id != id);
        before != self.listeners.len() + self.observers.len()
    }

    pub fn is_registered(&self, id: ListenerId) -> bool {
        self.listeners.iter().any(|r| r.id == id) || self.observers.iter().any(|o| o.id == id)
    }

    /// Observe child-list insertions anywhere under `root`. Only
    /// mutations made after this call are delivered.
    pub fn observe(&mut self, root: NodeId, marker_class: &str) -> ListenerId {
        let id = self.allocate_id();
        let since = self.document.mutation_seq();
        self.observers.push(Observer {
            id,
            root,
            marker_class: marker_class.to_string(),
            since,
        });
        id
    }

    /// Window listeners for `event`, in registration order.
    pub fn window_listeners(&self, event: &str) -> Vec<(ListenerId, Handler)> {
        self.listeners
            .iter()
            .filter(|r| matches!(&r.target, Target::Window(name) if name == event))
            .map(|r| (r.id, r.handler))
            .collect()
    }

    /// Document capture-phase click listeners, in registration order.
    pub fn capture_click_listeners(&self) -> Vec<(ListenerId, Handler)> {
        self.listeners
            .iter()
            .filter(|r| r.target == Target::DocumentCapture)
            .map(|r| (r.id, r.handler))
            .collect()
    }

    /// Click listeners on `target` and then each ancestor (bubble order).
    pub fn bubble_click_listeners(&self, target: NodeId) -> Vec<(ListenerId, Handler)> {
        let mut out = Vec::new();
        let mut cursor = Some(target);
        while let Some(node) = cursor {
            out.extend(
                self.listeners
                    .iter()
                    .filter(|r| r.target == Target::Element(node))
                    .map(|r| (r.id, r.handler)),
            );
            cursor = self.document.parent(node);
        }
        out
    }

    /// Drain the document's mutation records into per-observer batches.
    ///
    /// A record belongs to an observer when its target is the observed
    /// root or lies under it, and it happened after the observer was
    /// installed. Observers with nothing to see get no batch.
    pub fn take_mutation_batches(&mut self) -> Vec<MutationBatch> {
        let records = self.document.take_mutations();
        if records.is_empty() {
            return Vec::new();
        }

        self.observers
            .iter()
            .filter_map(|observer| {
                let added: Vec<NodeId> = records
                    .iter()
                    .filter(|r| r.seq >= observer.since)
                    .filter(|r| self.document.contains(observer.root, r.target))
                    .flat_map(|r| r.added.iter().copied())
                    .collect();
                (!added.is_empty()).then(|| MutationBatch {
                    observer: observer.id,
                    marker_class: observer.marker_class.clone(),
                    added,
                })
            })
            .collect()
    }

    /// Number of document capture-phase click listeners.
    #[cfg(test)]
    pub fn capture_listener_count(&self) -> usize {
        self.capture_click_listeners().len()
    }

    #[cfg(test)]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }
}
