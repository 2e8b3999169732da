//! DOM read/write surface consumed by the engine.
//!
//! The engine only ever needs selector queries plus a handful of writes
//! (element creation, class list, attributes, child append) and the
//! platform presentation-mode capability. [`Document`] captures exactly
//! that; [`MemoryDocument`] is the in-process implementation the page
//! runtime and tests use.

pub mod memory;
pub mod selector;

use serde::{Deserialize, Serialize};

pub use memory::{MemoryDocument, NodeSpec};
pub use selector::{Selector, SelectorError};

/// Handle to a node owned by a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Two-valued presentation mode of a playable element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PresentationMode {
    Inline,
    PictureInPicture,
}

impl PresentationMode {
    /// Platform string value (`"inline"` / `"picture-in-picture"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::PictureInPicture => "picture-in-picture",
        }
    }

    /// The mode a toggle switches to.
    ///
    /// Anything that is not inline goes back to inline.
    pub fn complement(self) -> Self {
        match self {
            Self::Inline => Self::PictureInPicture,
            Self::PictureInPicture => Self::Inline,
        }
    }
}

/// A batch entry of child-list mutations: `added` were appended to
/// `target`. `seq` increases monotonically per document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub seq: u64,
    pub target: NodeId,
    pub added: Vec<NodeId>,
}

/// Live document the engine reads and writes.
pub trait Document {
    /// The document node. Never matched by selectors.
    fn root(&self) -> NodeId;

    /// All elements matching `selector`, in document order. With a
    /// scope, only strict descendants of that node are considered.
    fn query_all(&self, scope: Option<NodeId>, selector: &Selector) -> Vec<NodeId>;

    /// First match of [`Document::query_all`].
    fn query(&self, scope: Option<NodeId>, selector: &Selector) -> Option<NodeId> {
        self.query_all(scope, selector).into_iter().next()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Whether `node` is `ancestor` or one of its descendants.
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Create a detached element.
    fn create_element(&mut self, tag: &str) -> NodeId;

    /// Replace the node's class list.
    fn set_class_list(&mut self, node: NodeId, classes: &[String]);

    fn has_class(&self, node: NodeId, class: &str) -> bool;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;

    /// Append `child` to `parent`, moving it if it is already attached.
    fn append_child(&mut self, parent: NodeId, child: NodeId);

    /// Current mode, or `None` when the node lacks the capability.
    fn presentation_mode(&self, node: NodeId) -> Option<PresentationMode>;

    /// Switch the mode. Returns `false` when the node lacks the capability.
    fn set_presentation_mode(&mut self, node: NodeId, mode: PresentationMode) -> bool;

    /// Sequence number the next mutation record will carry.
    fn mutation_seq(&self) -> u64;

    /// Drain the queued child-list mutation records.
    fn take_mutations(&mut self) -> Vec<MutationRecord>;
}

/// Flip a playable element between inline and picture-in-picture.
///
/// Shared by the injected control and the armed click interceptor.
/// Returns the new mode, or `None` if the element lacks the capability.
pub fn toggle_presentation<D: Document + ?Sized>(
    doc: &mut D,
    node: NodeId,
) -> Option<PresentationMode> {
    let next = doc.presentation_mode(node)?.complement();
    doc.set_presentation_mode(node, next).then_some(next)
}
