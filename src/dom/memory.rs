//! In-memory document — arena-backed element tree.
//!
//! Plays the browser's part for the page runtime: selector queries,
//! element creation, class/attribute writes, child append with
//! child-list mutation records, and the presentation-mode capability
//! on `<video>` elements.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::selector::{ElementTree, Selector};
use super::{Document, MutationRecord, NodeId, PresentationMode};

#[derive(Debug, Clone)]
struct Node {
    /// `None` only for the document node.
    tag: Option<String>,
    attributes: BTreeMap<String, String>,
    classes: Vec<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    presentation: Option<PresentationMode>,
}

impl Node {
    fn element(tag: &str) -> Self {
        let tag = tag.to_ascii_lowercase();
        let presentation = (tag == "video").then_some(PresentationMode::Inline);
        Self {
            tag: Some(tag),
            attributes: BTreeMap::new(),
            classes: Vec::new(),
            parent: None,
            children: Vec::new(),
            presentation,
        }
    }
}

/// Declarative element subtree, used to mount page content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// Overrides the presentation-mode capability. Defaults to
    /// capable for `video`, incapable otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pip_capable: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSpec>,
}

impl NodeSpec {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            id: None,
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            pip_capable: None,
            children: Vec::new(),
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn child(mut self, child: NodeSpec) -> Self {
        self.children.push(child);
        self
    }

    /// Build a linear nesting from a selector-shaped chain, e.g.
    /// `div.video-player div.video-container video.html-video` becomes
    /// three nested elements. Compounds without a tag become `div`.
    pub fn from_chain(chain: &Selector) -> Self {
        let mut specs = chain.compounds().iter().rev().map(|compound| Self {
            tag: compound.tag.clone().unwrap_or_else(|| "div".to_string()),
            id: compound.id.clone(),
            classes: compound.classes.clone(),
            attributes: BTreeMap::new(),
            pip_capable: None,
            children: Vec::new(),
        });
        // Selector::parse guarantees at least one compound.
        let innermost = specs.next().unwrap_or_else(|| Self::new("div"));
        specs.fold(innermost, |inner, outer| outer.child(inner))
    }
}

/// Arena-backed document.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    nodes: Vec<Node>,
    root: NodeId,
    next_seq: u64,
    mutations: Vec<MutationRecord>,
}

impl MemoryDocument {
    /// A document holding an empty `<html><body></body></html>`.
    pub fn new() -> Self {
        let mut nodes = vec![Node {
            tag: None,
            attributes: BTreeMap::new(),
            classes: Vec::new(),
            parent: None,
            children: vec![NodeId(1)],
            presentation: None,
        }];
        let mut html = Node::element("html");
        html.parent = Some(NodeId(0));
        html.children.push(NodeId(2));
        nodes.push(html);
        let mut body = Node::element("body");
        body.parent = Some(NodeId(1));
        nodes.push(body);

        Self {
            nodes,
            root: NodeId(0),
            next_seq: 1,
            mutations: Vec::new(),
        }
    }

    /// The `<body>` element, always the third node allocated.
    #[cfg(test)]
    pub fn body(&self) -> NodeId {
        NodeId(2)
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.nodes[node.0].tag.as_deref()
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    #[cfg(test)]
    pub fn classes(&self, node: NodeId) -> &[String] {
        &self.nodes[node.0].classes
    }

    /// Grant or revoke the presentation-mode capability.
    pub fn set_presentation_capable(&mut self, node: NodeId, capable: bool) {
        let slot = &mut self.nodes[node.0].presentation;
        *slot = match (capable, *slot) {
            (true, Some(mode)) => Some(mode),
            (true, None) => Some(PresentationMode::Inline),
            (false, _) => None,
        };
    }

    /// Whether the node is attached under the document node.
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.contains(self.root, node)
    }

    /// Create a detached subtree from a spec and return its top node.
    pub fn build(&mut self, spec: &NodeSpec) -> NodeId {
        let node = self.create_element(&spec.tag);
        if let Some(id) = &spec.id {
            self.set_attribute(node, "id", id);
        }
        if !spec.classes.is_empty() {
            self.set_class_list(node, &spec.classes);
        }
        for (name, value) in &spec.attributes {
            self.set_attribute(node, name, value);
        }
        if let Some(capable) = spec.pip_capable {
            self.set_presentation_capable(node, capable);
        }
        for child in &spec.children {
            let child = self.build(child);
            self.append_child(node, child);
        }
        node
    }

    /// Indented one-line-per-element rendering of the connected tree.
    pub fn outline(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for &child in self.children(self.root) {
            self.outline_into(child, 0, &mut lines);
        }
        lines
    }

    fn outline_into(&self, node: NodeId, depth: usize, lines: &mut Vec<String>) {
        let n = &self.nodes[node.0];
        let mut line = format!("{}<{}", "  ".repeat(depth), n.tag.as_deref().unwrap_or("#document"));
        if let Some(id) = n.attributes.get("id") {
            line.push_str(&format!(" id=\"{id}\""));
        }
        if !n.classes.is_empty() {
            line.push_str(&format!(" class=\"{}\"", n.classes.join(" ")));
        }
        for (name, value) in n.attributes.iter().filter(|(k, _)| *k != "id" && *k != "class") {
            line.push_str(&format!(" {name}=\"{value}\""));
        }
        line.push('>');
        if let Some(mode) = n.presentation {
            line.push_str(&format!(" [{}]", mode.as_str()));
        }
        lines.push(line);
        for &child in &n.children {
            self.outline_into(child, depth + 1, lines);
        }
    }

    fn collect_matches(&self, node: NodeId, selector: &Selector, out: &mut Vec<NodeId>) {
        for &child in &self.nodes[node.0].children {
            if selector.matches(self, child) {
                out.push(child);
            }
            self.collect_matches(child, selector, out);
        }
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl ElementTree for MemoryDocument {
    fn tag_of(&self, node: NodeId) -> Option<&str> {
        self.nodes[node.0].tag.as_deref()
    }

    fn id_of(&self, node: NodeId) -> Option<&str> {
        self.nodes[node.0].attributes.get("id").map(String::as_str)
    }

    fn classes_of(&self, node: NodeId) -> &[String] {
        &self.nodes[node.0].classes
    }

    fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }
}

impl Document for MemoryDocument {
    fn root(&self) -> NodeId {
        self.root
    }

    fn query_all(&self, scope: Option<NodeId>, selector: &Selector) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_matches(scope.unwrap_or(self.root), selector, &mut out);
        out
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.push(Node::element(tag));
        NodeId(self.nodes.len() - 1)
    }

    fn set_class_list(&mut self, node: NodeId, classes: &[String]) {
        let n = &mut self.nodes[node.0];
        n.classes = classes
            .iter()
            .flat_map(|c| c.split_whitespace())
            .map(str::to_string)
            .collect();
        n.attributes.insert("class".to_string(), n.classes.join(" "));
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.nodes[node.0].classes.iter().any(|c| c == class)
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if name == "class" {
            self.set_class_list(node, &[value.to_string()]);
            return;
        }
        self.nodes[node.0]
            .attributes
            .insert(name.to_string(), value.to_string());
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes[node.0].attributes.get(name).map(String::as_str)
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if self.contains(child, parent) {
            tracing::warn!(?parent, ?child, "refusing to append a node into its own subtree");
            return;
        }

        if let Some(old_parent) = self.nodes[child.0].parent.take() {
            self.nodes[old_parent.0].children.retain(|&c| c != child);
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);

        if self.is_connected(parent) {
            let seq = self.next_seq;
            self.next_seq += 1;
            self.mutations.push(MutationRecord {
                seq,
                target: parent,
                added: vec![child],
            });
        }
    }

    fn presentation_mode(&self, node: NodeId) -> Option<PresentationMode> {
        self.nodes[node.0].presentation
    }

    fn set_presentation_mode(&mut self, node: NodeId, mode: PresentationMode) -> bool {
        match &mut self.nodes[node.0].presentation {
            Some(current) => {
                *current = mode;
                true
            }
            None => false,
        }
    }

    fn mutation_seq(&self) -> u64 {
        self.next_seq
    }

    fn take_mutations(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.mutations)
    }
}
