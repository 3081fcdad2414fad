use std::collections::BTreeMap;
use std::fmt::Write;

use serde::Serialize;

use super::selector::Compound;
use super::selector::Selector;
use super::Element;
use super::Surface;

/// Index of a node inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// An element of the headless document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    text: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(tag: &str, parent: Option<NodeId>) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            id: None,
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            text: None,
            parent,
            children: Vec::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.classes.iter().any(|c| c == name)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    fn matches(&self, compound: &Compound) -> bool {
        compound.tag.as_ref().is_none_or(|tag| *tag == self.tag)
            && compound
                .id
                .as_ref()
                .is_none_or(|id| self.id.as_ref() == Some(id))
            && compound.classes.iter().all(|class| self.has_class(class))
    }
}

impl Element for Node {
    fn set_attribute(&mut self, name: &str, value: &str) {
        match name {
            "id" => self.id = Some(value.to_string()),
            "class" => self.classes = value.split_whitespace().map(str::to_string).collect(),
            _ => {
                self.attributes.insert(name.to_string(), value.to_string());
            }
        }
    }

    fn set_text_content(&mut self, text: &str) {
        // Text replaces any children, as in the DOM. Detached nodes stay in
        // the arena but are unreachable from the root.
        self.children.clear();
        self.text = Some(text.to_string());
    }

    fn add_class(&mut self, name: &str) {
        if !self.has_class(name) {
            self.classes.push(name.to_string());
        }
    }

    fn remove_class(&mut self, name: &str) {
        self.classes.retain(|c| c != name);
    }
}

/// Serializable, nested view of a document subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElementSnapshot {
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementSnapshot>,
}

/// Headless DOM-like tree, stored as an arena rooted at node 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    pub fn new(root_tag: &str) -> Self {
        Self {
            nodes: vec![Node::new(root_tag, None)],
        }
    }

    /// The power-flow widget layout.
    pub fn power_flow() -> Self {
        let mut doc = Self::new("div");
        let root = doc.root();
        doc.node_mut(root).add_class("power-flow");

        let bars = doc.append_with(root, "div", None, &["bars"]);
        for (id, label) in [("pv", "PV"), ("battery", "Battery"), ("grid", "Grid"), ("load", "Load")] {
            let bar = doc.append_with(bars, "div", Some(id), &["bar", id]);
            let label_el = doc.append_with(bar, "span", None, &["label"]);
            doc.node_mut(label_el).set_text_content(label);
        }

        let load_text = doc.append_with(root, "div", Some("loadText"), &[]);
        for (class, text) in [("super", "0"), ("sub", ".0"), ("unit", "kW")] {
            let el = doc.append_with(load_text, "span", None, &[class]);
            doc.node_mut(el).set_text_content(text);
        }

        let soc = doc.append_with(root, "div", Some("batterySoC"), &["gauge"]);
        let value = doc.append_with(soc, "span", None, &["value"]);
        doc.node_mut(value).set_text_content("0%");

        let icons = doc.append_with(root, "div", Some("icons"), &[]);
        doc.append_with(icons, "span", Some("grid-disconnect"), &["icon", "off"]);

        doc
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Append a new child element and return its id.
    pub fn append(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(tag, Some(parent)));
        self.nodes[parent.0].children.push(id);
        id
    }

    fn append_with(
        &mut self,
        parent: NodeId,
        tag: &str,
        id: Option<&str>,
        classes: &[&str],
    ) -> NodeId {
        let node = self.append(parent, tag);
        let el = self.node_mut(node);
        if let Some(id) = id {
            el.set_attribute("id", id);
        }
        for class in classes {
            el.add_class(class);
        }
        node
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Nodes reachable from the root, in document order.
    fn descendants(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.node(id).children.iter().rev());
        }
        order
    }

    fn matches(&self, id: NodeId, selector: &Selector) -> bool {
        if !self.node(id).matches(selector.subject()) {
            return false;
        }

        // Descendant combinators only, so matching each ancestor compound
        // against the nearest qualifying ancestor is sufficient.
        let mut cursor = self.node(id).parent;
        for compound in selector.ancestors() {
            loop {
                let Some(ancestor) = cursor else {
                    return false;
                };
                cursor = self.node(ancestor).parent;
                if self.node(ancestor).matches(compound) {
                    break;
                }
            }
        }
        true
    }

    /// First node matching `selector` in document order.
    pub fn select(&self, selector: &Selector) -> Option<NodeId> {
        self.descendants()
            .into_iter()
            .find(|&id| self.matches(id, selector))
    }

    /// Parse `selector` and look up the first match; invalid selectors match nothing.
    pub fn find(&self, selector: &str) -> Option<&Node> {
        let selector = selector.parse::<Selector>().ok()?;
        self.select(&selector).map(|id| self.node(id))
    }

    pub fn snapshot(&self) -> ElementSnapshot {
        self.snapshot_of(self.root())
    }

    fn snapshot_of(&self, id: NodeId) -> ElementSnapshot {
        let node = self.node(id);
        ElementSnapshot {
            tag: node.tag.clone(),
            id: node.id.clone(),
            classes: node.classes.clone(),
            attributes: node.attributes.clone(),
            text: node.text.clone(),
            children: node
                .children
                .iter()
                .map(|&child| self.snapshot_of(child))
                .collect(),
        }
    }

    /// Serialize the document as HTML.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(self.root(), &mut out);
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        out.push('<');
        out.push_str(&node.tag);
        if let Some(id) = &node.id {
            let _ = write!(out, " id=\"{}\"", escape(id));
        }
        if !node.classes.is_empty() {
            let _ = write!(out, " class=\"{}\"", escape(&node.classes.join(" ")));
        }
        for (name, value) in &node.attributes {
            let _ = write!(out, " {}=\"{}\"", name, escape(value));
        }
        out.push('>');
        if let Some(text) = &node.text {
            out.push_str(&escape(text));
        }
        for &child in &node.children {
            self.write_html(child, out);
        }
        let _ = write!(out, "</{}>", node.tag);
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

impl Surface for Document {
    fn query_selector(&mut self, selector: &str) -> Option<&mut dyn Element> {
        let selector = match selector.parse::<Selector>() {
            Ok(selector) => selector,
            Err(e) => {
                tracing::trace!("Invalid selector {:?}: {}", selector, e);
                return None;
            }
        };
        let id = self.select(&selector)?;
        let element: &mut dyn Element = self.node_mut(id);
        Some(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_flow_has_every_target() {
        let doc = Document::power_flow();
        for selector in [
            "#load",
            "#loadText .super",
            "#loadText .sub",
            "#pv",
            "#battery",
            "#batterySoC",
            "#batterySoC .value",
            "#grid",
            "#icons #grid-disconnect",
        ] {
            assert!(doc.find(selector).is_some(), "missing {selector}");
        }
    }

    #[test]
    fn test_descendant_requires_ancestor() {
        let doc = Document::power_flow();
        assert!(doc.find("#icons #load").is_none());
        assert!(doc.find("#loadText .value").is_none());
        assert_eq!(doc.find(".power-flow #load").unwrap().id(), Some("load"));
    }

    #[test]
    fn test_select_returns_first_in_document_order() {
        let mut doc = Document::new("body");
        let root = doc.root();
        let a = doc.append(root, "p");
        doc.node_mut(a).add_class("x");
        doc.node_mut(a).set_text_content("first");
        let b = doc.append(root, "p");
        doc.node_mut(b).add_class("x");
        doc.node_mut(b).set_text_content("second");

        assert_eq!(doc.find("p.x").unwrap().text(), Some("first"));
        assert_eq!(doc.find("body .x").unwrap().text(), Some("first"));
    }

    #[test]
    fn test_query_selector_mutates_node() {
        let mut doc = Document::power_flow();
        doc.query_selector("#loadText .super")
            .unwrap()
            .set_text_content("7");
        assert_eq!(doc.find("#loadText .super").unwrap().text(), Some("7"));
    }

    #[test]
    fn test_invalid_selector_matches_nothing() {
        let mut doc = Document::power_flow();
        assert!(doc.query_selector("div > span").is_none());
        assert!(doc.query_selector("").is_none());
    }

    #[test]
    fn test_set_text_detaches_children() {
        let mut doc = Document::power_flow();
        doc.query_selector("#loadText").unwrap().set_text_content("n/a");
        assert!(doc.find("#loadText .super").is_none());
        assert_eq!(doc.find("#loadText").unwrap().text(), Some("n/a"));
    }

    #[test]
    fn test_class_changes_are_idempotent() {
        let mut doc = Document::power_flow();
        let el = doc.query_selector("#batterySoC").unwrap();
        el.add_class("low");
        el.add_class("low");
        el.remove_class("warning");
        let node = doc.find("#batterySoC").unwrap();
        assert_eq!(node.classes(), &["gauge".to_string(), "low".to_string()]);
    }

    #[test]
    fn test_to_html_escapes() {
        let mut doc = Document::new("div");
        let root = doc.root();
        doc.node_mut(root).set_attribute("id", "a\"b");
        doc.node_mut(root).set_attribute("style", "--percentage: 1.00");
        let child = doc.append(root, "span");
        doc.node_mut(child).set_text_content("<1 & 2>");

        assert_eq!(
            doc.to_html(),
            "<div id=\"a&quot;b\" style=\"--percentage: 1.00\"><span>&lt;1 &amp; 2&gt;</span></div>"
        );
    }

    #[test]
    fn test_snapshot_serializes_tree() {
        let doc = Document::power_flow();
        let json = serde_json::to_value(doc.snapshot()).unwrap();
        assert_eq!(json["tag"], "div");
        assert_eq!(json["classes"][0], "power-flow");
        let icons = json["children"]
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["id"] == "icons")
            .unwrap();
        assert_eq!(icons["children"][0]["id"], "grid-disconnect");
        assert_eq!(icons["children"][0]["classes"][1], "off");
    }
}
