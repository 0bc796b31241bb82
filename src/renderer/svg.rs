//! In-memory SVG element tree
//!
//! Painters build into an [`SvgDocument`]: an arena of elements addressed by
//! [`NodeId`]. Detached elements stay in the arena but are not serialized.

use super::SvgConfig;

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// Handle to an element of one [`SvgDocument`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// One element
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SvgElement {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    /// Class names without the configured prefix
    pub classes: Vec<String>,
    pub text: Option<String>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl SvgElement {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Self::default()
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// An SVG document rooted at an `<svg>` element
#[derive(Debug, Clone, PartialEq)]
pub struct SvgDocument {
    nodes: Vec<SvgElement>,
}

impl Default for SvgDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl SvgDocument {
    /// Create a document with an empty `<svg>` root
    pub fn new() -> Self {
        let mut root = SvgElement::new("svg");
        root.attributes
            .push(("xmlns".to_string(), SVG_NAMESPACE.to_string()));
        Self { nodes: vec![root] }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        node.0 < self.nodes.len()
    }

    pub fn element(&self, node: NodeId) -> Option<&SvgElement> {
        self.nodes.get(node.0)
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.push(SvgElement::new(tag));
        NodeId(self.nodes.len() - 1)
    }

    /// Create an element as the last child of `parent`
    pub fn append(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let node = self.create_element(tag);
        self.append_child(parent, node);
        node
    }

    /// Move `child` to the end of `parent`'s children
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if !self.contains(parent) || !self.contains(child) || parent == child {
            return false;
        }
        self.detach(child);
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
        true
    }

    /// Set an attribute, replacing any previous value
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: impl ToString) {
        let Some(element) = self.nodes.get_mut(node.0) else {
            return;
        };
        let value = value.to_string();
        match element.attributes.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = value,
            None => element.attributes.push((name.to_string(), value)),
        }
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?.attribute(name)
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if let Some(element) = self.nodes.get_mut(node.0) {
            if !element.classes.iter().any(|c| c == class) {
                element.classes.push(class.to_string());
            }
        }
    }

    pub fn set_text(&mut self, node: NodeId, text: impl Into<String>) {
        if let Some(element) = self.nodes.get_mut(node.0) {
            element.text = Some(text.into());
        }
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.element(node).map(SvgElement::children).unwrap_or(&[])
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.element(node)?.parent
    }

    /// Remove `node` from its parent; `false` if it had none
    pub fn detach(&mut self, node: NodeId) -> bool {
        let Some(parent) = self.parent(node) else {
            return false;
        };
        self.nodes[parent.0].children.retain(|c| *c != node);
        self.nodes[node.0].parent = None;
        true
    }

    /// Put `new` where `old` is and detach `old`
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> bool {
        let Some(parent) = self.parent(old) else {
            return false;
        };
        if !self.contains(new) || old == new {
            return false;
        }
        self.detach(new);
        let siblings = &mut self.nodes[parent.0].children;
        if let Some(slot) = siblings.iter_mut().find(|c| **c == old) {
            *slot = new;
        }
        self.nodes[old.0].parent = None;
        self.nodes[new.0].parent = Some(parent);
        true
    }

    /// Whether `node` is reachable from the root
    pub fn is_attached(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == self.root() {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Find an attached element by its `id` attribute
    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        let mut stack = vec![self.root()];
        while let Some(node) = stack.pop() {
            if self.attribute(node, "id") == Some(id) {
                return Some(node);
            }
            stack.extend(self.children(node).iter().rev());
        }
        None
    }

    /// Serialize the attached tree
    pub fn to_svg_string(&self, config: &SvgConfig) -> String {
        let mut writer = SvgWriter {
            config,
            out: String::new(),
        };
        if config.xml_declaration {
            let nl = writer.newline();
            writer.out.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
            writer.out.push_str(nl);
        }
        writer.write(self, self.root(), 0);
        writer.out
    }

    /// Serialize one element and its subtree
    pub fn fragment_to_string(&self, node: NodeId, config: &SvgConfig) -> String {
        let mut writer = SvgWriter {
            config,
            out: String::new(),
        };
        if self.contains(node) {
            writer.write(self, node, 0);
        }
        writer.out
    }
}

struct SvgWriter<'a> {
    config: &'a SvgConfig,
    out: String,
}

impl SvgWriter<'_> {
    fn indent_str(&self, depth: usize) -> String {
        if self.config.indent {
            "  ".repeat(depth)
        } else {
            String::new()
        }
    }

    fn newline(&self) -> &'static str {
        if self.config.indent {
            "\n"
        } else {
            ""
        }
    }

    fn write(&mut self, doc: &SvgDocument, node: NodeId, depth: usize) {
        let Some(element) = doc.element(node) else {
            return;
        };
        let indent = self.indent_str(depth);
        let nl = self.newline();

        self.out.push_str(&indent);
        self.out.push('<');
        self.out.push_str(&element.tag);
        for (name, value) in &element.attributes {
            self.out
                .push_str(&format!(r#" {}="{}""#, name, escape_xml(value)));
        }
        if !element.classes.is_empty() {
            let prefix = self.config.class_prefix.clone().unwrap_or_default();
            let class_list = element
                .classes
                .iter()
                .map(|c| format!("{}{}", prefix, c))
                .collect::<Vec<_>>()
                .join(" ");
            self.out
                .push_str(&format!(r#" class="{}""#, escape_xml(&class_list)));
        }

        match (&element.text, element.children.is_empty()) {
            (None, true) => {
                self.out.push_str("/>");
            }
            (Some(text), true) => {
                self.out
                    .push_str(&format!(">{}</{}>", escape_xml(text), element.tag));
            }
            (text, false) => {
                self.out.push('>');
                if let Some(text) = text {
                    self.out.push_str(&escape_xml(text));
                }
                self.out.push_str(nl);
                for child in &element.children {
                    self.write(doc, *child, depth + 1);
                }
                self.out.push_str(&indent);
                self.out.push_str(&format!("</{}>", element.tag));
            }
        }
        self.out.push_str(nl);
    }
}

/// Escape special XML characters
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a < b"), "a &lt; b");
        assert_eq!(escape_xml("a & b"), "a &amp; b");
        assert_eq!(escape_xml("<tag>"), "&lt;tag&gt;");
    }

    #[test]
    fn test_compact_serialization() {
        let mut doc = SvgDocument::new();
        let g = doc.append(doc.root(), "g");
        let rect = doc.append(g, "rect");
        doc.set_attribute(rect, "x", 10.0);
        doc.set_attribute(rect, "width", 5);
        doc.add_class(rect, "rect");
        let text = doc.append(g, "text");
        doc.set_text(text, "a & b");

        let svg = doc.to_svg_string(&SvgConfig::compact());
        assert_eq!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg"><g><rect x="10" width="5" class="rect"/><text>a &amp; b</text></g></svg>"#
        );
    }

    #[test]
    fn test_pretty_serialization_with_prefix() {
        let mut doc = SvgDocument::new();
        let rect = doc.append(doc.root(), "rect");
        doc.add_class(rect, "shape");

        let svg = doc.to_svg_string(&SvgConfig::default());
        assert_eq!(
            svg,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <svg xmlns=\"http://www.w3.org/2000/svg\">\n  \
             <rect class=\"viz-shape\"/>\n\
             </svg>\n"
        );
    }

    #[test]
    fn test_set_attribute_replaces() {
        let mut doc = SvgDocument::new();
        let rect = doc.append(doc.root(), "rect");
        doc.set_attribute(rect, "fill", "red");
        doc.set_attribute(rect, "fill", "blue");
        assert_eq!(doc.attribute(rect, "fill"), Some("blue"));
        assert_eq!(doc.element(rect).unwrap().attributes.len(), 1);
    }

    #[test]
    fn test_detach_and_replace() {
        let mut doc = SvgDocument::new();
        let root = doc.root();
        let a = doc.append(root, "rect");
        let b = doc.append(root, "circle");
        let c = doc.create_element("line");

        assert!(doc.replace(a, c));
        assert_eq!(doc.children(root), &[c, b]);
        assert!(!doc.is_attached(a));

        assert!(doc.detach(b));
        assert!(!doc.detach(b));
        assert_eq!(doc.children(root), &[c]);
    }

    #[test]
    fn test_find_by_id() {
        let mut doc = SvgDocument::new();
        let g = doc.append(doc.root(), "g");
        let rect = doc.append(g, "rect");
        doc.set_attribute(rect, "id", "target");
        assert_eq!(doc.find_by_id("target"), Some(rect));

        doc.detach(g);
        assert_eq!(doc.find_by_id("target"), None);
    }
}
