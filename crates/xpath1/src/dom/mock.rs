//! An in-memory tree implementing [`DomNode`], public so downstream crates can
//! test against it.
use super::{DomNode, NodeType, QName, XML_NAMESPACE, XMLNS_NAMESPACE};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone)]
struct MockNodeData {
    node_type: NodeType,
    prefix: Option<String>,
    local: Option<String>,
    namespace: Option<String>,
    value: String,
    parent: Option<usize>,
    children: Vec<usize>,
    attributes: Vec<usize>,
}

impl MockNodeData {
    fn new(node_type: NodeType, parent: Option<usize>) -> Self {
        MockNodeData {
            node_type,
            prefix: None,
            local: None,
            namespace: None,
            value: String::new(),
            parent,
            children: Vec::new(),
            attributes: Vec::new(),
        }
    }
}

/// A mutable tree builder. Ids are stable; document order is recomputed after
/// every insertion so nodes can be added in any order.
#[derive(Debug, Clone)]
pub struct MockTree {
    nodes: Vec<MockNodeData>,
    order: Vec<usize>,
}

/// A handle into a [`MockTree`].
#[derive(Clone, Copy)]
pub struct MockNode<'a> {
    pub id: usize,
    pub tree: &'a MockTree,
}

impl Default for MockTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTree {
    /// Id of the document root.
    pub const ROOT: usize = 0;

    pub fn new() -> Self {
        MockTree {
            nodes: vec![MockNodeData::new(NodeType::Root, None)],
            order: vec![0],
        }
    }

    pub fn root(&self) -> MockNode<'_> {
        self.node(Self::ROOT)
    }

    pub fn node(&self, id: usize) -> MockNode<'_> {
        MockNode { id, tree: self }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Appends an element without a namespace. `name` may be `prefix:local`.
    pub fn element(&mut self, parent: usize, name: &str) -> usize {
        self.insert_named(parent, NodeType::Element, name, None, "")
    }

    pub fn element_ns(&mut self, parent: usize, name: &str, namespace: &str) -> usize {
        self.insert_named(parent, NodeType::Element, name, Some(namespace), "")
    }

    /// Adds an attribute. `xml:*` and `xmlns*` names get their reserved namespaces.
    pub fn attribute(&mut self, owner: usize, name: &str, value: &str) -> usize {
        let namespace = if name == "xmlns" || name.starts_with("xmlns:") {
            Some(XMLNS_NAMESPACE)
        } else if name.starts_with("xml:") {
            Some(XML_NAMESPACE)
        } else {
            None
        };
        self.insert_named(owner, NodeType::Attribute, name, namespace, value)
    }

    pub fn attribute_ns(&mut self, owner: usize, name: &str, value: &str, namespace: &str) -> usize {
        self.insert_named(owner, NodeType::Attribute, name, Some(namespace), value)
    }

    pub fn text(&mut self, parent: usize, value: &str) -> usize {
        self.insert(parent, NodeType::Text, value)
    }

    pub fn comment(&mut self, parent: usize, value: &str) -> usize {
        self.insert(parent, NodeType::Comment, value)
    }

    pub fn processing_instruction(&mut self, parent: usize, target: &str, value: &str) -> usize {
        self.insert_named(parent, NodeType::ProcessingInstruction, target, None, value)
    }

    /// The `nth` element (0-based, document order) with the given local name.
    pub fn find_element(&self, local: &str, nth: usize) -> Option<MockNode<'_>> {
        let mut matches: Vec<MockNode<'_>> = (0..self.nodes.len())
            .map(|id| self.node(id))
            .filter(|node| {
                node.node_type() == NodeType::Element
                    && node.name().is_some_and(|qname| qname.local_part == local)
            })
            .collect();
        matches.sort();
        matches.into_iter().nth(nth)
    }

    fn insert(&mut self, parent: usize, node_type: NodeType, value: &str) -> usize {
        let mut data = MockNodeData::new(node_type, Some(parent));
        data.value = value.to_string();
        self.push(data)
    }

    fn insert_named(
        &mut self,
        parent: usize,
        node_type: NodeType,
        name: &str,
        namespace: Option<&str>,
        value: &str,
    ) -> usize {
        let mut data = MockNodeData::new(node_type, Some(parent));
        match name.split_once(':') {
            Some((prefix, local)) => {
                data.prefix = Some(prefix.to_string());
                data.local = Some(local.to_string());
            }
            None => data.local = Some(name.to_string()),
        }
        data.namespace = namespace.map(str::to_string);
        data.value = value.to_string();
        self.push(data)
    }

    fn push(&mut self, data: MockNodeData) -> usize {
        let id = self.nodes.len();
        let is_attribute = data.node_type == NodeType::Attribute;
        let parent = data.parent;
        self.nodes.push(data);
        if let Some(parent) = parent {
            if is_attribute {
                self.nodes[parent].attributes.push(id);
            } else {
                self.nodes[parent].children.push(id);
            }
        }
        self.reindex();
        id
    }

    fn reindex(&mut self) {
        let mut order = vec![0; self.nodes.len()];
        let mut next = 0;
        let mut stack = vec![Self::ROOT];
        while let Some(id) = stack.pop() {
            order[id] = next;
            next += 1;
            for &attr in &self.nodes[id].attributes {
                order[attr] = next;
                next += 1;
            }
            stack.extend(self.nodes[id].children.iter().rev());
        }
        self.order = order;
    }

    fn data(&self, id: usize) -> &MockNodeData {
        &self.nodes[id]
    }
}

impl fmt::Debug for MockNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.tree.data(self.id);
        write!(f, "MockNode#{}({:?}", self.id, data.node_type)?;
        if let Some(local) = &data.local {
            write!(f, " {}", local)?;
        }
        f.write_str(")")
    }
}

impl PartialEq for MockNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && std::ptr::eq(self.tree, other.tree)
    }
}
impl Eq for MockNode<'_> {}

impl PartialOrd for MockNode<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for MockNode<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tree.order[self.id].cmp(&self.tree.order[other.id])
    }
}

impl Hash for MockNode<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<'a> DomNode<'a> for MockNode<'a> {
    fn node_type(&self) -> NodeType {
        self.tree.data(self.id).node_type
    }

    fn name(&self) -> Option<QName<'a>> {
        let tree: &'a MockTree = self.tree;
        let data = tree.data(self.id);
        data.local.as_deref().map(|local_part| QName {
            prefix: data.prefix.as_deref(),
            local_part,
        })
    }

    fn namespace_uri(&self) -> Option<&'a str> {
        let tree: &'a MockTree = self.tree;
        tree.data(self.id).namespace.as_deref()
    }

    fn string_value(&self) -> String {
        let data = self.tree.data(self.id);
        match data.node_type {
            NodeType::Root | NodeType::Element => self
                .descendants()
                .into_iter()
                .filter(|node| node.node_type() == NodeType::Text)
                .map(|node| node.tree.data(node.id).value.as_str())
                .collect(),
            _ => data.value.clone(),
        }
    }

    fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        let tree = self.tree;
        Box::new(
            tree.data(self.id)
                .attributes
                .iter()
                .map(move |&id| MockNode { id, tree }),
        )
    }

    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        let tree = self.tree;
        Box::new(
            tree.data(self.id)
                .children
                .iter()
                .map(move |&id| MockNode { id, tree }),
        )
    }

    fn parent(&self) -> Option<Self> {
        self.tree.data(self.id).parent.map(|id| MockNode {
            id,
            tree: self.tree,
        })
    }
}

/// Builds the shared fixture:
/// ```text
/// <root>
///   <para id="p1" xml:lang="en">Hello</para>
///   <!-- comment node -->
///   <div class="box"></div>
///   <?pi-target pi-value?>
///   <para>World</para>
///   <list><item id="i1">1</item><item>2</item><item>3</item></list>
/// </root>
/// ```
pub fn create_test_tree() -> MockTree {
    let mut tree = MockTree::new();
    let root = tree.element(MockTree::ROOT, "root");

    let para = tree.element(root, "para");
    tree.attribute(para, "id", "p1");
    tree.attribute(para, "xml:lang", "en");
    tree.text(para, "Hello");

    tree.comment(root, " comment node ");

    let div = tree.element(root, "div");
    tree.attribute(div, "class", "box");

    tree.processing_instruction(root, "pi-target", "pi-value");

    let para = tree.element(root, "para");
    tree.text(para, "World");

    let list = tree.element(root, "list");
    for (index, value) in ["1", "2", "3"].into_iter().enumerate() {
        let item = tree.element(list, "item");
        if index == 0 {
            tree.attribute(item, "id", "i1");
        }
        tree.text(item, value);
    }
    tree
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_order_places_attributes_between_owner_and_children() {
        let tree = create_test_tree();
        let para = tree.find_element("para", 0).unwrap();
        let attr = para.attributes().next().unwrap();
        let text = para.children().next().unwrap();
        assert!(para < attr);
        assert!(attr < text);
        assert_eq!(attr.parent(), Some(para));
    }

    #[test]
    fn siblings_and_string_values() {
        let tree = create_test_tree();
        let first = tree.find_element("para", 0).unwrap();
        let comment = first.next_sibling().unwrap();
        assert_eq!(comment.node_type(), NodeType::Comment);
        assert_eq!(comment.previous_sibling(), Some(first));
        assert_eq!(tree.root().string_value(), "HelloWorld123");
        assert_eq!(tree.find_element("list", 0).unwrap().string_value(), "123");
    }

    #[test]
    fn attribute_probe_ignores_namespaced_attributes() {
        let tree = create_test_tree();
        let para = tree.find_element("para", 0).unwrap();
        assert!(para.attr_matches("ID", Some("p1")));
        assert!(para.attr_matches("id", None));
        assert!(!para.attr_matches("lang", None));
        assert!(!para.attr_matches("id", Some("p2")));
    }

    #[test]
    fn namespace_lookup_walks_ancestors() {
        let mut tree = MockTree::new();
        let html = tree.element(MockTree::ROOT, "html");
        tree.attribute(html, "xmlns:svg", "http://www.w3.org/2000/svg");
        let body = tree.element(html, "body");
        let body = tree.node(body);
        assert_eq!(
            body.lookup_namespace_uri("svg").as_deref(),
            Some("http://www.w3.org/2000/svg")
        );
        assert_eq!(body.lookup_namespace_uri("math"), None);
        assert_eq!(tree.root().lookup_namespace_uri("svg").as_deref(), Some("http://www.w3.org/2000/svg"));
    }

    #[test]
    fn element_by_id_finds_first_match() {
        let tree = create_test_tree();
        let found = tree.root().element_by_id("i1").unwrap();
        assert_eq!(found, tree.find_element("item", 0).unwrap());
        assert!(tree.root().element_by_id("missing").is_none());
    }
}
