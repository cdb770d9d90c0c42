//! The host DOM abstraction the evaluator navigates.
use std::fmt;
use std::hash::Hash;

pub mod mock;

/// Namespace that unprefixed name tests are matched against.
pub const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";
/// Namespace bound to the reserved `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
/// Namespace bound to the reserved `xmlns` prefix.
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// A qualified name, consisting of an optional prefix and a local part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QName<'a> {
    pub prefix: Option<&'a str>,
    pub local_part: &'a str,
}

impl fmt::Display for QName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.prefix {
            Some(prefix) => write!(f, "{}:{}", prefix, self.local_part),
            None => f.write_str(self.local_part),
        }
    }
}

/// The type of a node in the host tree, aligned with the XPath 1.0 data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Root,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
}

/// Case-insensitive name comparison used by name tests and attribute probes.
pub(crate) fn names_match(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || a.to_lowercase() == b.to_lowercase()
}

/// The contract a host document must satisfy to be queried.
///
/// Nodes are small handles (`Copy`) whose `Ord` is document order. Attribute
/// nodes order after their owner element and before its children. `'a` is the
/// lifetime of the underlying document.
///
/// Only the navigation primitives are required; sibling walks, namespace
/// lookup and id lookup have default implementations that hosts may override
/// with something faster.
pub trait DomNode<'a>:
    fmt::Debug + Clone + Copy + PartialEq + Eq + Hash + PartialOrd + Ord
{
    /// The type of the node (Element, Text, Attribute, etc.).
    fn node_type(&self) -> NodeType;

    /// The qualified name of the node. `None` for text, comment and root nodes.
    /// For a processing instruction this is its target.
    fn name(&self) -> Option<QName<'a>>;

    /// The namespace URI of an element or attribute, if it has one.
    fn namespace_uri(&self) -> Option<&'a str>;

    /// The XPath string-value of the node.
    /// - For a text node, this is its content.
    /// - For an element or the root, the concatenation of all descendant text.
    /// - For an attribute, its value.
    /// - For a comment or processing instruction, its content.
    fn string_value(&self) -> String;

    /// The attribute nodes of this node. Empty for non-elements.
    fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'a>;

    /// The child nodes of this node in document order.
    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a>;

    /// The parent node. For an attribute this is its owner element.
    fn parent(&self) -> Option<Self>;

    fn next_sibling(&self) -> Option<Self> {
        if self.node_type() == NodeType::Attribute {
            return None;
        }
        let mut siblings = self.parent()?.children();
        siblings.by_ref().find(|sibling| sibling == self)?;
        siblings.next()
    }

    fn previous_sibling(&self) -> Option<Self> {
        if self.node_type() == NodeType::Attribute {
            return None;
        }
        let mut previous = None;
        for sibling in self.parent()?.children() {
            if sibling == *self {
                return previous;
            }
            previous = Some(sibling);
        }
        None
    }

    /// All descendants in document order, excluding the node itself and attributes.
    fn descendants(&self) -> Vec<Self> {
        let mut out = Vec::new();
        let mut stack: Vec<Self> = self.children().collect();
        stack.reverse();
        while let Some(node) = stack.pop() {
            out.push(node);
            let mut children: Vec<Self> = node.children().collect();
            children.reverse();
            stack.extend(children);
        }
        out
    }

    fn root(&self) -> Self {
        let mut node = *self;
        while let Some(parent) = node.parent() {
            node = parent;
        }
        node
    }

    /// True if `other` is a strict descendant of this node. An element contains
    /// its own attributes.
    fn is_ancestor_of(&self, other: Self) -> bool {
        let mut current = other.parent();
        while let Some(node) = current {
            if node == *self {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// Whether this element carries an un-namespaced attribute `name`,
    /// optionally with exactly `value`.
    fn attr_matches(&self, name: &str, value: Option<&str>) -> bool {
        if self.node_type() != NodeType::Element {
            return false;
        }
        self.attributes().any(|attr| {
            let unqualified = attr
                .namespace_uri()
                .is_none_or(|uri| names_match(uri, XHTML_NAMESPACE));
            unqualified
                && attr
                    .name()
                    .is_some_and(|qname| qname.prefix.is_none() && names_match(qname.local_part, name))
                && value.is_none_or(|expected| attr.string_value() == expected)
        })
    }

    /// Resolves `prefix` against the in-scope `xmlns` declarations. An empty
    /// prefix looks up the default namespace.
    fn lookup_namespace_uri(&self, prefix: &str) -> Option<String> {
        let mut current = match self.node_type() {
            NodeType::Element => Some(*self),
            NodeType::Root => self
                .children()
                .find(|child| child.node_type() == NodeType::Element),
            _ => self.parent(),
        };
        while let Some(node) = current {
            if node.node_type() == NodeType::Element {
                let declaration = node.attributes().find(|attr| {
                    attr.name().is_some_and(|qname| match qname.prefix {
                        None => prefix.is_empty() && qname.local_part == "xmlns",
                        Some(p) => p == "xmlns" && qname.local_part == prefix,
                    })
                });
                if let Some(attr) = declaration {
                    let uri = attr.string_value();
                    return (!uri.is_empty()).then_some(uri);
                }
            }
            current = node.parent();
        }
        None
    }

    /// The first element in this node's document whose `id` or `xml:id`
    /// attribute equals `id`.
    fn element_by_id(&self, id: &str) -> Option<Self> {
        self.root().descendants().into_iter().find(|node| {
            node.node_type() == NodeType::Element
                && node.attributes().any(|attr| {
                    attr.name().is_some_and(|qname| {
                        qname.local_part == "id"
                            && (qname.prefix.is_none() || qname.prefix == Some("xml"))
                    }) && attr.string_value() == id
                })
        })
    }
}
