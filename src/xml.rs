// XML host documents backed by roxmltree
use domxpath_xpath1::dom::XML_NAMESPACE;
use domxpath_xpath1::{DomNode, NodeType, QName};
use roxmltree::Node;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// An owned, parsed XML document that can be queried.
pub struct XmlDocument<'input> {
    doc: roxmltree::Document<'input>,
}

impl<'input> XmlDocument<'input> {
    pub fn parse(text: &'input str) -> Result<Self, roxmltree::Error> {
        let doc = roxmltree::Document::parse(text)?;
        Ok(Self { doc })
    }

    /// The document (root) node.
    pub fn root_node(&self) -> XmlNode<'_, 'input> {
        XmlNode::Element(self.doc.root())
    }

    pub fn root_element(&self) -> XmlNode<'_, 'input> {
        XmlNode::Element(self.doc.root_element())
    }

    pub fn document(&self) -> &roxmltree::Document<'input> {
        &self.doc
    }
}

/// A node of an [`XmlDocument`]. roxmltree keeps attributes as data on their
/// element, so an attribute node is addressed by its owner and index.
#[derive(Debug, Clone, Copy)]
pub enum XmlNode<'a, 'input> {
    /// A tree node (root, element, text, comment or processing instruction)
    Element(Node<'a, 'input>),
    Attribute { parent: Node<'a, 'input>, index: usize },
}

impl<'a, 'input> XmlNode<'a, 'input> {
    pub fn new(node: Node<'a, 'input>) -> Self {
        XmlNode::Element(node)
    }

    pub fn inner(&self) -> Option<Node<'a, 'input>> {
        match self {
            XmlNode::Element(node) => Some(*node),
            XmlNode::Attribute { .. } => None,
        }
    }

    /// The element that owns this node's namespace scope.
    fn scope(&self) -> Option<Node<'a, 'input>> {
        match self {
            XmlNode::Element(node) if node.is_root() => node.first_element_child(),
            XmlNode::Element(node) if node.is_element() => Some(*node),
            XmlNode::Element(node) => node.parent_element(),
            XmlNode::Attribute { parent, .. } => Some(*parent),
        }
    }

    fn order_key(&self) -> (u32, usize) {
        match self {
            XmlNode::Element(node) => (node.id().get(), 0),
            XmlNode::Attribute { parent, index } => (parent.id().get(), index + 1),
        }
    }
}

impl PartialEq for XmlNode<'_, '_> {
    fn eq(&self, other: &Self) -> bool {
        self.order_key() == other.order_key()
    }
}

impl Eq for XmlNode<'_, '_> {}

impl PartialOrd for XmlNode<'_, '_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Node ids are assigned in document order, and an element's attributes sort
/// right after it and before its first child.
impl Ord for XmlNode<'_, '_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order_key().cmp(&other.order_key())
    }
}

impl Hash for XmlNode<'_, '_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.order_key().hash(state);
    }
}

impl<'a, 'input: 'a> DomNode<'a> for XmlNode<'a, 'input> {
    fn node_type(&self) -> NodeType {
        match self {
            XmlNode::Element(node) => {
                if node.is_root() {
                    NodeType::Root
                } else if node.is_text() {
                    NodeType::Text
                } else if node.is_comment() {
                    NodeType::Comment
                } else if node.is_pi() {
                    NodeType::ProcessingInstruction
                } else {
                    NodeType::Element
                }
            }
            XmlNode::Attribute { .. } => NodeType::Attribute,
        }
    }

    fn name(&self) -> Option<QName<'a>> {
        match self {
            XmlNode::Element(node) if node.is_element() => {
                let tag = node.tag_name();
                let prefix = tag.namespace().and_then(|uri| node.lookup_prefix(uri));
                Some(QName {
                    prefix,
                    local_part: tag.name(),
                })
            }
            XmlNode::Element(node) => node.pi().map(|pi| QName {
                prefix: None,
                local_part: pi.target,
            }),
            XmlNode::Attribute { parent, index } => {
                let attr = parent.attributes().nth(*index)?;
                let prefix = match attr.namespace() {
                    Some(XML_NAMESPACE) => Some("xml"),
                    Some(uri) => parent.lookup_prefix(uri),
                    None => None,
                };
                Some(QName {
                    prefix,
                    local_part: attr.name(),
                })
            }
        }
    }

    fn namespace_uri(&self) -> Option<&'a str> {
        match self {
            XmlNode::Element(node) if node.is_element() => node.tag_name().namespace(),
            XmlNode::Element(_) => None,
            XmlNode::Attribute { parent, index } => parent.attributes().nth(*index)?.namespace(),
        }
    }

    fn string_value(&self) -> String {
        match self {
            XmlNode::Element(node) if node.is_element() || node.is_root() => node
                .descendants()
                .filter(|n| n.is_text())
                .filter_map(|n| n.text())
                .collect(),
            XmlNode::Element(node) if node.is_pi() => node
                .pi()
                .and_then(|pi| pi.value)
                .unwrap_or_default()
                .to_string(),
            XmlNode::Element(node) => node.text().unwrap_or_default().to_string(),
            XmlNode::Attribute { parent, index } => parent
                .attributes()
                .nth(*index)
                .map(|attr| attr.value().to_string())
                .unwrap_or_default(),
        }
    }

    fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        match self {
            XmlNode::Element(node) if node.is_element() => {
                let parent = *node;
                let count = node.attributes().len();
                Box::new((0..count).map(move |index| XmlNode::Attribute { parent, index }))
            }
            _ => Box::new(std::iter::empty()),
        }
    }

    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        match self {
            XmlNode::Element(node) => Box::new(node.children().map(XmlNode::Element)),
            XmlNode::Attribute { .. } => Box::new(std::iter::empty()),
        }
    }

    fn parent(&self) -> Option<Self> {
        match self {
            XmlNode::Element(node) => node.parent().map(XmlNode::Element),
            XmlNode::Attribute { parent, .. } => Some(XmlNode::Element(*parent)),
        }
    }

    fn next_sibling(&self) -> Option<Self> {
        self.inner()?.next_sibling().map(XmlNode::Element)
    }

    fn previous_sibling(&self) -> Option<Self> {
        self.inner()?.prev_sibling().map(XmlNode::Element)
    }

    /// roxmltree keeps `xmlns` declarations out of the attribute list, so
    /// prefixes are resolved through its namespace table instead.
    fn lookup_namespace_uri(&self, prefix: &str) -> Option<String> {
        let prefix = (!prefix.is_empty()).then_some(prefix);
        self.scope()?
            .lookup_namespace_uri(prefix)
            .filter(|uri| !uri.is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = r#"<?xml version="1.0"?>
<library xmlns:dc="http://purl.org/dc/elements/1.1/">
  <book id="b1" xml:lang="en"><dc:title>Dune</dc:title></book>
  <!-- shelf -->
  <book id="b2"><dc:title>Emma</dc:title></book>
</library>"#;

    #[test]
    fn node_types_and_names() {
        let doc = XmlDocument::parse(XML).unwrap();
        let library = doc.root_element();
        assert_eq!(doc.root_node().node_type(), NodeType::Root);
        assert_eq!(library.node_type(), NodeType::Element);
        assert_eq!(library.name().map(|q| q.local_part), Some("library"));

        let book = library.children().find(|n| n.node_type() == NodeType::Element).unwrap();
        let names: Vec<String> = book
            .attributes()
            .filter_map(|a| a.name())
            .map(|q| q.to_string())
            .collect();
        assert_eq!(names, vec!["id", "xml:lang"]);

        let title = book.children().next().unwrap();
        assert_eq!(title.name().map(|q| q.to_string()).as_deref(), Some("dc:title"));
        assert_eq!(title.namespace_uri(), Some("http://purl.org/dc/elements/1.1/"));
        assert_eq!(book.string_value(), "Dune");
    }

    #[test]
    fn attributes_sort_between_element_and_children() {
        let doc = XmlDocument::parse(XML).unwrap();
        let library = doc.root_element();
        let book = library.children().find(|n| n.node_type() == NodeType::Element).unwrap();
        let id = book.attributes().next().unwrap();
        let title = book.children().next().unwrap();
        assert!(book < id);
        assert!(id < title);
        assert_eq!(id.parent(), Some(book));
        assert_eq!(id.next_sibling(), None);
    }

    #[test]
    fn namespaces_come_from_the_document_table() {
        let doc = XmlDocument::parse(XML).unwrap();
        let book = doc.root_element().children().nth(1).unwrap();
        assert_eq!(
            book.lookup_namespace_uri("dc").as_deref(),
            Some("http://purl.org/dc/elements/1.1/")
        );
        assert_eq!(book.lookup_namespace_uri(""), None);
        assert_eq!(book.lookup_namespace_uri("x"), None);
    }
}
