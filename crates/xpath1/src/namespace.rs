//! Prefix to namespace URI resolution used while compiling name tests.
use crate::dom::{DomNode, XHTML_NAMESPACE, XML_NAMESPACE, XMLNS_NAMESPACE};

/// Resolves a namespace prefix to a URI. `None` means the prefix is undeclared.
pub trait NamespaceResolver {
    fn lookup_namespace_uri(&self, prefix: &str) -> Option<String>;
}

impl<F> NamespaceResolver for F
where
    F: Fn(&str) -> Option<String>,
{
    fn lookup_namespace_uri(&self, prefix: &str) -> Option<String> {
        self(prefix)
    }
}

/// Resolves nothing; any prefixed name test fails to compile.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullResolver;

impl NamespaceResolver for NullResolver {
    fn lookup_namespace_uri(&self, _prefix: &str) -> Option<String> {
        None
    }
}

/// Resolves prefixes from the `xmlns` declarations in scope at a node.
///
/// `xml` and `xmlns` are always bound, and the empty prefix falls back to the
/// XHTML namespace when no default namespace is declared.
#[derive(Debug, Clone, Copy)]
pub struct NodeNamespaceResolver<N> {
    node: N,
}

impl<N> NodeNamespaceResolver<N> {
    pub fn new(node: N) -> Self {
        NodeNamespaceResolver { node }
    }

    pub fn node(&self) -> &N {
        &self.node
    }
}

impl<'a, N: DomNode<'a>> NamespaceResolver for NodeNamespaceResolver<N> {
    fn lookup_namespace_uri(&self, prefix: &str) -> Option<String> {
        match prefix {
            "xml" => Some(XML_NAMESPACE.to_string()),
            "xmlns" => Some(XMLNS_NAMESPACE.to_string()),
            "" => Some(
                self.node
                    .lookup_namespace_uri("")
                    .unwrap_or_else(|| XHTML_NAMESPACE.to_string()),
            ),
            _ => self.node.lookup_namespace_uri(prefix),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::mock::MockTree;

    #[test]
    fn node_resolver_walks_declarations() {
        let mut tree = MockTree::new();
        let html = tree.element(MockTree::ROOT, "html");
        tree.attribute(html, "xmlns:svg", "http://www.w3.org/2000/svg");
        let body = tree.element(html, "body");
        let resolver = NodeNamespaceResolver::new(tree.node(body));

        assert_eq!(
            resolver.lookup_namespace_uri("svg").as_deref(),
            Some("http://www.w3.org/2000/svg")
        );
        assert_eq!(resolver.lookup_namespace_uri("xml").as_deref(), Some(XML_NAMESPACE));
        assert_eq!(resolver.lookup_namespace_uri("").as_deref(), Some(XHTML_NAMESPACE));
        assert_eq!(resolver.lookup_namespace_uri("math"), None);
    }

    #[test]
    fn closures_are_resolvers() {
        let resolver = |prefix: &str| (prefix == "a").then(|| "urn:a".to_string());
        assert_eq!(resolver.lookup_namespace_uri("a").as_deref(), Some("urn:a"));
        assert_eq!(NullResolver.lookup_namespace_uri("a"), None);
    }
}
