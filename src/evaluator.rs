use crate::expression::XPathExpression;
use crate::result::{ResultType, XPathResult};
use domxpath_xpath1::{DomNode, NamespaceResolver, NodeNamespaceResolver, XPathError};

/// The `document.evaluate` family of entry points.
#[derive(Debug, Default, Clone, Copy)]
pub struct XPathEvaluator;

impl XPathEvaluator {
    pub fn new() -> Self {
        XPathEvaluator
    }

    pub fn create_expression(
        &self,
        source: &str,
        resolver: Option<&dyn NamespaceResolver>,
    ) -> Result<XPathExpression, XPathError> {
        XPathExpression::new(source, resolver)
    }

    /// A resolver that looks prefixes up from the declarations in scope at `node`.
    pub fn create_ns_resolver<'a, N: DomNode<'a>>(&self, node: N) -> NodeNamespaceResolver<N> {
        NodeNamespaceResolver::new(node)
    }

    /// Compiles and evaluates in one call.
    pub fn evaluate<'a, N: DomNode<'a>>(
        &self,
        source: &str,
        node: N,
        resolver: Option<&dyn NamespaceResolver>,
        result_type: ResultType,
    ) -> Result<XPathResult<N>, XPathError> {
        self.create_expression(source, resolver)?
            .evaluate(node, result_type)
    }
}
