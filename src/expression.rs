use crate::result::{ResultType, XPathResult};
use domxpath_xpath1::{
    Context, DomNode, Expression, NamespaceResolver, NullResolver, XPathError, parse_expression,
};
use std::fmt;

/// A compiled expression that can be evaluated any number of times, against
/// any node of any document.
#[derive(Debug, Clone, PartialEq)]
pub struct XPathExpression {
    source: String,
    expr: Expression,
}

impl XPathExpression {
    /// Compiles `source`. Without a resolver every prefixed name test is an
    /// unresolved-prefix error.
    pub fn new(source: &str, resolver: Option<&dyn NamespaceResolver>) -> Result<Self, XPathError> {
        let expr = parse_expression(source, resolver.unwrap_or(&NullResolver))?;
        Ok(XPathExpression {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expression(&self) -> &Expression {
        &self.expr
    }

    pub fn evaluate<'a, N: DomNode<'a>>(
        &self,
        node: N,
        result_type: ResultType,
    ) -> Result<XPathResult<N>, XPathError> {
        let value = self.expr.evaluate(&Context::new(node))?;
        XPathResult::new(value, result_type)
    }
}

impl fmt::Display for XPathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
