use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum XPathError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("XPath parse error in '{0}': {1}")]
    XPathParse(String, String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Function '{function}' error: {message}")]
    FunctionError { function: String, message: String },

    #[error("Unknown axis: {0}")]
    UnknownAxis(String),

    #[error("Namespace prefix not declared: {0}")]
    UnresolvedNamespacePrefix(String),

    #[error("Invalid node type: {0}")]
    InvalidNodeType(String),

    #[error("Function '{0}' is already registered")]
    DuplicateFunction(String),

    #[error("Axis '{0}' is already registered")]
    DuplicateAxis(String),

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Invalid XPathResult type: {0}")]
    InvalidResultType(String),

    #[error("Result of type {actual} cannot be read as {requested}")]
    ResultTypeMismatch {
        requested: &'static str,
        actual: &'static str,
    },
}

impl XPathError {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        XPathError::ParseError(message.into())
    }

    pub(crate) fn function(function: &str, message: impl Into<String>) -> Self {
        XPathError::FunctionError {
            function: function.to_string(),
            message: message.into(),
        }
    }

    /// Attaches the expression source to a syntax error. Other variants pass through.
    pub fn in_expression(self, source: &str) -> Self {
        match self {
            XPathError::ParseError(message) => XPathError::XPathParse(source.to_string(), message),
            other => other,
        }
    }
}
