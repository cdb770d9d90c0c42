use domxpath_xpath1::XPathError;
use thiserror::Error;

/// Errors surfaced by the integration layer and the command-line tool.
#[derive(Error, Debug)]
pub enum Error {
    #[error("XPath error: {0}")]
    XPath(#[from] XPathError),

    #[error("XML parsing failed: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Context expression '{0}' selected no node")]
    EmptyContext(String),
}
