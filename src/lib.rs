//! DOM-style XPath 1.0 evaluation.
//!
//! The engine lives in `domxpath-xpath1`; this crate packages it behind the
//! familiar `document.evaluate` surface: [`XPathEvaluator`],
//! [`XPathExpression`], [`XPathResult`] and [`install`], plus a roxmltree
//! backed host document in [`xml`].
pub mod error;
pub mod evaluator;
pub mod expression;
pub mod install;
pub mod result;
pub mod xml;

pub use error::Error;
pub use evaluator::XPathEvaluator;
pub use expression::XPathExpression;
pub use install::{Window, XPathHost, install};
pub use result::{ResultType, XPathResult};
pub use xml::{XmlDocument, XmlNode};

pub use domxpath_xpath1 as engine;
pub use domxpath_xpath1::{
    DomNode, NamespaceResolver, NodeNamespaceResolver, NodeType, NullResolver, QName, XPathError,
};
