//! An XPath 1.0 engine over any document that implements [`DomNode`].
//!
//! Expressions are compiled once by [`parse_expression`] into an [`Expression`]
//! tree and evaluated any number of times against a [`Context`].
pub mod ast;
pub mod axes;
pub mod context;
pub mod dom;
pub mod engine;
pub mod error;
pub mod functions;
pub mod lexer;
pub mod namespace;
pub mod nodeset;
pub mod operators;
pub mod parser;

pub use ast::{BinaryOperator, DataType, Expression, NodeTest, Step};
pub use axes::Axis;
pub use context::Context;
pub use dom::{DomNode, NodeType, QName};
pub use engine::{XPathValue, evaluate, number_to_string, string_to_number};
pub use error::XPathError;
pub use functions::{Function, FunctionRegistry};
pub use namespace::{NamespaceResolver, NodeNamespaceResolver, NullResolver};
pub use nodeset::NodeSet;
pub use parser::parse_expression;

// In-memory tree for tests here and in downstream crates
pub use dom::mock;
