#![allow(dead_code)]

use domxpath::{
    DomNode, NodeNamespaceResolver, ResultType, XPathEvaluator, XPathResult, XmlDocument, XmlNode,
};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// A small catalogue used by most integration tests.
pub const CATALOG: &str = r#"<?xml version="1.0"?>
<catalog xmlns:dc="http://purl.org/dc/elements/1.1/">
  <section id="fiction" xml:lang="en-GB">
    <item id="i1" price="10"><dc:title>Dune</dc:title></item>
    <item id="i2" price="20"><dc:title>Emma</dc:title></item>
    <item id="i3" price="30"><dc:title>Ulysses</dc:title></item>
  </section>
  <!-- reference shelf -->
  <section id="reference">
    <item id="i4" price="5" class="new"><dc:title>Atlas</dc:title></item>
  </section>
  <?render mode="compact"?>
</catalog>"#;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn parse(xml: &str) -> XmlDocument<'_> {
    init_logger();
    match XmlDocument::parse(xml) {
        Ok(doc) => doc,
        Err(err) => panic!("fixture failed to parse: {}", err),
    }
}

/// Evaluates `expr` from the document root with prefixes resolved from the
/// document element.
pub fn eval<'a, 'input>(
    doc: &'a XmlDocument<'input>,
    expr: &str,
    result_type: ResultType,
) -> Result<XPathResult<XmlNode<'a, 'input>>, domxpath::XPathError> {
    let resolver = NodeNamespaceResolver::new(doc.root_element());
    XPathEvaluator::new().evaluate(expr, doc.root_node(), Some(&resolver), result_type)
}

pub fn number(doc: &XmlDocument<'_>, expr: &str) -> f64 {
    eval(doc, expr, ResultType::Number)
        .and_then(|r| r.number_value())
        .unwrap_or_else(|err| panic!("{}: {}", expr, err))
}

pub fn string(doc: &XmlDocument<'_>, expr: &str) -> String {
    eval(doc, expr, ResultType::String)
        .and_then(|r| r.string_value().map(str::to_string))
        .unwrap_or_else(|err| panic!("{}: {}", expr, err))
}

pub fn boolean(doc: &XmlDocument<'_>, expr: &str) -> bool {
    eval(doc, expr, ResultType::Boolean)
        .and_then(|r| r.boolean_value())
        .unwrap_or_else(|err| panic!("{}: {}", expr, err))
}

/// The `id` attribute (or name, when there is none) of every selected node.
pub fn ids(doc: &XmlDocument<'_>, expr: &str) -> Vec<String> {
    let result = eval(doc, expr, ResultType::OrderedNodeSnapshot)
        .unwrap_or_else(|err| panic!("{}: {}", expr, err));
    result.nodes().into_iter().map(label).collect()
}

pub fn label<'a, N: DomNode<'a>>(node: N) -> String {
    node.attributes()
        .find(|attr| attr.name().is_some_and(|q| q.local_part == "id" && q.prefix.is_none()))
        .map(|attr| attr.string_value())
        .or_else(|| node.name().map(|q| q.to_string()))
        .unwrap_or_else(|| node.string_value())
}
