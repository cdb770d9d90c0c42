use clap::Parser;
use domxpath::{
    DomNode, Error, NodeNamespaceResolver, NodeType, ResultType, XPathEvaluator, XPathResult,
    XmlDocument,
};
use serde::Serialize;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Evaluate an XPath 1.0 expression against an XML file.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the XML document
    file: PathBuf,

    /// The expression to evaluate
    expression: String,

    /// Result type: a DOM constant name, a short name (any, number, string,
    /// boolean, ordered-snapshot, first-node, ...) or a numeric code
    #[arg(short = 't', long = "type", default_value = "any")]
    result_type: ResultType,

    /// Expression selecting the context node, evaluated from the document root
    #[arg(short, long)]
    context: Option<String>,

    /// Print the result as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Serialize)]
struct NodeSummary {
    kind: &'static str,
    name: Option<String>,
    value: String,
}

#[derive(Serialize)]
#[serde(untagged)]
enum OutputValue {
    Number(f64),
    String(String),
    Boolean(bool),
    Nodes(Vec<NodeSummary>),
}

#[derive(Serialize)]
struct Output {
    result_type: ResultType,
    value: OutputValue,
}

fn summarize<'a, N: DomNode<'a>>(node: N) -> NodeSummary {
    let kind = match node.node_type() {
        NodeType::Root => "root",
        NodeType::Element => "element",
        NodeType::Attribute => "attribute",
        NodeType::Text => "text",
        NodeType::Comment => "comment",
        NodeType::ProcessingInstruction => "processing-instruction",
    };
    NodeSummary {
        kind,
        name: node.name().map(|qname| qname.to_string()),
        value: node.string_value(),
    }
}

fn output_value<'a, N: DomNode<'a>>(result: &XPathResult<N>) -> Result<OutputValue, Error> {
    let value = match result.result_type() {
        ResultType::Number => OutputValue::Number(result.number_value()?),
        ResultType::String => OutputValue::String(result.string_value()?.to_string()),
        ResultType::Boolean => OutputValue::Boolean(result.boolean_value()?),
        _ => OutputValue::Nodes(result.nodes().into_iter().map(summarize).collect()),
    };
    Ok(value)
}

fn main() -> Result<(), Error> {
    if env::var("RUST_LOG").is_err() {
        unsafe {
            env::set_var("RUST_LOG", "domxpath=info");
        }
    }
    env_logger::init();

    let args = Args::parse();

    let text = fs::read_to_string(&args.file)?;
    let doc = XmlDocument::parse(&text)?;
    let resolver = NodeNamespaceResolver::new(doc.root_element());
    let evaluator = XPathEvaluator::new();

    let context = match &args.context {
        Some(source) => evaluator
            .evaluate(source, doc.root_node(), Some(&resolver), ResultType::FirstOrderedNode)?
            .single_node_value()?
            .ok_or_else(|| Error::EmptyContext(source.clone()))?,
        None => doc.root_node(),
    };

    let result = evaluator.evaluate(&args.expression, context, Some(&resolver), args.result_type)?;
    let output = Output {
        result_type: result.result_type(),
        value: output_value(&result)?,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }
    match output.value {
        OutputValue::Number(n) => println!("{}", domxpath::engine::number_to_string(n)),
        OutputValue::String(s) => println!("{}", s),
        OutputValue::Boolean(b) => println!("{}", b),
        OutputValue::Nodes(nodes) => {
            for node in nodes {
                match node.name {
                    Some(name) => println!("{} {}: {}", node.kind, name, node.value),
                    None => println!("{}: {}", node.kind, node.value),
                }
            }
        }
    }
    Ok(())
}
