//! The XPath 1.0 core function library and its registry.
//!
//! Each [`Function`] has a static [`FunctionSpec`] describing its arity, result
//! type and context requirements. Arguments are passed unevaluated so each
//! function converts them the way it needs.
use crate::ast::{DataType, Expression};
use crate::context::Context;
use crate::dom::{DomNode, NodeType};
use crate::engine::{XPathValue, string_to_number};
use crate::error::XPathError;
use crate::nodeset::NodeSet;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Static description of a core function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub return_type: DataType,
    pub needs_context_position: bool,
    /// Reads the context node when called with no arguments.
    pub needs_context_node_without_args: bool,
    /// Reads the context node even when called with arguments.
    pub needs_context_node_with_args: bool,
    pub min_args: usize,
    /// `None` means variadic.
    pub max_args: Option<usize>,
    /// Every argument must be statically typed as a node-set.
    pub nodesets_required: bool,
}

const fn spec(
    name: &'static str,
    return_type: DataType,
    context: (bool, bool, bool),
    min_args: usize,
    max_args: Option<usize>,
    nodesets_required: bool,
) -> FunctionSpec {
    FunctionSpec {
        name,
        return_type,
        needs_context_position: context.0,
        needs_context_node_without_args: context.1,
        needs_context_node_with_args: context.2,
        min_args,
        max_args,
        nodesets_required,
    }
}

const NONE: (bool, bool, bool) = (false, false, false);
const POSITION: (bool, bool, bool) = (true, false, false);
const NODE_WITHOUT_ARGS: (bool, bool, bool) = (false, true, false);
const NODE_WITH_ARGS: (bool, bool, bool) = (false, false, true);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Boolean,
    Ceiling,
    Concat,
    Contains,
    Count,
    False,
    Floor,
    Id,
    Lang,
    Last,
    LocalName,
    Name,
    NamespaceUri,
    NormalizeSpace,
    Not,
    Number,
    Position,
    Round,
    StartsWith,
    String,
    StringLength,
    Substring,
    SubstringAfter,
    SubstringBefore,
    Sum,
    Translate,
    True,
}

impl Function {
    pub const ALL: [Function; 27] = [
        Function::Boolean,
        Function::Ceiling,
        Function::Concat,
        Function::Contains,
        Function::Count,
        Function::False,
        Function::Floor,
        Function::Id,
        Function::Lang,
        Function::Last,
        Function::LocalName,
        Function::Name,
        Function::NamespaceUri,
        Function::NormalizeSpace,
        Function::Not,
        Function::Number,
        Function::Position,
        Function::Round,
        Function::StartsWith,
        Function::String,
        Function::StringLength,
        Function::Substring,
        Function::SubstringAfter,
        Function::SubstringBefore,
        Function::Sum,
        Function::Translate,
        Function::True,
    ];

    pub fn spec(self) -> &'static FunctionSpec {
        use crate::ast::DataType::{Boolean as B, NodeSet as NS, Number as N, String as S};
        const BOOLEAN: FunctionSpec = spec("boolean", B, NONE, 1, Some(1), false);
        const CEILING: FunctionSpec = spec("ceiling", N, NONE, 1, Some(1), false);
        const CONCAT: FunctionSpec = spec("concat", S, NONE, 2, None, false);
        const CONTAINS: FunctionSpec = spec("contains", B, NONE, 2, Some(2), false);
        const COUNT: FunctionSpec = spec("count", N, NONE, 1, Some(1), true);
        const FALSE: FunctionSpec = spec("false", B, NONE, 0, Some(0), false);
        const FLOOR: FunctionSpec = spec("floor", N, NONE, 1, Some(1), false);
        const ID: FunctionSpec = spec("id", NS, NODE_WITH_ARGS, 1, Some(1), false);
        const LANG: FunctionSpec = spec("lang", B, NODE_WITH_ARGS, 1, Some(1), false);
        const LAST: FunctionSpec = spec("last", N, POSITION, 0, Some(0), false);
        const LOCAL_NAME: FunctionSpec = spec("local-name", S, NODE_WITHOUT_ARGS, 0, Some(1), true);
        const NAME: FunctionSpec = spec("name", S, NODE_WITHOUT_ARGS, 0, Some(1), true);
        const NAMESPACE_URI: FunctionSpec =
            spec("namespace-uri", S, NODE_WITHOUT_ARGS, 0, Some(1), true);
        const NORMALIZE_SPACE: FunctionSpec =
            spec("normalize-space", S, NODE_WITHOUT_ARGS, 0, Some(1), false);
        const NOT: FunctionSpec = spec("not", B, NONE, 1, Some(1), false);
        const NUMBER: FunctionSpec = spec("number", N, NODE_WITHOUT_ARGS, 0, Some(1), false);
        const POSITION_FN: FunctionSpec = spec("position", N, POSITION, 0, Some(0), false);
        const ROUND: FunctionSpec = spec("round", N, NONE, 1, Some(1), false);
        const STARTS_WITH: FunctionSpec = spec("starts-with", B, NONE, 2, Some(2), false);
        const STRING: FunctionSpec = spec("string", S, NODE_WITHOUT_ARGS, 0, Some(1), false);
        const STRING_LENGTH: FunctionSpec =
            spec("string-length", N, NODE_WITHOUT_ARGS, 0, Some(1), false);
        const SUBSTRING: FunctionSpec = spec("substring", S, NONE, 2, Some(3), false);
        const SUBSTRING_AFTER: FunctionSpec = spec("substring-after", S, NONE, 2, Some(2), false);
        const SUBSTRING_BEFORE: FunctionSpec =
            spec("substring-before", S, NONE, 2, Some(2), false);
        const SUM: FunctionSpec = spec("sum", N, NONE, 1, Some(1), true);
        const TRANSLATE: FunctionSpec = spec("translate", S, NONE, 3, Some(3), false);
        const TRUE: FunctionSpec = spec("true", B, NONE, 0, Some(0), false);

        match self {
            Function::Boolean => &BOOLEAN,
            Function::Ceiling => &CEILING,
            Function::Concat => &CONCAT,
            Function::Contains => &CONTAINS,
            Function::Count => &COUNT,
            Function::False => &FALSE,
            Function::Floor => &FLOOR,
            Function::Id => &ID,
            Function::Lang => &LANG,
            Function::Last => &LAST,
            Function::LocalName => &LOCAL_NAME,
            Function::Name => &NAME,
            Function::NamespaceUri => &NAMESPACE_URI,
            Function::NormalizeSpace => &NORMALIZE_SPACE,
            Function::Not => &NOT,
            Function::Number => &NUMBER,
            Function::Position => &POSITION_FN,
            Function::Round => &ROUND,
            Function::StartsWith => &STARTS_WITH,
            Function::String => &STRING,
            Function::StringLength => &STRING_LENGTH,
            Function::Substring => &SUBSTRING,
            Function::SubstringAfter => &SUBSTRING_AFTER,
            Function::SubstringBefore => &SUBSTRING_BEFORE,
            Function::Sum => &SUM,
            Function::Translate => &TRANSLATE,
            Function::True => &TRUE,
        }
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Invokes the function. Arity has already been checked when the call was built.
    pub fn call<'a, N: DomNode<'a>>(
        self,
        ctx: &Context<N>,
        args: &[Expression],
    ) -> Result<XPathValue<N>, XPathError> {
        let call = Call {
            function: self,
            ctx,
            args,
        };
        match self {
            Function::Boolean => Ok(XPathValue::Boolean(call.boolean(0)?)),
            Function::Ceiling => Ok(XPathValue::Number(call.number(0)?.ceil())),
            Function::Concat => func_concat(&call),
            Function::Contains => Ok(XPathValue::Boolean(call.string(0)?.contains(&call.string(1)?))),
            Function::Count => Ok(XPathValue::Number(call.node_set(0)?.len() as f64)),
            Function::False => Ok(XPathValue::Boolean(false)),
            Function::Floor => Ok(XPathValue::Number(call.number(0)?.floor())),
            Function::Id => func_id(&call),
            Function::Lang => func_lang(&call),
            Function::Last => Ok(XPathValue::Number(ctx.size() as f64)),
            Function::LocalName => func_local_name(&call),
            Function::Name => func_name(&call),
            Function::NamespaceUri => func_namespace_uri(&call),
            Function::NormalizeSpace => func_normalize_space(&call),
            Function::Not => Ok(XPathValue::Boolean(!call.boolean(0)?)),
            Function::Number => func_number(&call),
            Function::Position => Ok(XPathValue::Number(ctx.position() as f64)),
            Function::Round => Ok(XPathValue::Number(xpath_round(call.number(0)?))),
            Function::StartsWith => {
                Ok(XPathValue::Boolean(call.string(0)?.starts_with(&call.string(1)?)))
            }
            Function::String => Ok(XPathValue::String(call.string_or_context(0)?)),
            Function::StringLength => Ok(XPathValue::Number(
                call.string_or_context(0)?.chars().count() as f64,
            )),
            Function::Substring => func_substring(&call),
            Function::SubstringAfter => func_substring_after(&call),
            Function::SubstringBefore => func_substring_before(&call),
            Function::Sum => func_sum(&call),
            Function::Translate => func_translate(&call),
            Function::True => Ok(XPathValue::Boolean(true)),
        }
    }
}

/// Name lookup for the function library, checked for duplicate names.
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    functions: HashMap<&'static str, Function>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The full XPath 1.0 core library.
    pub fn core() -> Result<Self, XPathError> {
        let mut registry = Self::new();
        for function in Function::ALL {
            registry.register(function)?;
        }
        Ok(registry)
    }

    /// The shared core registry, built on first use.
    pub fn global() -> &'static FunctionRegistry {
        &CORE_FUNCTIONS
    }

    pub fn register(&mut self, function: Function) -> Result<(), XPathError> {
        let name = function.name();
        if self.functions.contains_key(name) {
            return Err(XPathError::DuplicateFunction(name.to_string()));
        }
        self.functions.insert(name, function);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Function> {
        self.functions.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

static CORE_FUNCTIONS: Lazy<FunctionRegistry> = Lazy::new(|| match FunctionRegistry::core() {
    Ok(registry) => registry,
    Err(err) => panic!("core function table is inconsistent: {}", err),
});

/// XPath `round()`: halves go towards positive infinity, and values in
/// `[-0.5, 0)` round to negative zero.
pub fn xpath_round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() || n.fract() == 0.0 {
        return n;
    }
    if (-0.5..0.0).contains(&n) {
        return -0.0;
    }
    (n + 0.5).floor()
}

struct Call<'c, N> {
    function: Function,
    ctx: &'c Context<N>,
    args: &'c [Expression],
}

impl<'a, N: DomNode<'a>> Call<'_, N> {
    fn arg(&self, index: usize) -> Result<&Expression, XPathError> {
        self.args.get(index).ok_or_else(|| {
            XPathError::function(self.function.name(), format!("missing argument {}", index + 1))
        })
    }

    fn value(&self, index: usize) -> Result<XPathValue<N>, XPathError> {
        self.arg(index)?.evaluate(self.ctx)
    }

    fn string(&self, index: usize) -> Result<String, XPathError> {
        self.arg(index)?.as_string(self.ctx)
    }

    fn number(&self, index: usize) -> Result<f64, XPathError> {
        self.arg(index)?.as_number(self.ctx)
    }

    fn boolean(&self, index: usize) -> Result<bool, XPathError> {
        self.arg(index)?.as_bool(self.ctx)
    }

    fn node_set(&self, index: usize) -> Result<NodeSet<N>, XPathError> {
        match self.value(index)? {
            XPathValue::NodeSet(nodes) => Ok(nodes),
            other => Err(XPathError::function(
                self.function.name(),
                format!("argument {} must be a node-set, got {}", index + 1, other.type_name()),
            )),
        }
    }

    fn string_or_context(&self, index: usize) -> Result<String, XPathError> {
        if index < self.args.len() {
            self.string(index)
        } else {
            Ok(self.ctx.node().string_value())
        }
    }

    /// The first node of the optional node-set argument, else the context node.
    fn node_or_context(&self, index: usize) -> Result<Option<N>, XPathError> {
        if index < self.args.len() {
            Ok(self.node_set(index)?.first())
        } else {
            Ok(Some(self.ctx.node()))
        }
    }
}

fn func_concat<'a, N: DomNode<'a>>(call: &Call<N>) -> Result<XPathValue<N>, XPathError> {
    let mut out = String::new();
    for index in 0..call.args.len() {
        out.push_str(&call.string(index)?);
    }
    Ok(XPathValue::String(out))
}

fn func_id<'a, N: DomNode<'a>>(call: &Call<N>) -> Result<XPathValue<N>, XPathError> {
    let ids = match call.value(0)? {
        XPathValue::NodeSet(nodes) => nodes
            .iter()
            .map(|node| node.string_value())
            .collect::<Vec<_>>()
            .join(" "),
        other => other.to_xpath_string(),
    };
    let context = call.ctx.node();
    let found = ids
        .split_whitespace()
        .filter_map(|id| context.element_by_id(id))
        .collect();
    Ok(XPathValue::NodeSet(NodeSet::from_unsorted(found)))
}

/// True if the nearest `xml:lang` on the context node or its ancestors equals
/// the argument or is a subtag of it, ignoring case.
fn func_lang<'a, N: DomNode<'a>>(call: &Call<N>) -> Result<XPathValue<N>, XPathError> {
    let wanted = call.string(0)?.to_lowercase();
    let mut current = Some(call.ctx.node());
    while let Some(node) = current {
        let declared = node.attributes().find(|attr| {
            attr.name()
                .is_some_and(|qname| qname.prefix == Some("xml") && qname.local_part == "lang")
        });
        if let Some(attr) = declared {
            let lang = attr.string_value().to_lowercase();
            let matches = lang == wanted || lang.starts_with(&format!("{}-", wanted));
            return Ok(XPathValue::Boolean(matches));
        }
        current = node.parent();
    }
    Ok(XPathValue::Boolean(false))
}

fn func_local_name<'a, N: DomNode<'a>>(call: &Call<N>) -> Result<XPathValue<N>, XPathError> {
    let name = call
        .node_or_context(0)?
        .and_then(|node| node.name())
        .map(|qname| qname.local_part.to_string())
        .unwrap_or_default();
    Ok(XPathValue::String(name))
}

fn func_name<'a, N: DomNode<'a>>(call: &Call<N>) -> Result<XPathValue<N>, XPathError> {
    let name = call
        .node_or_context(0)?
        .and_then(|node| node.name())
        .map(|qname| qname.to_string())
        .unwrap_or_default();
    Ok(XPathValue::String(name))
}

fn func_namespace_uri<'a, N: DomNode<'a>>(call: &Call<N>) -> Result<XPathValue<N>, XPathError> {
    let uri = call
        .node_or_context(0)?
        .filter(|node| matches!(node.node_type(), NodeType::Element | NodeType::Attribute))
        .and_then(|node| node.namespace_uri())
        .unwrap_or_default();
    Ok(XPathValue::String(uri.to_string()))
}

fn func_normalize_space<'a, N: DomNode<'a>>(call: &Call<N>) -> Result<XPathValue<N>, XPathError> {
    let value = call.string_or_context(0)?;
    let normalized = value
        .split(|c: char| matches!(c, ' ' | '\t' | '\n' | '\r' | '\u{a0}'))
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    Ok(XPathValue::String(normalized))
}

fn func_number<'a, N: DomNode<'a>>(call: &Call<N>) -> Result<XPathValue<N>, XPathError> {
    let n = if call.args.is_empty() {
        string_to_number(&call.ctx.node().string_value())
    } else {
        call.number(0)?
    };
    Ok(XPathValue::Number(n))
}

fn func_substring<'a, N: DomNode<'a>>(call: &Call<N>) -> Result<XPathValue<N>, XPathError> {
    let value = call.string(0)?;
    let first = xpath_round(call.number(1)?);
    let last = if call.args.len() > 2 {
        first + xpath_round(call.number(2)?)
    } else {
        f64::INFINITY
    };
    // Comparisons against NaN are false, so a NaN bound selects nothing.
    let result = value
        .chars()
        .enumerate()
        .filter(|&(i, _)| {
            let position = (i + 1) as f64;
            position >= first && position < last
        })
        .map(|(_, c)| c)
        .collect();
    Ok(XPathValue::String(result))
}

fn func_substring_after<'a, N: DomNode<'a>>(call: &Call<N>) -> Result<XPathValue<N>, XPathError> {
    let value = call.string(0)?;
    let pattern = call.string(1)?;
    let result = match value.find(&pattern) {
        Some(index) => value[index + pattern.len()..].to_string(),
        None => String::new(),
    };
    Ok(XPathValue::String(result))
}

fn func_substring_before<'a, N: DomNode<'a>>(call: &Call<N>) -> Result<XPathValue<N>, XPathError> {
    let value = call.string(0)?;
    let pattern = call.string(1)?;
    let result = match value.find(&pattern) {
        Some(index) => value[..index].to_string(),
        None => String::new(),
    };
    Ok(XPathValue::String(result))
}

/// Sums string-values as numbers; any non-numeric value makes the sum NaN.
fn func_sum<'a, N: DomNode<'a>>(call: &Call<N>) -> Result<XPathValue<N>, XPathError> {
    let total = call
        .node_set(0)?
        .iter()
        .map(|node| string_to_number(&node.string_value()))
        .sum();
    Ok(XPathValue::Number(total))
}

fn func_translate<'a, N: DomNode<'a>>(call: &Call<N>) -> Result<XPathValue<N>, XPathError> {
    let value = call.string(0)?;
    let from: Vec<char> = call.string(1)?.chars().collect();
    let to: Vec<char> = call.string(2)?.chars().collect();
    let result = value
        .chars()
        .filter_map(|c| match from.iter().position(|&f| f == c) {
            Some(index) => to.get(index).copied(),
            None => Some(c),
        })
        .collect();
    Ok(XPathValue::String(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::mock::{MockNode, create_test_tree};
    use crate::namespace::NullResolver;
    use crate::parser::parse_expression;

    fn eval<'t>(expr: &str, node: MockNode<'t>) -> XPathValue<MockNode<'t>> {
        parse_expression(expr, &NullResolver)
            .unwrap()
            .evaluate(&Context::new(node))
            .unwrap()
    }

    fn eval_str(expr: &str) -> String {
        let tree = create_test_tree();
        eval(expr, tree.root()).to_xpath_string()
    }

    fn eval_num(expr: &str) -> f64 {
        let tree = create_test_tree();
        eval(expr, tree.root()).to_number()
    }

    #[test]
    fn registry_holds_27_functions_and_rejects_duplicates() {
        let mut registry = FunctionRegistry::core().unwrap();
        assert_eq!(registry.len(), 27);
        assert_eq!(
            registry.register(Function::Concat),
            Err(XPathError::DuplicateFunction("concat".into()))
        );
        assert_eq!(FunctionRegistry::global().get("string-length"), Some(Function::StringLength));
        assert_eq!(FunctionRegistry::global().get("matches"), None);
    }

    #[test]
    fn string_functions() {
        assert_eq!(eval_str("concat('a', 'b', 1)"), "ab1");
        assert_eq!(eval_str("substring('12345', 1.5, 2.6)"), "234");
        assert_eq!(eval_str("substring('12345', 0, 3)"), "12");
        assert_eq!(eval_str("substring('12345', 0 div 0, 3)"), "");
        assert_eq!(eval_str("substring('12345', 1, 0 div 0)"), "");
        assert_eq!(eval_str("substring('12345', -42, 1 div 0)"), "12345");
        assert_eq!(eval_str("substring('12345', -1 div 0, 1 div 0)"), "");
        assert_eq!(eval_str("substring-before('1999/04/01', '/')"), "1999");
        assert_eq!(eval_str("substring-after('1999/04/01', '/')"), "04/01");
        assert_eq!(eval_str("substring-after('abc', '')"), "abc");
        assert_eq!(eval_str("translate('bar', 'abc', 'ABC')"), "BAr");
        assert_eq!(eval_str("translate('--aaa--', 'abc-', 'ABC')"), "AAA");
        assert_eq!(eval_str("normalize-space('  a \t b\u{a0} c ')"), "a b c");
        assert_eq!(eval_num("string-length('héllo')"), 5.0);
    }

    #[test]
    fn numeric_functions() {
        assert_eq!(eval_num("round(2.5)"), 3.0);
        assert_eq!(eval_num("round(-2.5)"), -2.0);
        assert!(eval_num("round(-0.2)").is_sign_negative());
        assert_eq!(eval_num("floor(-1.5)"), -2.0);
        assert_eq!(eval_num("ceiling(1.1)"), 2.0);
        assert_eq!(eval_num("sum(//item)"), 6.0);
        assert!(eval_num("sum(//para)").is_nan());
        assert_eq!(eval_num("count(//para)"), 2.0);
        assert!(eval_num("number('abc')").is_nan());
        assert_eq!(eval_num("number(' 12.5 ')"), 12.5);
    }

    #[test]
    fn round_keeps_large_integers_exact() {
        assert_eq!(xpath_round(4503599627370497.0), 4503599627370497.0);
        assert_eq!(xpath_round(-4503599627370497.0), -4503599627370497.0);
        assert_eq!(xpath_round(9007199254740994.0), 9007199254740994.0);
        assert_eq!(xpath_round(4503599627370495.5), 4503599627370496.0);
        assert_eq!(eval_str("round(4503599627370497)"), "4503599627370497");
        assert!(xpath_round(-0.0).is_sign_negative());
    }

    #[test]
    fn node_functions() {
        let tree = create_test_tree();
        let para = tree.find_element("para", 0).unwrap();
        assert_eq!(eval("local-name()", para).to_xpath_string(), "para");
        assert_eq!(eval("name(@*[2])", para).to_xpath_string(), "xml:lang");
        assert_eq!(eval("local-name(@*[2])", para).to_xpath_string(), "lang");
        assert_eq!(
            eval("namespace-uri(@*[2])", para).to_xpath_string(),
            crate::dom::XML_NAMESPACE
        );
        assert_eq!(eval("name(nothing)", para).to_xpath_string(), "");
        assert_eq!(eval("string()", para).to_xpath_string(), "Hello");
    }

    #[test]
    fn lang_uses_nearest_declaration() {
        let tree = create_test_tree();
        let para = tree.find_element("para", 0).unwrap();
        let text = para.children().next().unwrap();
        assert!(eval("lang('en')", text).to_bool());
        assert!(eval("lang('EN')", para).to_bool());
        assert!(!eval("lang('fr')", para).to_bool());
        let other = tree.find_element("para", 1).unwrap();
        assert!(!eval("lang('en')", other).to_bool());
    }

    #[test]
    fn id_accepts_strings_and_node_sets() {
        let tree = create_test_tree();
        let ids = eval("id('i1 p1 nope')", tree.root());
        let XPathValue::NodeSet(nodes) = ids else {
            panic!("expected node-set");
        };
        let names: Vec<String> = nodes.iter().map(|n| n.name().unwrap().local_part.to_string()).collect();
        assert_eq!(names, vec!["para", "item"]);
        assert_eq!(eval("count(id(//para/@id))", tree.root()).to_number(), 1.0);
    }

    #[test]
    fn arity_errors_are_reported_at_compile_time() {
        let err = parse_expression("substring('a')", &NullResolver).unwrap_err();
        assert!(matches!(err, XPathError::FunctionError { ref function, .. } if function == "substring"));
        let err = parse_expression("count('a')", &NullResolver).unwrap_err();
        assert!(matches!(err, XPathError::FunctionError { .. }));
    }
}
