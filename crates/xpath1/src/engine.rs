//! Evaluates compiled expressions against any [`DomNode`] implementation.
use crate::ast::{DataType, ExprKind, Expression, Predicates, Step};
use crate::axes::{AttrProbe, Axis};
use crate::context::Context;
use crate::dom::DomNode;
use crate::error::XPathError;
use crate::nodeset::NodeSet;
use crate::operators;
use log::trace;
use std::fmt;

/// The four XPath 1.0 value types.
#[derive(Clone)]
pub enum XPathValue<N> {
    NodeSet(NodeSet<N>),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl<'a, N: DomNode<'a>> XPathValue<N> {
    pub fn data_type(&self) -> DataType {
        match self {
            XPathValue::NodeSet(_) => DataType::NodeSet,
            XPathValue::String(_) => DataType::String,
            XPathValue::Number(_) => DataType::Number,
            XPathValue::Boolean(_) => DataType::Boolean,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            XPathValue::NodeSet(_) => "node-set",
            XPathValue::String(_) => "string",
            XPathValue::Number(_) => "number",
            XPathValue::Boolean(_) => "boolean",
        }
    }

    /// Coerces the value to a boolean as per XPath 1.0 rules.
    pub fn to_bool(&self) -> bool {
        match self {
            XPathValue::NodeSet(nodes) => !nodes.is_empty(),
            XPathValue::String(s) => !s.is_empty(),
            XPathValue::Number(n) => *n != 0.0 && !n.is_nan(),
            XPathValue::Boolean(b) => *b,
        }
    }

    /// Coerces the value to a number as per XPath 1.0 rules.
    pub fn to_number(&self) -> f64 {
        match self {
            XPathValue::Number(n) => *n,
            XPathValue::String(s) => string_to_number(s),
            XPathValue::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            XPathValue::NodeSet(_) => string_to_number(&self.to_xpath_string()),
        }
    }

    /// Coerces the value to a string. A node-set yields the string-value of
    /// its first node in document order.
    pub fn to_xpath_string(&self) -> String {
        match self {
            XPathValue::NodeSet(nodes) => nodes.first().map(|n| n.string_value()).unwrap_or_default(),
            XPathValue::String(s) => s.clone(),
            XPathValue::Number(n) => number_to_string(*n),
            XPathValue::Boolean(b) => b.to_string(),
        }
    }

    pub fn into_node_set(self) -> Result<NodeSet<N>, XPathError> {
        match self {
            XPathValue::NodeSet(nodes) => Ok(nodes),
            other => Err(XPathError::TypeError(format!(
                "expected a node-set, got {}",
                other.type_name()
            ))),
        }
    }
}

impl<'a, N: DomNode<'a>> fmt::Display for XPathValue<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_xpath_string())
    }
}

impl<N: Copy + Ord + fmt::Debug> fmt::Debug for XPathValue<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XPathValue::NodeSet(nodes) => f.debug_tuple("NodeSet").field(nodes).finish(),
            XPathValue::String(s) => f.debug_tuple("String").field(s).finish(),
            XPathValue::Number(n) => f.debug_tuple("Number").field(n).finish(),
            XPathValue::Boolean(b) => f.debug_tuple("Boolean").field(b).finish(),
        }
    }
}

impl<N: Copy + Ord> PartialEq for XPathValue<N> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (XPathValue::NodeSet(a), XPathValue::NodeSet(b)) => a == b,
            (XPathValue::String(a), XPathValue::String(b)) => a == b,
            (XPathValue::Number(a), XPathValue::Number(b)) => a == b,
            (XPathValue::Boolean(a), XPathValue::Boolean(b)) => a == b,
            _ => false,
        }
    }
}

/// XPath `number()` applied to a string: optional surrounding whitespace, an
/// optional minus sign and a plain decimal. Anything else, including the empty
/// string, is NaN.
pub fn string_to_number(value: &str) -> f64 {
    let trimmed = value.trim_matches(|c| matches!(c, ' ' | '\t' | '\n' | '\r'));
    let unsigned = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let well_formed = unsigned.chars().any(|c| c.is_ascii_digit())
        && unsigned.chars().all(|c| c.is_ascii_digit() || c == '.')
        && unsigned.matches('.').count() <= 1;
    if !well_formed {
        return f64::NAN;
    }
    trimmed.parse().unwrap_or(f64::NAN)
}

/// XPath `string()` applied to a number. Integers print without a decimal
/// point, and no exponent notation is ever produced.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        format!("{}", n)
    }
}

/// Evaluates a compiled expression against `ctx`.
pub fn evaluate<'a, N: DomNode<'a>>(
    expr: &Expression,
    ctx: &Context<N>,
) -> Result<XPathValue<N>, XPathError> {
    expr.evaluate(ctx)
}

impl Expression {
    pub fn evaluate<'a, N: DomNode<'a>>(
        &self,
        ctx: &Context<N>,
    ) -> Result<XPathValue<N>, XPathError> {
        match self.kind() {
            ExprKind::Literal(s) => Ok(XPathValue::String(s.clone())),
            ExprKind::Number(n) => Ok(XPathValue::Number(*n)),
            ExprKind::Binary { op, left, right } => operators::evaluate(*op, left, right, ctx),
            ExprKind::Negate(operand) => Ok(XPathValue::Number(-operand.as_number(ctx)?)),
            ExprKind::Filter {
                primary,
                predicates,
            } => {
                let nodes = match primary.evaluate(ctx)? {
                    XPathValue::NodeSet(nodes) => nodes,
                    other => {
                        return Err(XPathError::TypeError(format!(
                            "predicates can only filter a node-set, got {}",
                            other.type_name()
                        )));
                    }
                };
                predicates.apply(nodes, 0).map(XPathValue::NodeSet)
            }
            ExprKind::Path { start, steps } => evaluate_path(start, steps, ctx).map(XPathValue::NodeSet),
            ExprKind::Union(paths) => {
                let mut merged = NodeSet::new();
                for path in paths {
                    match path.evaluate(ctx)? {
                        XPathValue::NodeSet(nodes) => merged = NodeSet::merge(merged, nodes),
                        other => {
                            return Err(XPathError::TypeError(format!(
                                "union operands must be node-sets, got {}",
                                other.type_name()
                            )));
                        }
                    }
                }
                Ok(XPathValue::NodeSet(merged))
            }
            ExprKind::FunctionCall { function, args } => function.call(ctx, args),
            ExprKind::Root => Ok(XPathValue::NodeSet(NodeSet::from_node(ctx.node().root()))),
            ExprKind::ContextNode => Ok(XPathValue::NodeSet(NodeSet::from_node(ctx.node()))),
        }
    }

    pub fn as_string<'a, N: DomNode<'a>>(&self, ctx: &Context<N>) -> Result<String, XPathError> {
        Ok(self.evaluate(ctx)?.to_xpath_string())
    }

    pub fn as_number<'a, N: DomNode<'a>>(&self, ctx: &Context<N>) -> Result<f64, XPathError> {
        Ok(self.evaluate(ctx)?.to_number())
    }

    pub fn as_bool<'a, N: DomNode<'a>>(&self, ctx: &Context<N>) -> Result<bool, XPathError> {
        Ok(self.evaluate(ctx)?.to_bool())
    }

    pub fn as_node_set<'a, N: DomNode<'a>>(
        &self,
        ctx: &Context<N>,
    ) -> Result<NodeSet<N>, XPathError> {
        self.evaluate(ctx)?.into_node_set()
    }
}

fn evaluate_path<'a, N: DomNode<'a>>(
    start: &Expression,
    steps: &[Step],
    ctx: &Context<N>,
) -> Result<NodeSet<N>, XPathError> {
    let mut nodes = match start.evaluate(ctx)? {
        XPathValue::NodeSet(nodes) => nodes,
        other => {
            return Err(XPathError::TypeError(format!(
                "a path can only start from a node-set, got {}",
                other.type_name()
            )));
        }
    };
    for step in steps {
        if nodes.is_empty() {
            break;
        }
        nodes = evaluate_step_over(step, nodes)?;
        trace!("step {} selected {} node(s)", step, nodes.len());
    }
    Ok(nodes)
}

/// Applies a step to every node of `nodes` and merges the results.
///
/// When no predicate reads the position, `following` only needs the deepest
/// node of the leading run of nested nodes, and `preceding` only the last node.
/// A `//` step expands every node's subtree first, so it never takes that path.
fn evaluate_step_over<'a, N: DomNode<'a>>(
    step: &Step,
    nodes: NodeSet<N>,
) -> Result<NodeSet<N>, XPathError> {
    if !step.needs_context_position() && !step.descendants() {
        match step.axis() {
            Axis::Following => {
                let mut iter = nodes.iter();
                if let Some(mut anchor) = iter.next() {
                    for next in iter {
                        if !anchor.is_ancestor_of(next) {
                            break;
                        }
                        anchor = next;
                    }
                    return step.evaluate(&Context::new(anchor));
                }
                return Ok(NodeSet::new());
            }
            Axis::Preceding => {
                return match nodes.last() {
                    Some(last) => step.evaluate(&Context::new(last)),
                    None => Ok(NodeSet::new()),
                };
            }
            _ => {}
        }
    }
    evaluate_step_per_node(step, &nodes)
}

pub(crate) fn evaluate_step_per_node<'a, N: DomNode<'a>>(
    step: &Step,
    nodes: &NodeSet<N>,
) -> Result<NodeSet<N>, XPathError> {
    let mut result = NodeSet::new();
    for node in nodes {
        result = NodeSet::merge(result, step.evaluate(&Context::new(node))?);
    }
    Ok(result)
}

impl Step {
    /// Evaluates the step from the context node alone.
    pub fn evaluate<'a, N: DomNode<'a>>(&self, ctx: &Context<N>) -> Result<NodeSet<N>, XPathError> {
        let node = ctx.node();
        let probe_value = match self.quick_attr().and_then(|qa| qa.value.as_deref()) {
            Some(value) => Some(value.as_string(ctx)?),
            None => None,
        };
        let probe = self.quick_attr().map(|qa| AttrProbe {
            name: &qa.name,
            value: probe_value.as_deref(),
        });
        let skip = usize::from(probe.is_some());

        if !self.descendants() {
            let nodes = self.axis().collect(self.test(), node, probe);
            return self.predicates().apply(nodes, skip);
        }
        if self.axis() == Axis::Child && !self.needs_context_position() {
            let nodes = Axis::Descendant.collect(self.test(), node, probe);
            return self.predicates().apply(nodes, skip);
        }
        let mut result = NodeSet::new();
        for origin in std::iter::once(node).chain(node.descendants()) {
            let nodes = self.axis().collect(self.test(), origin, probe);
            result = NodeSet::merge(result, self.predicates().apply(nodes, skip)?);
        }
        Ok(result)
    }
}

impl Predicates {
    /// Filters `nodes` through the predicates from index `start` on. A numeric
    /// result keeps the node whose proximity position equals it; anything else
    /// is converted to a boolean.
    pub fn apply<'a, N: DomNode<'a>>(
        &self,
        mut nodes: NodeSet<N>,
        start: usize,
    ) -> Result<NodeSet<N>, XPathError> {
        for predicate in self.iter().skip(start) {
            if nodes.is_empty() {
                break;
            }
            let size = nodes.len();
            let mut cursor = nodes.cursor(false);
            let mut index = 0;
            while let Some(node) = cursor.next() {
                let position = if self.is_reverse() { size - index } else { index + 1 };
                index += 1;
                let keep = match predicate.evaluate(&Context::with_position(node, position, size))? {
                    XPathValue::Number(n) => n == position as f64,
                    other => other.to_bool(),
                };
                if !keep {
                    cursor.remove_current();
                }
            }
        }
        Ok(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::mock::{MockNode, MockTree, create_test_tree};
    use crate::namespace::NullResolver;
    use crate::parser::parse_expression;

    fn select<'t>(expr: &str, node: MockNode<'t>) -> Vec<MockNode<'t>> {
        parse_expression(expr, &NullResolver)
            .unwrap()
            .as_node_set(&Context::new(node))
            .unwrap()
            .to_vec()
    }

    fn names(nodes: &[MockNode<'_>]) -> Vec<String> {
        nodes
            .iter()
            .map(|n| match n.name() {
                Some(q) => q.to_string(),
                None => n.string_value(),
            })
            .collect()
    }

    #[test]
    fn number_string_round_trip_rules() {
        assert_eq!(number_to_string(3.0), "3");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(0.5), "0.5");
        assert_eq!(number_to_string(1e21), "1000000000000000000000");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
        assert!(string_to_number("").is_nan());
        assert!(string_to_number("1e3").is_nan());
        assert!(string_to_number("- 1").is_nan());
        assert!(string_to_number(".").is_nan());
        assert_eq!(string_to_number(" -.5\n"), -0.5);
        assert_eq!(string_to_number("7."), 7.0);
    }

    #[test]
    fn reverse_axis_positions_count_backwards() {
        let tree = create_test_tree();
        let item = tree.find_element("item", 2).unwrap();
        assert_eq!(names(&select("ancestor::*[1]", item)), vec!["list"]);
        assert_eq!(names(&select("preceding-sibling::*[1]", item)), vec!["item"]);
        assert_eq!(
            select("preceding-sibling::*[1]", item),
            vec![tree.find_element("item", 1).unwrap()]
        );
        assert_eq!(names(&select("ancestor::*[last()]", item)), vec!["root"]);
    }

    #[test]
    fn descendant_shortcut_matches_full_expansion() {
        let tree = create_test_tree();
        let root = tree.root();
        assert_eq!(select("//item", root), select("/descendant-or-self::node()/child::item", root));
        assert_eq!(select("//item[1]", root).len(), 1);
        assert_eq!(select("(//item)[2]", root), vec![tree.find_element("item", 1).unwrap()]);
        assert_eq!(select("//*[@id]", root).len(), 2);
        assert_eq!(select("//item[@id='i1']", root), vec![tree.find_element("item", 0).unwrap()]);
    }

    fn single_step(source: &str) -> Step {
        let expr = parse_expression(source, &NullResolver).unwrap();
        let ExprKind::Path { steps, .. } = expr.kind() else {
            panic!("expected a path: {}", source);
        };
        assert_eq!(steps.len(), 1, "{}", source);
        steps[0].clone()
    }

    #[test]
    fn following_shortcut_equals_per_node_evaluation() {
        let _ = env_logger::builder().is_test(true).try_init();
        let tree = create_test_tree();
        let root = tree.root();
        let contexts = [
            "//node()",
            "//*",
            "//@*",
            "//item | //para",
            "/root/list | //item[1]",
            "//para/text() | //div",
            "//list",
        ];
        let predicates = ["", "[@id]", "[. = '2']", "[not(*)]", "[count(*) > 0]"];
        for context in contexts {
            let context_nodes = parse_expression(context, &NullResolver)
                .unwrap()
                .as_node_set(&Context::new(root))
                .unwrap();
            for axis in ["following", "preceding"] {
                for test in ["node()", "*"] {
                    for predicate in predicates {
                        for prefix in ["", "//"] {
                            let source = format!("{prefix}{axis}::{test}{predicate}");
                            let step = single_step(&source);
                            assert_eq!(step.descendants(), !prefix.is_empty());
                            let fast = evaluate_step_over(&step, context_nodes.clone()).unwrap();
                            let naive = evaluate_step_per_node(&step, &context_nodes).unwrap();
                            assert_eq!(fast, naive, "{} / {}", context, source);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn descendant_following_and_preceding_cover_every_subtree() {
        let mut tree = MockTree::new();
        let r = tree.element(MockTree::ROOT, "r");
        let outer = tree.element(r, "n");
        let inner = tree.element(outer, "n");
        tree.element(outer, "d");
        let root = tree.root();
        assert_eq!(select("//n//preceding::*", root), vec![tree.node(inner)]);
        assert_eq!(
            select("//n//preceding::*", root),
            select("//n/descendant-or-self::node()/preceding::*", root)
        );

        let mut tree = MockTree::new();
        let r = tree.element(MockTree::ROOT, "r");
        let n = tree.element(r, "n");
        tree.element(n, "z");
        let l = tree.element(n, "l");
        let root = tree.root();
        assert_eq!(select("(/r/n | /r/n/l)//following::*", root), vec![tree.node(l)]);
        assert_eq!(
            select("(/r/n | /r/n/l)//following::*", root),
            select("(/r/n | /r/n/l)/descendant-or-self::node()/following::*", root)
        );
    }

    #[test]
    fn predicates_apply_in_sequence() {
        let tree = create_test_tree();
        let list = tree.find_element("list", 0).unwrap();
        assert_eq!(select("item[position() > 1][1]", list), vec![tree.find_element("item", 1).unwrap()]);
        assert_eq!(select("item[. = '3' or . = '1']", list).len(), 2);
        assert!(select("item[4]", list).is_empty());
        assert_eq!(select("item[1.5]", list).len(), 0);
    }

    #[test]
    fn path_from_non_node_set_is_a_type_error() {
        let tree = create_test_tree();
        let expr = parse_expression("string(.)/a", &NullResolver).unwrap();
        let err = expr.evaluate(&Context::new(tree.root())).unwrap_err();
        assert!(matches!(err, XPathError::TypeError(_)));
        let expr = parse_expression("1 | //a", &NullResolver).unwrap();
        assert!(matches!(expr.evaluate(&Context::new(tree.root())), Err(XPathError::TypeError(_))));
    }

    #[test]
    fn root_from_detached_attribute_context() {
        let tree = create_test_tree();
        let para = tree.find_element("para", 0).unwrap();
        let attr = para.attributes().next().unwrap();
        assert_eq!(select("/", attr), vec![tree.root()]);
        assert_eq!(select("..", attr), vec![para]);
        assert_eq!(names(&select("../following-sibling::*[1]", attr)), vec!["div"]);
    }

    #[test]
    fn descendants_with_positional_predicate_run_per_parent() {
        let mut tree = MockTree::new();
        let root = tree.element(MockTree::ROOT, "r");
        for _ in 0..2 {
            let group = tree.element(root, "g");
            tree.element(group, "x");
            tree.element(group, "x");
        }
        assert_eq!(select("//x[1]", tree.root()).len(), 2);
        assert_eq!(select("(//x)[1]", tree.root()).len(), 1);
        assert_eq!(select("//x[last()]", tree.root()).len(), 2);
    }
}
