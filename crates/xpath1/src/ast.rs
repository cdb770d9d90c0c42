//! The compiled expression tree.
//!
//! Every [`Expression`] carries static facts computed once at construction:
//! its result [`DataType`], whether it reads the context position or size,
//! whether it reads the context node, and an optional [`QuickAttr`] probe that
//! lets a step filter candidates by attribute before running predicates.
use crate::axes::Axis;
use crate::dom::{DomNode, NodeType, XHTML_NAMESPACE, names_match};
use crate::engine::number_to_string;
use crate::error::XPathError;
use crate::functions::Function;
use itertools::Itertools;
use std::fmt;

/// The static result type of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Void,
    Number,
    Boolean,
    String,
    NodeSet,
}

/// A binary operator, other than union which has its own node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Or,
    And,
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOperator {
    pub const ALL: [BinaryOperator; 13] = [
        BinaryOperator::Or,
        BinaryOperator::And,
        BinaryOperator::Equals,
        BinaryOperator::NotEquals,
        BinaryOperator::LessThan,
        BinaryOperator::LessThanOrEqual,
        BinaryOperator::GreaterThan,
        BinaryOperator::GreaterThanOrEqual,
        BinaryOperator::Plus,
        BinaryOperator::Minus,
        BinaryOperator::Multiply,
        BinaryOperator::Divide,
        BinaryOperator::Modulo,
    ];

    /// Looks up an operator by its token. Only meaningful in operator position.
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "or" => BinaryOperator::Or,
            "and" => BinaryOperator::And,
            "=" => BinaryOperator::Equals,
            "!=" => BinaryOperator::NotEquals,
            "<" => BinaryOperator::LessThan,
            "<=" => BinaryOperator::LessThanOrEqual,
            ">" => BinaryOperator::GreaterThan,
            ">=" => BinaryOperator::GreaterThanOrEqual,
            "+" => BinaryOperator::Plus,
            "-" => BinaryOperator::Minus,
            "*" => BinaryOperator::Multiply,
            "div" => BinaryOperator::Divide,
            "mod" => BinaryOperator::Modulo,
            _ => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Or => "or",
            BinaryOperator::And => "and",
            BinaryOperator::Equals => "=",
            BinaryOperator::NotEquals => "!=",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanOrEqual => ">=",
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "div",
            BinaryOperator::Modulo => "mod",
        }
    }

    /// Binding strength; higher binds tighter. All operators are left-associative.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOperator::Or => 1,
            BinaryOperator::And => 2,
            BinaryOperator::Equals | BinaryOperator::NotEquals => 3,
            BinaryOperator::LessThan
            | BinaryOperator::LessThanOrEqual
            | BinaryOperator::GreaterThan
            | BinaryOperator::GreaterThanOrEqual => 4,
            BinaryOperator::Plus | BinaryOperator::Minus => 5,
            BinaryOperator::Multiply | BinaryOperator::Divide | BinaryOperator::Modulo => 6,
        }
    }

    pub fn data_type(self) -> DataType {
        match self {
            BinaryOperator::Plus
            | BinaryOperator::Minus
            | BinaryOperator::Multiply
            | BinaryOperator::Divide
            | BinaryOperator::Modulo => DataType::Number,
            _ => DataType::Boolean,
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Attribute pre-filter derived from `[@name]` or `[@name = value]` predicates.
#[derive(Debug, Clone, PartialEq)]
pub struct QuickAttr {
    pub name: String,
    /// Context-free string expression the attribute must equal.
    pub value: Option<Box<Expression>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(String),
    Number(f64),
    Binary {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Negate(Box<Expression>),
    /// A primary expression filtered by predicates, e.g. `(//a)[1]`.
    Filter {
        primary: Box<Expression>,
        predicates: Predicates,
    },
    /// A location path applied to the node-set produced by `start`.
    Path {
        start: Box<Expression>,
        steps: Vec<Step>,
    },
    Union(Vec<Expression>),
    FunctionCall {
        function: Function,
        args: Vec<Expression>,
    },
    /// The root of the context node's document.
    Root,
    ContextNode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    kind: ExprKind,
    data_type: DataType,
    needs_context_position: bool,
    needs_context_node: bool,
    quick_attr: Option<QuickAttr>,
}

impl Expression {
    fn build(kind: ExprKind, data_type: DataType, position: bool, node: bool) -> Self {
        Expression {
            kind,
            data_type,
            needs_context_position: position,
            needs_context_node: node,
            quick_attr: None,
        }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self::build(ExprKind::Literal(value.into()), DataType::String, false, false)
    }

    pub fn number(value: f64) -> Self {
        Self::build(ExprKind::Number(value), DataType::Number, false, false)
    }

    pub fn binary(op: BinaryOperator, left: Expression, right: Expression) -> Self {
        let position = left.needs_context_position || right.needs_context_position;
        let node = left.needs_context_node || right.needs_context_node;
        let quick_attr = if op == BinaryOperator::Equals {
            Self::equality_probe(&left, &right).or_else(|| Self::equality_probe(&right, &left))
        } else {
            None
        };
        let mut expr = Self::build(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            op.data_type(),
            position,
            node,
        );
        expr.quick_attr = quick_attr;
        expr
    }

    /// `@name = value` where `value` is a string that does not depend on the context.
    fn equality_probe(attr: &Expression, value: &Expression) -> Option<QuickAttr> {
        let name = attr.quick_attr.as_ref().filter(|qa| qa.value.is_none())?.name.clone();
        let context_free = value.data_type == DataType::String
            && !value.needs_context_position
            && !value.needs_context_node;
        context_free.then(|| QuickAttr {
            name,
            value: Some(Box::new(value.clone())),
        })
    }

    pub fn negate(operand: Expression) -> Self {
        let (position, node) = (operand.needs_context_position, operand.needs_context_node);
        Self::build(ExprKind::Negate(Box::new(operand)), DataType::Number, position, node)
    }

    /// A filter's flags come from its primary; predicates get their own context.
    pub fn filter(primary: Expression, predicates: Predicates) -> Self {
        let (position, node) = (primary.needs_context_position, primary.needs_context_node);
        Self::build(
            ExprKind::Filter {
                primary: Box::new(primary),
                predicates,
            },
            DataType::NodeSet,
            position,
            node,
        )
    }

    pub fn path(start: Expression, steps: Vec<Step>) -> Self {
        let (position, node) = (start.needs_context_position, start.needs_context_node);
        let quick_attr = match (&start.kind, steps.as_slice()) {
            (ExprKind::ContextNode, [step]) if step.predicates.is_empty() && !step.descendants => {
                step.attribute_name().map(|name| QuickAttr {
                    name: name.to_string(),
                    value: None,
                })
            }
            _ => None,
        };
        let mut expr = Self::build(
            ExprKind::Path {
                start: Box::new(start),
                steps,
            },
            DataType::NodeSet,
            position,
            node,
        );
        expr.quick_attr = quick_attr;
        expr
    }

    pub fn union(paths: Vec<Expression>) -> Self {
        let position = paths.iter().any(|p| p.needs_context_position);
        let node = paths.iter().any(|p| p.needs_context_node);
        Self::build(ExprKind::Union(paths), DataType::NodeSet, position, node)
    }

    /// Builds a call after checking arity and node-set argument requirements.
    pub fn function_call(function: Function, args: Vec<Expression>) -> Result<Self, XPathError> {
        let spec = function.spec();
        if args.len() < spec.min_args {
            return Err(XPathError::function(
                spec.name,
                format!("expected at least {} argument(s), got {}", spec.min_args, args.len()),
            ));
        }
        if let Some(max) = spec.max_args
            && args.len() > max
        {
            return Err(XPathError::function(
                spec.name,
                format!("expected at most {} argument(s), got {}", max, args.len()),
            ));
        }
        if spec.nodesets_required
            && let Some(arg) = args.iter().find(|arg| arg.data_type != DataType::NodeSet)
        {
            return Err(XPathError::function(
                spec.name,
                format!("argument must be a node-set, got {}", arg),
            ));
        }
        let args_position = args.iter().any(|a| a.needs_context_position);
        let args_node = args.iter().any(|a| a.needs_context_node);
        let position = spec.needs_context_position || args_position;
        let node = (spec.needs_context_node_without_args && args.is_empty())
            || (spec.needs_context_node_with_args && !args.is_empty())
            || args_node;
        Ok(Self::build(
            ExprKind::FunctionCall { function, args },
            spec.return_type,
            position,
            node,
        ))
    }

    pub fn root() -> Self {
        Self::build(ExprKind::Root, DataType::NodeSet, false, true)
    }

    pub fn context_node() -> Self {
        Self::build(ExprKind::ContextNode, DataType::NodeSet, false, true)
    }

    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn needs_context_position(&self) -> bool {
        self.needs_context_position
    }

    pub fn needs_context_node(&self) -> bool {
        self.needs_context_node
    }

    pub fn quick_attr(&self) -> Option<&QuickAttr> {
        self.quick_attr.as_ref()
    }
}

/// An ordered list of predicate expressions attached to a step or filter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Predicates {
    list: Vec<Expression>,
    reverse: bool,
}

impl Predicates {
    /// `reverse` makes proximity positions count from the end of the node-set.
    pub fn new(list: Vec<Expression>, reverse: bool) -> Self {
        Predicates { list, reverse }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn first(&self) -> Option<&Expression> {
        self.list.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Expression> {
        self.list.iter()
    }

    pub fn is_reverse(&self) -> bool {
        self.reverse
    }

    /// A numeric predicate is an implicit `position() = n`.
    pub fn needs_context_position(&self) -> bool {
        self.list
            .iter()
            .any(|p| p.data_type == DataType::Number || p.needs_context_position)
    }
}

/// One location step: an axis, a node test, predicates, and whether it was
/// introduced by `//`.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Predicates,
    descendants: bool,
    quick_attr: Option<QuickAttr>,
}

impl Step {
    pub fn new(axis: Axis, test: NodeTest, predicates: Vec<Expression>, descendants: bool) -> Self {
        let predicates = Predicates::new(predicates, axis.is_reverse());
        let quick_attr = if axis.supports_quick_attr() {
            predicates.first().and_then(|p| p.quick_attr.clone())
        } else {
            None
        };
        Step {
            axis,
            test,
            predicates,
            descendants,
            quick_attr,
        }
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn test(&self) -> &NodeTest {
        &self.test
    }

    pub fn predicates(&self) -> &Predicates {
        &self.predicates
    }

    pub fn descendants(&self) -> bool {
        self.descendants
    }

    /// Set when the first predicate was turned into an attribute probe.
    pub fn quick_attr(&self) -> Option<&QuickAttr> {
        self.quick_attr.as_ref()
    }

    pub fn needs_context_position(&self) -> bool {
        self.predicates.needs_context_position()
    }

    /// The local name of a plain `attribute::name` step.
    fn attribute_name(&self) -> Option<&str> {
        match &self.test {
            NodeTest::Name(test) if self.axis == Axis::Attribute && test.is_plain() => {
                Some(&test.local)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descendants {
            f.write_str("descendant-or-self::node()/")?;
        }
        write!(f, "{}::{}", self.axis, self.test)?;
        for predicate in self.predicates.iter() {
            write!(f, "[{}]", predicate)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceMatch {
    Any,
    Uri(String),
}

/// A name test. The local name is stored lowercased; `*` matches any name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameTest {
    local: String,
    namespace: NamespaceMatch,
    prefix: Option<String>,
}

impl NameTest {
    /// An unprefixed test. A bare `*` matches every namespace; other names
    /// match the XHTML namespace.
    pub fn new(local: &str) -> Self {
        let namespace = if local == "*" {
            NamespaceMatch::Any
        } else {
            NamespaceMatch::Uri(XHTML_NAMESPACE.to_string())
        };
        NameTest {
            local: local.to_lowercase(),
            namespace,
            prefix: None,
        }
    }

    pub fn with_namespace(prefix: &str, local: &str, namespace: NamespaceMatch) -> Self {
        NameTest {
            local: local.to_lowercase(),
            namespace,
            prefix: Some(prefix.to_string()),
        }
    }

    pub fn local(&self) -> &str {
        &self.local
    }

    pub fn namespace(&self) -> &NamespaceMatch {
        &self.namespace
    }

    fn is_plain(&self) -> bool {
        self.prefix.is_none() && self.local != "*"
    }

    fn matches<'a, N: DomNode<'a>>(&self, node: N) -> bool {
        let Some(qname) = node.name() else {
            return false;
        };
        if self.local != "*" && !names_match(qname.local_part, &self.local) {
            return false;
        }
        match &self.namespace {
            NamespaceMatch::Any => true,
            NamespaceMatch::Uri(uri) => names_match(node.namespace_uri().unwrap_or(XHTML_NAMESPACE), uri),
        }
    }
}

impl fmt::Display for NameTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}:{}", prefix, self.local),
            None => f.write_str(&self.local),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KindTest {
    Comment,
    Text,
    ProcessingInstruction(Option<String>),
    Node,
}

impl KindTest {
    pub fn is_valid_type(name: &str) -> bool {
        matches!(name, "comment" | "text" | "processing-instruction" | "node")
    }

    /// `target` is only accepted for `processing-instruction`.
    pub fn new(name: &str, target: Option<String>) -> Result<Self, XPathError> {
        match (name, target) {
            ("comment", None) => Ok(KindTest::Comment),
            ("text", None) => Ok(KindTest::Text),
            ("node", None) => Ok(KindTest::Node),
            ("processing-instruction", target) => Ok(KindTest::ProcessingInstruction(target)),
            (name, Some(_)) if Self::is_valid_type(name) => Err(XPathError::parse(format!(
                "Node type {}() does not take an argument",
                name
            ))),
            (name, _) => Err(XPathError::InvalidNodeType(name.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            KindTest::Comment => "comment",
            KindTest::Text => "text",
            KindTest::ProcessingInstruction(_) => "processing-instruction",
            KindTest::Node => "node",
        }
    }

    fn matches<'a, N: DomNode<'a>>(&self, node: N) -> bool {
        match self {
            KindTest::Comment => node.node_type() == NodeType::Comment,
            KindTest::Text => node.node_type() == NodeType::Text,
            KindTest::ProcessingInstruction(target) => {
                node.node_type() == NodeType::ProcessingInstruction
                    && target.as_deref().is_none_or(|target| {
                        node.name().is_some_and(|qname| qname.local_part == target)
                    })
            }
            KindTest::Node => true,
        }
    }
}

impl fmt::Display for KindTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KindTest::ProcessingInstruction(Some(target)) => {
                write!(f, "processing-instruction('{}')", target)
            }
            other => write!(f, "{}()", other.name()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    Name(NameTest),
    Kind(KindTest),
}

impl NodeTest {
    /// Name tests only select nodes of the axis's principal node type.
    pub fn matches<'a, N: DomNode<'a>>(&self, node: N, principal: NodeType) -> bool {
        match self {
            NodeTest::Name(test) => node.node_type() == principal && test.matches(node),
            NodeTest::Kind(test) => test.matches(node),
        }
    }
}

impl fmt::Display for NodeTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeTest::Name(test) => test.fmt(f),
            NodeTest::Kind(test) => test.fmt(f),
        }
    }
}

fn quote(value: &str) -> String {
    if value.contains('"') {
        format!("'{}'", value)
    } else {
        format!("\"{}\"", value)
    }
}

/// Writes the operand of a filter or path, parenthesised unless it already
/// reads as a single primary.
fn write_primary(f: &mut fmt::Formatter<'_>, expr: &Expression) -> fmt::Result {
    match expr.kind {
        ExprKind::Literal(_)
        | ExprKind::Number(_)
        | ExprKind::FunctionCall { .. }
        | ExprKind::Binary { .. }
        | ExprKind::Filter { .. } => write!(f, "{}", expr),
        _ => write!(f, "({})", expr),
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Literal(value) => f.write_str(&quote(value)),
            ExprKind::Number(value) => f.write_str(&number_to_string(*value)),
            ExprKind::Binary { op, left, right } => write!(f, "({} {} {})", left, op, right),
            ExprKind::Negate(operand) => write!(f, "-{}", operand),
            ExprKind::Filter { primary, predicates } => {
                write_primary(f, primary)?;
                for predicate in predicates.iter() {
                    write!(f, "[{}]", predicate)?;
                }
                Ok(())
            }
            ExprKind::Path { start, steps } => match start.kind {
                ExprKind::Root => write!(f, "/{}", steps.iter().join("/")),
                ExprKind::ContextNode => write!(f, "{}", steps.iter().join("/")),
                _ => {
                    write_primary(f, start)?;
                    write!(f, "/{}", steps.iter().join("/"))
                }
            },
            ExprKind::Union(paths) => write!(f, "{}", paths.iter().join(" | ")),
            ExprKind::FunctionCall { function, args } => {
                write!(f, "{}({})", function.name(), args.iter().join(", "))
            }
            ExprKind::Root => f.write_str("/"),
            ExprKind::ContextNode => f.write_str("self::node()"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr_path(name: &str) -> Expression {
        let step = Step::new(Axis::Attribute, NodeTest::Name(NameTest::new(name)), vec![], false);
        Expression::path(Expression::context_node(), vec![step])
    }

    #[test]
    fn operator_tokens_are_unique() {
        let symbols: Vec<&str> = BinaryOperator::ALL.iter().map(|op| op.symbol()).collect();
        assert_eq!(symbols.iter().unique().count(), symbols.len());
        for op in BinaryOperator::ALL {
            assert_eq!(BinaryOperator::from_token(op.symbol()), Some(op));
        }
        assert!(BinaryOperator::Multiply.precedence() > BinaryOperator::Plus.precedence());
        assert!(BinaryOperator::And.precedence() > BinaryOperator::Or.precedence());
    }

    #[test]
    fn attribute_path_gets_probe() {
        let expr = attr_path("ID");
        let qa = expr.quick_attr().unwrap();
        assert_eq!(qa.name, "id");
        assert!(qa.value.is_none());
        assert!(expr.needs_context_node());
    }

    #[test]
    fn equality_with_literal_gets_valued_probe_from_either_side() {
        let expr = Expression::binary(BinaryOperator::Equals, Expression::literal("x"), attr_path("id"));
        let qa = expr.quick_attr().unwrap();
        assert_eq!(qa.name, "id");
        assert_eq!(qa.value.as_deref(), Some(&Expression::literal("x")));

        let numeric = Expression::binary(BinaryOperator::Equals, attr_path("id"), Expression::number(1.0));
        assert!(numeric.quick_attr().is_none());
        let unequal = Expression::binary(BinaryOperator::NotEquals, attr_path("id"), Expression::literal("x"));
        assert!(unequal.quick_attr().is_none());
    }

    #[test]
    fn step_adopts_probe_only_on_forward_element_axes() {
        let child = Step::new(
            Axis::Child,
            NodeTest::Name(NameTest::new("div")),
            vec![attr_path("class")],
            false,
        );
        assert_eq!(child.quick_attr().map(|qa| qa.name.as_str()), Some("class"));

        let parent = Step::new(
            Axis::Parent,
            NodeTest::Name(NameTest::new("div")),
            vec![attr_path("class")],
            false,
        );
        assert!(parent.quick_attr().is_none());
    }

    #[test]
    fn numeric_predicate_needs_position() {
        let step = Step::new(Axis::Child, NodeTest::Kind(KindTest::Node), vec![Expression::number(2.0)], false);
        assert!(step.needs_context_position());
        let plain = Step::new(Axis::Child, NodeTest::Kind(KindTest::Node), vec![attr_path("a")], false);
        assert!(!plain.needs_context_position());
    }

    #[test]
    fn function_flags_follow_arguments() {
        let position = Expression::function_call(Function::Position, vec![]).unwrap();
        assert!(position.needs_context_position());
        assert_eq!(position.data_type(), DataType::Number);

        let string_of_ctx = Expression::function_call(Function::String, vec![]).unwrap();
        assert!(string_of_ctx.needs_context_node());
        let string_of_lit = Expression::function_call(Function::String, vec![Expression::literal("a")]).unwrap();
        assert!(!string_of_lit.needs_context_node());

        let err = Expression::function_call(Function::Count, vec![Expression::literal("a")]).unwrap_err();
        assert!(matches!(err, XPathError::FunctionError { .. }));
        let err = Expression::function_call(Function::True, vec![Expression::number(1.0)]).unwrap_err();
        assert!(matches!(err, XPathError::FunctionError { .. }));
    }

    #[test]
    fn kind_tests_validate_names() {
        assert_eq!(KindTest::new("text", None), Ok(KindTest::Text));
        assert_eq!(
            KindTest::new("processing-instruction", Some("php".into())),
            Ok(KindTest::ProcessingInstruction(Some("php".into())))
        );
        assert_eq!(KindTest::new("element", None), Err(XPathError::InvalidNodeType("element".into())));
        assert!(KindTest::new("text", Some("x".into())).is_err());
    }
}
