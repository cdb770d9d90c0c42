//! Binary operator semantics: short-circuit logic, arithmetic and the XPath
//! 1.0 comparison rules between node-sets and primitive values.
use crate::ast::{BinaryOperator, Expression};
use crate::context::Context;
use crate::dom::DomNode;
use crate::engine::{XPathValue, string_to_number};
use crate::error::XPathError;

pub fn evaluate<'a, N: DomNode<'a>>(
    op: BinaryOperator,
    left: &Expression,
    right: &Expression,
    ctx: &Context<N>,
) -> Result<XPathValue<N>, XPathError> {
    use BinaryOperator::*;
    let result = match op {
        Or => XPathValue::Boolean(left.as_bool(ctx)? || right.as_bool(ctx)?),
        And => XPathValue::Boolean(left.as_bool(ctx)? && right.as_bool(ctx)?),
        Plus | Minus | Multiply | Divide | Modulo => {
            let (l, r) = (left.as_number(ctx)?, right.as_number(ctx)?);
            XPathValue::Number(match op {
                Plus => l + r,
                Minus => l - r,
                Multiply => l * r,
                Divide => l / r,
                _ => l % r,
            })
        }
        Equals | NotEquals | LessThan | LessThanOrEqual | GreaterThan | GreaterThanOrEqual => {
            XPathValue::Boolean(compare(op, left.evaluate(ctx)?, right.evaluate(ctx)?))
        }
    };
    Ok(result)
}

/// A non-node-set operand of a comparison.
#[derive(Debug, Clone, PartialEq)]
enum Primitive {
    String(String),
    Number(f64),
    Boolean(bool),
}

impl Primitive {
    fn from_value<'a, N: DomNode<'a>>(value: &XPathValue<N>) -> Self {
        match value {
            XPathValue::Number(n) => Primitive::Number(*n),
            XPathValue::Boolean(b) => Primitive::Boolean(*b),
            other => Primitive::String(other.to_xpath_string()),
        }
    }

    /// Converts a node's string-value to the same type as `self`.
    fn like(&self, string_value: String) -> Self {
        match self {
            Primitive::String(_) => Primitive::String(string_value),
            Primitive::Number(_) => Primitive::Number(string_to_number(&string_value)),
            Primitive::Boolean(_) => Primitive::Boolean(!string_value.is_empty()),
        }
    }

    fn number(&self) -> f64 {
        match self {
            Primitive::String(s) => string_to_number(s),
            Primitive::Number(n) => *n,
            Primitive::Boolean(b) => f64::from(u8::from(*b)),
        }
    }

    fn boolean(&self) -> bool {
        match self {
            Primitive::String(s) => !s.is_empty(),
            Primitive::Number(n) => *n != 0.0 && !n.is_nan(),
            Primitive::Boolean(b) => *b,
        }
    }
}

pub(crate) fn compare<'a, N: DomNode<'a>>(
    op: BinaryOperator,
    left: XPathValue<N>,
    right: XPathValue<N>,
) -> bool {
    match (left, right) {
        (XPathValue::NodeSet(left), XPathValue::NodeSet(right)) => {
            let right_values: Vec<Primitive> = right
                .iter()
                .map(|node| Primitive::String(node.string_value()))
                .collect();
            left.iter().any(|node| {
                let value = Primitive::String(node.string_value());
                right_values.iter().any(|other| compare_primitives(op, &value, other))
            })
        }
        (XPathValue::NodeSet(nodes), other) => {
            let other = Primitive::from_value(&other);
            nodes
                .iter()
                .any(|node| compare_primitives(op, &other.like(node.string_value()), &other))
        }
        (other, XPathValue::NodeSet(nodes)) => {
            let other = Primitive::from_value(&other);
            nodes
                .iter()
                .any(|node| compare_primitives(op, &other, &other.like(node.string_value())))
        }
        (left, right) => compare_primitives(op, &Primitive::from_value(&left), &Primitive::from_value(&right)),
    }
}

/// Equality compares as booleans if either side is boolean, else as numbers
/// if either side is a number, else as strings. Relational operators always
/// compare numbers.
fn compare_primitives(op: BinaryOperator, left: &Primitive, right: &Primitive) -> bool {
    use BinaryOperator::*;
    match op {
        Equals | NotEquals => {
            let equal = match (left, right) {
                (Primitive::Boolean(_), _) | (_, Primitive::Boolean(_)) => {
                    left.boolean() == right.boolean()
                }
                (Primitive::Number(_), _) | (_, Primitive::Number(_)) => {
                    left.number() == right.number()
                }
                (Primitive::String(l), Primitive::String(r)) => l == r,
            };
            if op == Equals { equal } else { !equal }
        }
        LessThan => left.number() < right.number(),
        LessThanOrEqual => left.number() <= right.number(),
        GreaterThan => left.number() > right.number(),
        GreaterThanOrEqual => left.number() >= right.number(),
        _ => false,
    }
}
