//! Typed packaging of evaluation results, mirroring the DOM `XPathResult` interface.
use domxpath_xpath1::{DomNode, NodeSet, XPathError, XPathValue};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// The DOM result type constants, `ANY_TYPE` (0) through `FIRST_ORDERED_NODE_TYPE` (9).
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultType {
    Any = 0,
    Number = 1,
    String = 2,
    Boolean = 3,
    UnorderedNodeIterator = 4,
    OrderedNodeIterator = 5,
    UnorderedNodeSnapshot = 6,
    OrderedNodeSnapshot = 7,
    AnyUnorderedNode = 8,
    FirstOrderedNode = 9,
}

impl ResultType {
    pub const ALL: [ResultType; 10] = [
        ResultType::Any,
        ResultType::Number,
        ResultType::String,
        ResultType::Boolean,
        ResultType::UnorderedNodeIterator,
        ResultType::OrderedNodeIterator,
        ResultType::UnorderedNodeSnapshot,
        ResultType::OrderedNodeSnapshot,
        ResultType::AnyUnorderedNode,
        ResultType::FirstOrderedNode,
    ];

    pub fn code(self) -> u16 {
        self as u16
    }

    /// The DOM constant name, e.g. `ORDERED_NODE_SNAPSHOT_TYPE`.
    pub fn dom_name(self) -> &'static str {
        match self {
            ResultType::Any => "ANY_TYPE",
            ResultType::Number => "NUMBER_TYPE",
            ResultType::String => "STRING_TYPE",
            ResultType::Boolean => "BOOLEAN_TYPE",
            ResultType::UnorderedNodeIterator => "UNORDERED_NODE_ITERATOR_TYPE",
            ResultType::OrderedNodeIterator => "ORDERED_NODE_ITERATOR_TYPE",
            ResultType::UnorderedNodeSnapshot => "UNORDERED_NODE_SNAPSHOT_TYPE",
            ResultType::OrderedNodeSnapshot => "ORDERED_NODE_SNAPSHOT_TYPE",
            ResultType::AnyUnorderedNode => "ANY_UNORDERED_NODE_TYPE",
            ResultType::FirstOrderedNode => "FIRST_ORDERED_NODE_TYPE",
        }
    }

    /// The lowercase short name accepted on the command line.
    pub fn short_name(self) -> &'static str {
        match self {
            ResultType::Any => "any",
            ResultType::Number => "number",
            ResultType::String => "string",
            ResultType::Boolean => "boolean",
            ResultType::UnorderedNodeIterator => "unordered-iterator",
            ResultType::OrderedNodeIterator => "ordered-iterator",
            ResultType::UnorderedNodeSnapshot => "unordered-snapshot",
            ResultType::OrderedNodeSnapshot => "ordered-snapshot",
            ResultType::AnyUnorderedNode => "any-node",
            ResultType::FirstOrderedNode => "first-node",
        }
    }

    pub fn is_iterator(self) -> bool {
        matches!(self, ResultType::UnorderedNodeIterator | ResultType::OrderedNodeIterator)
    }

    pub fn is_snapshot(self) -> bool {
        matches!(self, ResultType::UnorderedNodeSnapshot | ResultType::OrderedNodeSnapshot)
    }

    pub fn is_single_node(self) -> bool {
        matches!(self, ResultType::AnyUnorderedNode | ResultType::FirstOrderedNode)
    }

    pub fn is_node_type(self) -> bool {
        self.is_iterator() || self.is_snapshot() || self.is_single_node()
    }
}

impl TryFrom<u16> for ResultType {
    type Error = XPathError;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        ResultType::ALL
            .get(usize::from(code))
            .copied()
            .ok_or_else(|| XPathError::InvalidResultType(code.to_string()))
    }
}

impl FromStr for ResultType {
    type Err = XPathError;

    /// Accepts a DOM constant name, a short name or a numeric code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(code) = s.parse::<u16>() {
            return ResultType::try_from(code);
        }
        ResultType::ALL
            .into_iter()
            .find(|ty| ty.short_name().eq_ignore_ascii_case(s) || ty.dom_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| XPathError::InvalidResultType(s.to_string()))
    }
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dom_name())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Payload<N> {
    Number(f64),
    String(String),
    Boolean(bool),
    Nodes(Vec<N>),
    Single(Option<N>),
}

impl<N> Payload<N> {
    fn kind(&self) -> &'static str {
        match self {
            Payload::Number(_) => "number",
            Payload::String(_) => "string",
            Payload::Boolean(_) => "boolean",
            Payload::Nodes(_) => "node-set",
            Payload::Single(_) => "single node",
        }
    }
}

/// The value of one evaluation, packaged for a requested [`ResultType`].
///
/// Iterator results hold their own copy of the node list, so `iterate_next`
/// never observes later changes to the document.
#[derive(Debug, Clone, PartialEq)]
pub struct XPathResult<N> {
    result_type: ResultType,
    payload: Payload<N>,
    cursor: usize,
}

impl<'a, N: DomNode<'a>> XPathResult<N> {
    /// Converts `value` as the DOM does for `requested`. `Any` picks the
    /// natural type of the value; node result types require a node-set.
    pub fn new(value: XPathValue<N>, requested: ResultType) -> Result<Self, XPathError> {
        let result_type = match (requested, &value) {
            (ResultType::Any, XPathValue::NodeSet(_)) => ResultType::UnorderedNodeIterator,
            (ResultType::Any, XPathValue::String(_)) => ResultType::String,
            (ResultType::Any, XPathValue::Number(_)) => ResultType::Number,
            (ResultType::Any, XPathValue::Boolean(_)) => ResultType::Boolean,
            (requested, _) => requested,
        };
        let payload = match result_type {
            ResultType::Number => Payload::Number(value.to_number()),
            ResultType::String => Payload::String(value.to_xpath_string()),
            ResultType::Boolean => Payload::Boolean(value.to_bool()),
            ty => {
                let nodes = Self::require_nodes(value, ty)?;
                if ty.is_single_node() {
                    Payload::Single(nodes.first())
                } else {
                    Payload::Nodes(nodes.to_vec())
                }
            }
        };
        Ok(XPathResult {
            result_type,
            payload,
            cursor: 0,
        })
    }

    fn require_nodes(value: XPathValue<N>, ty: ResultType) -> Result<NodeSet<N>, XPathError> {
        match value {
            XPathValue::NodeSet(nodes) => Ok(nodes),
            other => Err(XPathError::ResultTypeMismatch {
                requested: ty.dom_name(),
                actual: other.type_name(),
            }),
        }
    }
}

impl<N: Copy> XPathResult<N> {
    pub fn result_type(&self) -> ResultType {
        self.result_type
    }

    fn mismatch(&self, requested: ResultType) -> XPathError {
        XPathError::ResultTypeMismatch {
            requested: requested.dom_name(),
            actual: self.payload.kind(),
        }
    }

    pub fn number_value(&self) -> Result<f64, XPathError> {
        match self.payload {
            Payload::Number(n) => Ok(n),
            _ => Err(self.mismatch(ResultType::Number)),
        }
    }

    pub fn string_value(&self) -> Result<&str, XPathError> {
        match &self.payload {
            Payload::String(s) => Ok(s),
            _ => Err(self.mismatch(ResultType::String)),
        }
    }

    pub fn boolean_value(&self) -> Result<bool, XPathError> {
        match self.payload {
            Payload::Boolean(b) => Ok(b),
            _ => Err(self.mismatch(ResultType::Boolean)),
        }
    }

    pub fn single_node_value(&self) -> Result<Option<N>, XPathError> {
        match self.payload {
            Payload::Single(node) => Ok(node),
            _ => Err(self.mismatch(ResultType::FirstOrderedNode)),
        }
    }

    pub fn snapshot_length(&self) -> Result<usize, XPathError> {
        match &self.payload {
            Payload::Nodes(nodes) if self.result_type.is_snapshot() => Ok(nodes.len()),
            _ => Err(self.mismatch(ResultType::OrderedNodeSnapshot)),
        }
    }

    /// The node at `index`, or `None` past the end of the snapshot.
    pub fn snapshot_item(&self, index: usize) -> Result<Option<N>, XPathError> {
        match &self.payload {
            Payload::Nodes(nodes) if self.result_type.is_snapshot() => Ok(nodes.get(index).copied()),
            _ => Err(self.mismatch(ResultType::OrderedNodeSnapshot)),
        }
    }

    /// Advances the iterator, returning `None` once it is exhausted.
    pub fn iterate_next(&mut self) -> Result<Option<N>, XPathError> {
        let node = match &self.payload {
            Payload::Nodes(nodes) if self.result_type.is_iterator() => nodes.get(self.cursor).copied(),
            _ => return Err(self.mismatch(ResultType::OrderedNodeIterator)),
        };
        if node.is_some() {
            self.cursor += 1;
        }
        Ok(node)
    }

    /// Every node held by a node result, in document order.
    pub fn nodes(&self) -> Vec<N> {
        match &self.payload {
            Payload::Nodes(nodes) => nodes.clone(),
            Payload::Single(node) => node.iter().copied().collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domxpath_xpath1::mock::create_test_tree;

    #[test]
    fn codes_round_trip_and_reject_unknown() {
        for ty in ResultType::ALL {
            assert_eq!(ResultType::try_from(ty.code()), Ok(ty));
        }
        assert_eq!(ResultType::FirstOrderedNode.code(), 9);
        assert_eq!(
            ResultType::try_from(10),
            Err(XPathError::InvalidResultType("10".into()))
        );
    }

    #[test]
    fn parses_names_and_codes() {
        assert_eq!("any".parse::<ResultType>(), Ok(ResultType::Any));
        assert_eq!("ORDERED_NODE_SNAPSHOT_TYPE".parse::<ResultType>(), Ok(ResultType::OrderedNodeSnapshot));
        assert_eq!("9".parse::<ResultType>(), Ok(ResultType::FirstOrderedNode));
        assert!("nodes".parse::<ResultType>().is_err());
    }

    #[test]
    fn any_type_picks_natural_type() {
        let tree = create_test_tree();
        let root = tree.root();
        let result = XPathResult::<domxpath_xpath1::mock::MockNode>::new(XPathValue::Number(2.0), ResultType::Any).unwrap();
        assert_eq!(result.result_type(), ResultType::Number);
        assert_eq!(result.number_value(), Ok(2.0));
        assert!(result.string_value().is_err());

        let nodes = XPathValue::NodeSet(NodeSet::from_node(root));
        let result = XPathResult::new(nodes, ResultType::Any).unwrap();
        assert_eq!(result.result_type(), ResultType::UnorderedNodeIterator);
    }

    #[test]
    fn node_types_require_node_sets() {
        let err = XPathResult::<domxpath_xpath1::mock::MockNode>::new(
            XPathValue::String("x".into()),
            ResultType::FirstOrderedNode,
        )
        .unwrap_err();
        assert_eq!(
            err,
            XPathError::ResultTypeMismatch {
                requested: "FIRST_ORDERED_NODE_TYPE",
                actual: "string",
            }
        );
    }

    #[test]
    fn primitive_types_coerce() {
        let tree = create_test_tree();
        let nodes = XPathValue::NodeSet(NodeSet::from_node(tree.root()));
        let result = XPathResult::new(nodes, ResultType::Boolean).unwrap();
        assert_eq!(result.boolean_value(), Ok(true));
    }

    #[test]
    fn iterator_and_snapshot_accessors_are_exclusive() {
        let tree = create_test_tree();
        let set = NodeSet::from_node(tree.root());
        let mut iter = XPathResult::new(XPathValue::NodeSet(set.clone()), ResultType::OrderedNodeIterator).unwrap();
        assert!(iter.snapshot_length().is_err());
        assert_eq!(iter.iterate_next(), Ok(Some(tree.root())));
        assert_eq!(iter.iterate_next(), Ok(None));

        let snapshot = XPathResult::new(XPathValue::NodeSet(set), ResultType::OrderedNodeSnapshot).unwrap();
        assert_eq!(snapshot.snapshot_length(), Ok(1));
        assert_eq!(snapshot.snapshot_item(5), Ok(None));
        assert!(snapshot.clone().iterate_next().is_err());
    }
}
