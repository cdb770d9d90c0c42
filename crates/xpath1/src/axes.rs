//! The thirteen XPath axes and the functions that collect nodes along them.
//!
//! Every collector produces a document-ordered [`NodeSet`]. Reverse axes walk
//! outwards from the context node and prepend, forward axes append.
use crate::ast::NodeTest;
use crate::dom::{DomNode, NodeType};
use crate::error::XPathError;
use crate::nodeset::NodeSet;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Ancestor,
    AncestorOrSelf,
    Attribute,
    Child,
    Descendant,
    DescendantOrSelf,
    Following,
    FollowingSibling,
    Namespace,
    Parent,
    Preceding,
    PrecedingSibling,
    SelfAxis,
}

impl Axis {
    pub const ALL: [Axis; 13] = [
        Axis::Ancestor,
        Axis::AncestorOrSelf,
        Axis::Attribute,
        Axis::Child,
        Axis::Descendant,
        Axis::DescendantOrSelf,
        Axis::Following,
        Axis::FollowingSibling,
        Axis::Namespace,
        Axis::Parent,
        Axis::Preceding,
        Axis::PrecedingSibling,
        Axis::SelfAxis,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Axis::Ancestor => "ancestor",
            Axis::AncestorOrSelf => "ancestor-or-self",
            Axis::Attribute => "attribute",
            Axis::Child => "child",
            Axis::Descendant => "descendant",
            Axis::DescendantOrSelf => "descendant-or-self",
            Axis::Following => "following",
            Axis::FollowingSibling => "following-sibling",
            Axis::Namespace => "namespace",
            Axis::Parent => "parent",
            Axis::Preceding => "preceding",
            Axis::PrecedingSibling => "preceding-sibling",
            Axis::SelfAxis => "self",
        }
    }

    /// Looks up an axis by name in the shared table.
    pub fn from_name(name: &str) -> Option<Axis> {
        AXES.get(name)
    }

    /// Reverse axes number proximity positions from the end of the node-set.
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Axis::Ancestor | Axis::AncestorOrSelf | Axis::Preceding | Axis::PrecedingSibling
        )
    }

    /// Whether a leading `[@name]`/`[@name = 'v']` predicate may be applied
    /// while collecting.
    pub fn supports_quick_attr(self) -> bool {
        matches!(self, Axis::Child | Axis::Descendant | Axis::DescendantOrSelf)
    }

    pub fn principal_node_type(self) -> NodeType {
        match self {
            Axis::Attribute => NodeType::Attribute,
            _ => NodeType::Element,
        }
    }

    /// Collects the nodes on this axis from `node` that pass `test` and `probe`.
    pub fn collect<'a, N: DomNode<'a>>(
        self,
        test: &NodeTest,
        node: N,
        probe: Option<AttrProbe<'_>>,
    ) -> NodeSet<N> {
        let filter = Filter {
            test,
            principal: self.principal_node_type(),
            probe,
        };
        let mut out = NodeSet::new();
        match self {
            Axis::Ancestor => collect_ancestor_nodes(node, &filter, &mut out),
            Axis::AncestorOrSelf => {
                collect_ancestor_nodes(node, &filter, &mut out);
                collect_self_node(node, &filter, &mut out);
            }
            Axis::Attribute => collect_attribute_nodes(node, &filter, &mut out),
            Axis::Child => collect_child_nodes(node, &filter, &mut out),
            Axis::Descendant => collect_descendant_nodes(node, &filter, &mut out),
            Axis::DescendantOrSelf => {
                collect_self_node(node, &filter, &mut out);
                collect_descendant_nodes(node, &filter, &mut out);
            }
            Axis::Following => collect_following_nodes(node, &filter, &mut out),
            Axis::FollowingSibling => collect_following_sibling_nodes(node, &filter, &mut out),
            Axis::Namespace => {}
            Axis::Parent => collect_parent_node(node, &filter, &mut out),
            Axis::Preceding => collect_preceding_nodes(node, &filter, &mut out),
            Axis::PrecedingSibling => collect_preceding_sibling_nodes(node, &filter, &mut out),
            Axis::SelfAxis => collect_self_node(node, &filter, &mut out),
        }
        out
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Name lookup for axes, built once and checked for duplicate names.
#[derive(Debug, Default)]
pub struct AxisTable {
    by_name: HashMap<&'static str, Axis>,
}

impl AxisTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn standard() -> Result<Self, XPathError> {
        let mut table = Self::new();
        for axis in Axis::ALL {
            table.register(axis)?;
        }
        Ok(table)
    }

    pub fn register(&mut self, axis: Axis) -> Result<(), XPathError> {
        if self.by_name.insert(axis.name(), axis).is_some() {
            return Err(XPathError::DuplicateAxis(axis.name().to_string()));
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Axis> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

static AXES: Lazy<AxisTable> = Lazy::new(|| match AxisTable::standard() {
    Ok(table) => table,
    Err(err) => panic!("axis table is inconsistent: {}", err),
});

/// An attribute pre-filter: the element must carry `name`, equal to `value` if given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttrProbe<'q> {
    pub name: &'q str,
    pub value: Option<&'q str>,
}

struct Filter<'t, 'q> {
    test: &'t NodeTest,
    principal: NodeType,
    probe: Option<AttrProbe<'q>>,
}

impl Filter<'_, '_> {
    fn accepts<'a, N: DomNode<'a>>(&self, node: N) -> bool {
        self.test.matches(node, self.principal)
            && self
                .probe
                .is_none_or(|probe| node.attr_matches(probe.name, probe.value))
    }
}

fn collect_self_node<'a, N: DomNode<'a>>(node: N, filter: &Filter, out: &mut NodeSet<N>) {
    if filter.accepts(node) {
        out.push_back(node);
    }
}

fn collect_child_nodes<'a, N: DomNode<'a>>(node: N, filter: &Filter, out: &mut NodeSet<N>) {
    for child in node.children() {
        if filter.accepts(child) {
            out.push_back(child);
        }
    }
}

fn collect_attribute_nodes<'a, N: DomNode<'a>>(node: N, filter: &Filter, out: &mut NodeSet<N>) {
    for attr in node.attributes() {
        if filter.accepts(attr) {
            out.push_back(attr);
        }
    }
}

fn collect_descendant_nodes<'a, N: DomNode<'a>>(node: N, filter: &Filter, out: &mut NodeSet<N>) {
    for descendant in node.descendants() {
        if filter.accepts(descendant) {
            out.push_back(descendant);
        }
    }
}

fn collect_parent_node<'a, N: DomNode<'a>>(node: N, filter: &Filter, out: &mut NodeSet<N>) {
    if let Some(parent) = node.parent() {
        collect_self_node(parent, filter, out);
    }
}

fn collect_ancestor_nodes<'a, N: DomNode<'a>>(node: N, filter: &Filter, out: &mut NodeSet<N>) {
    let mut current = node.parent();
    while let Some(ancestor) = current {
        if filter.accepts(ancestor) {
            out.push_front(ancestor);
        }
        current = ancestor.parent();
    }
}

fn collect_following_sibling_nodes<'a, N: DomNode<'a>>(
    node: N,
    filter: &Filter,
    out: &mut NodeSet<N>,
) {
    let mut current = node.next_sibling();
    while let Some(sibling) = current {
        collect_self_node(sibling, filter, out);
        current = sibling.next_sibling();
    }
}

fn collect_preceding_sibling_nodes<'a, N: DomNode<'a>>(
    node: N,
    filter: &Filter,
    out: &mut NodeSet<N>,
) {
    let mut current = node.previous_sibling();
    while let Some(sibling) = current {
        if filter.accepts(sibling) {
            out.push_front(sibling);
        }
        current = sibling.previous_sibling();
    }
}

/// Everything after the node in document order, excluding its descendants.
/// For an attribute that includes the owner element's descendants.
fn collect_following_nodes<'a, N: DomNode<'a>>(node: N, filter: &Filter, out: &mut NodeSet<N>) {
    let mut current = node;
    if node.node_type() == NodeType::Attribute {
        let Some(owner) = node.parent() else {
            return;
        };
        collect_descendant_nodes(owner, filter, out);
        current = owner;
    }
    loop {
        let mut sibling = current.next_sibling();
        while let Some(s) = sibling {
            collect_self_node(s, filter, out);
            collect_descendant_nodes(s, filter, out);
            sibling = s.next_sibling();
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => break,
        }
    }
}

/// Everything before the node in document order, excluding its ancestors.
fn collect_preceding_nodes<'a, N: DomNode<'a>>(node: N, filter: &Filter, out: &mut NodeSet<N>) {
    let mut current = match node.node_type() {
        NodeType::Attribute => match node.parent() {
            Some(owner) => owner,
            None => return,
        },
        _ => node,
    };
    loop {
        let mut sibling = current.previous_sibling();
        while let Some(s) = sibling {
            let subtree = std::iter::once(s).chain(s.descendants());
            for n in subtree.collect::<Vec<_>>().into_iter().rev() {
                if filter.accepts(n) {
                    out.push_front(n);
                }
            }
            sibling = s.previous_sibling();
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => break,
        }
    }
}
