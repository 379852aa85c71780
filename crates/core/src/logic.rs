//! Logic graphs
//!
//! A logic graph is a DAG expressing a concept's necessary and sufficient
//! conditions. Node 0 is always the definition root, a pseudo-node that
//! references no concept. The only graph operation the core needs is
//! extracting the concepts the expression refers to, which the indexer
//! projects into Nid index entries.

use crate::ids::Nid;
use serde::{Deserialize, Serialize};

/// Index of a node inside its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// Kind of a logic graph node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogicNodeKind {
    /// The definition root pseudo-node (always node 0)
    DefinitionRoot,
    /// Necessary set
    Necessary,
    /// Sufficient set
    Sufficient,
    /// Conjunction
    And,
    /// Disjunction
    Or,
    /// Concept leaf
    Concept(Nid),
    /// Existential role restriction
    RoleSome {
        /// Role type concept
        role_type: Nid,
    },
    /// Universal role restriction
    RoleAll {
        /// Role type concept
        role_type: Nid,
    },
    /// Concrete-domain feature
    Feature {
        /// Feature type concept
        feature_type: Nid,
    },
    /// Integer literal
    LiteralInteger(i32),
    /// Float literal
    LiteralFloat(f64),
    /// String literal
    LiteralString(String),
    /// Boolean literal
    LiteralBoolean(bool),
}

impl LogicNodeKind {
    /// Concept referenced by this node, if any
    pub fn referenced_concept(&self) -> Option<Nid> {
        match self {
            LogicNodeKind::Concept(nid) => Some(*nid),
            LogicNodeKind::RoleSome { role_type } | LogicNodeKind::RoleAll { role_type } => {
                Some(*role_type)
            }
            LogicNodeKind::Feature { feature_type } => Some(*feature_type),
            _ => None,
        }
    }
}

/// A node and its ordered children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicNode {
    /// What the node expresses
    pub kind: LogicNodeKind,
    /// Child node ids
    pub children: Vec<NodeId>,
}

/// Definition DAG of a concept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicGraph {
    nodes: Vec<LogicNode>,
}

impl LogicGraph {
    /// All nodes, root first
    pub fn nodes(&self) -> &[LogicNode] {
        &self.nodes
    }

    /// The definition root
    pub fn root(&self) -> &LogicNode {
        &self.nodes[0]
    }

    /// Node by id
    pub fn node(&self, id: NodeId) -> Option<&LogicNode> {
        self.nodes.get(id.0)
    }

    /// Concepts referenced by nodes reachable from the root
    ///
    /// Depth-first, children in declared order, each node visited once even if
    /// shared. The root pseudo-node contributes nothing. Result is
    /// de-duplicated in first-seen order.
    pub fn referenced_concepts(&self) -> Vec<Nid> {
        let mut visited = vec![false; self.nodes.len()];
        let mut seen = rustc_hash::FxHashSet::default();
        let mut out = Vec::new();
        let mut stack = vec![NodeId(0)];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id.0) else {
                continue;
            };
            if std::mem::replace(&mut visited[id.0], true) {
                continue;
            }
            if id.0 != 0 {
                if let Some(nid) = node.kind.referenced_concept() {
                    if seen.insert(nid) {
                        out.push(nid);
                    }
                }
            }
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }
}

/// Incremental construction of a logic graph
///
/// ```
/// use termstore_core::{LogicGraphBuilder, Nid};
///
/// let mut b = LogicGraphBuilder::new();
/// let parent = b.concept(Nid::new(-7));
/// let and = b.and(&[parent]);
/// let necessary = b.necessary(&[and]);
/// let graph = b.build(&[necessary]);
/// assert_eq!(graph.referenced_concepts(), vec![Nid::new(-7)]);
/// ```
#[derive(Debug, Clone)]
pub struct LogicGraphBuilder {
    nodes: Vec<LogicNode>,
}

impl Default for LogicGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LogicGraphBuilder {
    /// Builder holding only the definition root
    pub fn new() -> Self {
        LogicGraphBuilder {
            nodes: vec![LogicNode {
                kind: LogicNodeKind::DefinitionRoot,
                children: Vec::new(),
            }],
        }
    }

    /// Add a node with children
    pub fn add(&mut self, kind: LogicNodeKind, children: &[NodeId]) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(LogicNode {
            kind,
            children: children.to_vec(),
        });
        id
    }

    /// Add a concept leaf
    pub fn concept(&mut self, nid: Nid) -> NodeId {
        self.add(LogicNodeKind::Concept(nid), &[])
    }

    /// Add a conjunction
    pub fn and(&mut self, children: &[NodeId]) -> NodeId {
        self.add(LogicNodeKind::And, children)
    }

    /// Add a necessary set
    pub fn necessary(&mut self, children: &[NodeId]) -> NodeId {
        self.add(LogicNodeKind::Necessary, children)
    }

    /// Add a sufficient set
    pub fn sufficient(&mut self, children: &[NodeId]) -> NodeId {
        self.add(LogicNodeKind::Sufficient, children)
    }

    /// Add an existential role restriction
    pub fn some_role(&mut self, role_type: Nid, restriction: NodeId) -> NodeId {
        self.add(LogicNodeKind::RoleSome { role_type }, &[restriction])
    }

    /// Attach the given nodes to the root and finish
    pub fn build(mut self, root_children: &[NodeId]) -> LogicGraph {
        self.nodes[0].children = root_children.to_vec();
        LogicGraph { nodes: self.nodes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_contributes_nothing() {
        let graph = LogicGraphBuilder::new().build(&[]);
        assert!(graph.referenced_concepts().is_empty());
        assert_eq!(graph.root().kind, LogicNodeKind::DefinitionRoot);
    }

    #[test]
    fn test_role_and_concepts_collected_in_dfs_order() {
        let mut b = LogicGraphBuilder::new();
        let parent = b.concept(Nid::new(-10));
        let site = b.concept(Nid::new(-11));
        let role = b.some_role(Nid::new(-12), site);
        let and = b.and(&[parent, role]);
        let nec = b.necessary(&[and]);
        let graph = b.build(&[nec]);
        assert_eq!(
            graph.referenced_concepts(),
            vec![Nid::new(-10), Nid::new(-12), Nid::new(-11)]
        );
    }

    #[test]
    fn test_shared_nodes_visited_once() {
        let mut b = LogicGraphBuilder::new();
        let shared = b.concept(Nid::new(-20));
        let nec = b.necessary(&[shared]);
        let suf = b.sufficient(&[shared]);
        let graph = b.build(&[nec, suf]);
        assert_eq!(graph.referenced_concepts(), vec![Nid::new(-20)]);
    }

    #[test]
    fn test_unreachable_nodes_ignored() {
        let mut b = LogicGraphBuilder::new();
        let _orphan = b.concept(Nid::new(-30));
        let graph = b.build(&[]);
        assert!(graph.referenced_concepts().is_empty());
    }

    #[test]
    fn test_dangling_child_ignored() {
        let mut b = LogicGraphBuilder::new();
        let nec = b.add(LogicNodeKind::Necessary, &[NodeId(99)]);
        let graph = b.build(&[nec]);
        assert!(graph.referenced_concepts().is_empty());
    }
}
