//! An [`AigEdge`] points at an [`AigNode`] and can be complemented (indicates the presence of a NOT gate).
//!
//! [`AigNode`]: crate::AigNode

use std::{fmt, ops::Not};

use crate::NodeId;

/// Unambiguous fanin selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaninId {
    Fanin0,
    Fanin1,
}

/// A directed edge, used both for fanins and for fanouts.
///
/// The edge only stores the id of the node it refers to, the node itself is owned by the [`Aig`].
/// In a fanout list, `complement` is the polarity with which the fanout reads this node.
///
/// For example:
///
/// ```rust
/// use fraig::AigEdge;
/// let fanin_false = AigEdge::new(0, false);
/// let fanin_true = AigEdge::new(0, true);
/// assert_eq!(fanin_false, !fanin_true);
/// assert!(fanin_true.is_cst_true());
/// ```
///
/// [`Aig`]: crate::Aig
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AigEdge {
    /// The node the edge is refering to.
    pub(crate) node: NodeId,
    /// Set to true if signal should be inverted.
    pub(crate) complement: bool,
}

impl Not for AigEdge {
    type Output = Self;

    fn not(mut self) -> Self::Output {
        self.complement = !self.complement;
        self
    }
}

impl fmt::Display for AigEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.complement {
            write!(f, "!")?;
        }
        write!(f, "{}", self.node)
    }
}

impl AigEdge {
    pub fn new(node: NodeId, complement: bool) -> Self {
        AigEdge { node, complement }
    }

    pub fn get_node_id(&self) -> NodeId {
        self.node
    }

    pub fn get_complement(&self) -> bool {
        self.complement
    }

    pub fn is_cst_true(&self) -> bool {
        self.node == 0 && self.complement
    }

    pub fn is_complement_of(&self, other: &AigEdge) -> bool {
        self.node == other.node && self.complement ^ other.complement
    }

    /// Applies the polarity of the edge to a simulation word.
    pub fn apply(&self, word: u64) -> u64 {
        if self.complement { !word } else { word }
    }

    /// AIGER literal of the edge: `2 * id + complement`.
    pub fn to_literal(&self) -> u64 {
        2 * self.node as u64 + self.complement as u64
    }
}
