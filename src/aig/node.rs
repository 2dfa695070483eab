use super::{AigEdge, AigError, FaninId, Result};

/// A node id.
///
/// The constant node [`AigNode::False`] has id 0 by convention. Ids are dense indices into the [`Aig`] arena.
///
/// [`Aig`]: crate::Aig
pub type NodeId = usize;

/// An AIG node.
///
/// Each node has an id. By convention, id for constant node `False` is 0. The id must be unique.
/// Fanouts are not part of the node itself, they are kept next to it by the owning [`Aig`].
///
/// [`Aig`]: crate::Aig
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AigNode {
    /// The constant low/false signal.
    False,
    /// A primary input.
    Input { id: NodeId, name: Option<String> },
    /// A primary output, driven by exactly one fanin.
    Output {
        id: NodeId,
        fanin: AigEdge,
        name: Option<String>,
    },
    /// An AND gate with two fanins.
    And {
        id: NodeId,
        fanin0: AigEdge,
        fanin1: AigEdge,
    },
    /// A node which is referenced as a fanin but has not been defined (yet).
    Undefined(NodeId),
}

impl AigNode {
    /// Returns a new and gate.
    pub fn and(id: NodeId, fanin0: AigEdge, fanin1: AigEdge) -> Self {
        if id == 0 {
            panic!(
                "Hey, you are trying to create an AND gate with id=0. \
                Id=0 is reserved for the constant node AigNode::False."
            )
        }
        AigNode::And { id, fanin0, fanin1 }
    }

    /// Returns a new unnamed input.
    pub fn input(id: NodeId) -> Self {
        AigNode::Input { id, name: None }
    }

    pub fn is_false(&self) -> bool {
        matches!(self, AigNode::False)
    }

    pub fn is_input(&self) -> bool {
        matches!(self, AigNode::Input { .. })
    }

    pub fn is_output(&self) -> bool {
        matches!(self, AigNode::Output { .. })
    }

    pub fn is_and(&self) -> bool {
        matches!(self, AigNode::And { .. })
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, AigNode::Undefined(_))
    }

    pub fn get_id(&self) -> NodeId {
        match *self {
            AigNode::False => 0,
            AigNode::Input { id, .. } => id,
            AigNode::Output { id, .. } => id,
            AigNode::And { id, .. } => id,
            AigNode::Undefined(id) => id,
        }
    }

    /// Short type tag, the way gates are reported (`CONST`, `PI`, `PO`, `AIG`, `UNDEF`).
    pub fn type_str(&self) -> &'static str {
        match self {
            AigNode::False => "CONST",
            AigNode::Input { .. } => "PI",
            AigNode::Output { .. } => "PO",
            AigNode::And { .. } => "AIG",
            AigNode::Undefined(_) => "UNDEF",
        }
    }

    pub fn get_name(&self) -> Option<&str> {
        match self {
            AigNode::Input { name, .. } | AigNode::Output { name, .. } => name.as_deref(),
            _ => None,
        }
    }

    pub(super) fn set_name(&mut self, new_name: String) -> Result<()> {
        match self {
            AigNode::Input { name, .. } | AigNode::Output { name, .. } => {
                *name = Some(new_name);
                Ok(())
            }
            _ => Err(AigError::InvalidState(format!(
                "only inputs and outputs can be named, node {} is a {}",
                self.get_id(),
                self.type_str()
            ))),
        }
    }

    pub fn get_fanins(&self) -> Vec<AigEdge> {
        match self {
            AigNode::Output { fanin, .. } => vec![*fanin],
            AigNode::And { fanin0, fanin1, .. } => vec![*fanin0, *fanin1],
            _ => vec![],
        }
    }

    pub fn get_fanin(&self, fanin_id: FaninId) -> Option<AigEdge> {
        match (self, fanin_id) {
            (AigNode::And { fanin0, .. }, FaninId::Fanin0) => Some(*fanin0),
            (AigNode::And { fanin1, .. }, FaninId::Fanin1) => Some(*fanin1),
            (AigNode::Output { fanin, .. }, FaninId::Fanin0) => Some(*fanin),
            _ => None,
        }
    }

    /// Overwrites a fanin without touching any fanout list: the [`Aig`] takes care of that.
    ///
    /// [`Aig`]: crate::Aig
    pub(super) fn set_fanin(&mut self, fanin_id: FaninId, edge: AigEdge) -> Result<()> {
        match (self, fanin_id) {
            (AigNode::And { fanin0, .. }, FaninId::Fanin0) => *fanin0 = edge,
            (AigNode::And { fanin1, .. }, FaninId::Fanin1) => *fanin1 = edge,
            (AigNode::Output { fanin, .. }, FaninId::Fanin0) => *fanin = edge,
            _ => return Err(AigError::NoFanin),
        }
        Ok(())
    }

    /// Replaces the first fanin equal to `old` by `new`.
    /// Returns which fanin was rewritten, or [`None`] if no fanin matched.
    pub(super) fn redirect_fanin(&mut self, old: AigEdge, new: AigEdge) -> Option<FaninId> {
        match self {
            AigNode::And { fanin0, .. } if *fanin0 == old => {
                *fanin0 = new;
                Some(FaninId::Fanin0)
            }
            AigNode::And { fanin1, .. } if *fanin1 == old => {
                *fanin1 = new;
                Some(FaninId::Fanin1)
            }
            AigNode::Output { fanin, .. } if *fanin == old => {
                *fanin = new;
                Some(FaninId::Fanin0)
            }
            _ => None,
        }
    }
}

/// A node as stored in the arena, with everything the passes attach to it.
///
/// Internal note: fanouts are kept here for every kind of node (outputs simply never have any).
/// Make sure every fanin rewrite updates them accordingly.
#[derive(Debug, Clone)]
pub(crate) struct NodeEntry {
    pub(crate) node: AigNode,
    /// Line of the netlist defining the node, 0 when built programmatically.
    pub(crate) line: usize,
    pub(crate) fanouts: Vec<AigEdge>,
    /// Epoch stamp, see [`Aig::new_epoch`](crate::Aig::new_epoch).
    pub(crate) stamp: u32,
    /// Current simulation word, fresh when `sim_stamp` equals the simulation epoch of the [`Aig`](crate::Aig).
    pub(crate) value: u64,
    pub(crate) sim_stamp: u32,
    /// Epoch of the last full traversal which reached this node.
    pub(crate) reached: u32,
}

impl NodeEntry {
    pub(crate) fn new(node: AigNode, line: usize) -> Self {
        NodeEntry {
            node,
            line,
            fanouts: Vec::new(),
            stamp: 0,
            value: 0,
            sim_stamp: 0,
            reached: 0,
        }
    }

    pub(crate) fn add_fanout(&mut self, fanout: AigEdge) {
        self.fanouts.push(fanout);
    }

    /// Removes exactly one entry equal to `fanout`.
    pub(crate) fn remove_fanout(&mut self, fanout: AigEdge) -> Result<()> {
        match self.fanouts.iter().position(|&f| f == fanout) {
            Some(pos) => {
                self.fanouts.remove(pos);
                Ok(())
            }
            None => Err(AigError::InvalidState(format!(
                "failed to remove fanout {} (not found) from node {}",
                fanout,
                self.node.get_id()
            ))),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    #[should_panic]
    fn add_node_test_invalid_and_id0() {
        let _ = AigNode::and(0, AigEdge::new(0, false), AigEdge::new(0, false));
    }

    #[test]
    fn redirect_fanin_test() {
        let mut n = AigNode::and(3, AigEdge::new(1, false), AigEdge::new(1, false));
        // Only the first matching fanin is rewritten.
        assert_eq!(
            n.redirect_fanin(AigEdge::new(1, false), AigEdge::new(2, true)),
            Some(FaninId::Fanin0)
        );
        assert_eq!(
            n.get_fanins(),
            vec![AigEdge::new(2, true), AigEdge::new(1, false)]
        );
        assert_eq!(
            n.redirect_fanin(AigEdge::new(1, true), AigEdge::new(2, true)),
            None
        );
    }

    #[test]
    fn remove_fanout_test() {
        let mut e = NodeEntry::new(AigNode::input(1), 2);
        e.add_fanout(AigEdge::new(3, false));
        e.add_fanout(AigEdge::new(3, false));
        e.remove_fanout(AigEdge::new(3, false)).unwrap();
        assert_eq!(e.fanouts, vec![AigEdge::new(3, false)]);
        assert!(e.remove_fanout(AigEdge::new(3, true)).is_err());
    }

    #[test]
    fn name_test() {
        let mut n = AigNode::input(1);
        n.set_name("a".to_string()).unwrap();
        assert_eq!(n.get_name(), Some("a"));
        let mut f = AigNode::False;
        assert!(f.set_name("x".to_string()).is_err());
        assert_eq!(AigNode::Undefined(4).type_str(), "UNDEF");
    }
}
