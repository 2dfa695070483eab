//! Cheap algebraic rewriting and dead node removal.

use log::{debug, info};

use crate::{Aig, AigEdge, AigNode, NodeId, Result};

impl Aig {
    /// What an and gate collapses to, if one of the trivial identities applies:
    /// `a & a = a`, `a & !a = 0`, `0 & a = 0`, `1 & a = a`.
    fn trivial_equivalent(fanin0: AigEdge, fanin1: AigEdge) -> Option<AigEdge> {
        let zero = AigEdge::new(0, false);
        if fanin0.node == fanin1.node {
            Some(if fanin0.complement == fanin1.complement {
                fanin0
            } else {
                zero
            })
        } else if fanin0.node == 0 {
            Some(if fanin0.complement { fanin1 } else { zero })
        } else if fanin1.node == 0 {
            Some(if fanin1.complement { fanin0 } else { zero })
        } else {
            None
        }
    }

    /// Collapses the and gates matching a trivial identity, in topological order.
    /// Returns the number of gates removed.
    ///
    /// A gate whose fanins were just simplified is looked at with its new fanins,
    /// so chains of trivial gates disappear in a single pass.
    pub fn simplify(&mut self) -> Result<usize> {
        let gates = self.and_gates();
        let mut merged = 0;

        for id in gates {
            let Some(&AigNode::And { fanin0, fanin1, .. }) = self.get_node(id) else {
                continue;
            };
            let Some(target) = Self::trivial_equivalent(fanin0, fanin1) else {
                continue;
            };
            if self.get_node(target.node).is_some_and(AigNode::is_undefined) {
                continue;
            }
            info!(
                "Simplifying: {} merging {}{}...",
                target.node,
                if target.complement { "!" } else { "" },
                id
            );
            self.merge(target.node, id, target.complement)?;
            merged += 1;
        }
        debug!("simplify: {} gates removed", merged);
        Ok(merged)
    }

    /// Deletes every and gate (and undefined node) which does not reach any output.
    /// Inputs and the constant are kept. Returns the removed ids, in increasing order.
    pub fn sweep(&mut self) -> Result<Vec<NodeId>> {
        self.dfs_order();
        let dead: Vec<NodeId> = self
            .node_ids()
            .filter(|&id| !self.is_reachable(id))
            .filter(|&id| {
                self.get_node(id)
                    .is_some_and(|n| n.is_and() || n.is_undefined())
            })
            .collect();

        for &id in &dead {
            if let Some(node) = self.get_node(id) {
                info!("Sweeping: {}({}) removed...", node.type_str(), id);
            }
            self.delete(id)?;
        }
        Ok(dead)
    }
}
