//! Epoch-stamped DFS traversals.
//!
//! Visited nodes are recognized by their stamp being equal to the current epoch of the [`Aig`],
//! so starting a new traversal is O(1): see [`Aig::new_epoch`].
//!
//! The traversal is iterative (no recursion on deep circuits), and visits `fanin0` before
//! `fanin1`, so the resulting order only depends on the structure of the AIG.

use crate::{Aig, AigNode, NodeId};

impl Aig {
    /// Shared DFS: returns the post-order of the nodes reachable from `roots`.
    ///
    /// Undefined nodes are marked but not part of the order.
    /// If `record_reach`, every visited node is also stamped as reachable.
    fn traverse(&mut self, roots: &[NodeId], record_reach: bool) -> Vec<NodeId> {
        let epoch = self.new_epoch();
        let mut order = Vec::new();
        // (node, fanins already pushed)
        let mut stack: Vec<(NodeId, bool)> = Vec::new();

        for &root in roots {
            assert!(
                self.contains(root),
                "traversal requested from node {} which is not in the AIG",
                root
            );
            stack.push((root, false));

            while let Some((id, expanded)) = stack.pop() {
                // Post order
                if expanded {
                    order.push(id);
                    continue;
                }
                if self.is_marked(id) {
                    continue;
                }
                self.mark(id);

                let Some(entry) = self.entry_mut(id) else {
                    panic!("node {} is a fanin but is not in the AIG", id)
                };
                if record_reach {
                    entry.reached = epoch;
                }
                match entry.node {
                    AigNode::Undefined(_) => (),
                    AigNode::And { fanin0, fanin1, .. } => {
                        stack.push((id, true));
                        stack.push((fanin1.node, false));
                        stack.push((fanin0.node, false));
                    }
                    AigNode::Output { fanin, .. } => {
                        stack.push((id, true));
                        stack.push((fanin.node, false));
                    }
                    AigNode::False | AigNode::Input { .. } => order.push(id),
                }
            }
        }
        order
    }

    /// Returns a topological order of the nodes reachable from `roots`:
    /// every node appears once, after its fanins.
    ///
    /// Undefined nodes are not part of the order. Panics if a root is not in the AIG.
    pub fn topological_order(&mut self, roots: &[NodeId]) -> Vec<NodeId> {
        self.traverse(roots, false)
    }

    /// Topological order of the whole circuit, from the outputs (outputs included).
    ///
    /// The order is cached until the topology changes (add, merge, delete).
    /// Computing it also records which nodes are reachable, see [`Aig::is_reachable`].
    pub fn dfs_order(&mut self) -> &[NodeId] {
        if !self.dfs_done {
            let outputs = self.outputs.clone();
            self.dfs_list = self.traverse(&outputs, true);
            self.dfs_epoch = self.epoch;
            self.dfs_done = true;
        }
        &self.dfs_list
    }

    /// True if the node was reached by the last traversal from the outputs.
    pub fn is_reachable(&self, id: NodeId) -> bool {
        self.entry(id)
            .is_some_and(|e| e.reached == self.dfs_epoch && self.dfs_epoch != 0)
    }

    /// The and gates of the circuit, in topological order.
    pub fn and_gates(&mut self) -> Vec<NodeId> {
        let order = self.dfs_order().to_vec();
        order
            .into_iter()
            .filter(|&id| self.get_node(id).is_some_and(AigNode::is_and))
            .collect()
    }

    /// Primary inputs in the fanin cones of `roots`, in the order they are first met.
    pub fn support(&mut self, roots: &[NodeId]) -> Vec<NodeId> {
        self.topological_order(roots)
            .into_iter()
            .filter(|&n| self.get_node(n).is_some_and(AigNode::is_input))
            .collect()
    }
}
