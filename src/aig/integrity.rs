use crate::{Aig, AigEdge, AigError, AigNode, NodeId, Result};

impl Aig {
    /// Checking if the AIG structure is correct.
    /// This function was written for debug purposes, as the library is supposed to maintain
    /// integrity of the AIG at any moment.
    ///
    /// Checks:
    /// - every node is stored at the slot of its id, and only `False` has id 0
    /// - inputs and outputs are registered as such
    /// - fanins and fanouts mirror each other (as multisets)
    /// - the number of and gates is up to date
    /// - the graph is acyclic
    pub fn check_integrity(&self) -> Result<()> {
        for (slot, entry) in self.nodes.iter().enumerate() {
            let Some(entry) = entry else { continue };
            let id = entry.node.get_id();
            if id != slot {
                return Err(AigError::InvalidState(format!(
                    "node {} is stored in slot {}",
                    id, slot
                )));
            }
            if (slot == 0) != entry.node.is_false() {
                return Err(AigError::IdZeroButNotFalse);
            }
            for fanin in entry.node.get_fanins() {
                if !self.contains(fanin.node) {
                    return Err(AigError::InvalidState(format!(
                        "node {} reads node {} which is not in the AIG",
                        id, fanin.node
                    )));
                }
            }
        }

        self.check_ports()?;
        self.check_fanouts()?;

        let ands = self
            .nodes
            .iter()
            .flatten()
            .filter(|e| e.node.is_and())
            .count();
        if ands != self.and_count {
            return Err(AigError::InvalidState(format!(
                "{} and gates stored but the count says {}",
                ands, self.and_count
            )));
        }

        self.check_acyclic()
    }

    fn check_ports(&self) -> Result<()> {
        for &id in &self.inputs {
            if !self.get_node(id).is_some_and(AigNode::is_input) {
                return Err(AigError::InvalidState(format!(
                    "input {} is not an input node",
                    id
                )));
            }
        }
        for &id in &self.outputs {
            if !self.get_node(id).is_some_and(AigNode::is_output) {
                return Err(AigError::InvalidState(format!(
                    "output {} is not an output node",
                    id
                )));
            }
        }
        Ok(())
    }

    /// Every fanin `(g, c)` of `n` must match one fanout `(n, c)` of `g`, and the other way around.
    fn check_fanouts(&self) -> Result<()> {
        let mut from_fanins: Vec<(NodeId, AigEdge)> = Vec::new();
        let mut from_fanouts: Vec<(NodeId, AigEdge)> = Vec::new();
        for entry in self.nodes.iter().flatten() {
            let id = entry.node.get_id();
            for fanin in entry.node.get_fanins() {
                from_fanins.push((fanin.node, AigEdge::new(id, fanin.complement)));
            }
            for &fanout in &entry.fanouts {
                from_fanouts.push((id, fanout));
            }
        }
        from_fanins.sort_unstable();
        from_fanouts.sort_unstable();

        if from_fanins == from_fanouts {
            return Ok(());
        }
        let first_diff = from_fanins
            .iter()
            .zip(&from_fanouts)
            .find(|(a, b)| a != b)
            .map(|(a, _)| *a)
            .or_else(|| from_fanins.get(from_fanouts.len()).copied());
        Err(AigError::InvalidState(match first_diff {
            Some((g, fanout)) => format!(
                "node {} reads {} but the fanouts of {} do not match",
                fanout.node,
                AigEdge::new(g, fanout.complement),
                g
            ),
            None => "some fanouts have no matching fanin".to_string(),
        }))
    }

    /// Iterative three-color DFS over fanins, from every node.
    fn check_acyclic(&self) -> Result<()> {
        const WHITE: u8 = 0;
        const GREY: u8 = 1;
        const BLACK: u8 = 2;
        let mut color = vec![WHITE; self.nodes.len()];

        for root in self.node_ids() {
            if color[root] != WHITE {
                continue;
            }
            let mut stack = vec![(root, false)];
            while let Some((id, expanded)) = stack.pop() {
                if expanded {
                    color[id] = BLACK;
                    continue;
                }
                match color[id] {
                    BLACK => continue,
                    GREY => {
                        return Err(AigError::InvalidState(format!(
                            "combinational loop through node {}",
                            id
                        )));
                    }
                    _ => (),
                }
                color[id] = GREY;
                stack.push((id, true));
                if let Some(node) = self.get_node(id) {
                    for fanin in node.get_fanins() {
                        match color[fanin.node] {
                            GREY => {
                                return Err(AigError::InvalidState(format!(
                                    "combinational loop through node {}",
                                    fanin.node
                                )));
                            }
                            WHITE => stack.push((fanin.node, false)),
                            _ => (),
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
