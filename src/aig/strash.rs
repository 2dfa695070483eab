//! Structural hashing: and gates reading the same two fanins are the same gate.

use std::collections::hash_map::Entry;

use log::{debug, info};
use rustc_hash::FxHashMap;

use crate::{Aig, AigEdge, AigNode, NodeId, Result};

/// Canonical key of an and gate: its fanins, smaller node id first.
pub(crate) fn strash_key(fanin0: AigEdge, fanin1: AigEdge) -> (AigEdge, AigEdge) {
    if fanin0 <= fanin1 {
        (fanin0, fanin1)
    } else {
        (fanin1, fanin0)
    }
}

impl Aig {
    /// Merges every and gate into the first gate (in topological order) reading the same fanins.
    /// Returns the number of merged gates.
    ///
    /// Gates are visited in topological order and merged right away, so a gate whose fanins were
    /// just merged is hashed with its new fanins: one pass is enough, running it again does nothing.
    ///
    /// ```rust
    /// use fraig::Aig;
    /// let mut aig = Aig::new();
    /// let a = aig.add_input(1).unwrap();
    /// let b = aig.add_input(2).unwrap();
    /// let g3 = aig.add_and(3, a, b).unwrap();
    /// let g4 = aig.add_and(4, b, a).unwrap();
    /// aig.add_output(g3).unwrap();
    /// aig.add_output(!g4).unwrap();
    ///
    /// assert_eq!(aig.strash().unwrap(), 1);
    /// assert_eq!(aig.and_count(), 1);
    /// assert_eq!(aig.get_output_fanins(), vec![g3, !g3]);
    /// assert_eq!(aig.strash().unwrap(), 0);
    /// ```
    pub fn strash(&mut self) -> Result<usize> {
        let gates = self.and_gates();
        // Sizing only matters for performance.
        let mut table: FxHashMap<(AigEdge, AigEdge), NodeId> =
            FxHashMap::with_capacity_and_hasher(
                self.and_count.next_power_of_two(),
                Default::default(),
            );
        let mut merged = 0;

        for id in gates {
            let Some(&AigNode::And { fanin0, fanin1, .. }) = self.get_node(id) else {
                continue;
            };
            match table.entry(strash_key(fanin0, fanin1)) {
                Entry::Occupied(e) => {
                    let survivor = *e.get();
                    info!("Strashing: {} merging {}...", survivor, id);
                    self.merge(survivor, id, false)?;
                    merged += 1;
                }
                Entry::Vacant(e) => {
                    e.insert(id);
                }
            }
        }
        debug!("strash: {} merged, {} and gates left", merged, self.and_count);
        Ok(merged)
    }
}
