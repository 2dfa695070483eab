//! Module defining the [`Aig`] struct, as well as [`AigNode`], [`AigEdge`] and some others relevant structs.
//!
//! The graph is an arena: nodes live in a vector indexed by their [`NodeId`], edges are plain
//! `(id, complement)` pairs and every node keeps the list of its fanouts.
//!
//! To start reducing a circuit, check [`crate::fraig::Fraig`].

pub mod dfs;
pub mod edge;
pub mod error;
mod integrity;
pub mod node;
mod parser;
mod simplify;
mod strash;
mod writer;

use std::mem;

pub use edge::{AigEdge, FaninId};
pub use error::{AigError, ParserError, PatternError, Result};
pub(crate) use node::NodeEntry;
pub use node::{AigNode, NodeId};

/// A whole combinational AIG.
///
/// The constant node [`AigNode::False`] always exists with id 0. Inputs and and gates use the
/// ids they were given (AIGER variable indices when read from a file), outputs get the ids
/// right after the largest variable, in order.
///
/// Invariant: for every fanin `(g, c)` of a node `n`, the fanouts of `g` contain one entry `(n, c)`.
/// Every method rewriting a fanin maintains it, [`Aig::check_integrity`] verifies it.
#[derive(Debug, Clone)]
pub struct Aig {
    nodes: Vec<Option<NodeEntry>>,
    inputs: Vec<NodeId>,
    outputs: Vec<NodeId>,
    /// Free text found after the `c` line of a netlist.
    comments: Vec<String>,
    /// Largest variable index (the `M` of the AIGER header).
    max_var: usize,
    and_count: usize,
    /// Global epoch, see [`Aig::new_epoch`].
    epoch: u32,
    /// Simulation values are fresh when stamped with this one.
    sim_epoch: u32,
    /// Cached topological order from the outputs.
    dfs_list: Vec<NodeId>,
    dfs_done: bool,
    /// Epoch at which `dfs_list` was computed, used for reachability.
    dfs_epoch: u32,
}

impl Default for Aig {
    fn default() -> Self {
        Self::new()
    }
}

impl Aig {
    /// Create a brand new AIG (constant node [`AigNode::False`] included).
    pub fn new() -> Self {
        Aig {
            nodes: vec![Some(NodeEntry::new(AigNode::False, 0))],
            inputs: Vec::new(),
            outputs: Vec::new(),
            comments: Vec::new(),
            max_var: 0,
            and_count: 0,
            // Fresh nodes carry stamp 0 and must never look evaluated.
            epoch: 1,
            sim_epoch: 1,
            dfs_list: Vec::new(),
            dfs_done: false,
            dfs_epoch: 0,
        }
    }

    /// Create an AIG whose variables range from 0 to `max_var`: outputs will be numbered from `max_var + 1`.
    pub fn with_max_var(max_var: usize) -> Self {
        let mut aig = Aig::new();
        aig.max_var = max_var;
        aig
    }

    /// Retrieves a node from its id.
    pub fn get_node(&self, id: NodeId) -> Option<&AigNode> {
        self.entry(id).map(|e| &e.node)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.entry(id).is_some()
    }

    pub(crate) fn entry(&self, id: NodeId) -> Option<&NodeEntry> {
        self.nodes.get(id)?.as_ref()
    }

    pub(crate) fn entry_mut(&mut self, id: NodeId) -> Option<&mut NodeEntry> {
        self.nodes.get_mut(id)?.as_mut()
    }

    /// Same as [`Aig::entry`], but the node must exist.
    fn live(&self, id: NodeId) -> Result<&NodeEntry> {
        self.entry(id).ok_or(AigError::NodeDoesNotExist(id))
    }

    fn live_mut(&mut self, id: NodeId) -> Result<&mut NodeEntry> {
        self.entry_mut(id).ok_or(AigError::NodeDoesNotExist(id))
    }

    /// Fanouts of a node, in insertion order.
    pub fn get_fanouts(&self, id: NodeId) -> Option<&[AigEdge]> {
        self.entry(id).map(|e| e.fanouts.as_slice())
    }

    /// Netlist line defining the node (0 if the node was built programmatically).
    pub fn get_line(&self, id: NodeId) -> Option<usize> {
        self.entry(id).map(|e| e.line)
    }

    /// Ids of all the nodes currently stored, in increasing order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(id, e)| e.as_ref().map(|_| id))
    }

    /// Retrieves inputs id, in declaration order.
    pub fn get_inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    /// Retrieves outputs id, in declaration order.
    pub fn get_outputs(&self) -> &[NodeId] {
        &self.outputs
    }

    /// The fanin of each output, in declaration order.
    pub fn get_output_fanins(&self) -> Vec<AigEdge> {
        self.outputs
            .iter()
            .filter_map(|&id| self.get_node(id)?.get_fanin(FaninId::Fanin0))
            .collect()
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Number of live and gates.
    pub fn and_count(&self) -> usize {
        self.and_count
    }

    pub fn max_var(&self) -> usize {
        self.max_var
    }

    pub fn get_comments(&self) -> &[String] {
        &self.comments
    }

    pub fn add_comment(&mut self, comment: String) {
        self.comments.push(comment);
    }

    /// Nodes which are referenced but were never defined.
    pub fn undefined_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .flatten()
            .filter(|e| e.node.is_undefined())
            .map(|e| e.node.get_id())
            .collect()
    }

    /// Fails with [`AigError::UndefinedNode`] if a node reachable from an output is undefined.
    pub fn check_defined(&mut self) -> Result<()> {
        let order = self.dfs_order().to_vec();
        for id in order {
            for fanin in self.live(id)?.node.get_fanins() {
                if self.live(fanin.node)?.node.is_undefined() {
                    return Err(AigError::UndefinedNode(fanin.node));
                }
            }
        }
        Ok(())
    }

    fn grow_to(&mut self, id: NodeId) {
        if id >= self.nodes.len() {
            self.nodes.resize_with(id + 1, || None);
        }
    }

    /// Makes sure a node exists for `id`, creating an [`AigNode::Undefined`] placeholder if needed.
    fn ensure_exists(&mut self, id: NodeId) -> Result<()> {
        if self.contains(id) {
            return match self.live(id)?.node {
                AigNode::Output { .. } => Err(AigError::InvalidState(format!(
                    "output {} cannot be used as a fanin",
                    id
                ))),
                _ => Ok(()),
            };
        }
        if self.outputs.iter().any(|&o| o <= id) {
            return Err(AigError::InvalidState(format!(
                "node {} is referenced after outputs were numbered, add outputs last",
                id
            )));
        }
        self.grow_to(id);
        self.max_var = self.max_var.max(id);
        self.nodes[id] = Some(NodeEntry::new(AigNode::Undefined(id), 0));
        Ok(())
    }

    /// Stores a new node, resolving a placeholder if there is one.
    /// Returns false if the exact same node already existed.
    fn define(&mut self, node: AigNode, line: usize) -> Result<bool> {
        let id = node.get_id();
        if id == 0 {
            return Err(AigError::IdZeroButNotFalse);
        }
        self.ensure_exists(id)?;
        let entry = self.live_mut(id)?;
        if entry.node.is_undefined() {
            entry.node = node;
            entry.line = line;
            Ok(true)
        } else if entry.node == node {
            Ok(false)
        } else {
            Err(AigError::DuplicateId(id))
        }
    }

    /// Topology changed: cached order is stale.
    fn invalidate(&mut self) {
        self.dfs_done = false;
    }

    /// Function of some nodes may have changed: cached order and simulation values are stale.
    fn touch(&mut self) {
        self.invalidate();
        self.new_sim_epoch();
    }

    /// Create a new input (or retrieve the existing one).
    pub fn add_input(&mut self, id: NodeId) -> Result<AigEdge> {
        self.add_input_at(id, 0)
    }

    pub(crate) fn add_input_at(&mut self, id: NodeId, line: usize) -> Result<AigEdge> {
        if self.define(AigNode::input(id), line)? {
            self.inputs.push(id);
            self.touch();
        }
        Ok(AigEdge::new(id, false))
    }

    /// Create a new and node (or retrieve it if the exact same node already exists).
    ///
    /// Fanins which do not exist yet are created as [`AigNode::Undefined`] placeholders,
    /// they get resolved when they are defined later on.
    ///
    /// ```rust
    /// use fraig::{Aig, AigEdge};
    /// let mut aig = Aig::new();
    /// let a = aig.add_input(1).unwrap();
    /// // b (id 2) is not defined yet
    /// let g = aig.add_and(3, a, AigEdge::new(2, true)).unwrap();
    /// assert_eq!(aig.undefined_nodes(), vec![2]);
    /// aig.add_input(2).unwrap();
    /// assert!(aig.undefined_nodes().is_empty());
    /// aig.add_output(g).unwrap();
    /// assert!(aig.check_integrity().is_ok());
    ///
    /// // Id 1 is already taken by an input
    /// assert!(aig.add_and(1, a, a).is_err());
    /// ```
    pub fn add_and(&mut self, id: NodeId, fanin0: AigEdge, fanin1: AigEdge) -> Result<AigEdge> {
        self.add_and_at(id, fanin0, fanin1, 0)
    }

    pub(crate) fn add_and_at(
        &mut self,
        id: NodeId,
        fanin0: AigEdge,
        fanin1: AigEdge,
        line: usize,
    ) -> Result<AigEdge> {
        if id == 0 {
            return Err(AigError::IdZeroButNotFalse);
        }
        if fanin0.node == id || fanin1.node == id {
            return Err(AigError::InvalidState(format!(
                "and gate {} cannot be its own fanin",
                id
            )));
        }
        self.ensure_exists(fanin0.node)?;
        self.ensure_exists(fanin1.node)?;
        if self.define(AigNode::and(id, fanin0, fanin1), line)? {
            for fanin in [fanin0, fanin1] {
                self.live_mut(fanin.node)?
                    .add_fanout(AigEdge::new(id, fanin.complement));
            }
            self.and_count += 1;
            self.touch();
        }
        Ok(AigEdge::new(id, false))
    }

    /// Create a new output driven by `fanin`. Returns the id of the output node.
    ///
    /// Outputs are numbered after every variable, so they should be added once
    /// all the inputs and gates are known.
    pub fn add_output(&mut self, fanin: AigEdge) -> Result<NodeId> {
        self.add_output_at(fanin, 0)
    }

    pub(crate) fn add_output_at(&mut self, fanin: AigEdge, line: usize) -> Result<NodeId> {
        self.ensure_exists(fanin.node)?;
        let id = self.nodes.len().max(self.max_var + 1);
        self.grow_to(id);
        self.nodes[id] = Some(NodeEntry::new(
            AigNode::Output {
                id,
                fanin,
                name: None,
            },
            line,
        ));
        self.live_mut(fanin.node)?
            .add_fanout(AigEdge::new(id, fanin.complement));
        self.outputs.push(id);
        self.touch();
        Ok(id)
    }

    /// Give a symbolic name to an input or an output.
    pub fn set_name(&mut self, id: NodeId, name: String) -> Result<()> {
        self.live_mut(id)?.node.set_name(name)
    }

    /// Replace the given fanin of a node by a new fanin, keeping fanouts up to date.
    pub fn replace_fanin(&mut self, parent: NodeId, fanin_id: FaninId, fanin: AigEdge) -> Result<()> {
        self.ensure_exists(fanin.node)?;
        let old = self
            .live(parent)?
            .node
            .get_fanin(fanin_id)
            .ok_or(AigError::NoFanin)?;
        self.live_mut(old.node)?
            .remove_fanout(AigEdge::new(parent, old.complement))?;
        self.live_mut(parent)?.node.set_fanin(fanin_id, fanin)?;
        self.live_mut(fanin.node)?
            .add_fanout(AigEdge::new(parent, fanin.complement));
        self.touch();
        Ok(())
    }

    /// Starts a new epoch: every node marked so far is no longer marked, in O(1).
    pub fn new_epoch(&mut self) -> u32 {
        self.epoch = self.epoch.wrapping_add(1);
        if self.epoch == 0 {
            // Wrapped around: old stamps could collide with new epochs.
            for entry in self.nodes.iter_mut().flatten() {
                entry.stamp = 0;
                entry.reached = 0;
            }
            self.dfs_done = false;
            self.epoch = 1;
        }
        self.epoch
    }

    /// Makes every simulation value stale, in O(1).
    pub(crate) fn new_sim_epoch(&mut self) -> u32 {
        self.sim_epoch = self.sim_epoch.wrapping_add(1);
        if self.sim_epoch == 0 {
            for entry in self.nodes.iter_mut().flatten() {
                entry.sim_stamp = 0;
            }
            self.sim_epoch = 1;
        }
        self.sim_epoch
    }

    pub(crate) fn sim_epoch(&self) -> u32 {
        self.sim_epoch
    }

    /// True if the node was marked during the current epoch.
    pub fn is_marked(&self, id: NodeId) -> bool {
        self.entry(id).is_some_and(|e| e.stamp == self.epoch)
    }

    pub(crate) fn mark(&mut self, id: NodeId) {
        let epoch = self.epoch;
        if let Some(e) = self.entry_mut(id) {
            e.stamp = epoch;
        }
    }

    /// Merge `victim` into `survivor`: every fanout of `victim` now reads `survivor`
    /// (complemented if `complement`), then `victim` is deleted.
    ///
    /// Only and gates can be merged away. The two nodes must compute the same function
    /// (or opposite functions when `complement` is set): this is checked against the current
    /// simulation words and a mismatch is a bug in the caller, so this panics.
    pub fn merge(&mut self, survivor: NodeId, victim: NodeId, complement: bool) -> Result<()> {
        assert_ne!(survivor, victim, "cannot merge node {} into itself", victim);
        assert!(
            self.get_node(victim).is_some_and(AigNode::is_and),
            "only a live and gate can be merged away, got node {}",
            victim
        );
        assert!(
            self.get_node(survivor)
                .is_some_and(|n| !n.is_output() && !n.is_undefined()),
            "node {} cannot absorb another node",
            survivor
        );
        let (s, v) = (self.evaluate(survivor), self.evaluate(victim));
        assert!(
            s == if complement { !v } else { v },
            "merging {} into {} with complement={} contradicts simulation",
            victim,
            survivor,
            complement
        );

        let fanouts = mem::take(&mut self.live_mut(victim)?.fanouts);
        for fanout in fanouts {
            let old = AigEdge::new(victim, fanout.complement);
            let new = AigEdge::new(survivor, fanout.complement ^ complement);
            self.live_mut(fanout.node)?
                .node
                .redirect_fanin(old, new)
                .ok_or(AigError::InvalidState(format!(
                    "node {} is a fanout of {} but does not read it",
                    fanout.node, victim
                )))?;
            self.live_mut(survivor)?
                .add_fanout(AigEdge::new(fanout.node, new.complement));
        }

        self.delete(victim)
    }

    /// Merge `victim` into `survivor`, the polarity being deduced from the simulation words.
    pub fn merge_by_simulation(&mut self, survivor: NodeId, victim: NodeId) -> Result<()> {
        let (s, v) = (self.evaluate(survivor), self.evaluate(victim));
        let complement = if s == v {
            false
        } else if s == !v {
            true
        } else {
            panic!(
                "nodes {} and {} have unrelated simulation values, they cannot be merged",
                survivor, victim
            )
        };
        self.merge(survivor, victim, complement)
    }

    /// Removes a node which no longer has any fanout, dropping the back references held by its fanins.
    pub(crate) fn delete(&mut self, id: NodeId) -> Result<()> {
        let entry = self.nodes[id].take().ok_or(AigError::NodeDoesNotExist(id))?;
        for fanin in entry.node.get_fanins() {
            // The fanin may already be gone when sweeping a whole dead cone.
            if let Some(e) = self.entry_mut(fanin.node) {
                e.remove_fanout(AigEdge::new(id, fanin.complement))?;
            }
        }
        if entry.node.is_and() {
            self.and_count -= 1;
        }
        self.invalidate();
        Ok(())
    }
}
