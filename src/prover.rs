//! SAT based equivalence proofs between two nodes of the same circuit.

use log::{debug, trace};
use rustc_hash::FxHashMap;

use crate::{
    Aig, AigEdge, AigNode, NodeId, Result,
    cnf::{SatEngine, SatVar, VarisatEngine},
};

/// Outcome of a proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofResult {
    /// The two edges compute the same function.
    Equal,
    /// One value per primary input (in input order) for which the two edges differ.
    /// Inputs outside of both cones are 0.
    NotEqual(Vec<bool>),
}

/// Proves or refutes equivalences between nodes of one [`Aig`].
///
/// The solver is incremental: the gates encoded for a proof are kept for the following ones,
/// each node gets one variable and its clauses once. The circuit must therefore not change
/// between two proofs of the same prover.
pub struct Prover<S: SatEngine = VarisatEngine> {
    engine: S,
    vars: FxHashMap<NodeId, SatVar>,
    proofs: usize,
}

impl Prover<VarisatEngine> {
    pub fn new() -> Self {
        Self::with_engine(VarisatEngine::new())
    }
}

impl Default for Prover<VarisatEngine> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SatEngine> Prover<S> {
    pub fn with_engine(engine: S) -> Self {
        Prover {
            engine,
            vars: FxHashMap::default(),
            proofs: 0,
        }
    }

    /// Variable of a node, if its cone was already encoded.
    pub fn var_of(&self, id: NodeId) -> Option<SatVar> {
        self.vars.get(&id).copied()
    }

    /// Number of calls to the solver so far.
    pub fn proofs(&self) -> usize {
        self.proofs
    }

    /// Encodes the fanin cone of `root`, stopping at the nodes which already have a variable.
    fn encode(&mut self, aig: &Aig, root: NodeId) -> SatVar {
        // (node, fanins already encoded)
        let mut stack = vec![(root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if self.vars.contains_key(&id) {
                continue;
            }
            let var = match aig.get_node(id) {
                Some(AigNode::False) => {
                    let var = self.engine.new_var();
                    self.engine.assert_unit(var, false);
                    var
                }
                Some(AigNode::Input { .. }) => self.engine.new_var(),
                Some(&AigNode::And { fanin0, fanin1, .. }) => {
                    if !expanded {
                        stack.push((id, true));
                        stack.push((fanin1.node, false));
                        stack.push((fanin0.node, false));
                        continue;
                    }
                    let (Some(v0), Some(v1)) = (self.var_of(fanin0.node), self.var_of(fanin1.node))
                    else {
                        panic!("fanins of node {} were not encoded", id)
                    };
                    let var = self.engine.new_var();
                    self.engine
                        .assert_and(var, v0, fanin0.complement, v1, fanin1.complement);
                    var
                }
                Some(node) => panic!("cannot encode {} node {}", node.type_str(), id),
                None => panic!("cannot encode node {} which is not in the AIG", id),
            };
            trace!("node {} is sat variable {}", id, var);
            self.vars.insert(id, var);
        }
        self.vars[&root]
    }

    /// Checks whether the two edges always have the same value.
    ///
    /// Panics if one of the nodes is not the constant, an input or an and gate of `aig`.
    pub fn prove(&mut self, aig: &Aig, a: AigEdge, b: AigEdge) -> Result<ProofResult> {
        let va = self.encode(aig, a.node);
        let vb = self.encode(aig, b.node);

        let diff = self.engine.new_var();
        self.engine
            .assert_xor(diff, va, a.complement, vb, b.complement);
        self.engine.assume(diff, true);
        self.proofs += 1;

        if !self.engine.solve()? {
            debug!("proved {} = {}", a, b);
            return Ok(ProofResult::Equal);
        }
        let pattern: Vec<bool> = aig
            .get_inputs()
            .iter()
            .map(|id| {
                self.var_of(*id)
                    .and_then(|v| self.engine.value(v))
                    .unwrap_or(false)
            })
            .collect();
        debug!("refuted {} = {}", a, b);
        Ok(ProofResult::NotEqual(pattern))
    }
}
