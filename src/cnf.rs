//! SAT encoding of and gates, and the interface to the SAT solver.
//!
//! To prove that two nodes `a` and `b` are equivalent:
//! - encode the and gates of their fanin cones with [`SatEngine::assert_and`]
//! - encode `x = a XOR b` with [`SatEngine::assert_xor`] on a fresh variable `x`
//! - assume `x` and check that the formula is **UNSAT**.
//!
//! If the formula is SAT, the model restricted to the inputs is a counterexample:
//! an input pattern for which the two nodes differ.
//!
//! This is what [`Prover::prove`] does. The clauses stay in the solver from one proof
//! to the next, only the assumption is dropped, so each cone is encoded once.
//!
//! [`Prover::prove`]: crate::prover::Prover::prove

use std::ops::Not;

use varisat::ExtendFormula;

use crate::Result;

/// A SAT variable, as handed out by [`SatEngine::new_var`].
pub type SatVar = usize;

/// A SAT literal: a variable, possibly negated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lit {
    var: SatVar,
    negated: bool,
}

impl Lit {
    pub fn new(var: SatVar, negated: bool) -> Self {
        Lit { var, negated }
    }

    pub fn positive(var: SatVar) -> Self {
        Lit::new(var, false)
    }

    pub fn var(&self) -> SatVar {
        self.var
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }
}

impl Not for Lit {
    type Output = Self;

    fn not(self) -> Self::Output {
        Lit::new(self.var, !self.negated)
    }
}

/// A SAT clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause(Vec<Lit>);

impl Clause {
    pub fn lits(&self) -> &[Lit] {
        &self.0
    }
}

impl From<Vec<Lit>> for Clause {
    fn from(value: Vec<Lit>) -> Self {
        Clause(value)
    }
}

/// Clauses that encode `z = AND(a, b)`.
pub fn and_clauses(a: Lit, b: Lit, z: Lit) -> [Clause; 3] {
    [
        Clause::from(vec![a, !z]),
        Clause::from(vec![b, !z]),
        Clause::from(vec![!a, !b, z]),
    ]
}

/// Clauses that encode `z = XOR(a, b)`.
pub fn xor_clauses(a: Lit, b: Lit, z: Lit) -> [Clause; 4] {
    [
        Clause::from(vec![a, b, !z]),
        Clause::from(vec![a, !b, z]),
        Clause::from(vec![!a, b, z]),
        Clause::from(vec![!a, !b, !z]),
    ]
}

/// An incremental SAT solver.
///
/// Clauses are permanent. Assumptions only hold for the next call to [`SatEngine::solve`].
pub trait SatEngine {
    fn new_var(&mut self) -> SatVar;

    fn add_clause(&mut self, clause: &Clause);

    /// Assumes `var = value` for the next call to [`SatEngine::solve`].
    fn assume(&mut self, var: SatVar, value: bool);

    /// Solves under the current assumptions, then drops them. Returns true if SAT.
    fn solve(&mut self) -> Result<bool>;

    /// Value of a variable in the model of the last satisfiable call, if it has one.
    fn value(&self, var: SatVar) -> Option<bool>;

    /// Forces `var = value`.
    fn assert_unit(&mut self, var: SatVar, value: bool) {
        self.add_clause(&Clause::from(vec![Lit::new(var, !value)]));
    }

    /// Encodes `out = (in0 ^ in0_inv) & (in1 ^ in1_inv)`.
    fn assert_and(&mut self, out: SatVar, in0: SatVar, in0_inv: bool, in1: SatVar, in1_inv: bool) {
        for clause in and_clauses(
            Lit::new(in0, in0_inv),
            Lit::new(in1, in1_inv),
            Lit::positive(out),
        ) {
            self.add_clause(&clause);
        }
    }

    /// Encodes `out = (in0 ^ in0_inv) XOR (in1 ^ in1_inv)`.
    fn assert_xor(&mut self, out: SatVar, in0: SatVar, in0_inv: bool, in1: SatVar, in1_inv: bool) {
        for clause in xor_clauses(
            Lit::new(in0, in0_inv),
            Lit::new(in1, in1_inv),
            Lit::positive(out),
        ) {
            self.add_clause(&clause);
        }
    }
}

/// [`SatEngine`] backed by the varisat CDCL solver.
pub struct VarisatEngine {
    solver: varisat::Solver<'static>,
    assumptions: Vec<varisat::Lit>,
    model: Vec<Option<bool>>,
}

impl VarisatEngine {
    pub fn new() -> Self {
        VarisatEngine {
            solver: varisat::Solver::new(),
            assumptions: Vec::new(),
            model: Vec::new(),
        }
    }

    fn lit(lit: Lit) -> varisat::Lit {
        let var = varisat::Var::from_index(lit.var);
        if lit.negated {
            varisat::Lit::negative(var)
        } else {
            varisat::Lit::positive(var)
        }
    }
}

impl Default for VarisatEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SatEngine for VarisatEngine {
    fn new_var(&mut self) -> SatVar {
        self.solver.new_var().index()
    }

    fn add_clause(&mut self, clause: &Clause) {
        let lits: Vec<varisat::Lit> = clause.lits().iter().map(|&l| Self::lit(l)).collect();
        self.solver.add_clause(&lits);
    }

    fn assume(&mut self, var: SatVar, value: bool) {
        self.assumptions.push(Self::lit(Lit::new(var, !value)));
    }

    fn solve(&mut self) -> Result<bool> {
        self.solver.assume(&self.assumptions);
        let sat = self.solver.solve();
        self.assumptions.clear();
        self.model.clear();

        let sat = sat?;
        // varisat drops its model as soon as new assumptions are set
        if sat && let Some(model) = self.solver.model() {
            for lit in model {
                let index = lit.var().index();
                if index >= self.model.len() {
                    self.model.resize(index + 1, None);
                }
                self.model[index] = Some(lit.is_positive());
            }
        }
        Ok(sat)
    }

    fn value(&self, var: SatVar) -> Option<bool> {
        self.model.get(var).copied().flatten()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn not_lit_test() {
        let l1 = Lit::positive(1);
        assert_eq!(!l1, Lit::new(1, true));
        assert_eq!(!!l1, l1);
    }

    #[test]
    fn and_clauses_test() {
        let (a, b, z) = (Lit::positive(0), Lit::new(1, true), Lit::positive(2));
        let clauses = and_clauses(a, b, z);
        assert_eq!(clauses[0].lits(), &[a, !z]);
        assert_eq!(clauses[1].lits(), &[b, !z]);
        assert_eq!(clauses[2].lits(), &[!a, !b, z]);
    }

    #[test]
    fn and_gate_test() {
        let mut engine = VarisatEngine::new();
        let a = engine.new_var();
        let b = engine.new_var();
        let z = engine.new_var();
        engine.assert_and(z, a, false, b, true);

        // z forces a = 1 and b = 0
        engine.assume(z, true);
        assert!(engine.solve().unwrap());
        assert_eq!(engine.value(a), Some(true));
        assert_eq!(engine.value(b), Some(false));

        // a = 0 and z = 1 is impossible
        engine.assume(z, true);
        engine.assume(a, false);
        assert!(!engine.solve().unwrap());
        assert_eq!(engine.value(a), None);
    }

    #[test]
    fn assumptions_are_dropped() {
        let mut engine = VarisatEngine::new();
        let a = engine.new_var();
        let b = engine.new_var();
        let x = engine.new_var();
        engine.assert_xor(x, a, false, b, false);
        engine.assert_unit(a, true);

        engine.assume(x, true);
        engine.assume(b, true);
        assert!(!engine.solve().unwrap());

        // Without the assumption on b, x can be true again
        engine.assume(x, true);
        assert!(engine.solve().unwrap());
        assert_eq!(engine.value(a), Some(true));
        assert_eq!(engine.value(b), Some(false));
    }

    #[test]
    fn model_outlives_the_assumptions() {
        let mut engine = VarisatEngine::new();
        let a = engine.new_var();
        let b = engine.new_var();
        let x = engine.new_var();
        engine.assert_xor(x, a, false, b, true);

        // x = 1 and a = 1 force b = 1
        engine.assume(x, true);
        engine.assume(a, true);
        assert!(engine.solve().unwrap());

        // Encoding more clauses does not lose the model of the last call
        let c = engine.new_var();
        engine.assert_unit(c, true);
        assert_eq!(engine.value(a), Some(true));
        assert_eq!(engine.value(b), Some(true));
        assert_eq!(engine.value(x), Some(true));
        assert_eq!(engine.value(c), None);
    }

    #[test]
    fn xor_of_equal_inputs_is_unsat() {
        // g0 = a & b and g1 = b & a
        let mut engine = VarisatEngine::new();
        let a = engine.new_var();
        let b = engine.new_var();
        let g0 = engine.new_var();
        let g1 = engine.new_var();
        let x = engine.new_var();
        engine.assert_and(g0, a, false, b, false);
        engine.assert_and(g1, b, false, a, false);
        engine.assert_xor(x, g0, false, g1, false);
        engine.assume(x, true);
        assert!(!engine.solve().unwrap());

        // g0 and !g1 do differ
        let y = engine.new_var();
        engine.assert_xor(y, g0, false, g1, true);
        engine.assume(y, true);
        assert!(engine.solve().unwrap());
    }
}
