//! Functional reduction of And-Inverter Graphs (FRAIG).
//!
//! An [`Aig`] is reduced in three steps, each one more expensive than the previous:
//! - structural hashing merges the and gates reading the same fanins ([`Aig::strash`])
//! - bit-parallel simulation groups the nodes which could be equivalent ([`fec`])
//! - a SAT solver proves or refutes each candidate ([`prover`]), refuted candidates
//!   give counterexamples which are simulated in turn.
//!
//! [`fraig::Fraig`] owns a circuit and runs these passes.

pub mod aig;
pub mod cnf;
pub mod config;
pub mod fec;
pub mod fraig;
pub mod prover;
pub mod sim;

#[cfg(test)]
mod testing;

// Re-exporting symbols and modules.
pub use aig::dfs;
pub use aig::{
    Aig, AigEdge, AigError, AigNode, FaninId, NodeId, ParserError, PatternError, Result,
};
