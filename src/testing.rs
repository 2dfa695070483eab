//! Helpers shared by the unit tests: seeded random circuits and exhaustive simulation.

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{Aig, AigEdge, NodeId, sim::WORD_BITS};

/// Random circuit with inputs `1..=n_inputs`, and gates numbered right after them.
///
/// Fanins are picked among the previous nodes (the constant included), some gates repeat an
/// earlier gate with swapped fanins so that there is something to hash. Outputs read the last
/// gates.
pub(crate) fn random_aig(seed: u64, n_inputs: usize, n_ands: usize, n_outputs: usize) -> Aig {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut aig = Aig::with_max_var(n_inputs + n_ands);
    for id in 1..=n_inputs {
        aig.add_input(id).unwrap();
    }
    let mut gates: Vec<(AigEdge, AigEdge)> = Vec::new();
    for k in 0..n_ands {
        let id = n_inputs + 1 + k;
        let (f0, f1) = if !gates.is_empty() && rng.random_bool(0.15) {
            let (f0, f1) = gates[rng.random_range(0..gates.len())];
            (f1, f0)
        } else {
            let mut pick = || {
                let node: NodeId = if rng.random_bool(0.03) {
                    0
                } else {
                    rng.random_range(1..id)
                };
                AigEdge::new(node, rng.random_bool(0.5))
            };
            (pick(), pick())
        };
        gates.push((f0, f1));
        aig.add_and(id, f0, f1).unwrap();
    }
    let last = n_inputs + n_ands;
    for k in 0..n_outputs {
        let id = last.saturating_sub(k).max(1);
        aig.add_output(AigEdge::new(id, k % 2 == 1)).unwrap();
    }
    aig
}

/// Input words enumerating every assignment of `n` inputs, by batches of 64 patterns.
/// Pattern `p` assigns bit `i` of `p` to input `i`.
pub(crate) fn exhaustive_batches(n: usize) -> Vec<Vec<u64>> {
    assert!(n <= 16);
    let total = 1usize << n;
    let batches = total.div_ceil(WORD_BITS);
    (0..batches)
        .map(|b| {
            (0..n)
                .map(|i| {
                    (0..WORD_BITS).fold(0u64, |word, k| {
                        let p = (b * WORD_BITS + k) % total;
                        word | ((((p >> i) & 1) as u64) << k)
                    })
                })
                .collect()
        })
        .collect()
}

/// Output words for every input assignment.
pub(crate) fn exhaustive(aig: &mut Aig) -> Vec<Vec<u64>> {
    exhaustive_batches(aig.input_count())
        .iter()
        .map(|words| aig.simulate(words).unwrap())
        .collect()
}

/// Words of a node for every input assignment.
pub(crate) fn exhaustive_node(aig: &mut Aig, id: NodeId) -> Vec<u64> {
    exhaustive_batches(aig.input_count())
        .iter()
        .map(|words| {
            aig.set_input_words(words);
            aig.evaluate(id)
        })
        .collect()
}
