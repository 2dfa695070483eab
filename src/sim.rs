//! Bit-parallel simulation: every signal carries a 64-bit word, i.e. 64 patterns at once.
//!
//! Values are cached in the nodes and stamped with the simulation epoch of the [`Aig`]:
//! assigning new input words (or editing the function of the circuit) makes every cached
//! value stale in O(1), and [`Aig::evaluate`] only recomputes what is stale.

use std::io::{BufRead, Write};

use rand::Rng;

use crate::{Aig, AigError, AigNode, NodeId, PatternError, Result};

/// Number of patterns packed in a simulation word.
pub const WORD_BITS: usize = 64;

impl Aig {
    /// Current word of a node, whether it is fresh or not.
    fn word(&self, id: NodeId) -> u64 {
        self.entry(id).map_or(0, |e| e.value)
    }

    /// Value of a node if it was evaluated since the last input assignment.
    pub fn value(&self, id: NodeId) -> Option<u64> {
        self.entry(id)
            .filter(|e| e.sim_stamp == self.sim_epoch())
            .map(|e| e.value)
    }

    /// Evaluates a node under the current input words, reusing every fresh value of its cone.
    ///
    /// The constant and undefined nodes evaluate to 0. Panics if the node is not in the AIG.
    pub fn evaluate(&mut self, id: NodeId) -> u64 {
        let epoch = self.sim_epoch();
        let mut stack = vec![(id, false)];

        while let Some((n, expanded)) = stack.pop() {
            let Some(entry) = self.entry(n) else {
                panic!("cannot evaluate node {} which is not in the AIG", n)
            };
            if entry.sim_stamp == epoch {
                continue;
            }
            let value = match entry.node {
                AigNode::False | AigNode::Undefined(_) => 0,
                AigNode::Input { .. } => entry.value,
                AigNode::And { fanin0, fanin1, .. } => {
                    if !expanded {
                        stack.push((n, true));
                        stack.push((fanin1.node, false));
                        stack.push((fanin0.node, false));
                        continue;
                    }
                    fanin0.apply(self.word(fanin0.node)) & fanin1.apply(self.word(fanin1.node))
                }
                AigNode::Output { fanin, .. } => {
                    if !expanded {
                        stack.push((n, true));
                        stack.push((fanin.node, false));
                        continue;
                    }
                    fanin.apply(self.word(fanin.node))
                }
            };
            if let Some(e) = self.entry_mut(n) {
                e.value = value;
                e.sim_stamp = epoch;
            }
        }
        self.word(id)
    }

    /// Assigns one word per primary input, in input order. Every other value becomes stale.
    ///
    /// Panics if the number of words is not the number of inputs, see [`Aig::simulate`]
    /// for the checked version.
    pub fn set_input_words(&mut self, words: &[u64]) {
        assert_eq!(
            words.len(),
            self.input_count(),
            "one simulation word per input is expected"
        );
        let epoch = self.new_sim_epoch();
        for (i, &word) in words.iter().enumerate() {
            let id = self.get_inputs()[i];
            if let Some(e) = self.entry_mut(id) {
                e.value = word;
                e.sim_stamp = epoch;
            }
        }
    }

    /// Reassigns some inputs only, the others keep their current word.
    pub fn set_some_input_words(&mut self, words: &[(NodeId, u64)]) {
        let epoch = self.new_sim_epoch();
        for &(id, word) in words {
            match self.entry_mut(id) {
                Some(e) if e.node.is_input() => {
                    e.value = word;
                    e.sim_stamp = epoch;
                }
                _ => panic!("node {} is not an input", id),
            }
        }
    }

    /// Current input words, in input order.
    pub fn input_words(&self) -> Vec<u64> {
        self.get_inputs().iter().map(|&id| self.word(id)).collect()
    }

    /// Evaluates every output under the current input words.
    pub fn evaluate_outputs(&mut self) -> Vec<u64> {
        let outputs = self.get_outputs().to_vec();
        outputs.into_iter().map(|o| self.evaluate(o)).collect()
    }

    /// Simulates 64 patterns at once: one word per primary input, in input order.
    /// Returns one word per primary output, in output order.
    ///
    /// Fails if the number of words does not match, or if a node reachable from an output
    /// is undefined.
    ///
    /// ```rust
    /// use fraig::Aig;
    /// let mut aig = Aig::new();
    /// let a = aig.add_input(1).unwrap();
    /// let b = aig.add_input(2).unwrap();
    /// let g = aig.add_and(3, !a, !b).unwrap();
    /// aig.add_output(!g).unwrap();
    /// // a | b
    /// assert_eq!(aig.simulate(&[0b1100, 0b1010]).unwrap(), vec![0b1110]);
    /// ```
    pub fn simulate(&mut self, words: &[u64]) -> Result<Vec<u64>> {
        if words.len() != self.input_count() {
            return Err(AigError::InputWidth {
                expected: self.input_count(),
                got: words.len(),
            });
        }
        self.check_defined()?;
        self.set_input_words(words);
        Ok(self.evaluate_outputs())
    }
}

/// One pseudo random word per input.
pub fn random_words<R: Rng>(rng: &mut R, n: usize) -> Vec<u64> {
    (0..n).map(|_| rng.random()).collect()
}

/// Up to 64 patterns packed into one word per input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub words: Vec<u64>,
    /// Number of meaningful bits in each word.
    pub count: usize,
}

/// A list of simulation patterns, packed by batches of 64: the k-th pattern of a batch is bit k.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patterns {
    width: usize,
    batches: Vec<Batch>,
    len: usize,
}

impl Patterns {
    /// No pattern yet, each of them will assign `width` inputs.
    pub fn new(width: usize) -> Self {
        Patterns {
            width,
            batches: Vec::new(),
            len: 0,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    /// Appends a pattern. Panics if it does not assign exactly `width` inputs.
    pub fn push(&mut self, bits: &[bool]) {
        assert_eq!(bits.len(), self.width, "pattern width mismatch");
        if self.batches.last().is_none_or(|b| b.count == WORD_BITS) {
            self.batches.push(Batch {
                words: vec![0; self.width],
                count: 0,
            });
        }
        let last = self.batches.len() - 1;
        let batch = &mut self.batches[last];
        for (word, &bit) in batch.words.iter_mut().zip(bits) {
            if bit {
                *word |= 1 << batch.count;
            }
        }
        batch.count += 1;
        self.len += 1;
    }

    /// Reads a pattern file: one pattern per line, made of `0` and `1` only, one character per input.
    /// Blank lines are skipped.
    ///
    /// The whole file is checked before anything is returned, so a bad file has no effect at all.
    pub fn parse(reader: impl BufRead, width: usize) -> Result<Self> {
        let mut patterns = Patterns::new(width);
        let mut bits = Vec::with_capacity(width);
        for line in reader.lines() {
            let line = line?;
            let pattern = line.trim();
            if pattern.is_empty() {
                continue;
            }
            if pattern.len() != width {
                return Err(PatternError::WidthMismatch {
                    pattern: pattern.to_string(),
                    expected: width,
                }
                .into());
            }
            bits.clear();
            for c in pattern.chars() {
                match c {
                    '0' => bits.push(false),
                    '1' => bits.push(true),
                    found => {
                        return Err(PatternError::InvalidCharacter {
                            pattern: pattern.to_string(),
                            found,
                        }
                        .into());
                    }
                }
            }
            patterns.push(&bits);
        }
        Ok(patterns)
    }
}

/// Writes `count` simulated patterns, one per line: input bits, a space, output bits.
pub fn write_sim_log(
    log: &mut dyn Write,
    inputs: &[u64],
    outputs: &[u64],
    count: usize,
) -> std::io::Result<()> {
    let bit = |w: u64, k: usize| if (w >> k) & 1 == 1 { '1' } else { '0' };
    for k in 0..count {
        let mut line: String = inputs.iter().map(|&w| bit(w, k)).collect();
        line.push(' ');
        line.extend(outputs.iter().map(|&w| bit(w, k)));
        writeln!(log, "{}", line)?;
    }
    Ok(())
}
