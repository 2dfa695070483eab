//! Functionally equivalent candidates (FEC): groups of nodes which simulation could not tell apart.
//!
//! Two nodes land in the same group when they always had the same value, or always opposite
//! values, so far. A group never merges with another one: every simulation round can only split
//! groups further. Proving that the members of a group are really equivalent is the job of the
//! [`Prover`](crate::prover::Prover).

use std::{cmp::Reverse, fmt};

use log::trace;
use rustc_hash::FxHashMap;

use crate::{Aig, NodeId};

/// Canonical simulation signature: a word and its complement share the same key,
/// the smaller of the two, and differ by their inversion flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SimKey {
    key: u64,
    inv: bool,
}

impl SimKey {
    pub fn new(word: u64) -> Self {
        if word <= !word {
            SimKey {
                key: word,
                inv: false,
            }
        } else {
            SimKey {
                key: !word,
                inv: true,
            }
        }
    }

    pub fn key(&self) -> u64 {
        self.key
    }

    /// True if the word was complemented to get the key.
    pub fn is_inverted(&self) -> bool {
        self.inv
    }
}

/// A group of candidate equivalent nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FecClass {
    members: Vec<(SimKey, NodeId)>,
    /// Number of simulation rounds in a row which did not split the group.
    stable: usize,
}

impl FecClass {
    pub fn members(&self) -> &[(SimKey, NodeId)] {
        &self.members
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.members.iter().map(|&(_, id)| id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn stable_rounds(&self) -> usize {
        self.stable
    }
}

/// Members, polarity relative to the first one: `3 !7 12`.
impl fmt::Display for FecClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(&(first, _)) = self.members.first() else {
            return Ok(());
        };
        for (k, &(key, id)) in self.members.iter().enumerate() {
            if k > 0 {
                write!(f, " ")?;
            }
            if key.inv != first.inv {
                write!(f, "!")?;
            }
            write!(f, "{}", id)?;
        }
        Ok(())
    }
}

/// Every FEC group of a circuit, with a reverse index from node to group.
///
/// Class indices are stable during a round: a split keeps the largest part at the same index
/// and appends the others, a dissolved class stays empty until [`FecManager::compact`].
#[derive(Debug, Clone, Default)]
pub struct FecManager {
    classes: Vec<FecClass>,
    index: FxHashMap<NodeId, usize>,
}

impl FecManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds one group with every and gate (in topological order) and the constant node,
    /// which nothing has distinguished yet.
    ///
    /// Returns false, leaving no group at all, if there are less than two candidates.
    pub fn init_classes(&mut self, aig: &mut Aig) -> bool {
        self.clear();
        let mut members: Vec<(SimKey, NodeId)> = aig
            .and_gates()
            .into_iter()
            .map(|id| (SimKey::default(), id))
            .collect();
        members.push((SimKey::default(), 0));
        if members.len() < 2 {
            return false;
        }
        self.classes.push(FecClass { members, stable: 0 });
        self.reindex();
        true
    }

    /// Number of classes (dissolved ones included until they are compacted).
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn classes(&self) -> &[FecClass] {
        &self.classes
    }

    pub fn class(&self, class: usize) -> &FecClass {
        &self.classes[class]
    }

    /// Index of the class of a node, if it is in one.
    pub fn class_of(&self, id: NodeId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Number of candidate pairs: a class of `n` nodes holds `n (n - 1) / 2` of them.
    pub fn candidate_pairs(&self) -> usize {
        self.classes
            .iter()
            .map(|c| c.len() * c.len().saturating_sub(1) / 2)
            .sum()
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (k, class) in self.classes.iter().enumerate() {
            for id in class.ids() {
                self.index.insert(id, k);
            }
        }
    }

    /// Recomputes the keys of a class from the current simulation values.
    ///
    /// If every member still agrees, the class gets one more stable round. Otherwise the class is
    /// partitioned by key: the largest part (the first one met on ties) replaces the class, the
    /// other parts with at least two members are appended as new classes, the rest is dropped.
    /// Returns true if the class was split.
    pub fn refine(&mut self, aig: &mut Aig, class: usize) -> bool {
        let members = &mut self.classes[class].members;
        for m in members.iter_mut() {
            m.0 = SimKey::new(aig.evaluate(m.1));
        }
        let Some(&(first, _)) = members.first() else {
            return false;
        };
        if members.len() > 1 && members.iter().all(|(k, _)| k.key == first.key) {
            self.classes[class].stable += 1;
            return false;
        }

        let members = std::mem::take(members);
        for &(_, id) in &members {
            self.index.remove(&id);
        }

        // Parts in order of first appearance
        let mut parts: Vec<Vec<(SimKey, NodeId)>> = Vec::new();
        let mut slot: FxHashMap<u64, usize> =
            FxHashMap::with_capacity_and_hasher(members.len(), Default::default());
        for m in members {
            let k = *slot.entry(m.0.key).or_insert_with(|| {
                parts.push(Vec::new());
                parts.len() - 1
            });
            parts[k].push(m);
        }
        parts.retain(|p| p.len() >= 2);

        self.classes[class].stable = 0;
        let Some(best) = (0..parts.len()).max_by_key(|&k| (parts[k].len(), Reverse(k))) else {
            trace!("class {} dissolved", class);
            return true;
        };
        self.classes[class].members = parts.remove(best);
        for id in self.classes[class].ids() {
            self.index.insert(id, class);
        }
        for part in parts {
            let k = self.classes.len();
            for &(_, id) in &part {
                self.index.insert(id, k);
            }
            self.classes.push(FecClass {
                members: part,
                stable: 0,
            });
        }
        trace!("class {} split, {} classes", class, self.classes.len());
        true
    }

    /// Refines every class against the current simulation values, then compacts.
    pub fn refine_all(&mut self, aig: &mut Aig) {
        let n = self.classes.len();
        for class in 0..n {
            if self.classes[class].len() < 2 {
                self.dissolve(class);
            } else {
                self.refine(aig, class);
            }
        }
        self.compact();
    }

    fn dissolve(&mut self, class: usize) {
        for (_, id) in std::mem::take(&mut self.classes[class].members) {
            self.index.remove(&id);
        }
    }

    /// Drops the dissolved classes, keeping the others in order.
    pub fn compact(&mut self) {
        if self.classes.iter().any(FecClass::is_empty) {
            self.classes.retain(|c| !c.is_empty());
            self.reindex();
        }
    }

    /// Takes a node out of its class. Returns the class it was in and its key.
    pub fn forget(&mut self, id: NodeId) -> Option<(usize, SimKey)> {
        let class = self.index.remove(&id)?;
        let members = &mut self.classes[class].members;
        let pos = members.iter().position(|&(_, m)| m == id)?;
        let (key, _) = members.remove(pos);
        Some((class, key))
    }

    /// Puts a node back into a class, with a key left to the next [`FecManager::refine`].
    pub fn insert(&mut self, class: usize, id: NodeId) {
        self.classes[class].members.push((SimKey::default(), id));
        self.index.insert(id, class);
    }

    /// Sorts members by id, and classes by their first member.
    pub fn sort(&mut self) {
        self.classes.retain(|c| c.len() >= 2);
        for class in &mut self.classes {
            class.members.sort_by_key(|&(_, id)| id);
        }
        self.classes.sort_by_key(|c| c.members[0].1);
        self.reindex();
    }

    pub fn clear(&mut self) {
        self.classes.clear();
        self.index.clear();
    }
}

impl fmt::Display for FecManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, class) in self.classes.iter().enumerate() {
            writeln!(f, "[{}] {}", k, class)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{AigEdge, sim::random_words, testing::random_aig};

    #[test]
    fn sim_key_test() {
        assert_eq!(SimKey::new(0), SimKey::new(0));
        assert_eq!(SimKey::new(u64::MAX).key(), 0);
        assert!(SimKey::new(u64::MAX).is_inverted());
        assert_eq!(SimKey::new(0xf0).key(), SimKey::new(!0xf0).key());
        assert_ne!(
            SimKey::new(0xf0).is_inverted(),
            SimKey::new(!0xf0).is_inverted()
        );
    }

    /// 3 = a & b, 4 = b & a, 5 = a & !b, 6 = !3 & !4 (= !(a & b)), output each of them.
    fn circuit() -> Aig {
        let mut aig = Aig::new();
        let a = aig.add_input(1).unwrap();
        let b = aig.add_input(2).unwrap();
        let g3 = aig.add_and(3, a, b).unwrap();
        let g4 = aig.add_and(4, b, a).unwrap();
        let g5 = aig.add_and(5, a, !b).unwrap();
        let g6 = aig.add_and(6, !g3, !g4).unwrap();
        for g in [g3, g4, g5, g6] {
            aig.add_output(g).unwrap();
        }
        aig
    }

    #[test]
    fn init_classes_test() {
        let mut aig = circuit();
        let mut fec = FecManager::new();
        assert!(fec.init_classes(&mut aig));
        assert_eq!(fec.len(), 1);
        assert_eq!(fec.class(0).ids().collect::<Vec<_>>(), vec![3, 4, 5, 6, 0]);
        assert_eq!(fec.class_of(5), Some(0));
        assert_eq!(fec.class_of(1), None);

        let mut empty = Aig::new();
        empty.add_input(1).unwrap();
        assert!(!fec.init_classes(&mut empty));
        assert!(fec.is_empty());
    }

    #[test]
    fn refine_test() {
        let mut aig = circuit();
        let mut fec = FecManager::new();
        fec.init_classes(&mut aig);

        // a = 1100, b = 1010: 3 = 4 = 1000, 5 = 0100, 6 = !1000, const = 0000
        aig.set_input_words(&[0b1100, 0b1010]);
        assert!(fec.refine(&mut aig, 0));
        assert_eq!(fec.len(), 1);
        assert_eq!(fec.class(0).ids().collect::<Vec<_>>(), vec![3, 4, 6]);
        assert_eq!(fec.class(0).to_string(), "3 4 !6");
        // 5 and the constant are alone
        assert_eq!(fec.class_of(5), None);
        assert_eq!(fec.class_of(0), None);

        // Nothing new
        assert!(!fec.refine(&mut aig, 0));
        assert_eq!(fec.class(0).stable_rounds(), 1);
    }

    #[test]
    fn split_appends_and_dissolves() {
        let mut aig = circuit();
        let mut fec = FecManager::new();
        fec.init_classes(&mut aig);

        // Only a = 1, b = 0: 5 = 1, everything else 0, so no split yet (5 is the complement of 0)
        aig.set_input_words(&[u64::MAX, 0]);
        fec.refine_all(&mut aig);
        assert_eq!(fec.len(), 1);
        assert_eq!(fec.class(0).to_string(), "3 4 !5 !6 0");

        // a = b = 0: 6 = 1, 5 = 0
        aig.set_input_words(&[0, 0]);
        fec.refine_all(&mut aig);
        assert_eq!(fec.class(0).to_string(), "3 4 5 !6 0");

        // a = 1100, b = 1010: {3, 4, !6} and {5} and {0}
        aig.set_input_words(&[0b1100, 0b1010]);
        fec.refine_all(&mut aig);
        assert_eq!(fec.len(), 1);
        assert_eq!(fec.candidate_pairs(), 3);

        // Taking members out until the class is too small
        assert_eq!(fec.forget(4).map(|(c, _)| c), Some(0));
        assert_eq!(fec.forget(4), None);
        fec.forget(3);
        fec.refine_all(&mut aig);
        assert!(fec.is_empty());
    }

    #[test]
    fn forgotten_node_goes_back() {
        let mut aig = circuit();
        let mut fec = FecManager::new();
        fec.init_classes(&mut aig);
        assert_eq!(fec.forget(0).map(|(c, _)| c), Some(0));
        assert_eq!(fec.class_of(0), None);

        fec.insert(0, 0);
        assert_eq!(fec.class_of(0), Some(0));
        // a = 1100, b = 1010: 5 and 0 are apart
        aig.set_input_words(&[0b1100, 0b1010]);
        fec.refine(&mut aig, 0);
        assert_eq!(fec.class(0).to_string(), "3 4 !6");
        assert_eq!(fec.class_of(0), None);
        assert_eq!(fec.class_of(5), None);
    }

    #[test]
    fn largest_part_keeps_the_index() {
        // 3 and 4 equal, 5, 6 and 7 equal
        let mut aig = Aig::new();
        let a = aig.add_input(1).unwrap();
        let b = aig.add_input(2).unwrap();
        for (id, f0, f1) in [(3, a, b), (4, b, a), (5, a, !b), (6, !b, a), (7, a, !b)] {
            aig.add_and(id, f0, f1).unwrap();
        }
        // Output ids come after the gates
        for id in 3..=7 {
            aig.add_output(AigEdge::new(id, false)).unwrap();
        }
        assert_eq!(aig.get_outputs(), &[8, 9, 10, 11, 12]);
        let mut fec = FecManager::new();
        fec.init_classes(&mut aig);
        aig.set_input_words(&[0b1100, 0b1010]);
        fec.refine(&mut aig, 0);

        assert_eq!(fec.len(), 2);
        assert_eq!(fec.class(0).ids().collect::<Vec<_>>(), vec![5, 6, 7]);
        assert_eq!(fec.class(1).ids().collect::<Vec<_>>(), vec![3, 4]);
        assert_eq!(fec.class_of(3), Some(1));
        assert_eq!(fec.to_string(), "[0] 5 6 7\n[1] 3 4\n");

        fec.sort();
        assert_eq!(fec.to_string(), "[0] 3 4\n[1] 5 6 7\n");
        assert_eq!(fec.class_of(6), Some(1));
    }

    #[test]
    fn candidate_pairs_never_increase() {
        for seed in 0..10 {
            let mut aig = random_aig(seed, 8, 60, 6);
            let mut rng = StdRng::seed_from_u64(seed);
            let mut fec = FecManager::new();
            fec.init_classes(&mut aig);
            let mut pairs = fec.candidate_pairs();
            for _ in 0..10 {
                let words = random_words(&mut rng, aig.input_count());
                aig.set_input_words(&words);
                fec.refine_all(&mut aig);
                let now = fec.candidate_pairs();
                assert!(now <= pairs);
                pairs = now;
                for class in fec.classes() {
                    assert!(class.len() >= 2);
                    let first = aig.evaluate(class.members()[0].1);
                    for id in class.ids() {
                        let w = aig.evaluate(id);
                        assert!(w == first || w == !first);
                    }
                }
            }
        }
    }
}
