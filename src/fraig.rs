//! A fraig session: one circuit, its equivalence candidates, and the passes that reduce it.
//!
//! The usual flow is
//! 1. [`Fraig::strash`] to get rid of structural duplicates
//! 2. [`Fraig::random_sim`] (or [`Fraig::file_sim`]) to split the nodes into candidate classes
//! 3. [`Fraig::fraig`] to prove the candidates with SAT and merge the equivalent nodes.
//!
//! ```rust
//! use fraig::{Aig, fraig::Fraig};
//! let mut aig = Aig::new();
//! let a = aig.add_input(1).unwrap();
//! let b = aig.add_input(2).unwrap();
//! // a ^ b, twice
//! let g3 = aig.add_and(3, a, !b).unwrap();
//! let g4 = aig.add_and(4, !a, b).unwrap();
//! let g5 = aig.add_and(5, !g3, !g4).unwrap();
//! let g6 = aig.add_and(6, a, b).unwrap();
//! let g7 = aig.add_and(7, !a, !b).unwrap();
//! let g8 = aig.add_and(8, !g6, !g7).unwrap();
//! aig.add_output(!g5).unwrap();
//! aig.add_output(g8).unwrap();
//!
//! let mut fraig = Fraig::new(aig);
//! fraig.random_sim().unwrap();
//! let stats = fraig.fraig().unwrap();
//! assert_eq!(stats.merges, 1);
//! assert_eq!(fraig.aig().get_output_fanins(), vec![!g5, !g5]);
//! ```

use std::{
    io::{BufRead, Write},
    iter, mem,
    path::Path,
};

use log::{debug, info, trace};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    Aig, AigEdge, NodeId, Result,
    config::FraigConfig,
    fec::FecManager,
    prover::{ProofResult, Prover},
    sim::{Patterns, WORD_BITS, random_words, write_sim_log},
};

/// What a call to [`Fraig::fraig`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FraigStats {
    /// Calls to the SAT solver.
    pub proofs: usize,
    /// Nodes merged away.
    pub merges: usize,
    /// Refuted candidates.
    pub counterexamples: usize,
    /// Classes refined with counterexamples during the walk.
    pub resimulations: usize,
}

/// Stopping rule of the global random phase: stop when the number of candidate pairs
/// has not decreased for a while. The patience shrinks once enough rounds have improved.
struct Progress {
    best: Option<usize>,
    stall: usize,
    improvements: usize,
    patience: usize,
}

impl Progress {
    fn new(config: &FraigConfig) -> Self {
        Progress {
            best: None,
            stall: 0,
            improvements: 0,
            patience: config.stall_patience,
        }
    }

    /// Records the outcome of a round. Returns true when simulation should stop.
    fn update(&mut self, pairs: usize, config: &FraigConfig) -> bool {
        if pairs == 0 {
            return true;
        }
        if self.best.is_none_or(|best| pairs < best) {
            self.best = Some(pairs);
            self.improvements += 1;
            self.stall = 0;
        } else {
            self.stall += 1;
        }
        if self.stall > self.patience && self.stall > 2 {
            return true;
        }
        if self.improvements > config.improvement_budget {
            self.patience = self.patience.saturating_sub(config.patience_decay);
        }
        false
    }
}

/// Owns a circuit and everything needed to fraig it.
///
/// The candidate classes are only meaningful for the circuit they were computed on: every pass
/// of the session which changes the circuit clears them, and so does [`Fraig::aig_mut`].
pub struct Fraig {
    aig: Aig,
    fec: FecManager,
    config: FraigConfig,
    rng: StdRng,
    sim_log: Option<Box<dyn Write>>,
}

impl Fraig {
    pub fn new(aig: Aig) -> Self {
        Self::with_config(aig, FraigConfig::default())
    }

    pub fn with_config(aig: Aig, config: FraigConfig) -> Self {
        Fraig {
            aig,
            fec: FecManager::new(),
            rng: StdRng::seed_from_u64(config.seed),
            config,
            sim_log: None,
        }
    }

    /// Reads an ASCII AIGER file, see [`Aig::from_file`].
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(Aig::from_file(path)?))
    }

    pub fn aig(&self) -> &Aig {
        &self.aig
    }

    /// Mutable access to the circuit. The candidate classes are dropped.
    pub fn aig_mut(&mut self) -> &mut Aig {
        self.fec.clear();
        &mut self.aig
    }

    pub fn into_aig(self) -> Aig {
        self.aig
    }

    pub fn config(&self) -> &FraigConfig {
        &self.config
    }

    pub fn fec(&self) -> &FecManager {
        &self.fec
    }

    /// Every full circuit simulation round writes its patterns to `log`, see [`write_sim_log`].
    pub fn set_sim_log(&mut self, log: Option<Box<dyn Write>>) {
        self.sim_log = log;
    }

    /// See [`Aig::strash`].
    pub fn strash(&mut self) -> Result<usize> {
        self.fec.clear();
        self.aig.strash()
    }

    /// See [`Aig::simplify`].
    pub fn simplify(&mut self) -> Result<usize> {
        self.fec.clear();
        self.aig.simplify()
    }

    /// See [`Aig::sweep`].
    pub fn sweep(&mut self) -> Result<Vec<NodeId>> {
        self.fec.clear();
        self.aig.sweep()
    }

    /// Simulates one batch of patterns on the whole circuit and refines every class.
    fn simulate_round(&mut self, words: &[u64], count: usize) -> Result<()> {
        self.aig.set_input_words(words);
        if let Some(log) = self.sim_log.as_mut() {
            let outputs = self.aig.evaluate_outputs();
            write_sim_log(&mut **log, words, &outputs, count)?;
        }
        self.fec.refine_all(&mut self.aig);
        trace!(
            "{} classes, {} candidate pairs",
            self.fec.len(),
            self.fec.candidate_pairs()
        );
        Ok(())
    }

    fn report(&self, patterns: usize) {
        info!("{} patterns simulated.", patterns);
        info!("Total #FEC Group = {}", self.fec.len());
    }

    /// Random simulation. Returns the number of patterns simulated.
    ///
    /// Without candidate classes yet, the whole circuit is simulated until the number of
    /// candidate pairs stops decreasing. Then each class is simulated on its own until it has
    /// been stable for a few rounds. Small classes of very wide circuits only randomize the
    /// inputs they depend on.
    pub fn random_sim(&mut self) -> Result<usize> {
        self.aig.check_defined()?;
        let mut rounds = 0;

        if self.fec.is_empty() {
            if !self.fec.init_classes(&mut self.aig) {
                self.report(0);
                return Ok(0);
            }
            let mut progress = Progress::new(&self.config);
            while rounds < self.config.max_global_rounds {
                let words = random_words(&mut self.rng, self.aig.input_count());
                self.simulate_round(&words, WORD_BITS)?;
                rounds += 1;
                if progress.update(self.fec.candidate_pairs(), &self.config) {
                    break;
                }
            }
            debug!("global simulation: {} rounds", rounds);
        }
        rounds += self.simulate_classes();

        self.fec.sort();
        self.report(rounds * WORD_BITS);
        Ok(rounds * WORD_BITS)
    }

    /// Per class phase of [`Fraig::random_sim`]. Returns the number of rounds.
    fn simulate_classes(&mut self) -> usize {
        let width = self.aig.input_count();
        let mut rounds = 0;
        let mut class = 0;

        // Classes split off while simulating are appended, and visited later on.
        while class < self.fec.len() {
            for _ in 0..self.config.max_class_rounds {
                let size = self.fec.class(class).len();
                if size < 2 {
                    break;
                }
                let support_only = self.config.support_only(size, width);
                let limit = if support_only {
                    self.config.stable_rounds_small
                } else {
                    self.config.stable_rounds(size)
                };
                if self.fec.class(class).stable_rounds() >= limit {
                    break;
                }

                if support_only {
                    let members: Vec<NodeId> = self.fec.class(class).ids().collect();
                    let words: Vec<(NodeId, u64)> = self
                        .aig
                        .support(&members)
                        .into_iter()
                        .map(|id| (id, self.rng.random()))
                        .collect();
                    self.aig.set_some_input_words(&words);
                } else {
                    let words = random_words(&mut self.rng, width);
                    self.aig.set_input_words(&words);
                }
                self.fec.refine(&mut self.aig, class);
                rounds += 1;
            }
            class += 1;
        }
        self.fec.compact();
        debug!("class simulation: {} rounds", rounds);
        rounds
    }

    /// Simulates the patterns of a file, one pattern per line. Returns the number of patterns.
    ///
    /// The file is checked before anything is simulated: on a malformed file nothing changes.
    pub fn file_sim(&mut self, reader: impl BufRead) -> Result<usize> {
        let patterns = Patterns::parse(reader, self.aig.input_count())?;
        self.aig.check_defined()?;

        if self.fec.is_empty() && !self.fec.init_classes(&mut self.aig) {
            self.report(0);
            return Ok(0);
        }
        for batch in patterns.batches() {
            self.simulate_round(&batch.words, batch.count)?;
        }
        self.fec.sort();
        self.report(patterns.len());
        Ok(patterns.len())
    }

    /// Proves the candidates with SAT and merges every node into an equivalent one met
    /// earlier in topological order (the constant first). The classes are cleared.
    ///
    /// Runs [`Fraig::random_sim`] first if there are no classes.
    pub fn fraig(&mut self) -> Result<FraigStats> {
        self.aig.check_defined()?;
        if self.fec.is_empty() {
            self.random_sim()?;
        }
        let mut stats = FraigStats::default();
        if self.fec.is_empty() {
            info!("Total #FEC Group = 0");
            return Ok(stats);
        }

        let width = self.aig.input_count();
        let mut prover = Prover::new();
        // Representatives of each class: the nodes already walked which no other node absorbed.
        let mut reps: Vec<Vec<NodeId>> = vec![Vec::new(); self.fec.len()];
        let mut cexs: Vec<Patterns> = vec![Patterns::new(width); self.fec.len()];
        let mut pending: Vec<(NodeId, NodeId, bool)> = Vec::new();

        if let Some((class, _)) = self.fec.forget(0) {
            reps[class].push(0);
        }
        for id in self.aig.and_gates() {
            let Some((class, _)) = self.fec.forget(id) else {
                continue;
            };
            let mut merged = false;
            for k in 0..reps[class].len() {
                let rep = reps[class][k];
                // Any input words tell the polarity of two equivalent nodes.
                let (r, v) = (self.aig.evaluate(rep), self.aig.evaluate(id));
                let complement = if r == v {
                    false
                } else if r == !v {
                    true
                } else {
                    continue;
                };
                let result = prover.prove(
                    &self.aig,
                    AigEdge::new(rep, false),
                    AigEdge::new(id, complement),
                )?;
                match result {
                    ProofResult::Equal => {
                        pending.push((rep, id, complement));
                        merged = true;
                        break;
                    }
                    ProofResult::NotEqual(pattern) => {
                        stats.counterexamples += 1;
                        cexs[class].push(&pattern);
                    }
                }
            }
            if !merged {
                reps[class].push(id);
            }

            if cexs[class].len() >= self.config.cex_batch && self.fec.class(class).len() > 2 {
                let patterns = mem::replace(&mut cexs[class], Patterns::new(width));
                self.resimulate(class, &patterns, &mut reps);
                cexs.resize(self.fec.len(), Patterns::new(width));
                stats.resimulations += 1;
            }
        }
        stats.proofs = prover.proofs();

        for (survivor, victim, complement) in pending {
            info!(
                "Fraig: {} merging {}{}...",
                survivor,
                if complement { "!" } else { "" },
                victim
            );
            self.aig.merge(survivor, victim, complement)?;
            stats.merges += 1;
        }
        self.fec.clear();
        info!("Total #FEC Group = 0");
        debug!("{:?}", stats);
        Ok(stats)
    }

    /// Refines a class and the parts split off from it with counterexamples.
    ///
    /// The representatives are refined along with the members: each one ends up as a
    /// representative of the part it is still a candidate for, if any.
    fn resimulate(&mut self, class: usize, patterns: &Patterns, reps: &mut Vec<Vec<NodeId>>) {
        let before = self.fec.len();
        let walked = mem::take(&mut reps[class]);
        for &rep in &walked {
            self.fec.insert(class, rep);
        }
        for batch in patterns.batches() {
            self.aig.set_input_words(&batch.words);
            let end = self.fec.len();
            for c in iter::once(class).chain(before..end) {
                self.fec.refine(&mut self.aig, c);
            }
        }
        debug!(
            "class {} resimulated with {} counterexamples, {} new classes",
            class,
            patterns.len(),
            self.fec.len() - before
        );

        reps.resize(self.fec.len(), Vec::new());
        for rep in walked {
            if let Some((c, _)) = self.fec.forget(rep) {
                reps[c].push(rep);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::{cell::RefCell, fs::File, io::BufReader, rc::Rc};

    use super::*;
    use crate::{
        AigError, PatternError,
        testing::{exhaustive, random_aig},
    };

    /// A log that the test can still read once the session owns it.
    #[derive(Clone, Default)]
    struct SharedLog(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn pattern_file(path: &str) -> BufReader<File> {
        BufReader::new(File::open(path).unwrap())
    }

    #[test]
    fn progress_test() {
        let config = FraigConfig::default().with_stall_patience(3);
        let mut progress = Progress::new(&config);
        assert!(!progress.update(10, &config));
        assert!(!progress.update(8, &config));
        for _ in 0..3 {
            assert!(!progress.update(8, &config));
        }
        assert!(progress.update(9, &config));
        assert!(Progress::new(&config).update(0, &config));
    }

    #[test]
    fn file_sim_test() {
        let mut fraig = Fraig::from_file("assets/redundant.aag").unwrap();
        let log = SharedLog::default();
        fraig.set_sim_log(Some(Box::new(log.clone())));

        assert_eq!(fraig.file_sim(pattern_file("assets/redundant.pat")).unwrap(), 4);
        assert_eq!(
            String::from_utf8(log.0.borrow().clone()).unwrap(),
            "000 00000\n101 11110\n011 11110\n111 00001\n"
        );
        assert_eq!(fraig.fec().to_string(), "[0] 6 !9 !11 !12\n[1] 7 10\n");
    }

    #[test]
    fn bad_pattern_file_changes_nothing() {
        let mut fraig = Fraig::from_file("assets/redundant.aag").unwrap();
        fraig.file_sim(pattern_file("assets/redundant.pat")).unwrap();
        let classes = fraig.fec().to_string();
        let values: Vec<Option<u64>> = (0..=12).map(|id| fraig.aig().value(id)).collect();

        let err = fraig
            .file_sim(pattern_file("assets/bad_width.pat"))
            .unwrap_err();
        assert!(matches!(
            err,
            AigError::PatternError(PatternError::WidthMismatch { expected: 3, .. })
        ));
        assert_eq!(
            err.to_string(),
            "Pattern(10) length(2) does not match the number of inputs(3) in a circuit!!"
        );
        assert_eq!(fraig.fec().to_string(), classes);
        let after: Vec<Option<u64>> = (0..=12).map(|id| fraig.aig().value(id)).collect();
        assert_eq!(after, values);
    }

    #[test]
    fn fraig_after_file_sim() {
        let mut fraig = Fraig::from_file("assets/redundant.aag").unwrap();
        let before = exhaustive(fraig.aig_mut());
        fraig.file_sim(pattern_file("assets/redundant.pat")).unwrap();

        let stats = fraig.fraig().unwrap();
        assert_eq!(stats.merges, 3);
        assert_eq!(stats.counterexamples, 2);
        assert_eq!(stats.proofs, 5);
        assert!(fraig.fec().is_empty());

        let aig = fraig.aig_mut();
        assert_eq!(aig.and_count(), 6);
        assert!(!aig.contains(9) && !aig.contains(10) && !aig.contains(12));
        assert_eq!(
            aig.get_output_fanins(),
            vec![
                AigEdge::new(6, true),
                AigEdge::new(6, true),
                AigEdge::new(11, false),
                AigEdge::new(11, false),
                AigEdge::new(7, false),
            ]
        );
        assert!(aig.check_integrity().is_ok());
        assert_eq!(exhaustive(aig), before);
    }

    #[test]
    fn fraig_with_random_sim() {
        let mut fraig = Fraig::from_file("assets/redundant.aag").unwrap();
        assert!(fraig.random_sim().unwrap() > 0);
        // {6, !9}, {11, 12} and {7, 10}
        assert_eq!(fraig.fec().len(), 3);
        assert_eq!(fraig.fraig().unwrap().merges, 3);
        assert_eq!(fraig.aig().and_count(), 6);
    }

    #[test]
    fn contradiction_through_the_session() {
        let mut aig = Aig::new();
        let a = aig.add_input(1).unwrap();
        let g = aig.add_and(2, a, !a).unwrap();
        aig.add_output(g).unwrap();

        let mut fraig = Fraig::new(aig);
        fraig.random_sim().unwrap();
        assert!(!fraig.fec().is_empty());
        assert_eq!(fraig.simplify().unwrap(), 1);
        assert!(fraig.fec().is_empty());
        assert_eq!(fraig.aig().and_count(), 0);
        assert_eq!(
            fraig.aig().get_output_fanins(),
            vec![AigEdge::new(0, false)]
        );
    }

    #[test]
    fn constant_gate_is_merged_into_the_constant() {
        let mut aig = Aig::new();
        let a = aig.add_input(1).unwrap();
        let b = aig.add_input(2).unwrap();
        let g3 = aig.add_and(3, a, b).unwrap();
        let g4 = aig.add_and(4, g3, !a).unwrap();
        aig.add_output(!g4).unwrap();

        let mut fraig = Fraig::new(aig);
        let stats = fraig.fraig().unwrap();
        assert_eq!(stats.merges, 1);
        assert_eq!(
            fraig.aig().get_output_fanins(),
            vec![AigEdge::new(0, true)]
        );
    }

    #[test]
    fn nothing_to_fraig() {
        let mut aig = Aig::new();
        let a = aig.add_input(1).unwrap();
        aig.add_output(!a).unwrap();
        let mut fraig = Fraig::new(aig);
        assert_eq!(fraig.random_sim().unwrap(), 0);
        assert_eq!(fraig.fraig().unwrap(), FraigStats::default());
    }

    #[test]
    fn undefined_node_is_rejected() {
        let mut aig = Aig::new();
        let a = aig.add_input(1).unwrap();
        let g = aig.add_and(3, a, AigEdge::new(2, false)).unwrap();
        aig.add_output(g).unwrap();
        let mut fraig = Fraig::new(aig);
        assert!(matches!(fraig.random_sim(), Err(AigError::UndefinedNode(2))));
        assert!(matches!(fraig.fraig(), Err(AigError::UndefinedNode(2))));
    }

    #[test]
    fn random_circuits_keep_their_function() {
        for seed in 0..10 {
            let aig = random_aig(seed, 6, 60, 5);
            let config = FraigConfig::default().with_seed(seed);
            let mut fraig = Fraig::with_config(aig, config);
            let before = exhaustive(fraig.aig_mut());

            fraig.strash().unwrap();
            fraig.fraig().unwrap();
            assert!(fraig.aig().check_integrity().is_ok());
            assert_eq!(exhaustive(fraig.aig_mut()), before);

            // Nothing left to merge
            assert_eq!(fraig.fraig().unwrap().merges, 0);
        }
    }

    #[test]
    fn counterexamples_refine_the_class() {
        // 4 = 5 = a & b, 6 = 7 = a & !b, 8 = 9 = !a & b
        let mut aig = Aig::new();
        let a = aig.add_input(1).unwrap();
        let b = aig.add_input(2).unwrap();
        for (id, f0, f1) in [(4, a, b), (5, b, a), (6, a, !b), (7, !b, a), (8, !a, b), (9, b, !a)] {
            aig.add_and(id, f0, f1).unwrap();
        }
        for id in 4..=9 {
            aig.add_output(AigEdge::new(id, false)).unwrap();
        }
        let before = exhaustive(&mut aig.clone());

        // No random pattern: the constant and every gate start in one class
        let config = FraigConfig::default()
            .with_max_global_rounds(0)
            .with_max_class_rounds(0)
            .with_cex_batch(1);
        let mut fraig = Fraig::with_config(aig, config);
        assert_eq!(fraig.random_sim().unwrap(), 0);
        assert_eq!(fraig.fec().to_string(), "[0] 0 4 5 6 7 8 9\n");
        let unrefined = fraig.fec().candidate_pairs();
        assert_eq!(unrefined, 21);

        let stats = fraig.fraig().unwrap();
        assert_eq!(
            stats,
            FraigStats {
                proofs: 7,
                merges: 3,
                counterexamples: 4,
                resimulations: 2,
            }
        );
        assert!(stats.proofs < unrefined);
        // Last counterexample: a = 1, b = 0
        assert_eq!(fraig.aig().input_words(), vec![1, 0]);

        let aig = fraig.aig_mut();
        assert!(!aig.contains(5) && !aig.contains(7) && !aig.contains(9));
        assert_eq!(
            aig.get_output_fanins(),
            [4, 4, 6, 6, 8, 8].map(|id| AigEdge::new(id, false)).to_vec()
        );
        assert!(aig.check_integrity().is_ok());
        assert_eq!(exhaustive(aig), before);
    }

    #[test]
    fn counterexamples_tell_the_pair_apart() {
        for seed in 0..5 {
            let config = FraigConfig::default()
                .with_max_global_rounds(0)
                .with_max_class_rounds(0);
            let mut fraig = Fraig::with_config(random_aig(seed, 8, 60, 6), config);
            fraig.random_sim().unwrap();
            let width = fraig.aig.input_count();
            let mut prover = Prover::new();
            let mut counterexamples = 0;

            // The constant against each of its candidates in turn
            while let Some(class) = fraig.fec.class_of(0) {
                let Some(id) = fraig.fec.class(class).ids().find(|&id| id != 0) else {
                    break;
                };
                let complement = fraig.aig.evaluate(id) != fraig.aig.evaluate(0);
                let candidate = AigEdge::new(id, complement);
                let result = prover
                    .prove(&fraig.aig, AigEdge::new(0, false), candidate)
                    .unwrap();
                let ProofResult::NotEqual(pattern) = result else {
                    fraig.fec.forget(id);
                    continue;
                };
                counterexamples += 1;

                let mut patterns = Patterns::new(width);
                patterns.push(&pattern);
                fraig.fec.forget(0);
                let mut reps = vec![Vec::new(); fraig.fec.len()];
                reps[class].push(0);
                fraig.resimulate(class, &patterns, &mut reps);

                // The pattern sets the candidate to 1, the constant stays 0
                assert_eq!(fraig.aig.input_words(), patterns.batches()[0].words);
                assert_eq!(candidate.apply(fraig.aig.evaluate(id)) & 1, 1);
                let Some(rest) = reps.iter().position(|r| r.contains(&0)) else {
                    break;
                };
                assert_ne!(fraig.fec.class_of(id), Some(rest));
                fraig.fec.insert(rest, 0);
            }
            assert!(counterexamples > 0);
        }
    }

    #[test]
    fn small_counterexample_batches() {
        // Resimulating after every counterexample still gives a sound result.
        for seed in 0..5 {
            let aig = random_aig(seed, 5, 40, 4);
            let config = FraigConfig::default()
                .with_seed(seed)
                .with_cex_batch(1)
                .with_max_global_rounds(1)
                .with_max_class_rounds(0);
            let mut fraig = Fraig::with_config(aig, config);
            let before = exhaustive(fraig.aig_mut());
            fraig.fraig().unwrap();
            assert!(fraig.aig().check_integrity().is_ok());
            assert_eq!(exhaustive(fraig.aig_mut()), before);
        }
    }
}
