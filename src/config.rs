//! Tuning knobs of the simulation and fraig passes.

/// Parameters of a [`Fraig`](crate::fraig::Fraig) session.
///
/// The defaults are the usual ones: they give a good partition on circuits from a few gates
/// to a few hundred thousand gates. Every field has a `with_` setter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FraigConfig {
    /// Seed of the pattern generator, so that runs are reproducible.
    pub seed: u64,
    /// Counterexamples gathered on a class before it is resimulated.
    pub cex_batch: usize,
    /// Global rounds without improvement tolerated at first.
    pub stall_patience: usize,
    /// How much the patience shrinks per round once the improvement budget is spent.
    pub patience_decay: usize,
    /// Number of improving rounds after which the patience starts to shrink.
    pub improvement_budget: usize,
    /// Hard limit on global rounds.
    pub max_global_rounds: usize,
    /// Classes smaller than this are small.
    pub small_class: usize,
    /// Stable rounds required before leaving a small class.
    pub stable_rounds_small: usize,
    /// Stable rounds required before leaving a large class.
    pub stable_rounds_large: usize,
    /// Classes smaller than this only randomize their support...
    pub support_sim_class: usize,
    /// ...on circuits with more inputs than this.
    pub support_sim_inputs: usize,
    /// Hard limit on the rounds spent on a single class.
    pub max_class_rounds: usize,
}

impl Default for FraigConfig {
    fn default() -> Self {
        FraigConfig {
            seed: 0,
            cex_batch: 255,
            stall_patience: 20,
            patience_decay: 3,
            improvement_budget: 10,
            max_global_rounds: 256,
            small_class: 10,
            stable_rounds_small: 3,
            stable_rounds_large: 5,
            support_sim_class: 5,
            support_sim_inputs: 2000,
            max_class_rounds: 64,
        }
    }
}

impl FraigConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_cex_batch(mut self, cex_batch: usize) -> Self {
        self.cex_batch = cex_batch;
        self
    }

    pub fn with_stall_patience(mut self, stall_patience: usize) -> Self {
        self.stall_patience = stall_patience;
        self
    }

    pub fn with_patience_decay(mut self, patience_decay: usize) -> Self {
        self.patience_decay = patience_decay;
        self
    }

    pub fn with_improvement_budget(mut self, improvement_budget: usize) -> Self {
        self.improvement_budget = improvement_budget;
        self
    }

    pub fn with_max_global_rounds(mut self, max_global_rounds: usize) -> Self {
        self.max_global_rounds = max_global_rounds;
        self
    }

    pub fn with_small_class(mut self, small_class: usize) -> Self {
        self.small_class = small_class;
        self
    }

    pub fn with_stable_rounds(mut self, small: usize, large: usize) -> Self {
        self.stable_rounds_small = small;
        self.stable_rounds_large = large;
        self
    }

    pub fn with_support_sim(mut self, max_class: usize, min_inputs: usize) -> Self {
        self.support_sim_class = max_class;
        self.support_sim_inputs = min_inputs;
        self
    }

    pub fn with_max_class_rounds(mut self, max_class_rounds: usize) -> Self {
        self.max_class_rounds = max_class_rounds;
        self
    }

    /// Stable rounds required before leaving a class of `size` nodes.
    pub fn stable_rounds(&self, size: usize) -> usize {
        if size < self.small_class {
            self.stable_rounds_small
        } else {
            self.stable_rounds_large
        }
    }

    /// True if a class of `size` nodes in a circuit of `inputs` inputs only randomizes its support.
    pub fn support_only(&self, size: usize, inputs: usize) -> bool {
        size < self.support_sim_class && inputs > self.support_sim_inputs
    }
}
