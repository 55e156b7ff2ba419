use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderingMode {
    Shuffled,
    Sequential,
}

/// Sample order for the current epoch. The ordering is replaced wholesale on
/// every `begin_epoch`, never edited in place.
pub struct EpochScheduler {
    sample_count: usize,
    mode: OrderingMode,
    seed: u64,
    rng: StdRng,
    ordering: Vec<usize>,
    epoch: usize,
}

impl EpochScheduler {
    /// Without a seed one is drawn from the thread rng and logged so a run can be replayed.
    pub fn new(sample_count: usize, seed: Option<u64>) -> Self {
        let seed = match seed {
            Some(seed) => seed,
            None => {
                let seed = rand::thread_rng().gen();
                info!(seed, "no shuffle seed configured, drew one");
                seed
            }
        };

        Self {
            sample_count,
            mode: OrderingMode::Shuffled,
            seed,
            rng: StdRng::seed_from_u64(seed),
            ordering: (0..sample_count).collect(),
            epoch: 0,
        }
    }

    pub fn begin_epoch(&mut self) {
        let mut ordering: Vec<usize> = (0..self.sample_count).collect();
        if self.mode == OrderingMode::Shuffled {
            ordering.shuffle(&mut self.rng);
        }
        self.ordering = ordering;
        self.epoch += 1;
        debug!(epoch = self.epoch, mode = ?self.mode, "epoch ordering regenerated");
    }

    /// Switches to identity ordering for inference. There is no way back.
    pub fn set_sequential(&mut self) {
        self.mode = OrderingMode::Sequential;
    }

    pub fn mode(&self) -> OrderingMode {
        self.mode
    }

    pub fn ordering(&self) -> &[usize] {
        &self.ordering
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn epoch(&self) -> usize {
        self.epoch
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }
}
