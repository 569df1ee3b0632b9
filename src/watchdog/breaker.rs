pub const MUTATION_THRESHOLD: u32 = 100;
pub const MUTATION_WINDOW_MS: u64 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Armed,
    Tripped,
}

/// Counts observed mutation batches.
///
/// The count resets once a full window passes without a new batch. Crossing
/// the threshold trips the breaker and starts counting from zero again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationBreaker {
    iterations: u32,
    last_iteration_at: Option<u64>,
    threshold: u32,
    window_ms: u64,
}

impl Default for MutationBreaker {
    fn default() -> Self {
        Self::new(MUTATION_THRESHOLD, MUTATION_WINDOW_MS)
    }
}

impl MutationBreaker {
    pub fn new(threshold: u32, window_ms: u64) -> Self {
        Self {
            iterations: 0,
            last_iteration_at: None,
            threshold,
            window_ms,
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn record(&mut self, now_ms: u64) -> BreakerState {
        if let Some(last) = self.last_iteration_at {
            if now_ms.saturating_sub(last) >= self.window_ms {
                self.iterations = 0;
            }
        }

        self.iterations += 1;
        self.last_iteration_at = Some(now_ms);

        if self.iterations > self.threshold {
            self.reset();
            return BreakerState::Tripped;
        }

        BreakerState::Armed
    }

    pub fn reset(&mut self) {
        self.iterations = 0;
        self.last_iteration_at = None;
    }
}
