/// Largest number of bind parameters PostgreSQL accepts in one statement
pub const MAX_BIND_PARAMETERS: usize = 65_535;

/// Configuration for batch loading operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Maximum number of parent ids in a single `IN` query
    pub max_batch_size: usize,
    /// Run independent chunk queries concurrently
    pub parallel_execution: bool,
    /// Upper bound on chunk queries in flight when running concurrently
    pub max_parallel_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 100,
            parallel_execution: false,
            max_parallel_batches: 4,
        }
    }
}

impl BatchConfig {
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }

    pub fn parallel(mut self, max_in_flight: usize) -> Self {
        self.parallel_execution = true;
        self.max_parallel_batches = max_in_flight;
        self
    }

    /// Number of chunk queries needed for `ids` parent ids
    pub fn chunk_count(&self, ids: usize) -> usize {
        if self.max_batch_size == 0 {
            return 0;
        }
        ids.div_ceil(self.max_batch_size)
    }
}
