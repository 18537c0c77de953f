//! Suite tunables.

use std::time::Duration;

use hidl_memory::ASHMEM_INSTANCE;

/// How long a case waits for a callback it expects never to arrive.
pub const SHORT_TIMEOUT_PERIOD: Duration = Duration::from_secs(1);

/// Seed for the payload RNG, applied once per suite.
pub const DEFAULT_RNG_SEED: u64 = 1234;

/// Size of the random model payload.
pub const RANDOM_MODEL_SIZE: u64 = 100;

#[derive(Debug, Clone)]
pub struct SuiteConfig {
    pub short_timeout: Duration,
    pub rng_seed: u64,
    pub random_model_size: u64,
    /// Instance of the shared memory allocator service.
    pub allocator_instance: String,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            short_timeout: SHORT_TIMEOUT_PERIOD,
            rng_seed: DEFAULT_RNG_SEED,
            random_model_size: RANDOM_MODEL_SIZE,
            allocator_instance: ASHMEM_INSTANCE.to_owned(),
        }
    }
}
