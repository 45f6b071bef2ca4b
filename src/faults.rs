use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use tokio::time::Duration;

/// Failure and latency injection for the simulated backend. An explicit,
/// seedable policy object rather than an ambient random source, so tests can
/// run deterministically or disable injection entirely.
pub struct FaultPolicy {
    mode: FaultMode,
}

enum FaultMode {
    Random(Mutex<StdRng>),
    Disabled,
    AlwaysFail,
}

impl FaultPolicy {
    /// Entropy-seeded randomness; production behavior.
    pub fn random() -> Self {
        Self {
            mode: FaultMode::Random(Mutex::new(StdRng::from_os_rng())),
        }
    }

    /// Reproducible randomness for tests that want realistic interleavings.
    pub fn seeded(seed: u64) -> Self {
        Self {
            mode: FaultMode::Random(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    /// No injected failures and zero latency; the deterministic test mode.
    pub fn disabled() -> Self {
        Self {
            mode: FaultMode::Disabled,
        }
    }

    /// Every failure check fires. Used to exercise rollback and atomicity.
    pub fn always_fail() -> Self {
        Self {
            mode: FaultMode::AlwaysFail,
        }
    }

    pub fn should_fail(&self, rate: f64) -> bool {
        match &self.mode {
            FaultMode::Random(rng) => {
                let mut rng = match rng.lock() {
                    Ok(rng) => rng,
                    Err(poisoned) => poisoned.into_inner(),
                };
                rng.random_range(0.0..1.0) < rate
            }
            FaultMode::Disabled => false,
            FaultMode::AlwaysFail => true,
        }
    }

    pub fn latency(&self, min_ms: u64, max_ms: u64) -> Duration {
        match &self.mode {
            FaultMode::Random(rng) => {
                let mut rng = match rng.lock() {
                    Ok(rng) => rng,
                    Err(poisoned) => poisoned.into_inner(),
                };
                Duration::from_millis(rng.random_range(min_ms..=max_ms))
            }
            // Suspension points still exist under the disabled policy, the
            // wait is just zero-length.
            FaultMode::Disabled | FaultMode::AlwaysFail => Duration::from_millis(0),
        }
    }
}
