//! Fault injection policy
//!
//! The per-record failure path is exercised end-to-end by randomly failing
//! a fraction of otherwise-valid records. The policy is injected into the
//! engine rather than hard-coded so production deployments run with
//! [`NoFaults`] and only test/demo environments pay the failure rate.

use rand::Rng;

/// Default probability used by demo deployments.
pub const DEFAULT_FAULT_PROBABILITY: f64 = 0.1;

/// Decides, per record, whether to inject a synthetic failure.
pub trait FaultInjector: Send + Sync {
    fn should_fail(&self) -> bool;
}

/// Never injects failures. The production policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFaults;

impl FaultInjector for NoFaults {
    fn should_fail(&self) -> bool {
        false
    }
}

/// Fails each record independently with a fixed probability.
#[derive(Debug, Clone, Copy)]
pub struct RandomFaults {
    probability: f64,
}

impl RandomFaults {
    pub fn new(probability: f64) -> anyhow::Result<Self> {
        if !(0.0..=1.0).contains(&probability) {
            anyhow::bail!("fault probability must be within [0, 1], got {}", probability);
        }
        Ok(Self { probability })
    }
}

impl Default for RandomFaults {
    fn default() -> Self {
        Self {
            probability: DEFAULT_FAULT_PROBABILITY,
        }
    }
}

impl FaultInjector for RandomFaults {
    fn should_fail(&self) -> bool {
        rand::thread_rng().gen_bool(self.probability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_faults_never_fails() {
        let policy = NoFaults;
        assert!((0..1000).all(|_| !policy.should_fail()));
    }

    #[test]
    fn test_zero_probability_never_fails() {
        let policy = RandomFaults::new(0.0).unwrap();
        assert!((0..1000).all(|_| !policy.should_fail()));
    }

    #[test]
    fn test_full_probability_always_fails() {
        let policy = RandomFaults::new(1.0).unwrap();
        assert!((0..1000).all(|_| policy.should_fail()));
    }

    #[test]
    fn test_rejects_out_of_range_probability() {
        assert!(RandomFaults::new(1.5).is_err());
        assert!(RandomFaults::new(-0.1).is_err());
    }
}
