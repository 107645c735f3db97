//! Teacher-forcing decision policy.
//!
//! One coin flip per within-level step decides whether the ground-truth
//! previous token or the model's own argmax is fed. Step 0 always feeds
//! the forced opener. The policy is injectable so tests can pin the
//! decision.

/// Per-step decision: feed ground truth (`true`) or the model's own
/// prediction (`false`).
pub trait ForcingPolicy {
    fn use_ground_truth(&mut self, step: usize) -> bool;
}

/// Stochastic policy: ground truth with probability `ratio`, seeded for
/// reproducibility.
pub struct TeacherForcing {
    ratio: f64,
    rng: Xorshift64,
}

impl TeacherForcing {
    pub fn new(ratio: f64, seed: u64) -> Self {
        TeacherForcing {
            ratio,
            rng: Xorshift64::new(seed),
        }
    }
}

impl ForcingPolicy for TeacherForcing {
    fn use_ground_truth(&mut self, step: usize) -> bool {
        step == 0 || self.rng.next_f64() < self.ratio
    }
}

/// Always feed ground truth; equivalent to ratio 1.0 without consuming
/// randomness.
pub struct AlwaysForce;

impl ForcingPolicy for AlwaysForce {
    fn use_ground_truth(&mut self, _step: usize) -> bool {
        true
    }
}

/// Never feed ground truth past step 0; equivalent to ratio 0.0.
pub struct NeverForce;

impl ForcingPolicy for NeverForce {
    fn use_ground_truth(&mut self, step: usize) -> bool {
        step == 0
    }
}

struct Xorshift64 {
    state: u64,
}

impl Xorshift64 {
    fn new(seed: u64) -> Self {
        Self {
            state: seed | 1, // ensure non-zero
        }
    }

    fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn next_f64(&mut self) -> f64 {
        // Top 53 bits give a uniform double in [0, 1).
        (self.next() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_one_always_forces() {
        let mut policy = TeacherForcing::new(1.0, 7);
        for step in 0..200 {
            assert!(policy.use_ground_truth(step));
        }
    }

    #[test]
    fn ratio_zero_forces_only_step_zero() {
        let mut policy = TeacherForcing::new(0.0, 7);
        assert!(policy.use_ground_truth(0));
        for step in 1..200 {
            assert!(!policy.use_ground_truth(step));
        }
    }

    #[test]
    fn same_seed_same_decisions() {
        let mut a = TeacherForcing::new(0.5, 1234);
        let mut b = TeacherForcing::new(0.5, 1234);
        for step in 0..100 {
            assert_eq!(a.use_ground_truth(step), b.use_ground_truth(step));
        }
    }
}
