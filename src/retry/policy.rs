//! Backoff policy: exponential growth with a cap and full jitter.

use std::fmt;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Exponential backoff configuration with full jitter.
///
/// The pre-jitter delay for attempt `n` (1-based) is
/// `min(initial_delay × multiplier^(n-1), max_delay)`, grown one step at a time
/// and capped at every step. The delay actually returned by
/// [`get_delay`](Self::get_delay) is drawn uniformly from `[0, capped]`.
///
/// No validation is performed: a multiplier below `1.0` produces shrinking
/// delays and a zero initial delay produces zero delays.
///
/// # Generator state
///
/// Each policy owns its own generator, seeded from the OS entropy source at
/// construction. [`get_delay`](Self::get_delay) advances it and therefore takes
/// `&mut self`; one policy serves one retry sequence at a time. Cloning a policy
/// re-seeds the clone, so two clones never replay the same jitter.
///
/// # Examples
///
/// ```rust
/// use reprise::BackoffPolicy;
/// use std::time::Duration;
///
/// let mut policy = BackoffPolicy::new(
///     Duration::from_millis(100),
///     2.0,
///     Duration::from_secs(1),
/// );
///
/// assert_eq!(policy.capped_delay(1), Duration::from_millis(100));
/// assert_eq!(policy.capped_delay(3), Duration::from_millis(400));
/// assert_eq!(policy.capped_delay(10), Duration::from_secs(1));
///
/// let delay = policy.get_delay(3);
/// assert!(delay <= Duration::from_millis(400));
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BackoffPolicy {
    initial_delay: Duration,
    multiplier: f64,
    max_delay: Duration,
    #[cfg_attr(feature = "serde", serde(skip, default = "entropy_rng"))]
    rng: StdRng,
}

impl BackoffPolicy {
    /// Default delay before the first retry.
    pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);
    /// Default growth factor.
    pub const DEFAULT_MULTIPLIER: f64 = 2.0;
    /// Default delay cap.
    pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(5 * 60);

    /// Create a policy with the given timing parameters.
    pub fn new(initial_delay: Duration, multiplier: f64, max_delay: Duration) -> Self {
        Self {
            initial_delay,
            multiplier,
            max_delay,
            rng: entropy_rng(),
        }
    }

    /// Re-seed the generator with a fixed seed.
    ///
    /// Two policies with equal parameters and equal seeds produce the same
    /// delay sequence.
    ///
    /// ```rust
    /// use reprise::BackoffPolicy;
    ///
    /// let mut a = BackoffPolicy::default().with_seed(7);
    /// let mut b = BackoffPolicy::default().with_seed(7);
    /// assert_eq!(a.get_delay(4), b.get_delay(4));
    /// ```
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Delay before the first retry.
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Growth factor applied per attempt.
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Cap applied before jitter.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// The pre-jitter delay for `attempt` (1-based).
    ///
    /// Attempts `0` and `1` both yield `initial_delay` (capped at `max_delay`);
    /// the growth loop runs `attempt - 1` times.
    pub fn capped_delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.capped_millis(attempt))
    }

    /// Sample the randomized delay for `attempt` (1-based).
    ///
    /// The result lies in `[0, capped_delay(attempt)]`. Advances the internal
    /// generator, so repeated calls with the same attempt generally differ.
    pub fn get_delay(&mut self, attempt: u32) -> Duration {
        let cap = self.capped_millis(attempt);
        Duration::from_millis(self.rng.random_range(0..=cap))
    }

    fn capped_millis(&self, attempt: u32) -> u64 {
        let max = self.max_delay.as_millis() as f64;
        let mut current = (self.initial_delay.as_millis() as f64).min(max);

        for _ in 1..attempt {
            let next = current * self.multiplier;
            current = if next.is_nan() || next < 0.0 {
                0.0
            } else {
                next.min(max)
            };
            // Zero is a fixed point, and so is the cap for a non-shrinking factor.
            if current == 0.0 || (self.multiplier >= 1.0 && current >= max) {
                break;
            }
        }

        current as u64
    }
}

impl Default for BackoffPolicy {
    /// 1 second initial delay, multiplier `2.0`, 5 minute cap.
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_INITIAL_DELAY,
            Self::DEFAULT_MULTIPLIER,
            Self::DEFAULT_MAX_DELAY,
        )
    }
}

impl Clone for BackoffPolicy {
    fn clone(&self) -> Self {
        Self::new(self.initial_delay, self.multiplier, self.max_delay)
    }
}

impl fmt::Debug for BackoffPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackoffPolicy")
            .field("initial_delay", &self.initial_delay)
            .field("multiplier", &self.multiplier)
            .field("max_delay", &self.max_delay)
            .finish_non_exhaustive()
    }
}

impl PartialEq for BackoffPolicy {
    /// Compares configuration only; generator state is ignored.
    fn eq(&self, other: &Self) -> bool {
        self.initial_delay == other.initial_delay
            && self.multiplier == other.multiplier
            && self.max_delay == other.max_delay
    }
}

fn entropy_rng() -> StdRng {
    StdRng::from_os_rng()
}

#[cfg(test)]
mod policy_tests {
    use super::*;

    fn policy(initial_ms: u64, multiplier: f64, max_ms: u64) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_millis(initial_ms),
            multiplier,
            Duration::from_millis(max_ms),
        )
    }

    #[test]
    fn test_defaults() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.initial_delay(), Duration::from_secs(1));
        assert_eq!(policy.multiplier(), 2.0);
        assert_eq!(policy.max_delay(), Duration::from_secs(300));
    }

    #[test]
    fn test_capped_delay_grows_exponentially() {
        let policy = policy(100, 2.0, 10_000);

        assert_eq!(policy.capped_delay(1), Duration::from_millis(100));
        assert_eq!(policy.capped_delay(2), Duration::from_millis(200));
        assert_eq!(policy.capped_delay(3), Duration::from_millis(400));
        assert_eq!(policy.capped_delay(4), Duration::from_millis(800));
    }

    #[test]
    fn test_attempt_zero_and_one_use_initial_delay() {
        let policy = policy(250, 3.0, 10_000);
        assert_eq!(policy.capped_delay(0), Duration::from_millis(250));
        assert_eq!(policy.capped_delay(1), Duration::from_millis(250));
    }

    #[test]
    fn test_capped_at_max_delay() {
        let policy = policy(100, 2.0, 500);

        assert_eq!(policy.capped_delay(3), Duration::from_millis(400));
        assert_eq!(policy.capped_delay(4), Duration::from_millis(500));
        assert_eq!(policy.capped_delay(50), Duration::from_millis(500));
    }

    #[test]
    fn test_huge_attempt_stays_at_cap() {
        let policy = policy(100, 2.0, 60_000);
        assert_eq!(policy.capped_delay(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn test_fractional_multiplier() {
        let policy = policy(100, 1.5, 10_000);
        assert_eq!(policy.capped_delay(2), Duration::from_millis(150));
        assert_eq!(policy.capped_delay(3), Duration::from_millis(225));
    }

    #[test]
    fn test_multiplier_below_one_shrinks() {
        let policy = policy(1000, 0.5, 10_000);
        assert_eq!(policy.capped_delay(2), Duration::from_millis(500));
        assert_eq!(policy.capped_delay(3), Duration::from_millis(250));
    }

    #[test]
    fn test_zero_initial_delay_is_always_zero() {
        let mut policy = policy(0, 2.0, 10_000);
        for attempt in 1..20 {
            assert_eq!(policy.get_delay(attempt), Duration::ZERO);
        }
    }

    #[test]
    fn test_initial_above_max_is_capped() {
        let policy = policy(5_000, 2.0, 1_000);
        assert_eq!(policy.capped_delay(1), Duration::from_millis(1_000));
        assert_eq!(policy.capped_delay(2), Duration::from_millis(1_000));
    }

    #[test]
    fn test_shrinking_factor_terminates_for_huge_attempt() {
        let policy = policy(1_000, 0.5, 10_000);
        assert_eq!(policy.capped_delay(u32::MAX), Duration::ZERO);
    }

    #[test]
    fn test_nan_multiplier_yields_zero() {
        let policy = policy(1_000, f64::NAN, 10_000);
        assert_eq!(policy.capped_delay(1), Duration::from_millis(1_000));
        assert_eq!(policy.capped_delay(2), Duration::ZERO);
    }

    #[test]
    fn test_get_delay_within_bounds() {
        let mut policy = policy(100, 2.0, 1_000);
        for attempt in 1..12 {
            let cap = policy.capped_delay(attempt);
            for _ in 0..50 {
                let delay = policy.get_delay(attempt);
                assert!(
                    delay <= cap,
                    "attempt {}: delay {:?} exceeds cap {:?}",
                    attempt,
                    delay,
                    cap
                );
            }
        }
    }

    #[test]
    fn test_jitter_advances_generator() {
        let mut policy = policy(10_000, 2.0, 300_000);
        let samples: Vec<Duration> = (0..10).map(|_| policy.get_delay(3)).collect();
        assert!(
            samples.windows(2).any(|w| w[0] != w[1]),
            "ten identical samples: {:?}",
            samples
        );
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = policy(100, 2.0, 10_000).with_seed(42);
        let mut b = policy(100, 2.0, 10_000).with_seed(42);
        for attempt in 1..10 {
            assert_eq!(a.get_delay(attempt), b.get_delay(attempt));
        }
    }

    #[test]
    fn test_clone_keeps_config_and_reseeds() {
        let original = policy(100, 2.0, 10_000).with_seed(1);
        let cloned = original.clone();
        assert_eq!(original, cloned);
        assert_eq!(cloned.capped_delay(4), Duration::from_millis(800));
    }

    #[test]
    fn test_debug_omits_generator() {
        let debug = format!("{:?}", BackoffPolicy::default());
        assert!(debug.contains("BackoffPolicy"));
        assert!(debug.contains("multiplier"));
        assert!(!debug.contains("rng"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_config_only() {
        let original = policy(100, 1.5, 2_000);
        let json = serde_json::to_string(&original).unwrap();
        assert!(!json.contains("rng"));

        let restored: BackoffPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, original);
    }
}
