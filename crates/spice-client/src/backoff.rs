use std::time::Duration;

use rand::Rng;

/// Smallest initial delay, so a zero poll interval does not spin.
const MIN_INITIAL: Duration = Duration::from_millis(100);

/// Largest delay between attempts.
const MAX_DELAY: Duration = Duration::from_secs(300);

/// Randomized exponential backoff for rate-limited requests.
///
/// Each delay is the previous one multiplied by a factor drawn uniformly
/// from `[1, 2]`, so delays never decrease.
#[derive(Clone, Debug)]
pub struct Backoff {
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration) -> Self {
        Self {
            current: initial.clamp(MIN_INITIAL, MAX_DELAY),
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        self.next_delay_with(&mut rand::thread_rng())
    }

    pub fn next_delay_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Duration {
        let factor: f64 = rng.gen_range(1.0..=2.0);
        self.current = self.current.mul_f64(factor).min(MAX_DELAY);
        self.current
    }
}
