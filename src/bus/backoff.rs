//! Exponential reconnect backoff capped at 30s, with jitter, resetting
//! after a successful consume.

use std::time::Duration;

const BASE: Duration = Duration::from_millis(200);
const MAX: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Default)]
pub struct Backoff {
    attempt: u32,
}

impl Backoff {
    pub fn new() -> Self {
        Self { attempt: 0 }
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// The delay before the next reconnect attempt, doubling each call and
    /// capped at 30s, jittered to avoid a reconnect thundering herd.
    pub fn next_delay(&mut self) -> Duration {
        let shift = self.attempt.min(10);
        self.attempt = self.attempt.saturating_add(1);
        let exp = BASE.saturating_mul(1u32 << shift).min(MAX);
        jitter(exp)
    }
}

fn jitter(d: Duration) -> Duration {
    use rand::Rng;
    let factor: f64 = rand::thread_rng().gen_range(0.5..=1.0);
    Duration::from_secs_f64(d.as_secs_f64() * factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_never_exceeds_the_cap() {
        let mut backoff = Backoff::new();
        for _ in 0..20 {
            assert!(backoff.next_delay() <= MAX);
        }
    }

    #[test]
    fn reset_restarts_the_sequence() {
        let mut backoff = Backoff::new();
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.attempt, 0);
    }
}
