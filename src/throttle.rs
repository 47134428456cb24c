use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Admits at most one event per period. Used to keep repeating decode
/// problems from flooding the log.
pub(crate) struct Throttle {
    period: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last: Mutex::new(None),
        }
    }

    pub fn admit(&self) -> bool {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        match *last {
            Some(at) if at.elapsed() < self.period => false,
            _ => {
                *last = Some(Instant::now());
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_first_and_blocks_repeats() {
        let throttle = Throttle::new(Duration::from_secs(60));
        assert!(throttle.admit());
        assert!(!throttle.admit());
        assert!(!throttle.admit());
    }

    #[test]
    fn zero_period_always_admits() {
        let throttle = Throttle::new(Duration::ZERO);
        assert!(throttle.admit());
        assert!(throttle.admit());
    }
}
