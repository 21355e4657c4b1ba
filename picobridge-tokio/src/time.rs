//! Std time implementation

use std::time::{Duration, Instant};

use picobridge_core::{Delay, TimeSource};

/// Standard library time source
///
/// Monotonic seconds since the source was created
#[derive(Debug, Clone, Copy)]
pub struct StdTimeSource {
    origin: Instant,
}

impl StdTimeSource {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for StdTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for StdTimeSource {
    fn now_secs(&self) -> u64 {
        self.origin.elapsed().as_secs()
    }
}

/// Tokio timer backed delay
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

impl Delay for TokioDelay {
    async fn sleep_ms(&self, millis: u64) {
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_starts_at_zero() {
        let time = StdTimeSource::new();
        assert!(time.now_secs() <= 1);
    }

    #[tokio::test]
    async fn test_delay_sleeps() {
        let start = tokio::time::Instant::now();
        TokioDelay.sleep_ms(20).await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
