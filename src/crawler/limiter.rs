//! Politeness delay between listing pages

use crate::config::CrawlerConfig;
use std::time::Duration;
use tokio::sync::watch;

/// Sleeps a random duration in `[min, max]` between listing page fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiter {
    min: Duration,
    max: Duration,
}

impl RateLimiter {
    /// Bounds are swapped if given in the wrong order
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(
            Duration::from_millis(config.page_delay_min_ms),
            Duration::from_millis(config.page_delay_max_ms),
        )
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Picks the next delay, uniformly at millisecond resolution
    pub fn next_delay(&self) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(fastrand::u64(min..=max))
    }

    /// Sleeps for the next delay
    ///
    /// Returns `false` if `shutdown` flipped to `true` before the delay
    /// elapsed, `true` otherwise.
    pub async fn pause(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        if *shutdown.borrow() {
            return false;
        }

        let delay = self.next_delay();
        tracing::debug!("Waiting {:?} before next listing page", delay);

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return true,
                changed = shutdown.changed() => {
                    match changed {
                        Ok(()) if *shutdown.borrow() => return false,
                        Ok(()) => continue,
                        // Sender gone; nobody can interrupt us any more
                        Err(_) => {
                            (&mut sleep).await;
                            return true;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_within_bounds() {
        let limiter = RateLimiter::new(Duration::from_millis(2000), Duration::from_millis(3000));
        for _ in 0..200 {
            let delay = limiter.next_delay();
            assert!(delay >= Duration::from_millis(2000));
            assert!(delay <= Duration::from_millis(3000));
        }
    }

    #[test]
    fn test_reversed_bounds() {
        let limiter = RateLimiter::new(Duration::from_millis(50), Duration::from_millis(10));
        let delay = limiter.next_delay();
        assert!(delay >= Duration::from_millis(10) && delay <= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_pause_completes() {
        let (_tx, mut rx) = watch::channel(false);
        assert!(RateLimiter::disabled().pause(&mut rx).await);
    }

    #[tokio::test]
    async fn test_pause_skipped_when_already_shut_down() {
        let (_tx, mut rx) = watch::channel(true);
        let limiter = RateLimiter::new(Duration::from_secs(60), Duration::from_secs(60));
        assert!(!limiter.pause(&mut rx).await);
    }

    #[tokio::test]
    async fn test_pause_interrupted() {
        let (tx, mut rx) = watch::channel(false);
        let limiter = RateLimiter::new(Duration::from_secs(60), Duration::from_secs(60));

        let handle = tokio::spawn(async move { limiter.pause(&mut rx).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(true).unwrap();

        let completed = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(!completed);
    }
}
