//! Sliding-window rate limiter for outbound data calls
//!
//! `acquire()` never errors and never drops a request: callers suspend
//! until the window has room. Grants are tracked as a log of the last
//! `capacity` grant instants, so any rolling window of length W contains
//! at most C grants; a burst is never followed by early top-up grants.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Async rate limiter shared by concurrent callers
#[derive(Debug)]
pub struct RateLimiter {
    capacity: usize,
    window: Duration,
    grants: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(capacity: u32, window: Duration) -> Self {
        // A zero capacity could never grant; one per window is the floor
        let capacity = capacity.max(1) as usize;
        Self {
            capacity,
            window,
            grants: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Take one grant, suspending until the window has room.
    ///
    /// The wait is a computed sleep until the oldest tracked grant ages
    /// out of the window, not a busy loop; waking callers re-check under
    /// the lock so concurrent acquires stay within budget.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut grants = self.grants.lock().await;
                let now = Instant::now();
                while let Some(&oldest) = grants.front() {
                    if now.duration_since(oldest) >= self.window {
                        grants.pop_front();
                    } else {
                        break;
                    }
                }
                if grants.len() < self.capacity {
                    grants.push_back(now);
                    return;
                }
                // Full: the log holds at least one entry younger than W
                self.window - now.duration_since(grants[0])
            };
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn grants_burst_up_to_capacity() {
        let limiter = RateLimiter::new(10, Duration::from_secs(60));
        let start = Instant::now();
        for _ in 0..10 {
            limiter.acquire().await;
        }
        // An empty log grants the burst without waiting
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn blocks_for_the_full_window_after_a_burst() {
        let limiter = RateLimiter::new(10, Duration::from_secs(60));
        for _ in 0..10 {
            limiter.acquire().await;
        }
        let start = Instant::now();
        limiter.acquire().await;
        // The burst exhausted the window; no top-up before it slides
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn no_early_grants_inside_the_burst_window() {
        let limiter = RateLimiter::new(5, Duration::from_secs(10));
        for _ in 0..5 {
            limiter.acquire().await;
        }
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn rolling_window_never_exceeds_capacity() {
        let limiter = RateLimiter::new(5, Duration::from_secs(10));
        let mut grants: Vec<Instant> = Vec::new();
        for _ in 0..15 {
            limiter.acquire().await;
            grants.push(Instant::now());
        }
        for (i, start) in grants.iter().enumerate() {
            let in_window = grants[i..]
                .iter()
                .take_while(|g| g.duration_since(*start) < Duration::from_secs(10))
                .count();
            assert!(in_window <= 5, "window starting at grant {i} saw {in_window}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_the_budget() {
        let limiter = Arc::new(RateLimiter::new(4, Duration::from_secs(60)));
        let start = Instant::now();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
                Instant::now()
            }));
        }
        let mut times = Vec::new();
        for handle in handles {
            times.push(handle.await.unwrap());
        }
        let immediate = times
            .iter()
            .filter(|t| t.duration_since(start) < Duration::from_secs(1))
            .count();
        assert_eq!(immediate, 4);
        let delayed = times
            .iter()
            .filter(|t| t.duration_since(start) >= Duration::from_secs(60))
            .count();
        assert_eq!(delayed, 4);
    }
}
