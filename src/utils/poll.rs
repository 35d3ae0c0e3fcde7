//! Bounded polling with a fixed interval.
//!
//! Used wherever the pipeline waits on an asynchronous external process,
//! such as a media container finishing on the platform.

use std::future::Future;
use std::time::Duration;

/// How often and how long to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_wait: Duration,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_wait: Duration) -> Self {
        Self { interval, max_wait }
    }

    /// Number of probes allowed; always at least one.
    pub fn max_attempts(&self) -> u32 {
        if self.interval.is_zero() {
            return 1;
        }
        let attempts = self.max_wait.as_nanos() / self.interval.as_nanos();
        u32::try_from(attempts).unwrap_or(u32::MAX).max(1)
    }
}

/// What a single probe observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStep<T> {
    /// Done; stop polling
    Ready(T),
    /// Not yet; probe again after the interval
    Pending,
    /// Terminal failure; stop polling
    Failed(String),
}

/// Final result of a polling loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Ready(T),
    Failed(String),
    TimedOut { attempts: u32 },
}

/// Probe until ready, failed, or the attempt budget runs out.
///
/// `probe` receives the 1-based attempt number. No sleep happens after the
/// final attempt.
pub async fn poll_until<T, F, Fut>(policy: PollPolicy, mut probe: F) -> PollOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = PollStep<T>>,
{
    let max_attempts = policy.max_attempts();

    for attempt in 1..=max_attempts {
        match probe(attempt).await {
            PollStep::Ready(value) => return PollOutcome::Ready(value),
            PollStep::Failed(reason) => return PollOutcome::Failed(reason),
            PollStep::Pending => {
                if attempt < max_attempts {
                    tokio::time::sleep(policy.interval).await;
                }
            }
        }
    }

    PollOutcome::TimedOut {
        attempts: max_attempts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast(max_attempts: u64) -> PollPolicy {
        PollPolicy::new(
            Duration::from_millis(1),
            Duration::from_millis(max_attempts),
        )
    }

    #[test]
    fn attempts_follow_wait_over_interval() {
        let policy = PollPolicy::new(Duration::from_secs(2), Duration::from_secs(60));
        assert_eq!(policy.max_attempts(), 30);
        let long = PollPolicy::new(Duration::from_secs(30), Duration::from_secs(300));
        assert_eq!(long.max_attempts(), 10);
        let tiny = PollPolicy::new(Duration::from_secs(5), Duration::from_secs(1));
        assert_eq!(tiny.max_attempts(), 1);
    }

    #[test]
    fn sub_millisecond_interval_counts_attempts() {
        let policy = PollPolicy::new(Duration::from_micros(500), Duration::from_secs(1));
        assert_eq!(policy.max_attempts(), 2000);
        let zero = PollPolicy::new(Duration::ZERO, Duration::from_secs(1));
        assert_eq!(zero.max_attempts(), 1);
    }

    #[tokio::test]
    async fn ready_after_pending_probes() {
        let mut calls = 0;
        let outcome = poll_until(fast(10), |attempt| {
            calls += 1;
            async move {
                if attempt < 3 {
                    PollStep::Pending
                } else {
                    PollStep::Ready(attempt)
                }
            }
        })
        .await;
        assert_eq!(outcome, PollOutcome::Ready(3));
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn failure_stops_immediately() {
        let mut calls = 0;
        let outcome: PollOutcome<()> = poll_until(fast(10), |_| {
            calls += 1;
            async { PollStep::Failed("ERROR".to_string()) }
        })
        .await;
        assert_eq!(outcome, PollOutcome::Failed("ERROR".to_string()));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn times_out_after_budget() {
        let mut calls = 0;
        let outcome: PollOutcome<()> = poll_until(fast(4), |_| {
            calls += 1;
            async { PollStep::Pending }
        })
        .await;
        assert_eq!(outcome, PollOutcome::TimedOut { attempts: 4 });
        assert_eq!(calls, 4);
    }
}
