use std::time::Duration;

/// Pause between sequential calls so the upstream rate limiter stays quiet.
pub const DEFAULT_PACING: Duration = Duration::from_millis(500);

/// How the collector walks the city list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    /// One city at a time, sleeping `delay` between calls.
    Sequential { delay: Duration },
    /// Up to `max_concurrency` calls in flight. Results still come back in
    /// city order.
    Parallel { max_concurrency: usize },
}

impl Default for FetchStrategy {
    fn default() -> Self {
        FetchStrategy::Sequential {
            delay: DEFAULT_PACING,
        }
    }
}
