//! Long-running render loop.
//!
//! Each round goes through [`Collector::collect_all`], so the cache decides
//! when the upstream is actually hit. The shutdown future is polled during
//! fetching as well as between rounds.

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::collector::{BatchCache, Collection, Collector, Progress};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    /// Pause between renders.
    pub interval: Duration,
    /// Number of renders; 0 runs until `shutdown` resolves.
    pub rounds: usize,
}

/// Renders rounds until `options.rounds` is reached or `shutdown` resolves.
/// Returns the number of rounds rendered.
pub async fn run<S, P, R>(
    collector: &Collector,
    cache: &BatchCache,
    options: WatchOptions,
    shutdown: S,
    mut progress: P,
    mut render: R,
) -> Result<usize>
where
    S: Future<Output = ()>,
    P: FnMut(Progress<'_>),
    R: FnMut(&Collection) -> Result<()>,
{
    tokio::pin!(shutdown);

    if !collector.is_configured() {
        warn!("No API token, every round will be empty");
    }
    info!(
        cities = collector.cities().len(),
        cache_ttl_secs = cache.ttl().num_seconds(),
        interval_secs = options.interval.as_secs(),
        "Watching"
    );

    let mut rendered = 0;

    loop {
        let collection = tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!(rendered, "Interrupted while fetching, stopping");
                break;
            }
            c = collector.collect_all(cache, &mut progress) => c,
        };

        rendered += 1;
        info!(
            round = rendered,
            status = ?collection.status,
            next_refresh = ?cache.entry().map(|e| e.expires_at()),
            "Rendering snapshot"
        );
        render(&collection)?;

        if options.rounds > 0 && rendered >= options.rounds {
            break;
        }

        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!(rendered, "Interrupted, stopping");
                break;
            }
            _ = tokio::time::sleep(options.interval) => {}
        }
    }

    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{CollectionStatus, FetchStrategy};
    use crate::config::CityConfig;
    use crate::error::FetchError;
    use crate::services::reading_source::ReadingSource;
    use crate::types::{AqiValue, RawReading};
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::time::{Instant, sleep};

    struct SlowSource(Duration);

    #[async_trait]
    impl ReadingSource for SlowSource {
        fn name(&self) -> &str {
            "slow"
        }

        async fn fetch(&self, _city_id: &str) -> Result<RawReading, FetchError> {
            sleep(self.0).await;
            Ok(RawReading {
                aqi: Some(AqiValue::Number(42.0)),
                latitude: Some(12.97),
                longitude: Some(77.59),
                timestamp: "2026-10-17 09:00:00".into(),
            })
        }
    }

    fn collector(latency: Duration) -> Collector {
        Collector::new(
            CityConfig::india(),
            Arc::new(SlowSource(latency)),
            FetchStrategy::Sequential {
                delay: Duration::ZERO,
            },
        )
    }

    fn options(interval_secs: u64, rounds: usize) -> WatchOptions {
        WatchOptions {
            interval: Duration::from_secs(interval_secs),
            rounds,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_fetch_stops_promptly() {
        // a full round would take 12 x 10s
        let collector = collector(Duration::from_secs(10));
        let cache = BatchCache::new(Duration::from_secs(600));
        let start = Instant::now();

        let rendered = run(
            &collector,
            &cache,
            options(60, 0),
            sleep(Duration::from_secs(15)),
            |_| {},
            |_| Ok(()),
        )
        .await
        .unwrap();

        assert_eq!(rendered, 0);
        assert!(start.elapsed() < Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_after_earlier_rounds_is_seen_mid_fetch() {
        // zero TTL refetches every round: 0-12s, 72-84s, then 144s onwards
        // until shutdown at 150s
        let collector = collector(Duration::from_secs(1));
        let cache = BatchCache::new(Duration::ZERO);
        let mut statuses = Vec::new();
        let start = Instant::now();

        let rendered = run(
            &collector,
            &cache,
            options(60, 0),
            sleep(Duration::from_secs(150)),
            |_| {},
            |c| {
                statuses.push(c.status);
                Ok(())
            },
        )
        .await
        .unwrap();

        assert_eq!(rendered, 2);
        assert_eq!(
            statuses,
            [CollectionStatus::Refreshed, CollectionStatus::Refreshed]
        );
        assert!(start.elapsed() < Duration::from_secs(156));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_after_rounds() {
        let collector = collector(Duration::ZERO);
        let cache = BatchCache::new(Duration::from_secs(600));
        let mut statuses = Vec::new();

        let rendered = run(
            &collector,
            &cache,
            options(60, 3),
            std::future::pending(),
            |_| {},
            |c| {
                statuses.push(c.status);
                Ok(())
            },
        )
        .await
        .unwrap();

        assert_eq!(rendered, 3);
        assert_eq!(
            statuses,
            [
                CollectionStatus::Refreshed,
                CollectionStatus::Cached,
                CollectionStatus::Cached
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_error_propagates() {
        let collector = collector(Duration::ZERO);
        let cache = BatchCache::new(Duration::from_secs(600));

        let result = run(
            &collector,
            &cache,
            options(60, 0),
            std::future::pending(),
            |_| {},
            |_| Err(anyhow::anyhow!("stdout closed")),
        )
        .await;

        assert_eq!(result.unwrap_err().to_string(), "stdout closed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unconfigured_rounds_still_render() {
        let collector = Collector::unconfigured(CityConfig::india());
        let cache = BatchCache::new(Duration::from_secs(600));
        let mut flags = Vec::new();

        let rendered = run(
            &collector,
            &cache,
            options(1, 2),
            std::future::pending(),
            |_| {},
            |c| {
                flags.push(c.is_unconfigured());
                Ok(())
            },
        )
        .await
        .unwrap();

        assert_eq!(rendered, 2);
        assert_eq!(flags, [true, true]);
    }
}
