//! Batch collection: one fetch per configured city, gated by [`BatchCache`].
//!
//! Failures are recorded per city and never abort the batch. A collector
//! built without a token reports [`CollectionStatus::Unconfigured`] instead
//! of fetching anything.

mod cache;
mod strategy;

pub use cache::{BatchCache, CacheEntry};
pub use strategy::{DEFAULT_PACING, FetchStrategy};

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{Instrument, debug, info, warn};

use crate::config::{City, CityConfig};
use crate::error::FetchError;
use crate::services::reading_source::ReadingSource;
use crate::types::{Batch, CityReading, FetchFailure, RawReading};

/// Progress signal emitted after each city is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress<'a> {
    pub processed: usize,
    pub total: usize,
    pub city: &'a str,
}

impl Progress<'_> {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.processed as f64 / self.total as f64
        }
    }

    pub fn message(&self) -> String {
        format!("Fetching data for {}...", self.city)
    }
}

/// Where a [`Collection`]'s batch came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionStatus {
    /// Fetched just now and stored in the cache.
    Refreshed,
    /// Served from a fresh cache entry without any upstream calls.
    Cached,
    /// No API token; the batch is empty and nothing was fetched.
    Unconfigured,
}

#[derive(Debug, Clone)]
pub struct Collection {
    pub batch: Arc<Batch>,
    pub status: CollectionStatus,
}

impl Collection {
    pub fn is_unconfigured(&self) -> bool {
        self.status == CollectionStatus::Unconfigured
    }
}

pub struct Collector {
    cities: CityConfig,
    source: Option<Arc<dyn ReadingSource>>,
    strategy: FetchStrategy,
}

impl Collector {
    pub fn new(
        cities: CityConfig,
        source: Arc<dyn ReadingSource>,
        strategy: FetchStrategy,
    ) -> Self {
        Self {
            cities,
            source: Some(source),
            strategy,
        }
    }

    /// A collector with no upstream. Every call reports
    /// [`CollectionStatus::Unconfigured`].
    pub fn unconfigured(cities: CityConfig) -> Self {
        Self {
            cities,
            source: None,
            strategy: FetchStrategy::default(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.source.is_some()
    }

    pub fn cities(&self) -> &CityConfig {
        &self.cities
    }

    /// Returns the cached batch while it is fresh, otherwise refreshes.
    pub async fn collect_all<F>(&self, cache: &BatchCache, progress: F) -> Collection
    where
        F: FnMut(Progress<'_>),
    {
        if self.source.is_some() {
            if let Some(batch) = cache.fresh(Utc::now()) {
                debug!(fetched_at = %batch.fetched_at, "Serving cached batch");
                return Collection {
                    batch,
                    status: CollectionStatus::Cached,
                };
            }
        }

        self.refresh(cache, progress).await
    }

    /// Fetches every city now and replaces the cache entry, regardless of
    /// freshness.
    #[tracing::instrument(skip_all, fields(cities = self.cities.len()))]
    pub async fn refresh<F>(&self, cache: &BatchCache, mut progress: F) -> Collection
    where
        F: FnMut(Progress<'_>),
    {
        let Some(source) = &self.source else {
            warn!("API token not configured, skipping fetch");
            return Collection {
                batch: Arc::new(Batch::empty(Utc::now())),
                status: CollectionStatus::Unconfigured,
            };
        };

        info!(source = source.name(), strategy = ?self.strategy, "Refreshing batch");

        let mut batch = Batch::empty(Utc::now());
        match self.strategy {
            FetchStrategy::Sequential { delay } => {
                self.fetch_sequential(source.as_ref(), delay, &mut batch, &mut progress)
                    .await
            }
            FetchStrategy::Parallel { max_concurrency } => {
                self.fetch_parallel(source, max_concurrency, &mut batch, &mut progress)
                    .await
            }
        }

        let now = Utc::now();
        batch.fetched_at = now;

        info!(
            rows = batch.readings.len(),
            failures = batch.failures.len(),
            "Batch refreshed"
        );

        Collection {
            batch: cache.store(batch, now),
            status: CollectionStatus::Refreshed,
        }
    }

    async fn fetch_sequential<F>(
        &self,
        source: &dyn ReadingSource,
        delay: std::time::Duration,
        batch: &mut Batch,
        progress: &mut F,
    ) where
        F: FnMut(Progress<'_>),
    {
        let total = self.cities.len();

        for (i, city) in self.cities.iter().enumerate() {
            let span = tracing::info_span!("fetch_city", city = %city.name, id = %city.id);
            let result = source.fetch(&city.id).instrument(span).await;
            record(batch, city, result);
            report(progress, i + 1, total, city);

            if !delay.is_zero() && i + 1 < total {
                tokio::time::sleep(delay).await;
            }
        }
    }

    async fn fetch_parallel<F>(
        &self,
        source: &Arc<dyn ReadingSource>,
        max_concurrency: usize,
        batch: &mut Batch,
        progress: &mut F,
    ) where
        F: FnMut(Progress<'_>),
    {
        let total = self.cities.len();
        let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));

        let tasks: Vec<_> = self
            .cities
            .iter()
            .map(|city| {
                let sem = semaphore.clone();
                let source = Arc::clone(source);
                let id = city.id.clone();
                let span = tracing::info_span!("fetch_city", city = %city.name, id = %city.id);

                tokio::spawn(
                    async move {
                        let Ok(_permit) = sem.acquire_owned().await else {
                            return Err(FetchError::Unexpected("fetch pool closed".into()));
                        };
                        source.fetch(&id).await
                    }
                    .instrument(span),
                )
            })
            .collect();

        // Await in city order so the batch keeps the configured order.
        for (i, (city, task)) in self.cities.iter().zip(tasks).enumerate() {
            let result = task.await.unwrap_or_else(|e| {
                Err(FetchError::Unexpected(format!("fetch task failed: {e}")))
            });
            record(batch, city, result);
            report(progress, i + 1, total, city);
        }
    }
}

fn record(batch: &mut Batch, city: &City, result: Result<RawReading, FetchError>) {
    match result {
        Ok(reading) => batch.readings.push(CityReading {
            city: city.name.clone(),
            reading,
        }),
        Err(e) => {
            warn!(city = %city.name, error = %e, "City fetch failed");
            batch.failures.push(FetchFailure {
                city: city.name.clone(),
                message: e.to_string(),
            });
        }
    }
}

fn report<F>(progress: &mut F, processed: usize, total: usize, city: &City)
where
    F: FnMut(Progress<'_>),
{
    let p = Progress {
        processed,
        total,
        city: &city.name,
    };
    debug!(processed, total, "{}", p.message());
    progress(p);
}
