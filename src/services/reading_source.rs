//! Trait for anything that can produce a reading for one city.

use async_trait::async_trait;

use crate::error::FetchError;
use crate::types::RawReading;

/// Abstraction over an air-quality provider (e.g., WAQI).
///
/// Implementations make at most one bounded upstream call per invocation and
/// report every fault as a [`FetchError`]; they never panic on bad payloads.
#[async_trait]
pub trait ReadingSource: Send + Sync {
    /// Short provider name used in logs.
    fn name(&self) -> &str;

    /// Fetches the current reading for the provider's `city_id`.
    async fn fetch(&self, city_id: &str) -> Result<RawReading, FetchError>;
}
