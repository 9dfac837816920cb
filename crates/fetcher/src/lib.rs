pub mod openweather;

use async_trait::async_trait;

use herald_common::error::FetchError;
use herald_common::types::{Subject, WeatherSnapshot};

pub use openweather::OpenWeatherClient;

/// Source of current weather data for a location.
///
/// Implementations own their transport timeouts and must translate provider
/// failures into the [`FetchError`] taxonomy.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DataFetcher: Send + Sync {
    /// Fetch a fresh snapshot for `subject`. Results are never cached.
    async fn fetch(&self, subject: &Subject) -> Result<WeatherSnapshot, FetchError>;
}
