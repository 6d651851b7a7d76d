use cyclops_shared::{GeoPoint, WeatherSample};
use tracing::warn;

use crate::services::weather_provider::WeatherProvider;

#[derive(Debug, Clone, PartialEq)]
pub struct RefreshOutcome {
    pub samples: Vec<WeatherSample>,
    pub failures: usize,
}

/// Fetch a sample for every city, in order, one request at a time.
///
/// A failed city gets the zero sample and never stops the remaining cities.
/// The returned vector is always `cities.len()` long.
pub async fn refresh_samples<P>(provider: &P, cities: &[GeoPoint]) -> RefreshOutcome
where
    P: WeatherProvider + ?Sized,
{
    let mut samples = Vec::with_capacity(cities.len());
    let mut failures = 0;

    for city in cities {
        match provider.fetch_sample(city.latitude, city.longitude).await {
            Ok(sample) => samples.push(sample),
            Err(e) => {
                failures += 1;
                warn!(city = %city.name, error = %e, "weather fetch failed; showing zero sample");
                samples.push(WeatherSample::ZERO);
            }
        }
    }

    RefreshOutcome { samples, failures }
}
