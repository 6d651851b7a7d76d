use cyclops_shared::{
    GeoPoint, RegionCatalog, SampleColumns, TemperatureScale, ViewPayload, WeatherSample, project,
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ViewError {
    #[error("unknown region {0:?}")]
    UnknownRegion(String),
    #[error("region index {index} is out of range ({count} regions)")]
    RegionIndexOutOfRange { index: usize, count: usize },
    #[error("expected {expected} weather samples, got {actual}")]
    SampleCountMismatch { expected: usize, actual: usize },
}

/// The displayed working set: the active region's cities with their projected
/// coordinates and latest weather, all index-aligned.
///
/// Fields are private so the three sequences can only change together.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    active_region: String,
    cities: Vec<GeoPoint>,
    projected: Vec<(f64, f64)>,
    samples: Vec<WeatherSample>,
}

impl ViewState {
    /// Fresh view of `key` with every sample zeroed.
    pub fn for_region(catalog: &RegionCatalog, key: &str) -> Result<Self, ViewError> {
        let region = catalog
            .get(key)
            .ok_or_else(|| ViewError::UnknownRegion(key.to_string()))?;

        let cities = region.points.clone();
        let projected = cities
            .iter()
            .map(|city| project(city.latitude, city.longitude))
            .collect();
        let samples = vec![WeatherSample::ZERO; cities.len()];

        Ok(Self {
            active_region: region.key.clone(),
            cities,
            projected,
            samples,
        })
    }

    /// Replace the whole view with `key`. On error the current view is untouched.
    pub fn switch_region(&mut self, catalog: &RegionCatalog, key: &str) -> Result<(), ViewError> {
        *self = Self::for_region(catalog, key)?;
        Ok(())
    }

    /// Swap in a full set of samples produced by one refresh.
    pub fn apply_samples(&mut self, samples: Vec<WeatherSample>) -> Result<(), ViewError> {
        if samples.len() != self.cities.len() {
            return Err(ViewError::SampleCountMismatch {
                expected: self.cities.len(),
                actual: samples.len(),
            });
        }
        self.samples = samples;
        Ok(())
    }

    pub fn active_region(&self) -> &str {
        &self.active_region
    }

    pub fn cities(&self) -> &[GeoPoint] {
        &self.cities
    }

    pub fn projected(&self) -> &[(f64, f64)] {
        &self.projected
    }

    pub fn samples(&self) -> &[WeatherSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn sample_columns(&self, scale: &TemperatureScale) -> SampleColumns {
        let mut columns = SampleColumns {
            cloud: Vec::with_capacity(self.samples.len()),
            temp: Vec::with_capacity(self.samples.len()),
            humidity: Vec::with_capacity(self.samples.len()),
            pressure: Vec::with_capacity(self.samples.len()),
            color: Vec::with_capacity(self.samples.len()),
        };
        for sample in &self.samples {
            columns.cloud.push(sample.cloud_pct);
            columns.temp.push(sample.temp_c);
            columns.humidity.push(sample.humidity_pct);
            columns.pressure.push(sample.pressure_hpa);
            columns.color.push(scale.hex(sample.temp_c));
        }
        columns
    }

    pub fn to_payload(&self, seq: u64, timestamp: &str, scale: &TemperatureScale) -> ViewPayload {
        let (x, y) = self.projected.iter().copied().unzip();
        ViewPayload {
            seq,
            timestamp: timestamp.to_string(),
            region: self.active_region.clone(),
            x,
            y,
            name: self.cities.iter().map(|city| city.name.clone()).collect(),
            samples: self.sample_columns(scale),
        }
    }
}

#[cfg(test)]
mod tests {
    use cyclops_shared::{GeoPoint, Region, RegionCatalog, TemperatureScale, WeatherSample};

    use super::{ViewError, ViewState};

    fn test_catalog() -> RegionCatalog {
        RegionCatalog::new(
            "globe",
            vec![
                Region {
                    key: "test".to_string(),
                    label: "Test".to_string(),
                    points: vec![GeoPoint::new("X", 0.0, 0.0)],
                },
                Region {
                    key: "globe".to_string(),
                    label: "Globe".to_string(),
                    points: vec![
                        GeoPoint::new("London, UK", 51.5074, -0.1278),
                        GeoPoint::new("Sydney, AU", -33.8688, 151.2093),
                        GeoPoint::new("Quito, EC", -0.1807, -78.4678),
                    ],
                },
            ],
        )
        .expect("test catalog should validate")
    }

    fn sample(temp_c: f64) -> WeatherSample {
        WeatherSample {
            cloud_pct: 20.0,
            temp_c,
            humidity_pct: 55.0,
            pressure_hpa: 1015.0,
        }
    }

    #[test]
    fn single_point_region_projects_to_origin_with_zero_sample() {
        let view = ViewState::for_region(&test_catalog(), "test").expect("region should exist");

        assert_eq!(view.active_region(), "test");
        assert_eq!(view.cities(), &[GeoPoint::new("X", 0.0, 0.0)]);
        assert_eq!(view.projected().len(), 1);
        let (x, y) = view.projected()[0];
        assert!(x.abs() < 1e-9 && y.abs() < 1e-6, "got ({x}, {y})");
        assert_eq!(view.samples(), &[WeatherSample::ZERO]);
    }

    #[test]
    fn switch_rebuilds_aligned_sequences_with_zero_samples() {
        let catalog = test_catalog();
        let mut view = ViewState::for_region(&catalog, "test").expect("region should exist");
        view.apply_samples(vec![sample(30.0)])
            .expect("sample count should match");

        view.switch_region(&catalog, "globe")
            .expect("switch should succeed");

        assert_eq!(view.active_region(), "globe");
        assert_eq!(view.cities().len(), 3);
        assert_eq!(view.projected().len(), 3);
        assert_eq!(view.samples().len(), 3);
        assert!(view.samples().iter().all(WeatherSample::is_zero));
        assert_eq!(view.cities()[1].name, "Sydney, AU");
    }

    #[test]
    fn switching_to_active_region_keeps_cities_and_projection() {
        let catalog = test_catalog();
        let mut view = ViewState::for_region(&catalog, "globe").expect("region should exist");
        let cities = view.cities().to_vec();
        let projected = view.projected().to_vec();

        view.switch_region(&catalog, "globe")
            .expect("switch should succeed");

        assert_eq!(view.cities(), cities.as_slice());
        assert_eq!(view.projected(), projected.as_slice());
    }

    #[test]
    fn unknown_region_leaves_view_unchanged() {
        let catalog = test_catalog();
        let mut view = ViewState::for_region(&catalog, "globe").expect("region should exist");
        view.apply_samples(vec![sample(12.0), sample(22.0), sample(18.0)])
            .expect("sample count should match");
        let before = view.clone();

        let err = view
            .switch_region(&catalog, "atlantis")
            .expect_err("unknown region should fail");

        assert_eq!(err, ViewError::UnknownRegion("atlantis".to_string()));
        assert_eq!(view, before);
    }

    #[test]
    fn apply_samples_rejects_misaligned_input() {
        let mut view =
            ViewState::for_region(&test_catalog(), "globe").expect("region should exist");

        let err = view
            .apply_samples(vec![sample(1.0)])
            .expect_err("short sample vector should be rejected");

        assert_eq!(
            err,
            ViewError::SampleCountMismatch {
                expected: 3,
                actual: 1
            }
        );
        assert!(view.samples().iter().all(WeatherSample::is_zero));
    }

    #[test]
    fn payload_columns_are_index_aligned() {
        let mut view =
            ViewState::for_region(&test_catalog(), "globe").expect("region should exist");
        view.apply_samples(vec![sample(12.0), sample(22.0), sample(18.0)])
            .expect("sample count should match");
        let scale = TemperatureScale::default();

        let payload = view.to_payload(9, "2026-01-01T00:00:00Z", &scale);

        assert_eq!(payload.seq, 9);
        assert_eq!(payload.region, "globe");
        assert_eq!(payload.name, vec!["London, UK", "Sydney, AU", "Quito, EC"]);
        assert_eq!(payload.x.len(), 3);
        assert_eq!(payload.y.len(), 3);
        assert_eq!(payload.samples.temp, vec![12.0, 22.0, 18.0]);
        assert_eq!(payload.samples.pressure, vec![1015.0; 3]);
        assert_eq!(payload.samples.color[1], scale.hex(22.0));
        assert_eq!(payload.x[0], view.projected()[0].0);
    }
}
