use serde::{Deserialize, Serialize};

/// Current conditions for one displayed city.
///
/// The all-zero value doubles as "no data": it is what every city shows right
/// after a region switch and what a city degrades to when its fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WeatherSample {
    pub cloud_pct: f64,
    pub temp_c: f64,
    pub humidity_pct: f64,
    pub pressure_hpa: f64,
}

impl WeatherSample {
    pub const ZERO: Self = Self {
        cloud_pct: 0.0,
        temp_c: 0.0,
        humidity_pct: 0.0,
        pressure_hpa: 0.0,
    };

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::WeatherSample;

    #[test]
    fn default_is_the_zero_sample() {
        assert_eq!(WeatherSample::default(), WeatherSample::ZERO);
        assert!(WeatherSample::default().is_zero());
    }

    #[test]
    fn any_populated_field_is_not_zero() {
        let sample = WeatherSample {
            pressure_hpa: 1013.0,
            ..WeatherSample::ZERO
        };
        assert!(!sample.is_zero());
    }
}
