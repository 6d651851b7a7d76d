use serde::{Deserialize, Serialize};

pub const DEFAULT_SCALE_LOW_C: f64 = -10.0;
pub const DEFAULT_SCALE_HIGH_C: f64 = 40.0;

// Polynomial fit of the Turbo colormap, one row per channel, lowest power first.
const TURBO_R: [f64; 6] = [
    0.135_721_38,
    4.615_392_60,
    -42.660_322_58,
    132.131_082_34,
    -152.942_393_96,
    59.286_379_43,
];
const TURBO_G: [f64; 6] = [
    0.091_402_61,
    2.194_188_39,
    4.842_966_58,
    -14.185_033_33,
    4.277_298_57,
    2.829_566_04,
];
const TURBO_B: [f64; 6] = [
    0.106_673_30,
    12.641_946_08,
    -60.582_048_36,
    110.362_767_71,
    -89.903_109_12,
    27.348_249_73,
];

/// Linear temperature → marker color mapping, clamped at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureScale {
    pub low: f64,
    pub high: f64,
}

impl Default for TemperatureScale {
    fn default() -> Self {
        Self {
            low: DEFAULT_SCALE_LOW_C,
            high: DEFAULT_SCALE_HIGH_C,
        }
    }
}

/// Legend entry: a temperature and the color it maps to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleStop {
    pub temp: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorScaleLegend {
    pub low: f64,
    pub high: f64,
    pub stops: Vec<ScaleStop>,
}

impl TemperatureScale {
    /// Falls back to the default range when `low`/`high` are not a usable interval.
    pub fn new(low: f64, high: f64) -> Self {
        if low.is_finite() && high.is_finite() && low < high {
            Self { low, high }
        } else {
            Self::default()
        }
    }

    /// Position of `temp` on the scale in [0, 1].
    pub fn normalize(&self, temp: f64) -> f64 {
        if !temp.is_finite() {
            return 0.0;
        }
        ((temp - self.low) / (self.high - self.low)).clamp(0.0, 1.0)
    }

    pub fn rgb(&self, temp: f64) -> (u8, u8, u8) {
        turbo(self.normalize(temp))
    }

    pub fn hex(&self, temp: f64) -> String {
        let (r, g, b) = self.rgb(temp);
        format!("#{r:02x}{g:02x}{b:02x}")
    }

    /// `count` evenly spaced stops from `low` to `high` inclusive.
    pub fn legend(&self, count: usize) -> ColorScaleLegend {
        let count = count.max(2);
        let step = (self.high - self.low) / (count - 1) as f64;
        let stops = (0..count)
            .map(|i| {
                let temp = self.low + step * i as f64;
                ScaleStop {
                    temp,
                    color: self.hex(temp),
                }
            })
            .collect();
        ColorScaleLegend {
            low: self.low,
            high: self.high,
            stops,
        }
    }
}

fn turbo(t: f64) -> (u8, u8, u8) {
    (
        channel(&TURBO_R, t),
        channel(&TURBO_G, t),
        channel(&TURBO_B, t),
    )
}

fn channel(coefficients: &[f64; 6], t: f64) -> u8 {
    let value = coefficients
        .iter()
        .rev()
        .fold(0.0, |acc, coefficient| acc * t + coefficient);
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::TemperatureScale;

    #[test]
    fn normalize_clamps_outside_range() {
        let scale = TemperatureScale::default();
        assert_eq!(scale.normalize(-40.0), 0.0);
        assert_eq!(scale.normalize(55.0), 1.0);
        assert!((scale.normalize(15.0) - 0.5).abs() < 1e-12);
        assert_eq!(scale.normalize(f64::NAN), 0.0);
    }

    #[test]
    fn out_of_range_temperatures_share_endpoint_colors() {
        let scale = TemperatureScale::default();
        assert_eq!(scale.hex(-30.0), scale.hex(-10.0));
        assert_eq!(scale.hex(48.0), scale.hex(40.0));
    }

    #[test]
    fn freezing_is_blue_and_hot_is_red() {
        let scale = TemperatureScale::default();

        let (r, _, b) = scale.rgb(0.0);
        assert!(b > r, "0°C should lean blue, got r={r} b={b}");

        let (r, _, b) = scale.rgb(40.0);
        assert!(r > b, "40°C should lean red, got r={r} b={b}");
    }

    #[test]
    fn hex_is_css_color() {
        let hex = TemperatureScale::default().hex(21.3);
        assert_eq!(hex.len(), 7);
        assert!(hex.starts_with('#'));
        assert!(hex[1..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn invalid_range_falls_back_to_default() {
        assert_eq!(TemperatureScale::new(30.0, 10.0), TemperatureScale::default());
        assert_eq!(
            TemperatureScale::new(f64::NAN, 10.0),
            TemperatureScale::default()
        );
        assert_eq!(
            TemperatureScale::new(-20.0, 45.0),
            TemperatureScale {
                low: -20.0,
                high: 45.0
            }
        );
    }

    #[test]
    fn legend_spans_the_range() {
        let legend = TemperatureScale::default().legend(5);
        let temps: Vec<f64> = legend.stops.iter().map(|stop| stop.temp).collect();
        assert_eq!(temps, vec![-10.0, 2.5, 15.0, 27.5, 40.0]);
        assert_eq!(legend.low, -10.0);
        assert_eq!(legend.high, 40.0);
    }
}
