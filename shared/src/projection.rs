use std::f64::consts::PI;

/// Equatorial Earth radius in meters (WGS84 / spherical web mercator).
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Meters of mercator `x` per degree of longitude.
pub const METERS_PER_DEGREE: f64 = EARTH_RADIUS_M * PI / 180.0;

/// Project a geographic coordinate onto the spherical web-mercator plane.
///
/// Total for `lat` strictly inside (-90, 90). At the poles the formula hits its
/// asymptote and yields an infinite `y`; callers that cannot tolerate that must
/// keep such latitudes out (the region catalog rejects them at load time).
pub fn project(lat: f64, lon: f64) -> (f64, f64) {
    let x = lon * METERS_PER_DEGREE;
    let y = ((90.0 + lat) * PI / 360.0).tan().ln() * EARTH_RADIUS_M;
    (x, y)
}
