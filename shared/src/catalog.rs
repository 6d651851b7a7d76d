use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Built-in city dataset, grouped by region in selector order.
const BUILTIN_REGIONS_JSON: &str = include_str!("../data/regions.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub name: String,
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub key: String,
    pub label: String,
    pub points: Vec<GeoPoint>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to decode region catalog: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("region catalog contains no regions")]
    Empty,
    #[error("region key {0:?} appears more than once")]
    DuplicateRegion(String),
    #[error("region {0:?} has no points")]
    EmptyRegion(String),
    #[error("region {region:?} lists {name:?} more than once")]
    DuplicatePoint { region: String, name: String },
    #[error("{name:?} in region {region:?} has latitude {latitude} outside (-90, 90)")]
    LatitudeOutOfRange {
        region: String,
        name: String,
        latitude: f64,
    },
    #[error("{name:?} in region {region:?} has longitude {longitude} outside [-180, 180]")]
    LongitudeOutOfRange {
        region: String,
        name: String,
        longitude: f64,
    },
    #[error("default region {0:?} is not in the catalog")]
    MissingDefaultRegion(String),
}

/// Read-only catalog of regions. Order is the region selector's index space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionCatalog {
    default_region: String,
    regions: Vec<Region>,
}

impl RegionCatalog {
    pub fn new(
        default_region: impl Into<String>,
        regions: Vec<Region>,
    ) -> Result<Self, CatalogError> {
        let catalog = Self {
            default_region: default_region.into(),
            regions,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// The dataset compiled into the binary.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_REGIONS_JSON.as_bytes())
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, CatalogError> {
        let catalog: Self = serde_json::from_slice(bytes)?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.regions.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut keys = HashSet::with_capacity(self.regions.len());
        for region in &self.regions {
            if !keys.insert(region.key.as_str()) {
                return Err(CatalogError::DuplicateRegion(region.key.clone()));
            }
            if region.points.is_empty() {
                return Err(CatalogError::EmptyRegion(region.key.clone()));
            }

            let mut names = HashSet::with_capacity(region.points.len());
            for point in &region.points {
                if !names.insert(point.name.as_str()) {
                    return Err(CatalogError::DuplicatePoint {
                        region: region.key.clone(),
                        name: point.name.clone(),
                    });
                }
                // NaN fails both range checks as well.
                if !(point.latitude > -90.0 && point.latitude < 90.0) {
                    return Err(CatalogError::LatitudeOutOfRange {
                        region: region.key.clone(),
                        name: point.name.clone(),
                        latitude: point.latitude,
                    });
                }
                if !(-180.0..=180.0).contains(&point.longitude) {
                    return Err(CatalogError::LongitudeOutOfRange {
                        region: region.key.clone(),
                        name: point.name.clone(),
                        longitude: point.longitude,
                    });
                }
            }
        }

        if !keys.contains(self.default_region.as_str()) {
            return Err(CatalogError::MissingDefaultRegion(
                self.default_region.clone(),
            ));
        }

        Ok(())
    }

    pub fn default_region(&self) -> &str {
        &self.default_region
    }

    pub fn get(&self, key: &str) -> Option<&Region> {
        self.regions.iter().find(|region| region.key == key)
    }

    pub fn by_index(&self, index: usize) -> Option<&Region> {
        self.regions.get(index)
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.regions.iter().position(|region| region.key == key)
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
