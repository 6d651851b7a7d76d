pub mod catalog;
pub mod colors;
pub mod projection;
pub mod view;
pub mod weather;

pub use catalog::{CatalogError, GeoPoint, Region, RegionCatalog};
pub use colors::TemperatureScale;
pub use projection::project;
pub use view::*;
pub use weather::WeatherSample;
