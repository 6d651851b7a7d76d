pub mod catalog_loader;
pub mod view_driver;
pub mod weather_provider;
pub mod weather_refresh;
