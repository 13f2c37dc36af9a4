pub mod decomposition;
pub mod feature_aggregator;
pub mod forecast_cycle;
pub mod irradiance;
pub mod log_writer;
pub mod mqtt_service;
pub mod solar_position;
pub mod sunshine;
pub mod weather_service;
