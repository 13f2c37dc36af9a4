use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::errors::ConfigError;
use crate::models::features::{GeoPoint, PvSnapshot, RecordMeta};

pub const DEFAULT_OPTIONS_PATH: &str = "/data/options.json";

/// Add-on options. The file is flat JSON; each concern is flattened in.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub site: SiteConfig,
    #[serde(flatten)]
    pub provider: ProviderConfig,
    #[serde(flatten)]
    pub pv: PvConfig,
    #[serde(flatten)]
    pub app: AppConfig,
    #[serde(flatten)]
    pub mqtt: MqttConfig,
    #[serde(flatten)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, ToSchema)]
#[serde(default)]
pub struct SiteConfig {
    pub site_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation_m: f64,
    pub timezone: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_id: "default".into(),
            latitude: 0.0,
            longitude: 0.0,
            elevation_m: 0.0,
            timezone: "UTC".into(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, ToSchema)]
#[serde(default)]
pub struct ProviderConfig {
    pub provider: String,
    pub provider_model: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    /// `metric` or `imperial`
    pub units: String,
    pub forecast_days: u32,
    pub hourly_horizon_h: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: "open-meteo".into(),
            provider_model: "auto".into(),
            api_key: String::new(),
            units: "metric".into(),
            forecast_days: 7,
            hourly_horizon_h: 72,
        }
    }
}

/// PV parameters. Recorded on every daily aggregate, not used in derivation.
#[derive(Debug, Deserialize, Serialize, Clone, ToSchema)]
#[serde(default)]
pub struct PvConfig {
    pub pv_capacity_kw: f64,
    pub tilt_deg: f64,
    pub albedo: f64,
    pub gamma_p_pct_per_c: f64,
    pub noct_cell_temp_c: f64,
    /// Defaults to `pv_capacity_kw` when absent
    pub inverter_ac_limit_kw: Option<f64>,
}

impl Default for PvConfig {
    fn default() -> Self {
        Self {
            pv_capacity_kw: 3.0,
            tilt_deg: 35.0,
            albedo: 0.20,
            gamma_p_pct_per_c: -0.4,
            noct_cell_temp_c: 45.0,
            inverter_ac_limit_kw: None,
        }
    }
}

impl PvConfig {
    pub fn snapshot(&self) -> PvSnapshot {
        PvSnapshot {
            pv_capacity_kw: self.pv_capacity_kw,
            tilt_deg: self.tilt_deg,
            albedo: self.albedo,
            gamma_p_pct_per_c: self.gamma_p_pct_per_c,
            noct_cell_temp_c: self.noct_cell_temp_c,
            inverter_ac_limit_kw: self.inverter_ac_limit_kw.unwrap_or(self.pv_capacity_kw),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    /// Seconds between forecast cycles
    pub update_interval: u64,
    pub log_level: String,
    pub log_dir: String,
    pub log_raw: bool,
    pub log_features: bool,
    pub log_retention_days: i64,
    pub log_format: String,
    pub data_version: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            update_interval: 300,
            log_level: "INFO".into(),
            log_dir: "/data/logs".into(),
            log_raw: true,
            log_features: true,
            log_retention_days: 90,
            log_format: "jsonl".into(),
            data_version: "1.0".into(),
        }
    }
}

impl AppConfig {
    pub fn jsonl_enabled(&self) -> bool {
        self.log_raw || self.log_features
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MqttConfig {
    pub mqtt_enabled: bool,
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_username: String,
    pub mqtt_password: String,
    pub mqtt_topic_prefix: String,
    pub ha_discovery_enabled: bool,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            mqtt_enabled: true,
            mqtt_host: "core-mosquitto".into(),
            mqtt_port: 1883,
            mqtt_username: String::new(),
            mqtt_password: String::new(),
            mqtt_topic_prefix: "weather".into(),
            ha_discovery_enabled: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub api_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { api_port: 8099 }
    }
}

impl Config {
    /// Reads the options file. A missing file yields the defaults; a file
    /// that exists but does not parse is an error. Runs before the tracing
    /// subscriber is installed, so the caller reports the missing file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        Ok(config)
    }

    pub fn location(&self) -> Result<GeoPoint, ConfigError> {
        Ok(GeoPoint::new(self.site.latitude, self.site.longitude)?)
    }

    pub fn record_meta(&self) -> RecordMeta {
        RecordMeta {
            provider: self.provider.provider.clone(),
            provider_model: self.provider.provider_model.clone(),
            site_id: self.site.site_id.clone(),
            latitude: self.site.latitude,
            longitude: self.site.longitude,
            timezone: self.site.timezone.clone(),
            data_version: self.app.data_version.clone(),
        }
    }

    pub fn log_summary(&self) {
        info!("===== CONFIGURATION SUMMARY =====");
        info!("Site: {}", self.site.site_id);
        info!(
            "Location: lat={}, lon={}, elev={} m, tz={}",
            self.site.latitude, self.site.longitude, self.site.elevation_m, self.site.timezone
        );
        info!("Provider: {} (model={})", self.provider.provider, self.provider.provider_model);
        info!("Units: {}", self.provider.units);
        let pv = self.pv.snapshot();
        info!(
            "PV: capacity={} kW, tilt={}°, inverter_limit={} kW",
            pv.pv_capacity_kw, pv.tilt_deg, pv.inverter_ac_limit_kw
        );
        info!(
            "Forecast: days={}, hourly_h={}, interval={}s",
            self.provider.forecast_days, self.provider.hourly_horizon_h, self.app.update_interval
        );
        info!(
            "MQTT: enabled={} host={}:{} prefix={} discovery={}",
            self.mqtt.mqtt_enabled,
            self.mqtt.mqtt_host,
            self.mqtt.mqtt_port,
            self.mqtt.mqtt_topic_prefix,
            self.mqtt.ha_discovery_enabled
        );
        info!(
            "Logging: lvl={} fmt={} dir={} raw={} features={} retention={}d version={}",
            self.app.log_level,
            self.app.log_format,
            self.app.log_dir,
            self.app.log_raw,
            self.app.log_features,
            self.app.log_retention_days,
            self.app.data_version
        );
        info!("API: port={}", self.server.api_port);
        info!("=================================");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let c = Config::from_json("{}").unwrap();
        assert_eq!(c.site.site_id, "default");
        assert_eq!(c.provider.forecast_days, 7);
        assert_eq!(c.provider.hourly_horizon_h, 72);
        assert_eq!(c.app.update_interval, 300);
        assert_eq!(c.app.log_retention_days, 90);
        assert!(c.mqtt.mqtt_enabled);
        assert_eq!(c.mqtt.mqtt_port, 1883);
        assert_eq!(c.server.api_port, 8099);
        assert_eq!(c.pv.snapshot().inverter_ac_limit_kw, 3.0);
    }

    #[test]
    fn flat_options_populate_every_section() {
        let c = Config::from_json(
            r#"{
                "site_id": "roof",
                "latitude": 45.07,
                "longitude": 7.33,
                "units": "imperial",
                "pv_capacity_kw": 6.5,
                "tilt_deg": 30,
                "log_raw": false,
                "log_features": false,
                "mqtt_host": "broker.local",
                "ha_discovery_enabled": true,
                "api_port": 9000
            }"#,
        )
        .unwrap();
        assert_eq!(c.site.site_id, "roof");
        assert_eq!(c.provider.units, "imperial");
        assert_eq!(c.pv.snapshot().inverter_ac_limit_kw, 6.5);
        assert_eq!(c.pv.tilt_deg, 30.0);
        assert!(!c.app.jsonl_enabled());
        assert_eq!(c.mqtt.mqtt_host, "broker.local");
        assert!(c.mqtt.ha_discovery_enabled);
        assert_eq!(c.server.api_port, 9000);

        let loc = c.location().unwrap();
        assert_eq!(loc.latitude(), 45.07);
        assert_eq!(c.record_meta().site_id, "roof");
    }

    #[test]
    fn explicit_inverter_limit_wins() {
        let c = Config::from_json(r#"{"pv_capacity_kw": 6.0, "inverter_ac_limit_kw": 5.0}"#).unwrap();
        assert_eq!(c.pv.snapshot().inverter_ac_limit_kw, 5.0);
    }

    #[test]
    fn invalid_location_is_rejected() {
        let c = Config::from_json(r#"{"latitude": 123.0}"#).unwrap();
        assert!(matches!(c.location(), Err(ConfigError::Location(_))));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(Config::from_json("{not json"), Err(ConfigError::Json(_))));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let c = Config::load("/nonexistent/options.json").unwrap();
        assert_eq!(c.provider.provider, "open-meteo");
    }
}
