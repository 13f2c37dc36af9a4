/// MQTT telemetry publisher
///
/// Publishes the latest forecast cycle as small JSON payloads under
/// `{prefix}/{site_id}/…`:
///   - `hourly/<metric>`                 current-hour value `{ts_utc, value}`
///   - `daily/ghi_daily_total_mj_m2`     retained series `{series: [{date_utc, value}]}`
///   - `daily/{today|tomorrow}/<metric>` retained `{date_utc, value}`
///   - `availability`                    retained `online` / `offline` (last will)
///
/// Optional Home Assistant discovery configs go to
/// `homeassistant/sensor/{unique_id}/config`.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use rumqttc::{AsyncClient, Event, LastWill, MqttOptions, Packet, QoS};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::MqttConfig;
use crate::models::features::{DailyAggregate, HourlyRecord};
use crate::shared_state::{AppState, ForecastSnapshot};

#[derive(Debug, Clone, PartialEq)]
pub struct Outgoing {
    pub topic: String,
    pub payload: String,
    pub qos: QoS,
    pub retain: bool,
}

impl Outgoing {
    fn json(topic: String, payload: serde_json::Value, retain: bool) -> Self {
        Self { topic, payload: payload.to_string(), qos: QoS::AtMostOnce, retain }
    }
}

pub fn topic_base(prefix: &str, site_id: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), site_id)
}

// ─── Payload builders ────────────────────────────────────────────────────────

fn hourly_values(r: &HourlyRecord) -> [(&'static str, f64); 12] {
    [
        ("ghi_w_m2", r.ghi_w_m2),
        ("dni_w_m2", r.dni_w_m2),
        ("dhi_w_m2", r.dhi_w_m2),
        ("k_ghi", r.k_ghi),
        ("sun_elevation_deg", r.geometry.elevation_deg),
        ("sun_azimuth_deg", r.geometry.azimuth_deg),
        ("cloud_cover_pct", r.cloud_cover_pct),
        ("temp_2m_c", r.temp_2m_c),
        ("wind_speed_10m_ms", r.wind_speed_10m_ms),
        ("precip_mm", r.precip_mm),
        ("precip_probability_pct", r.precip_probability_pct),
        ("sunshine_duration_s_hour", r.sunshine_duration_s_hour),
    ]
}

pub fn hourly_messages(base: &str, current: &HourlyRecord) -> Vec<Outgoing> {
    hourly_values(current)
        .into_iter()
        .map(|(metric, value)| {
            Outgoing::json(
                format!("{base}/hourly/{metric}"),
                json!({ "ts_utc": current.ts_utc, "value": value }),
                false,
            )
        })
        .collect()
}

fn day_messages(base: &str, bucket: &str, d: &DailyAggregate) -> Vec<Outgoing> {
    let values = [
        ("ghi_daily_total_mj_m2", json!(d.ghi_daily_total_mj_m2)),
        ("sunshine_duration_s", json!(d.sunshine_duration_s)),
        ("precip_day_total_mm", json!(d.precip_day_total_mm)),
        ("temp_day_max_c", json!(d.temp_day_max_c)),
        ("cloud_cover_day_mean_pct", json!(d.cloud_cover_day_mean_pct)),
    ];
    values
        .into_iter()
        .map(|(metric, value)| {
            Outgoing::json(
                format!("{base}/daily/{bucket}/{metric}"),
                json!({ "date_utc": d.date_utc, "value": value }),
                true,
            )
        })
        .collect()
}

pub fn daily_messages(base: &str, snapshot: &ForecastSnapshot, now: DateTime<Utc>) -> Vec<Outgoing> {
    let series: Vec<_> = snapshot
        .daily
        .iter()
        .map(|d| json!({ "date_utc": d.date_utc, "value": d.ghi_daily_total_mj_m2 }))
        .collect();
    let mut out = vec![Outgoing::json(
        format!("{base}/daily/ghi_daily_total_mj_m2"),
        json!({ "series": series }),
        true,
    )];

    let today = now.date_naive();
    let tomorrow = today + TimeDelta::days(1);
    for (bucket, date) in [("today", today), ("tomorrow", tomorrow)] {
        if let Some(d) = snapshot.day(date) {
            out.extend(day_messages(base, bucket, d));
        }
    }
    out
}

/// Every message for one completed cycle.
pub fn cycle_messages(base: &str, snapshot: &ForecastSnapshot, now: DateTime<Utc>) -> Vec<Outgoing> {
    let mut out = snapshot
        .current_hour(now)
        .map(|cur| hourly_messages(base, cur))
        .unwrap_or_default();
    out.extend(daily_messages(base, snapshot, now));
    out
}

// ─── Home Assistant discovery ────────────────────────────────────────────────

struct SensorSpec {
    id: &'static str,
    name: &'static str,
    state_suffix: &'static str,
    unit: Option<&'static str>,
    device_class: Option<&'static str>,
}

const fn sensor(
    id: &'static str,
    name: &'static str,
    state_suffix: &'static str,
    unit: Option<&'static str>,
    device_class: Option<&'static str>,
) -> SensorSpec {
    SensorSpec { id, name, state_suffix, unit, device_class }
}

const SENSORS: &[SensorSpec] = &[
    sensor("ghi", "GHI", "hourly/ghi_w_m2", Some("W/m²"), Some("irradiance")),
    sensor("sun_elevation", "Sun Elevation", "hourly/sun_elevation_deg", Some("°"), None),
    sensor("cloud_cover", "Cloud Cover", "hourly/cloud_cover_pct", Some("%"), None),
    sensor("dni", "DNI", "hourly/dni_w_m2", Some("W/m²"), Some("irradiance")),
    sensor("dhi", "DHI", "hourly/dhi_w_m2", Some("W/m²"), Some("irradiance")),
    sensor("k_ghi", "k_GHI", "hourly/k_ghi", None, None),
    sensor("sun_azimuth", "Sun Azimuth", "hourly/sun_azimuth_deg", Some("°"), None),
    sensor("sunshine_hour", "Sunshine (hour)", "hourly/sunshine_duration_s_hour", Some("s"), None),
    sensor("temp2m", "Temperature", "hourly/temp_2m_c", Some("°C"), Some("temperature")),
    sensor("wind10m", "Wind 10m", "hourly/wind_speed_10m_ms", Some("m/s"), None),
    sensor("precip", "Precipitation", "hourly/precip_mm", Some("mm"), None),
    sensor("precip_prob", "Precip Probability", "hourly/precip_probability_pct", Some("%"), None),
    sensor("ghi_today", "GHI Today", "daily/today/ghi_daily_total_mj_m2", Some("MJ/m²"), None),
    sensor("sunshine_today", "Sunshine Today", "daily/today/sunshine_duration_s", Some("s"), None),
    sensor("precip_today", "Precip Today", "daily/today/precip_day_total_mm", Some("mm"), None),
    sensor("tmax_today", "Temp Max Today", "daily/today/temp_day_max_c", Some("°C"), Some("temperature")),
    sensor("ghi_tomorrow", "GHI Tomorrow", "daily/tomorrow/ghi_daily_total_mj_m2", Some("MJ/m²"), None),
    sensor("sunshine_tomorrow", "Sunshine Tomorrow", "daily/tomorrow/sunshine_duration_s", Some("s"), None),
    sensor("precip_tomorrow", "Precip Tomorrow", "daily/tomorrow/precip_day_total_mm", Some("mm"), None),
    sensor("tmax_tomorrow", "Temp Max Tomorrow", "daily/tomorrow/temp_day_max_c", Some("°C"), Some("temperature")),
];

pub fn discovery_messages(base: &str, site_id: &str) -> Vec<Outgoing> {
    SENSORS
        .iter()
        .map(|s| {
            let unique_id = format!("weather_{}_{}", site_id, s.id);
            let mut payload = json!({
                "name": format!("Weather {} {}", site_id, s.name),
                "unique_id": unique_id,
                "state_topic": format!("{base}/{}", s.state_suffix),
                "availability_topic": format!("{base}/availability"),
                "value_template": "{{ value_json.value }}",
                "state_class": "measurement",
                "device": {
                    "identifiers": [format!("weather_addon_{site_id}")],
                    "name": format!("Weather {site_id}"),
                    "manufacturer": "Weather Add-on",
                    "model": "Solar Forecast",
                    "sw_version": env!("CARGO_PKG_VERSION"),
                },
            });
            if let Some(unit) = s.unit {
                payload["unit_of_measurement"] = json!(unit);
            }
            if let Some(class) = s.device_class {
                payload["device_class"] = json!(class);
            }
            Outgoing {
                topic: format!("homeassistant/sensor/{unique_id}/config"),
                payload: payload.to_string(),
                qos: QoS::AtLeastOnce,
                retain: true,
            }
        })
        .collect()
}

// ─── Broker loop ─────────────────────────────────────────────────────────────

/// Sent on every (re)connect: `online`, discovery configs when enabled, then
/// the latest completed cycle if there is one.
pub fn on_connect_messages(
    base: &str,
    site_id: &str,
    discovery: bool,
    snapshot: &ForecastSnapshot,
    now: DateTime<Utc>,
) -> Vec<Outgoing> {
    let mut out = vec![Outgoing {
        topic: format!("{base}/availability"),
        payload: "online".into(),
        qos: QoS::AtLeastOnce,
        retain: true,
    }];
    if discovery {
        out.extend(discovery_messages(base, site_id));
    }
    if snapshot.cycle > 0 {
        out.extend(cycle_messages(base, snapshot, now));
    }
    out
}

fn send(client: &AsyncClient, msg: Outgoing) -> bool {
    match client.try_publish(&msg.topic, msg.qos, msg.retain, msg.payload.into_bytes()) {
        Ok(()) => true,
        Err(e) => {
            warn!(topic = %msg.topic, error = %e, "MQTT publish failed");
            false
        }
    }
}

pub async fn run_publisher(cfg: MqttConfig, site_id: String, state: AppState) {
    if !cfg.mqtt_enabled || cfg.mqtt_host.is_empty() {
        info!("MQTT disabled or no broker configured, skipping publisher");
        return;
    }

    let base = topic_base(&cfg.mqtt_topic_prefix, &site_id);
    let availability = format!("{base}/availability");
    let client_id = format!("weather-{}-{}", site_id, uuid::Uuid::new_v4());
    info!(host = %cfg.mqtt_host, port = cfg.mqtt_port, client_id = %client_id, "connecting to MQTT broker");

    let mut opts = MqttOptions::new(&client_id, &cfg.mqtt_host, cfg.mqtt_port);
    opts.set_keep_alive(Duration::from_secs(30));
    opts.set_clean_session(true);
    opts.set_last_will(LastWill::new(&availability, "offline", QoS::AtLeastOnce, true));
    if !cfg.mqtt_username.is_empty() {
        opts.set_credentials(&cfg.mqtt_username, &cfg.mqtt_password);
    }

    let (client, mut eventloop) = AsyncClient::new(opts, 128);
    let mut cycles = state.subscribe();

    loop {
        tokio::select! {
            event = eventloop.poll() => match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    state.set_mqtt_connected(true);
                    info!("MQTT connected");
                    let messages = on_connect_messages(
                        &base,
                        &site_id,
                        cfg.ha_discovery_enabled,
                        &state.get_snapshot(),
                        Utc::now(),
                    );
                    let total = messages.len();
                    let sent = messages.into_iter().filter(|m| send(&client, m.clone())).count();
                    info!(sent, total, "published availability, discovery and latest cycle");
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "MQTT event loop error, will reconnect");
                    state.set_mqtt_connected(false);
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            },
            changed = cycles.changed() => {
                if changed.is_err() {
                    break;
                }
                if !state.is_mqtt_connected() {
                    debug!("MQTT not connected, skipping cycle publish");
                    continue;
                }
                let messages = cycle_messages(&base, &state.get_snapshot(), Utc::now());
                let total = messages.len();
                let sent = messages.into_iter().filter(|m| send(&client, m.clone())).count();
                debug!(sent, total, "published cycle to MQTT");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::features::{DerivedHourlyFeatures, PvSnapshot, RecordMeta, SolarGeometry};
    use crate::models::weather::RawHourlyRecord;
    use chrono::TimeZone;

    fn meta() -> RecordMeta {
        RecordMeta {
            provider: "open-meteo".into(),
            provider_model: "auto".into(),
            site_id: "roof".into(),
            latitude: 45.0,
            longitude: 7.0,
            timezone: "UTC".into(),
            data_version: "1.0".into(),
        }
    }

    fn hourly(ts: &str, ghi: f64) -> HourlyRecord {
        let raw = RawHourlyRecord { ts_utc: ts.into(), ghi_w_m2: Some(ghi), ..Default::default() };
        let derived = DerivedHourlyFeatures {
            geometry: SolarGeometry { elevation_deg: 40.0, azimuth_deg: 170.0, zenith_deg: 50.0 },
            ghi_cs_w_m2: 700.0,
            k_ghi: ghi / 700.0,
            k_dni: 0.4,
            sunshine_duration_s_hour: 3600.0,
            dni_w_m2: 300.0,
            dhi_w_m2: 120.0,
        };
        HourlyRecord::new(&meta(), &raw, &derived)
    }

    fn day(date: &str, ghi_total: f64) -> DailyAggregate {
        DailyAggregate {
            date_utc: date.into(),
            meta: meta(),
            sunrise: None,
            sunset: None,
            temp_day_max_c: Some(25.0),
            temp_day_min_c: None,
            precip_day_total_mm: None,
            precip_probability_max_pct: None,
            wind_day_max_ms: None,
            sunshine_duration_s: 36_000.0,
            ghi_daily_total_mj_m2: ghi_total,
            cloud_cover_day_mean_pct: 12.5,
            hours_count: 24,
            pv: PvSnapshot {
                pv_capacity_kw: 3.0,
                tilt_deg: 35.0,
                albedo: 0.2,
                gamma_p_pct_per_c: -0.4,
                noct_cell_temp_c: 45.0,
                inverter_ac_limit_kw: 3.0,
            },
        }
    }

    #[test]
    fn topic_base_trims_trailing_slash() {
        assert_eq!(topic_base("weather/", "roof"), "weather/roof");
        assert_eq!(topic_base("weather", "roof"), "weather/roof");
    }

    #[test]
    fn hourly_messages_cover_every_metric() {
        let msgs = hourly_messages("weather/roof", &hourly("2024-06-01T10:00:00Z", 560.0));
        assert_eq!(msgs.len(), 12);
        let ghi = msgs.iter().find(|m| m.topic == "weather/roof/hourly/ghi_w_m2").unwrap();
        let payload: serde_json::Value = serde_json::from_str(&ghi.payload).unwrap();
        assert_eq!(payload["ts_utc"], "2024-06-01T10:00:00Z");
        assert_eq!(payload["value"], 560.0);
        assert!(!ghi.retain);
        assert!(msgs.iter().any(|m| m.topic.ends_with("/hourly/sun_elevation_deg")));
    }

    #[test]
    fn daily_messages_series_and_buckets() {
        let snapshot = ForecastSnapshot {
            daily: vec![day("2024-06-01", 20.5), day("2024-06-02", 18.0), day("2024-06-03", 9.0)],
            ..Default::default()
        };
        let now = Utc.with_ymd_and_hms(2024, 6, 2, 8, 0, 0).unwrap();
        let msgs = daily_messages("weather/roof", &snapshot, now);
        // series + 5 today + 5 tomorrow
        assert_eq!(msgs.len(), 11);
        assert!(msgs.iter().all(|m| m.retain));

        let series: serde_json::Value = serde_json::from_str(&msgs[0].payload).unwrap();
        assert_eq!(series["series"].as_array().unwrap().len(), 3);

        let today = msgs
            .iter()
            .find(|m| m.topic == "weather/roof/daily/today/ghi_daily_total_mj_m2")
            .unwrap();
        let payload: serde_json::Value = serde_json::from_str(&today.payload).unwrap();
        assert_eq!(payload["date_utc"], "2024-06-02");
        assert_eq!(payload["value"], 18.0);

        let precip = msgs
            .iter()
            .find(|m| m.topic == "weather/roof/daily/tomorrow/precip_day_total_mm")
            .unwrap();
        let payload: serde_json::Value = serde_json::from_str(&precip.payload).unwrap();
        assert!(payload["value"].is_null());
    }

    #[test]
    fn cycle_messages_skip_hourly_without_current_hour() {
        let snapshot = ForecastSnapshot {
            hourly: vec![hourly("2024-06-01T10:00:00Z", 500.0)],
            ..Default::default()
        };
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 10, 30, 0).unwrap();
        assert_eq!(cycle_messages("w/s", &snapshot, now).len(), 13);

        let later = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(cycle_messages("w/s", &snapshot, later).len(), 1);
    }

    #[test]
    fn connect_republishes_latest_cycle() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 10, 30, 0).unwrap();
        let empty = ForecastSnapshot::default();
        let msgs = on_connect_messages("weather/roof", "roof", false, &empty, now);
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].topic, "weather/roof/availability");
        assert_eq!(msgs[0].payload, "online");
        assert!(msgs[0].retain);

        let done = ForecastSnapshot {
            cycle: 1,
            hourly: vec![hourly("2024-06-01T10:00:00Z", 500.0)],
            daily: vec![day("2024-06-01", 20.5)],
            ..Default::default()
        };
        // online + 12 hourly + series + 5 today
        let msgs = on_connect_messages("weather/roof", "roof", false, &done, now);
        assert_eq!(msgs.len(), 19);
        assert!(msgs.iter().any(|m| m.topic == "weather/roof/hourly/ghi_w_m2"));
        assert!(msgs.iter().any(|m| m.topic == "weather/roof/daily/today/temp_day_max_c"));

        // discovery goes before state
        let msgs = on_connect_messages("weather/roof", "roof", true, &done, now);
        assert_eq!(msgs.len(), 39);
        assert!(msgs[1].topic.starts_with("homeassistant/sensor/"));
        assert!(msgs[20].topic.starts_with("homeassistant/sensor/"));
        assert!(msgs[21].topic.starts_with("weather/roof/hourly/"));
    }

    #[test]
    fn discovery_configs() {
        let msgs = discovery_messages("weather/roof", "roof");
        assert_eq!(msgs.len(), 20);
        assert!(msgs.iter().all(|m| m.retain && m.qos == QoS::AtLeastOnce));

        let dni = msgs
            .iter()
            .find(|m| m.topic == "homeassistant/sensor/weather_roof_dni/config")
            .unwrap();
        let payload: serde_json::Value = serde_json::from_str(&dni.payload).unwrap();
        assert_eq!(payload["state_topic"], "weather/roof/hourly/dni_w_m2");
        assert_eq!(payload["availability_topic"], "weather/roof/availability");
        assert_eq!(payload["unit_of_measurement"], "W/m²");
        assert_eq!(payload["device_class"], "irradiance");

        let k = msgs.iter().find(|m| m.topic.contains("weather_roof_k_ghi")).unwrap();
        let payload: serde_json::Value = serde_json::from_str(&k.payload).unwrap();
        assert!(payload.get("unit_of_measurement").is_none());
    }
}
