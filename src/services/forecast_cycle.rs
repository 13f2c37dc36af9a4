/// Forecast cycle
///
/// fetch → derive hourly → JSONL hourly → daily fold → JSONL daily →
/// shared state → log retention. A failed fetch skips the cycle; a failed
/// log write is reported and the cycle carries on.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::errors::ProviderError;
use crate::models::features::{GeoPoint, PvSnapshot, RecordMeta};
use crate::services::feature_aggregator::{aggregate_daily, derive_hourly_records};
use crate::services::log_writer::{JsonlWriter, DAILY, HOURLY};
use crate::services::weather_service::OpenMeteoClient;
use crate::shared_state::{AppState, ForecastSnapshot};

pub struct ForecastCycle {
    client: OpenMeteoClient,
    config: Config,
    point: GeoPoint,
    meta: RecordMeta,
    pv: PvSnapshot,
    writer: Option<JsonlWriter>,
    state: AppState,
    cycle: u64,
}

impl ForecastCycle {
    pub fn new(client: OpenMeteoClient, config: Config, point: GeoPoint, state: AppState) -> Self {
        let writer = config.app.jsonl_enabled().then(|| JsonlWriter::new(&config.app.log_dir));
        match &writer {
            Some(w) => info!(dir = %w.dir().display(), "JSONL logging enabled"),
            None => info!("log_raw and log_features are both off, JSONL logging disabled"),
        }
        Self {
            meta: config.record_meta(),
            pv: config.pv.snapshot(),
            client,
            config,
            point,
            writer,
            state,
            cycle: 0,
        }
    }

    /// Runs one cycle as of `now` and publishes the result to shared state.
    pub async fn run_once(&mut self, now: DateTime<Utc>) -> Result<ForecastSnapshot, ProviderError> {
        self.cycle += 1;
        info!(cycle = self.cycle, "starting forecast cycle");

        let forecast = self.client.fetch_forecast(&self.point, &self.config.provider, now).await?;
        let hourly = derive_hourly_records(&self.point, &self.meta, &forecast.hourly);

        #[cfg(feature = "verbose_log")]
        for r in &hourly {
            info!(
                ts = %r.ts_utc,
                ghi = r.ghi_w_m2,
                ghi_cs = r.ghi_cs_w_m2,
                k_ghi = r.k_ghi,
                dni = r.dni_w_m2,
                dhi = r.dhi_w_m2,
                elevation = r.geometry.elevation_deg,
                "hourly record"
            );
        }

        if let Some(writer) = &self.writer {
            if let Err(e) = writer.append_all(HOURLY, &hourly).await {
                warn!(error = %e, "hourly JSONL write failed");
            }
        }

        let daily = aggregate_daily(&hourly, &forecast.daily, &self.meta, &self.pv);

        if let Some(writer) = &self.writer {
            if let Err(e) = writer.append_all(DAILY, &daily).await {
                warn!(error = %e, "daily JSONL write failed");
            }
        }

        info!(
            cycle = self.cycle,
            hourly = hourly.len(),
            daily = daily.len(),
            "forecast cycle complete"
        );

        let snapshot = ForecastSnapshot {
            cycle: self.cycle,
            issue_time_utc: forecast.issue_time_utc,
            hourly,
            daily,
        };
        self.state.set_snapshot(snapshot.clone());

        if let Some(writer) = &self.writer {
            match writer.cleanup(self.config.app.log_retention_days).await {
                Ok(0) => {}
                Ok(n) => info!(removed = n, "pruned expired JSONL logs"),
                Err(e) => warn!(error = %e, "log retention cleanup failed"),
            }
        }

        Ok(snapshot)
    }

    /// Runs a cycle every `update_interval` seconds, forever.
    pub async fn run_forever(mut self) {
        let interval = Duration::from_secs(self.config.app.update_interval.max(1));
        loop {
            if let Err(e) = self.run_once(Utc::now()).await {
                error!(cycle = self.cycle, error = %e, "forecast cycle failed");
            }
            tokio::time::sleep(interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn body() -> serde_json::Value {
        json!({
            "hourly": {
                "time": ["2024-06-01T10:00", "2024-06-01T11:00", "2024-06-01T12:00"],
                "shortwave_radiation": [600.0, 700.0, 750.0],
                "cloudcover": [10.0, 20.0, 30.0],
                "temperature_2m": [20.0, 21.0, 22.0]
            },
            "daily": {
                "time": ["2024-06-01"],
                "sunshine_duration": [0.0],
                "temperature_2m_max": [25.0]
            }
        })
    }

    fn config(log_dir: &std::path::Path, log_enabled: bool) -> Config {
        let mut c = Config::default();
        c.site.site_id = "roof".into();
        c.site.latitude = 45.07;
        c.site.longitude = 7.33;
        c.app.log_dir = log_dir.to_string_lossy().into_owned();
        c.app.log_raw = log_enabled;
        c.app.log_features = log_enabled;
        c
    }

    async fn mock_provider() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body()))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn cycle_derives_logs_and_publishes() {
        let server = mock_provider().await;
        let dir = std::env::temp_dir().join(format!("cycle-test-{}", uuid::Uuid::new_v4()));
        let cfg = config(&dir, true);
        let point = cfg.location().unwrap();
        let state = AppState::new();
        let client = OpenMeteoClient::new(&server.uri()).unwrap();
        let mut cycle = ForecastCycle::new(client, cfg, point, state.clone());

        let now = Utc.with_ymd_and_hms(2024, 6, 1, 10, 5, 0).unwrap();
        let snap = cycle.run_once(now).await.unwrap();

        assert_eq!(snap.cycle, 1);
        assert_eq!(snap.hourly.len(), 3);
        assert!(snap.hourly.iter().all(|r| r.meta.site_id == "roof"));
        assert!(snap.hourly[0].geometry.elevation_deg > 0.0);
        assert_eq!(snap.daily.len(), 1);
        let day = &snap.daily[0];
        assert!((day.ghi_daily_total_mj_m2 - 2050.0 * 3600.0 / 1e6).abs() < 1e-9);
        assert!((day.cloud_cover_day_mean_pct - 20.0).abs() < 1e-9);
        // provider sunshine is zero, so the hourly sum is used
        assert_eq!(day.sunshine_duration_s, 3.0 * 3600.0);
        assert_eq!(day.temp_day_max_c, Some(25.0));
        assert_eq!(state.get_snapshot().cycle, 1);

        let hourly_log = tokio::fs::read_to_string(dir.join("hourly_20240601.jsonl")).await.unwrap();
        assert_eq!(hourly_log.lines().count(), 3);
        let daily_log = tokio::fs::read_to_string(dir.join("daily_2024.jsonl")).await.unwrap();
        let line: serde_json::Value = serde_json::from_str(daily_log.trim()).unwrap();
        assert_eq!(line["date_utc"], "2024-06-01");
        assert_eq!(line["pv_capacity_kw"], 3.0);

        let again = cycle.run_once(now).await.unwrap();
        assert_eq!(again.cycle, 2);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn run_forever_spawns_on_the_runtime() {
        let server = mock_provider().await;
        let dir = std::env::temp_dir().join(format!("cycle-test-{}", uuid::Uuid::new_v4()));
        let cfg = config(&dir, true);
        let point = cfg.location().unwrap();
        let state = AppState::new();
        let mut cycles = state.subscribe();
        let client = OpenMeteoClient::new(&server.uri()).unwrap();

        let task = tokio::spawn(ForecastCycle::new(client, cfg, point, state.clone()).run_forever());
        tokio::time::timeout(Duration::from_secs(10), cycles.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(*cycles.borrow(), 1);
        assert_eq!(state.get_snapshot().cycle, 1);

        task.abort();
        let _ = task.await;
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn logging_off_writes_nothing() {
        let server = mock_provider().await;
        let dir = std::env::temp_dir().join(format!("cycle-test-{}", uuid::Uuid::new_v4()));
        let cfg = config(&dir, false);
        let point = cfg.location().unwrap();
        let client = OpenMeteoClient::new(&server.uri()).unwrap();
        let mut cycle = ForecastCycle::new(client, cfg, point, AppState::new());

        let now = Utc.with_ymd_and_hms(2024, 6, 1, 10, 5, 0).unwrap();
        cycle.run_once(now).await.unwrap();
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn provider_failure_leaves_state_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let dir = std::env::temp_dir().join(format!("cycle-test-{}", uuid::Uuid::new_v4()));
        let cfg = config(&dir, false);
        let point = cfg.location().unwrap();
        let state = AppState::new();
        let client = OpenMeteoClient::new(&server.uri()).unwrap();
        let mut cycle = ForecastCycle::new(client, cfg, point, state.clone());

        assert!(cycle.run_once(Utc::now()).await.is_err());
        assert_eq!(state.get_snapshot().cycle, 0);
        assert!(state.get_snapshot().hourly.is_empty());
    }
}
