use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use axum::extract::FromRef;
use chrono::{DateTime, DurationRound, NaiveDate, TimeDelta, Utc};
use serde::Serialize;
use tokio::sync::watch;
use utoipa::ToSchema;

use crate::config::Config;
use crate::models::features::{DailyAggregate, HourlyRecord};
use crate::services::feature_aggregator::parse_instant;

/// Everything produced by one forecast cycle.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ForecastSnapshot {
    pub cycle: u64,
    pub issue_time_utc: String,
    pub hourly: Vec<HourlyRecord>,
    pub daily: Vec<DailyAggregate>,
}

impl ForecastSnapshot {
    /// First hour at or after `now` truncated to the hour.
    pub fn current_hour(&self, now: DateTime<Utc>) -> Option<&HourlyRecord> {
        let hour = now.duration_trunc(TimeDelta::hours(1)).unwrap_or(now);
        self.hourly
            .iter()
            .find(|r| parse_instant(&r.ts_utc).map(|ts| ts >= hour).unwrap_or(false))
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DailyAggregate> {
        let key = date.format("%Y-%m-%d").to_string();
        self.daily.iter().find(|d| d.date_utc == key)
    }
}

#[derive(Clone, Debug)]
pub struct AppState {
    /// Latest completed forecast cycle
    pub snapshot: Arc<RwLock<ForecastSnapshot>>,
    pub mqtt_connected: Arc<AtomicBool>,
    pub started_at: Instant,
    cycles: Arc<watch::Sender<u64>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            snapshot: Arc::new(RwLock::new(ForecastSnapshot::default())),
            mqtt_connected: Arc::new(AtomicBool::new(false)),
            started_at: Instant::now(),
            cycles: Arc::new(tx),
        }
    }

    /// Replaces the snapshot and wakes every subscriber.
    pub fn set_snapshot(&self, snapshot: ForecastSnapshot) {
        let cycle = snapshot.cycle;
        if let Ok(mut current) = self.snapshot.write() {
            *current = snapshot;
        }
        self.cycles.send_replace(cycle);
    }

    pub fn get_snapshot(&self) -> ForecastSnapshot {
        match self.snapshot.read() {
            Ok(s) => s.clone(),
            Err(_) => ForecastSnapshot::default(),
        }
    }

    /// Receiver that changes whenever a new cycle completes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.cycles.subscribe()
    }

    pub fn is_mqtt_connected(&self) -> bool {
        self.mqtt_connected.load(Ordering::Relaxed)
    }

    pub fn set_mqtt_connected(&self, value: bool) {
        self.mqtt_connected.store(value, Ordering::Relaxed);
    }
}

/// Router state. Handlers extract `State<AppState>` and/or `State<Config>`
/// via `FromRef`, so a single `.with_state(shared)` covers both.
#[derive(Clone, Debug)]
pub struct SharedState {
    pub app: AppState,
    pub config: Config,
}

impl FromRef<SharedState> for AppState {
    fn from_ref(shared: &SharedState) -> Self {
        shared.app.clone()
    }
}

impl FromRef<SharedState> for Config {
    fn from_ref(shared: &SharedState) -> Self {
        shared.config.clone()
    }
}
