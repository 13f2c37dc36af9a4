use utoipa::OpenApi;
use crate::controllers::forecast_controller;
use crate::models::{api, features, weather};
use crate::config;

#[derive(OpenApi)]
#[openapi(
    paths(
        forecast_controller::get_now,
        forecast_controller::get_hourly,
        forecast_controller::get_daily,
        forecast_controller::get_site,
        forecast_controller::get_health
    ),
    components(
        schemas(
            api::NowResponse,
            api::HourlyResponse,
            api::DailyResponse,
            api::DailySeriesPoint,
            api::SiteInfo,
            api::HealthResponse,
            features::HourlyRecord,
            features::DailyAggregate,
            features::PvSnapshot,
            features::RecordMeta,
            features::SolarGeometry,
            weather::RawHourlyRecord,
            weather::RawDailyRecord,
            config::SiteConfig,
            config::ProviderConfig
        )
    ),
    tags(
        (name = "solar-weather-features", description = "Weather forecast and solar irradiance feature API")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in ["/api/now", "/api/hourly", "/api/daily", "/api/site", "/api/health"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
