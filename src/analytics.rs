use chrono::NaiveDate;
use log::debug;
use serde_json::Value;

use crate::{client::TunesClient, error::Result};

pub const APP_MEASURES: &[&str] = &["pageViewCount", "units", "sales", "sessions"];
pub const CRASH_MEASURES: &[&str] = &["crashes"];
pub const ALL_TIME_MEASURES: &[&str] = &["pageViewCount", "units", "sales", "sessions", "crashes"];

/// App analytics and reviews. Responses are passed through untouched; their shape
/// is whatever iTunes Connect returns.
pub struct AnalyticsClient<'a, C: TunesClient> {
    client: &'a C,
}

impl<'a, C: TunesClient> AnalyticsClient<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Page views, units, sales and sessions for each app over the range.
    pub async fn apps(
        &self,
        app_ids: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Value> {
        debug!("app analytics for {:?} from {} to {}", app_ids, start, end);
        Ok(self
            .client
            .analytics_app_list(app_ids, APP_MEASURES, start, end)
            .await?)
    }

    /// Crash time series for each app over the range.
    pub async fn crashes(
        &self,
        app_ids: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Value> {
        debug!("crash series for {:?} from {} to {}", app_ids, start, end);
        Ok(self
            .client
            .analytics_time_series(app_ids, CRASH_MEASURES, start, end)
            .await?)
    }

    pub async fn all_time(&self, app_id: &str) -> Result<Value> {
        debug!("all-time analytics for {}", app_id);
        let app_ids = [app_id.to_string()];
        Ok(self
            .client
            .analytics_all_time(&app_ids, ALL_TIME_MEASURES)
            .await?)
    }

    pub async fn reviews(&self, app_id: &str, country_code: &str) -> Result<Value> {
        Ok(self.client.reviews(app_id, country_code).await?)
    }
}
