use std::{env, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use log::debug;
use reqwest::{Client, Url};
use serde_json::{Value, json};

use crate::{
    error::RemoteError,
    tester::Tester,
    util::{analytics_time, as_base_url, encode_segment, service_errors, set_at, value_at},
};

const DEFAULT_BASE_URL: &str = "https://itunesconnect.apple.com/WebObjects/iTunesConnect.woa/";
const DEFAULT_ANALYTICS_URL: &str = "https://analytics.itunes.apple.com/";
const REVIEWS_PER_PAGE: usize = 100;

#[derive(Debug, Clone)]
pub struct Config {
    /// Raw `Cookie` header of an already signed-in iTunes Connect session.
    pub session: String,
    pub base_url: Url,
    pub analytics_url: Url,
    pub timeout: Option<Duration>,
}

impl Config {
    pub fn new(session: impl Into<String>) -> anyhow::Result<Self> {
        Ok(Self {
            session: session.into(),
            base_url: Url::parse(DEFAULT_BASE_URL)?,
            analytics_url: Url::parse(DEFAULT_ANALYTICS_URL)?,
            timeout: None,
        })
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let session = env::var("TUNES_SESSION")
            .context("Missing env TUNES_SESSION (Cookie header of a signed-in iTunes Connect session)")?;
        let mut config = Self::new(session)?;
        if let Ok(base) = env::var("TUNES_BASE_URL") {
            config.base_url =
                as_base_url(Url::parse(&base).context("TUNES_BASE_URL is not a valid URL")?);
        }
        if let Ok(analytics) = env::var("TUNES_ANALYTICS_URL") {
            config.analytics_url = as_base_url(
                Url::parse(&analytics).context("TUNES_ANALYTICS_URL is not a valid URL")?,
            );
        }
        if let Ok(secs) = env::var("TUNES_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .context("TUNES_TIMEOUT_SECS must be a whole number of seconds")?;
            config.timeout = Some(Duration::from_secs(secs));
        }
        Ok(config)
    }
}

/// The calls the analytics and tester components make against iTunes Connect.
/// Tester endpoints arrive already resolved for the tester kind and app.
#[async_trait]
pub trait TunesClient: Send + Sync {
    async fn analytics_app_list(
        &self,
        app_ids: &[String],
        measures: &[&str],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Value, RemoteError>;

    async fn analytics_time_series(
        &self,
        app_ids: &[String],
        measures: &[&str],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Value, RemoteError>;

    async fn analytics_all_time(
        &self,
        app_ids: &[String],
        measures: &[&str],
    ) -> Result<Value, RemoteError>;

    async fn reviews(&self, app_id: &str, country_code: &str) -> Result<Value, RemoteError>;

    async fn testers(&self, endpoint: &str) -> Result<Vec<Value>, RemoteError>;

    async fn testers_by_app(&self, endpoint: &str) -> Result<Vec<Value>, RemoteError>;

    async fn create_tester(&self, endpoint: &str, tester: &Tester) -> Result<Value, RemoteError>;

    async fn delete_tester(&self, endpoint: &str, tester: &Tester) -> Result<(), RemoteError>;

    async fn add_tester_to_app(&self, endpoint: &str, tester: &Tester) -> Result<(), RemoteError>;

    async fn remove_tester_from_app(
        &self,
        endpoint: &str,
        tester: &Tester,
    ) -> Result<(), RemoteError>;
}

/// [`TunesClient`] over HTTPS using a pre-established web session.
pub struct HttpTunesClient {
    http: Client,
    config: Config,
}

impl HttpTunesClient {
    pub fn new(config: Config) -> Result<Self, RemoteError> {
        let mut builder = Client::builder().user_agent("tunes/0.1").use_rustls_tls();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self { http, config })
    }

    /// Overrides both base URLs. Useful for tests with a mock server.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.config.analytics_url = base_url.clone();
        self.config.base_url = base_url;
        self
    }

    fn join(base: &Url, path: &str) -> Result<Url, RemoteError> {
        as_base_url(base.clone()).join(path).map_err(|e| RemoteError::Url {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    pub async fn get(&self, path: &str) -> Result<Value, RemoteError> {
        let url = Self::join(&self.config.base_url, path)?;
        self.get_url(url).await
    }

    async fn get_url(&self, url: Url) -> Result<Value, RemoteError> {
        let req = self
            .http
            .get(url.clone())
            .header("Cookie", &self.config.session);
        self.send("GET", url, req).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<Value, RemoteError> {
        let url = Self::join(&self.config.base_url, path)?;
        let req = self
            .http
            .post(url.clone())
            .header("Cookie", &self.config.session)
            .json(&body);
        self.send("POST", url, req).await
    }

    async fn post_analytics(&self, path: &str, body: Value) -> Result<Value, RemoteError> {
        let url = Self::join(&self.config.analytics_url, path)?;
        let req = self
            .http
            .post(url.clone())
            .header("Cookie", &self.config.session)
            .header("X-Requested-By", "analytics.itunes.apple.com")
            .json(&body);
        let v = self.send("POST", url, req).await?;
        Ok(v.get("results").cloned().unwrap_or(Value::Null))
    }

    async fn send(
        &self,
        method: &'static str,
        url: Url,
        req: reqwest::RequestBuilder,
    ) -> Result<Value, RemoteError> {
        let res = req.send().await?;
        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(RemoteError::Status {
                method,
                url: url.to_string(),
                status,
                body: text,
            });
        }
        let v: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)?
        };
        let errors = service_errors(&v);
        if !errors.is_empty() {
            return Err(RemoteError::Service(errors));
        }
        debug!("{} {} ok: {} bytes", method, url, text.len());
        Ok(v)
    }

    fn analytics_body(
        app_ids: &[String],
        measures: &[&str],
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> Value {
        let mut body = json!({
            "adamId": app_ids,
            "measures": measures,
            "dimensionFilters": [],
            "group": null,
        });
        if let Some((start, end)) = range {
            body["frequency"] = json!("DAY");
            body["startTime"] = json!(analytics_time(start));
            body["endTime"] = json!(analytics_time(end));
        }
        body
    }

    fn tester_list(v: &Value, key: &str) -> Result<Vec<Value>, RemoteError> {
        match value_at(v, key) {
            Some(Value::Array(list)) => Ok(list.clone()),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(other) => Err(RemoteError::Malformed(format!(
                "expected {} to be a list, got {}",
                key, other
            ))),
        }
    }

    fn tester_record(tester: &Tester, testing: bool) -> Value {
        let mut record = tester.to_record();
        set_at(&mut record, "testing.value", Value::Bool(testing));
        record
    }
}

#[async_trait]
impl TunesClient for HttpTunesClient {
    async fn analytics_app_list(
        &self,
        app_ids: &[String],
        measures: &[&str],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Value, RemoteError> {
        let body = Self::analytics_body(app_ids, measures, Some((start, end)));
        self.post_analytics("analytics/api/v1/data/app-list", body)
            .await
    }

    async fn analytics_time_series(
        &self,
        app_ids: &[String],
        measures: &[&str],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Value, RemoteError> {
        let body = Self::analytics_body(app_ids, measures, Some((start, end)));
        self.post_analytics("analytics/api/v1/data/time-series", body)
            .await
    }

    async fn analytics_all_time(
        &self,
        app_ids: &[String],
        measures: &[&str],
    ) -> Result<Value, RemoteError> {
        let body = Self::analytics_body(app_ids, measures, None);
        self.post_analytics("analytics/api/v1/data/all-time", body)
            .await
    }

    async fn reviews(&self, app_id: &str, country_code: &str) -> Result<Value, RemoteError> {
        let mut reviews: Vec<Value> = Vec::new();
        let mut index = 0;
        loop {
            let path = format!("ra/apps/{}/platforms/ios/reviews", encode_segment(app_id));
            let mut url = Self::join(&self.config.base_url, &path)?;
            url.query_pairs_mut()
                .append_pair("storefront", country_code)
                .append_pair("index", &index.to_string());
            let v = self.get_url(url).await?;
            let page = value_at(&v, "data.reviews")
                .and_then(|r| r.as_array())
                .cloned()
                .unwrap_or_default();
            let total = value_at(&v, "data.reviewCount")
                .and_then(|c| c.as_u64())
                .unwrap_or(0) as usize;
            if page.is_empty() {
                break;
            }
            reviews.extend(page);
            if reviews.len() >= total {
                break;
            }
            index += REVIEWS_PER_PAGE;
        }
        debug!(
            "fetched {} reviews for app {} in {}",
            reviews.len(),
            app_id,
            country_code
        );
        Ok(Value::Array(reviews))
    }

    async fn testers(&self, endpoint: &str) -> Result<Vec<Value>, RemoteError> {
        let v = self.get(endpoint).await?;
        Self::tester_list(&v, "data.testers")
    }

    async fn testers_by_app(&self, endpoint: &str) -> Result<Vec<Value>, RemoteError> {
        let v = self.get(endpoint).await?;
        Self::tester_list(&v, "data.users")
    }

    async fn create_tester(&self, endpoint: &str, tester: &Tester) -> Result<Value, RemoteError> {
        let body = json!({ "testers": [Self::tester_record(tester, true)] });
        let v = self.post(endpoint, body).await?;
        Self::tester_list(&v, "data.testers")?
            .into_iter()
            .next()
            .ok_or_else(|| RemoteError::Malformed("create returned no tester".to_string()))
    }

    async fn delete_tester(&self, endpoint: &str, tester: &Tester) -> Result<(), RemoteError> {
        let mut record = Self::tester_record(tester, false);
        record["userName"] = json!(tester.email);
        self.post(endpoint, json!([record])).await?;
        Ok(())
    }

    async fn add_tester_to_app(
        &self,
        endpoint: &str,
        tester: &Tester,
    ) -> Result<(), RemoteError> {
        let body = json!({ "users": [Self::tester_record(tester, true)] });
        self.post(endpoint, body).await?;
        Ok(())
    }

    async fn remove_tester_from_app(
        &self,
        endpoint: &str,
        tester: &Tester,
    ) -> Result<(), RemoteError> {
        let body = json!({ "users": [Self::tester_record(tester, false)] });
        self.post(endpoint, body).await?;
        Ok(())
    }
}
