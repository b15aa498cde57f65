//! Client for the World Air Quality Index city feed.
//!
//! `GET /feed/<city>/?token=<token>` returns
//! `{"status": "ok", "data": {"aqi": 152, "city": {"geo": [lat, lon]}, "time": {"s": "..."}}}`
//! on success and `{"status": "error", "data": "Unknown station"}` otherwise.

use async_trait::async_trait;
use reqwest::{Method, Request, Url};
use serde_json::Value;
use std::error::Error as _;
use std::time::Duration;
use tracing::debug;

use super::auth::UrlParam;
use super::{BasicClient, HttpClient};
use crate::config::ApiToken;
use crate::error::FetchError;
use crate::services::reading_source::ReadingSource;
use crate::types::{AqiValue, MISSING_TIMESTAMP, RawReading};

pub const DEFAULT_BASE_URL: &str = "https://api.waqi.info";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const TOKEN_PARAM: &str = "token";
const API_ERROR_FALLBACK: &str = "Unknown error from API.";

/// [`ReadingSource`] backed by the WAQI HTTP API.
pub struct WaqiSource<C> {
    client: C,
    base_url: String,
}

impl WaqiSource<UrlParam<BasicClient>> {
    /// Production client: public endpoint, 10 second timeout.
    pub fn new(token: &ApiToken) -> reqwest::Result<Self> {
        Self::with_base_url(token, DEFAULT_BASE_URL)
    }

    /// Production client against another endpoint.
    pub fn with_base_url(token: &ApiToken, base_url: &str) -> reqwest::Result<Self> {
        let inner = BasicClient::with_timeout(REQUEST_TIMEOUT)?;
        Ok(Self::with_client(inner, token, base_url))
    }

    /// Uses `inner` for transport and appends `token` to every request.
    pub fn with_client(inner: BasicClient, token: &ApiToken, base_url: &str) -> Self {
        let client = UrlParam {
            inner,
            param_name: TOKEN_PARAM.to_string(),
            key: token.expose().to_string(),
        };
        Self {
            client,
            base_url: base_url.to_string(),
        }
    }
}

impl<C: HttpClient> WaqiSource<C> {
    fn feed_url(&self, city_id: &str) -> Result<Url, FetchError> {
        if city_id.trim().is_empty() {
            return Err(FetchError::Unexpected("empty city identifier".into()));
        }

        let mut url = Url::parse(&self.base_url)
            .map_err(|e| FetchError::Unexpected(format!("bad base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| FetchError::Unexpected("base URL cannot have a path".into()))?
            .pop_if_empty()
            .push("feed")
            .push(city_id)
            .push("");
        Ok(url)
    }
}

#[async_trait]
impl<C: HttpClient> ReadingSource for WaqiSource<C> {
    fn name(&self) -> &str {
        "waqi"
    }

    #[tracing::instrument(skip(self), fields(source = "waqi"))]
    async fn fetch(&self, city_id: &str) -> Result<RawReading, FetchError> {
        let url = self.feed_url(city_id)?;

        let resp = self
            .client
            .execute(Request::new(Method::GET, url))
            .await
            .map_err(network_error)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Network(format!("HTTP status {status}")));
        }

        let body = resp.text().await.map_err(network_error)?;
        debug!(bytes = body.len(), "Feed body received");

        parse_feed(&body)
    }
}

/// Interprets a WAQI feed body.
///
/// Missing optional fields fall back to defaults (no AQI, no coordinates,
/// `"N/A"` timestamp) instead of failing.
pub fn parse_feed(body: &str) -> Result<RawReading, FetchError> {
    let json: Value = serde_json::from_str(body)
        .map_err(|e| FetchError::Unexpected(format!("invalid JSON payload: {e}")))?;

    if json["status"].as_str() != Some("ok") {
        let message = json["data"]
            .as_str()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(API_ERROR_FALLBACK);
        return Err(FetchError::Api(message.to_string()));
    }

    let data = &json["data"];

    let aqi = match &data["aqi"] {
        Value::Number(n) => n.as_f64().map(AqiValue::Number),
        Value::String(s) => Some(AqiValue::Text(s.clone())),
        _ => None,
    };

    let (latitude, longitude) = match data["city"]["geo"].as_array() {
        Some(geo) if geo.len() >= 2 => (coordinate(&geo[0]), coordinate(&geo[1])),
        _ => (None, None),
    };

    let timestamp = data["time"]["s"]
        .as_str()
        .unwrap_or(MISSING_TIMESTAMP)
        .to_string();

    Ok(RawReading {
        aqi,
        latitude,
        longitude,
        timestamp,
    })
}

fn coordinate(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Flattens a transport error into a message. The URL is stripped because it
/// carries the token.
fn network_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        return FetchError::Network("request timed out".into());
    }

    let e = e.without_url();
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(s) = source {
        message.push_str(": ");
        message.push_str(&s.to_string());
        source = s.source();
    }
    FetchError::Network(message)
}
