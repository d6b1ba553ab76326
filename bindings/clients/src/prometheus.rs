use anyhow::Context;
use async_trait::async_trait;
use logbench_instruments::prelude::PromDuration;
use logbench_runner::prelude::{BackendError, MetricBackend, QueryValue};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use url::Url;

/// Evaluates instant queries against the Prometheus HTTP API.
#[derive(Debug, Clone)]
pub struct PrometheusBackend {
    client: Client,
    query_url: Url,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryData {
    result_type: String,
    result: serde_json::Value,
}

/// A `[<unix time>, "<value>"]` pair.
#[derive(Debug, Deserialize)]
struct Sample(f64, String);

#[derive(Debug, Deserialize)]
struct Series {
    value: Sample,
}

impl PrometheusBackend {
    /// Benchmark clusters commonly use self-signed certificates, so they are not verified.
    pub fn new(url: &str, token: Option<&str>) -> anyhow::Result<Self> {
        let mut base = Url::parse(url).with_context(|| format!("Invalid Prometheus URL '{url}'"))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let query_url = base
            .join("api/v1/query")
            .context("Failed to build the Prometheus query URL")?;

        let mut headers = HeaderMap::new();
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .context("Prometheus token is not a valid header value")?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, query_url })
    }

    pub fn query_url(&self) -> &Url {
        &self.query_url
    }
}

#[async_trait]
impl MetricBackend for PrometheusBackend {
    async fn query(&self, query: &str, timeout: Duration) -> Result<QueryValue, BackendError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();

        let response = self
            .client
            .get(self.query_url.clone())
            .query(&[
                ("query", query.to_string()),
                ("time", format!("{now:.3}")),
                ("timeout", PromDuration::new(timeout).to_string()),
            ])
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        // Prometheus reports query errors as JSON with a non-2xx status, so try the body first.
        let parsed = match serde_json::from_str::<QueryResponse>(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(BackendError::Transport(format!("HTTP {status}: {body}")))
            }
            Err(e) => return Err(BackendError::Malformed(e.to_string())),
        };

        decode(parsed)
    }
}

fn decode(response: QueryResponse) -> Result<QueryValue, BackendError> {
    if response.status != "success" {
        return Err(BackendError::Api {
            error_type: response.error_type.unwrap_or_else(|| "unknown".to_string()),
            message: response.error.unwrap_or_default(),
        });
    }

    let data = response
        .data
        .ok_or_else(|| BackendError::Malformed("response has no data".to_string()))?;

    match data.result_type.as_str() {
        "scalar" => {
            let sample: Sample = serde_json::from_value(data.result)
                .map_err(|e| BackendError::Malformed(e.to_string()))?;
            Ok(QueryValue::Scalar(parse_value(&sample.1)?))
        }
        "vector" => {
            let series: Vec<Series> = serde_json::from_value(data.result)
                .map_err(|e| BackendError::Malformed(e.to_string()))?;
            let values = series
                .iter()
                .map(|s| parse_value(&s.value.1))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(QueryValue::Vector(values))
        }
        other => Ok(QueryValue::Other(other.to_string())),
    }
}

/// Sample values are strings so that `NaN` and `+Inf` can be represented.
fn parse_value(value: &str) -> Result<f64, BackendError> {
    value
        .parse::<f64>()
        .map_err(|_| BackendError::Malformed(format!("'{value}' is not a number")))
}
