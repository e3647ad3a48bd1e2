use crate::config::SyncConfig;
use crate::error::{extract_detail, ClientError};
use acute_core::{NewSummary, RawSummary, SummaryKey, SummaryPatch};
use reqwest::header::ACCEPT;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

const COLLECTION_PATH: [&str; 2] = ["db", "summaries"];

/// HTTP client for the remote summary collection. One call is one round
/// trip; nothing is cached or retried here.
#[derive(Debug, Clone)]
pub struct SummaryClient {
    http: reqwest::Client,
    base_url: Url,
}

impl SummaryClient {
    pub fn new(config: &SyncConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| ClientError::Network(err.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn fetch_all(&self) -> Result<Vec<RawSummary>, ClientError> {
        let url = self.collection_url()?;
        let response = self.request(Method::GET, url).send().await?;
        let body = read_success(response).await?;
        decode_snapshot(&body)
    }

    pub async fn fetch_one(&self, key: &SummaryKey) -> Result<RawSummary, ClientError> {
        let url = self.record_url(key)?;
        let response = self.request(Method::GET, url).send().await?;
        let body = read_success(response).await?;
        decode_body(&body)
    }

    pub async fn create(&self, summary: &NewSummary) -> Result<RawSummary, ClientError> {
        let result = self
            .write(Method::POST, self.collection_url()?, summary)
            .await;
        if let Err(err) = &result {
            log_write_failure("create", None, err);
        }
        result
    }

    pub async fn update(
        &self,
        key: &SummaryKey,
        patch: &SummaryPatch,
    ) -> Result<RawSummary, ClientError> {
        let result = self.write(Method::PATCH, self.record_url(key)?, patch).await;
        if let Err(err) = &result {
            log_write_failure("update", Some(key), err);
        }
        result
    }

    pub async fn delete(&self, key: &SummaryKey) -> Result<(), ClientError> {
        let url = self.record_url(key)?;
        let result = match self.request(Method::DELETE, url).send().await {
            Ok(response) => read_success(response).await.map(|_| ()),
            Err(err) => Err(err.into()),
        };
        if let Err(err) = &result {
            log_write_failure("delete", Some(key), err);
        }
        result
    }

    async fn write<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: &B,
    ) -> Result<RawSummary, ClientError> {
        let response = self.request(method, url).json(body).send().await?;
        let body = read_success(response).await?;
        decode_body(&body)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(%method, %url, "summary_request");
        self.http
            .request(method, url)
            .header(ACCEPT, "application/json")
    }

    fn collection_url(&self) -> Result<Url, ClientError> {
        self.url_with(&[])
    }

    fn record_url(&self, key: &SummaryKey) -> Result<Url, ClientError> {
        self.url_with(&[key.as_str()])
    }

    fn url_with(&self, tail: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        {
            let mut segments =
                url.path_segments_mut()
                    .map_err(|_| ClientError::InvalidBaseUrl {
                        url: self.base_url.to_string(),
                        reason: "url cannot carry a path".to_string(),
                    })?;
            segments.pop_if_empty();
            segments.extend(COLLECTION_PATH);
            segments.extend(tail);
        }
        Ok(url)
    }
}

async fn read_success(response: Response) -> Result<Vec<u8>, ClientError> {
    let status = response.status();
    let body = response.bytes().await?;
    if status.is_success() {
        return Ok(body.to_vec());
    }
    Err(ClientError::Response {
        status: status.as_u16(),
        detail: extract_detail(&body),
    })
}

fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ClientError> {
    serde_json::from_slice(body).map_err(|err| ClientError::Decode(err.to_string()))
}

/// Decodes a collection body record by record so one malformed entry does
/// not cost the whole snapshot.
fn decode_snapshot(body: &[u8]) -> Result<Vec<RawSummary>, ClientError> {
    let value: Value = decode_body(body)?;
    let Value::Array(items) = value else {
        return Err(ClientError::Decode(
            "expected a JSON array of summaries".to_string(),
        ));
    };

    let mut summaries = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<RawSummary>(item) {
            Ok(summary) => summaries.push(summary),
            Err(err) => warn!(index, "summary_record_skipped: {err}"),
        }
    }
    Ok(summaries)
}

fn log_write_failure(operation: &str, key: Option<&SummaryKey>, err: &ClientError) {
    match err {
        ClientError::Response { status, detail } => warn!(
            operation,
            key = key.map(SummaryKey::as_str),
            status,
            detail = detail.as_deref().unwrap_or(""),
            "summary_write_rejected"
        ),
        other => warn!(
            operation,
            key = key.map(SummaryKey::as_str),
            "summary_write_failed: {other}"
        ),
    }
}
