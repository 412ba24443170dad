use std::fs::File;
use std::path::Path;
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::warn;

use crate::domain::{ModelId, RawRecord};
use crate::error::BiomodelsError;

const BASE_URL: &str = "https://www.ebi.ac.uk/biomodels";

/// Remote collaborator fetching raw records from the BioModels repository.
///
/// A missing model is a distinguishable `ModelNotFound`; network and protocol
/// failures surface as `Http`/`Status` and are never folded into not-found.
pub trait BiomodelsClient: Send + Sync {
    fn fetch_model(&self, id: &ModelId) -> Result<RawRecord, BiomodelsError>;
    fn fetch_models(&self) -> Result<Vec<RawRecord>, BiomodelsError>;
    /// Downloads the primary model artifact to `destination`. Failures are
    /// logged and reported as `false`, never raised.
    fn download_model(&self, id: &ModelId, destination: &Path) -> bool;
}

#[derive(Clone)]
pub struct BiomodelsHttpClient {
    client: Client,
}

impl BiomodelsHttpClient {
    pub fn new() -> Result<Self, BiomodelsError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("biomodels-cache/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| BiomodelsError::Http(err.to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| BiomodelsError::Http(err.to_string()))?;
        Ok(Self { client })
    }

    pub fn model_url(id: &ModelId) -> String {
        format!("{BASE_URL}/models/{}", id.as_str())
    }

    pub fn models_url() -> String {
        format!("{BASE_URL}/models")
    }

    pub fn download_url(id: &ModelId) -> String {
        format!("{BASE_URL}/models/{}/download", id.as_str())
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, BiomodelsError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "BioModels request failed".to_string());
        Err(BiomodelsError::Status { status, message })
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, BiomodelsError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(BiomodelsError::Http(err.to_string()));
                }
            }
        }
    }
}

impl BiomodelsClient for BiomodelsHttpClient {
    fn fetch_model(&self, id: &ModelId) -> Result<RawRecord, BiomodelsError> {
        let url = Self::model_url(id);
        let response = self.send_with_retries(|| self.client.get(&url))?;
        if response.status().as_u16() == 404 {
            return Err(BiomodelsError::ModelNotFound(id.as_str().to_string()));
        }
        let response = Self::handle_status(response)?;
        response
            .json::<RawRecord>()
            .map_err(|err| BiomodelsError::Http(err.to_string()))
    }

    fn fetch_models(&self) -> Result<Vec<RawRecord>, BiomodelsError> {
        let url = Self::models_url();
        let response = self.send_with_retries(|| self.client.get(&url))?;
        let response = Self::handle_status(response)?;
        let value: Value = response
            .json()
            .map_err(|err| BiomodelsError::Http(err.to_string()))?;
        parse_model_list(value)
    }

    fn download_model(&self, id: &ModelId, destination: &Path) -> bool {
        let url = Self::download_url(id);
        let result = self
            .send_with_retries(|| self.client.get(&url))
            .and_then(Self::handle_status)
            .and_then(|mut response| {
                if let Some(parent) = destination.parent() {
                    std::fs::create_dir_all(parent)
                        .map_err(|err| BiomodelsError::Filesystem(err.to_string()))?;
                }
                let mut file = File::create(destination)
                    .map_err(|err| BiomodelsError::Filesystem(err.to_string()))?;
                std::io::copy(&mut response, &mut file)
                    .map_err(|err| BiomodelsError::Filesystem(err.to_string()))?;
                Ok(())
            });
        match result {
            Ok(()) => true,
            Err(err) => {
                warn!(model_id = %id, %err, "model download failed");
                false
            }
        }
    }
}

/// Folds the model-list response body into raw records. The endpoint has
/// returned both a bare array and an object with a `models` array; tolerate
/// either and treat anything else as empty.
pub fn parse_model_list(value: Value) -> Result<Vec<RawRecord>, BiomodelsError> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("models") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    items
        .into_iter()
        .map(|item| {
            serde_json::from_value::<RawRecord>(item)
                .map_err(|err| BiomodelsError::Http(err.to_string()))
        })
        .collect()
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
