//! Collaborators of the manual proof path: the asset store holding the uploaded screenshots, and the OCR engine that
//! reads them.
use std::{sync::Arc, time::Duration};

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use fest_common::Secret;

#[derive(Debug, Clone, Error)]
pub enum OcrError {
    #[error("Could not initialize OCR client: {0}")]
    Initialization(String),
    #[error("OCR engine failed: {0}")]
    EngineError(String),
}

#[derive(Debug, Clone, Error)]
pub enum AssetError {
    #[error("Could not initialize asset client: {0}")]
    Initialization(String),
    #[error("Invalid asset reference: {0}")]
    InvalidReference(String),
    #[error("Asset is unavailable: {0}")]
    Unavailable(String),
}

#[allow(async_fn_in_trait)]
pub trait OcrEngine {
    /// Extracts all the text found in the image.
    async fn extract_text(&self, image: &[u8]) -> Result<String, OcrError>;
}

#[allow(async_fn_in_trait)]
pub trait AssetStore {
    /// Resolves an asset reference to the stored bytes.
    async fn fetch_asset(&self, asset_ref: &str) -> Result<Vec<u8>, AssetError>;
}

//--------------------------------------    HttpOcrEngine    ---------------------------------------------------------
/// Posts the image, base64 encoded, to an OCR service and reads back `{"text": "..."}`.
#[derive(Clone)]
pub struct HttpOcrEngine {
    url: String,
    client: Arc<Client>,
}

impl HttpOcrEngine {
    pub fn new(url: &str, api_key: &Secret<String>) -> Result<Self, OcrError> {
        let mut headers = HeaderMap::with_capacity(1);
        if !api_key.is_empty() {
            let val =
                HeaderValue::from_str(api_key.reveal()).map_err(|e| OcrError::Initialization(e.to_string()))?;
            headers.insert("X-Api-Key", val);
        }
        let client =
            Client::builder().default_headers(headers).build().map_err(|e| OcrError::Initialization(e.to_string()))?;
        Ok(Self { url: url.to_string(), client: Arc::new(client) })
    }
}

#[derive(Deserialize)]
struct OcrResponse {
    text: String,
}

impl OcrEngine for HttpOcrEngine {
    async fn extract_text(&self, image: &[u8]) -> Result<String, OcrError> {
        trace!("🧾 Sending {} bytes to the OCR engine", image.len());
        let body = json!({ "image": base64::encode(image) });
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| OcrError::EngineError(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(OcrError::EngineError(format!("OCR engine returned status {status}")));
        }
        let result = response.json::<OcrResponse>().await.map_err(|e| OcrError::EngineError(e.to_string()))?;
        trace!("🧾 OCR engine extracted {} characters", result.text.len());
        Ok(result.text)
    }
}

//--------------------------------------    HttpAssetStore   ---------------------------------------------------------
/// Fetches assets with `GET {base_url}/{asset_ref}`.
#[derive(Clone)]
pub struct HttpAssetStore {
    base_url: String,
    client: Arc<Client>,
}

impl HttpAssetStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AssetError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| AssetError::Initialization(e.to_string()))?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), client: Arc::new(client) })
    }

    /// Asset references are relative paths inside the store. Anything that could escape the store is refused.
    fn asset_url(&self, asset_ref: &str) -> Result<String, AssetError> {
        let valid = !asset_ref.is_empty() &&
            !asset_ref.starts_with('/') &&
            !asset_ref.split('/').any(|segment| segment == ".." || segment.is_empty()) &&
            asset_ref.chars().all(|c| c.is_ascii_alphanumeric() || "-_./".contains(c));
        if valid {
            Ok(format!("{}/{asset_ref}", self.base_url))
        } else {
            Err(AssetError::InvalidReference(asset_ref.to_string()))
        }
    }
}

impl AssetStore for HttpAssetStore {
    async fn fetch_asset(&self, asset_ref: &str) -> Result<Vec<u8>, AssetError> {
        let url = self.asset_url(asset_ref)?;
        trace!("🧾 Fetching asset {url}");
        let response = self.client.get(&url).send().await.map_err(|e| AssetError::Unavailable(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(AssetError::Unavailable(format!("{asset_ref} returned status {status}")));
        }
        let bytes = response.bytes().await.map_err(|e| AssetError::Unavailable(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
