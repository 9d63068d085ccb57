//! FAOSTAT client for crop reference metadata
//!
//! Fetches the item definitions list; matching a crop against it happens in
//! the crop metadata service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use shared::CropItem;

use super::CropReferenceSource;
use crate::error::{AppError, AppResult};

const ERROR_BODY_LIMIT: usize = 100;

/// FAOSTAT API client
#[derive(Clone)]
pub struct FaoClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

/// The definitions endpoint answers either `{"data": [...]}` or a bare list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ItemsResponse {
    Wrapped {
        #[serde(default)]
        data: Vec<FaoItem>,
    },
    Bare(Vec<FaoItem>),
}

/// Codes come back as strings or numbers depending on the dataset
#[derive(Debug, Deserialize)]
struct FaoItem {
    #[serde(default)]
    item_code: Value,
    #[serde(default)]
    item: String,
    #[serde(default)]
    item_group: Value,
    #[serde(default)]
    item_group_code: Value,
}

impl From<FaoItem> for CropItem {
    fn from(item: FaoItem) -> Self {
        Self {
            item_code: code_string(&item.item_code),
            item_name: item.item,
            item_group: code_string(&item.item_group),
            item_group_code: code_string(&item.item_group_code),
        }
    }
}

fn code_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_items(body: &str) -> AppResult<Vec<CropItem>> {
    let response: ItemsResponse = serde_json::from_str(body)
        .map_err(|e| AppError::ExternalService(format!("Failed to parse FAO response: {}", e)))?;
    let items = match response {
        ItemsResponse::Wrapped { data } => data,
        ItemsResponse::Bare(items) => items,
    };
    Ok(items.into_iter().map(CropItem::from).collect())
}

impl FaoClient {
    /// Create a new FaoClient against the public API
    pub fn new() -> Self {
        Self::with_base_url(crate::config::DEFAULT_FAO_ENDPOINT.to_string())
    }

    /// Create a new FaoClient with custom base URL (for testing)
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for FaoClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CropReferenceSource for FaoClient {
    fn name(&self) -> &'static str {
        "FAO"
    }

    async fn fetch_crop_items(&self) -> AppResult<Vec<CropItem>> {
        let url = format!("{}/definitions/item", self.base_url);

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout("FAO".to_string())
                } else {
                    AppError::ExternalService(format!("FAO request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(ERROR_BODY_LIMIT).collect();
            return Err(AppError::ExternalService(format!(
                "HTTP {}: {}",
                status.as_u16(),
                excerpt
            )));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout("FAO".to_string())
            } else {
                AppError::ExternalService(format!("Failed to read FAO response: {}", e))
            }
        })?;
        parse_items(&body)
    }
}
