use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::retry::{is_retryable_status, with_retry_if, RetryConfig};

pub const OPENFOODFACTS_API_BASE: &str = "https://world.openfoodfacts.org";

const SEARCH_PATH: &str = "/cgi/search.pl";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Only the fields we normalize - full product documents are huge
const SEARCH_FIELDS: &str = "code,product_name,nutrition_grade_fr,nutriscore_grade,\
categories_tags,url,image_front_small_url,nutrient_levels,nutriments";

#[derive(Error, Debug)]
pub enum OpenFoodFactsError {
    #[error("API request failed with status {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    ParseError(#[from] serde_json::Error),
}

impl OpenFoodFactsError {
    /// Whether trying the same page again has a chance of working
    pub fn is_retryable(&self) -> bool {
        match self {
            OpenFoodFactsError::RequestFailed { status, .. } => {
                reqwest::StatusCode::from_u16(*status)
                    .map(is_retryable_status)
                    .unwrap_or(false)
            }
            OpenFoodFactsError::RateLimitExceeded => true,
            OpenFoodFactsError::NetworkError(e) => e.is_timeout() || e.is_connect(),
            OpenFoodFactsError::ParseError(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, OpenFoodFactsError>;

pub struct OpenFoodFactsClient {
    client: reqwest::Client,
    base_url: String,
    retry_config: RetryConfig,
}

impl OpenFoodFactsClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(
            OPENFOODFACTS_API_BASE.to_string(),
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// For mirrors and the staging server (world.openfoodfacts.net)
    pub fn with_base_url(base_url: String, timeout: Duration) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("subfinder/0.1.0"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry_config: RetryConfig::none(),
        })
    }

    /// Replace the retry policy (single attempt by default)
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch one page of the bulk search endpoint
    ///
    /// Pages are 1-based. The server gets slow and eventually times out on
    /// very large pages, so keep `page_size` in the hundreds.
    pub async fn search_page(&self, page: u32, page_size: u32) -> Result<SearchPage> {
        let url = format!("{}{}", self.base_url, SEARCH_PATH);
        let page = page.to_string();
        let page_size = page_size.to_string();

        with_retry_if(&self.retry_config, OpenFoodFactsError::is_retryable, || async {
            debug!("GET {} page={} page_size={}", url, page, page_size);

            let response = self
                .client
                .get(&url)
                .query(&[
                    ("action", "process"),
                    ("json", "1"),
                    ("fields", SEARCH_FIELDS),
                    ("page_size", page_size.as_str()),
                    ("page", page.as_str()),
                ])
                .send()
                .await?;

            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(OpenFoodFactsError::RateLimitExceeded);
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(OpenFoodFactsError::RequestFailed {
                    status: status.as_u16(),
                    body,
                });
            }

            // Read the body first so a truncated payload shows up as a parse error
            let body = response.text().await?;
            let search_page: SearchPage = serde_json::from_str(&body)?;
            Ok(search_page)
        })
        .await
    }
}

/// One page of `/cgi/search.pl` results
///
/// Products are kept as raw JSON so one weird record can't sink the whole page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchPage {
    /// Total number of products matching the search, across all pages
    #[serde(default, deserialize_with = "lenient_u64")]
    pub count: Option<u64>,
    #[serde(default, deserialize_with = "nullable")]
    pub products: Vec<Value>,
}

/// Product document as returned by OpenFoodFacts
///
/// Everything is optional: the database is crowd-sourced and any field
/// can be missing, null or of a surprising type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OffProduct {
    #[serde(default, deserialize_with = "lenient_string")]
    pub code: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub nutrition_grade_fr: Option<String>,
    #[serde(default)]
    pub nutriscore_grade: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub categories_tags: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub image_front_small_url: Option<String>,
    /// nutrient name (`fat`, `saturated-fat`, ...) to level (`low`, `moderate`, `high`)
    #[serde(default, deserialize_with = "nullable")]
    pub nutrient_levels: HashMap<String, String>,
    /// `<nutrient>_100g` and friends; values are numbers or numeric strings
    #[serde(default, deserialize_with = "nullable")]
    pub nutriments: HashMap<String, Value>,
}

impl OffProduct {
    pub fn from_value(value: Value) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Nutri-Score letter, preferring the legacy `nutrition_grade_fr` field
    pub fn grade(&self) -> Option<&str> {
        self.nutrition_grade_fr
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .or_else(|| {
                self.nutriscore_grade
                    .as_deref()
                    .map(str::trim)
                    .filter(|g| !g.is_empty())
            })
    }

    /// Amount per 100g for a nutrient, formatted for display
    pub fn amount_per_100g(&self, nutrient: &str) -> Option<String> {
        let value = self.nutriments.get(&format!("{}_100g", nutrient))?;
        match value {
            Value::Number(n) => {
                let text = n.to_string();
                Some(text.strip_suffix(".0").map(str::to_string).unwrap_or(text))
            }
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        }
    }
}

/// Treat an explicit `null` like a missing field
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Barcodes show up both as strings and as bare numbers
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_u64<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
