// OpenFoodFacts provider - bridges the API client with the ProductSource trait
use std::time::Duration;

use async_trait::async_trait;
use subfinder_api::{OpenFoodFactsClient, RetryConfig};

use crate::{
    config::SyncConfig,
    source::{ProductPage, ProductSource},
    Error, Result,
};

/// Wrapper around OpenFoodFactsClient that implements ProductSource
pub struct OpenFoodFactsSource {
    client: OpenFoodFactsClient,
}

impl OpenFoodFactsSource {
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        let client = OpenFoodFactsClient::with_base_url(
            config.api_url.clone(),
            Duration::from_secs(config.timeout_secs),
        )
        .map_err(|e| Error::ApiError(e.to_string()))?
        .with_retry_config(RetryConfig::with_max_retries(config.max_retries));

        Ok(Self { client })
    }
}

#[async_trait]
impl ProductSource for OpenFoodFactsSource {
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<ProductPage> {
        let search_page = self
            .client
            .search_page(page, page_size)
            .await
            .map_err(|e| Error::TransferFailure(format!("page {}: {}", page, e)))?;

        Ok(ProductPage {
            total: search_page.count,
            records: search_page.products,
        })
    }
}
