use serde_json::Value;

use crate::Result;

/// One page of raw product records
#[derive(Debug, Clone, Default)]
pub struct ProductPage {
    /// Total number of records the source says it has, when it tells us
    pub total: Option<u64>,
    pub records: Vec<Value>,
}

/// Where the sync engine gets its products from
///
/// OpenFoodFacts in production, canned pages in tests. Pages are 1-based.
/// Implementations map network problems to `Error::TransferFailure`.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ProductSource: Send + Sync {
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<ProductPage>;
}
