// API client for the OpenFoodFacts open product database
pub mod openfoodfacts;
pub mod retry;

// Re-export common types
pub use openfoodfacts::{
    OffProduct, OpenFoodFactsClient, OpenFoodFactsError, SearchPage, OPENFOODFACTS_API_BASE,
};
pub use retry::RetryConfig;
