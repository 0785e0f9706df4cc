// Core business logic lives here - catalog sync, substitutes, favorites
pub mod catalog;
pub mod config;
pub mod error;
pub mod matcher;
pub mod normalize;
pub mod providers;
pub mod source;
pub mod sync;

pub use catalog::{identified_user, Catalog};
pub use config::Config;
pub use error::Error;
pub use matcher::SubstituteMatcher;
pub use normalize::normalize;
pub use providers::OpenFoodFactsSource;
pub use source::{ProductPage, ProductSource};
pub use sync::{recommended_target, CatalogSync, SyncOptions, SyncSummary};

pub use subfinder_store::{
    CatalogStore, Favorite, FavoriteTag, NewProduct, Nutriscore, Product, UpsertOutcome,
    DEFAULT_TAG,
};

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
