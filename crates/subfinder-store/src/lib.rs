// SQLite-backed product catalog and favorites
// One file, no server, survives restarts

pub mod error;
pub mod models;
pub mod store;

pub use error::{Result, StoreError};
pub use models::{
    Favorite, FavoriteTag, NewProduct, Nutriscore, ParseNutriscoreError, Product, UpsertOutcome,
    DEFAULT_TAG,
};
pub use store::CatalogStore;
