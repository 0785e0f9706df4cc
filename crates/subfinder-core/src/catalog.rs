// Catalog facade - everything a front end needs, on top of the store
use subfinder_store::{CatalogStore, Favorite, FavoriteTag, Product};
use tracing::{debug, info};

use crate::{
    config::Config,
    matcher::SubstituteMatcher,
    source::ProductSource,
    sync::{CatalogSync, SyncSummary},
    Error, Result,
};

/// Default page length, one product grid worth
pub const DEFAULT_RESULTS_LIMIT: usize = 12;

/// Searches, substitutes, favorites and sync over a single catalog store
pub struct Catalog {
    store: CatalogStore,
    results_limit: usize,
}

impl Catalog {
    pub fn new(store: CatalogStore) -> Self {
        Self {
            store,
            results_limit: DEFAULT_RESULTS_LIMIT,
        }
    }

    /// Open the database named in the config
    pub fn open(config: &Config) -> Result<Self> {
        let store = CatalogStore::open(&config.database.path)?;
        Ok(Self::new(store).with_results_limit(config.display.results_limit))
    }

    pub fn with_results_limit(mut self, results_limit: usize) -> Self {
        self.results_limit = results_limit.max(1);
        self
    }

    pub fn results_limit(&self) -> usize {
        self.results_limit
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    pub fn product_count(&self) -> Result<usize> {
        Ok(self.store.product_count()?)
    }

    /// What the search box does: random products for a blank query,
    /// otherwise name matches
    pub fn search(&self, query: Option<&str>) -> Result<Vec<Product>> {
        match query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(query) => self.search_by_name_prefix_or_substring(query, self.results_limit),
            None => {
                debug!("Blank query, showing random products");
                self.random_sample(self.results_limit)
            }
        }
    }

    pub fn search_by_name_prefix_or_substring(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Product>> {
        Ok(self.store.search_by_name(query, limit)?)
    }

    pub fn random_sample(&self, limit: usize) -> Result<Vec<Product>> {
        Ok(self.store.random_sample(limit)?)
    }

    pub fn get_by_id(&self, id: i64) -> Result<Product> {
        self.store
            .get_product(id)?
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub fn get_by_code(&self, code: &str) -> Result<Product> {
        self.store
            .get_product_by_code(code)?
            .ok_or_else(|| Error::NotFound(code.to_string()))
    }

    pub fn find_substitutes(&self, product: &Product, limit: usize) -> Result<Vec<Product>> {
        SubstituteMatcher::new(&self.store).find_substitutes(product, limit)
    }

    pub fn list_favorites(&self, user_id: &str) -> Result<Vec<(Product, FavoriteTag)>> {
        Ok(self.store.list_favorites(user_id)?)
    }

    /// Save a product for a user, `None` (or a blank tag) files it under the default tag
    pub fn add_favorite(&self, user_id: &str, product_id: i64, tag: Option<&str>) -> Result<Favorite> {
        let tag = FavoriteTag::from_input(tag);
        let favorite = self.store.add_favorite(user_id, product_id, &tag)?;
        info!("Saved product {} for {} under {}", product_id, user_id, favorite.tag);
        Ok(favorite)
    }

    pub fn favorite_tags(&self, user_id: &str) -> Result<Vec<FavoriteTag>> {
        Ok(self.store.favorite_tags(user_id)?)
    }

    pub async fn run_sync<S: ProductSource>(
        &self,
        sync: &CatalogSync<S>,
        target_count: usize,
    ) -> Result<SyncSummary> {
        sync.run(&self.store, target_count).await
    }
}

/// The user behind a favorites operation, or `Unauthenticated`
pub fn identified_user(user: Option<&str>) -> Result<&str> {
    user.map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or(Error::Unauthenticated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use subfinder_store::{NewProduct, Nutriscore, DEFAULT_TAG};

    fn catalog_with(names: &[&str]) -> Catalog {
        let store = CatalogStore::open_in_memory().unwrap();
        for (i, name) in names.iter().enumerate() {
            store
                .upsert_product(&NewProduct {
                    code: format!("{:04}", i),
                    name: name.to_string(),
                    nutriscore: Nutriscore::C,
                    categories: vec!["en:test".to_string()],
                    image: String::new(),
                    link: String::new(),
                    nutrient_levels: Vec::new(),
                })
                .unwrap();
        }
        Catalog::new(store)
    }

    #[test]
    fn test_blank_query_returns_random_products() {
        let names: Vec<String> = (0..20).map(|i| format!("Product {}", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let catalog = catalog_with(&refs);

        assert_eq!(catalog.search(None).unwrap().len(), DEFAULT_RESULTS_LIMIT);
        assert_eq!(catalog.search(Some("   ")).unwrap().len(), DEFAULT_RESULTS_LIMIT);
    }

    #[test]
    fn test_search_uses_results_limit() {
        let catalog = catalog_with(&["Pear Juice", "Pear Compote", "Peach"]).with_results_limit(1);
        let results = catalog.search(Some("pear")).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Pear Compote");
    }

    #[test]
    fn test_get_by_id_not_found() {
        let catalog = catalog_with(&["Pear Juice"]);
        assert!(matches!(catalog.get_by_id(99), Err(Error::NotFound(_))));
        assert!(matches!(catalog.get_by_code("nope"), Err(Error::NotFound(_))));
        assert_eq!(catalog.get_by_code("0000").unwrap().name, "Pear Juice");
    }

    #[test]
    fn test_add_favorite_default_and_explicit_tag() {
        let catalog = catalog_with(&["Pear Juice"]);
        let product = catalog.get_by_code("0000").unwrap();

        let first = catalog.add_favorite("alice", product.id, None).unwrap();
        let second = catalog.add_favorite("alice", product.id, Some("Drinks")).unwrap();

        assert_eq!(first.tag.as_str(), DEFAULT_TAG);
        assert_eq!(second.tag.as_str(), "Drinks");
        assert_ne!(first.id, second.id);
        assert_eq!(catalog.list_favorites("alice").unwrap().len(), 2);
    }

    #[test]
    fn test_add_favorite_unknown_product() {
        let catalog = catalog_with(&[]);
        let result = catalog.add_favorite("alice", 7, None);
        assert!(matches!(result, Err(Error::NotFound(id)) if id == "7"));
    }

    #[test]
    fn test_identified_user() {
        assert_eq!(identified_user(Some(" alice ")).unwrap(), "alice");
        assert!(matches!(identified_user(None), Err(Error::Unauthenticated)));
        assert!(matches!(identified_user(Some("")), Err(Error::Unauthenticated)));
    }
}
