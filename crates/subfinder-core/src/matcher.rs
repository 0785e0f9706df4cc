use std::collections::HashSet;

use subfinder_store::{CatalogStore, Product};
use tracing::debug;

use crate::Result;

/// Finds healthier products sharing a category with a reference product
///
/// Categories are scanned from the most specific (last in the list) to the
/// broadest, so "plain yogurts" beat "dairies" when both have candidates.
pub struct SubstituteMatcher<'a> {
    store: &'a CatalogStore,
}

impl<'a> SubstituteMatcher<'a> {
    pub fn new(store: &'a CatalogStore) -> Self {
        Self { store }
    }

    /// Up to `max_results` products with a strictly better nutriscore
    ///
    /// Within a category the best scores come first, ties by code. A product
    /// without categories has no substitutes.
    pub fn find_substitutes(&self, product: &Product, max_results: usize) -> Result<Vec<Product>> {
        let mut substitutes: Vec<Product> = Vec::new();
        let mut seen: HashSet<i64> = HashSet::new();

        if max_results == 0 {
            return Ok(substitutes);
        }

        for category in product.categories_most_specific_first() {
            // At most `substitutes.len()` of these are repeats, so `max_results`
            // rows always leave enough new ones to fill the remaining slots
            let candidates = self.store.products_in_category_better_than(
                category,
                product.nutriscore,
                Some(max_results),
            )?;
            debug!(
                "{} candidates in {} for {}",
                candidates.len(),
                category,
                product.code
            );

            for candidate in candidates {
                if substitutes.len() >= max_results {
                    break;
                }
                if candidate.id == product.id || seen.contains(&candidate.id) {
                    continue;
                }
                seen.insert(candidate.id);
                substitutes.push(candidate);
            }

            if substitutes.len() >= max_results {
                break;
            }
        }

        Ok(substitutes)
    }
}
