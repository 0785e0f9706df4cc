//! Catalog sync - pulls products from a [`ProductSource`] into the store.
//!
//! Pages are fetched one after the other, never in parallel: OpenFoodFacts
//! is a community server and big or concurrent requests tend to time out.
//! Every product is upserted on its own, so an interrupted run keeps what
//! it already wrote and running it again simply picks up from there.

use std::fmt;

use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use serde::Serialize;
use serde_json::Value;
use subfinder_store::{CatalogStore, NewProduct, UpsertOutcome};
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::normalize::normalize;
use crate::source::ProductSource;
use crate::{Error, Result};

/// Knobs for a sync run
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub page_size: u32,
    pub category_language: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for SyncOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            page_size: config.page_size,
            category_language: config.category_language.clone(),
        }
    }
}

/// What a sync run did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub inserted: usize,
    pub updated: usize,
    /// Records dropped because they were missing a code, name or nutriscore
    pub skipped: usize,
    /// Set when a page could not be fetched and the run stopped early
    pub transfer_failure: Option<String>,
    /// Set when the catalog refused a write and the run stopped early
    pub store_failure: Option<String>,
}

impl SyncSummary {
    pub fn processed(&self) -> usize {
        self.inserted + self.updated + self.skipped
    }

    pub fn is_complete(&self) -> bool {
        self.transfer_failure.is_none() && self.store_failure.is_none()
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} inserted, {} updated, {} skipped",
            self.inserted, self.updated, self.skipped
        )?;
        if let Some(reason) = &self.transfer_failure {
            write!(f, " (interrupted: {})", reason)?;
        }
        if let Some(reason) = &self.store_failure {
            write!(f, " (store failed: {})", reason)?;
        }
        Ok(())
    }
}

/// How many products to ask for, given the current catalog size
///
/// Asking for more than we have refreshes the existing products and grows
/// the catalog a bit each run. Small catalogs get `initial_target` instead.
pub fn recommended_target(current_count: usize, growth_factor: f64, initial_target: usize) -> usize {
    let grown = (current_count as f64 * growth_factor.max(1.0)).ceil() as usize;
    grown.max(initial_target)
}

struct PageCursor {
    next_page: u32,
    remaining: usize,
    exhausted: bool,
}

/// Downloads, normalizes and upserts products
pub struct CatalogSync<S> {
    source: S,
    options: SyncOptions,
}

impl<S: ProductSource> CatalogSync<S> {
    pub fn new(source: S) -> Self {
        Self::with_options(source, SyncOptions::default())
    }

    pub fn with_options(source: S, options: SyncOptions) -> Self {
        Self { source, options }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Raw records, page after page, until `target_count` records were read
    ///
    /// The stream ends early when the source runs dry or reports no more
    /// results. A failed page ends the stream with that error.
    pub fn fetch_raw(&self, target_count: usize) -> impl Stream<Item = Result<Value>> + '_ {
        let page_size = (self.options.page_size.max(1) as usize).min(target_count.max(1)) as u32;
        let cursor = PageCursor {
            next_page: 1,
            remaining: target_count,
            exhausted: target_count == 0,
        };

        stream::try_unfold(cursor, move |mut cursor| async move {
            if cursor.exhausted || cursor.remaining == 0 {
                return Ok(None);
            }

            let page = self.source.fetch_page(cursor.next_page, page_size).await?;
            debug!(
                "Fetched page {} ({} records, total {:?})",
                cursor.next_page,
                page.records.len(),
                page.total
            );

            let short_page = page.records.len() < page_size as usize;
            let seen = cursor.next_page as u64 * page_size as u64;
            let source_done = page.total.map_or(false, |total| seen >= total);

            let mut records = page.records;
            records.truncate(cursor.remaining);
            cursor.remaining -= records.len();
            cursor.next_page += 1;
            cursor.exhausted = short_page || source_done;

            if records.is_empty() {
                return Ok(None);
            }
            Ok::<_, Error>(Some((records, cursor)))
        })
        .map_ok(|records| stream::iter(records.into_iter().map(Ok::<Value, Error>)))
        .try_flatten()
    }

    /// Normalized products, with unusable records logged and dropped
    pub fn fetch_batch(&self, target_count: usize) -> impl Stream<Item = Result<NewProduct>> + '_ {
        self.fetch_raw(target_count).try_filter_map(move |raw| {
            let product = match self.normalize(raw) {
                Ok(product) => Some(product),
                Err(e) => {
                    warn!("Discarding record: {}", e);
                    None
                }
            };
            futures::future::ready(Ok(product))
        })
    }

    pub fn normalize(&self, raw: Value) -> Result<NewProduct> {
        normalize(raw, &self.options.category_language)
    }

    pub fn upsert(&self, store: &CatalogStore, product: &NewProduct) -> Result<UpsertOutcome> {
        let outcome = store.upsert_product(product)?;
        match outcome {
            UpsertOutcome::Inserted(id) => debug!("Inserted {} as #{}", product.code, id),
            UpsertOutcome::Updated(id) => debug!("Updated {} (#{})", product.code, id),
        }
        Ok(outcome)
    }

    /// Fetch, normalize and upsert up to `target_count` products
    ///
    /// Bad records are skipped and counted. A failed page or a failed write
    /// stops the run and is reported in the summary, next to the counts of
    /// what was already written.
    pub async fn run(&self, store: &CatalogStore, target_count: usize) -> Result<SyncSummary> {
        info!("Syncing up to {} products", target_count);

        let mut summary = SyncSummary::default();
        let records = self.fetch_raw(target_count);
        futures::pin_mut!(records);

        while let Some(next) = records.next().await {
            let raw = match next {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(
                        "Sync interrupted after {} records: {}",
                        summary.processed(),
                        e
                    );
                    summary.transfer_failure = Some(e.to_string());
                    break;
                }
            };

            let product = match self.normalize(raw) {
                Ok(product) => product,
                Err(e) => {
                    warn!("Skipping record: {}", e);
                    summary.skipped += 1;
                    continue;
                }
            };

            match self.upsert(store, &product) {
                Ok(UpsertOutcome::Inserted(_)) => summary.inserted += 1,
                Ok(UpsertOutcome::Updated(_)) => summary.updated += 1,
                Err(e) => {
                    warn!(
                        "Could not store {} after {} records: {}",
                        product.code,
                        summary.processed(),
                        e
                    );
                    summary.store_failure = Some(e.to_string());
                    break;
                }
            }
        }

        info!("Sync finished: {}", summary);
        Ok(summary)
    }
}
