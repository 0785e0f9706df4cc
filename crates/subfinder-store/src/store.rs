use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::models::{Favorite, FavoriteTag, NewProduct, Nutriscore, Product, UpsertOutcome};

const SCHEMA_VERSION: i64 = 2;

const PRODUCT_COLUMNS: &str =
    "products.id, products.code, products.name, products.nutriscore, products.categories, \
     products.image, products.link, products.nutrient_levels";

/// Product catalog and favorites, backed by SQLite
///
/// SQLite was chosen because:
/// - Zero-config embedded database
/// - Unique constraints give us upsert-by-code for free
/// - Single-row writes are atomic, which is all the sync needs
pub struct CatalogStore {
    conn: Connection,
}

impl CatalogStore {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        debug!("Opening catalog at {}", db_path.display());
        let conn = Connection::open(db_path)?;
        Self::init_schema(&conn)?;

        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS products (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    code TEXT NOT NULL UNIQUE,
                    name TEXT NOT NULL,
                    nutriscore TEXT NOT NULL CHECK (nutriscore IN ('a', 'b', 'c', 'd', 'e')),
                    categories TEXT NOT NULL DEFAULT '[]',
                    image TEXT NOT NULL DEFAULT '',
                    link TEXT NOT NULL DEFAULT '',
                    nutrient_levels TEXT NOT NULL DEFAULT '[]'
                );

                -- One row per (product, category) so membership is an indexed lookup
                CREATE TABLE IF NOT EXISTS product_categories (
                    product_id INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
                    position INTEGER NOT NULL,
                    category TEXT NOT NULL,
                    PRIMARY KEY (product_id, position)
                );

                CREATE TABLE IF NOT EXISTS favorites (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id TEXT NOT NULL,
                    product_id INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
                    tag TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_products_name ON products(name);
                CREATE INDEX IF NOT EXISTS idx_products_nutriscore ON products(nutriscore, code);
                CREATE INDEX IF NOT EXISTS idx_product_categories_category
                    ON product_categories(category);
                CREATE INDEX IF NOT EXISTS idx_favorites_user ON favorites(user_id);",
            )?;
            conn.pragma_update(None, "user_version", 1)?;
        }

        // SQLite's LIKE only folds ASCII, so names are matched against a
        // lowercased copy ("Éclair" has to be found by "éclair")
        if version < 2 {
            let tx = conn.unchecked_transaction()?;
            tx.execute_batch(
                "ALTER TABLE products ADD COLUMN name_search TEXT NOT NULL DEFAULT '';
                 CREATE INDEX IF NOT EXISTS idx_products_name_search ON products(name_search);",
            )?;
            let names = tx
                .prepare("SELECT id, name FROM products")?
                .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for (id, name) in names {
                tx.execute(
                    "UPDATE products SET name_search = ?2 WHERE id = ?1",
                    params![id, search_key(&name)],
                )?;
            }
            tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
            tx.commit()?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    fn product_from_row(row: &Row) -> rusqlite::Result<Product> {
        Ok(Product {
            id: row.get(0)?,
            code: row.get(1)?,
            name: row.get(2)?,
            nutriscore: row.get(3)?,
            categories: json_column(row, 4)?,
            image: row.get(5)?,
            link: row.get(6)?,
            nutrient_levels: json_column(row, 7)?,
        })
    }

    fn favorite_from_row(row: &Row) -> rusqlite::Result<Favorite> {
        let created_at: String = row.get(4)?;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

        Ok(Favorite {
            id: row.get(0)?,
            user_id: row.get(1)?,
            product_id: row.get(2)?,
            tag: FavoriteTag::from_input(Some(row.get::<_, String>(3)?.as_str())),
            created_at,
        })
    }

    // --- Products ---

    pub fn product_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn get_product(&self, id: i64) -> Result<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = self
            .conn
            .query_row(&sql, params![id], Self::product_from_row)
            .optional()?;
        Ok(product)
    }

    pub fn get_product_by_code(&self, code: &str) -> Result<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE code = ?1");
        let product = self
            .conn
            .query_row(&sql, params![code], Self::product_from_row)
            .optional()?;
        Ok(product)
    }

    /// Insert a product, or overwrite every field of the one sharing its code
    ///
    /// Runs in its own transaction so a product never ends up with half of
    /// its category rows.
    pub fn upsert_product(&self, product: &NewProduct) -> Result<UpsertOutcome> {
        let categories = serde_json::to_string(&product.categories)?;
        let nutrient_levels = serde_json::to_string(&product.nutrient_levels)?;

        let tx = self.conn.unchecked_transaction()?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM products WHERE code = ?1",
                params![product.code],
                |row| row.get(0),
            )
            .optional()?;

        let outcome = match existing {
            Some(id) => {
                tx.execute(
                    "UPDATE products
                     SET name = ?2, nutriscore = ?3, categories = ?4, image = ?5, link = ?6,
                         nutrient_levels = ?7, name_search = ?8
                     WHERE id = ?1",
                    params![
                        id,
                        product.name,
                        product.nutriscore,
                        categories,
                        product.image,
                        product.link,
                        nutrient_levels,
                        search_key(&product.name),
                    ],
                )?;
                tx.execute(
                    "DELETE FROM product_categories WHERE product_id = ?1",
                    params![id],
                )?;
                UpsertOutcome::Updated(id)
            }
            None => {
                tx.execute(
                    "INSERT INTO products
                         (code, name, nutriscore, categories, image, link, nutrient_levels,
                          name_search)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        product.code,
                        product.name,
                        product.nutriscore,
                        categories,
                        product.image,
                        product.link,
                        nutrient_levels,
                        search_key(&product.name),
                    ],
                )?;
                UpsertOutcome::Inserted(tx.last_insert_rowid())
            }
        };

        {
            let mut stmt = tx.prepare(
                "INSERT INTO product_categories (product_id, position, category)
                 VALUES (?1, ?2, ?3)",
            )?;
            for (position, category) in product.categories.iter().enumerate() {
                stmt.execute(params![outcome.id(), position as i64, category])?;
            }
        }

        tx.commit()?;
        Ok(outcome)
    }

    /// Names starting with `query` first, then names containing every word of it
    ///
    /// Matching is case-insensitive. Within each group products are ordered by name.
    pub fn search_by_name(&self, query: &str, limit: usize) -> Result<Vec<Product>> {
        let query = search_key(query.trim());
        if limit == 0 {
            return Ok(Vec::new());
        }

        let prefix = format!("{}%", escape_like(&query));
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE name_search LIKE ?1 ESCAPE '\\'
             ORDER BY name, id
             LIMIT ?2"
        );
        let mut products = self
            .conn
            .prepare(&sql)?
            .query_map(params![prefix, limit as i64], Self::product_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let words: Vec<&str> = query.split_whitespace().collect();
        if products.len() >= limit || words.is_empty() {
            return Ok(products);
        }

        // Fill up with products that contain every word somewhere in the name
        let mut patterns = vec![prefix];
        let mut conditions = Vec::with_capacity(words.len());
        for (i, word) in words.iter().enumerate() {
            patterns.push(format!("%{}%", escape_like(word)));
            conditions.push(format!("name_search LIKE ?{} ESCAPE '\\'", i + 2));
        }

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE name_search NOT LIKE ?1 ESCAPE '\\' AND {}
             ORDER BY name, id
             LIMIT {}",
            conditions.join(" AND "),
            limit - products.len()
        );
        let more = self
            .conn
            .prepare(&sql)?
            .query_map(params_from_iter(patterns.iter()), Self::product_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        products.extend(more);
        Ok(products)
    }

    /// Uniform random sample straight from SQLite
    pub fn random_sample(&self, limit: usize) -> Result<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY RANDOM() LIMIT ?1");
        let products = self
            .conn
            .prepare(&sql)?
            .query_map(params![limit as i64], Self::product_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(products)
    }

    /// Products in `category` with a strictly better score than `than`
    ///
    /// Best score first, ties broken by code so results don't depend on
    /// insertion order.
    pub fn products_in_category_better_than(
        &self,
        category: &str,
        than: Nutriscore,
        limit: Option<usize>,
    ) -> Result<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE products.nutriscore < ?2
               AND EXISTS (
                   SELECT 1 FROM product_categories pc
                   WHERE pc.product_id = products.id AND pc.category = ?1
               )
             ORDER BY products.nutriscore ASC, products.code ASC
             LIMIT ?3"
        );
        // SQLite reads a negative LIMIT as "no limit"
        let limit = limit.map(|l| l as i64).unwrap_or(-1);

        let products = self
            .conn
            .prepare(&sql)?
            .query_map(params![category, than, limit], Self::product_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(products)
    }

    // --- Favorites ---

    pub fn add_favorite(
        &self,
        user_id: &str,
        product_id: i64,
        tag: &FavoriteTag,
    ) -> Result<Favorite> {
        if self.get_product(product_id)?.is_none() {
            return Err(StoreError::ProductNotFound(product_id));
        }

        let created_at = Utc::now();
        self.conn.execute(
            "INSERT INTO favorites (user_id, product_id, tag, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![user_id, product_id, tag.as_str(), created_at.to_rfc3339()],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("User {} saved product {} under {:?}", user_id, product_id, tag.as_str());

        let favorite = self.conn.query_row(
            "SELECT id, user_id, product_id, tag, created_at FROM favorites WHERE id = ?1",
            params![id],
            Self::favorite_from_row,
        )?;
        Ok(favorite)
    }

    /// Saved products of a user with their tag, oldest first
    pub fn list_favorites(&self, user_id: &str) -> Result<Vec<(Product, FavoriteTag)>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS}, favorites.tag FROM favorites
             JOIN products ON products.id = favorites.product_id
             WHERE favorites.user_id = ?1
             ORDER BY favorites.id"
        );
        let favorites = self
            .conn
            .prepare(&sql)?
            .query_map(params![user_id], |row| {
                let product = Self::product_from_row(row)?;
                let tag: String = row.get(8)?;
                Ok((product, FavoriteTag::from_input(Some(tag.as_str()))))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(favorites)
    }

    /// Tags a user can pick from: the ones already used plus the default, sorted
    pub fn favorite_tags(&self, user_id: &str) -> Result<Vec<FavoriteTag>> {
        let mut tags = self
            .conn
            .prepare("SELECT DISTINCT tag FROM favorites WHERE user_id = ?1")?
            .query_map(params![user_id], |row| {
                let tag: String = row.get(0)?;
                Ok(FavoriteTag::from_input(Some(tag.as_str())))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        tags.push(FavoriteTag::default());
        tags.sort();
        tags.dedup();
        Ok(tags)
    }
}

fn json_column<T: serde::de::DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Lowercased name used for matching, Unicode-aware unlike SQLite's `lower()`
fn search_key(name: &str) -> String {
    name.to_lowercase()
}

/// Escape LIKE wildcards so user input matches literally
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_product(code: &str, name: &str, score: Nutriscore, categories: &[&str]) -> NewProduct {
        NewProduct {
            code: code.to_string(),
            name: name.to_string(),
            nutriscore: score,
            categories: categories.iter().map(|c| c.to_string()).collect(),
            image: format!("https://images.example/{}.jpg", code),
            link: format!("https://world.openfoodfacts.org/product/{}", code),
            nutrient_levels: vec!["Fat in low quantity (2g)".to_string()],
        }
    }

    fn seeded_store() -> CatalogStore {
        let store = CatalogStore::open_in_memory().unwrap();
        for product in [
            new_product("100", "Chocolate Spread", Nutriscore::E, &["en:spreads", "en:sweet-spreads"]),
            new_product("200", "Chocolate Cookies", Nutriscore::D, &["en:snacks", "en:biscuits"]),
            new_product("300", "Dark Chocolate", Nutriscore::C, &["en:snacks", "en:chocolates"]),
            new_product("400", "Hazelnut Spread", Nutriscore::C, &["en:spreads", "en:sweet-spreads"]),
            new_product("500", "Apple Compote", Nutriscore::A, &["en:desserts"]),
        ] {
            store.upsert_product(&product).unwrap();
        }
        store
    }

    fn names(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_upsert_inserts_then_updates() {
        let store = CatalogStore::open_in_memory().unwrap();

        let first = store
            .upsert_product(&new_product("123", "Test1", Nutriscore::B, &["en:test"]))
            .unwrap();
        assert!(matches!(first, UpsertOutcome::Inserted(_)));

        let second = store
            .upsert_product(&new_product("123", "Test One", Nutriscore::A, &["en:other"]))
            .unwrap();
        assert_eq!(second, UpsertOutcome::Updated(first.id()));
        assert_eq!(store.product_count().unwrap(), 1);

        let stored = store.get_product_by_code("123").unwrap().unwrap();
        assert_eq!(stored.name, "Test One");
        assert_eq!(stored.nutriscore, Nutriscore::A);
        assert_eq!(stored.categories, vec!["en:other".to_string()]);
    }

    #[test]
    fn test_update_overwrites_category_membership() {
        let store = CatalogStore::open_in_memory().unwrap();
        store
            .upsert_product(&new_product("1", "Yogurt", Nutriscore::A, &["en:dairies"]))
            .unwrap();
        store
            .upsert_product(&new_product("1", "Yogurt", Nutriscore::A, &["en:desserts"]))
            .unwrap();

        let dairies = store
            .products_in_category_better_than("en:dairies", Nutriscore::E, None)
            .unwrap();
        assert!(dairies.is_empty());

        let desserts = store
            .products_in_category_better_than("en:desserts", Nutriscore::E, None)
            .unwrap();
        assert_eq!(names(&desserts), vec!["Yogurt"]);
    }

    #[test]
    fn test_update_clears_image_and_link() {
        let store = CatalogStore::open_in_memory().unwrap();
        store
            .upsert_product(&new_product("9", "Muesli", Nutriscore::B, &[]))
            .unwrap();

        let mut bare = new_product("9", "Muesli", Nutriscore::B, &[]);
        bare.image = String::new();
        bare.link = String::new();
        bare.nutrient_levels = Vec::new();
        store.upsert_product(&bare).unwrap();

        let stored = store.get_product_by_code("9").unwrap().unwrap();
        assert_eq!(stored.image, "");
        assert_eq!(stored.link, "");
        assert!(stored.nutrient_levels.is_empty());
    }

    #[test]
    fn test_get_product_round_trips_fields() {
        let store = seeded_store();
        let by_code = store.get_product_by_code("300").unwrap().unwrap();
        let by_id = store.get_product(by_code.id).unwrap().unwrap();

        assert_eq!(by_code, by_id);
        assert_eq!(by_id.categories, vec!["en:snacks".to_string(), "en:chocolates".to_string()]);
        assert_eq!(by_id.nutrient_levels, vec!["Fat in low quantity (2g)".to_string()]);
        assert!(store.get_product(9999).unwrap().is_none());
        assert!(store.get_product_by_code("nope").unwrap().is_none());
    }

    #[test]
    fn test_search_prefix_before_substring() {
        let store = seeded_store();

        let results = store.search_by_name("choc", 12).unwrap();
        // Prefix matches come first, then names merely containing the word
        assert_eq!(
            names(&results),
            vec!["Chocolate Cookies", "Chocolate Spread", "Dark Chocolate"]
        );
    }

    #[test]
    fn test_search_requires_every_word_in_substring_phase() {
        let store = seeded_store();

        let results = store.search_by_name("spread hazelnut", 12).unwrap();
        assert_eq!(names(&results), vec!["Hazelnut Spread"]);

        let results = store.search_by_name("spread", 12).unwrap();
        assert_eq!(names(&results), vec!["Chocolate Spread", "Hazelnut Spread"]);
    }

    #[test]
    fn test_search_respects_limit() {
        let store = seeded_store();

        let results = store.search_by_name("choc", 2).unwrap();
        assert_eq!(names(&results), vec!["Chocolate Cookies", "Chocolate Spread"]);
        assert!(store.search_by_name("choc", 0).unwrap().is_empty());
    }

    #[test]
    fn test_search_treats_wildcards_literally() {
        let store = seeded_store();
        assert!(store.search_by_name("%", 12).unwrap().is_empty());
        assert!(store.search_by_name("_", 12).unwrap().is_empty());
    }

    #[test]
    fn test_search_ignores_case_of_accented_letters() {
        let store = CatalogStore::open_in_memory().unwrap();
        store
            .upsert_product(&new_product("1", "Éclair Au Chocolat", Nutriscore::E, &["en:pastries"]))
            .unwrap();
        store
            .upsert_product(&new_product("2", "Pâte À Tartiner", Nutriscore::E, &["en:spreads"]))
            .unwrap();

        assert_eq!(names(&store.search_by_name("éclair", 12).unwrap()), vec!["Éclair Au Chocolat"]);
        assert_eq!(names(&store.search_by_name("ÉCLAIR", 12).unwrap()), vec!["Éclair Au Chocolat"]);
        assert_eq!(
            names(&store.search_by_name("pâte à tartiner", 12).unwrap()),
            vec!["Pâte À Tartiner"]
        );
        // Substring phase folds too
        assert_eq!(names(&store.search_by_name("à", 12).unwrap()), vec!["Pâte À Tartiner"]);
    }

    #[test]
    fn test_search_key_follows_renames() {
        let store = CatalogStore::open_in_memory().unwrap();
        store
            .upsert_product(&new_product("1", "Crème Brûlée", Nutriscore::D, &[]))
            .unwrap();
        store
            .upsert_product(&new_product("1", "Île Flottante", Nutriscore::D, &[]))
            .unwrap();

        assert!(store.search_by_name("crème", 12).unwrap().is_empty());
        assert_eq!(names(&store.search_by_name("île", 12).unwrap()), vec!["Île Flottante"]);
    }

    #[test]
    fn test_migration_fills_search_key_for_existing_products() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.db");

        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE products (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    code TEXT NOT NULL UNIQUE,
                    name TEXT NOT NULL,
                    nutriscore TEXT NOT NULL,
                    categories TEXT NOT NULL DEFAULT '[]',
                    image TEXT NOT NULL DEFAULT '',
                    link TEXT NOT NULL DEFAULT '',
                    nutrient_levels TEXT NOT NULL DEFAULT '[]'
                );
                INSERT INTO products (code, name, nutriscore) VALUES ('1', 'Œufs Frais', 'a');
                PRAGMA user_version = 1;",
            )
            .unwrap();
        }

        let store = CatalogStore::open(&path).unwrap();
        assert_eq!(names(&store.search_by_name("œufs", 12).unwrap()), vec!["Œufs Frais"]);
    }

    #[test]
    fn test_random_sample_size() {
        let store = seeded_store();
        assert_eq!(store.random_sample(3).unwrap().len(), 3);
        assert_eq!(store.random_sample(50).unwrap().len(), 5);
    }

    #[test]
    fn test_category_query_orders_by_score_then_code() {
        let store = seeded_store();
        store
            .upsert_product(&new_product("050", "Fruit Spread", Nutriscore::C, &["en:sweet-spreads"]))
            .unwrap();

        let results = store
            .products_in_category_better_than("en:sweet-spreads", Nutriscore::E, None)
            .unwrap();
        // Both are "c": code "050" sorts before "400"
        assert_eq!(names(&results), vec!["Fruit Spread", "Hazelnut Spread"]);

        let limited = store
            .products_in_category_better_than("en:sweet-spreads", Nutriscore::E, Some(1))
            .unwrap();
        assert_eq!(names(&limited), vec!["Fruit Spread"]);

        let none = store
            .products_in_category_better_than("en:sweet-spreads", Nutriscore::C, None)
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_favorites_keep_duplicates_with_tags() {
        let store = seeded_store();
        let product = store.get_product_by_code("500").unwrap().unwrap();

        let first = store
            .add_favorite("alice", product.id, &FavoriteTag::default())
            .unwrap();
        let second = store
            .add_favorite("alice", product.id, &FavoriteTag::from_input(Some("Desserts")))
            .unwrap();

        assert_ne!(first.id, second.id);
        assert!(first.tag.is_default());
        assert_eq!(second.tag.as_str(), "Desserts");

        let saved = store.list_favorites("alice").unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].0, product);
        assert!(saved[0].1.is_default());
        assert_eq!(saved[1].1.as_str(), "Desserts");

        assert!(store.list_favorites("bob").unwrap().is_empty());
    }

    #[test]
    fn test_favorite_on_unknown_product() {
        let store = seeded_store();
        let result = store.add_favorite("alice", 4242, &FavoriteTag::default());
        assert!(matches!(result, Err(StoreError::ProductNotFound(4242))));
    }

    #[test]
    fn test_favorite_tags_include_default() {
        let store = seeded_store();
        let product = store.get_product_by_code("100").unwrap().unwrap();
        assert_eq!(store.favorite_tags("alice").unwrap(), vec![FavoriteTag::default()]);

        store
            .add_favorite("alice", product.id, &FavoriteTag::from_input(Some("Snacks")))
            .unwrap();
        store
            .add_favorite("alice", product.id, &FavoriteTag::from_input(Some("Breakfast")))
            .unwrap();
        store
            .add_favorite("alice", product.id, &FavoriteTag::from_input(Some("Snacks")))
            .unwrap();

        let tags: Vec<String> = store
            .favorite_tags("alice")
            .unwrap()
            .into_iter()
            .map(|t| t.to_string())
            .collect();
        assert_eq!(tags, vec!["Breakfast", "Snacks", "Unclassified"]);
    }

    #[test]
    fn test_open_on_disk_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("catalog.db");

        {
            let store = CatalogStore::open(&path).unwrap();
            store
                .upsert_product(&new_product("77", "Oat Milk", Nutriscore::B, &["en:plant-milks"]))
                .unwrap();
        }

        let reopened = CatalogStore::open(&path).unwrap();
        assert_eq!(reopened.product_count().unwrap(), 1);
        assert_eq!(
            reopened.get_product_by_code("77").unwrap().unwrap().name,
            "Oat Milk"
        );
    }
}
