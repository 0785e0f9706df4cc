use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Label used when a favorite is saved without choosing a tag
pub const DEFAULT_TAG: &str = "Unclassified";

/// Nutri-Score grade, `A` is the healthiest
///
/// The derived ordering follows the letters, so "better than" means "less than".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Nutriscore {
    A,
    B,
    C,
    D,
    E,
}

impl Nutriscore {
    pub fn as_str(&self) -> &'static str {
        match self {
            Nutriscore::A => "a",
            Nutriscore::B => "b",
            Nutriscore::C => "c",
            Nutriscore::D => "d",
            Nutriscore::E => "e",
        }
    }

    /// Every score, best first
    pub fn all() -> [Nutriscore; 5] {
        [
            Nutriscore::A,
            Nutriscore::B,
            Nutriscore::C,
            Nutriscore::D,
            Nutriscore::E,
        ]
    }

    pub fn is_better_than(&self, other: Nutriscore) -> bool {
        *self < other
    }
}

impl fmt::Display for Nutriscore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid nutriscore: {0:?} (expected a letter from a to e)")]
pub struct ParseNutriscoreError(pub String);

impl FromStr for Nutriscore {
    type Err = ParseNutriscoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let letter = s.trim().to_ascii_lowercase();
        Nutriscore::all()
            .into_iter()
            .find(|score| score.as_str() == letter)
            .ok_or_else(|| ParseNutriscoreError(s.to_string()))
    }
}

impl ToSql for Nutriscore {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Nutriscore {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// A product stored in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    /// Barcode from the source database, unique in the catalog
    pub code: String,
    pub name: String,
    pub nutriscore: Nutriscore,
    /// Ordered from most general (index 0) to most specific (last)
    pub categories: Vec<String>,
    pub image: String,
    pub link: String,
    /// Human readable lines such as "Fat in low quantity (2g)"
    pub nutrient_levels: Vec<String>,
}

impl Product {
    /// Categories from the narrowest to the broadest
    pub fn categories_most_specific_first(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().rev().map(String::as_str)
    }

    pub fn shares_category_with(&self, other: &Product) -> bool {
        self.categories
            .iter()
            .any(|category| other.categories.contains(category))
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Product fields as they come out of normalization, before they have an id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub code: String,
    pub name: String,
    pub nutriscore: Nutriscore,
    pub categories: Vec<String>,
    pub image: String,
    pub link: String,
    pub nutrient_levels: Vec<String>,
}

/// What an upsert did, with the id of the row it touched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted(i64),
    Updated(i64),
}

impl UpsertOutcome {
    pub fn id(&self) -> i64 {
        match self {
            UpsertOutcome::Inserted(id) | UpsertOutcome::Updated(id) => *id,
        }
    }
}

/// Label a user files a saved product under
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FavoriteTag(String);

impl FavoriteTag {
    /// Resolve an optional user-supplied label, blank input means the default tag
    pub fn from_input(input: Option<&str>) -> Self {
        match input.map(str::trim) {
            Some(tag) if !tag.is_empty() => FavoriteTag(tag.to_string()),
            _ => FavoriteTag::default(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_TAG
    }
}

impl Default for FavoriteTag {
    fn default() -> Self {
        FavoriteTag(DEFAULT_TAG.to_string())
    }
}

impl fmt::Display for FavoriteTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A product saved by a user under a tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    pub id: i64,
    pub user_id: String,
    pub product_id: i64,
    pub tag: FavoriteTag,
    pub created_at: DateTime<Utc>,
}
