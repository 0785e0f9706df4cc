//! Mapping from OpenFoodFacts documents to catalog products.
//!
//! A record needs a code, a name and a valid Nutri-Score to be usable,
//! everything else falls back to an empty value.

use serde_json::Value;
use subfinder_api::OffProduct;
use subfinder_store::{NewProduct, Nutriscore};

use crate::{Error, Result};

/// Nutrients shown on the product page, with their display label
pub const TRACKED_NUTRIENTS: [(&str, &str); 4] = [
    ("fat", "Fat"),
    ("saturated-fat", "Saturated fat"),
    ("sugars", "Sugars"),
    ("salt", "Salt"),
];

/// Normalize a raw JSON record from a search page
pub fn normalize(raw: Value, category_language: &str) -> Result<NewProduct> {
    let code = raw
        .get("code")
        .and_then(|c| match c {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });

    let product = OffProduct::from_value(raw)
        .map_err(|e| Error::malformed(code.as_deref(), format!("unexpected shape: {}", e)))?;

    normalize_product(product, category_language)
}

/// Normalize an already decoded OpenFoodFacts product
pub fn normalize_product(product: OffProduct, category_language: &str) -> Result<NewProduct> {
    let code = product
        .code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| Error::malformed(None, "missing code"))?
        .to_string();

    let name = product
        .product_name
        .as_deref()
        .map(title_case)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| Error::malformed(Some(code.as_str()), "missing product name"))?;

    let nutriscore: Nutriscore = product
        .grade()
        .ok_or_else(|| Error::malformed(Some(code.as_str()), "missing nutriscore"))?
        .parse()
        .map_err(|e| Error::malformed(Some(code.as_str()), format!("{}", e)))?;

    Ok(NewProduct {
        categories: language_categories(&product.categories_tags, category_language),
        nutrient_levels: nutrient_levels(&product),
        image: product.image_front_small_url.clone().unwrap_or_default(),
        link: product.url.clone().unwrap_or_default(),
        code,
        name,
        nutriscore,
    })
}

/// Keep tags like `en:yogurts` for language `en`, in source order
fn language_categories(tags: &[String], language: &str) -> Vec<String> {
    let prefix = format!("{}:", language.trim().trim_end_matches(':'));
    tags.iter()
        .map(|tag| tag.trim())
        .filter(|tag| tag.len() > prefix.len() && tag.starts_with(&prefix))
        .map(str::to_string)
        .collect()
}

/// One line per tracked nutrient that has both a level and an amount
fn nutrient_levels(product: &OffProduct) -> Vec<String> {
    TRACKED_NUTRIENTS
        .iter()
        .filter_map(|(nutrient, label)| {
            let level = product
                .nutrient_levels
                .get(*nutrient)
                .map(|l| l.trim())
                .filter(|l| !l.is_empty())?;
            let amount = product.amount_per_100g(nutrient)?;
            Some(format!("{} in {} quantity ({}g)", label, level, amount))
        })
        .collect()
}

/// "nutella CHOCOLATE spread" -> "Nutella Chocolate Spread"
///
/// A letter is capitalized whenever the character before it isn't one, so
/// "coca-cola" becomes "Coca-Cola".
fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut after_letter = false;
            word.chars()
                .flat_map(|c| {
                    let upper = !after_letter;
                    after_letter = c.is_alphabetic();
                    if upper {
                        c.to_uppercase().collect::<Vec<_>>()
                    } else {
                        c.to_lowercase().collect::<Vec<_>>()
                    }
                })
                .collect::<String>()
        })
        .collect::<Vec<String>>()
        .join(" ")
}
