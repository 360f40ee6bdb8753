//! Fixtures
//!
//! YAML menu sets: a catalog file plus a recommendation-rules file sharing a
//! name. Prices are written as `"55.00 MAD"` strings and parsed into minor
//! units once, at load time. The default set ships embedded in the binary so
//! a kiosk can run without its backend.

use std::{fs, path::PathBuf};

use rust_decimal::{Decimal, prelude::ToPrimitive};
use rusty_money::{
    Money,
    iso::{Currency, EUR, MAD, USD},
};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    catalog::{Catalog, CatalogError, Category, Extra, Ingredient, MediaItem, Product},
    recommend::RecommendationRules,
};

const DEFAULT_MENU: &str = include_str!("../fixtures/menus/default.yml");
const DEFAULT_RULES: &str = include_str!("../fixtures/rules/default.yml");

/// Fixture parsing errors.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Invalid price format
    #[error("invalid price format: {0}")]
    InvalidPrice(String),

    /// Unknown currency code
    #[error("unknown currency code: {0}")]
    UnknownCurrency(String),

    /// The parsed menu failed catalog validation
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Wrapper for a menu in YAML
#[derive(Debug, Deserialize)]
struct MenuFixture {
    /// Currency code every price must use (e.g. "MAD")
    currency: String,

    /// Categories in display order
    categories: Vec<Category>,

    /// Products in menu order
    products: Vec<ProductFixture>,

    /// Welcome-screen media
    #[serde(default)]
    welcome_media: Vec<MediaItem>,
}

/// Product as authored in YAML
#[derive(Debug, Deserialize)]
struct ProductFixture {
    id: String,
    name: String,

    #[serde(default)]
    description: String,

    /// Price string (e.g. "55.00 MAD")
    price: String,

    #[serde(default)]
    image: Option<String>,

    /// Owning category id
    category: String,

    #[serde(default)]
    ingredients: Vec<Ingredient>,

    #[serde(default)]
    extras: Vec<ExtraFixture>,

    #[serde(default = "default_available")]
    available: bool,

    /// A present promo price marks the promo active
    #[serde(default)]
    promo_price: Option<String>,
}

/// Extra as authored in YAML
#[derive(Debug, Deserialize)]
struct ExtraFixture {
    id: String,
    name: String,

    /// Price string (e.g. "8.00 MAD")
    price: String,

    #[serde(default)]
    image: Option<String>,
}

fn default_available() -> bool {
    true
}

impl ProductFixture {
    fn into_product(self) -> Result<Product<'static>, FixtureError> {
        let (minor_units, currency) = parse_price(&self.price)?;

        let promo_price = match &self.promo_price {
            Some(price) => {
                let (promo_minor, promo_currency) = parse_price(price)?;

                Some(Money::from_minor(promo_minor, promo_currency))
            }
            None => None,
        };

        let extras = self
            .extras
            .into_iter()
            .map(|extra| {
                let (extra_minor, extra_currency) = parse_price(&extra.price)?;

                Ok(Extra {
                    id: extra.id,
                    name: extra.name,
                    price: Money::from_minor(extra_minor, extra_currency),
                    image: extra.image,
                })
            })
            .collect::<Result<Vec<_>, FixtureError>>()?;

        Ok(Product {
            id: self.id,
            name: self.name,
            description: self.description,
            price: Money::from_minor(minor_units, currency),
            image: self.image,
            category_id: self.category,
            ingredients: self.ingredients,
            extras,
            is_available: self.available,
            is_promo: promo_price.is_some(),
            promo_price,
        })
    }
}

/// Parse a price string (e.g. "55.00 MAD") into minor units and currency.
///
/// # Errors
///
/// Returns an error if the string is not in the format "AMOUNT CURRENCY",
/// if the amount cannot be parsed as a decimal, or if the currency code is
/// not recognized.
pub fn parse_price(s: &str) -> Result<(i64, &'static Currency), FixtureError> {
    let parts: Vec<&str> = s.split_whitespace().collect();

    if parts.len() != 2 {
        return Err(FixtureError::InvalidPrice(format!(
            "expected format 'AMOUNT CURRENCY', got: {s}"
        )));
    }

    let amount = parts
        .first()
        .ok_or_else(|| FixtureError::InvalidPrice(s.to_string()))?
        .parse::<Decimal>()
        .map_err(|_err| FixtureError::InvalidPrice(s.to_string()))?;

    let minor_units = amount
        .checked_mul(Decimal::new(100, 0))
        .and_then(|value| value.round_dp(0).to_i64())
        .ok_or_else(|| FixtureError::InvalidPrice(s.to_string()))?;

    let currency_code = parts
        .get(1)
        .ok_or_else(|| FixtureError::InvalidPrice(s.to_string()))?;

    let currency = parse_currency(currency_code)?;

    Ok((minor_units, currency))
}

/// Resolve a currency code used in fixtures.
///
/// # Errors
///
/// Returns [`FixtureError::UnknownCurrency`] for a code outside the
/// supported set.
pub fn parse_currency(code: &str) -> Result<&'static Currency, FixtureError> {
    match code {
        "MAD" => Ok(MAD),
        "EUR" => Ok(EUR),
        "USD" => Ok(USD),
        other => Err(FixtureError::UnknownCurrency(other.to_string())),
    }
}

/// Parse a menu YAML document into a validated catalog.
///
/// # Errors
///
/// Returns a [`FixtureError`] for malformed YAML, bad price strings, or a
/// menu that fails catalog validation.
pub fn menu_from_str(yaml: &str) -> Result<Catalog<'static>, FixtureError> {
    let fixture: MenuFixture = serde_norway::from_str(yaml)?;
    let currency = parse_currency(&fixture.currency)?;

    let products = fixture
        .products
        .into_iter()
        .map(ProductFixture::into_product)
        .collect::<Result<Vec<_>, FixtureError>>()?;

    Ok(Catalog::new(
        fixture.categories,
        products,
        fixture.welcome_media,
        currency,
    )?)
}

/// Parse a recommendation-rules YAML document.
///
/// # Errors
///
/// Returns [`FixtureError::Yaml`] for malformed YAML.
pub fn rules_from_str(yaml: &str) -> Result<RecommendationRules, FixtureError> {
    Ok(serde_norway::from_str(yaml)?)
}

/// Load the menu and rules of one named fixture set from disk
/// (`menus/<name>.yml` and `rules/<name>.yml` under `base_path`).
///
/// # Errors
///
/// Returns a [`FixtureError`] if either file cannot be read or parsed.
pub fn load_set(
    base_path: impl Into<PathBuf>,
    name: &str,
) -> Result<(Catalog<'static>, RecommendationRules), FixtureError> {
    let base_path = base_path.into();

    let menu_path = base_path.join("menus").join(format!("{name}.yml"));
    let rules_path = base_path.join("rules").join(format!("{name}.yml"));

    let catalog = menu_from_str(&fs::read_to_string(menu_path)?)?;
    let rules = rules_from_str(&fs::read_to_string(rules_path)?)?;

    Ok((catalog, rules))
}

/// The embedded default menu and rules, mirroring the original kiosk's
/// catalog. Lets the demo binary and the tests run without a backend.
///
/// # Errors
///
/// Returns a [`FixtureError`] only if the embedded documents are invalid,
/// which the test suite rules out.
pub fn default_menu() -> Result<(Catalog<'static>, RecommendationRules), FixtureError> {
    Ok((menu_from_str(DEFAULT_MENU)?, rules_from_str(DEFAULT_RULES)?))
}
