//! Catalog
//!
//! Read-only product, category and welcome-media data, validated once at load
//! time. A corrupt catalog is rejected here, before any customer session
//! starts; the rest of the crate can then treat catalog lookups as total.

use rustc_hash::FxHashMap;
use rusty_money::{Money, iso::Currency};
use serde::Deserialize;
use slotmap::{SlotMap, new_key_type};
use thiserror::Error;

new_key_type! {
    /// Product Key
    pub struct ProductKey;
}

/// Coarse menu role of a category, used by the recommendation gap-fill
/// heuristics ("a main dish but no drink yet").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryRole {
    /// Main dishes (burgers, wraps, ...)
    Main,

    /// Sides
    Side,

    /// Drinks
    Drink,

    /// Desserts
    Dessert,

    /// Everything else; never gap-filled
    #[default]
    Other,
}

/// Menu category
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Category {
    /// Category id, referenced by products and rule tables
    pub id: String,

    /// Display name
    pub name: String,

    /// Icon shown in the category sidebar
    pub icon: String,

    /// Optional banner image reference
    #[serde(default)]
    pub image: Option<String>,

    /// Menu role for the recommendation heuristics
    #[serde(default)]
    pub role: CategoryRole,
}

/// A single ingredient of a product
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Ingredient {
    /// Ingredient id, unique within its product
    pub id: String,

    /// Display name
    pub name: String,

    /// Optional image reference
    #[serde(default)]
    pub image: Option<String>,

    /// Whether the customer may exclude this ingredient
    pub removable: bool,
}

/// A priced optional extra of a product
#[derive(Debug, Clone, PartialEq)]
pub struct Extra<'a> {
    /// Extra id, unique within its product
    pub id: String,

    /// Display name
    pub name: String,

    /// Price added per unit of the owning line
    pub price: Money<'a, Currency>,

    /// Optional image reference
    pub image: Option<String>,
}

/// Kind of a welcome-screen media item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Still image
    Image,

    /// Video clip
    Video,
}

/// A welcome-screen carousel entry. Carried for the display layer; the core
/// does not interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MediaItem {
    /// Media id
    pub id: String,

    /// Image or video
    pub kind: MediaKind,

    /// Source URL
    pub url: String,

    /// Optional caption
    #[serde(default)]
    pub title: Option<String>,

    /// Display duration in milliseconds, for carousel timing
    #[serde(default)]
    pub duration_ms: Option<u64>,

    /// Inactive items are kept but not shown
    pub is_active: bool,
}

/// A sellable product. Immutable after catalog load.
#[derive(Debug, Clone, PartialEq)]
pub struct Product<'a> {
    /// Product id, unique across the catalog
    pub id: String,

    /// Display name
    pub name: String,

    /// Menu description
    pub description: String,

    /// Base price
    pub price: Money<'a, Currency>,

    /// Optional image reference
    pub image: Option<String>,

    /// Owning category id
    pub category_id: String,

    /// Ingredients in display order
    pub ingredients: Vec<Ingredient>,

    /// Optional extras in display order
    pub extras: Vec<Extra<'a>>,

    /// Unavailable products stay in the catalog but are never sold or
    /// recommended
    pub is_available: bool,

    /// Whether the promo price is currently active
    pub is_promo: bool,

    /// Discounted price; must be strictly below the base price when present
    pub promo_price: Option<Money<'a, Currency>>,
}

impl<'a> Product<'a> {
    /// Looks up an ingredient that exists on this product and is removable.
    pub fn removable_ingredient(&self, id: &str) -> Option<&Ingredient> {
        self.ingredients
            .iter()
            .find(|ingredient| ingredient.removable && ingredient.id == id)
    }

    /// Looks up an extra by id.
    pub fn extra(&self, id: &str) -> Option<&Extra<'a>> {
        self.extras.iter().find(|extra| extra.id == id)
    }
}

/// Catalog validation errors. All of these are load-time faults; none can
/// occur mid-session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// Two categories share an id.
    #[error("duplicate category id: {0}")]
    DuplicateCategory(String),

    /// Two products share an id.
    #[error("duplicate product id: {0}")]
    DuplicateProduct(String),

    /// A product references a category that does not exist.
    #[error("product {product} references unknown category {category}")]
    UnknownCategory {
        /// Offending product id
        product: String,
        /// Missing category id
        category: String,
    },

    /// A base, promo or extra price is negative.
    #[error("product {product} has a negative price for {field}")]
    NegativePrice {
        /// Offending product id
        product: String,
        /// Which price field was negative ("base", "promo" or an extra id)
        field: String,
    },

    /// A promo price that is not strictly below the base price.
    #[error("product {product} has a promo price that is not below its base price")]
    PromoNotBelowBase {
        /// Offending product id
        product: String,
    },

    /// Two ingredients of one product share an id.
    #[error("product {product} has duplicate ingredient id {ingredient}")]
    DuplicateIngredient {
        /// Offending product id
        product: String,
        /// Duplicated ingredient id
        ingredient: String,
    },

    /// Two extras of one product share an id.
    #[error("product {product} has duplicate extra id {extra}")]
    DuplicateExtra {
        /// Offending product id
        product: String,
        /// Duplicated extra id
        extra: String,
    },

    /// A product priced in a different currency than the catalog.
    #[error("product {product} is priced in {found}, catalog currency is {expected}")]
    CurrencyMismatch {
        /// Offending product id
        product: String,
        /// Catalog currency code
        expected: &'static str,
        /// Product currency code
        found: &'static str,
    },
}

/// Validated, read-only catalog. Loaded once per kiosk session.
#[derive(Debug)]
pub struct Catalog<'a> {
    categories: Vec<Category>,
    products: SlotMap<ProductKey, Product<'a>>,
    order: Vec<ProductKey>,
    ids: FxHashMap<String, ProductKey>,
    welcome_media: Vec<MediaItem>,
    currency: &'static Currency,
}

impl<'a> Catalog<'a> {
    /// Builds a catalog, validating every invariant the rest of the crate
    /// relies on.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] for duplicate ids, unknown category
    /// references, negative prices, promo prices not below the base price,
    /// or currency mismatches.
    pub fn new(
        categories: Vec<Category>,
        products: Vec<Product<'a>>,
        welcome_media: Vec<MediaItem>,
        currency: &'static Currency,
    ) -> Result<Self, CatalogError> {
        let mut category_ids: FxHashMap<&str, ()> = FxHashMap::default();

        for category in &categories {
            if category_ids.insert(&category.id, ()).is_some() {
                return Err(CatalogError::DuplicateCategory(category.id.clone()));
            }
        }

        for product in &products {
            validate_product(product, &category_ids, currency)?;
        }

        let mut map: SlotMap<ProductKey, Product<'a>> = SlotMap::with_key();
        let mut order = Vec::with_capacity(products.len());
        let mut ids = FxHashMap::default();

        for product in products {
            if ids.contains_key(&product.id) {
                return Err(CatalogError::DuplicateProduct(product.id.clone()));
            }

            let id = product.id.clone();
            let key = map.insert(product);

            ids.insert(id, key);
            order.push(key);
        }

        Ok(Catalog {
            categories,
            products: map,
            order,
            ids,
            welcome_media,
            currency,
        })
    }

    /// Looks up a product by key.
    pub fn product(&self, key: ProductKey) -> Option<&Product<'a>> {
        self.products.get(key)
    }

    /// Looks up a product by its string id.
    pub fn product_by_id(&self, id: &str) -> Option<(ProductKey, &Product<'a>)> {
        let key = *self.ids.get(id)?;

        self.products.get(key).map(|product| (key, product))
    }

    /// Returns the key for a product id, if present.
    pub fn key_of(&self, id: &str) -> Option<ProductKey> {
        self.ids.get(id).copied()
    }

    /// Iterates all products in catalog order.
    pub fn products(&self) -> impl Iterator<Item = (ProductKey, &Product<'a>)> {
        self.order
            .iter()
            .filter_map(|key| self.products.get(*key).map(|product| (*key, product)))
    }

    /// Iterates the products of one category in catalog order. An unknown or
    /// empty category yields an empty menu section, not an error.
    pub fn products_in_category<'c>(
        &'c self,
        category_id: &'c str,
    ) -> impl Iterator<Item = (ProductKey, &'c Product<'a>)> {
        self.products()
            .filter(move |(_, product)| product.category_id == category_id)
    }

    /// Looks up a category by id.
    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|category| category.id == id)
    }

    /// All categories in display order.
    #[must_use]
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Welcome-screen media items.
    #[must_use]
    pub fn welcome_media(&self) -> &[MediaItem] {
        &self.welcome_media
    }

    /// Number of products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the catalog has no products.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Catalog currency.
    #[must_use]
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }
}

fn validate_product(
    product: &Product<'_>,
    category_ids: &FxHashMap<&str, ()>,
    currency: &'static Currency,
) -> Result<(), CatalogError> {
    if !category_ids.contains_key(product.category_id.as_str()) {
        return Err(CatalogError::UnknownCategory {
            product: product.id.clone(),
            category: product.category_id.clone(),
        });
    }

    check_currency(product, product.price.currency(), currency)?;

    if product.price.to_minor_units() < 0 {
        return Err(CatalogError::NegativePrice {
            product: product.id.clone(),
            field: "base".to_string(),
        });
    }

    if let Some(promo) = product.promo_price {
        check_currency(product, promo.currency(), currency)?;

        if promo.to_minor_units() < 0 {
            return Err(CatalogError::NegativePrice {
                product: product.id.clone(),
                field: "promo".to_string(),
            });
        }

        if promo.to_minor_units() >= product.price.to_minor_units() {
            return Err(CatalogError::PromoNotBelowBase {
                product: product.id.clone(),
            });
        }
    }

    let mut ingredient_ids: FxHashMap<&str, ()> = FxHashMap::default();

    for ingredient in &product.ingredients {
        if ingredient_ids.insert(&ingredient.id, ()).is_some() {
            return Err(CatalogError::DuplicateIngredient {
                product: product.id.clone(),
                ingredient: ingredient.id.clone(),
            });
        }
    }

    let mut extra_ids: FxHashMap<&str, ()> = FxHashMap::default();

    for extra in &product.extras {
        check_currency(product, extra.price.currency(), currency)?;

        if extra.price.to_minor_units() < 0 {
            return Err(CatalogError::NegativePrice {
                product: product.id.clone(),
                field: extra.id.clone(),
            });
        }

        if extra_ids.insert(&extra.id, ()).is_some() {
            return Err(CatalogError::DuplicateExtra {
                product: product.id.clone(),
                extra: extra.id.clone(),
            });
        }
    }

    Ok(())
}

fn check_currency(
    product: &Product<'_>,
    found: &Currency,
    expected: &'static Currency,
) -> Result<(), CatalogError> {
    if found == expected {
        Ok(())
    } else {
        Err(CatalogError::CurrencyMismatch {
            product: product.id.clone(),
            expected: expected.iso_alpha_code,
            found: found.iso_alpha_code,
        })
    }
}
