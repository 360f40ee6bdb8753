//! Recommendations
//!
//! Deterministic, rule-table-driven up-sell suggestions. The tables are
//! hand-authored configuration (an offline stand-in for a future model);
//! authored order is the canonical tie-break order, stably preserved in
//! every result.
//!
//! References are validated once, when the rules are resolved against the
//! catalog: unresolved ids are reported to the caller (the app logs them)
//! and skipped, so lookups at recommendation time can never fail.

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;

use crate::{
    cart::CartLine,
    catalog::{Catalog, CategoryRole, ProductKey},
};

/// Products from paired categories drawn by [`Recommender::for_product`].
const PAIRED_CATEGORY_DRAWS: usize = 3;

/// Products added per missing category by the cart gap-fill heuristics.
const GAP_FILL_PER_CATEGORY: usize = 2;

/// One co-occurrence entry: a product or category id mapped to the products
/// frequently bought with it, in suggestion order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CoOccurrenceRule {
    /// Product id or category id this rule fires for
    pub key: String,

    /// Suggested product ids, most relevant first
    pub suggests: Vec<String>,
}

/// Categories that go well together, in pairing order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryPairing {
    /// Category the pairing is for
    pub category: String,

    /// Complementary categories, most relevant first
    pub pairs_with: Vec<String>,
}

/// The authored rule tables, as loaded from configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecommendationRules {
    /// Co-occurrence entries keyed by product or category id
    #[serde(default)]
    pub co_occurrence: Vec<CoOccurrenceRule>,

    /// Category pairings
    #[serde(default)]
    pub category_pairings: Vec<CategoryPairing>,
}

/// A rule reference that did not resolve against the catalog. Reported at
/// load time and skipped; never a runtime failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvedReference {
    /// A co-occurrence key that is neither a product nor a category id.
    RuleKey {
        /// The unresolved key
        key: String,
    },

    /// A suggested product id that does not exist.
    SuggestedProduct {
        /// Key of the rule containing the reference
        key: String,
        /// The unresolved product id
        product: String,
    },

    /// A pairing keyed by an unknown category.
    PairingCategory {
        /// The unresolved category id
        category: String,
    },

    /// A paired category that does not exist.
    PairedCategory {
        /// Key of the pairing containing the reference
        category: String,
        /// The unresolved paired category id
        paired: String,
    },
}

impl fmt::Display for UnresolvedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvedReference::RuleKey { key } => {
                write!(f, "co-occurrence key {key} matches no product or category")
            }
            UnresolvedReference::SuggestedProduct { key, product } => {
                write!(f, "rule {key} suggests unknown product {product}")
            }
            UnresolvedReference::PairingCategory { category } => {
                write!(f, "pairing references unknown category {category}")
            }
            UnresolvedReference::PairedCategory { category, paired } => {
                write!(f, "pairing for {category} references unknown category {paired}")
            }
        }
    }
}

impl RecommendationRules {
    /// Resolves the authored tables against a catalog, reporting every
    /// reference that does not exist. Unresolved suggestions are dropped;
    /// everything else is kept in authored order.
    pub fn resolve(&self, catalog: &Catalog<'_>) -> (Recommender, Vec<UnresolvedReference>) {
        let mut unresolved = Vec::new();
        let mut co_occurrence: FxHashMap<String, Vec<ProductKey>> = FxHashMap::default();

        for rule in &self.co_occurrence {
            let key_known =
                catalog.key_of(&rule.key).is_some() || catalog.category(&rule.key).is_some();

            if !key_known {
                unresolved.push(UnresolvedReference::RuleKey {
                    key: rule.key.clone(),
                });

                continue;
            }

            let entry = co_occurrence.entry(rule.key.clone()).or_default();

            for product_id in &rule.suggests {
                match catalog.key_of(product_id) {
                    Some(key) => entry.push(key),
                    None => unresolved.push(UnresolvedReference::SuggestedProduct {
                        key: rule.key.clone(),
                        product: product_id.clone(),
                    }),
                }
            }
        }

        let mut pairings: FxHashMap<String, Vec<String>> = FxHashMap::default();

        for pairing in &self.category_pairings {
            if catalog.category(&pairing.category).is_none() {
                unresolved.push(UnresolvedReference::PairingCategory {
                    category: pairing.category.clone(),
                });

                continue;
            }

            let entry = pairings.entry(pairing.category.clone()).or_default();

            for paired in &pairing.pairs_with {
                if catalog.category(paired).is_some() {
                    entry.push(paired.clone());
                } else {
                    unresolved.push(UnresolvedReference::PairedCategory {
                        category: pairing.category.clone(),
                        paired: paired.clone(),
                    });
                }
            }
        }

        (
            Recommender {
                co_occurrence,
                pairings,
            },
            unresolved,
        )
    }
}

/// Rule tables resolved against a catalog, ready for lookups.
#[derive(Debug, Clone)]
pub struct Recommender {
    co_occurrence: FxHashMap<String, Vec<ProductKey>>,
    pairings: FxHashMap<String, Vec<String>>,
}

impl Recommender {
    /// Suggestions for the product detail page: direct co-occurrence by
    /// product id, then by category id, then up to three products drawn from
    /// paired categories. The queried product itself and unavailable
    /// products are never returned.
    pub fn for_product(
        &self,
        catalog: &Catalog<'_>,
        key: ProductKey,
        limit: usize,
    ) -> Vec<ProductKey> {
        let Some(product) = catalog.product(key) else {
            return Vec::new();
        };

        let mut picks = Picks::new(limit);

        for suggested in self.suggestions_for(&product.id) {
            picks.push_available(catalog, suggested, Some(key));
        }

        for suggested in self.suggestions_for(&product.category_id) {
            picks.push_available(catalog, suggested, Some(key));
        }

        if let Some(paired) = self.pairings.get(&product.category_id) {
            let mut drawn = 0;

            'pairs: for paired_category in paired {
                for (candidate, _) in catalog.products_in_category(paired_category) {
                    if candidate == key {
                        continue;
                    }

                    if drawn == PAIRED_CATEGORY_DRAWS {
                        break 'pairs;
                    }

                    drawn += 1;
                    picks.push_available(catalog, candidate, Some(key));
                }
            }
        }

        picks.into_vec()
    }

    /// Cart up-sell suggestions: co-occurrence entries for every product in
    /// the cart, then gap-fill for missing complementary categories (a main
    /// dish with no drink, a main dish with no side, two or more lines with
    /// no dessert). Products already in the cart are never returned.
    pub fn for_cart(
        &self,
        catalog: &Catalog<'_>,
        lines: &[CartLine<'_>],
        limit: usize,
    ) -> Vec<ProductKey> {
        let in_cart = cart_product_keys(catalog, lines);
        let cart_roles = cart_category_roles(catalog, lines);
        let mut picks = Picks::with_exclusions(limit, in_cart);

        for line in lines {
            for suggested in self.suggestions_for(&line.product().id) {
                picks.push_available(catalog, suggested, None);
            }
        }

        let has_main = cart_roles.contains(&CategoryRole::Main);

        if has_main && !cart_roles.contains(&CategoryRole::Drink) {
            fill_from_role(catalog, CategoryRole::Drink, GAP_FILL_PER_CATEGORY, &mut picks);
        }

        if has_main && !cart_roles.contains(&CategoryRole::Side) {
            fill_from_role(catalog, CategoryRole::Side, GAP_FILL_PER_CATEGORY, &mut picks);
        }

        if lines.len() >= 2 && !cart_roles.contains(&CategoryRole::Dessert) {
            fill_from_role(catalog, CategoryRole::Dessert, limit, &mut picks);
        }

        picks.into_vec()
    }

    /// Final up-sell before payment: products from dessert and drink
    /// categories entirely absent from the cart's category set.
    pub fn last_chance(
        &self,
        catalog: &Catalog<'_>,
        lines: &[CartLine<'_>],
        limit: usize,
    ) -> Vec<ProductKey> {
        let in_cart = cart_product_keys(catalog, lines);
        let cart_categories: FxHashSet<&str> = lines
            .iter()
            .map(|line| line.product().category_id.as_str())
            .collect();

        let mut picks = Picks::with_exclusions(limit, in_cart);

        for category in catalog.categories() {
            let last_chance_role =
                matches!(category.role, CategoryRole::Dessert | CategoryRole::Drink);

            if !last_chance_role || cart_categories.contains(category.id.as_str()) {
                continue;
            }

            for (candidate, _) in catalog.products_in_category(&category.id) {
                picks.push_available(catalog, candidate, None);
            }
        }

        picks.into_vec()
    }

    fn suggestions_for(&self, key: &str) -> impl Iterator<Item = ProductKey> {
        self.co_occurrence.get(key).into_iter().flatten().copied()
    }
}

/// Ordered, deduplicated pick list with a hard size limit.
#[derive(Debug)]
struct Picks {
    out: Vec<ProductKey>,
    seen: FxHashSet<ProductKey>,
    limit: usize,
}

impl Picks {
    fn new(limit: usize) -> Self {
        Self::with_exclusions(limit, FxHashSet::default())
    }

    /// Keys in `excluded` are treated as already seen and never picked.
    fn with_exclusions(limit: usize, excluded: FxHashSet<ProductKey>) -> Self {
        Picks {
            out: Vec::new(),
            seen: excluded,
            limit,
        }
    }

    /// Adds a candidate if it is available, not excluded, not a duplicate
    /// and the limit leaves room. Returns whether it was added.
    fn push_available(
        &mut self,
        catalog: &Catalog<'_>,
        candidate: ProductKey,
        viewing: Option<ProductKey>,
    ) -> bool {
        if self.out.len() == self.limit {
            return false;
        }

        if viewing == Some(candidate) {
            return false;
        }

        let available = catalog
            .product(candidate)
            .is_some_and(|product| product.is_available);

        if !available || !self.seen.insert(candidate) {
            return false;
        }

        self.out.push(candidate);

        true
    }

    fn into_vec(self) -> Vec<ProductKey> {
        self.out
    }
}

fn cart_product_keys(catalog: &Catalog<'_>, lines: &[CartLine<'_>]) -> FxHashSet<ProductKey> {
    lines
        .iter()
        .filter_map(|line| catalog.key_of(&line.product().id))
        .collect()
}

fn cart_category_roles(catalog: &Catalog<'_>, lines: &[CartLine<'_>]) -> FxHashSet<CategoryRole> {
    lines
        .iter()
        .filter_map(|line| catalog.category(&line.product().category_id))
        .map(|category| category.role)
        .collect()
}

fn fill_from_role(
    catalog: &Catalog<'_>,
    role: CategoryRole,
    cap: usize,
    picks: &mut Picks,
) {
    let mut added = 0;

    for category in catalog.categories() {
        if category.role != role {
            continue;
        }

        for (candidate, _) in catalog.products_in_category(&category.id) {
            if added == cap {
                return;
            }

            if picks.push_available(catalog, candidate, None) {
                added += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::{Money, iso::MAD};
    use testresult::TestResult;

    use crate::{
        cart::Cart,
        catalog::{Category, Product},
        orders::OrderType,
    };

    use super::*;

    fn category(id: &str, role: CategoryRole) -> Category {
        Category {
            id: id.to_string(),
            name: id.to_string(),
            icon: String::new(),
            image: None,
            role,
        }
    }

    fn product(id: &str, category_id: &str, available: bool) -> Product<'static> {
        Product {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            price: Money::from_minor(1000, MAD),
            image: None,
            category_id: category_id.to_string(),
            ingredients: Vec::new(),
            extras: Vec::new(),
            is_available: available,
            is_promo: false,
            promo_price: None,
        }
    }

    fn test_catalog() -> Result<Catalog<'static>, crate::catalog::CatalogError> {
        Catalog::new(
            vec![
                category("burgers", CategoryRole::Main),
                category("sides", CategoryRole::Side),
                category("drinks", CategoryRole::Drink),
                category("desserts", CategoryRole::Dessert),
            ],
            vec![
                product("burger", "burgers", true),
                product("fries", "sides", true),
                product("onion-rings", "sides", false),
                product("coca-cola", "drinks", true),
                product("sprite", "drinks", true),
                product("sundae", "desserts", true),
                product("brownie", "desserts", true),
            ],
            Vec::new(),
            MAD,
        )
    }

    fn test_rules() -> RecommendationRules {
        RecommendationRules {
            co_occurrence: vec![
                CoOccurrenceRule {
                    key: "burger".to_string(),
                    suggests: vec!["fries".to_string(), "coca-cola".to_string()],
                },
                CoOccurrenceRule {
                    key: "burgers".to_string(),
                    suggests: vec!["sprite".to_string()],
                },
                CoOccurrenceRule {
                    key: "fries".to_string(),
                    suggests: vec!["coca-cola".to_string()],
                },
            ],
            category_pairings: vec![CategoryPairing {
                category: "burgers".to_string(),
                pairs_with: vec!["sides".to_string(), "drinks".to_string()],
            }],
        }
    }

    fn ids(catalog: &Catalog<'_>, keys: &[ProductKey]) -> Vec<String> {
        keys.iter()
            .filter_map(|key| catalog.product(*key).map(|product| product.id.clone()))
            .collect()
    }

    #[test]
    fn for_product_unions_tables_in_authored_order() -> TestResult {
        let catalog = test_catalog()?;
        let (recommender, unresolved) = test_rules().resolve(&catalog);

        assert!(unresolved.is_empty(), "unexpected unresolved references");

        let burger = catalog.key_of("burger").ok_or("missing burger")?;
        let recs = recommender.for_product(&catalog, burger, 6);

        // Direct entries, then the category entry; the paired-category draws
        // only rediscover products already picked or unavailable ones.
        assert_eq!(ids(&catalog, &recs), vec!["fries", "coca-cola", "sprite"]);

        Ok(())
    }

    #[test]
    fn for_product_respects_the_limit() -> TestResult {
        let catalog = test_catalog()?;
        let (recommender, _) = test_rules().resolve(&catalog);

        let burger = catalog.key_of("burger").ok_or("missing burger")?;
        let recs = recommender.for_product(&catalog, burger, 2);

        assert_eq!(ids(&catalog, &recs), vec!["fries", "coca-cola"]);

        Ok(())
    }

    #[test]
    fn for_product_never_returns_the_queried_product_or_unavailable() -> TestResult {
        let catalog = test_catalog()?;
        let (recommender, _) = test_rules().resolve(&catalog);

        let burger = catalog.key_of("burger").ok_or("missing burger")?;
        let rings = catalog.key_of("onion-rings").ok_or("missing rings")?;

        let recs = recommender.for_product(&catalog, burger, 10);

        assert!(!recs.contains(&burger), "recommended the viewed product");
        assert!(!recs.contains(&rings), "recommended an unavailable product");

        Ok(())
    }

    #[test]
    fn for_cart_excludes_products_already_in_cart() -> TestResult {
        let catalog = test_catalog()?;
        let (recommender, _) = test_rules().resolve(&catalog);

        let mut cart = Cart::new(MAD);
        cart.set_order_type(OrderType::DineIn)?;

        let (_, burger) = catalog.product_by_id("burger").ok_or("missing burger")?;
        let (fries_key, fries) = catalog.product_by_id("fries").ok_or("missing fries")?;

        cart.add_item(burger, &[] as &[&str], &[])?;
        cart.add_item(fries, &[] as &[&str], &[])?;

        let recs = recommender.for_cart(&catalog, cart.lines(), 10);

        assert!(!recs.contains(&fries_key), "recommended an in-cart product");

        Ok(())
    }

    #[test]
    fn for_cart_gap_fills_missing_drink_and_side() -> TestResult {
        let catalog = test_catalog()?;
        let (recommender, _) = test_rules().resolve(&catalog);

        let mut cart = Cart::new(MAD);
        cart.set_order_type(OrderType::DineIn)?;

        let (_, burger) = catalog.product_by_id("burger").ok_or("missing burger")?;
        cart.add_item(burger, &[] as &[&str], &[])?;

        let recs = recommender.for_cart(&catalog, cart.lines(), 10);

        // Co-occurrence first (fries, coca-cola), then the drink gap-fill
        // adds sprite; the side gap-fill finds nothing new (fries is picked,
        // onion-rings is unavailable). One line only, so no dessert fill.
        assert_eq!(ids(&catalog, &recs), vec!["fries", "coca-cola", "sprite"]);

        Ok(())
    }

    #[test]
    fn for_cart_adds_desserts_for_larger_carts() -> TestResult {
        let catalog = test_catalog()?;
        let (recommender, _) = test_rules().resolve(&catalog);

        let mut cart = Cart::new(MAD);
        cart.set_order_type(OrderType::DineIn)?;

        let (_, burger) = catalog.product_by_id("burger").ok_or("missing burger")?;
        let (_, fries) = catalog.product_by_id("fries").ok_or("missing fries")?;

        cart.add_item(burger, &[] as &[&str], &[])?;
        cart.add_item(fries, &[] as &[&str], &[])?;

        let recs = recommender.for_cart(&catalog, cart.lines(), 10);
        let rec_ids = ids(&catalog, &recs);

        assert!(rec_ids.contains(&"sundae".to_string()), "missing dessert fill");
        assert!(rec_ids.contains(&"brownie".to_string()), "missing dessert fill");

        Ok(())
    }

    #[test]
    fn last_chance_offers_only_absent_dessert_and_drink_categories() -> TestResult {
        let catalog = test_catalog()?;
        let (recommender, _) = test_rules().resolve(&catalog);

        let mut cart = Cart::new(MAD);
        cart.set_order_type(OrderType::DineIn)?;

        let (_, burger) = catalog.product_by_id("burger").ok_or("missing burger")?;
        let (_, cola) = catalog.product_by_id("coca-cola").ok_or("missing cola")?;

        cart.add_item(burger, &[] as &[&str], &[])?;
        cart.add_item(cola, &[] as &[&str], &[])?;

        let recs = recommender.last_chance(&catalog, cart.lines(), 5);

        // Drinks are represented in the cart, so only desserts remain.
        assert_eq!(ids(&catalog, &recs), vec!["sundae", "brownie"]);

        Ok(())
    }

    #[test]
    fn last_chance_respects_the_limit() -> TestResult {
        let catalog = test_catalog()?;
        let (recommender, _) = test_rules().resolve(&catalog);

        let mut cart = Cart::new(MAD);
        cart.set_order_type(OrderType::DineIn)?;

        let (_, burger) = catalog.product_by_id("burger").ok_or("missing burger")?;
        cart.add_item(burger, &[] as &[&str], &[])?;

        let recs = recommender.last_chance(&catalog, cart.lines(), 1);

        assert_eq!(recs.len(), 1);

        Ok(())
    }

    #[test]
    fn resolve_reports_unresolved_references() -> TestResult {
        let catalog = test_catalog()?;

        let rules = RecommendationRules {
            co_occurrence: vec![
                CoOccurrenceRule {
                    key: "no-such-key".to_string(),
                    suggests: vec!["fries".to_string()],
                },
                CoOccurrenceRule {
                    key: "burger".to_string(),
                    suggests: vec!["no-such-product".to_string(), "fries".to_string()],
                },
            ],
            category_pairings: vec![CategoryPairing {
                category: "burgers".to_string(),
                pairs_with: vec!["no-such-category".to_string()],
            }],
        };

        let (recommender, unresolved) = rules.resolve(&catalog);

        assert_eq!(
            unresolved,
            vec![
                UnresolvedReference::RuleKey {
                    key: "no-such-key".to_string()
                },
                UnresolvedReference::SuggestedProduct {
                    key: "burger".to_string(),
                    product: "no-such-product".to_string()
                },
                UnresolvedReference::PairedCategory {
                    category: "burgers".to_string(),
                    paired: "no-such-category".to_string()
                },
            ]
        );

        // The resolvable part of the table still works.
        let burger = catalog.key_of("burger").ok_or("missing burger")?;
        let recs = recommender.for_product(&catalog, burger, 4);

        assert_eq!(ids(&catalog, &recs), vec!["fries"]);

        Ok(())
    }
}
