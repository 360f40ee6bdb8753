//! Backend client
//!
//! HTTP client for the kiosk backend: catalog download, cart mirroring and
//! order submission. Every call shares one bounded timeout; failures map to
//! a typed [`ApiError`] the UI can tell apart from business-rule rejections,
//! so it knows when to offer "retry" instead of "fix your input".
//!
//! Wire prices are integer minor units; they are converted to [`Money`] once,
//! when the catalog DTO becomes a validated domain catalog.

use std::time::Duration;

use jiff::Timestamp;
use reqwest::{Client, Response};
use rusty_money::Money;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use borne::{
    cart::CartLine,
    catalog::{Catalog, Category, CategoryRole, Extra, Ingredient, MediaItem, MediaKind, Product},
    fixtures::{FixtureError, parse_currency},
    orders::{OrderDraft, OrderNumber, OrderStatus, OrderType},
};

/// Backend call failures. All transient: the cart is never touched on any of
/// these, and every one of them is retryable.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The call exceeded the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// Connection or protocol failure.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("unexpected response status {status}: {body}")]
    UnexpectedResponse {
        /// HTTP status code
        status: u16,
        /// Response body, for the error banner and the logs
        body: String,
    },
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Transport(error)
        }
    }
}

/// Category as served by the backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDto {
    /// Category id
    pub id: String,

    /// Display name
    pub name: String,

    /// Sidebar icon
    pub icon: String,

    /// Optional banner image
    #[serde(default)]
    pub image: Option<String>,

    /// Menu role, defaulting to no role
    #[serde(default)]
    pub role: CategoryRole,
}

/// Ingredient as served by the backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientDto {
    /// Ingredient id
    pub id: String,

    /// Display name
    pub name: String,

    /// Optional image
    #[serde(default)]
    pub image: Option<String>,

    /// Whether the customer may exclude it
    pub removable: bool,
}

/// Extra as served by the backend. Price in minor units.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraDto {
    /// Extra id
    pub id: String,

    /// Display name
    pub name: String,

    /// Price in minor units
    pub price: i64,

    /// Optional image
    #[serde(default)]
    pub image: Option<String>,
}

/// Product as served by the backend. Prices in minor units.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    /// Product id
    pub id: String,

    /// Display name
    pub name: String,

    /// Menu description
    #[serde(default)]
    pub description: String,

    /// Base price in minor units
    pub price: i64,

    /// Optional image
    #[serde(default)]
    pub image: Option<String>,

    /// Owning category id
    pub category_id: String,

    /// Ingredients in display order
    #[serde(default)]
    pub ingredients: Vec<IngredientDto>,

    /// Optional extras
    #[serde(default)]
    pub extras: Vec<ExtraDto>,

    /// Availability flag
    pub is_available: bool,

    /// Promo flag
    #[serde(default)]
    pub is_promo: bool,

    /// Promo price in minor units
    #[serde(default)]
    pub promo_price: Option<i64>,
}

/// Welcome-screen media as served by the backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaDto {
    /// Media id
    pub id: String,

    /// Image or video
    pub kind: MediaKind,

    /// Source URL
    pub url: String,

    /// Optional caption
    #[serde(default)]
    pub title: Option<String>,

    /// Display duration in milliseconds
    #[serde(default)]
    pub duration_ms: Option<u64>,

    /// Active flag
    pub is_active: bool,
}

/// The full catalog payload the backend serves once per session.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDto {
    /// Currency code all prices use
    pub currency: String,

    /// Categories in display order
    pub categories: Vec<CategoryDto>,

    /// Products in menu order
    pub products: Vec<ProductDto>,

    /// Welcome-screen media
    #[serde(default)]
    pub welcome_media: Vec<MediaDto>,
}

impl CatalogDto {
    /// Converts the wire payload into a validated domain catalog.
    ///
    /// # Errors
    ///
    /// Returns a [`FixtureError`] for an unknown currency code or a payload
    /// that fails catalog validation.
    pub fn into_catalog(self) -> Result<Catalog<'static>, FixtureError> {
        let currency = parse_currency(&self.currency)?;

        let categories = self
            .categories
            .into_iter()
            .map(|category| Category {
                id: category.id,
                name: category.name,
                icon: category.icon,
                image: category.image,
                role: category.role,
            })
            .collect();

        let products = self
            .products
            .into_iter()
            .map(|product| {
                let ingredients = product
                    .ingredients
                    .into_iter()
                    .map(|ingredient| Ingredient {
                        id: ingredient.id,
                        name: ingredient.name,
                        image: ingredient.image,
                        removable: ingredient.removable,
                    })
                    .collect();

                let extras = product
                    .extras
                    .into_iter()
                    .map(|extra| Extra {
                        id: extra.id,
                        name: extra.name,
                        price: Money::from_minor(extra.price, currency),
                        image: extra.image,
                    })
                    .collect();

                Product {
                    id: product.id,
                    name: product.name,
                    description: product.description,
                    price: Money::from_minor(product.price, currency),
                    image: product.image,
                    category_id: product.category_id,
                    ingredients,
                    extras,
                    is_available: product.is_available,
                    is_promo: product.is_promo,
                    promo_price: product
                        .promo_price
                        .map(|minor| Money::from_minor(minor, currency)),
                }
            })
            .collect();

        let welcome_media = self
            .welcome_media
            .into_iter()
            .map(|media| MediaItem {
                id: media.id,
                kind: media.kind,
                url: media.url,
                title: media.title,
                duration_ms: media.duration_ms,
                is_active: media.is_active,
            })
            .collect();

        Ok(Catalog::new(categories, products, welcome_media, currency)?)
    }
}

/// One cart line as submitted to the backend cart mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemDto {
    /// Product id
    pub product_id: String,

    /// Quantity ordered
    pub quantity: u32,

    /// Excluded ingredient ids
    pub excluded_ingredients: Vec<String>,

    /// Selected extra ids
    pub selected_extras: Vec<String>,
}

impl From<&CartLine<'_>> for CartItemDto {
    fn from(line: &CartLine<'_>) -> Self {
        CartItemDto {
            product_id: line.product().id.clone(),
            quantity: line.quantity(),
            excluded_ingredients: line.excluded_ingredients().to_vec(),
            selected_extras: line.selected_extras().to_vec(),
        }
    }
}

/// The order submission payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    /// Zero-padded display number
    pub order_number: String,

    /// Dine-in or takeaway
    pub order_type: OrderType,

    /// Ordered items
    pub items: Vec<CartItemDto>,

    /// Total in minor units
    pub total: i64,

    /// Order creation time
    pub created_at: Timestamp,
}

impl OrderPayload {
    /// Builds the submission payload from a checkout snapshot and the
    /// pre-drawn order number.
    #[must_use]
    pub fn from_draft(draft: &OrderDraft<'_>, number: OrderNumber, created_at: Timestamp) -> Self {
        OrderPayload {
            order_number: number.to_string(),
            order_type: draft.order_type(),
            items: draft.lines().iter().map(CartItemDto::from).collect(),
            total: draft.total().to_minor_units(),
            created_at,
        }
    }
}

/// Backend acknowledgement of a submitted order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAck {
    /// Backend-side order id
    pub id: String,

    /// Status the backend assigned, when it reports one
    #[serde(default)]
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartCreated {
    cart_id: String,
}

/// HTTP client for the kiosk backend.
#[derive(Debug, Clone)]
pub struct BorneClient {
    base_url: String,
    http: Client,
}

impl BorneClient {
    /// Creates a client with the given base URL and per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the underlying HTTP client cannot be
    /// built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(BorneClient {
            base_url: base_url.into(),
            http,
        })
    }

    /// Checks the backend health endpoint.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on HTTP failure.
    pub async fn health(&self) -> Result<(), ApiError> {
        let response = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;

        check_status(response).await?;

        Ok(())
    }

    /// Downloads the catalog served to this kiosk.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on HTTP failure or an undecodable body.
    pub async fn fetch_catalog(&self) -> Result<CatalogDto, ApiError> {
        let response = self
            .http
            .get(format!("{}/kiosk/catalog", self.base_url))
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }

    /// Opens a backend-side cart mirror.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on HTTP failure or an undecodable body.
    pub async fn create_cart(&self) -> Result<String, ApiError> {
        let response = self
            .http
            .post(format!("{}/kiosk/cart", self.base_url))
            .json(&serde_json::json!({}))
            .send()
            .await?;

        let created: CartCreated = check_status(response).await?.json().await?;

        Ok(created.cart_id)
    }

    /// Mirrors one added line into the backend cart.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on HTTP failure.
    pub async fn add_to_cart(&self, cart_id: &str, item: &CartItemDto) -> Result<(), ApiError> {
        let response = self
            .http
            .post(format!("{}/kiosk/cart/{cart_id}/items", self.base_url))
            .json(item)
            .send()
            .await?;

        check_status(response).await?;

        Ok(())
    }

    /// Removes a product from the backend cart mirror.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on HTTP failure.
    pub async fn remove_from_cart(&self, cart_id: &str, product_id: &str) -> Result<(), ApiError> {
        let response = self
            .http
            .delete(format!(
                "{}/kiosk/cart/{cart_id}/items/{product_id}",
                self.base_url
            ))
            .send()
            .await?;

        check_status(response).await?;

        Ok(())
    }

    /// Submits a finalized order.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on HTTP failure or an undecodable body.
    pub async fn create_order(&self, payload: &OrderPayload) -> Result<OrderAck, ApiError> {
        let response = self
            .http
            .post(format!("{}/kiosk/orders", self.base_url))
            .json(payload)
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();

    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().await.unwrap_or_default();

        Err(ApiError::UnexpectedResponse {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::MAD;
    use testresult::TestResult;

    use borne::pricing;

    use super::*;

    fn catalog_dto() -> CatalogDto {
        CatalogDto {
            currency: "MAD".to_string(),
            categories: vec![CategoryDto {
                id: "burgers".to_string(),
                name: "Burgers".to_string(),
                icon: "B".to_string(),
                image: None,
                role: CategoryRole::Main,
            }],
            products: vec![ProductDto {
                id: "burger-classic".to_string(),
                name: "Burger Classic".to_string(),
                description: String::new(),
                price: 5500,
                image: None,
                category_id: "burgers".to_string(),
                ingredients: vec![IngredientDto {
                    id: "onion".to_string(),
                    name: "Oignon".to_string(),
                    image: None,
                    removable: true,
                }],
                extras: vec![ExtraDto {
                    id: "extra-cheese".to_string(),
                    name: "Extra Fromage".to_string(),
                    price: 800,
                    image: None,
                }],
                is_available: true,
                is_promo: true,
                promo_price: Some(4500),
            }],
            welcome_media: Vec::new(),
        }
    }

    #[test]
    fn catalog_dto_converts_minor_units_into_money() -> TestResult {
        let catalog = catalog_dto().into_catalog()?;

        let (_, burger) = catalog
            .product_by_id("burger-classic")
            .ok_or("missing product")?;

        assert_eq!(burger.price, Money::from_minor(5500, MAD));
        assert_eq!(
            pricing::effective_unit_price(burger),
            Money::from_minor(4500, MAD)
        );

        Ok(())
    }

    #[test]
    fn catalog_dto_rejects_unknown_currency() {
        let mut dto = catalog_dto();

        dto.currency = "XXX".to_string();

        assert!(matches!(
            dto.into_catalog(),
            Err(FixtureError::UnknownCurrency(code)) if code == "XXX"
        ));
    }

    #[test]
    fn catalog_dto_is_parsed_from_camel_case_json() -> TestResult {
        let json = r#"{
            "currency": "MAD",
            "categories": [
                { "id": "sides", "name": "Accompagnements", "icon": "F", "role": "side" }
            ],
            "products": [
                {
                    "id": "fries",
                    "name": "Frites",
                    "price": 1800,
                    "categoryId": "sides",
                    "isAvailable": true
                }
            ]
        }"#;

        let dto: CatalogDto = serde_json::from_str(json)?;
        let catalog = dto.into_catalog()?;

        assert_eq!(catalog.len(), 1);
        assert!(catalog.product_by_id("fries").is_some());

        Ok(())
    }

    #[test]
    fn order_payload_serializes_the_wire_shape() -> TestResult {
        let catalog = catalog_dto().into_catalog()?;
        let (_, burger) = catalog
            .product_by_id("burger-classic")
            .ok_or("missing product")?;

        let mut cart = borne::cart::Cart::new(MAD);

        cart.set_order_type(OrderType::Takeaway)?;
        cart.add_item(burger, &["onion"], &["extra-cheese"])?;

        let draft = cart.checkout()?;
        let payload = OrderPayload::from_draft(
            &draft,
            OrderNumber::new(42)?,
            Timestamp::UNIX_EPOCH,
        );

        let json = serde_json::to_value(&payload)?;

        assert_eq!(json["orderNumber"], "042");
        assert_eq!(json["orderType"], "takeaway");
        assert_eq!(json["total"], 5300);
        assert_eq!(json["items"][0]["productId"], "burger-classic");
        assert_eq!(json["items"][0]["excludedIngredients"][0], "onion");

        Ok(())
    }
}
