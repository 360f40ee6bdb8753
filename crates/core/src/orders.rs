//! Orders
//!
//! Checkout snapshots, finalized orders, and the payloads the kiosk hands to
//! its collaborators: the printable receipt and the scannable tracking
//! record. Orders are immutable once created; persistence is the backend's
//! concern.

use std::fmt;

use jiff::Timestamp;
use rand::Rng;
use rusty_money::{Money, iso::Currency};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{cart::CartLine, pricing};

/// Where the customer eats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderType {
    /// Eat in the restaurant
    DineIn,

    /// Take the order away
    Takeaway,
}

impl OrderType {
    /// Stable wire identifier for this order type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OrderType::DineIn => "dine-in",
            OrderType::Takeaway => "takeaway",
        }
    }
}

/// Kitchen-side lifecycle of an order, as shown to the tracking viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Submitted, not yet paid
    Created,

    /// Paid at the kiosk or flagged for counter payment
    Paid,

    /// Queued in the kitchen
    Preparing,

    /// Ready for pickup
    Ready,

    /// Picked up
    Completed,
}

/// An order number outside the displayable range.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("order number {0} is outside the displayable 000-999 range")]
pub struct OrderNumberOutOfRange(pub u16);

/// Short numeric order identifier, displayed zero-padded to three digits and
/// called out when the order is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderNumber(u16);

impl OrderNumber {
    /// Largest displayable order number.
    pub const MAX: u16 = 999;

    /// Creates an order number.
    ///
    /// # Errors
    ///
    /// Returns [`OrderNumberOutOfRange`] when `value` exceeds [`Self::MAX`].
    pub fn new(value: u16) -> Result<Self, OrderNumberOutOfRange> {
        if value > Self::MAX {
            return Err(OrderNumberOutOfRange(value));
        }

        Ok(OrderNumber(value))
    }

    /// Draws a random order number in the displayable range.
    #[must_use]
    pub fn generate() -> Self {
        OrderNumber(rand::thread_rng().gen_range(0..=Self::MAX))
    }

    /// Raw numeric value.
    #[must_use]
    pub fn value(self) -> u16 {
        self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

/// Immutable checkout snapshot: the lines and total frozen at the moment the
/// customer moved to payment. Later cart edits cannot touch it.
#[derive(Debug, Clone)]
pub struct OrderDraft<'a> {
    order_type: OrderType,
    lines: Vec<CartLine<'a>>,
    total: Money<'a, Currency>,
}

impl<'a> OrderDraft<'a> {
    /// Creates a draft from already-frozen cart data.
    #[must_use]
    pub fn new(order_type: OrderType, lines: Vec<CartLine<'a>>, total: Money<'a, Currency>) -> Self {
        OrderDraft {
            order_type,
            lines,
            total,
        }
    }

    /// Order type at checkout time.
    #[must_use]
    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    /// Snapshotted lines.
    pub fn lines(&self) -> &[CartLine<'a>] {
        &self.lines
    }

    /// Total at checkout time.
    #[must_use]
    pub fn total(&self) -> Money<'a, Currency> {
        self.total
    }
}

/// A finalized order. Created at payment completion and immutable thereafter.
#[derive(Debug, Clone)]
pub struct Order<'a> {
    number: OrderNumber,
    order_type: OrderType,
    lines: Vec<CartLine<'a>>,
    total: Money<'a, Currency>,
    status: OrderStatus,
    created_at: Timestamp,
}

impl<'a> Order<'a> {
    /// Assembles a finalized order.
    #[must_use]
    pub fn new(
        number: OrderNumber,
        order_type: OrderType,
        lines: Vec<CartLine<'a>>,
        total: Money<'a, Currency>,
        status: OrderStatus,
        created_at: Timestamp,
    ) -> Self {
        Order {
            number,
            order_type,
            lines,
            total,
            status,
            created_at,
        }
    }

    /// The display number called out when the order is ready.
    #[must_use]
    pub fn number(&self) -> OrderNumber {
        self.number
    }

    /// Dine-in or takeaway.
    #[must_use]
    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    /// The ordered lines.
    pub fn lines(&self) -> &[CartLine<'a>] {
        &self.lines
    }

    /// Total paid.
    #[must_use]
    pub fn total(&self) -> Money<'a, Currency> {
        self.total
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// The scannable tracking record for this order.
    #[must_use]
    pub fn tracking(&self) -> TrackingPayload {
        TrackingPayload {
            order_number: self.number.to_string(),
            timestamp: self.created_at,
            status: self.status,
        }
    }

    /// Builds the structured payload the receipt printer collaborator
    /// renders. Ingredient and extra names are resolved from the product
    /// snapshots the lines carry; ids that no longer resolve are skipped.
    #[must_use]
    pub fn receipt(&self) -> ReceiptPayload<'a> {
        let lines = self
            .lines
            .iter()
            .map(|line| {
                let product = line.product();

                let without = line
                    .excluded_ingredients()
                    .iter()
                    .filter_map(|id| {
                        product
                            .ingredients
                            .iter()
                            .find(|ingredient| &ingredient.id == id)
                    })
                    .map(|ingredient| ingredient.name.clone())
                    .collect();

                let extras = line
                    .selected_extras()
                    .iter()
                    .filter_map(|id| product.extra(id))
                    .map(|extra| extra.name.clone())
                    .collect();

                ReceiptLine {
                    name: product.name.clone(),
                    quantity: line.quantity(),
                    line_total: pricing::line_total(line),
                    without,
                    extras,
                }
            })
            .collect();

        ReceiptPayload {
            order_number: self.number,
            order_type: self.order_type,
            lines,
            total: self.total,
            created_at: self.created_at,
            tracking: self.tracking(),
        }
    }
}

/// The record encoded into the scannable tracking code. Consumed by the
/// external tracking viewer; the kiosk does not interpret it further.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingPayload {
    /// Zero-padded display number
    pub order_number: String,

    /// Order creation time
    pub timestamp: Timestamp,

    /// Status at encode time
    pub status: OrderStatus,
}

/// One printable line of the receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptLine<'a> {
    /// Product display name
    pub name: String,

    /// Quantity ordered
    pub quantity: u32,

    /// Line total including extras
    pub line_total: Money<'a, Currency>,

    /// Display names of excluded ingredients
    pub without: Vec<String>,

    /// Display names of selected extras
    pub extras: Vec<String>,
}

/// Structured payload handed to the receipt-printing collaborator. The
/// physical ticket layout is not this crate's concern.
#[derive(Debug, Clone)]
pub struct ReceiptPayload<'a> {
    /// Display number
    pub order_number: OrderNumber,

    /// Dine-in or takeaway
    pub order_type: OrderType,

    /// Printable lines in cart order
    pub lines: Vec<ReceiptLine<'a>>,

    /// Total paid
    pub total: Money<'a, Currency>,

    /// Order creation time
    pub created_at: Timestamp,

    /// Tracking record for the scannable code
    pub tracking: TrackingPayload,
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::MAD;
    use testresult::TestResult;

    use crate::{
        cart::Cart,
        catalog::{Extra, Ingredient, Product},
    };

    use super::*;

    fn burger() -> Product<'static> {
        Product {
            id: "burger-classic".to_string(),
            name: "Burger Classic".to_string(),
            description: String::new(),
            price: Money::from_minor(5500, MAD),
            image: None,
            category_id: "burgers".to_string(),
            ingredients: vec![Ingredient {
                id: "onion".to_string(),
                name: "Oignon".to_string(),
                image: None,
                removable: true,
            }],
            extras: vec![Extra {
                id: "extra-cheese".to_string(),
                name: "Extra Fromage".to_string(),
                price: Money::from_minor(800, MAD),
                image: None,
            }],
            is_available: true,
            is_promo: true,
            promo_price: Some(Money::from_minor(4500, MAD)),
        }
    }

    fn confirmed_order() -> Result<Order<'static>, Box<dyn std::error::Error>> {
        let mut cart = Cart::new(MAD);

        cart.set_order_type(OrderType::Takeaway)?;
        cart.add_item(&burger(), &["onion"], &["extra-cheese"])?;
        cart.checkout()?;

        Ok(cart.confirm(OrderNumber::new(7)?, Timestamp::UNIX_EPOCH)?)
    }

    #[test]
    fn order_number_displays_zero_padded() -> TestResult {
        assert_eq!(OrderNumber::new(7)?.to_string(), "007");
        assert_eq!(OrderNumber::new(42)?.to_string(), "042");
        assert_eq!(OrderNumber::new(999)?.to_string(), "999");

        Ok(())
    }

    #[test]
    fn order_number_rejects_four_digits() {
        assert_eq!(OrderNumber::new(1000), Err(OrderNumberOutOfRange(1000)));
    }

    #[test]
    fn generated_order_numbers_stay_in_range() {
        for _ in 0..100 {
            let number = OrderNumber::generate();

            assert!(number.value() <= OrderNumber::MAX, "number out of range");
            assert_eq!(number.to_string().len(), 3);
        }
    }

    #[test]
    fn tracking_payload_serializes_to_the_wire_shape() -> TestResult {
        let order = confirmed_order()?;
        let tracking = order.tracking();

        assert_eq!(tracking.order_number, "007");
        assert_eq!(tracking.status, OrderStatus::Preparing);

        Ok(())
    }

    #[test]
    fn receipt_resolves_ingredient_and_extra_names() -> TestResult {
        let order = confirmed_order()?;
        let receipt = order.receipt();

        assert_eq!(receipt.order_number.to_string(), "007");
        assert_eq!(receipt.total, Money::from_minor(5300, MAD));

        let line = receipt.lines.first().ok_or("missing receipt line")?;

        assert_eq!(line.name, "Burger Classic");
        assert_eq!(line.quantity, 1);
        assert_eq!(line.without, vec!["Oignon".to_string()]);
        assert_eq!(line.extras, vec!["Extra Fromage".to_string()]);
        assert_eq!(line.line_total, Money::from_minor(5300, MAD));

        Ok(())
    }

    #[test]
    fn order_type_wire_identifiers_are_stable() {
        assert_eq!(OrderType::DineIn.as_str(), "dine-in");
        assert_eq!(OrderType::Takeaway.as_str(), "takeaway");
    }
}
