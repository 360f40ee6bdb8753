//! Cart
//!
//! The cart state machine. All cart mutation goes through the transitions
//! defined here; totals are never cached and are always recomputed from the
//! lines by the pricing engine, so they cannot desync.

use jiff::Timestamp;
use rusty_money::iso::Currency;
use smallvec::SmallVec;
use thiserror::Error;

use crate::{
    catalog::Product,
    orders::{Order, OrderDraft, OrderNumber, OrderStatus, OrderType},
    pricing,
};

/// Identifier of one cart line. Unique per addition: adding the same product
/// twice creates two distinct lines with two distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineId(u64);

/// One cart entry: a product configuration and a quantity.
///
/// The product is snapshotted by value at add time, so a later catalog swap
/// cannot change what the customer already priced and agreed to.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine<'a> {
    id: LineId,
    product: Product<'a>,
    quantity: u32,
    excluded_ingredients: SmallVec<[String; 4]>,
    selected_extras: SmallVec<[String; 4]>,
}

impl<'a> CartLine<'a> {
    /// Line id.
    #[must_use]
    pub fn id(&self) -> LineId {
        self.id
    }

    /// The product snapshot this line was created from.
    pub fn product(&self) -> &Product<'a> {
        &self.product
    }

    /// Current quantity. Always positive while the line exists.
    #[must_use]
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Ids of ingredients the customer excluded.
    pub fn excluded_ingredients(&self) -> &[String] {
        &self.excluded_ingredients
    }

    /// Ids of extras the customer selected.
    pub fn selected_extras(&self) -> &[String] {
        &self.selected_extras
    }
}

/// Lifecycle phase of the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartPhase {
    /// No order type and no lines
    Empty,

    /// Order type chosen; lines may be added and edited
    Building,

    /// A checkout snapshot is in flight; lines are frozen
    Checkout,

    /// The order was finalized and the lines cleared
    Confirmed,
}

/// Checkout was attempted on a cart with no lines. User-correctable: the UI
/// surfaces it inline and the cart is left unchanged.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot check out an empty cart")]
pub struct CartEmptyError;

/// A mutation was attempted in a phase that does not allow it. The flow
/// controller makes these calls unreachable in the normal screen sequence.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartStateError {
    /// An item operation before any order type was chosen.
    #[error("no order type selected yet")]
    NoOrderType,

    /// A mutation while the cart is frozen in checkout or already confirmed.
    #[error("cart is locked in the {0:?} phase")]
    Locked(CartPhase),
}

/// The cart owned by one kiosk session.
#[derive(Debug)]
pub struct Cart<'a> {
    phase: CartPhase,
    order_type: Option<OrderType>,
    lines: Vec<CartLine<'a>>,
    next_line: u64,
    currency: &'static Currency,
}

impl<'a> Cart<'a> {
    /// Creates an empty cart in the given currency.
    #[must_use]
    pub fn new(currency: &'static Currency) -> Self {
        Cart {
            phase: CartPhase::Empty,
            order_type: None,
            lines: Vec::new(),
            next_line: 0,
            currency,
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> CartPhase {
        self.phase
    }

    /// Chosen order type, if any.
    #[must_use]
    pub fn order_type(&self) -> Option<OrderType> {
        self.order_type
    }

    /// Lines in insertion order.
    pub fn lines(&self) -> &[CartLine<'a>] {
        &self.lines
    }

    /// Looks up a line by id.
    pub fn line(&self, id: LineId) -> Option<&CartLine<'a>> {
        self.lines.iter().find(|line| line.id == id)
    }

    /// Number of lines.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Total number of articles across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(CartLine::quantity).sum()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Cart currency.
    #[must_use]
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// Chooses dine-in or takeaway. Valid while the cart is open; existing
    /// lines are kept.
    ///
    /// # Errors
    ///
    /// Returns [`CartStateError::Locked`] from `Checkout` or `Confirmed`.
    pub fn set_order_type(&mut self, order_type: OrderType) -> Result<(), CartStateError> {
        self.ensure_open()?;

        self.order_type = Some(order_type);
        self.phase = CartPhase::Building;

        Ok(())
    }

    /// Appends a new line for `product` with quantity 1.
    ///
    /// Excluded ingredient ids are clamped to ingredients that exist on the
    /// product and are removable; selected extra ids are clamped to extras
    /// the product actually offers. Unknown ids are dropped silently, never
    /// rejected: a stale menu reference must not block the sale.
    ///
    /// # Errors
    ///
    /// Returns [`CartStateError::NoOrderType`] before an order type was
    /// chosen, or [`CartStateError::Locked`] from `Checkout` / `Confirmed`.
    pub fn add_item<S: AsRef<str>>(
        &mut self,
        product: &Product<'a>,
        excluded_ingredients: &[S],
        selected_extras: &[S],
    ) -> Result<LineId, CartStateError> {
        self.ensure_open()?;

        if self.order_type.is_none() {
            return Err(CartStateError::NoOrderType);
        }

        let mut excluded: SmallVec<[String; 4]> = SmallVec::new();

        for id in excluded_ingredients {
            let id = id.as_ref();

            if product.removable_ingredient(id).is_some() && !excluded.iter().any(|e| e == id) {
                excluded.push(id.to_string());
            }
        }

        let mut extras: SmallVec<[String; 4]> = SmallVec::new();

        for id in selected_extras {
            let id = id.as_ref();

            if product.extra(id).is_some() && !extras.iter().any(|e| e == id) {
                extras.push(id.to_string());
            }
        }

        self.next_line += 1;

        let id = LineId(self.next_line);

        self.lines.push(CartLine {
            id,
            product: product.clone(),
            quantity: 1,
            excluded_ingredients: excluded,
            selected_extras: extras,
        });

        Ok(id)
    }

    /// Sets the quantity of a line. A quantity of zero removes the line. An
    /// unknown id is a no-op, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`CartStateError::Locked`] from `Checkout` or `Confirmed`.
    pub fn update_quantity(&mut self, id: LineId, quantity: u32) -> Result<(), CartStateError> {
        self.ensure_open()?;

        if quantity == 0 {
            self.lines.retain(|line| line.id != id);
        } else if let Some(line) = self.lines.iter_mut().find(|line| line.id == id) {
            line.quantity = quantity;
        }

        Ok(())
    }

    /// Removes a line. An unknown id is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CartStateError::Locked`] from `Checkout` or `Confirmed`.
    pub fn remove_item(&mut self, id: LineId) -> Result<(), CartStateError> {
        self.ensure_open()?;

        self.lines.retain(|line| line.id != id);

        Ok(())
    }

    /// Resets to `Empty`: lines gone, order type cleared. Valid from any
    /// phase; used for explicit cancel, the inactivity timeout, and the
    /// post-confirmation reset.
    pub fn clear(&mut self) {
        self.phase = CartPhase::Empty;
        self.order_type = None;
        self.lines.clear();
    }

    /// Freezes the cart and produces an immutable order snapshot: a deep copy
    /// of the lines plus the total computed right now. Later cart changes
    /// cannot affect the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CartEmptyError`] when the cart has no lines; the cart is
    /// left unchanged.
    pub fn checkout(&mut self) -> Result<OrderDraft<'a>, CartEmptyError> {
        let Some(order_type) = self.order_type else {
            return Err(CartEmptyError);
        };

        if self.lines.is_empty() {
            return Err(CartEmptyError);
        }

        let draft = OrderDraft::new(order_type, self.lines.clone(), pricing::cart_total(self));

        self.phase = CartPhase::Checkout;

        Ok(draft)
    }

    /// Unfreezes a cart that was in checkout, returning it to `Building` so
    /// the customer can keep editing. Backs the payment-screen back
    /// navigation.
    ///
    /// # Errors
    ///
    /// Returns [`CartStateError::Locked`] from `Confirmed`.
    pub fn reopen(&mut self) -> Result<(), CartStateError> {
        match self.phase {
            CartPhase::Confirmed => Err(CartStateError::Locked(self.phase)),
            CartPhase::Checkout => {
                self.phase = CartPhase::Building;

                Ok(())
            }
            CartPhase::Empty | CartPhase::Building => Ok(()),
        }
    }

    /// Finalizes the order from a cart frozen in `Checkout`: the lines move
    /// into an immutable [`Order`], the cart is cleared and enters
    /// `Confirmed`.
    ///
    /// # Errors
    ///
    /// Returns [`CartStateError::Locked`] from any phase other than
    /// `Checkout`.
    pub fn confirm(
        &mut self,
        number: OrderNumber,
        created_at: Timestamp,
    ) -> Result<Order<'a>, CartStateError> {
        if self.phase != CartPhase::Checkout {
            return Err(CartStateError::Locked(self.phase));
        }

        let Some(order_type) = self.order_type else {
            return Err(CartStateError::NoOrderType);
        };

        let total = pricing::cart_total(self);
        let lines = std::mem::take(&mut self.lines);

        self.phase = CartPhase::Confirmed;

        Ok(Order::new(
            number,
            order_type,
            lines,
            total,
            OrderStatus::Preparing,
            created_at,
        ))
    }

    fn ensure_open(&self) -> Result<(), CartStateError> {
        match self.phase {
            CartPhase::Empty | CartPhase::Building => Ok(()),
            CartPhase::Checkout | CartPhase::Confirmed => {
                Err(CartStateError::Locked(self.phase))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::{Money, iso::MAD};
    use testresult::TestResult;

    use crate::catalog::{Extra, Ingredient, Product};

    use super::*;

    fn burger() -> Product<'static> {
        Product {
            id: "burger-classic".to_string(),
            name: "Burger Classic".to_string(),
            description: String::new(),
            price: Money::from_minor(5500, MAD),
            image: None,
            category_id: "burgers".to_string(),
            ingredients: vec![
                Ingredient {
                    id: "onion".to_string(),
                    name: "Oignon".to_string(),
                    image: None,
                    removable: true,
                },
                Ingredient {
                    id: "patty".to_string(),
                    name: "Steak".to_string(),
                    image: None,
                    removable: false,
                },
            ],
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

    fn building_cart() -> Result<Cart<'static>, CartStateError> {
        let mut cart = Cart::new(MAD);

        cart.set_order_type(OrderType::Takeaway)?;

        Ok(cart)
    }

    #[test]
    fn starts_empty() {
        let cart = Cart::new(MAD);

        assert_eq!(cart.phase(), CartPhase::Empty);
        assert_eq!(cart.order_type(), None);
        assert!(cart.is_empty());
    }

    #[test]
    fn set_order_type_enters_building() -> TestResult {
        let cart = building_cart()?;

        assert_eq!(cart.phase(), CartPhase::Building);
        assert_eq!(cart.order_type(), Some(OrderType::Takeaway));

        Ok(())
    }

    #[test]
    fn add_item_requires_order_type() {
        let mut cart = Cart::new(MAD);

        let result = cart.add_item(&burger(), &[] as &[&str], &[]);

        assert_eq!(result, Err(CartStateError::NoOrderType));
    }

    #[test]
    fn adding_same_product_twice_creates_distinct_lines() -> TestResult {
        let mut cart = building_cart()?;

        let first = cart.add_item(&burger(), &[] as &[&str], &[])?;
        let second = cart.add_item(&burger(), &[] as &[&str], &[])?;

        assert_ne!(first, second);
        assert_eq!(cart.line_count(), 2);

        Ok(())
    }

    #[test]
    fn add_item_clamps_unknown_and_non_removable_ids() -> TestResult {
        let mut cart = building_cart()?;

        let id = cart.add_item(
            &burger(),
            &["onion", "patty", "pineapple", "onion"],
            &["extra-cheese", "extra-bacon", "extra-cheese"],
        )?;

        let line = cart.line(id).ok_or("missing line")?;

        assert_eq!(line.excluded_ingredients(), ["onion".to_string()]);
        assert_eq!(line.selected_extras(), ["extra-cheese".to_string()]);

        Ok(())
    }

    #[test]
    fn update_quantity_to_zero_removes_the_line() -> TestResult {
        let mut cart = building_cart()?;

        let id = cart.add_item(&burger(), &[] as &[&str], &[])?;

        cart.update_quantity(id, 0)?;

        assert_eq!(cart.line_count(), 0);
        assert!(cart.line(id).is_none());

        Ok(())
    }

    #[test]
    fn update_quantity_with_unknown_id_is_a_no_op() -> TestResult {
        let mut cart = building_cart()?;

        let id = cart.add_item(&burger(), &[] as &[&str], &[])?;

        cart.update_quantity(LineId(999), 5)?;

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.line(id).map(CartLine::quantity), Some(1));

        Ok(())
    }

    #[test]
    fn remove_item_is_a_no_op_when_absent() -> TestResult {
        let mut cart = building_cart()?;

        cart.add_item(&burger(), &[] as &[&str], &[])?;
        cart.remove_item(LineId(42))?;

        assert_eq!(cart.line_count(), 1);

        Ok(())
    }

    #[test]
    fn item_count_sums_quantities() -> TestResult {
        let mut cart = building_cart()?;

        let id = cart.add_item(&burger(), &[] as &[&str], &[])?;
        cart.add_item(&burger(), &[] as &[&str], &[])?;
        cart.update_quantity(id, 3)?;

        assert_eq!(cart.item_count(), 4);
        assert_eq!(cart.line_count(), 2);

        Ok(())
    }

    #[test]
    fn checkout_on_empty_cart_is_rejected_and_cart_unchanged() -> TestResult {
        let mut cart = building_cart()?;

        let result = cart.checkout();

        assert_eq!(result.err(), Some(CartEmptyError));
        assert_eq!(cart.phase(), CartPhase::Building);

        Ok(())
    }

    #[test]
    fn checkout_snapshot_survives_later_mutation() -> TestResult {
        let mut cart = building_cart()?;

        let id = cart.add_item(&burger(), &["onion"], &["extra-cheese"])?;
        let draft = cart.checkout()?;

        assert_eq!(cart.phase(), CartPhase::Checkout);
        assert_eq!(draft.total(), Money::from_minor(5300, MAD));

        cart.reopen()?;
        cart.update_quantity(id, 4)?;

        assert_eq!(draft.total(), Money::from_minor(5300, MAD));
        assert_eq!(draft.lines().len(), 1);

        Ok(())
    }

    #[test]
    fn mutations_are_locked_during_checkout() -> TestResult {
        let mut cart = building_cart()?;

        cart.add_item(&burger(), &[] as &[&str], &[])?;
        cart.checkout()?;

        assert_eq!(
            cart.add_item(&burger(), &[] as &[&str], &[]),
            Err(CartStateError::Locked(CartPhase::Checkout))
        );
        assert_eq!(
            cart.set_order_type(OrderType::DineIn),
            Err(CartStateError::Locked(CartPhase::Checkout))
        );

        Ok(())
    }

    #[test]
    fn confirm_requires_checkout_phase() -> TestResult {
        let mut cart = building_cart()?;

        cart.add_item(&burger(), &[] as &[&str], &[])?;

        let result = cart.confirm(OrderNumber::new(7)?, Timestamp::UNIX_EPOCH);

        assert_eq!(result.err(), Some(CartStateError::Locked(CartPhase::Building)));

        Ok(())
    }

    #[test]
    fn confirm_finalizes_order_and_clears_lines() -> TestResult {
        let mut cart = building_cart()?;

        cart.add_item(&burger(), &["onion"], &["extra-cheese"])?;
        cart.checkout()?;

        let order = cart.confirm(OrderNumber::new(42)?, Timestamp::UNIX_EPOCH)?;

        assert_eq!(order.total(), Money::from_minor(5300, MAD));
        assert_eq!(order.number().to_string(), "042");
        assert_eq!(cart.phase(), CartPhase::Confirmed);
        assert!(cart.is_empty());

        Ok(())
    }

    #[test]
    fn clear_resets_everything() -> TestResult {
        let mut cart = building_cart()?;

        cart.add_item(&burger(), &[] as &[&str], &[])?;
        cart.checkout()?;
        cart.clear();

        assert_eq!(cart.phase(), CartPhase::Empty);
        assert_eq!(cart.order_type(), None);
        assert!(cart.is_empty());

        Ok(())
    }
}
