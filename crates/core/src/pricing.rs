//! Pricing
//!
//! Pure, total price computations over catalog and cart data. All arithmetic
//! is done in integer minor units, so the single currency-precision rounding
//! step happens once at display time, never per line.
//!
//! These functions never fail: unknown extra ids contribute zero (a stale
//! catalog reference is a display concern, not a pricing fault), and negative
//! prices are ruled out by catalog validation before a session starts.

use rusty_money::{Money, iso::Currency};

use crate::{
    cart::{Cart, CartLine},
    catalog::Product,
};

/// Returns the price one unit of the product currently sells at: the promo
/// price when the promo is active and set, otherwise the base price.
pub fn effective_unit_price<'a>(product: &Product<'a>) -> Money<'a, Currency> {
    match product.promo_price {
        Some(promo) if product.is_promo => promo,
        _ => product.price,
    }
}

/// Sums the prices of the selected extras that actually exist on the product.
/// Ids the product does not know are ignored.
pub fn extras_total<'a, S: AsRef<str>>(
    product: &Product<'a>,
    selected_extras: &[S],
) -> Money<'a, Currency> {
    let minor = selected_extras
        .iter()
        .filter_map(|id| product.extra(id.as_ref()))
        .map(|extra| extra.price.to_minor_units())
        .sum();

    Money::from_minor(minor, product.price.currency())
}

/// Total for one cart line: `(unit price + extras) * quantity`. A line whose
/// quantity has reached zero is considered deleted and contributes nothing.
pub fn line_total<'a>(line: &CartLine<'a>) -> Money<'a, Currency> {
    let product = line.product();
    let currency = product.price.currency();

    if line.quantity() == 0 {
        return Money::from_minor(0, currency);
    }

    let unit = effective_unit_price(product).to_minor_units();
    let extras = extras_total(product, line.selected_extras()).to_minor_units();
    let minor = (unit + extras) * i64::from(line.quantity());

    Money::from_minor(minor, currency)
}

/// Total over all cart lines, in insertion order. The result is independent
/// of summation order since every term is an exact minor-unit amount.
pub fn cart_total<'a>(cart: &Cart<'a>) -> Money<'a, Currency> {
    let minor = cart
        .lines()
        .iter()
        .map(|line| line_total(line).to_minor_units())
        .sum();

    Money::from_minor(minor, cart.currency())
}
