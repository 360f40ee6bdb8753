//! Borne
//!
//! Borne is the ordering core of a touchscreen self-service kiosk: a validated
//! product catalog, a promo-aware pricing engine, a cart state machine, a
//! rule-table recommendation engine, and the order flow controller that
//! sequences a customer session from welcome screen to confirmation.

pub mod cart;
pub mod catalog;
pub mod fixtures;
pub mod flow;
pub mod orders;
pub mod pricing;
pub mod recommend;
