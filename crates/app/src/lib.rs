//! Borne App
//!
//! The kiosk session runtime around the [`borne`] ordering core: backend
//! REST client, async session driver with stale-response protection,
//! configuration, logging, localization tables, and the console ticket
//! preview.

pub mod client;
pub mod config;
pub mod i18n;
pub mod logging;
pub mod session;
pub mod ticket;
