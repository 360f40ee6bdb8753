//! Localization
//!
//! Flat static string tables per locale, covering the strings the core
//! surfaces on tickets and operator output. Language selection never touches
//! pricing or recommendation logic; the only money-adjacent concern here is
//! display formatting, where the single currency-precision rounding step
//! happens.

use std::fmt;

use clap::ValueEnum;
use rusty_money::{Money, iso::Currency};

use borne::orders::OrderType;

/// Locales the kiosk ships tables for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Locale {
    /// French (default)
    Fr,

    /// English
    En,

    /// Arabic
    Ar,

    /// Spanish
    Es,
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Locale::Fr => "fr",
            Locale::En => "en",
            Locale::Ar => "ar",
            Locale::Es => "es",
        };

        write!(f, "{code}")
    }
}

impl Locale {
    /// The string table for this locale.
    #[must_use]
    pub fn translations(self) -> &'static Translations {
        match self {
            Locale::Fr => &FR,
            Locale::En => &EN,
            Locale::Ar => &AR,
            Locale::Es => &ES,
        }
    }
}

/// One locale's string table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translations {
    /// Confirmation headline
    pub order_confirmed: &'static str,

    /// Thank-you line under the headline
    pub thank_you: &'static str,

    /// Label above the order number
    pub your_order_number: &'static str,

    /// Caption of the tracking code
    pub scan_to_track: &'static str,

    /// Footer instruction on the ticket
    pub present_ticket: &'static str,

    /// Ticket sign-off
    pub see_you_soon: &'static str,

    /// Dine-in label
    pub dine_in: &'static str,

    /// Takeaway label
    pub takeaway: &'static str,

    /// Total label
    pub total: &'static str,

    /// Singular article label
    pub article: &'static str,

    /// Plural article label
    pub articles: &'static str,

    /// Estimated preparation time line
    pub estimated_time: &'static str,

    /// Exclusion prefix ("Sans")
    pub without: &'static str,

    /// Ticket table header: item column
    pub item_header: &'static str,

    /// Ticket table header: quantity column
    pub qty_header: &'static str,

    /// Ticket table header: price column
    pub price_header: &'static str,
}

impl Translations {
    /// Display label for an order type.
    #[must_use]
    pub fn order_type_label(&self, order_type: OrderType) -> &'static str {
        match order_type {
            OrderType::DineIn => self.dine_in,
            OrderType::Takeaway => self.takeaway,
        }
    }

    /// Count-based article label ("1 article" / "3 articles").
    #[must_use]
    pub fn articles_label(&self, count: u32) -> String {
        if count == 1 {
            format!("{count} {}", self.article)
        } else {
            format!("{count} {}", self.articles)
        }
    }
}

/// Formats a price for display. This is the one place currency-precision
/// rounding is applied; everything upstream works in exact minor units.
#[must_use]
pub fn format_price(price: &Money<'_, Currency>) -> String {
    price.to_string()
}

static FR: Translations = Translations {
    order_confirmed: "Commande Confirmée !",
    thank_you: "Merci pour votre commande",
    your_order_number: "Votre numéro de commande",
    scan_to_track: "Scannez pour suivre votre commande",
    present_ticket: "Présentez ce ticket au comptoir",
    see_you_soon: "À bientôt !",
    dine_in: "Sur Place",
    takeaway: "À Emporter",
    total: "Total",
    article: "article",
    articles: "articles",
    estimated_time: "Temps estimé: 5-10 min",
    without: "Sans:",
    item_header: "Article",
    qty_header: "Qté",
    price_header: "Prix",
};

static EN: Translations = Translations {
    order_confirmed: "Order Confirmed!",
    thank_you: "Thank you for your order",
    your_order_number: "Your order number",
    scan_to_track: "Scan to track your order",
    present_ticket: "Present this ticket at the counter",
    see_you_soon: "See you soon!",
    dine_in: "Dine In",
    takeaway: "Takeaway",
    total: "Total",
    article: "item",
    articles: "items",
    estimated_time: "Estimated time: 5-10 min",
    without: "Without:",
    item_header: "Item",
    qty_header: "Qty",
    price_header: "Price",
};

static AR: Translations = Translations {
    order_confirmed: "تم تأكيد الطلب!",
    thank_you: "شكراً لطلبكم",
    your_order_number: "رقم طلبكم",
    scan_to_track: "امسح الرمز لتتبع طلبك",
    present_ticket: "قدّم هذه التذكرة عند الكاونتر",
    see_you_soon: "إلى اللقاء!",
    dine_in: "في المطعم",
    takeaway: "سفري",
    total: "المجموع",
    article: "منتج",
    articles: "منتجات",
    estimated_time: "الوقت المقدر: 5-10 دقائق",
    without: "بدون:",
    item_header: "المنتج",
    qty_header: "الكمية",
    price_header: "الثمن",
};

static ES: Translations = Translations {
    order_confirmed: "¡Pedido Confirmado!",
    thank_you: "Gracias por su pedido",
    your_order_number: "Su número de pedido",
    scan_to_track: "Escanee para seguir su pedido",
    present_ticket: "Presente este ticket en el mostrador",
    see_you_soon: "¡Hasta pronto!",
    dine_in: "Para Comer Aquí",
    takeaway: "Para Llevar",
    total: "Total",
    article: "artículo",
    articles: "artículos",
    estimated_time: "Tiempo estimado: 5-10 min",
    without: "Sin:",
    item_header: "Artículo",
    qty_header: "Cant.",
    price_header: "Precio",
};
