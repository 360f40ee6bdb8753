//! Ticket
//!
//! Console preview of the printable receipt. The physical 80 mm ticket is an
//! external collaborator's job; this renderer gives operators and the demo
//! binary a faithful look at the structured payload the core produces.

use tabled::settings::{Alignment, Style, object::Columns};

use borne::orders::ReceiptPayload;

use crate::i18n::{self, Translations};

const RULE: &str = "========================================";

/// Renders a receipt payload as a console ticket.
#[must_use]
pub fn render(receipt: &ReceiptPayload<'_>, t: &Translations) -> String {
    let mut builder = tabled::builder::Builder::default();

    builder.push_record([t.item_header, t.qty_header, t.price_header]);

    for line in &receipt.lines {
        let mut name = line.name.clone();

        if !line.without.is_empty() {
            name.push('\n');
            name.push_str(t.without);
            name.push(' ');
            name.push_str(&line.without.join(", "));
        }

        for extra in &line.extras {
            name.push('\n');
            name.push_str("+ ");
            name.push_str(extra);
        }

        builder.push_record([
            name,
            line.quantity.to_string(),
            i18n::format_price(&line.line_total),
        ]);
    }

    let mut table = builder.build();

    table.with(Style::ascii());
    table.modify(Columns::new(1..), Alignment::right());

    let tracking = serde_json::to_string(&receipt.tracking).unwrap_or_default();
    let when = receipt.created_at.strftime("%d/%m/%Y %H:%M");
    let quantity: u32 = receipt.lines.iter().map(|line| line.quantity).sum();

    let mut out = String::new();

    out.push_str(RULE);
    out.push('\n');
    out.push_str(t.order_confirmed);
    out.push('\n');
    out.push_str(t.thank_you);
    out.push('\n');
    out.push_str(RULE);
    out.push('\n');
    out.push_str(t.your_order_number);
    out.push('\n');
    out.push_str(&format!("        >>> {} <<<\n", receipt.order_number));
    out.push_str(t.order_type_label(receipt.order_type));
    out.push_str(" - ");
    out.push_str(&t.articles_label(quantity));
    out.push('\n');
    out.push_str(&table.to_string());
    out.push('\n');
    out.push_str(&format!(
        "{}: {}\n",
        t.total,
        i18n::format_price(&receipt.total)
    ));
    out.push_str(t.estimated_time);
    out.push('\n');
    out.push_str(&format!("{}\n{tracking}\n", t.scan_to_track));
    out.push_str(&format!("{when}\n"));
    out.push_str(t.present_ticket);
    out.push('\n');
    out.push_str(t.see_you_soon);
    out.push('\n');
    out.push_str(RULE);

    out
}
