//! Canonical offer text.
//!
//! The text built here is the deduplication key of the offer store, so the
//! line order and markers must never change between releases.

use crate::models::CatalogAttributes;

pub const PRICE_MARKER: &str = "🔥";
pub const INSTALLMENT_MARKER: &str = "💳";
pub const COUPON_PREFIX: &str = "🎟️ Cupom:";
pub const CALL_TO_ACTION: &str = "🛒 Compre aqui:";

/// Builds the canonical description. Absent fields are omitted; an item
/// without any usable field yields an empty string.
pub fn build(attributes: &CatalogAttributes) -> String {
    let mut lines: Vec<String> = Vec::new();

    if let Some(title) = non_blank(&attributes.title) {
        lines.push(title.to_string());
    }

    let price = non_blank(&attributes.price);
    let installment = non_blank(&attributes.installment);
    if price.is_some() || installment.is_some() {
        lines.push(String::new());
        if let Some(price) = price {
            lines.push(format!("{} {}", PRICE_MARKER, price));
        }
        if let Some(installment) = installment {
            lines.push(format!("{} {}", INSTALLMENT_MARKER, installment));
        }
    }

    if let Some(coupon) = non_blank(&attributes.coupon) {
        lines.push(String::new());
        lines.push(format!("{} {}", COUPON_PREFIX, coupon));
    }

    if let Some(link) = non_blank(&attributes.link) {
        lines.push(String::new());
        lines.push(CALL_TO_ACTION.to_string());
        lines.push(link.to_string());
    }

    lines.join("\n").trim().to_string()
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
