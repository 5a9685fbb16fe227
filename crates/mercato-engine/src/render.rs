//! # Invoice Rendering
//!
//! Turns an invoice into a printable document. The engine ships a plain
//! text renderer; PDF or thermal-printer backends plug in behind the same
//! trait.

use mercato_core::{Invoice, InvoiceItem, InvoiceStatus, Money};

use crate::config::StoreConfig;
use crate::error::EngineResult;

/// Document width in characters. Fits 80-column terminals and printers.
const LINE_WIDTH: usize = 64;

/// Produces a printable document for an invoice.
pub trait DocumentRenderer: Send + Sync {
    /// Renders the invoice with its line items.
    fn render(&self, invoice: &Invoice, items: &[InvoiceItem]) -> EngineResult<Vec<u8>>;

    /// File extension for the produced format, without the dot.
    fn extension(&self) -> &'static str;
}

/// Fixed-width plain text renderer. The default.
pub struct TextRenderer {
    store: StoreConfig,
}

impl TextRenderer {
    pub fn new(store: StoreConfig) -> Self {
        TextRenderer { store }
    }

    fn rule(out: &mut String, ch: char) {
        for _ in 0..LINE_WIDTH {
            out.push(ch);
        }
        out.push('\n');
    }

    fn centered(out: &mut String, text: &str) {
        let text = text.trim();
        if text.len() >= LINE_WIDTH {
            out.push_str(text);
        } else {
            let pad = (LINE_WIDTH - text.len()) / 2;
            for _ in 0..pad {
                out.push(' ');
            }
            out.push_str(text);
        }
        out.push('\n');
    }

    fn labeled(out: &mut String, label: &str, value: &str) {
        out.push_str(&format!("{:<16}{}\n", label, value));
    }

    /// A line with `left` justified and `right` aligned to the margin.
    fn split(out: &mut String, left: &str, right: &str) {
        let used = left.len() + right.len();
        if used >= LINE_WIDTH {
            out.push_str(&format!("{} {}\n", left, right));
        } else {
            out.push_str(left);
            for _ in 0..(LINE_WIDTH - used) {
                out.push(' ');
            }
            out.push_str(right);
            out.push('\n');
        }
    }
}

impl DocumentRenderer for TextRenderer {
    fn render(&self, invoice: &Invoice, items: &[InvoiceItem]) -> EngineResult<Vec<u8>> {
        let mut out = String::new();

        Self::rule(&mut out, '=');
        Self::centered(&mut out, &self.store.name);
        if let Some(address) = &self.store.address {
            Self::centered(&mut out, address);
        }
        if let Some(email) = &self.store.contact_email {
            Self::centered(&mut out, email);
        }
        if let Some(phone) = &self.store.contact_phone {
            Self::centered(&mut out, phone);
        }
        Self::rule(&mut out, '=');

        out.push('\n');
        Self::labeled(&mut out, "INVOICE", &invoice.number);
        Self::labeled(
            &mut out,
            "Issued",
            &invoice.issued_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        );
        Self::labeled(&mut out, "Payment", &invoice.payment_method.to_string());
        if invoice.status == InvoiceStatus::Voided {
            Self::labeled(&mut out, "Status", "VOIDED");
            if let Some(reason) = &invoice.void_reason {
                Self::labeled(&mut out, "Reason", reason);
            }
        } else if invoice.status == InvoiceStatus::Paid {
            Self::labeled(&mut out, "Status", "PAID");
        }

        out.push('\n');
        Self::labeled(&mut out, "Billed to", &invoice.fiscal_name);
        if let Some(tax_id) = &invoice.fiscal_tax_id {
            Self::labeled(&mut out, "Tax ID", tax_id);
        }
        if let Some(address) = &invoice.fiscal_address {
            Self::labeled(&mut out, "Address", address);
        }
        if let Some(email) = &invoice.fiscal_email {
            Self::labeled(&mut out, "Email", email);
        }

        out.push('\n');
        Self::rule(&mut out, '-');
        for item in items {
            let qty = format!(
                "{} x {}",
                item.quantity,
                Money::from_cents(item.unit_price_cents)
            );
            Self::split(&mut out, &item.name_snapshot, &item.line_total().to_string());
            out.push_str(&format!("  {}\n", qty));
        }
        Self::rule(&mut out, '-');

        Self::split(&mut out, "Subtotal", &invoice.subtotal().to_string());
        if invoice.discount_cents > 0 {
            Self::split(
                &mut out,
                "Discount",
                &format!("-{}", Money::from_cents(invoice.discount_cents)),
            );
        }
        Self::split(
            &mut out,
            "Tax",
            &Money::from_cents(invoice.tax_cents).to_string(),
        );
        Self::split(&mut out, "TOTAL", &invoice.total().to_string());

        if let Some(instructions) = &self.store.bank_instructions {
            out.push('\n');
            Self::rule(&mut out, '-');
            out.push_str(instructions);
            out.push('\n');
        }

        Ok(out.into_bytes())
    }

    fn extension(&self) -> &'static str {
        "txt"
    }
}
