//! Printable invoice documents.

use rust_decimal::Decimal;

use crate::models::InvoiceWithClient;
use crate::services::totals::round_currency;

/// A rendered document ready to serve or attach.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    pub file_name: String,
    pub content_type: &'static str,
    pub body: String,
}

pub trait DocumentRenderer: Send + Sync {
    fn render_invoice(&self, invoice: &InvoiceWithClient) -> RenderedDocument;
}

/// Format an amount as `$1,234.56`.
pub fn format_currency(amount: Decimal) -> String {
    let rounded = round_currency(amount.abs());
    let text = format!("{:.2}", rounded);
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{}${}.{}", sign, grouped, cents)
}

/// Escape text for inclusion in HTML element content or attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn format_percent(rate: Decimal) -> String {
    (rate * Decimal::ONE_HUNDRED).normalize().to_string()
}

/// Self-contained HTML invoice, styled for printing.
#[derive(Debug, Clone)]
pub struct HtmlInvoiceRenderer {
    business_name: String,
    tax_rate: Decimal,
}

impl HtmlInvoiceRenderer {
    pub fn new(business_name: impl Into<String>, tax_rate: Decimal) -> Self {
        Self {
            business_name: business_name.into(),
            tax_rate,
        }
    }

    fn client_block(&self, invoice: &InvoiceWithClient) -> String {
        let client = &invoice.client;
        let mut lines = vec![format!("<strong>{}</strong>", escape_html(&client.name))];
        if let Some(company) = &client.company {
            lines.push(escape_html(company));
        }
        lines.push(escape_html(&client.email));
        if let Some(phone) = &client.phone {
            lines.push(escape_html(phone));
        }
        if let Some(address) = &client.address {
            lines.push(escape_html(address).replace('\n', "<br>"));
        }
        lines.join("<br>\n")
    }

    fn line_rows(invoice: &InvoiceWithClient) -> String {
        invoice
            .line_items
            .iter()
            .map(|item| {
                format!(
                    "<tr><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td></tr>",
                    escape_html(&item.description),
                    item.quantity.normalize(),
                    format_currency(item.rate),
                    format_currency(item.total),
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl DocumentRenderer for HtmlInvoiceRenderer {
    fn render_invoice(&self, invoice: &InvoiceWithClient) -> RenderedDocument {
        let inv = &invoice.invoice;
        let number = escape_html(&inv.number);
        let notes = inv
            .notes
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .map(|n| {
                format!(
                    "<section class=\"notes\"><h3>Notes</h3><p>{}</p></section>",
                    escape_html(n)
                )
            })
            .unwrap_or_default();

        let body = format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Invoice #{number}</title>
<style>
body {{ font-family: Helvetica, Arial, sans-serif; color: #222; margin: 40px; }}
header {{ display: flex; justify-content: space-between; border-bottom: 2px solid #333; padding-bottom: 12px; }}
table {{ width: 100%; border-collapse: collapse; margin-top: 24px; }}
th, td {{ padding: 8px; border-bottom: 1px solid #ddd; text-align: left; }}
.num {{ text-align: right; }}
.totals td {{ border: none; }}
.grand td {{ font-weight: bold; border-top: 2px solid #333; }}
@media print {{ body {{ margin: 0; }} }}
</style>
</head>
<body>
<header>
<h1>{business}</h1>
<div>
<h2>Invoice #{number}</h2>
<div>Status: {status}</div>
</div>
</header>
<section class="meta">
<p>Issue date: {issue_date}<br>Due date: {due_date}</p>
</section>
<section class="bill-to">
<h3>Bill To</h3>
<p>{client}</p>
</section>
<table>
<thead><tr><th>Description</th><th class="num">Quantity</th><th class="num">Rate</th><th class="num">Amount</th></tr></thead>
<tbody>
{rows}
</tbody>
<tfoot>
<tr class="totals"><td colspan="3" class="num">Subtotal</td><td class="num">{subtotal}</td></tr>
<tr class="totals"><td colspan="3" class="num">Tax ({tax_rate}%)</td><td class="num">{tax}</td></tr>
<tr class="grand"><td colspan="3" class="num">Total</td><td class="num">{total}</td></tr>
</tfoot>
</table>
{notes}
</body>
</html>
"#,
            number = number,
            business = escape_html(&self.business_name),
            status = inv.status().as_str(),
            issue_date = inv.issue_date.format("%B %-d, %Y"),
            due_date = inv.due_date.format("%B %-d, %Y"),
            client = self.client_block(invoice),
            rows = Self::line_rows(invoice),
            subtotal = format_currency(inv.subtotal),
            tax_rate = format_percent(self.tax_rate),
            tax = format_currency(inv.tax),
            total = format_currency(inv.total),
            notes = notes,
        );

        RenderedDocument {
            file_name: format!("invoice-{}.html", sanitize_file_name(&inv.number)),
            content_type: "text/html; charset=utf-8",
            body,
        }
    }
}

fn sanitize_file_name(number: &str) -> String {
    number
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Client, Invoice, LineItem};
    use chrono::{NaiveDate, Utc};
    use std::str::FromStr;
    use uuid::Uuid;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn sample() -> InvoiceWithClient {
        let owner_id = Uuid::new_v4();
        let client_id = Uuid::new_v4();
        let invoice_id = Uuid::new_v4();
        InvoiceWithClient {
            invoice: Invoice {
                invoice_id,
                owner_id,
                number: "INV/007".to_string(),
                client_id,
                issue_date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
                due_date: NaiveDate::from_ymd_opt(2026, 10, 31).unwrap(),
                status: "sent".to_string(),
                subtotal: dec("1250.00"),
                tax: dec("106.25"),
                total: dec("1356.25"),
                notes: Some("Thanks <3".to_string()),
                email_sent: false,
                created_utc: Utc::now(),
            },
            client: Client {
                client_id,
                owner_id,
                name: "Smith & Sons".to_string(),
                email: "billing@smith.example".to_string(),
                company: None,
                phone: None,
                address: Some("1 Main St\nSpringfield".to_string()),
                billing_rate: None,
                created_utc: Utc::now(),
            },
            line_items: vec![LineItem {
                line_item_id: Uuid::new_v4(),
                invoice_id,
                owner_id,
                description: "<script>alert(1)</script>".to_string(),
                quantity: dec("12.5"),
                rate: dec("100"),
                total: dec("1250.00"),
                sort_order: 0,
            }],
        }
    }

    #[test]
    fn currency_groups_thousands() {
        assert_eq!(format_currency(dec("0")), "$0.00");
        assert_eq!(format_currency(dec("5")), "$5.00");
        assert_eq!(format_currency(dec("999.5")), "$999.50");
        assert_eq!(format_currency(dec("1234.56")), "$1,234.56");
        assert_eq!(format_currency(dec("1234567.891")), "$1,234,567.89");
        assert_eq!(format_currency(dec("-20")), "-$20.00");
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn renders_printable_invoice() {
        let renderer = HtmlInvoiceRenderer::new("Acme Studio", dec("0.085"));
        let doc = renderer.render_invoice(&sample());

        assert_eq!(doc.file_name, "invoice-INV_007.html");
        assert_eq!(doc.content_type, "text/html; charset=utf-8");
        assert!(doc.body.contains("<h1>Acme Studio</h1>"));
        assert!(doc.body.contains("Invoice #INV/007"));
        assert!(doc.body.contains("Smith &amp; Sons"));
        assert!(doc.body.contains("1 Main St<br>Springfield"));
        assert!(doc.body.contains("Tax (8.5%)"));
        assert!(doc.body.contains("$1,356.25"));
        assert!(doc.body.contains("October 31, 2026"));
        assert!(doc.body.contains("Thanks &lt;3"));
        assert!(!doc.body.contains("<script>"));
    }

    #[test]
    fn omits_empty_notes() {
        let mut invoice = sample();
        invoice.invoice.notes = Some("   ".to_string());
        let doc = HtmlInvoiceRenderer::new("Acme", dec("0.085")).render_invoice(&invoice);
        assert!(!doc.body.contains("class=\"notes\""));
    }
}
