use crate::wizard::PaymentOrder;
use chrono::{DateTime, Local};
use sha2::{Digest, Sha256};
use url::Url;

pub const QR_SIZE: &str = "250x250";

#[derive(Debug, Clone)]
pub struct Payee {
    pub vpa: String,
    pub name: String,
}

pub fn format_amount(amount: f64) -> String {
    format!("{:.2}", amount)
}

/// `upi://pay?pa=..&pn=..&am=..&tn=..&cu=INR`
pub fn upi_link(payee: &Payee, order: &PaymentOrder) -> String {
    let note = if order.purpose.trim().is_empty() {
        format!("Fee payment {}", order.order_id)
    } else {
        format!("{} {}", order.purpose.trim(), order.order_id)
    };
    let query: String = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("pa", &payee.vpa)
        .append_pair("pn", &payee.name)
        .append_pair("am", &format_amount(order.amount))
        .append_pair("tn", &note)
        .append_pair("cu", "INR")
        .finish();
    // Some UPI apps do not decode '+' as a space.
    format!("upi://pay?{}", query.replace('+', "%20"))
}

/// Image URL from the configured QR generator encoding `data`.
pub fn qr_image_url(endpoint: &str, data: &str) -> anyhow::Result<String> {
    let url = Url::parse_with_params(endpoint, &[("size", QR_SIZE), ("data", data)])
        .map_err(|e| anyhow::anyhow!("invalid QR endpoint {endpoint}: {e}"))?;
    Ok(url.to_string())
}

/// Stable receipt number for an order/transaction pair, so reprints match.
pub fn receipt_number(order_id: &str, transaction_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(order_id.trim().as_bytes());
    hasher.update(b"|");
    hasher.update(transaction_id.trim().as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().take(5).map(|b| format!("{:02X}", b)).collect();
    format!("RCPT-{hex}")
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
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

#[derive(Debug, Clone)]
pub struct Receipt {
    pub receipt_number: String,
    pub order_id: String,
    pub student_name: String,
    pub regd_no: Option<String>,
    pub amount: f64,
    pub transaction_id: String,
    pub purpose: String,
    pub paid_at: DateTime<Local>,
    pub printed_at: DateTime<Local>,
}

impl Receipt {
    pub fn for_order(
        order: &PaymentOrder,
        transaction_id: &str,
        receipt_number: Option<String>,
        paid_at: DateTime<Local>,
        printed_at: DateTime<Local>,
    ) -> Self {
        Self {
            receipt_number: receipt_number
                .unwrap_or_else(|| self::receipt_number(&order.order_id, transaction_id)),
            order_id: order.order_id.clone(),
            student_name: order.student_name.clone(),
            regd_no: order.regd_no.clone(),
            amount: order.amount,
            transaction_id: transaction_id.trim().to_string(),
            purpose: order.purpose.clone(),
            paid_at,
            printed_at,
        }
    }

    /// Self-contained printable page. It asks the browser to print on load.
    pub fn to_html(&self) -> String {
        let row = |label: &str, value: &str| {
            format!(
                "      <tr><th>{}</th><td>{}</td></tr>\n",
                html_escape(label),
                html_escape(value)
            )
        };
        let mut rows = String::new();
        rows.push_str(&row("Receipt No", &self.receipt_number));
        rows.push_str(&row("Order ID", &self.order_id));
        rows.push_str(&row("Student Name", &self.student_name));
        if let Some(regd) = self.regd_no.as_deref() {
            rows.push_str(&row("Regd No", regd));
        }
        if !self.purpose.trim().is_empty() {
            rows.push_str(&row("Purpose", &self.purpose));
        }
        rows.push_str(&row("Amount", &format!("Rs. {}", format_amount(self.amount))));
        rows.push_str(&row("Transaction ID", &self.transaction_id));
        rows.push_str(&row(
            "Paid On",
            &self.paid_at.format("%d %b %Y, %I:%M %p").to_string(),
        ));

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Payment Receipt {number}</title>
  <style>
    body {{ font-family: Arial, sans-serif; margin: 40px; color: #222; }}
    h1 {{ font-size: 22px; margin-bottom: 4px; }}
    table {{ border-collapse: collapse; width: 100%; max-width: 560px; }}
    th, td {{ text-align: left; padding: 8px 12px; border-bottom: 1px solid #ddd; }}
    th {{ width: 40%; color: #555; }}
    .footer {{ margin-top: 24px; font-size: 12px; color: #777; }}
  </style>
</head>
<body onload="window.print()">
  <h1>Payment Receipt</h1>
  <p>Payment received via UPI (manual verification).</p>
  <table>
{rows}  </table>
  <p class="footer">Printed on {printed}. This is a computer generated receipt.</p>
</body>
</html>
"#,
            number = html_escape(&self.receipt_number),
            rows = rows,
            printed = self.printed_at.format("%d %b %Y, %I:%M %p"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> PaymentOrder {
        PaymentOrder {
            order_id: "ORD-77".to_string(),
            student_name: "Meera <K>".to_string(),
            regd_no: Some("22EE010".to_string()),
            amount: 1250.5,
            purpose: "Exam fee".to_string(),
        }
    }

    fn payee() -> Payee {
        Payee {
            vpa: "college@sbi".to_string(),
            name: "City College".to_string(),
        }
    }

    #[test]
    fn upi_link_carries_amount_and_note() {
        let link = upi_link(&payee(), &order());
        assert!(link.starts_with("upi://pay?pa=college%40sbi&pn=City%20College"));
        assert!(link.contains("&am=1250.50&"));
        assert!(link.contains("&tn=Exam%20fee%20ORD-77&"));
        assert!(link.ends_with("&cu=INR"));
    }

    #[test]
    fn qr_url_encodes_the_deep_link() {
        let link = upi_link(&payee(), &order());
        let url = qr_image_url("https://qr.example/create/", &link).expect("qr url");
        assert!(url.starts_with("https://qr.example/create/?size=250x250&data=upi%3A%2F%2Fpay%3F"));
    }

    #[test]
    fn receipt_number_is_stable() {
        let a = receipt_number("ORD-77", "UTR1");
        let b = receipt_number(" ORD-77 ", "UTR1 ");
        assert_eq!(a, b);
        assert_eq!(a.len(), "RCPT-".len() + 10);
        assert_ne!(a, receipt_number("ORD-77", "UTR2"));
    }

    #[test]
    fn receipt_html_escapes_names() {
        let now = Local::now();
        let r = Receipt::for_order(&order(), "UTR1", None, now, now);
        let html = r.to_html();
        assert!(html.contains("Meera &lt;K&gt;"));
        assert!(html.contains("Rs. 1250.50"));
        assert!(html.contains(&r.receipt_number));
        assert!(html.contains("window.print()"));
    }
}
