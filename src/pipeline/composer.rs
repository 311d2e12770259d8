//! Reply composer — renders an `ExtractionResult` into the fixed HTML
//! template and addresses it back into the originating thread.
//!
//! Rendering is pure: identical inputs yield byte-identical HTML. All
//! model-derived text is escaped before interpolation.

use crate::pipeline::types::{EmailThread, ExtractionResult, OutgoingEmail};

/// Document head with the fixed table styling.
const CSS_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <style>
    @import url('https://fonts.googleapis.com/css2?family=Roboto:wght@400;700&display=swap');

    table {
      width: 100%;
      font-family: 'Roboto', sans-serif;
      border-collapse: collapse;
    }

    thead th {
      padding: 12px;
      text-align: left;
      background-color: #f2f2f2;
      color: #333333;
      font-weight: bold;
      border-bottom: 2px solid #dddddd;
    }

    tbody td {
      padding: 12px;
      border-bottom: 1px solid #dddddd;
    }

    tbody tr:nth-child(even) {
      background-color: #f9f9f9;
    }

    tbody tr:hover {
      background-color: #ebebeb;
    }
  </style>
</head>
"#;

/// Placeholder target of the invoice table's "Update AR" action link.
const UPDATE_AR_URL: &str = "https://www.w3.org/Provider/Style/dummy.html";

/// Compose the outgoing reply for a thread from its extraction result.
pub fn compose_reply(thread: &EmailThread, result: &ExtractionResult) -> OutgoingEmail {
    OutgoingEmail {
        to: thread.sender.clone(),
        subject: reply_subject(&thread.subject),
        html_body: render_html(result),
        in_reply_to: thread.in_reply_to.clone(),
        references: thread.references.clone(),
    }
}

/// Thread-preserving reply subject: prefix `Re: ` unless already present.
pub fn reply_subject(subject: &str) -> String {
    let trimmed = subject.trim();
    if trimmed.to_lowercase().starts_with("re:") {
        trimmed.to_string()
    } else {
        format!("Re: {trimmed}")
    }
}

/// Render the HTML body: summary section, suggested-reply section, invoice
/// table, one row per record.
pub fn render_html(result: &ExtractionResult) -> String {
    let mut html = String::with_capacity(CSS_TEMPLATE.len() + 1024);
    html.push_str(CSS_TEMPLATE);
    html.push_str("<body>\n");

    html.push_str("<h2>SUMMARY</h2>\n");
    html.push_str(&escape_html(&result.summary));
    html.push('\n');

    html.push_str("<h2>SUGGESTED REPLY</h2>\n");
    html.push_str(&escape_html(&result.suggested_reply));
    html.push('\n');

    html.push_str("<h2>INVOICES</h2>\n");
    html.push_str(
        "<table>\n<thead>\n<tr>\
         <th>Invoice ID</th>\
         <th>Value</th>\
         <th>Status</th>\
         <th>Payment promised</th>\
         <th>Summary</th>\
         <th>Action</th>\
         </tr>\n</thead>\n<tbody>\n",
    );

    for invoice in &result.invoices {
        let value = if invoice.currency.is_empty() {
            escape_html(&invoice.total_value)
        } else {
            format!(
                "{} {}",
                escape_html(&invoice.total_value),
                escape_html(&invoice.currency)
            )
        };
        html.push_str(&format!(
            "<tr>\
             <td>{}</td>\
             <td>{}</td>\
             <td>{}</td>\
             <td>{}</td>\
             <td>{}</td>\
             <td><a href=\"{UPDATE_AR_URL}\">Update AR</a></td>\
             </tr>\n",
            escape_html(&invoice.invoice_id),
            value,
            escape_html(invoice.status.as_str()),
            escape_html(&invoice.promised_payment_date),
            escape_html(&invoice.summary),
        ));
    }

    html.push_str("</tbody>\n</table>\n<br />\n<p>Bot Generated Reply Ends Here</p>\n");
    html.push_str("</body>\n</html>\n");
    html
}

/// Minimal HTML escaping for model-derived text.
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
