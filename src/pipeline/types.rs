//! Shared types for the extraction pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Email thread ────────────────────────────────────────────────────

/// A single inbound email conversation, as delivered by the trigger
/// platform. Immutable once ingested; discarded at end of run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailThread {
    /// Sender address — the reply goes back here.
    pub sender: String,
    /// Human-readable sender name (if available).
    pub sender_name: Option<String>,
    /// Subject line of the triggering message.
    pub subject: String,
    /// Full body text of the thread.
    pub body: String,
    /// Value for the reply's `In-Reply-To` header.
    pub in_reply_to: Option<String>,
    /// Values for the reply's `References` header.
    #[serde(default)]
    pub references: Vec<String>,
    /// When the triggering message was received.
    pub received_at: Option<DateTime<Utc>>,
}

impl EmailThread {
    /// The discussion text embedded verbatim into the extraction prompt.
    pub fn discussion(&self) -> String {
        format!("Subject: {}\n\n{}", self.subject, self.body)
    }
}

// ── Invoice records ─────────────────────────────────────────────────

/// Payment status of one invoice, as reported by the customer in the
/// thread. Unrecognized wire values are preserved verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvoiceStatus {
    Paid,
    PaymentPromised,
    Dispute,
    RequestInfo,
    WaitingApproval,
    Other(String),
}

impl InvoiceStatus {
    /// Map a wire string onto the known vocabulary, keeping unknown values
    /// as-is.
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "paid" => Self::Paid,
            "payment_promised" => Self::PaymentPromised,
            "dispute" => Self::Dispute,
            "request_info" => Self::RequestInfo,
            "waiting_approval" => Self::WaitingApproval,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Paid => "paid",
            Self::PaymentPromised => "payment_promised",
            Self::Dispute => "dispute",
            Self::RequestInfo => "request_info",
            Self::WaitingApproval => "waiting_approval",
            Self::Other(raw) => raw,
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One invoice covered in the discussion, derived solely from model output.
/// Values are pass-through: no numeric coercion, no dedup across records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceRecord {
    pub invoice_id: String,
    pub total_value: String,
    /// Currency code if the model reported one, empty otherwise.
    pub currency: String,
    pub status: InvoiceStatus,
    /// `YYYY-MM-DD` when status is payment_promised, empty otherwise.
    pub promised_payment_date: String,
    /// One-sentence summary of what the customer said about this invoice.
    pub summary: String,
}

// ── Extraction result ───────────────────────────────────────────────

/// Validated output of the LLM extraction. Summary, suggested reply, and
/// the invoice list must all have been present in the response; malformed
/// individual invoice entries have already been dropped.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub summary: String,
    pub suggested_reply: String,
    /// Customer account id, typically lifted from the subject line.
    pub account_id: Option<String>,
    pub invoices: Vec<InvoiceRecord>,
}

// ── Outgoing email ──────────────────────────────────────────────────

/// A composed reply, ready for the mail API. Lifecycle ends at submission;
/// delivery status is not tracked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub in_reply_to: Option<String>,
    pub references: Vec<String>,
}
