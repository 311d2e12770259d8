//! LLM request formatter / response parser.
//!
//! Builds the fixed collections prompt around the email thread, calls the
//! completion endpoint, and validates the JSON response into an
//! `ExtractionResult`. Top-level schema violations fail the run; individual
//! malformed invoice entries are dropped with a warning — the only tolerated
//! partial-failure path in the system.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::LlmError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::pipeline::types::{EmailThread, ExtractionResult, InvoiceRecord, InvoiceStatus};

/// Temperature for extraction. Low variance matters more than creativity in
/// a collections workflow.
const EXTRACT_TEMPERATURE: f32 = 0.1;

/// Placeholder replaced with the actual discussion text.
const DISCUSSION_PLACEHOLDER: &str = "###--DISCUSSION--###";

const SYSTEM_PROMPT: &str = "You are an assistant that deals with payment collections. \
Your role is to extract structured data from the email conversations and suggest the \
next best replies.";

const PROMPT_TEMPLATE: &str = r#"Acting as a helper to a payment collections agent for a B2B company, your task is to get the relevant data out of the email discussion with the customer. The email thread is about unpaid invoices.

Your specific task is to return data per each separate invoice in the thread, indicating what customer has responded to each of the invoices payment status. Produce a JSON-formatted response only.

This is the email conversation between the agent and the customer:
###--DISCUSSION--###

The response must be in the JSON format containing the following keys and values:
{
"summary": "summary of the entire conversation in max 3 sentences",
"account_id": "account id of the customer, typically found in the subject line",
"invoices": "list of JSON elements that have following data for each invoice covered in the discussion: invoice_id, total_value, currency, status (based on the information on the discussion, the status can be one of the following 'paid', 'payment_promised', 'dispute', 'request_info', 'waiting_approval' or 'other', see detailed descriptions of these statuses later in the prompt), promised_payment_date (the date customer has indicated the payment will be made in the format YYYY-MM-DD if status is payment_promised, otherwise the value is empty string) and summary (this should contain an invoice specific summary of what has customer said specifically about this invoice in one sentence",
"suggested_reply": "recommend a reply to the customer to his last message based on the information in the discussion so far, with the goal of providing the customer with the information he needs to proceed with the payment(s). Use placeholders for content that you don't have available.",
}

Description of the statuses in the above JSON format:
- paid: customer has indicated that this invoice has already been paid
- payment_promised: customer indicates an intention that the invoice will be paid at a certain date. In this case enter the date in promised_payment_date key in the JSON.
- dispute: customer disputes or rejects the invoice for any reason.
- request_info: customer has asked for more information such as copy of the invoice
- waiting_approval: customer indicates that their business owner or buyer has still to approve the invoice before the payment can be scheduled
- other: anything other than above

Make sure that the `invoices` list will contain the correct promised payment date, if it is mentioned that the invoice will be or was paid at a specific date, or empty string otherwise.

Please give only the properly structured JSON in the response (not code, not comments, not anything else):
"#;

/// Runs the extraction step against an injected LLM provider.
pub struct Extractor {
    llm: Arc<dyn LlmProvider>,
}

impl Extractor {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Extract structured collections data from an email thread.
    ///
    /// One synchronous completion call; no internal retries — the trigger
    /// platform owns any re-execution policy.
    pub async fn extract(&self, thread: &EmailThread) -> Result<ExtractionResult, LlmError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(build_extraction_prompt(thread)),
        ])
        .with_temperature(EXTRACT_TEMPERATURE);

        let response = self.llm.complete(request).await?;

        debug!(
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "Extraction completion returned"
        );
        debug!(content = %response.content, "Raw extraction response");

        parse_extraction_response(&response.content).map_err(|reason| LlmError::UpstreamFormat {
            provider: self.llm.model_name().to_string(),
            reason,
        })
    }
}

// ── Prompt construction ─────────────────────────────────────────────

/// Build the user prompt: the fixed instruction template with the full
/// discussion (subject + body, verbatim) spliced in.
pub fn build_extraction_prompt(thread: &EmailThread) -> String {
    PROMPT_TEMPLATE.replace(DISCUSSION_PLACEHOLDER, &thread.discussion())
}

/// The fixed system prompt for the extraction call.
pub fn system_prompt() -> &'static str {
    SYSTEM_PROMPT
}

// ── Response parsing ────────────────────────────────────────────────

/// Top-level response shape requested from the model.
#[derive(Debug, serde::Deserialize)]
struct ExtractionWire {
    summary: Option<String>,
    #[serde(default)]
    account_id: Option<String>,
    suggested_reply: Option<String>,
    invoices: Option<Vec<serde_json::Value>>,
}

/// One invoice entry as the model returns it. Id and value may arrive as
/// JSON numbers; they are stringified without numeric validation.
#[derive(Debug, serde::Deserialize)]
struct InvoiceWire {
    invoice_id: Option<serde_json::Value>,
    total_value: Option<serde_json::Value>,
    #[serde(default)]
    currency: String,
    status: Option<String>,
    #[serde(default)]
    promised_payment_date: String,
    #[serde(default)]
    summary: String,
}

/// Parse and validate the raw model output.
///
/// Decode failure or a missing top-level field is an error (never guess
/// fields). Invoice entries missing a required sub-field are dropped
/// individually with a warning.
fn parse_extraction_response(raw: &str) -> Result<ExtractionResult, String> {
    let json_str = extract_json_object(raw);
    let wire: ExtractionWire =
        serde_json::from_str(&json_str).map_err(|e| format!("JSON parse error: {e}"))?;

    let summary = wire
        .summary
        .filter(|s| !s.trim().is_empty())
        .ok_or("response is missing the summary field")?;
    let suggested_reply = wire
        .suggested_reply
        .filter(|s| !s.trim().is_empty())
        .ok_or("response is missing the suggested_reply field")?;
    let entries = wire
        .invoices
        .ok_or("response is missing the invoices field")?;

    let mut invoices = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        match parse_invoice_entry(entry) {
            Ok(record) => invoices.push(record),
            Err(reason) => {
                warn!(index, reason, "Dropping malformed invoice entry");
            }
        }
    }

    let account_id = wire.account_id.filter(|s| !s.trim().is_empty());

    Ok(ExtractionResult {
        summary,
        suggested_reply,
        account_id,
        invoices,
    })
}

/// Parse one invoice entry; `invoice_id`, `total_value`, and `status` are
/// required, the rest default to empty strings.
fn parse_invoice_entry(entry: serde_json::Value) -> Result<InvoiceRecord, &'static str> {
    let wire: InvoiceWire =
        serde_json::from_value(entry).map_err(|_| "entry is not an object")?;

    let invoice_id = wire
        .invoice_id
        .as_ref()
        .and_then(value_to_string)
        .ok_or("missing invoice_id")?;
    let total_value = wire
        .total_value
        .as_ref()
        .and_then(value_to_string)
        .ok_or("missing total_value")?;
    let status = wire
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(InvoiceStatus::from_wire)
        .ok_or("missing status")?;

    Ok(InvoiceRecord {
        invoice_id,
        total_value,
        currency: wire.currency,
        status,
        promised_payment_date: wire.promised_payment_date,
        summary: wire.summary,
    })
}

/// Stringify a scalar JSON value; pass-through, no numeric coercion.
fn value_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Extract a JSON object from LLM output (handles markdown wrapping).
fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();

    // Already a JSON object
    if trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    // Wrapped in a markdown code block
    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return inner.to_string();
            }
        }
    }

    // Fall back to outermost object bounds
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}
