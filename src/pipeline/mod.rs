//! The extraction pipeline: ingest → extract → compose → send.
//!
//! One run per work item, fully sequential. Every failure is terminal for
//! the run — re-execution belongs to the trigger platform, never to this
//! process.

pub mod composer;
pub mod extractor;
pub mod types;

pub use extractor::Extractor;

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::ingest::{self, WorkItem};
use crate::llm::LlmProvider;
use crate::mailer::MailSender;

/// Orchestrates one work item through the full pipeline.
pub struct Pipeline {
    extractor: Extractor,
    mailer: Arc<dyn MailSender>,
}

impl Pipeline {
    pub fn new(llm: Arc<dyn LlmProvider>, mailer: Arc<dyn MailSender>) -> Self {
        Self {
            extractor: Extractor::new(llm),
            mailer,
        }
    }

    /// Process a single work item: build the thread, extract, compose the
    /// reply, and submit it. On any error no email is sent.
    pub async fn run(&self, item: &WorkItem) -> Result<()> {
        let run_id = Uuid::new_v4();

        let thread = ingest::thread_from_work_item(item)?;
        info!(
            run_id = %run_id,
            sender = %thread.sender,
            subject = %thread.subject,
            "Ingested email thread"
        );

        let result = self.extractor.extract(&thread).await?;
        info!(
            run_id = %run_id,
            account_id = result.account_id.as_deref().unwrap_or("unknown"),
            invoices = result.invoices.len(),
            "Extraction complete"
        );

        let reply = composer::compose_reply(&thread, &result);
        self.mailer.send(&reply).await?;

        info!(run_id = %run_id, to = %reply.to, "Run complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, LlmError, SendError};
    use crate::llm::{CompletionRequest, CompletionResponse};
    use crate::pipeline::types::OutgoingEmail;
    use std::sync::Mutex;

    struct FixedLlm {
        response: String,
    }

    #[async_trait::async_trait]
    impl LlmProvider for FixedLlm {
        fn model_name(&self) -> &str {
            "fixed"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> std::result::Result<CompletionResponse, LlmError> {
            Ok(CompletionResponse {
                content: self.response.clone(),
                input_tokens: 10,
                output_tokens: 10,
            })
        }
    }

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<OutgoingEmail>>,
    }

    #[async_trait::async_trait]
    impl MailSender for RecordingMailer {
        async fn send(&self, email: &OutgoingEmail) -> std::result::Result<(), SendError> {
            self.sent.lock().unwrap().push(email.clone());
            Ok(())
        }
    }

    fn work_item() -> WorkItem {
        let doc = r#"{"email": {
            "from": {"address": "buyer@example.com"},
            "subject": "Invoice #123 overdue",
            "text": "We will pay by Friday.",
            "inReplyTo": "<m1@example.com>",
            "references": ["<m1@example.com>"]
        }}"#;
        ingest::parse_work_items(doc).unwrap().remove(0)
    }

    const RESPONSE: &str = r#"{
        "summary": "Buyer commits to pay by Friday.",
        "account_id": "ACME-001",
        "invoices": [{"invoice_id": "123", "total_value": "5000",
                      "status": "promised", "promised_payment_date": "2024-01-10"}],
        "suggested_reply": "Thank you, we will follow up Monday."
    }"#;

    #[tokio::test]
    async fn run_sends_composed_reply() {
        let mailer = Arc::new(RecordingMailer::default());
        let pipeline = Pipeline::new(
            Arc::new(FixedLlm {
                response: RESPONSE.into(),
            }),
            mailer.clone(),
        );

        pipeline.run(&work_item()).await.unwrap();

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "buyer@example.com");
        assert_eq!(sent[0].subject, "Re: Invoice #123 overdue");
        assert!(sent[0].html_body.contains("Buyer commits to pay by Friday."));
    }

    #[tokio::test]
    async fn run_fails_without_sending_on_bad_response() {
        let mailer = Arc::new(RecordingMailer::default());
        let pipeline = Pipeline::new(
            Arc::new(FixedLlm {
                // No suggested_reply — top-level schema violation.
                response: r#"{"summary": "s", "invoices": []}"#.into(),
            }),
            mailer.clone(),
        );

        let err = pipeline.run(&work_item()).await.unwrap_err();
        assert!(matches!(err, Error::Llm(LlmError::UpstreamFormat { .. })));
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn run_fails_without_llm_call_on_empty_body() {
        let mailer = Arc::new(RecordingMailer::default());
        let pipeline = Pipeline::new(
            Arc::new(FixedLlm {
                response: RESPONSE.into(),
            }),
            mailer.clone(),
        );

        let doc = r#"{"email": {"from": {"address": "a@b.com"}, "subject": "S", "text": ""}}"#;
        let item = ingest::parse_work_items(doc).unwrap().remove(0);

        let err = pipeline.run(&item).await.unwrap_err();
        assert!(matches!(err, Error::Ingest(_)));
        assert!(mailer.sent.lock().unwrap().is_empty());
    }
}
