//! Outbound mail — transactional email API client.
//!
//! The `MailSender` trait is the seam the pipeline depends on; the real
//! implementation posts to a SendGrid-shaped `mail/send` endpoint. No
//! delivery-status tracking: the lifecycle of an outgoing email ends at
//! submission.

pub mod sendgrid;

pub use sendgrid::SendGridMailer;

use async_trait::async_trait;

use crate::error::SendError;
use crate::pipeline::types::OutgoingEmail;

/// Abstraction over the transactional email backend.
#[async_trait]
pub trait MailSender: Send + Sync {
    /// Submit one email. Success is acceptance by the API, not delivery.
    async fn send(&self, email: &OutgoingEmail) -> Result<(), SendError>;
}
