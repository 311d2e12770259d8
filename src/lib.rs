//! AR Assist — collections email helper.
//!
//! Receives a forwarded email through the trigger platform's work item,
//! extracts per-invoice payment status with an LLM, and replies into the
//! original thread with an HTML summary via a transactional email API.

pub mod config;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod mailer;
pub mod pipeline;
