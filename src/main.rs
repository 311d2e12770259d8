use std::io::Read;
use std::sync::Arc;

use anyhow::Context;

use ar_assist::config::{LlmSecrets, MailerSecrets};
use ar_assist::ingest;
use ar_assist::llm::create_provider;
use ar_assist::mailer::{MailSender, SendGridMailer};
use ar_assist::pipeline::Pipeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // Credentials: two bundles, read once, passed into the components.
    let llm_secrets = LlmSecrets::from_env()?;
    let mailer_secrets = MailerSecrets::from_env()?;

    eprintln!("AR Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", llm_secrets.model);
    eprintln!("   From:  {}", mailer_secrets.from_address);

    let llm = create_provider(&llm_secrets);
    let mailer: Arc<dyn MailSender> = Arc::new(SendGridMailer::from_secrets(&mailer_secrets));
    let pipeline = Pipeline::new(llm, mailer);

    // There should be only one work item per trigger, but the platform may
    // batch several — process each in order, failing the run on the first
    // error so the platform sees the failed state.
    let items = match work_item_path() {
        Some(path) => ingest::load_work_items(std::path::Path::new(&path))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read work item from stdin")?;
            ingest::parse_work_items(&buffer)?
        }
    };
    tracing::info!("Processing {} work item(s)", items.len());

    for item in &items {
        if let Err(e) = pipeline.run(item).await {
            tracing::error!(error = %e, "Run failed — no reply sent");
            return Err(e.into());
        }
    }

    Ok(())
}

/// Locate the work-item file: first CLI argument, then `AR_ASSIST_WORKITEM`.
/// `None` means the document comes from stdin.
fn work_item_path() -> Option<String> {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("AR_ASSIST_WORKITEM").ok())
}
