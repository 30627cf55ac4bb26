use std::sync::Arc;

use anyhow::Context;
use pharma_inquiry::api::{self, PARSE_EMAIL_ALIAS_PATH, PARSE_EMAIL_PATH};
use pharma_inquiry::config::ServiceConfig;
use pharma_inquiry::extraction::ExtractionService;

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

    let config = ServiceConfig::from_env().context("invalid configuration")?;

    eprintln!("💊 Pharma Inquiry v{}", env!("CARGO_PKG_VERSION"));
    match &config.llm {
        Some(llm) => eprintln!("   Model: {}", llm.model),
        None => {
            eprintln!("   Model: none (OPENAI_API_KEY not set, serving fallback records)");
        }
    }
    eprintln!("   Parse API: http://{}{}", config.bind_addr, PARSE_EMAIL_PATH);
    eprintln!("   Alias: http://{}{}", config.bind_addr, PARSE_EMAIL_ALIAS_PATH);

    let service = Arc::new(
        ExtractionService::from_config(&config)
            .await
            .context("failed to start extraction service")?,
    );
    eprintln!("   Database: {}", config.db_path.display());

    let app = api::router(service);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("HTTP server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
