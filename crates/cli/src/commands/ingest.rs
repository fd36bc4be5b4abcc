//! Ingest command handler.

use anyhow::Context;
use clap::Args;
use semdoc_core::config::AppConfig;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

/// Index a UTF-8 text document, replacing the current store
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Text file to ingest, or `-` for stdin
    pub file: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Executing ingest command for store '{}'", config.store);

        let text = self.read_document().await?;
        let (service, _) = super::open_service(config)?;

        let result = service
            .ingest(&text)
            .await
            .with_context(|| format!("Failed to ingest {}", self.file.display()))?;

        if self.json {
            let output = serde_json::json!({
                "store": config.store,
                "fragmentCount": result.fragment_count,
                "dimension": result.dimension,
                "documentChars": result.document_chars,
                "documentSha256": result.document_sha256,
                "durationSecs": result.duration_secs,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Indexed {} fragments ({} characters, dimension {}) in {:.2}s",
                result.fragment_count,
                result.document_chars,
                result.dimension,
                result.duration_secs
            );
        }

        Ok(())
    }

    async fn read_document(&self) -> anyhow::Result<String> {
        if self.file.as_os_str() == "-" {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("Failed to read document from stdin")?;
            return Ok(text);
        }

        tokio::fs::read_to_string(&self.file)
            .await
            .with_context(|| format!("Failed to read {}", self.file.display()))
    }
}
