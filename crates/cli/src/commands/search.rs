//! Search command handler.

use clap::Args;
use semdoc_core::config::AppConfig;

/// List the fragments most similar to a query
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Query text
    pub query: String,

    /// Number of fragments to list
    #[arg(short = 'k', long, default_value = "3")]
    pub top_k: usize,
}

impl SearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Executing search command for store '{}'", config.store);

        let (service, _) = super::open_service(config)?;
        let listing = service.search_similar(&self.query, self.top_k).await?;

        println!("{}", listing);
        Ok(())
    }
}
