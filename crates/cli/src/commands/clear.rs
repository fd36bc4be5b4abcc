//! Clear command handler.

use clap::Args;
use semdoc_core::config::AppConfig;

/// Remove the persisted store
#[derive(Args, Debug)]
pub struct ClearCommand {}

impl ClearCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Executing clear command for store '{}'", config.store);

        let (service, _) = super::open_service(config)?;

        if service.clear().await? {
            println!("Store '{}' cleared", config.store);
        } else {
            println!("Store '{}' was already empty", config.store);
        }

        Ok(())
    }
}
