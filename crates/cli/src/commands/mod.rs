//! Command handlers for the semdoc CLI.
//!
//! Every command opens the retrieval service of the configured store and
//! calls one of its operations.

pub mod clear;
pub mod ingest;
pub mod query;
pub mod search;
pub mod status;

pub use clear::ClearCommand;
pub use ingest::IngestCommand;
pub use query::QueryCommand;
pub use search::SearchCommand;
pub use status::StatusCommand;

use anyhow::Context;
use semdoc_core::config::AppConfig;
use semdoc_store::{config, RetrievalService, StoreConfig};

/// Open the service for the store named in `app`, with its per-store config.
pub fn open_service(app: &AppConfig) -> anyhow::Result<(RetrievalService, StoreConfig)> {
    let store_config = config::load_config(&app.workspace, &app.store)
        .with_context(|| format!("Failed to load configuration of store '{}'", app.store))?;

    let service = RetrievalService::from_config(&app.workspace, &store_config)?;
    tracing::debug!("Store '{}' at {:?}", store_config.name, service.location());

    Ok((service, store_config))
}
