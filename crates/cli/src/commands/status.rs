//! Status command handler.

use clap::Args;
use semdoc_core::config::AppConfig;
use semdoc_store::{StatusReport, StoreState};

/// Show whether the store is ready and how large it is
#[derive(Args, Debug)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatusCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Executing status command for store '{}'", config.store);

        let (service, _) = super::open_service(config)?;
        let report = service.status().await?;

        if self.json {
            let output = serde_json::json!({
                "store": config.store,
                "location": service.location(),
                "status": report,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", render_status(&config.store, &report));
        }

        Ok(())
    }
}

/// Human-readable status block, sizes in KB.
pub fn render_status(store: &str, report: &StatusReport) -> String {
    let state = match report.state {
        StoreState::Empty => "not created",
        StoreState::Building => "building",
        StoreState::Ready => "ready",
    };

    let mut out = format!("Store '{}': {}", store, state);
    for (name, bytes) in &report.artifacts {
        out.push_str(&format!("\n  {}: {:.2} KB", name, *bytes as f64 / 1024.0));
    }
    if report.exists {
        out.push_str(&format!(
            "\n  total: {:.2} KB",
            report.total_bytes() as f64 / 1024.0
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_render_empty_status() {
        let report = StatusReport {
            state: StoreState::Empty,
            exists: false,
            artifacts: BTreeMap::new(),
        };
        assert_eq!(render_status("default", &report), "Store 'default': not created");
    }

    #[test]
    fn test_render_ready_status() {
        let report = StatusReport {
            state: StoreState::Ready,
            exists: true,
            artifacts: BTreeMap::from([
                ("index.json".to_string(), 1024),
                ("index.vec".to_string(), 2048),
            ]),
        };

        let rendered = render_status("manual", &report);
        assert!(rendered.starts_with("Store 'manual': ready"));
        assert!(rendered.contains("index.vec: 2.00 KB"));
        assert!(rendered.contains("total: 3.00 KB"));
    }
}
