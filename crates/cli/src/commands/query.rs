//! Query command handler.
//!
//! One-shot mode answers a single question. Interactive mode keeps one service
//! open so the provider and the loaded index stay warm across questions.

use clap::Args;
use semdoc_core::config::AppConfig;
use semdoc_store::{QueryResult, RetrievalService};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Retrieve the document fragments relevant to a question
#[derive(Args, Debug)]
pub struct QueryCommand {
    /// Question text (omit with --interactive)
    pub question: Option<String>,

    /// Number of fragments to retrieve (default: the store's default_top_k)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Read questions from stdin until `quit` or `exit`
    #[arg(short, long)]
    pub interactive: bool,
}

/// What an interactive input line asks for.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Quit,
    Status,
    Blank,
    Question(&'a str),
}

fn classify(line: &str) -> Input<'_> {
    let trimmed = line.trim();
    match trimmed.to_lowercase().as_str() {
        "quit" | "exit" => Input::Quit,
        "status" => Input::Status,
        "" => Input::Blank,
        _ => Input::Question(trimmed),
    }
}

impl QueryCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Executing query command for store '{}'", config.store);

        let (service, store_config) = super::open_service(config)?;
        let top_k = self.top_k.unwrap_or(store_config.default_top_k);

        if self.interactive {
            return self.run_interactive(config, &service, top_k).await;
        }

        let Some(question) = self.question.as_deref() else {
            anyhow::bail!("A question is required unless --interactive is given");
        };

        let result = service.query(question, top_k).await?;
        self.print_result(&result)?;

        Ok(())
    }

    async fn run_interactive(
        &self,
        config: &AppConfig,
        service: &RetrievalService,
        top_k: usize,
    ) -> anyhow::Result<()> {
        println!(
            "Querying store '{}'. Type 'status' for store status, 'quit' or 'exit' to leave.",
            config.store
        );

        if let Some(question) = self.question.as_deref() {
            self.answer(service, question, top_k).await;
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("question> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };

            match classify(&line) {
                Input::Quit => break,
                Input::Blank => println!("Please enter a question."),
                Input::Status => match service.status().await {
                    Ok(report) => println!("{}", super::status::render_status(&config.store, &report)),
                    Err(e) => eprintln!("Error: {}", e),
                },
                Input::Question(question) => self.answer(service, question, top_k).await,
            }
        }

        println!("Bye.");
        Ok(())
    }

    /// Answer one interactive question; failures are reported and the loop goes on.
    async fn answer(&self, service: &RetrievalService, question: &str, top_k: usize) {
        let outcome = match service.query(question, top_k).await {
            Ok(result) => self.print_result(&result),
            Err(e) => Err(e.into()),
        };

        if let Err(e) = outcome {
            tracing::warn!("Query failed: {}", e);
            eprintln!("Error: {}", e);
        }
    }

    fn print_result(&self, result: &QueryResult) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(result)?);
        } else {
            println!("{}", result.render_context());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_input() {
        assert_eq!(classify("quit"), Input::Quit);
        assert_eq!(classify("  EXIT \n"), Input::Quit);
        assert_eq!(classify("status"), Input::Status);
        assert_eq!(classify("   "), Input::Blank);
        assert_eq!(
            classify(" what is ownership? "),
            Input::Question("what is ownership?")
        );
    }
}
