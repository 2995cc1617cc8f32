//! Alasco API CLI binary.
//!
//! A command-line interface for fetching Alasco tables and downloading documents.

use std::process::ExitCode;

use alasco::cli::{Cli, Command};
use alasco::{
    AlascoClient, Config, DataFetcher, DocumentDownloader, DocumentUploader, EntityType,
    PrettyPrint, Table,
};
use clap::Parser;
use tracing::Level;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Hint: Set ALASCO_API_TOKEN and ALASCO_API_KEY environment variables");
            return ExitCode::FAILURE;
        }
    };

    match run(config, cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(mut config: Config, cli: Cli) -> alasco::Result<()> {
    let client = AlascoClient::new(&config)?;
    let fetcher = DataFetcher::new(client.clone());

    match cli.command {
        Command::Fetch {
            property,
            project,
            entity: Some(EntityType::ContractingEntities),
        } => {
            if property.is_some() || project.is_some() {
                tracing::warn!("contracting entities are not scoped by property or project");
            }
            let table = fetcher.get_contracting_entities(None).await?;
            print_table(&table, cli.json)?;
        }
        Command::Fetch {
            property,
            project,
            entity,
        } => {
            let tables = fetcher
                .get_all_df_with_project(property.as_deref(), project.as_deref())
                .await?;
            match entity {
                Some(entity) => {
                    let table = tables.get(entity).cloned().unwrap_or_default();
                    print_table(&table, cli.json)?;
                }
                None => {
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(&tables)?);
                    } else {
                        println!("{}", tables.pretty_print());
                    }
                }
            }
        }
        Command::Download {
            property,
            project,
            output,
        } => {
            if let Some(root) = output {
                config = config.with_download_root(root);
            }
            let tables = fetcher
                .get_all_df_with_project(property.as_deref(), project.as_deref())
                .await?;
            let downloader = DocumentDownloader::from_config(client, &config);
            let report = downloader
                .batch_download_documents(&tables, property.as_deref())
                .await?;
            if cli.json {
                let failures: Vec<_> = report
                    .failures()
                    .into_iter()
                    .map(|(id, error)| serde_json::json!({"id": id, "error": error}))
                    .collect();
                let summary = serde_json::json!({
                    "output_dir": report.output_dir,
                    "succeeded": report.succeeded(),
                    "skipped": report.skipped(),
                    "failed": report.failed(),
                    "failures": failures,
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{}", report.pretty_print());
            }
        }
        Command::Upload {
            parent,
            id,
            file,
            document_type,
            name,
        } => {
            let created = DocumentUploader::new(client)
                .upload(parent, &id, &document_type, &file, name.as_deref())
                .await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&created)?);
            } else {
                let document_id = created
                    .pointer("/data/id")
                    .and_then(|v| v.as_str())
                    .unwrap_or("?");
                println!("Uploaded {} to {parent} {id} as document {document_id}", file.display());
            }
        }
    }
    Ok(())
}

fn print_table(table: &Table, json: bool) -> alasco::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(table)?);
    } else {
        println!("{}", table.pretty_print());
    }
    Ok(())
}
