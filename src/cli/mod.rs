//! CLI argument parsing types.
//!
//! This module provides the command-line interface structure for the alasco binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::models::{DocumentParent, EntityType};

/// Alasco API command-line interface.
#[derive(Parser, Debug)]
#[command(name = "alasco", about = "Alasco API CLI", version)]
pub struct Cli {
    /// Output results as JSON instead of a table.
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Log every request and download.
    #[arg(short, long, global = true, default_value = "false")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch all entity tables, optionally scoped to one property.
    Fetch {
        /// Exact name of the property to scope to.
        #[arg(long)]
        property: Option<String>,

        /// Keep only projects whose name contains this text.
        #[arg(long)]
        project: Option<String>,

        /// Print only this entity's table.
        #[arg(long, value_parser = parse_entity)]
        entity: Option<EntityType>,
    },

    /// Fetch tables and download every document.
    Download {
        /// Exact name of the property to scope to.
        #[arg(long)]
        property: Option<String>,

        /// Keep only projects whose name contains this text.
        #[arg(long)]
        project: Option<String>,

        /// Root directory for downloads.
        #[arg(long, env = "ALASCO_DOWNLOAD_PATH")]
        output: Option<PathBuf>,
    },

    /// Upload a file as a document of a contract, invoice or change order.
    Upload {
        /// Kind of the owning entity: contract, invoice or change_order.
        #[arg(value_parser = parse_parent)]
        parent: DocumentParent,

        /// Id of the owning entity.
        id: String,

        /// File to upload.
        file: PathBuf,

        /// Document type, e.g. CONTRACT or INVOICE.
        #[arg(long = "type")]
        document_type: String,

        /// Name stored by the API (defaults to the file's name).
        #[arg(long)]
        name: Option<String>,
    },
}

fn parse_entity(s: &str) -> Result<EntityType, String> {
    s.parse()
}

fn parse_parent(s: &str) -> Result<DocumentParent, String> {
    s.replace('-', "_").parse()
}
