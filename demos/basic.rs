//! Basic example demonstrating the Alasco API client.
//!
//! Run with:
//! ```
//! ALASCO_API_TOKEN=your-token ALASCO_API_KEY=your-key cargo run --example basic -- "Property name"
//! ```

use alasco::{
    AlascoClient, Config, DataFetcher, DocumentDownloader, EntityType, PrettyPrint,
};

#[tokio::main]
async fn main() -> alasco::Result<()> {
    // Initialize tracing for debugging (optional)
    tracing_subscriber::fmt::init();

    let property = std::env::args().nth(1);

    // Create client from environment variables
    println!("Creating Alasco client...");
    let config = Config::from_env()?;
    let client = AlascoClient::new(&config)?;
    println!("Connected to: {}", client.base_url());

    // Fetch every table, scoped to the property if one was given
    println!("\n--- Fetching Tables ---");
    let fetcher = DataFetcher::new(client.clone());
    let tables = fetcher.get_all_df(property.as_deref()).await?;
    println!("{}", tables.pretty_print());

    if let Some(contracts) = tables.get(EntityType::Contracts) {
        println!("\n--- First Contracts ---");
        for row in 0..contracts.len().min(5) {
            let id = contracts.first_value(row, &["id"]).unwrap_or_default();
            let name = contracts
                .first_value(row, &["name"])
                .unwrap_or_else(|| "(unnamed)".to_string());
            println!("  - {name} ({id})");
        }
    }

    // Download the documents
    println!("\n--- Downloading Documents ---");
    let report = DocumentDownloader::from_config(client, &config)
        .batch_download_documents(&tables, property.as_deref())
        .await?;
    println!("{}", report.pretty_print());

    println!("\nDone!");
    Ok(())
}
