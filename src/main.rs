mod client;
mod config;
mod error;
mod fetch;
mod index;
mod normalize;
mod output;
mod records;
mod sync;
#[cfg(test)]
mod testing;
mod traverse;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand};

use crate::client::ShopifyClient;
use crate::config::Settings;
use crate::index::IndexOptions;
use crate::sync::RunSummary;

#[derive(Parser)]
#[command(
    name = "shopify_snapshot",
    about = "Snapshot a Shopify store's products, collections and blogs into paginated JSON"
)]
struct Cli {
    /// Config file (default: ./shopify_snapshot.{toml,json,yaml} when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for the JSON output, overriding `output_dir`
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every resource, write pages, index and run summary
    Sync,
    /// Rebuild data_index.json/.txt from the files already on disk
    Index,
    /// Check the store is reachable with the configured token
    Ping,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let code = match execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }
    code
}

async fn execute(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(dir) = cli.output_dir {
        settings.output_dir = dir;
    }

    match cli.command {
        Commands::Sync => {
            settings.validate_credentials()?;
            let client = ShopifyClient::new(&settings)?;
            let summary = sync::run(&client, &settings).await?;
            print_summary(&summary);
            Ok(if summary.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Index => {
            // Currency is only known from the last sync.
            let currency = RunSummary::load(&settings.output_dir)?.and_then(|s| s.currency);
            let manifest = index::write_index(
                &settings.output_dir,
                &IndexOptions {
                    shop_domain: settings.shop_domain.clone(),
                    currency,
                    page_size: settings.page_size,
                    public_base_url: settings.public_base_url.clone(),
                },
            )?;
            print!("{}", index::render_text(&manifest));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Ping => {
            settings.validate_credentials()?;
            let client = ShopifyClient::new(&settings)?;
            let shop = client::ping(&client, &settings).await?;
            println!(
                "Connected to {} ({}), currency {}",
                shop.name,
                shop.myshopify_domain.as_deref().unwrap_or(&settings.shop_domain),
                shop.currency.as_deref().unwrap_or("-")
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_summary(summary: &RunSummary) {
    println!("{:<32} | {:>7} | {:>5} | {}", "Resource", "Records", "Pages", "Status");
    println!("{}", "-".repeat(64));
    for r in &summary.resources {
        let status = match (&r.error_kind, &r.error) {
            (_, None) => "ok".to_string(),
            (Some(kind), Some(msg)) => format!("{:?}: {}", kind, msg),
            (None, Some(msg)) => msg.clone(),
        };
        println!(
            "{:<32} | {:>7} | {:>5} | {}",
            truncate(&r.name, 32),
            r.records,
            r.pages,
            status
        );
    }
    println!(
        "\n{} of {} resources succeeded",
        summary.succeeded(),
        summary.resources.len()
    );
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max - 3).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
