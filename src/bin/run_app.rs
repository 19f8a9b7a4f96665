use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use disaster_response::app::serve;
use disaster_response::{AppContext, Config, ServiceConfig};

#[derive(Parser, Debug)]
#[command(name = "run_app")]
#[command(version = "0.1.0")]
#[command(about = "Serve disaster message classifications over HTTP")]
struct Args {
    /// Model artifact written by train_classifier
    #[arg(long)]
    model: Option<String>,

    /// SQLite database for the dataset overview
    #[arg(long)]
    database: Option<String>,

    /// Table name (defaults to TABLE_NAME or message_categories)
    #[arg(long)]
    table: Option<String>,

    /// Address to listen on
    #[arg(long)]
    bind: Option<String>,

    /// Serve at this decision threshold instead of the trained one
    #[arg(long)]
    threshold: Option<f64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("disaster_response=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = Config::from_env()?;

    let mut service_config = ServiceConfig::from(&config);
    if let Some(model) = args.model {
        service_config.model_path = model;
    }
    if let Some(database) = args.database {
        service_config.database_path = Some(database);
    }
    if let Some(table) = args.table {
        service_config.table_name = table;
    }
    if let Some(threshold) = args.threshold {
        if !(0.0..=1.0).contains(&threshold) {
            anyhow::bail!("threshold must be within [0, 1], got {}", threshold);
        }
        service_config.decision_threshold = Some(threshold);
    }
    let bind_addr = args.bind.unwrap_or(config.bind_addr);

    let context = AppContext::load(&service_config)?;
    tracing::info!("Serving {} categories", context.categories().len());

    serve(Arc::new(context), &bind_addr).await?;

    Ok(())
}
