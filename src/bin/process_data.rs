use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use disaster_response::{Config, EtlConfig, EtlPipeline, JoinPolicy, OutOfRangePolicy, Storage};

#[derive(Parser, Debug)]
#[command(name = "process_data")]
#[command(version = "0.1.0")]
#[command(about = "Merge and clean disaster messages and their categories into SQLite")]
struct Args {
    /// Messages CSV (id,message,original,genre)
    messages: PathBuf,

    /// Categories CSV (id,categories)
    categories: PathBuf,

    /// SQLite database to write the cleaned table to
    database: PathBuf,

    /// Table name (defaults to TABLE_NAME or message_categories)
    #[arg(long)]
    table: Option<String>,

    /// inner or strict
    #[arg(long)]
    join_policy: Option<JoinPolicy>,

    /// drop, clamp or reject category values outside 0/1
    #[arg(long)]
    out_of_range: Option<OutOfRangePolicy>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("disaster_response=info".parse()?),
        )
        .init();

    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = Config::from_env()?;

    let mut etl_config = EtlConfig::from(&config);
    if let Some(table) = args.table {
        etl_config.table_name = table;
    }
    if let Some(policy) = args.join_policy {
        etl_config.join_policy = policy;
    }
    if let Some(policy) = args.out_of_range {
        etl_config.out_of_range = policy;
    }

    tracing::info!(
        "Processing {} and {} into {}",
        args.messages.display(),
        args.categories.display(),
        args.database.display()
    );

    let storage = Storage::new(&args.database)?;
    let pipeline = EtlPipeline::new(storage, etl_config);
    let report = match pipeline.run(&args.messages, &args.categories) {
        Ok(report) => report,
        Err(e) => {
            if e.is_data_error() {
                tracing::error!("Input data rejected, nothing was written: {}", e);
            }
            return Err(e.into());
        }
    };

    println!("{}", report);
    println!("Cleaned data saved to database!");

    Ok(())
}
