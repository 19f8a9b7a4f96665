use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use disaster_response::ml::metrics::EvaluationReport;
use disaster_response::{
    Config, ParamGrid, Scoring, Storage, TrainingConfig, TrainingOutcome, TrainingPipeline,
};

#[derive(Parser, Debug)]
#[command(name = "train_classifier")]
#[command(version = "0.1.0")]
#[command(about = "Train the multi-label message classifier and save it as a model artifact")]
struct Args {
    /// SQLite database written by process_data
    database: PathBuf,

    /// Where to write the model artifact (JSON)
    model: PathBuf,

    /// Table name (defaults to TABLE_NAME or message_categories)
    #[arg(long)]
    table: Option<String>,

    /// Seed for the train/test split
    #[arg(long)]
    seed: Option<u64>,

    /// Fraction of rows held out for evaluation
    #[arg(long)]
    test_ratio: Option<f64>,

    /// Cross-validation folds for the grid search
    #[arg(long)]
    folds: Option<usize>,

    /// mean_f1 or gmean_f1
    #[arg(long)]
    scoring: Option<Scoring>,

    /// Output format (json, text, markdown)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Output file for the report (defaults to stdout)
    #[arg(short, long)]
    output: Option<String>,

    /// Search a two-candidate grid instead of the full one
    #[arg(long)]
    quick: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("disaster_response=info".parse()?),
        )
        .init();

    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config = Config::from_env()?;
    if let Some(ref table) = args.table {
        config.table_name = table.clone();
    }
    if let Some(seed) = args.seed {
        config.split_seed = seed;
    }
    if let Some(ratio) = args.test_ratio {
        config.test_ratio = ratio;
    }
    if let Some(folds) = args.folds {
        config.cv_folds = folds;
    }
    if let Some(scoring) = args.scoring {
        config.scoring = scoring;
    }
    config.validate()?;

    let grid = if args.quick {
        ParamGrid::quick()
    } else {
        ParamGrid::default()
    };

    let storage = Storage::new(&args.database)?;
    let pipeline = TrainingPipeline::new(storage, TrainingConfig::from(&config))
        .with_grid(grid)
        .with_progress(true);
    let outcome = pipeline.run_and_save(&args.model)?;

    output_report(&outcome, &args)?;
    println!("Trained model saved!");

    Ok(())
}

fn output_report(outcome: &TrainingOutcome, args: &Args) -> anyhow::Result<()> {
    let output = match args.format.as_str() {
        "json" => serde_json::to_string_pretty(&outcome.artifact.evaluation)?,
        "markdown" => format_markdown(outcome),
        _ => format_text(outcome),
    };

    if let Some(ref path) = args.output {
        std::fs::write(path, &output)?;
        tracing::info!("Report written to: {}", path);
    } else {
        println!("{}", output);
    }

    Ok(())
}

fn format_text(outcome: &TrainingOutcome) -> String {
    let mut output = String::new();

    output.push_str("\n=== Model Evaluation ===\n\n");
    output.push_str(&format!(
        "Rows: {} train, {} test\n",
        outcome.train_rows, outcome.test_rows
    ));
    if let Some(search) = &outcome.artifact.search {
        output.push_str(&format!(
            "Best CV score: {:.4} over {} candidates\n",
            search.best_score,
            search.candidates.len()
        ));
        output.push_str(&format!("Best parameters: {:?}\n", search.best));
    }

    let Some(report) = outcome.evaluation() else {
        return output;
    };
    output.push_str(&format!(
        "Overall accuracy: {:.4}\nMean F1: {:.4}\nMulti-output F1: {:.4}\n\n",
        report.overall_accuracy, report.mean_f1, report.multioutput_f1
    ));

    output.push_str(&format!(
        "  {:<24} {:>9} {:>9} {:>9} {:>9} {:>8}\n",
        "category", "precision", "recall", "f1", "accuracy", "support"
    ));
    for c in &report.categories {
        output.push_str(&format!(
            "  {:<24} {:>9.3} {:>9.3} {:>9.3} {:>9.3} {:>8}\n",
            c.category, c.precision, c.recall, c.f1, c.accuracy, c.support
        ));
    }

    output.push_str(&format!(
        "\nTrained on: {}\n",
        outcome.artifact.trained_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    output
}

fn format_markdown(outcome: &TrainingOutcome) -> String {
    let mut output = String::new();

    output.push_str("# Model Evaluation\n\n");
    output.push_str("| Metric | Value |\n|--------|-------|\n");
    output.push_str(&format!("| Training rows | {} |\n", outcome.train_rows));
    output.push_str(&format!("| Test rows | {} |\n", outcome.test_rows));
    if let Some(search) = &outcome.artifact.search {
        output.push_str(&format!("| Best CV score | {:.4} |\n", search.best_score));
    }
    if let Some(report) = outcome.evaluation() {
        push_markdown_metrics(&mut output, report);
    }

    output.push_str(&format!(
        "\n---\n*Trained on {}*\n",
        outcome.artifact.trained_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    output
}

fn push_markdown_metrics(output: &mut String, report: &EvaluationReport) {
    output.push_str(&format!("| Overall accuracy | {:.4} |\n", report.overall_accuracy));
    output.push_str(&format!("| Mean F1 | {:.4} |\n", report.mean_f1));
    output.push_str(&format!("| Multi-output F1 | {:.4} |\n", report.multioutput_f1));

    output.push_str("\n## Per Category\n\n");
    output.push_str("| Category | Precision | Recall | F1 | Accuracy | Support |\n");
    output.push_str("|----------|-----------|--------|----|----------|---------|\n");
    for c in &report.categories {
        output.push_str(&format!(
            "| {} | {:.3} | {:.3} | {:.3} | {:.3} | {} |\n",
            c.category, c.precision, c.recall, c.f1, c.accuracy, c.support
        ));
    }
}
