use anyhow::Context;
use clap::Parser;
use kdrisk_core::{RawInput, Task};
use kdrisk_models::{ExplanationStatus, ModelRegistry, PipelineOutcome, PredictionPipeline};
use kdrisk_server::cli::{Cli, Commands, OutputFormat};
use kdrisk_server::config::ServerConfig;
use kdrisk_server::server::run_server;
use kdrisk_server::state::AppState;
use kdrisk_server::telemetry::{init_logging, init_metrics};
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let args = cli.command.config_args();
    init_logging(args.verbose);

    let config = ServerConfig::load(args)?;

    match cli.command {
        Commands::Serve { port, address, .. } => {
            let config = config.with_listener(address, port);
            let addr = config.socket_addr()?;

            let registry = Arc::new(ModelRegistry::load(&config.artifacts)?);
            if !registry.is_ready() {
                tracing::warn!("Some models failed to load; affected tasks will report unavailable");
            }

            let metrics = init_metrics()?;
            let state = AppState::new(registry)
                .with_metrics(metrics)
                .with_cors_origins(config.cors_origins());

            println!();
            println!("  Kawasaki Disease Prediction System");
            println!("  Models:  {}", config.artifacts.models_dir.display());
            println!();
            println!("  Open http://{} in your browser", addr);
            println!();

            run_server(state, addr).await?;
        }

        Commands::Predict {
            task,
            ref input,
            format,
            ..
        } => {
            let values = read_input(input)?;
            let registry = Arc::new(ModelRegistry::load(&config.artifacts)?);
            let pipeline = PredictionPipeline::new(registry);
            let outcome = pipeline.run(task, values)?;

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
                OutputFormat::Text => print_outcome(&outcome),
            }
        }

        Commands::Fields { task, .. } => {
            let catalog = config
                .artifacts
                .tasks
                .get(&task)
                .map(|t| t.catalog.catalog())
                .unwrap_or_else(|| kdrisk_models::CatalogId::canonical(task).catalog());
            print_fields(task, catalog);
        }
    }

    Ok(())
}

/// Feature values from a JSON or YAML mapping; `null` marks a field not entered
fn read_input(path: &Path) -> anyhow::Result<RawInput> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file {}", path.display()))?;

    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

    let values = if is_yaml {
        serde_yaml::from_str(&content)?
    } else {
        serde_json::from_str(&content)?
    };
    Ok(values)
}

fn print_outcome(outcome: &PipelineOutcome) {
    println!("{}", outcome.task.title());
    println!(
        "  {}: {:.1}%",
        outcome.task.probability_label(),
        outcome.probability() * 100.0
    );
    println!("  Result:   {}", outcome.outcome_label());
    println!("  Tier:     {}", outcome.risk_tier());
    println!("  Guidance: {}", outcome.guidance());
    println!();

    match &outcome.explanation {
        ExplanationStatus::Explained(attribution) => {
            println!("Feature contributions (base value {:.3}):", attribution.base_value);
            for entry in attribution.ranked(15) {
                println!(
                    "  {:<45} {:>10}  {:+.4}",
                    entry.label, entry.display_value, entry.shap_value
                );
            }
        }
        ExplanationStatus::Unavailable(reason) => println!("No explanation: {}", reason),
        ExplanationStatus::Failed(reason) => println!("SHAP analysis error: {}", reason),
    }
}

fn print_fields(task: Task, catalog: &kdrisk_models::Catalog) {
    println!("{} ({} catalog, {} fields)", task.title(), catalog.id, catalog.len());
    for (i, spec) in catalog.fields.iter().enumerate() {
        println!(
            "  {:>2}  {:<22} {:<45} {}",
            i, spec.name, spec.display_label, spec.unit
        );
    }
}
