//! Flowgauge CLI - batch evaluation of generated workflows and executions

mod load;

use anyhow::{Context, Result, bail};
use clap::Parser;
use flowgauge_core::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "flowgauge")]
#[command(about = "Workflow evaluation metrics", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory of workflow_*.json files
    #[arg(long, default_value = "data/workflows")]
    workflows: PathBuf,

    /// Directory of execution_*.json files
    #[arg(long, default_value = "data/executions")]
    executions: PathBuf,

    /// Path to the reference constraints document (JSON or YAML)
    #[arg(long)]
    reference: Option<PathBuf>,

    /// Path to the tool catalog (JSON array of tool specs)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Embedding vector dimension for the built-in local provider
    #[arg(long, default_value_t = 256)]
    dimension: usize,

    /// Compute similarity scores between workflows
    #[arg(long)]
    workflow_similarity: bool,

    /// Compute similarity scores between executions
    #[arg(long)]
    execution_similarity: bool,

    /// Compute correctness scores against reference constraints
    #[arg(long)]
    correctness_scores: bool,

    /// Compute intent resolution scores for workflows
    #[arg(long)]
    intent_resolution: bool,

    /// Compute reasoning coherence scores for workflows
    #[arg(long)]
    reasoning_coherence: bool,

    /// Compute all metrics
    #[arg(long)]
    all: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut cli = Cli::parse();
    if cli.all {
        cli.workflow_similarity = true;
        cli.execution_similarity = true;
        cli.correctness_scores = true;
        cli.intent_resolution = true;
        cli.reasoning_coherence = true;
    }

    let catalog = match &cli.catalog {
        Some(path) => ToolCatalog::load(path)
            .with_context(|| format!("loading tool catalog from {}", path.display()))?,
        None => ToolCatalog::new(),
    };
    let provider = HashedNgramEmbeddings::new(cli.dimension)?;
    let evaluator = Evaluator::new(Arc::new(provider), Arc::new(catalog));

    let workflows = if cli.workflows.is_dir() {
        load::load_workflows(&cli.workflows)?
    } else {
        Vec::new()
    };
    for (i, (name, _)) in workflows.iter().enumerate() {
        println!("Loaded workflow {} ({})", i + 1, name);
    }

    if cli.workflow_similarity && !workflows.is_empty() {
        let batch: Vec<Workflow> = workflows.iter().map(|(_, w)| w.clone()).collect();
        let matrix = evaluator.workflow_similarity(&batch).await?;
        print_matrix_report("Workflow similarity", &matrix, &workflows);
    } else {
        println!("Skipping workflow similarities...\n");
    }

    let executions = if cli.executions.is_dir() {
        load::load_executions(&cli.executions)?
    } else {
        Vec::new()
    };
    for (i, (name, _)) in executions.iter().enumerate() {
        println!("Loaded execution {} ({})", i + 1, name);
    }

    if cli.execution_similarity && !executions.is_empty() {
        let batch: Vec<ExecutionState> = executions.iter().map(|(_, e)| e.clone()).collect();
        let matrix = evaluator.execution_similarity(&batch).await?;
        print_matrix_report("Execution similarity", &matrix, &executions);
    } else {
        println!("Skipping execution similarities...\n");
    }

    if cli.correctness_scores {
        let Some(reference_path) = &cli.reference else {
            bail!("--correctness-scores requires --reference");
        };
        let reference = ReferenceSpec::load(reference_path)?;
        println!("Correctness scores:");
        for (name, workflow) in &workflows {
            let report = evaluator.correctness(workflow, &reference);
            println!(
                "  {}: weighted {:.3} (tool {:.3}, llm {:.3}, steps {:.3}, branches {:.3}; mean {:.3})",
                name,
                report.weighted,
                report.tool_score,
                report.llm_score,
                report.step_score,
                report.transition_score,
                report.mean,
            );
        }
        println!();
    } else {
        println!("Skipping correctness scores...\n");
    }

    if cli.intent_resolution && !workflows.is_empty() {
        println!("Intent resolution scores:");
        for (name, workflow) in &workflows {
            let report = evaluator.intent_resolution(workflow).await?;
            println!(
                "  {}: {:.3} (objective {:.3}, over-interpretation {:.3})",
                name, report.score, report.objective_alignment, report.over_interpretation,
            );
        }
        println!();
    } else {
        println!("Skipping intent resolution scores...\n");
    }

    if cli.reasoning_coherence && !workflows.is_empty() {
        println!("Reasoning coherence scores:");
        for (name, workflow) in &workflows {
            let report = evaluator.reasoning_coherence(workflow).await?;
            println!(
                "  {}: {:.3} (continuity {:.3}, transitions {:.3}, structure {:.3}, alignment {:.3})",
                name,
                report.overall,
                report.thought_continuity,
                report.transition_validity,
                report.structural.score,
                report.action_alignment,
            );
            for issue in &report.structural.issues {
                println!("    structural issue: {:?}", issue);
            }
        }
        println!();
    } else {
        println!("Skipping reasoning coherence scores...\n");
    }

    Ok(())
}

fn print_matrix_report<T>(title: &str, matrix: &SimilarityMatrix, items: &[(String, T)]) {
    println!("{} ({} items):", title, matrix.len());
    match matrix.stats() {
        Some(stats) => println!(
            "  mean {:.3}  std {:.3}  min {:.3}  max {:.3}  ({} pairs)",
            stats.mean, stats.std_dev, stats.min, stats.max, stats.pairs,
        ),
        None => println!("  not enough items for pairwise statistics"),
    }
    if let Some(idx) = matrix.most_representative() {
        println!("  most representative: {}", items[idx].0);
    }
    println!();
}
