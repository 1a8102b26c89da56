//! Chokepoint CLI: run the bottleneck pipeline over an edge list

mod loader;

use anyhow::{Context, Result};
use chokepoint::query::{bottleneck_summary, bottlenecks, graph_stats};
use chokepoint::{
    AlgorithmRunReport, AnalyticsConfig, PipelineOrchestrator, RunOptions, SharedGraph, Stage,
};
use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chokepoint", version, about = "Social graph bottleneck analytics")]
struct Cli {
    /// YAML analytics configuration
    #[arg(long, global = true, env = "CHOKEPOINT_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one algorithm (bottleneck also runs the stages it depends on)
    Run {
        /// Edge list file
        edges: PathBuf,
        /// degree, pagerank, betweenness, louvain or bottleneck
        algorithm: String,
        /// Iterations for pagerank and louvain
        #[arg(long)]
        iterations: Option<usize>,
        /// Bottleneck threshold override
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Run the full pipeline and list the top bottlenecks
    Pipeline {
        /// Edge list file
        edges: PathBuf,
        /// Number of bottlenecks to list
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// List available algorithms
    Algorithms,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Commands::Run {
            edges,
            algorithm,
            iterations,
            threshold,
        } => {
            let mut options = RunOptions::new();
            options.iterations = *iterations;
            options.threshold = *threshold;
            run_algorithm(&cli, edges, algorithm, &options)
        }
        Commands::Pipeline { edges, top } => run_pipeline(&cli, edges, *top).await,
        Commands::Algorithms => list_algorithms(&cli.format),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<AnalyticsConfig> {
    AnalyticsConfig::from_yaml_and_env(cli.config.as_deref()).context("invalid configuration")
}

fn orchestrator_for(cli: &Cli, edges: &Path) -> Result<PipelineOrchestrator> {
    let config = load_config(cli)?;
    let (store, stats) = loader::load_edges(edges)?;
    tracing::info!(
        accounts = store.account_count(),
        follows = stats.follows,
        duplicates = stats.duplicates,
        self_follows = stats.self_follows,
        "edge list loaded"
    );
    Ok(PipelineOrchestrator::new(SharedGraph::new(store), config)?)
}

fn run_algorithm(cli: &Cli, edges: &Path, algorithm: &str, options: &RunOptions) -> Result<()> {
    let orchestrator = orchestrator_for(cli, edges)?;

    let mut reports = Vec::new();
    if let Ok(stage) = algorithm.parse::<Stage>() {
        if stage == Stage::Bottleneck {
            for prerequisite in [Stage::PageRank, Stage::Betweenness, Stage::Community] {
                reports.push(orchestrator.run_algorithm(prerequisite.name(), options));
            }
        }
    }
    reports.push(orchestrator.run_algorithm(algorithm, options));

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        OutputFormat::Table => print_reports(&reports),
    }

    match reports.iter().find(|r| !r.is_completed()) {
        Some(failed) => anyhow::bail!("{} failed: {}", failed.algorithm, failed.message),
        None => Ok(()),
    }
}

async fn run_pipeline(cli: &Cli, edges: &Path, top: usize) -> Result<()> {
    let orchestrator = Arc::new(orchestrator_for(cli, edges)?);
    let report = Arc::clone(&orchestrator)
        .spawn_run_all(RunOptions::default())
        .await;

    let store = orchestrator.graph().read()?;
    let stats = graph_stats(&store);
    let summary = bottleneck_summary(&store);
    let top_bottlenecks = bottlenecks(&store, 0.0, None, top);

    match cli.format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "pipeline": report,
                "graph": stats,
                "summary": summary,
                "bottlenecks": top_bottlenecks,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            print_reports(&report.stages);
            println!(
                "{} accounts, {} follows, {} communities",
                stats.account_count, stats.follow_count, stats.community_count
            );

            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec![
                "account",
                "community",
                "bottleneck_score",
                "bridge_score",
                "pagerank",
                "betweenness",
                "influence_radius",
            ]);
            for detail in &top_bottlenecks {
                let attrs = &detail.account.attributes;
                table.add_row(vec![
                    detail.account.key.to_string(),
                    detail.account.community.to_string(),
                    format_score(attrs.bottleneck_score),
                    format_score(attrs.bridge_score),
                    format_score(attrs.pagerank),
                    format_score(attrs.betweenness_centrality),
                    detail.influence_radius.to_string(),
                ]);
            }
            println!("{}", table);
            println!(
                "{} of {} accounts flagged as bottlenecks",
                summary.bottleneck_count, summary.total_analyzed
            );
        }
    }

    if !report.is_completed() {
        anyhow::bail!(report.message);
    }
    Ok(())
}

fn list_algorithms(format: &OutputFormat) -> Result<()> {
    let algorithms = chokepoint::pipeline::available_algorithms();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&algorithms)?),
        OutputFormat::Table => {
            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["name", "depends on", "description"]);
            for info in &algorithms {
                table.add_row(vec![
                    info.name.to_string(),
                    info.depends_on.join(", "),
                    info.description.to_string(),
                ]);
            }
            println!("{}", table);
        }
    }
    Ok(())
}

fn print_reports(reports: &[AlgorithmRunReport]) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["algorithm", "status", "ms", "accounts", "summary"]);
    for report in reports {
        let status = serde_json::to_value(report.status)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        let summary = if report.is_completed() {
            serde_json::Value::Object(report.summary.clone()).to_string()
        } else {
            report.message.clone()
        };
        table.add_row(vec![
            report.algorithm.clone(),
            status,
            report.execution_time_ms.to_string(),
            report.nodes_processed.to_string(),
            summary,
        ]);
    }
    println!("{}", table);
}

fn format_score(value: Option<f64>) -> String {
    value.map(|v| format!("{:.4}", v)).unwrap_or_else(|| "-".to_string())
}
