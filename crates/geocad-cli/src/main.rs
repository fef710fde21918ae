//! CLI binary for running and validating geocad projects.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::TryRecvError;

use geocad_io::{write_outputs, ExportOptions, FileSourceAdapter};
use geocad_pipeline::{
    default_registry, validate, DependencyResolver, PipelineEvent, PipelineExecutor, Severity,
};
use geocad_types::GeocadError;

#[derive(Parser)]
#[command(name = "geocad", version, about = "Declarative GeoJSON/Shapefile to DXF layer pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a project and write its DXF drawing and reports
    Run {
        /// Path to the project YAML file
        config: PathBuf,

        /// DXF output path (overrides output.dxf)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Don't write the configured reports
        #[arg(long)]
        skip_reports: bool,
    },

    /// Lint a project and resolve its layer order
    Validate {
        /// Path to the project YAML file
        config: PathBuf,
    },

    /// Show layers, processing order, and dependencies
    Info {
        /// Path to the project YAML file
        config: PathBuf,
    },

    /// List registered operation types
    Operations,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let outcome = match cli.command {
        Commands::Run {
            config,
            output,
            skip_reports,
        } => cmd_run(&config, output, skip_reports),
        Commands::Validate { config } => cmd_validate(&config),
        Commands::Info { config } => cmd_info(&config),
        Commands::Operations => {
            cmd_operations();
            Ok(())
        }
    };

    if let Err(err) = outcome {
        eprintln!("error: {err:#}");
        let code = err
            .downcast_ref::<GeocadError>()
            .map(GeocadError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

fn load_config(path: &Path) -> anyhow::Result<geocad_config::ProjectConfig> {
    Ok(geocad_config::load(path)?)
}

fn cmd_run(path: &Path, output: Option<PathBuf>, skip_reports: bool) -> anyhow::Result<()> {
    let config = load_config(path)?;
    let executor = PipelineExecutor::with_default_registry(FileSourceAdapter::new());
    let mut events = executor.events().subscribe();

    println!("Running project: {}", config.name);
    let result = executor.run(&config);

    loop {
        match events.try_recv() {
            Ok(event) => log_event(&event),
            Err(TryRecvError::Lagged(missed)) => {
                tracing::debug!(missed, "Run events dropped");
            }
            Err(_) => break,
        }
    }
    let result = result?;

    let options = ExportOptions {
        dxf: output,
        skip_reports,
    };
    let summary = write_outputs(&config, &result, &options)?;

    println!("\nProject completed in {} ms", result.duration_ms);
    for name in &result.order {
        if let Some(outcome) = result.layer(name) {
            println!("  {} [{}] {} features", name, outcome.status.as_str(), outcome.feature_count);
        }
    }
    for name in &result.skipped {
        println!("  {} [skipped]", name);
    }
    match summary.dxf {
        Some(ref dxf) => println!("DXF: {} ({} layers)", dxf.display(), summary.dxf_layers.len()),
        None => println!("DXF: not configured"),
    }
    for report in &summary.reports {
        println!("Report: {}", report.display());
    }
    Ok(())
}

fn log_event(event: &PipelineEvent) {
    match serde_json::to_string(event) {
        Ok(json) => tracing::debug!(event = %json, "Run event"),
        Err(_) => tracing::debug!(event = ?event, "Run event"),
    }
}

fn cmd_validate(path: &Path) -> anyhow::Result<()> {
    let config = load_config(path)?;
    let registry = default_registry();
    let diagnostics = validate(&config, &registry);

    let mut has_error = false;
    for diag in &diagnostics {
        let severity = match diag.severity {
            Severity::Error => {
                has_error = true;
                "ERROR"
            }
            Severity::Warning => "WARN",
            Severity::Info => "INFO",
        };
        println!("[{}] {}: {}", severity, diag.rule, diag.message);
        if let Some(ref fix) = diag.fix {
            println!("    fix: {fix}");
        }
    }
    if has_error {
        std::process::exit(2);
    }

    let plan = DependencyResolver::new(&registry).resolve(&config)?;
    println!("Project is valid ({} layers)", plan.order.len());
    Ok(())
}

fn cmd_info(path: &Path) -> anyhow::Result<()> {
    let config = load_config(path)?;
    let registry = default_registry();

    println!("Project: {}", config.name);
    println!("Layers: {}", config.layers.len());
    println!("Reports: {}", config.reports.len());
    if let Some(ref dxf) = config.output.dxf {
        println!("DXF: {}", dxf.display());
    }

    println!("\nLayers:");
    for layer in &config.layers {
        let input = match (&layer.source, &layer.source_layer) {
            (Some(source), _) => format!("source={} ({})", source.path.display(), source.format_label()),
            (None, Some(from)) => format!("source_layer={from}"),
            (None, None) => "generated".to_string(),
        };
        let ops: Vec<&str> = layer.operations.iter().map(|o| o.op_type.as_str()).collect();
        println!(
            "  {}{} {} ops=[{}]",
            layer.name,
            if layer.enabled { "" } else { " (disabled)" },
            input,
            ops.join(", ")
        );
    }

    let plan = DependencyResolver::new(&registry).resolve(&config)?;
    println!("\nProcessing order:");
    for (i, name) in plan.order.iter().enumerate() {
        let deps = plan.dependencies_of(name);
        if deps.is_empty() {
            println!("  {}. {}", i + 1, name);
        } else {
            println!("  {}. {} <- {}", i + 1, name, deps.join(", "));
        }
    }
    Ok(())
}

fn cmd_operations() {
    let registry = default_registry();
    for op_type in registry.types() {
        println!("{op_type}");
    }
}
