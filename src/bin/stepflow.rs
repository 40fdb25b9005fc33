use std::path::PathBuf;

use clap::{Parser, Subcommand};
use stepflow::cli::{cli_registry, run_workflow_file};
use stepflow::utils::LoggingConfig;
use stepflow::load_workflow_from_file;

#[derive(Parser)]
#[command(name = "stepflow", version, about = "Stepflow workflow engine CLI", author)]
struct Cli {
    /// Tracing filter directive, overrides RUST_LOG (e.g. `stepflow=debug`)
    #[arg(long, global = true)]
    log: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a workflow definition once and print the step results
    Run {
        #[arg(long)]
        workflow: PathBuf,
        #[arg(long)]
        payload: Option<PathBuf>,
        /// Fail steps whose tokens do not resolve instead of substituting ""
        #[arg(long)]
        strict: bool,
        /// Pretty-print the JSON report
        #[arg(long)]
        pretty: bool,
    },
    /// Load and validate a workflow definition
    Validate {
        #[arg(long)]
        workflow: PathBuf,
    },
    /// List the integrations available to `run`
    Integrations,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.log.as_deref() {
        Some(filter) => LoggingConfig::init_with_filter(filter),
        None => LoggingConfig::init(),
    }

    match cli.command {
        Command::Run {
            workflow,
            payload,
            strict,
            pretty,
        } => handle_run(workflow, payload, strict, pretty).await?,
        Command::Validate { workflow } => handle_validate(workflow)?,
        Command::Integrations => handle_integrations(),
    }
    Ok(())
}

async fn handle_run(
    workflow: PathBuf,
    payload: Option<PathBuf>,
    strict: bool,
    pretty: bool,
) -> anyhow::Result<()> {
    let report = run_workflow_file(&workflow, payload.as_deref(), strict).await?;
    let content = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{content}");
    Ok(())
}

fn handle_validate(path: PathBuf) -> anyhow::Result<()> {
    let workflow = load_workflow_from_file(&path)?;
    println!(
        "Workflow `{}` ({}) is valid: {} step(s), trigger {}/{}",
        workflow.name,
        workflow.id,
        workflow.steps.len(),
        workflow.trigger.source,
        workflow.trigger.trigger_type
    );
    Ok(())
}

fn handle_integrations() {
    let registry = cli_registry();
    println!("{:<16} Actions", "Integration");
    for name in registry.integration_names() {
        let actions = registry
            .get_integration(name)
            .map(|integration| integration.action_names().join(", "))
            .unwrap_or_default();
        println!("{:<16} {}", name, actions);
    }
}
