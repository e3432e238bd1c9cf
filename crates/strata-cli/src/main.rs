use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use strata_compiler::compile_project;

/// Strata - compile warehouse transformation projects into dependency graphs
#[derive(Parser)]
#[command(name = "strata")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile the project into a validated dependency graph
    Compile {
        /// Project directory holding strata.toml
        #[arg(short, long, default_value = ".")]
        project_dir: PathBuf,

        /// Output file for the compiled graph JSON (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Compile {
            project_dir,
            output,
        } => compile_command(&project_dir, output.as_deref(), cli.verbose),
    }
}

fn compile_command(project_dir: &Path, output: Option<&Path>, verbose: bool) -> Result<()> {
    if verbose {
        eprintln!(
            "{} project at {}",
            "Compiling".cyan(),
            project_dir.display()
        );
    }

    let graph = match compile_project(project_dir) {
        Ok(graph) => graph,
        Err(error) => {
            eprintln!("{} {error}", "Compilation failed:".red().bold());
            std::process::exit(1);
        }
    };

    // Collected errors leave the graph emittable; surface them as warnings.
    for error in &graph.graph_errors {
        eprintln!("{} {error}", "warning:".yellow().bold());
    }

    let json = serde_json::to_string_pretty(&graph).context("serializing compiled graph")?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("writing {}", path.display()))?;
            eprintln!(
                "{} {} actions to {}",
                "Compiled".green(),
                graph.action_count(),
                path.display()
            );
        }
        None => println!("{json}"),
    }

    Ok(())
}
