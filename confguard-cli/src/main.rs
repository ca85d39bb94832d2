//! Command-line interface for ConfGuard: analyze a configuration file,
//! synthesize a minimal autofix, or generate a Markdown report.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;

use confguard::{
    analyze_task, autofix_task, generate_report, AnalysisOutcome, FileType, Finding, GeminiClient,
    Settings, TaskInput, TaskStore,
};

#[derive(Parser)]
#[command(name = "confguard", about = "Security audit and autofix for configuration files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a configuration file and print the findings.
    Analyze {
        /// Path to the configuration file.
        path: PathBuf,
        /// File category: dockerfile, k8s, env, nginx or iam.
        #[arg(long = "file-type", short = 't')]
        file_type: String,
    },
    /// Analyze, then synthesize a minimal corrective patch.
    Autofix {
        /// Path to the configuration file.
        path: PathBuf,
        /// File category: dockerfile, k8s, env, nginx or iam.
        #[arg(long = "file-type", short = 't')]
        file_type: String,
        /// Write the patched file here instead of only printing the diff.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Analyze, then generate a Markdown security report.
    Report {
        /// Path to the configuration file.
        path: PathBuf,
        /// File category: dockerfile, k8s, env, nginx or iam.
        #[arg(long = "file-type", short = 't')]
        file_type: String,
    },
}

fn parse_file_type(s: &str) -> Result<FileType> {
    match s.to_lowercase().as_str() {
        "dockerfile" => Ok(FileType::Dockerfile),
        "k8s" => Ok(FileType::K8s),
        "env" => Ok(FileType::Env),
        "nginx" => Ok(FileType::Nginx),
        "iam" => Ok(FileType::Iam),
        other => bail!("unknown file type '{other}' (expected dockerfile, k8s, env, nginx, iam)"),
    }
}

fn severity_label(finding: &Finding) -> colored::ColoredString {
    use confguard::Severity;
    match finding.severity {
        Severity::Critical => "CRITICAL".red().bold(),
        Severity::High => "HIGH".red(),
        Severity::Medium => "MEDIUM".yellow(),
        Severity::Low => "LOW".green(),
    }
}

fn print_findings(outcome: &AnalysisOutcome) {
    println!("{} {}", "Summary:".bold(), outcome.summary);
    if outcome.findings.is_empty() {
        println!("{}", "No findings.".green());
        return;
    }
    for finding in &outcome.findings {
        let location = finding
            .line_range
            .map(|lr| format!(" (lines {}-{})", lr.0, lr.1))
            .unwrap_or_default();
        println!();
        println!(
            "{} [{}] {}{location}",
            finding.id.cyan(),
            severity_label(finding),
            finding.title.bold()
        );
        println!("  evidence:       {}", finding.evidence);
        println!("  rationale:      {}", finding.rationale);
        println!("  recommendation: {}", finding.recommendation);
    }
}

fn ingest(store: &TaskStore, path: &PathBuf, file_type: &str) -> Result<String> {
    let file_type = parse_file_type(file_type)?;
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let id = store.create_task(
        file_type,
        TaskInput {
            text: Some(text),
            image_base64: None,
        },
    );
    Ok(id)
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::from_env();
    let gateway = GeminiClient::from_settings(&settings)
        .context("set GEMINI_API_KEY to use the hosted audit backend")?;
    let store = TaskStore::new();

    match cli.command {
        Command::Analyze { path, file_type } => {
            let id = ingest(&store, &path, &file_type)?;
            let outcome = analyze_task(&store, &gateway, &settings, &id).await?;
            print_findings(&outcome);
        }
        Command::Autofix { path, file_type, out } => {
            let id = ingest(&store, &path, &file_type)?;
            let outcome = analyze_task(&store, &gateway, &settings, &id).await?;
            print_findings(&outcome);
            if outcome.findings.is_empty() {
                return Ok(());
            }
            println!();
            let diff = autofix_task(&store, &gateway, &settings, &id).await?;
            println!("{diff}");
            if let Some(out) = out {
                let patched = store
                    .get(&id)
                    .and_then(|t| t.patched_text)
                    .context("patched text missing after autofix")?;
                std::fs::write(&out, patched)
                    .with_context(|| format!("failed to write {}", out.display()))?;
                println!("{} {}", "Patched file written to".bold(), out.display());
            }
        }
        Command::Report { path, file_type } => {
            let id = ingest(&store, &path, &file_type)?;
            analyze_task(&store, &gateway, &settings, &id).await?;
            let markdown = generate_report(&store, &gateway, &id).await?;
            println!("{markdown}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::init();
    if let Err(e) = run().await {
        eprintln!("{} {e:#}", "error:".red().bold());
        std::process::exit(1);
    }
}
