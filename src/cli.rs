use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use biomind::access::InMemoryUsageLedger;
use biomind::analysis::{Organism, ParsedFileContext, SequenceAnalyzer};
use biomind::classifier::classify;
use biomind::config::{CliOverrides, Config, load_config};
use biomind::orchestrator::{Query, QueryOrchestrator};
use biomind::providers::ProviderRouter;
use biomind::session::ConversationStore;
use biomind::utils::BioMindError;

#[derive(Parser)]
#[command(name = "biomind")]
#[command(about = "biomind - bioinformatics research assistant")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a JSON config file (default: ~/.biomind/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Display version information
    Version,

    /// Classify a query's intent, tone and bio query type
    Classify {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// GC content and composition of a sequence
    Gc { sequence: String },

    /// Scan a sequence for guide RNA candidates
    Guides {
        sequence: String,

        /// PAM pattern in IUPAC letters (default from config, usually NGG)
        #[arg(long)]
        pam: Option<String>,
    },

    /// Check whether a primer pair can amplify a template
    Pcr {
        #[arg(long)]
        forward: String,

        #[arg(long)]
        reverse: String,

        #[arg(long)]
        template: String,
    },

    /// Substitute each codon with the host's preferred synonymous codon
    Codons {
        sequence: String,

        /// Host organism: ecoli, human or yeast
        #[arg(long)]
        organism: Option<String>,
    },

    /// List configured subscription tiers
    Tiers,

    /// Run a query through the full orchestrator
    Ask {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Attach a sequence or data file
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,

        /// Tier to evaluate the query under; overrides the configured default
        #[arg(long, value_name = "NAME")]
        tier: Option<String>,

        /// Caller identifier used for quotas and the session
        #[arg(long, value_name = "ID", default_value = "local")]
        caller: String,
    },
}

pub fn run(cli: Cli) {
    match execute(cli) {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("error: {e:#}");
            if let Some(err) = e.downcast_ref::<BioMindError>() {
                if err.severity() == tracing::Level::ERROR {
                    tracing::error!(error = %err, recoverable = err.is_recoverable(), "Command failed");
                } else {
                    tracing::debug!(error = %err, recoverable = err.is_recoverable(), "Command failed");
                }
                if let Some(hint) = err.suggestion() {
                    eprintln!("hint: {hint}");
                }
            }
            process::exit(1);
        }
    }
}

fn execute(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        print_help();
        return Ok(());
    };

    match command {
        Commands::Version => {
            print_version();
            Ok(())
        }
        Commands::Classify { text } => print_json(&classify(&text.join(" "))),
        Commands::Gc { sequence } => {
            let analyzer = SequenceAnalyzer::default();
            print_json(&json!({
                "length": sequence.trim().len(),
                "gc_content": analyzer.gc_content(&sequence),
                "composition": analyzer.composition(&sequence),
            }))
        }
        Commands::Guides { sequence, pam } => {
            let overrides = CliOverrides {
                guide_pam: pam.map(|p| p.to_ascii_uppercase()),
                ..CliOverrides::default()
            };
            let config = load_config(&overrides, cli.config)?;
            let analyzer = config.analyzer();
            print_json(&json!({
                "pam": analyzer.pam(),
                "candidates": analyzer.scan_guide_candidates(&sequence),
            }))
        }
        Commands::Pcr {
            forward,
            reverse,
            template,
        } => print_json(&SequenceAnalyzer::default().pcr_feasibility(&forward, &reverse, &template)),
        Commands::Codons { sequence, organism } => {
            let config = load_config(&CliOverrides::default(), cli.config)?;
            let organism = organism
                .map(|name| {
                    Organism::from_name(&name).ok_or_else(|| {
                        BioMindError::invalid_input(format!(
                            "unknown organism '{name}' (expected ecoli, human or yeast)"
                        ))
                    })
                })
                .transpose()?;
            let analyzer = config.analyzer();
            let organism = organism.unwrap_or(analyzer.default_organism());
            print_json(&json!({
                "organism": organism.as_str(),
                "result": analyzer.optimize_codons(&sequence, Some(organism)),
            }))
        }
        Commands::Tiers => {
            let config = load_config(&CliOverrides::default(), cli.config)?;
            print_json(&config.tiers)
        }
        Commands::Ask {
            text,
            file,
            tier,
            caller,
        } => {
            let overrides = CliOverrides {
                default_tier: tier,
                ..CliOverrides::default()
            };
            let config = load_config(&overrides, cli.config)?;
            ask(&config, text.join(" "), file.as_deref(), &caller)
        }
    }
}

fn ask(config: &Config, text: String, file: Option<&Path>, caller: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(BioMindError::invalid_input("query text must not be empty").into());
    }

    let mut query = Query::new(text);
    if let Some(path) = file {
        query = query.with_file(read_attachment(path)?);
    }
    let ctx = config.request_context(caller, None)?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let response = runtime.block_on(async {
        let store = Arc::new(ConversationStore::new(config.session_idle_timeout()));
        let (cleanup, stop_cleanup) = store.start_cleanup_task();
        let orchestrator = QueryOrchestrator::new(
            ProviderRouter::new(config.backoff),
            Arc::clone(&store),
            Arc::new(InMemoryUsageLedger::new()),
        )
        .with_analyzer(config.analyzer())
        .with_gate(config.access_gate())
        .with_history_window(config.history_window);

        let cancel = CancellationToken::new();
        let ctrl_c = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupted, cancelling query");
                ctrl_c.cancel();
            }
        });

        let response = orchestrator.handle(&query, &ctx, &cancel).await;
        stop_cleanup.send(()).await.ok();
        cleanup.await.ok();
        response
    });

    print_json(&response)
}

fn read_attachment(path: &Path) -> Result<ParsedFileContext> {
    let bytes = std::fs::read(path).map_err(|e| BioMindError::io(path, e))?;
    let text = String::from_utf8_lossy(&bytes);
    let mut context = ParsedFileContext::from_text(&text).with_size_bytes(bytes.len() as u64);
    if let Some(name) = path.file_name() {
        context = context.with_file_name(name.to_string_lossy());
    }
    tracing::debug!(
        file = %path.display(),
        sequence_type = %context.sequence_type.as_str(),
        size_bytes = context.size_bytes,
        "Attached file parsed"
    );
    Ok(context)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{out}");
    Ok(())
}

fn print_version() {
    println!("biomind {}", env!("CARGO_PKG_VERSION"));
}

fn print_help() {
    println!("biomind - bioinformatics research assistant");
    println!();
    println!("Usage: biomind [OPTIONS] <COMMAND>");
    println!();
    println!("Commands:");
    println!("  version   Display version information");
    println!("  classify  Classify a query's intent, tone and bio query type");
    println!("  gc        GC content and composition of a sequence");
    println!("  guides    Scan a sequence for guide RNA candidates");
    println!("  pcr       Check whether a primer pair can amplify a template");
    println!("  codons    Codon-optimize a coding sequence for a host");
    println!("  tiers     List configured subscription tiers");
    println!("  ask       Run a query through the full orchestrator");
    println!();
    println!("Options:");
    println!("  -v, --verbose      Enable debug logging on stderr");
    println!("      --config PATH  Path to a JSON config file");
    println!("  -V, --version      Print version");
    println!("  -h, --help         Print help");
}
