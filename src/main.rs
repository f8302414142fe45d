use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

use errchain::chain::{ChainGraph, ErrorNode};
use errchain::config::ClassifierConfig;
use errchain::error::{ChainClassifier, ChainDiagnosis, ErrorKind, MissingMessagePolicy};
use errchain::logging::{init_logging, LoggingConfig};

/// Output format for diagnosis reports
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// One `field: value` line per finding
    #[default]
    Text,
    /// JSON object
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "errchain")]
#[command(version)]
#[command(about = "Classify error cause chains from persistence tests")]
struct Cli {
    /// Classifier configuration file (TOML)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v shows matches, -vv shows every visited node)
    #[arg(long, short, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Report lock timeout, closed connection and root cause for a chain
    Classify {
        /// JSON chain file
        chain: PathBuf,

        /// Index of the node to start from
        #[arg(long, default_value_t = 0)]
        start: usize,

        /// Output format
        #[arg(long, default_value = "text", value_enum)]
        format: OutputFormat,

        /// Fail on nodes without a message instead of treating them as non-matching
        #[arg(long)]
        strict: bool,

        /// Extra kind to treat as a lock timeout (repeatable), e.g. `sql_timeout`
        #[arg(long = "lock-kind", value_name = "KIND")]
        lock_kinds: Vec<ErrorKind>,
    },
    /// Print the root cause of a chain
    RootCause {
        /// JSON chain file
        chain: PathBuf,

        /// Index of the node to start from
        #[arg(long, default_value_t = 0)]
        start: usize,
    },
}

fn build_classifier(
    cli: &Cli,
    strict: bool,
) -> Result<ChainClassifier, Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => ClassifierConfig::load(path)?,
        None => ClassifierConfig::default(),
    };
    let classifier = config.build()?;
    Ok(if strict {
        classifier.with_missing_message(MissingMessagePolicy::Fail)
    } else {
        classifier
    })
}

fn render_text(diagnosis: &ChainDiagnosis) -> String {
    let yes_no = |flag: bool| if flag { "yes" } else { "no" };
    let mut out = String::new();
    out.push_str(&format!("lock timeout: {}\n", yes_no(diagnosis.lock_timeout)));
    out.push_str(&format!(
        "connection close: {}\n",
        yes_no(diagnosis.connection_close)
    ));
    out.push_str(&format!(
        "root cause: [{}] {}\n",
        diagnosis.root_kind,
        diagnosis.root_message.as_deref().unwrap_or("<no message>")
    ));
    out.push_str(&format!("depth: {}\n", diagnosis.depth));
    out.push_str(&format!("chain end: {}\n", diagnosis.end));
    out
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    match &cli.command {
        Commands::Classify {
            chain,
            start,
            format,
            strict,
            lock_kinds,
        } => {
            let graph = ChainGraph::load(chain)?;
            let mut classifier = build_classifier(cli, *strict)?;
            if !lock_kinds.is_empty() {
                let mut kinds = classifier.lock_kinds().clone();
                for kind in lock_kinds {
                    kinds.insert(*kind);
                }
                classifier = classifier.with_lock_kinds(kinds);
            }
            let diagnosis = classifier.diagnose(graph.node(*start)?)?;
            match format {
                OutputFormat::Text => print!("{}", render_text(&diagnosis)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&diagnosis)?),
            }
        }
        Commands::RootCause { chain, start } => {
            let graph = ChainGraph::load(chain)?;
            let classifier = build_classifier(cli, false)?;
            let root = classifier.root_cause(graph.node(*start)?)?;
            println!(
                "{}: [{}] {}",
                root.index(),
                root.kind(),
                root.message().as_deref().unwrap_or("<no message>")
            );
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(LoggingConfig::from_verbosity(cli.verbose));

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("errchain: {}", e);
            ExitCode::FAILURE
        }
    }
}
