//! ansisql — compile statement documents to ANSI SQL
//!
//! # Usage
//!
//! ```bash
//! # Show SQL and resolved binds
//! ansisql compile query.json --param user_id=42
//!
//! # Machine-readable output
//! ansisql compile query.json --format json
//!
//! # Schema
//! ansisql ddl schema.json
//! ansisql ddl schema.json --drop
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use tracing_subscriber::EnvFilter;

use ansisql::config::{Config, OutputFormat};
use ansisql::document::{Lowered, StatementDoc};
use ansisql::parser::parse_assignment;
use ansisql::prelude::*;

#[derive(Parser)]
#[command(name = "ansisql")]
#[command(version)]
#[command(about = "Compile relational statement documents to ANSI SQL", long_about = None)]
#[command(after_help = "EXAMPLES:
    ansisql compile query.json --param user_id=42
    ansisql compile query.json --labels --format json
    ansisql ddl schema.json --drop")]
struct Cli {
    /// Config file (default: ./ansisql.toml, then the user config dir)
    #[arg(short, long, global = true, env = "ANSISQL_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compile the document's statement and resolve its bind parameters
    Compile {
        /// Statement document (JSON)
        document: PathBuf,

        /// Bind value override, `name=value` (repeatable)
        #[arg(short, long = "param")]
        params: Vec<String>,

        /// Label every selected column
        #[arg(short, long)]
        labels: bool,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<Format>,

        /// Bind NULL for parameters without a value instead of failing
        #[arg(long)]
        null_missing: bool,
    },
    /// Emit CREATE TABLE (or DROP TABLE) for the document's tables
    Ddl {
        /// Statement document (JSON)
        document: PathBuf,

        /// Emit DROP TABLE in reverse order
        #[arg(long)]
        drop: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("ansisql=debug")
    } else {
        EnvFilter::try_from_env("ANSISQL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    if cli.no_color || !config.output.color {
        colored::control::set_override(false);
    }

    match &cli.command {
        Commands::Compile {
            document,
            params,
            labels,
            format,
            null_missing,
        } => {
            let lowered = load_document(document)?;
            let format = format.map(OutputFormat::from).unwrap_or(config.output.format);
            let policy = if *null_missing {
                MissingPolicy::Null
            } else {
                config.resolve.missing
            };
            compile_document(lowered, params, *labels || config.compile.use_labels, policy, format)
        }
        Commands::Ddl { document, drop } => {
            let lowered = load_document(document)?;
            let statements = if *drop {
                ansisql::ddl::drop_all(&lowered.tree, &lowered.tables)?
            } else {
                ansisql::ddl::create_all(&lowered.tree, &lowered.tables)?
            };
            for sql in statements {
                println!("{};", sql);
            }
            Ok(())
        }
    }
}

fn load_document(path: &Path) -> Result<Lowered> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let lowered = StatementDoc::from_json(&content)
        .and_then(StatementDoc::lower)
        .with_context(|| format!("Invalid document {}", path.display()))?;
    Ok(lowered)
}

fn compile_document(
    lowered: Lowered,
    params: &[String],
    use_labels: bool,
    policy: MissingPolicy,
    format: OutputFormat,
) -> Result<()> {
    let Some(root) = lowered.root else {
        bail!("document has no statement");
    };

    let overrides = params
        .iter()
        .map(|p| parse_assignment(p).with_context(|| format!("Invalid --param '{}'", p)))
        .collect::<Result<Vec<_>>>()?;

    let mut options = lowered.options;
    options.use_labels = use_labels;

    let compiled = compile_with(&lowered.tree, root, options)?;
    let resolved = compiled.resolve_with(overrides, policy)?;

    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({
                "sql": compiled.text(),
                "params": resolved.to_json(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            println!("{}", compiled.text().white());
            if !resolved.is_empty() {
                println!();
                println!("{}", "Bindings:".cyan());
                for (key, value) in resolved.iter() {
                    println!("  :{} = {}", key, value.to_string().yellow());
                }
            }
        }
    }
    Ok(())
}
