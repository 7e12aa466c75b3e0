use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use tamilchk::cli::output::{self, OutputFormat};
use tamilchk::config::Overrides;
use tamilchk::{Aggregator, Checker, Config, RuleBasedChecker};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tamilchk")]
#[command(version, about = "Spelling and grammar checker for Tamil text", long_about = None)]
struct Cli {
    /// Text to check (reads --file or stdin when omitted)
    #[arg(value_name = "TEXT")]
    text: Vec<String>,

    /// Read the text from a file
    #[arg(short, long, conflicts_with = "text")]
    file: Option<PathBuf>,

    /// Checker to run; repeat to compare several (Rule-based, Statistical, Model-based)
    #[arg(short, long = "checker", value_name = "NAME")]
    checkers: Vec<String>,

    /// Dictionary overlay file (`word,wordClass` per line)
    #[arg(short, long)]
    dictionary: Option<PathBuf>,

    /// Extra rules file, appended after the built-in rules
    #[arg(short, long)]
    rules: Option<PathBuf>,

    /// Per-checker time limit in milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Run the selected checkers concurrently
    #[arg(long)]
    parallel: bool,

    /// Configuration file (default: ./.tamilchk.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(short = 'o', long, default_value = "text")]
    format: OutputFormat,

    /// Print the text with the rule-based corrections applied
    #[arg(long)]
    fix: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Exit with code 0 even if corrections are found
    #[arg(long)]
    no_fail: bool,

    /// Verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Generate shell completion script
    #[arg(long, value_name = "SHELL")]
    completion: Option<Shell>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle shell completion generation
    if let Some(shell) = cli.completion {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "tamilchk", &mut io::stdout());
        return Ok(());
    }

    init_logging(cli.verbose);

    // Load configuration
    let config = Config::load(Overrides {
        dictionary: cli.dictionary.clone(),
        rules: cli.rules.clone(),
        checkers: cli.checkers.clone(),
        timeout_ms: cli.timeout_ms,
        parallel: cli.parallel,
        config_file: cli.config.clone(),
    })?;

    let text = read_input(&cli)?;

    if cli.fix {
        let report = RuleBasedChecker::new(&config)?.report(&text);
        print!("{}", report.corrected_text);
        if !report.corrected_text.is_empty() && !report.corrected_text.ends_with('\n') {
            println!();
        }
        return Ok(());
    }

    let aggregator = Aggregator::from_config(&config)?;
    let comparison = aggregator.compare(&text, config.checkers.as_slice());
    output::print_comparison(&comparison, cli.format, !cli.no_color)?;

    // Exit with appropriate code
    if comparison.total_corrections() > 0 && !cli.no_fail {
        std::process::exit(1);
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn read_input(cli: &Cli) -> Result<String> {
    if !cli.text.is_empty() {
        return Ok(cli.text.join(" "));
    }

    if let Some(path) = &cli.file {
        return fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()));
    }

    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read stdin")?;
    Ok(text)
}
