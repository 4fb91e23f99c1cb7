//! Command-line interface for the Sys2 runtime.
//!
//! Exit status: 0 success, 1 parse/usage error, 2 contradiction rejected,
//! 3 goal unprovable, 4 timeout, 5 internal error.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::describe::Describe;
use crate::session::{Session, SessionConfig};

pub const EXIT_OK: i32 = 0;
pub const EXIT_PARSE: i32 = 1;
pub const EXIT_CONTRADICTION: i32 = 2;
pub const EXIT_UNPROVABLE: i32 = 3;
pub const EXIT_TIMEOUT: i32 = 4;
pub const EXIT_INTERNAL: i32 = 5;

#[derive(Parser)]
#[command(name = "sys2")]
#[command(about = "Hyperdimensional reasoning over Sys2DSL theories", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a sys2.toml config (defaults to ./sys2.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Substrate: exact | dense-binary | sparse-polynomial | metric-affine
    #[arg(long)]
    pub strategy: Option<String>,

    /// Engine priority: symbolic | holographic
    #[arg(long)]
    pub priority: Option<String>,

    /// Skip loading the embedded Core packs
    #[arg(long)]
    pub no_core: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile theory files into a fresh session and report what stuck
    Learn {
        /// Theory files, loaded in order
        files: Vec<PathBuf>,
    },
    /// Answer a query pattern against the given theories
    Query {
        /// Pattern, e.g. "@q loves ?who Mary"
        pattern: String,

        /// Theory files to learn first
        #[arg(long)]
        theory: Vec<PathBuf>,
    },
    /// Prove a ground goal against the given theories
    Prove {
        /// Goal, e.g. "@g isA Rex Animal"
        goal: String,

        #[arg(long)]
        theory: Vec<PathBuf>,
    },
    /// Run the strategy contract tester and print the report
    Check,
}

pub fn run_cli() -> i32 {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("error: {}", message);
            return EXIT_PARSE;
        }
    };

    let mut session = match Session::open(config) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("error: {}", e);
            return EXIT_INTERNAL;
        }
    };

    let code = match &cli.command {
        Commands::Learn { files } => cmd_learn(&mut session, files),
        Commands::Query { pattern, theory } => {
            let code = cmd_learn(&mut session, theory);
            if code != EXIT_OK {
                code
            } else {
                cmd_query(&mut session, pattern)
            }
        }
        Commands::Prove { goal, theory } => {
            let code = cmd_learn(&mut session, theory);
            if code != EXIT_OK {
                code
            } else {
                cmd_prove(&mut session, goal)
            }
        }
        Commands::Check => cmd_check(&mut session),
    };
    session.close();
    code
}

fn build_config(cli: &Cli) -> Result<SessionConfig, String> {
    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => {
            let default_path = PathBuf::from("sys2.toml");
            if default_path.exists() {
                read_config(&default_path)?
            } else {
                SessionConfig::default()
            }
        }
    };
    if let Some(strategy) = &cli.strategy {
        config.strategy = strategy.clone();
    }
    if let Some(priority) = &cli.priority {
        config.reasoning_priority = priority.clone();
    }
    if cli.no_core {
        config.auto_load_core = false;
    }
    Ok(config)
}

fn read_config(path: &PathBuf) -> Result<SessionConfig, String> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    toml::from_str(&text).map_err(|e| format!("bad config {}: {}", path.display(), e))
}

fn cmd_learn(session: &mut Session, files: &[PathBuf]) -> i32 {
    for path in files {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("error: cannot read {}: {}", path.display(), e);
                return EXIT_PARSE;
            }
        };
        let result = session.learn(&text);
        println!("{}: {}", path.display(), session.describe_result(&result));
        if result.rejected.is_some() {
            return EXIT_CONTRADICTION;
        }
        if !result.success {
            return EXIT_PARSE;
        }
    }
    EXIT_OK
}

fn cmd_query(session: &mut Session, pattern: &str) -> i32 {
    let result = session.query(pattern);
    println!("{}", session.describe_result(&result));
    if !result.errors.is_empty() {
        return EXIT_PARSE;
    }
    EXIT_OK
}

fn cmd_prove(session: &mut Session, goal: &str) -> i32 {
    let result = session.prove(goal);
    println!("{}", session.describe_result(&result));
    if !result.errors.is_empty() {
        return EXIT_PARSE;
    }
    if result
        .warnings
        .iter()
        .any(|w| matches!(w, crate::error::Warning::Timeout { .. }))
    {
        return EXIT_TIMEOUT;
    }
    if !result.valid {
        return EXIT_UNPROVABLE;
    }
    EXIT_OK
}

fn cmd_check(session: &mut Session) -> i32 {
    let report = session.check_strategy_contract();
    println!("{}", report);
    if report.passed() {
        EXIT_OK
    } else {
        EXIT_INTERNAL
    }
}
