use clap::{Args, Parser as ClapParser, Subcommand};
use sift_lang::cli::{self, CliError, Operation, RunOptions};
use sift_lang::{CompileMode, SortDirection, to_json, to_json_pretty};
use std::io::{self, Read};
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "sift")]
#[command(about = "Sift - select, filter and order JSON records with compiled selectors")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args)]
struct CommonArgs {
    /// JSON input (reads from stdin if not provided)
    #[arg(short, long, global = true)]
    input: Option<String>,

    /// Pretty-print the output
    #[arg(short, long, global = true)]
    pretty: bool,

    /// Replace failing values with defaults instead of aborting
    #[arg(long, global = true)]
    safe: bool,

    /// Compute the whole result before printing
    #[arg(long, global = true)]
    materialize: bool,

    /// Element type name used for cache keys
    #[arg(long, global = true)]
    type_name: Option<String>,

    /// Log compiles and cache activity (overridden by SIFT_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Project every element through a selector such as `a, b.c`
    Select { selector: String },

    /// Keep elements for which a chain is truthy
    Where { chain: String },

    /// Sort elements by a chain
    Order {
        chain: String,

        /// Sort descending
        #[arg(long)]
        desc: bool,

        /// Tie-breaking chain, optionally suffixed with `:asc` or `:desc`
        #[arg(long = "then")]
        then: Vec<String>,
    },

    /// Keep elements matching a condition such as `age >= 18`
    Filter { condition: String },
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("SIFT_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.common.verbose);

    let operation = match cli.command {
        Commands::Select { selector } => Operation::Select { selector },
        Commands::Where { chain } => Operation::Where { chain },
        Commands::Order { chain, desc, then } => Operation::Order {
            chain,
            direction: if desc {
                SortDirection::Descending
            } else {
                SortDirection::Ascending
            },
            then: then.iter().map(|t| cli::parse_then(t)).collect(),
        },
        Commands::Filter { condition } => Operation::Filter { condition },
    };

    if let Err(e) = run(operation, cli.common) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run(operation: Operation, common: CommonArgs) -> Result<(), CliError> {
    let input = match common.input {
        Some(s) => Some(s),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Some(buffer)
        }
        None => None,
    };

    let mut mode = CompileMode::DEFAULT;
    if common.safe {
        mode |= CompileMode::SAFE;
    }
    if common.materialize {
        mode |= CompileMode::MATERIALIZE;
    }

    let options = RunOptions {
        operation,
        input,
        mode,
        type_name: common.type_name,
    };

    let output = cli::execute(&options)?;
    let json = if common.pretty {
        to_json_pretty(&output)
    } else {
        to_json(&output)
    };
    println!("{}", json);
    Ok(())
}
