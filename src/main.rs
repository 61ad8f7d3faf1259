//! CLI entrypoint for `cryptocat`.
//!
//! Builds the campaign configuration from command-line options, checks that
//! the Table Builder and Guesser executables exist, then runs one request
//! (or a stdin session of requests) through the campaign driver and prints
//! a summary of each.
use std::fs;
use std::io::{self, BufRead};
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use log::{LevelFilter, error, info, warn};
use cryptocat::{
    campaign::Campaign,
    config::{CampaignConfig, CrackLimits, ToolSettings, parse_size_override},
    digest::{HashDigest, PasswordLength},
    events::EventLog,
    export::save_results_csv,
    report::render_status,
    requests::{Request, execute, parse_request},
    store::{ResultStore, StoreLayout},
    tools::{ProcessRunner, ToolRunner},
};

const EXIT_FATAL: i32 = 1;
const EXIT_REJECTED: i32 = 2;
const EXIT_MISSING_TOOLS: i32 = 3;
const EXIT_EXPORT: i32 = 4;

#[derive(Parser, Debug)]
#[command(
    name = "cryptocat",
    version,
    about = "Rainbow-table cracking campaign orchestrator"
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Directory holding hash files and result stores
    #[arg(long = "data-dir", default_value = "./data", global = true)]
    data_dir: PathBuf,

    /// Directory for the temporary session table
    #[arg(long = "session-dir", default_value = "./bin", global = true)]
    session_dir: PathBuf,

    /// Path to the Table Builder executable
    #[arg(long = "table-bin", default_value = "./bin/table", global = true)]
    table_bin: PathBuf,

    /// Path to the Guesser executable
    #[arg(long = "guess-bin", default_value = "./bin/guess", global = true)]
    guess_bin: PathBuf,

    /// Thread count passed through to both tools
    #[arg(short = 't', long = "threads", default_value_t = NonZeroU32::MIN, global = true)]
    threads: NonZeroU32,

    /// Override a table size as LENGTH=EXPONENT (chains = 2^EXPONENT)
    #[arg(long = "size", value_parser = parse_size_override, global = true)]
    sizes: Vec<(PasswordLength, u32)>,

    /// Give up on a target after this many table rebuilds
    #[arg(
        long = "max-iterations",
        value_parser = clap::value_parser!(u32).range(1..),
        global = true
    )]
    max_iterations: Option<u32>,

    /// Give up on a target after this many seconds
    #[arg(long = "time-budget", global = true)]
    time_budget: Option<u64>,

    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Do not write a run transcript to the data directory at -v and above
    #[arg(long = "no-transcript", global = true)]
    no_transcript: bool,

    /// Control color output (auto, always, never)
    #[arg(long = "color", value_enum, default_value_t = ColorChoice::Auto, global = true)]
    color: ColorChoice,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crack a single hash
    Single {
        hash: HashDigest,
        length: PasswordLength,
    },
    /// Crack every hash in a file under the data directory
    File {
        name: String,
        length: PasswordLength,
    },
    /// Run the full assignment, resuming from earlier results
    Assignment,
    /// Show assignment progress without running any tool
    Status,
    /// Export the assignment results as CSV
    Export {
        /// Output directory
        #[arg(short = 'o', long = "output")]
        output: PathBuf,
    },
    /// Read requests from stdin, one per line, until EOF or `exit`
    Session,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

fn init_logger(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init();
}

fn build_config(args: &Args) -> CampaignConfig {
    let mut config = CampaignConfig {
        tools: ToolSettings {
            table_bin: args.table_bin.clone(),
            guess_bin: args.guess_bin.clone(),
            threads: args.threads,
            verbose: args.verbose > 0,
        },
        limits: CrackLimits {
            max_iterations: args.max_iterations,
            time_budget: args.time_budget.map(Duration::from_secs),
        },
        data_dir: args.data_dir.clone(),
        session_dir: args.session_dir.clone(),
        ..CampaignConfig::default()
    };
    for &(length, exponent) in &args.sizes {
        config.sizes.set(length, exponent);
    }
    config
}

fn verify_tools(config: &CampaignConfig) -> Result<()> {
    for p in [&config.tools.table_bin, &config.tools.guess_bin] {
        if !p.is_file() {
            bail!(
                "executable not found: {} (build the table and guess tools first)",
                p.display()
            );
        }
    }
    Ok(())
}

fn open_events(args: &Args, config: &CampaignConfig) -> EventLog {
    if args.verbose == 0 || args.no_transcript {
        return EventLog::new();
    }
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = config.data_dir.join(format!("cryptocat_run_{}.log", ts));
    match EventLog::with_transcript(&path) {
        Ok(events) => {
            info!("detailed output is being logged to {}", path.display());
            events
        }
        Err(e) => {
            warn!("could not open transcript {}: {} (continuing)", path.display(), e);
            EventLog::new()
        }
    }
}

fn export(config: &CampaignConfig, outdir: &Path) -> Result<()> {
    fs::create_dir_all(outdir)?;
    let store = ResultStore::load(config.assignment_store_path(), StoreLayout::Assignment)?;
    let ts = chrono::Local::now().format("%Y.%m.%d_%H.%M.%S");
    let csv = outdir.join(format!("cryptocat_assignment_{}.csv", ts));
    let rows = save_results_csv(&store, &csv)?;
    println!("Exported {} result(s) to {}", rows, csv.display());
    Ok(())
}

/// Run one request. Returns the process exit code it implies.
fn run_one<R: ToolRunner>(campaign: &mut Campaign<'_, R, &EventLog>, request: Request) -> i32 {
    match execute(campaign, request) {
        Ok(Some(report)) => {
            println!("{}", report);
            0
        }
        Ok(None) => 0,
        Err(e) if e.is_fatal() => {
            error!("FATAL: {}", e);
            EXIT_FATAL
        }
        Err(e) => {
            error!("{}", e);
            EXIT_REJECTED
        }
    }
}

fn run_session<R: ToolRunner>(campaign: &mut Campaign<'_, R, &EventLog>) -> i32 {
    let stdin = io::stdin();
    for raw in stdin.lock().split(b'\n') {
        let raw = match raw {
            Ok(r) => r,
            Err(e) => {
                error!("failed to read request: {}", e);
                return EXIT_FATAL;
            }
        };
        let Ok(line) = std::str::from_utf8(&raw) else {
            error!("request is not valid UTF-8");
            continue;
        };
        let request = match parse_request(line) {
            Ok(Some(Request::Exit)) => break,
            Ok(Some(r)) => r,
            Ok(None) => continue,
            Err(e) => {
                error!("{}", e);
                continue;
            }
        };
        if run_one(campaign, request) == EXIT_FATAL {
            return EXIT_FATAL;
        }
    }
    0
}

fn main() {
    let args = Args::parse();
    init_logger(args.verbose);
    // Configure color policy
    match args.color {
        ColorChoice::Always => {
            colored::control::set_override(true);
        }
        ColorChoice::Never => {
            colored::control::set_override(false);
        }
        ColorChoice::Auto => {}
    }
    let config = build_config(&args);

    match &args.command {
        Command::Status => {
            match ResultStore::load(config.assignment_store_path(), StoreLayout::Assignment) {
                Ok(store) => println!("{}", render_status(&config.assignment, &store)),
                Err(e) => {
                    error!("{}", e);
                    std::process::exit(EXIT_REJECTED);
                }
            }
            return;
        }
        Command::Export { output } => {
            if let Err(e) = export(&config, output) {
                error!("failed to export results: {:#}", e);
                std::process::exit(EXIT_EXPORT);
            }
            return;
        }
        _ => {}
    }

    if let Err(e) = verify_tools(&config) {
        error!("{}", e);
        std::process::exit(EXIT_MISSING_TOOLS);
    }
    if let Err(e) = fs::create_dir_all(&config.session_dir) {
        error!(
            "failed to create session directory {}: {}",
            config.session_dir.display(),
            e
        );
        std::process::exit(EXIT_FATAL);
    }

    let events = open_events(&args, &config);
    let runner = ProcessRunner::new(config.tools.clone());
    let mut campaign = Campaign::new(&config, runner, &events);
    let code = match args.command {
        Command::Single { hash, length } => {
            run_one(&mut campaign, Request::Single { hash, length })
        }
        Command::File { name, length } => run_one(&mut campaign, Request::File { name, length }),
        Command::Assignment => run_one(&mut campaign, Request::Assignment),
        Command::Session => run_session(&mut campaign),
        Command::Status | Command::Export { .. } => 0,
    };
    // Close the transcript before exiting.
    drop(campaign);
    drop(events);
    std::process::exit(code);
}
