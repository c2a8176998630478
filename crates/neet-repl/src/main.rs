//! neet CLI entry point.
//!
//! Usage:
//!   neet                       # Interactive REPL
//!   neet -c <line>             # Execute one line and exit
//!   neet <script>              # Run a script from the script directory

use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use neet_kernel::KernelConfig;
use neet_repl::Repl;

fn main() -> ExitCode {
    // Initialize tracing (respects RUST_LOG env var); stderr keeps stdout clean for --json
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

/// Parsed command line.
#[derive(Debug, Default)]
struct Options {
    script_dir: Option<PathBuf>,
    json: bool,
    command: Option<String>,
    script: Option<String>,
}

fn run() -> Result<ExitCode> {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut options = Options::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(ExitCode::SUCCESS);
            }
            "--version" | "-V" => {
                println!(
                    "neet {} ({} {})",
                    env!("CARGO_PKG_VERSION"),
                    env!("NEET_GIT_HASH"),
                    env!("NEET_BUILD_DATE")
                );
                return Ok(ExitCode::SUCCESS);
            }
            "-c" => {
                let line = iter.next().context("-c requires a line argument")?;
                options.command = Some(line.clone());
            }
            "--scripts" => {
                let dir = iter.next().context("--scripts requires a directory")?;
                options.script_dir = Some(PathBuf::from(dir));
            }
            "--json" => options.json = true,
            name if !name.starts_with('-') && options.script.is_none() => {
                options.script = Some(name.to_string());
            }
            unknown => {
                eprintln!("Unknown option: {unknown}");
                eprintln!("Run 'neet --help' for usage.");
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    let mut config = KernelConfig::repl();
    if let Some(dir) = options.script_dir.take() {
        config = config.with_script_dir(dir);
    }
    let mut repl = Repl::with_config(config)?;
    if options.json {
        repl.set_json(true);
    }

    let line = match (options.command, options.script) {
        (Some(line), _) => line,
        (None, Some(script)) => format!("run {}", script),
        (None, None) => {
            neet_repl::run(repl)?;
            return Ok(ExitCode::SUCCESS);
        }
    };
    run_once(&mut repl, &line)
}

/// Execute one line, reading any requested input from stdin.
fn run_once(repl: &mut Repl, line: &str) -> Result<ExitCode> {
    let stdin = std::io::stdin();
    let mut input = || {
        let mut buf = String::new();
        match stdin.read_line(&mut buf) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(buf.trim_end_matches(['\r', '\n']).to_string()),
        }
    };
    let mut output = |text: &str| {
        print!("{}", text);
        let _ = std::io::stdout().flush();
    };

    let evaluation = repl.execute(line, &mut input, &mut output)?;
    Ok(if evaluation.failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn print_help() {
    println!(
        r#"neet v{}

Usage:
  neet                         Interactive REPL
  neet -c <line>               Execute a line and exit
  neet <script>                Run a script from the script directory

Options:
  -c <line>                    Execute a line and exit
  --scripts <dir>              Script directory (default: $NEET_SCRIPT_DIR or .)
  --json                       Print messages as JSON lines
  -h, --help                   Show this help
  -V, --version                Show version

Examples:
  neet                         # Start interactive REPL
  neet -c 'print hello'        # Run a line
  neet --scripts ./demo intro  # Run demo/intro.neet
"#,
        env!("CARGO_PKG_VERSION")
    );
}
