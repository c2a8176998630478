//! neet REPL: interactive front-end for the neet scripting runtime.
//!
//! This REPL drives a [`Kernel`] from a terminal. It handles:
//! - Meta-commands: `/help`, `/quit`, `/scripts`, `/active`, `/stop`, `/vars`, `/json`
//! - Line execution via the Kernel, with output streamed while scripts run
//! - Answering `readline`/`readkey` from the same terminal
//! - Command history via rustyline

pub mod format;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use tokio::runtime::Runtime;

use neet_kernel::{Evaluation, Kernel, KernelConfig, StopTarget, Variable};

use crate::format::{detect_mode, render, OutputMode};

/// How often the REPL checks a running line for output and input requests.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Result from meta-command handling.
#[derive(Debug)]
enum MetaResult {
    /// Continue with optional output
    Continue(Option<String>),
    /// Exit the REPL
    Exit,
}

/// REPL configuration and state.
pub struct Repl {
    // Declared before the runtime so the kernel shuts its driver down first.
    kernel: Arc<Kernel>,
    runtime: Runtime,
    mode: OutputMode,
    /// Input requests already answered.
    served: u64,
    exit_requested: bool,
}

impl Repl {
    /// Create a REPL reading scripts from `$NEET_SCRIPT_DIR` or the current directory.
    pub fn new() -> Result<Self> {
        Self::with_config(KernelConfig::repl())
    }

    /// Create a REPL with a custom kernel configuration.
    pub fn with_config(config: KernelConfig) -> Result<Self> {
        let kernel = Kernel::new(config).context("Failed to create kernel")?;
        let runtime = Runtime::new().context("Failed to create tokio runtime")?;

        Ok(Self {
            kernel: Arc::new(kernel),
            runtime,
            mode: detect_mode(),
            served: 0,
            exit_requested: false,
        })
    }

    /// Force JSON-lines output on or off.
    pub fn set_json(&mut self, json: bool) {
        self.mode = if json { OutputMode::Json } else { detect_mode() };
    }

    /// Use a specific output mode.
    pub fn set_mode(&mut self, mode: OutputMode) {
        self.mode = mode;
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// True once a quit command has been processed.
    pub fn should_exit(&self) -> bool {
        self.exit_requested
    }

    /// Process a single line of input.
    ///
    /// Returns `Ok(None)` when there is nothing to show. Input requested by
    /// the line is answered with empty text; use [`Repl::execute`] to supply
    /// real input.
    pub fn process_line(&mut self, line: &str) -> Result<Option<String>> {
        if let Some(result) = self.try_meta_command(line.trim()) {
            return Ok(match result {
                MetaResult::Continue(output) => output,
                MetaResult::Exit => {
                    self.exit_requested = true;
                    None
                }
            });
        }

        let mut collected = String::new();
        self.execute(line, &mut || None, &mut |text| collected.push_str(text))?;
        Ok((!collected.is_empty()).then_some(collected))
    }

    /// Run one line, streaming rendered messages into `output` until it
    /// finishes.
    ///
    /// Whenever a script waits for input, `input` is asked for a line.
    /// `None` answers with empty text.
    pub fn execute(
        &mut self,
        line: &str,
        input: &mut dyn FnMut() -> Option<String>,
        output: &mut dyn FnMut(&str),
    ) -> Result<Evaluation> {
        let kernel = Arc::clone(&self.kernel);
        let line = line.to_string();
        let task = self
            .runtime
            .spawn(async move { kernel.submit_line(&line).await });

        loop {
            let finished = task.is_finished();
            self.flush(output);
            if finished {
                break;
            }
            while self.served < self.kernel.input_requests() {
                self.served += 1;
                self.kernel.provide_input(input().unwrap_or_default());
            }
            std::thread::sleep(POLL_INTERVAL);
        }

        let evaluation = self
            .runtime
            .block_on(task)
            .context("Line execution panicked")?;
        // Reads cancelled before they were answered.
        self.served = self.kernel.input_requests();
        Ok(evaluation)
    }

    /// Render everything pending on the bus.
    fn flush(&self, output: &mut dyn FnMut(&str)) {
        for message in self.kernel.drain_messages() {
            if let Some(text) = render(&message, self.mode) {
                output(&text);
            }
        }
    }

    /// Handle a meta-command, with or without the leading slash for the
    /// common ones. `None` means the line is for the kernel.
    fn try_meta_command(&mut self, cmd: &str) -> Option<MetaResult> {
        let mut parts = cmd.split_whitespace();
        let command = parts.next().unwrap_or("");
        let arg = parts.next();

        let result = match command {
            "/quit" | "/q" | "/exit" | "quit" | "exit" => MetaResult::Exit,
            "/help" | "/h" | "/?" => MetaResult::Continue(Some(HELP_TEXT.to_string())),
            "/json" => {
                let json = self.mode != OutputMode::Json;
                self.set_json(json);
                MetaResult::Continue(Some(format!(
                    "JSON mode: {}",
                    if json { "ON" } else { "OFF" }
                )))
            }
            "/scripts" => match self.kernel.script_names() {
                Ok(names) if names.is_empty() => {
                    MetaResult::Continue(Some("(no scripts found)".to_string()))
                }
                Ok(names) => MetaResult::Continue(Some(names.join("\n"))),
                Err(e) => MetaResult::Continue(Some(format!("Failed to list scripts: {}", e))),
            },
            "/active" | "/jobs" => {
                let active = self.kernel.list_active_instances();
                if active.is_empty() {
                    MetaResult::Continue(Some("(no running scripts)".to_string()))
                } else {
                    MetaResult::Continue(Some(active.join("\n")))
                }
            }
            "/stop" => {
                let target = arg.map(StopTarget::from).unwrap_or(StopTarget::All);
                let stopped = self.kernel.stop_instance(target);
                MetaResult::Continue(Some(if stopped.is_empty() {
                    "(nothing stopped)".to_string()
                } else {
                    format!("Stopped: {}", stopped.join(", "))
                }))
            }
            "/vars" | "/scope" => {
                let vars = self.kernel.globals();
                if vars.is_empty() {
                    MetaResult::Continue(Some("(no variables set)".to_string()))
                } else {
                    let mut output = String::from("Variables:\n");
                    for (name, value) in vars {
                        output.push_str(&format!("  {} = {}\n", name, format_variable(&value)));
                    }
                    MetaResult::Continue(Some(output.trim_end().to_string()))
                }
            }
            _ if command.starts_with('/') => MetaResult::Continue(Some(format!(
                "Unknown command: {}\nType /help for available commands.",
                command
            ))),
            _ => return None,
        };
        Some(result)
    }
}

/// Format a variable for `/vars`.
fn format_variable(value: &Variable) -> String {
    match value {
        Variable::Text(s) => format!("\"{}\"", s),
        Variable::List(items) => format!("[{}]", items.join(", ")),
        Variable::Map(entries) => {
            let pairs: Vec<String> = entries.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
            format!("{{{}}}", pairs.join(", "))
        }
    }
}

const HELP_TEXT: &str = r#"neet REPL

Meta Commands:
  /help, /?           Show this help
  /quit, /q, quit     Exit the REPL
  /scripts            List scripts in the script directory
  /active             List running scripts
  /stop [name|all]    Stop running scripts (default: all)
  /vars               Show global variables
  /json               Toggle JSON-lines output

Lines:
  Anything else runs as a neet line, e.g.
    print hello $name
    var name world
    run intro other
  Type `help` for the command list, `help <command>` for usage.

Variables:
  $name               Replaced by a text variable's value
  $$n, $$s            Newline and space
"#;

/// Save REPL history to disk.
fn save_history(rl: &mut Editor<(), DefaultHistory>, history_path: &Option<PathBuf>) {
    if let Some(path) = history_path {
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("Failed to create history directory: {}", e);
            }
        }
        if let Err(e) = rl.save_history(path) {
            tracing::warn!("Failed to save history: {}", e);
        }
    }
}

/// Run the interactive REPL.
pub fn run(mut repl: Repl) -> Result<()> {
    println!("neet v{}", env!("CARGO_PKG_VERSION"));
    println!("Type /help for commands, /quit to exit.");

    let mut rl: Editor<(), DefaultHistory> =
        Editor::new().context("Failed to create editor")?;

    let history_path = directories::BaseDirs::new()
        .map(|b| b.data_dir().join("neet").join("history.txt"));
    if let Some(ref path) = history_path {
        if let Err(e) = rl.load_history(path) {
            // Missing history is expected on first run
            let is_not_found = matches!(&e, ReadlineError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound);
            if !is_not_found {
                tracing::warn!("Failed to load history: {}", e);
            }
        }
    }
    println!();

    loop {
        match rl.readline("neet> ") {
            Ok(line) => {
                if let Err(e) = rl.add_history_entry(line.as_str()) {
                    tracing::warn!("Failed to add history entry: {}", e);
                }

                if let Some(result) = repl.try_meta_command(line.trim()) {
                    match result {
                        MetaResult::Continue(Some(output)) => println!("{}", output),
                        MetaResult::Continue(None) => {}
                        MetaResult::Exit => break,
                    }
                    continue;
                }

                let mut input = || rl.readline("").ok();
                let mut output = |text: &str| {
                    print!("{}", text);
                    let _ = std::io::stdout().flush();
                };
                if let Err(e) = repl.execute(&line, &mut input, &mut output) {
                    eprintln!("Error: {}", e);
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                eprintln!("Error: {}", err);
                break;
            }
        }
    }

    save_history(&mut rl, &history_path);
    Ok(())
}
