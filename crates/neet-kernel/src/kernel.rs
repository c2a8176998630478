//! The Kernel: the host surface of the runtime.
//!
//! The Kernel owns and coordinates all core components:
//! - Global scope (variables shared by every instance and the terminal)
//! - Command registry (builtins)
//! - Script scheduler and its driver task
//! - Message bus (the ordered output stream)
//! - External seams: script store and input-control device
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                          Kernel                            │
//! │  ┌──────────────┐  ┌─────────────────┐  ┌──────────────┐   │
//! │  │ globals      │  │ CommandRegistry │  │ MessageBus   │   │
//! │  │ (Scope)      │  │  (builtins)     │  │ (drain)      │   │
//! │  └──────────────┘  └─────────────────┘  └──────────────┘   │
//! │  ┌─────────────────────────────┐  ┌────────────────────┐   │
//! │  │ ScriptScheduler + driver    │  │ ScriptStore        │   │
//! │  │ (active set, batches)       │  │ InputControl       │   │
//! │  └─────────────────────────────┘  └────────────────────┘   │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Many kernels can live in one process; nothing here is global.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use neet_types::{CommandSchema, TerminalMessage, Variable, ERROR_COLOR};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::bus::MessageBus;
use crate::commands::CommandRegistry;
use crate::device::{HeadlessDevice, InputControl};
use crate::interpreter::tick::run_bare;
use crate::interpreter::{Evaluation, Scope};
use crate::scheduler::driver;
use crate::scheduler::{BatchHandle, OwnerSettings, ScriptScheduler, StartError, StopTarget};
use crate::store::{DirStore, MemoryStore, ScriptStore, StoreError};

/// Environment variable naming the REPL's script directory.
pub const SCRIPT_DIR_ENV: &str = "NEET_SCRIPT_DIR";

/// Configuration for kernel initialization.
#[derive(Debug, Clone)]
pub struct KernelConfig {
    /// Name of this kernel (for identification).
    pub name: String,

    /// Directory scripts are loaded from. `None` uses an in-memory store.
    pub script_dir: Option<PathBuf>,

    /// File extension of scripts in `script_dir`, without the dot.
    pub script_extension: String,

    /// Foreground colour of error messages.
    pub error_color: String,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            script_dir: None,
            script_extension: "neet".to_string(),
            error_color: ERROR_COLOR.to_string(),
        }
    }
}

impl KernelConfig {
    /// Create a kernel config with the given name and no script directory.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Create a REPL config.
    ///
    /// Scripts come from `$NEET_SCRIPT_DIR`, or the current directory.
    pub fn repl() -> Self {
        let dir = std::env::var_os(SCRIPT_DIR_ENV)
            .map(PathBuf::from)
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            name: "repl".to_string(),
            script_dir: Some(dir),
            ..Self::default()
        }
    }

    /// Create a config with no filesystem access. Useful for tests.
    pub fn isolated() -> Self {
        Self {
            name: "isolated".to_string(),
            ..Self::default()
        }
    }

    /// Set the script directory.
    pub fn with_script_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.script_dir = Some(dir.into());
        self
    }

    /// Set the script file extension.
    pub fn with_script_extension(mut self, extension: impl Into<String>) -> Self {
        self.script_extension = extension.into();
        self
    }

    /// Set the error colour.
    pub fn with_error_color(mut self, color: impl Into<String>) -> Self {
        self.error_color = color.into();
        self
    }
}

/// State shared by the kernel, the driver task and every tick.
pub(crate) struct Shared {
    pub(crate) config: KernelConfig,
    pub(crate) commands: Arc<CommandRegistry>,
    globals: Mutex<Scope>,
    pub(crate) bus: MessageBus,
    pub(crate) scheduler: ScriptScheduler,
    pub(crate) device: Arc<dyn InputControl>,
    store: Arc<dyn ScriptStore>,
    /// Settings of the terminal, the owner of bare lines.
    terminal: Mutex<OwnerSettings>,
    input_tx: mpsc::UnboundedSender<String>,
    input_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>,
    /// Host requests currently in flight.
    busy: AtomicUsize,
    /// Input reads started so far.
    input_requests: AtomicU64,
}

impl Shared {
    pub(crate) fn globals(&self) -> MutexGuard<'_, Scope> {
        self.globals.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn terminal_settings(&self) -> MutexGuard<'_, OwnerSettings> {
        self.terminal.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validate, load and admit a batch. Nothing starts unless every name
    /// passes.
    pub(crate) fn start_batch(
        self: &Arc<Self>,
        invoker: Option<&str>,
        names: &[String],
    ) -> Result<BatchHandle, StartError> {
        let runtime = Handle::try_current().map_err(|_| StartError::NoRuntime)?;
        self.scheduler.check(invoker, names)?;

        let mut scripts = Vec::with_capacity(names.len());
        for name in names {
            match self.store.load(name)? {
                Some(text) => scripts.push((name.clone(), text)),
                None => return Err(StartError::UnknownScript(name.clone())),
            }
        }

        let handle = self.scheduler.admit(&self.bus, scripts)?;
        self.ensure_driver(&runtime);
        Ok(handle)
    }

    /// Spawn the driver on first use.
    fn ensure_driver(self: &Arc<Self>, runtime: &Handle) {
        if let Some(inbox) = self.scheduler.take_driver_inbox() {
            runtime.spawn(driver::drive(Arc::clone(self), inbox));
        }
    }

    /// Next line of external input, or `None` once input is closed.
    pub(crate) async fn next_input(&self) -> Option<String> {
        self.input_rx.lock().await.recv().await
    }

    pub(crate) fn host_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst) > 0
    }

    pub(crate) fn note_input_request(&self) {
        self.input_requests.fetch_add(1, Ordering::SeqCst);
    }
}

/// Marks a host request as in flight until dropped.
struct BusyGuard<'a>(&'a Shared);

impl<'a> BusyGuard<'a> {
    fn enter(shared: &'a Shared) -> Self {
        shared.busy.fetch_add(1, Ordering::SeqCst);
        shared.bus.push(TerminalMessage::InputEnabled { enabled: false });
        Self(shared)
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        // Only the last request in flight gives input back.
        if self.0.busy.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.bus.push(TerminalMessage::InputEnabled { enabled: true });
        }
    }
}

/// The Kernel: executes neet lines and scripts.
///
/// This is the primary interface for embedding the runtime. It owns all the
/// runtime state: globals, commands, running instances and pending output.
/// Script instances are driven on the ambient tokio runtime.
pub struct Kernel {
    shared: Arc<Shared>,
}

impl Kernel {
    /// Create a new kernel with the given configuration.
    ///
    /// Scripts are read from `config.script_dir` when set; the device is a
    /// [`HeadlessDevice`].
    pub fn new(config: KernelConfig) -> Result<Self> {
        let store: Arc<dyn ScriptStore> = match &config.script_dir {
            Some(dir) => {
                if !dir.is_dir() {
                    anyhow::bail!("script directory does not exist: {}", dir.display());
                }
                Arc::new(DirStore::new(dir.clone(), config.script_extension.clone()))
            }
            None => Arc::new(MemoryStore::new()),
        };
        Self::with_parts(config, store, Arc::new(HeadlessDevice::default()))
    }

    /// Create a kernel with an explicit script store and device.
    pub fn with_parts(
        config: KernelConfig,
        store: Arc<dyn ScriptStore>,
        device: Arc<dyn InputControl>,
    ) -> Result<Self> {
        let commands = CommandRegistry::with_builtins().context("failed to register builtin commands")?;
        Ok(Self::with_registry(config, store, device, commands))
    }

    /// Create a kernel with a custom command registry.
    pub fn with_registry(
        config: KernelConfig,
        store: Arc<dyn ScriptStore>,
        device: Arc<dyn InputControl>,
        commands: CommandRegistry,
    ) -> Self {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        tracing::debug!(name = %config.name, commands = commands.len(), "kernel created");
        Self {
            shared: Arc::new(Shared {
                config,
                commands: Arc::new(commands),
                globals: Mutex::new(Scope::new()),
                bus: MessageBus::new(),
                scheduler: ScriptScheduler::new(),
                device,
                store,
                terminal: Mutex::new(OwnerSettings::default()),
                input_tx,
                input_rx: tokio::sync::Mutex::new(input_rx),
                busy: AtomicUsize::new(0),
                input_requests: AtomicU64::new(0),
            }),
        }
    }

    /// Get the kernel name.
    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    /// Execute one bare line against the global scope.
    ///
    /// Returns once the line's messages are on the bus. A `run` line returns
    /// after every script it started has ended.
    #[tracing::instrument(level = "info", skip(self, line), fields(line_len = line.len()))]
    pub async fn submit_line(&self, line: &str) -> Evaluation {
        let _busy = BusyGuard::enter(&self.shared);
        run_bare(&self.shared, line).await
    }

    /// Start a batch of scripts without waiting for it.
    ///
    /// Must be called from within a tokio runtime, which drives the
    /// scripts; otherwise [`StartError::NoRuntime`] is returned.
    pub fn start(&self, names: &[&str]) -> Result<BatchHandle, StartError> {
        let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        self.shared.start_batch(None, &names)
    }

    /// Names of running instances, in start order.
    pub fn list_active_instances(&self) -> Vec<String> {
        self.shared.scheduler.names()
    }

    /// Force-end one instance or all of them. Returns the names stopped.
    pub fn stop_instance(&self, target: impl Into<StopTarget>) -> Vec<String> {
        self.shared.scheduler.stop(&self.shared.bus, &target.into())
    }

    /// Take every pending message, in production order.
    pub fn drain_messages(&self) -> Vec<TerminalMessage> {
        self.shared.bus.drain()
    }

    /// Feed one line to a pending `readline` or `readkey`.
    pub fn provide_input(&self, line: impl Into<String>) {
        if self.shared.input_tx.send(line.into()).is_err() {
            tracing::warn!("input channel closed; line dropped");
        }
    }

    /// How many `readline`/`readkey` reads have started. A host that
    /// answers each one with [`Kernel::provide_input`] keeps input in step.
    pub fn input_requests(&self) -> u64 {
        self.shared.input_requests.load(Ordering::SeqCst)
    }

    /// Read a global variable.
    pub fn global(&self, name: &str) -> Option<Variable> {
        self.shared.globals().get(name).cloned()
    }

    /// All global variables, sorted by name.
    pub fn globals(&self) -> Vec<(String, Variable)> {
        self.shared.globals().all()
    }

    /// Scripts `run` can find, sorted.
    pub fn script_names(&self) -> Result<Vec<String>, StoreError> {
        self.shared.store.names()
    }

    /// Schemas of every registered command, in registration order.
    pub fn command_schemas(&self) -> Vec<CommandSchema> {
        self.shared.commands.schemas().cloned().collect()
    }

    /// Wait until no script is running.
    pub async fn wait_idle(&self) {
        self.shared.scheduler.wait_idle().await;
    }
}

impl Drop for Kernel {
    fn drop(&mut self) {
        self.shared.scheduler.shutdown();
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("name", &self.shared.config.name)
            .field("scheduler", &self.shared.scheduler)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kernel() -> Kernel {
        Kernel::new(KernelConfig::isolated()).expect("kernel")
    }

    #[tokio::test]
    async fn bare_line_brackets_input_toggle() {
        let kernel = kernel();
        kernel.submit_line("print hi").await;
        assert_eq!(
            kernel.drain_messages(),
            vec![
                TerminalMessage::InputEnabled { enabled: false },
                TerminalMessage::output("hi\n"),
                TerminalMessage::InputEnabled { enabled: true },
            ]
        );
    }

    #[tokio::test]
    async fn bare_errors_have_no_prefix() {
        let kernel = kernel();
        let eval = kernel.submit_line("nope").await;
        assert!(eval.failed);
        let errors: Vec<_> = kernel
            .drain_messages()
            .into_iter()
            .filter(|m| m.is_error())
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].text(),
            Some("'nope' is not recognized as an internal command. Try using command 'help'\n")
        );
    }

    #[tokio::test]
    async fn globals_are_visible_to_the_host() {
        let kernel = kernel();
        kernel.submit_line("var x 5").await;
        assert_eq!(kernel.global("x"), Some(Variable::text("5")));
        assert_eq!(kernel.globals().len(), 1);
    }

    #[tokio::test]
    async fn reads_are_counted() {
        let kernel = kernel();
        assert_eq!(kernel.input_requests(), 0);
        kernel.provide_input("a");
        kernel.provide_input("b");
        kernel.submit_line("readline").await;
        kernel.submit_line("readkey").await;
        assert_eq!(kernel.input_requests(), 2);
    }

    #[tokio::test]
    async fn overlapping_lines_enable_input_once() {
        let kernel = kernel();
        tokio::join!(kernel.submit_line("wait 0.05"), kernel.submit_line("print x"));
        let messages = kernel.drain_messages();
        let enabled: Vec<_> = messages
            .iter()
            .filter(|m| **m == TerminalMessage::InputEnabled { enabled: true })
            .collect();
        assert_eq!(enabled.len(), 1);
        assert_eq!(messages.last(), Some(&TerminalMessage::InputEnabled { enabled: true }));
    }

    #[test]
    fn start_outside_a_runtime_is_an_error() {
        let store = MemoryStore::new().with("a", "print a");
        let kernel = Kernel::with_parts(
            KernelConfig::isolated(),
            Arc::new(store),
            Arc::new(HeadlessDevice::default()),
        )
        .expect("kernel");
        assert!(matches!(kernel.start(&["a"]), Err(StartError::NoRuntime)));
        assert!(kernel.list_active_instances().is_empty());
    }

    #[tokio::test]
    async fn missing_script_dir_is_an_error() {
        let config = KernelConfig::isolated().with_script_dir("/definitely/not/here");
        assert!(Kernel::new(config).is_err());
    }

    #[test]
    fn config_builders() {
        let config = KernelConfig::named("k")
            .with_script_extension("txt")
            .with_error_color("#00ff00");
        assert_eq!(config.name, "k");
        assert_eq!(config.script_extension, "txt");
        assert_eq!(config.error_color, "#00ff00");
        assert!(config.script_dir.is_none());
    }
}
