//! Test doubles for command handlers.
//!
//! [`RecordingContext`] stands in for the tick engine: it keeps its scopes
//! and counter in plain fields and records every side effect so a test can
//! run one handler and inspect what it did. [`RecordingDevice`] does the same
//! for input control.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use neet_types::{Style, TerminalMessage, Variable};

use crate::commands::{CommandRegistry, LineContext};
use crate::device::{DeviceResult, InputControl, MouseButton, Point, ScreenSize};
use crate::interpreter::{interpolate, lookup_text, AssignError, Evaluation, Scope};
use crate::scheduler::StartError;

/// One recorded device action.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    Click(MouseButton, bool),
    MouseToggle(MouseButton, bool),
    Move(Point),
    MoveSmooth(Point, f64),
    Drag(Point),
    Scroll(f64, f64),
    MouseDelay(Duration),
    KeyboardDelay(Duration),
    Type(String, Option<f64>),
    KeyTap(String),
    KeyToggle(String, bool),
}

/// Records actions; reports an 800x600 screen where every pixel is `#123456`.
#[derive(Debug, Default)]
pub struct RecordingDevice {
    calls: Mutex<Vec<DeviceCall>>,
    pointer: Mutex<Point>,
}

impl RecordingDevice {
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn record(&self, call: DeviceCall) {
        if let DeviceCall::Move(to) | DeviceCall::MoveSmooth(to, _) | DeviceCall::Drag(to) = &call {
            *self.pointer.lock().unwrap_or_else(PoisonError::into_inner) = *to;
        }
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);
    }
}

#[async_trait]
impl InputControl for RecordingDevice {
    async fn mouse_click(&self, button: MouseButton, double: bool) -> DeviceResult<()> {
        self.record(DeviceCall::Click(button, double));
        Ok(())
    }

    async fn mouse_toggle(&self, button: MouseButton, down: bool) -> DeviceResult<()> {
        self.record(DeviceCall::MouseToggle(button, down));
        Ok(())
    }

    async fn move_mouse(&self, to: Point) -> DeviceResult<()> {
        self.record(DeviceCall::Move(to));
        Ok(())
    }

    async fn move_mouse_smooth(&self, to: Point, speed: f64) -> DeviceResult<()> {
        self.record(DeviceCall::MoveSmooth(to, speed));
        Ok(())
    }

    async fn drag_mouse(&self, to: Point) -> DeviceResult<()> {
        self.record(DeviceCall::Drag(to));
        Ok(())
    }

    async fn scroll_mouse(&self, x: f64, y: f64) -> DeviceResult<()> {
        self.record(DeviceCall::Scroll(x, y));
        Ok(())
    }

    async fn mouse_position(&self) -> DeviceResult<Point> {
        Ok(*self.pointer.lock().unwrap_or_else(PoisonError::into_inner))
    }

    async fn pixel_color(&self, _at: Point) -> DeviceResult<String> {
        Ok("#123456".to_string())
    }

    async fn screen_size(&self) -> DeviceResult<ScreenSize> {
        Ok(ScreenSize {
            width: 800,
            height: 600,
        })
    }

    async fn set_mouse_delay(&self, delay: Duration) -> DeviceResult<()> {
        self.record(DeviceCall::MouseDelay(delay));
        Ok(())
    }

    async fn set_keyboard_delay(&self, delay: Duration) -> DeviceResult<()> {
        self.record(DeviceCall::KeyboardDelay(delay));
        Ok(())
    }

    async fn type_text(&self, text: &str, cpm: Option<f64>) -> DeviceResult<()> {
        self.record(DeviceCall::Type(text.to_string(), cpm));
        Ok(())
    }

    async fn key_tap(&self, key: &str) -> DeviceResult<()> {
        self.record(DeviceCall::KeyTap(key.to_string()));
        Ok(())
    }

    async fn key_toggle(&self, key: &str, down: bool) -> DeviceResult<()> {
        self.record(DeviceCall::KeyToggle(key.to_string(), down));
        Ok(())
    }
}

/// A [`LineContext`] with public state.
///
/// Pseudo evaluation, script runs, sleeps and input reads are recorded
/// rather than performed.
pub struct RecordingContext {
    pub output: Vec<TerminalMessage>,
    pub responses: Vec<String>,
    pub errors: Vec<String>,
    pub locals: Scope,
    pub globals: Scope,
    /// Owning instance name; `None` for a bare line.
    pub instance: Option<String>,
    pub source: Vec<String>,
    pub counter: usize,
    pub jump: Option<usize>,
    pub cpm: Option<f64>,
    pub inputs: VecDeque<String>,
    pub slept: Vec<Duration>,
    pub started: Vec<Vec<String>>,
    /// `(line, quiet)` for every pseudo evaluation.
    pub evaluated: Vec<(String, bool)>,
    /// Captured text returned by the next pseudo evaluation.
    pub next_capture: Option<String>,
    commands: CommandRegistry,
    device: Arc<RecordingDevice>,
}

impl RecordingContext {
    /// A context for a line typed at the terminal.
    pub fn bare() -> Self {
        Self {
            output: Vec::new(),
            responses: Vec::new(),
            errors: Vec::new(),
            locals: Scope::new(),
            globals: Scope::new(),
            instance: None,
            source: Vec::new(),
            counter: 0,
            jump: None,
            cpm: None,
            inputs: VecDeque::new(),
            slept: Vec::new(),
            started: Vec::new(),
            evaluated: Vec::new(),
            next_capture: None,
            commands: CommandRegistry::with_builtins().unwrap_or_else(|_| CommandRegistry::new()),
            device: Arc::new(RecordingDevice::default()),
        }
    }

    /// A context for a line of script `name` with the given source.
    pub fn in_script(name: &str, source: &[&str]) -> Self {
        Self {
            instance: Some(name.to_string()),
            source: source.iter().map(|l| l.to_string()).collect(),
            ..Self::bare()
        }
    }

    /// Queue a line for `read_input`.
    pub fn with_input(mut self, line: &str) -> Self {
        self.inputs.push_back(line.to_string());
        self
    }

    /// All visible output text, concatenated.
    pub fn text(&self) -> String {
        self.output
            .iter()
            .filter_map(|m| match m {
                TerminalMessage::Output { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn device_calls(&self) -> Vec<DeviceCall> {
        self.device.calls()
    }

    fn active_scope(&mut self) -> &mut Scope {
        if self.instance.is_some() {
            &mut self.locals
        } else {
            &mut self.globals
        }
    }
}

#[async_trait]
impl LineContext for RecordingContext {
    fn write(&mut self, text: &str, style: Style) {
        self.output.push(TerminalMessage::Output {
            text: text.to_string(),
            style,
        });
    }

    fn respond(&mut self, text: &str, style: Style) {
        self.output.push(TerminalMessage::Output {
            text: format!("{}\n", text),
            style,
        });
        self.responses.push(text.to_string());
    }

    fn error(&mut self, text: &str) {
        self.output.push(TerminalMessage::Error {
            text: format!("{}\n", text),
            style: Style::plain(),
        });
        self.errors.push(text.to_string());
    }

    fn clear_screen(&mut self) {
        self.output.push(TerminalMessage::ClearScreen);
    }

    fn set_counter(&mut self, index: usize) -> bool {
        if self.instance.is_some() && index < self.source.len() {
            self.jump = Some(index);
            true
        } else {
            false
        }
    }

    fn current_index(&self) -> usize {
        self.counter
    }

    fn source(&self) -> &[String] {
        &self.source
    }

    fn is_pseudo(&self) -> bool {
        false
    }

    fn instance_name(&self) -> Option<&str> {
        self.instance.as_deref()
    }

    fn interpolate(&self, text: &str) -> String {
        let locals = self.instance.as_ref().map(|_| &self.locals);
        interpolate(text, |name| lookup_text(locals, &self.globals, name))
    }

    fn variable(&self, name: &str) -> Option<Variable> {
        self.locals
            .get(name)
            .filter(|_| self.instance.is_some())
            .or_else(|| self.globals.get(name))
            .cloned()
    }

    fn assign(&mut self, name: &str, value: Variable) -> Result<(), AssignError> {
        self.active_scope().assign(name, value)
    }

    fn update(&mut self, name: &str, value: Variable) -> Result<(), AssignError> {
        let local = self.instance.is_some() && self.locals.contains(name);
        if !local && self.globals.contains(name) {
            return self.globals.assign(name, value);
        }
        self.assign(name, value)
    }

    fn remove(&mut self, name: &str) -> Option<Variable> {
        self.active_scope().remove(name)
    }

    fn assign_global(&mut self, name: &str, value: Variable) -> Result<(), AssignError> {
        self.globals.assign(name, value)
    }

    fn remove_global(&mut self, name: &str) -> Option<Variable> {
        self.globals.remove(name)
    }

    fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    fn device(&self) -> &dyn InputControl {
        self.device.as_ref()
    }

    fn typing_cpm(&self) -> Option<f64> {
        self.cpm
    }

    fn set_typing_cpm(&mut self, cpm: Option<f64>) {
        self.cpm = cpm;
    }

    async fn evaluate(&mut self, line: &str, quiet: bool) -> Evaluation {
        self.evaluated.push((line.to_string(), quiet));
        Evaluation {
            captured: self.next_capture.take().unwrap_or_default(),
            ..Evaluation::default()
        }
    }

    async fn sleep(&mut self, duration: Duration) {
        self.slept.push(duration);
    }

    async fn run_scripts(&mut self, names: Vec<String>) -> Result<(), StartError> {
        self.started.push(names);
        Ok(())
    }

    async fn read_input(&mut self) -> Option<String> {
        self.inputs.pop_front()
    }
}
