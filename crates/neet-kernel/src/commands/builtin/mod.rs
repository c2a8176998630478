//! Built-in commands for neet.
//!
//! These commands are always available. Handlers receive the raw argument
//! tokens of the line and interpolate the ones they treat as values.

mod control;
mod device;
mod math;
mod terminal;
mod text;
mod vars;

use super::{CommandRegistry, RegistryError};

/// Register all built-in commands with the registry.
pub fn register_builtins(registry: &mut CommandRegistry) -> Result<(), RegistryError> {
    registry.register(terminal::Help)?;
    registry.register(control::Run)?;
    registry.register(terminal::Clear)?;
    registry.register(control::Goto)?;
    registry.register(control::Skip)?;
    registry.register(control::Visit)?;
    registry.register(terminal::Print)?;
    registry.register(terminal::Write)?;
    registry.register(control::Wait)?;
    registry.register(control::If)?;
    registry.register(vars::Var)?;
    registry.register(vars::DeleteVar)?;
    registry.register(vars::Glob)?;
    registry.register(vars::DeleteGlob)?;
    registry.register(text::IsNumeric)?;
    registry.register(math::Operation)?;
    registry.register(math::Math)?;
    registry.register(math::Random)?;
    registry.register(math::RandomF)?;
    registry.register(text::Substring)?;
    registry.register(text::Replace)?;
    registry.register(text::ReplaceAll)?;
    registry.register(control::Assign)?;
    registry.register(control::Stop)?;
    registry.register(device::Click)?;
    registry.register(device::Move)?;
    registry.register(device::Drag)?;
    registry.register(device::Scroll)?;
    registry.register(device::Position)?;
    registry.register(device::Pixel)?;
    registry.register(device::ScreenSize)?;
    registry.register(device::MouseDelay)?;
    registry.register(device::KeyboardDelay)?;
    registry.register(terminal::ReadLine)?;
    registry.register(terminal::ReadKey)?;
    registry.register(device::TypeCpm)?;
    registry.register(device::TypeText)?;
    registry.register(device::KeyTap)?;
    registry.register(device::KeyDown)?;
    registry.register(device::KeyUp)?;
    registry.register(device::MouseDown)?;
    registry.register(device::MouseUp)?;
    registry.register(vars::VarType)?;
    registry.register(vars::ListCreate)?;
    registry.register(vars::ListAdd)?;
    registry.register(vars::ListGet)?;
    registry.register(vars::ListLength)?;
    registry.register(vars::ObjCreate)?;
    registry.register(vars::ObjSet)?;
    registry.register(vars::ObjGet)?;
    registry.register(vars::ObjKeys)?;
    Ok(())
}

/// Argument `index`, or `""` when the line has fewer arguments.
fn arg(args: &[String], index: usize) -> &str {
    args.get(index).map(String::as_str).unwrap_or("")
}

/// Arguments from `from` on, joined back with single spaces.
fn rest(args: &[String], from: usize) -> String {
    args.get(from..).map(|a| a.join(" ")).unwrap_or_default()
}

/// Parse a finite number. Surrounding whitespace is allowed.
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Parse a finite number with no fractional part.
pub fn parse_integer(text: &str) -> Option<i64> {
    let n = parse_number(text)?;
    if n.fract() != 0.0 || n.abs() > 9_007_199_254_740_991.0 {
        return None;
    }
    Some(n as i64)
}

/// Format a number for scripts: integers print without a fraction and
/// negative zero prints as `0`.
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}
