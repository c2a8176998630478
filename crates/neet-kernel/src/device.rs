//! The input-control seam.
//!
//! Pointer, keyboard and display operations are performed by an external
//! capability. The kernel only defines the calling convention; the device
//! commands validate their arguments and delegate here.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by an input-control backend.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("input control is unavailable: {0}")]
    Unavailable(String),
    #[error("input control failed: {0}")]
    Failed(String),
}

pub type DeviceResult<T> = Result<T, DeviceError>;

/// A mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    /// Parse a script button name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "left" => Some(MouseButton::Left),
            "right" => Some(MouseButton::Right),
            "middle" => Some(MouseButton::Middle),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Middle => "middle",
        }
    }
}

/// A point on the screen.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Screen dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

/// Named keys accepted by `keytap`, `keydown` and `keyup`. Any single
/// character is accepted as well.
pub const NAMED_KEYS: &[&str] = &[
    "backspace", "delete", "enter", "tab", "escape", "up", "down", "right", "left", "home", "end",
    "pageup", "pagedown", "f1", "f2", "f3", "f4", "f5", "f6", "f7", "f8", "f9", "f10", "f11", "f12",
    "command", "alt", "control", "shift", "right_shift", "space", "printscreen", "insert",
    "audio_mute", "audio_vol_down", "audio_vol_up", "audio_play", "audio_stop", "audio_pause",
    "audio_prev", "audio_next", "audio_rewind", "audio_forward", "audio_repeat", "audio_random",
    "numpad_0", "numpad_1", "numpad_2", "numpad_3", "numpad_4", "numpad_5", "numpad_6", "numpad_7",
    "numpad_8", "numpad_9", "lights_mon_up", "lights_mon_down", "lights_kbd_toggle",
    "lights_kbd_up", "lights_kbd_down",
];

/// True for a single character or a named key.
pub fn is_valid_key(key: &str) -> bool {
    key.chars().count() == 1 || NAMED_KEYS.contains(&key)
}

/// Pointer, keyboard and display control.
#[async_trait]
pub trait InputControl: Send + Sync {
    async fn mouse_click(&self, button: MouseButton, double: bool) -> DeviceResult<()>;

    async fn mouse_toggle(&self, button: MouseButton, down: bool) -> DeviceResult<()>;

    async fn move_mouse(&self, to: Point) -> DeviceResult<()>;

    /// Move along a visible path. `speed` is in `(0, 10]`.
    async fn move_mouse_smooth(&self, to: Point, speed: f64) -> DeviceResult<()>;

    async fn drag_mouse(&self, to: Point) -> DeviceResult<()>;

    async fn scroll_mouse(&self, x: f64, y: f64) -> DeviceResult<()>;

    async fn mouse_position(&self) -> DeviceResult<Point>;

    /// Colour at a pixel as `#rrggbb`.
    async fn pixel_color(&self, at: Point) -> DeviceResult<String>;

    async fn screen_size(&self) -> DeviceResult<ScreenSize>;

    async fn set_mouse_delay(&self, delay: Duration) -> DeviceResult<()>;

    async fn set_keyboard_delay(&self, delay: Duration) -> DeviceResult<()>;

    /// Type text, rate-limited to `cpm` characters per minute when given.
    async fn type_text(&self, text: &str, cpm: Option<f64>) -> DeviceResult<()>;

    async fn key_tap(&self, key: &str) -> DeviceResult<()>;

    async fn key_toggle(&self, key: &str, down: bool) -> DeviceResult<()>;
}

/// A device with no hardware behind it.
///
/// Tracks the pointer position so `position` reflects earlier moves, reports
/// a fixed screen, and logs every action.
#[derive(Debug)]
pub struct HeadlessDevice {
    screen: ScreenSize,
    pointer: Mutex<Point>,
}

impl HeadlessDevice {
    pub fn new(screen: ScreenSize) -> Self {
        Self {
            screen,
            pointer: Mutex::new(Point::default()),
        }
    }

    fn set_pointer(&self, to: Point) {
        *self.pointer.lock().unwrap_or_else(PoisonError::into_inner) = to;
    }
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new(ScreenSize {
            width: 1920,
            height: 1080,
        })
    }
}

#[async_trait]
impl InputControl for HeadlessDevice {
    async fn mouse_click(&self, button: MouseButton, double: bool) -> DeviceResult<()> {
        tracing::info!(button = button.as_str(), double, "headless click");
        Ok(())
    }

    async fn mouse_toggle(&self, button: MouseButton, down: bool) -> DeviceResult<()> {
        tracing::info!(button = button.as_str(), down, "headless mouse toggle");
        Ok(())
    }

    async fn move_mouse(&self, to: Point) -> DeviceResult<()> {
        tracing::info!(x = to.x, y = to.y, "headless move");
        self.set_pointer(to);
        Ok(())
    }

    async fn move_mouse_smooth(&self, to: Point, speed: f64) -> DeviceResult<()> {
        tracing::info!(x = to.x, y = to.y, speed, "headless smooth move");
        self.set_pointer(to);
        Ok(())
    }

    async fn drag_mouse(&self, to: Point) -> DeviceResult<()> {
        tracing::info!(x = to.x, y = to.y, "headless drag");
        self.set_pointer(to);
        Ok(())
    }

    async fn scroll_mouse(&self, x: f64, y: f64) -> DeviceResult<()> {
        tracing::info!(x, y, "headless scroll");
        Ok(())
    }

    async fn mouse_position(&self) -> DeviceResult<Point> {
        Ok(*self.pointer.lock().unwrap_or_else(PoisonError::into_inner))
    }

    async fn pixel_color(&self, at: Point) -> DeviceResult<String> {
        tracing::info!(x = at.x, y = at.y, "headless pixel read");
        Ok("#000000".to_string())
    }

    async fn screen_size(&self) -> DeviceResult<ScreenSize> {
        Ok(self.screen)
    }

    async fn set_mouse_delay(&self, delay: Duration) -> DeviceResult<()> {
        tracing::info!(?delay, "headless mouse delay");
        Ok(())
    }

    async fn set_keyboard_delay(&self, delay: Duration) -> DeviceResult<()> {
        tracing::info!(?delay, "headless keyboard delay");
        Ok(())
    }

    async fn type_text(&self, text: &str, cpm: Option<f64>) -> DeviceResult<()> {
        tracing::info!(text, ?cpm, "headless type");
        Ok(())
    }

    async fn key_tap(&self, key: &str) -> DeviceResult<()> {
        tracing::info!(key, "headless key tap");
        Ok(())
    }

    async fn key_toggle(&self, key: &str, down: bool) -> DeviceResult<()> {
        tracing::info!(key, down, "headless key toggle");
        Ok(())
    }
}
