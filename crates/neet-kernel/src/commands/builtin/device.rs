//! Device commands. Arguments are validated here; the work is done by the
//! kernel's [`InputControl`](crate::device::InputControl).

use std::time::Duration;

use async_trait::async_trait;
use neet_types::{CommandSchema, Style, Variable};

use super::{arg, format_number, parse_number, rest};
use crate::commands::{Command, CommandError, CommandResult, LineContext};
use crate::device::{is_valid_key, MouseButton, Point};

/// Parse `args[first]` and `args[first + 1]` as a point.
fn point(ctx: &dyn LineContext, args: &[String], first: usize) -> Result<Point, CommandError> {
    let x = parse_number(&ctx.interpolate(arg(args, first)));
    let y = parse_number(&ctx.interpolate(arg(args, first + 1)));
    match (x, y) {
        (Some(x), Some(y)) => Ok(Point { x, y }),
        _ => Err(CommandError::Usage),
    }
}

/// A button argument, defaulting to left.
fn button(ctx: &dyn LineContext, args: &[String], allowed: &[MouseButton]) -> Result<MouseButton, CommandError> {
    let name = ctx.interpolate(arg(args, 0));
    let name = if name.is_empty() { "left" } else { name.as_str() };
    MouseButton::parse(name)
        .filter(|b| allowed.contains(b))
        .ok_or(CommandError::Usage)
}

/// A key argument: one character or a named key.
fn key(ctx: &dyn LineContext, args: &[String]) -> Result<String, CommandError> {
    let key = ctx.interpolate(arg(args, 0));
    if is_valid_key(&key) {
        Ok(key)
    } else {
        Err(CommandError::Usage)
    }
}

fn delay(ctx: &dyn LineContext, args: &[String]) -> Result<Duration, CommandError> {
    parse_number(&ctx.interpolate(arg(args, 0)))
        .filter(|s| *s >= 0.0)
        .and_then(|s| Duration::try_from_secs_f64(s).ok())
        .ok_or(CommandError::Usage)
}

pub struct Click;

#[async_trait]
impl Command for Click {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("click", "Clicks the mouse.")
            .param("button", "The mouse button. Can be: left, right. Default: left")
            .param("type", "The click type. Can be: double, single. Default: single")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let button = button(ctx, &args, &[MouseButton::Left, MouseButton::Right])?;
        let double = match ctx.interpolate(arg(&args, 1)).as_str() {
            "" | "single" => false,
            "double" => true,
            _ => return Err(CommandError::Usage),
        };
        ctx.device().mouse_click(button, double).await?;
        Ok(())
    }
}

pub struct Move;

#[async_trait]
impl Command for Move {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("move", "Moves the mouse.")
            .param("x", "The X coordinate to move to.")
            .param("y", "The Y coordinate to move to.")
            .param("speed?", "The speed of the mouse movement. OPTIONAL.")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let to = point(ctx, &args, 0)?;
        let speed = ctx.interpolate(arg(&args, 2));
        if speed.is_empty() {
            ctx.device().move_mouse(to).await?;
            return Ok(());
        }

        let speed = parse_number(&speed)
            .filter(|s| *s > 0.0)
            .ok_or(CommandError::Usage)?;
        if speed > 10.0 {
            return Err(CommandError::failed("Move speed cannot be bigger than 10."));
        }
        ctx.device().move_mouse_smooth(to, speed).await?;
        Ok(())
    }
}

pub struct Drag;

#[async_trait]
impl Command for Drag {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("drag", "Drags the mouse with mouse button held down.")
            .param("x", "The X coordinate to drag to.")
            .param("y", "The Y coordinate to drag to.")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let to = point(ctx, &args, 0)?;
        ctx.device().drag_mouse(to).await?;
        Ok(())
    }
}

pub struct Scroll;

#[async_trait]
impl Command for Scroll {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("scroll", "Scrolls the mouse in any direction.")
            .param("x", "The X amount of the scroll.")
            .param("y", "The Y amount of the scroll.")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let by = point(ctx, &args, 0)?;
        ctx.device().scroll_mouse(by.x, by.y).await?;
        Ok(())
    }
}

/// Store the pointer position in two variables.
pub struct Position;

#[async_trait]
impl Command for Position {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("position", "Gets the position of the mouse.")
            .param("variableX", "The variable that will be used for the X value of the mouse.")
            .param("variableY", "The variable that will be used for the Y value of the mouse.")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let (vx, vy) = (arg(&args, 0), arg(&args, 1));
        if vx.is_empty() || vy.is_empty() {
            return Err(CommandError::Usage);
        }
        let at = ctx.device().mouse_position().await?;
        ctx.assign(vx, Variable::Text(format_number(at.x)))?;
        ctx.assign(vy, Variable::Text(format_number(at.y)))?;
        Ok(())
    }
}

pub struct Pixel;

#[async_trait]
impl Command for Pixel {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("pixel", "Gets the color of a pixel on the screen.")
            .param("x", "The X coordinate of the pixel.")
            .param("y", "The Y coordinate of the pixel.")
            .returns("Color string, Example: #123456")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let at = point(ctx, &args, 0)?;
        let color = ctx.device().pixel_color(at).await?;
        ctx.respond(&color, Style::plain());
        Ok(())
    }
}

/// Store the screen size in two variables.
pub struct ScreenSize;

#[async_trait]
impl Command for ScreenSize {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("screensize", "Gets the width and height of the screen.")
            .alias("size")
            .param("variableWidth", "The variable that will be used for the width of the screen.")
            .param("variableHeight", "The variable that will be used for the height of the screen.")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let (vw, vh) = (arg(&args, 0), arg(&args, 1));
        if vw.is_empty() || vh.is_empty() {
            return Err(CommandError::Usage);
        }
        let size = ctx.device().screen_size().await?;
        ctx.assign(vw, Variable::Text(size.width.to_string()))?;
        ctx.assign(vh, Variable::Text(size.height.to_string()))?;
        Ok(())
    }
}

pub struct MouseDelay;

#[async_trait]
impl Command for MouseDelay {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("mousedelay", "Sets the delay of the mouse.")
            .alias("msdelay")
            .param("delay", "The delay of the mouse in SECONDS.")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let delay = delay(ctx, &args)?;
        ctx.device().set_mouse_delay(delay).await?;
        Ok(())
    }
}

pub struct KeyboardDelay;

#[async_trait]
impl Command for KeyboardDelay {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("keyboarddelay", "Sets the typing delay of the keyboard.")
            .alias("kbdelay")
            .param("delay", "The delay of typing to keyboard in SECONDS.")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let delay = delay(ctx, &args)?;
        ctx.device().set_keyboard_delay(delay).await?;
        Ok(())
    }
}

/// Set the owner's typing speed. Anything but a positive number resets it.
pub struct TypeCpm;

#[async_trait]
impl Command for TypeCpm {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("typecpm", "Sets the type speed.")
            .param("cpm", "Sets the characters per minute.")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let cpm = parse_number(&ctx.interpolate(arg(&args, 0))).filter(|c| *c > 0.0);
        ctx.set_typing_cpm(cpm);
        Ok(())
    }
}

pub struct TypeText;

#[async_trait]
impl Command for TypeText {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("type", "Types a text in the keyboard.")
            .alias("typetext")
            .param("text", "The text to type in keyboard.")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let text = ctx.interpolate(&rest(&args, 0));
        if text.is_empty() {
            return Err(CommandError::Usage);
        }
        let cpm = ctx.typing_cpm();
        ctx.device().type_text(&text, cpm).await?;
        Ok(())
    }
}

pub struct KeyTap;

#[async_trait]
impl Command for KeyTap {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("keytap", "Taps to a key in the keyboard.")
            .param("key", "The key to press in the keyboard.")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let key = key(ctx, &args)?;
        ctx.device().key_tap(&key).await?;
        Ok(())
    }
}

pub struct KeyDown;

#[async_trait]
impl Command for KeyDown {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("keydown", "Presses a key down in the keyboard.")
            .param("key", "The key to press down in the keyboard.")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let key = key(ctx, &args)?;
        ctx.device().key_toggle(&key, true).await?;
        Ok(())
    }
}

pub struct KeyUp;

#[async_trait]
impl Command for KeyUp {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("keyup", "Releases a key in the keyboard.")
            .param("key", "The key to release up in the keyboard.")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let key = key(ctx, &args)?;
        ctx.device().key_toggle(&key, false).await?;
        Ok(())
    }
}

const ANY_BUTTON: [MouseButton; 3] = [MouseButton::Left, MouseButton::Right, MouseButton::Middle];

pub struct MouseDown;

#[async_trait]
impl Command for MouseDown {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("mousedown", "Presses a mouse button down in the mouse.")
            .param("button", "The button to press down in the mouse.")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let button = button(ctx, &args, &ANY_BUTTON)?;
        ctx.device().mouse_toggle(button, true).await?;
        Ok(())
    }
}

pub struct MouseUp;

#[async_trait]
impl Command for MouseUp {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("mouseup", "Releases a mouse button in the mouse.")
            .param("button", "The button to release in the mouse.")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let button = button(ctx, &args, &ANY_BUTTON)?;
        ctx.device().mouse_toggle(button, false).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DeviceCall, RecordingContext};

    fn words(line: &str) -> Vec<String> {
        line.split(' ').map(String::from).collect()
    }

    #[tokio::test]
    async fn click_defaults_and_validation() {
        let mut ctx = RecordingContext::bare();
        Click.execute(vec![], &mut ctx).await.unwrap();
        Click.execute(words("right double"), &mut ctx).await.unwrap();
        assert_eq!(Click.execute(words("middle"), &mut ctx).await, Err(CommandError::Usage));
        assert_eq!(
            ctx.device_calls(),
            vec![
                DeviceCall::Click(MouseButton::Left, false),
                DeviceCall::Click(MouseButton::Right, true),
            ]
        );
    }

    #[tokio::test]
    async fn move_speed_limits() {
        let mut ctx = RecordingContext::bare();
        Move.execute(words("10 20"), &mut ctx).await.unwrap();
        Move.execute(words("1 2 5"), &mut ctx).await.unwrap();
        let err = Move.execute(words("1 2 11"), &mut ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "Move speed cannot be bigger than 10.");
        assert_eq!(Move.execute(words("1 2 0"), &mut ctx).await, Err(CommandError::Usage));
        assert_eq!(Move.execute(words("1"), &mut ctx).await, Err(CommandError::Usage));
        assert_eq!(
            ctx.device_calls(),
            vec![
                DeviceCall::Move(Point { x: 10.0, y: 20.0 }),
                DeviceCall::MoveSmooth(Point { x: 1.0, y: 2.0 }, 5.0),
            ]
        );
    }

    #[tokio::test]
    async fn position_and_size_assign_variables() {
        let mut ctx = RecordingContext::in_script("s", &["position px py"]);
        Move.execute(words("3 4"), &mut ctx).await.unwrap();
        Position.execute(words("px py"), &mut ctx).await.unwrap();
        ScreenSize.execute(words("w h"), &mut ctx).await.unwrap();
        assert_eq!(ctx.locals.get("px"), Some(&Variable::text("3")));
        assert_eq!(ctx.locals.get("py"), Some(&Variable::text("4")));
        assert_eq!(ctx.locals.get("w"), Some(&Variable::text("800")));
        assert_eq!(ctx.locals.get("h"), Some(&Variable::text("600")));
    }

    #[tokio::test]
    async fn pixel_responds_with_color() {
        let mut ctx = RecordingContext::bare();
        Pixel.execute(words("1 1"), &mut ctx).await.unwrap();
        assert_eq!(ctx.responses, vec!["#123456"]);
    }

    #[tokio::test]
    async fn typing_uses_owner_speed() {
        let mut ctx = RecordingContext::bare();
        TypeText.execute(words("fast"), &mut ctx).await.unwrap();
        TypeCpm.execute(words("300"), &mut ctx).await.unwrap();
        TypeText.execute(words("slow text"), &mut ctx).await.unwrap();
        TypeCpm.execute(words("-1"), &mut ctx).await.unwrap();
        assert_eq!(ctx.cpm, None);
        assert_eq!(
            ctx.device_calls(),
            vec![
                DeviceCall::Type("fast".into(), None),
                DeviceCall::Type("slow text".into(), Some(300.0)),
            ]
        );
    }

    #[tokio::test]
    async fn keys_are_validated() {
        let mut ctx = RecordingContext::bare();
        KeyTap.execute(words("a"), &mut ctx).await.unwrap();
        KeyDown.execute(words("shift"), &mut ctx).await.unwrap();
        KeyUp.execute(words("shift"), &mut ctx).await.unwrap();
        assert_eq!(KeyTap.execute(words("ctrl"), &mut ctx).await, Err(CommandError::Usage));
        assert_eq!(KeyTap.execute(vec![], &mut ctx).await, Err(CommandError::Usage));
        assert_eq!(
            ctx.device_calls(),
            vec![
                DeviceCall::KeyTap("a".into()),
                DeviceCall::KeyToggle("shift".into(), true),
                DeviceCall::KeyToggle("shift".into(), false),
            ]
        );
    }

    #[tokio::test]
    async fn mouse_toggle_accepts_middle() {
        let mut ctx = RecordingContext::bare();
        MouseDown.execute(words("middle"), &mut ctx).await.unwrap();
        MouseUp.execute(vec![], &mut ctx).await.unwrap();
        assert_eq!(
            ctx.device_calls(),
            vec![
                DeviceCall::MouseToggle(MouseButton::Middle, true),
                DeviceCall::MouseToggle(MouseButton::Left, false),
            ]
        );
    }

    #[tokio::test]
    async fn delays() {
        let mut ctx = RecordingContext::bare();
        MouseDelay.execute(words("0.25"), &mut ctx).await.unwrap();
        KeyboardDelay.execute(words("1"), &mut ctx).await.unwrap();
        assert_eq!(MouseDelay.execute(words("x"), &mut ctx).await, Err(CommandError::Usage));
        assert_eq!(MouseDelay.execute(words("1e30"), &mut ctx).await, Err(CommandError::Usage));
        assert_eq!(KeyboardDelay.execute(words("1e30"), &mut ctx).await, Err(CommandError::Usage));
        assert_eq!(
            ctx.device_calls(),
            vec![
                DeviceCall::MouseDelay(Duration::from_millis(250)),
                DeviceCall::KeyboardDelay(Duration::from_secs(1)),
            ]
        );
    }
}
