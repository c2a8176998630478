//! Text commands.

use async_trait::async_trait;
use neet_types::{CommandSchema, Style};

use super::{arg, parse_number, rest};
use crate::commands::{Command, CommandError, CommandResult, LineContext};

/// `1` if the argument is a number, else `0`.
pub struct IsNumeric;

#[async_trait]
impl Command for IsNumeric {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("isnumeric", "Checks if something is numeric.")
            .alias("isnum")
            .param("text", "A text")
            .returns("If is a number 1, unless 0")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let text = ctx.interpolate(arg(&args, 0));
        let answer = if parse_number(&text).is_some() { "1" } else { "0" };
        ctx.respond(answer, Style::plain());
        Ok(())
    }
}

/// Characters between two indices. Indices are clamped to the text, the
/// fraction is dropped, and reversed bounds are swapped.
pub fn substring(text: &str, start: f64, end: f64) -> String {
    let len = text.chars().count();
    let clamp = |n: f64| n.trunc().clamp(0.0, len as f64) as usize;
    let (a, b) = (clamp(start), clamp(end));
    let (from, to) = if a <= b { (a, b) } else { (b, a) };
    text.chars().skip(from).take(to - from).collect()
}

pub struct Substring;

#[async_trait]
impl Command for Substring {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new(
            "substring",
            "Extracts a portion of a string, based on the specified starting and ending indices.",
        )
        .alias("substr")
        .param("start", "The starting index.")
        .param("end", "The ending index.")
        .param("text", "The text.")
        .returns("string")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let start = parse_number(&ctx.interpolate(arg(&args, 0)));
        let end = parse_number(&ctx.interpolate(arg(&args, 1)));
        let (Some(start), Some(end)) = (start, end) else {
            return Err(CommandError::Usage);
        };
        let text = ctx.interpolate(&rest(&args, 2));
        ctx.respond(&substring(&text, start, end), Style::plain());
        Ok(())
    }
}

/// Replace the first occurrence.
pub struct Replace;

#[async_trait]
impl Command for Replace {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new(
            "replace",
            "Replaces a single occurrence of a specified text with a new text.",
        )
        .alias("rpl")
        .param("from", "The text that will be replaced.")
        .param("to", "The text that will be replaced with the 'from'.")
        .param("text", "The text.")
        .returns("string")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let from = ctx.interpolate(arg(&args, 0));
        let to = ctx.interpolate(arg(&args, 1));
        if from.is_empty() || to.is_empty() {
            return Err(CommandError::Usage);
        }
        let text = ctx.interpolate(&rest(&args, 2));
        ctx.respond(&text.replacen(&from, &to, 1), Style::plain());
        Ok(())
    }
}

/// Replace every occurrence.
pub struct ReplaceAll;

#[async_trait]
impl Command for ReplaceAll {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new(
            "replaceall",
            "Replaces all occurrences of a specified text with a new text.",
        )
        .alias("rplall")
        .param("from", "The text that will be replaced.")
        .param("to", "The text that will be replaced with the 'from'.")
        .param("text", "The text.")
        .returns("string")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let from = ctx.interpolate(arg(&args, 0));
        let to = ctx.interpolate(arg(&args, 1));
        if from.is_empty() || to.is_empty() {
            return Err(CommandError::Usage);
        }
        let text = ctx.interpolate(&rest(&args, 2));
        ctx.respond(&text.replace(&from, &to), Style::plain());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingContext;
    use rstest::rstest;

    fn words(line: &str) -> Vec<String> {
        line.split(' ').map(String::from).collect()
    }

    #[rstest]
    #[case::plain(0.0, 3.0, "hel")]
    #[case::swapped(3.0, 0.0, "hel")]
    #[case::clamped(-4.0, 99.0, "hello")]
    #[case::fraction(1.9, 3.2, "el")]
    #[case::empty(2.0, 2.0, "")]
    fn substring_bounds(#[case] start: f64, #[case] end: f64, #[case] expected: &str) {
        assert_eq!(substring("hello", start, end), expected);
    }

    #[test]
    fn substring_counts_chars() {
        assert_eq!(substring("héllo", 1.0, 2.0), "é");
    }

    #[tokio::test]
    async fn isnumeric() {
        let mut ctx = RecordingContext::bare();
        for arg in ["12", "-0.5", "abc", ""] {
            IsNumeric.execute(vec![arg.to_string()], &mut ctx).await.unwrap();
        }
        assert_eq!(ctx.responses, vec!["1", "1", "0", "0"]);
    }

    #[tokio::test]
    async fn substring_command() {
        let mut ctx = RecordingContext::bare();
        Substring.execute(words("0 5 hello world"), &mut ctx).await.unwrap();
        assert_eq!(ctx.responses, vec!["hello"]);
        assert_eq!(
            Substring.execute(words("a 5 hello"), &mut ctx).await,
            Err(CommandError::Usage)
        );
    }

    #[tokio::test]
    async fn replace_first_and_all() {
        let mut ctx = RecordingContext::bare();
        Replace.execute(words("a o banana"), &mut ctx).await.unwrap();
        ReplaceAll.execute(words("a o banana"), &mut ctx).await.unwrap();
        assert_eq!(ctx.responses, vec!["bonana", "bonono"]);
        assert_eq!(
            Replace.execute(words("a"), &mut ctx).await,
            Err(CommandError::Usage)
        );
    }
}
