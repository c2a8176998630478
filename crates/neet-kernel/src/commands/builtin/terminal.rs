//! Terminal I/O commands.

use async_trait::async_trait;
use neet_types::{CommandSchema, Style};

use super::{arg, rest};
use crate::commands::{Command, CommandError, CommandResult, LineContext};

/// List commands, or show one command's schema.
pub struct Help;

#[async_trait]
impl Command for Help {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("help", "Provides help information for Neet commands.")
            .alias("?")
            .param("command", "The name of the command")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let target = arg(&args, 0);
        if !target.is_empty() {
            let help = ctx
                .commands()
                .schema(target)
                .map(|s| s.render_help())
                .ok_or_else(|| CommandError::failed("This command is not supported by the help utility."))?;
            ctx.respond(&help, Style::plain());
            return Ok(());
        }

        let lines: Vec<String> = {
            let schemas: Vec<_> = ctx.commands().schemas().collect();
            let width = schemas.iter().map(|s| s.name().len()).max().unwrap_or(0) + 3;
            schemas
                .iter()
                .map(|s| format!("{:<width$}{}", s.name(), s.description, width = width))
                .collect()
        };
        ctx.respond(
            "For more information on a specific command, type 'help command-name'\n",
            Style::plain(),
        );
        for line in lines {
            ctx.respond(&line, Style::plain());
        }
        Ok(())
    }
}

/// Clear the terminal. Only bare lines may do this.
pub struct Clear;

#[async_trait]
impl Command for Clear {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("clear", "Clears the terminal.").alias("cls")
    }

    async fn execute(&self, _args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        if ctx.instance_name().is_some() {
            return Err(CommandError::failed("Clearing is only allowed in the terminal."));
        }
        ctx.clear_screen();
        Ok(())
    }
}

/// Print a line of text.
pub struct Print;

#[async_trait]
impl Command for Print {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("print", "Prints out a text.")
            .param("message", "the message to print")
            .returns("string")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let text = ctx.interpolate(&rest(&args, 0));
        ctx.respond(&text, Style::plain());
        Ok(())
    }
}

/// Print text without ending the line.
pub struct Write;

#[async_trait]
impl Command for Write {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("write", "Prints out a text without a new line.")
            .param("message", "the message to write")
            .returns("string")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let text = ctx.interpolate(&rest(&args, 0));
        ctx.write(&text, Style::plain());
        Ok(())
    }
}

fn strip_line_ending(mut line: String) -> String {
    while line.ends_with(['\n', '\r']) {
        line.pop();
    }
    line
}

/// Wait for a line of input.
pub struct ReadLine;

#[async_trait]
impl Command for ReadLine {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("readline", "Reads line from the terminal.").returns("string")
    }

    async fn execute(&self, _args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let line = ctx
            .read_input()
            .await
            .ok_or_else(|| CommandError::failed("No input available."))?;
        ctx.respond(&strip_line_ending(line), Style::plain());
        Ok(())
    }
}

/// Wait for input and keep its first character.
pub struct ReadKey;

#[async_trait]
impl Command for ReadKey {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("readkey", "Reads a key from the terminal.").returns("string")
    }

    async fn execute(&self, _args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let line = ctx
            .read_input()
            .await
            .ok_or_else(|| CommandError::failed("No input available."))?;
        let key: String = strip_line_ending(line).chars().take(1).collect();
        ctx.respond(&key, Style::plain());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingContext;
    use neet_types::{TerminalMessage, Variable};

    #[tokio::test]
    async fn print_interpolates_and_keeps_spacing() {
        let mut ctx = RecordingContext::bare();
        ctx.globals.assign("who", Variable::text("world")).unwrap();
        let args = vec!["hello".into(), "".into(), "$who".into()];
        Print.execute(args, &mut ctx).await.unwrap();
        assert_eq!(ctx.responses, vec!["hello  world"]);
    }

    #[tokio::test]
    async fn write_is_partial() {
        let mut ctx = RecordingContext::bare();
        Write.execute(vec!["a".into()], &mut ctx).await.unwrap();
        Write.execute(vec!["b".into()], &mut ctx).await.unwrap();
        assert_eq!(ctx.text(), "ab");
    }

    #[tokio::test]
    async fn help_for_one_command() {
        let mut ctx = RecordingContext::bare();
        Help.execute(vec!["cls".into()], &mut ctx).await.unwrap();
        assert!(ctx.responses[0].starts_with("Command: clear\nAliases: cls"));
    }

    #[tokio::test]
    async fn help_lists_every_command() {
        let mut ctx = RecordingContext::bare();
        Help.execute(vec![], &mut ctx).await.unwrap();
        assert!(ctx.responses[0].starts_with("For more information"));
        assert_eq!(ctx.responses.len(), 1 + ctx.commands().len());
        assert!(ctx.responses.iter().any(|r| r.starts_with("print ")));
    }

    #[tokio::test]
    async fn help_unknown_command() {
        let mut ctx = RecordingContext::bare();
        let err = Help.execute(vec!["nope".into()], &mut ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "This command is not supported by the help utility.");
    }

    #[tokio::test]
    async fn clear_only_in_terminal() {
        let mut ctx = RecordingContext::bare();
        Clear.execute(vec![], &mut ctx).await.unwrap();
        assert_eq!(ctx.output, vec![TerminalMessage::ClearScreen]);

        let mut script = RecordingContext::in_script("s", &["clear"]);
        assert!(Clear.execute(vec![], &mut script).await.is_err());
    }

    #[tokio::test]
    async fn readline_and_readkey() {
        let mut ctx = RecordingContext::bare()
            .with_input("typed text\r\n")
            .with_input("yes");
        ReadLine.execute(vec![], &mut ctx).await.unwrap();
        ReadKey.execute(vec![], &mut ctx).await.unwrap();
        assert_eq!(ctx.responses, vec!["typed text", "y"]);

        let err = ReadLine.execute(vec![], &mut ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "No input available.");
    }
}
