//! Control flow: running scripts, moving the counter and pseudo ticks.

use std::time::Duration;

use async_trait::async_trait;
use neet_types::{CommandSchema, Style, Variable};

use super::{arg, parse_integer, parse_number, rest};
use crate::commands::{Command, CommandError, CommandResult, LineContext};

/// Start scripts and wait until all of them end.
pub struct Run;

#[async_trait]
impl Command for Run {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("run", "Runs script file(s).")
            .param("script", "The name of the script")
            .usage_top("[script] [script]...")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let names: Vec<String> = args
            .iter()
            .map(|a| ctx.interpolate(a.trim()))
            .filter(|a| !a.is_empty())
            .collect();
        if names.is_empty() {
            return Ok(());
        }
        ctx.run_scripts(names).await?;
        Ok(())
    }
}

/// Jump to a 1-based line of the owning script.
pub struct Goto;

#[async_trait]
impl Command for Goto {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("goto", "Goes to a line in the script.").param("line", "The target line")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        if ctx.instance_name().is_none() {
            return Err(CommandError::Usage);
        }
        let line = parse_integer(&ctx.interpolate(arg(&args, 0))).ok_or(CommandError::Usage)?;
        if line < 1 || line as usize > ctx.source().len() {
            return Err(CommandError::Usage);
        }
        let target = (line - 1) as usize;
        if target == ctx.current_index() {
            return Err(CommandError::failed("You cannot go to the same line!"));
        }
        ctx.set_counter(target);
        Ok(())
    }
}

/// Move the counter by a relative amount.
pub struct Skip;

#[async_trait]
impl Command for Skip {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("skip", "Skips the given amount of lines in the script.")
            .param("amount", "The amount of lines to skip")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        if ctx.instance_name().is_none() {
            return Err(CommandError::Usage);
        }
        let amount = parse_integer(&ctx.interpolate(arg(&args, 0))).ok_or(CommandError::Usage)?;
        let target = ctx.current_index() as i64 + amount;
        if target < 0 || target as usize >= ctx.source().len() {
            return Err(CommandError::Usage);
        }
        if amount == 0 {
            return Err(CommandError::failed("You cannot go to the same line!"));
        }
        ctx.set_counter(target as usize);
        Ok(())
    }
}

/// Run another line of the script right now, without moving the counter.
pub struct Visit;

#[async_trait]
impl Command for Visit {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("visit", "Runs a line in the script immediately.")
            .param("line", "The target line")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        if ctx.instance_name().is_none() {
            return Err(CommandError::failed("Running line is only allowed in scripts."));
        }
        let line = parse_integer(&ctx.interpolate(arg(&args, 0))).ok_or(CommandError::Usage)?;
        if line < 1 || line as usize > ctx.source().len() {
            return Err(CommandError::Usage);
        }
        let target = (line - 1) as usize;
        if target == ctx.current_index() {
            return Err(CommandError::failed("You cannot visit the same line!"));
        }
        let code = ctx.source()[target].clone();
        ctx.evaluate(&code, false).await;
        Ok(())
    }
}

const COMPARATORS: [&str; 6] = ["==", "!=", ">", "<", ">=", "<="];

/// Compare two values and optionally run code when the comparison holds.
pub struct If;

#[async_trait]
impl Command for If {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new(
            "if",
            "Checks if statement is true, and if it is, runs the code immediately.",
        )
        .param("a", "First value.")
        .param(
            "comparator",
            "The comparator. Can be:\n    \
             == Checks if two values are equal\n    \
             != Checks if two values are not equal\n    \
             >  Checks if the first value is bigger than the second value\n    \
             <  Checks if the first value is smaller than the second value\n    \
             >= Checks if the first value is bigger than or equal to the second value\n    \
             <= Checks if the first value is smaller than or equal to the second value",
        )
        .param("b", "Second value.")
        .param("code", "This code will be ran if the statement was correct")
        .returns("1 or 0 when no code is given")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let a = ctx.interpolate(arg(&args, 0));
        let comparator = arg(&args, 1);
        let b = ctx.interpolate(arg(&args, 2));
        let code = rest(&args, 3).trim().to_string();
        if a.is_empty() || b.is_empty() || !COMPARATORS.contains(&comparator) {
            return Err(CommandError::Usage);
        }

        let holds = match comparator {
            "==" => a == b,
            "!=" => a != b,
            _ => {
                let x = parse_number(&a)
                    .ok_or_else(|| CommandError::failed("Expected first value to be a numeric."))?;
                let y = parse_number(&b)
                    .ok_or_else(|| CommandError::failed("Expected second value to be a numeric."))?;
                match comparator {
                    ">" => x > y,
                    "<" => x < y,
                    ">=" => x >= y,
                    _ => x <= y,
                }
            }
        };

        match (holds, code.is_empty()) {
            (true, false) => {
                ctx.evaluate(&code, false).await;
            }
            (true, true) => ctx.respond("1", Style::plain()),
            (false, true) => ctx.respond("0", Style::plain()),
            (false, false) => {}
        }
        Ok(())
    }
}

/// Store the captured result of another line in a variable.
pub struct Assign;

#[async_trait]
impl Command for Assign {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("assign", "Assigns the variable a result of a code.")
            .alias("asg")
            .param("variable", "The variable's name.")
            .param("code", "The code.")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let name = ctx.interpolate(arg(&args, 0));
        let code = rest(&args, 1);
        if name.is_empty() || code.trim().is_empty() {
            return Err(CommandError::Usage);
        }

        let eval = ctx.evaluate(&code, true).await;
        if eval.failed || eval.captured.is_empty() {
            return Ok(());
        }
        ctx.assign(&name, Variable::Text(eval.captured))?;
        Ok(())
    }
}

/// Suspend the owner for a number of seconds.
pub struct Wait;

#[async_trait]
impl Command for Wait {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("wait", "Stops the process for the given time.")
            .param("delay", "The delay in seconds")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let seconds = parse_number(&ctx.interpolate(arg(&args, 0)))
            .filter(|s| *s >= 0.0)
            .ok_or(CommandError::Usage)?;
        let delay = Duration::try_from_secs_f64(seconds).map_err(|_| CommandError::Usage)?;
        ctx.sleep(delay).await;
        Ok(())
    }
}

/// End the owning script.
pub struct Stop;

#[async_trait]
impl Command for Stop {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("stop", "Stops the script.").alias("exit")
    }

    async fn execute(&self, _args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        if ctx.instance_name().is_none() {
            return Err(CommandError::failed("Exiting is only allowed in scripts."));
        }
        Err(CommandError::failed("Commanded stop action."))
    }
}
