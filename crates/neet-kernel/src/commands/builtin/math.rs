//! Numeric commands.

use async_trait::async_trait;
use neet_types::{CommandSchema, Style};
use rand::Rng;

use super::{arg, format_number, parse_integer, parse_number};
use crate::arithmetic::{self, Operator};
use crate::commands::{Command, CommandError, CommandResult, LineContext};

fn finite(n: f64) -> Result<f64, CommandError> {
    if n.is_finite() {
        Ok(n)
    } else {
        Err(CommandError::failed("The result is not a finite number."))
    }
}

/// Evaluate `n op n op n ...`.
pub struct Operation;

#[async_trait]
impl Command for Operation {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("operation", "Does mathematical operations on numbers.")
            .alias("opr")
            .param("number", "A number.")
            .param(
                "operator",
                "The operator. Can be:\n    \
                 + Adds\n    \
                 - Subtracts\n    \
                 * Multiplies\n    \
                 / Divides\n    \
                 ** Power\n    \
                 >> Shifts right in binary\n    \
                 << Shifts left in binary\n    \
                 % Gets the remainder of the division\n    \
                 ^ Does XOR action in binary",
            )
            .usage_top("[number] [operator] [number] [operator] [number]...")
            .returns("number")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        if args.len() % 2 == 0 {
            return Err(CommandError::Usage);
        }

        let mut operands = Vec::with_capacity(args.len() / 2 + 1);
        let mut operators = Vec::with_capacity(args.len() / 2);
        for (i, token) in args.iter().enumerate() {
            if i % 2 == 0 {
                operands.push(parse_number(&ctx.interpolate(token)).ok_or(CommandError::Usage)?);
            } else {
                operators.push(Operator::parse(token).map_err(|_| CommandError::Usage)?);
            }
        }

        let value = arithmetic::evaluate(&operands, &operators).map_err(|_| CommandError::Usage)?;
        ctx.respond(&format_number(finite(value)?), Style::plain());
        Ok(())
    }
}

/// Functions accepted by `math`.
pub const MATH_FUNCTIONS: [&str; 23] = [
    "abs", "floor", "round", "ceil", "log", "cos", "sin", "tan", "asin", "acos", "atan", "asinh",
    "acosh", "atanh", "cbrt", "trunc", "sign", "sqrt", "log2", "log10", "fround", "exp", "clz32",
];

/// Apply a named function. `None` for unknown names.
pub fn apply_function(name: &str, n: f64) -> Option<f64> {
    Some(match name {
        "abs" => n.abs(),
        "floor" => n.floor(),
        // Halves round towards positive infinity.
        "round" => (n + 0.5).floor(),
        "ceil" => n.ceil(),
        "log" => n.ln(),
        "cos" => n.cos(),
        "sin" => n.sin(),
        "tan" => n.tan(),
        "asin" => n.asin(),
        "acos" => n.acos(),
        "atan" => n.atan(),
        "asinh" => n.asinh(),
        "acosh" => n.acosh(),
        "atanh" => n.atanh(),
        "cbrt" => n.cbrt(),
        "trunc" => n.trunc(),
        "sign" => {
            if n == 0.0 {
                0.0
            } else {
                n.signum()
            }
        }
        "sqrt" => n.sqrt(),
        "log2" => n.log2(),
        "log10" => n.log10(),
        "fround" => f64::from(n as f32),
        "exp" => n.exp(),
        "clz32" => f64::from((arithmetic::to_int32(n) as u32).leading_zeros()),
        _ => return None,
    })
}

pub struct Math;

#[async_trait]
impl Command for Math {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new("math", "Runs mathematical methods on numbers.")
            .param(
                "action",
                format!("The operator. Can be: {}", MATH_FUNCTIONS.join(", ")),
            )
            .param("number", "The number.")
            .returns("number")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let function = arg(&args, 0);
        let n = parse_number(&ctx.interpolate(arg(&args, 1))).ok_or(CommandError::Usage)?;
        let value = apply_function(function, n).ok_or(CommandError::Usage)?;
        ctx.respond(&format_number(finite(value)?), Style::plain());
        Ok(())
    }
}

/// Random integer between two bounds, both included.
pub struct Random;

#[async_trait]
impl Command for Random {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new(
            "random",
            "Generates a random integer between two values(both included).",
        )
        .alias("rand")
        .param("number1", "The first number.")
        .param("number2", "The second number.")
        .returns("integer")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let a = parse_integer(&ctx.interpolate(arg(&args, 0)));
        let b = parse_integer(&ctx.interpolate(arg(&args, 1)));
        let (Some(a), Some(b)) = (a, b) else {
            return Err(CommandError::Usage);
        };
        let value = rand::thread_rng().gen_range(a.min(b)..=a.max(b));
        ctx.respond(&value.to_string(), Style::plain());
        Ok(())
    }
}

/// Random float in `[min, max)`.
pub struct RandomF;

#[async_trait]
impl Command for RandomF {
    fn schema(&self) -> CommandSchema {
        CommandSchema::new(
            "randomf",
            "Generates a random floating number between two values.",
        )
        .alias("randf")
        .param("float1", "The first floating number.")
        .param("float2", "The second floating number.")
        .returns("float")
    }

    async fn execute(&self, args: Vec<String>, ctx: &mut dyn LineContext) -> CommandResult {
        let a = parse_number(&ctx.interpolate(arg(&args, 0)));
        let b = parse_number(&ctx.interpolate(arg(&args, 1)));
        let (Some(a), Some(b)) = (a, b) else {
            return Err(CommandError::Usage);
        };
        let (min, max) = (a.min(b), a.max(b));
        let mut rng = rand::thread_rng();
        let value = if min == max {
            min
        } else if (max - min).is_finite() {
            rng.gen_range(min..max)
        } else {
            // The span overflows; blend the bounds instead.
            let t: f64 = rng.gen();
            min * (1.0 - t) + max * t
        };
        ctx.respond(&format_number(value), Style::plain());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingContext;
    use neet_types::Variable;
    use rstest::rstest;

    fn words(line: &str) -> Vec<String> {
        line.split(' ').map(String::from).collect()
    }

    #[tokio::test]
    async fn operation_uses_precedence() {
        let mut ctx = RecordingContext::bare();
        Operation.execute(words("1 + 2 * 3"), &mut ctx).await.unwrap();
        Operation.execute(words("7"), &mut ctx).await.unwrap();
        assert_eq!(ctx.responses, vec!["7", "7"]);
    }

    #[tokio::test]
    async fn operation_interpolates_operands_only() {
        let mut ctx = RecordingContext::bare();
        ctx.globals.assign("n", Variable::text("4")).unwrap();
        ctx.globals.assign("op", Variable::text("+")).unwrap();
        Operation.execute(words("$n * 2"), &mut ctx).await.unwrap();
        assert_eq!(ctx.responses, vec!["8"]);
        assert_eq!(
            Operation.execute(words("1 $op 2"), &mut ctx).await,
            Err(CommandError::Usage)
        );
    }

    #[rstest]
    #[case::even_tokens("1 +")]
    #[case::bad_operator("1 && 2")]
    #[case::bad_number("one + 2")]
    #[tokio::test]
    async fn operation_usage_errors(#[case] line: &str) {
        let mut ctx = RecordingContext::bare();
        assert_eq!(Operation.execute(words(line), &mut ctx).await, Err(CommandError::Usage));
    }

    #[tokio::test]
    async fn operation_rejects_infinity() {
        let mut ctx = RecordingContext::bare();
        let err = Operation.execute(words("1 / 0"), &mut ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "The result is not a finite number.");
    }

    #[rstest]
    #[case::round_half_up("round", 2.5, 3.0)]
    #[case::round_negative_half("round", -2.5, -2.0)]
    #[case::sign("sign", -3.0, -1.0)]
    #[case::sign_zero("sign", 0.0, 0.0)]
    #[case::clz32("clz32", 1.0, 31.0)]
    #[case::clz32_zero("clz32", 0.0, 32.0)]
    #[case::sqrt("sqrt", 9.0, 3.0)]
    #[case::trunc("trunc", -1.7, -1.0)]
    #[case::fround("fround", 5.5, 5.5)]
    fn functions(#[case] name: &str, #[case] n: f64, #[case] expected: f64) {
        assert_eq!(apply_function(name, n), Some(expected));
    }

    #[test]
    fn every_listed_function_exists() {
        for name in MATH_FUNCTIONS {
            assert!(apply_function(name, 1.0).is_some(), "{name}");
        }
        assert_eq!(apply_function("pow", 1.0), None);
    }

    #[tokio::test]
    async fn math_command() {
        let mut ctx = RecordingContext::bare();
        Math.execute(words("floor 2.7"), &mut ctx).await.unwrap();
        assert_eq!(ctx.responses, vec!["2"]);
        assert_eq!(Math.execute(words("nope 1"), &mut ctx).await, Err(CommandError::Usage));
        assert!(Math.execute(words("sqrt -1"), &mut ctx).await.is_err());
    }

    #[tokio::test]
    async fn random_stays_in_range() {
        let mut ctx = RecordingContext::bare();
        for _ in 0..50 {
            Random.execute(words("5 3"), &mut ctx).await.unwrap();
            RandomF.execute(words("1 2"), &mut ctx).await.unwrap();
        }
        for pair in ctx.responses.chunks(2) {
            let int: i64 = pair[0].parse().unwrap();
            let float: f64 = pair[1].parse().unwrap();
            assert!((3..=5).contains(&int));
            assert!((1.0..2.0).contains(&float));
        }
    }

    #[tokio::test]
    async fn randomf_handles_huge_span() {
        let mut ctx = RecordingContext::bare();
        for _ in 0..20 {
            RandomF.execute(words("-1e308 1e308"), &mut ctx).await.unwrap();
        }
        for text in &ctx.responses {
            let n: f64 = text.parse().unwrap();
            assert!(n.is_finite() && (-1e308..=1e308).contains(&n), "{}", n);
        }
    }

    #[tokio::test]
    async fn random_needs_integers() {
        let mut ctx = RecordingContext::bare();
        assert_eq!(Random.execute(words("1.5 3"), &mut ctx).await, Err(CommandError::Usage));
        RandomF.execute(words("2 2"), &mut ctx).await.unwrap();
        assert_eq!(ctx.responses, vec!["2"]);
    }
}
