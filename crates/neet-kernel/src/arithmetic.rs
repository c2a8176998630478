//! Arithmetic for the `operation` command.
//!
//! The input is an already tokenised chain `n op n op n ...`. Precedence,
//! from tightest to loosest:
//!
//! - `**` (right associative)
//! - `*`, `/`, `%`
//! - `+`, `-`
//! - `<<`, `>>`
//! - `^` (bitwise xor)
//!
//! Shifts and xor work on 32-bit signed integers; everything else on `f64`.
//! Division by zero yields an infinity, which callers reject as non-finite.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    #[error("expected one more number than operators")]
    Shape,
    #[error("unknown operator: {0}")]
    UnknownOperator(String),
}

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Pow,
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    Xor,
}

impl Operator {
    pub fn parse(token: &str) -> Result<Self, ArithmeticError> {
        Ok(match token {
            "**" => Operator::Pow,
            "*" => Operator::Mul,
            "/" => Operator::Div,
            "%" => Operator::Rem,
            "+" => Operator::Add,
            "-" => Operator::Sub,
            "<<" => Operator::Shl,
            ">>" => Operator::Shr,
            "^" => Operator::Xor,
            other => return Err(ArithmeticError::UnknownOperator(other.to_string())),
        })
    }

    fn precedence(self) -> u8 {
        match self {
            Operator::Pow => 5,
            Operator::Mul | Operator::Div | Operator::Rem => 4,
            Operator::Add | Operator::Sub => 3,
            Operator::Shl | Operator::Shr => 2,
            Operator::Xor => 1,
        }
    }

    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Operator::Pow => a.powf(b),
            Operator::Mul => a * b,
            Operator::Div => a / b,
            Operator::Rem => a % b,
            Operator::Add => a + b,
            Operator::Sub => a - b,
            Operator::Shl => f64::from(to_int32(a).wrapping_shl(shift_count(b))),
            Operator::Shr => f64::from(to_int32(a).wrapping_shr(shift_count(b))),
            Operator::Xor => f64::from(to_int32(a) ^ to_int32(b)),
        }
    }
}

/// Wrap a number into the signed 32-bit range, truncating the fraction.
/// Non-finite values become 0.
pub fn to_int32(n: f64) -> i32 {
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(4_294_967_296.0) as u32 as i32
}

fn shift_count(n: f64) -> u32 {
    (to_int32(n) as u32) & 31
}

/// Evaluate `operands[0] operators[0] operands[1] ...`.
pub fn evaluate(operands: &[f64], operators: &[Operator]) -> Result<f64, ArithmeticError> {
    if operands.is_empty() || operands.len() != operators.len() + 1 {
        return Err(ArithmeticError::Shape);
    }
    let mut chain = Chain {
        operands,
        operators,
        pos: 0,
    };
    Ok(chain.climb(0))
}

/// Precedence climbing over a flat chain. `pos` is the current operand;
/// the operator after it has the same index.
struct Chain<'a> {
    operands: &'a [f64],
    operators: &'a [Operator],
    pos: usize,
}

impl Chain<'_> {
    fn climb(&mut self, min_precedence: u8) -> f64 {
        let mut lhs = self.operands[self.pos];
        while let Some(&op) = self.operators.get(self.pos) {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            self.pos += 1;
            let next_min = if op == Operator::Pow {
                precedence
            } else {
                precedence + 1
            };
            let rhs = self.climb(next_min);
            lhs = op.apply(lhs, rhs);
        }
        lhs
    }
}
