//! Expression evaluator: tokenize → reduce by precedence → finalize.
//!
//! Two reduction tiers, multiplicative (`*` `/`) before additive (`+` `-`),
//! left to right within a tier. Each reduction step rebuilds the token
//! sequence instead of splicing in place. Every computed step sleeps for
//! the operator's configured latency first; the latency is a load-demo
//! knob, not a correctness requirement, and it runs after the task's lock
//! is already held.

mod token;

pub use token::{Op, Token, tokenize};

use std::time::Duration;

use crate::error::{EvalError, OperandSide};

/// Simulated per-operator processing latency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatencyProfile {
    pub add: Duration,
    pub sub: Duration,
    pub mul: Duration,
    pub div: Duration,
}

impl LatencyProfile {
    /// Same delay for every operator.
    pub const fn uniform(delay: Duration) -> Self {
        Self {
            add: delay,
            sub: delay,
            mul: delay,
            div: delay,
        }
    }

    pub fn for_op(&self, op: Op) -> Duration {
        match op {
            Op::Add => self.add,
            Op::Sub => self.sub,
            Op::Mul => self.mul,
            Op::Div => self.div,
        }
    }
}

/// Evaluate an arithmetic expression to a 64-bit float.
///
/// No precision guarantees beyond native floating-point behavior.
pub async fn evaluate(expression: &str, latency: &LatencyProfile) -> Result<f64, EvalError> {
    let tokens = tokenize(expression)?;
    let tokens = reduce_tier(tokens, true, latency).await?;
    let tokens = reduce_tier(tokens, false, latency).await?;
    finalize(&tokens)
}

/// One precedence tier: repeatedly take the leftmost matching operator and
/// rebuild the sequence with the computed triple collapsed to one number.
async fn reduce_tier(
    mut tokens: Vec<Token>,
    multiplicative: bool,
    latency: &LatencyProfile,
) -> Result<Vec<Token>, EvalError> {
    loop {
        let Some((index, op)) = find_op(&tokens, multiplicative) else {
            return Ok(tokens);
        };

        // Both neighbors must be numeric before any work happens, so the
        // rebuild below can index freely.
        let lhs = operand(&tokens, index, OperandSide::Left)?;
        let rhs = operand(&tokens, index, OperandSide::Right)?;

        tokio::time::sleep(latency.for_op(op)).await;
        let value = apply(op, lhs, rhs)?;

        let mut reduced = Vec::with_capacity(tokens.len() - 2);
        reduced.extend_from_slice(&tokens[..index - 1]);
        reduced.push(Token::Number(value.to_string()));
        reduced.extend_from_slice(&tokens[index + 2..]);
        tokens = reduced;
    }
}

fn find_op(tokens: &[Token], multiplicative: bool) -> Option<(usize, Op)> {
    tokens.iter().enumerate().find_map(|(i, token)| match token {
        Token::Operator(op) if op.is_multiplicative() == multiplicative => Some((i, *op)),
        _ => None,
    })
}

/// Parse the operator's neighbor on the given side as a number.
fn operand(tokens: &[Token], op_index: usize, side: OperandSide) -> Result<f64, EvalError> {
    let neighbor = match side {
        OperandSide::Left => op_index.checked_sub(1).and_then(|i| tokens.get(i)),
        OperandSide::Right => tokens.get(op_index + 1),
    };
    match neighbor {
        Some(Token::Number(text)) => text.parse().map_err(|_| EvalError::InvalidOperand {
            side,
            text: text.clone(),
        }),
        Some(Token::Operator(op)) => Err(EvalError::InvalidOperand {
            side,
            text: op.to_string(),
        }),
        None => Err(EvalError::InvalidOperand {
            side,
            text: String::new(),
        }),
    }
}

fn apply(op: Op, lhs: f64, rhs: f64) -> Result<f64, EvalError> {
    match op {
        Op::Add => Ok(lhs + rhs),
        Op::Sub => Ok(lhs - rhs),
        Op::Mul => Ok(lhs * rhs),
        Op::Div if rhs == 0.0 => Err(EvalError::DivisionByZero),
        Op::Div => Ok(lhs / rhs),
    }
}

/// After both tiers, exactly one number must remain.
fn finalize(tokens: &[Token]) -> Result<f64, EvalError> {
    match tokens {
        [Token::Number(text)] => text.parse().map_err(|_| EvalError::MalformedExpression),
        _ => Err(EvalError::MalformedExpression),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const NO_DELAY: LatencyProfile = LatencyProfile::uniform(Duration::ZERO);

    #[rstest]
    #[case::add("1 + 2", 3.0)]
    #[case::sub("5 - 3", 2.0)]
    #[case::mul("2 * 3", 6.0)]
    #[case::div("10 / 2", 5.0)]
    #[case::precedence("3 + 4 * 2", 11.0)]
    #[case::mixed("2 + 3 * 4 - 6 / 2", 11.0)]
    #[case::left_assoc_div("8 / 2 / 2", 2.0)]
    #[case::left_assoc_sub("8 - 2 - 1", 5.0)]
    #[case::decimals("2.5 * 4", 10.0)]
    #[case::fractional_result("10 / 4", 2.5)]
    #[case::single_number("42", 42.0)]
    #[case::padded("  7  ", 7.0)]
    #[case::no_spaces("3+4*2", 11.0)]
    #[tokio::test]
    async fn evaluates(#[case] expression: &str, #[case] expected: f64) {
        let result = evaluate(expression, &NO_DELAY).await.unwrap();
        assert_eq!(result, expected);
    }

    #[tokio::test]
    async fn division_by_zero_fails() {
        assert_eq!(
            evaluate("6 / 0", &NO_DELAY).await,
            Err(EvalError::DivisionByZero)
        );
    }

    #[tokio::test]
    async fn division_by_zero_deep_in_the_expression_fails() {
        assert_eq!(
            evaluate("1 + 6 / 0", &NO_DELAY).await,
            Err(EvalError::DivisionByZero)
        );
    }

    #[tokio::test]
    async fn letters_fail_as_invalid_characters_not_zero() {
        assert_eq!(
            evaluate("abc + 2", &NO_DELAY).await,
            Err(EvalError::InvalidCharacter('a'))
        );
    }

    #[tokio::test]
    async fn doubled_operator_reports_the_right_side() {
        assert_eq!(
            evaluate("1 + + 2", &NO_DELAY).await,
            Err(EvalError::InvalidOperand {
                side: OperandSide::Right,
                text: "+".into(),
            })
        );
    }

    #[tokio::test]
    async fn unparsable_number_reports_the_left_side() {
        assert_eq!(
            evaluate("1..2 + 3", &NO_DELAY).await,
            Err(EvalError::InvalidOperand {
                side: OperandSide::Left,
                text: "1..2".into(),
            })
        );
    }

    #[tokio::test]
    async fn trailing_operator_reports_a_missing_right_operand() {
        assert_eq!(
            evaluate("1 +", &NO_DELAY).await,
            Err(EvalError::InvalidOperand {
                side: OperandSide::Right,
                text: String::new(),
            })
        );
    }

    #[tokio::test]
    async fn leading_operator_reports_a_missing_left_operand() {
        assert_eq!(
            evaluate("* 2", &NO_DELAY).await,
            Err(EvalError::InvalidOperand {
                side: OperandSide::Left,
                text: String::new(),
            })
        );
    }

    #[rstest]
    #[case::missing_operator("1 2")]
    #[case::empty("")]
    #[case::blank("   ")]
    #[tokio::test]
    async fn malformed_expressions_fail(#[case] expression: &str) {
        assert_eq!(
            evaluate(expression, &NO_DELAY).await,
            Err(EvalError::MalformedExpression)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn latency_is_paid_once_per_reduction_step() {
        let latency = LatencyProfile::uniform(Duration::from_secs(1));
        let started = tokio::time::Instant::now();

        // Two reduction steps: 4 * 2, then 3 + 8.
        let result = evaluate("3 + 4 * 2", &latency).await.unwrap();

        assert_eq!(result, 11.0);
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn per_operator_latency_is_keyed_by_operator() {
        let latency = LatencyProfile {
            add: Duration::from_secs(3),
            mul: Duration::from_secs(1),
            ..LatencyProfile::default()
        };
        let started = tokio::time::Instant::now();

        evaluate("1 * 2 + 3 - 4", &latency).await.unwrap();

        // 1s for `*`, 3s for `+`, 0s for `-`.
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }
}
