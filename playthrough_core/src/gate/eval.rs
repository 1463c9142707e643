//! Evaluation of parsed gates against a flag store.
//!
//! Truthiness and numeric coercion come from [`FlagValue`], so a flag reads the
//! same in a gate as it does everywhere else.

use std::borrow::Cow;

use story_graph::{FlagStore, FlagValue};

use super::parser::{CompareOp, Expr, LogicalOp};

/// What an unset flag reads as.
static UNSET: FlagValue = FlagValue::Bool(false);

/// Evaluate an expression to a boolean.
pub(crate) fn eval(expr: &Expr, flags: &FlagStore) -> bool {
    value_of(expr, flags).is_truthy()
}

fn value_of<'a>(expr: &'a Expr, flags: &'a FlagStore) -> Cow<'a, FlagValue> {
    match expr {
        Expr::Literal(value) => Cow::Borrowed(value),
        Expr::Flag(name) => Cow::Borrowed(flags.get(name).unwrap_or(&UNSET)),
        Expr::Not(inner) => boolean(!value_of(inner, flags).is_truthy()),
        Expr::Logical { op, lhs, rhs } => {
            let left = value_of(lhs, flags).is_truthy();
            boolean(match op {
                LogicalOp::And => left && value_of(rhs, flags).is_truthy(),
                LogicalOp::Or => left || value_of(rhs, flags).is_truthy(),
            })
        }
        Expr::Compare { op, lhs, rhs } => {
            boolean(compare(*op, &value_of(lhs, flags), &value_of(rhs, flags)))
        }
    }
}

fn boolean<'a>(value: bool) -> Cow<'a, FlagValue> {
    Cow::Owned(FlagValue::Bool(value))
}

/// Compare two values. Anything that cannot be compared yields `false`.
fn compare(op: CompareOp, lhs: &FlagValue, rhs: &FlagValue) -> bool {
    match op {
        CompareOp::Eq | CompareOp::Ne => {
            let equal = match (lhs, rhs) {
                (FlagValue::Bool(a), FlagValue::Bool(b)) => Some(a == b),
                (FlagValue::String(a), FlagValue::String(b)) => Some(a == b),
                _ => match (lhs.as_number(), rhs.as_number()) {
                    (Some(a), Some(b)) => Some(a == b),
                    _ => None,
                },
            };
            match (op, equal) {
                (CompareOp::Eq, Some(equal)) => equal,
                (_, Some(equal)) => !equal,
                (_, None) => false,
            }
        }
        CompareOp::Ge | CompareOp::Le | CompareOp::Gt | CompareOp::Lt => {
            let (Some(a), Some(b)) = (lhs.as_number(), rhs.as_number()) else {
                return false;
            };
            match op {
                CompareOp::Ge => a >= b,
                CompareOp::Le => a <= b,
                CompareOp::Gt => a > b,
                _ => a < b,
            }
        }
    }
}
