//! Field comparison.

use seawatch_core::{event::value_text, VesselEvent};

use crate::schema::{CompareOp, ValueCondition};

/// Numeric equality tolerance.
const EPSILON: f64 = 1e-6;

impl ValueCondition {
    pub(crate) fn evaluate(&self, event: &VesselEvent) -> bool {
        let Some(actual) = event.field_text(&self.field) else {
            return false;
        };
        let Some(expected) = value_text(&self.value) else {
            return false;
        };

        match (actual.trim().parse::<f64>(), expected.trim().parse::<f64>()) {
            (Ok(a), Ok(b)) => compare_numbers(self.operator, a, b),
            _ => compare_text(self.operator, &actual, &expected),
        }
    }
}

fn compare_numbers(op: CompareOp, a: f64, b: f64) -> bool {
    match op {
        CompareOp::Gt => a > b,
        CompareOp::Lt => a < b,
        CompareOp::Gte => a >= b,
        CompareOp::Lte => a <= b,
        CompareOp::Eq => (a - b).abs() < EPSILON,
        CompareOp::Neq => (a - b).abs() > EPSILON,
        CompareOp::Contains => false,
    }
}

fn compare_text(op: CompareOp, actual: &str, expected: &str) -> bool {
    match op {
        CompareOp::Eq => actual.eq_ignore_ascii_case(expected),
        CompareOp::Neq => !actual.eq_ignore_ascii_case(expected),
        CompareOp::Contains => actual
            .to_lowercase()
            .contains(&expected.to_lowercase()),
        _ => false,
    }
}
