use super::expression::{Expression, ExpressionProbabilities};

/// The single strongest expression of one face in one cycle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DominantExpression {
    pub label: Expression,
    pub probability: f64,
    /// Canonical-order vector: the dominant slot holds `probability`, all
    /// others are zero.
    pub vector: [f64; 7],
}

/// Picks the dominant expression by linear scan in [`Expression::ORDER`].
///
/// Ties go to the expression that comes first in that order, so
/// `{neutral: 0.5, happy: 0.5, ..}` resolves to `neutral`.
pub fn resolve(probabilities: &ExpressionProbabilities) -> DominantExpression {
    let (label, probability) = probabilities
        .iter()
        .fold((Expression::ORDER[0], f64::NEG_INFINITY), |best, current| {
            if current.1 > best.1 {
                current
            } else {
                best
            }
        });

    let mut vector = [0.0; 7];
    vector[label.index()] = probability;

    DominantExpression {
        label,
        probability,
        vector,
    }
}
