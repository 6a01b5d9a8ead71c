use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The seven facial expressions the attribute model scores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Expression {
    Neutral,
    Happy,
    Sad,
    Angry,
    Fearful,
    Disgusted,
    Surprised,
}

impl Expression {
    /// Canonical order. Probability vectors are laid out in this order and
    /// the dominant-expression scan walks it front to back.
    pub const ORDER: [Expression; 7] = [
        Expression::Neutral,
        Expression::Happy,
        Expression::Sad,
        Expression::Angry,
        Expression::Fearful,
        Expression::Disgusted,
        Expression::Surprised,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Expression::Neutral => "neutral",
            Expression::Happy => "happy",
            Expression::Sad => "sad",
            Expression::Angry => "angry",
            Expression::Fearful => "fearful",
            Expression::Disgusted => "disgusted",
            Expression::Surprised => "surprised",
        }
    }

    /// Position in [`Expression::ORDER`].
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Expression {
    type Err = InvalidExpressions;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Expression::ORDER
            .iter()
            .copied()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| InvalidExpressions::Unknown(s.to_string()))
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidExpressions {
    #[error("unknown expression '{0}'")]
    Unknown(String),
    #[error("expression '{0}' is missing")]
    Missing(Expression),
    #[error("expression '{0}' given more than once")]
    Duplicate(Expression),
    #[error("probability for '{expression}' must be within [0, 1], got {value}")]
    OutOfRange { expression: Expression, value: f64 },
}

/// Per-expression probabilities for one face.
///
/// Always holds exactly the seven known expressions with values in `[0, 1]`;
/// construction fails otherwise. On the wire it is a name → probability map.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, f64>",
    into = "BTreeMap<String, f64>"
)]
pub struct ExpressionProbabilities([f64; 7]);

impl ExpressionProbabilities {
    /// Builds from values laid out in [`Expression::ORDER`].
    pub fn new(values: [f64; 7]) -> Result<Self, InvalidExpressions> {
        for (expression, value) in Expression::ORDER.iter().zip(values) {
            if !(0.0..=1.0).contains(&value) {
                return Err(InvalidExpressions::OutOfRange {
                    expression: *expression,
                    value,
                });
            }
        }
        Ok(Self(values))
    }

    /// Builds from `(name, probability)` pairs in any order.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, InvalidExpressions>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut slots: [Option<f64>; 7] = [None; 7];
        for (name, value) in pairs {
            let expression: Expression = name.parse()?;
            let slot = &mut slots[expression.index()];
            if slot.is_some() {
                return Err(InvalidExpressions::Duplicate(expression));
            }
            *slot = Some(value);
        }

        let mut values = [0.0; 7];
        for expression in Expression::ORDER {
            values[expression.index()] = slots[expression.index()]
                .ok_or(InvalidExpressions::Missing(expression))?;
        }
        Self::new(values)
    }

    pub fn get(&self, expression: Expression) -> f64 {
        self.0[expression.index()]
    }

    /// Iterates in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Expression, f64)> + '_ {
        Expression::ORDER.iter().map(|e| (*e, self.0[e.index()]))
    }
}

impl TryFrom<BTreeMap<String, f64>> for ExpressionProbabilities {
    type Error = InvalidExpressions;

    fn try_from(map: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        Self::from_pairs(map.iter().map(|(k, v)| (k.as_str(), *v)))
    }
}

impl From<ExpressionProbabilities> for BTreeMap<String, f64> {
    fn from(probabilities: ExpressionProbabilities) -> Self {
        probabilities
            .iter()
            .map(|(e, p)| (e.as_str().to_string(), p))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn all_pairs(values: [f64; 7]) -> Vec<(&'static str, f64)> {
        Expression::ORDER
            .iter()
            .zip(values)
            .map(|(e, v)| (e.as_str(), v))
            .collect()
    }

    #[test]
    fn test_order_matches_index() {
        for (i, e) in Expression::ORDER.iter().enumerate() {
            assert_eq!(e.index(), i);
        }
    }

    #[rstest]
    #[case("neutral", Expression::Neutral)]
    #[case("fearful", Expression::Fearful)]
    #[case("surprised", Expression::Surprised)]
    fn test_parse_known_names(#[case] name: &str, #[case] expected: Expression) {
        assert_eq!(name.parse::<Expression>().unwrap(), expected);
        assert_eq!(expected.to_string(), name);
    }

    #[test]
    fn test_parse_unknown_name() {
        assert_eq!(
            "contempt".parse::<Expression>(),
            Err(InvalidExpressions::Unknown("contempt".into()))
        );
    }

    #[test]
    fn test_from_pairs_any_order() {
        let mut pairs = all_pairs([0.1, 0.2, 0.3, 0.0, 0.0, 0.0, 0.4]);
        pairs.reverse();
        let probs = ExpressionProbabilities::from_pairs(pairs).unwrap();
        assert_eq!(probs.get(Expression::Happy), 0.2);
        assert_eq!(probs.get(Expression::Surprised), 0.4);
    }

    #[test]
    fn test_from_pairs_missing_key() {
        let pairs = all_pairs([0.0; 7]).into_iter().skip(1);
        assert_eq!(
            ExpressionProbabilities::from_pairs(pairs),
            Err(InvalidExpressions::Missing(Expression::Neutral))
        );
    }

    #[test]
    fn test_from_pairs_duplicate_key() {
        let mut pairs = all_pairs([0.0; 7]);
        pairs.push(("sad", 0.5));
        assert_eq!(
            ExpressionProbabilities::from_pairs(pairs),
            Err(InvalidExpressions::Duplicate(Expression::Sad))
        );
    }

    #[rstest]
    #[case::negative(-0.01)]
    #[case::above_one(1.01)]
    #[case::nan(f64::NAN)]
    fn test_out_of_range_rejected(#[case] bad: f64) {
        let mut values = [0.0; 7];
        values[Expression::Angry.index()] = bad;
        assert!(matches!(
            ExpressionProbabilities::new(values),
            Err(InvalidExpressions::OutOfRange {
                expression: Expression::Angry,
                ..
            })
        ));
    }

    #[test]
    fn test_iter_is_canonical_order() {
        let probs = ExpressionProbabilities::new([0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6]).unwrap();
        let names: Vec<_> = probs.iter().map(|(e, _)| e).collect();
        assert_eq!(names, Expression::ORDER.to_vec());
    }

    #[test]
    fn test_json_map_roundtrip_rejects_extra_key() {
        let json = r#"{"neutral":0.1,"happy":0.9,"sad":0,"angry":0,"fearful":0,"disgusted":0,"surprised":0}"#;
        let probs: ExpressionProbabilities = serde_json::from_str(json).unwrap();
        assert_eq!(probs.get(Expression::Happy), 0.9);

        let with_extra = r#"{"neutral":0.1,"happy":0.9,"sad":0,"angry":0,"fearful":0,"disgusted":0,"surprised":0,"contempt":0}"#;
        assert!(serde_json::from_str::<ExpressionProbabilities>(with_extra).is_err());
    }
}
