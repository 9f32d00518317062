use std::collections::HashSet;

use regex::Regex;

use crate::error::Result;
use crate::table::frame::parse_nullable;
use crate::table::Row;

/// Boolean expression over the columns of one row.
///
/// Comparisons against an empty (null) cell are false.
#[derive(Debug, Clone)]
pub enum Predicate {
    Const(bool),
    Equals { column: String, value: String },
    IsIn { column: String, values: HashSet<String> },
    Matches { column: String, pattern: Regex },
    AtLeast { column: String, threshold: i64 },
    ProductAtLeast { left: String, right: String, threshold: i64 },
    /// Plain string comparison, sound for zero-padded ISO timestamps.
    TextAtLeast { column: String, threshold: String },
    Not(Box<Predicate>),
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
}

impl Predicate {
    pub fn equals(column: &str, value: impl Into<String>) -> Predicate {
        Predicate::Equals {
            column: column.to_string(),
            value: value.into(),
        }
    }

    pub fn is_in<I, S>(column: &str, values: I) -> Predicate
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Predicate::IsIn {
            column: column.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(column: &str, pattern: &str) -> Result<Predicate> {
        Ok(Predicate::Matches {
            column: column.to_string(),
            pattern: Regex::new(pattern)?,
        })
    }

    pub fn at_least(column: &str, threshold: i64) -> Predicate {
        Predicate::AtLeast {
            column: column.to_string(),
            threshold,
        }
    }

    pub fn product_at_least(left: &str, right: &str, threshold: i64) -> Predicate {
        Predicate::ProductAtLeast {
            left: left.to_string(),
            right: right.to_string(),
            threshold,
        }
    }

    pub fn text_at_least(column: &str, threshold: impl Into<String>) -> Predicate {
        Predicate::TextAtLeast {
            column: column.to_string(),
            threshold: threshold.into(),
        }
    }

    pub fn negate(self) -> Predicate {
        match self {
            Predicate::Not(inner) => *inner,
            Predicate::Const(value) => Predicate::Const(!value),
            other => Predicate::Not(Box::new(other)),
        }
    }

    /// Conjunction; no operands matches everything.
    pub fn all(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
        let mut operands: Vec<Predicate> = predicates
            .into_iter()
            .filter(|p| !matches!(p, Predicate::Const(true)))
            .collect();
        match operands.len() {
            0 => Predicate::Const(true),
            1 => operands.remove(0),
            _ => Predicate::All(operands),
        }
    }

    /// Disjunction; no operands matches nothing.
    pub fn any(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
        let mut operands: Vec<Predicate> = predicates
            .into_iter()
            .filter(|p| !matches!(p, Predicate::Const(false)))
            .collect();
        match operands.len() {
            0 => Predicate::Const(false),
            1 => operands.remove(0),
            _ => Predicate::Any(operands),
        }
    }

    pub fn is_match_all(&self) -> bool {
        matches!(self, Predicate::Const(true))
    }

    pub fn evaluate(&self, row: &Row<'_>) -> Result<bool> {
        match self {
            Predicate::Const(value) => Ok(*value),
            Predicate::Equals { column, value } => Ok(row.get(column)? == value.as_str()),
            Predicate::IsIn { column, values } => Ok(values.contains(row.get(column)?)),
            Predicate::Matches { column, pattern } => Ok(pattern.is_match(row.get(column)?)),
            Predicate::AtLeast { column, threshold } => {
                Ok(parse_nullable(column, row.get(column)?)?.is_some_and(|v| v >= *threshold))
            }
            Predicate::ProductAtLeast {
                left,
                right,
                threshold,
            } => {
                let left_value = parse_nullable(left, row.get(left)?)?;
                let right_value = parse_nullable(right, row.get(right)?)?;
                Ok(match (left_value, right_value) {
                    (Some(l), Some(r)) => i128::from(l) * i128::from(r) >= i128::from(*threshold),
                    _ => false,
                })
            }
            Predicate::TextAtLeast { column, threshold } => {
                let value = row.get(column)?;
                Ok(!value.is_empty() && value >= threshold.as_str())
            }
            Predicate::Not(inner) => Ok(!inner.evaluate(row)?),
            Predicate::All(operands) => {
                for operand in operands {
                    if !operand.evaluate(row)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Any(operands) => {
                for operand in operands {
                    if operand.evaluate(row)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::table::Frame;

    fn frame() -> Frame {
        Frame::from_rows(
            vec!["w".into(), "h".into(), "date".into(), "tags".into()],
            vec![
                vec!["400".into(), "600".into(), "2021-05-01 00:00:00".into(), "fox solo".into()],
                vec!["800".into(), "900".into(), "".into(), "wolf".into()],
                vec!["".into(), "900".into(), "2019-01-01 00:00:00".into(), "fox".into()],
            ],
        )
        .expect("valid frame")
    }

    fn hits(predicate: &Predicate) -> Vec<bool> {
        let frame = frame();
        frame.rows().map(|row| predicate.evaluate(&row).unwrap()).collect()
    }

    #[test]
    fn test_empty_combinators() {
        assert!(Predicate::all(Vec::new()).is_match_all());
        assert_eq!(hits(&Predicate::any(Vec::new())), vec![false, false, false]);
    }

    #[test]
    fn test_numeric_thresholds_and_nulls() {
        let short_side =
            Predicate::all([Predicate::at_least("w", 500), Predicate::at_least("h", 500)]);
        assert_eq!(hits(&short_side), vec![false, true, false]);
        let area = Predicate::product_at_least("w", "h", 240_000);
        assert_eq!(hits(&area), vec![true, true, false]);
    }

    #[test]
    fn test_text_threshold_skips_nulls() {
        let since = Predicate::text_at_least("date", "2020-01-01");
        assert_eq!(hits(&since), vec![true, false, false]);
    }

    #[test]
    fn test_negation_and_regex() -> Result<()> {
        let fox = Predicate::matches("tags", r"(^|\s)(fox)($|\s)")?;
        assert_eq!(hits(&fox), vec![true, false, true]);
        assert_eq!(hits(&fox.clone().negate()), vec![false, true, false]);
        assert_eq!(hits(&fox.negate().negate()), vec![true, false, true]);
        Ok(())
    }

    #[test]
    fn test_non_numeric_cell_is_an_error() {
        let frame = frame();
        let row = frame.row(0).expect("row 0");
        let result = Predicate::at_least("tags", 1).evaluate(&row);
        assert!(matches!(result, Err(Error::Decode { .. })));
    }
}
