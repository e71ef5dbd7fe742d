//! Ordered bracket tables resolved by a single generic lookup.
//!
//! Every threshold rule in the engine (occupancy, agency labor, building
//! age, deficiency counts, ...) is an ordered array of `{upper, value}`
//! rows rather than a branch chain, so each table is independently
//! unit-testable and substitutable in configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One row of a bracket table. A row matches when the input is `<= upper`;
/// a row with `upper: None` is the catch-all and must come last.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bracket<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper: Option<Decimal>,
    pub value: T,
}

impl<T> Bracket<T> {
    pub fn upto(upper: Decimal, value: T) -> Self {
        Bracket {
            upper: Some(upper),
            value,
        }
    }

    pub fn otherwise(value: T) -> Self {
        Bracket { upper: None, value }
    }
}

/// Resolve `x` against an ordered bracket table: the first row whose bound
/// covers `x` wins. Returns `None` only for an empty table or when no
/// bounded row matches and no catch-all exists.
pub fn resolve_bracket<T: Copy>(brackets: &[Bracket<T>], x: Decimal) -> Option<T> {
    for bracket in brackets {
        match bracket.upper {
            Some(upper) if x <= upper => return Some(bracket.value),
            Some(_) => continue,
            None => return Some(bracket.value),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn occupancy_style_table() -> Vec<Bracket<i32>> {
        vec![
            Bracket::upto(dec!(0.70), 100),
            Bracket::upto(dec!(0.80), 50),
            Bracket::upto(dec!(0.85), 25),
            Bracket::upto(dec!(0.92), 0),
            Bracket::otherwise(-25),
        ]
    }

    #[test]
    fn test_first_matching_bracket_wins() {
        let table = occupancy_style_table();
        assert_eq!(resolve_bracket(&table, dec!(0.65)), Some(100));
        assert_eq!(resolve_bracket(&table, dec!(0.75)), Some(50));
        assert_eq!(resolve_bracket(&table, dec!(0.84)), Some(25));
        assert_eq!(resolve_bracket(&table, dec!(0.90)), Some(0));
        assert_eq!(resolve_bracket(&table, dec!(0.95)), Some(-25));
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let table = occupancy_style_table();
        assert_eq!(resolve_bracket(&table, dec!(0.70)), Some(100));
        assert_eq!(resolve_bracket(&table, dec!(0.80)), Some(50));
    }

    #[test]
    fn test_empty_table() {
        let table: Vec<Bracket<i32>> = Vec::new();
        assert_eq!(resolve_bracket(&table, dec!(1)), None);
    }

    #[test]
    fn test_no_catch_all() {
        let table = vec![Bracket::upto(dec!(10), 1)];
        assert_eq!(resolve_bracket(&table, dec!(11)), None);
    }
}
