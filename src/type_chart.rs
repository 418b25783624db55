use crate::errors::{ConfigError, ConfigResult};
use schema::MonsterType;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How a hit lands, for event consumers that want a label instead of a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effectiveness {
    NoEffect,
    NotVeryEffective,
    Normal,
    SuperEffective,
}

impl Effectiveness {
    pub fn from_multiplier(multiplier: f64) -> Self {
        if multiplier == 0.0 {
            Effectiveness::NoEffect
        } else if multiplier < 1.0 {
            Effectiveness::NotVeryEffective
        } else if multiplier > 1.0 {
            Effectiveness::SuperEffective
        } else {
            Effectiveness::Normal
        }
    }
}

/// Multiplier for one attacking type against an ordered set of defending types.
///
/// Each defending type contributes an independent factor, so an immunity on any
/// of them zeroes the result and an empty set is neutral.
pub fn effectiveness(attacking: MonsterType, defending: &[MonsterType]) -> f64 {
    defending
        .iter()
        .map(|defender| MonsterType::type_effectiveness(attacking, *defender))
        .product()
}

/// Resolve a content-supplied type name. Unknown names are a content error.
pub fn parse_type(name: &str) -> ConfigResult<MonsterType> {
    MonsterType::from_str(name.trim()).map_err(|_| ConfigError::UnknownType(name.to_string()))
}

/// Resolve a list of 1-2 type names into a defending type set.
pub fn parse_types(names: &[&str]) -> ConfigResult<Vec<MonsterType>> {
    if names.is_empty() || names.len() > 2 {
        return Err(ConfigError::InvalidValue {
            field: "types".to_string(),
            reason: format!("a combatant has 1 or 2 types, got {}", names.len()),
        });
    }
    let mut types = Vec::with_capacity(names.len());
    for name in names {
        let parsed = parse_type(name)?;
        if types.contains(&parsed) {
            return Err(ConfigError::InvalidValue {
                field: "types".to_string(),
                reason: format!("duplicate type {}", parsed),
            });
        }
        types.push(parsed);
    }
    Ok(types)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    #[rstest]
    #[case(MonsterType::Fire, vec![MonsterType::Grass, MonsterType::Poison], 1.0)]
    #[case(MonsterType::Electric, vec![MonsterType::Ground], 0.0)]
    #[case(MonsterType::Electric, vec![MonsterType::Water, MonsterType::Flying], 4.0)]
    #[case(MonsterType::Fighting, vec![MonsterType::Poison, MonsterType::Flying], 0.25)]
    #[case(MonsterType::Ground, vec![MonsterType::Electric, MonsterType::Flying], 0.0)]
    #[case(MonsterType::Water, vec![MonsterType::Fire], 2.0)]
    fn test_dual_type_effectiveness(
        #[case] attacking: MonsterType,
        #[case] defending: Vec<MonsterType>,
        #[case] expected: f64,
    ) {
        assert_eq!(effectiveness(attacking, &defending), expected);
    }

    #[test]
    fn test_no_defending_types_is_neutral() {
        for attacking in MonsterType::iter() {
            assert_eq!(effectiveness(attacking, &[]), 1.0);
        }
    }

    #[rstest]
    #[case(0.0, Effectiveness::NoEffect)]
    #[case(0.25, Effectiveness::NotVeryEffective)]
    #[case(1.0, Effectiveness::Normal)]
    #[case(4.0, Effectiveness::SuperEffective)]
    fn test_effectiveness_labels(#[case] multiplier: f64, #[case] expected: Effectiveness) {
        assert_eq!(Effectiveness::from_multiplier(multiplier), expected);
    }

    #[test]
    fn test_parse_types() {
        assert_eq!(
            parse_types(&["grass", "Poison"]).unwrap(),
            vec![MonsterType::Grass, MonsterType::Poison]
        );
        assert_eq!(
            parse_type("Sound"),
            Err(ConfigError::UnknownType("Sound".to_string()))
        );
        assert!(parse_types(&["Fire", "fire"]).is_err());
        assert!(parse_types(&[]).is_err());
    }

    fn any_type() -> impl Strategy<Value = MonsterType> {
        (0..18usize).prop_map(|i| MonsterType::iter().nth(i).unwrap_or(MonsterType::Normal))
    }

    proptest! {
        #[test]
        fn prop_order_of_defenders_does_not_matter(
            attacking in any_type(),
            first in any_type(),
            second in any_type(),
        ) {
            prop_assert_eq!(
                effectiveness(attacking, &[first, second]),
                effectiveness(attacking, &[second, first])
            );
        }

        #[test]
        fn prop_product_of_single_factors(
            attacking in any_type(),
            first in any_type(),
            second in any_type(),
        ) {
            let expected = effectiveness(attacking, &[first]) * effectiveness(attacking, &[second]);
            prop_assert_eq!(effectiveness(attacking, &[first, second]), expected);
        }
    }
}
