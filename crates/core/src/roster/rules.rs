//! Point accounting and army-composition bounds.
//!
//! Everything here is recomputed from the roster on every call; nothing is cached.

use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

use crate::catalog::{CategoryRule, UnitCategory};

use super::models::{Roster, RosterUnit};

/// Lower bound on leaders, whatever the point total.
pub const MIN_LEADERS: u32 = 1;

/// Which point thresholds the battleline requirement uses.
///
/// `Legacy` keeps the historic 20000-point middle tier; `Standard` uses 2000 like the
/// other bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BattlelineTiers {
    /// 1000 / 20000 / 2000 thresholds.
    #[default]
    Legacy,
    /// 1000 / 2000 thresholds.
    Standard,
}

impl BattlelineTiers {
    fn middle_threshold(self) -> u32 {
        match self {
            BattlelineTiers::Legacy => 20_000,
            BattlelineTiers::Standard => 2_000,
        }
    }
}

/// Maximum number of leaders for a point total.
pub fn max_leaders(total_points: u32) -> u32 {
    match total_points {
        0..=1000 => 4,
        1001..=2000 => 6,
        _ => 8,
    }
}

/// Exact number of battleline units required for a point total.
pub fn battleline_requirement(total_points: u32, tiers: BattlelineTiers) -> u32 {
    if total_points <= 1000 {
        2
    } else if total_points <= tiers.middle_threshold() {
        3
    } else {
        4
    }
}

/// Maximum number of behemoths for a point total.
pub fn max_behemoths(total_points: u32) -> u32 {
    match total_points {
        0..=1000 => 2,
        1001..=2000 => 4,
        _ => 5,
    }
}

/// Maximum number of artillery units for a point total.
pub fn max_artillery(total_points: u32) -> u32 {
    match total_points {
        0..=1000 => 2,
        1001..=2000 => 4,
        _ => 5,
    }
}

/// Categories a roster unit currently counts towards.
///
/// Tags gated on the general are evaluated against the roster as it is now.
pub fn evaluate_categories(unit: &RosterUnit, roster: &Roster) -> BTreeSet<UnitCategory> {
    let is_general = roster.is_general(unit.id);
    unit.unit
        .categories
        .iter()
        .filter(|tag| match tag.when {
            CategoryRule::Always => true,
            CategoryRule::WhenGeneral => is_general,
            CategoryRule::WhenNotGeneral => !is_general,
        })
        .map(|tag| tag.category)
        .collect()
}

impl Roster {
    /// Sum of `count * points` over the chosen units.
    pub fn units_points(&self) -> u32 {
        self.units()
            .iter()
            .fold(0u32, |total, unit| total.saturating_add(unit.points()))
    }

    /// Sum of battalion costs.
    pub fn battalions_points(&self) -> u32 {
        self.battalions()
            .iter()
            .fold(0u32, |total, entry| {
                total.saturating_add(entry.battalion.points)
            })
    }

    /// Units plus battalions.
    pub fn total_points(&self) -> u32 {
        self.units_points().saturating_add(self.battalions_points())
    }

    /// Number of roster entries counting towards `category` (entries, not models).
    pub fn category_count(&self, category: UnitCategory) -> u32 {
        self.units()
            .iter()
            .filter(|unit| evaluate_categories(unit, self).contains(&category))
            .count() as u32
    }

    /// Snapshot of points, category counts, bounds and validity.
    pub fn composition(&self, tiers: BattlelineTiers) -> Composition {
        let units_points = self.units_points();
        let battalions_points = self.battalions_points();
        let total_points = units_points.saturating_add(battalions_points);
        let battlelines_required = battleline_requirement(total_points, tiers);

        Composition {
            units_points,
            battalions_points,
            total_points,
            leaders: self.category_count(UnitCategory::Leader),
            battlelines: self.category_count(UnitCategory::Battleline),
            behemoths: self.category_count(UnitCategory::Behemoth),
            artillery: self.category_count(UnitCategory::Artillery),
            min_leaders: MIN_LEADERS,
            max_leaders: max_leaders(total_points),
            min_battlelines: battlelines_required,
            max_battlelines: battlelines_required,
            max_behemoths: max_behemoths(total_points),
            max_artillery: max_artillery(total_points),
        }
    }
}

/// Derived composition figures for one roster state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Composition {
    /// Sum of unit entry points.
    pub units_points: u32,
    /// Sum of battalion costs.
    pub battalions_points: u32,
    /// `units_points + battalions_points`.
    pub total_points: u32,
    /// Entries counting as leaders.
    pub leaders: u32,
    /// Entries counting as battleline.
    pub battlelines: u32,
    /// Entries counting as behemoths.
    pub behemoths: u32,
    /// Entries counting as artillery.
    pub artillery: u32,
    /// Always 1.
    pub min_leaders: u32,
    /// Leader cap for `total_points`.
    pub max_leaders: u32,
    /// Battleline requirement; equal to `max_battlelines`.
    pub min_battlelines: u32,
    /// Battleline requirement.
    pub max_battlelines: u32,
    /// Behemoth cap.
    pub max_behemoths: u32,
    /// Artillery cap.
    pub max_artillery: u32,
}

impl Composition {
    /// Leader count within its bounds.
    pub fn is_leaders_valid(&self) -> bool {
        self.min_leaders <= self.leaders && self.leaders <= self.max_leaders
    }

    /// Battleline count must match the requirement exactly.
    pub fn is_battlelines_valid(&self) -> bool {
        self.battlelines == self.min_battlelines
    }

    /// At or under the behemoth cap.
    pub fn is_behemoths_valid(&self) -> bool {
        self.behemoths <= self.max_behemoths
    }

    /// At or under the artillery cap.
    pub fn is_artillery_valid(&self) -> bool {
        self.artillery <= self.max_artillery
    }

    /// Every rule holds.
    pub fn is_valid(&self) -> bool {
        self.is_leaders_valid()
            && self.is_battlelines_valid()
            && self.is_behemoths_valid()
            && self.is_artillery_valid()
    }

    /// Advisory violations, in display order.
    pub fn warnings(&self) -> Vec<CompositionWarning> {
        let mut warnings = Vec::new();
        if !self.is_leaders_valid() {
            warnings.push(CompositionWarning::Leaders {
                count: self.leaders,
                min: self.min_leaders,
                max: self.max_leaders,
            });
        }
        if !self.is_battlelines_valid() {
            warnings.push(CompositionWarning::Battlelines {
                count: self.battlelines,
                required: self.min_battlelines,
            });
        }
        if !self.is_behemoths_valid() {
            warnings.push(CompositionWarning::Behemoths {
                count: self.behemoths,
                max: self.max_behemoths,
            });
        }
        if !self.is_artillery_valid() {
            warnings.push(CompositionWarning::Artillery {
                count: self.artillery,
                max: self.max_artillery,
            });
        }
        warnings
    }
}

/// A composition rule the roster currently breaks. Never blocks a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "lowercase")]
pub enum CompositionWarning {
    /// Leader count outside `min..=max`.
    Leaders {
        /// Leaders in the roster.
        count: u32,
        /// Lower bound.
        min: u32,
        /// Upper bound.
        max: u32,
    },
    /// Battleline count differs from the requirement.
    Battlelines {
        /// Battleline entries in the roster.
        count: u32,
        /// Exact number needed.
        required: u32,
    },
    /// Too many behemoths.
    Behemoths {
        /// Behemoths in the roster.
        count: u32,
        /// Cap.
        max: u32,
    },
    /// Too much artillery.
    Artillery {
        /// Artillery in the roster.
        count: u32,
        /// Cap.
        max: u32,
    },
}

impl fmt::Display for CompositionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompositionWarning::Leaders { count, min, max } => {
                write!(f, "{count} leaders ({min} - {max})")
            }
            CompositionWarning::Battlelines { count, required } => {
                write!(f, "{count} battlelines ({required} required)")
            }
            CompositionWarning::Behemoths { count, max } => {
                write!(f, "{count} behemoths (0 - {max})")
            }
            CompositionWarning::Artillery { count, max } => {
                write!(f, "{count} artillery (0 - {max})")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::test_support::catalog;

    #[test]
    fn empty_roster_has_no_points_and_too_few_leaders() {
        let catalog = catalog();
        let roster = Roster::new(&catalog);
        let composition = roster.composition(BattlelineTiers::Legacy);

        assert_eq!(composition.total_points, 0);
        assert_eq!(composition.max_leaders, 4);
        assert_eq!(composition.min_battlelines, 2);
        assert!(!composition.is_leaders_valid());
        assert!(!composition.is_battlelines_valid());
        assert!(composition.is_behemoths_valid());
        assert!(composition.is_artillery_valid());
        assert_eq!(
            composition.warnings(),
            vec![
                CompositionWarning::Leaders {
                    count: 0,
                    min: 1,
                    max: 4
                },
                CompositionWarning::Battlelines {
                    count: 0,
                    required: 2
                },
            ]
        );
    }

    #[test]
    fn points_add_units_and_battalions() {
        let catalog = catalog();
        let mut roster = Roster::new(&catalog);
        let liberators = roster.add_unit(catalog.unit("liberators").cloned().expect("unit"));
        roster.set_unit_count(liberators, 3);
        roster.add_unit(catalog.unit("lordCelestant").cloned().expect("unit"));
        roster.add_battalion(
            catalog
                .battalion("lordsOfTheStorm")
                .cloned()
                .expect("battalion"),
        );

        assert_eq!(roster.units_points(), 400);
        assert_eq!(roster.battalions_points(), 140);
        assert_eq!(roster.total_points(), 540);
    }

    #[test]
    fn bounds_step_with_points() {
        assert_eq!(max_leaders(1000), 4);
        assert_eq!(max_leaders(1001), 6);
        assert_eq!(max_leaders(2000), 6);
        assert_eq!(max_leaders(2001), 8);
        assert_eq!(max_behemoths(1000), 2);
        assert_eq!(max_behemoths(2000), 4);
        assert_eq!(max_behemoths(2001), 5);
        assert_eq!(max_artillery(1500), 4);
        assert_eq!(max_artillery(5000), 5);
    }

    #[test]
    fn legacy_battleline_tiers_keep_the_wide_middle_band() {
        assert_eq!(battleline_requirement(1000, BattlelineTiers::Legacy), 2);
        assert_eq!(battleline_requirement(2500, BattlelineTiers::Legacy), 3);
        assert_eq!(battleline_requirement(20_000, BattlelineTiers::Legacy), 3);
        assert_eq!(battleline_requirement(20_001, BattlelineTiers::Legacy), 4);

        assert_eq!(battleline_requirement(2000, BattlelineTiers::Standard), 3);
        assert_eq!(battleline_requirement(2001, BattlelineTiers::Standard), 4);
    }

    #[test]
    fn battlelines_must_match_exactly() {
        let catalog = catalog();
        let mut roster = Roster::new(&catalog);
        for _ in 0..3 {
            roster.add_unit(catalog.unit("liberators").cloned().expect("unit"));
        }
        let composition = roster.composition(BattlelineTiers::Legacy);
        assert_eq!(composition.battlelines, 3);
        assert_eq!(composition.min_battlelines, 2);
        assert!(!composition.is_battlelines_valid(), "more than required is invalid too");
    }

    #[test]
    fn general_gated_categories_follow_the_general() {
        let catalog = catalog();
        let mut roster = Roster::new(&catalog);
        let prime = roster.add_unit(catalog.unit("celestantPrime").cloned().expect("unit"));
        let lord = roster.add_unit(catalog.unit("lordCelestant").cloned().expect("unit"));

        assert_eq!(roster.category_count(UnitCategory::Behemoth), 1);
        assert_eq!(roster.category_count(UnitCategory::Leader), 2);

        roster.set_general(Some(prime));
        let categories = evaluate_categories(roster.unit(prime).expect("unit"), &roster);
        assert!(categories.contains(&UnitCategory::Leader));
        assert!(!categories.contains(&UnitCategory::Behemoth));
        assert_eq!(roster.category_count(UnitCategory::Behemoth), 0);

        roster.set_general(Some(lord));
        assert_eq!(roster.category_count(UnitCategory::Behemoth), 1);
    }

    #[test]
    fn category_counts_ignore_unit_size() {
        let catalog = catalog();
        let mut roster = Roster::new(&catalog);
        let ballista = roster.add_unit(catalog.unit("celestarBallista").cloned().expect("unit"));
        roster.set_unit_count(ballista, 3);
        roster.add_unit(catalog.unit("celestarBallista").cloned().expect("unit"));
        roster.add_unit(catalog.unit("celestarBallista").cloned().expect("unit"));

        let composition = roster.composition(BattlelineTiers::Legacy);
        assert_eq!(composition.artillery, 3);
        assert_eq!(composition.total_points, 500);
        assert!(!composition.is_artillery_valid());
        assert_eq!(
            composition.warnings().last().map(ToString::to_string),
            Some("3 artillery (0 - 2)".to_string())
        );
    }
}
