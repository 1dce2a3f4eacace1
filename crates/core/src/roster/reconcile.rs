//! Battalion requirements not yet covered by standalone roster units.
//!
//! The counter is shared across battalions: when two battalions require the same unit
//! type, a standalone unit clears one requirement without saying which battalion it
//! belongs to.

use std::{collections::BTreeMap, sync::Arc};

use crate::catalog::{Battalion, Unit};

use super::models::{Roster, RosterBattalionId};

/// Outstanding required count per catalog unit id.
///
/// Every unit id required by a chosen battalion has an entry; zero means satisfied.
/// Each standalone roster unit covers at most one requirement, whatever its count.
pub fn outstanding_requirements(roster: &Roster) -> BTreeMap<String, u32> {
    let mut required: BTreeMap<String, u32> = BTreeMap::new();
    for entry in roster.battalions() {
        for requirement in &entry.battalion.units {
            *required.entry(requirement.unit.id.clone()).or_insert(0) += requirement.count;
        }
    }

    for unit in roster.units() {
        if let Some(remaining) = required.get_mut(&unit.unit.id) {
            if *remaining > 0 {
                *remaining -= 1;
            }
        }
    }

    required
}

/// Status of one required allocation on a battalion line.
#[derive(Debug, Clone)]
pub struct RequirementStatus<'a> {
    /// Catalog unit the battalion asks for.
    pub unit: &'a Arc<Unit>,
    /// Entries required.
    pub count: u32,
    /// The shared counter for this unit id is still positive.
    pub missing: bool,
}

/// A chosen battalion with its requirements flagged.
#[derive(Debug, Clone)]
pub struct BattalionLine<'a> {
    /// Roster id of the battalion entry.
    pub id: RosterBattalionId,
    /// Catalog battalion.
    pub battalion: &'a Arc<Battalion>,
    /// One status per required allocation, in catalog order.
    pub requirements: Vec<RequirementStatus<'a>>,
}

impl BattalionLine<'_> {
    /// No requirement is flagged missing.
    pub fn is_satisfied(&self) -> bool {
        self.requirements.iter().all(|status| !status.missing)
    }
}

/// One line per chosen battalion, in registration order.
pub fn battalion_lines(roster: &Roster) -> Vec<BattalionLine<'_>> {
    let outstanding = outstanding_requirements(roster);
    roster
        .battalions()
        .iter()
        .map(|entry| BattalionLine {
            id: entry.id,
            battalion: &entry.battalion,
            requirements: entry
                .battalion
                .units
                .iter()
                .map(|requirement| RequirementStatus {
                    unit: &requirement.unit,
                    count: requirement.count,
                    missing: outstanding
                        .get(&requirement.unit.id)
                        .map(|remaining| *remaining > 0)
                        .unwrap_or(false),
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::test_support::catalog;

    #[test]
    fn standalone_units_cover_one_requirement_each() {
        let catalog = catalog();
        let mut roster = Roster::new(&catalog);
        roster.add_battalion(
            catalog
                .battalion("lordsOfTheStorm")
                .cloned()
                .expect("battalion"),
        );
        let liberators = catalog.unit("liberators").cloned().expect("unit");

        assert_eq!(outstanding_requirements(&roster).get("liberators"), Some(&2));

        let first = roster.add_unit(Arc::clone(&liberators));
        roster.set_unit_count(first, 6);
        assert_eq!(outstanding_requirements(&roster).get("liberators"), Some(&1));

        roster.add_unit(Arc::clone(&liberators));
        assert_eq!(outstanding_requirements(&roster).get("liberators"), Some(&0));

        roster.add_unit(Arc::clone(&liberators));
        assert_eq!(outstanding_requirements(&roster).get("liberators"), Some(&0));
        assert_eq!(outstanding_requirements(&roster).get("lordCelestant"), Some(&1));
    }

    #[test]
    fn unrelated_units_leave_no_entry() {
        let catalog = catalog();
        let mut roster = Roster::new(&catalog);
        roster.add_unit(catalog.unit("celestarBallista").cloned().expect("unit"));
        assert!(outstanding_requirements(&roster).is_empty());
    }

    #[test]
    fn shared_requirements_use_one_counter() {
        let catalog = catalog();
        let mut roster = Roster::new(&catalog);
        roster.add_battalion(
            catalog
                .battalion("lordsOfTheStorm")
                .cloned()
                .expect("battalion"),
        );
        roster.add_battalion(
            catalog
                .battalion("thunderwaveEchelon")
                .cloned()
                .expect("battalion"),
        );
        for _ in 0..2 {
            roster.add_unit(catalog.unit("liberators").cloned().expect("unit"));
        }

        let outstanding = outstanding_requirements(&roster);
        assert_eq!(outstanding.get("liberators"), Some(&1));
        assert_eq!(outstanding.get("judicators"), Some(&2));

        let lines = battalion_lines(&roster);
        assert_eq!(lines.len(), 2);
        assert!(lines
            .iter()
            .flat_map(|line| &line.requirements)
            .filter(|status| status.unit.id == "liberators")
            .all(|status| status.missing));

        roster.add_unit(catalog.unit("liberators").cloned().expect("unit"));
        roster.add_unit(catalog.unit("lordCelestant").cloned().expect("unit"));
        let lines = battalion_lines(&roster);
        assert!(lines[0].is_satisfied());
        assert!(!lines[1].is_satisfied());
        assert!(!lines[1].requirements[0].missing);
        assert!(lines[1].requirements[1].missing);
    }
}
