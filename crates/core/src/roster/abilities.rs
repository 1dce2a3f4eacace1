//! Eligibility of command traits and artifacts.

use std::sync::Arc;

use crate::catalog::{AbilityCategory, AvailabilityRule, Catalog, ExtraAbility, UnitCategory};

use super::models::{Roster, RosterUnit, RosterUnitId};

/// Whether `ability` may be given to `unit` in the roster's current state.
pub fn is_ability_available(ability: &ExtraAbility, unit: &RosterUnit, roster: &Roster) -> bool {
    match ability.rule {
        AvailabilityRule::CommandTrait => {
            roster.is_general(unit.id)
                && roster
                    .extra_abilities()
                    .all(|selected| selected.category != AbilityCategory::Command)
        }
        AvailabilityRule::Artifact => {
            let artifacts = roster
                .extra_abilities()
                .filter(|selected| selected.category == AbilityCategory::Artifact)
                .count();
            unit.unit.has_category(UnitCategory::Leader)
                && unit
                    .extra_abilities
                    .iter()
                    .all(|selected| selected.category != AbilityCategory::Artifact)
                && artifacts < 1 + roster.battalions().len()
        }
        AvailabilityRule::Always => true,
    }
}

impl Roster {
    /// Catalog abilities of the roster's allegiance that the unit may take right now.
    pub fn available_extra_abilities<'c>(
        &self,
        unit_id: RosterUnitId,
        catalog: &'c Catalog,
    ) -> Vec<&'c Arc<ExtraAbility>> {
        let Some(unit) = self.unit(unit_id) else {
            return Vec::new();
        };
        catalog
            .extra_abilities()
            .iter()
            .filter(|ability| ability.allegiance.id == self.allegiance.id)
            .filter(|ability| is_ability_available(ability, unit, self))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::test_support::catalog;

    fn ids(abilities: &[&Arc<ExtraAbility>]) -> Vec<String> {
        abilities.iter().map(|ability| ability.id.clone()).collect()
    }

    fn stormcast_roster(catalog: &Catalog) -> Roster {
        let mut roster = Roster::new(catalog);
        roster.allegiance = catalog
            .allegiance("stormcastEternals")
            .cloned()
            .expect("allegiance");
        roster
    }

    #[test]
    fn command_traits_need_the_general_and_stay_unique() {
        let catalog = catalog();
        let mut roster = stormcast_roster(&catalog);
        let lord = roster.add_unit(catalog.unit("lordCelestant").cloned().expect("unit"));

        let offered = ids(&roster.available_extra_abilities(lord, &catalog));
        assert!(!offered.contains(&"stormcastEternalsShieldedByFaith".to_string()));

        roster.set_general(Some(lord));
        let offered = ids(&roster.available_extra_abilities(lord, &catalog));
        assert!(offered.contains(&"stormcastEternalsShieldedByFaith".to_string()));
        assert!(offered.contains(&"stormcastEternalsConsummateCommander".to_string()));

        let trait_ = catalog
            .extra_ability("stormcastEternalsShieldedByFaith")
            .cloned()
            .expect("ability");
        roster.add_extra_ability(lord, trait_);
        let offered = ids(&roster.available_extra_abilities(lord, &catalog));
        assert!(!offered.contains(&"stormcastEternalsConsummateCommander".to_string()));
    }

    #[test]
    fn artifacts_are_limited_by_battalions() {
        let catalog = catalog();
        let mut roster = stormcast_roster(&catalog);
        let lord = roster.add_unit(catalog.unit("lordCelestant").cloned().expect("unit"));
        let castellant = roster.add_unit(catalog.unit("lordCastellant").cloned().expect("unit"));
        let liberators = roster.add_unit(catalog.unit("liberators").cloned().expect("unit"));

        assert!(roster
            .available_extra_abilities(liberators, &catalog)
            .is_empty());

        let mirrorshield = catalog
            .extra_ability("stormcastEternalsMirrorshield")
            .cloned()
            .expect("ability");
        roster.add_extra_ability(lord, mirrorshield);

        let lord_offers = ids(&roster.available_extra_abilities(lord, &catalog));
        assert!(!lord_offers.contains(&"stormcastEternalsStrifeEnder".to_string()));
        let castellant_offers = ids(&roster.available_extra_abilities(castellant, &catalog));
        assert!(!castellant_offers.contains(&"stormcastEternalsStrifeEnder".to_string()));

        roster.add_battalion(
            catalog
                .battalion("lordsOfTheStorm")
                .cloned()
                .expect("battalion"),
        );
        let castellant_offers = ids(&roster.available_extra_abilities(castellant, &catalog));
        assert!(castellant_offers.contains(&"stormcastEternalsStrifeEnder".to_string()));
    }

    #[test]
    fn other_allegiances_are_not_offered() {
        let catalog = catalog();
        let mut roster = Roster::new(&catalog);
        let lord = roster.add_unit(catalog.unit("lordCelestant").cloned().expect("unit"));
        roster.set_general(Some(lord));
        assert!(roster.available_extra_abilities(lord, &catalog).is_empty());
        assert!(roster
            .available_extra_abilities(RosterUnitId(99), &catalog)
            .is_empty());
    }
}
