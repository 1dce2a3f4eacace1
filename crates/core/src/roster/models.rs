//! The live roster and the ids handed out for its entries.

use std::{fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::catalog::{
    Allegiance, Battalion, Catalog, ExtraAbility, GrandAlliance, Unit, WeaponOption,
};

/// Name given to freshly created rosters.
pub const DEFAULT_ROSTER_NAME: &str = "New Warscroll";

/// Roster-scoped identifier of a chosen unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RosterUnitId(pub u32);

/// Roster-scoped identifier of a chosen battalion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RosterBattalionId(pub u32);

impl fmt::Display for RosterUnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u{}", self.0)
    }
}

impl fmt::Display for RosterBattalionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// Accepts the displayed form (`u3`, `b3`) or a bare number.
fn parse_prefixed(value: &str, prefix: char) -> Result<u32, String> {
    let digits = value.strip_prefix(prefix).unwrap_or(value);
    digits
        .parse()
        .map_err(|_| format!("invalid roster id {value:?}, expected {prefix}<number>"))
}

impl FromStr for RosterUnitId {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        parse_prefixed(value, 'u').map(RosterUnitId)
    }
}

impl FromStr for RosterBattalionId {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        parse_prefixed(value, 'b').map(RosterBattalionId)
    }
}

/// Selection made for one weapon option group of a unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeaponOptionSelection {
    /// Chosen option, if any.
    pub weapon_option: Option<WeaponOption>,
    /// Models carrying it; `None` means unspecified.
    pub count: Option<u32>,
}

/// A unit chosen in the roster together with its configuration.
#[derive(Debug, Clone)]
pub struct RosterUnit {
    /// Stable for the life of the process.
    pub id: RosterUnitId,
    /// Catalog unit this entry was built from.
    pub unit: Arc<Unit>,
    /// Number of unit-size blocks, at least 1.
    pub count: u32,
    /// Positionally aligned with `unit.weapon_options`.
    pub weapon_options: Vec<WeaponOptionSelection>,
    /// Command traits and artifacts given to this entry.
    pub extra_abilities: Vec<Arc<ExtraAbility>>,
}

impl RosterUnit {
    pub(crate) fn new(id: RosterUnitId, unit: Arc<Unit>) -> Self {
        let weapon_options = vec![WeaponOptionSelection::default(); unit.weapon_options.len()];
        Self {
            id,
            unit,
            count: 1,
            weapon_options,
            extra_abilities: Vec::new(),
        }
    }

    /// Points paid for this entry (`count * unit.points`).
    pub fn points(&self) -> u32 {
        self.count.saturating_mul(self.unit.points)
    }
}

/// A battalion chosen in the roster.
#[derive(Debug, Clone)]
pub struct RosterBattalion {
    /// Stable for the life of the process.
    pub id: RosterBattalionId,
    /// Catalog battalion this entry was built from.
    pub battalion: Arc<Battalion>,
}

/// The live army list.
///
/// Collections are only changed through the crate's mutation paths so the general
/// reference and the id serial stay consistent; see [`crate::store::RosterStore`].
#[derive(Debug, Clone)]
pub struct Roster {
    /// User-facing roster name.
    pub name: String,
    /// Coarse affiliation, independent of `allegiance`.
    pub grand_alliance: GrandAlliance,
    /// Drives ability eligibility and which army option applies.
    pub allegiance: Arc<Allegiance>,
    /// Value chosen for the allegiance's army option; empty when unset.
    pub army_option: String,
    units: Vec<RosterUnit>,
    battalions: Vec<RosterBattalion>,
    general: Option<RosterUnitId>,
    serial: u32,
}

impl Roster {
    /// Empty roster using the catalog's first allegiance.
    pub fn new(catalog: &Catalog) -> Self {
        Self {
            name: DEFAULT_ROSTER_NAME.to_string(),
            grand_alliance: GrandAlliance::default(),
            allegiance: Arc::clone(catalog.default_allegiance()),
            army_option: String::new(),
            units: Vec::new(),
            battalions: Vec::new(),
            general: None,
            serial: 0,
        }
    }

    /// Units in insertion order.
    pub fn units(&self) -> &[RosterUnit] {
        &self.units
    }

    /// Battalions in insertion order.
    pub fn battalions(&self) -> &[RosterBattalion] {
        &self.battalions
    }

    /// Look up a unit by roster id.
    pub fn unit(&self, id: RosterUnitId) -> Option<&RosterUnit> {
        self.units.iter().find(|unit| unit.id == id)
    }

    /// Look up a battalion by roster id.
    pub fn battalion(&self, id: RosterBattalionId) -> Option<&RosterBattalion> {
        self.battalions.iter().find(|battalion| battalion.id == id)
    }

    /// Id stored as general, even when it no longer resolves to a roster unit.
    pub fn general_id(&self) -> Option<RosterUnitId> {
        self.general
    }

    /// The general, resolved against the current units.
    pub fn general(&self) -> Option<&RosterUnit> {
        self.general.and_then(|id| self.unit(id))
    }

    /// Whether `id` is the stored general.
    pub fn is_general(&self, id: RosterUnitId) -> bool {
        self.general == Some(id)
    }

    /// Next value of the id serial; ids below it have already been handed out.
    pub fn serial(&self) -> u32 {
        self.serial
    }

    /// Abilities selected across the roster, in unit order.
    ///
    /// Derived from the per-unit selections; there is no separate roster-level list.
    pub fn extra_abilities(&self) -> impl Iterator<Item = &Arc<ExtraAbility>> + '_ {
        self.units.iter().flat_map(|unit| unit.extra_abilities.iter())
    }

    fn next_serial(&mut self) -> u32 {
        let value = self.serial;
        self.serial += 1;
        value
    }

    pub(crate) fn unit_mut(&mut self, id: RosterUnitId) -> Option<&mut RosterUnit> {
        self.units.iter_mut().find(|unit| unit.id == id)
    }

    /// Mint a roster unit without adding it; used by restore before pushing.
    pub(crate) fn new_unit(&mut self, unit: Arc<Unit>) -> RosterUnit {
        let id = RosterUnitId(self.next_serial());
        RosterUnit::new(id, unit)
    }

    pub(crate) fn push_unit(&mut self, unit: RosterUnit) {
        self.units.push(unit);
    }

    pub(crate) fn add_unit(&mut self, unit: Arc<Unit>) -> RosterUnitId {
        let entry = self.new_unit(unit);
        let id = entry.id;
        self.units.push(entry);
        id
    }

    pub(crate) fn set_unit_count(&mut self, id: RosterUnitId, count: u32) -> bool {
        match self.unit_mut(id) {
            Some(unit) => {
                unit.count = count;
                true
            }
            None => false,
        }
    }

    /// Remove a unit; clears the general when it pointed at that unit.
    pub(crate) fn remove_unit(&mut self, id: RosterUnitId) -> bool {
        let Some(position) = self.units.iter().position(|unit| unit.id == id) else {
            return false;
        };
        self.units.remove(position);
        if self.general == Some(id) {
            self.general = None;
        }
        true
    }

    pub(crate) fn add_battalion(&mut self, battalion: Arc<Battalion>) -> RosterBattalionId {
        let id = RosterBattalionId(self.next_serial());
        self.battalions.push(RosterBattalion { id, battalion });
        id
    }

    pub(crate) fn remove_battalion(&mut self, id: RosterBattalionId) -> bool {
        let before = self.battalions.len();
        self.battalions.retain(|battalion| battalion.id != id);
        self.battalions.len() != before
    }

    /// Reassign the general. The id is not checked against the units.
    pub(crate) fn set_general(&mut self, id: Option<RosterUnitId>) {
        self.general = id;
    }

    pub(crate) fn set_weapon_option(
        &mut self,
        id: RosterUnitId,
        slot: usize,
        weapon_option: WeaponOption,
        count: Option<u32>,
    ) -> bool {
        let Some(selection) = self
            .unit_mut(id)
            .and_then(|unit| unit.weapon_options.get_mut(slot))
        else {
            return false;
        };
        *selection = WeaponOptionSelection {
            weapon_option: Some(weapon_option),
            count,
        };
        true
    }

    pub(crate) fn add_extra_ability(&mut self, id: RosterUnitId, ability: Arc<ExtraAbility>) -> bool {
        match self.unit_mut(id) {
            Some(unit) => {
                unit.extra_abilities.push(ability);
                true
            }
            None => false,
        }
    }

    /// Remove the first selection of `ability_id` from that unit only.
    pub(crate) fn remove_extra_ability(&mut self, id: RosterUnitId, ability_id: &str) -> bool {
        let Some(unit) = self.unit_mut(id) else {
            return false;
        };
        match unit
            .extra_abilities
            .iter()
            .position(|ability| ability.id == ability_id)
        {
            Some(position) => {
                unit.extra_abilities.remove(position);
                true
            }
            None => false,
        }
    }

    /// Drop every chosen entity ahead of a restore. The serial keeps counting.
    pub(crate) fn clear(&mut self) {
        self.name = DEFAULT_ROSTER_NAME.to_string();
        self.general = None;
        self.units.clear();
        self.battalions.clear();
    }

    /// Return to the state of [`Roster::new`] without restarting the serial.
    pub(crate) fn reset(&mut self, catalog: &Catalog) {
        self.clear();
        self.grand_alliance = GrandAlliance::default();
        self.allegiance = Arc::clone(catalog.default_allegiance());
        self.army_option.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::test_support::catalog;

    #[test]
    fn ids_parse_from_their_display_form() {
        assert_eq!("u4".parse::<RosterUnitId>(), Ok(RosterUnitId(4)));
        assert_eq!("12".parse::<RosterUnitId>(), Ok(RosterUnitId(12)));
        assert_eq!(
            RosterBattalionId(2).to_string().parse::<RosterBattalionId>(),
            Ok(RosterBattalionId(2))
        );
        assert!("b1".parse::<RosterUnitId>().is_err());
    }

    #[test]
    fn new_roster_uses_first_allegiance() {
        let catalog = catalog();
        let roster = Roster::new(&catalog);
        assert_eq!(roster.name, DEFAULT_ROSTER_NAME);
        assert_eq!(roster.allegiance.id, "chaos");
        assert_eq!(roster.grand_alliance, GrandAlliance::Order);
        assert!(roster.units().is_empty());
        assert!(roster.battalions().is_empty());
        assert!(roster.general().is_none());
    }

    #[test]
    fn ids_come_from_a_shared_serial() {
        let catalog = catalog();
        let mut roster = Roster::new(&catalog);
        let first = roster.add_unit(catalog.unit("liberators").cloned().expect("unit"));
        let battalion = roster.add_battalion(
            catalog
                .battalion("lordsOfTheStorm")
                .cloned()
                .expect("battalion"),
        );
        let second = roster.add_unit(catalog.unit("judicators").cloned().expect("unit"));

        assert_eq!(first, RosterUnitId(0));
        assert_eq!(battalion, RosterBattalionId(1));
        assert_eq!(second, RosterUnitId(2));

        assert!(roster.remove_unit(second));
        let third = roster.add_unit(catalog.unit("judicators").cloned().expect("unit"));
        assert_eq!(third, RosterUnitId(3), "ids are never reused");
    }

    #[test]
    fn added_unit_has_one_empty_slot_per_option_group() {
        let catalog = catalog();
        let mut roster = Roster::new(&catalog);
        let id = roster.add_unit(catalog.unit("liberators").cloned().expect("unit"));
        let unit = roster.unit(id).expect("roster unit");
        assert_eq!(unit.count, 1);
        assert_eq!(unit.weapon_options.len(), 2);
        assert!(unit
            .weapon_options
            .iter()
            .all(|slot| *slot == WeaponOptionSelection::default()));
    }

    #[test]
    fn removing_the_general_clears_it() {
        let catalog = catalog();
        let mut roster = Roster::new(&catalog);
        let lord = roster.add_unit(catalog.unit("lordCelestant").cloned().expect("unit"));
        roster.set_general(Some(lord));
        assert_eq!(roster.general().map(|unit| unit.id), Some(lord));

        assert!(roster.remove_unit(lord));
        assert_eq!(roster.general_id(), None);
        assert!(!roster.remove_unit(lord));
    }

    #[test]
    fn general_is_not_checked_against_units() {
        let catalog = catalog();
        let mut roster = Roster::new(&catalog);
        roster.set_general(Some(RosterUnitId(42)));
        assert_eq!(roster.general_id(), Some(RosterUnitId(42)));
        assert!(roster.general().is_none());
    }

    #[test]
    fn weapon_option_slot_is_overwritten_positionally() {
        let catalog = catalog();
        let mut roster = Roster::new(&catalog);
        let id = roster.add_unit(catalog.unit("liberators").cloned().expect("unit"));
        let unit = catalog.unit("liberators").expect("unit");
        let grandblade = unit.weapon_options[1].options[1].clone();

        assert!(roster.set_weapon_option(id, 1, grandblade.clone(), Some(2)));
        assert!(!roster.set_weapon_option(id, 5, grandblade.clone(), None));

        let slots = &roster.unit(id).expect("roster unit").weapon_options;
        assert_eq!(slots[0], WeaponOptionSelection::default());
        assert_eq!(slots[1].weapon_option.as_ref(), Some(&grandblade));
        assert_eq!(slots[1].count, Some(2));
    }

    #[test]
    fn roster_abilities_are_the_union_of_unit_selections() {
        let catalog = catalog();
        let mut roster = Roster::new(&catalog);
        let lord = roster.add_unit(catalog.unit("lordCelestant").cloned().expect("unit"));
        let castellant = roster.add_unit(catalog.unit("lordCastellant").cloned().expect("unit"));
        let mirrorshield = catalog
            .extra_ability("stormcastEternalsMirrorshield")
            .cloned()
            .expect("ability");
        let strife_ender = catalog
            .extra_ability("stormcastEternalsStrifeEnder")
            .cloned()
            .expect("ability");

        roster.add_extra_ability(lord, Arc::clone(&strife_ender));
        roster.add_extra_ability(castellant, Arc::clone(&mirrorshield));
        roster.add_extra_ability(lord, Arc::clone(&mirrorshield));

        assert!(roster.remove_extra_ability(lord, "stormcastEternalsStrifeEnder"));
        let ids: Vec<_> = roster
            .extra_abilities()
            .map(|ability| ability.id.as_str())
            .collect();
        assert_eq!(
            ids,
            vec!["stormcastEternalsMirrorshield", "stormcastEternalsMirrorshield"]
        );
        assert!(!roster.remove_extra_ability(lord, "stormcastEternalsStrifeEnder"));
    }
}
