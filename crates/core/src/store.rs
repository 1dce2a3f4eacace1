//! The live roster, its mutation API and slot management.
//!
//! Every mutation bumps the revision, notifies subscribers and re-serializes the roster
//! into the active slot before returning.

use std::{collections::BTreeMap, fmt, sync::Arc};

use tracing::{debug, info, warn};

use crate::{
    catalog::{ArmyOption, Battalion, Catalog, ExtraAbility, GrandAlliance, Unit, WeaponOption},
    roster::{
        battalion_lines, outstanding_requirements, BattalionLine, BattlelineTiers, Composition,
        Roster, RosterBattalionId, RosterUnitId,
    },
    save::{KeyValueStore, SaveManager, StoreError},
};

/// What a mutation did to the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterChange {
    /// The call referenced something the roster does not hold; nothing was written.
    Unchanged,
    /// A unit entry was appended.
    UnitAdded(RosterUnitId),
    /// A unit's block count was replaced.
    UnitCountChanged {
        /// Affected entry.
        unit: RosterUnitId,
        /// New count.
        count: u32,
    },
    /// A unit entry was dropped, clearing the general if it pointed there.
    UnitRemoved(RosterUnitId),
    /// A battalion entry was appended.
    BattalionAdded(RosterBattalionId),
    /// A battalion entry was dropped.
    BattalionRemoved(RosterBattalionId),
    /// The general was reassigned or cleared.
    GeneralChanged(Option<RosterUnitId>),
    /// One option group of a unit got a new selection.
    WeaponOptionChanged {
        /// Affected entry.
        unit: RosterUnitId,
        /// Index of the option group.
        slot: usize,
    },
    /// An ability was given to a unit.
    ExtraAbilityAdded {
        /// Affected entry.
        unit: RosterUnitId,
        /// Catalog id of the ability.
        ability: String,
    },
    /// An ability was taken from a unit.
    ExtraAbilityRemoved {
        /// Affected entry.
        unit: RosterUnitId,
        /// Catalog id of the ability.
        ability: String,
    },
    /// New army option value.
    ArmyOptionChanged(String),
    /// New roster name.
    Renamed(String),
    /// New grand alliance.
    GrandAllianceChanged(GrandAlliance),
    /// Catalog id of the new allegiance.
    AllegianceChanged(String),
    /// The roster was repopulated from a slot.
    Loaded {
        /// Slot now active; `None` is the default slot.
        slot: Option<String>,
    },
}

type Listener = Box<dyn FnMut(&RosterChange, &Roster)>;

/// Owner of the single live roster.
pub struct RosterStore<S> {
    catalog: Arc<Catalog>,
    saves: SaveManager<S>,
    roster: Roster,
    tiers: BattlelineTiers,
    active_slot: Option<String>,
    known_slots: Vec<String>,
    revision: u64,
    listeners: Vec<Listener>,
}

impl<S> fmt::Debug for RosterStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RosterStore")
            .field("roster", &self.roster.name)
            .field("active_slot", &self.active_slot)
            .field("known_slots", &self.known_slots)
            .field("revision", &self.revision)
            .finish()
    }
}

impl<S: KeyValueStore> RosterStore<S> {
    /// Read the slot list and restore the default slot, if one was saved.
    pub fn open(catalog: Arc<Catalog>, storage: S) -> Result<Self, StoreError> {
        let saves = SaveManager::new(storage);
        let known_slots = saves.slots()?;
        let mut roster = Roster::new(&catalog);
        saves.load(&mut roster, &catalog, None)?;

        Ok(Self {
            catalog,
            saves,
            roster,
            tiers: BattlelineTiers::default(),
            active_slot: None,
            known_slots,
            revision: 0,
            listeners: Vec::new(),
        })
    }

    /// Choose the battleline thresholds used by [`RosterStore::composition`].
    pub fn with_battleline_tiers(mut self, tiers: BattlelineTiers) -> Self {
        self.tiers = tiers;
        self
    }

    /// Current roster state.
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Catalog the roster resolves against.
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Backing key-value store.
    pub fn storage(&self) -> &S {
        self.saves.storage()
    }

    /// Incremented by every applied mutation and load.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Slot mutations are written to; `None` is the default slot.
    pub fn active_slot(&self) -> Option<&str> {
        self.active_slot.as_deref()
    }

    /// Named slots in creation order.
    pub fn known_slots(&self) -> &[String] {
        &self.known_slots
    }

    /// Register a callback run after every applied change.
    pub fn subscribe(&mut self, listener: impl FnMut(&RosterChange, &Roster) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Composition under the configured battleline tiers.
    pub fn composition(&self) -> Composition {
        self.roster.composition(self.tiers)
    }

    /// Unit ids still owed to battalions, with the missing entry count.
    pub fn outstanding_requirements(&self) -> BTreeMap<String, u32> {
        outstanding_requirements(&self.roster)
    }

    /// See [`battalion_lines`].
    pub fn battalion_lines(&self) -> Vec<BattalionLine<'_>> {
        battalion_lines(&self.roster)
    }

    /// Army option declared for the roster's allegiance.
    pub fn army_options(&self) -> Option<&ArmyOption> {
        self.catalog.army_options(&self.roster.allegiance.id)
    }

    /// Abilities `unit` may receive right now.
    pub fn available_extra_abilities(&self, unit: RosterUnitId) -> Vec<&Arc<ExtraAbility>> {
        self.roster.available_extra_abilities(unit, &self.catalog)
    }

    /// Append `unit` with a count of 1.
    pub fn add_unit(&mut self, unit: &Arc<Unit>) -> Result<RosterChange, StoreError> {
        let id = self.roster.add_unit(Arc::clone(unit));
        self.commit(RosterChange::UnitAdded(id))
    }

    /// Set a unit's count. Advisory maxima on the catalog unit are not enforced.
    pub fn set_unit_count(
        &mut self,
        unit: RosterUnitId,
        count: u32,
    ) -> Result<RosterChange, StoreError> {
        let change = if self.roster.set_unit_count(unit, count) {
            RosterChange::UnitCountChanged { unit, count }
        } else {
            RosterChange::Unchanged
        };
        self.commit(change)
    }

    /// Remove a unit; the general is cleared when it was that unit.
    pub fn remove_unit(&mut self, unit: RosterUnitId) -> Result<RosterChange, StoreError> {
        let change = if self.roster.remove_unit(unit) {
            RosterChange::UnitRemoved(unit)
        } else {
            RosterChange::Unchanged
        };
        self.commit(change)
    }

    /// Append `battalion`. Its requirements are not checked.
    pub fn add_battalion(
        &mut self,
        battalion: &Arc<Battalion>,
    ) -> Result<RosterChange, StoreError> {
        let id = self.roster.add_battalion(Arc::clone(battalion));
        self.commit(RosterChange::BattalionAdded(id))
    }

    /// Drop a battalion entry.
    pub fn remove_battalion(
        &mut self,
        battalion: RosterBattalionId,
    ) -> Result<RosterChange, StoreError> {
        let change = if self.roster.remove_battalion(battalion) {
            RosterChange::BattalionRemoved(battalion)
        } else {
            RosterChange::Unchanged
        };
        self.commit(change)
    }

    /// Reassign the general. Neither membership nor leadership is checked.
    pub fn set_general(
        &mut self,
        unit: Option<RosterUnitId>,
    ) -> Result<RosterChange, StoreError> {
        self.roster.set_general(unit);
        self.commit(RosterChange::GeneralChanged(unit))
    }

    /// Select `weapon_option` in option group `slot` of `unit`.
    pub fn set_weapon_option(
        &mut self,
        unit: RosterUnitId,
        slot: usize,
        weapon_option: &WeaponOption,
        count: Option<u32>,
    ) -> Result<RosterChange, StoreError> {
        let change = if self
            .roster
            .set_weapon_option(unit, slot, weapon_option.clone(), count)
        {
            RosterChange::WeaponOptionChanged { unit, slot }
        } else {
            RosterChange::Unchanged
        };
        self.commit(change)
    }

    /// Give an ability to a unit. Eligibility is the caller's concern.
    pub fn add_extra_ability(
        &mut self,
        unit: RosterUnitId,
        ability: &Arc<ExtraAbility>,
    ) -> Result<RosterChange, StoreError> {
        let change = if self.roster.add_extra_ability(unit, Arc::clone(ability)) {
            RosterChange::ExtraAbilityAdded {
                unit,
                ability: ability.id.clone(),
            }
        } else {
            RosterChange::Unchanged
        };
        self.commit(change)
    }

    /// Drop the first ability of `unit` with id `ability_id`.
    pub fn remove_extra_ability(
        &mut self,
        unit: RosterUnitId,
        ability_id: &str,
    ) -> Result<RosterChange, StoreError> {
        let change = if self.roster.remove_extra_ability(unit, ability_id) {
            RosterChange::ExtraAbilityRemoved {
                unit,
                ability: ability_id.to_string(),
            }
        } else {
            RosterChange::Unchanged
        };
        self.commit(change)
    }

    /// Free-form; not checked against [`RosterStore::army_options`].
    pub fn set_army_option(
        &mut self,
        value: impl Into<String>,
    ) -> Result<RosterChange, StoreError> {
        let value = value.into();
        self.roster.army_option = value.clone();
        self.commit(RosterChange::ArmyOptionChanged(value))
    }

    /// Rename the roster.
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<RosterChange, StoreError> {
        let name = name.into();
        self.roster.name = name.clone();
        self.commit(RosterChange::Renamed(name))
    }

    /// Allegiance and army option are left as they are.
    pub fn set_grand_alliance(
        &mut self,
        grand_alliance: GrandAlliance,
    ) -> Result<RosterChange, StoreError> {
        self.roster.grand_alliance = grand_alliance;
        self.commit(RosterChange::GrandAllianceChanged(grand_alliance))
    }

    /// Switch allegiance by catalog id; unknown ids leave the roster as is.
    pub fn set_allegiance(&mut self, allegiance_id: &str) -> Result<RosterChange, StoreError> {
        let change = match self.catalog.allegiance(allegiance_id) {
            Some(allegiance) => {
                self.roster.allegiance = Arc::clone(allegiance);
                RosterChange::AllegianceChanged(allegiance_id.to_string())
            }
            None => {
                warn!("Ignoring unknown allegiance {allegiance_id}");
                RosterChange::Unchanged
            }
        };
        self.commit(change)
    }

    /// Write the roster to `slot` without changing the active slot.
    pub fn save(&mut self, slot: Option<&str>) -> Result<(), StoreError> {
        self.saves.save(&self.roster, slot)
    }

    /// Restore `slot` in place and make it the active slot.
    ///
    /// An empty slot leaves both the roster and the active slot unchanged and returns
    /// `false`. A malformed record is returned as an error.
    pub fn load(&mut self, slot: Option<&str>) -> Result<bool, StoreError> {
        if !self.saves.load(&mut self.roster, &self.catalog, slot)? {
            info!("slot {:?} is empty; keeping the current roster", slot);
            return Ok(false);
        }
        self.active_slot = slot.filter(|name| !name.is_empty()).map(str::to_string);
        self.notify(RosterChange::Loaded {
            slot: self.active_slot.clone(),
        });
        Ok(true)
    }

    /// Save under a named slot, register it in the slot list and make it active.
    ///
    /// Blank names are rejected; they would alias the default slot.
    pub fn save_as(&mut self, name: &str) -> Result<(), StoreError> {
        let name = checked_slot_name(name)?;
        if !self.known_slots.iter().any(|known| known == name) {
            self.known_slots.push(name.to_string());
            self.saves.write_slots(&self.known_slots)?;
            info!("registered slot {name}");
        }
        self.saves.save(&self.roster, Some(name))?;
        self.active_slot = Some(name.to_string());
        Ok(())
    }

    /// Forget a named slot.
    ///
    /// When the deleted slot was active the store switches back to the default slot and
    /// reloads it, or starts an empty roster when the default slot holds nothing, so later
    /// mutations never write the deleted slot's roster over the default one.
    pub fn delete_slot(&mut self, name: &str) -> Result<(), StoreError> {
        let name = checked_slot_name(name)?;
        let before = self.known_slots.len();
        self.known_slots.retain(|known| known != name);
        if self.known_slots.len() != before {
            self.saves.write_slots(&self.known_slots)?;
        }
        self.saves.delete(name)?;
        info!("deleted slot {name}");

        if self.active_slot.as_deref() == Some(name) {
            self.active_slot = None;
            if !self.saves.load(&mut self.roster, &self.catalog, None)? {
                self.roster.reset(&self.catalog);
            }
            self.notify(RosterChange::Loaded { slot: None });
        }
        Ok(())
    }

    fn notify(&mut self, change: RosterChange) {
        self.revision += 1;
        debug!(revision = self.revision, ?change, "roster changed");
        for listener in &mut self.listeners {
            listener(&change, &self.roster);
        }
    }

    fn commit(&mut self, change: RosterChange) -> Result<RosterChange, StoreError> {
        if change == RosterChange::Unchanged {
            debug!("mutation referenced a missing roster entry; nothing to save");
            return Ok(change);
        }
        self.notify(change.clone());
        self.saves.save(&self.roster, self.active_slot.as_deref())?;
        Ok(change)
    }
}

fn checked_slot_name(name: &str) -> Result<&str, StoreError> {
    if name.trim().is_empty() {
        return Err(StoreError::BlankSlotName(name.to_string()));
    }
    Ok(name)
}
